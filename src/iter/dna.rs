use std::rc::Rc;

use crate::codec::{complement_base, decode_base, encode_base, pack_base, unpack_base};
use crate::genome::Genome;
use crate::{HalIndex, HalignError, Result};

/// Cursor over a genome's nibble-packed DNA bases.
///
/// A reversed cursor reads complemented bases and advances toward lower
/// positions, so a bulk read naturally produces the reverse complement.
/// The genome length itself is a valid resting position (the end
/// sentinel); reading or writing there is out of range.
#[derive(Debug, Clone)]
pub struct DnaIter {
    genome: Rc<Genome>,
    position: HalIndex,
    reversed: bool,
}

impl DnaIter {
    pub(crate) fn new(genome: Rc<Genome>, position: HalIndex) -> Result<Self> {
        if position < 0 || position as u64 > genome.length() {
            return Err(HalignError::OutOfRange(format!(
                "DNA position {position} outside genome {} of length {}",
                genome.name(),
                genome.length()
            )));
        }
        Ok(Self {
            genome,
            position,
            reversed: false,
        })
    }

    /// Current genome position.
    pub fn position(&self) -> HalIndex {
        self.position
    }

    /// Whether the cursor reads the reverse complement strand.
    pub fn reversed(&self) -> bool {
        self.reversed
    }

    /// Flip strands in place.
    pub fn to_reverse(&mut self) {
        self.reversed = !self.reversed;
    }

    /// Move `count` bases forward in traversal orientation (or backward
    /// for negative `count`).
    pub fn advance(&mut self, count: HalIndex) {
        if self.reversed {
            self.position -= count;
        } else {
            self.position += count;
        }
    }

    fn check_readable(&self) -> Result<()> {
        if self.position < 0 || self.position as u64 >= self.genome.length() {
            return Err(HalignError::OutOfRange(format!(
                "DNA access at {} outside genome {} of length {}",
                self.position,
                self.genome.name(),
                self.genome.length()
            )));
        }
        Ok(())
    }

    /// The base under the cursor as uppercase ASCII, complemented when
    /// reversed.
    pub fn read(&self) -> Result<u8> {
        self.check_readable()?;
        let array = self.genome.dna_array()?;
        let byte = array.get_u8(self.position as u64 / 2, 0)?;
        let mut code = unpack_base(byte, self.position);
        if self.reversed {
            code = complement_base(code);
        }
        Ok(decode_base(code))
    }

    /// Store `base` at the cursor, preserving the neighboring nibble. A
    /// reversed cursor stores the complement.
    pub fn write(&self, base: u8) -> Result<()> {
        self.check_readable()?;
        let mut code = encode_base(base);
        if self.reversed {
            code = complement_base(code);
        }
        let array = self.genome.dna_array()?;
        let byte = array.get_u8(self.position as u64 / 2, 0)?;
        array.set_u8(self.position as u64 / 2, 0, pack_base(byte, self.position, code))
    }

    /// Read `length` bases in traversal order, advancing past them.
    pub fn read_string(&mut self, length: u64) -> Result<String> {
        let mut out = String::with_capacity(length as usize);
        for _ in 0..length {
            out.push(self.read()? as char);
            self.advance(1);
        }
        Ok(out)
    }

    /// Write every base of `input` in traversal order, advancing past
    /// them.
    pub fn write_string(&mut self, input: &str) -> Result<()> {
        for base in input.bytes() {
            self.write(base)?;
            self.advance(1);
        }
        Ok(())
    }
}
