use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::codec::{read_i64_at, read_u64_at, write_i64_at, write_u64_at};
use crate::{HalignError, Result};

use super::backend::{ArraySpec, ArrayStore};

#[derive(Debug)]
struct Chunk {
    bytes: Vec<u8>,
    dirty: bool,
}

#[derive(Debug)]
struct Cache {
    chunks: HashMap<u64, Chunk>,
    // least recently used first
    order: Vec<u64>,
}

/// A typed 1-D record array stored in the backend as power-of-two chunks.
///
/// At most `buffered_chunks` chunks stay resident; eviction drops the least
/// recently used chunk but never the one holding the most recently accessed
/// element. `buffered_chunks == 0` keeps the whole array in memory.
#[derive(Debug)]
pub struct ChunkedArray {
    store: Rc<dyn ArrayStore>,
    group: String,
    name: String,
    spec: ArraySpec,
    capacity: Option<usize>,
    cache: RefCell<Cache>,
}

impl ChunkedArray {
    /// Create a zero-filled array of `len` elements of `element_width`
    /// bytes. `chunk_elems` is rounded up to the next power of two.
    pub fn create(
        store: Rc<dyn ArrayStore>,
        group: &str,
        name: &str,
        element_width: usize,
        len: u64,
        chunk_elems: u64,
        buffered_chunks: usize,
    ) -> Result<Self> {
        let spec = ArraySpec {
            element_width,
            len,
            chunk_elems: chunk_elems.max(1).next_power_of_two(),
        };
        store.create_array(group, name, &spec)?;
        Ok(Self::attach(store, group, name, spec, buffered_chunks))
    }

    /// Open an existing array, faulting every chunk up front when
    /// `buffered_chunks == 0`.
    pub fn load(
        store: Rc<dyn ArrayStore>,
        group: &str,
        name: &str,
        buffered_chunks: usize,
    ) -> Result<Self> {
        let spec = store.open_array(group, name)?;
        let array = Self::attach(store, group, name, spec, buffered_chunks);
        if array.capacity.is_none() {
            for chunk in 0..array.num_chunks() {
                array.with_chunk(chunk, |_| Ok(()))?;
            }
        }
        Ok(array)
    }

    fn attach(
        store: Rc<dyn ArrayStore>,
        group: &str,
        name: &str,
        spec: ArraySpec,
        buffered_chunks: usize,
    ) -> Self {
        Self {
            store,
            group: group.to_string(),
            name: name.to_string(),
            spec,
            capacity: (buffered_chunks > 0).then_some(buffered_chunks),
            cache: RefCell::new(Cache {
                chunks: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Remove the backing dataset. Dirty state is discarded.
    pub fn unlink(self) -> Result<()> {
        self.store.unlink_array(&self.group, &self.name)
    }

    /// Number of elements.
    pub fn len(&self) -> u64 {
        self.spec.len
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.spec.len == 0
    }

    /// Width of one element slot in bytes.
    pub fn element_width(&self) -> usize {
        self.spec.element_width
    }

    /// Number of chunks currently held in memory.
    pub fn resident_chunks(&self) -> usize {
        self.cache.borrow().chunks.len()
    }

    fn num_chunks(&self) -> u64 {
        if self.spec.len == 0 {
            0
        } else {
            (self.spec.len + self.spec.chunk_elems - 1) / self.spec.chunk_elems
        }
    }

    fn chunk_byte_len(&self, chunk: u64) -> usize {
        let first = chunk * self.spec.chunk_elems;
        let elems = self.spec.chunk_elems.min(self.spec.len - first);
        elems as usize * self.spec.element_width
    }

    fn check_index(&self, index: u64) -> Result<()> {
        if index >= self.spec.len {
            return Err(HalignError::OutOfRange(format!(
                "element {index} outside array {}/{} of length {}",
                self.group, self.name, self.spec.len
            )));
        }
        Ok(())
    }

    fn with_chunk<R>(&self, chunk: u64, f: impl FnOnce(&mut Chunk) -> Result<R>) -> Result<R> {
        let mut cache = self.cache.borrow_mut();
        if !cache.chunks.contains_key(&chunk) {
            let mut bytes = vec![0u8; self.chunk_byte_len(chunk)];
            self.store.read_bytes(
                &self.group,
                &self.name,
                chunk * self.spec.chunk_elems * self.spec.element_width as u64,
                &mut bytes,
            )?;
            trace!(array = %self.name, chunk, "chunk fault");
            cache.chunks.insert(
                chunk,
                Chunk {
                    bytes,
                    dirty: false,
                },
            );
            cache.order.push(chunk);
            if let Some(capacity) = self.capacity {
                while cache.chunks.len() > capacity.max(1) {
                    // the chunk holding the most recent access is pinned
                    let Some(pos) = cache.order.iter().position(|&c| c != chunk) else {
                        break;
                    };
                    let victim = cache.order.remove(pos);
                    if let Some(evicted) = cache.chunks.remove(&victim) {
                        if evicted.dirty {
                            self.write_chunk(victim, &evicted.bytes)?;
                        }
                        trace!(array = %self.name, chunk = victim, "chunk evict");
                    }
                }
            }
        } else if let Some(pos) = cache.order.iter().position(|&c| c == chunk) {
            cache.order.remove(pos);
            cache.order.push(chunk);
        }
        let entry = cache
            .chunks
            .get_mut(&chunk)
            .ok_or_else(|| HalignError::CorruptFile("chunk cache lost a resident chunk".into()))?;
        f(entry)
    }

    fn write_chunk(&self, chunk: u64, bytes: &[u8]) -> Result<()> {
        self.store.write_bytes(
            &self.group,
            &self.name,
            chunk * self.spec.chunk_elems * self.spec.element_width as u64,
            bytes,
        )
    }

    fn with_slot<R>(&self, index: u64, f: impl FnOnce(&mut Chunk, usize) -> Result<R>) -> Result<R> {
        self.check_index(index)?;
        let chunk = index / self.spec.chunk_elems;
        let slot = (index % self.spec.chunk_elems) as usize * self.spec.element_width;
        self.with_chunk(chunk, |c| f(c, slot))
    }

    /// Read an `i64` field at `offset` inside element `index`.
    pub fn get_i64(&self, index: u64, offset: usize) -> Result<i64> {
        self.with_slot(index, |chunk, slot| Ok(read_i64_at(&chunk.bytes, slot + offset)))
    }

    /// Write an `i64` field at `offset` inside element `index`.
    pub fn set_i64(&self, index: u64, offset: usize, value: i64) -> Result<()> {
        self.with_slot(index, |chunk, slot| {
            write_i64_at(&mut chunk.bytes, slot + offset, value);
            chunk.dirty = true;
            Ok(())
        })
    }

    /// Read a `u64` field at `offset` inside element `index`.
    pub fn get_u64(&self, index: u64, offset: usize) -> Result<u64> {
        self.with_slot(index, |chunk, slot| Ok(read_u64_at(&chunk.bytes, slot + offset)))
    }

    /// Write a `u64` field at `offset` inside element `index`.
    pub fn set_u64(&self, index: u64, offset: usize, value: u64) -> Result<()> {
        self.with_slot(index, |chunk, slot| {
            write_u64_at(&mut chunk.bytes, slot + offset, value);
            chunk.dirty = true;
            Ok(())
        })
    }

    /// Read a byte field at `offset` inside element `index`.
    pub fn get_u8(&self, index: u64, offset: usize) -> Result<u8> {
        self.with_slot(index, |chunk, slot| Ok(chunk.bytes[slot + offset]))
    }

    /// Write a byte field at `offset` inside element `index`.
    pub fn set_u8(&self, index: u64, offset: usize, value: u8) -> Result<()> {
        self.with_slot(index, |chunk, slot| {
            chunk.bytes[slot + offset] = value;
            chunk.dirty = true;
            Ok(())
        })
    }

    /// Copy the whole slot of element `index`.
    pub fn read_slot(&self, index: u64) -> Result<Vec<u8>> {
        let width = self.spec.element_width;
        self.with_slot(index, |chunk, slot| Ok(chunk.bytes[slot..slot + width].to_vec()))
    }

    /// Overwrite the whole slot of element `index`.
    pub fn write_slot(&self, index: u64, data: &[u8]) -> Result<()> {
        if data.len() != self.spec.element_width {
            return Err(HalignError::OutOfRange(format!(
                "slot write of {} bytes into {}-byte records",
                data.len(),
                self.spec.element_width
            )));
        }
        self.with_slot(index, |chunk, slot| {
            chunk.bytes[slot..slot + data.len()].copy_from_slice(data);
            chunk.dirty = true;
            Ok(())
        })
    }

    /// Write every dirty chunk back to the backend.
    pub fn flush(&self) -> Result<()> {
        let mut cache = self.cache.borrow_mut();
        for (&chunk, entry) in cache.chunks.iter_mut() {
            if entry.dirty {
                self.store.write_bytes(
                    &self.group,
                    &self.name,
                    chunk * self.spec.chunk_elems * self.spec.element_width as u64,
                    &entry.bytes,
                )?;
                entry.dirty = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn array(buffered: usize) -> ChunkedArray {
        let store = Rc::new(MemoryStore::new());
        ChunkedArray::create(store, "g", "a", 16, 64, 4, buffered).unwrap()
    }

    #[test]
    fn typed_fields_round_trip() {
        let a = array(2);
        a.set_i64(10, 0, -77).unwrap();
        a.set_u64(10, 8, 500).unwrap();
        assert_eq!(a.get_i64(10, 0).unwrap(), -77);
        assert_eq!(a.get_u64(10, 8).unwrap(), 500);
    }

    #[test]
    fn eviction_respects_capacity_and_pins_current() {
        let a = array(2);
        for index in 0..64 {
            a.set_u64(index, 0, index).unwrap();
        }
        assert!(a.resident_chunks() <= 2);
        // evicted dirty chunks must have been written back
        for index in 0..64 {
            assert_eq!(a.get_u64(index, 0).unwrap(), index);
        }
    }

    #[test]
    fn zero_buffered_keeps_everything_resident() {
        let a = array(0);
        for index in 0..64 {
            a.set_u64(index, 0, index).unwrap();
        }
        assert_eq!(a.resident_chunks(), 16);
    }

    #[test]
    fn flush_persists_to_backend() {
        let store = Rc::new(MemoryStore::new());
        {
            let a =
                ChunkedArray::create(Rc::clone(&store) as Rc<dyn ArrayStore>, "g", "a", 8, 8, 4, 1)
                    .unwrap();
            a.set_u64(3, 0, 42).unwrap();
            a.flush().unwrap();
        }
        let b = ChunkedArray::load(store, "g", "a", 1).unwrap();
        assert_eq!(b.get_u64(3, 0).unwrap(), 42);
    }

    #[test]
    fn out_of_range_element_is_rejected() {
        let a = array(1);
        assert!(a.get_i64(64, 0).is_err());
    }

    #[test]
    fn load_with_zero_buffer_faults_all_chunks() {
        let store = Rc::new(MemoryStore::new());
        {
            let a =
                ChunkedArray::create(Rc::clone(&store) as Rc<dyn ArrayStore>, "g", "a", 8, 32, 4, 1)
                    .unwrap();
            a.set_u64(31, 0, 9).unwrap();
            a.flush().unwrap();
        }
        let b = ChunkedArray::load(store, "g", "a", 0).unwrap();
        assert_eq!(b.resident_chunks(), 8);
        assert_eq!(b.get_u64(31, 0).unwrap(), 9);
    }
}
