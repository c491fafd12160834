use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{HalignError, Result};

/// Default number of elements per chunk when callers give no preference.
pub const DEFAULT_CHUNK_ELEMS: u64 = 1024;

/// Shape of a stored dataset: fixed element width, element count, and the
/// chunk granularity it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArraySpec {
    /// Width of one element (record slot) in bytes.
    pub element_width: usize,
    /// Number of elements in the dataset.
    pub len: u64,
    /// Elements per chunk; always a power of two.
    pub chunk_elems: u64,
}

/// Creation properties for a genome's datasets.
///
/// Copied, never referenced, on genome construction; each array derives its
/// own chunk granularity from `chunk_elems` (DNA inflates it, wide bottom
/// records shrink it).
#[derive(Debug, Clone, Copy)]
pub struct ArrayProps {
    /// Requested elements per chunk before per-array scaling.
    pub chunk_elems: u64,
}

impl ArrayProps {
    /// Properties with an explicit chunk element count.
    pub fn new(chunk_elems: u64) -> Self {
        Self { chunk_elems }
    }
}

impl Default for ArrayProps {
    fn default() -> Self {
        Self {
            chunk_elems: DEFAULT_CHUNK_ELEMS,
        }
    }
}

/// Capability set required of a storage backend.
///
/// Groups form a `/`-separated namespace ("genome/Meta"). Existence is
/// always probed explicitly — implementations must not require callers to
/// drive control flow through failed opens.
pub trait ArrayStore: fmt::Debug {
    /// Create a group, along with any missing ancestors.
    fn group_create(&self, group: &str) -> Result<()>;

    /// Whether a group exists.
    fn group_exists(&self, group: &str) -> bool;

    /// Whether a dataset exists inside `group`.
    fn exists(&self, group: &str, name: &str) -> bool;

    /// Create a zero-filled dataset. Fails if one already exists under the
    /// same name.
    fn create_array(&self, group: &str, name: &str, spec: &ArraySpec) -> Result<()>;

    /// Fetch the shape of an existing dataset.
    fn open_array(&self, group: &str, name: &str) -> Result<ArraySpec>;

    /// Remove a dataset. Fails if it does not exist.
    fn unlink_array(&self, group: &str, name: &str) -> Result<()>;

    /// Read `buf.len()` bytes starting at byte `offset` of the dataset.
    fn read_bytes(&self, group: &str, name: &str, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at byte `offset` of the dataset.
    fn write_bytes(&self, group: &str, name: &str, offset: u64, data: &[u8]) -> Result<()>;

    /// Set a string attribute on a group.
    fn set_attr(&self, group: &str, key: &str, value: &str) -> Result<()>;

    /// Read a string attribute from a group.
    fn get_attr(&self, group: &str, key: &str) -> Result<Option<String>>;

    /// Push buffered state to durable storage.
    fn flush(&self) -> Result<()>;
}

#[derive(Debug)]
struct Dataset {
    spec: ArraySpec,
    bytes: Vec<u8>,
}

/// In-process backend holding every dataset in memory.
///
/// The reference implementation of [`ArrayStore`]; also what tests and
/// in-memory alignments run against.
#[derive(Debug)]
pub struct MemoryStore {
    groups: RefCell<BTreeSet<String>>,
    datasets: RefCell<HashMap<String, Dataset>>,
    attrs: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            groups: RefCell::new(BTreeSet::new()),
            datasets: RefCell::new(HashMap::new()),
            attrs: RefCell::new(BTreeMap::new()),
        }
    }

    fn dataset_key(group: &str, name: &str) -> String {
        format!("{group}/{name}")
    }

    fn attr_key(group: &str, key: &str) -> String {
        format!("{group}#{key}")
    }
}

impl ArrayStore for MemoryStore {
    fn group_create(&self, group: &str) -> Result<()> {
        let mut groups = self.groups.borrow_mut();
        let mut path = String::new();
        for part in group.split('/') {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(part);
            groups.insert(path.clone());
        }
        Ok(())
    }

    fn group_exists(&self, group: &str) -> bool {
        self.groups.borrow().contains(group)
    }

    fn exists(&self, group: &str, name: &str) -> bool {
        self.datasets
            .borrow()
            .contains_key(&Self::dataset_key(group, name))
    }

    fn create_array(&self, group: &str, name: &str, spec: &ArraySpec) -> Result<()> {
        let key = Self::dataset_key(group, name);
        let mut datasets = self.datasets.borrow_mut();
        if datasets.contains_key(&key) {
            return Err(HalignError::UnsupportedOperation(format!(
                "dataset {key} already exists"
            )));
        }
        let total = spec.element_width as u64 * spec.len;
        datasets.insert(
            key,
            Dataset {
                spec: *spec,
                bytes: vec![0u8; total as usize],
            },
        );
        Ok(())
    }

    fn open_array(&self, group: &str, name: &str) -> Result<ArraySpec> {
        let key = Self::dataset_key(group, name);
        self.datasets
            .borrow()
            .get(&key)
            .map(|d| d.spec)
            .ok_or_else(|| HalignError::MissingName(format!("dataset {key} not found")))
    }

    fn unlink_array(&self, group: &str, name: &str) -> Result<()> {
        let key = Self::dataset_key(group, name);
        self.datasets
            .borrow_mut()
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| HalignError::MissingName(format!("dataset {key} not found")))
    }

    fn read_bytes(&self, group: &str, name: &str, offset: u64, buf: &mut [u8]) -> Result<()> {
        let key = Self::dataset_key(group, name);
        let datasets = self.datasets.borrow();
        let dataset = datasets
            .get(&key)
            .ok_or_else(|| HalignError::MissingName(format!("dataset {key} not found")))?;
        let end = offset as usize + buf.len();
        if end > dataset.bytes.len() {
            return Err(HalignError::OutOfRange(format!(
                "read of {key} at {offset}..{end} exceeds {} bytes",
                dataset.bytes.len()
            )));
        }
        buf.copy_from_slice(&dataset.bytes[offset as usize..end]);
        Ok(())
    }

    fn write_bytes(&self, group: &str, name: &str, offset: u64, data: &[u8]) -> Result<()> {
        let key = Self::dataset_key(group, name);
        let mut datasets = self.datasets.borrow_mut();
        let dataset = datasets
            .get_mut(&key)
            .ok_or_else(|| HalignError::MissingName(format!("dataset {key} not found")))?;
        let end = offset as usize + data.len();
        if end > dataset.bytes.len() {
            return Err(HalignError::OutOfRange(format!(
                "write of {key} at {offset}..{end} exceeds {} bytes",
                dataset.bytes.len()
            )));
        }
        dataset.bytes[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn set_attr(&self, group: &str, key: &str, value: &str) -> Result<()> {
        self.attrs
            .borrow_mut()
            .insert(Self::attr_key(group, key), value.to_string());
        Ok(())
    }

    fn get_attr(&self, group: &str, key: &str) -> Result<Option<String>> {
        Ok(self.attrs.borrow().get(&Self::attr_key(group, key)).cloned())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
