use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{HalignError, Result};

use super::backend::{ArraySpec, ArrayStore};

const MAGIC: u32 = 0x4e4c4148; // "HALN"
const FORMAT_VERSION: u32 = 1;
// Serialized header is 32 bytes with bincode's fixed-int encoding; data
// starts on the next 8-byte boundary after it.
const DATA_OFFSET: u64 = 40;
const ATTR_FILE: &str = "attrs.bin";

#[derive(Debug, Serialize, Deserialize)]
struct DatasetHeader {
    magic: u32,
    version: u32,
    spec: ArraySpec,
}

/// Directory-backed store: one subdirectory per group, one file per
/// dataset. Each dataset file opens with a fixed header carrying its shape;
/// group attributes live in a single table flushed with the store.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    attrs: RefCell<BTreeMap<String, String>>,
    attrs_dirty: RefCell<bool>,
}

impl FileStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            attrs: RefCell::new(BTreeMap::new()),
            attrs_dirty: RefCell::new(false),
        })
    }

    /// Open an existing store, loading its attribute table.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(HalignError::MissingName(format!(
                "store directory {} not found",
                root.display()
            )));
        }
        let attr_path = root.join(ATTR_FILE);
        let attrs = if attr_path.is_file() {
            let raw = fs::read(&attr_path)?;
            bincode::deserialize(&raw).map_err(|e| {
                HalignError::CorruptFile(format!(
                    "attribute table {} unreadable: {e}",
                    attr_path.display()
                ))
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            root,
            attrs: RefCell::new(attrs),
            attrs_dirty: RefCell::new(false),
        })
    }

    fn dataset_path(&self, group: &str, name: &str) -> PathBuf {
        self.root.join(group).join(format!("{name}.arr"))
    }

    fn open_dataset(&self, group: &str, name: &str) -> Result<(File, ArraySpec)> {
        let path = self.dataset_path(group, name);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|_| {
                HalignError::MissingName(format!("dataset {} not found", path.display()))
            })?;
        let mut raw = vec![0u8; DATA_OFFSET as usize];
        file.read_exact(&mut raw)?;
        let header: DatasetHeader = bincode::deserialize(&raw).map_err(|e| {
            HalignError::CorruptFile(format!("header of {} unreadable: {e}", path.display()))
        })?;
        if header.magic != MAGIC || header.version != FORMAT_VERSION {
            return Err(HalignError::CorruptFile(format!(
                "{} is not a halign dataset (magic {:#x}, version {})",
                path.display(),
                header.magic,
                header.version
            )));
        }
        Ok((file, header.spec))
    }

    fn check_extent(path: &Path, spec: &ArraySpec, offset: u64, len: usize) -> Result<()> {
        let total = spec.element_width as u64 * spec.len;
        if offset + len as u64 > total {
            return Err(HalignError::OutOfRange(format!(
                "access to {} at {offset}..{} exceeds {total} bytes",
                path.display(),
                offset + len as u64
            )));
        }
        Ok(())
    }
}

impl ArrayStore for FileStore {
    fn group_create(&self, group: &str) -> Result<()> {
        fs::create_dir_all(self.root.join(group))?;
        Ok(())
    }

    fn group_exists(&self, group: &str) -> bool {
        self.root.join(group).is_dir()
    }

    fn exists(&self, group: &str, name: &str) -> bool {
        self.dataset_path(group, name).is_file()
    }

    fn create_array(&self, group: &str, name: &str, spec: &ArraySpec) -> Result<()> {
        let path = self.dataset_path(group, name);
        if path.is_file() {
            return Err(HalignError::UnsupportedOperation(format!(
                "dataset {} already exists",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let header = DatasetHeader {
            magic: MAGIC,
            version: FORMAT_VERSION,
            spec: *spec,
        };
        let mut raw = bincode::serialize(&header).map_err(|e| {
            HalignError::CorruptFile(format!("header serialization failed: {e}"))
        })?;
        raw.resize(DATA_OFFSET as usize, 0);
        let mut file = File::create(&path)?;
        file.write_all(&raw)?;
        file.set_len(DATA_OFFSET + spec.element_width as u64 * spec.len)?;
        debug!(dataset = %path.display(), len = spec.len, width = spec.element_width, "created dataset");
        Ok(())
    }

    fn open_array(&self, group: &str, name: &str) -> Result<ArraySpec> {
        let (_, spec) = self.open_dataset(group, name)?;
        Ok(spec)
    }

    fn unlink_array(&self, group: &str, name: &str) -> Result<()> {
        let path = self.dataset_path(group, name);
        if !path.is_file() {
            return Err(HalignError::MissingName(format!(
                "dataset {} not found",
                path.display()
            )));
        }
        fs::remove_file(&path)?;
        debug!(dataset = %path.display(), "unlinked dataset");
        Ok(())
    }

    fn read_bytes(&self, group: &str, name: &str, offset: u64, buf: &mut [u8]) -> Result<()> {
        let (mut file, spec) = self.open_dataset(group, name)?;
        Self::check_extent(&self.dataset_path(group, name), &spec, offset, buf.len())?;
        file.seek(SeekFrom::Start(DATA_OFFSET + offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_bytes(&self, group: &str, name: &str, offset: u64, data: &[u8]) -> Result<()> {
        let (mut file, spec) = self.open_dataset(group, name)?;
        Self::check_extent(&self.dataset_path(group, name), &spec, offset, data.len())?;
        file.seek(SeekFrom::Start(DATA_OFFSET + offset))?;
        file.write_all(data)?;
        Ok(())
    }

    fn set_attr(&self, group: &str, key: &str, value: &str) -> Result<()> {
        self.attrs
            .borrow_mut()
            .insert(format!("{group}#{key}"), value.to_string());
        *self.attrs_dirty.borrow_mut() = true;
        Ok(())
    }

    fn get_attr(&self, group: &str, key: &str) -> Result<Option<String>> {
        Ok(self.attrs.borrow().get(&format!("{group}#{key}")).cloned())
    }

    fn flush(&self) -> Result<()> {
        if *self.attrs_dirty.borrow() {
            let raw = bincode::serialize(&*self.attrs.borrow()).map_err(|e| {
                HalignError::CorruptFile(format!("attribute serialization failed: {e}"))
            })?;
            fs::write(self.root.join(ATTR_FILE), raw)?;
            *self.attrs_dirty.borrow_mut() = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ArraySpec {
        ArraySpec {
            element_width: 4,
            len: 8,
            chunk_elems: 2,
        }
    }

    #[test]
    fn datasets_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::create(dir.path()).unwrap();
            store.group_create("g").unwrap();
            store.create_array("g", "a", &spec()).unwrap();
            store.write_bytes("g", "a", 4, &[9, 9, 9, 9]).unwrap();
            store.set_attr("g", "parent", "root").unwrap();
            store.flush().unwrap();
        }
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.open_array("g", "a").unwrap(), spec());
        let mut buf = [0u8; 4];
        store.read_bytes("g", "a", 4, &mut buf).unwrap();
        assert_eq!(buf, [9, 9, 9, 9]);
        assert_eq!(store.get_attr("g", "parent").unwrap().as_deref(), Some("root"));
    }

    #[test]
    fn truncated_header_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::create(dir.path()).unwrap();
        store.group_create("g").unwrap();
        fs::write(dir.path().join("g").join("a.arr"), b"short").unwrap();
        assert!(matches!(
            store.open_array("g", "a"),
            Err(HalignError::Io(_)) | Err(HalignError::CorruptFile(_))
        ));
    }
}
