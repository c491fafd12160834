//! The alignment tree registry.
//!
//! The registry owns the storage handle, the genome topology, and the
//! cache of open genomes. Genomes keep only weak back-references; dropping
//! the registry invalidates them. This is the minimal collaborator surface
//! the per-genome store needs — name resolution and open/close — not a
//! full alignment API.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::genome::Genome;
use crate::storage::{ArrayProps, ArrayStore};
use crate::{HalignError, Result};

// topology lives in attributes of the backend's root group
const TREE_GROUP: &str = "";
const TREE_KEY: &str = "tree";

#[derive(Debug, Default)]
struct Tree {
    // creation order; determines child ordering
    order: Vec<String>,
    parents: HashMap<String, Option<String>>,
    children: HashMap<String, Vec<String>>,
}

impl Tree {
    fn contains(&self, name: &str) -> bool {
        self.parents.contains_key(name)
    }

    fn insert(&mut self, name: &str, parent: Option<&str>) {
        self.order.push(name.to_string());
        self.parents
            .insert(name.to_string(), parent.map(str::to_string));
        self.children.entry(name.to_string()).or_default();
        if let Some(parent) = parent {
            self.children
                .entry(parent.to_string())
                .or_default()
                .push(name.to_string());
        }
    }

    fn serialize(&self) -> String {
        let mut out = String::new();
        for name in &self.order {
            out.push_str(name);
            out.push('\t');
            if let Some(Some(parent)) = self.parents.get(name) {
                out.push_str(parent);
            }
            out.push('\n');
        }
        out
    }

    fn parse(raw: &str) -> Result<Self> {
        let mut tree = Self::default();
        for line in raw.lines() {
            let (name, parent) = line.split_once('\t').ok_or_else(|| {
                HalignError::CorruptFile(format!("malformed topology line {line:?}"))
            })?;
            tree.insert(name, (!parent.is_empty()).then_some(parent));
        }
        Ok(tree)
    }
}

/// A tree of genomes sharing one storage backend.
#[derive(Debug)]
pub struct Alignment {
    store: Rc<dyn ArrayStore>,
    props: ArrayProps,
    buffered_chunks: usize,
    tree: RefCell<Tree>,
    open: RefCell<HashMap<String, Rc<Genome>>>,
}

impl Alignment {
    /// Create an empty alignment over `store` with default creation
    /// properties and demand-loaded chunks.
    pub fn create(store: Rc<dyn ArrayStore>) -> Result<Rc<Self>> {
        Self::create_with(store, ArrayProps::default(), false)
    }

    /// Create an empty alignment with explicit creation properties.
    ///
    /// `in_memory` keeps every array chunk resident instead of demand
    /// loading.
    pub fn create_with(
        store: Rc<dyn ArrayStore>,
        props: ArrayProps,
        in_memory: bool,
    ) -> Result<Rc<Self>> {
        Ok(Rc::new(Self {
            store,
            props,
            buffered_chunks: if in_memory { 0 } else { 1 },
            tree: RefCell::new(Tree::default()),
            open: RefCell::new(HashMap::new()),
        }))
    }

    /// Open an alignment previously written to `store`.
    pub fn open(store: Rc<dyn ArrayStore>) -> Result<Rc<Self>> {
        let tree = match store.get_attr(TREE_GROUP, TREE_KEY)? {
            Some(raw) => Tree::parse(&raw)?,
            None => Tree::default(),
        };
        Ok(Rc::new(Self {
            store,
            props: ArrayProps::default(),
            buffered_chunks: 1,
            tree: RefCell::new(tree),
            open: RefCell::new(HashMap::new()),
        }))
    }

    /// The shared storage handle.
    pub fn store(&self) -> Rc<dyn ArrayStore> {
        Rc::clone(&self.store)
    }

    pub(crate) fn props(&self) -> ArrayProps {
        self.props
    }

    pub(crate) fn buffered_chunks(&self) -> usize {
        self.buffered_chunks
    }

    fn persist_tree(&self) -> Result<()> {
        self.store
            .set_attr(TREE_GROUP, TREE_KEY, &self.tree.borrow().serialize())
    }

    fn check_new_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(HalignError::UnsupportedOperation(
                "genome names must be non-empty".to_string(),
            ));
        }
        if self.tree.borrow().contains(name) {
            return Err(HalignError::UnsupportedOperation(format!(
                "genome {name} already exists in the alignment"
            )));
        }
        Ok(())
    }

    /// Add the root genome. The tree must still be empty.
    pub fn add_root_genome(self: &Rc<Self>, name: &str) -> Result<Rc<Genome>> {
        self.check_new_name(name)?;
        if !self.tree.borrow().order.is_empty() {
            return Err(HalignError::UnsupportedOperation(format!(
                "cannot add root {name}: the alignment already has one"
            )));
        }
        self.tree.borrow_mut().insert(name, None);
        self.persist_tree()?;
        debug!(genome = name, "added root genome");
        let genome = Genome::attach(self, name)?;
        self.open.borrow_mut().insert(name.to_string(), Rc::clone(&genome));
        Ok(genome)
    }

    /// Add a genome as the next child of `parent`.
    pub fn add_leaf_genome(self: &Rc<Self>, name: &str, parent: &str) -> Result<Rc<Genome>> {
        self.check_new_name(name)?;
        if !self.tree.borrow().contains(parent) {
            return Err(HalignError::MissingName(format!(
                "cannot attach {name}: parent genome {parent} not found"
            )));
        }
        self.tree.borrow_mut().insert(name, Some(parent));
        self.persist_tree()?;
        debug!(genome = name, parent, "added leaf genome");
        let genome = Genome::attach(self, name)?;
        self.open.borrow_mut().insert(name.to_string(), Rc::clone(&genome));
        Ok(genome)
    }

    /// Open a genome by name, reusing the instance if already open.
    pub fn open_genome(self: &Rc<Self>, name: &str) -> Result<Rc<Genome>> {
        if let Some(genome) = self.open.borrow().get(name) {
            return Ok(Rc::clone(genome));
        }
        if !self.tree.borrow().contains(name) {
            return Err(HalignError::MissingName(format!(
                "genome {name} not found in the alignment"
            )));
        }
        let genome = Genome::attach(self, name)?;
        self.open.borrow_mut().insert(name.to_string(), Rc::clone(&genome));
        Ok(genome)
    }

    /// Every genome name, in creation order.
    pub fn genome_names(&self) -> Vec<String> {
        self.tree.borrow().order.clone()
    }

    /// Name of the root genome, if any genome exists.
    pub fn root_name(&self) -> Option<String> {
        let tree = self.tree.borrow();
        tree.order
            .iter()
            .find(|name| matches!(tree.parents.get(*name), Some(None)))
            .cloned()
    }

    /// Parent name of `name`, or `None` for the root.
    pub fn parent_name(&self, name: &str) -> Result<Option<String>> {
        self.tree
            .borrow()
            .parents
            .get(name)
            .cloned()
            .ok_or_else(|| {
                HalignError::MissingName(format!("genome {name} not found in the alignment"))
            })
    }

    /// Child names of `name` in attachment order.
    pub fn child_names(&self, name: &str) -> Result<Vec<String>> {
        let tree = self.tree.borrow();
        if !tree.contains(name) {
            return Err(HalignError::MissingName(format!(
                "genome {name} not found in the alignment"
            )));
        }
        Ok(tree.children.get(name).cloned().unwrap_or_default())
    }

    /// Flush every open genome and the backend, then drop the open-genome
    /// cache.
    pub fn close(&self) -> Result<()> {
        for genome in self.open.borrow().values() {
            genome.flush()?;
        }
        self.store.flush()?;
        self.open.borrow_mut().clear();
        Ok(())
    }
}

impl Drop for Alignment {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!(%error, "alignment close failed during drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn topology_round_trips_through_attr() {
        let store: Rc<dyn ArrayStore> = Rc::new(MemoryStore::new());
        {
            let alignment = Alignment::create(Rc::clone(&store)).unwrap();
            alignment.add_root_genome("root").unwrap();
            alignment.add_leaf_genome("a", "root").unwrap();
            alignment.add_leaf_genome("b", "root").unwrap();
            alignment.add_leaf_genome("a1", "a").unwrap();
            alignment.close().unwrap();
        }
        let alignment = Alignment::open(store).unwrap();
        assert_eq!(alignment.root_name().as_deref(), Some("root"));
        assert_eq!(alignment.child_names("root").unwrap(), vec!["a", "b"]);
        assert_eq!(alignment.child_names("a").unwrap(), vec!["a1"]);
        assert_eq!(alignment.parent_name("a1").unwrap().as_deref(), Some("a"));
        assert_eq!(alignment.parent_name("root").unwrap(), None);
    }

    #[test]
    fn unknown_names_are_missing() {
        let store: Rc<dyn ArrayStore> = Rc::new(MemoryStore::new());
        let alignment = Alignment::create(store).unwrap();
        alignment.add_root_genome("root").unwrap();
        assert!(matches!(
            alignment.open_genome("nope"),
            Err(HalignError::MissingName(_))
        ));
        assert!(matches!(
            alignment.add_leaf_genome("x", "nope"),
            Err(HalignError::MissingName(_))
        ));
    }

    #[test]
    fn second_root_is_rejected() {
        let store: Rc<dyn ArrayStore> = Rc::new(MemoryStore::new());
        let alignment = Alignment::create(store).unwrap();
        alignment.add_root_genome("root").unwrap();
        assert!(alignment.add_root_genome("other").is_err());
    }
}
