//! B+Tree insert and search over a page store.
//!
//! The tree keeps no parent pointers. A recursive insert reports back to its
//! caller whether the child split and, if so, which key/page to promote —
//! the caller folds that into its own page and may split in turn. If the
//! promotion reaches the root, a new root is allocated and the tree grows by
//! one level.

use crate::btree::page::{
    self, InternalEntry, LeafEntry, Node, PageType, INTERNAL_SIZE_BUDGET, LEAF_SIZE_BUDGET,
};
use crate::btree::store::{PageRead, PageStore};
use crate::btree::{overflow, Values, MAX_KEY_SIZE, MAX_VALUE_SIZE};
use crate::error::{Error, Result};
use std::path::Path;

/// Result of a recursive insert at one level of the tree.
enum InsertOutcome {
    /// The subtree absorbed the insert.
    Done,
    /// The child page split; the caller must route `promoted_key` and the
    /// new right sibling into its own entry list.
    Split {
        /// First key of the new right page, promoted as a separator.
        promoted_key: Vec<u8>,
        /// Page id of the newly allocated right sibling.
        right_page: u64,
    },
}

/// An on-disk B+Tree multimap from byte keys to small value blobs.
///
/// Keys are compared as unsigned bytes, lexicographically, with length as
/// the final tiebreaker (exactly `<[u8]>::cmp`). Inserting an existing key
/// appends the value to that key's overflow chain, so a search yields every
/// value ever inserted for the key, in insertion order.
///
/// A tree instance owns its file handle exclusively. Operations take
/// `&mut self` and are atomic with respect to each other on the same
/// instance; concurrent use requires external locking around whole
/// operations.
pub struct BPlusTree {
    store: PageStore,
}

impl BPlusTree {
    /// Open a tree, creating the index file if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self { store: PageStore::open(path)? })
    }

    /// Insert a value under a key.
    ///
    /// Duplicate keys are allowed: each insert appends to the key's value
    /// chain. Fails with [`Error::KeyTooLarge`] or [`Error::ValueTooLarge`]
    /// before any I/O if the arguments exceed the format limits.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.len() > MAX_KEY_SIZE {
            return Err(Error::KeyTooLarge { len: key.len(), max: MAX_KEY_SIZE });
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(Error::ValueTooLarge { len: value.len(), max: MAX_VALUE_SIZE });
        }

        let root = self.store.root_page_id()?;
        match self.insert_recursive(root, key, value)? {
            InsertOutcome::Done => Ok(()),
            InsertOutcome::Split { promoted_key, right_page } => {
                // The root itself split: grow the tree by one level.
                let new_root = self.store.allocate(PageType::Internal)?;
                let node = Node::Internal {
                    leftmost_child: root,
                    entries: vec![InternalEntry { key: promoted_key, right_child: right_page }],
                };
                self.store.write_page(new_root, &node.encode())?;
                self.store.set_root_page_id(new_root)?;
                log::debug!("Root split: new root page {}", new_root);
                Ok(())
            }
        }
    }

    fn insert_recursive(&mut self, page_id: u64, key: &[u8], value: &[u8]) -> Result<InsertOutcome> {
        match Node::decode(&self.store.read_page(page_id)?)? {
            Node::Leaf { entries } => self.insert_into_leaf(page_id, entries, key, value),
            Node::Internal { leftmost_child, entries } => {
                self.insert_into_internal(page_id, leftmost_child, entries, key, value)
            }
            Node::Overflow { .. } => {
                Err(Error::corruption(format!("Overflow page {} in tree descent", page_id)))
            }
        }
    }

    fn insert_into_leaf(
        &mut self,
        page_id: u64,
        mut entries: Vec<LeafEntry>,
        key: &[u8],
        value: &[u8],
    ) -> Result<InsertOutcome> {
        match entries.binary_search_by(|e| e.key.as_slice().cmp(key)) {
            Ok(idx) => {
                // Existing key: append through the cached tail pointer. The
                // leaf is rewritten only when a new page was chained.
                let old_tail = entries[idx].overflow_tail;
                let new_tail = overflow::append(&mut self.store, old_tail, value)?;
                if new_tail != old_tail {
                    entries[idx].overflow_tail = new_tail;
                    self.store.write_page(page_id, &Node::Leaf { entries }.encode())?;
                }
                Ok(InsertOutcome::Done)
            }
            Err(pos) => {
                let chain = overflow::allocate_chain(&mut self.store, value)?;
                entries.insert(
                    pos,
                    LeafEntry { key: key.to_vec(), overflow_head: chain, overflow_tail: chain },
                );

                if page::leaf_size(&entries) <= LEAF_SIZE_BUDGET {
                    self.store.write_page(page_id, &Node::Leaf { entries }.encode())?;
                    return Ok(InsertOutcome::Done);
                }

                let right_entries = entries.split_off(entries.len() / 2);
                let promoted_key = right_entries[0].key.clone();

                self.store.write_page(page_id, &Node::Leaf { entries }.encode())?;

                let right_page = self.store.allocate(PageType::Leaf)?;
                self.store.write_page(right_page, &Node::Leaf { entries: right_entries }.encode())?;

                log::debug!("Leaf {} split, new right page {}", page_id, right_page);
                Ok(InsertOutcome::Split { promoted_key, right_page })
            }
        }
    }

    fn insert_into_internal(
        &mut self,
        page_id: u64,
        leftmost_child: u64,
        mut entries: Vec<InternalEntry>,
        key: &[u8],
        value: &[u8],
    ) -> Result<InsertOutcome> {
        if entries.is_empty() {
            return Err(Error::corruption(format!("Internal page {} has no children", page_id)));
        }

        let idx = child_index(&entries, key);
        let child = if idx == 0 { leftmost_child } else { entries[idx - 1].right_child };

        let (promoted_key, right_page) = match self.insert_recursive(child, key, value)? {
            InsertOutcome::Done => return Ok(InsertOutcome::Done),
            InsertOutcome::Split { promoted_key, right_page } => (promoted_key, right_page),
        };

        entries.insert(idx, InternalEntry { key: promoted_key, right_child: right_page });

        if page::internal_size(&entries) <= INTERNAL_SIZE_BUDGET {
            let node = Node::Internal { leftmost_child, entries };
            self.store.write_page(page_id, &node.encode())?;
            return Ok(InsertOutcome::Done);
        }

        // Split around the middle separator: it moves up, its right child
        // becomes the leftmost child of the new right page.
        let mut right_entries = entries.split_off(entries.len() / 2);
        let promoted = right_entries.remove(0);

        let node = Node::Internal { leftmost_child, entries };
        self.store.write_page(page_id, &node.encode())?;

        let right_page = self.store.allocate(PageType::Internal)?;
        let node =
            Node::Internal { leftmost_child: promoted.right_child, entries: right_entries };
        self.store.write_page(right_page, &node.encode())?;

        log::debug!("Internal {} split, new right page {}", page_id, right_page);
        Ok(InsertOutcome::Split { promoted_key: promoted.key, right_page })
    }

    /// Search for a key, yielding every value in its chain in insertion
    /// order.
    ///
    /// An absent key yields an empty iterator, not an error. Fails with
    /// [`Error::KeyTooLarge`] if the key exceeds the format limit.
    pub fn search(&mut self, key: &[u8]) -> Result<Values<'_, PageStore>> {
        search(&mut self.store, key)
    }

    /// Flush and fsync the index file.
    pub fn sync(&mut self) -> Result<()> {
        self.store.sync()
    }

    /// Sync and release the index file.
    pub fn close(self) -> Result<()> {
        self.store.close()
    }

    /// Number of pages allocated by the index file.
    pub fn page_count(&self) -> u64 {
        self.store.page_count()
    }
}

/// Index of the child subtree that owns `key`: the slot left of the first
/// separator strictly greater than the key.
fn child_index(entries: &[InternalEntry], key: &[u8]) -> usize {
    entries.iter().position(|e| key < e.key.as_slice()).unwrap_or(entries.len())
}

/// Search over any page source.
///
/// This is the whole read side of the tree; [`BPlusTree::search`] and the
/// remote index reader both call it, so local and remote lookups share one
/// code path.
pub fn search<'a, S: PageRead>(source: &'a mut S, key: &[u8]) -> Result<Values<'a, S>> {
    if key.len() > MAX_KEY_SIZE {
        return Err(Error::KeyTooLarge { len: key.len(), max: MAX_KEY_SIZE });
    }
    let head = find_chain(source, key)?.map(|(head, _tail)| head);
    Ok(Values::new(source, head))
}

/// Descend from the root to the leaf owning `key` and return its chain's
/// `(head, tail)` page ids, or `None` if the key is absent.
fn find_chain<S: PageRead>(source: &mut S, key: &[u8]) -> Result<Option<(u64, u64)>> {
    let mut page_id = source.root_page_id()?;
    loop {
        match Node::decode(&source.read_page(page_id)?)? {
            Node::Leaf { entries } => {
                let found = entries
                    .binary_search_by(|e| e.key.as_slice().cmp(key))
                    .ok()
                    .map(|idx| (entries[idx].overflow_head, entries[idx].overflow_tail));
                return Ok(found);
            }
            Node::Internal { leftmost_child, entries } => {
                if entries.is_empty() {
                    return Err(Error::corruption(format!(
                        "Internal page {} has no children",
                        page_id
                    )));
                }
                let idx = child_index(&entries, key);
                page_id = if idx == 0 { leftmost_child } else { entries[idx - 1].right_child };
            }
            Node::Overflow { .. } => {
                return Err(Error::corruption(format!("Overflow page {} in tree descent", page_id)))
            }
        }
    }
}
