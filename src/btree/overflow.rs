//! Overflow chains: per-key linked lists of value pages.
//!
//! Every key in the tree owns one chain. The chain head is where iteration
//! starts; the tail is cached in the leaf entry so appends never re-walk the
//! chain. Chains only grow — values are never removed or reordered.

use crate::btree::page::{self, Node, PageType};
use crate::btree::store::{PageRead, PageStore};
use crate::btree::{NO_PAGE, PAGE_SIZE};
use crate::error::{Error, Result};

/// Allocate a fresh one-value chain and return its page id.
///
/// The returned page is both head and tail of the new chain.
pub fn allocate_chain(store: &mut PageStore, value: &[u8]) -> Result<u64> {
    let page_id = store.allocate(PageType::Overflow)?;
    let node = Node::Overflow { values: vec![value.to_vec()], next: NO_PAGE };
    store.write_page(page_id, &node.encode())?;
    Ok(page_id)
}

/// Append a value to the chain ending at `tail_page`.
///
/// Returns the chain's tail page id after the append: unchanged if the value
/// fit, or the id of a newly chained page. Callers must update the leaf's
/// cached tail pointer when the id changes.
pub fn append(store: &mut PageStore, tail_page: u64, value: &[u8]) -> Result<u64> {
    let node = Node::decode(&store.read_page(tail_page)?)?;
    let (mut values, next) = match node {
        Node::Overflow { values, next } => (values, next),
        other => {
            return Err(Error::corruption(format!(
                "Chain tail {} is a {:?} page",
                tail_page,
                other.page_type()
            )))
        }
    };
    if next != NO_PAGE {
        return Err(Error::corruption(format!("Chain tail {} has a successor", tail_page)));
    }

    // The trailing 8 bytes are reserved for the next-page pointer.
    if page::overflow_used(&values) + 4 + value.len() + 8 <= PAGE_SIZE {
        values.push(value.to_vec());
        store.write_page(tail_page, &Node::Overflow { values, next: NO_PAGE }.encode())?;
        return Ok(tail_page);
    }

    let new_tail = allocate_chain(store, value)?;
    store.write_page(tail_page, &Node::Overflow { values, next: new_tail as i64 }.encode())?;
    log::debug!("Overflow chain grew: page {} -> {}", tail_page, new_tail);
    Ok(new_tail)
}

/// Lazy iterator over every value of one key, in chain order.
///
/// Produced by the tree's search operations. The sequence is finite,
/// single-pass, and not restartable; pages are read one at a time as the
/// iterator advances.
pub struct Values<'a, S: PageRead> {
    source: &'a mut S,
    pending: std::vec::IntoIter<Vec<u8>>,
    next_page: Option<u64>,
    failed: bool,
}

impl<'a, S: PageRead> Values<'a, S> {
    /// Iterator over the chain starting at `head`, or an empty iterator for
    /// an absent key (`head == None`).
    pub(crate) fn new(source: &'a mut S, head: Option<u64>) -> Self {
        Self { source, pending: Vec::new().into_iter(), next_page: head, failed: false }
    }

    fn load_next_page(&mut self) -> Result<bool> {
        let page_id = match self.next_page.take() {
            Some(id) => id,
            None => return Ok(false),
        };
        match Node::decode(&self.source.read_page(page_id)?)? {
            Node::Overflow { values, next } => {
                self.pending = values.into_iter();
                self.next_page = if next == NO_PAGE { None } else { Some(next as u64) };
                Ok(true)
            }
            other => Err(Error::corruption(format!(
                "Overflow chain page {} is a {:?} page",
                page_id,
                other.page_type()
            ))),
        }
    }
}

impl<'a, S: PageRead> Iterator for Values<'a, S> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(value) = self.pending.next() {
                return Some(Ok(value));
            }
            match self.load_next_page() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn collect(store: &mut PageStore, head: u64) -> Vec<Vec<u8>> {
        Values::new(store, Some(head)).map(|v| v.unwrap()).collect()
    }

    #[test]
    fn test_allocate_chain_single_value() {
        let dir = TempDir::new().unwrap();
        let mut store = PageStore::open(dir.path().join("t.index")).unwrap();

        let head = allocate_chain(&mut store, b"value1").unwrap();
        assert_eq!(collect(&mut store, head), vec![b"value1".to_vec()]);
    }

    #[test]
    fn test_append_within_page() {
        let dir = TempDir::new().unwrap();
        let mut store = PageStore::open(dir.path().join("t.index")).unwrap();

        let head = allocate_chain(&mut store, b"v1").unwrap();
        let tail = append(&mut store, head, b"v2").unwrap();
        assert_eq!(tail, head);

        assert_eq!(collect(&mut store, head), vec![b"v1".to_vec(), b"v2".to_vec()]);
    }

    #[test]
    fn test_append_spills_to_new_page() {
        let dir = TempDir::new().unwrap();
        let mut store = PageStore::open(dir.path().join("t.index")).unwrap();

        // 8-byte values: a page holds (4096 - 5 - 8) / 12 = 340 of them.
        let head = allocate_chain(&mut store, &0u64.to_be_bytes()).unwrap();
        let mut tail = head;
        let total = 1000u64;
        for i in 1..total {
            tail = append(&mut store, tail, &i.to_be_bytes()).unwrap();
        }
        assert_ne!(tail, head);

        let values = collect(&mut store, head);
        assert_eq!(values.len(), total as usize);
        for (i, value) in values.iter().enumerate() {
            assert_eq!(value.as_slice(), &(i as u64).to_be_bytes());
        }
    }

    #[test]
    fn test_append_to_non_tail_fails() {
        let dir = TempDir::new().unwrap();
        let mut store = PageStore::open(dir.path().join("t.index")).unwrap();

        let head = allocate_chain(&mut store, &0u64.to_be_bytes()).unwrap();
        let mut tail = head;
        for i in 1..400u64 {
            tail = append(&mut store, tail, &i.to_be_bytes()).unwrap();
        }
        assert_ne!(tail, head);

        // The head now has a successor and must no longer accept appends.
        let result = append(&mut store, head, b"late");
        assert!(matches!(result, Err(Error::Corruption(_))));
    }

    #[test]
    fn test_values_empty_for_absent_chain() {
        let dir = TempDir::new().unwrap();
        let mut store = PageStore::open(dir.path().join("t.index")).unwrap();

        let mut values = Values::new(&mut store, None);
        assert!(values.next().is_none());
    }
}
