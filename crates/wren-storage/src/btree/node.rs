//! B+Tree node types: the stat block, leaves, and interior nodes.
//!
//! On disk every node is an ordinary slotted page whose records follow a
//! fixed shape:
//!
//! - *Stat block* (always block 1): record 1 = root block id,
//!   record 2 = tree height (marshaled like a block id; height 1 means the
//!   root is a leaf).
//! - *Leaf*: records `r1..r(2n+1)` where `r(2i-1)` is a marshaled handle,
//!   `r(2i)` the matching key, and the final record the next-leaf block id
//!   (0 for none).
//! - *Interior*: record 1 = first child pointer, then alternating boundary
//!   key and child pointer.
//!
//! Nodes are rewritten whole on save: the page is cleared and the records
//! re-added in order, so record ids stay dense and deletion never occurs
//! inside index blocks.

use std::collections::BTreeMap;

use tracing::debug;
use wren_common::error::{DbError, DbResult};
use wren_common::types::{BlockId, Handle, KeyProfile, KeyValue, RecordId};

use crate::heap::codec;
use crate::heap::HeapFile;
use crate::page::SLOT_ENTRY_SIZE;

/// Block id of the stat block in every index file.
pub(crate) const STAT_BLOCK_ID: BlockId = BlockId::FIRST;

const ROOT_RECORD: RecordId = RecordId::new(1);
const HEIGHT_RECORD: RecordId = RecordId::new(2);

/// Message propagated upward from a split: the new sibling and the
/// boundary key that separates it from the node that split.
#[derive(Debug, Clone)]
pub(crate) struct SplitMessage {
    pub(crate) new_node: BlockId,
    pub(crate) boundary: KeyValue,
}

/// The stat block: root pointer and tree height.
#[derive(Debug)]
pub(crate) struct BTreeStat {
    root_id: BlockId,
    height: u32,
}

impl BTreeStat {
    /// Writes a fresh stat block for a one-leaf tree rooted at `root_id`.
    pub(crate) fn create(file: &mut HeapFile, root_id: BlockId) -> DbResult<Self> {
        let stat = Self { root_id, height: 1 };
        stat.save(file)?;
        Ok(stat)
    }

    /// Loads the stat block of an existing index file.
    pub(crate) fn load(file: &mut HeapFile) -> DbResult<Self> {
        let page = file.get(STAT_BLOCK_ID)?;
        let root = page
            .get(ROOT_RECORD)?
            .ok_or_else(|| DbError::corruption("stat block has no root record"))?;
        let root_id = codec::unmarshal_block_id(root)?;
        let height = page
            .get(HEIGHT_RECORD)?
            .ok_or_else(|| DbError::corruption("stat block has no height record"))?;
        let height = codec::unmarshal_block_id(height)?.as_u32();
        if root_id.is_none() || height == 0 {
            return Err(DbError::corruption("stat block holds an empty tree"));
        }
        Ok(Self { root_id, height })
    }

    pub(crate) fn save(&self, file: &mut HeapFile) -> DbResult<()> {
        let mut page = file.get(STAT_BLOCK_ID)?;
        let root = codec::marshal_block_id(self.root_id);
        let height = codec::marshal_block_id(BlockId::new(self.height));
        if page.num_records() == 0 {
            page.add(&root)?;
            page.add(&height)?;
        } else {
            page.put(ROOT_RECORD, &root)?;
            page.put(HEIGHT_RECORD, &height)?;
        }
        file.put(&page)
    }

    #[inline]
    pub(crate) fn root_id(&self) -> BlockId {
        self.root_id
    }

    #[inline]
    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn set_root_id(&mut self, root_id: BlockId) {
        self.root_id = root_id;
    }

    pub(crate) fn set_height(&mut self, height: u32) {
        self.height = height;
    }
}

/// A leaf node: (key -> handle) pairs plus the next-leaf chain pointer.
#[derive(Debug)]
pub(crate) struct LeafNode {
    id: BlockId,
    entries: BTreeMap<KeyValue, Handle>,
    next_leaf: BlockId,
}

impl LeafNode {
    /// Allocates a fresh empty leaf at the end of the index file.
    pub(crate) fn create(file: &mut HeapFile) -> DbResult<Self> {
        let page = file.get_new()?;
        Ok(Self {
            id: page.id(),
            entries: BTreeMap::new(),
            next_leaf: BlockId::NONE,
        })
    }

    /// Loads the leaf stored under `id`.
    pub(crate) fn load(file: &mut HeapFile, id: BlockId, profile: &KeyProfile) -> DbResult<Self> {
        let page = file.get(id)?;
        let n = page.ids().len();
        if n > 0 && n % 2 == 0 {
            return Err(DbError::corruption(format!(
                "leaf block {} has an even record count",
                id
            )));
        }
        let mut entries = BTreeMap::new();
        let mut next_leaf = BlockId::NONE;
        for i in 1..=n {
            let data = page
                .get(RecordId::new(i as u16))?
                .ok_or_else(|| DbError::corruption(format!("leaf block {} has a hole", id)))?;
            if i == n {
                next_leaf = codec::unmarshal_block_id(data)?;
            } else if i % 2 == 0 {
                let key = codec::unmarshal_key(data, profile)?;
                let handle_data = page
                    .get(RecordId::new((i - 1) as u16))?
                    .ok_or_else(|| DbError::corruption(format!("leaf block {} has a hole", id)))?;
                let handle = codec::unmarshal_handle(handle_data)?;
                entries.insert(key, handle);
            }
        }
        Ok(Self {
            id,
            entries,
            next_leaf,
        })
    }

    /// Rewrites the leaf's block: (handle, key) pairs in key order, then
    /// the next-leaf pointer as the final record.
    pub(crate) fn save(&self, file: &mut HeapFile, profile: &KeyProfile) -> DbResult<()> {
        let mut page = file.get(self.id)?;
        page.clear();
        for (key, handle) in &self.entries {
            page.add(&codec::marshal_handle(*handle))?;
            page.add(&codec::marshal_key(key, profile)?)?;
        }
        page.add(&codec::marshal_block_id(self.next_leaf))?;
        file.put(&page)
    }

    #[inline]
    pub(crate) fn id(&self) -> BlockId {
        self.id
    }

    #[inline]
    pub(crate) fn next_leaf(&self) -> BlockId {
        self.next_leaf
    }

    /// Smallest key currently stored, if any.
    pub(crate) fn first_key(&self) -> Option<&KeyValue> {
        self.entries.keys().next()
    }

    /// All keys in ascending order.
    pub(crate) fn keys(&self) -> impl Iterator<Item = &KeyValue> {
        self.entries.keys()
    }

    /// Equality search within this leaf.
    pub(crate) fn find_eq(&self, key: &KeyValue) -> Option<Handle> {
        self.entries.get(key).copied()
    }

    /// Inserts a (key, handle) pair, splitting the leaf when it no longer
    /// fits its block.
    ///
    /// On split the new right sibling takes the upper half, the leaf chain
    /// is relinked through it, and the returned message carries its
    /// smallest key as the boundary for the parent.
    pub(crate) fn insert(
        &mut self,
        file: &mut HeapFile,
        profile: &KeyProfile,
        key: KeyValue,
        handle: Handle,
    ) -> DbResult<Option<SplitMessage>> {
        if self.entries.contains_key(&key) {
            return Err(DbError::DuplicateKey);
        }
        self.entries.insert(key, handle);
        if self.fits(file.block_size()) {
            self.save(file, profile)?;
            return Ok(None);
        }

        let split_at = self.entries.len() / 2;
        if split_at == 0 {
            return Err(DbError::SchemaViolation(
                "index entry too large for an empty leaf block".to_string(),
            ));
        }
        let boundary = self
            .entries
            .keys()
            .nth(split_at)
            .cloned()
            .ok_or_else(|| DbError::corruption("leaf split point out of range"))?;

        let mut sibling = LeafNode::create(file)?;
        sibling.entries = self.entries.split_off(&boundary);
        sibling.next_leaf = self.next_leaf;
        self.next_leaf = sibling.id;
        debug!(
            leaf = %self.id,
            sibling = %sibling.id,
            entries = sibling.entries.len(),
            "splitting leaf"
        );

        sibling.save(file, profile)?;
        self.save(file, profile)?;
        Ok(Some(SplitMessage {
            new_node: sibling.id,
            boundary,
        }))
    }

    fn fits(&self, block_size: usize) -> bool {
        let records = 2 * self.entries.len() + 1;
        let payload: usize = self
            .entries
            .keys()
            .map(|key| codec::HANDLE_LEN + codec::key_encoded_len(key))
            .sum::<usize>()
            + codec::BLOCK_ID_LEN;
        SLOT_ENTRY_SIZE * (records + 1) + payload <= block_size
    }
}

/// An interior node: a first pointer and strictly ascending boundary keys
/// with their pointers.
///
/// A key `k` routes to the pointer left of the smallest boundary greater
/// than `k`, or to the last pointer when no boundary is greater.
#[derive(Debug)]
pub(crate) struct InteriorNode {
    id: BlockId,
    first: BlockId,
    boundaries: Vec<KeyValue>,
    pointers: Vec<BlockId>,
}

impl InteriorNode {
    /// Allocates a fresh empty interior node at the end of the index file.
    pub(crate) fn create(file: &mut HeapFile) -> DbResult<Self> {
        let page = file.get_new()?;
        Ok(Self {
            id: page.id(),
            first: BlockId::NONE,
            boundaries: Vec::new(),
            pointers: Vec::new(),
        })
    }

    /// Loads the interior node stored under `id`.
    pub(crate) fn load(file: &mut HeapFile, id: BlockId, profile: &KeyProfile) -> DbResult<Self> {
        let page = file.get(id)?;
        let n = page.ids().len();
        if n % 2 == 0 {
            return Err(DbError::corruption(format!(
                "interior block {} has an even record count",
                id
            )));
        }
        let mut first = BlockId::NONE;
        let mut boundaries = Vec::new();
        let mut pointers = Vec::new();
        for i in 1..=n {
            let data = page
                .get(RecordId::new(i as u16))?
                .ok_or_else(|| DbError::corruption(format!("interior block {} has a hole", id)))?;
            if i == 1 {
                first = codec::unmarshal_block_id(data)?;
            } else if i % 2 == 0 {
                boundaries.push(codec::unmarshal_key(data, profile)?);
            } else {
                pointers.push(codec::unmarshal_block_id(data)?);
            }
        }
        Ok(Self {
            id,
            first,
            boundaries,
            pointers,
        })
    }

    /// Rewrites the node's block: first pointer, then (boundary, pointer)
    /// pairs in order.
    pub(crate) fn save(&self, file: &mut HeapFile, profile: &KeyProfile) -> DbResult<()> {
        let mut page = file.get(self.id)?;
        page.clear();
        page.add(&codec::marshal_block_id(self.first))?;
        for (boundary, pointer) in self.boundaries.iter().zip(&self.pointers) {
            page.add(&codec::marshal_key(boundary, profile)?)?;
            page.add(&codec::marshal_block_id(*pointer))?;
        }
        file.put(&page)
    }

    #[inline]
    pub(crate) fn id(&self) -> BlockId {
        self.id
    }

    pub(crate) fn set_first(&mut self, first: BlockId) {
        self.first = first;
    }

    /// Chooses the child block the given key must live under.
    pub(crate) fn route(&self, key: &KeyValue) -> BlockId {
        for (i, boundary) in self.boundaries.iter().enumerate() {
            if boundary > key {
                return if i == 0 { self.first } else { self.pointers[i - 1] };
            }
        }
        self.pointers.last().copied().unwrap_or(self.first)
    }

    /// Inserts a (boundary, pointer) entry, splitting when the node no
    /// longer fits its block.
    ///
    /// On split the boundary at the split point is lifted into the parent:
    /// neither sibling keeps it, and its pointer becomes the new sibling's
    /// first pointer.
    pub(crate) fn insert_entry(
        &mut self,
        file: &mut HeapFile,
        profile: &KeyProfile,
        boundary: KeyValue,
        pointer: BlockId,
    ) -> DbResult<Option<SplitMessage>> {
        let pos = match self.boundaries.binary_search(&boundary) {
            Ok(_) => {
                // keys are unique and split boundaries are lifted, so an
                // equal boundary can only mean a damaged tree
                return Err(DbError::corruption(format!(
                    "duplicate boundary in interior block {}",
                    self.id
                )));
            }
            Err(pos) => pos,
        };
        self.boundaries.insert(pos, boundary);
        self.pointers.insert(pos, pointer);
        if self.fits(file.block_size()) {
            self.save(file, profile)?;
            return Ok(None);
        }

        let split_at = self.boundaries.len() / 2;
        if split_at == 0 {
            return Err(DbError::SchemaViolation(
                "boundary key too large for an empty interior block".to_string(),
            ));
        }
        let mut sibling = InteriorNode::create(file)?;
        sibling.boundaries = self.boundaries.split_off(split_at + 1);
        sibling.pointers = self.pointers.split_off(split_at + 1);
        let lifted = self
            .boundaries
            .pop()
            .ok_or_else(|| DbError::corruption("interior split point out of range"))?;
        sibling.first = self
            .pointers
            .pop()
            .ok_or_else(|| DbError::corruption("interior split point out of range"))?;
        debug!(
            interior = %self.id,
            sibling = %sibling.id,
            "splitting interior node"
        );

        sibling.save(file, profile)?;
        self.save(file, profile)?;
        Ok(Some(SplitMessage {
            new_node: sibling.id,
            boundary: lifted,
        }))
    }

    fn fits(&self, block_size: usize) -> bool {
        let records = 1 + 2 * self.boundaries.len();
        let payload: usize = codec::BLOCK_ID_LEN
            + self
                .boundaries
                .iter()
                .map(|key| codec::key_encoded_len(key) + codec::BLOCK_ID_LEN)
                .sum::<usize>();
        SLOT_ENTRY_SIZE * (records + 1) + payload <= block_size
    }
}

/// A node loaded during descent, tagged by its kind.
///
/// The tree height serves as the independent check: depth 1 must hold a
/// leaf, anything deeper an interior node.
#[derive(Debug)]
pub(crate) enum Node {
    /// A leaf node.
    Leaf(LeafNode),
    /// An interior routing node.
    Interior(InteriorNode),
}

impl Node {
    /// Loads the node stored under `id`, using `height` to pick the kind.
    pub(crate) fn load(
        file: &mut HeapFile,
        id: BlockId,
        profile: &KeyProfile,
        height: u32,
    ) -> DbResult<Self> {
        if height <= 1 {
            Ok(Node::Leaf(LeafNode::load(file, id, profile)?))
        } else {
            Ok(Node::Interior(InteriorNode::load(file, id, profile)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wren_common::types::{DataType, Value};

    const BLOCK_SIZE: usize = 4096;

    fn int_profile() -> KeyProfile {
        vec![DataType::Int]
    }

    fn key(n: i32) -> KeyValue {
        vec![Value::int(n)]
    }

    fn handle(n: u32) -> Handle {
        Handle::new(BlockId::new(n), RecordId::new(1))
    }

    fn index_file(dir: &TempDir) -> HeapFile {
        let mut file = HeapFile::new(dir.path(), "idx", BLOCK_SIZE);
        file.create().unwrap();
        file
    }

    #[test]
    fn test_stat_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut file = index_file(&dir);

        let mut stat = BTreeStat::create(&mut file, BlockId::new(2)).unwrap();
        assert_eq!(stat.root_id(), BlockId::new(2));
        assert_eq!(stat.height(), 1);

        stat.set_root_id(BlockId::new(9));
        stat.set_height(3);
        stat.save(&mut file).unwrap();

        let stat = BTreeStat::load(&mut file).unwrap();
        assert_eq!(stat.root_id(), BlockId::new(9));
        assert_eq!(stat.height(), 3);
    }

    #[test]
    fn test_leaf_save_load() {
        let dir = TempDir::new().unwrap();
        let mut file = index_file(&dir);
        let profile = int_profile();

        let mut leaf = LeafNode::create(&mut file).unwrap();
        for n in [5, 1, 3] {
            leaf.insert(&mut file, &profile, key(n), handle(n as u32))
                .unwrap();
        }

        let loaded = LeafNode::load(&mut file, leaf.id(), &profile).unwrap();
        let keys: Vec<_> = loaded.keys().cloned().collect();
        assert_eq!(keys, vec![key(1), key(3), key(5)]);
        assert_eq!(loaded.find_eq(&key(3)), Some(handle(3)));
        assert_eq!(loaded.find_eq(&key(4)), None);
        assert_eq!(loaded.next_leaf(), BlockId::NONE);
    }

    #[test]
    fn test_leaf_duplicate_key() {
        let dir = TempDir::new().unwrap();
        let mut file = index_file(&dir);
        let profile = int_profile();

        let mut leaf = LeafNode::create(&mut file).unwrap();
        leaf.insert(&mut file, &profile, key(1), handle(1)).unwrap();
        assert!(matches!(
            leaf.insert(&mut file, &profile, key(1), handle(2)),
            Err(DbError::DuplicateKey)
        ));
        // the first entry survives
        assert_eq!(leaf.find_eq(&key(1)), Some(handle(1)));
    }

    #[test]
    fn test_leaf_split() {
        let dir = TempDir::new().unwrap();
        let mut file = index_file(&dir);
        let profile = int_profile();

        let mut leaf = LeafNode::create(&mut file).unwrap();
        let mut split = None;
        let mut n = 0;
        while split.is_none() {
            split = leaf
                .insert(&mut file, &profile, key(n), handle(n as u32 + 1))
                .unwrap();
            n += 1;
        }
        let msg = split.unwrap();

        let sibling = LeafNode::load(&mut file, msg.new_node, &profile).unwrap();
        // boundary is the sibling's smallest key
        assert_eq!(sibling.first_key(), Some(&msg.boundary));
        // chain relinked through the sibling
        assert_eq!(leaf.next_leaf(), sibling.id());
        // all keys across both halves, none lost, in order
        let mut all: Vec<_> = leaf.keys().cloned().collect();
        assert!(all.last().unwrap() < sibling.first_key().unwrap());
        all.extend(sibling.keys().cloned());
        let expected: Vec<_> = (0..n).map(key).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_interior_routing() {
        let dir = TempDir::new().unwrap();
        let mut file = index_file(&dir);
        let profile = int_profile();

        let mut node = InteriorNode::create(&mut file).unwrap();
        node.set_first(BlockId::new(10));
        node.insert_entry(&mut file, &profile, key(100), BlockId::new(11))
            .unwrap();
        node.insert_entry(&mut file, &profile, key(200), BlockId::new(12))
            .unwrap();

        assert_eq!(node.route(&key(50)), BlockId::new(10));
        assert_eq!(node.route(&key(100)), BlockId::new(11));
        assert_eq!(node.route(&key(150)), BlockId::new(11));
        assert_eq!(node.route(&key(200)), BlockId::new(12));
        assert_eq!(node.route(&key(999)), BlockId::new(12));

        let loaded = InteriorNode::load(&mut file, node.id(), &profile).unwrap();
        assert_eq!(loaded.route(&key(150)), BlockId::new(11));
    }

    #[test]
    fn test_interior_duplicate_boundary_is_corruption() {
        let dir = TempDir::new().unwrap();
        let mut file = index_file(&dir);
        let profile = int_profile();

        let mut node = InteriorNode::create(&mut file).unwrap();
        node.set_first(BlockId::new(10));
        node.insert_entry(&mut file, &profile, key(1), BlockId::new(11))
            .unwrap();
        assert!(matches!(
            node.insert_entry(&mut file, &profile, key(1), BlockId::new(12)),
            Err(DbError::Corruption { .. })
        ));
    }

    #[test]
    fn test_interior_split_lifts_boundary() {
        let dir = TempDir::new().unwrap();
        let mut file = index_file(&dir);
        let profile = int_profile();

        let mut node = InteriorNode::create(&mut file).unwrap();
        node.set_first(BlockId::new(1000));
        let mut split = None;
        let mut n = 0;
        while split.is_none() {
            split = node
                .insert_entry(&mut file, &profile, key(n), BlockId::new(2000 + n as u32))
                .unwrap();
            n += 1;
        }
        let msg = split.unwrap();
        let sibling = InteriorNode::load(&mut file, msg.new_node, &profile).unwrap();

        // the lifted boundary is retained by neither sibling
        assert!(!node.boundaries.contains(&msg.boundary));
        assert!(!sibling.boundaries.contains(&msg.boundary));
        // its pointer became the sibling's first
        let lifted_n = match &msg.boundary[0] {
            Value::Int(v) => *v,
            other => panic!("unexpected boundary value {:?}", other),
        };
        assert_eq!(sibling.first, BlockId::new(2000 + lifted_n as u32));
        // every key left of the lift is smaller, right of it larger
        assert!(node.boundaries.iter().all(|b| b < &msg.boundary));
        assert!(sibling.boundaries.iter().all(|b| b > &msg.boundary));
    }
}
