use std::sync::{PoisonError, RwLock};

use tracing::{debug, info, trace};

use crate::hasher::{Combiner, Hash, ZeroHashes};
use crate::index::{COUNT_KEY, NodeIndex};
use crate::storage::{NodeStore, decode_count, encode_count};
use crate::tree::{LeafNode, MerkleList};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
struct State {
  count: u32,
  root: Hash,
}

/// Incremental Merkle tree of fixed height 32 whose nodes are persisted in a [`NodeStore`].
///
/// Every node touched by an insertion is written to the store under its flat index, and the leaf
/// count under [`COUNT_KEY`]. Nodes that were never written read as the zero hash of their row, so
/// the tree behaves as if all 2^32 slots were filled with zero leaves.
///
/// The published root is `H(root node, LE32(count))`, which commits to the number of leaves as
/// well as to their content.
///
/// Insertions are serialized by a write lock held from the first sibling read until the count is
/// persisted. Queries take the read lock, so they run alongside each other but never observe a
/// half-written path.
pub struct MerkleTree<S: NodeStore, C: Combiner> {
  store: S,
  combiner: C,
  zero_hashes: ZeroHashes,
  state: RwLock<State>,
}

impl<S: NodeStore, C: Combiner> MerkleTree<S, C> {
  /// Attaches to `store`, restoring the count and root of any tree already persisted in it.
  pub fn open(store: S, combiner: C) -> Result<Self> {
    let zero_hashes = combiner.zero_hashes();
    let count = match store.get(COUNT_KEY)? {
      Some(bytes) => decode_count(&bytes)?,
      None => 0,
    };
    let mut tree = MerkleTree { store, combiner, zero_hashes, state: RwLock::new(State { count, root: Hash::zero() }) };
    let top = tree.load_value(&NodeIndex::new(0, 0)?)?;
    let root = tree.combiner.combine(&top, &Hash::from_count(count));
    tree.state.get_mut()?.root = root;
    info!(count, %root, "merkle tree attached");
    Ok(tree)
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn combiner(&self) -> &C {
    &self.combiner
  }

  pub fn zero_hashes(&self) -> &ZeroHashes {
    &self.zero_hashes
  }

  /// Reads the leaf slot `leaf_index`. Slots at or beyond the count read as the zero leaf.
  pub fn get_leaf(&self, leaf_index: u32) -> Result<LeafNode> {
    let _state = self.state.read()?;
    self.load_leaf(leaf_index)
  }

  pub fn get_leaves(&self, leaf_indices: &[u32]) -> Result<Vec<LeafNode>> {
    let _state = self.state.read()?;
    leaf_indices.iter().map(|i| self.load_leaf(*i)).collect()
  }

  fn load_leaf(&self, leaf_index: u32) -> Result<LeafNode> {
    let index = NodeIndex::leaf(leaf_index);
    Ok(LeafNode { hash: self.load_value(&index)?, node_index: index.flat() })
  }

  fn load_value(&self, index: &NodeIndex) -> Result<Hash> {
    match self.store.get(index.flat())? {
      Some(bytes) => Hash::from_slice(&bytes),
      None => {
        trace!(%index, "zero hash fallback");
        Ok(*self.zero_hashes.at_row(index.row()))
      }
    }
  }

  fn save_value(&self, index: &NodeIndex, hash: &Hash) -> Result<()> {
    self.store.set(index.flat(), hash.as_bytes())
  }

  fn snapshot(&self) -> State {
    // State is replaced as a whole at the end of an insertion, so it is consistent even if a
    // writer panicked.
    *self.state.read().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<S: NodeStore, C: Combiner> MerkleList for MerkleTree<S, C> {
  type Error = Error;

  fn insert(&self, leaf: Hash) -> Result<u32> {
    let mut state = self.state.write()?;
    if state.count == u32::MAX {
      return Err(Error::CapacityExceeded { count: state.count });
    }

    let leaf_index = state.count;
    let mut index = NodeIndex::leaf(leaf_index);
    let mut hash = leaf;
    self.save_value(&index, &hash)?;
    while !index.is_root() {
      let sibling = self.load_value(&index.sibling()?)?;
      hash = if index.is_left_sibling() {
        self.combiner.combine(&hash, &sibling)
      } else {
        self.combiner.combine(&sibling, &hash)
      };
      index = index.parent()?;
      self.save_value(&index, &hash)?;
    }

    let count = leaf_index + 1;
    let root = self.combiner.combine(&hash, &Hash::from_count(count));
    self.store.set(COUNT_KEY, &encode_count(count))?;
    *state = State { count, root };
    debug!(leaf_index, %root, "leaf inserted");
    Ok(leaf_index)
  }

  fn count(&self) -> u32 {
    self.snapshot().count
  }

  fn root(&self) -> Hash {
    self.snapshot().root
  }

  fn get_proof(&self, leaf_index: u32) -> Result<Vec<Hash>> {
    let state = self.state.read()?;
    if leaf_index >= state.count {
      return Err(Error::InvalidState(format!(
        "proof requested for leaf {leaf_index} beyond the current count {}",
        state.count
      )));
    }

    let mut index = NodeIndex::leaf(leaf_index);
    let mut proof = Vec::with_capacity(index.row() as usize);
    while !index.is_root() {
      proof.push(self.load_value(&index.sibling()?)?);
      index = index.parent()?;
    }
    Ok(proof)
  }

  fn verify_proof(&self, leaf_index: u32, leaf: &Hash, proof: &[Hash]) -> Result<bool> {
    let state = self.snapshot();
    super::verify_proof(&self.combiner, &state.root, leaf_index, leaf, state.count, proof)
  }
}

#[cfg(test)]
mod test;
