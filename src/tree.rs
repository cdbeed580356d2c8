use crate::hasher::{Combiner, Hash};
use crate::index::TREE_HEIGHT;
use crate::{Error, Result};

pub mod incremental;

/// Core append-only Merkle list abstraction
pub trait MerkleList {
  type Error;

  /// Append a new leaf and return its index
  fn insert(&self, leaf: Hash) -> std::result::Result<u32, Self::Error>;

  /// Get the current number of leaves
  fn count(&self) -> u32;

  /// Get the root committed by the last insertion
  fn root(&self) -> Hash;

  /// Generate the sibling path for given leaf, ordered from the leaf row up to the root
  fn get_proof(&self, leaf_index: u32) -> std::result::Result<Vec<Hash>, Self::Error>;

  /// Verify a path from leaf to the current root
  fn verify_proof(&self, leaf_index: u32, leaf: &Hash, proof: &[Hash]) -> std::result::Result<bool, Self::Error>;
}

/// A leaf hash together with the flat index it is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafNode {
  pub hash: Hash,
  pub node_index: u64,
}

/// Recomputes the root that a tree of `count` leaves commits to, given a leaf and its proof.
///
/// Bit `i` of `leaf_index` tells whether the accumulated hash is the right (1) or left (0) child
/// when it is combined with `proof[i]`.
pub fn compute_root<C: Combiner + ?Sized>(
  combiner: &C,
  leaf_index: u32,
  leaf: &Hash,
  count: u32,
  proof: &[Hash],
) -> Result<Hash> {
  if proof.len() != TREE_HEIGHT as usize {
    return Err(Error::InvalidData(format!("a proof must have {TREE_HEIGHT} elements, but got {}", proof.len())));
  }
  let mut hash = *leaf;
  for (level, sibling) in proof.iter().enumerate() {
    hash = if (leaf_index >> level) & 1 == 0 { combiner.combine(&hash, sibling) } else { combiner.combine(sibling, &hash) };
  }
  Ok(combiner.combine(&hash, &Hash::from_count(count)))
}

/// Checks `proof` against the root a tree of `count` leaves would publish.
pub fn verify_proof<C: Combiner + ?Sized>(
  combiner: &C,
  root: &Hash,
  leaf_index: u32,
  leaf: &Hash,
  count: u32,
  proof: &[Hash],
) -> Result<bool> {
  if leaf_index >= count {
    return Ok(false);
  }
  Ok(compute_root(combiner, leaf_index, leaf, count, proof)? == *root)
}
