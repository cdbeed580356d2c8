use std::fs::{metadata, read_dir};
use std::path::Path;

pub mod error;
pub mod hasher;
pub mod index;
pub mod storage;
pub mod tree;

pub use error::{Error, Result};
pub use hasher::{Blake3Combiner, Combiner, HASH_SIZE, Hash, Sha256Combiner, ZeroHashes};
pub use index::{NodeIndex, TREE_HEIGHT};
pub use storage::{MemKVS, NodeStore, RocksDBStore};
pub use tree::incremental::MerkleTree;
pub use tree::{LeafNode, MerkleList, compute_root, verify_proof};

pub fn splitmix64(x: u64) -> u64 {
  let mut z = x.wrapping_add(0x9e3779b97f4a7c15);
  z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
  z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
  z ^ (z >> 31)
}

/// Deterministic pseudo-random leaf for the `i`-th test or benchmark value.
pub fn leaf_value(i: u64) -> Hash {
  let mut value = [0u8; HASH_SIZE];
  for (k, chunk) in value.chunks_exact_mut(8).enumerate() {
    chunk.copy_from_slice(&splitmix64(i.wrapping_mul(4).wrapping_add(k as u64)).to_le_bytes());
  }
  Hash::new(value)
}

pub fn file_size<P: AsRef<Path>>(path: P) -> u64 {
  if path.as_ref().is_file() {
    metadata(&path).map(|m| m.len()).unwrap_or(0)
  } else if path.as_ref().is_dir() {
    read_dir(path)
      .map(|entries| {
        entries
          .flat_map(std::result::Result::ok)
          .map(|e| {
            let path = e.path();
            if path.is_dir() { file_size(&path) } else { metadata(&path).map(|m| m.len()).unwrap_or(0) }
          })
          .sum()
      })
      .unwrap_or(0)
  } else {
    0
  }
}
