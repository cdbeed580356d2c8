use std::fmt::{Debug, Display};

use byteorder::{ByteOrder, LittleEndian};
use sha2::{Digest, Sha256};

use crate::index::{LEAF_ROW, TREE_HEIGHT};
use crate::{Error, Result};

pub const HASH_SIZE: usize = 32;

/// A 32-byte digest stored for every node of the tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash {
  pub value: [u8; HASH_SIZE],
}

impl Hash {
  pub const fn new(value: [u8; HASH_SIZE]) -> Self {
    Hash { value }
  }

  pub const fn zero() -> Self {
    Hash { value: [0u8; HASH_SIZE] }
  }

  pub fn from_slice(bytes: &[u8]) -> Result<Self> {
    let value: [u8; HASH_SIZE] = bytes
      .try_into()
      .map_err(|_| Error::InvalidData(format!("a hash must be {HASH_SIZE} bytes, but got {}", bytes.len())))?;
    Ok(Hash { value })
  }

  /// The leaf count as it is folded into the root: 4 little-endian bytes padded with zeros.
  pub fn from_count(count: u32) -> Self {
    let mut value = [0u8; HASH_SIZE];
    LittleEndian::write_u32(&mut value[..4], count);
    Hash { value }
  }

  pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
    &self.value
  }

  pub fn to_hex(&self) -> String {
    hex::encode(self.value)
  }
}

impl From<[u8; HASH_SIZE]> for Hash {
  fn from(value: [u8; HASH_SIZE]) -> Self {
    Hash { value }
  }
}

impl AsRef<[u8]> for Hash {
  fn as_ref(&self) -> &[u8] {
    &self.value
  }
}

impl Display for Hash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.to_hex())
  }
}

impl Debug for Hash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Hash({})", self.to_hex())
  }
}

/// Hash function used to combine two child nodes into their parent.
pub trait Combiner {
  fn combine(&self, left: &Hash, right: &Hash) -> Hash;

  /// Hashes of the empty subtrees for this combiner. The tree computes the table once when it is
  /// opened.
  fn zero_hashes(&self) -> ZeroHashes {
    ZeroHashes::derive(self)
  }
}

/// Hash of an entirely empty subtree, one per depth from the leaf row.
///
/// Depth 0 is the all-zero leaf and depth `d + 1` combines two copies of depth `d`, so the entry
/// for the root row is at depth [`TREE_HEIGHT`].
#[derive(Clone, PartialEq, Eq)]
pub struct ZeroHashes {
  table: [Hash; TREE_HEIGHT as usize + 1],
}

impl ZeroHashes {
  pub fn derive<C: Combiner + ?Sized>(combiner: &C) -> Self {
    let mut table = [Hash::zero(); TREE_HEIGHT as usize + 1];
    for depth in 1..table.len() {
      table[depth] = combiner.combine(&table[depth - 1], &table[depth - 1]);
    }
    ZeroHashes { table }
  }

  pub fn by_depth(&self, depth: u32) -> &Hash {
    &self.table[depth as usize]
  }

  pub fn at_row(&self, row: u32) -> &Hash {
    debug_assert!(row <= LEAF_ROW);
    &self.table[(LEAF_ROW - row) as usize]
  }

  pub fn iter(&self) -> impl Iterator<Item = &Hash> {
    self.table.iter()
  }
}

impl Debug for ZeroHashes {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_list().entries(self.table.iter()).finish()
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Combiner;

impl Combiner for Blake3Combiner {
  fn combine(&self, left: &Hash, right: &Hash) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Hash::new(*hasher.finalize().as_bytes())
  }
}

/// SHA-256 over the concatenated children, as beacon-chain deposit trees do.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Combiner;

impl Combiner for Sha256Combiner {
  fn combine(&self, left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Hash::new(hasher.finalize().into())
  }
}
