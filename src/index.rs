//! Coordinates of a node in the virtual complete binary tree of height [`TREE_HEIGHT`].
//!
//! A node is addressed either by its flat index, numbered breadth-first from the root, or by the
//! pair of its row and its position within that row:
//!
//! ```text
//! row 0:                0
//! row 1:          1           2
//! row 2:       3     4     5     6
//! ...
//! ```
//!
//! so that `flat = 2^row - 1 + index_at_row`, the parent of `flat` is `(flat + 1) / 2 - 1`, and the
//! leaves occupy row [`LEAF_ROW`].
use std::fmt::Display;

use crate::{Error, Result};

pub const TREE_HEIGHT: u32 = 32;
pub const LEAF_ROW: u32 = TREE_HEIGHT;
pub const MAX_NODES: u64 = (1u64 << (TREE_HEIGHT + 1)) - 1;
pub const MAX_NODE_INDEX: u64 = MAX_NODES - 1;
pub const FIRST_LEAF_NODE_INDEX: u64 = MAX_NODES / 2;

/// Reserved store key holding the leaf count. It lies outside `0..=MAX_NODE_INDEX`.
pub const COUNT_KEY: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex {
  row: u32,
  index_at_row: u32,
  flat: u64,
}

impl NodeIndex {
  /// Creates the coordinate of the node at `index_at_row` in `row`.
  pub fn new(row: u32, index_at_row: u32) -> Result<Self> {
    validate_row(row)?;
    if index_at_row as u64 > max_index_at_row(row) {
      return Err(Error::Range(format!(
        "row {row} only has indices between 0 and {}, but {index_at_row} was given",
        max_index_at_row(row)
      )));
    }
    Ok(NodeIndex { row, index_at_row, flat: first_node_index(row) + index_at_row as u64 })
  }

  /// Every `u32` is a valid position in the leaf row.
  pub fn leaf(index_at_row: u32) -> Self {
    NodeIndex { row: LEAF_ROW, index_at_row, flat: FIRST_LEAF_NODE_INDEX + index_at_row as u64 }
  }

  pub fn from_flat(flat: u64) -> Result<Self> {
    validate_node_index(flat)?;
    let row = u64::BITS - 1 - (flat + 1).leading_zeros();
    Ok(NodeIndex { row, index_at_row: (flat - first_node_index(row)) as u32, flat })
  }

  /// Creates the coordinate of `flat`, checking that it actually lies in `row`.
  pub fn from_row_and_flat(row: u32, flat: u64) -> Result<Self> {
    validate_row(row)?;
    let (min, max) = (first_node_index(row), last_node_index(row));
    if flat < min || flat > max {
      return Err(Error::Range(format!("node index at row {row} should be in [{min},{max}] and was {flat}")));
    }
    Ok(NodeIndex { row, index_at_row: (flat - min) as u32, flat })
  }

  pub fn row(&self) -> u32 {
    self.row
  }

  pub fn index_at_row(&self) -> u32 {
    self.index_at_row
  }

  pub fn flat(&self) -> u64 {
    self.flat
  }

  pub fn is_root(&self) -> bool {
    self.row == 0
  }

  pub fn is_leaf(&self) -> bool {
    self.row == LEAF_ROW
  }

  pub fn is_left_sibling(&self) -> bool {
    self.index_at_row % 2 == 0
  }

  /// Distance from the leaf row, the key of the zero-hash table.
  pub fn depth_from_leaf(&self) -> u32 {
    LEAF_ROW - self.row
  }

  pub fn parent(&self) -> Result<Self> {
    if self.is_root() {
      return Err(Error::Range("root node has no parent".to_string()));
    }
    Self::from_row_and_flat(self.row - 1, (self.flat + 1) / 2 - 1)
  }

  pub fn sibling(&self) -> Result<Self> {
    if self.is_root() {
      return Err(Error::Range("root node has no sibling".to_string()));
    }
    Self::new(self.row, self.index_at_row ^ 1)
  }
}

impl Display for NodeIndex {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} | ({},{})", self.flat, self.row, self.index_at_row)
  }
}

/// Position in the leaf row of the leaf with flat index `flat`.
pub fn leaf_index(flat: u64) -> Result<u32> {
  Ok(NodeIndex::from_row_and_flat(LEAF_ROW, flat)?.index_at_row())
}

pub fn node_index(row: u32, index_at_row: u32) -> Result<u64> {
  Ok(NodeIndex::new(row, index_at_row)?.flat())
}

pub fn sibling_index(row: u32, index_at_row: u32) -> Result<u32> {
  Ok(NodeIndex::new(row, index_at_row)?.sibling()?.index_at_row())
}

pub fn index_at_row(row: u32, flat: u64) -> Result<u32> {
  Ok(NodeIndex::from_row_and_flat(row, flat)?.index_at_row())
}

pub fn row_of(flat: u64) -> Result<u32> {
  Ok(NodeIndex::from_flat(flat)?.row())
}

pub fn parent_index(flat: u64) -> Result<u64> {
  Ok(NodeIndex::from_flat(flat)?.parent()?.flat())
}

#[inline]
fn first_node_index(row: u32) -> u64 {
  (1u64 << row) - 1
}

#[inline]
fn last_node_index(row: u32) -> u64 {
  (1u64 << (row + 1)) - 2
}

#[inline]
fn max_index_at_row(row: u32) -> u64 {
  (1u64 << row) - 1
}

fn validate_row(row: u32) -> Result<()> {
  if row > LEAF_ROW {
    return Err(Error::Range(format!("tree row should be between 0 and {LEAF_ROW}, but {row} was given")));
  }
  Ok(())
}

fn validate_node_index(flat: u64) -> Result<()> {
  if flat > MAX_NODE_INDEX {
    return Err(Error::Range(format!("node index should be between 0 and {MAX_NODE_INDEX}, but {flat} was given")));
  }
  Ok(())
}
