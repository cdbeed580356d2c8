use std::thread;

use tempfile::tempdir;

use super::*;
use crate::hasher::{Blake3Combiner, HASH_SIZE, Sha256Combiner};
use crate::index::{FIRST_LEAF_NODE_INDEX, LEAF_ROW, TREE_HEIGHT};
use crate::storage::{MemKVS, RocksDBStore};
use crate::tree::compute_root;
use crate::leaf_value;

fn memory_tree() -> MerkleTree<MemKVS, Blake3Combiner> {
  MerkleTree::open(MemKVS::new(), Blake3Combiner).unwrap()
}

#[test]
fn empty_tree_commits_to_zero_count() {
  let tree = memory_tree();
  let zeros = Blake3Combiner.zero_hashes();
  assert_eq!(0, tree.count());
  assert_eq!(Blake3Combiner.combine(zeros.at_row(0), &Hash::from_count(0)), tree.root());
  assert!(tree.store().is_empty().unwrap());

  let tree = MerkleTree::open(MemKVS::new(), Sha256Combiner).unwrap();
  let zeros = Sha256Combiner.zero_hashes();
  assert_eq!(Sha256Combiner.combine(zeros.at_row(0), &Hash::zero()), tree.root());
}

#[test]
fn single_insertion_folds_leaf_with_zero_hashes() {
  let tree = memory_tree();
  let leaf = Hash::new([0xAB; HASH_SIZE]);
  assert_eq!(0, tree.insert(leaf).unwrap());

  let c = Blake3Combiner;
  let zeros = c.zero_hashes();
  let mut hash = leaf;
  for row in (1..=LEAF_ROW).rev() {
    hash = c.combine(&hash, zeros.at_row(row));
  }
  assert_eq!(c.combine(&hash, &Hash::from_count(1)), tree.root());
  assert_eq!(1, tree.count());

  // the leaf and its 32 ancestors, plus the count
  assert_eq!(TREE_HEIGHT as usize + 2, tree.store().len().unwrap());
}

#[test]
fn second_leaf_shares_every_ancestor() {
  let tree = memory_tree();
  tree.insert(leaf_value(1)).unwrap();
  tree.insert(leaf_value(2)).unwrap();
  assert_eq!(TREE_HEIGHT as usize + 3, tree.store().len().unwrap());

  let c = Blake3Combiner;
  let zeros = c.zero_hashes();
  let mut hash = c.combine(&leaf_value(1), &leaf_value(2));
  for row in (1..LEAF_ROW).rev() {
    hash = c.combine(&hash, zeros.at_row(row));
  }
  assert_eq!(c.combine(&hash, &Hash::from_count(2)), tree.root());
}

#[test]
fn count_grows_by_one_per_insertion() {
  let tree = memory_tree();
  let mut roots = Vec::new();
  for i in 0..100u32 {
    assert_eq!(i, tree.count());
    assert_eq!(i, tree.insert(leaf_value(i as u64)).unwrap());
    assert_eq!(i + 1, tree.count());
    roots.push(tree.root());
  }
  roots.sort();
  roots.dedup();
  assert_eq!(100, roots.len());
}

#[test]
fn same_leaves_with_different_counts_have_different_roots() {
  let a = memory_tree();
  let b = memory_tree();
  a.insert(leaf_value(1)).unwrap();
  b.insert(leaf_value(1)).unwrap();
  b.insert(Hash::zero()).unwrap();
  assert_ne!(a.root(), b.root());
}

#[test]
fn proofs_reproduce_root_across_row_transitions() {
  let tree = memory_tree();
  for n in 1..=64u32 {
    tree.insert(leaf_value(n as u64)).unwrap();
    for i in 0..n {
      let leaf = tree.get_leaf(i).unwrap();
      let proof = tree.get_proof(i).unwrap();
      assert!(tree.verify_proof(i, &leaf.hash, &proof).unwrap(), "n={n}, i={i}");
    }
  }

  for n in 65..=2100u32 {
    tree.insert(leaf_value(n as u64)).unwrap();
  }
  let root = tree.root();
  for i in 0..tree.count() {
    let leaf = tree.get_leaf(i).unwrap();
    assert_eq!(leaf_value(i as u64 + 1), leaf.hash);
    let proof = tree.get_proof(i).unwrap();
    assert_eq!(TREE_HEIGHT as usize, proof.len());
    assert_eq!(root, compute_root(&Blake3Combiner, i, &leaf.hash, tree.count(), &proof).unwrap(), "{i}");
  }
}

#[test]
fn tampered_proofs_are_rejected() {
  let tree = memory_tree();
  for i in 0..10 {
    tree.insert(leaf_value(i)).unwrap();
  }
  let leaf = tree.get_leaf(5).unwrap().hash;
  let mut proof = tree.get_proof(5).unwrap();
  assert!(tree.verify_proof(5, &leaf, &proof).unwrap());
  assert!(!tree.verify_proof(4, &leaf, &proof).unwrap());
  assert!(!tree.verify_proof(5, &leaf_value(99), &proof).unwrap());
  assert!(!tree.verify_proof(10, &leaf, &proof).unwrap());

  proof[3] = Hash::zero();
  assert!(!tree.verify_proof(5, &leaf, &proof).unwrap());
  proof.pop();
  assert!(matches!(tree.verify_proof(5, &leaf, &proof), Err(Error::InvalidData(_))));
}

#[test]
fn proof_beyond_count_is_invalid_state() {
  let tree = memory_tree();
  assert!(matches!(tree.get_proof(0), Err(Error::InvalidState(_))));
  tree.insert(leaf_value(0)).unwrap();
  assert!(tree.get_proof(0).is_ok());
  assert!(matches!(tree.get_proof(tree.count()), Err(Error::InvalidState(_))));
  assert!(matches!(tree.get_proof(u32::MAX), Err(Error::InvalidState(_))));
}

#[test]
fn unfilled_leaf_slots_read_as_zero() {
  let tree = memory_tree();
  tree.insert(leaf_value(7)).unwrap();
  let leaf = tree.get_leaf(0).unwrap();
  assert_eq!(leaf_value(7), leaf.hash);
  assert_eq!(FIRST_LEAF_NODE_INDEX, leaf.node_index);

  let empty = tree.get_leaf(u32::MAX).unwrap();
  assert_eq!(Hash::zero(), empty.hash);
  assert_eq!(FIRST_LEAF_NODE_INDEX + u32::MAX as u64, empty.node_index);
}

#[test]
fn get_leaves_preserves_order_and_duplicates() {
  let tree = memory_tree();
  for i in 0..5 {
    tree.insert(leaf_value(i)).unwrap();
  }
  let leaves = tree.get_leaves(&[3, 0, 3, 9]).unwrap();
  assert_eq!(
    vec![leaf_value(3), leaf_value(0), leaf_value(3), Hash::zero()],
    leaves.iter().map(|l| l.hash).collect::<Vec<_>>()
  );
  assert_eq!(FIRST_LEAF_NODE_INDEX + 9, leaves[3].node_index);
  assert!(tree.get_leaves(&[]).unwrap().is_empty());
}

#[test]
fn reopened_tree_restores_count_and_root() {
  let store = MemKVS::new();
  let (root, count) = {
    let tree = MerkleTree::open(store.clone(), Blake3Combiner).unwrap();
    for i in 0..37 {
      tree.insert(leaf_value(i)).unwrap();
    }
    (tree.root(), tree.count())
  };

  let tree = MerkleTree::open(store.clone(), Blake3Combiner).unwrap();
  assert_eq!(count, tree.count());
  assert_eq!(root, tree.root());

  tree.insert(leaf_value(37)).unwrap();
  let fresh = memory_tree();
  for i in 0..38 {
    fresh.insert(leaf_value(i)).unwrap();
  }
  assert_eq!(fresh.root(), tree.root());
}

#[test]
fn trees_on_rocksdb_match_trees_in_memory() {
  let dir = tempdir().unwrap();
  let memory = memory_tree();
  {
    let tree = MerkleTree::open(RocksDBStore::open(dir.path(), b"deposits").unwrap(), Blake3Combiner).unwrap();
    for i in 0..50 {
      tree.insert(leaf_value(i)).unwrap();
      memory.insert(leaf_value(i)).unwrap();
      assert_eq!(memory.root(), tree.root());
    }
  }

  let tree = MerkleTree::open(RocksDBStore::open(dir.path(), b"deposits").unwrap(), Blake3Combiner).unwrap();
  assert_eq!(50, tree.count());
  assert_eq!(memory.root(), tree.root());
  assert_eq!(memory.get_proof(17).unwrap(), tree.get_proof(17).unwrap());
}

#[test]
fn insertion_is_deterministic() {
  let a = MerkleTree::open(MemKVS::new(), Sha256Combiner).unwrap();
  let b = MerkleTree::open(MemKVS::new(), Sha256Combiner).unwrap();
  for i in 0..20 {
    a.insert(leaf_value(i)).unwrap();
  }
  for i in 0..20 {
    b.insert(leaf_value(i)).unwrap();
  }
  assert_eq!(a.root(), b.root());
  assert_ne!(a.root(), memory_tree().root());
}

#[test]
fn concurrent_insertions_are_serialized() {
  let tree = memory_tree();
  thread::scope(|s| {
    for t in 0..4u64 {
      let tree = &tree;
      s.spawn(move || {
        for i in 0..50 {
          tree.insert(leaf_value(t * 1000 + i)).unwrap();
          let n = tree.count();
          let proof = tree.get_proof(n - 1).unwrap();
          assert_eq!(TREE_HEIGHT as usize, proof.len());
        }
      });
    }
  });
  assert_eq!(200, tree.count());

  let leaves = tree.get_leaves(&(0..200).collect::<Vec<u32>>()).unwrap();
  let replay = memory_tree();
  for leaf in &leaves {
    replay.insert(leaf.hash).unwrap();
  }
  assert_eq!(replay.root(), tree.root());
  for i in 0..200 {
    assert!(tree.verify_proof(i, &leaves[i as usize].hash, &tree.get_proof(i).unwrap()).unwrap());
  }
}

#[test]
fn insertion_stops_at_capacity() {
  let store = MemKVS::new();
  store.set(COUNT_KEY, &encode_count(u32::MAX - 1)).unwrap();
  let tree = MerkleTree::open(store, Blake3Combiner).unwrap();
  assert_eq!(u32::MAX - 1, tree.insert(leaf_value(1)).unwrap());
  assert_eq!(u32::MAX, tree.count());

  let proof = tree.get_proof(u32::MAX - 1).unwrap();
  assert!(tree.verify_proof(u32::MAX - 1, &leaf_value(1), &proof).unwrap());

  let root = tree.root();
  assert!(matches!(tree.insert(leaf_value(2)), Err(Error::CapacityExceeded { count: u32::MAX })));
  assert_eq!(root, tree.root());
  assert_eq!(u32::MAX, tree.count());
}

#[test]
fn corrupted_store_values_are_reported() {
  let store = MemKVS::new();
  store.set(COUNT_KEY, &[1, 2, 3]).unwrap();
  assert!(matches!(MerkleTree::open(store, Blake3Combiner), Err(Error::InvalidData(_))));

  let store = MemKVS::new();
  let tree = MerkleTree::open(store.clone(), Blake3Combiner).unwrap();
  tree.insert(leaf_value(0)).unwrap();
  store.set(FIRST_LEAF_NODE_INDEX, &[0u8; 16]).unwrap();
  assert!(matches!(tree.get_leaf(0), Err(Error::InvalidData(_))));
  assert!(matches!(tree.insert(leaf_value(1)), Err(Error::InvalidData(_))));
}
