use std::path::PathBuf;
use std::time::{Duration, Instant};

use merkle_accumulator::{
  Combiner, MemKVS, MerkleList, MerkleTree, NodeStore, Result, RocksDBStore, file_size, leaf_value,
};
use rand::Rng;
use tempfile::{Builder, TempDir};

/// One measured operation against a freshly prepared tree of `n` leaves.
pub trait Driver<T> {
  fn setup(&mut self, n: u32) -> Result<T>;
  fn run(&mut self, target: &mut T, n: u32) -> Result<Duration>;
  fn size(&self, _target: &T) -> u64 {
    0
  }
  fn cleanup(&mut self, target: T) -> Result<()> {
    drop(target);
    Ok(())
  }
}

#[inline(never)]
fn insert<S: NodeStore, C: Combiner>(tree: &MerkleTree<S, C>, n: u32) -> Result<Duration> {
  let start = Instant::now();
  for _ in 0..n {
    tree.insert(leaf_value(tree.count() as u64))?;
  }
  Ok(start.elapsed())
}

#[inline(never)]
fn query<S: NodeStore, C: Combiner>(tree: &MerkleTree<S, C>, queries: usize) -> Result<Duration> {
  let count = tree.count();
  if count == 0 {
    return Ok(Duration::ZERO);
  }
  let mut rng = rand::rng();
  let is = (0..queries).map(|_| rng.random_range(0..count)).collect::<Vec<_>>();
  let start = Instant::now();
  for i in is {
    let leaf = tree.get_leaf(i)?;
    let proof = tree.get_proof(i)?;
    assert!(tree.verify_proof(i, &leaf.hash, &proof)?, "invalid proof at {i}");
  }
  Ok(start.elapsed())
}

/// Builds the tree up to `n` leaves if it has fewer.
fn ensure<S: NodeStore, C: Combiner>(tree: &MerkleTree<S, C>, n: u32) -> Result<()> {
  while tree.count() < n {
    tree.insert(leaf_value(tree.count() as u64))?;
  }
  Ok(())
}

pub struct MemoryInsertDriver<C: Combiner + Copy> {
  combiner: C,
}
impl<C: Combiner + Copy> MemoryInsertDriver<C> {
  pub fn new(combiner: C) -> Self {
    MemoryInsertDriver { combiner }
  }
}
impl<C: Combiner + Copy> Driver<MerkleTree<MemKVS, C>> for MemoryInsertDriver<C> {
  fn setup(&mut self, _n: u32) -> Result<MerkleTree<MemKVS, C>> {
    MerkleTree::open(MemKVS::new(), self.combiner)
  }
  fn run(&mut self, tree: &mut MerkleTree<MemKVS, C>, n: u32) -> Result<Duration> {
    insert(tree, n)
  }
}

pub struct RocksDBInsertDriver<C: Combiner + Copy> {
  combiner: C,
  dir: PathBuf,
  work: Option<TempDir>,
}
impl<C: Combiner + Copy> RocksDBInsertDriver<C> {
  pub fn new(combiner: C, dir: PathBuf) -> Self {
    RocksDBInsertDriver { combiner, dir, work: None }
  }
}
impl<C: Combiner + Copy> Driver<MerkleTree<RocksDBStore, C>> for RocksDBInsertDriver<C> {
  fn setup(&mut self, _n: u32) -> Result<MerkleTree<RocksDBStore, C>> {
    let work = Builder::new().prefix(".tmp-rocksdb-insert").tempdir_in(&self.dir)?;
    let store = RocksDBStore::open(work.path(), b"")?;
    self.work = Some(work);
    MerkleTree::open(store, self.combiner)
  }
  fn run(&mut self, tree: &mut MerkleTree<RocksDBStore, C>, n: u32) -> Result<Duration> {
    insert(tree, n)
  }
  fn size(&self, _tree: &MerkleTree<RocksDBStore, C>) -> u64 {
    self.work.as_ref().map(|work| file_size(work.path())).unwrap_or(0)
  }
  fn cleanup(&mut self, tree: MerkleTree<RocksDBStore, C>) -> Result<()> {
    drop(tree);
    if let Some(work) = self.work.take() {
      work.close()?;
    }
    Ok(())
  }
}

/// Keeps one tree across the whole series and grows it to each `n` before querying.
pub struct MemoryProofDriver<C: Combiner + Copy> {
  tree: Option<MerkleTree<MemKVS, C>>,
  combiner: C,
  queries: usize,
}
impl<C: Combiner + Copy> MemoryProofDriver<C> {
  pub fn new(combiner: C, queries: usize) -> Self {
    MemoryProofDriver { tree: None, combiner, queries }
  }
}
impl<C: Combiner + Copy> Driver<MerkleTree<MemKVS, C>> for MemoryProofDriver<C> {
  fn setup(&mut self, n: u32) -> Result<MerkleTree<MemKVS, C>> {
    let tree = match self.tree.take() {
      Some(tree) => tree,
      None => MerkleTree::open(MemKVS::new(), self.combiner)?,
    };
    ensure(&tree, n)?;
    Ok(tree)
  }
  fn run(&mut self, tree: &mut MerkleTree<MemKVS, C>, _n: u32) -> Result<Duration> {
    query(tree, self.queries)
  }
  fn cleanup(&mut self, tree: MerkleTree<MemKVS, C>) -> Result<()> {
    self.tree = Some(tree);
    Ok(())
  }
}

pub struct RocksDBProofDriver<C: Combiner + Copy> {
  combiner: C,
  work: TempDir,
  queries: usize,
}
impl<C: Combiner + Copy> RocksDBProofDriver<C> {
  pub fn new(combiner: C, dir: PathBuf, queries: usize) -> Result<Self> {
    let work = Builder::new().prefix(".tmp-rocksdb-proof").tempdir_in(dir)?;
    Ok(RocksDBProofDriver { combiner, work, queries })
  }
}
impl<C: Combiner + Copy> Driver<MerkleTree<RocksDBStore, C>> for RocksDBProofDriver<C> {
  fn setup(&mut self, n: u32) -> Result<MerkleTree<RocksDBStore, C>> {
    let tree = MerkleTree::open(RocksDBStore::open(self.work.path(), b"")?, self.combiner)?;
    ensure(&tree, n)?;
    Ok(tree)
  }
  fn run(&mut self, tree: &mut MerkleTree<RocksDBStore, C>, _n: u32) -> Result<Duration> {
    query(tree, self.queries)
  }
  fn size(&self, _tree: &MerkleTree<RocksDBStore, C>) -> u64 {
    file_size(self.work.path())
  }
}
