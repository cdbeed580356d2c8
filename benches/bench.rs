use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use tempfile::tempdir;

use merkle_accumulator::{
  Blake3Combiner, MemKVS, MerkleList as _, MerkleTree, RocksDBStore, Sha256Combiner, leaf_value,
};

fn bench_insert(c: &mut Criterion) {
  c.bench_function("insert memory blake3", |b| {
    let tree = MerkleTree::open(MemKVS::new(), Blake3Combiner).unwrap();
    b.iter(|| tree.insert(leaf_value(tree.count() as u64)).unwrap());
  });

  c.bench_function("insert memory sha256", |b| {
    let tree = MerkleTree::open(MemKVS::new(), Sha256Combiner).unwrap();
    b.iter(|| tree.insert(leaf_value(tree.count() as u64)).unwrap());
  });

  c.bench_function("insert rocksdb blake3", |b| {
    let dir = tempdir().unwrap();
    let tree = MerkleTree::open(RocksDBStore::open(dir.path(), b"").unwrap(), Blake3Combiner).unwrap();
    b.iter(|| tree.insert(leaf_value(tree.count() as u64)).unwrap());
  });
}

fn bench_proof(c: &mut Criterion) {
  let tree = MerkleTree::open(MemKVS::new(), Blake3Combiner).unwrap();
  for i in 0..4096 {
    tree.insert(leaf_value(i)).unwrap();
  }
  let mut i = 0u32;
  c.bench_function("proof memory blake3", |b| {
    b.iter_batched(
      || {
        i = (i + 7919) % tree.count();
        i
      },
      |i| {
        let proof = tree.get_proof(i).unwrap();
        tree.verify_proof(i, &leaf_value(i as u64), &proof).unwrap()
      },
      BatchSize::SmallInput,
    )
  });
}

criterion_group!(benches, bench_insert, bench_proof);
criterion_main!(benches);
