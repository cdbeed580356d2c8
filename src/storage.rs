use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use rocksdb::{DB, Options};

use crate::{Error, Result};

/// Byte-addressed map that keeps the tree's nodes, keyed by flat node index.
///
/// Implementations guarantee at most per-key atomicity. Reading a key that was never written must
/// return `Ok(None)`, not an error.
pub trait NodeStore {
  fn get(&self, key: u64) -> Result<Option<Vec<u8>>>;
  fn set(&self, key: u64, value: &[u8]) -> Result<()>;
}

impl<S: NodeStore + ?Sized> NodeStore for &S {
  fn get(&self, key: u64) -> Result<Option<Vec<u8>>> {
    (**self).get(key)
  }
  fn set(&self, key: u64, value: &[u8]) -> Result<()> {
    (**self).set(key, value)
  }
}

impl<S: NodeStore + ?Sized> NodeStore for Arc<S> {
  fn get(&self, key: u64) -> Result<Option<Vec<u8>>> {
    (**self).get(key)
  }
  fn set(&self, key: u64, value: &[u8]) -> Result<()> {
    (**self).set(key, value)
  }
}

/// In-memory store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemKVS {
  kvs: Arc<RwLock<HashMap<u64, Vec<u8>>>>,
}

impl MemKVS {
  pub fn new() -> Self {
    Self::with_kvs(Default::default())
  }

  pub fn with_kvs(kvs: Arc<RwLock<HashMap<u64, Vec<u8>>>>) -> Self {
    Self { kvs }
  }

  pub fn len(&self) -> Result<usize> {
    Ok(self.kvs.read()?.len())
  }

  pub fn is_empty(&self) -> Result<bool> {
    Ok(self.kvs.read()?.is_empty())
  }

  pub fn remove(&self, key: u64) -> Result<Option<Vec<u8>>> {
    Ok(self.kvs.write()?.remove(&key))
  }
}

impl NodeStore for MemKVS {
  fn get(&self, key: u64) -> Result<Option<Vec<u8>>> {
    Ok(self.kvs.read()?.get(&key).cloned())
  }

  fn set(&self, key: u64, value: &[u8]) -> Result<()> {
    self.kvs.write()?.insert(key, value.to_vec());
    Ok(())
  }
}

/// Store on a RocksDB instance that may be shared with other components. Every key is prefixed so
/// that the tree owns its own namespace.
pub struct RocksDBStore {
  db: Arc<DB>,
  prefix: Vec<u8>,
}

impl RocksDBStore {
  pub fn new(db: Arc<DB>, prefix: &[u8]) -> Self {
    RocksDBStore { db, prefix: prefix.to_vec() }
  }

  pub fn open<P: AsRef<Path>>(path: P, prefix: &[u8]) -> Result<Self> {
    let mut opts = Options::default();
    opts.create_if_missing(true);
    let db = DB::open(&opts, path)?;
    Ok(Self::new(Arc::new(db), prefix))
  }

  pub fn db(&self) -> &Arc<DB> {
    &self.db
  }

  fn key(&self, key: u64) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(self.prefix.len() + 8);
    buffer.extend_from_slice(&self.prefix);
    buffer.extend_from_slice(&[0u8; 8]);
    BigEndian::write_u64(&mut buffer[self.prefix.len()..], key);
    buffer
  }
}

impl NodeStore for RocksDBStore {
  fn get(&self, key: u64) -> Result<Option<Vec<u8>>> {
    Ok(self.db.get(self.key(key))?)
  }

  fn set(&self, key: u64, value: &[u8]) -> Result<()> {
    self.db.put(self.key(key), value)?;
    Ok(())
  }
}

pub const COUNT_SIZE: usize = 4;

pub fn encode_count(count: u32) -> [u8; COUNT_SIZE] {
  let mut buffer = [0u8; COUNT_SIZE];
  LittleEndian::write_u32(&mut buffer, count);
  buffer
}

pub fn decode_count(bytes: &[u8]) -> Result<u32> {
  if bytes.len() != COUNT_SIZE {
    return Err(Error::InvalidData(format!("a leaf count must be {COUNT_SIZE} bytes, but got {}", bytes.len())));
  }
  Ok(LittleEndian::read_u32(bytes))
}
