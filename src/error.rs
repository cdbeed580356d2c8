use std::sync::PoisonError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("index out of range: {0}")]
  Range(String),

  #[error("invalid state: {0}")]
  InvalidState(String),

  #[error("the tree is full: {count} leaves have been inserted")]
  CapacityExceeded { count: u32 },

  #[error("invalid stored data: {0}")]
  InvalidData(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  RocksDB(#[from] rocksdb::Error),

  #[error("lock poisoned")]
  LockPoisoned,
}

impl<T> From<PoisonError<T>> for Error {
  fn from(_: PoisonError<T>) -> Self {
    Error::LockPoisoned
  }
}

pub type Result<T> = std::result::Result<T, Error>;
