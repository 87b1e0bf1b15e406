//! Content-addressed result cache
//!
//! Results are memoized under a digest of the compute identity and the
//! fully-resolved argument values. Entries live as one JSON file per key in
//! a cache directory; the same key written twice is last-writer-wins and
//! nothing is ever evicted.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde_json::json;
use sha2::{Digest, Sha256};

use blockflow_schema::{Args, Value};

use crate::errors::Result;

/// On-disk memoization store shared by cache-enabled blocks
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(CacheStore { root })
    }

    /// Open the store in the platform cache directory, falling back to a
    /// local `.cache` directory when none is available
    pub fn open_default() -> Result<Self> {
        let root = dirs::cache_dir()
            .map(|dir| dir.join("blockflow"))
            .unwrap_or_else(|| PathBuf::from(".cache"));
        CacheStore::open(root)
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Cache key for one invocation: a SHA-256 digest over the compute
    /// identity and the canonical JSON of every argument. Named arguments
    /// serialize in sorted key order, so logically-equal argument maps
    /// always produce the same key.
    pub fn key(&self, identity: &str, args: &Args) -> Result<String> {
        let canonical = serde_json::to_vec(&json!({
            "function": identity,
            "positional": args.positional,
            "named": args.named,
        }))?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Stored value for `key`, or `None` on a cache miss
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        match fs::read(self.entry_path(key)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn put(&self, key: &str, value: &Value) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        fs::write(self.entry_path(key), bytes)?;
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}
