use crate::error::Result;

/// Abstract interface for raw key/value storage I/O.
///
/// This trait handles the "how" of storage (filesystem vs memory), while
/// [`TabStorage`](super::TabStorage) handles the "what" (record shapes,
/// versions, namespacing).
///
/// All methods take `&self`; implementations handle their own interior
/// mutability.
pub trait StorageBackend {
    /// Read the raw value stored under `key`.
    /// Returns Ok(None) if nothing is stored there.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing what was there.
    /// MUST be atomic (e.g. write to tmp then rename) to avoid partial writes.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// List every stored key.
    fn keys(&self) -> Result<Vec<String>>;
}
