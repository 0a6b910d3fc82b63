//! Storage seam for group books
//!
//! The ledger never publishes a staged book before [`Storage::commit`] returned
//! `Ok`, so a backend failure leaves the previously committed state in place.
//!
//! # Backends
//!
//! - [`MemoryStorage`] - process-local, for tests and embedding
//! - [`FileStorage`] - one JSON document per group under `data_dir`

use crate::{
    balances::GroupBook,
    error::{Error, Result},
    types::GroupId,
};
use dashmap::DashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Persistence backend for group books
pub trait Storage: Send + Sync {
    /// Load the committed book of a group, `None` if the group was never written
    fn load(&self, group_id: &GroupId) -> Result<Option<GroupBook>>;

    /// Persist a book atomically, replacing the previous version
    fn commit(&self, book: &GroupBook) -> Result<()>;
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    fn load(&self, group_id: &GroupId) -> Result<Option<GroupBook>> {
        (**self).load(group_id)
    }

    fn commit(&self, book: &GroupBook) -> Result<()> {
        (**self).commit(book)
    }
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    books: DashMap<GroupId, GroupBook>,
}

impl MemoryStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored groups
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// No group stored yet
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn load(&self, group_id: &GroupId) -> Result<Option<GroupBook>> {
        Ok(self.books.get(group_id).map(|book| book.clone()))
    }

    fn commit(&self, book: &GroupBook) -> Result<()> {
        self.books.insert(book.group_id.clone(), book.clone());
        Ok(())
    }
}

/// JSON file storage
///
/// Writes go to a temporary sibling file which is then renamed over the
/// group's document.
#[derive(Debug)]
pub struct FileStorage {
    data_dir: PathBuf,
}

impl FileStorage {
    /// Open or create the data directory
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        tracing::info!("Opened file storage at {:?}", data_dir);

        Ok(Self { data_dir })
    }

    /// Data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, group_id: &GroupId) -> Result<PathBuf> {
        let name = group_id.as_str();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::InvalidInput(format!(
                "group id {:?} cannot be used as a file name",
                name
            )));
        }
        Ok(self.data_dir.join(format!("{}.json", name)))
    }
}

impl Storage for FileStorage {
    fn load(&self, group_id: &GroupId) -> Result<Option<GroupBook>> {
        let path = self.path_for(group_id)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Storage(format!("read {:?}: {}", path, e))),
        };

        let book: GroupBook = serde_json::from_str(&content)?;
        Ok(Some(book))
    }

    fn commit(&self, book: &GroupBook) -> Result<()> {
        let path = self.path_for(&book.group_id)?;
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(book)?;

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            Error::Storage(format!("commit {:?}: {}", path, e))
        })?;

        tracing::debug!(
            group = %book.group_id,
            version = book.version,
            "Committed group book to {:?}",
            path
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use rust_decimal::Decimal;

    fn sample_book() -> GroupBook {
        let mut book = GroupBook::new(GroupId::new("flat-42"));
        book.balances.apply(&UserId::new("alice"), Decimal::new(2500, 2)).unwrap();
        book.balances.apply(&UserId::new("bob"), Decimal::new(-2500, 2)).unwrap();
        book.version = 3;
        book
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        let group = GroupId::new("flat-42");
        assert!(storage.load(&group).unwrap().is_none());

        storage.commit(&sample_book()).unwrap();
        assert_eq!(storage.load(&group).unwrap(), Some(sample_book()));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_file_storage_commit_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(temp_dir.path().join("books")).unwrap();
        let group = GroupId::new("flat-42");

        assert!(storage.load(&group).unwrap().is_none());
        storage.commit(&sample_book()).unwrap();

        // A fresh handle sees the committed document
        let reopened = FileStorage::open(temp_dir.path().join("books")).unwrap();
        assert_eq!(reopened.load(&group).unwrap(), Some(sample_book()));
        assert!(!temp_dir.path().join("books/flat-42.json.tmp").exists());
    }

    #[test]
    fn test_file_storage_rejects_path_like_group_ids() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        let result = storage.load(&GroupId::new("../escape"));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
