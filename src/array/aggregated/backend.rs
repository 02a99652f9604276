use std::{collections::HashMap, fmt::Debug, sync::Arc};

use parking_lot::RwLock;
use url::Url;

use crate::storage::{store::JsonFileStore, ReadableStorage, StorageError};

/// A fragment storage backend.
///
/// A backend opens the store at a fragment location.
/// Backends are tried in order for each fragment location until one opens it.
pub trait FragmentBackend: Send + Sync + Debug {
    /// The name of the backend.
    fn name(&self) -> &str;

    /// Open the store at `location`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the backend does not support `location` or the store cannot be opened.
    fn open(&self, location: &Url) -> Result<ReadableStorage, StorageError>;
}

/// Opens local JSON files with [`JsonFileStore`].
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFileBackend;

impl FragmentBackend for JsonFileBackend {
    fn name(&self) -> &str {
        "json"
    }

    fn open(&self, location: &Url) -> Result<ReadableStorage, StorageError> {
        if location.scheme() != "file" {
            return Err(StorageError::UnsupportedLocation(location.to_string()));
        }
        let path = location
            .to_file_path()
            .map_err(|()| StorageError::UnsupportedLocation(location.to_string()))?;
        Ok(Arc::new(JsonFileStore::open(path)?))
    }
}

/// Opens stores registered at a location.
///
/// Useful for fragments held in memory or in stores opened by the caller.
#[derive(Debug, Default)]
pub struct RegisteredStoresBackend {
    stores: RwLock<HashMap<Url, ReadableStorage>>,
}

impl RegisteredStoresBackend {
    /// Create a new backend without registered stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `storage` at `location`, replacing any store registered there.
    pub fn register(&self, location: Url, storage: ReadableStorage) {
        self.stores.write().insert(location, storage);
    }

    /// Remove the store registered at `location`.
    ///
    /// Returns true if a store was registered.
    pub fn unregister(&self, location: &Url) -> bool {
        self.stores.write().remove(location).is_some()
    }
}

impl FragmentBackend for RegisteredStoresBackend {
    fn name(&self) -> &str {
        "registered"
    }

    fn open(&self, location: &Url) -> Result<ReadableStorage, StorageError> {
        self.stores
            .read()
            .get(location)
            .cloned()
            .ok_or_else(|| StorageError::UnsupportedLocation(location.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::{
        array::{Block, DataType},
        storage::{
            store::{JsonVariable, MemoryStore},
            ReadableStorageTraits,
        },
    };

    use super::*;

    #[test]
    fn json_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fragment.json");
        let block = Block::from_elements(vec![2], vec![1.0, 2.0]).unwrap();
        JsonFileStore::create(
            &path,
            BTreeMap::from([("tas".to_string(), JsonVariable::new(DataType::Float64, &block))]),
        )
        .unwrap();
        let storage = JsonFileBackend
            .open(&Url::from_file_path(&path).unwrap())
            .unwrap();
        assert_eq!(storage.read_all("tas").unwrap(), block);

        assert!(matches!(
            JsonFileBackend.open(&Url::parse("https://example.com/fragment.json").unwrap()),
            Err(StorageError::UnsupportedLocation(_))
        ));
        assert!(JsonFileBackend
            .open(&Url::from_file_path(dir.path().join("missing.json")).unwrap())
            .is_err());
    }

    #[test]
    fn registered_stores_backend() {
        let backend = RegisteredStoresBackend::new();
        let location = Url::parse("memory://fragments/a").unwrap();
        assert!(backend.open(&location).is_err());
        backend.register(
            location.clone(),
            Arc::new(MemoryStore::new().with("tas", Block::filled(&[1], 1.0))),
        );
        assert_eq!(backend.name(), "registered");
        assert_eq!(
            backend.open(&location).unwrap().shape("tas").unwrap(),
            vec![1]
        );
        assert!(backend.unregister(&location));
    }
}
