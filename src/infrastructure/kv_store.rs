// Key-value store - One JSON file per key under the data directory
use crate::application::ports::{ChecklistStore, ContactStore};
use crate::domain::contact::{Checklist, Contact};
use crate::domain::error::SosError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

pub const CONTACTS_KEY: &str = "emergency_contacts";
pub const CHECKLIST_KEY: &str = "trekking_checklist_v3";

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// `Ok(None)` when the key was never written
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };
        let value = serde_json::from_slice(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(value))
    }

    /// Replace the whole value; readers never observe a half-written file
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.path_for(key);
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!(".{}.{}.{}.json.tmp", key, std::process::id(), seq));
        let raw = serde_json::to_vec(value).context("Failed to serialize value")?;
        tokio::fs::write(&tmp, raw)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

fn storage_error(e: anyhow::Error) -> SosError {
    tracing::error!("storage: {:#}", e);
    SosError::ResourceUnavailable("storage".to_string())
}

#[async_trait]
impl ContactStore for JsonFileStore {
    async fn load_contacts(&self) -> Result<Vec<Contact>, SosError> {
        self.get::<Vec<Contact>>(CONTACTS_KEY)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| SosError::StorageMiss("emergency contacts".to_string()))
    }

    async fn save_contacts(&self, contacts: &[Contact]) -> Result<(), SosError> {
        self.set(CONTACTS_KEY, contacts).await.map_err(storage_error)
    }
}

#[async_trait]
impl ChecklistStore for JsonFileStore {
    async fn load_checklist(&self) -> Result<Checklist, SosError> {
        self.get::<Checklist>(CHECKLIST_KEY)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| SosError::StorageMiss("checklist".to_string()))
    }

    async fn save_checklist(&self, checklist: &Checklist) -> Result<(), SosError> {
        self.set(CHECKLIST_KEY, checklist).await.map_err(storage_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_storage_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(matches!(store.load_contacts().await, Err(SosError::StorageMiss(_))));
        assert!(matches!(store.load_checklist().await, Err(SosError::StorageMiss(_))));
    }

    #[tokio::test]
    async fn test_contacts_stored_as_string_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));
        let contacts = vec![Contact::parse("111").unwrap(), Contact::parse("222").unwrap()];
        store.save_contacts(&contacts).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("nested/emergency_contacts.json")).unwrap();
        assert_eq!(raw, r#"["111","222"]"#);
        assert_eq!(store.load_contacts().await.unwrap(), contacts);
    }

    #[tokio::test]
    async fn test_checklist_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let mut checklist = Checklist::default();
        checklist.toggle("1");
        store.save_checklist(&checklist).await.unwrap();

        assert_eq!(store.load_checklist().await.unwrap(), checklist);
        assert!(dir.path().join("trekking_checklist_v3.json").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_to_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        let writes = (0..20).map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.set(CONTACTS_KEY, &vec![i.to_string()]).await })
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap().unwrap();
        }

        let saved: Vec<String> = store.get(CONTACTS_KEY).await.unwrap().unwrap();
        assert_eq!(saved.len(), 1);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_not_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("emergency_contacts.json"), "{not json").unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(matches!(
            store.load_contacts().await,
            Err(SosError::ResourceUnavailable(_))
        ));
    }
}
