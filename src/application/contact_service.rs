// Contact service - Use case for listing and adding emergency contacts
use crate::application::ports::ContactStore;
use crate::domain::contact::Contact;
use crate::domain::error::SosError;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct ContactService {
    store: Arc<dyn ContactStore>,
    /// Serializes load-append-save so concurrent adds are not lost
    writes: Arc<Mutex<()>>,
}

impl ContactService {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self {
            store,
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Saved contacts in insertion order; nothing saved yet is an empty list
    pub async fn list(&self) -> Result<Vec<Contact>, SosError> {
        match self.store.load_contacts().await {
            Ok(contacts) => Ok(contacts),
            Err(SosError::StorageMiss(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Append a number. Duplicates are kept.
    pub async fn add(&self, raw: &str) -> Result<Vec<Contact>, SosError> {
        let contact = Contact::parse(raw)?;
        let _write = self.writes.lock().await;
        let mut contacts = self.list().await?;
        contacts.push(contact);
        self.store.save_contacts(&contacts).await?;
        tracing::info!("emergency contact added ({} saved)", contacts.len());
        Ok(contacts)
    }
}
