// Firestore client - Alert records and user profiles through the REST API
use crate::application::ports::{EventSink, ProfileStore};
use crate::domain::alert::AlertRecord;
use crate::domain::error::SosError;
use crate::domain::profile::PersonalInfo;
use crate::infrastructure::config::FirestoreSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone)]
pub struct FirestoreClient {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    api_key: String,
    alerts: String,
    users: String,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreClient {
    pub fn new(settings: &FirestoreSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            project_id: settings.project_id.clone(),
            api_key: settings.api_key.clone(),
            alerts: settings.collection.clone(),
            users: settings.users_collection.clone(),
        }
    }

    /// Document or collection URL; every path segment is encoded
    fn build_url(&self, path: &[&str]) -> String {
        let path: Vec<String> = path.iter().map(|p| urlencoding::encode(p).into_owned()).collect();
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}?key={}",
            self.base_url,
            urlencoding::encode(&self.project_id),
            path.join("/"),
            urlencoding::encode(&self.api_key)
        )
    }

    async fn create_document(&self, collection: &str, fields: Map<String, Value>) -> Result<String> {
        let response = self
            .client
            .post(self.build_url(&[collection]))
            .header("Accept", "application/json")
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .context("Failed to send request to Firestore")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Firestore write failed with status {}: {}", status, body);
        }

        let created = response
            .json::<Document>()
            .await
            .context("Failed to parse Firestore response")?;
        Ok(created.name)
    }

    /// `Ok(None)` when the document does not exist
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let response = self
            .client
            .get(self.build_url(&[collection, id]))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to Firestore")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Firestore read failed with status {}: {}", status, body);
        }

        let document = response
            .json::<Document>()
            .await
            .context("Failed to parse Firestore document")?;
        Ok(Some(document))
    }

    /// Create or fully replace a document
    async fn set_document(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        let response = self
            .client
            .patch(self.build_url(&[collection, id]))
            .header("Accept", "application/json")
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .context("Failed to send request to Firestore")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Firestore write failed with status {}: {}", status, body);
        }
        Ok(())
    }
}

/// Firestore typed values for one alert record
fn alert_fields(record: &AlertRecord) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("timestamp".into(), json!({ "stringValue": record.timestamp }));
    if let Some(latitude) = record.latitude {
        fields.insert("latitude".into(), json!({ "doubleValue": latitude }));
    }
    if let Some(longitude) = record.longitude {
        fields.insert("longitude".into(), json!({ "doubleValue": longitude }));
    }
    fields.insert("contact".into(), json!({ "stringValue": record.contact }));
    fields.insert("method".into(), json!({ "stringValue": record.method }));
    if let Some(status) = &record.status {
        fields.insert("status".into(), json!({ "stringValue": status }));
    }
    fields
}

fn profile_fields(info: &PersonalInfo) -> Map<String, Value> {
    PersonalInfo::FIELDS
        .iter()
        .filter_map(|name| info.field(name).map(|v| (name.to_string(), json!({ "stringValue": v }))))
        .collect()
}

/// Unknown fields and non-string values are skipped
fn profile_from_fields(fields: &Map<String, Value>) -> PersonalInfo {
    let mut info = PersonalInfo::default();
    for name in PersonalInfo::FIELDS {
        let value = fields
            .get(name)
            .and_then(|v| v.get("stringValue"))
            .and_then(Value::as_str);
        if let Some(value) = value {
            info.set_field(name, value.to_string());
        }
    }
    info
}

#[async_trait]
impl EventSink for FirestoreClient {
    async fn append(&self, record: &AlertRecord) -> Result<(), SosError> {
        let name = self
            .create_document(&self.alerts, alert_fields(record))
            .await
            .map_err(|e| SosError::RemoteWriteFailure(format!("{:#}", e)))?;
        tracing::debug!("alert record stored as {}", name);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FirestoreClient {
    async fn load_profile(&self, user_id: &str) -> Result<PersonalInfo, SosError> {
        let document = self.get_document(&self.users, user_id).await.map_err(|e| {
            tracing::error!("profile {} not loaded: {:#}", user_id, e);
            SosError::ResourceUnavailable("Profile storage".to_string())
        })?;
        match document {
            Some(document) => {
                tracing::debug!("profile loaded from {}", document.name);
                Ok(profile_from_fields(&document.fields))
            }
            None => Err(SosError::StorageMiss("personal information".to_string())),
        }
    }

    async fn save_profile(&self, user_id: &str, info: &PersonalInfo) -> Result<(), SosError> {
        self.set_document(&self.users, user_id, profile_fields(info))
            .await
            .map_err(|e| SosError::RemoteWriteFailure(format!("{:#}", e)))
    }
}
