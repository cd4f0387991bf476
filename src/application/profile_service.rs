// Profile service - Personal information shown to responders
use crate::application::ports::ProfileStore;
use crate::domain::error::SosError;
use crate::domain::profile::PersonalInfo;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    /// False until the user saves once; the form then starts empty
    pub has_data: bool,
    pub info: PersonalInfo,
}

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self, user_id: &str) -> Result<ProfileView, SosError> {
        match self.store.load_profile(user_id).await {
            Ok(info) => Ok(ProfileView { has_data: true, info }),
            Err(SosError::StorageMiss(_)) => Ok(ProfileView {
                has_data: false,
                info: PersonalInfo::default(),
            }),
            Err(e) => Err(e),
        }
    }

    /// Replace the stored profile with the trimmed form
    pub async fn save(&self, user_id: &str, info: &PersonalInfo) -> Result<ProfileView, SosError> {
        if user_id.trim().is_empty() {
            return Err(SosError::InvalidInput("A user id is required.".to_string()));
        }
        let info = info.trimmed();
        self.store.save_profile(user_id, &info).await?;
        tracing::info!("personal information saved for {}", user_id);
        Ok(ProfileView { has_data: true, info })
    }
}
