//! Local user profile
//!
//! There is no authentication: the profile is a single record that names
//! the user and scopes their workspace keys.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{load_json_or, save_json, KeyValueStore, StorageKey};
use crate::mission::new_id;
use crate::{Error, Result};

/// The local user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub first_name: String,
    pub email: String,
    #[serde(default)]
    pub is_new_user: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_role: Option<String>,
}

impl UserProfile {
    /// Build a profile from a full name and email
    pub fn new(full_name: &str, email: &str) -> Result<Self> {
        let name = full_name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(Error::Validation(
                "Full name and email are required.".to_string(),
            ));
        }

        Ok(Self {
            id: new_id("user"),
            name: name.to_string(),
            first_name: name.split_whitespace().next().unwrap_or(name).to_string(),
            email: email.to_string(),
            is_new_user: true,
            avatar_url: Some(format!("https://i.pravatar.cc/150?u={}", email)),
            job_role: None,
        })
    }
}

/// Stores the single local profile
#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    /// Create a profile store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Create and persist a profile, replacing any existing one
    pub async fn create(&self, full_name: &str, email: &str) -> Result<UserProfile> {
        let profile = UserProfile::new(full_name, email)?;
        save_json(self.store.as_ref(), &StorageKey::Profile, &profile).await?;
        info!(user_id = %profile.id, "Created profile");
        Ok(profile)
    }

    /// Load the profile, if one exists
    pub async fn load(&self) -> Result<Option<UserProfile>> {
        load_json_or(self.store.as_ref(), &StorageKey::Profile, || None).await
    }

    /// Load the profile or fail with a hint to create one
    pub async fn require(&self) -> Result<UserProfile> {
        self.load().await?.ok_or_else(|| {
            Error::NotFound("profile (run `cosmos profile init` first)".to_string())
        })
    }

    /// Persist changes to the profile
    pub async fn update(&self, profile: &UserProfile) -> Result<()> {
        save_json(self.store.as_ref(), &StorageKey::Profile, profile).await
    }

    /// Remove the profile
    pub async fn clear(&self) -> Result<()> {
        self.store.delete(&StorageKey::Profile.as_key()).await
    }
}
