//! Shared handles for one CLI invocation

use std::sync::Arc;

use anyhow::Context;
use cosmos_core::config::StorageBackend;
use cosmos_core::{
    CommunityStore, Config, DocumentEditor, GenerativeModel, Huddle, InFlight, Insights,
    KeyValueStore, MemoryStore, Mission, ModelSettings, Orchestrator, ProfileStore, Secrets,
    UserProfile, Workspace,
};
use cosmos_db::Database;
use cosmos_gemini::GeminiClient;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Configuration, storage and cancellation shared by every command
pub struct Session {
    pub config: Config,
    pub cancel: CancellationToken,
    pub verbose: bool,
    store: Arc<dyn KeyValueStore>,
    inflight: InFlight,
}

impl Session {
    /// Open the configured storage backend
    pub async fn open(config: Config, cancel: CancellationToken, verbose: bool) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = match config.storage.backend {
            StorageBackend::Memory => {
                debug!("Using in-memory storage");
                Arc::new(MemoryStore::new())
            }
            StorageBackend::Sqlite => {
                let path = config.storage.resolved_path()?;
                let db = Database::new(&path)
                    .await
                    .with_context(|| format!("Failed to open database at {}", path.display()))?;
                Arc::new(db.store())
            }
        };

        Ok(Self {
            config,
            cancel,
            verbose,
            store,
            inflight: InFlight::new(),
        })
    }

    pub fn profiles(&self) -> ProfileStore {
        ProfileStore::new(Arc::clone(&self.store))
    }

    /// The signed-in profile; fails when none has been created
    pub async fn profile(&self) -> anyhow::Result<UserProfile> {
        Ok(self.profiles().require().await?)
    }

    /// The profile and its private workspace
    pub async fn workspace(&self) -> anyhow::Result<(UserProfile, Workspace)> {
        let profile = self.profile().await?;
        let workspace = Workspace::new(Arc::clone(&self.store), profile.id.clone());
        Ok((profile, workspace))
    }

    pub fn community(&self) -> CommunityStore {
        CommunityStore::new(Arc::clone(&self.store))
    }

    /// Load a mission by id, or the active mission when no id is given
    pub async fn mission(&self, workspace: &Workspace, id: Option<&str>) -> anyhow::Result<Mission> {
        match id {
            Some(id) => Ok(workspace.mission(id).await?),
            None => workspace.active_mission().await?.ok_or_else(|| {
                anyhow::anyhow!("No active mission; run `cosmos mission new` or `cosmos mission select`")
            }),
        }
    }

    pub fn settings(&self) -> ModelSettings {
        ModelSettings::from(&self.config.model)
    }

    /// Gemini client built from config and secrets
    pub fn model(&self) -> anyhow::Result<Arc<dyn GenerativeModel>> {
        let secrets = Secrets::load()?;
        let api_key = secrets.gemini_api_key().unwrap_or_default();
        let client = GeminiClient::from_config(&self.config.model, api_key)
            .map_err(cosmos_core::Error::from)?;
        Ok(Arc::new(client))
    }

    pub fn orchestrator(&self) -> anyhow::Result<Orchestrator> {
        Ok(Orchestrator::new(self.model()?, self.settings()))
    }

    pub fn huddle(&self) -> anyhow::Result<Huddle> {
        Ok(Huddle::new(self.model()?, self.settings(), self.inflight.clone())
            .with_idle_timeout(self.config.model.stream_idle_timeout)
            .with_image_timeout(self.config.model.request_timeout))
    }

    pub fn editor(&self) -> anyhow::Result<DocumentEditor> {
        Ok(
            DocumentEditor::new(self.model()?, self.settings(), self.inflight.clone())
                .with_idle_timeout(self.config.model.stream_idle_timeout),
        )
    }

    pub fn insights(&self) -> anyhow::Result<Insights> {
        Ok(Insights::new(self.model()?, self.settings()))
    }
}
