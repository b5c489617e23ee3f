//! Per-user workspace: missions, the selected mission, roster and presets

use std::sync::Arc;

use tracing::info;

use super::{load_json, load_json_or, save_json, update_json, KeyValueStore, StorageKey};
use crate::agent::{default_agents, Agent, SquadPreset};
use crate::mission::Mission;
use crate::{Error, Result};

/// A user's persisted workspace
#[derive(Clone)]
pub struct Workspace {
    store: Arc<dyn KeyValueStore>,
    user_id: String,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Open the workspace of `user_id`
    pub fn new(store: Arc<dyn KeyValueStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }

    /// The owning user
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn missions_key(&self) -> StorageKey {
        StorageKey::Missions(self.user_id.clone())
    }

    fn active_key(&self) -> StorageKey {
        StorageKey::ActiveMission(self.user_id.clone())
    }

    /// All missions in creation order
    pub async fn missions(&self) -> Result<Vec<Mission>> {
        load_json(self.store.as_ref(), &self.missions_key()).await
    }

    /// Store a new mission and select it
    pub async fn create_mission(&self, mission: Mission) -> Result<()> {
        let id = mission.id.clone();
        update_json(self.store.as_ref(), &self.missions_key(), |missions: &mut Vec<Mission>| {
            missions.push(mission.clone());
            Ok(())
        })
        .await?;
        self.store.set(&self.active_key().as_key(), &id).await?;

        info!(user_id = %self.user_id, mission_id = %id, "Created mission");
        Ok(())
    }

    /// Look up a mission by id
    pub async fn mission(&self, id: &str) -> Result<Mission> {
        self.missions()
            .await?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::NotFound(format!("mission {}", id)))
    }

    /// Replace a stored mission with `mission` and bump its revision
    ///
    /// Fails with `Error::Conflict` when the stored copy was saved after
    /// `mission` was loaded, so a stale copy never overwrites newer work.
    pub async fn save_mission(&self, mission: &mut Mission) -> Result<()> {
        let revision = update_json(
            self.store.as_ref(),
            &self.missions_key(),
            |missions: &mut Vec<Mission>| {
                let slot = missions
                    .iter_mut()
                    .find(|m| m.id == mission.id)
                    .ok_or_else(|| Error::NotFound(format!("mission {}", mission.id)))?;
                if slot.revision != mission.revision {
                    return Err(Error::Conflict(format!("mission {}", mission.id)));
                }
                *slot = Mission {
                    revision: mission.revision + 1,
                    ..mission.clone()
                };
                Ok(slot.revision)
            },
        )
        .await?;

        mission.revision = revision;
        Ok(())
    }

    /// Delete every mission and clear the selection
    pub async fn delete_all_missions(&self) -> Result<()> {
        self.store.delete(&self.missions_key().as_key()).await?;
        self.store.delete(&self.active_key().as_key()).await?;
        info!(user_id = %self.user_id, "Deleted all missions");
        Ok(())
    }

    /// Id of the selected mission
    ///
    /// The id is stored as plain text rather than JSON.
    pub async fn active_mission_id(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get(&self.active_key().as_key())
            .await?
            .map(|v| v.value)
            .filter(|id| !id.is_empty()))
    }

    /// The selected mission, if it still exists
    pub async fn active_mission(&self) -> Result<Option<Mission>> {
        let Some(id) = self.active_mission_id().await? else {
            return Ok(None);
        };
        Ok(self.missions().await?.into_iter().find(|m| m.id == id))
    }

    /// Select a mission
    pub async fn select_mission(&self, id: &str) -> Result<()> {
        self.mission(id).await?;
        self.store.set(&self.active_key().as_key(), id).await?;
        Ok(())
    }

    /// Clear the selection
    pub async fn clear_selection(&self) -> Result<()> {
        self.store.delete(&self.active_key().as_key()).await
    }

    /// The preferred roster, defaulting to the starter agents
    pub async fn roster(&self) -> Result<Vec<Agent>> {
        load_json_or(
            self.store.as_ref(),
            &StorageKey::Roster(self.user_id.clone()),
            default_agents,
        )
        .await
    }

    /// Replace the preferred roster
    pub async fn set_roster(&self, agents: &[Agent]) -> Result<()> {
        save_json(
            self.store.as_ref(),
            &StorageKey::Roster(self.user_id.clone()),
            &agents,
        )
        .await
    }

    /// Add an agent to the roster; returns false if it was already there
    pub async fn recruit(&self, agent: Agent) -> Result<bool> {
        let defaults = default_agents();
        let (_, added) = super::update_json_or(
            self.store.as_ref(),
            &StorageKey::Roster(self.user_id.clone()),
            || defaults.clone(),
            |roster: &mut Vec<Agent>| {
                if roster.iter().any(|a| a.name == agent.name) {
                    return Ok(false);
                }
                roster.push(agent.clone());
                Ok(true)
            },
        )
        .await?;
        Ok(added)
    }

    /// Remove an agent from the roster by name; returns whether it was there
    pub async fn dismiss(&self, name: &str) -> Result<bool> {
        let defaults = default_agents();
        let (_, removed) = super::update_json_or(
            self.store.as_ref(),
            &StorageKey::Roster(self.user_id.clone()),
            || defaults.clone(),
            |roster: &mut Vec<Agent>| {
                let before = roster.len();
                roster.retain(|a| a.name != name);
                Ok(roster.len() != before)
            },
        )
        .await?;
        Ok(removed)
    }

    /// The user's saved presets
    pub async fn presets(&self) -> Result<Vec<SquadPreset>> {
        load_json(self.store.as_ref(), &StorageKey::Presets(self.user_id.clone())).await
    }

    /// Save a preset, replacing any preset with the same name
    pub async fn save_preset(&self, preset: SquadPreset) -> Result<()> {
        update_json(
            self.store.as_ref(),
            &StorageKey::Presets(self.user_id.clone()),
            |presets: &mut Vec<SquadPreset>| {
                presets.retain(|p| p.name != preset.name);
                presets.push(preset.clone());
                Ok(())
            },
        )
        .await
    }

    /// Delete a preset by name
    pub async fn delete_preset(&self, name: &str) -> Result<()> {
        update_json(
            self.store.as_ref(),
            &StorageKey::Presets(self.user_id.clone()),
            |presets: &mut Vec<SquadPreset>| {
                let before = presets.len();
                presets.retain(|p| p.name != name);
                if presets.len() == before {
                    return Err(Error::NotFound(format!("preset {}", name)));
                }
                Ok(())
            },
        )
        .await
    }
}
