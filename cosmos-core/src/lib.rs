//! Cosmos Core - mission orchestration for AI agent squads
//!
//! This crate assembles squads of AI personas for a mission, runs the squad
//! huddle and the living mission document against a generative model, and
//! persists missions and the community layer through a key-value port.

pub mod agent;
pub mod community;
pub mod config;
pub mod document;
pub mod error;
pub mod huddle;
pub mod inflight;
pub mod insights;
pub mod mission;
pub mod model;
pub mod orchestrator;
pub mod secrets;
pub mod storage;
pub mod stream;
pub mod visual;

#[cfg(test)]
mod testing;

pub use agent::{Agent, IconName, SquadPreset};
pub use community::CommunityStore;
pub use config::Config;
pub use document::{DocumentEditor, SectionIds};
pub use error::{Error, Result};
pub use huddle::{Huddle, HuddleOutcome, HuddleRequest};
pub use inflight::InFlight;
pub use insights::Insights;
pub use mission::{HuddleMessage, Mission, MissionBrief, Section};
pub use model::{GenerativeModel, ModelSettings};
pub use orchestrator::{Orchestrator, SquadError};
pub use secrets::Secrets;
pub use storage::{KeyValueStore, MemoryStore, ProfileStore, UserProfile, Workspace};
pub use stream::{PrintHandler, StreamAggregator, StreamHandler};
pub use visual::VisualKind;
