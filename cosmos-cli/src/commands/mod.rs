//! CLI command implementations

pub mod agents;
pub mod community;
pub mod doc;
pub mod huddle;
pub mod mission;
pub mod oracle;
pub mod profile;
pub mod secrets;

pub use agents::AgentsArgs;
pub use community::CommunityArgs;
pub use doc::DocArgs;
pub use huddle::HuddleArgs;
pub use mission::MissionArgs;
pub use oracle::OracleArgs;
pub use profile::ProfileArgs;
pub use secrets::SecretsArgs;
