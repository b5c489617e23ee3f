//! Mission command - Assemble squads and manage missions

use clap::{Args, Subcommand};
use cosmos_core::agent::squad_presets;
use cosmos_core::{Agent, Mission, MissionBrief};
use tracing::info;

use crate::commands::agents::print_agents;
use crate::session::Session;

/// Arguments for the mission command
#[derive(Args, Debug)]
pub struct MissionArgs {
    #[command(subcommand)]
    pub command: MissionCommand,
}

#[derive(Subcommand, Debug)]
pub enum MissionCommand {
    /// Assemble a squad and start a new mission
    New {
        /// Mission title
        #[arg(long)]
        title: String,

        /// What the mission should achieve
        #[arg(long, default_value = "")]
        details: String,

        /// Your role for this mission (defaults to the profile's job role)
        #[arg(long)]
        role: Option<String>,

        /// Launch from a community hub
        #[arg(long)]
        hub: Option<String>,

        /// Prefer a preset's agents instead of the roster
        #[arg(long)]
        preset: Option<String>,
    },

    /// List missions
    List,

    /// Show a mission (the active one by default)
    Show {
        /// Mission id
        id: Option<String>,
    },

    /// Make a mission the active one
    Select {
        /// Mission id
        id: String,
    },

    /// Clear the active mission
    Clear,

    /// Search the active mission's huddle
    Search {
        /// Text to look for
        query: String,
    },

    /// Delete every mission
    Reset,
}

impl MissionArgs {
    /// Execute the mission command
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        match &self.command {
            MissionCommand::New {
                title,
                details,
                role,
                hub,
                preset,
            } => {
                new_mission(
                    session,
                    title,
                    details,
                    role.as_deref(),
                    hub.as_deref(),
                    preset.as_deref(),
                )
                .await
            }
            MissionCommand::List => {
                let (_, workspace) = session.workspace().await?;
                let missions = workspace.missions().await?;
                let active = workspace.active_mission_id().await?;

                println!("Missions");
                println!("========");
                println!();
                if missions.is_empty() {
                    println!("  (none)");
                }
                for mission in &missions {
                    let marker = if active.as_deref() == Some(mission.id.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!(
                        "{} {}  {} ({} agents, {} messages)",
                        marker,
                        mission.id,
                        mission.title,
                        mission.agents.len(),
                        mission.huddle_messages.len()
                    );
                }
                Ok(())
            }
            MissionCommand::Show { id } => {
                let (_, workspace) = session.workspace().await?;
                let mission = session.mission(&workspace, id.as_deref()).await?;
                print_mission(&mission);
                Ok(())
            }
            MissionCommand::Select { id } => {
                let (_, workspace) = session.workspace().await?;
                workspace.select_mission(id).await?;
                println!("Active mission: {}", id);
                Ok(())
            }
            MissionCommand::Clear => {
                let (_, workspace) = session.workspace().await?;
                workspace.clear_selection().await?;
                println!("No active mission");
                Ok(())
            }
            MissionCommand::Search { query } => {
                let (_, workspace) = session.workspace().await?;
                let mission = session.mission(&workspace, None).await?;
                let hits = mission.search_huddle(query);
                if hits.is_empty() {
                    println!("No messages match \"{}\"", query);
                }
                for message in hits {
                    println!(
                        "[{}] {} {:?}: {}",
                        message.timestamp.format("%Y-%m-%d %H:%M"),
                        message.id,
                        message.speaker,
                        message.text
                    );
                }
                Ok(())
            }
            MissionCommand::Reset => {
                let (_, workspace) = session.workspace().await?;
                workspace.delete_all_missions().await?;
                println!("All missions deleted");
                Ok(())
            }
        }
    }
}

async fn new_mission(
    session: &Session,
    title: &str,
    details: &str,
    role: Option<&str>,
    hub_id: Option<&str>,
    preset: Option<&str>,
) -> anyhow::Result<()> {
    let (mut profile, workspace) = session.workspace().await?;

    let job_role = role
        .map(str::to_string)
        .or_else(|| profile.job_role.clone())
        .unwrap_or_default();
    let brief = MissionBrief::new(title, details, job_role).validated()?;

    let preferred: Vec<Agent> = match preset {
        Some(name) => {
            let saved = workspace.presets().await?;
            squad_presets()
                .into_iter()
                .chain(saved)
                .find(|p| p.name.eq_ignore_ascii_case(name))
                .map(|p| p.agents)
                .ok_or_else(|| anyhow::anyhow!("No preset named {}", name))?
        }
        None => workspace.roster().await?,
    };

    let community = session.community();
    let hub = match hub_id {
        Some(id) => Some(community.hub(id).await?),
        None => None,
    };

    println!("Assembling a squad for \"{}\"...", brief.title);
    let squad = session
        .orchestrator()?
        .assemble(&brief, Some(preferred.as_slice()))
        .await;
    if squad.is_empty() {
        anyhow::bail!("Could not assemble a squad for this mission; try again or rephrase the brief");
    }

    let mission = match &hub {
        Some(hub) => Mission::from_hub(brief, squad, &hub.id, &hub.name),
        None => Mission::new(brief, squad),
    };
    workspace.create_mission(mission.clone()).await?;

    let names: Vec<String> = mission.agents.iter().map(|a| a.name.clone()).collect();
    community.record_deployment(&names).await?;

    if profile.is_new_user {
        profile.is_new_user = false;
        session.profiles().update(&profile).await?;
    }

    info!(mission_id = %mission.id, agents = names.len(), "Mission created");
    println!();
    println!("Mission {} is now active", mission.id);
    println!();
    println!("Squad:");
    print_agents(&mission.agents);
    Ok(())
}

pub fn print_mission(mission: &Mission) {
    println!("{}", mission.title);
    println!("{}", "=".repeat(mission.title.chars().count().max(4)));
    println!();
    println!("  id: {}", mission.id);
    println!("  role: {}", mission.job_role);
    if !mission.details.is_empty() {
        println!("  details: {}", mission.details);
    }
    if let Some(hub) = &mission.hub_id {
        println!("  hub: {}", hub);
    }
    println!();
    println!("Squad:");
    print_agents(&mission.agents);
    println!();
    println!("Huddle ({} messages):", mission.huddle_messages.len());
    for message in &mission.huddle_messages {
        let visual = match message.visual_type {
            Some(kind) => format!(" [{}]", kind),
            None => String::new(),
        };
        println!("  {} {:?}{}: {}", message.id, message.speaker, visual, message.text);
    }
}
