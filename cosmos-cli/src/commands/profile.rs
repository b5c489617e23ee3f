//! Profile command - Create and inspect the local profile

use clap::{Args, Subcommand};

use crate::session::Session;

/// Arguments for the profile command
#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Create a profile, replacing any existing one
    Init {
        /// Your full name
        #[arg(long)]
        name: String,

        /// Your email address
        #[arg(long)]
        email: String,

        /// Your job role, used as the default for new missions
        #[arg(long)]
        role: Option<String>,
    },

    /// Show the profile
    Show,

    /// Set the default job role
    SetRole {
        /// Job role, e.g. "Product Manager"
        role: String,
    },

    /// Delete the profile
    Clear,
}

impl ProfileArgs {
    /// Execute the profile command
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        let profiles = session.profiles();

        match &self.command {
            ProfileCommand::Init { name, email, role } => {
                let mut profile = profiles.create(name, email).await?;
                if let Some(role) = role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
                    profile.job_role = Some(role.to_string());
                    profiles.update(&profile).await?;
                }
                println!("Welcome to Cosmos, {}!", profile.first_name);
                println!("Profile id: {}", profile.id);
            }
            ProfileCommand::Show => match profiles.load().await? {
                Some(profile) => {
                    println!("Profile");
                    println!("=======");
                    println!();
                    println!("  id: {}", profile.id);
                    println!("  name: {}", profile.name);
                    println!("  email: {}", profile.email);
                    println!("  job_role: {}", profile.job_role.as_deref().unwrap_or("(not set)"));
                    if let Some(avatar) = &profile.avatar_url {
                        println!("  avatar: {}", avatar);
                    }
                    if profile.is_new_user {
                        println!();
                        println!("New here? Start with `cosmos mission new`.");
                    }
                }
                None => println!("No profile yet. Run `cosmos profile init --name .. --email ..`."),
            },
            ProfileCommand::SetRole { role } => {
                let role = role.trim();
                if role.is_empty() {
                    anyhow::bail!("Job role cannot be empty");
                }
                let mut profile = profiles.require().await?;
                profile.job_role = Some(role.to_string());
                profiles.update(&profile).await?;
                println!("Job role set to {}", role);
            }
            ProfileCommand::Clear => {
                profiles.clear().await?;
                println!("Profile removed");
            }
        }

        Ok(())
    }
}
