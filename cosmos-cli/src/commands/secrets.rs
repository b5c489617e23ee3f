//! Secrets command - Create the secrets file template

use clap::{Args, Subcommand};
use cosmos_core::Secrets;

/// Arguments for the secrets command
#[derive(Args, Debug)]
pub struct SecretsArgs {
    #[command(subcommand)]
    pub command: SecretsCommand,
}

#[derive(Subcommand, Debug)]
pub enum SecretsCommand {
    /// Write a secrets template readable only by you
    Init,
}

impl SecretsArgs {
    /// Execute the secrets command
    pub fn execute(&self) -> anyhow::Result<()> {
        match self.command {
            SecretsCommand::Init => {
                let path = Secrets::create_template()?;
                println!("Created secrets template at {}", path.display());
                println!("Add your Gemini API key under [gemini], or set GEMINI_API_KEY.");
                Ok(())
            }
        }
    }
}
