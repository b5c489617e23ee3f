//! Doc command - View and edit the mission document

use clap::{Args, Subcommand};
use cosmos_core::document::{self, SectionOp};
use cosmos_core::{Section, SectionIds};

use crate::session::Session;

/// Arguments for the doc command
#[derive(Args, Debug)]
pub struct DocArgs {
    /// Mission id (defaults to the active mission)
    #[arg(long, global = true)]
    pub mission: Option<String>,

    #[command(subcommand)]
    pub command: DocCommand,
}

#[derive(Subcommand, Debug)]
pub enum DocCommand {
    /// Print the document section by section
    Show,

    /// Rewrite the document from an instruction
    Command {
        /// What to change, e.g. "add a pricing section"
        #[arg(required = true)]
        instruction: String,

        /// Keep section ids attached to unchanged content when it moves
        #[arg(long)]
        stable_ids: bool,
    },

    /// Append a huddle message to the document
    Promote {
        /// Huddle message id
        message_id: String,
    },

    /// Insert a huddle message's visual into the document
    Place {
        /// Huddle message id
        message_id: String,

        /// Character offset in the joined document
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

impl DocArgs {
    /// Execute the doc command
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        let (_, workspace) = session.workspace().await?;
        let mut mission = session.mission(&workspace, self.mission.as_deref()).await?;

        match &self.command {
            DocCommand::Show => {
                print_document(&mission.document);
                return Ok(());
            }
            DocCommand::Command {
                instruction,
                stable_ids,
            } => {
                let ids = if *stable_ids {
                    SectionIds::Stable
                } else {
                    SectionIds::Positional
                };
                let editor = session.editor()?.with_section_ids(ids);

                let mut updates = 0usize;
                let mut observer = |_: &[Section]| updates += 1;
                let ops = editor
                    .apply_command(&mut mission, instruction, &session.cancel, &mut observer)
                    .await?;

                tracing::debug!(updates, ops = ops.len(), "Document rewritten");
                print_changes(&ops);
            }
            DocCommand::Promote { message_id } => {
                let text = mission
                    .huddle_messages
                    .iter()
                    .find(|m| m.id == *message_id)
                    .map(|m| m.text.clone())
                    .ok_or_else(|| anyhow::anyhow!("No huddle message {}", message_id))?;
                mission.document = document::promote(&mission.document, &text)?;
                println!("Promoted message {} to the document", message_id);
            }
            DocCommand::Place { message_id, offset } => {
                document::place_message_visual(&mut mission, message_id, *offset)?;
                println!("Placed visual from {} at offset {}", message_id, offset);
            }
        }

        workspace.save_mission(&mut mission).await?;
        Ok(())
    }
}

fn print_document(sections: &[Section]) {
    for (index, section) in sections.iter().enumerate() {
        if index > 0 {
            println!();
        }
        println!("--- {} ---", section.id);
        println!("{}", section.content);
    }
}

fn print_changes(ops: &[SectionOp]) {
    let mut changed = false;
    for op in ops {
        match op {
            SectionOp::Keep { .. } => {}
            SectionOp::Update { id } => println!("  ~ {}", id),
            SectionOp::Insert { id, index } => println!("  + {} at {}", id, index),
            SectionOp::Delete { id } => println!("  - {}", id),
        }
        changed |= !matches!(op, SectionOp::Keep { .. });
    }
    if !changed {
        println!("  (no changes)");
    }
}
