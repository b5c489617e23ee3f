//! Huddle command - Ask the active mission's squad a question

use std::io::Write;

use clap::Args;
use cosmos_core::mission::{HuddleMessage, Speaker};
use cosmos_core::{HuddleOutcome, HuddleRequest};

use crate::session::Session;

/// Arguments for the huddle command
#[derive(Args, Debug)]
pub struct HuddleArgs {
    /// The question for the squad
    #[arg(required = true)]
    pub question: String,

    /// Address specific squad members (repeatable)
    #[arg(long = "to", value_name = "NAME")]
    pub to: Vec<String>,

    /// Mission id (defaults to the active mission)
    #[arg(long)]
    pub mission: Option<String>,
}

const VISUAL_OPEN: &str = "[VISUAL_START:";

/// Prints the streaming reply as it grows
///
/// Text from a visual marker onward is held back while the reply streams,
/// since extraction removes the block once it closes.
struct ReplyPrinter<W: Write> {
    out: W,
    printed: String,
}

impl<W: Write> ReplyPrinter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            printed: String::new(),
        }
    }

    fn show(&mut self, messages: &[HuddleMessage]) {
        let Some(reply) = messages.last().filter(|m| m.speaker == Speaker::Agent) else {
            return;
        };
        let visible = if reply.is_loading {
            settled_prose(&reply.text)
        } else {
            reply.text.as_str()
        };

        let _ = match visible.strip_prefix(self.printed.as_str()) {
            Some(fresh) => write!(self.out, "{}", fresh),
            None => write!(self.out, "\n{}", visible),
        };
        let _ = self.out.flush();
        self.printed = visible.to_string();
    }
}

/// The part of a streaming reply that cannot change once a visual closes
fn settled_prose(text: &str) -> &str {
    if let Some(start) = text.find(VISUAL_OPEN) {
        return &text[..start];
    }
    match text.rfind('[') {
        Some(start) if VISUAL_OPEN.starts_with(&text[start..]) => &text[..start],
        _ => text,
    }
}

impl HuddleArgs {
    /// Execute the huddle command
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        let (_, workspace) = session.workspace().await?;
        let mut mission = session.mission(&workspace, self.mission.as_deref()).await?;
        let huddle = session.huddle()?;

        let unknown: Vec<&String> = self
            .to
            .iter()
            .filter(|name| !mission.agents.iter().any(|a| &a.name == *name))
            .collect();
        if !unknown.is_empty() {
            tracing::warn!(?unknown, "Ignoring names that are not in the squad");
        }

        let request = HuddleRequest::new(&self.question).targeting(self.to.iter().cloned());
        let mut printer = ReplyPrinter::new(std::io::stdout());
        let mut observer = |messages: &[HuddleMessage]| printer.show(messages);

        let outcome = huddle
            .ask(&mut mission, request, &session.cancel, &mut observer)
            .await?;
        println!();

        workspace.save_mission(&mut mission).await?;

        let reply = mission.huddle_messages.last();
        if let Some(reply) = reply {
            if let (Some(kind), Some(code)) = (reply.visual_type, reply.visual_code.as_deref()) {
                println!();
                println!("Visual ({}) attached to message {}", kind, reply.id);
                if code.starts_with("data:") {
                    println!("  [{} byte image]", code.len());
                } else {
                    println!("{}", code);
                }
                println!("Place it with `cosmos doc place {} --offset N`", reply.id);
            }
        }

        match outcome {
            HuddleOutcome::Completed => {}
            HuddleOutcome::Failed => {
                eprintln!("The squad could not answer; the reply was replaced with a fallback.")
            }
            HuddleOutcome::Cancelled => eprintln!("Cancelled; the partial reply was kept."),
        }

        Ok(())
    }
}
