//! Oracle command - Insights, what-if scenarios and mission showcases

use clap::{Args, Subcommand};
use cosmos_core::community::{CommunityAuthor, ShowcaseMission};
use cosmos_core::stream::StreamAggregator;
use cosmos_core::PrintHandler;

use crate::session::Session;

/// Arguments for the oracle command
#[derive(Args, Debug)]
pub struct OracleArgs {
    #[command(subcommand)]
    pub command: OracleCommand,
}

#[derive(Subcommand, Debug)]
pub enum OracleCommand {
    /// Analyze your missions and suggest the next one
    Insights,

    /// Explore a what-if scenario against your mission history
    Simulate {
        /// The scenario, e.g. "What if we doubled the ad budget?"
        #[arg(required = true)]
        query: String,
    },

    /// Summarize a mission and share it with the community
    Showcase {
        /// Mission id (defaults to the active mission)
        id: Option<String>,
    },
}

impl OracleArgs {
    /// Execute the oracle command
    pub async fn execute(&self, session: &Session) -> anyhow::Result<()> {
        let (profile, workspace) = session.workspace().await?;
        let insights = session.insights()?;

        match &self.command {
            OracleCommand::Insights => {
                let missions = workspace.missions().await?;
                let stats = session.community().fetch().await?.agent_stats;
                let job_role = profile.job_role.as_deref().unwrap_or("Professional");

                let insight = insights.analyze(&missions, job_role, &stats).await?;
                let suggestion = &insight.suggestion;

                println!("Oracle Insight");
                println!("==============");
                println!();
                println!("{}", insight.summary);
                println!();
                println!("Suggested mission: {}", suggestion.title);
                println!("  {}", suggestion.details);
                println!("  Why: {}", suggestion.justification);
                println!();
                println!(
                    "Start it with: cosmos mission new --title \"{}\" --role \"{}\"",
                    suggestion.title, suggestion.job_role
                );
            }
            OracleCommand::Simulate { query } => {
                let missions = workspace.missions().await?;
                let stream = insights.simulate_scenario(query, &missions).await?;
                let mut aggregator = StreamAggregator::new(session.config.model.stream_idle_timeout);
                let mut handler = PrintHandler::new(session.verbose);
                aggregator.consume(stream, &session.cancel, &mut handler).await?;
            }
            OracleCommand::Showcase { id } => {
                let mission = session.mission(&workspace, id.as_deref()).await?;
                let summary = insights.summarize_for_showcase(&mission).await?;

                let community = session.community();
                let post = community
                    .create_showcase_post(
                        &CommunityAuthor::from(&profile),
                        ShowcaseMission {
                            mission_title: summary.title,
                            summary: summary.summary,
                            squad: mission.agents.clone(),
                        },
                    )
                    .await?;

                let names: Vec<String> = mission.agents.iter().map(|a| a.name.clone()).collect();
                community.record_success(&names).await?;

                println!("Shared {} to the community feed", post.id);
                println!();
                println!("{}", post.mission.mission_title);
                println!("{}", post.mission.summary);
            }
        }

        Ok(())
    }
}
