//! The huddle: question and answer with a mission's squad
//!
//! Every exchange appends exactly two messages (the user's question and one
//! agent reply). The reply starts as a loading placeholder, is rewritten in
//! place as the answer streams in, and always ends with `is_loading` false.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::agent::{Agent, PromptBuilder, Template};
use crate::document::join_sections;
use crate::inflight::InFlight;
use crate::mission::{HuddleMessage, Mission, Speaker};
use crate::model::{CompletionRequest, GenerativeModel, ImageRequest, ModelSettings};
use crate::stream::{StreamAggregator, StreamHandler};
use crate::visual::{extract, image_data_uri, VisualKind};
use crate::{Error, Result};

/// Reply text shown when the squad could not answer
pub const FALLBACK_REPLY: &str = "Sorry, an error occurred.";

/// A question for the squad
#[derive(Debug, Clone, Default)]
pub struct HuddleRequest {
    pub text: String,
    /// Names of squad members the question is addressed to
    pub targeted: Vec<String>,
}

impl HuddleRequest {
    /// Ask the whole squad
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            targeted: Vec::new(),
        }
    }

    /// Address specific squad members
    pub fn targeting(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.targeted = names.into_iter().map(Into::into).collect();
        self
    }
}

/// How an exchange ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuddleOutcome {
    /// The full answer arrived
    Completed,
    /// The answer was replaced by the fallback reply
    Failed,
    /// The caller cancelled; the partial answer was kept
    Cancelled,
}

/// Receives the message list as the reply streams in
pub trait HuddleObserver: Send {
    fn on_messages(&mut self, messages: &[HuddleMessage]);
}

impl<F> HuddleObserver for F
where
    F: FnMut(&[HuddleMessage]) + Send,
{
    fn on_messages(&mut self, messages: &[HuddleMessage]) {
        self(messages)
    }
}

/// Runs huddle exchanges against a generative model
pub struct Huddle {
    model: Arc<dyn GenerativeModel>,
    settings: ModelSettings,
    inflight: InFlight,
    idle_timeout: Duration,
    image_timeout: Duration,
}

impl Huddle {
    /// Create a huddle sharing `inflight` with the document editor
    pub fn new(model: Arc<dyn GenerativeModel>, settings: ModelSettings, inflight: InFlight) -> Self {
        Self {
            model,
            settings,
            inflight,
            idle_timeout: Duration::from_secs(30),
            image_timeout: Duration::from_secs(60),
        }
    }

    /// Set the stream idle timeout
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the upper bound on the follow-up image generation call
    pub fn with_image_timeout(mut self, timeout: Duration) -> Self {
        self.image_timeout = timeout;
        self
    }

    /// Build the squad request from the mission's current state
    pub fn build_request(&self, mission: &Mission, targeted: &[Agent]) -> CompletionRequest {
        let targeted_clause = if targeted.is_empty() {
            String::new()
        } else {
            let names = targeted
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "\nThe user is specifically addressing {}. Their expertise should be prioritized in the response.",
                names
            )
        };

        let system = PromptBuilder::new(Template::Huddle)
            .list(
                "AGENT_PROFILES",
                mission.agents.iter().map(|a| a.profile_line()),
                "(no agents)",
            )
            .var("TARGETED_CLAUSE", targeted_clause)
            .build();

        let history = mission
            .huddle_messages
            .iter()
            .filter(|m| !m.is_loading)
            .map(|m| {
                let who = match m.speaker {
                    Speaker::User => "User",
                    Speaker::Agent => "Agents",
                };
                format!("**{}**: {}", who, m.text)
            });

        let prompt = PromptBuilder::new(Template::HuddleRequest)
            .var("DOCUMENT", join_sections(&mission.document))
            .list("HISTORY", history, "")
            .build();

        CompletionRequest::new(&self.settings.text_model, prompt).with_system_instruction(system)
    }

    /// Ask the squad a question and stream the answer into the mission
    ///
    /// Blank questions fail with `Error::Validation` and a second concurrent
    /// request for the same mission fails with `Error::Busy`; neither touches
    /// the message list. Once the messages are appended, model failures never
    /// surface as errors: they are reported through [`HuddleOutcome`].
    pub async fn ask(
        &self,
        mission: &mut Mission,
        request: HuddleRequest,
        cancel: &CancellationToken,
        observer: &mut dyn HuddleObserver,
    ) -> Result<HuddleOutcome> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(Error::Validation("Message is empty".to_string()));
        }

        let _guard = self.inflight.try_acquire(&mission.id)?;
        let targeted = mission.squad_members(&request.targeted);

        mission.huddle_messages.push(HuddleMessage::user(text));
        let model_request = self.build_request(mission, &targeted);
        mission.huddle_messages.push(HuddleMessage::agent_placeholder());
        let reply_index = mission.huddle_messages.len() - 1;
        observer.on_messages(&mission.huddle_messages);

        debug!(
            mission_id = %mission.id,
            targeted = targeted.len(),
            "Asking squad"
        );

        let mut aggregator = StreamAggregator::new(self.idle_timeout);
        let streamed = match self.model.generate_stream(&model_request).await {
            Ok(stream) => {
                let mut handler = ReplyHandler {
                    messages: &mut mission.huddle_messages,
                    index: reply_index,
                    observer: &mut *observer,
                };
                aggregator.consume(stream, cancel, &mut handler).await
            }
            Err(e) => Err(e),
        };

        let extraction = extract(aggregator.buffer());
        let result = match streamed {
            Ok(()) => match &extraction.visual {
                Some(visual) if visual.kind == VisualKind::Image => self
                    .render_image(&visual.payload, cancel)
                    .await
                    .map(|uri| (Some(uri), Some(VisualKind::Image))),
                Some(visual) => Ok((Some(visual.payload.clone()), Some(visual.kind))),
                None => Ok((None, None)),
            },
            Err(e) => Err(e),
        };

        let reply = &mut mission.huddle_messages[reply_index];
        reply.is_loading = false;

        let outcome = match result {
            Ok((visual_code, visual_type)) => {
                reply.text = extraction.prose;
                reply.visual_code = visual_code;
                reply.visual_type = visual_type;
                info!(mission_id = %mission.id, chars = reply.text.len(), "Squad answered");
                HuddleOutcome::Completed
            }
            Err(Error::Cancelled) => {
                reply.text = extraction.prose;
                // an image prompt is not a renderable visual
                match extraction.visual {
                    Some(v) if v.kind == VisualKind::Mermaid => {
                        reply.visual_code = Some(v.payload);
                        reply.visual_type = Some(v.kind);
                    }
                    _ => {
                        reply.visual_code = None;
                        reply.visual_type = None;
                    }
                }
                info!(mission_id = %mission.id, "Huddle request cancelled");
                HuddleOutcome::Cancelled
            }
            Err(e) => {
                error!(mission_id = %mission.id, error = %e, "Squad failed to answer");
                reply.text = FALLBACK_REPLY.to_string();
                reply.visual_code = None;
                reply.visual_type = None;
                HuddleOutcome::Failed
            }
        };

        observer.on_messages(&mission.huddle_messages);
        Ok(outcome)
    }

    /// Turn an image prompt into a data URI
    async fn render_image(&self, prompt: &str, cancel: &CancellationToken) -> Result<String> {
        let request = ImageRequest::new(&self.settings.image_model, prompt);

        let images = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            res = tokio::time::timeout(self.image_timeout, self.model.generate_images(&request)) => {
                res.map_err(|_| Error::Timeout(self.image_timeout))??
            }
        };

        let image = images
            .into_iter()
            .next()
            .ok_or_else(|| Error::model("Image generation failed, no images returned", false))?;
        Ok(image_data_uri(&image))
    }
}

struct ReplyHandler<'a, O: HuddleObserver + ?Sized> {
    messages: &'a mut Vec<HuddleMessage>,
    index: usize,
    observer: &'a mut O,
}

impl<O: HuddleObserver + ?Sized> StreamHandler for ReplyHandler<'_, O> {
    fn on_fragment(&mut self, _fragment: &str, buffer: &str) {
        let extraction = extract(buffer);
        if let Some(reply) = self.messages.get_mut(self.index) {
            reply.text = extraction.prose;
            if let Some(visual) = extraction.visual {
                reply.visual_code = Some(visual.payload);
                reply.visual_type = Some(visual.kind);
            }
        }
        self.observer.on_messages(self.messages.as_slice());
    }
}
