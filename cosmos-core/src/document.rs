//! Living document patching
//!
//! A mission document is an ordered list of [`Section`]s that round-trips
//! through a single string joined with [`SECTION_SEPARATOR`]. Every edit
//! (a streamed rewrite, a placed visual) produces new full text which is
//! split back into sections. Section content must never contain the
//! separator or it will be read back as a boundary.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::{PromptBuilder, Template};
use crate::inflight::InFlight;
use crate::mission::{new_id, Mission, Section};
use crate::model::{CompletionRequest, GenerativeModel, ModelSettings};
use crate::stream::{StreamAggregator, StreamHandler};
use crate::visual::{visual_markdown, VisualKind};
use crate::{Error, Result};

/// Literal boundary between sections in the joined document
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// How re-split sections inherit ids from the previous document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionIds {
    /// Piece `i` takes the id previous section `i` had
    #[default]
    Positional,
    /// Unchanged content keeps its id wherever it moves; the rest falls back
    /// to positional ids that are still free
    Stable,
}

/// One entry of the change log between two versions of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum SectionOp {
    Keep { id: String },
    Update { id: String },
    Insert { id: String, index: usize },
    Delete { id: String },
}

/// Join sections into the full document text
pub fn join_sections(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// Split full document text into sections, reusing ids from `previous`
pub fn split_sections(text: &str, previous: &[Section], ids: SectionIds) -> Vec<Section> {
    let pieces: Vec<&str> = text.split(SECTION_SEPARATOR).collect();

    match ids {
        SectionIds::Positional => pieces
            .into_iter()
            .enumerate()
            .map(|(i, content)| Section {
                id: previous
                    .get(i)
                    .map(|s| s.id.clone())
                    .unwrap_or_else(|| new_id("section")),
                content: content.to_string(),
            })
            .collect(),
        SectionIds::Stable => split_stable(&pieces, previous),
    }
}

fn split_stable(pieces: &[&str], previous: &[Section]) -> Vec<Section> {
    let mut used: HashSet<&str> = HashSet::new();
    let mut assigned: Vec<Option<String>> = vec![None; pieces.len()];

    // exact content matches first, in order
    for (i, piece) in pieces.iter().enumerate() {
        if let Some(prev) = previous
            .iter()
            .find(|s| s.content == *piece && !used.contains(s.id.as_str()))
        {
            used.insert(prev.id.as_str());
            assigned[i] = Some(prev.id.clone());
        }
    }

    for (i, slot) in assigned.iter_mut().enumerate() {
        if slot.is_some() {
            continue;
        }
        *slot = match previous.get(i) {
            Some(prev) if !used.contains(prev.id.as_str()) => {
                used.insert(prev.id.as_str());
                Some(prev.id.clone())
            }
            _ => Some(new_id("section")),
        };
    }

    pieces
        .iter()
        .zip(assigned)
        .map(|(content, id)| Section {
            id: id.unwrap_or_else(|| new_id("section")),
            content: content.to_string(),
        })
        .collect()
}

/// Describe how `after` differs from `before`, by section id
pub fn diff_sections(before: &[Section], after: &[Section]) -> Vec<SectionOp> {
    let mut ops = Vec::with_capacity(after.len());

    for (index, section) in after.iter().enumerate() {
        match before.iter().find(|s| s.id == section.id) {
            Some(old) if old.content == section.content => ops.push(SectionOp::Keep {
                id: section.id.clone(),
            }),
            Some(_) => ops.push(SectionOp::Update {
                id: section.id.clone(),
            }),
            None => ops.push(SectionOp::Insert {
                id: section.id.clone(),
                index,
            }),
        }
    }

    for section in before {
        if !after.iter().any(|s| s.id == section.id) {
            ops.push(SectionOp::Delete {
                id: section.id.clone(),
            });
        }
    }

    ops
}

/// Insert a visual at a character offset of the joined document
///
/// The offset counts characters (not bytes) and is clamped to the document
/// length. The result is re-split positionally.
pub fn place_visual(
    sections: &[Section],
    offset: usize,
    kind: VisualKind,
    code: &str,
) -> Vec<Section> {
    let joined = join_sections(sections);
    let at = joined
        .char_indices()
        .nth(offset)
        .map(|(byte, _)| byte)
        .unwrap_or(joined.len());

    let mut text = String::with_capacity(joined.len() + code.len() + 32);
    text.push_str(&joined[..at]);
    text.push_str(&visual_markdown(kind, code));
    text.push_str(&joined[at..]);

    split_sections(&text, sections, SectionIds::Positional)
}

/// Place the visual attached to a huddle message into the mission document
pub fn place_message_visual(mission: &mut Mission, message_id: &str, offset: usize) -> Result<()> {
    let message = mission
        .huddle_messages
        .iter()
        .find(|m| m.id == message_id)
        .ok_or_else(|| Error::NotFound(format!("huddle message {}", message_id)))?;

    let (Some(kind), Some(code)) = (message.visual_type, message.visual_code.clone()) else {
        return Err(Error::Validation(format!(
            "Message {} has no visual to place",
            message_id
        )));
    };

    mission.document = place_visual(&mission.document, offset, kind, &code);
    Ok(())
}

/// Append `text` to the document as a new section
pub fn promote(sections: &[Section], text: &str) -> Result<Vec<Section>> {
    if text.trim().is_empty() {
        return Err(Error::Validation("Nothing to promote".to_string()));
    }

    let mut updated = sections.to_vec();
    updated.push(Section {
        id: new_id("section-promo"),
        content: text.to_string(),
    });
    Ok(updated)
}

/// Receives the document as it is rewritten
pub trait DocumentObserver: Send {
    fn on_document(&mut self, sections: &[Section]);
}

impl<F> DocumentObserver for F
where
    F: FnMut(&[Section]) + Send,
{
    fn on_document(&mut self, sections: &[Section]) {
        self(sections)
    }
}

/// Rewrites a mission document from a free-text command
pub struct DocumentEditor {
    model: Arc<dyn GenerativeModel>,
    settings: ModelSettings,
    inflight: InFlight,
    idle_timeout: Duration,
    ids: SectionIds,
}

impl DocumentEditor {
    /// Create an editor sharing `inflight` with the huddle
    pub fn new(model: Arc<dyn GenerativeModel>, settings: ModelSettings, inflight: InFlight) -> Self {
        Self {
            model,
            settings,
            inflight,
            idle_timeout: Duration::from_secs(30),
            ids: SectionIds::default(),
        }
    }

    /// Set the stream idle timeout
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the section id strategy
    pub fn with_section_ids(mut self, ids: SectionIds) -> Self {
        self.ids = ids;
        self
    }

    /// Build the rewrite request for `command`
    pub fn build_request(&self, mission: &Mission, command: &str) -> CompletionRequest {
        let system = PromptBuilder::new(Template::DocumentEditor)
            .list(
                "AGENT_PROFILES",
                mission.agents.iter().map(|a| a.profile_line()),
                "(no agents)",
            )
            .build();

        let prompt = PromptBuilder::new(Template::DocumentRequest)
            .var("DOCUMENT", join_sections(&mission.document))
            .var("COMMAND", command)
            .build();

        CompletionRequest::new(&self.settings.text_model, prompt).with_system_instruction(system)
    }

    /// Stream a rewrite of the whole document and apply it section by section
    ///
    /// `observer` sees the document after every fragment. If the stream fails
    /// or is cancelled the document is restored to its state before the
    /// command and the error is returned.
    pub async fn apply_command(
        &self,
        mission: &mut Mission,
        command: &str,
        cancel: &CancellationToken,
        observer: &mut dyn DocumentObserver,
    ) -> Result<Vec<SectionOp>> {
        let command = command.trim();
        if command.is_empty() {
            return Err(Error::Validation("Document command is empty".to_string()));
        }

        let _guard = self.inflight.try_acquire(&mission.id)?;
        let original = mission.document.clone();
        let request = self.build_request(mission, command);

        debug!(mission_id = %mission.id, sections = original.len(), "Rewriting document");

        let outcome = match self.model.generate_stream(&request).await {
            Ok(stream) => {
                let mut handler = RewriteHandler {
                    previous: &original,
                    ids: self.ids,
                    document: &mut mission.document,
                    observer: &mut *observer,
                };
                let mut aggregator = StreamAggregator::new(self.idle_timeout);
                aggregator.consume(stream, cancel, &mut handler).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                let ops = diff_sections(&original, &mission.document);
                info!(
                    mission_id = %mission.id,
                    sections = mission.document.len(),
                    "Document rewritten"
                );
                Ok(ops)
            }
            Err(e) => {
                warn!(mission_id = %mission.id, error = %e, "Document command failed, restoring");
                mission.document = original;
                observer.on_document(&mission.document);
                Err(e)
            }
        }
    }
}

struct RewriteHandler<'a, O: DocumentObserver + ?Sized> {
    previous: &'a [Section],
    ids: SectionIds,
    document: &'a mut Vec<Section>,
    observer: &'a mut O,
}

impl<O: DocumentObserver + ?Sized> StreamHandler for RewriteHandler<'_, O> {
    fn on_fragment(&mut self, _fragment: &str, buffer: &str) {
        *self.document = split_sections(buffer, self.previous, self.ids);
        self.observer.on_document(self.document.as_slice());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::find_agent;
    use crate::mission::MissionBrief;
    use crate::testing::{ScriptedModel, StreamScript};

    fn section(id: &str, content: &str) -> Section {
        Section {
            id: id.to_string(),
            content: content.to_string(),
        }
    }

    fn doc() -> Vec<Section> {
        vec![
            section("s1", "# Plan"),
            section("s2", "Goals"),
            section("s3", "Budget"),
        ]
    }

    #[test]
    fn test_split_join_round_trip() {
        let sections = doc();
        let joined = join_sections(&sections);
        assert_eq!(joined, "# Plan\n\n---\n\nGoals\n\n---\n\nBudget");

        let back = split_sections(&joined, &sections, SectionIds::Positional);
        assert_eq!(back, sections);
    }

    #[test]
    fn test_positional_ids_shift_on_insert() {
        let text = "# Plan\n\n---\n\nNew\n\n---\n\nGoals\n\n---\n\nBudget";
        let out = split_sections(text, &doc(), SectionIds::Positional);
        assert_eq!(out.len(), 4);
        assert_eq!(out[1].id, "s2");
        assert_eq!(out[1].content, "New");
        assert_eq!(out[2].id, "s3");
        assert!(out[3].id.starts_with("section-"));
    }

    #[test]
    fn test_stable_ids_follow_content() {
        let text = "# Plan\n\n---\n\nNew\n\n---\n\nGoals\n\n---\n\nBudget";
        let out = split_sections(text, &doc(), SectionIds::Stable);
        assert_eq!(out[0].id, "s1");
        assert_eq!(out[2].id, "s2");
        assert_eq!(out[3].id, "s3");
        assert!(out[1].id.starts_with("section-"));

        let ops = diff_sections(&doc(), &out);
        assert!(ops.contains(&SectionOp::Insert {
            id: out[1].id.clone(),
            index: 1
        }));
        assert_eq!(ops.iter().filter(|op| matches!(op, SectionOp::Keep { .. })).count(), 3);
    }

    #[test]
    fn test_stable_ids_edit_in_place() {
        let text = "# Plan\n\n---\n\nGoals v2\n\n---\n\nBudget";
        let out = split_sections(text, &doc(), SectionIds::Stable);
        let ids: Vec<_> = out.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
        assert_eq!(
            diff_sections(&doc(), &out)[1],
            SectionOp::Update { id: "s2".to_string() }
        );
    }

    #[test]
    fn test_stable_ids_reorder_and_delete() {
        let text = "Budget\n\n---\n\n# Plan";
        let out = split_sections(text, &doc(), SectionIds::Stable);
        assert_eq!(out[0].id, "s3");
        assert_eq!(out[1].id, "s1");

        let ops = diff_sections(&doc(), &out);
        assert!(ops.contains(&SectionOp::Delete { id: "s2".to_string() }));
    }

    #[test]
    fn test_stable_ids_duplicate_content() {
        let prev = vec![section("a", "same"), section("b", "same")];
        let out = split_sections("same\n\n---\n\nsame\n\n---\n\nsame", &prev, SectionIds::Stable);
        assert_eq!(out[0].id, "a");
        assert_eq!(out[1].id, "b");
        assert!(out[2].id.starts_with("section-"));
    }

    #[test]
    fn test_place_visual_at_offset() {
        let sections = vec![section("s1", "Hello world")];
        let out = place_visual(&sections, 5, VisualKind::Mermaid, "graph TD; A-->B");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "s1");
        assert_eq!(
            out[0].content,
            "Hello\n```mermaid\ngraph TD; A-->B\n```\n world"
        );
    }

    #[test]
    fn test_place_visual_counts_chars_and_clamps() {
        let sections = vec![section("s1", "héllo")];
        let out = place_visual(&sections, 2, VisualKind::Image, "data:x");
        assert_eq!(out[0].content, "hé\n![Generated Image](data:x)\nllo");

        let out = place_visual(&sections, 999, VisualKind::Image, "data:x");
        assert_eq!(out[0].content, "héllo\n![Generated Image](data:x)\n");
    }

    #[test]
    fn test_place_visual_in_second_section() {
        let sections = doc();
        // offset just past "# Plan\n\n---\n\n"
        let offset = "# Plan".len() + SECTION_SEPARATOR.len();
        let out = place_visual(&sections, offset, VisualKind::Image, "u");
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].id, "s2");
        assert!(out[1].content.starts_with("\n![Generated Image](u)\nGoals"));
    }

    #[test]
    fn test_promote() {
        let out = promote(&doc(), "Great idea from the huddle").unwrap();
        assert_eq!(out.len(), 4);
        assert!(out[3].id.starts_with("section-promo-"));
        assert!(promote(&doc(), "  ").is_err());
    }

    #[test]
    fn test_place_message_visual() {
        let mut mission = Mission::new(MissionBrief::new("T", "", "R"), vec![]);
        let mut msg = crate::mission::HuddleMessage::agent_placeholder();
        msg.is_loading = false;
        msg.visual_type = Some(VisualKind::Mermaid);
        msg.visual_code = Some("graph TD".to_string());
        let id = msg.id.clone();
        mission.huddle_messages.push(msg);
        mission
            .huddle_messages
            .push(crate::mission::HuddleMessage::user("no visual"));
        let plain_id = mission.huddle_messages[1].id.clone();

        place_message_visual(&mut mission, &id, 0).unwrap();
        assert!(mission.document[0].content.starts_with("\n```mermaid\ngraph TD"));

        assert!(matches!(
            place_message_visual(&mut mission, &plain_id, 0),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            place_message_visual(&mut mission, "missing", 0),
            Err(Error::NotFound(_))
        ));
    }

    fn mission() -> Mission {
        let mut m = Mission::new(
            MissionBrief::new("Launch", "", "Founder"),
            vec![find_agent("Kairo").unwrap()],
        );
        m.document = doc();
        m
    }

    #[tokio::test]
    async fn test_apply_command_streams_sections() {
        let model = Arc::new(ScriptedModel::new().with_stream(StreamScript::ok([
            "# Plan v2\n\n--",
            "-\n\nGoals\n\n---\n\n",
            "Budget\n\n---\n\nTimeline",
        ])));
        let editor = DocumentEditor::new(model.clone(), ModelSettings::default(), InFlight::new());
        let mut mission = mission();
        let mut snapshots: Vec<usize> = Vec::new();
        let mut observer = |s: &[Section]| snapshots.push(s.len());

        let ops = editor
            .apply_command(&mut mission, "add a timeline", &CancellationToken::new(), &mut observer)
            .await
            .unwrap();

        assert_eq!(snapshots, vec![1, 3, 4]);
        let ids: Vec<_> = mission.document.iter().take(3).map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
        assert_eq!(mission.document[3].content, "Timeline");
        assert_eq!(ops[0], SectionOp::Update { id: "s1".to_string() });

        let request = model.last_request();
        assert!(request.prompt.contains("Command: \"add a timeline\""));
        assert!(request.prompt.contains("# Plan\n\n---\n\nGoals"));
        assert!(request
            .system_instruction
            .unwrap()
            .contains("- Kairo (Content Creator):"));
    }

    #[tokio::test]
    async fn test_apply_command_restores_on_failure() {
        let model = Arc::new(ScriptedModel::new().with_stream(StreamScript::Items(vec![
            Ok("Totally different".to_string()),
            Err(Error::model("reset", true)),
        ])));
        let editor = DocumentEditor::new(model, ModelSettings::default(), InFlight::new());
        let mut mission = mission();
        let mut last: Vec<Section> = Vec::new();
        let mut observer = |s: &[Section]| last = s.to_vec();

        let err = editor
            .apply_command(&mut mission, "rewrite", &CancellationToken::new(), &mut observer)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Model { .. }));
        assert_eq!(mission.document, doc());
        assert_eq!(last, doc());
    }

    #[tokio::test]
    async fn test_apply_command_rejects_busy_and_empty() {
        let inflight = InFlight::new();
        let editor = DocumentEditor::new(
            Arc::new(ScriptedModel::new()),
            ModelSettings::default(),
            inflight.clone(),
        );
        let mut mission = mission();
        let mut observer = |_: &[Section]| {};

        let err = editor
            .apply_command(&mut mission, "  ", &CancellationToken::new(), &mut observer)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let _guard = inflight.try_acquire(&mission.id).unwrap();
        let err = editor
            .apply_command(&mut mission, "shorten", &CancellationToken::new(), &mut observer)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Busy(_)));
        assert_eq!(mission.document, doc());
    }

    #[tokio::test]
    async fn test_apply_command_cancel_restores() {
        let model = Arc::new(
            ScriptedModel::new().with_stream(StreamScript::Stall(vec!["half".to_string()])),
        );
        let editor = DocumentEditor::new(model, ModelSettings::default(), InFlight::new());
        let mut mission = mission();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let mut observer = |_: &[Section]| {};
        let err = editor
            .apply_command(&mut mission, "go", &cancel, &mut observer)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(mission.document, doc());
    }
}
