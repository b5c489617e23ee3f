//! Visual block extraction
//!
//! Squad responses may embed one visual directive:
//!
//! ```text
//! [VISUAL_START:<kind>]<payload>[VISUAL_END]
//! ```
//!
//! where `<kind>` is `mermaid` (the payload is diagram source) or `image`
//! (the payload is a prompt for the image model). Extraction runs from
//! scratch on every buffer update, which is linear in the buffer length.

use std::fmt;
use std::sync::OnceLock;

use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::GeneratedImage;

/// Non-greedy match of one complete visual span
fn visual_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        match Regex::new(r"\[VISUAL_START:(mermaid|image)\]([\s\S]*?)\[VISUAL_END\]") {
            Ok(re) => re,
            Err(_) => unreachable!("static regex pattern is valid"),
        }
    })
}

/// Kind of embedded visual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualKind {
    /// Mermaid diagram source
    Mermaid,
    /// Image generation prompt, or a data URI once the image exists
    Image,
}

impl VisualKind {
    /// Get the wire name
    pub fn name(&self) -> &'static str {
        match self {
            VisualKind::Mermaid => "mermaid",
            VisualKind::Image => "image",
        }
    }
}

impl fmt::Display for VisualKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for VisualKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mermaid" | "diagram" => Ok(VisualKind::Mermaid),
            "image" | "img" => Ok(VisualKind::Image),
            _ => Err(format!("Unknown visual kind: {}", s)),
        }
    }
}

/// An extracted visual directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualBlock {
    pub kind: VisualKind,
    /// Exact text between the delimiters
    pub payload: String,
}

/// Result of scanning a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Buffer with the first visual span removed, trimmed
    pub prose: String,
    pub visual: Option<VisualBlock>,
}

/// Separate the first visual block from the surrounding prose
///
/// Without a complete block the prose is the buffer unchanged, so a block
/// whose end delimiter has not streamed in yet stays visible as text.
pub fn extract(buffer: &str) -> Extraction {
    let Some(caps) = visual_block_regex().captures(buffer) else {
        return Extraction {
            prose: buffer.to_string(),
            visual: None,
        };
    };

    // group 0 always participates in a match
    let Some(span) = caps.get(0) else {
        return Extraction {
            prose: buffer.to_string(),
            visual: None,
        };
    };

    let kind = match caps.get(1).map(|m| m.as_str()) {
        Some("image") => VisualKind::Image,
        _ => VisualKind::Mermaid,
    };
    let payload = caps
        .get(2)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let mut prose = String::with_capacity(buffer.len() - span.len());
    prose.push_str(&buffer[..span.start()]);
    prose.push_str(&buffer[span.end()..]);

    Extraction {
        prose: prose.trim().to_string(),
        visual: Some(VisualBlock { kind, payload }),
    }
}

/// Encode a generated image as a `data:` URI
pub fn image_data_uri(image: &GeneratedImage) -> String {
    format!(
        "data:{};base64,{}",
        image.mime_type,
        base64::engine::general_purpose::STANDARD.encode(&image.bytes)
    )
}

/// Markdown fragment that embeds a visual into a document
pub fn visual_markdown(kind: VisualKind, code: &str) -> String {
    match kind {
        VisualKind::Mermaid => format!("\n```mermaid\n{}\n```\n", code),
        VisualKind::Image => format!("\n![Generated Image]({})\n", code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_mermaid() {
        let buffer = "Here is the flow:\n[VISUAL_START:mermaid]graph TD;\nA-->B;[VISUAL_END]\nLet me know.";
        let out = extract(buffer);
        let visual = out.visual.unwrap();
        assert_eq!(visual.kind, VisualKind::Mermaid);
        assert_eq!(visual.payload, "graph TD;\nA-->B;");
        assert_eq!(out.prose, "Here is the flow:\n\nLet me know.");
        assert!(!out.prose.contains("VISUAL_START"));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let buffer = "[VISUAL_START:mermaid]graph LR; X-->Y[VISUAL_END] done";
        let first = extract(buffer);
        assert!(first.visual.is_some());

        let second = extract(&first.prose);
        assert!(second.visual.is_none());
        assert_eq!(second.prose, first.prose);
    }

    #[test]
    fn test_extract_image_prompt() {
        let out = extract("Sure! [VISUAL_START:image]A neon sneaker on a mossy rock[VISUAL_END]");
        let visual = out.visual.unwrap();
        assert_eq!(visual.kind, VisualKind::Image);
        assert_eq!(visual.payload, "A neon sneaker on a mossy rock");
        assert_eq!(out.prose, "Sure!");
    }

    #[test]
    fn test_incomplete_block_is_left_in_prose() {
        let buffer = "Drawing... [VISUAL_START:mermaid]graph TD; A-->";
        let out = extract(buffer);
        assert!(out.visual.is_none());
        assert_eq!(out.prose, buffer);
    }

    #[test]
    fn test_first_match_is_non_greedy() {
        let buffer = "[VISUAL_START:mermaid]one[VISUAL_END] mid [VISUAL_START:image]two[VISUAL_END]";
        let out = extract(buffer);
        assert_eq!(out.visual.unwrap().payload, "one");
        assert_eq!(out.prose, "mid [VISUAL_START:image]two[VISUAL_END]");
    }

    #[test]
    fn test_unknown_kind_is_not_a_block() {
        let buffer = "[VISUAL_START:chart]x[VISUAL_END]";
        assert!(extract(buffer).visual.is_none());
    }

    #[test]
    fn test_payload_is_exact() {
        let out = extract("[VISUAL_START:mermaid]  padded  [VISUAL_END]");
        assert_eq!(out.visual.unwrap().payload, "  padded  ");
        assert_eq!(out.prose, "");
    }

    #[test]
    fn test_image_data_uri() {
        let image = GeneratedImage {
            mime_type: "image/png".to_string(),
            bytes: b"png".to_vec(),
        };
        assert_eq!(image_data_uri(&image), "data:image/png;base64,cG5n");
    }

    #[test]
    fn test_visual_markdown() {
        assert_eq!(
            visual_markdown(VisualKind::Mermaid, "graph TD; A-->B"),
            "\n```mermaid\ngraph TD; A-->B\n```\n"
        );
        assert_eq!(
            visual_markdown(VisualKind::Image, "data:image/png;base64,AA=="),
            "\n![Generated Image](data:image/png;base64,AA==)\n"
        );
    }

    #[test]
    fn test_visual_kind_parse() {
        assert_eq!("Mermaid".parse::<VisualKind>().unwrap(), VisualKind::Mermaid);
        assert_eq!("img".parse::<VisualKind>().unwrap(), VisualKind::Image);
        assert!("video".parse::<VisualKind>().is_err());
    }
}
