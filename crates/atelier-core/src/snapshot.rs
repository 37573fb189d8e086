//! Canonical serialization of a session snapshot.
//!
//! The snapshot blob is the unit of persistence: one JSON document holding
//! the full transcript and every content section. Encoding is deterministic
//! and round-trips exactly; decoding is lenient, because a corrupt blob must
//! degrade to an empty workspace rather than fail the caller.

use tracing::warn;

use crate::error::Result;
use crate::types::SessionSnapshot;

impl SessionSnapshot {
    /// The canonical zero value: no messages, all sections empty, no summary.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when the snapshot holds nothing worth persisting.
    pub fn is_empty(&self) -> bool {
        let content = &self.content;
        self.messages.is_empty()
            && content.mood_board.is_empty()
            && content.storyboard.is_empty()
            && content.hex_codes.is_empty()
            && content.constraints.is_empty()
            && content.summary.is_none()
            && content.final_outputs.is_empty()
    }
}

/// Encode a snapshot to its storage blob.
pub fn encode(snapshot: &SessionSnapshot) -> Result<String> {
    Ok(serde_json::to_string(snapshot)?)
}

/// Decode a storage blob into a snapshot.
///
/// Malformed JSON or an unrecognizable shape yields [`SessionSnapshot::empty`]
/// with a logged warning. The session then simply appears empty; this is
/// never surfaced as an error.
pub fn decode(blob: &str) -> SessionSnapshot {
    match serde_json::from_str::<SessionSnapshot>(blob) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "Failed to parse session snapshot, substituting empty");
            SessionSnapshot::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    fn sample_snapshot() -> SessionSnapshot {
        SessionSnapshot {
            messages: vec![
                Message {
                    id: "m1".into(),
                    role: MessageRole::User,
                    content: "moody neon alley at dusk".into(),
                    timestamp: 1_700_000_000_000,
                    metadata: None,
                },
                Message {
                    id: "m2".into(),
                    role: MessageRole::Assistant,
                    content: "Here is a first palette.".into(),
                    timestamp: 1_700_000_000_500,
                    metadata: Some(MessageMetadata {
                        referenced_section: Some(SectionRef::HexCodes),
                        palette: Some(vec![HexColor {
                            id: "h1".into(),
                            name: Some("Signal Pink".into()),
                            hex: "#ff2d78".into(),
                        }]),
                    }),
                },
            ],
            content: ContentSnapshot {
                mood_board: vec![MoodBoardImage {
                    id: "img1".into(),
                    image_url: "https://example.test/1.png".into(),
                    image_path: Some("images/mood-board/s1/img1.png".into()),
                    title: Some("Alley".into()),
                    description: None,
                    prompt_snippet: Some("neon alley".into()),
                }],
                storyboard: vec![StoryboardScene {
                    id: "sc1".into(),
                    image_url: "https://example.test/sc1.png".into(),
                    image_path: None,
                    title: "Opening".into(),
                    description: Some("Rain on glass".into()),
                    order: 3,
                    timestamp: Some("00:04".into()),
                }],
                hex_codes: vec![HexColor {
                    id: "h1".into(),
                    name: None,
                    hex: "#0a0a23".into(),
                }],
                constraints: vec![Constraint {
                    id: "c1".into(),
                    text: "no daylight shots".into(),
                    source: ConstraintSource::User,
                    active: true,
                    created_at: 1_700_000_000_100,
                }],
                summary: Some(SummaryDoc {
                    id: "sum1".into(),
                    content: "A night-time chase through neon streets.".into(),
                    updated_at: 1_700_000_001_000,
                    source: ConstraintSource::Ai,
                }),
                final_outputs: vec![FinalOutput {
                    id: "f1".into(),
                    kind: FinalOutputKind::Image,
                    preview_url: "https://example.test/final.png".into(),
                    preview_path: None,
                    download_url: Some("https://example.test/final-4k.png".into()),
                    created_at: 1_700_000_002_000,
                    format: "png".into(),
                    notes: None,
                    saved_path: None,
                    saved_at: None,
                }],
            },
        }
    }

    #[test]
    fn test_round_trip_is_exact() {
        let snapshot = sample_snapshot();
        let blob = encode(&snapshot).unwrap();
        assert_eq!(decode(&blob), snapshot);
    }

    #[test]
    fn test_empty_round_trip() {
        let blob = encode(&SessionSnapshot::empty()).unwrap();
        assert_eq!(decode(&blob), SessionSnapshot::empty());
    }

    #[test]
    fn test_decode_garbage_yields_empty() {
        assert_eq!(decode("not json at all"), SessionSnapshot::empty());
        assert_eq!(decode(""), SessionSnapshot::empty());
        assert_eq!(decode("[1,2,3]"), SessionSnapshot::empty());
        assert_eq!(decode("{\"messages\": 42}"), SessionSnapshot::empty());
    }

    #[test]
    fn test_decode_partial_shape_fills_defaults() {
        let snapshot = decode("{\"messages\":[],\"content\":{\"hexCodes\":[]}}");
        assert_eq!(snapshot, SessionSnapshot::empty());

        // Unknown sections are ignored, known ones survive.
        let snapshot =
            decode("{\"content\":{\"hexCodes\":[{\"id\":\"h\",\"hex\":\"#fff\"}],\"futureField\":true}}");
        assert_eq!(snapshot.content.hex_codes.len(), 1);
        assert!(snapshot.messages.is_empty());
    }

    #[test]
    fn test_is_empty() {
        assert!(SessionSnapshot::empty().is_empty());
        assert!(!sample_snapshot().is_empty());

        let mut snapshot = SessionSnapshot::empty();
        snapshot.content.summary = Some(SummaryDoc {
            id: "s".into(),
            content: String::new(),
            updated_at: 0,
            source: ConstraintSource::Ai,
        });
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_encode_preserves_wire_field_names() {
        let blob = encode(&sample_snapshot()).unwrap();
        assert!(blob.contains("\"moodBoard\""));
        assert!(blob.contains("\"finalOutputs\""));
        assert!(blob.contains("\"promptSnippet\""));
        assert!(blob.contains("\"createdAt\""));
    }
}
