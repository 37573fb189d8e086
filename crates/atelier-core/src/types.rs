use chrono::Utc;
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Author of a chat message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Typed by the person driving the workspace.
    User,
    /// Produced by the generation backend.
    Assistant,
    /// Injected by the client itself (notices, tool status).
    System,
}

/// Workspace section a message refers to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionRef {
    MoodBoard,
    Storyboard,
    HexCodes,
    Constraints,
    Summary,
    Final,
}

/// Who authored a constraint or summary revision.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintSource {
    User,
    Ai,
}

/// Kind of assembled final artifact.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalOutputKind {
    Image,
    Video,
}

// =============================================================================
// Chat transcript
// =============================================================================

/// Optional annotations attached to a message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    /// Section this message was generated for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_section: Option<SectionRef>,
    /// Palette swatches embedded in the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<HexColor>>,
}

/// One entry in a session's chat transcript.
///
/// Append-only within a session, except that the most recent assistant
/// message may have its `content` replaced wholesale while a response is
/// streaming in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

// =============================================================================
// Content sections
// =============================================================================

/// A generated mood board image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodBoardImage {
    pub id: String,
    pub image_url: String,
    /// Relative path of the locally cached copy, if downloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_snippet: Option<String>,
}

/// A storyboard scene.
///
/// `order` is the authoritative scene position and is independent of where
/// the scene sits in the containing list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryboardScene {
    pub id: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// A palette swatch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexColor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub hex: String,
}

/// A creative constraint, tagged with who introduced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    pub id: String,
    pub text: String,
    pub source: ConstraintSource,
    pub active: bool,
    pub created_at: i64,
}

/// The narrative summary document, at most one per session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDoc {
    pub id: String,
    pub content: String,
    pub updated_at: i64,
    pub source: ConstraintSource,
}

/// A final image/video artifact, listed newest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalOutput {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FinalOutputKind,
    pub preview_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub created_at: i64,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<i64>,
}

/// All generated content sections of one session.
///
/// Every field carries a serde default so a blob written by an older client
/// (or with sections missing) still deserializes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSnapshot {
    #[serde(default)]
    pub mood_board: Vec<MoodBoardImage>,
    #[serde(default)]
    pub storyboard: Vec<StoryboardScene>,
    #[serde(default)]
    pub hex_codes: Vec<HexColor>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub summary: Option<SummaryDoc>,
    #[serde(default)]
    pub final_outputs: Vec<FinalOutput>,
}

// =============================================================================
// Sessions
// =============================================================================

/// List-level metadata of a persisted session.
///
/// `id` is assigned once at creation and never reused; `updated_at` is bumped
/// on every persist or rename and never moves backwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// The full serializable state of one session: transcript plus content.
///
/// Stored as a single opaque blob next to its [`SessionRecord`]; each persist
/// replaces the whole blob, never part of it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub content: ContentSnapshot,
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
