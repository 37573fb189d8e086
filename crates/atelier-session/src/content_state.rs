//! Generated-content state provider.
//!
//! Holds the five content sections plus the final outputs list for the
//! active session. Data mutations bump a watch-channel version counter the
//! controller subscribes to; loading and error flags are UI bookkeeping and
//! do not count as content changes.

use std::sync::Mutex;

use tokio::sync::watch;

use atelier_core::types::{
    now_millis, Constraint, ContentSnapshot, FinalOutput, HexColor, MoodBoardImage,
    StoryboardScene, SummaryDoc,
};

/// One content section, for loading/error bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    MoodBoard,
    Storyboard,
    HexCodes,
    Constraints,
    Summary,
}

/// Per-section wrapper around the data and its fetch status.
#[derive(Clone, Debug, Default)]
struct SectionState<T> {
    data: T,
    is_loading: bool,
    error: Option<String>,
    updated_at: Option<i64>,
}

impl<T> SectionState<T> {
    fn with_data(data: T) -> Self {
        Self {
            data,
            is_loading: false,
            error: None,
            updated_at: Some(now_millis()),
        }
    }

    fn set(&mut self, data: T) {
        self.data = data;
        self.updated_at = Some(now_millis());
        self.error = None;
        self.is_loading = false;
    }
}

#[derive(Default)]
struct ContentInner {
    mood_board: SectionState<Vec<MoodBoardImage>>,
    storyboard: SectionState<Vec<StoryboardScene>>,
    hex_codes: SectionState<Vec<HexColor>>,
    constraints: SectionState<Vec<Constraint>>,
    summary: SectionState<Option<SummaryDoc>>,
    final_outputs: Vec<FinalOutput>,
}

impl ContentInner {
    fn status_mut(&mut self, section: Section) -> (&mut bool, &mut Option<String>) {
        match section {
            Section::MoodBoard => (&mut self.mood_board.is_loading, &mut self.mood_board.error),
            Section::Storyboard => (&mut self.storyboard.is_loading, &mut self.storyboard.error),
            Section::HexCodes => (&mut self.hex_codes.is_loading, &mut self.hex_codes.error),
            Section::Constraints => (
                &mut self.constraints.is_loading,
                &mut self.constraints.error,
            ),
            Section::Summary => (&mut self.summary.is_loading, &mut self.summary.error),
        }
    }
}

/// Shared content state for the active session.
pub struct ContentState {
    inner: Mutex<ContentInner>,
    version: watch::Sender<u64>,
}

impl Default for ContentState {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentState {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Mutex::new(ContentInner::default()),
            version,
        }
    }

    fn with_inner<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut ContentInner) -> T,
    {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut inner)
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    // -------------------------------------------------------------------------
    // Section data
    // -------------------------------------------------------------------------

    pub fn set_mood_board(&self, images: Vec<MoodBoardImage>) {
        self.with_inner(|inner| inner.mood_board.set(images));
        self.bump();
    }

    pub fn set_storyboard(&self, scenes: Vec<StoryboardScene>) {
        self.with_inner(|inner| inner.storyboard.set(scenes));
        self.bump();
    }

    pub fn set_hex_codes(&self, colors: Vec<HexColor>) {
        self.with_inner(|inner| inner.hex_codes.set(colors));
        self.bump();
    }

    pub fn set_constraints(&self, constraints: Vec<Constraint>) {
        self.with_inner(|inner| inner.constraints.set(constraints));
        self.bump();
    }

    pub fn set_summary(&self, summary: Option<SummaryDoc>) {
        self.with_inner(|inner| inner.summary.set(summary));
        self.bump();
    }

    /// Prepend a constraint (newest first, like the panel renders them).
    pub fn add_constraint(&self, constraint: Constraint) {
        self.with_inner(|inner| {
            inner.constraints.data.insert(0, constraint);
            inner.constraints.updated_at = Some(now_millis());
        });
        self.bump();
    }

    /// Replace a constraint by id. Unknown ids are ignored.
    pub fn update_constraint(&self, constraint: Constraint) {
        let changed = self.with_inner(|inner| {
            if let Some(existing) = inner
                .constraints
                .data
                .iter_mut()
                .find(|c| c.id == constraint.id)
            {
                *existing = constraint;
                inner.constraints.updated_at = Some(now_millis());
                true
            } else {
                false
            }
        });
        if changed {
            self.bump();
        }
    }

    pub fn remove_constraint(&self, id: &str) {
        let changed = self.with_inner(|inner| {
            let before = inner.constraints.data.len();
            inner.constraints.data.retain(|c| c.id != id);
            if inner.constraints.data.len() != before {
                inner.constraints.updated_at = Some(now_millis());
                true
            } else {
                false
            }
        });
        if changed {
            self.bump();
        }
    }

    // -------------------------------------------------------------------------
    // Final outputs
    // -------------------------------------------------------------------------

    /// Prepend a final output (newest first).
    pub fn add_final_output(&self, output: FinalOutput) {
        self.with_inner(|inner| inner.final_outputs.insert(0, output));
        self.bump();
    }

    /// Edit a final output in place by id. Unknown ids are ignored.
    pub fn replace_final_output<F>(&self, id: &str, f: F)
    where
        F: FnOnce(&mut FinalOutput),
    {
        let changed = self.with_inner(|inner| {
            if let Some(output) = inner.final_outputs.iter_mut().find(|o| o.id == id) {
                f(output);
                true
            } else {
                false
            }
        });
        if changed {
            self.bump();
        }
    }

    pub fn set_final_outputs(&self, outputs: Vec<FinalOutput>) {
        self.with_inner(|inner| inner.final_outputs = outputs);
        self.bump();
    }

    // -------------------------------------------------------------------------
    // Fetch status (does not bump the content version)
    // -------------------------------------------------------------------------

    pub fn set_loading(&self, section: Section, is_loading: bool) {
        self.with_inner(|inner| {
            let (loading, error) = inner.status_mut(section);
            *loading = is_loading;
            if is_loading {
                *error = None;
            }
        });
    }

    pub fn set_error(&self, section: Section, message: Option<String>) {
        self.with_inner(|inner| {
            let (loading, error) = inner.status_mut(section);
            *loading = false;
            *error = message;
        });
    }

    pub fn is_loading(&self, section: Section) -> bool {
        self.with_inner(|inner| *inner.status_mut(section).0)
    }

    pub fn error(&self, section: Section) -> Option<String> {
        self.with_inner(|inner| inner.status_mut(section).1.clone())
    }

    // -------------------------------------------------------------------------
    // Snapshot boundary
    // -------------------------------------------------------------------------

    /// Materialize the full content state for persistence.
    pub fn snapshot(&self) -> ContentSnapshot {
        self.with_inner(|inner| ContentSnapshot {
            mood_board: inner.mood_board.data.clone(),
            storyboard: inner.storyboard.data.clone(),
            hex_codes: inner.hex_codes.data.clone(),
            constraints: inner.constraints.data.clone(),
            summary: inner.summary.data.clone(),
            final_outputs: inner.final_outputs.clone(),
        })
    }

    /// Replace every section from a loaded snapshot (hydration).
    ///
    /// Deliberately does not bump the version counter: a hydration write is
    /// not a content edit and must never feed back into a persist of the
    /// session being replaced.
    pub fn hydrate(&self, snapshot: ContentSnapshot) {
        self.with_inner(|inner| {
            inner.mood_board = SectionState::with_data(snapshot.mood_board);
            inner.storyboard = SectionState::with_data(snapshot.storyboard);
            inner.hex_codes = SectionState::with_data(snapshot.hex_codes);
            inner.constraints = SectionState::with_data(snapshot.constraints);
            inner.summary = SectionState::with_data(snapshot.summary);
            inner.final_outputs = snapshot.final_outputs;
        });
    }

    /// Reset to an empty workspace. Silent, like [`hydrate`](Self::hydrate).
    pub fn clear(&self) {
        self.with_inner(|inner| *inner = ContentInner::default());
    }

    /// Current change-counter value.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Subscribe to content change notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::types::ConstraintSource;

    fn constraint(id: &str, text: &str) -> Constraint {
        Constraint {
            id: id.to_string(),
            text: text.to_string(),
            source: ConstraintSource::User,
            active: true,
            created_at: now_millis(),
        }
    }

    #[test]
    fn test_snapshot_round_trip_through_hydrate() {
        let content = ContentState::new();
        content.set_hex_codes(vec![HexColor {
            id: "h1".into(),
            name: None,
            hex: "#101010".into(),
        }]);
        content.add_constraint(constraint("c1", "night only"));

        let snapshot = content.snapshot();

        let other = ContentState::new();
        other.hydrate(snapshot.clone());
        assert_eq!(other.snapshot(), snapshot);
    }

    #[test]
    fn test_data_mutations_bump_version() {
        let content = ContentState::new();
        assert_eq!(content.version(), 0);

        content.set_mood_board(Vec::new());
        content.add_constraint(constraint("c1", "x"));
        content.remove_constraint("c1");
        assert_eq!(content.version(), 3);

        // Removing something that is not there is not a change.
        content.remove_constraint("c1");
        assert_eq!(content.version(), 3);

        // Hydration and clear are not edits.
        content.hydrate(ContentSnapshot::default());
        content.clear();
        assert_eq!(content.version(), 3);
    }

    #[test]
    fn test_status_flags_do_not_bump_version() {
        let content = ContentState::new();
        content.set_loading(Section::Summary, true);
        content.set_error(Section::Summary, Some("backend down".into()));
        assert_eq!(content.version(), 0);

        assert!(!content.is_loading(Section::Summary));
        assert_eq!(content.error(Section::Summary).as_deref(), Some("backend down"));
    }

    #[test]
    fn test_loading_clears_previous_error() {
        let content = ContentState::new();
        content.set_error(Section::HexCodes, Some("boom".into()));
        content.set_loading(Section::HexCodes, true);
        assert!(content.is_loading(Section::HexCodes));
        assert!(content.error(Section::HexCodes).is_none());
    }

    #[test]
    fn test_final_outputs_newest_first() {
        let content = ContentState::new();
        let make = |id: &str| FinalOutput {
            id: id.to_string(),
            kind: atelier_core::types::FinalOutputKind::Image,
            preview_url: String::new(),
            preview_path: None,
            download_url: None,
            created_at: now_millis(),
            format: "png".into(),
            notes: None,
            saved_path: None,
            saved_at: None,
        };

        content.add_final_output(make("first"));
        content.add_final_output(make("second"));

        let snapshot = content.snapshot();
        assert_eq!(snapshot.final_outputs[0].id, "second");
        assert_eq!(snapshot.final_outputs[1].id, "first");
    }

    #[test]
    fn test_replace_final_output() {
        let content = ContentState::new();
        content.add_final_output(FinalOutput {
            id: "f1".into(),
            kind: atelier_core::types::FinalOutputKind::Video,
            preview_url: String::new(),
            preview_path: None,
            download_url: None,
            created_at: 0,
            format: "mp4".into(),
            notes: None,
            saved_path: None,
            saved_at: None,
        });

        content.replace_final_output("f1", |output| {
            output.saved_path = Some("exports/f1.mp4".into());
        });

        let snapshot = content.snapshot();
        assert_eq!(
            snapshot.final_outputs[0].saved_path.as_deref(),
            Some("exports/f1.mp4")
        );
    }

    #[test]
    fn test_update_constraint_by_id() {
        let content = ContentState::new();
        content.add_constraint(constraint("c1", "old text"));

        let mut updated = constraint("c1", "new text");
        updated.active = false;
        content.update_constraint(updated);

        let snapshot = content.snapshot();
        assert_eq!(snapshot.constraints[0].text, "new text");
        assert!(!snapshot.constraints[0].active);
    }

    #[test]
    fn test_clear_resets_everything() {
        let content = ContentState::new();
        content.set_summary(Some(SummaryDoc {
            id: "s".into(),
            content: "plot".into(),
            updated_at: 0,
            source: ConstraintSource::Ai,
        }));
        content.clear();

        let snapshot = content.snapshot();
        assert!(snapshot.summary.is_none());
        assert!(snapshot.mood_board.is_empty());
    }
}
