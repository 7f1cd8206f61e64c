//! Edit state behind the node properties panel.
//!
//! Text fields keep their own buffer while focused so keystrokes survive
//! the next frame; the graph only sees the value once editing finishes.
//! Continuous edits (slider drags) are applied live but recorded in the
//! undo history once, when the gesture ends.

use crate::graph::NodeId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct PropertyEdits {
    node: Option<NodeId>,
    buffers: HashMap<&'static str, String>,
    unrecorded: bool,
}

impl PropertyEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the selected node. Buffers of a previously selected node are
    /// dropped. Returns true if that node had live edits still waiting to be
    /// recorded.
    pub fn follow(&mut self, selected: Option<&str>) -> bool {
        if self.node.as_deref() == selected {
            return false;
        }
        self.node = selected.map(str::to_string);
        self.buffers.clear();
        std::mem::take(&mut self.unrecorded)
    }

    /// Text buffer for `field`, seeded with `initial` on first use.
    pub fn buffer(&mut self, field: &'static str, initial: impl FnOnce() -> String) -> &mut String {
        self.buffers.entry(field).or_insert_with(initial)
    }

    pub fn is_editing(&self, field: &str) -> bool {
        self.buffers.contains_key(field)
    }

    /// End editing of `field`, returning the typed text.
    pub fn finish(&mut self, field: &str) -> Option<String> {
        self.buffers.remove(field)
    }

    /// Forget a buffer without committing it.
    pub fn discard(&mut self, field: &str) {
        self.buffers.remove(field);
    }

    /// An edit reached the graph but is not in the undo history yet.
    pub fn applied_live(&mut self) {
        self.unrecorded = true;
    }

    /// Called when an edit gesture ends. Returns true once per batch of live
    /// edits, when history should be recorded.
    pub fn settle(&mut self) -> bool {
        std::mem::take(&mut self.unrecorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_text_survives_across_frames() {
        let mut edits = PropertyEdits::new();
        edits.follow(Some("cameraInput-1"));

        // Frame 1: the field is seeded from the node and the user types.
        edits.buffer("label", || "Camera Input".into()).push('x');
        // Frame 2: the node still holds the old label.
        let text = edits.buffer("label", || "Camera Input".into());
        assert_eq!(text, "Camera Inputx");
        text.push('y');

        assert_eq!(edits.finish("label").as_deref(), Some("Camera Inputxy"));
        assert!(!edits.is_editing("label"));
        assert_eq!(edits.buffer("label", || "fresh".into()), "fresh");
    }

    #[test]
    fn selection_change_drops_buffers() {
        let mut edits = PropertyEdits::new();
        edits.follow(Some("alert-1"));
        edits.buffer("label", || "Alert".into()).push_str(" gate");

        assert!(!edits.follow(Some("alert-1")));
        assert!(edits.is_editing("label"));

        edits.follow(Some("alert-2"));
        assert!(!edits.is_editing("label"));
        edits.follow(None);
        assert!(!edits.is_editing("label"));
    }

    #[test]
    fn drag_records_history_once() {
        let mut edits = PropertyEdits::new();
        edits.follow(Some("objectDetection-1"));
        for _ in 0..20 {
            edits.applied_live();
        }
        assert!(edits.settle());
        assert!(!edits.settle());
    }

    #[test]
    fn pending_live_edit_reported_on_deselect() {
        let mut edits = PropertyEdits::new();
        edits.follow(Some("objectDetection-1"));
        edits.applied_live();
        assert!(edits.follow(None));
        assert!(!edits.settle());
    }
}
