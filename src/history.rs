use crate::graph::PipelineGraph;

/// Snapshot history for the widget builder. The entry at `current_index`
/// always mirrors the graph on screen.
#[derive(Clone, Debug)]
pub struct UndoStack {
    history: Vec<PipelineGraph>,
    current_index: usize,
    max_records: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::with_limit(1000)
    }
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_records: usize) -> Self {
        Self {
            history: Vec::new(),
            current_index: 0,
            max_records: max_records.max(1),
        }
    }

    pub fn set_limit(&mut self, max_records: usize) {
        self.max_records = max_records.max(1);
        self.trim();
    }

    pub fn push(&mut self, graph: &PipelineGraph) {
        // Drop the redo branch
        if self.current_index + 1 < self.history.len() {
            self.history.truncate(self.current_index + 1);
        }

        self.history.push(graph.clone());
        self.current_index = self.history.len() - 1;
        self.trim();
    }

    fn trim(&mut self) {
        while self.history.len() > self.max_records {
            self.history.remove(0);
            self.current_index = self.current_index.saturating_sub(1);
        }
    }

    /// Start over from `graph`, e.g. after loading or clearing.
    pub fn reset(&mut self, graph: &PipelineGraph) {
        self.history.clear();
        self.history.push(graph.clone());
        self.current_index = 0;
    }

    pub fn can_undo(&self) -> bool {
        self.current_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current_index + 1 < self.history.len()
    }

    pub fn undo(&mut self) -> Option<PipelineGraph> {
        if self.can_undo() {
            self.current_index -= 1;
            self.history.get(self.current_index).cloned()
        } else {
            None
        }
    }

    pub fn redo(&mut self) -> Option<PipelineGraph> {
        if self.can_redo() {
            self.current_index += 1;
            self.history.get(self.current_index).cloned()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Position;

    fn graph_with(count: usize) -> PipelineGraph {
        let mut graph = PipelineGraph::new();
        for i in 0..count {
            graph
                .add_node("alert", Position::new(i as f32 * 10.0, 0.0))
                .unwrap();
        }
        graph
    }

    #[test]
    fn undo_redo_walks_snapshots() {
        let mut stack = UndoStack::new();
        stack.reset(&graph_with(0));
        stack.push(&graph_with(1));
        stack.push(&graph_with(2));

        assert_eq!(stack.undo().map(|g| g.nodes().len()), Some(1));
        assert_eq!(stack.undo().map(|g| g.nodes().len()), Some(0));
        assert!(stack.undo().is_none());
        assert_eq!(stack.redo().map(|g| g.nodes().len()), Some(1));
    }

    #[test]
    fn push_after_undo_drops_redo_branch() {
        let mut stack = UndoStack::new();
        stack.reset(&graph_with(0));
        stack.push(&graph_with(1));
        stack.undo();
        stack.push(&graph_with(3));
        assert!(!stack.can_redo());
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn limit_discards_oldest() {
        let mut stack = UndoStack::with_limit(2);
        stack.reset(&graph_with(0));
        stack.push(&graph_with(1));
        stack.push(&graph_with(2));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.undo().map(|g| g.nodes().len()), Some(1));
        assert!(stack.undo().is_none());
    }
}
