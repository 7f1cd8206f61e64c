//! # Widget Activation
//!
//! Tracks which of the selected module's widgets are on screen (`active`)
//! and which can still be added (`available`). Every widget of the module
//! sits in exactly one of the two lists at all times; the split is rebuilt
//! from the static catalog whenever a module is selected.

use crate::error::ActivationError;
use crate::modules::{ModuleId, WidgetDescriptor};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq)]
pub struct ModuleSession {
    pub module: ModuleId,
    active: Vec<&'static WidgetDescriptor>,
    available: Vec<&'static WidgetDescriptor>,
}

impl ModuleSession {
    fn seed(module: ModuleId) -> Self {
        let (active, available) = module.widgets().iter().partition(|w| w.permanent);
        Self {
            module,
            active,
            available,
        }
    }

    /// Every catalog widget appears exactly once across both lists.
    fn partition_holds(&self) -> bool {
        let catalog = self.module.widgets();
        let mut seen = HashSet::new();
        for w in self.active.iter().chain(self.available.iter()) {
            if !seen.insert(w.id) {
                return false;
            }
        }
        seen.len() == catalog.len() && catalog.iter().all(|w| seen.contains(w.id))
    }

    fn available_index(&self, widget_id: &str) -> Option<usize> {
        self.available.iter().position(|w| w.id == widget_id)
    }

    fn active_index(&self, widget_id: &str) -> Option<usize> {
        self.active.iter().position(|w| w.id == widget_id)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum ActivationState {
    #[default]
    NoModuleSelected,
    ModuleActive(ModuleSession),
}

/// Owned activation state for the dashboard view.
#[derive(Clone, Debug, Default)]
pub struct WidgetActivation {
    state: ActivationState,
}

impl WidgetActivation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ActivationState {
        &self.state
    }

    pub fn module(&self) -> Option<ModuleId> {
        match &self.state {
            ActivationState::ModuleActive(session) => Some(session.module),
            ActivationState::NoModuleSelected => None,
        }
    }

    pub fn active(&self) -> &[&'static WidgetDescriptor] {
        match &self.state {
            ActivationState::ModuleActive(session) => &session.active,
            ActivationState::NoModuleSelected => &[],
        }
    }

    pub fn available(&self) -> &[&'static WidgetDescriptor] {
        match &self.state {
            ActivationState::ModuleActive(session) => &session.available,
            ActivationState::NoModuleSelected => &[],
        }
    }

    pub fn is_active(&self, widget_id: &str) -> bool {
        self.active().iter().any(|w| w.id == widget_id)
    }

    /// Enter `module_id`, resetting the split to permanent = active,
    /// everything else = available. An unknown id leaves the state alone.
    pub fn select_module(&mut self, module_id: &str) -> Result<ModuleId, ActivationError> {
        let module: ModuleId = module_id.parse()?;
        self.state = ActivationState::ModuleActive(ModuleSession::seed(module));
        log::info!("[Dashboard] module '{}' selected", module);
        Ok(module)
    }

    /// Leave the current module. Returns the ids that were active so the
    /// caller can release their resources.
    pub fn deselect_module(&mut self) -> Vec<&'static str> {
        let previous = std::mem::take(&mut self.state);
        match previous {
            ActivationState::ModuleActive(session) => session.active.iter().map(|w| w.id).collect(),
            ActivationState::NoModuleSelected => Vec::new(),
        }
    }

    fn session_mut(&mut self) -> Result<&mut ModuleSession, ActivationError> {
        match &mut self.state {
            ActivationState::ModuleActive(session) => Ok(session),
            ActivationState::NoModuleSelected => Err(ActivationError::NoModuleSelected),
        }
    }

    /// Apply `change` to a copy of the session and commit it only if the
    /// partition still holds.
    fn mutate<T>(
        &mut self,
        change: impl FnOnce(&mut ModuleSession) -> Result<T, ActivationError>,
    ) -> Result<T, ActivationError> {
        let session = self.session_mut()?;
        let mut next = session.clone();
        let out = change(&mut next)?;
        if !next.partition_holds() {
            log::error!("[Dashboard] widget partition broken for '{}', change dropped", next.module);
            return Err(ActivationError::SetMismatch);
        }
        *session = next;
        Ok(out)
    }

    /// Move a widget from available to the end of active.
    pub fn activate(&mut self, widget_id: &str) -> Result<&'static WidgetDescriptor, ActivationError> {
        self.mutate(|s| {
            let index = s
                .available_index(widget_id)
                .ok_or_else(|| ActivationError::NotFound(widget_id.to_string()))?;
            let widget = s.available.remove(index);
            s.active.push(widget);
            Ok(widget)
        })
    }

    /// Move a non-permanent widget from active back to available.
    pub fn deactivate(&mut self, widget_id: &str) -> Result<&'static WidgetDescriptor, ActivationError> {
        self.mutate(|s| {
            let index = s
                .active_index(widget_id)
                .ok_or_else(|| ActivationError::NotFound(widget_id.to_string()))?;
            if s.active[index].permanent {
                return Err(ActivationError::PermanentWidget(widget_id.to_string()));
            }
            let widget = s.active.remove(index);
            s.available.push(widget);
            Ok(widget)
        })
    }

    /// Replace the active order. `order` must be a permutation of the
    /// current active ids.
    pub fn reorder(&mut self, order: &[&str]) -> Result<(), ActivationError> {
        self.mutate(|s| {
            let unique: HashSet<&str> = order.iter().copied().collect();
            if unique.len() != order.len() || order.len() != s.active.len() {
                return Err(ActivationError::SetMismatch);
            }
            let mut reordered = Vec::with_capacity(order.len());
            for id in order {
                let widget = s
                    .active
                    .iter()
                    .find(|w| w.id == *id)
                    .ok_or(ActivationError::SetMismatch)?;
                reordered.push(*widget);
            }
            s.active = reordered;
            Ok(())
        })
    }

    /// Swap the widget at `index` with its neighbour (`up` towards the front).
    pub fn nudge(&mut self, widget_id: &str, up: bool) -> Result<(), ActivationError> {
        let mut order: Vec<&str> = self.active().iter().map(|w| w.id).collect();
        let index = order
            .iter()
            .position(|id| *id == widget_id)
            .ok_or_else(|| ActivationError::NotFound(widget_id.to_string()))?;
        let other = if up { index.checked_sub(1) } else { Some(index + 1) };
        match other {
            Some(other) if other < order.len() => {
                order.swap(index, other);
                self.reorder(&order)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&'static WidgetDescriptor]) -> Vec<&'static str> {
        list.iter().map(|w| w.id).collect()
    }

    fn residential() -> WidgetActivation {
        let mut activation = WidgetActivation::new();
        activation.select_module("residential").unwrap();
        activation
    }

    fn assert_partition(activation: &WidgetActivation) {
        let module = activation.module().unwrap();
        let mut all: Vec<_> = ids(activation.active());
        all.extend(ids(activation.available()));
        all.sort();
        let mut expected: Vec<_> = module.widgets().iter().map(|w| w.id).collect();
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn select_module_seeds_partition() {
        let activation = residential();
        assert_eq!(ids(activation.active()), vec!["camera-main"]);
        assert_eq!(
            ids(activation.available()),
            vec!["occupancy", "package", "suspicious"]
        );
    }

    #[test]
    fn unknown_module_keeps_previous_state() {
        let mut activation = residential();
        activation.activate("occupancy").unwrap();
        assert_eq!(
            activation.select_module("moon-base"),
            Err(ActivationError::UnknownModule("moon-base".into()))
        );
        assert_eq!(activation.module(), Some(ModuleId::Residential));
        assert!(activation.is_active("occupancy"));
    }

    #[test]
    fn operations_need_a_module() {
        let mut activation = WidgetActivation::new();
        assert_eq!(
            activation.activate("occupancy").map(|w| w.id),
            Err(ActivationError::NoModuleSelected)
        );
    }

    #[test]
    fn activate_moves_widget_to_active() {
        let mut activation = residential();
        activation.activate("occupancy").unwrap();
        assert_eq!(ids(activation.active()), vec!["camera-main", "occupancy"]);
        assert_eq!(ids(activation.available()), vec!["package", "suspicious"]);
        assert_eq!(
            activation.activate("occupancy").map(|w| w.id),
            Err(ActivationError::NotFound("occupancy".into()))
        );
    }

    #[test]
    fn deactivate_permanent_fails_without_change() {
        let mut activation = residential();
        activation.activate("package").unwrap();
        let before = activation.state().clone();
        assert_eq!(
            activation.deactivate("camera-main").map(|w| w.id),
            Err(ActivationError::PermanentWidget("camera-main".into()))
        );
        assert_eq!(activation.state(), &before);
    }

    #[test]
    fn activate_deactivate_sequences_keep_partition() {
        let mut activation = WidgetActivation::new();
        activation.select_module("school").unwrap();
        let steps: [(&str, bool); 7] = [
            ("attendance", true),
            ("classroom", true),
            ("attendance", false),
            ("playground", true),
            ("camera-main", false),
            ("classroom", false),
            ("attendance", true),
        ];
        for (id, on) in steps {
            let _ = if on {
                activation.activate(id).map(|_| ())
            } else {
                activation.deactivate(id).map(|_| ())
            };
            assert_partition(&activation);
        }
        assert_eq!(
            ids(activation.active()),
            vec!["camera-main", "playground", "attendance"]
        );
    }

    #[test]
    fn reorder_requires_permutation() {
        let mut activation = residential();
        activation.activate("occupancy").unwrap();
        activation.activate("package").unwrap();

        activation
            .reorder(&["package", "camera-main", "occupancy"])
            .unwrap();
        assert_eq!(
            ids(activation.active()),
            vec!["package", "camera-main", "occupancy"]
        );

        for bad in [
            vec!["package", "camera-main"],
            vec!["package", "camera-main", "suspicious"],
            vec!["package", "package", "occupancy"],
        ] {
            assert_eq!(activation.reorder(&bad), Err(ActivationError::SetMismatch));
        }
        assert_eq!(
            ids(activation.active()),
            vec!["package", "camera-main", "occupancy"]
        );
    }

    #[test]
    fn nudge_swaps_neighbours() {
        let mut activation = residential();
        activation.activate("occupancy").unwrap();
        activation.nudge("occupancy", true).unwrap();
        assert_eq!(ids(activation.active()), vec!["occupancy", "camera-main"]);
        // Already at the front
        activation.nudge("occupancy", true).unwrap();
        assert_eq!(ids(activation.active()), vec!["occupancy", "camera-main"]);
    }

    #[test]
    fn deselect_returns_active_ids() {
        let mut activation = residential();
        activation.activate("suspicious").unwrap();
        assert_eq!(activation.deselect_module(), vec!["camera-main", "suspicious"]);
        assert_eq!(activation.state(), &ActivationState::NoModuleSelected);
        assert!(activation.active().is_empty());
    }
}
