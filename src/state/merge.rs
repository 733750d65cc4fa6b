//! Merging a newly loaded state into the running one.
//!
//! Parts that are unchanged keep the existing instance; everything else is
//! taken from the incoming state. The [`MergeReport`] tells the caller which
//! displays and transforms need to be re-applied.

use super::document::{AppState, DisplayState};
use crate::transform::{DataTransform, TransformId, TransformTree};

/// What a merge kept, replaced, added and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub displays_kept: Vec<String>,
    pub displays_changed: Vec<String>,
    pub displays_added: Vec<String>,
    pub displays_removed: Vec<String>,
    pub transforms_kept: Vec<TransformId>,
    pub transforms_changed: Vec<TransformId>,
    pub transforms_added: Vec<TransformId>,
    pub transforms_removed: Vec<TransformId>,
}

impl MergeReport {
    /// True when the incoming state matched the existing one exactly.
    pub fn is_unchanged(&self) -> bool {
        self.displays_changed.is_empty()
            && self.displays_added.is_empty()
            && self.displays_removed.is_empty()
            && self.transforms_changed.is_empty()
            && self.transforms_added.is_empty()
            && self.transforms_removed.is_empty()
    }
}

/// Compare two states without modifying either.
pub fn diff(old: &AppState, new: &AppState) -> MergeReport {
    let mut report = MergeReport::default();

    for display in &new.displays {
        match old.display(&display.name) {
            Some(existing) if existing == display => {
                report.displays_kept.push(display.name.clone())
            }
            Some(_) => report.displays_changed.push(display.name.clone()),
            None => report.displays_added.push(display.name.clone()),
        }
    }
    report.displays_removed = old
        .displays
        .iter()
        .filter(|d| new.display(&d.name).is_none())
        .map(|d| d.name.clone())
        .collect();

    for transform in new.transforms.iter() {
        match old.transforms.get(transform.id) {
            Some(existing) if existing.same_as(transform) => {
                report.transforms_kept.push(transform.id)
            }
            Some(_) => report.transforms_changed.push(transform.id),
            None => report.transforms_added.push(transform.id),
        }
    }
    report.transforms_removed = old
        .transforms
        .iter()
        .filter(|t| !new.transforms.contains(t.id))
        .map(|t| t.id)
        .collect();

    report
}

impl AppState {
    /// Replace this state with `incoming`, keeping unchanged parts in place.
    pub fn merge_from(&mut self, incoming: AppState) -> MergeReport {
        let report = diff(self, &incoming);

        let displays: Vec<DisplayState> = incoming
            .displays
            .into_iter()
            .map(|display| match self.display(&display.name) {
                Some(existing) if *existing == display => existing.clone(),
                _ => display,
            })
            .collect();

        let mut transforms = TransformTree::new();
        for transform in incoming.transforms.iter() {
            let kept: DataTransform = match self.transforms.get(transform.id) {
                Some(existing) if existing.same_as(transform) => existing.clone(),
                _ => transform.clone(),
            };
            // incoming order is already parent-first and was validated on load
            if let Err(e) = transforms.insert(kept) {
                log::warn!("Dropping transform {} during merge: {}", transform.id, e);
            }
        }
        if let Some(id) = incoming.transforms.selected_id() {
            transforms.select(id);
        }

        self.displays = displays;
        self.transforms = transforms;

        log::info!(
            "Merged state: {} display(s) and {} transform(s) changed",
            report.displays_changed.len() + report.displays_added.len(),
            report.transforms_changed.len() + report.transforms_added.len()
        );
        report
    }
}
