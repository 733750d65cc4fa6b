//! The tree of data transforms a user has built.

use super::TransformError;
use super::kind::TransformKind;
use crate::view::ImageInfo;

/// Identifier of a transform within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformId(pub u32);

impl std::fmt::Display for TransformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One node of the transform tree.
#[derive(Debug, Clone)]
pub struct DataTransform {
    pub id: TransformId,
    pub name: String,
    pub parent: Option<TransformId>,
    pub kind: TransformKind,
}

impl DataTransform {
    /// Whether two transforms persist identically.
    pub fn same_as(&self, other: &DataTransform) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.parent == other.parent
            && self.kind.same_as(&other.kind)
    }
}

/// Datasets at the roots, derived transforms below their sources.
///
/// Nodes are kept in insertion order, which is also the order they are saved
/// in, so a parent always precedes its children.
#[derive(Debug, Clone, Default)]
pub struct TransformTree {
    nodes: Vec<DataTransform>,
    next_id: u32,
    selected: Option<TransformId>,
}

impl TransformTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transform, returning its new id.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        parent: Option<TransformId>,
        kind: TransformKind,
    ) -> Result<TransformId, TransformError> {
        let id = TransformId(self.next_id);
        self.insert(DataTransform {
            id,
            name: name.into(),
            parent,
            kind,
        })?;
        Ok(id)
    }

    /// Insert a transform keeping its id, as when restoring saved state.
    pub fn insert(&mut self, transform: DataTransform) -> Result<(), TransformError> {
        if self.contains(transform.id) {
            return Err(TransformError::DuplicateId(transform.id));
        }
        let following = transform
            .id
            .0
            .checked_add(1)
            .ok_or(TransformError::IdOverflow(transform.id))?;
        match (transform.kind.is_root(), transform.parent) {
            (true, Some(_)) => {
                return Err(TransformError::UnexpectedParent {
                    tag: transform.kind.tag(),
                });
            }
            (false, None) => {
                return Err(TransformError::ParentRequired {
                    tag: transform.kind.tag(),
                });
            }
            (false, Some(parent)) if !self.contains(parent) => {
                return Err(TransformError::MissingParent(parent));
            }
            _ => {}
        }

        log::debug!(
            "Adding {} transform {} '{}'",
            transform.kind.tag(),
            transform.id,
            transform.name
        );
        self.next_id = self.next_id.max(following);
        self.nodes.push(transform);
        Ok(())
    }

    /// Remove a transform and everything derived from it.
    ///
    /// Returns the removed transforms, parents first. The selection is
    /// cleared if it pointed into the removed subtree.
    pub fn remove(&mut self, id: TransformId) -> Vec<DataTransform> {
        if !self.contains(id) {
            return Vec::new();
        }

        let mut doomed = vec![id];
        // parents precede children, so one forward pass collects the subtree
        for node in &self.nodes {
            if node.parent.is_some_and(|p| doomed.contains(&p)) {
                doomed.push(node.id);
            }
        }

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.nodes)
            .into_iter()
            .partition(|n| doomed.contains(&n.id));
        self.nodes = kept;

        if self.selected.is_some_and(|s| doomed.contains(&s)) {
            self.selected = None;
        }
        log::debug!("Removed {} transform(s) under {}", removed.len(), id);
        removed
    }

    /// Select a transform. Returns false if it doesn't exist.
    pub fn select(&mut self, id: TransformId) -> bool {
        if self.contains(id) {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&DataTransform> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<TransformId> {
        self.selected
    }

    pub fn get(&self, id: TransformId) -> Option<&DataTransform> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: TransformId) -> bool {
        self.get(id).is_some()
    }

    /// Direct children of a transform, in insertion order.
    pub fn children(&self, id: TransformId) -> impl Iterator<Item = &DataTransform> {
        self.nodes.iter().filter(move |n| n.parent == Some(id))
    }

    pub fn roots(&self) -> impl Iterator<Item = &DataTransform> {
        self.nodes.iter().filter(|n| n.parent.is_none())
    }

    /// All transforms in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &DataTransform> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Image produced by a transform, derived through its ancestors.
    pub fn image_info(&self, id: TransformId) -> Option<ImageInfo> {
        let node = self.get(id)?;
        let parent = node.parent.and_then(|p| self.image_info(p));
        node.kind.derive_image(parent)
    }
}
