//! Per-category content lists.
//!
//! The host registers its scene nodes once with their [`SceneMask`] tags. At
//! rebuild time the orchestrator turns that registration, together with the
//! ocean surface node and the silt layer it owns, into a [`SceneIndex`]:
//! one ordered list of [`DrawItem`]s per category. Frame traversal only ever
//! reads the index, so no node's tags change while a frame is in flight.

use crate::scene_mask::SceneMask;

/// Host-assigned identifier for a piece of scene content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Something a traversal can draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawItem {
    /// A host scene node (or the ocean surface node).
    Node(NodeId),
    /// The silt particle layer owned by the pipeline.
    Silt,
}

/// Host-side registration of scene content and its category tags.
#[derive(Clone, Debug, Default)]
pub struct SceneContent {
    nodes: Vec<(NodeId, SceneMask)>,
}

impl SceneContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `node` or replaces the tags of an already registered node.
    pub fn insert(&mut self, node: NodeId, mask: SceneMask) {
        match self.nodes.iter_mut().find(|(id, _)| *id == node) {
            Some(entry) => entry.1 = mask,
            None => self.nodes.push((node, mask)),
        }
    }

    /// Removes `node`. Returns whether it was registered.
    pub fn remove(&mut self, node: NodeId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|(id, _)| *id != node);
        self.nodes.len() != before
    }

    pub fn mask_of(&self, node: NodeId) -> Option<SceneMask> {
        self.nodes
            .iter()
            .find(|(id, _)| *id == node)
            .map(|(_, mask)| *mask)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, SceneMask)> + '_ {
        self.nodes.iter().copied()
    }
}

/// Immutable category lists built once per pipeline rebuild.
#[derive(Clone, Debug, Default)]
pub struct SceneIndex {
    entries: Vec<(DrawItem, SceneMask)>,
    lists: [Vec<DrawItem>; SceneMask::CATEGORY_COUNT],
}

impl SceneIndex {
    /// Builds the index.
    ///
    /// Host nodes lose any `SURFACE` or `SILT` bits: those categories belong
    /// to the ocean surface node and the silt layer alone, which keeps the
    /// surface and silt draws from picking up sibling content twice.
    ///
    /// # Arguments
    ///
    /// * `content` - Host registrations, in draw order
    /// * `surface` - The ocean surface node, if the surface is present
    /// * `silt` - Whether the silt layer exists in the current pipeline
    pub fn build(content: &SceneContent, surface: Option<NodeId>, silt: bool) -> Self {
        let mut entries = Vec::with_capacity(content.len() + 2);

        if let Some(node) = surface {
            entries.push((DrawItem::Node(node), SceneMask::SURFACE));
        }

        for (node, mask) in content.iter() {
            if Some(node) == surface {
                continue;
            }
            if mask.intersects(SceneMask::RESERVED) {
                log::debug!(
                    "node {:?} tagged {:?}: surface/silt bits are reserved and ignored",
                    node,
                    mask
                );
            }
            entries.push((DrawItem::Node(node), mask - SceneMask::RESERVED));
        }

        if silt {
            entries.push((DrawItem::Silt, SceneMask::SILT));
        }

        let mut lists: [Vec<DrawItem>; SceneMask::CATEGORY_COUNT] = Default::default();
        for (item, mask) in &entries {
            for category in SceneMask::CATEGORIES {
                if mask.contains(category) {
                    lists[category.category_index()].push(*item);
                }
            }
        }

        Self { entries, lists }
    }

    /// Items tagged with a single category, in registration order.
    ///
    /// # Panics
    ///
    /// Panics if `category` is not exactly one category bit.
    pub fn category(&self, category: SceneMask) -> &[DrawItem] {
        &self.lists[category.category_index()]
    }

    /// Items whose tags intersect `mask`, in registration order.
    pub fn matching(&self, mask: SceneMask) -> Vec<DrawItem> {
        self.entries
            .iter()
            .filter(|(_, tags)| tags.intersects(mask))
            .map(|(item, _)| *item)
            .collect()
    }

    /// Effective tags of `item` after reserved bits were resolved.
    pub fn mask_of(&self, item: DrawItem) -> Option<SceneMask> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == item)
            .map(|(_, mask)| *mask)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> SceneContent {
        let mut content = SceneContent::new();
        content.insert(NodeId(1), SceneMask::REFLECTION | SceneMask::NORMAL);
        content.insert(NodeId(2), SceneMask::REFRACTION | SceneMask::NORMAL);
        content.insert(NodeId(3), SceneMask::NORMAL | SceneMask::SURFACE);
        content.insert(NodeId(4), SceneMask::HEIGHTMAP);
        content
    }

    #[test]
    fn surface_category_holds_only_the_surface_node() {
        let index = SceneIndex::build(&content(), Some(NodeId(99)), false);
        assert_eq!(index.category(SceneMask::SURFACE), &[DrawItem::Node(NodeId(99))]);
    }

    #[test]
    fn reserved_bits_are_stripped_from_host_nodes() {
        let index = SceneIndex::build(&content(), Some(NodeId(99)), true);
        assert_eq!(index.mask_of(DrawItem::Node(NodeId(3))), Some(SceneMask::NORMAL));
        assert_eq!(index.category(SceneMask::SILT), &[DrawItem::Silt]);
    }

    #[test]
    fn normal_category_preserves_registration_order() {
        let index = SceneIndex::build(&content(), None, false);
        assert_eq!(
            index.category(SceneMask::NORMAL),
            &[
                DrawItem::Node(NodeId(1)),
                DrawItem::Node(NodeId(2)),
                DrawItem::Node(NodeId(3)),
            ]
        );
    }

    #[test]
    fn matching_selects_any_intersecting_tag() {
        let index = SceneIndex::build(&content(), None, false);
        let items = index.matching(SceneMask::REFLECTION | SceneMask::HEIGHTMAP);
        assert_eq!(items, vec![DrawItem::Node(NodeId(1)), DrawItem::Node(NodeId(4))]);
    }

    #[test]
    fn building_leaves_host_registration_untouched() {
        let content = content();
        let _ = SceneIndex::build(&content, Some(NodeId(99)), true);
        assert_eq!(
            content.mask_of(NodeId(3)),
            Some(SceneMask::NORMAL | SceneMask::SURFACE)
        );
    }

    #[test]
    fn insert_replaces_existing_tags() {
        let mut content = content();
        content.insert(NodeId(4), SceneMask::NORMAL);
        assert_eq!(content.len(), 4);
        assert_eq!(content.mask_of(NodeId(4)), Some(SceneMask::NORMAL));
        assert!(content.remove(NodeId(4)));
        assert!(!content.remove(NodeId(4)));
    }
}
