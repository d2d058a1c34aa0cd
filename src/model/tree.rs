//! Arena holding the nodes of every desktop's tiling tree.
//!
//! Children lists are the owning edges; `parent` is a plain key back into the
//! arena. A split panel keeps one [`Flex`] item per child and a stack panel one
//! [`Partition`] entry per child, always in the same order as `children`. All
//! structural edits go through [`Forest`] so the two never drift apart.

use slotmap::{SlotMap, new_key_type};
use tracing::{error, warn};

use crate::common::error::{Entity, Result, TilingError};
use crate::layout_engine::{Flex, Orientation, Partition};
use crate::sys::geometry::{Rect, Size};
use crate::sys::window::{WindowId, WindowInfo};

new_key_type! {
    pub struct NodeId;
}

pub type NodeMap = SlotMap<NodeId, Node>;

/// Size limits of a subtree, produced by the measure pass. An unbounded
/// maximum is `f64::INFINITY`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub min: Size,
    pub max: Size,
}

impl Default for Extents {
    fn default() -> Self {
        Self {
            min: Size::ZERO,
            max: Size::UNBOUNDED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
    pub(crate) extents: Extents,
    pub(crate) frame: Option<Rect>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Window(WindowLeaf),
    Split(SplitPanel),
    Stack(StackPanel),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowLeaf {
    pub id: WindowId,
    pub min_size: Size,
    pub max_size: Option<Size>,
}

#[derive(Debug, Clone)]
pub struct SplitPanel {
    pub orientation: Orientation,
    pub(crate) flex: Flex,
}

#[derive(Debug, Clone, Default)]
pub struct StackPanel {
    pub(crate) tabs: Partition<NodeId>,
    pub(crate) active: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, extents: Extents) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            kind,
            extents,
            frame: None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> { self.parent }

    pub fn children(&self) -> &[NodeId] { &self.children }

    pub fn kind(&self) -> &NodeKind { &self.kind }

    pub fn extents(&self) -> Extents { self.extents }

    /// Rectangle assigned by the last arrange pass, if the tree has not been
    /// restructured since.
    pub fn frame(&self) -> Option<Rect> { self.frame }

    pub fn window(&self) -> Option<WindowId> {
        match &self.kind {
            NodeKind::Window(leaf) => Some(leaf.id),
            _ => None,
        }
    }

    pub fn is_panel(&self) -> bool { !matches!(self.kind, NodeKind::Window(_)) }
}

impl SplitPanel {
    pub fn flex(&self) -> &Flex { &self.flex }
}

impl StackPanel {
    pub fn tabs(&self) -> &Partition<NodeId> { &self.tabs }

    pub fn active(&self) -> Option<NodeId> { self.active }
}

impl WindowLeaf {
    fn extents(&self) -> Extents {
        Extents {
            min: self.min_size,
            max: self.max_size.unwrap_or(Size::UNBOUNDED),
        }
    }
}

impl NodeId {
    pub fn parent(self, map: &NodeMap) -> Option<NodeId> { map.get(self).and_then(|n| n.parent) }

    pub fn children(self, map: &NodeMap) -> &[NodeId] {
        map.get(self).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    pub fn index_in_parent(self, map: &NodeMap) -> Option<usize> {
        let parent = self.parent(map)?;
        parent.children(map).iter().position(|&c| c == self)
    }

    /// Proper ancestors, nearest first.
    pub fn ancestors(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(map), move |&n| n.parent(map))
    }

    pub fn root(self, map: &NodeMap) -> NodeId { self.ancestors(map).last().unwrap_or(self) }

    /// Whether `other` lies in the subtree of `self` (`self` included).
    pub fn contains(self, map: &NodeMap, other: NodeId) -> bool {
        other == self || other.ancestors(map).any(|a| a == self)
    }

    /// The subtree in pre-order, `self` first.
    pub fn descendants(self, map: &NodeMap) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children(map).iter().rev());
        }
        out
    }

    pub fn window(self, map: &NodeMap) -> Option<WindowId> { map.get(self).and_then(Node::window) }
}

#[derive(Debug, Default)]
pub struct Forest {
    map: NodeMap,
}

impl Forest {
    pub fn map(&self) -> &NodeMap { &self.map }

    pub fn get(&self, node: NodeId) -> Option<&Node> { self.map.get(node) }

    pub(crate) fn get_mut(&mut self, node: NodeId) -> Option<&mut Node> { self.map.get_mut(node) }

    pub(crate) fn node(&self, node: NodeId) -> Result<&Node> {
        self.map.get(node).ok_or(TilingError::NotRegistered(Entity::Node(node)))
    }

    pub fn new_leaf(&mut self, info: &WindowInfo) -> NodeId {
        let leaf = WindowLeaf {
            id: info.id,
            min_size: info.min_size.unwrap_or(Size::ZERO),
            max_size: info.max_size,
        };
        let extents = leaf.extents();
        self.map.insert(Node::new(NodeKind::Window(leaf), extents))
    }

    /// A split panel whose flex starts out with `extent` to distribute.
    pub fn new_split(&mut self, orientation: Orientation, extent: f64) -> NodeId {
        let flex = Flex::new(extent.max(0.0)).unwrap_or_default();
        let kind = NodeKind::Split(SplitPanel { orientation, flex });
        self.map.insert(Node::new(kind, Extents::default()))
    }

    pub fn new_stack(&mut self) -> NodeId {
        let kind = NodeKind::Stack(StackPanel::default());
        self.map.insert(Node::new(kind, Extents::default()))
    }

    pub(crate) fn set_window_limits(&mut self, node: NodeId, min: Size, max: Option<Size>) {
        if let Some(Node {
            kind: NodeKind::Window(leaf),
            extents,
            ..
        }) = self.map.get_mut(node)
        {
            leaf.min_size = min;
            leaf.max_size = max;
            *extents = leaf.extents();
        }
    }

    /// Attaches the detached node `child` to `parent` at `index`, giving it a
    /// slot in the parent's allocator.
    pub(crate) fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        let child_extents = self.node(child)?.extents;
        if self.node(child)?.parent.is_some() {
            return Err(TilingError::InvalidArgument(format!("{child:?} is still attached")));
        }
        let parent_node = self
            .map
            .get_mut(parent)
            .ok_or(TilingError::NotRegistered(Entity::Node(parent)))?;
        if index > parent_node.children.len() {
            return Err(TilingError::InvalidArgument(format!(
                "index {index} out of range for {} children",
                parent_node.children.len()
            )));
        }
        match &mut parent_node.kind {
            NodeKind::Window(_) => {
                return Err(TilingError::InvalidArgument(format!(
                    "cannot attach {child:?} under the window node {parent:?}"
                )));
            }
            NodeKind::Split(split) => {
                let container = split.flex.container_width();
                let min = child_extents.min.along(split.orientation).min(container);
                if let Err(err) = split.flex.insert_item(index, min, container) {
                    warn!(?child, %err, "child minimum does not fit, inserting it unconstrained");
                    split.flex.insert_item(index, 0.0, container)?;
                }
            }
            NodeKind::Stack(stack) => {
                stack.tabs.insert(index, child)?;
                if stack.active.is_none() {
                    stack.active = Some(child);
                }
            }
        }
        parent_node.children.insert(index, child);
        self.map[child].parent = Some(parent);
        Ok(())
    }

    /// Detaches `child` from its parent, releasing its slot. Returns where it
    /// was attached, or `None` for a root.
    ///
    /// Fails with [`TilingError::InvariantViolation`] if the parent's allocator
    /// cannot release the slot, in which case nothing is changed.
    pub(crate) fn detach(&mut self, child: NodeId) -> Result<Option<(NodeId, usize)>> {
        let (Some(parent), Some(index)) =
            (child.parent(&self.map), child.index_in_parent(&self.map))
        else {
            return Ok(None);
        };
        let parent_node = &mut self.map[parent];
        let released = match &mut parent_node.kind {
            NodeKind::Window(_) => Err(TilingError::InvariantViolation(format!(
                "window node {parent:?} has children"
            ))),
            NodeKind::Split(split) => split.flex.remove_item(index).map(drop),
            NodeKind::Stack(stack) => stack.tabs.remove_at(index).map(drop),
        };
        if let Err(err) = released {
            error!(?parent, ?child, %err, "panel allocator out of sync with its children");
            return Err(TilingError::InvariantViolation(format!(
                "cannot release slot {index} of {parent:?}: {err}"
            )));
        }
        parent_node.children.remove(index);
        if let NodeKind::Stack(stack) = &mut parent_node.kind
            && stack.active == Some(child)
        {
            let next = index.min(parent_node.children.len().saturating_sub(1));
            stack.active = parent_node.children.get(next).copied();
        }
        self.map[child].parent = None;
        Ok(Some((parent, index)))
    }

    /// Puts the detached node `new` into the slot held by `old`, which ends up
    /// detached. The slot keeps its extent or tab weight.
    pub(crate) fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        if self.node(new)?.parent.is_some() {
            return Err(TilingError::InvalidArgument(format!("{new:?} is still attached")));
        }
        let (Some(parent), Some(index)) = (old.parent(&self.map), old.index_in_parent(&self.map))
        else {
            return Err(TilingError::InvalidArgument(format!("{old:?} has no parent")));
        };
        self.set_slot(parent, index, new)?;
        self.map[old].parent = None;
        self.map[new].parent = Some(parent);
        Ok(())
    }

    /// Exchanges the slots of two attached nodes, which must not contain each
    /// other.
    pub(crate) fn swap(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        let (Some(pa), Some(ia)) = (a.parent(&self.map), a.index_in_parent(&self.map)) else {
            return Err(TilingError::InvalidArgument(format!("{a:?} has no parent")));
        };
        let (Some(pb), Some(ib)) = (b.parent(&self.map), b.index_in_parent(&self.map)) else {
            return Err(TilingError::InvalidArgument(format!("{b:?} has no parent")));
        };
        let active = |map: &NodeMap, panel: NodeId| match &map[panel].kind {
            NodeKind::Stack(stack) => stack.active,
            _ => None,
        };
        let (active_a, active_b) = (active(&self.map, pa), active(&self.map, pb));
        self.set_slot(pa, ia, b)?;
        self.set_slot(pb, ib, a)?;
        self.map[a].parent = Some(pb);
        self.map[b].parent = Some(pa);
        for (panel, was) in [(pa, active_a), (pb, active_b)] {
            if let NodeKind::Stack(stack) = &mut self.map[panel].kind {
                stack.active = match was {
                    Some(n) if n == a => Some(b),
                    Some(n) if n == b => Some(a),
                    other => other,
                };
            }
        }
        Ok(())
    }

    /// Moves a child within its parent, keeping its extent.
    pub(crate) fn reorder(&mut self, parent: NodeId, from: usize, to: usize) -> Result<()> {
        let node = self
            .map
            .get_mut(parent)
            .ok_or(TilingError::NotRegistered(Entity::Node(parent)))?;
        let len = node.children.len();
        if from >= len || to >= len {
            return Err(TilingError::InvalidArgument(format!(
                "cannot move child {from} to {to} among {len}"
            )));
        }
        match &mut node.kind {
            NodeKind::Window(_) => {}
            NodeKind::Split(split) => split.flex.move_item(from, to)?,
            NodeKind::Stack(stack) => stack.tabs.move_entry(from, to)?,
        }
        let child = node.children.remove(from);
        node.children.insert(to, child);
        Ok(())
    }

    /// Replaces the panel `panel` (attached at `index` in `parent`) by its own
    /// children. Split extents are shared in proportion to the children's
    /// shares of the panel when both split along the same axis, equally
    /// otherwise.
    pub(crate) fn dissolve(&mut self, panel: NodeId) -> Result<()> {
        let (Some(parent), Some(index)) =
            (panel.parent(&self.map), panel.index_in_parent(&self.map))
        else {
            return Err(TilingError::InvalidArgument(format!("{panel:?} has no parent")));
        };
        let children = self.map[panel].children.clone();
        if children.is_empty() {
            self.detach(panel)?;
            self.map.remove(panel);
            return Ok(());
        }
        let inner_orientation = match &self.map[panel].kind {
            NodeKind::Split(split) => Some((split.orientation, split.flex.clone())),
            _ => None,
        };
        let outer = &mut self.map[parent];
        match &mut outer.kind {
            NodeKind::Window(_) => {
                return Err(TilingError::InvariantViolation(format!(
                    "window node {parent:?} has children"
                )));
            }
            NodeKind::Split(split) => {
                let fractions = match inner_orientation {
                    Some((orientation, flex))
                        if orientation == split.orientation && flex.used_width() > 0.0 =>
                    {
                        flex.items().iter().map(|i| i.width).collect()
                    }
                    _ => vec![1.0; children.len()],
                };
                split.flex.split_item(index, &fractions)?;
            }
            NodeKind::Stack(stack) => {
                stack.tabs.replace_with(index, children.clone())?;
                if stack.active == Some(panel) {
                    stack.active = children.first().copied();
                }
            }
        }
        outer.children.remove(index);
        for (offset, &child) in children.iter().enumerate() {
            outer.children.insert(index + offset, child);
        }
        for &child in &children {
            self.map[child].parent = Some(parent);
        }
        self.map.remove(panel);
        Ok(())
    }

    /// Removes a subtree from the arena, detaching it first if needed, and
    /// returns its windows.
    pub(crate) fn remove_subtree(&mut self, node: NodeId) -> Result<Vec<WindowId>> {
        self.detach(node)?;
        let mut windows = Vec::new();
        for n in node.descendants(&self.map) {
            if let Some(removed) = self.map.remove(n) {
                windows.extend(removed.window());
            }
        }
        Ok(windows)
    }

    /// Removes empty panels from `node` upwards, stopping at the root. Returns
    /// the lowest surviving node and the slot index the removed chain held in
    /// it, if anything was removed.
    pub(crate) fn prune_empty(&mut self, mut node: NodeId) -> Result<(NodeId, Option<usize>)> {
        let mut slot = None;
        while let Some(n) = self.map.get(node) {
            if !n.is_panel() || !n.children.is_empty() {
                break;
            }
            let Some((parent, index)) = self.detach(node)? else { break };
            self.map.remove(node);
            node = parent;
            slot = Some(index);
        }
        Ok((node, slot))
    }

    pub(crate) fn clear_frames(&mut self, root: NodeId) {
        for node in root.descendants(&self.map) {
            self.map[node].frame = None;
        }
    }

    /// Makes every stack on the way from `node` up to its root show the
    /// branch holding `node`.
    pub(crate) fn raise(&mut self, node: NodeId) {
        let mut child = node;
        while let Some(parent) = child.parent(&self.map) {
            if let NodeKind::Stack(stack) = &mut self.map[parent].kind {
                stack.active = Some(child);
            }
            child = parent;
        }
    }

    /// Whether every stack above `node` shows the branch holding it.
    pub fn is_visible(&self, node: NodeId) -> bool {
        let mut child = node;
        while let Some(parent) = child.parent(&self.map) {
            if let NodeKind::Stack(stack) = &self.map[parent].kind {
                if stack.active != Some(child) {
                    return false;
                }
            }
            child = parent;
        }
        true
    }

    /// First visible window under `node` in tree order.
    pub fn first_window(&self, node: NodeId) -> Option<NodeId> {
        let n = self.map.get(node)?;
        match &n.kind {
            NodeKind::Window(_) => Some(node),
            NodeKind::Stack(stack) => stack.active.and_then(|a| self.first_window(a)),
            NodeKind::Split(_) => n.children.iter().find_map(|&c| self.first_window(c)),
        }
    }

    fn set_slot(&mut self, parent: NodeId, index: usize, new: NodeId) -> Result<()> {
        let node = &mut self.map[parent];
        if let NodeKind::Stack(stack) = &mut node.kind {
            stack.tabs.replace_with(index, vec![new])?;
            if stack.active == node.children.get(index).copied() {
                stack.active = Some(new);
            }
        }
        node.children[index] = new;
        Ok(())
    }
}
