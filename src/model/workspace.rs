use std::time::Instant;

use tracing::{debug, error, trace};

use crate::common::collections::HashMap;
use crate::common::config::LayoutSettings;
use crate::common::error::{Entity, Result, TilingError};
use crate::layout_engine::tiling::{self, DropTarget};
use crate::layout_engine::utils::compute_tiling_area;
use crate::layout_engine::{Arrangement, Direction, Orientation, ResizeDirection, WeightDirection};
use crate::model::tree::{Extents, Forest, Node, NodeId, NodeKind};
use crate::sys::geometry::{IRect, Point, Rect, Size};
use crate::sys::window::{DesktopId, WindowId, WindowInfo};

/// The tree of one virtual desktop.
#[derive(Debug, Clone)]
pub struct TilingTree {
    desktop: DesktopId,
    root: NodeId,
    work_area: Rect,
    focus: Option<NodeId>,
}

impl TilingTree {
    pub fn desktop(&self) -> DesktopId { self.desktop }

    pub fn root(&self) -> NodeId { self.root }

    pub fn work_area(&self) -> Rect { self.work_area }

    pub fn focus(&self) -> Option<NodeId> { self.focus }
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    node: NodeId,
    original: Rect,
}

/// Every registered desktop's tree and every registered window.
///
/// All trees live in one node arena so nodes can move between desktops. Any
/// structural change clears the computed frames of the trees it touches; call
/// [`Workspace::layout`] (or `measure` and `arrange`) before asking for
/// geometry again.
#[derive(Debug)]
pub struct Workspace {
    settings: LayoutSettings,
    forest: Forest,
    trees: HashMap<DesktopId, TilingTree>,
    windows: HashMap<WindowId, WindowEntry>,
    active_desktop: Option<DesktopId>,
}

static_assertions::assert_impl_all!(Workspace: Send);

impl Workspace {
    pub fn new(settings: &LayoutSettings) -> Self {
        Self {
            settings: settings.clone(),
            forest: Forest::default(),
            trees: HashMap::default(),
            windows: HashMap::default(),
            active_desktop: None,
        }
    }

    pub fn settings(&self) -> &LayoutSettings { &self.settings }

    pub fn forest(&self) -> &Forest { &self.forest }

    // Desktops

    /// Creates an empty tree for `desktop`. Without an orientation the root
    /// split uses the configured default one.
    pub fn register_desktop(
        &mut self,
        desktop: DesktopId,
        work_area: Rect,
        orientation: Option<Orientation>,
    ) -> Result<NodeId> {
        if self.trees.contains_key(&desktop) {
            return Err(TilingError::DuplicateRegistration(Entity::Desktop(desktop)));
        }
        let orientation = orientation.unwrap_or(self.settings.default_orientation);
        let area = compute_tiling_area(work_area, &self.settings.gaps);
        let root = self.forest.new_split(orientation, area.extent(orientation));
        self.trees.insert(desktop, TilingTree {
            desktop,
            root,
            work_area,
            focus: None,
        });
        if self.active_desktop.is_none() {
            self.active_desktop = Some(desktop);
        }
        debug!(desktop = desktop.get(), ?root, %orientation, "registered desktop");
        Ok(root)
    }

    /// Discards the tree of `desktop` and unregisters the windows it held.
    pub fn unregister_desktop(&mut self, desktop: DesktopId) -> Result<Vec<WindowId>> {
        let tree = self
            .trees
            .remove(&desktop)
            .ok_or(TilingError::NotRegistered(Entity::Desktop(desktop)))?;
        let removed = self.forest.remove_subtree(tree.root)?;
        for wid in &removed {
            self.windows.remove(wid);
        }
        if self.active_desktop == Some(desktop) {
            self.active_desktop = self.trees.keys().min().copied();
        }
        debug!(desktop = desktop.get(), windows = removed.len(), "unregistered desktop");
        Ok(removed)
    }

    pub fn set_active_desktop(&mut self, desktop: DesktopId) -> Result<()> {
        self.tree(desktop)?;
        self.active_desktop = Some(desktop);
        Ok(())
    }

    pub fn active_desktop(&self) -> Option<DesktopId> { self.active_desktop }

    pub fn set_work_area(&mut self, desktop: DesktopId, work_area: Rect) -> Result<()> {
        let tree = self.tree_mut(desktop)?;
        tree.work_area = work_area;
        let root = tree.root;
        self.forest.clear_frames(root);
        Ok(())
    }

    pub fn get_tree(&self, desktop: DesktopId) -> Option<&TilingTree> { self.trees.get(&desktop) }

    // Windows

    /// Adds a leaf for `info` and focuses it.
    ///
    /// With `parent` the leaf is appended to that panel. Otherwise it goes
    /// right after the focused node of the active desktop, or at the end of
    /// the root when nothing is focused.
    pub fn register_window(&mut self, info: &WindowInfo, parent: Option<NodeId>) -> Result<NodeId> {
        if self.windows.contains_key(&info.id) {
            return Err(TilingError::DuplicateRegistration(Entity::Window(info.id)));
        }
        let (desktop, parent, index) = match parent {
            Some(parent) => {
                let node = self.forest.node(parent)?;
                if !node.is_panel() {
                    return Err(TilingError::InvalidArgument(format!(
                        "{parent:?} is a window and cannot hold children"
                    )));
                }
                let desktop = self.owning_desktop(parent)?;
                (desktop, parent, node.children().len())
            }
            None => {
                let desktop = self.active_desktop.ok_or_else(|| {
                    TilingError::TilingOperationFailed("no active desktop".to_string())
                })?;
                let tree = self.tree(desktop)?;
                let map = self.forest.map();
                let after_focus = tree
                    .focus
                    .and_then(|f| Some((f.parent(map)?, f.index_in_parent(map)? + 1)));
                let (parent, index) =
                    after_focus.unwrap_or((tree.root, tree.root.children(map).len()));
                (desktop, parent, index)
            }
        };

        let leaf = self.forest.new_leaf(info);
        if let Err(err) = self.forest.attach(parent, index, leaf) {
            self.forest.remove_subtree(leaf)?;
            return Err(err);
        }
        self.forest.raise(leaf);
        self.windows.insert(info.id, WindowEntry { node: leaf, original: info.frame });
        let tree = self.tree_mut(desktop)?;
        tree.focus = Some(leaf);
        let root = tree.root;
        self.forest.clear_frames(root);
        debug!(
            wid = info.id.get(),
            desktop = desktop.get(),
            ?leaf,
            ?parent,
            index,
            "registered window"
        );
        Ok(leaf)
    }

    /// Removes the window's leaf and returns its original position. Panels
    /// left empty are pruned. Focus on the window moves to a neighbour.
    pub fn unregister_window(&mut self, window: WindowId) -> Result<Rect> {
        let entry = *self
            .windows
            .get(&window)
            .ok_or(TilingError::NotRegistered(Entity::Window(window)))?;
        let desktop = self.owning_desktop(entry.node)?;
        let Some((parent, index)) = self.forest.detach(entry.node)? else {
            return Err(TilingError::InvariantViolation(format!(
                "window {} is registered as a tree root",
                window.get()
            )));
        };
        self.windows.remove(&window);
        self.forest.remove_subtree(entry.node)?;
        let (survivor, slot) = self.forest.prune_empty(parent)?;

        let tree = self.tree(desktop)?;
        let root = tree.root;
        if tree.focus == Some(entry.node) {
            let siblings = survivor.children(self.forest.map());
            let neighbour = siblings
                .get(slot.unwrap_or(index).min(siblings.len().saturating_sub(1)))
                .and_then(|&n| self.forest.first_window(n));
            self.tree_mut(desktop)?.focus = neighbour;
        }
        self.repair_focus();
        self.forest.clear_frames(root);
        debug!(wid = window.get(), desktop = desktop.get(), "unregistered window");
        Ok(entry.original)
    }

    /// Records new size limits for the next measure pass.
    pub fn update_window_constraints(
        &mut self,
        window: WindowId,
        min: Size,
        max: Option<Size>,
    ) -> Result<()> {
        let node = self.window_node(window)?;
        self.forest.set_window_limits(node, min, max);
        Ok(())
    }

    pub fn find_window(&self, window: WindowId) -> Option<NodeId> {
        self.windows.get(&window).map(|e| e.node)
    }

    pub fn has_window(&self, window: WindowId) -> bool { self.windows.contains_key(&window) }

    pub fn get_original_position(&self, window: WindowId) -> Result<Rect> {
        self.windows
            .get(&window)
            .map(|e| e.original)
            .ok_or(TilingError::NotRegistered(Entity::Window(window)))
    }

    // Nodes

    pub fn node(&self, node: NodeId) -> Option<&Node> { self.forest.get(node) }

    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        node.index_in_parent(self.forest.map())
    }

    pub fn desktop_of(&self, node: NodeId) -> Option<DesktopId> {
        self.forest.get(node)?;
        let root = node.root(self.forest.map());
        self.trees.values().find(|t| t.root == root).map(|t| t.desktop)
    }

    // Focus

    pub fn get_focus(&self, desktop: DesktopId) -> Option<NodeId> {
        self.trees.get(&desktop).and_then(|t| t.focus)
    }

    /// Focuses `node` and brings every stack holding it to the front.
    pub fn set_focus(&mut self, node: NodeId) -> Result<()> {
        let desktop = self.owning_desktop(node)?;
        self.tree_mut(desktop)?.focus = Some(node);
        self.forest.raise(node);
        Ok(())
    }

    /// The window next to the focus of `desktop` in `direction`. Needs an
    /// arranged tree.
    pub fn get_focus_adjacent_window(
        &self,
        desktop: DesktopId,
        direction: Direction,
    ) -> Result<NodeId> {
        let tree = self.tree(desktop)?;
        let focus = tree.focus.ok_or_else(|| {
            let msg = format!("nothing focused on desktop {}", desktop.get());
            TilingError::TilingOperationFailed(msg)
        })?;
        if self.forest.get(focus).and_then(Node::frame).is_none() {
            return Err(TilingError::TilingOperationFailed(format!(
                "{focus:?} has no computed frame"
            )));
        }
        tiling::adjacent_window(&self.forest, tree.root, focus, direction).ok_or_else(|| {
            TilingError::TilingOperationFailed(format!("no window {direction} of {focus:?}"))
        })
    }

    // Restructuring

    /// Drops `node` where a drag ended. The tree must be arranged.
    pub fn move_node(&mut self, node: NodeId, point: Point, allow_nesting: bool) -> Result<()> {
        self.forest.node(node)?;
        let desktop = self.owning_desktop(node)?;
        let DropTarget { parent, index } =
            tiling::drop_target(&self.forest, node, point, allow_nesting).ok_or_else(|| {
                let msg = format!("no drop target for {node:?} at {point:?}");
                TilingError::TilingOperationFailed(msg)
            })?;
        let map = self.forest.map();
        let (Some(old_parent), Some(old_index)) = (node.parent(map), node.index_in_parent(map))
        else {
            return Err(TilingError::TilingOperationFailed(format!("{node:?} is a root")));
        };

        if parent == old_parent {
            let to = if index > old_index { index - 1 } else { index };
            if to != old_index {
                self.forest.reorder(parent, old_index, to)?;
            }
        } else {
            self.reattach(node, parent, index)?;
        }
        self.finish_restructure(&[desktop]);
        debug!(?node, ?parent, index, "moved node");
        Ok(())
    }

    pub fn move_window(
        &mut self,
        window: WindowId,
        point: Point,
        allow_nesting: bool,
    ) -> Result<()> {
        let node = self.window_node(window)?;
        self.move_node(node, point, allow_nesting)
    }

    pub fn move_before(&mut self, node: NodeId, reference: NodeId) -> Result<()> {
        self.move_next_to(node, reference, 0)
    }

    pub fn move_after(&mut self, node: NodeId, reference: NodeId) -> Result<()> {
        self.move_next_to(node, reference, 1)
    }

    fn move_next_to(&mut self, node: NodeId, reference: NodeId, offset: usize) -> Result<()> {
        self.forest.node(node)?;
        self.forest.node(reference)?;
        let map = self.forest.map();
        let Some(target) = reference.parent(map) else {
            return Err(TilingError::InvalidArgument(format!("{reference:?} is a root")));
        };
        let Some(current) = node.parent(map) else {
            return Err(TilingError::InvalidArgument(format!("{node:?} is a root")));
        };
        if current == target {
            return Err(TilingError::InvalidArgument(format!(
                "{node:?} and {reference:?} share a parent, reorder them instead"
            )));
        }
        if node.contains(map, reference) {
            return Err(TilingError::InvalidArgument(format!(
                "{reference:?} lies inside {node:?}"
            )));
        }
        let from = self.owning_desktop(node)?;
        let to = self.owning_desktop(reference)?;
        let index = reference
            .index_in_parent(map)
            .map(|i| i + offset)
            .ok_or_else(|| {
                TilingError::InvariantViolation(format!("{reference:?} lost its slot"))
            })?;
        self.reattach(node, target, index)?;
        self.finish_restructure(&[from, to]);
        debug!(?node, ?reference, after = offset == 1, "moved node next to reference");
        Ok(())
    }

    /// Moves the attached `node` to `parent` at `index`, pruning the panel
    /// it leaves if that ends up empty. Restores the old slot on failure; if
    /// even that fails the node is left detached and the error is an
    /// [`TilingError::InvariantViolation`].
    fn reattach(&mut self, node: NodeId, parent: NodeId, index: usize) -> Result<()> {
        let Some((old_parent, old_index)) = self.forest.detach(node)? else {
            return Err(TilingError::InvalidArgument(format!("{node:?} is a root")));
        };
        if let Err(err) = self.forest.attach(parent, index, node) {
            if let Err(restore) = self.forest.attach(old_parent, old_index, node) {
                error!(?node, ?old_parent, %err, %restore, "cannot restore a detached node");
                return Err(TilingError::InvariantViolation(format!(
                    "{node:?} could not be moved ({err}) nor put back ({restore})"
                )));
            }
            return Err(err);
        }
        self.forest.prune_empty(old_parent)?;
        Ok(())
    }

    /// Exchanges two nodes, possibly across desktops. Each slot keeps its
    /// extent.
    pub fn swap_nodes(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        self.forest.node(a)?;
        self.forest.node(b)?;
        let map = self.forest.map();
        if a.contains(map, b) || b.contains(map, a) {
            return Err(TilingError::InvalidArgument(format!(
                "cannot swap {a:?} with {b:?}: one contains the other"
            )));
        }
        let desktops = [self.owning_desktop(a)?, self.owning_desktop(b)?];
        self.forest.swap(a, b)?;
        self.finish_restructure(&desktops);
        debug!(?a, ?b, "swapped nodes");
        Ok(())
    }

    pub fn wrap_in_split_panel(
        &mut self,
        node: NodeId,
        orientation: Orientation,
    ) -> Result<NodeId> {
        self.forest.node(node)?;
        let extent = self
            .forest
            .get(node)
            .and_then(Node::frame)
            .map_or(0.0, |f| f.extent(orientation));
        let panel = self.forest.new_split(orientation, extent);
        self.wrap(node, panel)
    }

    pub fn wrap_in_stack_panel(&mut self, node: NodeId) -> Result<NodeId> {
        self.forest.node(node)?;
        let panel = self.forest.new_stack();
        self.wrap(node, panel)
    }

    fn wrap(&mut self, node: NodeId, panel: NodeId) -> Result<NodeId> {
        let desktop = match self.owning_desktop(node) {
            Ok(desktop) => desktop,
            Err(err) => {
                self.forest.remove_subtree(panel)?;
                return Err(err);
            }
        };
        if node.parent(self.forest.map()).is_some() {
            if let Err(err) = self.forest.replace(node, panel) {
                self.forest.remove_subtree(panel)?;
                return Err(err);
            }
            self.forest.attach(panel, 0, node)?;
        } else {
            self.forest.attach(panel, 0, node)?;
            self.tree_mut(desktop)?.root = panel;
        }
        self.finish_restructure(&[desktop]);
        debug!(?node, ?panel, "wrapped node");
        Ok(panel)
    }

    /// Dissolves the parent of `node` into the grandparent.
    pub fn pull_up(&mut self, node: NodeId) -> Result<()> {
        self.forest.node(node)?;
        let map = self.forest.map();
        let Some(parent) = node.parent(map) else {
            return Err(TilingError::TilingOperationFailed(format!("{node:?} is a root")));
        };
        if parent.parent(map).is_none() {
            return Err(TilingError::TilingOperationFailed(format!(
                "{node:?} already sits in the root panel"
            )));
        }
        let desktop = self.owning_desktop(node)?;
        self.forest.dissolve(parent)?;
        self.finish_restructure(&[desktop]);
        debug!(?node, dissolved = ?parent, "pulled node up");
        Ok(())
    }

    // Sizing

    /// Resizes the slot of `node` in its split parent, taking space from the
    /// nearest siblings first.
    pub fn resize_node(
        &mut self,
        node: NodeId,
        extent: f64,
        direction: ResizeDirection,
    ) -> Result<()> {
        let (parent, index) = self.slot_of(node)?;
        match self.parent_kind_mut(parent)? {
            NodeKind::Split(split) => split.flex.resize_item(index, extent, direction, false),
            _ => Err(TilingError::InvalidArgument(format!(
                "{node:?} is not inside a split panel"
            ))),
        }
    }

    pub fn set_stack_weight(
        &mut self,
        node: NodeId,
        weight: f64,
        direction: WeightDirection,
    ) -> Result<()> {
        let (parent, index) = self.slot_of(node)?;
        match self.parent_kind_mut(parent)? {
            NodeKind::Stack(stack) => stack.tabs.resize(index, weight, direction),
            _ => Err(TilingError::InvalidArgument(format!(
                "{node:?} is not inside a stack panel"
            ))),
        }
    }

    /// Brings `node` to the front of its stack.
    pub fn set_active_tab(&mut self, node: NodeId) -> Result<()> {
        let (parent, _) = self.slot_of(node)?;
        match self.parent_kind_mut(parent)? {
            NodeKind::Stack(stack) => {
                stack.active = Some(node);
                Ok(())
            }
            _ => Err(TilingError::InvalidArgument(format!(
                "{node:?} is not inside a stack panel"
            ))),
        }
    }

    // Geometry

    pub fn measure(&mut self, desktop: DesktopId) -> Result<Extents> {
        let root = self.tree(desktop)?.root;
        Ok(tiling::measure(&mut self.forest, root, &self.settings.gaps))
    }

    /// Lays the tree out inside the desktop's tiling area using the extents
    /// of the last measure pass.
    pub fn arrange(&mut self, desktop: DesktopId) -> Result<()> {
        let tree = self.tree(desktop)?;
        let (root, area) = (tree.root, self.tiling_area(tree));
        tiling::arrange(&mut self.forest, root, area, &self.settings.gaps);
        Ok(())
    }

    /// Measures and arranges `desktop`, returning the target frame of every
    /// visible window.
    pub fn layout(&mut self, desktop: DesktopId) -> Result<Vec<(WindowId, IRect)>> {
        trace_misc("layout", || -> Result<Vec<(WindowId, IRect)>> {
            self.measure(desktop)?;
            self.arrange(desktop)?;
            Ok(self
                .window_frames(desktop)?
                .into_iter()
                .map(|(wid, frame)| (wid, frame.to_irect()))
                .collect())
        })
    }

    pub fn window_frames(&self, desktop: DesktopId) -> Result<Vec<(WindowId, Rect)>> {
        let root = self.tree(desktop)?.root;
        Ok(tiling::window_frames(&self.forest, root)
            .into_iter()
            .map(|(_, wid, frame)| (wid, frame))
            .collect())
    }

    /// Places every window of `desktop` with the configured one-shot
    /// arrangement, ignoring the tree structure. The tree is left untouched.
    pub fn arrange_flat(&self, desktop: DesktopId) -> Result<Vec<(WindowId, Rect)>> {
        let tree = self.tree(desktop)?;
        let map = self.forest.map();
        let windows: Vec<WindowInfo> = tree
            .root
            .descendants(map)
            .into_iter()
            .filter_map(|n| match self.forest.get(n)?.kind() {
                NodeKind::Window(leaf) => {
                    let original = self.windows.get(&leaf.id).map(|e| e.original)?;
                    let mut info = WindowInfo::new(leaf.id, original).with_min_size(leaf.min_size);
                    info.max_size = leaf.max_size;
                    Some(info)
                }
                _ => None,
            })
            .collect();
        let area = self.tiling_area(tree);
        Ok(self.settings.arrangement.arrange_windows(area, &windows))
    }

    pub fn draw_tree(&self, desktop: DesktopId) -> Result<String> {
        Ok(tiling::draw_tree(&self.forest, self.tree(desktop)?.root))
    }

    // Helpers

    fn tree(&self, desktop: DesktopId) -> Result<&TilingTree> {
        self.trees.get(&desktop).ok_or(TilingError::NotRegistered(Entity::Desktop(desktop)))
    }

    fn tree_mut(&mut self, desktop: DesktopId) -> Result<&mut TilingTree> {
        self.trees
            .get_mut(&desktop)
            .ok_or(TilingError::NotRegistered(Entity::Desktop(desktop)))
    }

    fn tiling_area(&self, tree: &TilingTree) -> Rect {
        compute_tiling_area(tree.work_area, &self.settings.gaps)
    }

    fn window_node(&self, window: WindowId) -> Result<NodeId> {
        self.find_window(window).ok_or(TilingError::NotRegistered(Entity::Window(window)))
    }

    fn owning_desktop(&self, node: NodeId) -> Result<DesktopId> {
        self.desktop_of(node).ok_or(TilingError::NotRegistered(Entity::Node(node)))
    }

    fn slot_of(&self, node: NodeId) -> Result<(NodeId, usize)> {
        self.forest.node(node)?;
        let map = self.forest.map();
        match (node.parent(map), node.index_in_parent(map)) {
            (Some(parent), Some(index)) => Ok((parent, index)),
            _ => Err(TilingError::InvalidArgument(format!("{node:?} is a root"))),
        }
    }

    fn parent_kind_mut(&mut self, parent: NodeId) -> Result<&mut NodeKind> {
        self.forest
            .get_mut(parent)
            .map(|n| &mut n.kind)
            .ok_or(TilingError::NotRegistered(Entity::Node(parent)))
    }

    fn finish_restructure(&mut self, desktops: &[DesktopId]) {
        self.repair_focus();
        for desktop in desktops {
            if let Some(tree) = self.trees.get(desktop) {
                self.forest.clear_frames(tree.root);
            }
        }
    }

    /// Points every tree's focus at a node it still holds.
    fn repair_focus(&mut self) {
        let Self { forest, trees, .. } = self;
        for tree in trees.values_mut() {
            let valid = tree
                .focus
                .is_some_and(|f| forest.get(f).is_some() && f.root(forest.map()) == tree.root);
            if !valid {
                tree.focus = forest.first_window(tree.root);
            }
        }
    }
}

fn trace_misc<T>(desc: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    let end = Instant::now();
    trace!(time = ?(end - start), "{desc}");
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::common::config::{GapSettings, InnerGaps, OuterGaps};
    use crate::layout_engine::{ArrangementKind, GridArrangement};

    const SCREEN: Rect = Rect::new(0.0, 0.0, 1000.0, 500.0);

    fn desktop(id: u64) -> DesktopId { DesktopId::try_from(id).unwrap() }

    fn wid(id: u64) -> WindowId { WindowId::try_from(id).unwrap() }

    fn window(id: u64) -> WindowInfo {
        WindowInfo::new(wid(id), Rect::new(id as f64 * 10.0, 20.0, 300.0, 200.0))
    }

    fn workspace_with(count: u64) -> (Workspace, Vec<NodeId>) {
        let mut ws = Workspace::new(&LayoutSettings::default());
        ws.register_desktop(desktop(1), SCREEN, None).unwrap();
        let nodes = (1..=count).map(|i| ws.register_window(&window(i), None).unwrap()).collect();
        (ws, nodes)
    }

    fn children(ws: &Workspace, node: NodeId) -> Vec<NodeId> {
        node.children(ws.forest().map()).to_vec()
    }

    fn root(ws: &Workspace) -> NodeId { ws.get_tree(desktop(1)).unwrap().root() }

    #[test]
    fn it_navigates_between_neighbours() {
        let (mut ws, nodes) = workspace_with(5);
        let frames = ws.layout(desktop(1)).unwrap();
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[2], (wid(3), IRect::new(400, 0, 200, 500)));

        ws.set_focus(nodes[2]).unwrap();
        let find = |direction| ws.get_focus_adjacent_window(desktop(1), direction);
        assert_eq!(find(Direction::Left), Ok(nodes[1]));
        assert_eq!(find(Direction::Right), Ok(nodes[3]));
        assert!(matches!(find(Direction::Up), Err(TilingError::TilingOperationFailed(_))));
        assert!(matches!(find(Direction::Down), Err(TilingError::TilingOperationFailed(_))));
    }

    #[test]
    fn adjacency_needs_an_arranged_tree() {
        let (ws, _) = workspace_with(2);
        assert!(matches!(
            ws.get_focus_adjacent_window(desktop(1), Direction::Left),
            Err(TilingError::TilingOperationFailed(_))
        ));
    }

    #[test]
    fn new_windows_follow_the_focus() {
        let (mut ws, nodes) = workspace_with(3);
        ws.set_focus(nodes[0]).unwrap();
        let fourth = ws.register_window(&window(4), None).unwrap();
        assert_eq!(children(&ws, root(&ws)), vec![nodes[0], fourth, nodes[1], nodes[2]]);
        assert_eq!(ws.get_focus(desktop(1)), Some(fourth));
    }

    #[test]
    fn it_applies_gaps() {
        let settings = LayoutSettings {
            gaps: GapSettings {
                outer: OuterGaps::uniform(10.0),
                inner: InnerGaps::uniform(20.0),
            },
            ..Default::default()
        };
        let mut ws = Workspace::new(&settings);
        ws.register_desktop(desktop(1), SCREEN, None).unwrap();
        ws.register_window(&window(1), None).unwrap();
        ws.register_window(&window(2), None).unwrap();
        assert_eq!(ws.layout(desktop(1)).unwrap(), vec![
            (wid(1), IRect::new(10, 10, 480, 480)),
            (wid(2), IRect::new(510, 10, 480, 480)),
        ]);
    }

    #[test]
    fn it_rejects_duplicate_registration() {
        let (mut ws, _) = workspace_with(1);
        assert_eq!(
            ws.register_window(&window(1), None),
            Err(TilingError::DuplicateRegistration(Entity::Window(wid(1))))
        );
        assert_eq!(
            ws.register_desktop(desktop(1), SCREEN, None),
            Err(TilingError::DuplicateRegistration(Entity::Desktop(desktop(1))))
        );
    }

    #[test]
    fn it_reports_unknown_entities() {
        let mut ws = Workspace::new(&LayoutSettings::default());
        assert!(matches!(
            ws.register_window(&window(1), None),
            Err(TilingError::TilingOperationFailed(_))
        ));
        assert_eq!(
            ws.unregister_window(wid(7)),
            Err(TilingError::NotRegistered(Entity::Window(wid(7))))
        );
        assert_eq!(
            ws.unregister_desktop(desktop(3)),
            Err(TilingError::NotRegistered(Entity::Desktop(desktop(3))))
        );
        assert_eq!(
            ws.set_active_desktop(desktop(3)),
            Err(TilingError::NotRegistered(Entity::Desktop(desktop(3))))
        );
    }

    #[test]
    fn it_remembers_original_positions() {
        let (mut ws, _) = workspace_with(2);
        let original = window(2).frame;
        assert_eq!(ws.get_original_position(wid(2)), Ok(original));
        assert_eq!(ws.unregister_window(wid(2)), Ok(original));
        assert!(!ws.has_window(wid(2)));
        assert_eq!(
            ws.get_original_position(wid(2)),
            Err(TilingError::NotRegistered(Entity::Window(wid(2))))
        );
    }

    #[test]
    fn focus_moves_to_a_neighbour_on_unregister() {
        let (mut ws, nodes) = workspace_with(3);
        assert_eq!(ws.get_focus(desktop(1)), Some(nodes[2]));
        ws.unregister_window(wid(3)).unwrap();
        assert_eq!(ws.get_focus(desktop(1)), Some(nodes[1]));
        ws.unregister_window(wid(1)).unwrap();
        assert_eq!(ws.get_focus(desktop(1)), Some(nodes[1]));
        ws.unregister_window(wid(2)).unwrap();
        assert_eq!(ws.get_focus(desktop(1)), None);
        assert!(children(&ws, root(&ws)).is_empty());
    }

    #[test]
    fn desynced_allocators_leave_the_tree_untouched() {
        let (mut ws, nodes) = workspace_with(3);
        let stack = ws.wrap_in_stack_panel(nodes[2]).unwrap();
        match &mut ws.forest.get_mut(stack).unwrap().kind {
            NodeKind::Stack(stack) => {
                stack.tabs.remove_at(0).unwrap();
            }
            _ => unreachable!(),
        }
        assert!(ws.move_after(nodes[0], nodes[2]).is_err());
        assert_eq!(children(&ws, root(&ws)), vec![nodes[0], nodes[1], stack]);
        assert_eq!(nodes[0].parent(ws.forest().map()), Some(root(&ws)));

        assert!(matches!(
            ws.unregister_window(wid(3)),
            Err(TilingError::InvariantViolation(_))
        ));
        assert!(ws.has_window(wid(3)));
        assert_eq!(children(&ws, stack), vec![nodes[2]]);
    }

    #[test]
    fn empty_panels_are_pruned() {
        let (mut ws, nodes) = workspace_with(2);
        let panel = ws.wrap_in_split_panel(nodes[1], Orientation::Vertical).unwrap();
        ws.unregister_window(wid(2)).unwrap();
        assert!(ws.node(panel).is_none());
        assert_eq!(children(&ws, root(&ws)), vec![nodes[0]]);
        assert_eq!(ws.get_focus(desktop(1)), Some(nodes[0]));
    }

    #[test]
    fn unregistering_a_desktop_drops_its_windows() {
        let (mut ws, _) = workspace_with(2);
        ws.register_desktop(desktop(2), SCREEN, Some(Orientation::Vertical)).unwrap();
        assert_eq!(ws.active_desktop(), Some(desktop(1)));

        let mut removed = ws.unregister_desktop(desktop(1)).unwrap();
        removed.sort();
        assert_eq!(removed, vec![wid(1), wid(2)]);
        assert!(!ws.has_window(wid(1)));
        assert_eq!(ws.active_desktop(), Some(desktop(2)));
        assert!(ws.get_tree(desktop(1)).is_none());

        let leaf = ws.register_window(&window(1), None).unwrap();
        assert_eq!(ws.desktop_of(leaf), Some(desktop(2)));
    }

    #[test]
    fn dropping_onto_a_sibling_reorders() {
        let (mut ws, nodes) = workspace_with(2);
        ws.layout(desktop(1)).unwrap();
        let target = ws.node(nodes[1]).unwrap().frame().unwrap().center();
        ws.move_node(nodes[0], target, false).unwrap();
        assert_eq!(children(&ws, root(&ws)), vec![nodes[1], nodes[0]]);

        assert!(matches!(
            ws.move_node(nodes[0], Point::new(50.0, 50.0), false),
            Err(TilingError::TilingOperationFailed(_))
        ));
    }

    #[test]
    fn dropping_into_a_panel_moves_across_levels() {
        let (mut ws, nodes) = workspace_with(3);
        let panel = ws.wrap_in_split_panel(nodes[2], Orientation::Vertical).unwrap();
        ws.layout(desktop(1)).unwrap();
        let frame = ws.node(nodes[2]).unwrap().frame().unwrap();
        let below = Point::new(frame.center().x, frame.max_y() - 10.0);
        ws.move_window(wid(1), below, true).unwrap();
        assert_eq!(children(&ws, panel), vec![nodes[2], nodes[0]]);
        assert_eq!(children(&ws, root(&ws)), vec![nodes[1], panel]);
    }

    #[test]
    fn wrap_then_pull_up_restores_the_tree() {
        let (mut ws, nodes) = workspace_with(3);
        let before = children(&ws, root(&ws));
        let panel = ws.wrap_in_split_panel(nodes[1], Orientation::Vertical).unwrap();
        assert_eq!(children(&ws, root(&ws)), vec![nodes[0], panel, nodes[2]]);
        assert_eq!(ws.index_of(nodes[1]), Some(0));

        ws.pull_up(nodes[1]).unwrap();
        assert_eq!(children(&ws, root(&ws)), before);
        assert!(ws.node(panel).is_none());
        assert!(matches!(ws.pull_up(nodes[1]), Err(TilingError::TilingOperationFailed(_))));
    }

    #[test]
    fn wrapping_the_root_replaces_it() {
        let (mut ws, nodes) = workspace_with(2);
        let old_root = root(&ws);
        let stack = ws.wrap_in_stack_panel(old_root).unwrap();
        assert_eq!(root(&ws), stack);
        assert_eq!(children(&ws, stack), vec![old_root]);
        assert_eq!(ws.desktop_of(nodes[0]), Some(desktop(1)));
        assert_eq!(ws.layout(desktop(1)).unwrap().len(), 2);
    }

    #[test]
    fn stacks_show_one_tab() {
        let (mut ws, nodes) = workspace_with(2);
        let stack = ws.wrap_in_stack_panel(nodes[1]).unwrap();
        let tab = ws.register_window(&window(3), Some(stack)).unwrap();
        assert_eq!(children(&ws, stack), vec![nodes[1], tab]);

        let frames = ws.layout(desktop(1)).unwrap();
        let visible: Vec<_> = frames.iter().map(|(wid, _)| wid.get()).collect();
        assert_eq!(visible, vec![1, 3]);
        assert_eq!(frames[1].1, IRect::new(500, 0, 500, 500));

        ws.set_focus(nodes[1]).unwrap();
        let visible: Vec<_> =
            ws.window_frames(desktop(1)).unwrap().iter().map(|(wid, _)| wid.get()).collect();
        assert_eq!(visible, vec![1, 2]);

        ws.set_active_tab(tab).unwrap();
        ws.set_stack_weight(tab, 0.75, WeightDirection::Both).unwrap();
        let stack_node = ws.node(stack).unwrap();
        let NodeKind::Stack(panel) = stack_node.kind() else { panic!("not a stack") };
        assert_eq!(panel.active(), Some(tab));
        assert!((panel.tabs().weight(1).unwrap() - 0.75).abs() < 1e-9);
        assert!(matches!(
            ws.set_active_tab(nodes[0]),
            Err(TilingError::InvalidArgument(_))
        ));
    }

    #[test]
    fn move_before_and_after_check_their_arguments() {
        let (mut ws, nodes) = workspace_with(3);
        assert!(matches!(
            ws.move_before(nodes[0], nodes[1]),
            Err(TilingError::InvalidArgument(_))
        ));
        assert!(matches!(
            ws.move_after(nodes[0], root(&ws)),
            Err(TilingError::InvalidArgument(_))
        ));
        let panel = ws.wrap_in_split_panel(nodes[2], Orientation::Vertical).unwrap();
        assert!(matches!(
            ws.move_before(panel, nodes[2]),
            Err(TilingError::InvalidArgument(_))
        ));

        ws.move_after(nodes[0], nodes[2]).unwrap();
        assert_eq!(children(&ws, panel), vec![nodes[2], nodes[0]]);
        ws.move_before(nodes[1], nodes[0]).unwrap();
        assert_eq!(children(&ws, panel), vec![nodes[2], nodes[1], nodes[0]]);
        assert_eq!(children(&ws, root(&ws)), vec![panel]);
    }

    #[test]
    fn nodes_move_between_desktops() {
        let (mut ws, nodes) = workspace_with(2);
        ws.register_desktop(desktop(2), SCREEN, None).unwrap();
        ws.set_active_desktop(desktop(2)).unwrap();
        let other = ws.register_window(&window(9), None).unwrap();

        ws.move_after(nodes[1], other).unwrap();
        assert_eq!(ws.desktop_of(nodes[1]), Some(desktop(2)));
        assert_eq!(ws.get_focus(desktop(1)), Some(nodes[0]));
        assert_eq!(ws.layout(desktop(2)).unwrap().len(), 2);

        ws.swap_nodes(nodes[0], other).unwrap();
        assert_eq!(ws.desktop_of(other), Some(desktop(1)));
        assert_eq!(ws.desktop_of(nodes[0]), Some(desktop(2)));
    }

    #[test]
    fn swap_rejects_nested_nodes() {
        let (mut ws, nodes) = workspace_with(2);
        assert!(matches!(
            ws.swap_nodes(root(&ws), nodes[0]),
            Err(TilingError::InvalidArgument(_))
        ));
        ws.swap_nodes(nodes[0], nodes[1]).unwrap();
        assert_eq!(children(&ws, root(&ws)), vec![nodes[1], nodes[0]]);
    }

    #[test]
    fn resizing_survives_layout() {
        let (mut ws, nodes) = workspace_with(2);
        ws.layout(desktop(1)).unwrap();
        ws.resize_node(nodes[0], 700.0, ResizeDirection::TOWARDS_END).unwrap();
        let frames = ws.layout(desktop(1)).unwrap();
        assert_eq!(frames, vec![
            (wid(1), IRect::new(0, 0, 700, 500)),
            (wid(2), IRect::new(700, 0, 300, 500)),
        ]);

        let stack = ws.wrap_in_stack_panel(nodes[0]).unwrap();
        assert!(matches!(
            ws.resize_node(nodes[0], 10.0, ResizeDirection::BOTH),
            Err(TilingError::InvalidArgument(_))
        ));
        assert!(ws.resize_node(stack, 600.0, ResizeDirection::BOTH).is_ok());
    }

    #[test]
    fn minimum_sizes_are_respected() {
        let (mut ws, _) = workspace_with(2);
        ws.update_window_constraints(wid(2), Size::new(800.0, 0.0), None).unwrap();
        let frames = ws.layout(desktop(1)).unwrap();
        assert_eq!(frames[1].1.width, 800);
        assert_eq!(frames[0].1.width, 200);
    }

    #[test]
    fn flat_arrangement_ignores_the_tree() {
        let settings = LayoutSettings {
            arrangement: ArrangementKind::Grid(GridArrangement::new(0.0)),
            ..Default::default()
        };
        let mut ws = Workspace::new(&settings);
        ws.register_desktop(desktop(1), Rect::new(0.0, 0.0, 1000.0, 1000.0), None).unwrap();
        for i in 1..=4 {
            ws.register_window(&window(i), None).unwrap();
        }
        let placed = ws.arrange_flat(desktop(1)).unwrap();
        assert_eq!(placed.len(), 4);
        assert_eq!(placed[3], (wid(4), Rect::new(500.0, 500.0, 500.0, 500.0)));
    }

    #[test]
    fn it_draws_the_desktop_tree() {
        let (mut ws, _) = workspace_with(2);
        ws.layout(desktop(1)).unwrap();
        let drawn = ws.draw_tree(desktop(1)).unwrap();
        assert!(drawn.contains("window 1 500x500+0+0"), "{drawn}");
        assert!(drawn.contains("window 2 500x500+500+0"), "{drawn}");
    }
}
