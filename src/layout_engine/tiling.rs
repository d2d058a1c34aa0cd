//! Measure and arrange passes over a tiling tree, plus the geometric queries
//! that depend on their results.

use std::cmp::Ordering;

use tracing::warn;

use super::{Direction, Flex, Orientation};
use crate::common::config::GapSettings;
use crate::common::epsilon::Approx;
use crate::common::error::Result;
use crate::model::tree::{Extents, Forest, Node, NodeId, NodeKind};
use crate::sys::geometry::{Point, Rect, Size};
use crate::sys::window::WindowId;

/// Aggregates size limits bottom-up and stores them on every node.
pub fn measure(forest: &mut Forest, node: NodeId, gaps: &GapSettings) -> Extents {
    let children = node.children(forest.map()).to_vec();
    let child_extents: Vec<Extents> =
        children.iter().map(|&child| measure(forest, child, gaps)).collect();
    let Some(n) = forest.get_mut(node) else {
        return Extents::default();
    };
    let extents = match &n.kind {
        NodeKind::Window(leaf) => Extents {
            min: leaf.min_size,
            max: leaf.max_size.unwrap_or(Size::UNBOUNDED),
        },
        NodeKind::Split(split) => {
            let axis = split.orientation;
            let gap = gaps.inner_gap(axis) * children.len().saturating_sub(1) as f64;
            let overlaid = overlay(&child_extents);
            let min_along = child_extents.iter().map(|e| e.min.along(axis)).sum::<f64>() + gap;
            let max_along = if child_extents.is_empty() {
                f64::INFINITY
            } else {
                child_extents.iter().map(|e| e.max.along(axis)).sum::<f64>() + gap
            };
            Extents {
                min: overlaid.min.with_along(axis, min_along),
                max: overlaid.max.with_along(axis, max_along.max(min_along)),
            }
        }
        NodeKind::Stack(_) => overlay(&child_extents),
    };
    n.extents = extents;
    extents
}

/// Extents of children sharing one rectangle: the largest minimum and the
/// smallest maximum, never below that minimum.
fn overlay(children: &[Extents]) -> Extents {
    let mut out = Extents::default();
    for e in children {
        out.min.width = out.min.width.max(e.min.width);
        out.min.height = out.min.height.max(e.min.height);
        out.max.width = out.max.width.min(e.max.width);
        out.max.height = out.max.height.min(e.max.height);
    }
    out.max.width = out.max.width.max(out.min.width);
    out.max.height = out.max.height.max(out.min.height);
    out
}

/// Assigns `rect` to `node` and subdivides it among the subtree.
pub fn arrange(forest: &mut Forest, node: NodeId, rect: Rect, gaps: &GapSettings) {
    let children = node.children(forest.map()).to_vec();
    let child_extents: Vec<Extents> = children
        .iter()
        .map(|&c| forest.get(c).map(|n| n.extents).unwrap_or_default())
        .collect();
    let Some(n) = forest.get_mut(node) else { return };
    n.frame = Some(rect);
    let child_rects = match &mut n.kind {
        NodeKind::Window(_) => return,
        NodeKind::Stack(_) => vec![rect; children.len()],
        NodeKind::Split(_) if children.is_empty() => return,
        NodeKind::Split(split) => {
            let axis = split.orientation;
            let gap = gaps.inner_gap(axis);
            let usable = (rect.extent(axis) - gap * (children.len() - 1) as f64).max(0.0);
            let bounds: Vec<(f64, f64)> =
                child_extents.iter().map(|e| (e.min.along(axis), e.max.along(axis))).collect();
            if let Err(err) = fit_flex(&mut split.flex, usable, &bounds) {
                warn!(?node, %err, "cannot fit split to its children, keeping proportions");
            }
            let mut offset = rect.start(axis);
            proportional_widths(&split.flex, usable)
                .into_iter()
                .map(|width| {
                    let slice = rect.slice(axis, offset, width);
                    offset += width + gap;
                    slice
                })
                .collect()
        }
    };
    for (child, child_rect) in children.into_iter().zip(child_rects) {
        arrange(forest, child, child_rect, gaps);
    }
}

/// Re-targets `flex` to `usable` and the measured child bounds.
///
/// The bounds are first relaxed so the container can be resized at all, then
/// the measured ones are made feasible (minima scaled down when they do not
/// fit together, maxima opened up when they cannot fill the container).
fn fit_flex(flex: &mut Flex, usable: f64, bounds: &[(f64, f64)]) -> Result<()> {
    let relaxed = vec![(0.0, flex.container_width().max(usable)); flex.len()];
    flex.update_constraints_bulk(&relaxed)?;
    flex.set_container_width(usable)?;

    let total_min: f64 = bounds.iter().map(|b| b.0).sum();
    let scale = if total_min > usable && total_min > 0.0 { usable / total_min } else { 1.0 };
    let mut feasible: Vec<(f64, f64)> = bounds
        .iter()
        .map(|&(min, max)| {
            let min = min * scale;
            (min, max.min(usable).max(min))
        })
        .collect();
    let total_max: f64 = feasible.iter().map(|b| b.1).sum();
    if total_max.definitely_lt(usable) {
        warn!(total_max, usable, "children cannot fill their split, lifting maxima");
        for bound in &mut feasible {
            bound.1 = usable;
        }
    }
    flex.update_constraints_bulk(&feasible)
}

fn proportional_widths(flex: &Flex, usable: f64) -> Vec<f64> {
    let total = flex.used_width();
    if total > 0.0 && total.is_finite() {
        flex.items().iter().map(|i| i.width / total * usable).collect()
    } else {
        vec![usable / flex.len() as f64; flex.len()]
    }
}

/// Arranged frames of the visible windows under `root`, in tree order.
pub fn window_frames(forest: &Forest, root: NodeId) -> Vec<(NodeId, WindowId, Rect)> {
    root.descendants(forest.map())
        .into_iter()
        .filter(|&n| forest.is_visible(n))
        .filter_map(|n| {
            let node = forest.get(n)?;
            Some((n, node.window()?, node.frame()?))
        })
        .collect()
}

/// Finds the visible window nearest to `from` in `direction`.
///
/// Candidates must lie entirely beyond the corresponding edge of `from`.
/// Among them, windows overlapping `from` on the perpendicular axis win, then
/// the smallest gap, then the closest center on the perpendicular axis.
pub fn adjacent_window(
    forest: &Forest,
    root: NodeId,
    from: NodeId,
    direction: Direction,
) -> Option<NodeId> {
    let origin = forest.get(from)?.frame()?;
    let axis = direction.orientation();
    let across = axis.perpendicular();
    let score = |rect: Rect| -> Option<(bool, f64, f64)> {
        let gap = if direction.is_towards_start() {
            origin.start(axis) - rect.end(axis)
        } else {
            rect.start(axis) - origin.end(axis)
        };
        if gap.definitely_lt(0.0) {
            return None;
        }
        let overlap = rect.end(across).min(origin.end(across))
            - rect.start(across).max(origin.start(across));
        let distance = (rect.center().along(across) - origin.center().along(across)).abs();
        Some((!overlap.definitely_gt(0.0), gap.max(0.0), distance))
    };
    window_frames(forest, root)
        .into_iter()
        .filter(|&(node, _, _)| !from.contains(forest.map(), node))
        .filter_map(|(node, _, rect)| Some((node, score(rect)?)))
        .min_by(|(_, a), (_, b)| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.total_cmp(&b.1))
                .then_with(|| a.2.total_cmp(&b.2))
        })
        .map(|(node, _)| node)
}

/// Where a dragged node lands: the panel and the index to insert at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    pub parent: NodeId,
    pub index: usize,
}

/// Resolves the drop position of `node` for a drag ending at `point`.
///
/// Starting at the node's parent, climbs to the first ancestor whose frame
/// contains the point, then picks the child under the point. With
/// `allow_nesting` a hit panel is entered one level. The node goes before the
/// hit child when the point is in the first half of it along the panel's
/// axis, after it otherwise.
pub fn drop_target(
    forest: &Forest,
    node: NodeId,
    point: Point,
    allow_nesting: bool,
) -> Option<DropTarget> {
    let map = forest.map();
    let frame_contains =
        |n: NodeId| forest.get(n).and_then(Node::frame).is_some_and(|f| f.contains(point));
    let child_at = |panel: NodeId| panel.children(map).iter().copied().find(|&c| frame_contains(c));

    let mut container = node.ancestors(map).find(|&a| frame_contains(a))?;
    let mut hit = child_at(container)?;
    if node.contains(map, hit) || hit.contains(map, node) {
        return None;
    }
    if allow_nesting && forest.get(hit)?.is_panel() {
        if hit.children(map).is_empty() {
            return Some(DropTarget { parent: hit, index: 0 });
        }
        if let Some(inner) = child_at(hit).filter(|&c| c != node) {
            container = hit;
            hit = inner;
        }
    }

    let axis = match forest.get(container)?.kind() {
        NodeKind::Split(split) => split.orientation,
        _ => Orientation::Horizontal,
    };
    let hit_frame = forest.get(hit)?.frame()?;
    let index = hit.index_in_parent(map)?;
    let before = point.along(axis).partial_cmp(&hit_frame.center().along(axis))
        == Some(Ordering::Less);
    Some(DropTarget {
        parent: container,
        index: if before { index } else { index + 1 },
    })
}

/// Renders the subtree under `root` for debugging.
pub fn draw_tree(forest: &Forest, root: NodeId) -> String {
    let tree = ascii_tree_of(forest, root);
    let mut out = String::new();
    if ascii_tree::write_tree(&mut out, &tree).is_err() {
        out.clear();
    }
    out
}

fn ascii_tree_of(forest: &Forest, node: NodeId) -> ascii_tree::Tree {
    let Some(n) = forest.get(node) else {
        return ascii_tree::Tree::Leaf(vec![format!("{node:?} (missing)")]);
    };
    let status = match n.parent().and_then(|p| forest.get(p)).map(|p| p.kind()) {
        Some(NodeKind::Stack(stack)) if stack.active() == Some(node) => "☒ ",
        Some(NodeKind::Stack(_)) => "☐ ",
        _ => "",
    };
    let frame = match n.frame() {
        Some(f) => format!(" {:.0}x{:.0}+{:.0}+{:.0}", f.width(), f.height(), f.min_x(), f.min_y()),
        None => String::new(),
    };
    let desc = match n.kind() {
        NodeKind::Window(leaf) => format!("{status}{node:?} window {}{frame}", leaf.id.get()),
        NodeKind::Split(split) => format!("{status}{node:?} split {}{frame}", split.orientation),
        NodeKind::Stack(_) => format!("{status}{node:?} stack{frame}"),
    };
    let children: Vec<_> = n.children().iter().map(|&c| ascii_tree_of(forest, c)).collect();
    if children.is_empty() {
        ascii_tree::Tree::Leaf(vec![desc])
    } else {
        ascii_tree::Tree::Node(desc, children)
    }
}
