use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::common::epsilon::Approx;
use crate::sys::geometry::{Insets, Rect};
use crate::sys::window::{SizeConstraint, WindowId, WindowInfo};

/// A stateless arrangement of items inside an area, ignoring any tree.
#[enum_dispatch]
pub trait Arrangement {
    /// One rectangle per item, in input order. Items that do not fit the
    /// arrangement are left out of the result.
    fn arrange(&self, area: Rect, items: &[SizeConstraint]) -> Vec<Rect>;

    fn arrange_windows(&self, area: Rect, windows: &[WindowInfo]) -> Vec<(WindowId, Rect)> {
        let constraints: Vec<SizeConstraint> = windows.iter().map(SizeConstraint::from).collect();
        windows.iter().map(|w| w.id).zip(self.arrange(area, &constraints)).collect()
    }
}

mod grid;
pub use grid::GridArrangement;
mod ratio;
pub use ratio::RatioArrangement;

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[derive(Debug, Clone, Copy, PartialEq)]
#[enum_dispatch(Arrangement)]
pub enum ArrangementKind {
    Grid(GridArrangement),
    Ratio(RatioArrangement),
}

impl Default for ArrangementKind {
    fn default() -> Self { ArrangementKind::Grid(GridArrangement::default()) }
}

impl ArrangementKind {
    pub fn spacing(&self) -> f64 {
        match self {
            ArrangementKind::Grid(grid) => grid.spacing,
            ArrangementKind::Ratio(ratio) => ratio.spacing(),
        }
    }
}

/// Insets `cell` by `spacing` on the edges it shares with `area` and by half
/// of it on internal edges, so neighbouring cells end up `spacing` apart.
pub(crate) fn inset_cell(area: Rect, cell: Rect, spacing: f64) -> Rect {
    if spacing == 0.0 {
        return cell;
    }
    let edge = |outer: bool| if outer { spacing } else { spacing / 2.0 };
    cell.pad(Insets {
        top: edge(cell.min_y().approx_eq(area.min_y())),
        left: edge(cell.min_x().approx_eq(area.min_x())),
        bottom: edge(cell.max_y().approx_eq(area.max_y())),
        right: edge(cell.max_x().approx_eq(area.max_x())),
    })
}
