use serde::{Deserialize, Serialize};

use super::{Arrangement, inset_cell};
use crate::sys::geometry::Rect;
use crate::sys::window::SizeConstraint;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GridArrangement {
    #[serde(default)]
    pub spacing: f64,
}

impl GridArrangement {
    pub fn new(spacing: f64) -> Self { Self { spacing } }

    /// Returns `(rows, columns)` for `count` items: `ceil(sqrt(n))` columns
    /// and as many rows as needed to hold the rest. Only an area wider than
    /// tall may trade rows for columns, and only when that adds columns.
    pub fn dimensions(count: usize, area: Rect) -> (usize, usize) {
        if count == 0 {
            return (0, 0);
        }
        let columns = (count as f64).sqrt().ceil() as usize;
        let rows = count.div_ceil(columns);
        if area.width() > area.height() && rows > columns {
            (columns, rows)
        } else {
            (rows, columns)
        }
    }
}

impl Arrangement for GridArrangement {
    fn arrange(&self, area: Rect, items: &[SizeConstraint]) -> Vec<Rect> {
        let (rows, columns) = Self::dimensions(items.len(), area);
        let x_at = |col: usize| area.min_x() + area.width() * col as f64 / columns as f64;
        let y_at = |row: usize| area.min_y() + area.height() * row as f64 / rows as f64;
        items
            .iter()
            .take(rows * columns)
            .enumerate()
            .map(|(i, item)| {
                let (row, col) = (i / columns, i % columns);
                let cell = Rect::from_edges(x_at(col), y_at(row), x_at(col + 1), y_at(row + 1));
                item.clamp(inset_cell(area, cell, self.spacing))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sys::geometry::Size;

    fn items(n: usize) -> Vec<SizeConstraint> { vec![SizeConstraint::unconstrained(); n] }

    #[test]
    fn five_items_leave_no_empty_row() {
        let area = Rect::new(0.0, 0.0, 2000.0, 2000.0);
        let (rows, columns) = GridArrangement::dimensions(5, area);
        assert!(rows * columns >= 5);
        assert!(rows * columns - 5 < columns);
        assert_eq!(GridArrangement::new(0.0).arrange(area, &items(5)).len(), 5);
    }

    #[test]
    fn columns_come_first() {
        let square = Rect::new(0.0, 0.0, 2000.0, 2000.0);
        assert_eq!(GridArrangement::dimensions(5, square), (2, 3));
        assert_eq!(GridArrangement::dimensions(3, square), (2, 2));
        assert_eq!(GridArrangement::dimensions(10, square), (3, 4));
        assert_eq!(GridArrangement::dimensions(5, Rect::new(0.0, 0.0, 1600.0, 900.0)), (2, 3));
        assert_eq!(GridArrangement::dimensions(5, Rect::new(0.0, 0.0, 900.0, 1600.0)), (2, 3));
        assert_eq!(GridArrangement::dimensions(1, Rect::new(0.0, 0.0, 10.0, 10.0)), (1, 1));
        assert_eq!(GridArrangement::dimensions(0, Rect::new(0.0, 0.0, 10.0, 10.0)), (0, 0));
    }

    #[test]
    fn five_items_in_a_square_fill_two_rows() {
        let area = Rect::new(0.0, 0.0, 2000.0, 2000.0);
        let rects = GridArrangement::new(0.0).arrange(area, &items(5));
        assert_eq!(rects.len(), 5);
        assert!(rects[2].approx_eq(&Rect::new(4000.0 / 3.0, 0.0, 2000.0 / 3.0, 1000.0)));
        assert!(rects[3].approx_eq(&Rect::new(0.0, 1000.0, 2000.0 / 3.0, 1000.0)));
    }

    #[test]
    fn cells_tile_the_area_in_input_order() {
        let area = Rect::new(100.0, 50.0, 600.0, 400.0);
        let rects = GridArrangement::new(0.0).arrange(area, &items(4));
        assert_eq!(rects, vec![
            Rect::new(100.0, 50.0, 300.0, 200.0),
            Rect::new(400.0, 50.0, 300.0, 200.0),
            Rect::new(100.0, 250.0, 300.0, 200.0),
            Rect::new(400.0, 250.0, 300.0, 200.0),
        ]);
    }

    #[test]
    fn spacing_is_even_between_and_around_cells() {
        let area = Rect::new(0.0, 0.0, 420.0, 200.0);
        let rects = GridArrangement::new(20.0).arrange(area, &items(2));
        assert_eq!(rects, vec![
            Rect::new(20.0, 20.0, 180.0, 160.0),
            Rect::new(220.0, 20.0, 180.0, 160.0),
        ]);
    }

    #[test]
    fn maximum_sizes_shrink_the_cell() {
        let area = Rect::new(0.0, 0.0, 400.0, 200.0);
        let constrained = [
            SizeConstraint::unconstrained(),
            SizeConstraint {
                min: Size::ZERO,
                max: Some(Size::new(50.0, 500.0)),
            },
        ];
        let rects = GridArrangement::new(0.0).arrange(area, &constrained);
        assert_eq!(rects[1], Rect::new(200.0, 0.0, 50.0, 200.0));
    }
}
