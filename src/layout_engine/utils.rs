use crate::common::config::GapSettings;
use crate::sys::geometry::{Insets, Rect, Round};

/// The part of `work_area` windows are tiled into, after the outer gaps.
pub fn compute_tiling_area(work_area: Rect, gaps: &GapSettings) -> Rect {
    if gaps.outer.is_zero() {
        work_area
    } else {
        work_area
            .pad(Insets {
                top: gaps.outer.top,
                left: gaps.outer.left,
                bottom: gaps.outer.bottom,
                right: gaps.outer.right,
            })
            .round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::OuterGaps;

    #[test]
    fn outer_gaps_shrink_the_work_area() {
        let work_area = Rect::new(0.0, 25.0, 1440.0, 875.0);
        assert_eq!(compute_tiling_area(work_area, &GapSettings::default()), work_area);

        let gaps = GapSettings {
            outer: OuterGaps {
                top: 10.0,
                left: 8.0,
                bottom: 10.0,
                right: 8.0,
            },
            ..Default::default()
        };
        assert_eq!(
            compute_tiling_area(work_area, &gaps),
            Rect::new(8.0, 35.0, 1424.0, 855.0)
        );
    }

    #[test]
    fn huge_gaps_leave_an_empty_area() {
        let gaps = GapSettings {
            outer: OuterGaps::uniform(300.0),
            ..Default::default()
        };
        let area = compute_tiling_area(Rect::new(0.0, 0.0, 400.0, 400.0), &gaps);
        assert!(area.is_empty());
    }
}
