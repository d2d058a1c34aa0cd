use serde::{Deserialize, Serialize};

use super::{Arrangement, inset_cell};
use crate::common::error::{Result, TilingError};
use crate::layout_engine::Orientation;
use crate::sys::geometry::Rect;
use crate::sys::window::SizeConstraint;

/// Master/remainder arrangement: each item takes `ratio` of the longer side
/// of what is left, the last one takes everything that remains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioArrangement {
    #[serde(default = "default_ratio")]
    ratio: f64,
    #[serde(default)]
    spacing: f64,
}

fn default_ratio() -> f64 { 0.5 }

impl Default for RatioArrangement {
    fn default() -> Self {
        Self {
            ratio: default_ratio(),
            spacing: 0.0,
        }
    }
}

impl RatioArrangement {
    pub fn new(ratio: f64, spacing: f64) -> Result<Self> {
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(TilingError::InvalidArgument(format!(
                "ratio must be strictly between 0 and 1, got {ratio}"
            )));
        }
        Ok(Self { ratio, spacing })
    }

    pub fn ratio(&self) -> f64 { self.ratio }

    pub fn spacing(&self) -> f64 { self.spacing }
}

impl Arrangement for RatioArrangement {
    fn arrange(&self, area: Rect, items: &[SizeConstraint]) -> Vec<Rect> {
        let mut rects = Vec::with_capacity(items.len());
        let mut rest = area;
        for (i, item) in items.iter().enumerate() {
            let slot = if i + 1 == items.len() {
                rest
            } else {
                let axis = if rest.width() > rest.height() {
                    Orientation::Horizontal
                } else {
                    Orientation::Vertical
                };
                let start = rest.start(axis);
                let current = rest.extent(axis) * self.ratio;
                let slot = rest.slice(axis, start, current);
                rest = rest.slice(axis, start + current, rest.extent(axis) - current);
                slot
            };
            rects.push(item.clamp(inset_cell(area, slot, self.spacing)));
        }
        rects
    }
}
