use serde::{Deserialize, Serialize};

use crate::common::epsilon::Approx;
use crate::layout_engine::Orientation;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }

    pub fn along(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.x,
            Orientation::Vertical => self.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size::new(0.0, 0.0);
    pub const UNBOUNDED: Size = Size::new(f64::INFINITY, f64::INFINITY);

    pub const fn new(width: f64, height: f64) -> Self { Self { width, height } }

    pub fn along(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.width,
            Orientation::Vertical => self.height,
        }
    }

    pub fn with_along(mut self, orientation: Orientation, value: f64) -> Self {
        match orientation {
            Orientation::Horizontal => self.width = value,
            Orientation::Vertical => self.height = value,
        }
        self
    }
}

/// Per-edge padding.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Insets {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl Insets {
    pub const fn uniform(amount: f64) -> Self {
        Self {
            top: amount,
            left: amount,
            bottom: amount,
            right: amount,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.left == 0.0 && self.bottom == 0.0 && self.right == 0.0
    }
}

/// Real-valued, axis-aligned rectangle. The origin is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::new(left, top, (right - left).max(0.0), (bottom - top).max(0.0))
    }

    pub fn min_x(&self) -> f64 { self.origin.x }

    pub fn min_y(&self) -> f64 { self.origin.y }

    pub fn max_x(&self) -> f64 { self.origin.x + self.size.width }

    pub fn max_y(&self) -> f64 { self.origin.y + self.size.height }

    pub fn width(&self) -> f64 { self.size.width }

    pub fn height(&self) -> f64 { self.size.height }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    /// Half-open containment: points on the right/bottom edge belong to the
    /// neighbour that starts there.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x < self.max_x()
            && point.y >= self.min_y()
            && point.y < self.max_y()
    }

    pub fn is_empty(&self) -> bool { self.size.width <= 0.0 || self.size.height <= 0.0 }

    pub fn extent(&self, orientation: Orientation) -> f64 { self.size.along(orientation) }

    pub fn start(&self, orientation: Orientation) -> f64 { self.origin.along(orientation) }

    pub fn end(&self, orientation: Orientation) -> f64 {
        self.start(orientation) + self.extent(orientation)
    }

    /// Returns the slice `[start, start + extent)` of this rectangle along
    /// `orientation`, keeping the full cross-axis span.
    pub fn slice(&self, orientation: Orientation, start: f64, extent: f64) -> Rect {
        match orientation {
            Orientation::Horizontal => Rect::new(start, self.origin.y, extent, self.size.height),
            Orientation::Vertical => Rect::new(self.origin.x, start, self.size.width, extent),
        }
    }

    /// Shrinks the rectangle by `insets`. The size never goes negative.
    pub fn pad(&self, insets: Insets) -> Rect {
        Rect::new(
            self.origin.x + insets.left,
            self.origin.y + insets.top,
            (self.size.width - insets.left - insets.right).max(0.0),
            (self.size.height - insets.top - insets.bottom).max(0.0),
        )
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.origin.x + dx, self.origin.y + dy, self.size.width, self.size.height)
    }

    pub fn approx_eq(&self, other: &Rect) -> bool {
        self.origin.x.approx_eq(other.origin.x)
            && self.origin.y.approx_eq(other.origin.y)
            && self.size.width.approx_eq(other.size.width)
            && self.size.height.approx_eq(other.size.height)
    }

    pub fn to_irect(&self) -> IRect {
        let r = self.round();
        IRect::new(
            r.origin.x as i32,
            r.origin.y as i32,
            r.size.width as i32,
            r.size.height as i32,
        )
    }
}

pub trait Round {
    fn round(&self) -> Self;
}

impl Round for Rect {
    /// Rounds the edges rather than origin and size independently, so two
    /// rectangles sharing an edge still share it after rounding.
    fn round(&self) -> Self {
        let left = self.min_x().round();
        let top = self.min_y().round();
        let right = self.max_x().round();
        let bottom = self.max_y().round();
        Rect::new(left, top, right - left, bottom - top)
    }
}

/// Integer rectangle handed back to the caller for application to real windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl IRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 { self.x + self.width }

    pub fn bottom(&self) -> i32 { self.y + self.height }

    pub fn pad(&self, amount: i32) -> IRect {
        IRect::new(
            self.x + amount,
            self.y + amount,
            (self.width - 2 * amount).max(0),
            (self.height - 2 * amount).max(0),
        )
    }

    pub fn offset(&self, dx: i32, dy: i32) -> IRect {
        IRect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x.into(), self.y.into(), self.width.into(), self.height.into())
    }
}

impl From<IRect> for Rect {
    fn from(value: IRect) -> Self { value.to_rect() }
}
