use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use super::geometry::{Rect, Size};
use crate::common::error::{Result, TilingError};

/// Stable identity of an OS window, assigned by the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct WindowId(NonZeroU64);

impl WindowId {
    pub const fn new(id: NonZeroU64) -> WindowId { WindowId(id) }

    pub fn get(&self) -> u64 { self.0.get() }
}

impl TryFrom<u64> for WindowId {
    type Error = TilingError;

    fn try_from(id: u64) -> Result<Self> {
        NonZeroU64::new(id)
            .map(WindowId)
            .ok_or_else(|| TilingError::InvalidArgument("window id 0 is reserved".into()))
    }
}

/// Stable identity of a virtual desktop.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct DesktopId(NonZeroU64);

impl DesktopId {
    pub const fn new(id: NonZeroU64) -> DesktopId { DesktopId(id) }

    pub fn get(&self) -> u64 { self.0.get() }
}

impl TryFrom<u64> for DesktopId {
    type Error = TilingError;

    fn try_from(id: u64) -> Result<Self> {
        NonZeroU64::new(id)
            .map(DesktopId)
            .ok_or_else(|| TilingError::InvalidArgument("desktop id 0 is reserved".into()))
    }
}

/// What the windowing collaborator reports about a window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub id: WindowId,
    /// Current on-screen frame, remembered as the window's original position.
    pub frame: Rect,
    pub min_size: Option<Size>,
    /// `None` means unbounded.
    pub max_size: Option<Size>,
}

impl WindowInfo {
    pub fn new(id: WindowId, frame: Rect) -> Self {
        Self {
            id,
            frame,
            min_size: None,
            max_size: None,
        }
    }

    pub fn with_min_size(mut self, min: Size) -> Self {
        self.min_size = Some(min);
        self
    }

    pub fn with_max_size(mut self, max: Size) -> Self {
        self.max_size = Some(max);
        self
    }

    pub fn constraint(&self) -> SizeConstraint {
        SizeConstraint {
            min: self.min_size.unwrap_or(Size::ZERO),
            max: self.max_size,
        }
    }
}

/// Size limits of one item handed to the one-shot arrangements.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SizeConstraint {
    pub min: Size,
    pub max: Option<Size>,
}

impl SizeConstraint {
    pub const fn unconstrained() -> Self {
        Self { min: Size::ZERO, max: None }
    }

    /// Shrinks `rect` to the maximum size, keeping its origin.
    pub fn clamp(&self, rect: Rect) -> Rect {
        let Some(max) = self.max else { return rect };
        Rect::new(
            rect.origin.x,
            rect.origin.y,
            rect.size.width.min(max.width),
            rect.size.height.min(max.height),
        )
    }
}

impl From<&WindowInfo> for SizeConstraint {
    fn from(info: &WindowInfo) -> Self { info.constraint() }
}
