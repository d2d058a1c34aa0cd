use bitflags::bitflags;

use super::Direction;

bitflags! {
    /// Which neighbours of a resized item may give up or take space.
    ///
    /// `TOWARDS_END` selects the items after the resized one (its right or
    /// bottom edge moves), `TOWARDS_START` the items before it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResizeDirection: u8 {
        const TOWARDS_START = 0b01;
        const TOWARDS_END = 0b10;
        const BOTH = Self::TOWARDS_START.bits() | Self::TOWARDS_END.bits();
    }
}

impl From<Direction> for ResizeDirection {
    fn from(direction: Direction) -> Self {
        if direction.is_towards_start() {
            ResizeDirection::TOWARDS_START
        } else {
            ResizeDirection::TOWARDS_END
        }
    }
}

/// Direction argument of [`Partition::resize`](super::Partition::resize).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightDirection {
    #[default]
    Both,
    TowardsStart,
    TowardsEnd,
}

impl From<ResizeDirection> for WeightDirection {
    fn from(mask: ResizeDirection) -> Self {
        if mask == ResizeDirection::TOWARDS_START {
            WeightDirection::TowardsStart
        } else if mask == ResizeDirection::TOWARDS_END {
            WeightDirection::TowardsEnd
        } else {
            WeightDirection::Both
        }
    }
}
