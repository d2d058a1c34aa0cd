//! One-dimensional constrained space allocator.
//!
//! A [`Flex`] distributes a container width among an ordered list of items,
//! each bounded by a minimum and a maximum. While the container holds at least
//! one item the widths always add up to the container width, and every public
//! mutation either keeps that (plus the per-item bounds) or fails with
//! [`TilingError::UnsatisfiableConstraints`] and leaves the items untouched.
//!
//! All the space moving happens in one primitive, [`Scratch::shift`], which
//! moves a delta into or out of a set of items in proportion to each item's
//! headroom in that direction.

use tracing::{debug, trace};

use super::ResizeDirection;
use crate::common::epsilon::{Approx, ratio_or_zero};
use crate::common::error::{Result, TilingError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlexItem {
    pub width: f64,
    pub min_width: f64,
    pub max_width: f64,
}

impl FlexItem {
    /// Room to shrink before reaching the minimum.
    pub fn slack(&self) -> f64 { (self.width - self.min_width).max(0.0) }

    /// Room to grow before reaching the maximum.
    pub fn headroom(&self) -> f64 { (self.max_width - self.width).max(0.0) }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Flex {
    container_width: f64,
    items: Vec<FlexItem>,
}

impl Flex {
    pub fn new(container_width: f64) -> Result<Self> {
        validate_width(container_width)?;
        Ok(Self {
            container_width,
            items: Vec::new(),
        })
    }

    pub fn container_width(&self) -> f64 { self.container_width }

    pub fn items(&self) -> &[FlexItem] { &self.items }

    pub fn item(&self, index: usize) -> Option<&FlexItem> { self.items.get(index) }

    pub fn width(&self, index: usize) -> Option<f64> { self.items.get(index).map(|i| i.width) }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn used_width(&self) -> f64 { self.items.iter().map(|i| i.width).sum() }

    pub fn total_min(&self) -> f64 { self.items.iter().map(|i| i.min_width).sum() }

    pub fn total_max(&self) -> f64 { self.items.iter().map(|i| i.max_width).sum() }

    /// Inserts an item at `index` and returns the width it was given.
    ///
    /// The new item asks for `min(container - Σmin, container / (n + 1))`
    /// (never less than the currently unused width), clamped into its own
    /// bounds. Existing items shrink in proportion to their slack to make room.
    pub fn insert_item(&mut self, index: usize, min_width: f64, max_width: f64) -> Result<f64> {
        validate_bounds(min_width, max_width)?;
        if index > self.items.len() {
            return Err(out_of_range(index, self.items.len() + 1));
        }
        self.transaction(|flex| {
            let container = flex.container_width;
            let count = flex.items.len();
            let unused = (container - flex.used_width()).max(0.0);
            let available = container - flex.total_min();
            if min_width.definitely_gt(available) {
                return Err(TilingError::UnsatisfiableConstraints(format!(
                    "minimum width {min_width} does not fit in the remaining {available}"
                )));
            }

            let desired = available
                .min(container / (count + 1) as f64)
                .max(unused)
                .clamp_to(min_width, max_width);
            let needed = (desired - unused).max(0.0);

            let mut scratch = Scratch::new(flex);
            let everyone: Vec<usize> = (0..count).collect();
            let missing = scratch.shift(&everyone, -needed).abs();
            scratch.commit(flex);

            let width = desired - missing;
            if width.definitely_lt(min_width) {
                return Err(TilingError::UnsatisfiableConstraints(format!(
                    "only {width} could be freed for an item of minimum width {min_width}"
                )));
            }
            flex.items.insert(index, FlexItem {
                width: width.clamp_to(min_width, max_width),
                min_width,
                max_width,
            });
            flex.fill_unused()?;
            trace!(index, width, "inserted flex item");
            Ok(flex.items[index].width)
        })
    }

    /// Removes the item at `index`, handing its width to the remaining items.
    ///
    /// The reclaimed width is shared in proportion to each survivor's slack
    /// above its minimum, which exactly undoes the shrinking done by
    /// [`Flex::insert_item`]. Anything the maxima refuse is spread over the
    /// remaining headroom; if every survivor is already at its maximum their
    /// maxima are widened so the container stays filled.
    pub fn remove_item(&mut self, index: usize) -> Result<FlexItem> {
        if index >= self.items.len() {
            return Err(out_of_range(index, self.items.len()));
        }
        let removed = self.items.remove(index);
        if self.items.is_empty() {
            return Ok(removed);
        }

        let mut leftover = removed.width;
        let total_slack: f64 = self.items.iter().map(FlexItem::slack).sum();
        if !ratio_or_zero(total_slack, self.container_width).approx_zero() {
            let reclaimed = removed.width;
            for item in &mut self.items {
                let share = reclaimed * item.slack() / total_slack;
                let given = share.min(item.headroom());
                item.width += given;
                leftover -= given;
            }
        }

        let mut scratch = Scratch::new(self);
        let everyone: Vec<usize> = (0..self.items.len()).collect();
        let remainder = scratch.shift(&everyone, leftover);
        scratch.commit(self);

        if remainder > 0.0 {
            let share = remainder / self.items.len() as f64;
            debug!(remainder, "every remaining flex item is at its maximum, widening maxima");
            for item in &mut self.items {
                item.width += share;
                item.max_width = item.max_width.max(item.width);
            }
        }
        trace!(index, width = removed.width, "removed flex item");
        Ok(removed)
    }

    /// Resizes the item at `index` to `new_width`, taking or giving the
    /// difference from the items selected by `direction`.
    ///
    /// With `uniform` the whole selected set shares the delta in proportion to
    /// its headroom; otherwise the nearest neighbour gives (or takes) as much
    /// as it can before the next one is touched, like dragging a splitter.
    /// Growing fails unless the selected items can give up the full delta.
    /// When shrinking, space the selected items cannot absorb stays with the
    /// resized item.
    ///
    /// Every neighbour that gave or took space keeps its new width as a bound:
    /// a neighbour that grew has its minimum raised to its new width, one that
    /// shrank has its maximum lowered to it. The resized item's own bounds are
    /// left alone. [`Flex::update_constraints_bulk`] is how callers relax them
    /// again.
    pub fn resize_item(
        &mut self,
        index: usize,
        new_width: f64,
        direction: ResizeDirection,
        uniform: bool,
    ) -> Result<()> {
        let Some(&item) = self.items.get(index) else {
            return Err(out_of_range(index, self.items.len()));
        };
        if !new_width.is_finite()
            || new_width.definitely_lt(item.min_width)
            || new_width.definitely_gt(item.max_width)
        {
            return Err(TilingError::UnsatisfiableConstraints(format!(
                "width {new_width} is outside [{}, {}]",
                item.min_width, item.max_width
            )));
        }
        let new_width = new_width.clamp_to(item.min_width, item.max_width);

        self.transaction(|flex| {
            let delta = new_width - item.width;
            if ratio_or_zero(delta, flex.container_width).approx_zero() {
                return Ok(());
            }
            let neighbours = absorbing_set(flex.items.len(), index, direction);
            let mut scratch = Scratch::new(flex);
            let shift = |scratch: &mut Scratch, amount: f64| {
                if uniform {
                    scratch.shift(&neighbours, amount)
                } else {
                    scratch.cascade(&neighbours, amount)
                }
            };

            let width = if delta > 0.0 {
                let missing = shift(&mut scratch, -delta);
                if missing != 0.0 {
                    return Err(TilingError::UnsatisfiableConstraints(format!(
                        "neighbours can only give up {} of {delta}",
                        delta - missing.abs()
                    )));
                }
                new_width
            } else {
                let refused = shift(&mut scratch, -delta);
                new_width + refused
            };
            if width.definitely_gt(item.max_width) {
                return Err(TilingError::UnsatisfiableConstraints(format!(
                    "neighbours cannot absorb the space freed by shrinking to {new_width}"
                )));
            }
            scratch.commit_with_bounds(flex);
            flex.items[index].width = width.clamp_to(item.min_width, item.max_width);
            Ok(())
        })
    }

    /// Replaces the bounds of one item, clamping its width into them by
    /// resizing against all other items.
    pub fn update_constraints(
        &mut self,
        index: usize,
        min_width: f64,
        max_width: f64,
    ) -> Result<()> {
        validate_bounds(min_width, max_width)?;
        if index >= self.items.len() {
            return Err(out_of_range(index, self.items.len()));
        }
        self.transaction(|flex| {
            let item = &mut flex.items[index];
            item.min_width = min_width;
            item.max_width = max_width;
            let width = item.width;
            if width.definitely_lt(min_width) || width.definitely_gt(max_width) {
                flex.resize_item(
                    index,
                    width.clamp(min_width, max_width),
                    ResizeDirection::BOTH,
                    true,
                )
            } else {
                item.width = width.clamp_to(min_width, max_width);
                Ok(())
            }
        })
    }

    /// Replaces the bounds of every item at once.
    ///
    /// Fails if the new minima exceed the container, or if the new maxima
    /// cannot fill it.
    pub fn update_constraints_bulk(&mut self, bounds: &[(f64, f64)]) -> Result<()> {
        if bounds.len() != self.items.len() {
            return Err(TilingError::InvalidArgument(format!(
                "expected {} bounds, got {}",
                self.items.len(),
                bounds.len()
            )));
        }
        for &(min, max) in bounds {
            validate_bounds(min, max)?;
        }
        self.transaction(|flex| {
            for (item, &(min, max)) in flex.items.iter_mut().zip(bounds) {
                item.min_width = min;
                item.max_width = max;
            }
            let total_min = flex.total_min();
            if total_min.definitely_gt(flex.container_width) {
                return Err(TilingError::UnsatisfiableConstraints(format!(
                    "minimum widths {total_min} exceed the container {}",
                    flex.container_width
                )));
            }
            for item in &mut flex.items {
                item.width = item.width.clamp(item.min_width, item.max_width);
            }
            flex.fill_unused()?;
            flex.give_back_overflow()
        })
    }

    /// Changes the container width, rescaling every item proportionally and
    /// clamping it back into its (unscaled) bounds.
    pub fn set_container_width(&mut self, container_width: f64) -> Result<()> {
        validate_width(container_width)?;
        let total_min = self.total_min();
        if container_width.definitely_lt(total_min) {
            return Err(TilingError::UnsatisfiableConstraints(format!(
                "container {container_width} is smaller than the minimum widths {total_min}"
            )));
        }
        self.transaction(|flex| {
            let old = flex.container_width;
            flex.container_width = container_width;
            if flex.items.is_empty() {
                return Ok(());
            }
            let used = flex.used_width();
            if old.approx_zero() || used.approx_zero() {
                let share = container_width / flex.items.len() as f64;
                for item in &mut flex.items {
                    item.width = share;
                }
            } else {
                let ratio = container_width / used;
                for item in &mut flex.items {
                    item.width *= ratio;
                }
            }
            for item in &mut flex.items {
                item.width = item.width.clamp(item.min_width, item.max_width);
            }
            flex.fill_unused()?;
            flex.give_back_overflow()
        })
    }

    /// Moves an item to a new position. Widths are not touched.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.items.len();
        if from >= len {
            return Err(out_of_range(from, len));
        }
        if to >= len {
            return Err(out_of_range(to, len));
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    /// Swaps two items' positions, widths and bounds included.
    pub fn swap_items(&mut self, a: usize, b: usize) -> Result<()> {
        let len = self.items.len();
        if a >= len || b >= len {
            return Err(out_of_range(a.max(b), len));
        }
        self.items.swap(a, b);
        Ok(())
    }

    /// Replaces the item at `index` with `fractions.len()` items sharing its
    /// width in the given proportions. The new items are bounded only by the
    /// container.
    pub fn split_item(&mut self, index: usize, fractions: &[f64]) -> Result<()> {
        if index >= self.items.len() {
            return Err(out_of_range(index, self.items.len()));
        }
        let total: f64 = fractions.iter().sum();
        if fractions.is_empty()
            || fractions.iter().any(|f| !f.is_finite() || *f < 0.0)
            || total.approx_zero()
        {
            return Err(TilingError::InvalidArgument(format!(
                "cannot split an item by {fractions:?}"
            )));
        }
        let item = self.items.remove(index);
        let max_width = self.container_width.max(item.width);
        for (offset, fraction) in fractions.iter().enumerate() {
            self.items.insert(index + offset, FlexItem {
                width: item.width * fraction / total,
                min_width: 0.0,
                max_width,
            });
        }
        Ok(())
    }

    /// Checks the container invariants. Used by tests and debug assertions.
    pub fn is_consistent(&self) -> bool {
        if !self.container_width.is_finite() || self.container_width < 0.0 {
            return false;
        }
        let bounded = self.items.iter().all(|item| {
            item.min_width >= 0.0
                && item.max_width.is_finite()
                && item.min_width.approx_le(item.width)
                && item.width.approx_le(item.max_width)
        });
        bounded && (self.items.is_empty() || self.used_width().approx_eq(self.container_width))
    }

    fn transaction<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let snapshot = self.clone();
        let result = op(self);
        match &result {
            Ok(_) => debug_assert!(self.is_consistent(), "flex left inconsistent: {self:?}"),
            Err(err) => {
                trace!(%err, "rolling back flex");
                *self = snapshot;
            }
        }
        result
    }

    /// Grows items into their headroom until the container is filled.
    fn fill_unused(&mut self) -> Result<()> {
        if self.items.is_empty() {
            return Ok(());
        }
        let unused = self.container_width - self.used_width();
        if !ratio_or_zero(unused, self.container_width).definitely_gt(0.0) {
            return Ok(());
        }
        let mut scratch = Scratch::new(self);
        let everyone: Vec<usize> = (0..self.items.len()).collect();
        let remainder = scratch.shift(&everyone, unused);
        scratch.commit(self);
        if remainder != 0.0 {
            return Err(TilingError::UnsatisfiableConstraints(format!(
                "maximum widths {} cannot fill the container {}",
                self.total_max(),
                self.container_width
            )));
        }
        Ok(())
    }

    /// Shrinks items into their slack until they fit the container again.
    fn give_back_overflow(&mut self) -> Result<()> {
        let overflow = self.used_width() - self.container_width;
        if !ratio_or_zero(overflow, self.container_width).definitely_gt(0.0) {
            return Ok(());
        }
        let mut scratch = Scratch::new(self);
        let everyone: Vec<usize> = (0..self.items.len()).collect();
        let remainder = scratch.shift(&everyone, -overflow);
        scratch.commit(self);
        if remainder != 0.0 {
            return Err(TilingError::UnsatisfiableConstraints(format!(
                "minimum widths {} do not fit the container {}",
                self.total_min(),
                self.container_width
            )));
        }
        Ok(())
    }
}

/// Working copy of the items, normalized to fractions of the container.
///
/// `floor` and `ceiling` start out as the item bounds. A slot that grows
/// raises its floor to the new value and a slot that shrinks lowers its
/// ceiling, so a later pass in the same operation cannot take back what an
/// earlier pass handed out. [`Scratch::commit_with_bounds`] persists them.
struct Scratch {
    slots: Vec<Slot>,
    scale: f64,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    value: f64,
    floor: f64,
    ceiling: f64,
    moved: bool,
}

impl Scratch {
    fn new(flex: &Flex) -> Self {
        let scale = if flex.container_width > 0.0 { flex.container_width } else { 1.0 };
        let slots = flex
            .items
            .iter()
            .map(|item| Slot {
                value: item.width / scale,
                floor: item.min_width / scale,
                ceiling: item.max_width / scale,
                moved: false,
            })
            .collect();
        Self { slots, scale }
    }

    /// Moves `delta` into (positive) or out of (negative) the slots at
    /// `indices`, each in proportion to its headroom in that direction.
    /// Returns the part of `delta` that could not be placed, or exactly zero.
    fn shift(&mut self, indices: &[usize], delta: f64) -> f64 {
        let delta = delta / self.scale;
        if delta.approx_zero() {
            return 0.0;
        }
        let growing = delta > 0.0;
        let headroom = |slot: &Slot| {
            if growing {
                (slot.ceiling - slot.value).max(0.0)
            } else {
                (slot.value - slot.floor).max(0.0)
            }
        };
        let available: f64 = indices.iter().map(|&i| headroom(&self.slots[i])).sum();
        if available.approx_zero() {
            return delta * self.scale;
        }
        let factor = (delta.abs() / available).min(1.0);
        for &i in indices {
            let slot = &mut self.slots[i];
            let step = headroom(slot) * factor;
            if step.approx_zero() {
                continue;
            }
            slot.moved = true;
            if growing {
                slot.value += step;
                slot.floor = slot.floor.max(slot.value);
            } else {
                slot.value -= step;
                slot.ceiling = slot.ceiling.min(slot.value);
            }
        }
        let remainder = delta.abs() - available * factor;
        if remainder.approx_zero() { 0.0 } else { remainder.copysign(delta) * self.scale }
    }

    /// Like [`Scratch::shift`], but exhausts each slot in order before
    /// touching the next one.
    fn cascade(&mut self, indices: &[usize], delta: f64) -> f64 {
        let mut remaining = delta;
        for &i in indices {
            if remaining == 0.0 {
                break;
            }
            remaining = self.shift(&[i], remaining);
        }
        remaining
    }

    fn commit(self, flex: &mut Flex) {
        for (item, slot) in flex.items.iter_mut().zip(self.slots) {
            item.width = (slot.value * self.scale).clamp_to(item.min_width, item.max_width);
        }
    }

    /// Commits the widths. A slot that moved turns its new width into the
    /// bound it moved towards.
    fn commit_with_bounds(self, flex: &mut Flex) {
        let scale = self.scale;
        for (item, slot) in flex.items.iter_mut().zip(self.slots) {
            let width = (slot.value * scale).clamp_to(item.min_width, item.max_width);
            if slot.moved && width > item.width {
                item.min_width = width;
            } else if slot.moved && width < item.width {
                item.max_width = width;
            }
            item.width = width;
        }
    }
}

/// Items allowed to absorb a resize of `index`, nearest first.
fn absorbing_set(len: usize, index: usize, direction: ResizeDirection) -> Vec<usize> {
    let after = index + 1..len;
    let before = (0..index).rev();
    match (
        direction.contains(ResizeDirection::TOWARDS_START),
        direction.contains(ResizeDirection::TOWARDS_END),
    ) {
        (false, false) => Vec::new(),
        (false, true) => after.collect(),
        (true, false) => before.collect(),
        (true, true) => {
            let mut set: Vec<usize> = after.chain(before).collect();
            set.sort_by_key(|&i| (i.abs_diff(index), i < index));
            set
        }
    }
}

fn validate_width(width: f64) -> Result<()> {
    if !width.is_finite() || width < 0.0 {
        return Err(TilingError::InvalidArgument(format!(
            "container width must be finite and non-negative, got {width}"
        )));
    }
    Ok(())
}

fn validate_bounds(min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
        return Err(TilingError::InvalidArgument(format!(
            "bounds must satisfy 0 <= min <= max and be finite, got [{min}, {max}]"
        )));
    }
    Ok(())
}

fn out_of_range(index: usize, len: usize) -> TilingError {
    TilingError::InvalidArgument(format!("index {index} out of range for {len} items"))
}
