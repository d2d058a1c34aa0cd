//! Weighted division of a normalized extent.
//!
//! Stack panels keep one entry per tab here. The weights always add up to one
//! while the partition is non-empty.

use super::WeightDirection;
use crate::common::epsilon::{Approx, WEIGHT_EPSILON};
use crate::common::error::{Result, TilingError};

#[derive(Debug, Clone, PartialEq)]
struct Entry<E> {
    weight: f64,
    value: E,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partition<E> {
    entries: Vec<Entry<E>>,
}

impl<E> Default for Partition<E> {
    fn default() -> Self { Self { entries: Vec::new() } }
}

impl<E> Partition<E> {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn weight(&self, index: usize) -> Option<f64> { self.entries.get(index).map(|e| e.weight) }

    pub fn value(&self, index: usize) -> Option<&E> { self.entries.get(index).map(|e| &e.value) }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &E)> {
        self.entries.iter().map(|e| (e.weight, &e.value))
    }

    pub fn values(&self) -> impl Iterator<Item = &E> { self.entries.iter().map(|e| &e.value) }

    pub fn position(&self, value: &E) -> Option<usize>
    where
        E: PartialEq,
    {
        self.entries.iter().position(|e| e.value == *value)
    }

    /// Inserts `value` with an equal share of `1 / (n + 1)`.
    pub fn insert(&mut self, index: usize, value: E) -> Result<()> {
        let weight = 1.0 / (self.entries.len() + 1) as f64;
        self.insert_weighted(index, value, weight)
    }

    /// Inserts `value` with the given weight, scaling every existing weight by
    /// `1 - weight`. The first entry always gets the whole extent.
    pub fn insert_weighted(&mut self, index: usize, value: E, weight: f64) -> Result<()> {
        validate_weight(weight)?;
        if index > self.entries.len() {
            return Err(out_of_range(index, self.entries.len() + 1));
        }
        let weight = if self.entries.is_empty() { 1.0 } else { weight };
        for entry in &mut self.entries {
            entry.weight *= 1.0 - weight;
        }
        self.entries.insert(index, Entry { weight, value });
        self.check()
    }

    /// Removes the entry at `index`, spreading its weight evenly over the rest.
    pub fn remove_at(&mut self, index: usize) -> Result<E> {
        if index >= self.entries.len() {
            return Err(out_of_range(index, self.entries.len()));
        }
        let removed = self.entries.remove(index);
        if !self.entries.is_empty() {
            let share = removed.weight / self.entries.len() as f64;
            for entry in &mut self.entries {
                entry.weight += share;
            }
        }
        self.check()?;
        Ok(removed.value)
    }

    /// Replaces the entry at `index` with `values`, which share its weight
    /// equally. Returns the replaced value.
    pub fn replace_with(&mut self, index: usize, values: Vec<E>) -> Result<E> {
        if index >= self.entries.len() {
            return Err(out_of_range(index, self.entries.len()));
        }
        if values.is_empty() {
            return self.remove_at(index);
        }
        let share = self.entries[index].weight / values.len() as f64;
        let replaced = self
            .entries
            .splice(index..=index, values.into_iter().map(|value| Entry { weight: share, value }))
            .next();
        self.check()?;
        replaced
            .map(|e| e.value)
            .ok_or_else(|| TilingError::InvariantViolation("replaced entry vanished".into()))
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        let len = self.entries.len();
        if a >= len || b >= len {
            return Err(out_of_range(a.max(b), len));
        }
        self.entries.swap(a, b);
        Ok(())
    }

    /// Moves an entry, keeping its weight.
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.entries.len();
        if from >= len || to >= len {
            return Err(out_of_range(from.max(to), len));
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        Ok(())
    }

    /// Sets the weight of the entry at `index`.
    ///
    /// `Both` takes the difference evenly from every other entry. The
    /// directional variants only touch the entries strictly before or after
    /// `index`, each in proportion to its share of that side; a side that
    /// cannot give up the whole difference caps it.
    pub fn resize(&mut self, index: usize, weight: f64, direction: WeightDirection) -> Result<()> {
        validate_weight(weight)?;
        if index >= self.entries.len() {
            return Err(out_of_range(index, self.entries.len()));
        }
        if self.entries.len() == 1 {
            return Ok(());
        }
        let side = match direction {
            WeightDirection::Both => None,
            WeightDirection::TowardsStart => Some(0..index),
            WeightDirection::TowardsEnd => Some(index + 1..self.entries.len()),
        };
        let Some(side) = side.filter(|side| !side.is_empty()) else {
            let entry = self.entries.remove(index);
            let share = entry.weight / self.entries.len() as f64;
            for other in &mut self.entries {
                other.weight += share;
            }
            return self.insert_weighted(index, entry.value, weight);
        };

        let side_total: f64 = self.entries[side.clone()].iter().map(|e| e.weight).sum();
        let current = self.entries[index].weight;
        let delta = (weight - current).min(side_total);
        let count = side.len() as f64;
        for entry in &mut self.entries[side] {
            if side_total.approx_zero() {
                entry.weight -= delta / count;
            } else {
                entry.weight -= delta * entry.weight / side_total;
            }
            entry.weight = entry.weight.max(0.0);
        }
        self.entries[index].weight = current + delta;
        self.check()
    }

    fn check(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let sum: f64 = self.entries.iter().map(|e| e.weight).sum();
        if !sum.approx_eq_within(1.0, WEIGHT_EPSILON) {
            return Err(TilingError::InvariantViolation(format!(
                "partition weights add up to {sum}"
            )));
        }
        Ok(())
    }
}

fn validate_weight(weight: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&weight) {
        return Err(TilingError::InvalidArgument(format!(
            "weight must be within [0, 1], got {weight}"
        )));
    }
    Ok(())
}

fn out_of_range(index: usize, len: usize) -> TilingError {
    TilingError::InvalidArgument(format!("index {index} out of range for {len} entries"))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn weights<E>(partition: &Partition<E>) -> Vec<f64> {
        partition.iter().map(|(w, _)| w).collect()
    }

    fn assert_weights<E>(partition: &Partition<E>, expected: &[f64]) {
        let actual = weights(partition);
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!(a.approx_eq(*e), "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn inserts_take_equal_shares() {
        let mut partition = Partition::new();
        partition.insert(0, 'a').unwrap();
        assert_weights(&partition, &[1.0]);
        partition.insert(1, 'b').unwrap();
        assert_weights(&partition, &[0.5, 0.5]);
        partition.insert(0, 'c').unwrap();
        assert_weights(&partition, &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);
        assert_eq!(partition.values().copied().collect::<String>(), "cab");
        assert_eq!(partition.position(&'b'), Some(2));
    }

    #[test]
    fn weighted_insert_scales_the_others() {
        let mut partition = Partition::new();
        partition.insert(0, 1).unwrap();
        partition.insert(1, 2).unwrap();
        partition.insert_weighted(2, 3, 0.5).unwrap();
        assert_weights(&partition, &[0.25, 0.25, 0.5]);
    }

    #[test]
    fn remove_spreads_evenly() {
        let mut partition = Partition::new();
        for i in 0..2 {
            partition.insert(i, i).unwrap();
        }
        partition.insert_weighted(2, 2, 0.5).unwrap();
        assert_eq!(partition.remove_at(0).unwrap(), 0);
        assert_weights(&partition, &[0.375, 0.625]);
        assert!(partition.remove_at(5).is_err());
    }

    #[test]
    fn directional_resize_only_touches_one_side() {
        let mut partition = Partition::new();
        for i in 0..4 {
            partition.insert(i, i).unwrap();
        }
        partition.resize(1, 0.5, WeightDirection::TowardsEnd).unwrap();
        assert_weights(&partition, &[0.25, 0.5, 0.125, 0.125]);
        partition.resize(1, 0.6, WeightDirection::TowardsStart).unwrap();
        assert_weights(&partition, &[0.15, 0.6, 0.125, 0.125]);
    }

    #[test]
    fn directional_growth_is_capped_by_the_side() {
        let mut partition = Partition::new();
        for i in 0..3 {
            partition.insert(i, i).unwrap();
        }
        partition.resize(1, 1.0, WeightDirection::TowardsStart).unwrap();
        assert_weights(&partition, &[0.0, 2.0 / 3.0, 1.0 / 3.0]);
    }

    #[test]
    fn resize_at_the_edge_falls_back_to_both() {
        let mut partition = Partition::new();
        for i in 0..3 {
            partition.insert(i, i).unwrap();
        }
        partition.resize(0, 0.5, WeightDirection::TowardsStart).unwrap();
        assert_weights(&partition, &[0.5, 0.25, 0.25]);
    }

    #[test]
    fn resize_rejects_weights_outside_the_unit_range() {
        let mut partition = Partition::new();
        partition.insert(0, ()).unwrap();
        for weight in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                partition.resize(0, weight, WeightDirection::Both),
                Err(TilingError::InvalidArgument(_))
            ));
        }
        partition.resize(0, 0.3, WeightDirection::Both).unwrap();
        assert_weights(&partition, &[1.0]);
    }

    #[test]
    fn replace_with_splits_the_weight() {
        let mut partition = Partition::new();
        partition.insert(0, "a").unwrap();
        partition.insert(1, "b").unwrap();
        assert_eq!(partition.replace_with(0, vec!["x", "y"]).unwrap(), "a");
        assert_weights(&partition, &[0.25, 0.25, 0.5]);
        assert_eq!(partition.values().copied().collect::<Vec<_>>(), ["x", "y", "b"]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(usize),
        Remove(usize),
        Resize(usize, f64, u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..10).prop_map(Op::Insert),
            (0usize..10).prop_map(Op::Remove),
            (0usize..10, 0.0..=1.0f64, 0u8..3).prop_map(|(i, w, d)| Op::Resize(i, w, d)),
        ]
    }

    proptest! {
        #[test]
        fn weights_always_sum_to_one(ops in prop::collection::vec(op(), 1..60)) {
            let mut partition = Partition::new();
            for (n, op) in ops.iter().enumerate() {
                let len = partition.len();
                match *op {
                    Op::Insert(i) => partition.insert(i % (len + 1), n).unwrap(),
                    Op::Remove(i) if len > 0 => {
                        partition.remove_at(i % len).unwrap();
                    }
                    Op::Remove(_) => {}
                    Op::Resize(i, w, d) if len > 0 => {
                        let direction = match d {
                            0 => WeightDirection::Both,
                            1 => WeightDirection::TowardsStart,
                            _ => WeightDirection::TowardsEnd,
                        };
                        partition.resize(i % len, w, direction).unwrap();
                    }
                    Op::Resize(..) => {}
                }
                if !partition.is_empty() {
                    let sum: f64 = weights(&partition).iter().sum();
                    prop_assert!(sum.approx_eq_within(1.0, WEIGHT_EPSILON), "{sum}");
                    let in_range = |w: &f64| (0.0..=1.0 + WEIGHT_EPSILON).contains(w);
                    prop_assert!(weights(&partition).iter().all(in_range));
                }
            }
        }
    }
}
