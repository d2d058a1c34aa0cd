//! Tolerant comparisons for allocator-derived extents and weights.
//!
//! Widths and weights are produced by repeated scaling, so two values that are
//! "the same" rarely compare equal bit for bit. Every decision the allocators
//! and the tiling tree make about extents goes through this module instead of
//! `==`/`<` on raw floats.

/// Tolerance for extents normalized to a container (fractions of 1).
pub const EPSILON: f64 = 1e-7;

/// Tolerance for partition weight sums.
pub const WEIGHT_EPSILON: f64 = 1e-5;

pub trait Approx: Copy {
    fn approx_eq_within(self, other: Self, epsilon: f64) -> bool;

    fn approx_eq(self, other: Self) -> bool { self.approx_eq_within(other, EPSILON) }

    fn approx_zero(self) -> bool;

    /// `self < other` by more than the tolerance.
    fn definitely_lt(self, other: Self) -> bool;

    /// `self > other` by more than the tolerance.
    fn definitely_gt(self, other: Self) -> bool;

    fn approx_le(self, other: Self) -> bool { !self.definitely_gt(other) }

    fn approx_ge(self, other: Self) -> bool { !self.definitely_lt(other) }

    /// Clamps into `[lo, hi]`. Unlike `f64::clamp` it accepts `lo > hi` as long
    /// as the inversion is within tolerance, which happens after rescaling.
    fn clamp_to(self, lo: Self, hi: Self) -> Self;
}

impl Approx for f64 {
    fn approx_eq_within(self, other: f64, epsilon: f64) -> bool {
        if self == other {
            return true;
        }
        let scale = self.abs().max(other.abs()).max(1.0);
        (self - other).abs() <= epsilon * scale
    }

    fn approx_zero(self) -> bool { self.abs() <= EPSILON }

    fn definitely_lt(self, other: f64) -> bool { self < other && !self.approx_eq(other) }

    fn definitely_gt(self, other: f64) -> bool { self > other && !self.approx_eq(other) }

    fn clamp_to(self, lo: f64, hi: f64) -> f64 {
        if hi < lo {
            debug_assert!(lo.approx_eq(hi), "inverted bounds [{lo}, {hi}]");
            return lo;
        }
        self.clamp(lo, hi)
    }
}

/// Divides, treating a (near) zero denominator as "no share".
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator.approx_zero() { 0.0 } else { numerator / denominator }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparisons_absorb_rounding_noise() {
        let third = 1.0_f64 / 3.0;
        assert!((third * 3.0).approx_eq(1.0));
        assert!((0.1_f64 + 0.2).approx_eq(0.3));
        assert!(!(0.1_f64 + 0.2).definitely_gt(0.3));
        assert!(1.0_f64.definitely_lt(1.001));
        assert!(1.0_f64.approx_le(1.0 + 1e-12));
        assert!((1.0_f64 + 1e-12).approx_le(1.0));
    }

    #[test]
    fn tolerance_scales_with_magnitude() {
        assert!(2000.0_f64.approx_eq(2000.0 + 1e-5));
        assert!(!2000.0_f64.approx_eq(2000.1));
        assert!(1e-9_f64.approx_zero());
        assert!(!1e-3_f64.approx_zero());
    }

    #[test]
    fn clamp_to_tolerates_slightly_inverted_bounds() {
        assert_eq!(5.0_f64.clamp_to(1.0, 3.0), 3.0);
        assert_eq!(0.5_f64.clamp_to(1.0, 1.0 - 1e-12), 1.0);
    }

    #[test]
    fn ratio_or_zero_guards_empty_denominators() {
        assert_eq!(ratio_or_zero(1.0, 0.0), 0.0);
        assert_eq!(ratio_or_zero(1.0, 4.0), 0.25);
    }
}
