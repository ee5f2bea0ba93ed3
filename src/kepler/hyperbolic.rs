//! Hyperbolic inverse Kepler solver
//!
//! Segmented initial-guess scheme in the HKE–SDG mould
//! (Raposo-Pulido & Peláez 2018): a 51-knot table partitions the
//! (e, M) plane — the mean-anomaly boundaries M_i = e·sinh(H_i) − H_i
//! depend on the eccentricity, the H knots do not — and each of the 50
//! segments carries a closed-form initial-guess polynomial, here the
//! cubic inverse Taylor expansion of the residual at the segment's left
//! knot, solved by the cubic formula. The first segment's polynomial is
//! exactly the singular-corner series estimator that keeps the e → 1,
//! M → 0 corner stable. A short Newton run on M − e·sinh H + H finishes
//! the job; two to four iterations are typical.

use crate::angle::Angle;
use crate::polyroot::solve_cubic;
use crate::{AstrokitError, Result};

/// Number of segment-boundary knots
pub const SEGMENT_TABLE_SIZE: usize = 51;
/// Knot index where the spacing switches from linear to geometric
pub const SEGMENT_TABLE_BOUND: usize = 26;

/// Fixed knots in eccentric-anomaly space: linear steps of 0.26 up to
/// H = 6.5, then geometric growth out to H = 60. Beyond the last knot the
/// asymptotic logarithmic guess takes over.
fn knot(i: usize) -> f64 {
    if i < SEGMENT_TABLE_BOUND {
        0.26 * i as f64
    } else {
        6.5 * (60.0f64 / 6.5).powf((i - SEGMENT_TABLE_BOUND + 1) as f64 / 25.0)
    }
}

/// sinh(h) − h without the cancellation that poisons the residual near
/// the singular corner; series below 0.7, direct difference above.
fn sinh_minus_arg(h: f64) -> f64 {
    if h.abs() < 0.7 {
        let h2 = h * h;
        let mut term = h * h2 / 6.0;
        let mut sum = term;
        let mut k = 2.0;
        loop {
            term *= h2 / ((2.0 * k) * (2.0 * k + 1.0));
            sum += term;
            if term.abs() < 1e-18 * sum.abs() {
                return sum;
            }
            k += 1.0;
        }
    }
    h.sinh() - h
}

/// cosh(h) − 1 = 2·sinh²(h/2), exact to rounding at any scale
fn cosh_minus_one(h: f64) -> f64 {
    let s = (h / 2.0).sinh();
    2.0 * s * s
}

/// Hyperbolic inverse Kepler solver for one eccentricity
#[derive(Debug, Clone)]
pub struct HyperbolicKepler {
    e: f64,
    /// Segment boundaries in mean anomaly, ascending; entry i is
    /// e·sinh(H_i) − H_i
    segments: [f64; SEGMENT_TABLE_SIZE],
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub max_iters: usize,
}

impl HyperbolicKepler {
    pub fn new(eccentricity: f64) -> Result<Self> {
        if eccentricity <= 1.0 {
            return Err(AstrokitError::NumericDomain(format!(
                "hyperbolic solver needs e > 1, got {eccentricity}"
            )));
        }
        let mut segments = [0.0; SEGMENT_TABLE_SIZE];
        Self::fill_segments(eccentricity, &mut segments);
        Ok(HyperbolicKepler {
            e: eccentricity,
            segments,
            abs_tol: 2.2e-16,
            rel_tol: 2.2e-16,
            max_iters: 50,
        })
    }

    /// Mean-anomaly boundaries of the segment table for an eccentricity.
    pub fn fill_segments(eccentricity: f64, table: &mut [f64; SEGMENT_TABLE_SIZE]) {
        for (i, slot) in table.iter_mut().enumerate() {
            let h = knot(i);
            *slot = eccentricity * h.sinh() - h;
        }
    }

    /// Segment index whose [M_i, M_{i+1}) interval contains |M|.
    pub fn segment_index(&self, m_abs: f64) -> Result<usize> {
        if m_abs > self.segments[SEGMENT_TABLE_SIZE - 1] {
            return Err(AstrokitError::TableRange {
                value: m_abs,
                start: 0.0,
                end: self.segments[SEGMENT_TABLE_SIZE - 1],
            });
        }
        let idx = self.segments.partition_point(|&b| b <= m_abs);
        Ok(idx.saturating_sub(1).min(SEGMENT_TABLE_SIZE - 2))
    }

    /// Closed-form initial guess on a segment: the real root of the cubic
    /// Taylor expansion of e·sinh H − H − M at the segment's left knot.
    fn initial_guess(&self, seg: usize, m_abs: f64) -> f64 {
        let e = self.e;
        let ha = knot(seg);
        let f0 = e * ha.sinh() - ha - m_abs;
        let f1 = e * ha.cosh() - 1.0;
        let f2 = e * ha.sinh();
        let f3 = e * ha.cosh();
        let roots = solve_cubic(&[f3 / 6.0, f2 / 2.0, f1, f0], 12.0);
        let width = knot(seg + 1) - ha;
        // prefer the real root inside the segment; any positive real root
        // otherwise
        let mut best = f64::NAN;
        for z in &roots {
            if z.im != 0.0 {
                continue;
            }
            let d = z.re;
            if (0.0..=width * 1.5).contains(&d) {
                best = d;
                break;
            }
            if d >= 0.0 && best.is_nan() {
                best = d;
            }
        }
        if best.is_nan() {
            // cubic gave nothing usable; bisect the segment coarsely
            best = width / 2.0;
        }
        ha + best
    }

    /// Asymptotic guess past the table: M ≈ (e/2)·e^H for large H.
    fn asymptotic_guess(&self, m_abs: f64) -> f64 {
        let mut h = ((m_abs + 1.0) * 2.0 / self.e).ln().max(1.0);
        for _ in 0..3 {
            h = ((m_abs + h) * 2.0 / self.e).ln();
        }
        h
    }

    /// Solve M = e·sinh H − H for H, unit preserved.
    pub fn solve(&self, mean_anomaly: Angle) -> Result<Angle> {
        let m = mean_anomaly.radians();
        let sign = if m < 0.0 { -1.0 } else { 1.0 };
        let m_abs = m.abs();
        if m_abs == 0.0 {
            return Ok(Angle::from_radians(0.0).to_unit(mean_anomaly.unit()));
        }

        let mut h = match self.segment_index(m_abs) {
            Ok(seg) => self.initial_guess(seg, m_abs),
            Err(_) => self.asymptotic_guess(m_abs),
        };

        let mut converged = false;
        let mut iterations = 0;
        for _ in 0..self.max_iters {
            iterations += 1;
            // e·sinh H − H − M rearranged as (e−1)·sinh H + (sinh H − H) − M:
            // both leading terms are positive, so the residual keeps full
            // relative accuracy down into the singular corner
            let f = (self.e - 1.0) * h.sinh() + sinh_minus_arg(h) - m_abs;
            let df = (self.e - 1.0) * h.cosh() + cosh_minus_one(h);
            let step = f / df;
            h -= step;
            if step.abs() <= self.abs_tol + self.rel_tol * h.abs() {
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(AstrokitError::Convergence {
                iterations,
                residual: ((self.e - 1.0) * h.sinh() + sinh_minus_arg(h) - m_abs).abs(),
            });
        }
        Ok(Angle::from_radians(sign * h).to_unit(mean_anomaly.unit()))
    }

    pub fn eccentricity(&self) -> f64 {
        self.e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn residual(e: f64, m: f64, h: f64) -> f64 {
        (e * h.sinh() - h - m).abs()
    }

    #[test]
    fn test_round_trip_moderate() {
        for &e in &[1.01, 1.1, 1.5, 3.0, 10.0] {
            let solver = HyperbolicKepler::new(e).unwrap();
            for &m in &[1e-6, 0.01, 0.5, 2.0, 10.0, 100.0] {
                let h = solver.solve(Angle::from_radians(m)).unwrap().radians();
                let r = residual(e, m, h);
                assert!(
                    r < 1e-11 * m.max(1.0),
                    "e={e}, M={m}: residual {r}"
                );
            }
        }
    }

    #[test]
    fn test_singular_corner() {
        // e barely above 1, tiny M: the corner the segmented guess exists for
        let solver = HyperbolicKepler::new(1.000001).unwrap();
        for &m in &[1e-10, 1e-6, 1e-3] {
            let h = solver.solve(Angle::from_radians(m)).unwrap().radians();
            assert!(residual(1.000001, m, h) < 1e-13, "M={m}");
        }
    }

    #[test]
    fn test_odd_symmetry() {
        let solver = HyperbolicKepler::new(2.0).unwrap();
        let plus = solver.solve(Angle::from_radians(3.0)).unwrap().radians();
        let minus = solver.solve(Angle::from_radians(-3.0)).unwrap().radians();
        assert_relative_eq!(plus, -minus, epsilon = 1e-14);
    }

    #[test]
    fn test_beyond_table_asymptotic() {
        let solver = HyperbolicKepler::new(1.5).unwrap();
        // far beyond the last knot boundary (~e^60)
        let m = 1e30;
        assert!(solver.segment_index(m).is_err());
        let h = solver.solve(Angle::from_radians(m)).unwrap().radians();
        assert!(residual(1.5, m, h) / m < 1e-12);
    }

    #[test]
    fn test_segment_index_range_error() {
        let solver = HyperbolicKepler::new(1.5).unwrap();
        let top = solver.segments[SEGMENT_TABLE_SIZE - 1];
        assert!(solver.segment_index(top * 2.0).is_err());
        assert_eq!(solver.segment_index(0.0).unwrap(), 0);
    }

    #[test]
    fn test_few_newton_iterations_needed() {
        // the segmented guess should put Newton within a handful of steps;
        // verify indirectly through a tight iteration cap
        let mut solver = HyperbolicKepler::new(2.5).unwrap();
        solver.max_iters = 6;
        for &m in &[0.1, 1.0, 5.0, 50.0] {
            assert!(solver.solve(Angle::from_radians(m)).is_ok(), "M={m}");
        }
    }

    #[test]
    fn test_rejects_elliptic_eccentricity() {
        assert!(HyperbolicKepler::new(0.5).is_err());
        assert!(HyperbolicKepler::new(1.0).is_err());
    }

    #[test]
    fn test_unit_preserved() {
        let solver = HyperbolicKepler::new(2.0).unwrap();
        let out = solver.solve(Angle::from_degrees(90.0)).unwrap();
        assert_eq!(out.unit(), Angle::from_degrees(0.0).unit());
    }

    #[test]
    fn test_forward_inverse_consistency_with_kepler_hyperbolic() {
        use crate::kepler::kepler_hyperbolic;
        let e = 1.3;
        let solver = HyperbolicKepler::new(e).unwrap();
        let h_in = Angle::from_radians(2.4);
        let m = kepler_hyperbolic(e, h_in);
        let h_out = solver.solve(m).unwrap();
        assert_relative_eq!(h_out.radians(), 2.4, epsilon = 1e-12);
    }
}
