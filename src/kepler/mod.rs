//! Kepler's equation and its inverse
//!
//! Forward direction, all three conic regimes, with the angle unit of the
//! input preserved on output:
//!
//! - elliptic:   M = E − e·sin E
//! - parabolic:  M = E/2 + E³/6
//! - hyperbolic: M = e·sinh H − H
//!
//! The inverse (the transcendental part) lives behind the
//! [`InverseKepler`] trait. Elliptic solvers: [`NewtonKepler`] (Markley
//! start + Newton polish, the default), [`MarkleyKepler`] (one cubic
//! correction, no loop) and [`QuinticKepler`] (a per-eccentricity
//! piecewise-quintic table, no loop). All of them hand the near-parabolic
//! corner (e > 0.99, |M| < 0.0045) to plain bisection over [0, π], where
//! the vanishing derivative would otherwise poison the fast paths.
//!
//! The parabolic inverse is a single real cubic root; the hyperbolic
//! inverse ([`HyperbolicKepler`]) uses a segmented initial-guess table
//! and a short Newton run.

mod hyperbolic;
mod quintic;

pub use hyperbolic::HyperbolicKepler;
pub use quintic::QuinticKepler;

use std::f64::consts::PI;

use crate::angle::Angle;
use crate::polyroot::solve_cubic;
use crate::{AstrokitError, Result};

/// Eccentricity above which the near-parabolic guard can trigger
pub(crate) const E_BOUNDARY: f64 = 0.99;
/// Mean-anomaly magnitude (radians) below which the guard triggers
pub(crate) const M_BOUNDARY: f64 = 0.0045;

/// Elliptic Kepler equation M = E − e·sin E.
pub fn kepler_elliptic(eccentricity: f64, eccentric_anomaly: Angle) -> Angle {
    let e_rad = eccentric_anomaly.radians();
    let m = e_rad - eccentricity * e_rad.sin();
    Angle::from_radians(m).to_unit(eccentric_anomaly.unit())
}

/// Parabolic (Barker) equation M = E/2 + E³/6.
pub fn kepler_parabolic(eccentric_anomaly: Angle) -> Angle {
    let e_rad = eccentric_anomaly.radians();
    let m = 0.5 * e_rad + e_rad.powi(3) / 6.0;
    Angle::from_radians(m).to_unit(eccentric_anomaly.unit())
}

/// Hyperbolic Kepler equation M = e·sinh H − H.
pub fn kepler_hyperbolic(eccentricity: f64, eccentric_anomaly: Angle) -> Angle {
    let h = eccentric_anomaly.radians();
    let m = eccentricity * h.sinh() - h;
    Angle::from_radians(m).to_unit(eccentric_anomaly.unit())
}

/// An inverse-Kepler solver for one conic regime and one eccentricity
pub trait InverseKepler {
    /// The eccentricity this solver was built for
    fn eccentricity(&self) -> f64;

    /// Eccentric anomaly for the given mean anomaly, unit preserved.
    fn solve(&self, mean_anomaly: Angle) -> Result<Angle>;
}

/// Split M (radians) into a symmetric principal part in [−π, π] and the
/// whole number of turns to restore afterwards.
pub(crate) fn principal_anomaly(m: f64) -> (f64, f64) {
    let turns = (m / (2.0 * PI)).round();
    (m - turns * 2.0 * PI, turns)
}

/// Bisection over [0, π] for the near-parabolic corner.
pub(crate) fn elliptic_bisection(e: f64, m_abs: f64) -> f64 {
    let mut lo = 0.0_f64;
    let mut hi = PI;
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if mid - e * mid.sin() < m_abs {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= f64::EPSILON * hi.max(1.0) {
            break;
        }
    }
    0.5 * (lo + hi)
}

/// Markley's third-order starter for E(M; e), M in [0, π].
fn markley_start(e: f64, m: f64) -> f64 {
    let alpha = (3.0 * PI * PI + 1.6 * PI * (PI - m) / (1.0 + e)) / (PI * PI - 6.0);
    let d = 3.0 * (1.0 - e) + alpha * e;
    let q = 2.0 * alpha * d * (1.0 - e) - m * m;
    let r = 3.0 * alpha * d * (d - 1.0 + e) * m + m * m * m;
    let w = (r.abs() + (q * q * q + r * r).sqrt()).powf(2.0 / 3.0);
    (2.0 * r * w / (w * w + w * q + q * q) + m) / d
}

/// One high-order correction of the Markley estimate.
fn markley_refine(e: f64, m: f64, e1: f64) -> f64 {
    let f0 = e1 - e * e1.sin() - m;
    let f1 = 1.0 - e * e1.cos();
    let f2 = e * e1.sin();
    let f3 = e * e1.cos();
    let d3 = -f0 / (f1 - 0.5 * f0 * f2 / f1);
    let d4 = -f0 / (f1 + 0.5 * d3 * f2 + d3 * d3 * f3 / 6.0);
    let d5 = -f0 / (f1 + 0.5 * d4 * f2 + d4 * d4 * f3 / 6.0 - d4 * d4 * d4 * f2 / 24.0);
    e1 + d5
}

pub(crate) fn check_elliptic_eccentricity(e: f64) -> Result<()> {
    if !(0.0..1.0).contains(&e) {
        return Err(AstrokitError::NumericDomain(format!(
            "elliptic solver needs 0 <= e < 1, got {e}"
        )));
    }
    Ok(())
}

/// Solve the symmetric core problem on [0, π] and re-assemble the full
/// answer with the sign and whole turns of the input.
pub(crate) fn solve_symmetric<S: Fn(f64) -> f64>(m: Angle, core: S) -> Angle {
    let (mp, turns) = principal_anomaly(m.radians());
    let sign = if mp < 0.0 { -1.0 } else { 1.0 };
    let e_rad = sign * core(mp.abs()) + turns * 2.0 * PI;
    Angle::from_radians(e_rad).to_unit(m.unit())
}

/// Newton iteration from the Markley starter — the default elliptic solver
#[derive(Debug, Clone)]
pub struct NewtonKepler {
    e: f64,
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub max_iters: usize,
}

impl NewtonKepler {
    pub fn new(eccentricity: f64) -> Self {
        NewtonKepler {
            e: eccentricity,
            abs_tol: 3e-15,
            rel_tol: 2.2e-16,
            max_iters: 50,
        }
    }
}

impl InverseKepler for NewtonKepler {
    fn eccentricity(&self) -> f64 {
        self.e
    }

    fn solve(&self, mean_anomaly: Angle) -> Result<Angle> {
        check_elliptic_eccentricity(self.e)?;
        let e = self.e;
        Ok(solve_symmetric(mean_anomaly, |m| {
            if e > E_BOUNDARY && m < M_BOUNDARY {
                return elliptic_bisection(e, m);
            }
            let mut x = markley_start(e, m);
            for _ in 0..self.max_iters {
                let step = (x - e * x.sin() - m) / (1.0 - e * x.cos());
                x -= step;
                if step.abs() <= self.abs_tol + self.rel_tol * x.abs() {
                    break;
                }
            }
            x
        }))
    }
}

/// Markley's non-iterative solver: rational starter plus one correction
#[derive(Debug, Clone)]
pub struct MarkleyKepler {
    e: f64,
}

impl MarkleyKepler {
    pub fn new(eccentricity: f64) -> Self {
        MarkleyKepler { e: eccentricity }
    }
}

impl InverseKepler for MarkleyKepler {
    fn eccentricity(&self) -> f64 {
        self.e
    }

    fn solve(&self, mean_anomaly: Angle) -> Result<Angle> {
        check_elliptic_eccentricity(self.e)?;
        let e = self.e;
        Ok(solve_symmetric(mean_anomaly, |m| {
            if e > E_BOUNDARY && m < M_BOUNDARY {
                return elliptic_bisection(e, m);
            }
            markley_refine(e, m, markley_start(e, m))
        }))
    }
}

/// Parabolic inverse: the unique real root of E³/6 + E/2 − M = 0.
pub fn inverse_kepler_parabolic(mean_anomaly: Angle) -> Result<Angle> {
    let m = mean_anomaly.radians();
    let roots = solve_cubic(&[1.0 / 6.0, 0.0, 0.5, -m], 10.0);
    let real = roots
        .iter()
        .find(|z| z.im == 0.0)
        .ok_or_else(|| AstrokitError::NumericDomain("parabolic cubic lost its real root".into()))?;
    Ok(Angle::from_radians(real.re).to_unit(mean_anomaly.unit()))
}
