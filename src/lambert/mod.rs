//! Lambert problem solver
//!
//! Given two position vectors and a time of flight around a primary,
//! produce the velocity pair at departure and arrival — the boundary
//! value problem behind transfer design, rendezvous and porkchop plots.
//!
//! The formulation follows Izzo (2015, "Revisiting Lambert's problem"):
//! the geometry collapses into λ = ±√(1 − c/s) and the nondimensional
//! time T = tof·√(2μ/s³); each solution is a root in the Lancaster x
//! variable found by a third-order Householder iteration. The residual is
//! assembled by three expressions depending on where x sits: Battin's
//! hypergeometric series near x ≈ 1, the Lagrange α/β form deep in the
//! elliptic range, and Lancaster's ψ form everywhere else. Zero and
//! multi-revolution transfers are supported; each revolution count above
//! zero contributes a left and a right branch, giving up to 2N+1
//! solutions.
//!
//! ```
//! use astrokit::lambert::{LambertSolver, TransferDirection};
//! use nalgebra::Vector3;
//!
//! let solver = LambertSolver::default();
//! let sols = solver
//!     .solve(
//!         Vector3::new(1.5e11, 0.0, 0.0),
//!         Vector3::new(0.0, 1.5e11, 0.0),
//!         90.0 * 86400.0,
//!         1.327e20,
//!         TransferDirection::Prograde,
//!     )
//!     .unwrap();
//! assert!(!sols.is_empty());
//! ```

use std::f64::consts::PI;

use nalgebra::{Matrix3, Vector3};

use crate::orbit::{state_vectors_to_elements, KeplerianOrbitElems, OrbitStateVectors};
use crate::{AstrokitError, Result};

/// Orbital sense of the transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Counter-clockwise seen from +Z (0)
    Prograde,
    /// Clockwise seen from +Z (1)
    Retrograde,
}

/// One Lambert solution: the velocity pair and its orbit
#[derive(Debug, Clone)]
pub struct LambertSolution {
    /// Velocity at departure (m/s)
    pub v1: Vector3<f64>,
    /// Velocity at arrival (m/s)
    pub v2: Vector3<f64>,
    /// Complete revolutions of the transfer
    pub revolutions: usize,
    /// For multi-revolution pairs, which branch of the T(x) curve
    pub left_branch: bool,
    /// Keplerian elements of the transfer orbit, from (r1, v1)
    pub elements: KeplerianOrbitElems,
}

/// Izzo-style Lambert solver
#[derive(Debug, Clone)]
pub struct LambertSolver {
    /// Cap on complete revolutions to search
    pub max_revolutions: usize,
    /// Root tolerance on the x iterate
    pub tolerance: f64,
    pub max_iters: usize,
}

impl Default for LambertSolver {
    fn default() -> Self {
        LambertSolver {
            max_revolutions: 5,
            tolerance: 1e-8,
            max_iters: 35,
        }
    }
}

/// Gauss hypergeometric series 2F1(3, 1; 5/2; x), |x| < 1
fn hyp2f1b(x: f64) -> f64 {
    let mut res = 1.0;
    let mut term = 1.0;
    let mut i = 0.0;
    loop {
        term *= (3.0 + i) * (1.0 + i) / (2.5 + i) * x / (1.0 + i);
        res += term;
        if term.abs() < 1e-12 * res.abs() {
            return res;
        }
        i += 1.0;
        if i > 500.0 {
            return res;
        }
    }
}

/// ψ auxiliary angle of the Lancaster form
fn compute_psi(x: f64, y: f64, ll: f64) -> f64 {
    if (-1.0..1.0).contains(&x) {
        // elliptic
        (x * y + ll * (1.0 - x * x)).clamp(-1.0, 1.0).acos()
    } else if x > 1.0 {
        // hyperbolic
        ((y - x * ll) * (x * x - 1.0).sqrt()).asinh()
    } else {
        0.0
    }
}

/// Nondimensional time of flight at x
fn tof_at(x: f64, ll: f64, m: usize) -> f64 {
    let y = (1.0 - ll * ll * (1.0 - x * x)).sqrt();
    let battin_window = x > 0.6f64.sqrt() && x < 1.4f64.sqrt();
    if m == 0 && battin_window {
        // Battin's series, stable through x = 1
        let eta = y - ll * x;
        let s1 = (1.0 - ll - x * eta) * 0.5;
        let q = 4.0 / 3.0 * hyp2f1b(s1);
        (eta.powi(3) * q + 4.0 * ll * eta) * 0.5
    } else if x < 0.5 && x > -1.0 {
        // Lagrange α/β form, well conditioned deep in the ellipse
        let a_inv = 1.0 - x * x;
        let alpha = 2.0 * x.acos();
        let beta = 2.0 * (ll * ll * a_inv).sqrt().asin() * ll.signum();
        0.5 * a_inv.powf(-1.5)
            * ((alpha - alpha.sin()) - (beta - beta.sin()) + 2.0 * PI * m as f64)
    } else {
        // Lancaster's closed form
        let psi = compute_psi(x, y, ll);
        ((psi + m as f64 * PI) / (1.0 - x * x).abs().sqrt() - x + ll * y) / (1.0 - x * x)
    }
}

/// First three derivatives of T with respect to x
fn tof_derivatives(x: f64, t: f64, ll: f64) -> (f64, f64, f64) {
    let y = (1.0 - ll * ll * (1.0 - x * x)).sqrt();
    let one_m_x2 = 1.0 - x * x;
    let dt = (3.0 * t * x - 2.0 + 2.0 * ll.powi(3) * x / y) / one_m_x2;
    let ddt = (3.0 * t + 5.0 * x * dt + 2.0 * (1.0 - ll * ll) * ll.powi(3) / y.powi(3)) / one_m_x2;
    let dddt =
        (7.0 * x * ddt + 8.0 * dt - 6.0 * (1.0 - ll * ll) * ll.powi(5) * x / y.powi(5)) / one_m_x2;
    (dt, ddt, dddt)
}

/// Third-order Householder iteration on the time equation
fn householder_root(
    mut x: f64,
    t_target: f64,
    ll: f64,
    m: usize,
    tol: f64,
    max_iters: usize,
) -> Result<f64> {
    for _ in 0..max_iters {
        let t = tof_at(x, ll, m);
        let fval = t - t_target;
        let (dt, ddt, dddt) = tof_derivatives(x, t, ll);
        let num = fval * (dt * dt - fval * ddt / 2.0);
        let den = dt * (dt * dt - fval * ddt) + dddt * fval * fval / 6.0;
        let x_new = x - num / den;
        let delta = (x_new - x).abs();
        x = x_new;
        if delta < tol {
            return Ok(x);
        }
    }
    Err(AstrokitError::Convergence {
        iterations: max_iters,
        residual: (tof_at(x, ll, m) - t_target).abs(),
    })
}

/// Initial x for the single-revolution case (Lancaster–Gooding blend)
fn initial_guess_single(t: f64, ll: f64) -> f64 {
    let t0 = ll.clamp(-1.0, 1.0).acos() + ll * (1.0 - ll * ll).sqrt();
    let t1 = 2.0 * (1.0 - ll.powi(3)) / 3.0;
    if t >= t0 {
        (t0 / t).powf(2.0 / 3.0) - 1.0
    } else if t < t1 {
        2.5 * t1 * (t1 - t) / (t * (1.0 - ll.powi(5))) + 1.0
    } else {
        ((2.0f64).ln() * (t / t0).ln() / (t1 / t0).ln()).exp() - 1.0
    }
}

/// Initial x pair (left, right) for an M-revolution transfer
fn initial_guess_multi(t: f64, m: usize) -> (f64, f64) {
    let mf = m as f64;
    let left_base = ((mf * PI + PI) / (8.0 * t)).powf(2.0 / 3.0);
    let right_base = ((8.0 * t) / (mf * PI)).powf(2.0 / 3.0);
    (
        (left_base - 1.0) / (left_base + 1.0),
        (right_base - 1.0) / (right_base + 1.0),
    )
}

/// Minimum nondimensional time for an M-revolution transfer, by bisecting
/// dT/dx to the stationary point (12 halvings) and polishing with Halley.
fn compute_t_min(ll: f64, m: usize) -> f64 {
    let mut lo = -1.0 + 1e-9;
    let mut hi = 1.0 - 1e-9;
    let dt_at = |x: f64| {
        let t = tof_at(x, ll, m);
        tof_derivatives(x, t, ll).0
    };
    for _ in 0..12 {
        let mid = 0.5 * (lo + hi);
        if dt_at(mid) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let mut x = 0.5 * (lo + hi);
    for _ in 0..3 {
        let t = tof_at(x, ll, m);
        let (dt, ddt, dddt) = tof_derivatives(x, t, ll);
        let denom = 2.0 * ddt * ddt - dt * dddt;
        if denom == 0.0 {
            break;
        }
        x -= 2.0 * dt * ddt / denom;
    }
    tof_at(x, ll, m)
}

impl LambertSolver {
    /// Solve the boundary value problem r1 → r2 in `tof` seconds.
    ///
    /// Returns the zero-revolution solution followed by the left/right
    /// pair for each feasible revolution count up to `max_revolutions`.
    pub fn solve(
        &self,
        r1: Vector3<f64>,
        r2: Vector3<f64>,
        tof: f64,
        mu: f64,
        direction: TransferDirection,
    ) -> Result<Vec<LambertSolution>> {
        if mu <= 0.0 {
            return Err(AstrokitError::NumericDomain(format!(
                "gravitational parameter must be positive, got {mu}"
            )));
        }
        if tof <= 0.0 {
            return Err(AstrokitError::NumericDomain(format!(
                "time of flight must be positive, got {tof}"
            )));
        }
        let chord = r2 - r1;
        let c = chord.norm();
        let r1n = r1.norm();
        let r2n = r2.norm();
        if r1n == 0.0 || r2n == 0.0 {
            return Err(AstrokitError::NumericDomain(
                "position vector at the primary".into(),
            ));
        }
        let s = (r1n + r2n + c) / 2.0;

        let i_r1 = r1 / r1n;
        let i_r2 = r2 / r2n;
        let mut i_h = i_r1.cross(&i_r2);
        let h_norm = i_h.norm();
        if h_norm < 1e-14 {
            return Err(AstrokitError::NumericDomain(
                "departure and arrival positions are collinear; the transfer plane is undefined"
                    .into(),
            ));
        }
        i_h /= h_norm;

        let mut ll = (1.0 - (c / s).min(1.0)).sqrt();
        if i_h.z < 0.0 {
            // transfer angle beyond π: flip the plane normal
            ll = -ll;
            i_h = -i_h;
        }
        let (ll, i_t1, i_t2) = match direction {
            TransferDirection::Prograde => (ll, i_h.cross(&i_r1), i_h.cross(&i_r2)),
            TransferDirection::Retrograde => (-ll, i_r1.cross(&i_h), i_r2.cross(&i_h)),
        };

        let t = tof * (2.0 * mu / s.powi(3)).sqrt();

        // feasible revolution count
        let mut m_max = (t / PI).floor() as usize;
        let t_00 = ll.clamp(-1.0, 1.0).acos() + ll * (1.0 - ll * ll).sqrt();
        if m_max > 0 && t < t_00 + m_max as f64 * PI {
            if t < compute_t_min(ll, m_max) {
                m_max -= 1;
            }
        }
        let m_eff = m_max.min(self.max_revolutions);

        let mut solutions = Vec::with_capacity(2 * m_eff + 1);
        let x0 = initial_guess_single(t, ll);
        let x = householder_root(x0, t, ll, 0, self.tolerance, self.max_iters)?;
        solutions.push(self.reconstruct(
            x, ll, 0, false, mu, s, c, r1n, r2n, i_r1, i_r2, i_t1, i_t2, r1,
        )?);

        for m in 1..=m_eff {
            let (x0l, x0r) = initial_guess_multi(t, m);
            for (x0, left) in [(x0l, true), (x0r, false)] {
                let x = householder_root(x0, t, ll, m, self.tolerance, self.max_iters)?;
                solutions.push(self.reconstruct(
                    x, ll, m, left, mu, s, c, r1n, r2n, i_r1, i_r2, i_t1, i_t2, r1,
                )?);
            }
        }
        Ok(solutions)
    }

    /// Terminal velocities and transfer orbit from a converged x.
    #[allow(clippy::too_many_arguments)]
    fn reconstruct(
        &self,
        x: f64,
        ll: f64,
        revolutions: usize,
        left_branch: bool,
        mu: f64,
        s: f64,
        c: f64,
        r1n: f64,
        r2n: f64,
        i_r1: Vector3<f64>,
        i_r2: Vector3<f64>,
        i_t1: Vector3<f64>,
        i_t2: Vector3<f64>,
        r1: Vector3<f64>,
    ) -> Result<LambertSolution> {
        let y = (1.0 - ll * ll * (1.0 - x * x)).sqrt();
        let gamma = (mu * s / 2.0).sqrt();
        let rho = (r1n - r2n) / c;
        let sigma = (1.0 - rho * rho).sqrt();

        let vr1 = gamma * ((ll * y - x) - rho * (ll * y + x)) / r1n;
        let vr2 = -gamma * ((ll * y - x) + rho * (ll * y + x)) / r2n;
        let vt1 = gamma * sigma * (y + ll * x) / r1n;
        let vt2 = gamma * sigma * (y + ll * x) / r2n;

        let v1 = vr1 * i_r1 + vt1 * i_t1;
        let v2 = vr2 * i_r2 + vt2 * i_t2;

        let elements = state_vectors_to_elements(
            &OrbitStateVectors {
                ref_plane: None,
                grav_param: mu,
                time: f64::NAN,
                position: r1,
                velocity: v1,
            },
            Some(Matrix3::identity()),
        )?;

        Ok(LambertSolution {
            v1,
            v2,
            revolutions,
            left_branch,
            elements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DAY_S, GM_SUN};
    use approx::assert_relative_eq;

    fn quarter_turn() -> (Vector3<f64>, Vector3<f64>, f64, f64) {
        (
            Vector3::new(1.5e11, 0.0, 0.0),
            Vector3::new(0.0, 1.5e11, 0.0),
            90.0 * DAY_S,
            1.327e20,
        )
    }

    #[test]
    fn test_zero_revolution_angular_momentum_consistency() {
        let (r1, r2, tof, mu) = quarter_turn();
        let sols = LambertSolver::default()
            .solve(r1, r2, tof, mu, TransferDirection::Prograde)
            .unwrap();
        let sol = &sols[0];
        let h1 = r1.cross(&sol.v1);
        let h2 = r2.cross(&sol.v2);
        // same orbit: the specific angular momentum must match vectorially
        assert!((h1 - h2).norm() < 1e-9 * h1.norm());
        // prograde: positive z component
        assert!(h1.z > 0.0);
    }

    #[test]
    fn test_zero_revolution_energy_consistency() {
        let (r1, r2, tof, mu) = quarter_turn();
        let sols = LambertSolver::default()
            .solve(r1, r2, tof, mu, TransferDirection::Prograde)
            .unwrap();
        let sol = &sols[0];
        let e1 = sol.v1.norm_squared() / 2.0 - mu / r1.norm();
        let e2 = sol.v2.norm_squared() / 2.0 - mu / r2.norm();
        assert_relative_eq!(e1, e2, max_relative = 1e-10);
    }

    #[test]
    fn test_transfer_time_recovered_by_propagation() {
        use crate::orbit::KeplerianSatelliteTracker;
        let (r1, r2, tof, mu) = quarter_turn();
        let sols = LambertSolver::default()
            .solve(r1, r2, tof, mu, TransferDirection::Prograde)
            .unwrap();
        let sol = &sols[0];
        let mut tracker = KeplerianSatelliteTracker::new(KeplerianOrbitElems {
            epoch: 0.0,
            ..sol.elements.clone()
        })
        .unwrap();
        tracker.add_seconds(tof as i64);
        let arrived = tracker.state_vectors(Some(Matrix3::identity())).unwrap();
        let miss = (arrived.position - r2).norm();
        assert!(
            miss < 1e-3 * r2.norm(),
            "propagated arrival misses r2 by {miss} m"
        );
    }

    #[test]
    fn test_retrograde_flips_plane() {
        let (r1, r2, tof, mu) = quarter_turn();
        let sols = LambertSolver::default()
            .solve(r1, r2, tof, mu, TransferDirection::Retrograde)
            .unwrap();
        let h = r1.cross(&sols[0].v1);
        assert!(h.z < 0.0);
    }

    #[test]
    fn test_multi_revolution_count() {
        let (r1, r2, _tof, mu) = quarter_turn();
        // a long transfer time admits several revolutions
        let tof = 3.0 * 365.25 * DAY_S;
        let sols = LambertSolver::default()
            .solve(r1, r2, tof, mu, TransferDirection::Prograde)
            .unwrap();
        assert!(sols.len() >= 3, "got {} solutions", sols.len());
        assert_eq!(sols.len() % 2, 1);
        // every solution still satisfies the energy consistency
        for sol in &sols {
            let e1 = sol.v1.norm_squared() / 2.0 - mu / r1.norm();
            let e2 = sol.v2.norm_squared() / 2.0 - mu / r2.norm();
            assert_relative_eq!(e1, e2, max_relative = 1e-8);
        }
        // left and right branches alternate after the zero-rev solution
        assert!(sols[1].left_branch && !sols[2].left_branch);
    }

    #[test]
    fn test_max_revolutions_cap() {
        let (r1, r2, _tof, mu) = quarter_turn();
        let tof = 3.0 * 365.25 * DAY_S;
        let solver = LambertSolver {
            max_revolutions: 1,
            ..LambertSolver::default()
        };
        let sols = solver
            .solve(r1, r2, tof, mu, TransferDirection::Prograde)
            .unwrap();
        assert!(sols.len() <= 3);
    }

    #[test]
    fn test_collinear_positions_rejected() {
        let r1 = Vector3::new(1.5e11, 0.0, 0.0);
        let r2 = Vector3::new(3.0e11, 0.0, 0.0);
        let res = LambertSolver::default().solve(r1, r2, 90.0 * DAY_S, GM_SUN, TransferDirection::Prograde);
        assert!(res.is_err());
    }

    #[test]
    fn test_rejects_nonpositive_inputs() {
        let (r1, r2, tof, mu) = quarter_turn();
        assert!(LambertSolver::default()
            .solve(r1, r2, -tof, mu, TransferDirection::Prograde)
            .is_err());
        assert!(LambertSolver::default()
            .solve(r1, r2, tof, -mu, TransferDirection::Prograde)
            .is_err());
    }

    #[test]
    fn test_elements_attached_to_solution() {
        let (r1, r2, tof, mu) = quarter_turn();
        let sols = LambertSolver::default()
            .solve(r1, r2, tof, mu, TransferDirection::Prograde)
            .unwrap();
        let elems = &sols[0].elements;
        assert!(elems.eccentricity >= 0.0);
        assert!(elems.pericenter_dist > 0.0);
        assert_eq!(elems.grav_param, mu);
    }

    #[test]
    fn test_short_fast_transfer_is_hyperbolic() {
        let (r1, r2, _tof, mu) = quarter_turn();
        let sols = LambertSolver::default()
            .solve(r1, r2, 10.0 * DAY_S, mu, TransferDirection::Prograde)
            .unwrap();
        assert!(
            sols[0].elements.eccentricity > 1.0,
            "10-day quarter turn at 1 AU should be hyperbolic, e = {}",
            sols[0].elements.eccentricity
        );
    }
}
