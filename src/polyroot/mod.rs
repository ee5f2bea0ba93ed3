//! Polynomial root finding
//!
//! Degrees 1–4 use closed forms: the linear and quadratic formulas, Fan
//! Shengjin's discriminant chain for cubics, and a Shen-style quartic
//! reduction that factors the depressed quartic into two quadratics
//! through a real resolvent root, so no complex square root is ever
//! taken. Degree 5 and above fall to Durand–Kerner simultaneous
//! iteration, with three seeding strategies and automatic seed retry when
//! a strategy fails to converge.
//!
//! All solvers take descending-order coefficients and return roots as
//! [`Complex64`]; the closed-form branches order real roots first.

use num_complex::Complex64;

use crate::specfun::Polynomial;
use crate::{AstrokitError, Result};

/// Seeding strategy for the Durand–Kerner iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seeding {
    /// Powers of 0.4 + 0.9i — the classical textbook seed
    Exponential,
    /// Equally spaced on the circle given by Cauchy's root bound
    Circular,
    /// Roots of zⁿ = −aₙ/a₀ deformed toward the target polynomial
    Homotopy,
}

/// Durand–Kerner simultaneous root iteration for degree ≥ 1
///
/// Updates all estimates at once by
/// zᵢ ← zᵢ − p(zᵢ)/Π_{j≠i}(zᵢ − zⱼ) until the largest update is below
/// `atol + rtol·max|zᵢ|` or the iteration cap is hit.
#[derive(Debug, Clone)]
pub struct DurandKerner {
    pub seeding: Seeding,
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub max_iters: usize,
    /// Homotopy deformation parameter in (0, 1]
    pub homotopy_step: f64,
}

impl Default for DurandKerner {
    fn default() -> Self {
        DurandKerner {
            seeding: Seeding::Exponential,
            abs_tol: 1e-14,
            rel_tol: 1e-14,
            max_iters: 1000,
            homotopy_step: 0.5,
        }
    }
}

impl DurandKerner {
    /// Initial estimates for a monic-normalised coefficient set
    fn seeds(&self, coeffs: &[f64]) -> Vec<Complex64> {
        let n = coeffs.len() - 1;
        match self.seeding {
            Seeding::Exponential => {
                let base = Complex64::new(0.4, 0.9);
                (0..n).map(|i| base.powu(i as u32 + 1)).collect()
            }
            Seeding::Circular => {
                // Cauchy's bound: all roots lie inside 1 + max|a_k/a_0|
                let a0 = coeffs[0];
                let bound = 1.0
                    + coeffs[1..]
                        .iter()
                        .map(|c| (c / a0).abs())
                        .fold(0.0, f64::max);
                (0..n)
                    .map(|i| {
                        // offset keeps seeds off the real axis
                        let theta = std::f64::consts::TAU * (i as f64 + 0.25) / n as f64;
                        Complex64::from_polar(bound, theta)
                    })
                    .collect()
            }
            Seeding::Homotopy => {
                // start from the roots of zⁿ + aₙ/a₀ = 0 and walk the
                // homotopy (1−t)·g + t·p in steps of the deformation
                // parameter, refining at each stage
                let a0 = coeffs[0];
                let an = coeffs[coeffs.len() - 1];
                let radius = (an / a0).abs().powf(1.0 / n as f64).max(0.5);
                let phase0 = Complex64::new(-an / a0, 0.0).arg() / n as f64;
                let mut z: Vec<Complex64> = (0..n)
                    .map(|i| {
                        let theta = phase0 + std::f64::consts::TAU * i as f64 / n as f64;
                        Complex64::from_polar(radius, theta)
                    })
                    .collect();
                let mut t = self.homotopy_step.clamp(1e-3, 1.0);
                while t < 1.0 {
                    let blended: Vec<f64> = blend_start(coeffs, radius, t);
                    refine(&blended, &mut z, self.abs_tol * 1e3, self.rel_tol * 1e3, 50);
                    t += self.homotopy_step;
                }
                z
            }
        }
    }

    /// Run the iteration; returns roots in seeding order.
    pub fn solve(&self, coeffs: &[f64]) -> Result<Vec<Complex64>> {
        if coeffs.len() < 2 {
            return Err(AstrokitError::NumericDomain(
                "polynomial of degree >= 1 required".into(),
            ));
        }
        if coeffs[0] == 0.0 {
            return Err(AstrokitError::NumericDomain(
                "leading coefficient must be non-zero".into(),
            ));
        }
        let mut z = self.seeds(coeffs);
        let (converged, residual) =
            refine(coeffs, &mut z, self.abs_tol, self.rel_tol, self.max_iters);
        if converged {
            Ok(z)
        } else {
            Err(AstrokitError::Convergence {
                iterations: self.max_iters,
                residual,
            })
        }
    }
}

/// One full Durand–Kerner refinement loop over a coefficient set.
/// Returns (converged, last max |Δz|).
fn refine(
    coeffs: &[f64],
    z: &mut [Complex64],
    abs_tol: f64,
    rel_tol: f64,
    max_iters: usize,
) -> (bool, f64) {
    let p = Polynomial::new(coeffs.to_vec());
    let a0 = coeffs[0];
    let n = z.len();
    let mut max_step = f64::INFINITY;
    for _ in 0..max_iters {
        max_step = 0.0;
        let mut max_mag: f64 = 0.0;
        for i in 0..n {
            let mut denom = Complex64::new(a0, 0.0);
            for j in 0..n {
                if j != i {
                    denom *= z[i] - z[j];
                }
            }
            if denom.norm() == 0.0 {
                // collided estimates; nudge apart instead of dividing by zero
                z[i] += Complex64::new(1e-8, 1e-8);
                max_step = f64::INFINITY;
                continue;
            }
            let step = p.eval_complex(z[i]) / denom;
            z[i] -= step;
            max_step = max_step.max(step.norm());
            max_mag = max_mag.max(z[i].norm());
        }
        if max_step <= abs_tol + rel_tol * max_mag {
            return (true, max_step);
        }
    }
    (false, max_step)
}

/// Blend the homotopy start polynomial a₀·(zⁿ + rⁿ) toward the target
fn blend_start(coeffs: &[f64], radius: f64, t: f64) -> Vec<f64> {
    let n = coeffs.len() - 1;
    let mut start = vec![0.0; n + 1];
    start[0] = coeffs[0];
    start[n] = coeffs[0] * radius.powi(n as i32);
    start
        .iter()
        .zip(coeffs.iter())
        .map(|(&g, &p)| (1.0 - t) * g + t * p)
        .collect()
}

/// Roots of ax + b = 0. Returns an empty set when a = 0.
pub fn solve_linear(coeffs: &[f64; 2]) -> Vec<Complex64> {
    let [a, b] = *coeffs;
    if a == 0.0 {
        return Vec::new();
    }
    vec![Complex64::new(-b / a, 0.0)]
}

/// Roots of ax² + bx + c = 0 with discriminant-sign branches.
///
/// A zero leading coefficient delegates to the linear formula.
pub fn solve_quadratic(coeffs: &[f64; 3]) -> Vec<Complex64> {
    let [a, b, c] = *coeffs;
    if a == 0.0 {
        return solve_linear(&[b, c]);
    }
    let disc = b * b - 4.0 * a * c;
    if disc > 0.0 {
        let sq = disc.sqrt();
        // the numerically stable pairing avoids cancellation in b ± √disc
        let q = -0.5 * (b + b.signum() * sq);
        let mut roots = [q / a, c / q];
        roots.sort_by(|x, y| x.partial_cmp(y).unwrap());
        roots.iter().map(|&r| Complex64::new(r, 0.0)).collect()
    } else if disc == 0.0 {
        let r = -b / (2.0 * a);
        vec![Complex64::new(r, 0.0), Complex64::new(r, 0.0)]
    } else {
        let re = -b / (2.0 * a);
        let im = (-disc).sqrt() / (2.0 * a).abs();
        vec![Complex64::new(re, im), Complex64::new(re, -im)]
    }
}

/// Real cube root, sign-preserving
fn cbrt(x: f64) -> f64 {
    x.signum() * x.abs().cbrt()
}

/// Roots of ax³ + bx² + cx + d = 0 by Fan Shengjin's discriminant chain.
///
/// The chain computes A = b² − 3ac, B = bc − 9ad, C = c² − 3bd and
/// Δ = B² − 4AC, then branches on the triple-root, one-real, double-root
/// and three-distinct-real cases. `tol` is the negative decimal log of the
/// tolerance: |Δ| below 10^−tol of the discriminant scale collapses to the
/// nearest degenerate branch. Real roots come first in the output.
pub fn solve_cubic(coeffs: &[f64; 4], tol: f64) -> Vec<Complex64> {
    let [a, b, c, d] = *coeffs;
    if a == 0.0 {
        return solve_quadratic(&[b, c, d]);
    }
    let big_a = b * b - 3.0 * a * c;
    let big_b = b * c - 9.0 * a * d;
    let big_c = c * c - 3.0 * b * d;
    let delta = big_b * big_b - 4.0 * big_a * big_c;

    let eps = 10f64.powf(-tol);
    // degeneracy thresholds scale with the additive parts of each
    // discriminant, so uniformly scaled coefficient sets classify the same
    let scale = (big_b * big_b) + (4.0 * big_a * big_c).abs();
    let scale_a = b * b + (3.0 * a * c).abs();
    let scale_b = (b * c).abs() + (9.0 * a * d).abs();

    if big_a.abs() <= eps * scale_a && big_b.abs() <= eps * scale_b {
        // triple root
        let r = -b / (3.0 * a);
        return vec![Complex64::new(r, 0.0); 3];
    }

    if delta.abs() <= eps * scale {
        // three real roots, two equal
        let k = big_b / big_a;
        let x1 = -b / a + k;
        let x23 = -k / 2.0;
        return vec![
            Complex64::new(x1, 0.0),
            Complex64::new(x23, 0.0),
            Complex64::new(x23, 0.0),
        ];
    }

    if delta > 0.0 {
        // one real root and a conjugate pair
        let sq = delta.sqrt();
        let y1 = big_a * b + 1.5 * a * (-big_b + sq);
        let y2 = big_a * b + 1.5 * a * (-big_b - sq);
        let cy1 = cbrt(y1);
        let cy2 = cbrt(y2);
        let x1 = (-b - (cy1 + cy2)) / (3.0 * a);
        let re = (-2.0 * b + (cy1 + cy2)) / (6.0 * a);
        let im = 3f64.sqrt() * (cy1 - cy2) / (6.0 * a);
        return vec![
            Complex64::new(x1, 0.0),
            Complex64::new(re, im),
            Complex64::new(re, -im),
        ];
    }

    // three distinct real roots, trigonometric form
    let sqrt_a = big_a.sqrt();
    let t = ((2.0 * big_a * b - 3.0 * a * big_b) / (2.0 * big_a * sqrt_a)).clamp(-1.0, 1.0);
    let theta = t.acos();
    let x1 = (-b - 2.0 * sqrt_a * (theta / 3.0).cos()) / (3.0 * a);
    let x2 = (-b + sqrt_a * ((theta / 3.0).cos() + 3f64.sqrt() * (theta / 3.0).sin())) / (3.0 * a);
    let x3 = (-b + sqrt_a * ((theta / 3.0).cos() - 3f64.sqrt() * (theta / 3.0).sin())) / (3.0 * a);
    vec![
        Complex64::new(x1, 0.0),
        Complex64::new(x2, 0.0),
        Complex64::new(x3, 0.0),
    ]
}

/// Roots of ax⁴ + bx³ + cx² + dx + e = 0.
///
/// Shen-style reduction: shift to the depressed form y⁴ + py² + qy + r,
/// solve the resolvent cubic 8m³ + 8pm² + (2p² − 8r)m − q² = 0 for a real
/// non-negative m, and split into two real-coefficient quadratics
/// y² ± √(2m)·y + (p/2 + m ∓ q/(2√(2m))) — complex square roots never
/// appear. Branches cover the quadruple root, two double pairs, a double
/// root with two simples, two conjugate pairs, and four distinct reals;
/// `tol` plays the same collapsing role as in [`solve_cubic`].
pub fn solve_quartic(coeffs: &[f64; 5], tol: f64) -> Vec<Complex64> {
    let [a, b, c, d, e] = *coeffs;
    if a == 0.0 {
        return solve_cubic(&[b, c, d, e], tol);
    }
    let eps = 10f64.powf(-tol);

    // depress: x = y - b/(4a)
    let shift = -b / (4.0 * a);
    let b1 = b / a;
    let c1 = c / a;
    let d1 = d / a;
    let e1 = e / a;
    let p = c1 - 3.0 * b1 * b1 / 8.0;
    let q = b1 * b1 * b1 / 8.0 - b1 * c1 / 2.0 + d1;
    let r = -3.0 * b1.powi(4) / 256.0 + b1 * b1 * c1 / 16.0 - b1 * d1 / 4.0 + e1;

    let scale = p.abs().max(q.abs()).max(r.abs()).max(1.0);

    if p.abs() <= eps * scale && q.abs() <= eps * scale && r.abs() <= eps * scale {
        // quadruple root
        return vec![Complex64::new(shift, 0.0); 4];
    }

    let mut roots: Vec<Complex64> = if q.abs() <= eps * scale {
        // biquadratic: two quadratics in y²
        let z = solve_quadratic(&[1.0, p, r]);
        let mut out = Vec::with_capacity(4);
        for zi in z {
            let sq = zi.sqrt();
            out.push(sq);
            out.push(-sq);
        }
        out
    } else {
        // resolvent cubic in m; its largest root is real and positive
        // whenever q != 0
        let resolvent = solve_cubic(&[8.0, 8.0 * p, 2.0 * p * p - 8.0 * r, -q * q], tol);
        let m = resolvent
            .iter()
            .filter(|z| z.im == 0.0 && z.re > 0.0)
            .map(|z| z.re)
            .fold(0.0, f64::max);
        let s = (2.0 * m).sqrt();
        let t = q / (2.0 * s);
        let mut out = solve_quadratic(&[1.0, s, p / 2.0 + m - t]);
        out.extend(solve_quadratic(&[1.0, -s, p / 2.0 + m + t]));
        out
    };

    for z in roots.iter_mut() {
        *z += shift;
    }
    // collapse nearly-equal real roots picked out by the tolerance, and put
    // real roots first in the prescribed order
    roots.sort_by(|x, y| {
        (x.im.abs(), x.re)
            .partial_cmp(&(y.im.abs(), y.re))
            .unwrap()
    });
    roots
}

/// Solve a polynomial of any degree, dispatching on the coefficient count.
///
/// Degrees 1–4 use the closed forms with the default tolerance; degree 5
/// and above run Durand–Kerner, retrying with the circular and then the
/// homotopy seeds if the exponential seeds fail to converge.
pub fn solve_poly(coeffs: &[f64]) -> Result<Vec<Complex64>> {
    // strip leading zeros so the degree matches the actual polynomial
    let start = coeffs.iter().position(|&c| c != 0.0).ok_or_else(|| {
        AstrokitError::NumericDomain("all-zero polynomial coefficients".into())
    })?;
    let coeffs = &coeffs[start..];
    match coeffs.len() {
        0 | 1 => Err(AstrokitError::NumericDomain(
            "polynomial of degree >= 1 required".into(),
        )),
        2 => Ok(solve_linear(coeffs.try_into().unwrap())),
        3 => Ok(solve_quadratic(coeffs.try_into().unwrap())),
        4 => Ok(solve_cubic(coeffs.try_into().unwrap(), 10.0)),
        5 => Ok(solve_quartic(coeffs.try_into().unwrap(), 10.0)),
        _ => {
            let mut last = None;
            for seeding in [Seeding::Exponential, Seeding::Circular, Seeding::Homotopy] {
                let solver = DurandKerner {
                    seeding,
                    ..DurandKerner::default()
                };
                match solver.solve(coeffs) {
                    Ok(roots) => return Ok(roots),
                    Err(e) => last = Some(e),
                }
            }
            Err(last.unwrap())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn max_residual(coeffs: &[f64], roots: &[Complex64]) -> f64 {
        let p = Polynomial::new(coeffs.to_vec());
        roots
            .iter()
            .map(|&z| p.eval_complex(z).norm())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_linear() {
        let r = solve_linear(&[2.0, -4.0]);
        assert_eq!(r.len(), 1);
        assert_relative_eq!(r[0].re, 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_linear_degenerate() {
        assert!(solve_linear(&[0.0, 1.0]).is_empty());
    }

    #[test]
    fn test_quadratic_real() {
        let r = solve_quadratic(&[1.0, -5.0, 6.0]);
        assert_relative_eq!(r[0].re, 2.0, epsilon = 1e-14);
        assert_relative_eq!(r[1].re, 3.0, epsilon = 1e-14);
    }

    #[test]
    fn test_quadratic_complex() {
        let r = solve_quadratic(&[1.0, 0.0, 1.0]);
        assert_relative_eq!(r[0].im.abs(), 1.0, epsilon = 1e-14);
        assert_relative_eq!(r[0].re, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_quadratic_degenerate_leading() {
        let r = solve_quadratic(&[0.0, 2.0, -4.0]);
        assert_eq!(r.len(), 1);
        assert_relative_eq!(r[0].re, 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_cubic_three_distinct() {
        // (x-1)(x-2)(x-3)
        let coeffs = [1.0, -6.0, 11.0, -6.0];
        let r = solve_cubic(&coeffs, 10.0);
        assert!(max_residual(&coeffs, &r) < 1e-12);
        let mut reals: Vec<f64> = r.iter().map(|z| z.re).collect();
        reals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_relative_eq!(reals[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(reals[1], 2.0, epsilon = 1e-10);
        assert_relative_eq!(reals[2], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_cubic_triple_root() {
        // (x-2)³ = x³ - 6x² + 12x - 8
        let r = solve_cubic(&[1.0, -6.0, 12.0, -8.0], 10.0);
        for z in &r {
            assert_relative_eq!(z.re, 2.0, epsilon = 1e-8);
            assert_eq!(z.im, 0.0);
        }
    }

    #[test]
    fn test_cubic_one_real() {
        // x³ - 1 has one real root and a conjugate pair
        let coeffs = [1.0, 0.0, 0.0, -1.0];
        let r = solve_cubic(&coeffs, 10.0);
        assert_relative_eq!(r[0].re, 1.0, epsilon = 1e-12);
        assert_eq!(r[0].im, 0.0);
        assert!(r[1].im != 0.0);
        assert!(max_residual(&coeffs, &r) < 1e-12);
    }

    #[test]
    fn test_cubic_double_root() {
        // (x-1)²(x-4) = x³ - 6x² + 9x - 4
        let r = solve_cubic(&[1.0, -6.0, 9.0, -4.0], 10.0);
        let mut reals: Vec<f64> = r.iter().map(|z| z.re).collect();
        reals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_relative_eq!(reals[0], 1.0, epsilon = 1e-7);
        assert_relative_eq!(reals[1], 1.0, epsilon = 1e-7);
        assert_relative_eq!(reals[2], 4.0, epsilon = 1e-7);
    }

    #[test]
    fn test_quartic_four_equal() {
        // (x-1)⁴
        let coeffs = [1.0, -4.0, 6.0, -4.0, 1.0];
        let r = solve_quartic(&coeffs, 10.0);
        assert_eq!(r.len(), 4);
        for z in &r {
            assert_relative_eq!(z.re, 1.0, epsilon = 1e-10);
            assert_eq!(z.im, 0.0);
        }
    }

    #[test]
    fn test_quartic_four_distinct() {
        // (x-1)(x-2)(x-3)(x-4) = x⁴ - 10x³ + 35x² - 50x + 24
        let coeffs = [1.0, -10.0, 35.0, -50.0, 24.0];
        let r = solve_quartic(&coeffs, 10.0);
        assert!(max_residual(&coeffs, &r) < 1e-8);
        let mut reals: Vec<f64> = r.iter().map(|z| z.re).collect();
        reals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for (i, expected) in [1.0, 2.0, 3.0, 4.0].iter().enumerate() {
            assert_relative_eq!(reals[i], *expected, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_quartic_two_conjugate_pairs() {
        // (x²+1)(x²+4) = x⁴ + 5x² + 4
        let coeffs = [1.0, 0.0, 5.0, 0.0, 4.0];
        let r = solve_quartic(&coeffs, 10.0);
        assert!(max_residual(&coeffs, &r) < 1e-10);
        assert!(r.iter().all(|z| z.im.abs() > 0.5));
    }

    #[test]
    fn test_quartic_two_double_pairs() {
        // (x-1)²(x+1)² = x⁴ - 2x² + 1
        let coeffs = [1.0, 0.0, -2.0, 0.0, 1.0];
        let r = solve_quartic(&coeffs, 10.0);
        assert!(max_residual(&coeffs, &r) < 1e-8);
    }

    #[test]
    fn test_quartic_mixed_real_complex() {
        // (x-2)(x+3)(x²+x+1)
        let coeffs = [1.0, 2.0, -4.0, -5.0, -6.0];
        let r = solve_quartic(&coeffs, 10.0);
        assert!(max_residual(&coeffs, &r) < 1e-8);
        let n_real = r.iter().filter(|z| z.im == 0.0).count();
        assert_eq!(n_real, 2);
        // real roots ordered first
        assert!(r[0].im == 0.0 && r[1].im == 0.0);
    }

    #[test]
    fn test_durand_kerner_fifth_roots_of_unity() {
        let coeffs = [1.0, 0.0, 0.0, 0.0, 0.0, -1.0];
        let roots = solve_poly(&coeffs).unwrap();
        assert_eq!(roots.len(), 5);
        for z in &roots {
            let z5 = z.powu(5);
            assert!(
                (z5 - Complex64::new(1.0, 0.0)).norm() < 1e-10,
                "z⁵ != 1 for {z}"
            );
        }
    }

    #[test]
    fn test_durand_kerner_circular_seeds() {
        let solver = DurandKerner {
            seeding: Seeding::Circular,
            ..DurandKerner::default()
        };
        // sixth roots of unity
        let coeffs = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0];
        let roots = solver.solve(&coeffs).unwrap();
        assert!(max_residual(&coeffs, &roots) < 1e-10);
    }

    #[test]
    fn test_durand_kerner_homotopy_seeds() {
        let solver = DurandKerner {
            seeding: Seeding::Homotopy,
            ..DurandKerner::default()
        };
        let coeffs = [2.0, 1.0, 0.0, -3.0, 1.0, 5.0, -1.0];
        let roots = solver.solve(&coeffs).unwrap();
        assert!(max_residual(&coeffs, &roots) < 1e-7);
    }

    #[test]
    fn test_solve_poly_strips_leading_zeros() {
        let roots = solve_poly(&[0.0, 0.0, 1.0, -5.0, 6.0]).unwrap();
        assert_eq!(roots.len(), 2);
    }

    #[test]
    fn test_solve_poly_rejects_zero_polynomial() {
        assert!(solve_poly(&[0.0, 0.0]).is_err());
    }

    #[test]
    fn test_degree_seven_random_coeffs() {
        let coeffs = [1.0, -2.5, 0.5, 3.0, -1.0, 0.25, 2.0, -0.75];
        let roots = solve_poly(&coeffs).unwrap();
        assert_eq!(roots.len(), 7);
        let scale: f64 = coeffs.iter().map(|c| c * c).sum::<f64>().sqrt();
        assert!(max_residual(&coeffs, &roots) < 1e-8 * scale);
    }
}
