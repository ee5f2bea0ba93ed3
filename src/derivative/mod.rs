//! Numerical differentiation
//!
//! [`Derivative`] is an adaptive first-order finite-difference scheme in
//! the SciPy mould: stencil weights come from the closed-form inverse of
//! the Vandermonde matrix at the chosen offsets, the step contracts each
//! iteration, and the loop stops as soon as the successive-difference
//! error estimate stops improving.
//!
//! [`FractionalDerivative`] extends the order to the positive reals by
//! combining binomial finite differences (the integer part) with the
//! Riemann–Liouville fractional integral, in either the Riemann–Liouville
//! (integrate, then differentiate) or Caputo (differentiate, then
//! integrate) arrangement.

use crate::quadrature::RiemannLiouville;
use crate::specfun::{binomial, inverse_vandermonde};
use crate::{AstrokitError, Result};

/// Finite-difference stencil direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Center,
    Forward,
    Backward,
}

/// Where the adaptive iteration stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeStatus {
    /// Successive estimates agreed to tolerance
    Converged,
    /// The error estimate grew; the previous iterate was returned
    ErrorIncrease,
    /// The iteration cap was reached
    IterationCap,
}

/// Value, error estimate and iteration diagnostics of one evaluation
#[derive(Debug, Clone, Copy)]
pub struct DerivativeResult {
    pub value: f64,
    pub error: f64,
    pub iterations: usize,
    pub status: DerivativeStatus,
}

/// Adaptive first-order finite-difference derivative
#[derive(Debug, Clone)]
pub struct Derivative {
    pub direction: Direction,
    /// Finite-difference order; must be even (the one-sided stencils use
    /// half of the centered set)
    pub order: usize,
    pub initial_step: f64,
    /// Step contraction factor per iteration
    pub step_factor: f64,
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub max_iters: usize,
}

impl Default for Derivative {
    fn default() -> Self {
        Derivative {
            direction: Direction::Center,
            order: 8,
            initial_step: 0.5,
            step_factor: 2.0,
            abs_tol: 0.0,
            rel_tol: 1.49e-8,
            max_iters: 12,
        }
    }
}

impl Derivative {
    /// Stencil offsets in units of the step
    fn offsets(&self) -> Vec<f64> {
        let m = (self.order / 2).max(1);
        match self.direction {
            Direction::Center => (-(m as i64)..=m as i64)
                .filter(|&j| j != 0)
                .map(|j| j as f64)
                .collect(),
            Direction::Forward => (0..=m as i64).map(|j| j as f64).collect(),
            Direction::Backward => (0..=m as i64).map(|j| -j as f64).collect(),
        }
    }

    /// First-derivative weights at the offsets: the system Σ w s^p = δ_{p,1}
    /// is one column of the inverse Vandermonde matrix.
    fn weights(&self, offsets: &[f64]) -> Result<Vec<f64>> {
        let vinv = inverse_vandermonde(offsets)?;
        Ok((0..offsets.len()).map(|q| vinv[(q, 1)]).collect())
    }

    /// Evaluate df/dx at x.
    pub fn eval<F: Fn(f64) -> f64>(&self, f: F, x: f64) -> Result<DerivativeResult> {
        if self.order % 2 != 0 || self.order == 0 {
            return Err(AstrokitError::NumericDomain(format!(
                "finite-difference order must be even and positive, got {}",
                self.order
            )));
        }
        let offsets = self.offsets();
        let weights = self.weights(&offsets)?;

        let mut h = self.initial_step;
        let mut last_value = f64::NAN;
        let mut last_error = f64::INFINITY;
        for iter in 0..self.max_iters {
            let value: f64 = offsets
                .iter()
                .zip(weights.iter())
                .map(|(&s, &w)| w * f(x + s * h))
                .sum::<f64>()
                / h;
            if last_value.is_finite() {
                let error = (value - last_value).abs();
                if error <= self.abs_tol.max(self.rel_tol * value.abs()) {
                    return Ok(DerivativeResult {
                        value,
                        error,
                        iterations: iter + 1,
                        status: DerivativeStatus::Converged,
                    });
                }
                if error > last_error {
                    return Ok(DerivativeResult {
                        value: last_value,
                        error: last_error,
                        iterations: iter + 1,
                        status: DerivativeStatus::ErrorIncrease,
                    });
                }
                last_error = error;
            }
            last_value = value;
            h /= self.step_factor;
        }
        Ok(DerivativeResult {
            value: last_value,
            error: last_error,
            iterations: self.max_iters,
            status: DerivativeStatus::IterationCap,
        })
    }
}

/// Which fractional arrangement to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FractionalKind {
    /// Differentiate the (n−α)-fold integral
    #[default]
    RiemannLiouville,
    /// Integrate the n-th derivative (keeps classical initial values)
    Caputo,
}

/// Fractional-order derivative via binomial differences and the
/// Riemann–Liouville integral
///
/// Integer orders reduce to the plain binomial finite difference
/// f⁽ⁿ⁾(x) ≈ h⁻ⁿ Σ (−1)ʲ C(n,j) f(x − jh) with the same
/// contract-until-error-grows step loop as [`Derivative`].
pub struct FractionalDerivative<F: Fn(f64) -> f64> {
    f: F,
    pub order: f64,
    pub kind: FractionalKind,
    /// Lower limit of the fractional integrals
    pub base: f64,
    pub initial_step: f64,
    pub step_factor: f64,
    pub max_iters: usize,
}

impl<F: Fn(f64) -> f64 + Clone> FractionalDerivative<F> {
    pub fn new(f: F, order: f64) -> Self {
        FractionalDerivative {
            f,
            order,
            kind: FractionalKind::RiemannLiouville,
            base: 0.0,
            initial_step: 1e-3,
            step_factor: 10.0,
            max_iters: 6,
        }
    }

    pub fn with_kind(mut self, kind: FractionalKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_base(mut self, base: f64) -> Self {
        self.base = base;
        self
    }

    /// Integer-order binomial finite difference with step contraction.
    fn binomial_derivative(&self, g: &dyn Fn(f64) -> f64, n: usize, x: f64) -> f64 {
        if n == 0 {
            return g(x);
        }
        let coeffs: Vec<f64> = (0..=n)
            .map(|j| {
                let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
                sign * binomial(n as u64, j as u64) as f64
            })
            .collect();
        let estimate = |h: f64| {
            coeffs
                .iter()
                .enumerate()
                .map(|(j, &c)| c * g(x - j as f64 * h))
                .sum::<f64>()
                / h.powi(n as i32)
        };
        let mut h = self.initial_step;
        let mut last = estimate(h);
        let mut last_err = f64::INFINITY;
        for _ in 1..self.max_iters {
            h /= self.step_factor;
            let cur = estimate(h);
            let err = (cur - last).abs();
            if err > last_err {
                return last;
            }
            last = cur;
            last_err = err;
        }
        last
    }

    /// Evaluate the α-order derivative at x.
    pub fn eval(&self, x: f64) -> Result<f64> {
        if self.order < 0.0 {
            return Err(AstrokitError::NumericDomain(format!(
                "derivative order must be non-negative, got {}",
                self.order
            )));
        }
        let alpha = self.order;
        let n = alpha.ceil() as usize;
        if (alpha - n as f64).abs() == 0.0 || alpha == 0.0 {
            let f = self.f.clone();
            return Ok(self.binomial_derivative(&move |t| f(t), alpha as usize, x));
        }
        let frac = n as f64 - alpha;
        match self.kind {
            FractionalKind::RiemannLiouville => {
                // differentiate the (n−α)-fold integral
                let inner = RiemannLiouville::new(self.f.clone(), frac).with_base(self.base, 0.0);
                let g = move |t: f64| inner.eval(t).unwrap_or(f64::NAN);
                Ok(self.binomial_derivative(&g, n, x))
            }
            FractionalKind::Caputo => {
                // integrate the n-th derivative
                let f = self.f.clone();
                let deriv = {
                    let this = self.shallow();
                    move |t: f64| this.binomial_derivative(&|u| f(u), n, t)
                };
                let integral = RiemannLiouville::new(deriv, frac).with_base(self.base, 0.0);
                integral.eval(x)
            }
        }
    }

    /// Copy of the numeric knobs with a unit payload, for inner closures.
    fn shallow(&self) -> FractionalDerivative<fn(f64) -> f64> {
        FractionalDerivative {
            f: |_| 0.0,
            order: self.order,
            kind: self.kind,
            base: self.base,
            initial_step: self.initial_step,
            step_factor: self.step_factor,
            max_iters: self.max_iters,
        }
    }
}
