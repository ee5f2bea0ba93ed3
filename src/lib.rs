//! astrokit: numerical kernels and orbital-mechanics solvers
//!
//! This crate is the computational core of an astronomy library. It is
//! organised leaves-first:
//!
//! - [`angle`] — unit-tagged angles (turns, degrees, radians, gradians)
//! - [`specfun`] — symmetric polynomials, Vandermonde inversion,
//!   Legendre/Stieltjes/Bell tables, [`specfun::Polynomial`]
//! - [`derivative`] — adaptive finite-difference and fractional-order
//!   differentiation
//! - [`quadrature`] — adaptive Gauss–Kronrod, Newton–Cotes, Romberg and
//!   Riemann–Liouville integration
//! - [`ode`] — Runge–Kutta 2(3) and 4(5) integration with dense output
//! - [`optimize`] — Brent unbounded minimisation
//! - [`inverse`] — bisection, Householder iterations and the Brent inverse
//! - [`polyroot`] — closed-form roots for degrees 1–4 and Durand–Kerner
//!   iteration beyond
//! - [`kepler`] — Kepler's equation and its inverse in the elliptic,
//!   parabolic and hyperbolic regimes
//! - [`orbit`] — orbital element sets, state vectors and the Keplerian
//!   satellite tracker
//! - [`lambert`] — an Izzo-style Lambert problem solver
//! - [`rotation`] — IAU rotation-model evaluation
//! - [`tle`], [`oem`] — two-line element and CCSDS OEM codecs
//!
//! # Example
//!
//! ```
//! use astrokit::angle::Angle;
//! use astrokit::kepler::{InverseKepler, NewtonKepler};
//!
//! let solver = NewtonKepler::new(0.3);
//! let e_anom = solver.solve(Angle::from_radians(1.0)).unwrap();
//! // E - e sin E recovers the mean anomaly
//! let m = e_anom.radians() - 0.3 * e_anom.radians().sin();
//! assert!((m - 1.0).abs() < 1e-12);
//! ```
//!
//! All solvers are plain value types: construct one, call it, drop it. The
//! coefficient tables they share (Gauss–Kronrod nodes, inverse-Kepler
//! segment tables) are immutable module-level data, safe to share across
//! threads; individual solver instances keep per-call iteration state and
//! should not be shared concurrently.

use thiserror::Error;

pub mod angle;
pub mod constants;
pub mod derivative;
pub mod inverse;
pub mod kepler;
pub mod lambert;
pub mod ode;
pub mod oem;
pub mod optimize;
pub mod orbit;
pub mod polyroot;
pub mod quadrature;
pub mod rotation;
pub mod specfun;
pub mod tle;

/// Main error type for astrokit operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AstrokitError {
    /// Argument outside the mathematically valid region
    #[error("argument outside valid domain: {0}")]
    NumericDomain(String),

    /// Iteration cap reached without meeting the tolerance
    #[error("no convergence after {iterations} iterations (residual {residual:e})")]
    Convergence { iterations: usize, residual: f64 },

    /// A piecewise or segmented table was queried outside its valid range
    #[error("value {value} outside table range ({start}..{end})")]
    TableRange { value: f64, start: f64, end: f64 },

    /// TLE/OEM parse or checksum failure
    #[error("format error at line {line}: {message}")]
    Format { line: usize, message: String },
}

/// Result type for astrokit operations
pub type Result<T> = std::result::Result<T, AstrokitError>;

pub use angle::Angle;
pub use orbit::{KeplerianOrbitElems, OrbitStateVectors};
