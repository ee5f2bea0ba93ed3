//! Piecewise-quintic elliptic inverse Kepler solver
//!
//! Builds, per eccentricity, a table of breakpoints in mean-anomaly space
//! with one quintic patch per interval, fitted to the exact value and the
//! first two derivatives of E(M) at both interval ends:
//!
//! dE/dM = 1/(1 − e·cos E),  d²E/dM² = −e·sin E / (1 − e·cos E)³
//!
//! Evaluation is a bin lookup into an interval-index vector, a short
//! local scan, and one Horner pass — no iteration. The grid is laid out
//! in eccentric anomaly, which automatically concentrates breakpoints in
//! mean anomaly exactly where the first derivative grows; the density
//! scales with eccentricity.

use std::f64::consts::PI;

use nalgebra::DMatrix;

use super::{
    check_elliptic_eccentricity, elliptic_bisection, solve_symmetric, InverseKepler, E_BOUNDARY,
    M_BOUNDARY,
};
use crate::angle::Angle;
use crate::{AstrokitError, Result};

/// Table-driven elliptic inverse Kepler solver
#[derive(Debug, Clone)]
pub struct QuinticKepler {
    e: f64,
    /// Breakpoints in M, ascending over [0, π]
    breakpoints: Vec<f64>,
    /// One row of six quintic coefficients per interval (ascending powers
    /// of M − M_j)
    coefficients: DMatrix<f64>,
    /// Uniform-bin index into the (non-uniform) breakpoint list
    kvec: Vec<usize>,
}

impl QuinticKepler {
    /// Build the table for one eccentricity.
    pub fn new(eccentricity: f64) -> Result<Self> {
        check_elliptic_eccentricity(eccentricity)?;
        let e = eccentricity;

        // denser grid as the pericentre derivative spike sharpens
        let n = 128 + (512.0 * e * e) as usize;
        let e_grid: Vec<f64> = (0..=n).map(|j| PI * j as f64 / n as f64).collect();
        let breakpoints: Vec<f64> = e_grid.iter().map(|&x| x - e * x.sin()).collect();

        let value = |x: f64| x;
        let d1 = |x: f64| 1.0 / (1.0 - e * x.cos());
        let d2 = |x: f64| {
            let f1 = 1.0 - e * x.cos();
            -e * x.sin() / (f1 * f1 * f1)
        };

        let mut coefficients = DMatrix::zeros(n, 6);
        for j in 0..n {
            let (x0, x1) = (e_grid[j], e_grid[j + 1]);
            let h = breakpoints[j + 1] - breakpoints[j];
            let c0 = value(x0);
            let c1 = d1(x0);
            let c2 = 0.5 * d2(x0);
            let a = value(x1) - (c0 + c1 * h + c2 * h * h);
            let b = d1(x1) - (c1 + 2.0 * c2 * h);
            let c = d2(x1) - 2.0 * c2;
            let h2 = h * h;
            let h3 = h2 * h;
            let c3 = (10.0 * a - 4.0 * b * h + 0.5 * c * h2) / h3;
            let c4 = (-15.0 * a + 7.0 * b * h - c * h2) / (h3 * h);
            let c5 = (6.0 * a - 3.0 * b * h + 0.5 * c * h2) / (h3 * h2);
            coefficients.set_row(j, &nalgebra::RowVector6::new(c0, c1, c2, c3, c4, c5));
        }

        // uniform bins over [0, π] pointing at the interval containing the
        // bin start, so lookup is O(1) plus a short scan
        let bins = 4 * n;
        let mut kvec = vec![0usize; bins + 1];
        let mut idx = 0;
        for (b, slot) in kvec.iter_mut().enumerate() {
            let m = PI * b as f64 / bins as f64;
            while idx + 1 < n && breakpoints[idx + 1] <= m {
                idx += 1;
            }
            *slot = idx;
        }

        Ok(QuinticKepler {
            e,
            breakpoints,
            coefficients,
            kvec,
        })
    }

    /// Interval index for a principal mean anomaly in [0, π].
    fn find_interval(&self, m: f64) -> usize {
        let bins = self.kvec.len() - 1;
        let b = ((m / PI) * bins as f64) as usize;
        let mut idx = self.kvec[b.min(bins)];
        let last = self.coefficients.nrows() - 1;
        while idx < last && self.breakpoints[idx + 1] < m {
            idx += 1;
        }
        idx
    }

    fn eval_patch(&self, idx: usize, m: f64) -> f64 {
        let t = m - self.breakpoints[idx];
        let row = self.coefficients.row(idx);
        let mut acc = row[5];
        for k in (0..5).rev() {
            acc = acc * t + row[k];
        }
        acc
    }
}

impl InverseKepler for QuinticKepler {
    fn eccentricity(&self) -> f64 {
        self.e
    }

    fn solve(&self, mean_anomaly: Angle) -> Result<Angle> {
        let e = self.e;
        Ok(solve_symmetric(mean_anomaly, |m| {
            if e > E_BOUNDARY && m < M_BOUNDARY {
                return elliptic_bisection(e, m);
            }
            self.eval_patch(self.find_interval(m), m)
        }))
    }
}

impl QuinticKepler {
    /// Number of quintic patches in the table
    pub fn intervals(&self) -> usize {
        self.coefficients.nrows()
    }

    /// Breakpoints of the table (mean anomaly, radians)
    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    /// Query helper surfacing out-of-range principal anomalies; `solve`
    /// itself always reduces into range first.
    pub fn interval_for(&self, m: f64) -> Result<usize> {
        if !(0.0..=PI).contains(&m) {
            return Err(AstrokitError::TableRange {
                value: m,
                start: 0.0,
                end: PI,
            });
        }
        Ok(self.find_interval(m))
    }
}
