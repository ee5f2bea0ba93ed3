//! Special functions and polynomial helpers
//!
//! The small toolbox the numerical operators are built on: elementary
//! symmetric polynomials, Vandermonde matrices with their closed-form
//! inverses, Legendre and Stieltjes polynomial coefficients, the Bell
//! polynomial triangle used by the Householder iterations, and a plain
//! dense [`Polynomial`] type.
//!
//! Dynamic matrices are `nalgebra::DMatrix`; its partial-pivot LU carries
//! every linear solve in the crate and reports singular systems through
//! `Option`, which these helpers surface as domain errors.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::{AstrokitError, Result};

/// Evaluate all elementary symmetric polynomials e_0..e_n of the inputs.
///
/// e_k is the sum of all k-fold products of distinct inputs, with e_0 = 1.
/// Filled by the usual O(n²) dynamic program: feeding one value at a time
/// and updating the table from the top down.
///
/// ```
/// let e = astrokit::specfun::elementary_symmetric(&[2.0, 3.0, 4.0]);
/// assert_eq!(e, vec![1.0, 9.0, 26.0, 24.0]);
/// ```
pub fn elementary_symmetric(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut e = vec![0.0; n + 1];
    e[0] = 1.0;
    for (count, &x) in values.iter().enumerate() {
        for k in (1..=count + 1).rev() {
            e[k] += x * e[k - 1];
        }
    }
    e
}

/// Build the Vandermonde matrix of the nodes: `V[p][q] = nodes[q]^p`.
pub fn vandermonde(nodes: &[f64]) -> DMatrix<f64> {
    let n = nodes.len();
    DMatrix::from_fn(n, n, |p, q| nodes[q].powi(p as i32))
}

/// Closed-form inverse of the Vandermonde matrix of the nodes.
///
/// Row p of the inverse belongs to node x_p; its entries are signed
/// elementary symmetric polynomials of the *other* nodes over the product
/// of differences Π_{i≠p}(x_p − x_i). Fails when two nodes coincide,
/// which is exactly when the matrix is singular.
pub fn inverse_vandermonde(nodes: &[f64]) -> Result<DMatrix<f64>> {
    let n = nodes.len();
    if n == 0 {
        return Err(AstrokitError::NumericDomain(
            "empty Vandermonde node set".into(),
        ));
    }
    let mut inv = DMatrix::zeros(n, n);
    for p in 0..n {
        let others: Vec<f64> = nodes
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != p)
            .map(|(_, &x)| x)
            .collect();
        let mut denom = 1.0;
        for &x in &others {
            denom *= nodes[p] - x;
        }
        if denom == 0.0 {
            return Err(AstrokitError::NumericDomain(format!(
                "duplicate Vandermonde node {}",
                nodes[p]
            )));
        }
        let e = elementary_symmetric(&others);
        for q in 0..n {
            let k = n - 1 - q;
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            inv[(p, q)] = sign * e[k] / denom;
        }
    }
    Ok(inv)
}

/// Solve `A x = b` by partial-pivot LU, surfacing singular systems.
pub fn solve_linear(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    a.clone()
        .lu()
        .solve(b)
        .ok_or_else(|| AstrokitError::NumericDomain("singular linear system".into()))
}

/// Binomial coefficient C(n, k) as an exact integer.
pub fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u64 = 1;
    for i in 0..k {
        acc = acc * (n - i) / (i + 1);
    }
    acc
}

/// Coefficients of the degree-n Legendre polynomial, descending order.
///
/// From the Rodrigues expansion,
/// P_n(x) = Σ_k (−1)^k (2n−2k)! / (2^n k! (n−k)! (n−2k)!) x^{n−2k},
/// with zeros filling the absent parities.
pub fn legendre_coefficients(n: usize) -> Vec<f64> {
    let mut coeffs = vec![0.0; n + 1];
    for k in 0..=n / 2 {
        // (2n-2k)! / (2^n k! (n-k)! (n-2k)!) built as a running product:
        // the n-term product (n-2k+1)..(2n-2k) over 2^n, then the two
        // factorial divisions, keeping intermediates inside f64 range for
        // the orders quadrature asks for
        let mut c = 1.0;
        for i in 0..n {
            c *= (n - 2 * k + 1 + i) as f64 / 2.0;
        }
        for i in 0..k {
            c /= (i + 1) as f64;
        }
        for i in 0..n - k {
            c /= (i + 1) as f64;
        }
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        coeffs[2 * k] = sign * c;
    }
    coeffs
}

/// Evaluate P_n(x) and its derivative by the three-term recurrence.
///
/// Stable at any order, unlike monomial evaluation of the closed-form
/// coefficients; the quadrature node solver leans on this.
pub fn legendre_eval(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (1.0, 0.0);
    }
    let mut p_prev = 1.0;
    let mut p = x;
    for j in 1..n {
        let jf = j as f64;
        let p_next = ((2.0 * jf + 1.0) * x * p - jf * p_prev) / (jf + 1.0);
        p_prev = p;
        p = p_next;
    }
    // derivative from the same recurrence pair
    let dp = if (x.abs() - 1.0).abs() < 1e-300 {
        let nf = n as f64;
        x.powi(n as i32 - 1) * nf * (nf + 1.0) / 2.0
    } else {
        (n as f64) * (x * p - p_prev) / (x * x - 1.0)
    };
    (p, dp)
}

/// Stieltjes polynomial E_{n+1} expressed in the Legendre basis.
///
/// Returns the coefficients b_j of E_{n+1} = Σ b_j P_j (only parities
/// matching n+1 are populated; the leading coefficient is 1). E_{n+1} is
/// defined by ∫ E_{n+1}(x) P_n(x) x^k dx = 0 for k = 0..n (Patterson
/// 1968); the surviving conditions (odd k) form a square linear system in
/// the lower-order coefficients, assembled here with exact Legendre
/// product integrals and solved by LU.
pub fn stieltjes_legendre_coefficients(n: usize) -> Result<Vec<f64>> {
    let deg = n + 1;
    // unknown coefficients multiply P_{deg-2}, P_{deg-4}, ...
    let terms: Vec<usize> = (0..=deg).rev().step_by(2).collect();
    let r = terms.len() - 1;
    if r == 0 {
        let mut out = vec![0.0; deg + 1];
        out[deg] = 1.0;
        return Ok(out);
    }

    // Legendre-basis coefficients of x^k P_n for each odd k up to n,
    // grown by repeated application of the x-multiplication recurrence
    // x P_j = ((j+1) P_{j+1} + j P_{j-1}) / (2j+1).
    let max_len = n + n + 2;
    let mut cur = vec![0.0; max_len];
    cur[n] = 1.0;
    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(r);
    for k in 1..=n {
        let mut next = vec![0.0; max_len];
        for j in 0..max_len - 1 {
            if cur[j] == 0.0 {
                continue;
            }
            let jf = j as f64;
            next[j + 1] += cur[j] * (jf + 1.0) / (2.0 * jf + 1.0);
            if j > 0 {
                next[j - 1] += cur[j] * jf / (2.0 * jf + 1.0);
            }
        }
        cur = next;
        if k % 2 == 1 {
            rows.push(cur.clone());
        }
    }
    debug_assert_eq!(rows.len(), r);

    // Σ_i b_i c_{k, m_i} 2/(2 m_i + 1) = 0, with b_0 = 1 known
    let inner = |c: &[f64], m: usize| c[m] * 2.0 / (2.0 * m as f64 + 1.0);
    let a = DMatrix::from_fn(r, r, |row, col| inner(&rows[row], terms[col + 1]));
    let rhs = DVector::from_fn(r, |row, _| -inner(&rows[row], terms[0]));
    let b = solve_linear(&a, &rhs)?;

    let mut out = vec![0.0; deg + 1];
    out[deg] = 1.0;
    for (i, &m) in terms.iter().skip(1).enumerate() {
        out[m] = b[i];
    }
    Ok(out)
}

/// Coefficients of the degree-(n+1) Stieltjes polynomial, descending order.
pub fn stieltjes_coefficients(n: usize) -> Result<Vec<f64>> {
    let basis = stieltjes_legendre_coefficients(n)?;
    let deg = n + 1;
    let mut coeffs = vec![0.0; deg + 1];
    for (j, &b) in basis.iter().enumerate() {
        if b == 0.0 {
            continue;
        }
        let pj = legendre_coefficients(j);
        for (idx, &c) in pj.iter().enumerate() {
            // pj is descending of length j+1; align to descending deg+1
            coeffs[deg - j + idx] += b * c;
        }
    }
    Ok(coeffs)
}

/// Evaluate a Legendre series Σ b_j P_j(x) and its derivative.
pub fn legendre_series_eval(basis: &[f64], x: f64) -> (f64, f64) {
    let mut sum = 0.0;
    let mut dsum = 0.0;
    let mut p_prev = 1.0;
    let mut p = x;
    let mut dp_prev = 0.0;
    let mut dp = 1.0;
    if !basis.is_empty() {
        sum += basis[0];
    }
    if basis.len() > 1 {
        sum += basis[1] * p;
        dsum += basis[1];
    }
    for j in 1..basis.len().saturating_sub(1) {
        let jf = j as f64;
        let p_next = ((2.0 * jf + 1.0) * x * p - jf * p_prev) / (jf + 1.0);
        let dp_next = ((2.0 * jf + 1.0) * (p + x * dp) - jf * dp_prev) / (jf + 1.0);
        p_prev = p;
        p = p_next;
        dp_prev = dp;
        dp = dp_next;
        if basis[j + 1] != 0.0 {
            sum += basis[j + 1] * p;
            dsum += basis[j + 1] * dp;
        }
    }
    (sum, dsum)
}

/// Gamma function by the Lanczos approximation (g = 7, 9 terms).
///
/// Relative accuracy is a few ulps over the real line; negative arguments
/// go through the reflection formula, and the poles at 0, −1, −2, …
/// return infinity.
pub fn gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_93,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_13,
        -176.615_029_162_140_59,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_571_6e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // reflection: Γ(x) Γ(1−x) = π / sin(πx)
        let s = (std::f64::consts::PI * x).sin();
        if s == 0.0 {
            return f64::INFINITY;
        }
        return std::f64::consts::PI / (s * gamma(1.0 - x));
    }
    let x = x - 1.0;
    let mut acc = COEFFS[0];
    for (i, &c) in COEFFS.iter().enumerate().skip(1) {
        acc += c / (x + i as f64);
    }
    let t = x + G + 0.5;
    (2.0 * std::f64::consts::PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * acc
}

/// Triangular table of incomplete Bell polynomials B_{n,k}(x_1..x_{n−k+1}).
///
/// Entry (k, n) of the returned matrix holds B_{n,k}; positions outside
/// the triangle are NaN. Filled by the recurrence
/// B_{n,k} = Σ_i C(n−1, i−1) x_i B_{n−i,k−1}.
pub fn bell_triangle(x: &[f64]) -> DMatrix<f64> {
    let m = x.len();
    let mut b = DMatrix::from_element(m + 1, m + 1, f64::NAN);
    b[(0, 0)] = 1.0;
    for n in 1..=m {
        b[(0, n)] = 0.0;
    }
    for k in 1..=m {
        for n in k..=m {
            let mut sum = 0.0;
            for i in 1..=n - k + 1 {
                let c = binomial((n - 1) as u64, (i - 1) as u64) as f64;
                let prev = b[(k - 1, n - i)];
                if prev.is_nan() {
                    continue;
                }
                sum += c * x[i - 1] * prev;
            }
            b[(k, n)] = sum;
        }
    }
    b
}

/// Dense polynomial with descending-order coefficients
///
/// Represents P(x) = Σ a_k x^k with `coefficients[0]` the leading term.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    /// Create from descending-order coefficients
    pub fn new(coefficients: Vec<f64>) -> Self {
        Polynomial { coefficients }
    }

    /// Highest power of the polynomial
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Get a reference to the coefficients (descending order)
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Evaluate at a real point by Horner's scheme
    pub fn eval(&self, x: f64) -> f64 {
        self.coefficients.iter().fold(0.0, |acc, &c| acc * x + c)
    }

    /// Evaluate at a complex point by Horner's scheme
    pub fn eval_complex(&self, z: Complex64) -> Complex64 {
        self.coefficients
            .iter()
            .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z + c)
    }

    /// Derivative as a new polynomial
    pub fn derivative(&self) -> Polynomial {
        let n = self.coefficients.len();
        if n <= 1 {
            return Polynomial::new(vec![0.0]);
        }
        let coeffs = self
            .coefficients
            .iter()
            .take(n - 1)
            .enumerate()
            .map(|(i, &c)| c * (n - 1 - i) as f64)
            .collect();
        Polynomial::new(coeffs)
    }
}
