//! Bivariate smoothing spline over scattered points.
//!
//! A tensor-product B-spline `s(x, y) = Σᵢ Σⱼ cᵢⱼ·Bᵢ(x)·Bⱼ(y)` fitted by
//! linear least squares. Knots are clamped to the data's bounding box.
//!
//! # Algorithm
//!
//! The fit starts with no interior knots, i.e. a single bicubic patch
//! (lower degree on an axis with fewer than four distinct values). While
//! the residual sum of squares exceeds the smoothing factor `s`, one
//! uniformly placed interior knot is added per axis and the fit repeats.
//! Growth stops when an axis would have more basis functions than distinct
//! data values, or the coefficient count would exceed the number of points.
//! A larger `s` therefore gives a smoother, lower-resolution surface;
//! `s = 0` grows the knot set as far as the data allows.
//!
//! The least-squares system is solved by SVD so near-rank-deficient
//! configurations (clustered data) degrade gracefully.
//!
//! # References
//! - Dierckx, P. "Curve and Surface Fitting with Splines" (1993), Ch. 5
//! - Piegl, L. & Tiller, W. "The NURBS Book" (1997), Algorithm A2.2

use nalgebra::{DMatrix, DVector};

use crate::error::{self, VolGridError};
use crate::validate::validate_non_negative;

/// Highest polynomial degree used per axis.
const MAX_DEGREE: usize = 3;
/// Singular values below this (relative to machine scale) are treated as zero.
const SVD_EPS: f64 = 1e-12;

/// Clamped B-spline basis on one axis.
#[derive(Debug, Clone)]
struct Axis {
    degree: usize,
    knots: Vec<f64>,
    lo: f64,
    hi: f64,
}

impl Axis {
    fn new(lo: f64, hi: f64, degree: usize, n_interior: usize) -> Self {
        if hi <= lo {
            // One distinct value: a single constant basis function.
            return Self {
                degree: 0,
                knots: vec![lo, lo],
                lo,
                hi: lo,
            };
        }
        let mut knots = Vec::with_capacity(2 * (degree + 1) + n_interior);
        knots.extend(std::iter::repeat_n(lo, degree + 1));
        knots.extend(
            (1..=n_interior).map(|j| lo + (hi - lo) * j as f64 / (n_interior + 1) as f64),
        );
        knots.extend(std::iter::repeat_n(hi, degree + 1));
        Self {
            degree,
            knots,
            lo,
            hi,
        }
    }

    fn n_interior(&self) -> usize {
        self.knots.len() - 2 * (self.degree + 1)
    }

    fn n_basis(&self) -> usize {
        self.knots.len() - self.degree - 1
    }

    /// Index of the knot span containing `x` (clamped to the axis range).
    fn span(&self, x: f64) -> usize {
        let last = self.n_basis() - 1;
        if x >= self.knots[last + 1] {
            return last;
        }
        // Largest i in [degree, last] with knots[i] <= x.
        let upper = self.knots[..=last].partition_point(|&k| k <= x);
        upper.saturating_sub(1).max(self.degree)
    }

    /// All basis function values at `x`; at most `degree + 1` are non-zero.
    fn basis(&self, x: f64) -> Vec<f64> {
        let mut values = vec![0.0; self.n_basis()];
        if self.hi <= self.lo {
            values[0] = 1.0;
            return values;
        }
        let x = x.clamp(self.lo, self.hi);
        let p = self.degree;
        let i = self.span(x);
        let t = &self.knots;

        let mut n = vec![0.0; p + 1];
        let mut left = vec![0.0; p + 1];
        let mut right = vec![0.0; p + 1];
        n[0] = 1.0;
        for j in 1..=p {
            left[j] = x - t[i + 1 - j];
            right[j] = t[i + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                let temp = n[r] / (right[r + 1] + left[j - r]);
                n[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            n[j] = saved;
        }
        values[i - p..=i].copy_from_slice(&n);
        values
    }
}

/// Fitted bivariate smoothing spline.
///
/// # Examples
/// ```
/// use volgrid::surface::SmoothingSpline2d;
///
/// // A plane is reproduced exactly.
/// let mut xs = Vec::new();
/// let mut ys = Vec::new();
/// let mut zs = Vec::new();
/// for x in [30.0, 60.0, 90.0] {
///     for y in [-0.1, 0.0, 0.1] {
///         xs.push(x);
///         ys.push(y);
///         zs.push(0.2 + 0.001 * x - 0.5 * y);
///     }
/// }
/// let spline = SmoothingSpline2d::fit(&xs, &ys, &zs, 0.1)?;
/// assert!((spline.evaluate(45.0, 0.05) - (0.2 + 0.045 - 0.025)).abs() < 1e-10);
/// # Ok::<(), volgrid::VolGridError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SmoothingSpline2d {
    x_axis: Axis,
    y_axis: Axis,
    /// Row-major by x basis index: `coeffs[ix * ny + iy]`.
    coeffs: Vec<f64>,
    residual: f64,
}

impl SmoothingSpline2d {
    /// Fit a smoothing spline to scattered `(x, y, z)` triples.
    ///
    /// # Errors
    /// Returns [`VolGridError::InvalidInput`] if the slices differ in
    /// length, are empty, contain non-finite values, or `smoothing` is
    /// negative. Returns [`VolGridError::NumericalError`] if the
    /// least-squares solve fails or produces non-finite coefficients.
    pub fn fit(xs: &[f64], ys: &[f64], zs: &[f64], smoothing: f64) -> error::Result<Self> {
        validate_non_negative(smoothing, "smoothing")?;
        if xs.len() != ys.len() || xs.len() != zs.len() {
            return Err(VolGridError::InvalidInput {
                message: format!(
                    "x, y and z must have the same length, got {}, {} and {}",
                    xs.len(),
                    ys.len(),
                    zs.len()
                ),
            });
        }
        if xs.is_empty() {
            return Err(VolGridError::InvalidInput {
                message: "smoothing spline needs at least one point".into(),
            });
        }
        if xs.iter().chain(ys).chain(zs).any(|v| !v.is_finite()) {
            return Err(VolGridError::InvalidInput {
                message: "smoothing spline data must be finite".into(),
            });
        }

        let n_distinct_x = count_distinct(xs);
        let n_distinct_y = count_distinct(ys);
        let (x_lo, x_hi) = bounds(xs);
        let (y_lo, y_hi) = bounds(ys);
        let kx = MAX_DEGREE.min(n_distinct_x - 1);
        let ky = MAX_DEGREE.min(n_distinct_y - 1);

        let mut x_axis = Axis::new(x_lo, x_hi, kx, 0);
        let mut y_axis = Axis::new(y_lo, y_hi, ky, 0);
        let mut spline = Self::least_squares(x_axis.clone(), y_axis.clone(), xs, ys, zs)?;

        while spline.residual > smoothing {
            let grow_x = x_axis.n_basis() < n_distinct_x;
            let grow_y = y_axis.n_basis() < n_distinct_y;
            let next_x = if grow_x {
                Axis::new(x_lo, x_hi, kx, x_axis.n_interior() + 1)
            } else {
                x_axis.clone()
            };
            let next_y = if grow_y {
                Axis::new(y_lo, y_hi, ky, y_axis.n_interior() + 1)
            } else {
                y_axis.clone()
            };
            if !(grow_x || grow_y) || next_x.n_basis() * next_y.n_basis() > xs.len() {
                break;
            }
            x_axis = next_x;
            y_axis = next_y;
            spline = Self::least_squares(x_axis.clone(), y_axis.clone(), xs, ys, zs)?;
        }

        #[cfg(feature = "logging")]
        tracing::debug!(
            n_points = xs.len(),
            x_degree = spline.x_axis.degree,
            y_degree = spline.y_axis.degree,
            x_interior_knots = spline.x_axis.n_interior(),
            y_interior_knots = spline.y_axis.n_interior(),
            residual = spline.residual,
            smoothing,
            "smoothing spline fitted"
        );

        Ok(spline)
    }

    fn least_squares(
        x_axis: Axis,
        y_axis: Axis,
        xs: &[f64],
        ys: &[f64],
        zs: &[f64],
    ) -> error::Result<Self> {
        let nx = x_axis.n_basis();
        let ny = y_axis.n_basis();
        let m = xs.len();

        let mut design = DMatrix::<f64>::zeros(m, nx * ny);
        for (row, (&x, &y)) in xs.iter().zip(ys).enumerate() {
            let bx = x_axis.basis(x);
            let by = y_axis.basis(y);
            for (ix, &vx) in bx.iter().enumerate().filter(|(_, v)| **v != 0.0) {
                for (iy, &vy) in by.iter().enumerate() {
                    design[(row, ix * ny + iy)] = vx * vy;
                }
            }
        }
        let rhs = DVector::from_column_slice(zs);

        let coeffs = design
            .clone()
            .svd(true, true)
            .solve(&rhs, SVD_EPS)
            .map_err(|e| VolGridError::NumericalError {
                message: format!("spline least-squares solve failed: {e}"),
            })?;
        if coeffs.iter().any(|c| !c.is_finite()) {
            return Err(VolGridError::NumericalError {
                message: "spline coefficients are not finite".into(),
            });
        }

        let residual = (&design * &coeffs - &rhs).norm_squared();
        Ok(Self {
            x_axis,
            y_axis,
            coeffs: coeffs.iter().copied().collect(),
            residual,
        })
    }

    /// Evaluate the spline at `(x, y)`. Points outside the fitted box are
    /// clamped to its edge.
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        let bx = self.x_axis.basis(x);
        let by = self.y_axis.basis(y);
        let ny = by.len();
        let mut total = 0.0;
        for (ix, &vx) in bx.iter().enumerate().filter(|(_, v)| **v != 0.0) {
            for (iy, &vy) in by.iter().enumerate() {
                total += vx * vy * self.coeffs[ix * ny + iy];
            }
        }
        total
    }

    /// Evaluate on the mesh `xs × ys`; the result is indexed `[y][x]`.
    pub fn evaluate_mesh(&self, xs: &[f64], ys: &[f64]) -> Vec<Vec<f64>> {
        ys.iter()
            .map(|&y| xs.iter().map(|&x| self.evaluate(x, y)).collect())
            .collect()
    }

    /// Residual sum of squares of the fit.
    pub fn residual(&self) -> f64 {
        self.residual
    }

    /// Polynomial degree on the x and y axes.
    pub fn degrees(&self) -> (usize, usize) {
        (self.x_axis.degree, self.y_axis.degree)
    }

    /// Number of interior knots on the x and y axes.
    pub fn interior_knots(&self) -> (usize, usize) {
        (self.x_axis.n_interior(), self.y_axis.n_interior())
    }
}

fn bounds(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

fn count_distinct(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

/// `n` evenly spaced points from `lo` to `hi` inclusive.
pub(crate) fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}
