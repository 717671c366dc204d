use anyhow::Result;
use geom::{Duration, Pt2D};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::Sample;

/// Smooths the path of a route. Implementations have to behave like pure functions, since
/// playback for the same route may be generated from several threads at once.
pub trait CurveFitter: Sync {
    /// Returns exactly one fitted position per sample, or an error if the fit doesn't converge.
    fn fit(&self, samples: &[Sample], config: &CurveFitConfig) -> Result<Vec<Pt2D>>;
}

impl<T: CurveFitter + ?Sized> CurveFitter for &T {
    fn fit(&self, samples: &[Sample], config: &CurveFitConfig) -> Result<Vec<Pt2D>> {
        (**self).fit(samples, config)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveFitConfig {
    /// How many random subsets to try
    pub max_trials: usize,
    /// How many samples each trial fits, and the fewest inliers an acceptable fit can have
    pub min_samples: MinSamples,
    /// Samples further than this from the fit (in squared distance) are outliers
    pub residual_threshold: f64,
    /// Of the polynomials describing x and y over time
    #[serde(default = "default_degree")]
    pub degree: usize,
    #[serde(default)]
    pub seed: u64,
}

fn default_degree() -> usize {
    3
}

/// Higher degrees make the normal equations too ill-conditioned to be worth solving
const MAX_DEGREE: usize = 10;

/// Serialized as a plain number: integers are counts, anything else is a fraction of the samples.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MinSamples {
    Count(usize),
    Fraction(f64),
}

impl MinSamples {
    pub fn resolve(self, num_samples: usize) -> usize {
        match self {
            MinSamples::Count(count) => count,
            MinSamples::Fraction(fraction) => {
                (fraction.clamp(0.0, 1.0) * num_samples as f64).ceil() as usize
            }
        }
    }
}

impl CurveFitConfig {
    /// Tolerates many outliers; for areas where positions are noisy.
    pub fn stable() -> Self {
        Self {
            max_trials: 100,
            min_samples: MinSamples::Fraction(0.4),
            residual_threshold: 1.0 * 1.0,
            degree: default_degree(),
            seed: 0,
        }
    }

    /// Follows the samples closely.
    pub fn spline() -> Self {
        Self {
            max_trials: 1000,
            min_samples: MinSamples::Fraction(0.8),
            residual_threshold: 1.0 * 1.0,
            degree: default_degree(),
            seed: 0,
        }
    }
}

/// Robustly fits x(t) and y(t) as polynomials using RANSAC. The random number generator is seeded
/// from the config, so the same input always produces the same output.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ransac;

impl CurveFitter for Ransac {
    fn fit(&self, samples: &[Sample], config: &CurveFitConfig) -> Result<Vec<Pt2D>> {
        let n = samples.len();
        if config.degree > MAX_DEGREE {
            bail!("Degree {} is too high; at most {MAX_DEGREE} is supported", config.degree);
        }
        let num_coefficients = config.degree + 1;
        let subset_size = config.min_samples.resolve(n).max(num_coefficients);
        if n < subset_size {
            bail!("Need at least {subset_size} samples to fit, but only have {n}");
        }

        let t0 = samples[0].time;
        let span = samples[n - 1].time - t0;
        if span <= Duration::ZERO {
            bail!("All {n} samples happen at {t0}; can't fit anything over time");
        }
        // Normalize time to [0, 1] to keep the normal equations well-conditioned
        let ts: Vec<f64> = samples.iter().map(|s| (s.time - t0) / span).collect();
        let xs: Vec<f64> = samples.iter().map(|s| s.pos.x()).collect();
        let ys: Vec<f64> = samples.iter().map(|s| s.pos.y()).collect();

        let mut rng = StdRng::seed_from_u64(config.seed);
        // (inlier indices, sum of their squared residuals)
        let mut best: Option<(Vec<usize>, f64)> = None;
        for _ in 0..config.max_trials {
            let subset = rand::seq::index::sample(&mut rng, n, subset_size).into_vec();
            let model = match Polynomial2D::fit(&ts, &xs, &ys, &subset, config.degree) {
                Some(model) => model,
                None => continue,
            };

            let mut inliers = Vec::new();
            let mut residual = 0.0;
            for idx in 0..n {
                let err = model.squared_error(ts[idx], xs[idx], ys[idx]);
                if err <= config.residual_threshold {
                    inliers.push(idx);
                    residual += err;
                }
            }
            if inliers.len() < subset_size {
                continue;
            }

            let better = match best {
                Some((ref prev, prev_residual)) => {
                    inliers.len() > prev.len()
                        || (inliers.len() == prev.len() && residual < prev_residual)
                }
                None => true,
            };
            if better {
                let everything = inliers.len() == n;
                best = Some((inliers, residual));
                if everything {
                    break;
                }
            }
        }

        let inliers = match best {
            Some((inliers, _)) => inliers,
            None => bail!(
                "No fit with at least {subset_size} inliers after {} trials",
                config.max_trials
            ),
        };
        let model = match Polynomial2D::fit(&ts, &xs, &ys, &inliers, config.degree) {
            Some(model) => model,
            None => bail!("Refitting {} inliers failed", inliers.len()),
        };
        ts.iter().map(|t| model.eval(*t)).collect()
    }
}

struct Polynomial2D {
    // Lowest power first
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Polynomial2D {
    /// Least squares over the chosen indices. None if the system is singular.
    fn fit(ts: &[f64], xs: &[f64], ys: &[f64], indices: &[usize], degree: usize) -> Option<Self> {
        let m = degree + 1;
        let mut ata = vec![vec![0.0; m]; m];
        let mut atx = vec![0.0; m];
        let mut aty = vec![0.0; m];
        for idx in indices {
            let powers = powers(ts[*idx], m);
            for row in 0..m {
                for col in 0..m {
                    ata[row][col] += powers[row] * powers[col];
                }
                atx[row] += powers[row] * xs[*idx];
                aty[row] += powers[row] * ys[*idx];
            }
        }
        Some(Self {
            x: solve(ata.clone(), atx)?,
            y: solve(ata, aty)?,
        })
    }

    fn eval(&self, t: f64) -> Result<Pt2D> {
        let powers = powers(t, self.x.len());
        let x: f64 = self.x.iter().zip(&powers).map(|(c, p)| c * p).sum();
        let y: f64 = self.y.iter().zip(&powers).map(|(c, p)| c * p).sum();
        if !x.is_finite() || !y.is_finite() {
            bail!("Fit diverges at t={t}: ({x}, {y})");
        }
        Ok(Pt2D::new(x, y))
    }

    fn squared_error(&self, t: f64, x: f64, y: f64) -> f64 {
        let powers = powers(t, self.x.len());
        let fx: f64 = self.x.iter().zip(&powers).map(|(c, p)| c * p).sum();
        let fy: f64 = self.y.iter().zip(&powers).map(|(c, p)| c * p).sum();
        (fx - x).powi(2) + (fy - y).powi(2)
    }
}

fn powers(t: f64, count: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(count);
    let mut p = 1.0;
    for _ in 0..count {
        result.push(p);
        p *= t;
    }
    result
}

// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|r1, r2| a[*r1][col].abs().total_cmp(&a[*r2][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for k in (row + 1)..n {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }
    Some(x)
}
