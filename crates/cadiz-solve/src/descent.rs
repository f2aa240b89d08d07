//! Bounded, sum-constrained gradient minimizer.
//!
//! Minimizes an objective over the set `{ w : sum(w) = 1, lower <= w_i <=
//! upper }` using numerically differentiated gradients projected onto the
//! tangent space of the equality constraint, with a backtracking line
//! search. Iterates stay feasible through clamping and renormalization.
//!
//! The minimizer never panics on bad objectives: a non-finite objective or
//! gradient terminates the run with `converged = false`, letting the
//! caller apply its fallback policy.

use ndarray::Array1;

/// Stopping parameters for the minimizer.
#[derive(Debug, Clone, Copy)]
pub struct DescentConfig {
    /// Iteration cap.
    pub max_iterations: usize,
    /// Stopping tolerance on the projected gradient norm and step size.
    pub tolerance: f64,
}

/// Outcome of a minimization run.
#[derive(Debug, Clone)]
pub struct DescentOutcome {
    /// Final iterate.
    pub x: Array1<f64>,
    /// Objective value at the final iterate.
    pub objective: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether a stopping criterion was met before the iteration cap.
    pub converged: bool,
}

/// Projects a point onto the feasible set: per-element bounds plus the
/// sum-to-one equality constraint.
///
/// Clamping and rescaling interact, so a few rounds are applied; the
/// residual after the loop is within line-search noise.
pub fn project(x: &Array1<f64>, lower: f64, upper: f64) -> Array1<f64> {
    let n = x.len();
    let mut out = x.mapv(|v| if v.is_finite() { v.clamp(lower, upper) } else { lower });
    for _ in 0..8 {
        let sum: f64 = out.sum();
        if (sum - 1.0).abs() < 1e-12 {
            break;
        }
        if sum.abs() < 1e-12 {
            out.fill(1.0 / n as f64);
        } else {
            out.mapv_inplace(|v| v / sum);
        }
        out.mapv_inplace(|v| v.clamp(lower, upper));
    }
    out
}

/// Central-difference gradient of `f` at `x`.
fn numerical_gradient<F>(f: &F, x: &Array1<f64>) -> Array1<f64>
where
    F: Fn(&Array1<f64>) -> f64,
{
    let mut grad = Array1::zeros(x.len());
    let mut probe = x.clone();
    for i in 0..x.len() {
        let h = 1e-7 * (1.0 + x[i].abs());
        let orig = x[i];
        probe[i] = orig + h;
        let f_plus = f(&probe);
        probe[i] = orig - h;
        let f_minus = f(&probe);
        probe[i] = orig;
        grad[i] = (f_plus - f_minus) / (2.0 * h);
    }
    grad
}

/// Minimizes `f` over the bounded simplex starting from `x0`.
pub fn minimize<F>(
    f: F,
    x0: &Array1<f64>,
    lower: f64,
    upper: f64,
    config: &DescentConfig,
) -> DescentOutcome
where
    F: Fn(&Array1<f64>) -> f64,
{
    let mut x = project(x0, lower, upper);
    let mut fx = f(&x);

    if !fx.is_finite() {
        return DescentOutcome {
            x,
            objective: fx,
            iterations: 0,
            converged: false,
        };
    }

    let mut converged = false;
    let mut iterations = 0;

    for iter in 1..=config.max_iterations {
        iterations = iter;

        let grad = numerical_gradient(&f, &x);
        if grad.iter().any(|g| !g.is_finite()) {
            return DescentOutcome {
                x,
                objective: fx,
                iterations,
                converged: false,
            };
        }

        // Project onto the tangent space of sum(w) = 1 so steps preserve
        // the equality constraint up to bound clamping.
        let mean_grad = grad.sum() / grad.len() as f64;
        let direction = grad.mapv(|g| g - mean_grad);
        let grad_norm = direction.dot(&direction).sqrt();

        if grad_norm < config.tolerance {
            converged = true;
            break;
        }

        // Backtracking line search for strict decrease.
        let mut step = 1.0;
        let mut advanced = false;
        while step > 1e-14 {
            let candidate = project(&(&x - &(&direction * step)), lower, upper);
            let f_candidate = f(&candidate);
            if f_candidate.is_finite() && f_candidate < fx - 1e-15 {
                let moved = (&candidate - &x).iter().fold(0.0f64, |m, d| m.max(d.abs()));
                x = candidate;
                fx = f_candidate;
                advanced = true;
                if moved < config.tolerance {
                    converged = true;
                }
                break;
            }
            step *= 0.5;
        }

        if !advanced {
            // No descent direction within the feasible set: constrained
            // stationary point.
            converged = true;
            break;
        }
        if converged {
            break;
        }
    }

    DescentOutcome {
        x,
        objective: fx,
        iterations,
        converged,
    }
}
