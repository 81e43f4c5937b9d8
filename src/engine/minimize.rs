//! Coarse 1-D minimizer used to refine fitted line parameters.
//!
//! Plain gradient descent with a forward-difference gradient, a fixed difference
//! step and a fixed learning rate. Callers must supply a well-conditioned,
//! roughly convex objective whose gradient is of order one near the start
//! point; steep or multi-modal objectives will overshoot or stall.

/// Forward-difference step.
const GRADIENT_EPSILON: f64 = 1e-4;
/// Fixed descent step multiplier.
const LEARNING_RATE: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
pub struct MinimizeOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum {
    pub x: f64,
    pub value: f64,
    /// True when successive objective values settled within `tolerance`
    /// before the iteration budget ran out.
    pub converged: bool,
    pub iterations: usize,
}

/// Minimize `f` starting from `x0`.
pub fn minimize_scalar<F>(f: F, x0: f64, options: MinimizeOptions) -> Minimum
where
    F: Fn(f64) -> f64,
{
    let mut x = x0;
    let mut value = f(x);

    for iteration in 1..=options.max_iterations {
        let gradient = (f(x + GRADIENT_EPSILON) - value) / GRADIENT_EPSILON;
        let next_x = x - LEARNING_RATE * gradient;
        let next_value = f(next_x);

        if !next_value.is_finite() {
            tracing::debug!(x, iteration, "minimizer left the finite region");
            return Minimum {
                x,
                value,
                converged: false,
                iterations: iteration,
            };
        }

        let settled = (next_value - value).abs() < options.tolerance;
        x = next_x;
        value = next_value;
        if settled {
            return Minimum {
                x,
                value,
                converged: true,
                iterations: iteration,
            };
        }
    }

    Minimum {
        x,
        value,
        converged: false,
        iterations: options.max_iterations,
    }
}
