use crate::error::{CalcError, CalcResult};
use serde::Serialize;

/// Ordinary least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit `ys` against `xs` by ordinary least squares.
///
/// Fails with `InvalidInput` when the slices differ in length, are empty,
/// or when `xs` has zero variance (the slope is undefined).
pub fn fit_linear_regression(xs: &[f64], ys: &[f64]) -> CalcResult<LinearFit> {
    if xs.len() != ys.len() {
        return Err(CalcError::InvalidInput(format!(
            "regression needs equal-length inputs, got {} xs and {} ys",
            xs.len(),
            ys.len()
        )));
    }
    if xs.is_empty() {
        return Err(CalcError::InvalidInput(
            "regression needs at least one point".to_string(),
        ));
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    // Centered sums keep the denominator exact for constant xs.
    let (sxx, sxy) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(sxx, sxy), (&x, &y)| {
            let dx = x - mean_x;
            (sxx + dx * dx, sxy + dx * (y - mean_y))
        });

    if sxx == 0.0 || !sxx.is_finite() {
        return Err(CalcError::InvalidInput(
            "regression xs have zero variance".to_string(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(CalcError::InvalidInput(
            "regression produced a non-finite line".to_string(),
        ));
    }
    Ok(LinearFit { slope, intercept })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line() {
        let fit = fit_linear_regression(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!(fit.intercept.abs() < 1e-12);
        assert!((fit.predict(10.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_noisy_line() {
        // y = -0.5x + 3 with symmetric noise
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let ys = [3.1, 2.4, 2.1, 1.4, 1.0];
        let fit = fit_linear_regression(&xs, &ys).unwrap();
        assert!((fit.slope + 0.52).abs() < 1e-9, "slope {}", fit.slope);
        assert!((fit.intercept - 3.04).abs() < 1e-9, "intercept {}", fit.intercept);
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = fit_linear_regression(&[], &[]).unwrap_err();
        assert!(matches!(err, CalcError::InvalidInput(_)));
    }

    #[test]
    fn test_constant_xs_rejected() {
        let err = fit_linear_regression(&[4.0, 4.0, 4.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, CalcError::InvalidInput(_)));
    }

    #[test]
    fn test_single_point_rejected() {
        assert!(fit_linear_regression(&[1.0], &[1.0]).is_err());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(fit_linear_regression(&[1.0, 2.0], &[1.0]).is_err());
    }
}
