//! Normal-distribution helpers used to turn win percentages into sigma
//! values (and back) for the comeback charts.
//!
//! Win percentages near 0 % and 100 % are compressed on a linear axis, so
//! every line is plotted and fitted in sigma space: `sigma = Φ⁻¹(percent)`.

use std::f64::consts::SQRT_2;

/// Split point between the central rational approximation and the tail
/// expansion of the inverse CDF.
const P_LOW: f64 = 0.02425;
const P_HIGH: f64 = 1.0 - P_LOW;

// Central-region rational approximation coefficients.
const A: [f64; 6] = [
    -3.969_683_028_665_376e1,
    2.209_460_984_245_205e2,
    -2.759_285_104_469_687e2,
    1.383_577_518_672_690e2,
    -3.066_479_806_614_716e1,
    2.506_628_277_459_239,
];
const B: [f64; 5] = [
    -5.447_609_879_822_406e1,
    1.615_858_368_580_409e2,
    -1.556_989_798_598_866e2,
    6.680_131_188_771_972e1,
    -1.328_068_155_288_572e1,
];

// Tail expansion coefficients (in q = sqrt(-2 ln p)).
const C: [f64; 6] = [
    -7.784_894_002_430_293e-3,
    -3.223_964_580_411_365e-1,
    -2.400_758_277_161_838,
    -2.549_732_539_343_734,
    4.374_664_141_464_968,
    2.938_163_982_698_783,
];
const D: [f64; 4] = [
    7.784_695_709_041_462e-3,
    3.224_671_290_700_398e-1,
    2.445_134_137_142_996,
    3.754_408_661_907_416,
];

/// Error function, Abramowitz & Stegun 7.1.26 (max abs error 1.5e-7).
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let z = x.abs();
    let t = 1.0 / (1.0 + P * z);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-z * z).exp();
    sign * y
}

/// Cumulative distribution function of `N(mean, stddev²)`.
///
/// `stddev` must be positive; anything else yields a meaningless (possibly
/// non-finite) value.
pub fn normal_cdf(x: f64, mean: f64, stddev: f64) -> f64 {
    let value = 0.5 * (1.0 + erf((x - mean) / (stddev * SQRT_2)));
    value.clamp(0.0, 1.0)
}

/// Standard normal CDF, `Φ(x)`.
pub fn std_normal_cdf(x: f64) -> f64 {
    normal_cdf(x, 0.0, 1.0)
}

/// Quantile function of `N(mean, stddev²)`.
///
/// Returns `-inf` for `p <= 0` and `+inf` for `p >= 1`. Between those the
/// result is a two-branch rational approximation (central region
/// `[0.02425, 0.97575]`, tail expansion outside it) with relative error
/// below 1.2e-9. The function is continuous and strictly increasing.
pub fn normal_inverse_cdf(p: f64, mean: f64, stddev: f64) -> f64 {
    if p.is_nan() {
        return f64::NAN;
    }
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    mean + stddev * std_normal_quantile(p)
}

/// Standard normal quantile, `Φ⁻¹(p)`. Same edge behavior as
/// [`normal_inverse_cdf`].
pub fn std_normal_inverse_cdf(p: f64) -> f64 {
    normal_inverse_cdf(p, 0.0, 1.0)
}

fn std_normal_quantile(p: f64) -> f64 {
    if p < P_LOW {
        tail(p)
    } else if p <= P_HIGH {
        let q = p - 0.5;
        let r = q * q;
        let num = ((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5];
        let den = ((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0;
        num * q / den
    } else {
        -tail(1.0 - p)
    }
}

/// Lower-tail expansion; the upper tail is its mirror image.
fn tail(p: f64) -> f64 {
    let q = (-2.0 * p.ln()).sqrt();
    let num = ((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5];
    let den = (((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0;
    num / den
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdf_known_values() {
        assert!((std_normal_cdf(0.0) - 0.5).abs() < 1e-9);
        assert!((std_normal_cdf(1.96) - 0.975_002).abs() < 1e-6);
        assert!((std_normal_cdf(-1.0) - 0.158_655).abs() < 1e-6);
    }

    #[test]
    fn test_cdf_with_mean_and_stddev() {
        // 110 is one sigma above a mean of 100 with stddev 10
        let p = normal_cdf(110.0, 100.0, 10.0);
        assert!((p - 0.841_345).abs() < 1e-6, "got {p}");
    }

    #[test]
    fn test_cdf_stays_in_unit_interval() {
        for x in [-40.0, -8.0, 8.0, 40.0] {
            let p = std_normal_cdf(x);
            assert!((0.0..=1.0).contains(&p), "x={x} p={p}");
        }
    }

    #[test]
    fn test_inverse_cdf_edges() {
        assert_eq!(std_normal_inverse_cdf(0.0), f64::NEG_INFINITY);
        assert_eq!(std_normal_inverse_cdf(-0.5), f64::NEG_INFINITY);
        assert_eq!(std_normal_inverse_cdf(1.0), f64::INFINITY);
        assert_eq!(std_normal_inverse_cdf(1.5), f64::INFINITY);
        assert_eq!(std_normal_inverse_cdf(0.5), 0.0);
    }

    #[test]
    fn test_inverse_cdf_known_quantiles() {
        assert!((std_normal_inverse_cdf(0.975) - 1.959_964).abs() < 1e-6);
        assert!((std_normal_inverse_cdf(0.01) + 2.326_348).abs() < 1e-6);
        assert!((normal_inverse_cdf(0.5, 3.0, 2.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_cdf_inverts_cdf() {
        let mut p = 2e-6;
        while p < 1.0 - 1e-6 {
            let back = std_normal_cdf(std_normal_inverse_cdf(p));
            assert!((back - p).abs() < 1e-6, "p={p} back={back}");
            p *= 1.37;
            if p > 0.5 {
                break;
            }
        }
        for p in [0.02, 0.02425, 0.3, 0.6, 0.97575, 0.99, 0.999_99, 1.0 - 2e-6] {
            let back = std_normal_cdf(std_normal_inverse_cdf(p));
            assert!((back - p).abs() < 1e-6, "p={p} back={back}");
        }
    }

    #[test]
    fn test_inverse_cdf_monotonic_across_branches() {
        let mut last = f64::NEG_INFINITY;
        let mut p = 0.001;
        while p < 0.999 {
            let x = std_normal_inverse_cdf(p);
            assert!(x > last, "not increasing at p={p}");
            last = x;
            p += 0.0005;
        }
    }

    #[test]
    fn test_inverse_cdf_continuous_at_split() {
        let below = std_normal_inverse_cdf(P_LOW - 1e-12);
        let above = std_normal_inverse_cdf(P_LOW + 1e-12);
        assert!((below - above).abs() < 1e-7, "below={below} above={above}");
    }
}
