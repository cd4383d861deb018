use crate::constants::FLOAT_TOLERANCE;
use crate::errors::ConsolidatedError;
use std::cmp::Ordering;

// Validation
pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), ConsolidatedError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(ConsolidatedError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Same as [`validate_float_parameter`] but with both bounds excluded.
pub fn validate_open_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), ConsolidatedError> {
    if value.is_nan() || value <= min || max <= value {
        let ex_msg = format!("real value strictly between {} and {}", min, max);
        Err(ConsolidatedError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Calculate if a value is missing.
#[inline]
pub fn is_missing(value: &f64, missing: &f64) -> bool {
    value.is_nan() || value == missing
}

#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() < FLOAT_TOLERANCE
}

/// `a` is greater than `b` by more than the tolerance.
#[inline]
pub fn greater(a: f64, b: f64) -> bool {
    a - b > FLOAT_TOLERANCE
}

#[inline]
pub fn greater_or_eq(a: f64, b: f64) -> bool {
    b - a < FLOAT_TOLERANCE || a >= b
}

/// `a` is smaller than `b` by more than the tolerance.
#[inline]
pub fn smaller(a: f64, b: f64) -> bool {
    b - a > FLOAT_TOLERANCE
}

#[inline]
pub fn smaller_or_eq(a: f64, b: f64) -> bool {
    a - b < FLOAT_TOLERANCE || a <= b
}

/// `x * ln(x)`, zero for non positive values.
#[inline]
pub fn ln_func(x: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else {
        x * x.ln()
    }
}

/// Index of the first maximum.
pub fn first_max_index(values: &[f64]) -> usize {
    let mut max_index = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[max_index] {
            max_index = i;
        }
    }
    max_index
}

/// Lower median: element `(n + 1) / 2 - 1` of the sorted values.
pub fn lower_median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    Some(sorted[(sorted.len() + 1) / 2 - 1])
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with the `n - 1` denominator, zero for less than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Quantile function of the standard normal distribution.
///
/// Rational approximation with a relative error below 1.2e-9 over the
/// whole open interval (0, 1).
pub fn normal_inverse(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

/// Extra errors expected on unseen data for a leaf with `n` instances and
/// `e` training errors, at confidence factor `cf`.
pub fn add_errs(n: f64, e: f64, cf: f64) -> f64 {
    if cf > 0.5 {
        return 0.0;
    }
    if e < 1.0 {
        let base = n * (1.0 - cf.powf(1.0 / n));
        if e == 0.0 {
            return base;
        }
        return base + e * (add_errs(n, 1.0, cf) - base);
    }
    if e + 0.5 >= n {
        return (n - e).max(0.0);
    }
    let z = normal_inverse(1.0 - cf);
    let f = (e + 0.5) / n;
    let r = (f + (z * z) / (2.0 * n) + z * ((f / n) - (f * f / n) + (z * z / (4.0 * n * n))).sqrt())
        / (1.0 + (z * z) / n);
    (r * n) - e
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lower_median() {
        assert_eq!(lower_median(&[3.0, 3.2, 3.1, 2.9]), Some(3.0));
        assert_eq!(lower_median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(lower_median(&[7.5]), Some(7.5));
        assert_eq!(lower_median(&[]), None);
    }

    #[test]
    fn test_first_max_index_takes_first() {
        assert_eq!(first_max_index(&[1.0, 3.0, 3.0, 2.0]), 1);
    }

    #[test]
    fn test_normal_inverse() {
        assert_relative_eq!(normal_inverse(0.5), 0.0, epsilon = 1e-9);
        assert_relative_eq!(normal_inverse(0.75), 0.6744897501960817, epsilon = 1e-8);
        assert_relative_eq!(normal_inverse(0.975), 1.959963984540054, epsilon = 1e-8);
        assert_relative_eq!(normal_inverse(0.01), -2.326347874040841, epsilon = 1e-8);
    }

    #[test]
    fn test_add_errs() {
        // Pure leaf of 6 instances at the default confidence.
        assert_relative_eq!(add_errs(6.0, 0.0, 0.25), 6.0 * (1.0 - 0.25_f64.powf(1.0 / 6.0)), epsilon = 1e-12);
        // Nearly all wrong.
        assert_relative_eq!(add_errs(4.0, 3.6, 0.25), 0.4, epsilon = 1e-12);
        let extra = add_errs(100.0, 10.0, 0.25);
        assert!(extra > 0.0 && extra < 10.0);
    }

    #[test]
    fn test_std_dev() {
        assert_relative_eq!(sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.138089935299395, epsilon = 1e-12);
        assert_eq!(sample_std_dev(&[1.0]), 0.0);
    }

    #[test]
    fn test_float_comparisons() {
        assert!(approx_eq(1.0, 1.0 + 1e-9));
        assert!(greater(1.0, 0.5));
        assert!(!greater(1.0, 1.0 - 1e-9));
        assert!(greater_or_eq(1.0 - 1e-9, 1.0));
        assert!(smaller(0.5, 1.0));
        assert!(smaller_or_eq(1.0 + 1e-9, 1.0));
    }
}
