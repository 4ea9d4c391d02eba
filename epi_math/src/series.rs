//! Shifts and pointwise transforms on nullable series

/// Shift a series forward by `periods`; the first `periods` positions become `None`
pub fn lag<T: Copy>(values: &[Option<T>], periods: usize) -> Vec<Option<T>> {
    (0..values.len())
        .map(|i| if i >= periods { values[i - periods] } else { None })
        .collect()
}

/// Relative change from `base` to `current`, dividing by `max(|base|, min_base)`.
///
/// A `min_base` of 1 keeps count series defined after a zero count. `None`
/// when either side is missing or the divisor is zero.
pub fn pct_change(current: &[Option<f64>], base: &[Option<f64>], min_base: f64) -> Vec<Option<f64>> {
    current
        .iter()
        .zip(base.iter())
        .map(|(c, b)| match (c, b) {
            (Some(c), Some(b)) => {
                let divisor = b.abs().max(min_base);
                (divisor != 0.0).then(|| (c - b) / divisor)
            }
            _ => None,
        })
        .collect()
}

/// `ln(1 + x)` for non-negative values; negative inputs map to `None`
pub fn log1p(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| v.filter(|x| *x >= 0.0).map(f64::ln_1p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lag() {
        let values = vec![Some(1), Some(2), Some(3)];
        assert_eq!(lag(&values, 1), vec![None, Some(1), Some(2)]);
        assert_eq!(lag(&values, 0), values);
        assert_eq!(lag(&values, 5), vec![None, None, None]);
    }

    #[test]
    fn test_pct_change_zero_base() {
        let current = vec![Some(10.0), Some(5.0), None];
        let base = vec![Some(5.0), Some(0.0), Some(1.0)];
        assert_eq!(pct_change(&current, &base, 0.0), vec![Some(1.0), None, None]);
        assert_eq!(
            pct_change(&current, &base, 1.0),
            vec![Some(1.0), Some(5.0), None]
        );
        assert_eq!(pct_change(&[Some(0.0)], &[Some(0.0)], 1.0), vec![Some(0.0)]);
    }

    #[test]
    fn test_log1p() {
        let out = log1p(&[Some(0.0), Some(-1.0), None]);
        assert_eq!(out, vec![Some(0.0), None, None]);
    }
}
