//! Rolling window statistics
//!
//! `RollingWindow` is the streaming form; `rolling_mean` and `rolling_std`
//! apply it over a whole nullable series.

use crate::{MathError, Result};
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Fixed-size window over the most recent observations
#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl RollingWindow {
    /// Create a new window holding at most `period` values
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Push a new value, evicting the oldest once the window is full
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Whether the window holds `period` values
    pub fn is_full(&self) -> bool {
        self.values.len() == self.period
    }

    /// Mean of the window
    pub fn mean(&self) -> Result<f64> {
        if !self.is_full() {
            return Err(MathError::InsufficientData(format!(
                "Need {} values for a rolling mean, have {}",
                self.period,
                self.values.len()
            )));
        }

        Ok(self.sum / self.period as f64)
    }

    /// Sample standard deviation (n - 1 denominator) of the window
    pub fn std_dev(&self) -> Result<f64> {
        if !self.is_full() || self.period < 2 {
            return Err(MathError::InsufficientData(format!(
                "Need at least 2 and exactly {} values for a rolling std, have {}",
                self.period,
                self.values.len()
            )));
        }

        let std = self.values.iter().std_dev();
        if std.is_nan() {
            return Err(MathError::CalculationError(
                "Standard deviation is undefined for this window".to_string(),
            ));
        }
        Ok(std)
    }

    /// Get the window period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Clear all values
    pub fn reset(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }
}

/// Rolling mean over the `window` values ending at each position.
///
/// A position is `None` until the window is full or while any value inside
/// it is missing.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>> {
    rolling_apply(values, window, |w| w.mean().ok())
}

/// Rolling sample standard deviation, with the same null rules as [`rolling_mean`]
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>> {
    rolling_apply(values, window, |w| w.std_dev().ok())
}

fn rolling_apply<F>(values: &[Option<f64>], window: usize, stat: F) -> Result<Vec<Option<f64>>>
where
    F: Fn(&RollingWindow) -> Option<f64>,
{
    let mut rolling = RollingWindow::new(window)?;
    let mut out = Vec::with_capacity(values.len());

    for value in values {
        match value {
            Some(v) if v.is_finite() => {
                rolling.update(*v);
                out.push(if rolling.is_full() { stat(&rolling) } else { None });
            }
            _ => {
                // a gap invalidates every window that would contain it
                rolling.reset();
                out.push(None);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_rolling_window_mean_and_std() {
        let mut window = RollingWindow::new(3).unwrap();
        window.update(1.0);
        window.update(2.0);
        assert!(window.mean().is_err());

        window.update(3.0);
        assert_approx_eq!(window.mean().unwrap(), 2.0);
        assert_approx_eq!(window.std_dev().unwrap(), 1.0);

        window.update(7.0);
        assert_approx_eq!(window.mean().unwrap(), 4.0);
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(RollingWindow::new(0).is_err());
        assert!(rolling_mean(&[Some(1.0)], 0).is_err());
    }

    #[test]
    fn test_rolling_mean_nulls_propagate() {
        let values = vec![Some(1.0), Some(2.0), None, Some(4.0), Some(6.0), Some(8.0)];
        let out = rolling_mean(&values, 2).unwrap();
        assert_eq!(out, vec![None, Some(1.5), None, None, Some(5.0), Some(7.0)]);
    }

    #[test]
    fn test_rolling_std_window_of_one_is_null() {
        let values = vec![Some(1.0), Some(2.0)];
        let out = rolling_std(&values, 1).unwrap();
        assert_eq!(out, vec![None, None]);
    }
}
