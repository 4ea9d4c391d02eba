//! Calendar encodings for quarters

use crate::{MathError, Result};
use std::f64::consts::PI;

fn check_quarter(quarter: u32) -> Result<()> {
    if !(1..=4).contains(&quarter) {
        return Err(MathError::InvalidInput(format!(
            "Quarter must be between 1 and 4, got {}",
            quarter
        )));
    }
    Ok(())
}

/// Sine component of the cyclical quarter encoding
pub fn quarter_sin(quarter: u32) -> Result<f64> {
    check_quarter(quarter)?;
    Ok((2.0 * PI * (quarter as f64 - 1.0) / 4.0).sin())
}

/// Cosine component of the cyclical quarter encoding
pub fn quarter_cos(quarter: u32) -> Result<f64> {
    check_quarter(quarter)?;
    Ok((2.0 * PI * (quarter as f64 - 1.0) / 4.0).cos())
}

/// One-hot indicator row: `[is_q1, is_q2, is_q3, is_q4]`
pub fn quarter_one_hot(quarter: u32) -> Result<[f64; 4]> {
    check_quarter(quarter)?;
    let mut out = [0.0; 4];
    out[quarter as usize - 1] = 1.0;
    Ok(out)
}
