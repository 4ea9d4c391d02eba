//! # Dengue Forecast Workspace
//!
//! Umbrella crate over the workspace members.
//!
//! ## Example
//!
//! ```
//! use dengue_forecast_workspace::dengue_forecast::YearQuarter;
//!
//! let q = YearQuarter::new(2025, 4).unwrap();
//! assert_eq!(q.next().to_string(), "2026Q1");
//! ```

pub use dengue_forecast;
pub use epi_math;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_members_are_linked() {
        assert_eq!(dengue_forecast::NAME, "dengue_forecast");
        let lagged = epi_math::lag(&[Some(1.0), Some(2.0)], 1);
        assert_eq!(lagged, vec![None, Some(1.0)]);
    }
}
