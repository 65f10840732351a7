use std::fmt;

use serde::{Deserialize, Serialize};

/// Summary of a batch of values.
///
/// Variance is the population variance (divided by `count`, not
/// `count - 1`), which is what the reports compare across agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Middle value; the mean of the two middle values for an even count.
    pub median: f64,
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Computes statistics from unsorted values.
    ///
    /// Returns `None` for an empty input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use arena2048_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([5.0, 2.0, 4.0, 1.0, 3.0]).unwrap();
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.mean, 3.0);
    /// assert_eq!(stats.median, 3.0);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Like [`Self::new`], for values already sorted in ascending order.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let count = sorted_values.len();
        let n = count as f64;
        let mean = sorted_values.iter().sum::<f64>() / n;
        let mid = count / 2;
        let median = if count % 2 == 0 {
            f64::midpoint(sorted_values[mid - 1], sorted_values[mid])
        } else {
            sorted_values[mid]
        };
        let variance = sorted_values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / n;

        Some(Self {
            count,
            min,
            max,
            mean,
            median,
            std_dev: variance.sqrt(),
        })
    }
}

impl fmt::Display for DescriptiveStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={} min={:.1} median={:.1} mean={:.1} max={:.1} sd={:.1}",
            self.count, self.min, self.median, self.mean, self.max, self.std_dev
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_none() {
        assert!(DescriptiveStats::new(std::iter::empty()).is_none());
    }

    #[test]
    fn test_single_value() {
        let stats = DescriptiveStats::new([42.0]).unwrap();
        assert_eq!(stats.count, 1);
        assert!((stats.median - 42.0).abs() < f64::EPSILON);
        assert!(stats.std_dev.abs() < f64::EPSILON);
    }

    #[test]
    fn test_even_count_median_and_spread() {
        let stats = DescriptiveStats::new([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.median - 4.5).abs() < 1e-12);
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "sorted")]
    fn test_from_sorted_rejects_unsorted() {
        let _ = DescriptiveStats::from_sorted(&[3.0, 1.0]);
    }

    #[test]
    fn test_serde_field_names() {
        let stats = DescriptiveStats::new([1.0, 3.0]).unwrap();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["median"], 2.0);
    }
}
