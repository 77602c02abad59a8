use polars::prelude::*;
use serde::Serialize;

use super::record::FieldSource;

/// Descriptive statistics for one numeric field. Every figure is `None`
/// when the field has no present values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Stats {
    pub count: usize,
    pub absent: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Calculate statistics over optional values using polars; absent entries are
/// nulls and never contribute
pub fn calculate_stats(values: &[Option<f64>]) -> Stats {
    let chunked: Float64Chunked = values.iter().copied().collect();
    let count = values.len() - chunked.null_count();

    if count == 0 {
        return Stats {
            absent: values.len(),
            ..Stats::default()
        };
    }

    Stats {
        count,
        absent: chunked.null_count(),
        mean: chunked.mean(),
        std_dev: chunked.std(1), // ddof=1 for sample std dev
        median: chunked.median(),
        min: chunked.min(),
        max: chunked.max(),
    }
}

/// Arithmetic mean of the present values, `None` when there are none
pub fn mean_of_present(values: &[Option<f64>]) -> Option<f64> {
    let chunked: Float64Chunked = values.iter().copied().collect();
    chunked.mean()
}

/// Statistics for every numeric field of a source, in field order
pub fn field_stats<S: FieldSource + ?Sized>(source: &S) -> Vec<(String, Stats)> {
    profiling::scope!("field_stats");
    source
        .numeric_fields()
        .into_iter()
        .map(|field| {
            let values: Vec<Option<f64>> =
                (0..source.len()).map(|i| source.numeric(i, &field)).collect();
            let stats = calculate_stats(&values);
            (field, stats)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_stats() {
        let data = vec![Some(1.0), Some(2.0), None, Some(3.0), Some(4.0), Some(5.0)];
        let stats = calculate_stats(&data);

        assert_eq!(stats.mean, Some(3.0));
        assert_eq!(stats.median, Some(3.0));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(5.0));
        assert_eq!(stats.count, 5);
        assert_eq!(stats.absent, 1);
    }

    #[test]
    fn test_all_absent() {
        let stats = calculate_stats(&[None, None]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.absent, 2);
        assert_eq!(stats.mean, None);
    }

    #[test]
    fn test_mean_of_present() {
        assert_eq!(mean_of_present(&[Some(10.0), Some(20.0), Some(30.0)]), Some(20.0));
        assert_eq!(mean_of_present(&[Some(10.0), None]), Some(10.0));
        assert_eq!(mean_of_present(&[None, None]), None);
        assert_eq!(mean_of_present(&[]), None);
    }
}
