//! Trailing simple moving average.
//!
//! Mean over the last `period` values. Lookback: period - 1 (first defined
//! value at index period-1). Earlier positions are `None`.
//! Cost is O(n * period).

#[derive(Debug, Clone)]
pub struct RollingMean {
    period: usize,
    name: String,
}

impl RollingMean {
    /// Moving average of close prices, named `ma{period}`.
    pub fn close(period: usize) -> Self {
        Self::named(period, format!("ma{period}"))
    }

    /// Volume baseline, named `volAvg{period}`.
    pub fn volume(period: usize) -> Self {
        Self::named(period, format!("volAvg{period}"))
    }

    fn named(period: usize, name: String) -> Self {
        assert!(period >= 1, "rolling mean period must be >= 1");
        Self { period, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    /// Compute the series over `values`, returning one entry per input.
    pub fn compute(&self, values: &[f64]) -> Vec<Option<f64>> {
        let n = values.len();
        let mut result = vec![None; n];

        if n < self.period {
            return result;
        }

        // Windows are summed independently: a value depends only on the
        // observations inside its window. A window of equal values averages
        // to exactly that value, so a flat series ties its own mean.
        for i in (self.period - 1)..n {
            let window = &values[i + 1 - self.period..=i];
            let first = window[0];
            let mean = if window.iter().all(|v| *v == first) {
                first
            } else {
                window.iter().sum::<f64>() / self.period as f64
            };
            result[i] = Some(mean);
        }

        result
    }
}
