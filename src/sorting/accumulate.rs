use super::{Accumulation, SortValue};

/// Partial fold of numeric samples. Partials merge losslessly, so a
/// parent's cumulative average is exact rather than an average of averages.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aggregate {
    sum: f64,
    count: usize,
    min: f64,
    max: f64,
}

impl Default for Aggregate {
    fn default() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Aggregate {
    pub fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.sum += value;
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn merge(&mut self, other: &Self) {
        self.sum += other.sum;
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn finish(&self, accumulation: Accumulation) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(match accumulation {
            Accumulation::Average => self.sum / self.count as f64,
            Accumulation::Sum => self.sum,
            Accumulation::Min => self.min,
            Accumulation::Max => self.max,
        })
    }
}

/// Text counterpart of [`Aggregate`]: keeps the lexicographic extremes.
#[derive(Clone, Debug, Default, PartialEq)]
pub(super) struct TextAggregate {
    min: Option<String>,
    max: Option<String>,
}

impl TextAggregate {
    pub(super) fn push(&mut self, value: &str) {
        if self.min.as_deref().is_none_or(|current| value < current) {
            self.min = Some(value.to_owned());
        }
        if self.max.as_deref().is_none_or(|current| value > current) {
            self.max = Some(value.to_owned());
        }
    }

    pub(super) fn merge(&mut self, other: &Self) {
        if let Some(min) = &other.min {
            self.push(min);
        }
        if let Some(max) = &other.max {
            self.push(max);
        }
    }

    pub(super) fn finish(&self, accumulation: Accumulation) -> Option<SortValue> {
        let picked = match accumulation {
            Accumulation::Max => self.max.as_ref(),
            _ => self.min.as_ref(),
        };
        picked.cloned().map(SortValue::Text)
    }
}
