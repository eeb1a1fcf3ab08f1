//! # Statistic Steps
//!
//! Each step is a pure function of the batch with no shared mutable state;
//! retry scheduling lives entirely at the execution engine boundary, so
//! steps return explicit results rather than driving retries themselves.
//!
//! Numeric semantics: `average = sum / n`; `std_dev` is the population
//! standard deviation (denominator `n`, not `n - 1`); min/max ties resolve
//! to the first-encountered value in arrival order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::batch::Batch;

/// The four independent statistics computed per batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    Min,
    Max,
    Average,
    StdDev,
}

impl StepKind {
    /// All steps in submission order
    pub const ALL: [StepKind; 4] = [
        StepKind::Min,
        StepKind::Max,
        StepKind::Average,
        StepKind::StdDev,
    ];

    /// Compute this statistic over the batch
    pub fn compute(&self, batch: &Batch) -> Result<f64, StepError> {
        match self {
            StepKind::Min => minimum(batch),
            StepKind::Max => maximum(batch),
            StepKind::Average => average(batch),
            StepKind::StdDev => std_dev(batch),
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Min => "Min",
            StepKind::Max => "Max",
            StepKind::Average => "Average",
            StepKind::StdDev => "StdDev",
        };
        write!(f, "{name}")
    }
}

/// Errors from a single statistic computation
#[derive(Debug, Clone, thiserror::Error)]
pub enum StepError {
    #[error("{step} is undefined over an empty batch")]
    EmptyBatch { step: StepKind },
}

fn values(batch: &Batch, step: StepKind) -> Result<impl Iterator<Item = f64> + '_, StepError> {
    if batch.is_empty() {
        return Err(StepError::EmptyBatch { step });
    }
    Ok(batch.readings().iter().map(|r| r.value))
}

/// Minimum value; ties resolve to the first-encountered reading
pub fn minimum(batch: &Batch) -> Result<f64, StepError> {
    let mut iter = values(batch, StepKind::Min)?;
    let first = iter.next().expect("non-empty batch");
    Ok(iter.fold(first, |min, v| if v < min { v } else { min }))
}

/// Maximum value; ties resolve to the first-encountered reading
pub fn maximum(batch: &Batch) -> Result<f64, StepError> {
    let mut iter = values(batch, StepKind::Max)?;
    let first = iter.next().expect("non-empty batch");
    Ok(iter.fold(first, |max, v| if v > max { v } else { max }))
}

/// Arithmetic mean: `sum / n`
pub fn average(batch: &Batch) -> Result<f64, StepError> {
    let sum: f64 = values(batch, StepKind::Average)?.sum();
    Ok(sum / batch.len() as f64)
}

/// Population standard deviation: `sqrt(sum((v - avg)^2) / n)`
///
/// Shares one summation pass for the mean, then one squared-difference pass.
pub fn std_dev(batch: &Batch) -> Result<f64, StepError> {
    let n = batch.len() as f64;
    let sum: f64 = values(batch, StepKind::StdDev)?.sum();
    let avg = sum / n;

    let sum_sq_diff: f64 = batch
        .readings()
        .iter()
        .map(|r| {
            let diff = r.value - avg;
            diff * diff
        })
        .sum();

    Ok((sum_sq_diff / n).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{Batcher, Reading};
    use chrono::Utc;

    fn batch_of(values: &[f64]) -> Batch {
        let mut batcher = Batcher::new(values.len());
        let mut frozen = None;
        for &v in values {
            frozen = batcher.append(Reading::new(Utc::now(), v));
        }
        frozen.expect("batch at capacity")
    }

    #[test]
    fn test_reference_scenario() {
        // Capacity 4, values [48, 49, 52, 51]
        let batch = batch_of(&[48.0, 49.0, 52.0, 51.0]);

        assert_eq!(minimum(&batch).unwrap(), 48.0);
        assert_eq!(maximum(&batch).unwrap(), 52.0);
        assert_eq!(average(&batch).unwrap(), 50.0);
        // sqrt((4 + 1 + 4 + 1) / 4) = sqrt(2.5)
        let sd = std_dev(&batch).unwrap();
        assert!((sd - 2.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_single_reading() {
        let batch = batch_of(&[42.0]);
        assert_eq!(minimum(&batch).unwrap(), 42.0);
        assert_eq!(maximum(&batch).unwrap(), 42.0);
        assert_eq!(average(&batch).unwrap(), 42.0);
        assert_eq!(std_dev(&batch).unwrap(), 0.0);
    }

    #[test]
    fn test_std_dev_zero_iff_all_equal() {
        let equal = batch_of(&[5.0; 7]);
        assert_eq!(std_dev(&equal).unwrap(), 0.0);

        let unequal = batch_of(&[5.0, 5.0, 5.1]);
        assert!(std_dev(&unequal).unwrap() > 0.0);
    }

    #[test]
    fn test_negative_values() {
        let batch = batch_of(&[-3.0, -1.0, -2.0]);
        assert_eq!(minimum(&batch).unwrap(), -3.0);
        assert_eq!(maximum(&batch).unwrap(), -1.0);
        assert_eq!(average(&batch).unwrap(), -2.0);
    }

    #[test]
    fn test_min_le_average_le_max() {
        let batch = batch_of(&[49.7, 50.2, 50.0, 49.9, 50.3]);
        let min = minimum(&batch).unwrap();
        let avg = average(&batch).unwrap();
        let max = maximum(&batch).unwrap();
        assert!(min <= avg && avg <= max);
    }

    #[test]
    fn test_all_step_kinds_dispatch() {
        let batch = batch_of(&[1.0, 2.0, 3.0]);
        assert_eq!(StepKind::Min.compute(&batch).unwrap(), 1.0);
        assert_eq!(StepKind::Max.compute(&batch).unwrap(), 3.0);
        assert_eq!(StepKind::Average.compute(&batch).unwrap(), 2.0);
        assert!(StepKind::StdDev.compute(&batch).unwrap() > 0.0);
    }
}
