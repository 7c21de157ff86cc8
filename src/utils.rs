//! Time grids, fit statistics and csv output.
use crate::errors::SimResult;
use serde::Serialize;
use std::path::Path;

/// Evenly spaced time grid from `start` up to, but excluding, `stop`.
///
/// # Examples
///
/// ```rust
/// let t = stockflow::utils::arange(0.0, 2.0, 0.5);
/// assert_eq!(t, vec![0.0, 0.5, 1.0, 1.5]);
/// ```
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || stop <= start {
        return Vec::new();
    }
    let n = ((stop - start) / step).ceil() as usize;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// Calculate the mean of a slice of f64 values.
///  - `numbers` is a reference to a slice of f64 values.
///  - Returns the mean of `numbers`, NaN if empty.
///
/// # Examples
///
/// ```rust
/// let numbers = vec![1.0, 1.5, 2.0, 2.5, 3.0];
/// let mn = stockflow::utils::mean(&numbers);
/// assert_eq!(2.0, mn);
/// ```
pub fn mean(numbers: &[f64]) -> f64 {
    let sum: f64 = numbers.iter().sum();
    sum / numbers.len() as f64
}

/// Root mean square error between `observed` and `simulated`, over their common length.
pub fn rmse(observed: &[f64], simulated: &[f64]) -> f64 {
    let sq: Vec<f64> = observed
        .iter()
        .zip(simulated)
        .map(|(o, s)| (o - s).powi(2))
        .collect();
    mean(&sq).sqrt()
}

/// Write records to csv file.
pub fn record<T: Serialize, P: AsRef<Path>>(rec: &[T], path: P) -> SimResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for i in rec {
        wtr.serialize(i)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arange_excludes_stop() {
        assert_eq!(arange(0.0, 365.0, 1.0).len(), 365);
        assert_eq!(arange(1.0, 1.0, 1.0), Vec::<f64>::new());
        assert!(arange(0.0, 1.0, 0.0).is_empty());
    }

    #[test]
    fn rmse_of_known_errors() {
        assert_eq!(rmse(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(rmse(&[0.0, 0.0], &[3.0, -3.0]), 3.0);
    }
}
