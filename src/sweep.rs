//! Parallel sweep over the streamflow coefficient of a linear reservoir.
//!
//! Each coefficient gets its own [Simulation](../simulation/struct.Simulation.html); engines are never shared
//! between threads.  Fits are scored by the RMSE of simulated against observed streamflow.
use crate::errors::{SimError, SimResult};
use crate::forcing::Forcing;
use crate::reservoir::{LinearReservoir, STREAMFLOW};
use crate::simulation::Mode;
use crate::utils;
use log::info;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

/// Holder struct for goodness-of-fit of one coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Fit {
    /// Linear streamflow coefficient.
    pub coefficient: f64,
    /// Root mean square error of simulated streamflow.
    pub rmse: f64,
}

/// Result of one member of a sweep.
#[derive(Debug, Clone)]
pub struct Trial {
    /// Coefficient and its score.
    pub fit: Fit,
    /// Simulated streamflow series.
    pub streamflow: Vec<f64>,
}

/// Sweep configuration, set with a builder pattern.
#[derive(Debug, Clone)]
pub struct Sweep {
    forcing: Arc<Forcing>,
    coefficients: Vec<f64>,
    time: Option<Vec<f64>>,
    mode: Mode,
    storage: f64,
}

impl Sweep {
    /// Create a sweep over `forcing` with a single member, `k = 1`.
    pub fn new<F: Into<Arc<Forcing>>>(forcing: F) -> Self {
        Sweep {
            forcing: forcing.into(),
            coefficients: vec![1.0],
            time: None,
            mode: Mode::default(),
            storage: 0.0,
        }
    }

    /// Use `n` members with coefficients `(i + 1) / n`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stockflow::prelude::*;
    ///
    /// # fn main() -> Result<(), SimError> {
    /// let forcing = Forcing::new(vec![1.0], vec![0.0], vec![0.0])?;
    /// let sweep = Sweep::new(forcing).members(4);
    /// assert_eq!(sweep.ks(), &[0.25, 0.5, 0.75, 1.0]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn members(mut self, n: usize) -> Self {
        self.coefficients = (0..n).map(|i| (i + 1) as f64 / n as f64).collect();
        self
    }

    /// Use an explicit set of coefficients.
    pub fn coefficients(mut self, ks: Vec<f64>) -> Self {
        self.coefficients = ks;
        self
    }

    /// Draw `n` coefficients uniformly from `range`, seeding the rng with `seed` for reproducibility.
    /// An empty range yields `n` copies of its start; a non-finite bound is an error.
    pub fn sample(mut self, range: Range<f64>, n: usize, seed: u64) -> SimResult<Self> {
        if !range.start.is_finite() || !range.end.is_finite() {
            return Err(SimError::InvalidRange(format!("{:?}", range)));
        }
        if range.start >= range.end {
            self.coefficients = vec![range.start; n];
            return Ok(self);
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let dist = Uniform::from(range);
        self.coefficients = (0..n).map(|_| dist.sample(&mut rng)).collect();
        Ok(self)
    }

    /// Set the time grid.  Defaults to one step per forcing row.
    pub fn time(mut self, time: Vec<f64>) -> Self {
        self.time = Some(time);
        self
    }

    /// Set the integration mode.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the initial storage of every member.
    pub fn storage(mut self, s0: f64) -> Self {
        self.storage = s0;
        self
    }

    /// Coefficients of the sweep members.
    pub fn ks(&self) -> &[f64] {
        &self.coefficients
    }

    fn grid(&self) -> Vec<f64> {
        match &self.time {
            Some(t) => t.clone(),
            None => utils::arange(0.0, self.forcing.len() as f64, 1.0),
        }
    }

    /// Simulate every member in parallel and score it against observed streamflow.
    pub fn run(&self) -> SimResult<Vec<Trial>> {
        info!(
            "Sweeping {} coefficients over {} time steps.",
            self.coefficients.len(),
            self.grid().len()
        );
        let trials = self
            .coefficients
            .par_iter()
            .map(|k| self.trial(*k))
            .collect::<SimResult<Vec<Trial>>>()?;
        if let (Some(b), Some(w)) = (best(&trials), worst(&trials)) {
            info!("Best k = {}, rmse = {}", b.fit.coefficient, b.fit.rmse);
            info!("Worst k = {}, rmse = {}", w.fit.coefficient, w.fit.rmse);
        }
        Ok(trials)
    }

    fn trial(&self, k: f64) -> SimResult<Trial> {
        let sim = LinearReservoir::new(Arc::clone(&self.forcing))
            .coefficient(k)
            .storage(self.storage)
            .simulate(self.grid(), self.mode)?;
        let streamflow = sim.series(STREAMFLOW)?;
        if streamflow.len() > self.forcing.len() {
            return Err(SimError::InvalidTimeGrid(format!(
                "{} time points but only {} observations",
                streamflow.len(),
                self.forcing.len()
            )));
        }
        let rmse = utils::rmse(self.forcing.streamflow(), &streamflow);
        Ok(Trial {
            fit: Fit {
                coefficient: k,
                rmse,
            },
            streamflow,
        })
    }
}

/// Trial with the lowest RMSE.
pub fn best(trials: &[Trial]) -> Option<&Trial> {
    trials.iter().min_by(|a, b| a.fit.rmse.total_cmp(&b.fit.rmse))
}

/// Trial with the highest RMSE.
pub fn worst(trials: &[Trial]) -> Option<&Trial> {
    trials.iter().max_by(|a, b| a.fit.rmse.total_cmp(&b.fit.rmse))
}

/// Fits of a set of trials, for recording with [record](../utils/fn.record.html).
pub fn fits(trials: &[Trial]) -> Vec<Fit> {
    trials.iter().map(|x| x.fit).collect()
}
