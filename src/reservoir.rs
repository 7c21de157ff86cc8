//! Linear reservoir model built on the stock-and-flow engine.
//!
//! A single storage `S` gains precipitation `P`, loses evapotranspiration `ET` (capped at the water in storage)
//! and drains as streamflow `Q = k * S`.
use crate::errors::SimResult;
use crate::forcing::Forcing;
use crate::simulation::{Mode, Simulation};
use log::debug;
use std::sync::Arc;

/// Name of the storage stock.
pub const STORAGE: &str = "S";
/// Name of the precipitation flow.
pub const PRECIPITATION: &str = "P";
/// Name of the evapotranspiration flow.
pub const EVAPOTRANSPIRATION: &str = "ET";
/// Name of the streamflow flow.
pub const STREAMFLOW: &str = "Q";

/// Builder for a linear reservoir simulation.
///
/// # Examples
///
/// ```
/// use stockflow::prelude::*;
///
/// # fn main() -> Result<(), SimError> {
/// let forcing = Forcing::new(vec![2.0; 5], vec![0.5; 5], vec![1.0; 5])?;
/// let sim = LinearReservoir::new(forcing)
///     .coefficient(0.25)
///     .simulate(utils::arange(0.0, 5.0, 1.0), Mode::Discrete)?;
/// assert_eq!(sim.series("Q")?.len(), 5);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LinearReservoir {
    forcing: Arc<Forcing>,
    coefficient: f64,
    storage: f64,
}

impl LinearReservoir {
    /// Create a reservoir driven by `forcing`, with coefficient 1 and an empty store.
    pub fn new<F: Into<Arc<Forcing>>>(forcing: F) -> Self {
        LinearReservoir {
            forcing: forcing.into(),
            coefficient: 1.0,
            storage: 0.0,
        }
    }

    /// Set the linear streamflow coefficient `k`.
    pub fn coefficient(mut self, k: f64) -> Self {
        self.coefficient = k;
        self
    }

    /// Set the initial storage.
    pub fn storage(mut self, s0: f64) -> Self {
        self.storage = s0;
        self
    }

    /// The streamflow coefficient.
    pub fn k(&self) -> f64 {
        self.coefficient
    }

    /// The forcing data.
    pub fn forcing(&self) -> &Forcing {
        &self.forcing
    }

    /// Declare the storage and its three flows on a simulation over `time`.
    pub fn build(&self, time: Vec<f64>) -> SimResult<Simulation> {
        let mut sim = Simulation::new(time);
        let s = sim.stock(STORAGE, self.storage)?;

        let forcing = Arc::clone(&self.forcing);
        sim.flow(
            PRECIPITATION,
            move |t, _| forcing.precipitation_at(t),
            None,
            Some(STORAGE),
        )?;
        let forcing = Arc::clone(&self.forcing);
        sim.flow(
            EVAPOTRANSPIRATION,
            move |t, state| forcing.evapotranspiration_at(t).min(state[s]),
            Some(STORAGE),
            None,
        )?;
        let k = self.coefficient;
        sim.flow(STREAMFLOW, move |_, state| k * state[s], Some(STORAGE), None)?;
        debug!("Built linear reservoir with k = {}", k);
        Ok(sim)
    }

    /// Build and run the reservoir over `time`.
    pub fn simulate(&self, time: Vec<f64>, mode: Mode) -> SimResult<Simulation> {
        let mut sim = self.build(time)?;
        sim.run(mode)?;
        Ok(sim)
    }
}
