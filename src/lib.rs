/*!
* # Stockflow - A small engine for stock-and-flow simulations.
* A stock-and-flow model is a set of accumulating quantities (stocks) connected by rates (flows).  Each flow
* is computed once per evaluation and distributed to the stocks it connects: subtracted from its source,
* added to its destination.  Either end may be an unmodeled boundary.  Flows are state variables too,
* so the trajectory of every flow can be read back after a run alongside the stocks.
*
* The engine integrates the coupled system over a time grid, either continuously with an adaptive
* Dormand-Prince solver or by explicit forward stepping.
*
* On top of the engine sits a linear reservoir: one storage driven by precipitation, drained by
* evapotranspiration (capped at the water available) and by streamflow proportional to storage.  A parallel
* sweep explores the streamflow coefficient and reports the best and worst fit to observed streamflow.
*
*  ## Quick Start
*
*  - Load the crate prelude in the preamble of your `main.rs`.
*  - Declare stocks, then flows, then run:
* ```rust
* use stockflow::prelude::*;
*
* fn main() -> Result<(), SimError> {
*     let mut sim = Simulation::new(utils::arange(0.0, 10.0, 1.0));
*     let s = sim.stock("S", 0.0)?;
*     sim.flow("P", |_, _| 3.0, None, Some("S"))?;
*     sim.flow("Q", move |_, state| 0.1 * state[s], Some("S"), None)?;
*
*     // before a run, variables read as scalars
*     assert_eq!(sim.get("Q")?, Value::Scalar(0.0));
*
*     sim.run(Mode::default())?;
*
*     // afterwards, as series over the time grid
*     let q = sim.get("Q")?;
*     assert_eq!(q.series().map(|x| x.len()), Some(10));
*     Ok(())
* }
* ```
*
* Fit a linear reservoir to observed data, one engine per coefficient:
*
* ```rust
* use stockflow::prelude::*;
*
* # fn main() -> Result<(), SimError> {
* let forcing = Forcing::new(vec![1.0, 0.0, 2.0], vec![0.2; 3], vec![0.1, 0.3, 0.4])?;
* let trials = Sweep::new(forcing).members(4).mode(Mode::Discrete).run()?;
* let best = sweep::best(&trials).map(|x| x.fit.coefficient);
* assert!(best.is_some());
* # Ok(())
* # }
* ```
*/

#![warn(missing_docs)]
pub mod errors;
pub mod forcing;
pub mod plot;
pub mod reservoir;
pub mod simulation;
pub mod sweep;
pub mod utils;

/// Common imports.
pub mod prelude {
    pub use crate::errors::{SimError, SimResult};
    pub use crate::forcing::{Forcing, ReadOptions};
    pub use crate::reservoir::LinearReservoir;
    pub use crate::simulation::{Kind, Mode, Simulation, SolverOptions, State, Value, VarId};
    pub use crate::sweep::{self, Fit, Sweep, Trial};
    pub use crate::{plot, utils};
}
