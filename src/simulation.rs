//! Structs and methods for stock-and-flow simulations.
//!
//! A [Simulation](struct.Simulation.html) holds a registry of named state variables.  Stocks carry an
//! initial value, flows carry a value function of time.  Every flow is also a state variable, so its
//! computed value can be read back as a time series after a run, just like a stock.
use crate::errors::{SimError, SimResult};
use log::{debug, info, trace};
use nalgebra::{DMatrix, DVector};
use ode_solvers::dop_shared::OutputType;
use ode_solvers::{Dopri5, System};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

/// Handle to a slot in the state vector.
///
/// Returned by [stock](struct.Simulation.html#method.stock) and [flow](struct.Simulation.html#method.flow),
/// and usable to index a [State](struct.State.html) inside a flow function without a name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

impl VarId {
    /// Position of the variable in the state vector.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Whether a slot belongs to a stock or to a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Accumulated quantity.
    Stock,
    /// Rate moving mass between stocks or boundaries.
    Flow,
}

/// Read-only view of the state vector handed to flow functions.
pub struct State<'a> {
    values: &'a [f64],
    index: &'a HashMap<String, usize>,
}

impl<'a> State<'a> {
    fn new(values: &'a [f64], index: &'a HashMap<String, usize>) -> Self {
        State { values, index }
    }

    /// Current value of the variable `name`, or `None` if it was never declared.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.index.get(name).and_then(|i| self.values.get(*i)).copied()
    }

    /// The whole state vector, in declaration order.
    pub fn values(&self) -> &[f64] {
        self.values
    }
}

impl<'a> Index<VarId> for State<'a> {
    type Output = f64;

    fn index(&self, id: VarId) -> &f64 {
        &self.values[id.0]
    }
}

type FlowFn = Box<dyn Fn(f64, &State) -> f64 + Send + Sync>;

struct Flow {
    name: String,
    slot: usize,
    f: FlowFn,
    source: Option<usize>,
    destination: Option<usize>,
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Flow")
            .field("name", &self.name)
            .field("slot", &self.slot)
            .field("source", &self.source)
            .field("destination", &self.destination)
            .finish()
    }
}

/// Value returned by [get](struct.Simulation.html#method.get).
///
/// Before a completed run a variable reads as its live scalar value, afterwards as its full series.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Live value of the current state vector.
    Scalar(f64),
    /// One value per point of the time grid.
    Series(Vec<f64>),
}

impl Value {
    /// The scalar, if the simulation has not completed.
    pub fn scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(x) => Some(*x),
            Value::Series(_) => None,
        }
    }

    /// The series, if the simulation has completed.
    pub fn series(&self) -> Option<&[f64]> {
        match self {
            Value::Scalar(_) => None,
            Value::Series(x) => Some(x.as_slice()),
        }
    }
}

/// Tolerances for the adaptive integrator.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SolverOptions {
    /// Relative tolerance.
    pub rtol: f64,
    /// Absolute tolerance.
    pub atol: f64,
    /// Step budget for each grid segment.
    pub max_steps: u32,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            rtol: 1.49012e-8,
            atol: 1.49012e-8,
            max_steps: 100_000,
        }
    }
}

// Dormand-Prince step size controller defaults.
const SAFETY_FACTOR: f64 = 0.9;
const BETA: f64 = 0.04;
const FAC_MIN: f64 = 0.2;
const FAC_MAX: f64 = 10.0;
const STIFFNESS_CHECKS: u32 = 1000;

/// Integration scheme used by [run](struct.Simulation.html#method.run).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// Adaptive Dormand-Prince integration of `dy/dt = xdot(y, t)`.
    Continuous(SolverOptions),
    /// Forward stepping, `y[i] = y[i - 1] + xdot(y[i - 1], t[i])`.
    Discrete,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Continuous(SolverOptions::default())
    }
}

/// Stock-and-flow simulation over a fixed time grid.
///
/// # Examples
///
/// ```
/// use stockflow::prelude::*;
///
/// # fn main() -> Result<(), SimError> {
/// let mut sim = Simulation::new((0..10).map(f64::from).collect());
/// sim.stocks(&[("S", 0.0)])?;
/// sim.flow("P", |_, _| 2.0, None, Some("S"))?;
/// sim.run(Mode::Discrete)?;
/// assert_eq!(sim.series("S")?[9], 18.0);
/// # Ok(())
/// # }
/// ```
pub struct Simulation {
    time: Vec<f64>,
    index: HashMap<String, usize>,
    names: Vec<String>,
    kinds: Vec<Kind>,
    flows: Vec<Flow>,
    current: Vec<f64>,
    done: bool,
    results: Option<DMatrix<f64>>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("time", &self.time.len())
            .field("names", &self.names)
            .field("flows", &self.flows)
            .field("current", &self.current)
            .field("done", &self.done)
            .finish()
    }
}

impl Simulation {
    /// Create an empty simulation over the time grid `time`.
    pub fn new(time: Vec<f64>) -> Self {
        Simulation {
            time,
            index: HashMap::new(),
            names: Vec::new(),
            kinds: Vec::new(),
            flows: Vec::new(),
            current: Vec::new(),
            done: false,
            results: None,
        }
    }

    fn validate_key(&self, key: &str) -> SimResult<()> {
        if self.index.contains_key(key) {
            return Err(SimError::DuplicateName(key.to_string()));
        }
        Ok(())
    }

    fn new_state_var(&mut self, key: &str, ic: f64, kind: Kind) -> VarId {
        self.current.push(ic);
        let slot = self.current.len() - 1;
        self.index.insert(key.to_string(), slot);
        self.names.push(key.to_string());
        self.kinds.push(kind);
        debug!("Declared {:?} {} at slot {} = {}", kind, key, slot, ic);
        VarId(slot)
    }

    fn stock_slot(&self, key: &str) -> SimResult<usize> {
        match self.index.get(key) {
            Some(i) if self.kinds[*i] == Kind::Stock => Ok(*i),
            _ => Err(SimError::UnknownVariable(key.to_string())),
        }
    }

    /// Declare a batch of stocks from `(name, initial value)` pairs.
    /// Nothing is registered unless every name in the batch is new.
    pub fn stocks(&mut self, ics: &[(&str, f64)]) -> SimResult<()> {
        for (i, (key, _)) in ics.iter().enumerate() {
            self.validate_key(key)?;
            if ics[..i].iter().any(|(k, _)| k == key) {
                return Err(SimError::DuplicateName(key.to_string()));
            }
        }
        for (key, ic) in ics {
            self.new_state_var(key, *ic, Kind::Stock);
        }
        Ok(())
    }

    /// Declare a single stock with initial value `ic`.
    pub fn stock(&mut self, key: &str, ic: f64) -> SimResult<VarId> {
        self.validate_key(key)?;
        Ok(self.new_state_var(key, ic, Kind::Stock))
    }

    /// Declare a flow named `key` with value function `f`.
    ///
    /// The flow subtracts its value from the stock `source` and adds it to the stock `destination`;
    /// `None` on either end is an unmodeled boundary.  The flow's own initial value is `f` evaluated
    /// at the start of the time grid.
    ///
    /// # Examples
    ///
    /// ```
    /// use stockflow::prelude::*;
    ///
    /// # fn main() -> Result<(), SimError> {
    /// let mut sim = Simulation::new(vec![0.0, 1.0, 2.0]);
    /// let s = sim.stock("S", 10.0)?;
    /// sim.flow("Q", move |_, state| 0.5 * state[s], Some("S"), None)?;
    /// assert_eq!(sim.get("Q")?, Value::Scalar(5.0));
    /// # Ok(())
    /// # }
    /// ```
    pub fn flow<F>(
        &mut self,
        key: &str,
        f: F,
        source: Option<&str>,
        destination: Option<&str>,
    ) -> SimResult<VarId>
    where
        F: Fn(f64, &State) -> f64 + Send + Sync + 'static,
    {
        self.validate_key(key)?;
        let source = source.map(|s| self.stock_slot(s)).transpose()?;
        let destination = destination.map(|s| self.stock_slot(s)).transpose()?;
        let t0 = self.time.first().copied().unwrap_or(0.0);
        let ic = f(t0, &State::new(&self.current, &self.index));
        let id = self.new_state_var(key, ic, Kind::Flow);
        self.flows.push(Flow {
            name: key.to_string(),
            slot: id.0,
            f: Box::new(f),
            source,
            destination,
        });
        Ok(id)
    }

    /// Slot handle of a declared variable.
    pub fn id(&self, key: &str) -> SimResult<VarId> {
        self.index
            .get(key)
            .map(|i| VarId(*i))
            .ok_or_else(|| SimError::UnknownVariable(key.to_string()))
    }

    /// Whether `key` is a stock or a flow.
    pub fn kind(&self, key: &str) -> SimResult<Kind> {
        Ok(self.kinds[self.id(key)?.0])
    }

    /// Variable names in slot order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of declared variables.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Returns `true` if nothing has been declared.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// The time grid.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Returns `true` once a run has completed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The result matrix of the last completed run, one row per grid point and one column per slot.
    pub fn results(&self) -> Option<&DMatrix<f64>> {
        if self.done {
            self.results.as_ref()
        } else {
            None
        }
    }

    /// Read a variable: its live scalar before the run completes, its series afterwards.
    pub fn get(&self, key: &str) -> SimResult<Value> {
        if self.done {
            Ok(Value::Series(self.series(key)?))
        } else {
            Ok(Value::Scalar(self.current(key)?))
        }
    }

    /// Value of `key` in the current state vector.
    /// After a run this is the value at the first grid point.
    pub fn current(&self, key: &str) -> SimResult<f64> {
        Ok(self.current[self.id(key)?.0])
    }

    /// Series of `key` across the time grid of the last completed run.
    pub fn series(&self, key: &str) -> SimResult<Vec<f64>> {
        let slot = self.id(key)?.0;
        match self.results() {
            Some(res) if slot < res.ncols() => Ok(res.column(slot).iter().copied().collect()),
            _ => Err(SimError::NotRun),
        }
    }

    /// Derivative of the state `y` at time `t`.
    ///
    /// Sets the current state vector to `y`, then distributes every flow value to its source and
    /// destination stocks.  The entry of each flow's own slot is the distance from `y` to the flow value,
    /// so a discrete step lands the flow slot exactly on its value.
    ///
    /// # Panics
    ///
    /// Panics if `y` is shorter than the number of declared variables.
    pub fn xdot(&mut self, y: &[f64], t: f64) -> Vec<f64> {
        self.current = y.to_vec();
        let mut d = vec![0.0; y.len()];
        distribute(&self.flows, &self.index, &self.current, t, &mut d);
        d
    }

    /// Integrate the system over the time grid.
    ///
    /// On success the result matrix is retained, [is_done](#method.is_done) is set and the current state
    /// is reset to the first row, the initial conditions.
    pub fn run(&mut self, mode: Mode) -> SimResult<&DMatrix<f64>> {
        self.done = false;
        if self.time.is_empty() {
            return Err(SimError::InvalidTimeGrid("time grid is empty".to_string()));
        }
        info!(
            "Running {:?} simulation of {} variables over {} time points.",
            mode,
            self.current.len(),
            self.time.len()
        );
        let rows = match mode {
            Mode::Continuous(opts) => self.integrate(&opts)?,
            Mode::Discrete => self.step(),
        };
        let results = DMatrix::from_fn(rows.len(), self.current.len(), |r, c| rows[r][c]);
        self.current = rows[0].clone();
        self.done = true;
        info!("Simulation complete.");
        Ok(&*self.results.insert(results))
    }

    fn step(&mut self) -> Vec<Vec<f64>> {
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(self.time.len());
        rows.push(self.current.clone());
        for i in 1..self.time.len() {
            let t = self.time[i];
            let prev = &rows[i - 1];
            let delta = self.xdot(prev, t);
            let next = prev.iter().zip(&delta).map(|(y, d)| y + d).collect();
            trace!("Step {} at t = {}", i, t);
            rows.push(next);
        }
        rows
    }

    fn integrate(&self, opts: &SolverOptions) -> SimResult<Vec<Vec<f64>>> {
        if let Some(w) = self.time.windows(2).find(|w| w[1] < w[0]) {
            return Err(SimError::InvalidTimeGrid(format!(
                "time decreases from {} to {}",
                w[0], w[1]
            )));
        }
        let system = Derivative {
            flows: &self.flows,
            index: &self.index,
        };
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(self.time.len());
        rows.push(self.current.clone());
        let mut y = DVector::from_vec(self.current.clone());
        for w in self.time.windows(2) {
            let (t0, t1) = (w[0], w[1]);
            if t1 > t0 {
                // sparse output records accepted steps only; the last one lands on t1
                let mut stepper = Dopri5::from_param(
                    system,
                    t0,
                    t1,
                    t1 - t0,
                    y.clone(),
                    opts.rtol,
                    opts.atol,
                    SAFETY_FACTOR,
                    BETA,
                    FAC_MIN,
                    FAC_MAX,
                    t1 - t0,
                    0.0,
                    opts.max_steps,
                    STIFFNESS_CHECKS,
                    OutputType::Sparse,
                );
                stepper.integrate().map_err(|e| SimError::Integration {
                    time: t0,
                    reason: format!("{:?}", e),
                })?;
                let (_, y_out) = stepper.results().get();
                if let Some(last) = y_out.last() {
                    y = last.clone();
                }
            }
            trace!("Integrated segment {} -> {}", t0, t1);
            rows.push(y.iter().copied().collect());
        }
        Ok(rows)
    }
}

/// Borrowed flow set handed to the ODE solver.
///
/// Flows read the vector being integrated through a `State` view; the engine's current vector is
/// left alone during integration and reset to the first row once the run completes.
#[derive(Clone, Copy)]
struct Derivative<'a> {
    flows: &'a [Flow],
    index: &'a HashMap<String, usize>,
}

impl<'a> System<f64, DVector<f64>> for Derivative<'a> {
    fn system(&self, t: f64, y: &DVector<f64>, dy: &mut DVector<f64>) {
        dy.fill(0.0);
        distribute(self.flows, self.index, y.as_slice(), t, dy.as_mut_slice());
    }
}

// Flows are computed once per call and distributed to their stocks in declaration order.
fn distribute(flows: &[Flow], index: &HashMap<String, usize>, y: &[f64], t: f64, d: &mut [f64]) {
    let state = State::new(y, index);
    for flow in flows {
        let ft = (flow.f)(t, &state);
        d[flow.slot] = ft - y[flow.slot];
        if let Some(s) = flow.source {
            d[s] -= ft;
        }
        if let Some(e) = flow.destination {
            d[e] += ft;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(n: usize) -> Vec<f64> {
        (0..n).map(|x| x as f64).collect()
    }

    #[test]
    fn stocks_take_contiguous_slots() {
        let mut sim = Simulation::new(grid(3));
        sim.stocks(&[("A", 1.0), ("B", 2.0)]).unwrap();
        let c = sim.stock("C", 3.0).unwrap();
        assert_eq!(sim.id("A").unwrap().index(), 0);
        assert_eq!(sim.id("B").unwrap().index(), 1);
        assert_eq!(c.index(), 2);
        assert_eq!(sim.names(), &["A", "B", "C"]);
        assert_eq!(sim.kind("B").unwrap(), Kind::Stock);
    }

    #[test]
    fn duplicate_within_batch_registers_nothing() {
        let mut sim = Simulation::new(grid(3));
        let res = sim.stocks(&[("A", 1.0), ("A", 2.0)]);
        assert!(matches!(res, Err(SimError::DuplicateName(ref k)) if k == "A"));
        assert!(sim.is_empty());
    }

    #[test]
    fn flow_cannot_use_flow_as_endpoint() {
        let mut sim = Simulation::new(grid(3));
        sim.stock("S", 0.0).unwrap();
        sim.flow("P", |_, _| 1.0, None, Some("S")).unwrap();
        let res = sim.flow("X", |_, _| 1.0, Some("P"), None);
        assert!(matches!(res, Err(SimError::UnknownVariable(ref k)) if k == "P"));
        assert_eq!(sim.len(), 2);
    }

    #[test]
    fn flow_initial_value_uses_grid_start() {
        let mut sim = Simulation::new(vec![5.0, 6.0]);
        sim.stock("S", 0.0).unwrap();
        sim.flow("P", |t, _| t * 2.0, None, Some("S")).unwrap();
        assert_eq!(sim.current("P").unwrap(), 10.0);
    }

    #[test]
    fn xdot_distributes_flow_values() {
        let mut sim = Simulation::new(grid(3));
        sim.stocks(&[("A", 4.0), ("B", 0.0)]).unwrap();
        sim.flow("AB", |_, s| s.get("A").unwrap_or(0.0) / 2.0, Some("A"), Some("B"))
            .unwrap();
        let d = sim.xdot(&[4.0, 0.0, 0.0], 0.0);
        assert_eq!(d, vec![-2.0, 2.0, 2.0]);
        // the live state now reads the vector passed in
        let d = sim.xdot(&[8.0, 1.0, 3.0], 0.0);
        assert_eq!(d, vec![-4.0, 4.0, 1.0]);
        assert_eq!(sim.current("A").unwrap(), 8.0);
    }

    #[test]
    fn discrete_flow_slot_equals_flow_value() {
        let mut sim = Simulation::new(grid(5));
        sim.stock("S", 0.0).unwrap();
        sim.flow("P", |t, _| t * t, None, Some("S")).unwrap();
        sim.run(Mode::Discrete).unwrap();
        assert_eq!(sim.series("P").unwrap(), vec![0.0, 1.0, 4.0, 9.0, 16.0]);
        assert_eq!(sim.series("S").unwrap(), vec![0.0, 1.0, 5.0, 14.0, 30.0]);
    }

    #[test]
    fn continuous_linear_decay() {
        let mut sim = Simulation::new(grid(6));
        let s = sim.stock("S", 100.0).unwrap();
        sim.flow("Q", move |_, y| 0.5 * y[s], Some("S"), None).unwrap();
        sim.run(Mode::default()).unwrap();
        let series = sim.series("S").unwrap();
        for (i, v) in series.iter().enumerate() {
            assert_relative_eq!(*v, 100.0 * (-0.5 * i as f64).exp(), max_relative = 1e-5);
        }
    }

    #[test]
    fn continuous_honours_uneven_grid() {
        let mut sim = Simulation::new(vec![0.0, 0.5, 0.5, 3.0]);
        sim.stock("S", 1.0).unwrap();
        sim.flow("P", |_, _| 2.0, None, Some("S")).unwrap();
        sim.run(Mode::default()).unwrap();
        let series = sim.series("S").unwrap();
        assert_relative_eq!(series[1], 2.0, epsilon = 1e-6);
        assert_relative_eq!(series[2], 2.0, epsilon = 1e-6);
        assert_relative_eq!(series[3], 7.0, epsilon = 1e-6);
    }

    #[test]
    fn continuous_rejects_decreasing_grid() {
        let mut sim = Simulation::new(vec![0.0, 2.0, 1.0]);
        sim.stock("S", 1.0).unwrap();
        let res = sim.run(Mode::default());
        assert!(matches!(res, Err(SimError::InvalidTimeGrid(_))));
        assert!(!sim.is_done());
        assert!(sim.results().is_none());
    }

    #[test]
    fn continuous_segment_ends_on_grid_point() {
        let mut sim = Simulation::new(vec![0.0, 1.0]);
        sim.stock("S", 10.0).unwrap();
        sim.flow("in", |_, _| 3.0, None, Some("S")).unwrap();
        sim.flow("out", |_, _| 1.0, Some("S"), None).unwrap();
        let res = sim.run(Mode::default()).unwrap();
        assert_eq!(res.nrows(), 2);
        assert_relative_eq!(res[(1, 0)], 12.0, epsilon = 1e-9);
    }

    #[test]
    fn integration_failure_leaves_run_incomplete() {
        let mut sim = Simulation::new(vec![0.0, 2.0]);
        let s = sim.stock("S", 1.0).unwrap();
        // dS/dt = S^2 blows up at t = 1
        sim.flow("P", move |_, y| y[s] * y[s], None, Some("S")).unwrap();
        let opts = SolverOptions {
            max_steps: 500,
            ..SolverOptions::default()
        };
        let res = sim.run(Mode::Continuous(opts));
        assert!(matches!(res, Err(SimError::Integration { time, .. }) if time == 0.0));
        assert!(!sim.is_done());
        assert!(sim.results().is_none());
        assert!(matches!(sim.series("S"), Err(SimError::NotRun)));
    }

    #[test]
    fn empty_grid_is_rejected() {
        let mut sim = Simulation::new(Vec::new());
        sim.stock("S", 1.0).unwrap();
        assert!(matches!(
            sim.run(Mode::Discrete),
            Err(SimError::InvalidTimeGrid(_))
        ));
    }

    #[test]
    fn series_before_run_is_an_error() {
        let mut sim = Simulation::new(grid(2));
        sim.stock("S", 1.0).unwrap();
        assert!(matches!(sim.series("S"), Err(SimError::NotRun)));
        assert!(matches!(sim.get("T"), Err(SimError::UnknownVariable(_))));
    }

    #[test]
    fn result_matrix_shape() {
        let mut sim = Simulation::new(grid(4));
        sim.stock("S", 0.0).unwrap();
        sim.flow("P", |_, _| 1.0, None, Some("S")).unwrap();
        let res = sim.run(Mode::Discrete).unwrap();
        assert_eq!(res.nrows(), 4);
        assert_eq!(res.ncols(), 2);
    }
}
