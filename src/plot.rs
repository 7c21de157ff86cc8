//! Charts of simulated against observed series.
use crate::errors::{SimError, SimResult};
use plotters::prelude::*;
use std::path::Path;

/// Draw observed and simulated streamflow against time to the bitmap at `path`.
pub fn hydrograph<P: AsRef<Path>>(
    time: &[f64],
    observed: &[f64],
    simulated: &[f64],
    path: P,
) -> SimResult<()> {
    draw(time, observed, simulated, path.as_ref()).map_err(|e| SimError::Plot(e.to_string()))
}

fn draw(
    time: &[f64],
    observed: &[f64],
    simulated: &[f64],
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let obs: Vec<(f64, f64)> = time.iter().cloned().zip(observed.iter().cloned()).collect();
    let sim: Vec<(f64, f64)> = time.iter().cloned().zip(simulated.iter().cloned()).collect();

    let xmin = time.iter().cloned().fold(f64::INFINITY, f64::min);
    let xmax = time.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let ymax = obs
        .iter()
        .chain(sim.iter())
        .map(|xi| xi.1)
        .fold(0.0, f64::max);
    let (xmin, xmax) = if xmin < xmax { (xmin, xmax) } else { (0.0, 1.0) };
    let ymax = if ymax > 0.0 { ymax } else { 1.0 };

    let root = BitMapBackend::new(path, (640, 480)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.margin(10, 10, 10, 10);
    let mut chart = ChartBuilder::on(&root)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(xmin..xmax, 0.0..ymax)?;

    chart
        .configure_mesh()
        .x_labels(5)
        .y_labels(5)
        .y_label_formatter(&|x| format!("{:.2}", x))
        .x_label_formatter(&|x| format!("{:.0}", x))
        .x_desc("Time")
        .y_desc("Streamflow")
        .draw()?;

    chart
        .draw_series(LineSeries::new(obs, &BLACK))?
        .label("observed")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLACK));
    chart
        .draw_series(LineSeries::new(sim, &BLUE))?
        .label("simulated")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .configure_series_labels()
        .background_style(WHITE.filled())
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}
