//! Observed hydrology data driving the reservoir model.
use crate::errors::{SimError, SimResult};
use csv::{ReaderBuilder, Trim};
use log::{info, warn};
use std::fs;
use std::ops::Range;
use std::path::Path;

/// Options for reading a forcing table with [Forcing::read](struct.Forcing.html#method.read).
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Header lines to skip before the data.
    pub skip_rows: usize,
    /// Field separator.  With a space, runs of spaces and tabs count as one separator.
    pub delimiter: u8,
    /// Keep only this window of data rows.
    pub rows: Option<Range<usize>>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            skip_rows: 2,
            delimiter: b' ',
            rows: None,
        }
    }
}

impl ReadOptions {
    /// Create read options with the defaults: two header rows, space separated, all rows.
    pub fn new() -> Self {
        ReadOptions::default()
    }

    /// Set the number of header rows to skip.
    pub fn skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    /// Set the field separator.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Keep only the data rows in `rows`.
    pub fn rows(mut self, rows: Range<usize>) -> Self {
        self.rows = Some(rows);
        self
    }
}

/// Daily precipitation, potential evapotranspiration and observed streamflow.
///
/// All three columns have the same, non-zero length and contain no NaN values.
#[derive(Debug, Clone, PartialEq)]
pub struct Forcing {
    precipitation: Vec<f64>,
    evapotranspiration: Vec<f64>,
    streamflow: Vec<f64>,
}

impl Forcing {
    /// Create validated forcing data from its three columns.
    pub fn new(
        precipitation: Vec<f64>,
        evapotranspiration: Vec<f64>,
        streamflow: Vec<f64>,
    ) -> SimResult<Self> {
        if precipitation.is_empty() {
            return Err(SimError::InvalidForcing("no data rows".to_string()));
        }
        if precipitation.len() != evapotranspiration.len()
            || precipitation.len() != streamflow.len()
        {
            return Err(SimError::InvalidForcing(format!(
                "column lengths differ: {}, {}, {}",
                precipitation.len(),
                evapotranspiration.len(),
                streamflow.len()
            )));
        }
        for (name, col) in [
            ("precipitation", &precipitation),
            ("evapotranspiration", &evapotranspiration),
            ("streamflow", &streamflow),
        ]
        .iter()
        {
            if col.iter().any(|v| v.is_nan()) {
                return Err(SimError::InvalidForcing(format!("{} contains NaN", name)));
            }
        }
        Ok(Forcing {
            precipitation,
            evapotranspiration,
            streamflow,
        })
    }

    /// Read forcing data from a delimited text file.
    /// Columns 0, 1 and 2 hold precipitation, potential evapotranspiration and streamflow.
    /// With a space delimiter any run of spaces and tabs separates fields.
    pub fn read<P: AsRef<Path>>(path: P, opts: &ReadOptions) -> SimResult<Self> {
        let mut text = fs::read_to_string(path.as_ref())?;
        if opts.delimiter == b' ' {
            text = text.replace('\t', " ");
        }
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .delimiter(opts.delimiter)
            .from_reader(text.as_bytes());
        let mut p = Vec::new();
        let mut pet = Vec::new();
        let mut q = Vec::new();
        for (i, result) in rdr.records().skip(opts.skip_rows).enumerate() {
            let row = result?;
            if let Some(rows) = &opts.rows {
                if i < rows.start {
                    continue;
                }
                if i >= rows.end {
                    break;
                }
            }
            let fields: Vec<&str> = row.iter().filter(|x| !x.is_empty()).collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 3 {
                return Err(SimError::InvalidForcing(format!(
                    "row {} has {} columns, expected at least 3",
                    i + opts.skip_rows,
                    fields.len()
                )));
            }
            p.push(fields[0].parse::<f64>()?);
            pet.push(fields[1].parse::<f64>()?);
            q.push(fields[2].parse::<f64>()?);
        }
        info!("Read {} rows of forcing from {}.", p.len(), path.as_ref().display());
        Forcing::new(p, pet, q)
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.precipitation.len()
    }

    /// Always `false`, forcing holds at least one row.
    pub fn is_empty(&self) -> bool {
        self.precipitation.is_empty()
    }

    /// Precipitation column.
    pub fn precipitation(&self) -> &[f64] {
        &self.precipitation
    }

    /// Potential evapotranspiration column.
    pub fn evapotranspiration(&self) -> &[f64] {
        &self.evapotranspiration
    }

    /// Observed streamflow column.
    pub fn streamflow(&self) -> &[f64] {
        &self.streamflow
    }

    /// Row holding time `t`: truncated toward zero and clamped to the available rows.
    pub fn index(&self, t: f64) -> usize {
        let last = self.len() - 1;
        if t <= 0.0 {
            return 0;
        }
        let i = t as usize;
        if i > last {
            warn!("Time {} is past the last forcing row, using row {}.", t, last);
            return last;
        }
        i
    }

    /// Precipitation at time `t`.
    pub fn precipitation_at(&self, t: f64) -> f64 {
        self.precipitation[self.index(t)]
    }

    /// Potential evapotranspiration at time `t`.
    pub fn evapotranspiration_at(&self, t: f64) -> f64 {
        self.evapotranspiration[self.index(t)]
    }
}
