//! Estimating the original oil in place from a material-balance table.

use crate::error::{ensure_same_len, MbalError, MbalResult};
use crate::mbal::MaterialBalanceTable;
use crate::series::TimeSeries;
use crate::solver::SolverOptions;
use crate::tank::Tank;
use chrono::NaiveDate;
use ndarray::{Array1, ArrayView1, Zip};

/// Ordinary least-squares line through a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn fit(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> MbalResult<Self> {
        ensure_same_len("regression x/y", x.len(), y.len())?;
        if x.len() < 2 {
            return Err(MbalError::invalid("a line needs at least two points"));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(MbalError::invalid("regression points must be finite"));
        }
        let n = x.len() as f64;
        let x_mean = x.sum() / n;
        let y_mean = y.sum() / n;
        let mut sxx = 0.0;
        let mut sxy = 0.0;
        let mut syy = 0.0;
        Zip::from(&x).and(&y).for_each(|&xi, &yi| {
            sxx += (xi - x_mean).powi(2);
            sxy += (xi - x_mean) * (yi - y_mean);
            syy += (yi - y_mean).powi(2);
        });
        if sxx == 0.0 {
            return Err(MbalError::invalid("regression x values have no spread"));
        }
        let slope = sxy / sxx;
        let r_squared = if syy == 0.0 { 1.0 } else { sxy * sxy / (sxx * syy) };
        Ok(Self {
            slope,
            intercept: y_mean - slope * x_mean,
            r_squared,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Points of a diagnostic plot and the line through them.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicalAnalysis {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub fit: LinearFit,
}

/// Campbell plot: `F / (Eo + Efw)` against `Np`. A flat trend means no
/// aquifer support; a rising one shows the aquifer's contribution.
pub fn campbell(table: &MaterialBalanceTable) -> MbalResult<GraphicalAnalysis> {
    let expansion = &table.eo + &table.efw;
    let x = table.oil_cum.clone();
    let y = &table.uw / &expansion;
    let fit = LinearFit::fit(x.view(), y.view())?;
    Ok(GraphicalAnalysis { x, y, fit })
}

/// Havlena–Odeh plot: `F - We` against `Eo + Efw`; the slope estimates `N`.
pub fn havlena_odeh(table: &MaterialBalanceTable) -> MbalResult<GraphicalAnalysis> {
    let x = &table.eo + &table.efw;
    let y = &table.uw - &table.we;
    let fit = LinearFit::fit(x.view(), y.view())?;
    Ok(GraphicalAnalysis { x, y, fit })
}

impl GraphicalAnalysis {
    /// Slope of the Havlena–Odeh line, read as original oil in place (stb).
    pub fn poes(&self) -> f64 {
        self.fit.slope
    }
}

/// Observed and calculated pressure for an assumed oil in place.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticMatch {
    pub observed: TimeSeries,
    pub calculated: TimeSeries,
    pub cumulative_influx: Array1<f64>,
}

impl AnalyticMatch {
    /// Root mean square of observed minus calculated pressure.
    pub fn rms_error(&self) -> f64 {
        let diff = &self.observed.values() - &self.calculated.values();
        (diff.mapv(|d| d * d).sum() / diff.len() as f64).sqrt()
    }
}

/// Runs the pressure match for `poes` and lines it up with the observed
/// average pressure. Both series start with the initial pressure, one
/// bucket before the first row of `table`.
pub fn analytic(
    table: &MaterialBalanceTable,
    tank: &Tank,
    poes: f64,
    options: SolverOptions,
) -> MbalResult<AnalyticMatch> {
    let start = table
        .initial_date()
        .ok_or_else(|| MbalError::invalid("material balance table is empty"))?;
    let matched = tank.pressure_match(table, poes, options)?;

    let dates: Vec<NaiveDate> = std::iter::once(start).chain(table.dates.iter().copied()).collect();
    let observed: Vec<f64> = std::iter::once(tank.constants().pi)
        .chain(table.pressure.iter().copied())
        .collect();

    Ok(AnalyticMatch {
        observed: TimeSeries::new(dates.clone(), observed)?,
        calculated: TimeSeries::new(dates, matched.pressures.to_vec())?,
        cumulative_influx: matched.cumulative_influx,
    })
}
