//! The per-period material-balance table of a tank.

use crate::aquifer::{cumulative_influx, InfluxModel};
use crate::averaging::Frequency;
use crate::error::{MbalError, MbalResult};
use crate::expansion::{ExpansionModel, ReservoirConstants};
use crate::pvt::FluidModel;
use crate::series::{days_between, ProductionSeries, TimeSeries};
use crate::withdrawal::{underground_withdrawal, WithdrawalProperties};
use chrono::NaiveDate;
use ndarray::{s, Array1};
use tracing::debug;

/// Everything the graphical and analytic methods need, one row per
/// averaging bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialBalanceTable {
    pub dates: Vec<NaiveDate>,
    /// Volumetric-average pressure, gaps interpolated (psi)
    pub pressure: Array1<f64>,
    pub oil_cum: Array1<f64>,
    pub water_cum: Array1<f64>,
    pub gas_cum: Array1<f64>,
    pub bo: Array1<f64>,
    pub bg: Array1<f64>,
    pub rs: Array1<f64>,
    pub bw: Array1<f64>,
    pub rsw: Array1<f64>,
    /// Days since the initial state
    pub elapsed: Array1<f64>,
    /// Underground withdrawal F (rb)
    pub uw: Array1<f64>,
    pub eo: Array1<f64>,
    pub eg: Array1<f64>,
    pub efw: Array1<f64>,
    /// Cumulative water influx (rb); zero without an aquifer
    pub we: Array1<f64>,
}

impl MaterialBalanceTable {
    /// Builds the table from an averaged pressure series and the tank's
    /// cumulative production.
    pub fn assemble(
        average_pressure: &TimeSeries,
        production: &ProductionSeries,
        fluid: &FluidModel,
        constants: ReservoirConstants,
        aquifer: Option<&dyn InfluxModel>,
        frequency: Frequency,
    ) -> MbalResult<Self> {
        let avg = average_pressure.fill_missing()?;
        let dates = avg.dates().to_vec();
        let pressure = avg.values().to_owned();
        let n = dates.len();

        let cum: Vec<_> = dates.iter().map(|&d| production.at(d)).collect();
        let oil_cum: Array1<f64> = cum.iter().map(|c| c.oil).collect();
        let water_cum: Array1<f64> = cum.iter().map(|c| c.water).collect();
        let gas_cum: Array1<f64> = cum.iter().map(|c| c.gas).collect();

        let bo = fluid.oil.bo_array(pressure.view());
        let bg = fluid.oil.bg_array(pressure.view());
        let rs = fluid.oil.rs_array(pressure.view());
        let bw = pressure.mapv(|p| fluid.water.bw_at(p));
        let rsw = pressure.mapv(|p| fluid.water.rsw_at(p));

        let uw = underground_withdrawal(
            oil_cum.view(),
            water_cum.view(),
            gas_cum.view(),
            &WithdrawalProperties {
                bo: bo.clone().into(),
                bw: bw.clone().into(),
                bg: bg.clone().into(),
                rs: rs.clone().into(),
                rsw: rsw.clone().into(),
            },
        )?;

        let terms = ExpansionModel::new(&fluid.oil, constants)?.terms(pressure.view());
        let elapsed = elapsed_days(&dates, frequency)?;

        let we = match aquifer {
            Some(model) => {
                let p: Array1<f64> = std::iter::once(constants.pi)
                    .chain(pressure.iter().copied())
                    .collect();
                let t: Array1<f64> = std::iter::once(0.0).chain(elapsed.iter().copied()).collect();
                cumulative_influx(model, p.view(), t.view())?
                    .slice(s![1..])
                    .to_owned()
            }
            None => Array1::zeros(n),
        };

        debug!(periods = n, "material balance table assembled");
        Ok(Self {
            dates,
            pressure,
            oil_cum,
            water_cum,
            gas_cum,
            bo,
            bg,
            rs,
            bw,
            rsw,
            elapsed,
            uw,
            eo: terms.eo,
            eg: terms.eg,
            efw: terms.efw,
            we,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Date one bucket before the first row, where the initial state sits.
    pub fn initial_date(&self) -> Option<NaiveDate> {
        let first = *self.dates.first()?;
        let spacing = (self.elapsed[0] as i64).max(0);
        Some(first - chrono::Duration::days(spacing))
    }
}

/// Days since a reference date one bucket before the first date:
/// $t_i = (d_i - d_0) + (d_1 - d_0)$.
///
/// With a single date the bucket length of `frequency` stands in for
/// $d_1 - d_0$.
pub fn elapsed_days(dates: &[NaiveDate], frequency: Frequency) -> MbalResult<Array1<f64>> {
    let first = *dates
        .first()
        .ok_or_else(|| MbalError::invalid("no dates to measure elapsed time from"))?;
    let spacing = match dates.get(1) {
        Some(&second) => days_between(first, second),
        None => days_between(first, frequency.next_start(first)),
    };
    Ok(dates
        .iter()
        .map(|&d| days_between(first, d) + spacing)
        .collect())
}
