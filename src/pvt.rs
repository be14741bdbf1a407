//! Pressure-dependent fluid properties.
//!
//! Oil properties come from a tabulated PVT table interpolated linearly in
//! pressure. Water properties come from a correlation when temperature and
//! salinity are known, otherwise from fixed defaults.

use crate::error::{ensure_same_len, MbalError, MbalResult};
use ndarray::{Array1, ArrayView1};
use std::fmt;
use std::sync::Arc;

/// Oil PVT table sorted by pressure.
#[derive(Debug, Clone, PartialEq)]
pub struct PvtTable {
    pressure: Array1<f64>,
    bo: Array1<f64>,
    bg: Array1<f64>,
    rs: Array1<f64>,
}

/// Oil-side properties at one pressure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OilProperties {
    pub bo: f64,
    pub bg: f64,
    pub rs: f64,
}

impl PvtTable {
    /// Builds a table from columns. Rows are sorted by pressure; duplicate or
    /// negative pressures and tables with fewer than two rows are rejected.
    pub fn new(pressure: Vec<f64>, bo: Vec<f64>, bg: Vec<f64>, rs: Vec<f64>) -> MbalResult<Self> {
        ensure_same_len("PVT pressure/Bo", pressure.len(), bo.len())?;
        ensure_same_len("PVT pressure/Bg", pressure.len(), bg.len())?;
        ensure_same_len("PVT pressure/Rs", pressure.len(), rs.len())?;
        if pressure.len() < 2 {
            return Err(MbalError::PvtTable {
                what: format!("at least two rows are required, got {}", pressure.len()),
            });
        }
        let finite = [&pressure, &bo, &bg, &rs]
            .iter()
            .all(|column| column.iter().all(|v| v.is_finite()));
        if !finite {
            return Err(MbalError::PvtTable {
                what: "non-finite value".into(),
            });
        }
        if pressure.iter().any(|p| *p < 0.0) {
            return Err(MbalError::PvtTable {
                what: "negative pressure".into(),
            });
        }

        let mut order: Vec<usize> = (0..pressure.len()).collect();
        order.sort_by(|&a, &b| pressure[a].total_cmp(&pressure[b]));
        if let Some(w) = order.windows(2).find(|w| pressure[w[0]] == pressure[w[1]]) {
            return Err(MbalError::PvtTable {
                what: format!("duplicate pressure {}", pressure[w[0]]),
            });
        }
        let pick = |column: &[f64]| order.iter().map(|&i| column[i]).collect::<Array1<f64>>();
        Ok(Self {
            pressure: pick(&pressure),
            bo: pick(&bo),
            bg: pick(&bg),
            rs: pick(&rs),
        })
    }

    /// Builds a table from `(pressure, Bo, Bg, Rs)` rows.
    pub fn from_rows(rows: &[(f64, f64, f64, f64)]) -> MbalResult<Self> {
        let pressure = rows.iter().map(|r| r.0).collect();
        let bo = rows.iter().map(|r| r.1).collect();
        let bg = rows.iter().map(|r| r.2).collect();
        let rs = rows.iter().map(|r| r.3).collect();
        Self::new(pressure, bo, bg, rs)
    }

    pub fn pressure(&self) -> ArrayView1<'_, f64> {
        self.pressure.view()
    }

    pub fn bo_at(&self, pressure: f64) -> f64 {
        interpolate(&self.pressure, &self.bo, pressure)
    }

    pub fn bg_at(&self, pressure: f64) -> f64 {
        interpolate(&self.pressure, &self.bg, pressure)
    }

    pub fn rs_at(&self, pressure: f64) -> f64 {
        interpolate(&self.pressure, &self.rs, pressure)
    }

    pub fn properties_at(&self, pressure: f64) -> OilProperties {
        OilProperties {
            bo: self.bo_at(pressure),
            bg: self.bg_at(pressure),
            rs: self.rs_at(pressure),
        }
    }

    pub fn bo_array(&self, pressure: ArrayView1<'_, f64>) -> Array1<f64> {
        pressure.mapv(|p| self.bo_at(p))
    }

    pub fn bg_array(&self, pressure: ArrayView1<'_, f64>) -> Array1<f64> {
        pressure.mapv(|p| self.bg_at(p))
    }

    pub fn rs_array(&self, pressure: ArrayView1<'_, f64>) -> Array1<f64> {
        pressure.mapv(|p| self.rs_at(p))
    }
}

/// Piecewise-linear interpolation over sorted `xs`, extended linearly past
/// both ends with the outermost segments.
fn interpolate(xs: &Array1<f64>, ys: &Array1<f64>, x: f64) -> f64 {
    let n = xs.len();
    let upper = xs
        .as_slice()
        .map(|s| s.partition_point(|v| *v <= x))
        .unwrap_or_else(|| xs.iter().take_while(|v| **v <= x).count())
        .clamp(1, n - 1);
    let lower = upper - 1;
    let slope = (ys[upper] - ys[lower]) / (xs[upper] - xs[lower]);
    ys[lower] + slope * (x - xs[lower])
}

/// Water formation volume factor, solution gas-water ratio and water
/// compressibility as functions of pressure, temperature and salinity.
pub trait WaterCorrelation: Send + Sync {
    fn bw(&self, pressure: f64, temperature: f64, salinity: f64) -> f64;
    fn rsw(&self, pressure: f64, temperature: f64, salinity: f64) -> f64;
    fn cw(&self, pressure: f64, temperature: f64, salinity: f64) -> f64;
}

/// McCain's Bw for gas-free water with Osif's compressibility.
///
/// Pressure in psia, temperature in °F, salinity in ppm (mg/L NaCl).
/// Gas-free water carries no dissolved gas, so Rsw is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct McCainWater;

impl WaterCorrelation for McCainWater {
    fn bw(&self, pressure: f64, temperature: f64, _salinity: f64) -> f64 {
        let t = temperature;
        let p = pressure;
        let dv_t = -1.0001e-2 + 1.33391e-4 * t + 5.50654e-7 * t.powi(2);
        let dv_p = -1.95301e-9 * p * t - 1.72834e-13 * p.powi(2) * t - 3.58922e-7 * p
            - 2.25341e-10 * p.powi(2);
        (1.0 + dv_p) * (1.0 + dv_t)
    }

    fn rsw(&self, _pressure: f64, _temperature: f64, _salinity: f64) -> f64 {
        0.0
    }

    fn cw(&self, pressure: f64, temperature: f64, salinity: f64) -> f64 {
        let grams_per_litre = salinity / 1000.0;
        1.0 / (7.033 * pressure + 541.5 * grams_per_litre - 537.0 * temperature + 403_300.0)
    }
}

/// Water-side properties of a tank.
#[derive(Clone, Default)]
pub enum WaterPvt {
    /// No water PVT data: Bw = 1 and Rsw = 0.
    #[default]
    Default,
    Correlation {
        temperature: f64,
        salinity: f64,
        correlation: Arc<dyn WaterCorrelation>,
    },
}

impl fmt::Debug for WaterPvt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaterPvt::Default => f.write_str("WaterPvt::Default"),
            WaterPvt::Correlation {
                temperature,
                salinity,
                ..
            } => f
                .debug_struct("WaterPvt::Correlation")
                .field("temperature", temperature)
                .field("salinity", salinity)
                .finish_non_exhaustive(),
        }
    }
}

impl WaterPvt {
    pub const DEFAULT_BW: f64 = 1.0;
    pub const DEFAULT_RSW: f64 = 0.0;

    pub fn mccain(temperature: f64, salinity: f64) -> Self {
        WaterPvt::Correlation {
            temperature,
            salinity,
            correlation: Arc::new(McCainWater),
        }
    }

    pub fn bw_at(&self, pressure: f64) -> f64 {
        match self {
            WaterPvt::Default => Self::DEFAULT_BW,
            WaterPvt::Correlation {
                temperature,
                salinity,
                correlation,
            } => correlation.bw(pressure, *temperature, *salinity),
        }
    }

    pub fn rsw_at(&self, pressure: f64) -> f64 {
        match self {
            WaterPvt::Default => Self::DEFAULT_RSW,
            WaterPvt::Correlation {
                temperature,
                salinity,
                correlation,
            } => correlation.rsw(pressure, *temperature, *salinity),
        }
    }

    /// Water compressibility, when a correlation is configured.
    pub fn cw_at(&self, pressure: f64) -> Option<f64> {
        match self {
            WaterPvt::Default => None,
            WaterPvt::Correlation {
                temperature,
                salinity,
                correlation,
            } => Some(correlation.cw(pressure, *temperature, *salinity)),
        }
    }
}

/// Oil and water models of one tank.
#[derive(Debug, Clone)]
pub struct FluidModel {
    pub oil: PvtTable,
    pub water: WaterPvt,
}

impl FluidModel {
    pub fn new(oil: PvtTable, water: WaterPvt) -> Self {
        Self { oil, water }
    }
}
