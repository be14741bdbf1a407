//! Carter–Tracy aquifer: a one-step approximation of the van
//! Everdingen–Hurst convolution for an infinite radial aquifer.

use super::{check_positive, AquiferState, InfluxModel};
use crate::error::MbalResult;
use serde::{Deserialize, Serialize};

/// Aquifer properties for the Carter–Tracy model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarterTracyParams {
    pub aq_por: f64,
    /// Total aquifer compressibility (1/psi)
    pub ct: f64,
    /// Reservoir radius (ft)
    pub res_radius: f64,
    pub aq_thickness: f64,
    /// Encroachment angle (degrees)
    pub theta: f64,
    /// Permeability (md)
    pub k: f64,
    /// Water viscosity (cp)
    pub water_visc: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarterTracy {
    params: CarterTracyParams,
    initial_pressure: f64,
    b: f64,
    td_factor: f64,
}

/// Split between the rational fit and the logarithmic asymptote.
const LATE_TIME_TD: f64 = 100.0;

/// Dimensionless pressure of an infinite radial aquifer at constant rate.
pub fn dimensionless_pressure(td: f64) -> f64 {
    if td > LATE_TIME_TD {
        0.5 * (td.ln() + 0.80907)
    } else {
        let sq = td.sqrt();
        (370.529 * sq + 137.582 * td + 5.69549 * td.powf(1.5))
            / (328.834 + 265.488 * sq + 45.2157 * td + td.powf(1.5))
    }
}

/// Derivative of [`dimensionless_pressure`] with respect to `td`.
pub fn dimensionless_pressure_derivative(td: f64) -> f64 {
    if td > LATE_TIME_TD {
        1.0 / (2.0 * td)
    } else {
        let sq = td.sqrt();
        let e = 716.441 + 46.7984 * sq + 270.038 * td + 71.0098 * td.powf(1.5);
        let f = 1296.86 * sq
            + 1204.73 * td
            + 618.618 * td.powf(1.5)
            + 538.072 * td.powi(2)
            + 142.41 * td.powf(2.5);
        e / f
    }
}

impl CarterTracy {
    pub fn new(params: CarterTracyParams, initial_pressure: f64) -> MbalResult<Self> {
        check_positive("initial pressure", initial_pressure)?;
        check_positive("aquifer porosity", params.aq_por)?;
        check_positive("total compressibility", params.ct)?;
        check_positive("reservoir radius", params.res_radius)?;
        check_positive("aquifer thickness", params.aq_thickness)?;
        check_positive("aquifer angle", params.theta)?;
        check_positive("aquifer permeability", params.k)?;
        check_positive("water viscosity", params.water_visc)?;

        let r2 = params.res_radius.powi(2);
        let b = 1.119 * params.aq_por * params.ct * r2 * params.aq_thickness * params.theta / 360.0;
        let td_factor = 0.006328 * params.k / (params.aq_por * params.water_visc * params.ct * r2);
        Ok(Self {
            params,
            initial_pressure,
            b,
            td_factor,
        })
    }

    pub fn params(&self) -> &CarterTracyParams {
        &self.params
    }

    /// Aquifer constant (bbl/psi)
    pub fn aquifer_constant(&self) -> f64 {
        self.b
    }

    pub fn dimensionless_time(&self, time: f64) -> f64 {
        time * self.td_factor
    }
}

impl InfluxModel for CarterTracy {
    fn initial_pressure(&self) -> f64 {
        self.initial_pressure
    }

    /// $$W_{e,n} = W_{e,n-1} + (t_{D,n} - t_{D,n-1})
    /// \frac{B\,\Delta p_n - W_{e,n-1}\,p_D'(t_{D,n})}{p_D(t_{D,n}) - t_{D,n-1}\,p_D'(t_{D,n})}$$
    ///
    /// with $\Delta p_n = p_i - p_n$.
    fn advance(&self, state: &AquiferState, pressure: f64, time: f64) -> f64 {
        let cumulative = state.cumulative_influx();
        let td = self.dimensionless_time(time);
        let td_prev = self.dimensionless_time(state.last_time());
        if td <= td_prev {
            return cumulative;
        }
        let pd = dimensionless_pressure(td);
        let dpd = dimensionless_pressure_derivative(td);
        let dp = self.initial_pressure - pressure;
        cumulative + (td - td_prev) * (self.b * dp - cumulative * dpd) / (pd - td_prev * dpd)
    }
}
