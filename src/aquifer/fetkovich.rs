//! Fetkovich finite aquifer: a pseudo-steady productivity index feeding a
//! depleting aquifer of fixed capacity.

use super::{check_positive, AquiferState, InfluxModel};
use crate::error::{MbalError, MbalResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    #[default]
    NoFlow,
    ConstantPressure,
    Infinite,
}

impl Boundary {
    pub fn as_str(self) -> &'static str {
        match self {
            Boundary::NoFlow => "no_flow",
            Boundary::ConstantPressure => "constant_pressure",
            Boundary::Infinite => "infinite",
        }
    }
}

impl FromStr for Boundary {
    type Err = MbalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_flow" => Ok(Boundary::NoFlow),
            "constant_pressure" => Ok(Boundary::ConstantPressure),
            "infinite" => Ok(Boundary::Infinite),
            other => Err(MbalError::invalid(format!("unknown aquifer boundary {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    #[default]
    Radial,
    Linear,
}

impl Flow {
    pub fn as_str(self) -> &'static str {
        match self {
            Flow::Radial => "radial",
            Flow::Linear => "linear",
        }
    }
}

impl FromStr for Flow {
    type Err = MbalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "radial" => Ok(Flow::Radial),
            "linear" => Ok(Flow::Linear),
            other => Err(MbalError::invalid(format!("unknown aquifer flow {other:?}"))),
        }
    }
}

/// Geometry and rock/fluid properties of a Fetkovich aquifer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FetkovichParams {
    /// Aquifer radius (ft)
    pub aq_radius: f64,
    /// Reservoir radius (ft)
    pub res_radius: f64,
    /// Aquifer thickness (ft)
    pub aq_thickness: f64,
    /// Aquifer porosity (fraction)
    pub aq_por: f64,
    /// Total aquifer compressibility (1/psi)
    pub ct: f64,
    /// Encroachment angle (degrees)
    pub theta: f64,
    /// Aquifer permeability (md)
    pub k: f64,
    /// Water viscosity (cp)
    pub water_visc: f64,
    #[serde(default)]
    pub boundary: Boundary,
    #[serde(default)]
    pub flow: Flow,
    /// Aquifer width (ft), linear flow only
    #[serde(default)]
    pub width: Option<f64>,
    /// Aquifer length (ft), linear flow only
    #[serde(default)]
    pub length: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetkovich {
    params: FetkovichParams,
    initial_pressure: f64,
    wi: f64,
    wei: f64,
    j: f64,
}

impl Fetkovich {
    /// Fixes the aquifer water volume, maximum influx and productivity index
    /// for an aquifer initially at `initial_pressure`.
    pub fn new(params: FetkovichParams, initial_pressure: f64) -> MbalResult<Self> {
        check_positive("initial pressure", initial_pressure)?;
        check_positive("aquifer radius", params.aq_radius)?;
        check_positive("reservoir radius", params.res_radius)?;
        check_positive("aquifer thickness", params.aq_thickness)?;
        check_positive("aquifer porosity", params.aq_por)?;
        check_positive("total compressibility", params.ct)?;
        check_positive("aquifer angle", params.theta)?;
        check_positive("aquifer permeability", params.k)?;
        check_positive("water viscosity", params.water_visc)?;
        if params.aq_radius <= params.res_radius {
            return Err(MbalError::invalid(
                "aquifer radius must exceed reservoir radius",
            ));
        }

        let wi = (PI / 5.615)
            * (params.aq_radius.powi(2) - params.res_radius.powi(2))
            * params.aq_thickness
            * params.aq_por;
        let f = params.theta / 360.0;
        let wei = params.ct * wi * initial_pressure * f;
        let j = productivity_index(&params, f)?;
        Ok(Self {
            params,
            initial_pressure,
            wi,
            wei,
            j,
        })
    }

    pub fn params(&self) -> &FetkovichParams {
        &self.params
    }

    /// Initial water volume in the aquifer (bbl)
    pub fn initial_water(&self) -> f64 {
        self.wi
    }

    /// Maximum encroachable water (bbl)
    pub fn max_influx(&self) -> f64 {
        self.wei
    }

    pub fn productivity_index(&self) -> f64 {
        self.j
    }
}

fn productivity_index(params: &FetkovichParams, f: f64) -> MbalResult<f64> {
    let FetkovichParams {
        k,
        aq_thickness: h,
        water_visc: mu,
        ..
    } = *params;
    let rd = params.aq_radius / params.res_radius;

    let linear_geometry = || -> MbalResult<(f64, f64)> {
        match (params.width, params.length) {
            (Some(w), Some(l)) => {
                check_positive("aquifer width", w)?;
                check_positive("aquifer length", l)?;
                Ok((w, l))
            }
            _ => Err(MbalError::MissingGeometry {
                what: "linear flow requires aquifer width and length",
            }),
        }
    };

    let j = match (params.boundary, params.flow) {
        (Boundary::NoFlow, Flow::Radial) => 0.00708 * k * h * f / (mu * (rd.ln() - 0.75)),
        (Boundary::ConstantPressure, Flow::Radial) => 0.00708 * k * h * f / (mu * rd.ln()),
        (Boundary::NoFlow, Flow::Linear) => {
            let (w, l) = linear_geometry()?;
            0.003381 * k * w * h / (mu * l)
        }
        (Boundary::ConstantPressure, Flow::Linear) => {
            let (w, l) = linear_geometry()?;
            0.001127 * k * w * h / (mu * l)
        }
        (Boundary::Infinite, Flow::Radial) => {
            let a = (0.0142 * k * 365.0 / (f * mu * params.ct)).sqrt();
            0.00708 * k * h * f / (mu * (a / params.res_radius).ln())
        }
        (Boundary::Infinite, Flow::Linear) => {
            return Err(MbalError::UnsupportedAquifer {
                boundary: params.boundary.as_str(),
                flow: params.flow.as_str(),
            })
        }
    };
    if !(j.is_finite() && j > 0.0) {
        return Err(MbalError::invalid(format!(
            "aquifer productivity index is not positive ({j}); check the aquifer geometry"
        )));
    }
    Ok(j)
}

impl InfluxModel for Fetkovich {
    fn initial_pressure(&self) -> f64 {
        self.initial_pressure
    }

    /// $$W_{e,n} = \frac{W_{ei}}{p_i}\left(1 - e^{-J p_i \Delta t / W_{ei}}\right)
    /// \left(\bar p_{a,n-1} - \frac{p_{n-1} + p_n}{2}\right)$$
    ///
    /// with the aquifer pressure depleted by what has already flowed out,
    /// $\bar p_a = p_i (1 - W_e / W_{ei})$.
    fn advance(&self, state: &AquiferState, pressure: f64, time: f64) -> f64 {
        let pi = self.initial_pressure;
        let cumulative = state.cumulative_influx();
        let dt = time - state.last_time();
        let aquifer_pressure = pi * (1.0 - cumulative / self.wei);
        let reservoir_avg = 0.5 * (state.last_pressure() + pressure);
        let delta = (self.wei / pi)
            * (1.0 - (-self.j * pi * dt / self.wei).exp())
            * (aquifer_pressure - reservoir_avg);
        cumulative + delta
    }
}
