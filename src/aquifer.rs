//! Aquifer water-influx models.
//!
//! Every model is a recurrence over a time-ordered pressure history. The
//! state carried between steps lives in [`AquiferState`], so the pressure
//! match solver can evaluate trial pressures for one period without
//! committing them.

pub mod carter_tracy;
pub mod fetkovich;
pub mod hurst;

use crate::error::{ensure_same_len, MbalError, MbalResult};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use carter_tracy::{CarterTracy, CarterTracyParams};
pub use fetkovich::{Boundary, Fetkovich, FetkovichParams, Flow};
pub use hurst::{HurstParams, VanEverdingenHurst};

/// Committed history of an aquifer: the reservoir pressures and elapsed
/// times seen so far and the influx they produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AquiferState {
    times: Vec<f64>,
    pressures: Vec<f64>,
    cumulative: f64,
}

impl AquiferState {
    /// State before any influx, at `pressure` and elapsed `time`.
    pub fn new(pressure: f64, time: f64) -> Self {
        Self {
            times: vec![time],
            pressures: vec![pressure],
            cumulative: 0.0,
        }
    }

    pub fn cumulative_influx(&self) -> f64 {
        self.cumulative
    }

    pub fn last_pressure(&self) -> f64 {
        self.pressures[self.pressures.len() - 1]
    }

    pub fn last_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Elapsed times and pressures, oldest first.
    pub fn history(&self) -> (&[f64], &[f64]) {
        (&self.times, &self.pressures)
    }

    pub fn record(&mut self, pressure: f64, time: f64, cumulative: f64) {
        self.times.push(time);
        self.pressures.push(pressure);
        self.cumulative = cumulative;
    }
}

/// A cumulative water-influx model driven by reservoir pressure.
pub trait InfluxModel {
    /// Pressure of the undisturbed aquifer (psi)
    fn initial_pressure(&self) -> f64;

    /// Cumulative influx (bbl) after moving from the last committed point of
    /// `state` to `pressure` at elapsed `time` (days). Does not modify `state`.
    fn advance(&self, state: &AquiferState, pressure: f64, time: f64) -> f64;

    fn start(&self, time: f64) -> AquiferState {
        AquiferState::new(self.initial_pressure(), time)
    }
}

pub(crate) fn check_positive(what: &'static str, value: f64) -> MbalResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MbalError::invalid(format!("{what} must be positive, got {value}")))
    }
}

/// Cumulative influx over a pressure history.
///
/// `pressure[0]` and `time[0]` are the initial point; its influx is zero.
/// Each later point advances the model from the one before it.
///
/// # Errors
/// * [`MbalError::LengthMismatch`] when `pressure` and `time` differ in length.
/// * [`MbalError::InvalidInput`] for an empty history, a non-positive
///   pressure, or elapsed times that are not finite and non-decreasing.
pub fn cumulative_influx<M: InfluxModel + ?Sized>(
    model: &M,
    pressure: ArrayView1<'_, f64>,
    time: ArrayView1<'_, f64>,
) -> MbalResult<Array1<f64>> {
    ensure_same_len("aquifer pressure/time", pressure.len(), time.len())?;
    if pressure.is_empty() {
        return Err(MbalError::invalid("aquifer pressure history is empty"));
    }
    if let Some(bad) = pressure.iter().find(|p| !(p.is_finite() && **p > 0.0)) {
        return Err(MbalError::invalid(format!(
            "aquifer pressure must be positive, got {bad}"
        )));
    }
    if time.iter().any(|t| !t.is_finite())
        || time.iter().zip(time.iter().skip(1)).any(|(a, b)| b < a)
    {
        return Err(MbalError::invalid(
            "aquifer elapsed time must be finite and non-decreasing",
        ));
    }

    let mut state = AquiferState::new(pressure[0], time[0]);
    let mut influx = Array1::zeros(pressure.len());
    for i in 1..pressure.len() {
        let we = model.advance(&state, pressure[i], time[i]);
        state.record(pressure[i], time[i], we);
        influx[i] = we;
    }
    debug!(
        steps = pressure.len(),
        total = influx[influx.len() - 1],
        "aquifer influx computed"
    );
    Ok(influx)
}

/// One of the supported aquifer models, built for a given initial pressure.
#[derive(Debug, Clone)]
pub enum Aquifer {
    Fetkovich(Fetkovich),
    CarterTracy(CarterTracy),
    VanEverdingenHurst(VanEverdingenHurst),
}

impl Aquifer {
    pub fn name(&self) -> &'static str {
        match self {
            Aquifer::Fetkovich(_) => "fetkovich",
            Aquifer::CarterTracy(_) => "carter_tracy",
            Aquifer::VanEverdingenHurst(_) => "van_everdingen_hurst",
        }
    }
}

impl InfluxModel for Aquifer {
    fn initial_pressure(&self) -> f64 {
        match self {
            Aquifer::Fetkovich(aq) => aq.initial_pressure(),
            Aquifer::CarterTracy(aq) => aq.initial_pressure(),
            Aquifer::VanEverdingenHurst(aq) => aq.initial_pressure(),
        }
    }

    fn advance(&self, state: &AquiferState, pressure: f64, time: f64) -> f64 {
        match self {
            Aquifer::Fetkovich(aq) => aq.advance(state, pressure, time),
            Aquifer::CarterTracy(aq) => aq.advance(state, pressure, time),
            Aquifer::VanEverdingenHurst(aq) => aq.advance(state, pressure, time),
        }
    }
}

/// Aquifer parameters as they appear in configuration, before the tank's
/// initial pressure is known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum AquiferConfig {
    Fetkovich(FetkovichParams),
    CarterTracy(CarterTracyParams),
    VanEverdingenHurst(HurstParams),
}

impl AquiferConfig {
    pub fn build(&self, initial_pressure: f64) -> MbalResult<Aquifer> {
        Ok(match *self {
            AquiferConfig::Fetkovich(params) => {
                Aquifer::Fetkovich(Fetkovich::new(params, initial_pressure)?)
            }
            AquiferConfig::CarterTracy(params) => {
                Aquifer::CarterTracy(CarterTracy::new(params, initial_pressure)?)
            }
            AquiferConfig::VanEverdingenHurst(params) => {
                Aquifer::VanEverdingenHurst(VanEverdingenHurst::new(params, initial_pressure)?)
            }
        })
    }
}
