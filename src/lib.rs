//! Material-balance engine for estimating original oil in place.
//!
//! The pieces build on each other:
//!
//! * [`pvt`] interpolates oil properties and evaluates the water model.
//! * [`withdrawal`] turns cumulative production into underground withdrawal.
//! * [`averaging`] reduces multi-well pressure readings to one pressure per bucket.
//! * [`expansion`] evaluates the Havlena–Odeh expansion terms.
//! * [`aquifer`] holds the Fetkovich, Carter–Tracy and van Everdingen–Hurst models.
//! * [`solver`] back-calculates the pressure history implied by an oil in place.
//!
//! [`tank`] and [`mbal`] tie them together per tank and [`analysis`] reads
//! the oil in place off the resulting table.

pub mod analysis;
pub mod aquifer;
pub mod averaging;
pub mod config;
pub mod error;
pub mod expansion;
pub mod mbal;
pub mod pvt;
pub mod series;
pub mod solver;
pub mod tank;
pub mod withdrawal;

#[cfg(feature = "python")]
mod python;

pub use aquifer::{cumulative_influx, Aquifer, AquiferConfig, InfluxModel};
pub use averaging::{pressure_vol_avg, DatePosition, Frequency, PressureObservation};
pub use config::AnalysisConfig;
pub use error::{MbalError, MbalResult};
pub use expansion::{ExpansionModel, ReservoirConstants};
pub use mbal::MaterialBalanceTable;
pub use pvt::{FluidModel, PvtTable, WaterPvt};
pub use series::{ProductionSeries, TimeSeries};
pub use solver::{PressureMatch, PressureMatchSolver, SolverOptions};
pub use tank::{Tank, TankRegistry, Well};
pub use withdrawal::{underground_withdrawal, WithdrawalProperties};
