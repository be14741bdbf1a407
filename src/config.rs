//! Analysis settings loaded from TOML.
//!
//! ```toml
//! frequency = "semi_annual"
//! position = "middle"
//!
//! [reservoir]
//! pi = 3700.0
//! swo = 0.15
//! cw = 3.6e-6
//! cf = 4.6e-6
//!
//! [water]
//! temperature = 219.0
//! salinity = 30000.0
//!
//! [aquifer]
//! model = "fetkovich"
//! aq_radius = 46000.0
//! res_radius = 9200.0
//! aq_thickness = 100.0
//! aq_por = 0.25
//! ct = 7e-6
//! theta = 140.0
//! k = 200.0
//! water_visc = 0.55
//!
//! [solver]
//! tolerance = 1e-8
//! ```

use crate::aquifer::AquiferConfig;
use crate::averaging::{DatePosition, Frequency};
use crate::error::{MbalError, MbalResult};
use crate::expansion::ReservoirConstants;
use crate::pvt::{FluidModel, PvtTable, WaterPvt};
use crate::solver::SolverOptions;
use crate::tank::Tank;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Water salinity and reservoir temperature for the built-in water correlation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterConfig {
    /// Reservoir temperature (°F)
    pub temperature: f64,
    /// Salinity (ppm)
    pub salinity: f64,
}

fn default_frequency() -> Frequency {
    Frequency::Annual
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub reservoir: ReservoirConstants,
    #[serde(default = "default_frequency")]
    pub frequency: Frequency,
    #[serde(default)]
    pub position: DatePosition,
    #[serde(default)]
    pub water: Option<WaterConfig>,
    #[serde(default)]
    pub aquifer: Option<AquiferConfig>,
    #[serde(default)]
    pub solver: SolverOptions,
}

impl AnalysisConfig {
    pub fn from_toml_str(content: &str) -> MbalResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| MbalError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> MbalResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| MbalError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> MbalResult<String> {
        toml::to_string_pretty(self).map_err(|e| MbalError::Config(e.to_string()))
    }

    /// Checks every scalar, including that the aquifer can be built for
    /// the configured initial pressure.
    pub fn validate(&self) -> MbalResult<()> {
        self.reservoir.validate()?;
        self.solver.validate()?;
        if let Some(water) = &self.water {
            if !(water.temperature.is_finite() && water.salinity.is_finite() && water.salinity >= 0.0) {
                return Err(MbalError::invalid(
                    "water temperature must be finite and salinity non-negative",
                ));
            }
        }
        if let Some(aquifer) = &self.aquifer {
            aquifer.build(self.reservoir.pi)?;
        }
        Ok(())
    }

    pub fn water_pvt(&self) -> WaterPvt {
        match self.water {
            Some(WaterConfig {
                temperature,
                salinity,
            }) => WaterPvt::mccain(temperature, salinity),
            None => WaterPvt::Default,
        }
    }

    /// An empty tank with this configuration and the given oil PVT table.
    pub fn tank(&self, name: impl Into<String>, oil: PvtTable) -> MbalResult<Tank> {
        let tank = Tank::new(name, FluidModel::new(oil, self.water_pvt()), self.reservoir)?;
        Ok(match self.aquifer {
            Some(aquifer) => tank.with_aquifer(aquifer),
            None => tank,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aquifer::{Boundary, FetkovichParams};

    const MINIMAL: &str = r#"
        [reservoir]
        pi = 3700.0
        swo = 0.15
        cw = 3.6e-6
        cf = 4.6e-6
    "#;

    #[test]
    fn defaults_fill_in() {
        let config = AnalysisConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.frequency, Frequency::Annual);
        assert_eq!(config.position, DatePosition::Begin);
        assert_eq!(config.solver, SolverOptions::default());
        assert!(config.aquifer.is_none());
        assert!(matches!(config.water_pvt(), WaterPvt::Default));
    }

    #[test]
    fn full_config() {
        let content = r#"
            frequency = "semi_annual"
            position = "middle"

            [reservoir]
            pi = 3700.0
            swo = 0.15
            cw = 3.6e-6
            cf = 4.6e-6

            [water]
            temperature = 219.0
            salinity = 30000.0

            [aquifer]
            model = "fetkovich"
            aq_radius = 46000.0
            res_radius = 9200.0
            aq_thickness = 100.0
            aq_por = 0.25
            ct = 7e-6
            theta = 140.0
            k = 200.0
            water_visc = 0.55
            boundary = "constant_pressure"

            [solver]
            max_iterations = 50
        "#;
        let config = AnalysisConfig::from_toml_str(content).unwrap();
        assert_eq!(config.frequency, Frequency::SemiAnnual);
        assert_eq!(config.position, DatePosition::Middle);
        assert_eq!(config.solver.max_iterations, 50);
        assert_eq!(config.solver.tolerance, SolverOptions::default().tolerance);
        match config.aquifer {
            Some(AquiferConfig::Fetkovich(FetkovichParams { boundary, .. })) => {
                assert_eq!(boundary, Boundary::ConstantPressure)
            }
            other => panic!("unexpected aquifer {other:?}"),
        }
        assert!(config.water_pvt().cw_at(3000.0).is_some());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_swo = MINIMAL.replace("swo = 0.15", "swo = 1.5");
        assert!(AnalysisConfig::from_toml_str(&bad_swo).is_err());

        let bad_linear = format!(
            "{MINIMAL}\n[aquifer]\nmodel = \"fetkovich\"\naq_radius = 46000.0\nres_radius = 9200.0\n\
             aq_thickness = 100.0\naq_por = 0.25\nct = 7e-6\ntheta = 140.0\nk = 200.0\n\
             water_visc = 0.55\nflow = \"linear\"\n"
        );
        let err = AnalysisConfig::from_toml_str(&bad_linear).unwrap_err();
        assert!(matches!(err, MbalError::MissingGeometry { .. }));

        let err = AnalysisConfig::from_toml_str("reservoir = 3").unwrap_err();
        assert!(matches!(err, MbalError::Config(_)));
    }
}
