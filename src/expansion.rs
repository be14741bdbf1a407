//! Havlena–Odeh expansion terms.
//!
//! All terms are pure functions of pressure and the reservoir constants, so
//! they can be evaluated for any period independently.

use crate::error::{MbalError, MbalResult};
use crate::pvt::{OilProperties, PvtTable};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Scalar reservoir constants fixed when a tank is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReservoirConstants {
    /// Initial reservoir pressure (psi)
    pub pi: f64,
    /// Initial water saturation (fraction)
    pub swo: f64,
    /// Water compressibility (1/psi)
    pub cw: f64,
    /// Formation (rock) compressibility (1/psi)
    pub cf: f64,
}

impl ReservoirConstants {
    pub fn validate(&self) -> MbalResult<()> {
        if !(self.pi.is_finite() && self.pi > 0.0) {
            return Err(MbalError::invalid("initial pressure must be positive"));
        }
        if !(0.0..1.0).contains(&self.swo) {
            return Err(MbalError::invalid("initial water saturation must be in [0, 1)"));
        }
        if !(self.cw >= 0.0 && self.cf >= 0.0) {
            return Err(MbalError::invalid("compressibilities must be non-negative"));
        }
        Ok(())
    }
}

/// Expansion terms of one tank, evaluated against its initial state.
#[derive(Debug, Clone)]
pub struct ExpansionModel<'a> {
    oil: &'a PvtTable,
    constants: ReservoirConstants,
    initial: OilProperties,
}

/// Expansion-term series for a pressure history.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionTerms {
    pub eo: Array1<f64>,
    pub eg: Array1<f64>,
    pub efw: Array1<f64>,
}

impl<'a> ExpansionModel<'a> {
    pub fn new(oil: &'a PvtTable, constants: ReservoirConstants) -> MbalResult<Self> {
        constants.validate()?;
        let initial = oil.properties_at(constants.pi);
        Ok(Self {
            oil,
            constants,
            initial,
        })
    }

    pub fn constants(&self) -> &ReservoirConstants {
        &self.constants
    }

    /// Bo, Bg and Rs at the initial pressure.
    pub fn initial(&self) -> OilProperties {
        self.initial
    }

    /// Oil expansion: $E_o = B_o + (R_{si} - R_s) B_g - B_{oi}$
    pub fn eo(&self, pressure: f64) -> f64 {
        let props = self.oil.properties_at(pressure);
        oil_expansion(props, self.initial)
    }

    /// Gas-cap expansion: $E_g = B_{ti} (B_g / B_{gi} - 1)$
    pub fn eg(&self, pressure: f64) -> f64 {
        gas_expansion(self.oil.bg_at(pressure), self.initial)
    }

    /// Rock and connate water expansion:
    /// $E_{fw} = B_{oi} \frac{c_w S_{wo} + c_f}{1 - S_{wo}} (p_i - p)$
    pub fn efw(&self, pressure: f64) -> f64 {
        rock_water_expansion(pressure, self.initial.bo, &self.constants)
    }

    pub fn terms(&self, pressure: ArrayView1<'_, f64>) -> ExpansionTerms {
        ExpansionTerms {
            eo: pressure.mapv(|p| self.eo(p)),
            eg: pressure.mapv(|p| self.eg(p)),
            efw: pressure.mapv(|p| self.efw(p)),
        }
    }
}

pub fn oil_expansion(props: OilProperties, initial: OilProperties) -> f64 {
    props.bo + (initial.rs - props.rs) * props.bg - initial.bo
}

/// The two-phase volume factor at the initial pressure equals `Boi`.
pub fn gas_expansion(bg: f64, initial: OilProperties) -> f64 {
    initial.bo * (bg / initial.bg - 1.0)
}

pub fn rock_water_expansion(pressure: f64, bo_init: f64, constants: &ReservoirConstants) -> f64 {
    let ReservoirConstants { pi, swo, cw, cf } = *constants;
    bo_init * ((cw * swo + cf) / (1.0 - swo)) * (pi - pressure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn table() -> PvtTable {
        PvtTable::from_rows(&[
            (1000.0, 1.20, 0.0020, 400.0),
            (2000.0, 1.30, 0.0010, 600.0),
            (3000.0, 1.28, 0.0008, 600.0),
        ])
        .unwrap()
    }

    fn constants() -> ReservoirConstants {
        ReservoirConstants {
            pi: 3000.0,
            swo: 0.2,
            cw: 3e-6,
            cf: 4e-6,
        }
    }

    #[test]
    fn terms_vanish_at_initial_pressure() {
        let pvt = table();
        let model = ExpansionModel::new(&pvt, constants()).unwrap();
        assert_relative_eq!(model.eo(3000.0), 0.0);
        assert_relative_eq!(model.eg(3000.0), 0.0);
        assert_relative_eq!(model.efw(3000.0), 0.0);
    }

    #[test]
    fn oil_expansion_releases_solution_gas() {
        let pvt = table();
        let model = ExpansionModel::new(&pvt, constants()).unwrap();
        // Below the bubble point: Bo=1.25, Rs=500, Bg=0.0015 at 1500 psi
        let expected = 1.25 + (600.0 - 500.0) * 0.0015 - 1.28;
        assert_relative_eq!(model.eo(1500.0), expected, epsilon = 1e-12);
    }

    #[test]
    fn gas_and_rock_terms() {
        let pvt = table();
        let model = ExpansionModel::new(&pvt, constants()).unwrap();
        assert_relative_eq!(model.eg(2000.0), 1.28 * (0.0010 / 0.0008 - 1.0), epsilon = 1e-12);
        let factor = 1.28 * (3e-6 * 0.2 + 4e-6) / 0.8;
        assert_relative_eq!(model.efw(2500.0), factor * 500.0, epsilon = 1e-15);
    }

    #[test]
    fn vectorized_terms_match_scalar() {
        let pvt = table();
        let model = ExpansionModel::new(&pvt, constants()).unwrap();
        let p = array![3000.0, 2500.0, 1800.0];
        let terms = model.terms(p.view());
        for (i, &pressure) in p.iter().enumerate() {
            assert_eq!(terms.eo[i], model.eo(pressure));
            assert_eq!(terms.eg[i], model.eg(pressure));
            assert_eq!(terms.efw[i], model.efw(pressure));
        }
    }

    #[test]
    fn rejects_bad_saturation() {
        let pvt = table();
        let bad = ReservoirConstants {
            swo: 1.0,
            ..constants()
        };
        assert!(ExpansionModel::new(&pvt, bad).is_err());
    }
}
