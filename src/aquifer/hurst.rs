//! van Everdingen–Hurst aquifer: superposition of dimensionless influx over
//! the whole pressure history.

use super::{check_positive, AquiferState, InfluxModel};
use crate::error::{MbalError, MbalResult};
use ndarray::Array1;
use peroxide::fuga::*;
use puruspe::{Jn, Yn};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Dimensionless cumulative influx of an infinite radial aquifer (Marsal's fit).
///
/// $$W_D = 2\sqrt{t_D/\pi} + \frac{t_D}{2} - \frac{t_D}{6}\sqrt{t_D/\pi} + \frac{t_D^2}{16}, \quad t_D \le 1$$
///
/// a seventh-order polynomial for $1 < t_D \le 100$ and $2 t_D / \ln t_D$ beyond.
pub fn water_dimensionless_infinite_marsal(t: f64) -> f64 {
    if t <= 0.0 {
        0.0
    } else if t <= 1.0 {
        2.0 * (t / PI).sqrt() + t / 2.0 - t / 6.0 * (t / PI).sqrt() + t.powi(2) / 16.0
    } else if t <= 100.0 {
        8.1638e-1 + 8.5373e-1 * t - 2.7455e-2 * t.powi(2) + 1.0284e-3 * t.powi(3)
            - 2.274e-5 * t.powi(4)
            + 2.8354e-7 * t.powi(5)
            - 1.8436e-9 * t.powi(6)
            + 4.8534e-12 * t.powi(7)
    } else {
        2.0 * t / t.ln()
    }
}

/// Dimensionless cumulative influx of a bounded radial aquifer (Klins et al.).
///
/// $$W_D = \frac{r_{eD}^2 - 1}{2} - 2\sum_n \frac{e^{-\alpha_n^2 t_D} J_1^2(\alpha_n r_{eD})}
/// {\alpha_n^2 \left[J_0^2(\alpha_n) - J_1^2(\alpha_n r_{eD})\right]}$$
///
/// `alphas` are the roots from [`get_bessel_roots`] with [`BesselType::Alpha`].
pub fn water_dimensionless_finite_klins(t: f64, r_ed: f64, alphas: &Array1<f64>) -> f64 {
    let first_term = 0.5 * (r_ed.powi(2) - 1.0);
    let series = alphas.fold(0f64, |acc, &alpha| {
        let j1_outer = Jn(1, alpha * r_ed).powi(2);
        acc + f64::exp(-alpha.powi(2) * t) * j1_outer
            / (alpha.powi(2) * (Jn(0, alpha).powi(2) - j1_outer))
    });
    first_term - 2.0 * series
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BesselType {
    /// Roots used by the cumulative influx series.
    Alpha,
    /// Roots used by the dimensionless pressure series.
    Beta,
}

fn root_func(x: f64, r_ed: f64, bessel_type: BesselType) -> f64 {
    match bessel_type {
        BesselType::Alpha => Jn(1, x * r_ed) * Yn(0, x) - Yn(1, x * r_ed) * Jn(0, x),
        BesselType::Beta => Jn(1, x * r_ed) * Yn(1, x) - Jn(1, x) * Yn(1, x * r_ed),
    }
}

const MAX_SAMPLE_DOUBLINGS: usize = 16;

/// First `n_max` positive roots of the Bessel cross-product for an aquifer
/// of dimensionless radius `r_ed`.
///
/// The search range is sampled densely and doubled until enough sign
/// changes are seen; each bracket is then refined by bisection.
pub fn get_bessel_roots(r_ed: f64, n_max: usize, bessel_type: BesselType) -> MbalResult<Array1<f64>> {
    if !(r_ed > 1.0 && r_ed.is_finite()) {
        return Err(MbalError::invalid(format!(
            "dimensionless aquifer radius must exceed 1, got {r_ed}"
        )));
    }
    let mut upper = 2.0 * n_max as f64 / r_ed;
    for _ in 0..MAX_SAMPLE_DOUBLINGS {
        let samples = Array1::linspace(1e-9, upper, n_max * 400).to_vec();
        let signs: Vec<f64> = samples
            .iter()
            .map(|&x| root_func(x, r_ed, bessel_type).signum())
            .collect();
        let crossings: Vec<usize> = signs
            .windows(2)
            .enumerate()
            .filter_map(|(i, w)| if w[0] != w[1] { Some(i) } else { None })
            .take(n_max)
            .collect();
        if crossings.len() == n_max {
            return crossings
                .iter()
                .enumerate()
                .map(|(n, &i)| {
                    let problem = Bessel {
                        r_ed,
                        root_guess: (samples[i], samples[i + 1]),
                        bessel_type,
                    };
                    let finder = BisectionMethod {
                        max_iter: 100,
                        tol: 1e-10,
                    };
                    finder
                        .find(&problem)
                        .map(|root| root[0])
                        .map_err(|err| MbalError::NonConvergence {
                            context: format!("Bessel root {n} for r_eD={r_ed}"),
                            reason: err.to_string(),
                        })
                })
                .collect::<MbalResult<Vec<f64>>>()
                .map(Array1::from);
        }
        upper *= 2.0;
    }
    Err(MbalError::NonConvergence {
        context: format!("Bessel roots for r_eD={r_ed}"),
        reason: format!("fewer than {n_max} sign changes found"),
    })
}

struct Bessel {
    r_ed: f64,
    root_guess: (f64, f64),
    bessel_type: BesselType,
}

impl RootFindingProblem<1, 1, (f64, f64)> for Bessel {
    fn function(&self, x: [f64; 1]) -> anyhow::Result<[f64; 1]> {
        Ok([root_func(x[0], self.r_ed, self.bessel_type)])
    }

    fn initial_guess(&self) -> (f64, f64) {
        self.root_guess
    }
}

fn default_roots() -> usize {
    10
}

/// Aquifer properties for the van Everdingen–Hurst model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HurstParams {
    /// Aquifer porosity (fraction)
    pub aq_por: f64,
    /// Total aquifer compressibility (1/psi)
    pub ct: f64,
    /// Reservoir radius (ft)
    pub res_radius: f64,
    /// Outer aquifer radius (ft); `None` for an infinite aquifer
    #[serde(default)]
    pub aq_radius: Option<f64>,
    /// Aquifer thickness (ft)
    pub aq_thickness: f64,
    /// Encroachment angle (degrees)
    pub theta: f64,
    /// Aquifer permeability (md)
    pub k: f64,
    /// Water viscosity (cp)
    pub water_visc: f64,
    /// Roots kept in the bounded-aquifer series
    #[serde(default = "default_roots")]
    pub n_roots: usize,
}

#[derive(Debug, Clone)]
pub struct VanEverdingenHurst {
    params: HurstParams,
    initial_pressure: f64,
    b: f64,
    td_factor: f64,
    bounded: Option<(f64, Array1<f64>)>,
}

impl VanEverdingenHurst {
    pub fn new(params: HurstParams, initial_pressure: f64) -> MbalResult<Self> {
        check_positive("initial pressure", initial_pressure)?;
        check_positive("aquifer porosity", params.aq_por)?;
        check_positive("total compressibility", params.ct)?;
        check_positive("reservoir radius", params.res_radius)?;
        check_positive("aquifer thickness", params.aq_thickness)?;
        check_positive("aquifer angle", params.theta)?;
        check_positive("aquifer permeability", params.k)?;
        check_positive("water viscosity", params.water_visc)?;

        let f = params.theta / 360.0;
        let b = 1.119 * params.aq_por * params.ct * params.res_radius.powi(2) * params.aq_thickness * f;
        let td_factor = 0.006328 * params.k
            / (params.aq_por * params.water_visc * params.ct * params.res_radius.powi(2));
        let bounded = match params.aq_radius {
            Some(aq_radius) => {
                let r_ed = aq_radius / params.res_radius;
                Some((r_ed, get_bessel_roots(r_ed, params.n_roots.max(1), BesselType::Alpha)?))
            }
            None => None,
        };
        Ok(Self {
            params,
            initial_pressure,
            b,
            td_factor,
            bounded,
        })
    }

    pub fn params(&self) -> &HurstParams {
        &self.params
    }

    /// Dimensionless influx at dimensionless time `td`. A bounded aquifer
    /// never delivers more than an infinite one.
    pub fn dimensionless_influx(&self, td: f64) -> f64 {
        let infinite = water_dimensionless_infinite_marsal(td);
        match &self.bounded {
            Some((r_ed, alphas)) => water_dimensionless_finite_klins(td, *r_ed, alphas)
                .min(infinite)
                .max(0.0),
            None => infinite,
        }
    }
}

impl InfluxModel for VanEverdingenHurst {
    fn initial_pressure(&self) -> f64 {
        self.initial_pressure
    }

    fn advance(&self, state: &AquiferState, pressure: f64, time: f64) -> f64 {
        let (times, pressures) = state.history();
        let n = times.len();
        // Pressure at step j of the history extended with the trial point.
        let p = |j: usize| if j < n { pressures[j] } else { pressure };
        let total: f64 = (1..=n)
            .map(|j| {
                let dp = if j == 1 {
                    0.5 * (p(0) - p(1))
                } else {
                    0.5 * (p(j - 2) - p(j))
                };
                dp * self.dimensionless_influx((time - times[j - 1]) * self.td_factor)
            })
            .sum();
        self.b * total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn marsal_is_continuous_enough() {
        let below = water_dimensionless_infinite_marsal(1.0);
        let above = water_dimensionless_infinite_marsal(1.0 + 1e-9);
        assert!((below - above).abs() < 0.1);
        assert_eq!(water_dimensionless_infinite_marsal(0.0), 0.0);
    }

    #[test]
    fn bessel_roots_are_roots() {
        let roots = get_bessel_roots(5.0, 5, BesselType::Alpha).unwrap();
        assert_eq!(roots.len(), 5);
        for &alpha in roots.iter() {
            assert!(root_func(alpha, 5.0, BesselType::Alpha).abs() < 1e-6);
        }
        assert!(roots.windows(2).into_iter().all(|w| w[1] > w[0]));
    }

    #[test]
    fn klins_reaches_plateau() {
        let r_ed: f64 = 5.0;
        let roots = get_bessel_roots(r_ed, 10, BesselType::Alpha).unwrap();
        let late = water_dimensionless_finite_klins(1e4, r_ed, &roots);
        assert_relative_eq!(late, 0.5 * (r_ed.powi(2) - 1.0), epsilon = 1e-6);
    }

    #[test]
    fn rejects_small_radius_ratio() {
        assert!(get_bessel_roots(0.5, 3, BesselType::Alpha).is_err());
    }
}
