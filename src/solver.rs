//! Pressure match: the reservoir pressure history implied by an assumed
//! original oil in place.
//!
//! Each period solves
//!
//! $$N (E_o(p) + E_{fw}(p)) + W_e(p) B_w(p) - (N_p B_o(p) + W_p B_w(p)) = 0$$
//!
//! for `p`, with the aquifer advanced from the previous period's solution.
//! Periods depend on each other through the aquifer state, so they are
//! solved strictly in order.

use crate::aquifer::{AquiferState, InfluxModel};
use crate::error::{ensure_same_len, MbalError, MbalResult};
use crate::expansion::{ExpansionModel, ReservoirConstants};
use crate::pvt::FluidModel;
use ndarray::{Array1, ArrayView1};
use peroxide::fuga::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Root-finder settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Largest accepted residual, relative to the period's withdrawal
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Pressure step of the central-difference derivative (psi)
    pub derivative_step: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 100,
            derivative_step: 1e-3,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> MbalResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(MbalError::invalid("solver tolerance must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(MbalError::invalid("solver needs at least one iteration"));
        }
        if !(self.derivative_step.is_finite() && self.derivative_step > 0.0) {
            return Err(MbalError::invalid("derivative step must be positive"));
        }
        Ok(())
    }
}

/// Calculated pressures and influx, both starting with the initial state.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureMatch {
    /// `pi` followed by one pressure per period
    pub pressures: Array1<f64>,
    /// Zero followed by the cumulative influx of each period
    pub cumulative_influx: Array1<f64>,
}

pub struct PressureMatchSolver<'a> {
    fluid: &'a FluidModel,
    expansion: ExpansionModel<'a>,
    aquifer: Option<&'a dyn InfluxModel>,
    options: SolverOptions,
}

impl<'a> PressureMatchSolver<'a> {
    pub fn new(
        fluid: &'a FluidModel,
        constants: ReservoirConstants,
        aquifer: Option<&'a dyn InfluxModel>,
        options: SolverOptions,
    ) -> MbalResult<Self> {
        options.validate()?;
        Ok(Self {
            fluid,
            expansion: ExpansionModel::new(&fluid.oil, constants)?,
            aquifer,
            options,
        })
    }

    /// Solves every period in order.
    ///
    /// `oil_cum` and `water_cum` are the tank's cumulative production at
    /// each period and `elapsed` the days since the initial state.
    ///
    /// # Errors
    /// * [`MbalError::InvalidInput`] for a non-positive `poes`, negative
    ///   production or elapsed times that are not non-decreasing.
    /// * [`MbalError::LengthMismatch`] when the series differ in length.
    /// * [`MbalError::NonConvergence`] when a period has no root in `(0, pi]`.
    pub fn solve(
        &self,
        poes: f64,
        oil_cum: ArrayView1<'_, f64>,
        water_cum: ArrayView1<'_, f64>,
        elapsed: ArrayView1<'_, f64>,
    ) -> MbalResult<PressureMatch> {
        let n = oil_cum.len();
        ensure_same_len("oil cumulative/elapsed time", n, elapsed.len())?;
        ensure_same_len("oil/water cumulative", n, water_cum.len())?;
        if !(poes.is_finite() && poes > 0.0) {
            return Err(MbalError::invalid(format!("oil in place must be positive, got {poes}")));
        }
        if oil_cum.iter().chain(water_cum.iter()).any(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(MbalError::invalid("cumulative production must be finite and non-negative"));
        }
        if elapsed.iter().any(|t| !(t.is_finite() && *t >= 0.0))
            || elapsed.iter().zip(elapsed.iter().skip(1)).any(|(a, b)| b < a)
        {
            return Err(MbalError::invalid("elapsed time must be non-negative and non-decreasing"));
        }

        let pi = self.expansion.constants().pi;
        let bo_init = self.expansion.initial().bo;
        let mut state = AquiferState::new(pi, 0.0);
        let mut pressures = Vec::with_capacity(n + 1);
        let mut influx = Vec::with_capacity(n + 1);
        pressures.push(pi);
        influx.push(0.0);

        for period in 0..n {
            let guess = state.last_pressure();
            let mut problem = PeriodProblem {
                fluid: self.fluid,
                expansion: &self.expansion,
                aquifer: self.aquifer,
                state: &state,
                poes,
                oil: oil_cum[period],
                water: water_cum[period],
                time: elapsed[period],
                scale: 1.0,
                step: self.options.derivative_step,
                guess,
                bracket: (1.0, pi),
            };
            problem.scale = problem
                .withdrawal(guess)
                .abs()
                .max(poes * bo_init * 1e-6)
                .max(1.0);

            let pressure = self.solve_period(&problem, period)?;
            let we = problem.influx(pressure);
            debug!(period, pressure, influx = we, "period solved");
            state.record(pressure, elapsed[period], we);
            pressures.push(pressure);
            influx.push(we);
        }

        Ok(PressureMatch {
            pressures: Array1::from(pressures),
            cumulative_influx: Array1::from(influx),
        })
    }

    /// Newton from the previous pressure; bisection on `[1, pi]` when Newton
    /// fails or leaves the physical range, polished by Newton again.
    fn solve_period(&self, problem: &PeriodProblem<'_>, period: usize) -> MbalResult<f64> {
        let (lo, hi) = problem.bracket;
        let tolerance = self.options.tolerance;
        let accept = |p: f64| {
            p.is_finite() && p > 0.0 && p <= hi * (1.0 + 1e-9) && problem.residual(p).abs() <= tolerance
        };
        let newton = NewtonMethod {
            max_iter: self.options.max_iterations,
            tol: tolerance,
        };

        match newton.find(problem) {
            Ok([p]) if accept(p) => return Ok(p),
            Ok([p]) => debug!(period, pressure = p, "newton root rejected, bisecting"),
            Err(err) => debug!(period, %err, "newton failed, bisecting"),
        }

        let (r_lo, r_hi) = (problem.residual(lo), problem.residual(hi));
        if r_hi == 0.0 {
            return Ok(hi);
        }
        if r_lo == 0.0 {
            return Ok(lo);
        }
        if !(r_lo.is_finite() && r_hi.is_finite()) || r_lo.signum() == r_hi.signum() {
            warn!(period, "material balance has no root between {lo} and {hi} psi");
            return Err(MbalError::NonConvergence {
                context: format!("period {period}"),
                reason: format!("no sign change of the material balance between {lo} and {hi} psi"),
            });
        }

        let bisection = BisectionMethod {
            max_iter: self.options.max_iterations,
            tol: tolerance * hi,
        };
        let rough = bisection
            .find(problem)
            .map(|root| root[0])
            .map_err(|err| MbalError::NonConvergence {
                context: format!("period {period}"),
                reason: err.to_string(),
            })?;
        if accept(rough) {
            return Ok(rough);
        }

        let polish = PeriodProblem {
            guess: rough,
            ..*problem
        };
        match newton.find(&polish) {
            Ok([p]) if accept(p) => Ok(p),
            _ => Err(MbalError::NonConvergence {
                context: format!("period {period}"),
                reason: format!(
                    "residual {:e} above tolerance {tolerance:e} near {rough} psi",
                    problem.residual(rough).abs()
                ),
            }),
        }
    }
}

/// Material balance of one period, seen as a function of its pressure.
#[derive(Clone, Copy)]
struct PeriodProblem<'s> {
    fluid: &'s FluidModel,
    expansion: &'s ExpansionModel<'s>,
    aquifer: Option<&'s dyn InfluxModel>,
    state: &'s AquiferState,
    poes: f64,
    oil: f64,
    water: f64,
    time: f64,
    scale: f64,
    step: f64,
    guess: f64,
    bracket: (f64, f64),
}

impl PeriodProblem<'_> {
    fn influx(&self, pressure: f64) -> f64 {
        self.aquifer
            .map_or(0.0, |aq| aq.advance(self.state, pressure, self.time))
    }

    fn withdrawal(&self, pressure: f64) -> f64 {
        self.oil * self.fluid.oil.bo_at(pressure) + self.water * self.fluid.water.bw_at(pressure)
    }

    fn residual(&self, pressure: f64) -> f64 {
        let expansion = self.expansion.eo(pressure) + self.expansion.efw(pressure);
        let bw = self.fluid.water.bw_at(pressure);
        (self.poes * expansion + self.influx(pressure) * bw - self.withdrawal(pressure)) / self.scale
    }

    fn slope(&self, pressure: f64) -> f64 {
        let h = self.step;
        (self.residual(pressure + h) - self.residual(pressure - h)) / (2.0 * h)
    }
}

impl RootFindingProblem<1, 1, f64> for PeriodProblem<'_> {
    fn function(&self, x: [f64; 1]) -> anyhow::Result<[f64; 1]> {
        Ok([self.residual(x[0])])
    }

    fn initial_guess(&self) -> f64 {
        self.guess
    }

    fn derivative(&self, x: [f64; 1]) -> anyhow::Result<[[f64; 1]; 1]> {
        Ok([[self.slope(x[0])]])
    }
}

impl RootFindingProblem<1, 1, (f64, f64)> for PeriodProblem<'_> {
    fn function(&self, x: [f64; 1]) -> anyhow::Result<[f64; 1]> {
        Ok([self.residual(x[0])])
    }

    fn initial_guess(&self) -> (f64, f64) {
        self.bracket
    }
}
