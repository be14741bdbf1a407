//! Wells, tanks and the registry that routes one to the other.

use crate::aquifer::{Aquifer, AquiferConfig, InfluxModel};
use crate::averaging::{pressure_vol_avg, DatePosition, Frequency, PressureObservation};
use crate::error::{MbalError, MbalResult};
use crate::expansion::ReservoirConstants;
use crate::mbal::MaterialBalanceTable;
use crate::pvt::FluidModel;
use crate::series::{first_difference, ProductionSeries, TimeSeries};
use crate::solver::{PressureMatch, PressureMatchSolver, SolverOptions};
use crate::withdrawal::{underground_withdrawal, WithdrawalProperties};
use chrono::NaiveDate;
use ndarray::Array1;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A well with whatever series the ingestion layer found for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Well {
    pub name: String,
    pub tank: String,
    pub production: Option<ProductionSeries>,
    /// Measured pressure; `NaN` marks a missing reading.
    pub pressure: Option<TimeSeries>,
}

impl Well {
    pub fn new(name: impl Into<String>, tank: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tank: tank.into(),
            production: None,
            pressure: None,
        }
    }

    pub fn with_production(mut self, production: ProductionSeries) -> Self {
        self.production = Some(production);
        self
    }

    pub fn with_pressure(mut self, pressure: TimeSeries) -> Self {
        self.pressure = Some(pressure);
        self
    }

    /// Underground withdrawal of this well at each of its pressure readings.
    ///
    /// Production is interpolated at the reading dates (zero before the
    /// first record, or throughout for a well without production) and the
    /// fluid properties are taken at the reading's pressure. Readings
    /// without a pressure are skipped.
    pub fn withdrawal_observations(&self, fluid: &FluidModel) -> MbalResult<Vec<PressureObservation>> {
        let readings = match &self.pressure {
            Some(series) => series.dropna(),
            None => return Ok(Vec::new()),
        };
        if readings.is_empty() {
            return Ok(Vec::new());
        }

        let dates = readings.dates();
        let pressure = readings.values();
        let cum: Vec<_> = dates
            .iter()
            .map(|&d| {
                self.production
                    .as_ref()
                    .map(|prod| prod.at(d))
                    .unwrap_or_default()
            })
            .collect();
        let oil: Array1<f64> = cum.iter().map(|c| c.oil).collect();
        let water: Array1<f64> = cum.iter().map(|c| c.water).collect();
        let gas: Array1<f64> = cum.iter().map(|c| c.gas).collect();

        let props = WithdrawalProperties {
            bo: fluid.oil.bo_array(pressure).into(),
            bw: pressure.mapv(|p| fluid.water.bw_at(p)).into(),
            bg: fluid.oil.bg_array(pressure).into(),
            rs: fluid.oil.rs_array(pressure).into(),
            rsw: pressure.mapv(|p| fluid.water.rsw_at(p)).into(),
        };
        let uw = underground_withdrawal(oil.view(), water.view(), gas.view(), &props)?;

        Ok(dates
            .iter()
            .zip(pressure.iter())
            .zip(uw.iter())
            .map(|((&date, &pressure), &withdrawal)| PressureObservation {
                well: self.name.clone(),
                date,
                pressure,
                withdrawal,
            })
            .collect())
    }
}

/// A group of wells sharing one pressure system.
#[derive(Debug, Clone)]
pub struct Tank {
    name: String,
    wells: Vec<Well>,
    fluid: FluidModel,
    constants: ReservoirConstants,
    aquifer: Option<AquiferConfig>,
}

impl Tank {
    pub fn new(name: impl Into<String>, fluid: FluidModel, constants: ReservoirConstants) -> MbalResult<Self> {
        constants.validate()?;
        Ok(Self {
            name: name.into(),
            wells: Vec::new(),
            fluid,
            constants,
            aquifer: None,
        })
    }

    pub fn with_aquifer(mut self, aquifer: AquiferConfig) -> Self {
        self.aquifer = Some(aquifer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wells(&self) -> &[Well] {
        &self.wells
    }

    pub fn fluid(&self) -> &FluidModel {
        &self.fluid
    }

    pub fn constants(&self) -> ReservoirConstants {
        self.constants
    }

    pub fn aquifer_config(&self) -> Option<&AquiferConfig> {
        self.aquifer.as_ref()
    }

    /// The tank's aquifer, built for its initial pressure.
    pub fn aquifer(&self) -> MbalResult<Option<Aquifer>> {
        self.aquifer
            .as_ref()
            .map(|config| config.build(self.constants.pi))
            .transpose()
    }

    /// Fails if a well of the same name is already in the tank.
    pub fn add_well(&mut self, well: Well) -> MbalResult<()> {
        if self.wells.iter().any(|w| w.name == well.name) {
            return Err(MbalError::invalid(format!(
                "well {} appears twice in tank {}",
                well.name, self.name
            )));
        }
        self.wells.push(well);
        Ok(())
    }

    /// Pressure readings of every well with the withdrawal at each reading.
    pub fn withdrawal_observations(&self) -> MbalResult<Vec<PressureObservation>> {
        let mut observations = Vec::new();
        for well in &self.wells {
            observations.extend(well.withdrawal_observations(&self.fluid)?);
        }
        Ok(observations)
    }

    pub fn average_pressure(&self, frequency: Frequency, position: DatePosition) -> MbalResult<TimeSeries> {
        pressure_vol_avg(&self.withdrawal_observations()?, frequency, position)
    }

    /// Tank cumulative production on the union of all production dates:
    /// the running sum of every well's increments.
    pub fn production_totals(&self) -> MbalResult<ProductionSeries> {
        let producers: Vec<&ProductionSeries> =
            self.wells.iter().filter_map(|w| w.production.as_ref()).collect();
        if producers.is_empty() {
            return Err(MbalError::invalid(format!(
                "tank {} has no production data",
                self.name
            )));
        }

        // Increments reported on each date, summed across wells.
        let mut increments: BTreeMap<NaiveDate, [f64; 3]> = BTreeMap::new();
        for prod in producers {
            let oil = first_difference(prod.oil());
            let water = first_difference(prod.water());
            let gas = first_difference(prod.gas());
            for (i, &date) in prod.dates().iter().enumerate() {
                let step = increments.entry(date).or_default();
                step[0] += oil[i];
                step[1] += water[i];
                step[2] += gas[i];
            }
        }

        let mut total = [0.0; 3];
        let mut dates = Vec::with_capacity(increments.len());
        let (mut oil, mut water, mut gas) = (Vec::new(), Vec::new(), Vec::new());
        for (date, step) in increments {
            for (sum, inc) in total.iter_mut().zip(step) {
                *sum += inc;
            }
            dates.push(date);
            oil.push(total[0]);
            water.push(total[1]);
            gas.push(total[2]);
        }
        ProductionSeries::new(dates, oil, water, gas)
    }

    pub fn material_balance(
        &self,
        frequency: Frequency,
        position: DatePosition,
    ) -> MbalResult<MaterialBalanceTable> {
        let avg = self.average_pressure(frequency, position)?;
        if avg.has_missing() {
            debug!(tank = %self.name, "interpolating buckets without pressure");
        }
        let production = self.production_totals()?;
        let aquifer = self.aquifer()?;
        MaterialBalanceTable::assemble(
            &avg,
            &production,
            &self.fluid,
            self.constants,
            aquifer.as_ref().map(|aq| aq as &dyn InfluxModel),
            frequency,
        )
    }

    /// Pressures implied by `poes` over the periods of `table`.
    pub fn pressure_match(
        &self,
        table: &MaterialBalanceTable,
        poes: f64,
        options: SolverOptions,
    ) -> MbalResult<PressureMatch> {
        let aquifer = self.aquifer()?;
        let solver = PressureMatchSolver::new(
            &self.fluid,
            self.constants,
            aquifer.as_ref().map(|aq| aq as &dyn InfluxModel),
            options,
        )?;
        solver.solve(
            poes,
            table.oil_cum.view(),
            table.water_cum.view(),
            table.elapsed.view(),
        )
    }
}

/// Every tank of a field, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TankRegistry {
    tanks: BTreeMap<String, Tank>,
}

impl TankRegistry {
    /// Routes each well to the tank it names.
    ///
    /// # Errors
    /// [`MbalError::InvalidInput`] for duplicate tank names, a well naming an
    /// unknown tank, or a well listed twice.
    pub fn build(tanks: Vec<Tank>, wells: Vec<Well>) -> MbalResult<Self> {
        let mut registry = BTreeMap::new();
        for tank in tanks {
            let name = tank.name.clone();
            if registry.insert(name.clone(), tank).is_some() {
                return Err(MbalError::invalid(format!("tank {name} defined twice")));
            }
        }
        for well in wells {
            if well.production.is_none() && well.pressure.is_none() {
                warn!(well = %well.name, "well has neither production nor pressure data");
            }
            match registry.get_mut(&well.tank) {
                Some(tank) => tank.add_well(well)?,
                None => {
                    return Err(MbalError::invalid(format!(
                        "well {} belongs to unknown tank {}",
                        well.name, well.tank
                    )))
                }
            }
        }
        Ok(Self { tanks: registry })
    }

    pub fn get(&self, name: &str) -> Option<&Tank> {
        self.tanks.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tank> {
        self.tanks.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tanks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tanks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tanks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pvt::{PvtTable, WaterPvt};
    use approx::assert_relative_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fluid() -> FluidModel {
        let oil = PvtTable::from_rows(&[
            (1000.0, 1.20, 0.0020, 400.0),
            (2000.0, 1.30, 0.0010, 600.0),
            (3000.0, 1.28, 0.0008, 600.0),
        ])
        .unwrap();
        FluidModel::new(oil, WaterPvt::Default)
    }

    fn tank(name: &str) -> Tank {
        Tank::new(
            name,
            fluid(),
            ReservoirConstants {
                pi: 3000.0,
                swo: 0.2,
                cw: 3e-6,
                cf: 4e-6,
            },
        )
        .unwrap()
    }

    fn producer(name: &str, tank: &str, oil: [f64; 2]) -> Well {
        Well::new(name, tank).with_production(
            ProductionSeries::new(
                vec![ymd(2020, 1, 1), ymd(2021, 1, 1)],
                oil.to_vec(),
                vec![0.0, 0.0],
                oil.iter().map(|o| o * 700.0).collect(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn registry_routes_wells() {
        let registry = TankRegistry::build(
            vec![tank("north"), tank("south")],
            vec![
                producer("N-1", "north", [100.0, 200.0]),
                producer("S-1", "south", [50.0, 80.0]),
                producer("N-2", "north", [10.0, 20.0]),
            ],
        )
        .unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["north", "south"]);
        assert_eq!(registry.get("north").unwrap().wells().len(), 2);

        let err = TankRegistry::build(vec![tank("north")], vec![producer("X", "east", [1.0, 2.0])])
            .unwrap_err();
        assert!(matches!(err, MbalError::InvalidInput { .. }));
        assert!(TankRegistry::build(vec![tank("a"), tank("a")], vec![]).is_err());
    }

    #[test]
    fn production_totals_sum_wells() {
        let mut t = tank("north");
        t.add_well(producer("N-1", "north", [100.0, 200.0])).unwrap();
        t.add_well(
            Well::new("N-2", "north").with_production(
                ProductionSeries::new(
                    vec![ymd(2020, 7, 1)],
                    vec![30.0],
                    vec![5.0],
                    vec![21_000.0],
                )
                .unwrap(),
            ),
        )
        .unwrap();
        let totals = t.production_totals().unwrap();
        assert_eq!(totals.len(), 3);
        assert_relative_eq!(totals.oil()[0], 100.0);
        // N-1 reports nothing on N-2's date, so only N-2's volume is added there.
        assert_eq!(totals.oil().to_vec(), vec![100.0, 130.0, 230.0]);
        assert_eq!(totals.water().to_vec(), vec![0.0, 5.0, 5.0]);
        assert_eq!(totals.gas().to_vec(), vec![70_000.0, 91_000.0, 161_000.0]);
    }

    #[test]
    fn observations_use_production_at_reading_dates() {
        let well = producer("N-1", "north", [100.0, 200.0]).with_pressure(
            TimeSeries::new(
                vec![ymd(2019, 6, 1), ymd(2020, 1, 1), ymd(2020, 6, 1), ymd(2021, 1, 1)],
                vec![3000.0, 2900.0, f64::NAN, 2800.0],
            )
            .unwrap(),
        );
        let obs = well.withdrawal_observations(&fluid()).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].withdrawal, 0.0);
        assert!(obs[1].withdrawal > 0.0);
        assert!(obs[2].withdrawal > obs[1].withdrawal);
        assert!(obs.iter().all(|o| o.well == "N-1"));
    }

    #[test]
    fn pressure_only_well_has_no_withdrawal() {
        let well = Well::new("OBS-1", "north").with_pressure(
            TimeSeries::new(vec![ymd(2020, 1, 1)], vec![2950.0]).unwrap(),
        );
        let obs = well.withdrawal_observations(&fluid()).unwrap();
        assert_eq!(obs[0].withdrawal, 0.0);
        assert!(Well::new("EMPTY", "north")
            .withdrawal_observations(&fluid())
            .unwrap()
            .is_empty());
    }
}
