// Python extension module

use crate::aquifer::{
    cumulative_influx, CarterTracy, CarterTracyParams, Fetkovich, FetkovichParams, InfluxModel,
};
use crate::error::MbalError;
use crate::expansion::ReservoirConstants;
use crate::pvt::{FluidModel, PvtTable, WaterPvt};
use crate::solver::{PressureMatchSolver, SolverOptions};
use crate::withdrawal::{underground_withdrawal, WithdrawalProperties};
use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

impl From<MbalError> for PyErr {
    fn from(err: MbalError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[pymodule]
fn pytank(m: &Bound<'_, PyModule>) -> PyResult<()> {
    #[pyfn(m)]
    #[pyo3(name = "underground_withdrawal")]
    #[allow(clippy::too_many_arguments)]
    fn underground_withdrawal_py<'py>(
        py: Python<'py>,
        oil_cum: PyReadonlyArray1<f64>,
        water_cum: PyReadonlyArray1<f64>,
        gas_cum: PyReadonlyArray1<f64>,
        bo: PyReadonlyArray1<f64>,
        bw: PyReadonlyArray1<f64>,
        bg: PyReadonlyArray1<f64>,
        rs: PyReadonlyArray1<f64>,
        rsw: PyReadonlyArray1<f64>,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let props = WithdrawalProperties {
            bo: bo.as_array().to_owned().into(),
            bw: bw.as_array().to_owned().into(),
            bg: bg.as_array().to_owned().into(),
            rs: rs.as_array().to_owned().into(),
            rsw: rsw.as_array().to_owned().into(),
        };
        let uw = underground_withdrawal(
            oil_cum.as_array(),
            water_cum.as_array(),
            gas_cum.as_array(),
            &props,
        )?;
        Ok(uw.into_pyarray_bound(py))
    }

    #[pyfn(m)]
    #[pyo3(name = "fetkovich_influx")]
    #[pyo3(signature = (pressure, time, aq_radius, res_radius, aq_thickness, aq_por, ct, theta, k, water_visc, boundary = "no_flow", flow = "radial", width = None, length = None))]
    #[allow(clippy::too_many_arguments)]
    fn fetkovich_influx_py<'py>(
        py: Python<'py>,
        pressure: PyReadonlyArray1<f64>,
        time: PyReadonlyArray1<f64>,
        aq_radius: f64,
        res_radius: f64,
        aq_thickness: f64,
        aq_por: f64,
        ct: f64,
        theta: f64,
        k: f64,
        water_visc: f64,
        boundary: &str,
        flow: &str,
        width: Option<f64>,
        length: Option<f64>,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let pressure = pressure.as_array();
        let initial = pressure.get(0).copied().unwrap_or(f64::NAN);
        let params = FetkovichParams {
            aq_radius,
            res_radius,
            aq_thickness,
            aq_por,
            ct,
            theta,
            k,
            water_visc,
            boundary: boundary.parse()?,
            flow: flow.parse()?,
            width,
            length,
        };
        let aquifer = Fetkovich::new(params, initial)?;
        let we = cumulative_influx(&aquifer, pressure, time.as_array())?;
        Ok(we.into_pyarray_bound(py))
    }

    #[pyfn(m)]
    #[pyo3(name = "carter_tracy_influx")]
    #[allow(clippy::too_many_arguments)]
    fn carter_tracy_influx_py<'py>(
        py: Python<'py>,
        pressure: PyReadonlyArray1<f64>,
        time: PyReadonlyArray1<f64>,
        aq_por: f64,
        ct: f64,
        res_radius: f64,
        aq_thickness: f64,
        theta: f64,
        k: f64,
        water_visc: f64,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let pressure = pressure.as_array();
        let initial = pressure.get(0).copied().unwrap_or(f64::NAN);
        let params = CarterTracyParams {
            aq_por,
            ct,
            res_radius,
            aq_thickness,
            theta,
            k,
            water_visc,
        };
        let aquifer = CarterTracy::new(params, initial)?;
        let we = cumulative_influx(&aquifer, pressure, time.as_array())?;
        Ok(we.into_pyarray_bound(py))
    }

    /// Calculated pressure and cumulative influx for an assumed oil in place,
    /// with a no-flow radial Fetkovich aquifer.
    #[pyfn(m)]
    #[pyo3(name = "pressure_match_fetkovich")]
    #[allow(clippy::too_many_arguments)]
    fn pressure_match_fetkovich_py<'py>(
        py: Python<'py>,
        poes: f64,
        oil_cum: PyReadonlyArray1<f64>,
        water_cum: PyReadonlyArray1<f64>,
        elapsed: PyReadonlyArray1<f64>,
        pvt_pressure: PyReadonlyArray1<f64>,
        pvt_bo: PyReadonlyArray1<f64>,
        pvt_bg: PyReadonlyArray1<f64>,
        pvt_rs: PyReadonlyArray1<f64>,
        pi: f64,
        swo: f64,
        cw: f64,
        cf: f64,
        aq_radius: f64,
        res_radius: f64,
        aq_thickness: f64,
        aq_por: f64,
        ct: f64,
        theta: f64,
        k: f64,
        water_visc: f64,
    ) -> PyResult<(Bound<'py, PyArray1<f64>>, Bound<'py, PyArray1<f64>>)> {
        let oil = PvtTable::new(
            pvt_pressure.as_array().to_vec(),
            pvt_bo.as_array().to_vec(),
            pvt_bg.as_array().to_vec(),
            pvt_rs.as_array().to_vec(),
        )?;
        let fluid = FluidModel::new(oil, WaterPvt::Default);
        let constants = ReservoirConstants { pi, swo, cw, cf };
        let aquifer = Fetkovich::new(
            FetkovichParams {
                aq_radius,
                res_radius,
                aq_thickness,
                aq_por,
                ct,
                theta,
                k,
                water_visc,
                boundary: Default::default(),
                flow: Default::default(),
                width: None,
                length: None,
            },
            pi,
        )?;
        let solver = PressureMatchSolver::new(
            &fluid,
            constants,
            Some(&aquifer as &dyn InfluxModel),
            SolverOptions::default(),
        )?;
        let matched = solver.solve(
            poes,
            oil_cum.as_array(),
            water_cum.as_array(),
            elapsed.as_array(),
        )?;
        Ok((
            matched.pressures.into_pyarray_bound(py),
            matched.cumulative_influx.into_pyarray_bound(py),
        ))
    }

    Ok(())
}
