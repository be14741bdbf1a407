//! Underground withdrawal (F): the cumulative reservoir volume of every
//! produced fluid.

use crate::error::{ensure_same_len, MbalError, MbalResult};
use crate::series::first_difference;
use ndarray::{Array1, ArrayView1};

/// A fluid property that is either constant or given per period.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Constant(f64),
    Series(Array1<f64>),
}

impl Property {
    fn at(&self, period: usize) -> f64 {
        match self {
            Property::Constant(value) => *value,
            Property::Series(values) => values[period],
        }
    }

    fn check_len(&self, what: &'static str, periods: usize) -> MbalResult<()> {
        match self {
            Property::Constant(_) => Ok(()),
            Property::Series(values) => ensure_same_len(what, values.len(), periods),
        }
    }
}

impl From<f64> for Property {
    fn from(value: f64) -> Self {
        Property::Constant(value)
    }
}

impl From<Array1<f64>> for Property {
    fn from(values: Array1<f64>) -> Self {
        Property::Series(values)
    }
}

impl From<Vec<f64>> for Property {
    fn from(values: Vec<f64>) -> Self {
        Property::Series(Array1::from(values))
    }
}

/// Formation volume factors and solution ratios used to bring surface
/// volumes to reservoir conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalProperties {
    /// Oil formation volume factor (rb/stb)
    pub bo: Property,
    /// Water formation volume factor (rb/stb)
    pub bw: Property,
    /// Gas formation volume factor (rb/scf)
    pub bg: Property,
    /// Solution gas-oil ratio (scf/stb)
    pub rs: Property,
    /// Solution gas-water ratio (scf/stb)
    pub rsw: Property,
}

/// Cumulative underground withdrawal from cumulative production.
///
/// Per period, the produced increments are converted to reservoir volume:
///
/// $$F_n = \Delta N_p B_o + \Delta W_p B_w + (\Delta G_p - \Delta N_p R_s - \Delta W_p R_{sw}) B_g$$
///
/// and the result is the running sum of $F_n$. The first period's increment
/// is its own cumulative value.
///
/// # Errors
/// * [`MbalError::InvalidInput`] if a cumulative value is not finite.
/// * [`MbalError::DecreasingProduction`] if a cumulative column drops from
///   one period to the next.
/// * [`MbalError::NegativeFreeGas`] if the reported gas is less than the gas
///   released from solution in any period.
/// * [`MbalError::LengthMismatch`] if the columns or property series differ in length.
pub fn underground_withdrawal(
    oil_cum: ArrayView1<'_, f64>,
    water_cum: ArrayView1<'_, f64>,
    gas_cum: ArrayView1<'_, f64>,
    props: &WithdrawalProperties,
) -> MbalResult<Array1<f64>> {
    let n = oil_cum.len();
    ensure_same_len("oil/water cumulative", n, water_cum.len())?;
    ensure_same_len("oil/gas cumulative", n, gas_cum.len())?;
    props.bo.check_len("Bo series", n)?;
    props.bw.check_len("Bw series", n)?;
    props.bg.check_len("Bg series", n)?;
    props.rs.check_len("Rs series", n)?;
    props.rsw.check_len("Rsw series", n)?;

    let oil_vol = first_difference(oil_cum);
    let water_vol = first_difference(water_cum);
    let gas_vol = first_difference(gas_cum);
    for (column, increments) in [("oil", &oil_vol), ("water", &water_vol), ("gas", &gas_vol)] {
        if increments.iter().any(|v| !v.is_finite()) {
            return Err(MbalError::invalid(format!("cumulative {column} must be finite")));
        }
        // The first entry is a cumulative value, not a change.
        if let Some(period) = increments.iter().skip(1).position(|v| *v < 0.0) {
            return Err(MbalError::DecreasingProduction {
                column,
                period: period + 1,
            });
        }
    }

    let mut uw = Array1::zeros(n);
    let mut total = 0.0;
    for i in 0..n {
        let free_gas = gas_vol[i] - oil_vol[i] * props.rs.at(i) - water_vol[i] * props.rsw.at(i);
        if free_gas.is_nan() || free_gas < 0.0 {
            return Err(MbalError::NegativeFreeGas {
                period: i,
                value: free_gas,
            });
        }
        total += oil_vol[i] * props.bo.at(i)
            + water_vol[i] * props.bw.at(i)
            + free_gas * props.bg.at(i);
        uw[i] = total;
    }
    Ok(uw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn constant_props() -> WithdrawalProperties {
        WithdrawalProperties {
            bo: 1.1.into(),
            bw: 1.0.into(),
            bg: 0.001.into(),
            rs: 10.0.into(),
            rsw: 0.0.into(),
        }
    }

    #[test]
    fn single_well_example() {
        let uw = underground_withdrawal(
            array![0.0, 100.0, 250.0].view(),
            array![0.0, 10.0, 10.0].view(),
            array![0.0, 1000.0, 2500.0].view(),
            &constant_props(),
        )
        .unwrap();
        assert_relative_eq!(uw[0], 0.0);
        assert_relative_eq!(uw[1], 120.0, epsilon = 1e-9);
        assert_relative_eq!(uw[2], 120.0 + 165.0, epsilon = 1e-9);
    }

    #[test]
    fn free_gas_uses_gas_fvf() {
        let uw = underground_withdrawal(
            array![100.0].view(),
            array![0.0].view(),
            array![3000.0].view(),
            &constant_props(),
        )
        .unwrap();
        assert_relative_eq!(uw[0], 110.0 + 2000.0 * 0.001, epsilon = 1e-12);
    }

    #[test]
    fn negative_free_gas_fails() {
        let err = underground_withdrawal(
            array![0.0, 100.0].view(),
            array![0.0, 0.0].view(),
            array![0.0, 500.0].view(),
            &constant_props(),
        )
        .unwrap_err();
        assert!(matches!(err, MbalError::NegativeFreeGas { period: 1, .. }));
    }

    #[test]
    fn decreasing_production_fails() {
        let err = underground_withdrawal(
            array![0.0, 100.0, 50.0].view(),
            array![0.0, 10.0, 10.0].view(),
            array![0.0, 1000.0, 1000.0].view(),
            &constant_props(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            MbalError::DecreasingProduction {
                column: "oil",
                period: 2
            }
        );
        assert!(err.is_consistency());

        let err = underground_withdrawal(
            array![0.0, 100.0].view(),
            array![10.0, 5.0].view(),
            array![0.0, 1000.0].view(),
            &constant_props(),
        )
        .unwrap_err();
        assert!(matches!(err, MbalError::DecreasingProduction { column: "water", period: 1 }));
    }

    #[test]
    fn missing_values_fail() {
        let err = underground_withdrawal(
            array![0.0, f64::NAN].view(),
            array![0.0, 0.0].view(),
            array![0.0, 1000.0].view(),
            &constant_props(),
        )
        .unwrap_err();
        assert!(matches!(err, MbalError::InvalidInput { .. }));

        let props = WithdrawalProperties {
            rs: f64::NAN.into(),
            ..constant_props()
        };
        let err = underground_withdrawal(
            array![0.0, 100.0].view(),
            array![0.0, 0.0].view(),
            array![0.0, 1000.0].view(),
            &props,
        )
        .unwrap_err();
        assert!(matches!(err, MbalError::NegativeFreeGas { period: 0, .. }));
    }

    #[test]
    fn series_properties_per_period() {
        let props = WithdrawalProperties {
            bo: vec![1.2, 1.3].into(),
            ..constant_props()
        };
        let uw = underground_withdrawal(
            array![10.0, 20.0].view(),
            array![0.0, 0.0].view(),
            array![100.0, 200.0].view(),
            &props,
        )
        .unwrap();
        assert_relative_eq!(uw[0], 12.0, epsilon = 1e-12);
        assert_relative_eq!(uw[1], 25.0, epsilon = 1e-12);
    }

    #[test]
    fn mismatched_series_fail() {
        let props = WithdrawalProperties {
            bg: vec![0.001].into(),
            ..constant_props()
        };
        let err = underground_withdrawal(
            array![10.0, 20.0].view(),
            array![0.0, 0.0].view(),
            array![100.0, 200.0].view(),
            &props,
        )
        .unwrap_err();
        assert!(matches!(err, MbalError::LengthMismatch { .. }));
    }
}
