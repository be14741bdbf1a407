use chrono::{Duration, NaiveDate};
use ndarray::Array1;
use proptest::prelude::*;
use pytank::aquifer::{Boundary, Fetkovich, FetkovichParams, Flow};
use pytank::{
    cumulative_influx, pressure_vol_avg, underground_withdrawal, DatePosition, Frequency,
    PressureObservation, PvtTable, WithdrawalProperties,
};

fn cumulative(increments: &[f64]) -> Array1<f64> {
    increments
        .iter()
        .scan(0.0, |total, inc| {
            *total += inc;
            Some(*total)
        })
        .collect()
}

fn fetkovich(initial_pressure: f64) -> Fetkovich {
    Fetkovich::new(
        FetkovichParams {
            aq_radius: 46000.0,
            res_radius: 9200.0,
            aq_thickness: 100.0,
            aq_por: 0.25,
            ct: 7e-6,
            theta: 140.0,
            k: 200.0,
            water_visc: 0.55,
            boundary: Boundary::NoFlow,
            flow: Flow::Radial,
            width: None,
            length: None,
        },
        initial_pressure,
    )
    .unwrap()
}

proptest! {
    #[test]
    fn withdrawal_never_decreases(
        steps in prop::collection::vec((0.0f64..1e4, 0.0f64..1e4, 0.0f64..1.0), 1..30)
    ) {
        let rs = 500.0;
        let oil: Vec<f64> = steps.iter().map(|s| s.0).collect();
        let water: Vec<f64> = steps.iter().map(|s| s.1).collect();
        // Gas above the solution gas keeps the free gas positive.
        let gas: Vec<f64> = steps.iter().map(|s| s.0 * rs + 1.0 + s.2 * 1000.0).collect();
        let props = WithdrawalProperties {
            bo: 1.2.into(),
            bw: 1.01.into(),
            bg: 0.001.into(),
            rs: rs.into(),
            rsw: 0.0.into(),
        };
        let uw = underground_withdrawal(
            cumulative(&oil).view(),
            cumulative(&water).view(),
            cumulative(&gas).view(),
            &props,
        )
        .unwrap();
        prop_assert!(uw.iter().all(|v| *v >= 0.0));
        prop_assert!(uw.windows(2).into_iter().all(|w| w[1] >= w[0]));
    }

    #[test]
    fn fetkovich_bounded_by_max_influx(
        drops in prop::collection::vec(0.0f64..150.0, 1..25),
        dt in 30.0f64..400.0,
    ) {
        let pi = 2740.0;
        let aquifer = fetkovich(pi);
        let pressure: Array1<f64> = std::iter::once(pi)
            .chain(drops.iter().scan(pi, |p, d| {
                *p = (*p - d).max(100.0);
                Some(*p)
            }))
            .collect();
        let time: Array1<f64> = (0..pressure.len()).map(|i| i as f64 * dt).collect();
        let we = cumulative_influx(&aquifer, pressure.view(), time.view()).unwrap();
        prop_assert_eq!(we[0], 0.0);
        prop_assert!(we.windows(2).into_iter().all(|w| w[1] >= w[0] - 1e-6));
        prop_assert!(we.iter().all(|v| *v <= aquifer.max_influx() * (1.0 + 1e-12)));
    }

    #[test]
    fn static_buckets_average_to_mean(
        pressures in prop::collection::vec(1000.0f64..5000.0, 1..20),
    ) {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let observations: Vec<PressureObservation> = pressures
            .iter()
            .enumerate()
            .map(|(i, &p)| PressureObservation {
                well: format!("W{i}"),
                date: start + Duration::days(i as i64 * 7),
                pressure: p,
                withdrawal: 0.0,
            })
            .collect();
        let avg = pressure_vol_avg(&observations, Frequency::Annual, DatePosition::Begin).unwrap();
        let mean = pressures.iter().sum::<f64>() / pressures.len() as f64;
        prop_assert_eq!(avg.len(), 1);
        prop_assert!((avg.values()[0] - mean).abs() <= 1e-9 * mean);
    }

    #[test]
    fn pvt_hits_tabulated_rows(
        rows in prop::collection::btree_map(0u32..10_000, (0.5f64..3.0, 1e-4f64..1e-2, 0.0f64..2000.0), 2..12),
    ) {
        let rows: Vec<(f64, f64, f64, f64)> = rows
            .into_iter()
            .map(|(p, (bo, bg, rs))| (p as f64, bo, bg, rs))
            .collect();
        let table = PvtTable::from_rows(&rows).unwrap();
        for &(p, bo, bg, rs) in &rows {
            prop_assert!((table.bo_at(p) - bo).abs() <= 1e-9 * bo.abs().max(1.0));
            prop_assert!((table.bg_at(p) - bg).abs() <= 1e-9);
            prop_assert!((table.rs_at(p) - rs).abs() <= 1e-9 * rs.abs().max(1.0));
        }
    }
}

#[test]
fn pvt_extrapolates_linearly() {
    let table = PvtTable::from_rows(&[
        (100.0, 10.0, 1.0, 10.3),
        (200.0, 20.0, 2.0, 34.0),
        (300.0, 30.0, 45.0, 50.0),
    ])
    .unwrap();
    assert!((table.bo_at(150.0) - 15.0).abs() < 1e-12);
    assert!((table.rs_at(150.0) - 22.15).abs() < 1e-12);
    assert!((table.bo_at(50.0) - 5.0).abs() < 1e-12);
    assert!((table.bo_at(400.0) - 40.0).abs() < 1e-12);
    assert!((table.bg_at(400.0) - 88.0).abs() < 1e-9);
}
