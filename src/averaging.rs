//! Volumetric averaging of multi-well pressure readings.
//!
//! Readings taken while a well is withdrawing fluid are weighted by the
//! withdrawal change per unit pressure change; readings without a change in
//! withdrawal or pressure are averaged arithmetically. The two partial
//! averages of a reporting bucket are then combined.

use crate::error::{MbalError, MbalResult};
use crate::series::TimeSeries;
use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Length of a reporting bucket. Buckets start on the first day of the
/// month and are aligned to the calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
}

impl Frequency {
    pub fn months(self) -> u32 {
        match self {
            Frequency::Monthly => 1,
            Frequency::Quarterly => 3,
            Frequency::SemiAnnual => 6,
            Frequency::Annual => 12,
        }
    }

    /// First day of the bucket containing `date`.
    pub fn bucket_start(self, date: NaiveDate) -> NaiveDate {
        let months = self.months();
        let month0 = date.month0() - date.month0() % months;
        NaiveDate::from_ymd_opt(date.year(), month0 + 1, 1).unwrap_or(date)
    }

    /// First day of the bucket after the one starting at `start`.
    pub fn next_start(self, start: NaiveDate) -> NaiveDate {
        start
            .checked_add_months(Months::new(self.months()))
            .unwrap_or(NaiveDate::MAX)
    }
}

/// Where the reported date sits within its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePosition {
    #[default]
    Begin,
    Middle,
    End,
}

impl DatePosition {
    fn place(self, start: NaiveDate, next: NaiveDate) -> NaiveDate {
        match self {
            DatePosition::Begin => start,
            DatePosition::Middle => start + Duration::days((next - start).num_days() / 2),
            DatePosition::End => next,
        }
    }
}

/// One pressure reading of a well together with the well's cumulative
/// underground withdrawal at that date.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureObservation {
    pub well: String,
    pub date: NaiveDate,
    /// `NaN` when the reading is missing.
    pub pressure: f64,
    /// `NaN` is read as no withdrawal.
    pub withdrawal: f64,
}

struct Row {
    pressure: f64,
    delta_uw: f64,
    delta_p: f64,
}

/// Reduces pressure readings of several wells to one pressure per bucket.
///
/// For the rows of a bucket where both the withdrawal and pressure changed:
///
/// $$\bar p_1 = \frac{\sum p\,\Delta F/\Delta p}{\sum \Delta F/\Delta p}$$
///
/// and for the rest $\bar p_2$ is their arithmetic mean. The bucket value is
/// the mean of whichever partial averages exist, and `NaN` when neither does.
/// Empty buckets between the first and last reading are reported as `NaN`.
///
/// # Errors
/// * [`MbalError::NonMonotonicWithdrawal`] when a well's withdrawal decreases in time.
/// * [`MbalError::InvalidInput`] when no reading has a pressure.
pub fn pressure_vol_avg(
    observations: &[PressureObservation],
    frequency: Frequency,
    position: DatePosition,
) -> MbalResult<TimeSeries> {
    let mut rows: Vec<&PressureObservation> =
        observations.iter().filter(|o| !o.pressure.is_nan()).collect();
    let dropped = observations.len() - rows.len();
    if dropped > 0 {
        debug!(dropped, "dropped readings without pressure");
    }
    if rows.is_empty() {
        return Err(MbalError::invalid("no pressure readings to average"));
    }
    rows.sort_by_key(|o| o.date);

    let withdrawal = |o: &PressureObservation| if o.withdrawal.is_nan() { 0.0 } else { o.withdrawal };

    // Per-well deltas; the first reading of a well is its own delta.
    let mut last: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    let mut buckets: BTreeMap<NaiveDate, Vec<Row>> = BTreeMap::new();
    for obs in &rows {
        let uw = withdrawal(*obs);
        let (delta_uw, delta_p) = match last.get(obs.well.as_str()) {
            Some(&(prev_uw, prev_p)) => {
                if uw < prev_uw {
                    return Err(MbalError::NonMonotonicWithdrawal {
                        well: obs.well.clone(),
                    });
                }
                (uw - prev_uw, obs.pressure - prev_p)
            }
            None => (uw, obs.pressure),
        };
        last.insert(obs.well.as_str(), (uw, obs.pressure));
        buckets
            .entry(frequency.bucket_start(obs.date))
            .or_default()
            .push(Row {
                pressure: obs.pressure,
                delta_uw,
                delta_p,
            });
    }

    let first = frequency.bucket_start(rows[0].date);
    let last_bucket = frequency.bucket_start(rows[rows.len() - 1].date);
    let mut dates = Vec::new();
    let mut values = Vec::new();
    let mut start = first;
    while start <= last_bucket {
        let next = frequency.next_start(start);
        let value = match buckets.get(&start) {
            Some(group) => bucket_average(group),
            None => f64::NAN,
        };
        if value.is_nan() {
            trace!(bucket = %start, "bucket has no usable pressure");
        }
        dates.push(position.place(start, next));
        values.push(value);
        start = next;
    }
    TimeSeries::new(dates, values)
}

fn bucket_average(group: &[Row]) -> f64 {
    let (dynamic, fixed): (Vec<&Row>, Vec<&Row>) = group
        .iter()
        .partition(|r| r.delta_uw.abs() > 0.0 && r.delta_p.abs() > 0.0);

    let mut partials = Vec::with_capacity(2);
    if !dynamic.is_empty() {
        let weight: f64 = dynamic.iter().map(|r| r.delta_uw / r.delta_p).sum();
        let weighted: f64 = dynamic
            .iter()
            .map(|r| r.pressure * r.delta_uw / r.delta_p)
            .sum();
        let avg = weighted / weight;
        if avg.is_finite() {
            partials.push(avg);
        }
    }
    if !fixed.is_empty() {
        partials.push(fixed.iter().map(|r| r.pressure).sum::<f64>() / fixed.len() as f64);
    }
    if partials.is_empty() {
        f64::NAN
    } else {
        partials.iter().sum::<f64>() / partials.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs(well: &str, date: NaiveDate, pressure: f64, withdrawal: f64) -> PressureObservation {
        PressureObservation {
            well: well.into(),
            date,
            pressure,
            withdrawal,
        }
    }

    #[test]
    fn bucket_boundaries() {
        let d = ymd(2021, 8, 17);
        assert_eq!(Frequency::Monthly.bucket_start(d), ymd(2021, 8, 1));
        assert_eq!(Frequency::Quarterly.bucket_start(d), ymd(2021, 7, 1));
        assert_eq!(Frequency::SemiAnnual.bucket_start(d), ymd(2021, 7, 1));
        assert_eq!(Frequency::Annual.bucket_start(d), ymd(2021, 1, 1));
        assert_eq!(Frequency::SemiAnnual.next_start(ymd(2021, 7, 1)), ymd(2022, 1, 1));
    }

    #[test]
    fn static_readings_reduce_to_mean() {
        let data = vec![
            obs("A", ymd(2020, 1, 10), 3000.0, 0.0),
            obs("B", ymd(2020, 2, 10), 2900.0, 0.0),
            obs("C", ymd(2020, 3, 10), 2800.0, 0.0),
        ];
        let avg = pressure_vol_avg(&data, Frequency::Annual, DatePosition::Begin).unwrap();
        assert_eq!(avg.dates(), &[ymd(2020, 1, 1)]);
        assert_relative_eq!(avg.values()[0], 2900.0);
    }

    #[test]
    fn dynamic_rows_are_withdrawal_weighted() {
        // Well A: first row is its own delta (dynamic), second row changes both.
        let data = vec![
            obs("A", ymd(2020, 1, 5), 3000.0, 100.0),
            obs("A", ymd(2020, 2, 5), 2900.0, 300.0),
        ];
        let avg = pressure_vol_avg(&data, Frequency::Annual, DatePosition::Begin).unwrap();
        // weights: 100/3000 and 200/-100
        let w1 = 100.0 / 3000.0;
        let w2 = 200.0 / -100.0;
        let expected = (3000.0 * w1 + 2900.0 * w2) / (w1 + w2);
        assert_relative_eq!(avg.values()[0], expected, epsilon = 1e-9);
    }

    #[test]
    fn mixed_bucket_averages_partials() {
        let data = vec![
            obs("A", ymd(2020, 1, 5), 3000.0, 100.0),
            obs("B", ymd(2020, 1, 6), 2800.0, 0.0),
        ];
        let avg = pressure_vol_avg(&data, Frequency::Monthly, DatePosition::Begin).unwrap();
        assert_relative_eq!(avg.values()[0], (3000.0 + 2800.0) / 2.0);
    }

    #[test]
    fn empty_buckets_are_missing() {
        let data = vec![
            obs("A", ymd(2020, 1, 5), 3000.0, 0.0),
            obs("A", ymd(2020, 3, 5), 2950.0, 0.0),
        ];
        let avg = pressure_vol_avg(&data, Frequency::Monthly, DatePosition::Begin).unwrap();
        assert_eq!(avg.len(), 3);
        assert!(avg.values()[1].is_nan());
    }

    #[test]
    fn missing_pressure_dropped_and_missing_withdrawal_zero() {
        let data = vec![
            obs("A", ymd(2020, 1, 5), f64::NAN, 10.0),
            obs("A", ymd(2020, 1, 9), 3100.0, f64::NAN),
            obs("B", ymd(2020, 1, 9), 2900.0, 0.0),
        ];
        let avg = pressure_vol_avg(&data, Frequency::Monthly, DatePosition::Begin).unwrap();
        assert_relative_eq!(avg.values()[0], 3000.0);
    }

    #[test]
    fn decreasing_withdrawal_fails() {
        let data = vec![
            obs("A", ymd(2020, 1, 5), 3000.0, 100.0),
            obs("A", ymd(2020, 6, 5), 2900.0, 50.0),
        ];
        let err = pressure_vol_avg(&data, Frequency::Annual, DatePosition::Begin).unwrap_err();
        assert_eq!(err, MbalError::NonMonotonicWithdrawal { well: "A".into() });
    }

    #[test]
    fn date_positions() {
        let data = vec![obs("A", ymd(2020, 3, 5), 3000.0, 0.0)];
        let middle = pressure_vol_avg(&data, Frequency::SemiAnnual, DatePosition::Middle).unwrap();
        assert_eq!(middle.dates(), &[ymd(2020, 4, 1)]);
        let end = pressure_vol_avg(&data, Frequency::SemiAnnual, DatePosition::End).unwrap();
        assert_eq!(end.dates(), &[ymd(2020, 7, 1)]);
    }
}
