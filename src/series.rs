//! Date-indexed series handed to the engine by the ingestion layer.
//!
//! Both types check their invariants on construction, so everything
//! downstream can assume a strictly increasing date index.

use crate::error::{ensure_same_len, MbalError, MbalResult};
use chrono::NaiveDate;
use ndarray::{Array1, ArrayView1};

/// An ordered sequence of `(date, value)` pairs.
///
/// `NaN` marks a missing reading; infinite values are rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Array1<f64>,
}

impl TimeSeries {
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> MbalResult<Self> {
        ensure_same_len("time series dates/values", dates.len(), values.len())?;
        ensure_strictly_increasing(&dates)?;
        if values.iter().any(|v| v.is_infinite()) {
            return Err(MbalError::invalid("time series contains infinite values"));
        }
        Ok(Self {
            dates,
            values: Array1::from(values),
        })
    }

    pub fn from_pairs<I>(pairs: I) -> MbalResult<Self>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let (dates, values) = pairs.into_iter().unzip();
        Self::new(dates, values)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    pub fn has_missing(&self) -> bool {
        self.values.iter().any(|v| v.is_nan())
    }

    /// Copy of the series without its missing readings.
    pub fn dropna(&self) -> TimeSeries {
        let (dates, values): (Vec<_>, Vec<_>) = self.iter().filter(|(_, v)| !v.is_nan()).unzip();
        TimeSeries {
            dates,
            values: Array1::from(values),
        }
    }

    /// Linear interpolation in days; `left` before the first date, the last
    /// value after the last date.
    pub fn interpolate_at(&self, date: NaiveDate, left: f64) -> f64 {
        interp_by_date(&self.dates, self.values.view(), date, left)
    }

    /// Fills missing readings linearly in time between their defined
    /// neighbours. Leading and trailing gaps take the nearest defined value.
    pub fn fill_missing(&self) -> MbalResult<TimeSeries> {
        let known = self.dropna();
        if known.is_empty() {
            return Err(MbalError::invalid("time series has no defined values"));
        }
        let first = known.values[0];
        let values = self
            .iter()
            .map(|(date, value)| {
                if value.is_nan() {
                    known.interpolate_at(date, first)
                } else {
                    value
                }
            })
            .collect();
        Ok(TimeSeries {
            dates: self.dates.clone(),
            values,
        })
    }

    pub fn is_non_decreasing(&self) -> bool {
        is_non_decreasing(self.values.view())
    }
}

/// Cumulative oil, water and gas production of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionSeries {
    dates: Vec<NaiveDate>,
    oil: Array1<f64>,
    water: Array1<f64>,
    gas: Array1<f64>,
}

/// Cumulative volumes at one date.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CumulativeProduction {
    pub oil: f64,
    pub water: f64,
    pub gas: f64,
}

impl ProductionSeries {
    pub fn new(
        dates: Vec<NaiveDate>,
        oil: Vec<f64>,
        water: Vec<f64>,
        gas: Vec<f64>,
    ) -> MbalResult<Self> {
        ensure_same_len("production dates/oil", dates.len(), oil.len())?;
        ensure_same_len("production dates/water", dates.len(), water.len())?;
        ensure_same_len("production dates/gas", dates.len(), gas.len())?;
        ensure_strictly_increasing(&dates)?;
        for (name, column) in [("oil", &oil), ("water", &water), ("gas", &gas)] {
            if column.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(MbalError::invalid(format!(
                    "cumulative {name} must be finite and non-negative"
                )));
            }
            if column.windows(2).any(|w| w[1] < w[0]) {
                return Err(MbalError::invalid(format!(
                    "cumulative {name} decreases with time"
                )));
            }
        }
        Ok(Self {
            dates,
            oil: Array1::from(oil),
            water: Array1::from(water),
            gas: Array1::from(gas),
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn oil(&self) -> ArrayView1<'_, f64> {
        self.oil.view()
    }

    pub fn water(&self) -> ArrayView1<'_, f64> {
        self.water.view()
    }

    pub fn gas(&self) -> ArrayView1<'_, f64> {
        self.gas.view()
    }

    /// Cumulative volumes interpolated at `date`. Nothing has been produced
    /// before the first record.
    pub fn at(&self, date: NaiveDate) -> CumulativeProduction {
        CumulativeProduction {
            oil: interp_by_date(&self.dates, self.oil.view(), date, 0.0),
            water: interp_by_date(&self.dates, self.water.view(), date, 0.0),
            gas: interp_by_date(&self.dates, self.gas.view(), date, 0.0),
        }
    }
}

/// Per-period increments of a cumulative column. The first period has no
/// predecessor, so its increment is its own value.
pub fn first_difference(values: ArrayView1<'_, f64>) -> Array1<f64> {
    let mut diff = values.to_owned();
    for i in (1..values.len()).rev() {
        diff[i] = values[i] - values[i - 1];
    }
    diff
}

pub fn is_non_decreasing(values: ArrayView1<'_, f64>) -> bool {
    values
        .iter()
        .zip(values.iter().skip(1))
        .all(|(prev, next)| next >= prev)
}

pub fn days_between(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64
}

fn ensure_strictly_increasing(dates: &[NaiveDate]) -> MbalResult<()> {
    match dates.windows(2).find(|w| w[1] <= w[0]) {
        Some(w) => Err(MbalError::invalid(format!(
            "dates must be strictly increasing ({} followed by {})",
            w[0], w[1]
        ))),
        None => Ok(()),
    }
}

fn interp_by_date(dates: &[NaiveDate], values: ArrayView1<'_, f64>, date: NaiveDate, left: f64) -> f64 {
    let Some(&first) = dates.first() else {
        return left;
    };
    if date < first {
        return left;
    }
    let upper = dates.partition_point(|d| *d <= date);
    if upper == dates.len() {
        return values[dates.len() - 1];
    }
    let lower = upper - 1;
    let span = days_between(dates[lower], dates[upper]);
    let frac = days_between(dates[lower], date) / span;
    let (a, b) = (values[lower], values[upper]);
    // Bounded by the segment endpoints.
    (a + frac * (b - a)).max(a.min(b)).min(a.max(b))
}
