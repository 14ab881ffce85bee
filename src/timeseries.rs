// src/timeseries.rs
//
// Per-(fund, security) quarterly position series.
//
// The horizon is every distinct report date seen in any filing, oldest
// first. Each (fund CIK, CUSIP) group is walked across that horizon and each
// date is resolved to one [`Transition`]:
//
// | observation | previous entry     | outcome              |
// |-------------|--------------------|----------------------|
// | no          | none               | `CarryForwardZero`   |
// | no          | nonzero value      | `Exit`               |
// | no          | zero value         | `Suppress`           |
// | yes         | none               | `Enter` (delta 0)    |
// | yes         | some               | `Continue`           |
//
// Output is sparse: a closed position emits one zero row and then nothing
// until it reopens.

use crate::edgar::models::Filing;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterlyPosition {
    pub fund_cik: String,
    pub cusip: String,
    pub report_date: NaiveDate,
    pub value: f64,
    pub value_delta: f64,
    pub shares: f64,
    pub shares_delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub value: f64,
    pub shares: f64,
}

impl Observation {
    pub const ZERO: Observation = Observation { value: 0.0, shares: 0.0 };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// Never held yet: zero row, zero delta.
    CarryForwardZero,
    /// Held last time, gone now: zero row, delta is minus the previous amounts.
    Exit { value_delta: f64, shares_delta: f64 },
    /// First sighting with nothing before it: delta 0.
    Enter,
    Continue { value_delta: f64, shares_delta: f64 },
    /// Already closed; nothing to emit.
    Suppress,
}

pub fn transition(current: Option<&Observation>, previous: Option<&Observation>) -> Transition {
    match (current, previous) {
        (None, None) => Transition::CarryForwardZero,
        (None, Some(prev)) if prev.value != 0.0 => Transition::Exit {
            value_delta: -prev.value,
            shares_delta: -prev.shares,
        },
        (None, Some(_)) => Transition::Suppress,
        (Some(_), None) => Transition::Enter,
        (Some(cur), Some(prev)) => Transition::Continue {
            value_delta: cur.value - prev.value,
            shares_delta: cur.shares - prev.shares,
        },
    }
}

/// Accumulates observations filing by filing, then walks the horizon.
///
/// Only the horizon and the grouped observations are held in memory; filings
/// can be streamed in one at a time.
#[derive(Debug, Default)]
pub struct TimeSeriesBuilder {
    horizon: BTreeSet<NaiveDate>,
    groups: BTreeMap<(String, String), BTreeMap<NaiveDate, Observation>>,
}

impl TimeSeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows for the same CUSIP within one filing are summed. A later filing
    /// for the same fund and date replaces the earlier observation.
    pub fn add_filing(&mut self, filing: &Filing) {
        let Some(report_date) = filing.report_date else {
            tracing::debug!("{} has no report date, left out of the time series", filing.external_id);
            return;
        };
        self.horizon.insert(report_date);

        let mut per_cusip: BTreeMap<&str, Observation> = BTreeMap::new();
        for holding in &filing.holdings {
            let entry = per_cusip.entry(holding.cusip.as_str()).or_insert(Observation::ZERO);
            entry.value += holding.value;
            entry.shares += holding.shares_or_principal_amount;
        }

        for (cusip, observation) in per_cusip {
            let key = (filing.cik.clone(), cusip.to_string());
            if self
                .groups
                .entry(key)
                .or_default()
                .insert(report_date, observation)
                .is_some()
            {
                tracing::debug!(
                    "{}: replacing earlier {} observation for {} on {}",
                    filing.external_id,
                    filing.cik,
                    cusip,
                    report_date
                );
            }
        }
    }

    pub fn build(&self) -> Vec<QuarterlyPosition> {
        let mut positions = Vec::new();
        for ((fund_cik, cusip), observations) in &self.groups {
            let mut previous: Option<Observation> = None;

            for date in &self.horizon {
                let current = observations.get(date);
                let (observed, value_delta, shares_delta) = match transition(current, previous.as_ref()) {
                    Transition::Suppress => continue,
                    Transition::CarryForwardZero => (Observation::ZERO, 0.0, 0.0),
                    Transition::Exit {
                        value_delta,
                        shares_delta,
                    } => (Observation::ZERO, value_delta, shares_delta),
                    Transition::Enter => (current.copied().unwrap_or(Observation::ZERO), 0.0, 0.0),
                    Transition::Continue {
                        value_delta,
                        shares_delta,
                    } => (current.copied().unwrap_or(Observation::ZERO), value_delta, shares_delta),
                };

                previous = Some(observed);
                positions.push(QuarterlyPosition {
                    fund_cik: fund_cik.clone(),
                    cusip: cusip.clone(),
                    report_date: *date,
                    value: observed.value,
                    value_delta,
                    shares: observed.shares,
                    shares_delta,
                });
            }
        }
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::models::Holding;

    fn date(month: u32) -> NaiveDate {
        let day = if month == 6 || month == 9 { 30 } else { 31 };
        NaiveDate::from_ymd_opt(2023, month, day).unwrap()
    }

    fn filing(cik: &str, month: u32, holdings: &[(&str, f64, f64)]) -> Filing {
        Filing {
            external_id: format!("{cik}-{month}"),
            cik: cik.to_string(),
            report_date: Some(date(month)),
            holdings: holdings
                .iter()
                .map(|(cusip, value, shares)| Holding {
                    cusip: cusip.to_string(),
                    value: *value,
                    shares_or_principal_amount: *shares,
                    ..Holding::default()
                })
                .collect(),
            ..Filing::default()
        }
    }

    fn series(builder: &TimeSeriesBuilder, cik: &str, cusip: &str) -> Vec<(NaiveDate, f64, f64)> {
        builder
            .build()
            .into_iter()
            .filter(|p| p.fund_cik == cik && p.cusip == cusip)
            .map(|p| (p.report_date, p.value, p.value_delta))
            .collect()
    }

    #[test]
    fn transition_table() {
        let zero = Observation { value: 0.0, shares: 0.0 };
        let held = Observation { value: 100.0, shares: 10.0 };
        assert_eq!(transition(None, None), Transition::CarryForwardZero);
        assert_eq!(
            transition(None, Some(&held)),
            Transition::Exit { value_delta: -100.0, shares_delta: -10.0 }
        );
        assert_eq!(transition(None, Some(&zero)), Transition::Suppress);
        assert_eq!(transition(Some(&held), None), Transition::Enter);
        assert_eq!(
            transition(Some(&held), Some(&zero)),
            Transition::Continue { value_delta: 100.0, shares_delta: 10.0 }
        );
    }

    #[test]
    fn gap_without_earlier_horizon_enters_at_zero_delta() {
        // Other fund provides the Q2 and Q4 horizon dates.
        let mut builder = TimeSeriesBuilder::new();
        builder.add_filing(&filing("A", 3, &[("037833100", 100.0, 10.0)]));
        builder.add_filing(&filing("A", 9, &[("037833100", 100.0, 10.0)]));
        builder.add_filing(&filing("B", 6, &[]));
        builder.add_filing(&filing("B", 12, &[]));

        assert_eq!(
            series(&builder, "A", "037833100"),
            vec![
                (date(3), 100.0, 0.0),
                (date(6), 0.0, -100.0),
                (date(9), 100.0, 100.0),
                (date(12), 0.0, -100.0),
            ]
        );
    }

    #[test]
    fn gap_with_earlier_horizon_date_starts_from_zero_row() {
        let mut builder = TimeSeriesBuilder::new();
        builder.add_filing(&Filing {
            report_date: NaiveDate::from_ymd_opt(2022, 12, 31),
            ..filing("B", 12, &[])
        });
        builder.add_filing(&filing("A", 3, &[("037833100", 100.0, 10.0)]));
        builder.add_filing(&filing("A", 9, &[("037833100", 100.0, 10.0)]));
        builder.add_filing(&filing("B", 6, &[]));
        builder.add_filing(&filing("B", 12, &[]));

        let rows = series(&builder, "A", "037833100");
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], (NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(), 0.0, 0.0));
        assert_eq!(&rows[1..], &[
            (date(3), 100.0, 100.0),
            (date(6), 0.0, -100.0),
            (date(9), 100.0, 100.0),
            (date(12), 0.0, -100.0),
        ]);
    }

    #[test]
    fn closed_position_emits_nothing_further() {
        let mut builder = TimeSeriesBuilder::new();
        builder.add_filing(&filing("A", 3, &[("037833100", 50.0, 5.0)]));
        builder.add_filing(&filing("A", 6, &[]));
        builder.add_filing(&filing("A", 9, &[]));
        builder.add_filing(&filing("A", 12, &[]));

        assert_eq!(
            series(&builder, "A", "037833100"),
            vec![(date(3), 50.0, 0.0), (date(6), 0.0, -50.0)]
        );
    }

    #[test]
    fn duplicate_rows_in_one_filing_are_summed() {
        let mut builder = TimeSeriesBuilder::new();
        builder.add_filing(&filing("A", 3, &[("037833100", 50.0, 5.0), ("037833100", 25.0, 2.0)]));
        builder.add_filing(&filing("A", 6, &[("037833100", 100.0, 10.0)]));

        let positions = builder.build();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].value, 75.0);
        assert_eq!(positions[0].shares, 7.0);
        assert_eq!(positions[1].value_delta, 25.0);
        assert_eq!(positions[1].shares_delta, 3.0);
    }

    #[test]
    fn filings_without_report_date_are_ignored() {
        let mut builder = TimeSeriesBuilder::new();
        builder.add_filing(&Filing {
            report_date: None,
            ..filing("A", 3, &[("037833100", 1.0, 1.0)])
        });
        assert!(builder.horizon.is_empty());
        assert!(builder.build().is_empty());
    }
}
