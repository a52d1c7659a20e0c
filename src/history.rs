use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::Deserialize;

use crate::models::{HistoryDay, HistoryEntry, HistoryItem};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryPeriod {
    Week,
    Month,
    Year,
    #[default]
    All,
}

impl HistoryPeriod {
    /// Earliest instant included, or `None` for no limit.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            HistoryPeriod::Week => Some(now - Duration::days(7)),
            HistoryPeriod::Month => now.checked_sub_months(Months::new(1)),
            HistoryPeriod::Year => now.checked_sub_months(Months::new(12)),
            HistoryPeriod::All => None,
        }
    }
}

/// Buckets entries by UTC calendar day, newest day first. Entries keep
/// their recorded order inside a bucket.
pub fn group_by_day(entries: &[HistoryEntry]) -> Vec<HistoryDay> {
    let mut map = BTreeMap::<NaiveDate, Vec<HistoryItem>>::new();
    for entry in entries {
        map.entry(entry.date.date_naive())
            .or_default()
            .push(HistoryItem {
                name: entry.medication.name.clone(),
                dose_amount: entry.medication.dose_amount.clone(),
                dose_unit: entry.medication.dose_unit,
                time: entry.date,
                taken: entry.taken,
            });
    }

    map.into_iter()
        .rev()
        .map(|(date, entries)| HistoryDay { date, entries })
        .collect()
}

pub fn grouped_history(
    entries: &[HistoryEntry],
    period: HistoryPeriod,
    now: DateTime<Utc>,
) -> Vec<HistoryDay> {
    match period.cutoff(now) {
        Some(cutoff) => {
            let recent: Vec<HistoryEntry> = entries
                .iter()
                .filter(|e| e.date >= cutoff)
                .cloned()
                .collect();
            group_by_day(&recent)
        }
        None => group_by_day(entries),
    }
}
