use crate::boundaries::BoundaryCollection;
use crate::geometry::Geometry;
use crate::selection::Selection;
use crate::types::{DefectRecord, Severity, Status};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateRange {
    #[default]
    All,
    Today,
    Last7,
    Last30,
    ThisYear,
}

impl DateRange {
    /// Earliest accepted detection time, or `None` for no restriction.
    ///
    /// Day boundaries are taken in `now`'s time zone.
    pub fn cutoff<Tz: TimeZone>(self, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
        match self {
            DateRange::All => None,
            DateRange::Today => local_midnight(now, now.date_naive()),
            DateRange::Last7 => Some(now.with_timezone(&Utc) - Duration::days(7)),
            DateRange::Last30 => Some(now.with_timezone(&Utc) - Duration::days(30)),
            DateRange::ThisYear => {
                let jan1 = NaiveDate::from_ymd_opt(now.year(), 1, 1)?;
                local_midnight(now, jan1)
            }
        }
    }
}

// Step size and limit when midnight falls inside a DST gap.
const GAP_STEP_MINUTES: i64 = 15;
const GAP_MAX_STEPS: i64 = 24 * 60 / GAP_STEP_MINUTES;

fn local_midnight<Tz: TimeZone>(now: &DateTime<Tz>, day: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = day.and_hms_opt(0, 0, 0)?;
    let tz = now.timezone();
    // Midnight may not exist locally; use the first wall time after the gap.
    (0..=GAP_MAX_STEPS).find_map(|step| {
        let local = midnight + Duration::minutes(step * GAP_STEP_MINUTES);
        tz.from_local_datetime(&local)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
    })
}

/// Raw size-bound input: whatever the user typed, string or number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeInput {
    Number(f64),
    Text(String),
}

impl SizeInput {
    /// Numeric value, or `None` when blank or not a finite number.
    pub fn value(&self) -> Option<f64> {
        let v = match self {
            SizeInput::Number(n) => *n,
            SizeInput::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }
}

impl From<&str> for SizeInput {
    fn from(s: &str) -> Self {
        SizeInput::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub date_range: DateRange,
    /// Empty means every severity.
    pub severities: BTreeSet<Severity>,
    /// Empty means every status.
    pub statuses: BTreeSet<Status>,
    pub size_min: Option<SizeInput>,
    pub size_max: Option<SizeInput>,
}

impl FilterCriteria {
    fn size_bounds(&self) -> (Option<f64>, Option<f64>) {
        (
            self.size_min.as_ref().and_then(SizeInput::value),
            self.size_max.as_ref().and_then(SizeInput::value),
        )
    }
}

/// Inputs to one filter pass.
pub struct FilterContext<'a, G: Geometry, Tz: TimeZone> {
    pub boundaries: Option<&'a BoundaryCollection>,
    pub selection: &'a Selection,
    pub criteria: &'a FilterCriteria,
    /// Drop records outside every boundary even when nothing is selected.
    pub require_within_boundaries: bool,
    pub geometry: &'a G,
    pub now: DateTime<Tz>,
}

/// Records passing every predicate, in input order.
pub fn filter_records<G, Tz>(records: &[DefectRecord], ctx: &FilterContext<'_, G, Tz>) -> Vec<DefectRecord>
where
    G: Geometry + Sync,
    Tz: TimeZone,
{
    let cutoff = ctx.criteria.date_range.cutoff(&ctx.now);
    let (size_min, size_max) = ctx.criteria.size_bounds();
    let criteria = ctx.criteria;
    let selection = ctx.selection;
    let geometry = ctx.geometry;
    let require_within = ctx.require_within_boundaries;
    let boundaries = ctx.boundaries;

    records
        .par_iter()
        .filter(|r| {
            if let Some(boundaries) = boundaries {
                if !passes_boundaries(r, boundaries, selection, require_within, geometry) {
                    return false;
                }
            }
            if let Some(cutoff) = cutoff {
                if r.detected_at < cutoff {
                    return false;
                }
            }
            if !criteria.severities.is_empty() && !criteria.severities.contains(&r.severity) {
                return false;
            }
            if !criteria.statuses.is_empty() && !criteria.statuses.contains(&r.status) {
                return false;
            }
            let size = f64::from(r.size);
            if size_min.is_some_and(|min| size < min) || size_max.is_some_and(|max| size > max) {
                return false;
            }
            true
        })
        .cloned()
        .collect()
}

fn passes_boundaries(
    record: &DefectRecord,
    boundaries: &BoundaryCollection,
    selection: &Selection,
    require_within: bool,
    geometry: &impl Geometry,
) -> bool {
    let point = record.point();
    if selection.is_empty() {
        return !require_within || boundaries.any_contains(geometry, &point);
    }
    // Any hit is inside a known boundary; the selection then narrows it.
    boundaries
        .indices_containing(geometry, &point)
        .iter()
        .any(|i| selection.contains(*i))
}

/// Per-severity and per-status counts for the side panel.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_status: BTreeMap<Status, usize>,
}

pub fn summarize(records: &[DefectRecord]) -> Summary {
    let mut summary = Summary {
        total: records.len(),
        by_severity: Severity::ALL.iter().map(|s| (*s, 0)).collect(),
        by_status: Status::ALL.iter().map(|s| (*s, 0)).collect(),
    };
    for r in records {
        *summary.by_severity.entry(r.severity).or_default() += 1;
        *summary.by_status.entry(r.status).or_default() += 1;
    }
    summary
}
