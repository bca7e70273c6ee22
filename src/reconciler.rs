use crate::ingestion::{ActivityCatalog, UsageLog};
use crate::period::PeriodKey;
use crate::schema::EnrollmentOrigin;
use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reconciled attendance and hours for one activity in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AttendanceSlot {
    pub activity_id: String,
    pub period: PeriodKey,
    /// Maximum effective enrollment across the period's records.
    pub enrollment_effective: f64,
    pub enrollment_origin: EnrollmentOrigin,
    /// Sum of hours across the period's records.
    pub hours_total: f64,
    pub record_count: usize,
}

/// Output of [`AttendanceReconciler::reconcile`]: one slot per (activity, period) pair
/// with at least one matched, dated record.
#[derive(Debug, Clone, Default)]
pub struct AttendanceLedger {
    slots: BTreeMap<(String, PeriodKey), AttendanceSlot>,
    unmatched: BTreeMap<String, usize>,
    undated_records: usize,
}

impl AttendanceLedger {
    pub fn get(&self, activity_id: &str, period: PeriodKey) -> Option<&AttendanceSlot> {
        self.slots.get(&(activity_id.to_string(), period))
    }

    pub fn slots(&self) -> impl Iterator<Item = &AttendanceSlot> {
        self.slots.values()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Log entries per unknown activity key, excluded from every financial total.
    pub fn unmatched_activities(&self) -> &BTreeMap<String, usize> {
        &self.unmatched
    }

    pub fn unmatched_records(&self) -> usize {
        self.unmatched.values().sum()
    }

    /// Records skipped because their date could not be parsed.
    pub fn undated_records(&self) -> usize {
        self.undated_records
    }
}

/// Forward-fills sparse attendance figures per activity.
///
/// Records are walked in date order with one "last explicit enrollment" cursor per
/// activity. An explicit figure moves the cursor; a record without one takes the
/// cursor's value, or the Configuration baseline while the cursor is still empty.
pub struct AttendanceReconciler<'a> {
    catalog: &'a ActivityCatalog,
}

impl<'a> AttendanceReconciler<'a> {
    pub fn new(catalog: &'a ActivityCatalog) -> Self {
        Self { catalog }
    }

    pub fn reconcile(&self, log: &UsageLog) -> AttendanceLedger {
        let mut ledger = AttendanceLedger::default();
        let mut cursors: BTreeMap<&str, Option<f64>> = BTreeMap::new();

        for record in log.records() {
            let Some(period) = record.period else {
                ledger.undated_records += 1;
                continue;
            };

            let Some(activity) = self.catalog.get(&record.activity_id) else {
                *ledger
                    .unmatched
                    .entry(record.activity_id.clone())
                    .or_default() += 1;
                continue;
            };

            let cursor = cursors.entry(record.activity_id.as_str()).or_insert(None);
            let (effective, origin) = match (record.reported_enrollment, *cursor) {
                (Some(reported), _) => {
                    *cursor = Some(reported);
                    (reported, EnrollmentOrigin::Reported)
                }
                (None, Some(carried)) => (carried, EnrollmentOrigin::CarriedForward),
                (None, None) => (activity.baseline_enrollment, EnrollmentOrigin::Baseline),
            };

            let slot = ledger
                .slots
                .entry((record.activity_id.clone(), period))
                .or_insert_with(|| AttendanceSlot {
                    activity_id: record.activity_id.clone(),
                    period,
                    enrollment_effective: effective,
                    enrollment_origin: origin,
                    hours_total: 0.0,
                    record_count: 0,
                });

            // Attendance is maxed within a period, hours are summed.
            let upgrades_origin = effective == slot.enrollment_effective
                && origin == EnrollmentOrigin::Reported;
            if effective > slot.enrollment_effective || upgrades_origin {
                slot.enrollment_effective = effective;
                slot.enrollment_origin = origin;
            }
            slot.hours_total += record.hours;
            slot.record_count += 1;
        }

        for (key, count) in &ledger.unmatched {
            warn!(
                "Usage Log references unknown activity '{}' ({} records); excluded from totals",
                key, count
            );
        }
        debug!(
            "Reconciled {} activity-periods ({} unmatched, {} undated records)",
            ledger.slots.len(),
            ledger.unmatched_records(),
            ledger.undated_records
        );

        ledger
    }
}
