use crate::ingestion::ActivityCatalog;
use crate::period::PeriodKey;
use crate::reconciler::{AttendanceLedger, AttendanceSlot};
use crate::schema::{
    ActivityConfig, CategoryRollup, EnrollmentOrigin, HistoryPoint, PeriodDelta, PeriodTotals,
    ReconciledActivityPeriod,
};
use crate::utils::safe_ratio;
use log::debug;
use std::collections::BTreeMap;

/// Financial figures for one activity in one period.
///
/// Without a slot the activity had no records in the period: hours are zero and the
/// Configuration baseline stands in for attendance. Fixed material cost applies either way.
pub fn compute_activity(
    activity: &ActivityConfig,
    slot: Option<&AttendanceSlot>,
    period: Option<PeriodKey>,
) -> ReconciledActivityPeriod {
    let (enrollment_effective, enrollment_origin, hours_total, record_count) = match slot {
        Some(s) => (
            s.enrollment_effective,
            s.enrollment_origin,
            s.hours_total,
            s.record_count,
        ),
        None => (activity.baseline_enrollment, EnrollmentOrigin::Baseline, 0.0, 0),
    };

    let revenue = activity.unit_price * enrollment_effective;
    let wage_cost = hours_total * activity.hourly_staff_rate;
    let material_cost = activity.fixed_material_cost;
    let margin = revenue - (wage_cost + material_cost);

    ReconciledActivityPeriod {
        activity_id: activity.activity_id.clone(),
        name: activity.name.clone(),
        category: activity.category.clone(),
        period,
        enrollment_effective,
        enrollment_origin,
        hours_total,
        record_count,
        revenue,
        wage_cost,
        material_cost,
        margin,
        margin_ratio: safe_ratio(margin, revenue),
        unit_margin: safe_ratio(margin, enrollment_effective),
    }
}

/// Stateless calculator over an immutable catalog and reconciled ledger. Every call
/// recomputes from its inputs.
pub struct MarginEngine<'a> {
    catalog: &'a ActivityCatalog,
    ledger: &'a AttendanceLedger,
}

impl<'a> MarginEngine<'a> {
    pub fn new(catalog: &'a ActivityCatalog, ledger: &'a AttendanceLedger) -> Self {
        Self { catalog, ledger }
    }

    /// One row per configured activity, in join-key order. `None` yields the baseline
    /// projection used when no Usage Log exists.
    pub fn compute_period(&self, period: Option<PeriodKey>) -> Vec<ReconciledActivityPeriod> {
        self.catalog
            .iter()
            .map(|activity| {
                let slot = period.and_then(|p| self.ledger.get(&activity.activity_id, p));
                compute_activity(activity, slot, period)
            })
            .collect()
    }

    /// Per-period totals for every given period, oldest first, with the running
    /// cumulative margin. Independent of any period or category selection.
    pub fn history(&self, periods: &[PeriodKey]) -> Vec<HistoryPoint> {
        let mut ordered = periods.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut cumulative_margin = 0.0;
        ordered
            .into_iter()
            .map(|period| {
                let rows = self.compute_period(Some(period));
                let totals = summarize(Some(period), &rows);
                cumulative_margin += totals.margin;
                debug!(
                    "Period {}: revenue {:.2}, margin {:.2}, cumulative {:.2}",
                    period, totals.revenue, totals.margin, cumulative_margin
                );
                HistoryPoint {
                    totals,
                    cumulative_margin,
                }
            })
            .collect()
    }

    /// Sum of every period's margin across the full history.
    pub fn treasury(&self, periods: &[PeriodKey]) -> f64 {
        self.history(periods)
            .last()
            .map(|point| point.cumulative_margin)
            .unwrap_or(0.0)
    }
}

pub fn summarize(period: Option<PeriodKey>, rows: &[ReconciledActivityPeriod]) -> PeriodTotals {
    let revenue: f64 = rows.iter().map(|r| r.revenue).sum();
    let wage_cost: f64 = rows.iter().map(|r| r.wage_cost).sum();
    let material_cost: f64 = rows.iter().map(|r| r.material_cost).sum();
    let margin: f64 = rows.iter().map(|r| r.margin).sum();

    PeriodTotals {
        period,
        activity_count: rows.len(),
        revenue,
        wage_cost,
        material_cost,
        total_cost: wage_cost + material_cost,
        margin,
        margin_ratio: safe_ratio(margin, revenue),
    }
}

/// Groups rows by category, summing money and recomputing the ratio from the sums.
/// Uncategorized activities form their own group, listed first.
pub fn category_rollup(rows: &[ReconciledActivityPeriod]) -> Vec<CategoryRollup> {
    let mut groups: BTreeMap<Option<String>, CategoryRollup> = BTreeMap::new();

    for row in rows {
        let entry = groups
            .entry(row.category.clone())
            .or_insert_with(|| CategoryRollup {
                category: row.category.clone(),
                activity_count: 0,
                revenue: 0.0,
                total_cost: 0.0,
                margin: 0.0,
                margin_ratio: 0.0,
            });
        entry.activity_count += 1;
        entry.revenue += row.revenue;
        entry.total_cost += row.total_cost();
        entry.margin += row.margin;
    }

    groups
        .into_values()
        .map(|mut rollup| {
            rollup.margin_ratio = safe_ratio(rollup.margin, rollup.revenue);
            rollup
        })
        .collect()
}

pub fn period_delta(current: &PeriodTotals, previous: &PeriodTotals) -> Option<PeriodDelta> {
    Some(PeriodDelta {
        current: current.period?,
        previous: previous.period?,
        revenue: current.revenue - previous.revenue,
        total_cost: current.total_cost - previous.total_cost,
        margin: current.margin - previous.margin,
    })
}

/// The `n` rows with the highest margin, best first. Ties keep join-key order.
pub fn top_by_margin(rows: &[ReconciledActivityPeriod], n: usize) -> Vec<&ReconciledActivityPeriod> {
    let mut ranked: Vec<&ReconciledActivityPeriod> = rows.iter().collect();
    ranked.sort_by(|a, b| b.margin.total_cmp(&a.margin));
    ranked.truncate(n);
    ranked
}
