//! Calendar-bucket aggregation.
//!
//! Buckets are fixed time-aligned intervals — hour, day, week (Monday
//! aligned), month — keyed per partition. The bucket's aggregate is
//! broadcast to every row inside it regardless of causal order: a transfer
//! early in a week still sees that week's full eventual total. That
//! look-ahead is intentional and confined to this stage.
//!
//! A row without a timestamp keeps the own-amount fallback (total = own
//! amount, count = 1, deviation 0, ratio 1).

use crate::stage::{PartitionCtx, PartitionFeatures, PartitionStage};
use crate::stats::zero_guard;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use std::collections::HashMap;

/// Running sum/count for one bucket.
#[derive(Debug, Default, Clone, Copy)]
struct BucketAccum {
    sum: f64,
    count: u64,
}

impl BucketAccum {
    fn add(&mut self, amount: f64) {
        self.sum += amount;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Truncate to the start of the row's hour.
fn hour_key(ts: NaiveDateTime) -> (NaiveDate, u32) {
    (ts.date(), ts.hour())
}

/// Monday of the row's week.
fn week_key(ts: NaiveDateTime) -> NaiveDate {
    ts.date().week(Weekday::Mon).first_day()
}

/// (year, month) of the row.
fn month_key(ts: NaiveDateTime) -> (i32, u32) {
    (ts.date().year(), ts.date().month())
}

pub struct CalendarBucketStage;

impl PartitionStage for CalendarBucketStage {
    fn name(&self) -> &'static str {
        "calendar_bucket"
    }

    fn run(&self, ctx: &PartitionCtx<'_>, out: &mut PartitionFeatures) {
        if !ctx.schema.has_timestamp {
            return;
        }

        let mut hourly: HashMap<(NaiveDate, u32), BucketAccum> = HashMap::new();
        let mut daily: HashMap<NaiveDate, BucketAccum> = HashMap::new();
        let mut weekly: HashMap<NaiveDate, BucketAccum> = HashMap::new();
        let mut monthly: HashMap<(i32, u32), BucketAccum> = HashMap::new();

        // Accumulate whole-bucket aggregates first; broadcast second.
        for pos in 0..ctx.len() {
            let record = ctx.record(pos);
            let Some(ts) = record.timestamp else { continue };
            hourly.entry(hour_key(ts)).or_default().add(record.amount);
            daily.entry(ts.date()).or_default().add(record.amount);
            weekly.entry(week_key(ts)).or_default().add(record.amount);
            monthly.entry(month_key(ts)).or_default().add(record.amount);
        }

        for pos in 0..ctx.len() {
            let record = ctx.record(pos);
            let Some(ts) = record.timestamp else { continue };
            let amount = record.amount;

            let hour = hourly[&hour_key(ts)];
            out.hourly_total[pos] = hour.sum;
            out.hourly_count[pos] = hour.count;

            let day = daily[&ts.date()];
            out.daily_total[pos] = day.sum;
            out.daily_count[pos] = day.count;

            let week = weekly[&week_key(ts)];
            out.weekly_total[pos] = week.sum;
            out.weekly_txn_count[pos] = week.count;
            let week_mean = week.mean();
            out.weekly_avg_amount[pos] = week_mean;
            out.weekly_deviation[pos] = (amount - week_mean).abs();
            out.amount_vs_weekly_avg[pos] = amount / zero_guard(week_mean);

            let month = monthly[&month_key(ts)];
            out.current_month_spending[pos] = month.sum;
            out.monthly_txn_count[pos] = month.count;
            let month_mean = month.mean();
            out.monthly_avg_amount[pos] = month_mean;
            out.monthly_deviation[pos] = (amount - month_mean).abs();
            out.amount_vs_monthly_avg[pos] = amount / zero_guard(month_mean);
        }
    }
}
