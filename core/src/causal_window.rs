//! Causal rolling-window aggregation.
//!
//! Everything here uses only the current row and rows before it in the same
//! partition — no look-ahead. Window counts run a two-pointer per window
//! size over the sorted timestamped prefix, so each partition costs linear
//! time instead of a rescan of all prior rows per output row.
//!
//! Rows with no timestamp take the full fallback branch per row: sentinel
//! gap, no burst, singleton window counts, zero volatility and velocity. A
//! partition can mix both behaviors.

use crate::stage::{PartitionCtx, PartitionFeatures, PartitionStage};
use crate::stats::sample_std;
use chrono::Duration;
use std::collections::VecDeque;

// ── Constants ────────────────────────────────────────────────────────────────

/// Sentinel gap for a partition's first row, in seconds.
pub const FIRST_GAP_SECONDS: f64 = 3600.0;
/// Gaps under this many seconds flag a burst.
const BURST_GAP_SECONDS: f64 = 300.0;
/// Rolling windows, shortest first: 30s, 10min, 1hour.
const WINDOW_SECONDS: [i64; 3] = [30, 600, 3600];
/// Rolling volatility looks at most this many trailing rows.
const ROLLING_WINDOW_ROWS: usize = 5;

pub struct CausalWindowStage;

impl PartitionStage for CausalWindowStage {
    fn name(&self) -> &'static str {
        "causal_window"
    }

    fn run(&self, ctx: &PartitionCtx<'_>, out: &mut PartitionFeatures) {
        if !ctx.schema.has_timestamp {
            return;
        }

        // One left pointer per window size over the timestamped prefix.
        let mut left = [0usize; WINDOW_SECONDS.len()];
        let mut trailing_amounts: VecDeque<f64> = VecDeque::with_capacity(ROLLING_WINDOW_ROWS);

        for pos in 0..ctx.len() {
            let record = ctx.record(pos);
            let Some(ts) = record.timestamp else {
                // Missing timestamps sort last; everything from here on
                // keeps the fallback block.
                break;
            };

            let gap = if pos == 0 {
                FIRST_GAP_SECONDS
            } else {
                // The previous prefix row always has a timestamp.
                let prev = ctx.record(pos - 1).timestamp;
                out.last_txn_time[pos] = prev;
                prev.map_or(FIRST_GAP_SECONDS, |p| (ts - p).num_seconds() as f64)
            };
            out.time_since_last[pos] = gap;
            out.recent_burst[pos] = u8::from(gap < BURST_GAP_SECONDS);

            // Same-second arrivals would divide by zero; substitute 1.
            let denom = if gap == 0.0 { 1.0 } else { gap };
            out.transaction_velocity[pos] = 3600.0 / denom;

            for (w, &window) in WINDOW_SECONDS.iter().enumerate() {
                let cutoff = ts - Duration::seconds(window);
                while ctx
                    .record(left[w])
                    .timestamp
                    .is_some_and(|t| t < cutoff)
                {
                    left[w] += 1;
                }
                // Window is inclusive of both ends and of the row itself.
                let count = (pos - left[w] + 1) as u64;
                match w {
                    0 => out.txn_count_30s[pos] = count,
                    1 => out.txn_count_10min[pos] = count,
                    _ => out.txn_count_1hour[pos] = count,
                }
            }

            if trailing_amounts.len() == ROLLING_WINDOW_ROWS {
                trailing_amounts.pop_front();
            }
            trailing_amounts.push_back(record.amount);
            out.rolling_std[pos] =
                sample_std(trailing_amounts.make_contiguous());
        }
    }
}
