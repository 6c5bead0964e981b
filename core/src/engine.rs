//! The feature engine — the heart of the pass.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Static encodings over the full, unsorted input
//!   2. Account partitioning (stable time sort per partition)
//!   3. Per-partition stages: causal windows, calendar buckets, beneficiary
//!   4. Cross-account customer reduction (barrier: needs every partition
//!      of a customer to have completed)
//!   5. Assembly back onto original row order
//!
//! RULES:
//!   - Stages read only their own partition; the pass is causal and
//!     leak-free by construction.
//!   - Every row-level failure mode resolves to a deterministic fallback;
//!     the engine itself never fails.
//!   - Phase 3 is an independent map over partitions and may be
//!     parallelized without changing any output.

use crate::{
    assembler::{assemble, static_features, AssembleInputs},
    beneficiary::BeneficiaryStage,
    calendar_bucket::CalendarBucketStage,
    causal_window::CausalWindowStage,
    config::RiskConfig,
    cross_account::{customer_stats, partition_ratios, CustomerStats, PartitionRatios},
    features::FeatureVector,
    partition::partition_records,
    record::{Schema, TransactionRecord},
    stage::{PartitionCtx, PartitionFeatures, PartitionStage},
};
use std::collections::BTreeMap;

pub struct FeatureEngine {
    config: RiskConfig,
    stages: Vec<Box<dyn PartitionStage>>,
}

impl FeatureEngine {
    /// Build a fully wired engine with all per-partition stages registered
    /// in the documented execution order.
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            stages: vec![
                Box::new(CausalWindowStage),
                Box::new(CalendarBucketStage),
                Box::new(BeneficiaryStage),
            ],
        }
    }

    /// Run the whole pass. One FeatureVector per input row, same order.
    pub fn run(&self, schema: &Schema, records: &[TransactionRecord]) -> Vec<FeatureVector> {
        // Phase 1: static encodings.
        let statics = static_features(schema, records, &self.config);

        // Phase 2: partitioning.
        let set = partition_records(schema, records);
        log::info!(
            "partitioned {} row(s) into {} partition(s), {} ungrouped",
            records.len(),
            set.partitions.len(),
            set.ungrouped.len()
        );

        // Phase 3: per-partition stages over fallback-seeded blocks.
        let mut blocks: Vec<PartitionFeatures> = Vec::with_capacity(set.partitions.len());
        for partition in &set.partitions {
            let amounts: Vec<f64> = partition.rows.iter().map(|&r| records[r].amount).collect();
            let mut block = PartitionFeatures::with_fallbacks(&amounts);
            let ctx = PartitionCtx {
                partition,
                records,
                schema,
            };
            for stage in &self.stages {
                stage.run(&ctx, &mut block);
                log::debug!(
                    "stage {} done for partition ({}, {})",
                    stage.name(),
                    partition.key.0,
                    partition.key.1
                );
            }
            blocks.push(block);
        }

        // Phase 3b: partition-level ratios from the static encodings.
        let ratios: Vec<PartitionRatios> = set
            .partitions
            .iter()
            .map(|p| {
                partition_ratios(
                    schema,
                    records,
                    &p.rows,
                    &statics.flag_amount,
                    &statics.transfer_type_risk,
                )
            })
            .collect();

        // Phase 4: customer reduction. Barrier — every partition of a
        // customer is complete before its group is reduced.
        let groups = set.customer_groups();
        let customers: BTreeMap<&str, CustomerStats> = groups
            .iter()
            .map(|(&customer, indices)| (customer, customer_stats(&set, records, indices)))
            .collect();
        log::info!("reduced {} customer group(s)", customers.len());

        // Phase 5: assembly in original row order.
        assemble(&AssembleInputs {
            schema,
            records,
            statics: &statics,
            set: &set,
            blocks: &blocks,
            ratios: &ratios,
            customers: &customers,
        })
    }
}
