// Copyright 2021 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::calc_err;
use crate::common::Result;
use crate::datamodel::{InputRow, Phase, Specs};
use crate::index::FlowIndex;
use crate::naming::{encode_link, encode_total};
use crate::results::{FlowRecord, FlowTable};

/// Link-name → value map that remembers insertion order. Overwrites keep
/// the original position; removals drop the entry. The output table is
/// emitted in this order, which makes runs deterministic and keeps rows
/// in the order their links were first established.
#[derive(Clone, Debug, Default)]
struct FlowMap {
    values: HashMap<String, f64>,
    order: Vec<String>,
}

impl FlowMap {
    /// Returns true when an existing entry was overwritten.
    fn set(&mut self, key: String, value: f64) -> bool {
        match self.values.entry(key) {
            Entry::Vacant(e) => {
                self.order.push(e.key().clone());
                e.insert(value);
                false
            }
            Entry::Occupied(mut e) => {
                e.insert(value);
                true
            }
        }
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn into_rows(mut self) -> Vec<FlowRecord> {
        self.order
            .drain(..)
            .filter_map(|name| {
                self.values
                    .remove(&name)
                    .map(|value| FlowRecord { name, value })
            })
            .collect()
    }
}

/// Rows of one phase bucketed by a key, buckets in first-appearance
/// order and rows in ingest order within each bucket.
fn group_by<'r, K>(rows: &'r [InputRow], key: K) -> Vec<(String, Vec<&'r InputRow>)>
where
    K: Fn(&InputRow) -> String,
{
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<&InputRow>> = HashMap::new();
    for row in rows {
        match buckets.entry(key(row)) {
            Entry::Vacant(e) => {
                order.push(e.key().clone());
                e.insert(vec![row]);
            }
            Entry::Occupied(mut e) => e.get_mut().push(row),
        }
    }
    order
        .into_iter()
        .map(|k| {
            let bucket = buckets.remove(&k).expect("bucket exists");
            (k, bucket)
        })
        .collect()
}

/// Per-region progression. Transitions are linear and non-re-entrant;
/// there is no rollback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum RegionState {
    Initial,
    Collected,
    Calculated,
    SourceSplit,
    Discharged,
    Finalized,
}

struct RegionOutcome {
    rows: Vec<FlowRecord>,
    collisions: u64,
}

/// Executes the four calculation phases over every region of a flow
/// index and produces the level-5 flow table.
#[derive(Debug)]
pub struct Calculator<'a> {
    index: &'a FlowIndex,
    specs: Specs,
}

impl<'a> Calculator<'a> {
    /// Validates the specs against the index up front: a granularity
    /// outside 1..=5 or a region restriction naming an absent region
    /// fails here, before any work is done.
    pub fn new(index: &'a FlowIndex, specs: Specs) -> Result<Calculator<'a>> {
        specs.validate()?;
        if let Some(region) = &specs.region
            && !index.contains_region(region)
        {
            return calc_err!(UnknownRegion, format!("region {region:?} not in input"));
        }
        Ok(Calculator { index, specs })
    }

    pub fn specs(&self) -> &Specs {
        &self.specs
    }

    /// Run all four phases for every selected region and return the
    /// full-depth flow table. Regions are independent and may execute in
    /// parallel; results are concatenated in the index's region order,
    /// so repeated runs over the same input produce identical tables.
    pub fn run(&self) -> Result<FlowTable> {
        let regions: Vec<&str> = match &self.specs.region {
            Some(region) => vec![region.as_str()],
            None => self.index.regions().iter().map(String::as_str).collect(),
        };

        let outcomes = self.run_regions(&regions);

        let mut rows = Vec::new();
        let mut collisions = 0u64;
        for outcome in outcomes {
            rows.extend(outcome.rows);
            collisions += outcome.collisions;
        }

        Ok(FlowTable { rows, collisions })
    }

    /// Run and roll the result up to the configured output level.
    pub fn run_to_level(&self) -> Result<crate::results::OutputTable> {
        self.run()?.aggregate(self.specs.level)
    }

    /// Run, aggregate to the configured level, and write the result to
    /// the configured CSV sink.
    #[cfg(feature = "file_io")]
    pub fn run_to_file(&self) -> Result<crate::results::OutputTable> {
        use crate::common::{Error, ErrorCode, ErrorKind};

        let table = self.run_to_level()?;
        match &self.specs.output_path {
            Some(path) => table.write_csv(path)?,
            None => {
                return Err(Error::new(
                    ErrorKind::Output,
                    ErrorCode::Generic,
                    Some("no output path configured".to_string()),
                ));
            }
        }
        Ok(table)
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn run_regions(&self, regions: &[&str]) -> Vec<RegionOutcome> {
        use rayon::prelude::*;
        regions.par_iter().map(|r| self.run_region(r)).collect()
    }

    #[cfg(target_arch = "wasm32")]
    fn run_regions(&self, regions: &[&str]) -> Vec<RegionOutcome> {
        regions.iter().map(|r| self.run_region(r)).collect()
    }

    fn run_region(&self, region: &str) -> RegionOutcome {
        let mut totals: HashMap<String, f64> = HashMap::new();
        let mut flows = FlowMap::default();
        let mut collisions = 0u64;

        let Some(rows) = self.index.region_rows(region) else {
            return RegionOutcome {
                rows: Vec::new(),
                collisions: 0,
            };
        };

        let mut state = RegionState::Initial;

        collect(
            region,
            rows.phase(Phase::Collect),
            &mut totals,
            &mut flows,
            &mut collisions,
        );
        state = advance(state, RegionState::Collected);

        calculate(region, rows.phase(Phase::Calculate), &mut totals);
        state = advance(state, RegionState::Calculated);

        split_sources(region, rows.phase(Phase::Source), &mut totals, &mut flows);
        state = advance(state, RegionState::SourceSplit);

        split_discharges(
            region,
            rows.phase(Phase::Discharge),
            &mut totals,
            &mut flows,
        );
        state = advance(state, RegionState::Discharged);

        if self.specs.remove_loops {
            for phase in Phase::ALL {
                for row in rows.phase(phase) {
                    flows.remove(&encode_link(region, &row.target, &row.target));
                    flows.remove(&encode_link(region, &row.source, &row.source));
                }
            }
        }
        let state = advance(state, RegionState::Finalized);
        debug_assert_eq!(state, RegionState::Finalized);

        RegionOutcome {
            rows: flows.into_rows(),
            collisions,
        }
    }
}

fn advance(state: RegionState, next: RegionState) -> RegionState {
    debug_assert!(state < next, "phase ran out of order: {state:?} -> {next:?}");
    next
}

/// Phase A: deposit base flows and build up target totals.
fn collect(
    region: &str,
    rows: &[InputRow],
    totals: &mut HashMap<String, f64>,
    flows: &mut FlowMap,
    collisions: &mut u64,
) {
    for row in rows {
        let link = encode_link(region, &row.source, &row.target);
        if flows.set(link, row.value) {
            // same link key twice: last writer wins, counted for diagnostics
            *collisions += 1;
        }
        let total_key = encode_total(region, &row.target);
        *totals.entry(total_key).or_insert(0.0) += row.value;
    }
}

/// Phase B: materialize sector totals from intensity coefficients. Rows
/// are grouped by their target total; a total that already exists is
/// considered established and the whole group contributes nothing.
fn calculate(region: &str, rows: &[InputRow], totals: &mut HashMap<String, f64>) {
    for (target_key, group) in group_by(rows, |row| encode_total(region, &row.target)) {
        if totals.contains_key(&target_key) {
            continue;
        }
        let mut acc = 0.0;
        let mut contributed = false;
        for row in group {
            let source_key = encode_total(region, &row.source);
            if let Some(&source_total) = totals.get(&source_key) {
                acc += source_total * row.value;
                contributed = true;
            }
        }
        if contributed {
            totals.insert(target_key, acc);
        }
    }
}

/// Phase C: split each established target total into per-source flows.
/// Within one target-address iteration, each source total is overwritten
/// with the running sum of the flows emitted into it, so the split's
/// inverse becomes the source's total.
fn split_sources(
    region: &str,
    rows: &[InputRow],
    totals: &mut HashMap<String, f64>,
    flows: &mut FlowMap,
) {
    for (target_key, group) in group_by(rows, |row| encode_total(region, &row.target)) {
        let mut emitted: HashMap<String, f64> = HashMap::new();
        for row in group {
            let Some(&target_total) = totals.get(&target_key) else {
                continue;
            };
            let contributed = target_total * row.value;
            flows.set(encode_link(region, &row.source, &row.target), contributed);

            let source_key = encode_total(region, &row.source);
            let counter = emitted.entry(source_key.clone()).or_insert(0.0);
            *counter += contributed;
            totals.insert(source_key, *counter);
        }
    }
}

/// Phase D: split each subject's total into per-sink discharge flows.
/// Roles invert: the subject is the row's target half, the sink its
/// source half, and the emitted link carries the subject's unit on both
/// halves. Sink totals take the per-subject running sum, like phase C.
fn split_discharges(
    region: &str,
    rows: &[InputRow],
    totals: &mut HashMap<String, f64>,
    flows: &mut FlowMap,
) {
    for (subject_key, group) in group_by(rows, |row| encode_total(region, &row.target)) {
        let mut emitted: HashMap<String, f64> = HashMap::new();
        for row in group {
            let Some(&subject_total) = totals.get(&subject_key) else {
                continue;
            };
            let sink = row.source.with_unit(&row.target.unit);
            let discharged = subject_total * row.value;
            flows.set(encode_link(region, &row.target, &sink), discharged);

            let sink_key = encode_total(region, &sink);
            let counter = emitted.entry(sink_key.clone()).or_insert(0.0);
            *counter += discharged;
            totals.insert(sink_key, *counter);
        }
    }
}
