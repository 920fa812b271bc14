// Copyright 2021 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;

use crate::common::Result;
use crate::datamodel::{InputRow, Phase};
use crate::table::{melt_wide, parse_table};

/// Classified rows for one region, bucketed by phase. Rows keep the
/// order in which they appeared during ingest; that order is observable
/// by the calculator and drives fan-out within a phase.
#[derive(Clone, Debug, Default)]
pub(crate) struct RegionRows {
    phases: [Vec<InputRow>; 4],
}

impl RegionRows {
    pub(crate) fn phase(&self, phase: Phase) -> &[InputRow] {
        &self.phases[phase as usize]
    }

    fn push(&mut self, row: InputRow) {
        self.phases[row.phase as usize].push(row);
    }

    fn len(&self) -> usize {
        self.phases.iter().map(Vec::len).sum()
    }
}

/// The classified input table, keyed region → phase → rows. Equivalent
/// to a nested mapping over (region, phase, t1..t5, unit, s1..s5, unit,
/// parameter): each row is one full-depth key, and rows are iterated in
/// first-appearance order. Immutable once built; the calculator borrows
/// it read-only.
#[derive(Clone, Debug, Default)]
pub struct FlowIndex {
    regions: Vec<String>,
    rows: HashMap<String, RegionRows>,
}

impl FlowIndex {
    pub fn from_rows(rows: Vec<InputRow>) -> FlowIndex {
        let mut index = FlowIndex::default();
        for row in rows {
            if !index.rows.contains_key(&row.region) {
                index.regions.push(row.region.clone());
                index.rows.insert(row.region.clone(), RegionRows::default());
            }
            index
                .rows
                .get_mut(&row.region)
                .expect("region bucket exists")
                .push(row);
        }
        index
    }

    /// Build an index straight from long-form records.
    pub fn from_records(records: &[Vec<&str>]) -> Result<FlowIndex> {
        Ok(FlowIndex::from_rows(parse_table(records)?))
    }

    /// Build an index from a wide-form table, melting the compound
    /// columns row-wise first.
    pub fn from_wide(columns: &[&str], rows: &[(String, Vec<f64>)]) -> Result<FlowIndex> {
        Ok(FlowIndex::from_rows(melt_wide(columns, rows)?))
    }

    /// Regions in the order they first appeared in the input.
    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn contains_region(&self, region: &str) -> bool {
        self.rows.contains_key(region)
    }

    /// Rows of one phase for one region, in ingest order. Empty for
    /// regions or phases with no rows.
    pub fn rows(&self, region: &str, phase: Phase) -> &[InputRow] {
        self.rows
            .get(region)
            .map(|r| r.phase(phase))
            .unwrap_or(&[])
    }

    pub(crate) fn region_rows(&self, region: &str) -> Option<&RegionRows> {
        self.rows.get(region)
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(RegionRows::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
