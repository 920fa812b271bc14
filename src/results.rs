// Copyright 2021 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use float_cmp::approx_eq;
use serde::{Deserialize, Serialize};

use crate::aggregate;
use crate::common::{Error, ErrorCode, ErrorKind, Result};

/// One full-depth flow: a canonical link name and its magnitude.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub name: String,
    pub value: f64,
}

/// The calculator's result: level-5 flows in the order their links were
/// established, region by region, plus a count of link-key collisions
/// observed while collecting base flows (colliding deposits overwrite;
/// the counter makes that visible).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowTable {
    pub rows: Vec<FlowRecord>,
    pub collisions: u64,
}

impl FlowTable {
    /// Roll up to the requested granularity.
    pub fn aggregate(&self, level: u8) -> Result<OutputTable> {
        aggregate::aggregate(self, level)
    }

    pub fn print_tsv(&self) {
        println!("name\tvalue");
        for row in &self.rows {
            println!("{}\t{}", row.name, row.value);
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| Error::new(ErrorKind::Output, ErrorCode::Generic, Some(err.to_string())))
    }
}

/// One aggregated output row: both address halves truncated to the
/// output level, plus the unit the flow is denominated in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    pub region: String,
    pub source: Vec<String>,
    pub target: Vec<String>,
    pub units: String,
    pub value: f64,
}

/// A long-form output table at one granularity, one row per unique
/// (region, source prefix, target prefix, unit) combination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputTable {
    pub level: u8,
    pub rows: Vec<OutputRow>,
}

impl OutputTable {
    /// Column names: `region, s1..sL, t1..tL, units, value`.
    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(2 * self.level as usize + 3);
        header.push("region".to_string());
        for i in 1..=self.level {
            header.push(format!("s{i}"));
        }
        for i in 1..=self.level {
            header.push(format!("t{i}"));
        }
        header.push("units".to_string());
        header.push("value".to_string());
        header
    }

    fn record(&self, row: &OutputRow) -> Vec<String> {
        let mut cells = Vec::with_capacity(2 * self.level as usize + 3);
        cells.push(row.region.clone());
        cells.extend(row.source.iter().cloned());
        cells.extend(row.target.iter().cloned());
        cells.push(row.units.clone());
        cells.push(row.value.to_string());
        cells
    }

    pub fn print_tsv(&self) {
        println!("{}", self.header().join("\t"));
        for row in &self.rows {
            println!("{}", self.record(row).join("\t"));
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| Error::new(ErrorKind::Output, ErrorCode::Generic, Some(err.to_string())))
    }

    /// Compare two tables within floating-point tolerance. Addition
    /// order inside a group is not constrained, so values produced by
    /// differently ordered aggregations can differ in the last ulps.
    pub fn approx_eq(&self, other: &OutputTable) -> bool {
        self.level == other.level
            && self.rows.len() == other.rows.len()
            && self.rows.iter().zip(other.rows.iter()).all(|(a, b)| {
                a.region == b.region
                    && a.source == b.source
                    && a.target == b.target
                    && a.units == b.units
                    && approx_eq!(f64, a.value, b.value, ulps = 4)
            })
    }

    /// Write the table as CSV with the `region, s1..sL, t1..tL, units,
    /// value` header.
    #[cfg(feature = "file_io")]
    pub fn write_csv<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let to_err =
            |err: csv::Error| Error::new(ErrorKind::Output, ErrorCode::Generic, Some(err.to_string()));

        let mut writer = csv::Writer::from_path(path).map_err(to_err)?;
        writer.write_record(self.header()).map_err(to_err)?;
        for row in &self.rows {
            writer.write_record(self.record(row)).map_err(to_err)?;
        }
        writer
            .flush()
            .map_err(|err| Error::new(ErrorKind::Output, ErrorCode::Generic, Some(err.to_string())))
    }
}
