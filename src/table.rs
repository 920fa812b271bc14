// Copyright 2021 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use smallvec::SmallVec;

use crate::common::Result;
use crate::datamodel::{Direction, InputRow, Parameter, Phase, classify, phase_matches};
use crate::ingest_err;
use crate::naming::{DELIMITER, SectorAddress};

/// The long-form input schema: region, type, t1..t5, T_unit, s1..s5,
/// S_unit, parameter, value.
pub const COLUMN_COUNT: usize = 16;

const REGION: usize = 0;
const TYPE: usize = 1;
const TARGET: usize = 2;
const TARGET_UNIT: usize = 7;
const SOURCE: usize = 8;
const SOURCE_UNIT: usize = 13;
const PARAMETER: usize = 14;
const VALUE: usize = 15;

fn address_at(cells: &[&str], off: usize, unit_off: usize) -> SectorAddress {
    SectorAddress::new(
        [
            cells[off].to_string(),
            cells[off + 1].to_string(),
            cells[off + 2].to_string(),
            cells[off + 3].to_string(),
            cells[off + 4].to_string(),
        ],
        cells[unit_off].to_string(),
    )
}

/// Parse one long-form record into a classified row.
pub fn parse_record(cells: &[&str]) -> Result<InputRow> {
    if cells.len() != COLUMN_COUNT {
        return ingest_err!(
            WrongColumnCount,
            format!("expected {COLUMN_COUNT} columns, got {}", cells.len())
        );
    }

    let phase = Phase::parse(cells[TYPE])?;
    let parameter = Parameter::parse(cells[PARAMETER])?;
    if !phase_matches(phase, parameter) {
        return ingest_err!(
            UnknownParameter,
            format!("row type {phase} does not carry parameter {parameter}")
        );
    }

    let value: f64 = match cells[VALUE].trim().parse() {
        Ok(v) => v,
        Err(_) => {
            return ingest_err!(
                ExpectedNumber,
                format!("value cell {:?} is not numeric", cells[VALUE])
            );
        }
    };

    Ok(InputRow {
        region: cells[REGION].to_string(),
        phase,
        target: address_at(cells, TARGET, TARGET_UNIT),
        source: address_at(cells, SOURCE, SOURCE_UNIT),
        parameter,
        value,
    })
}

/// Parse a whole long-form table. Fails on the first bad record; there
/// is no partial result.
pub fn parse_table(records: &[Vec<&str>]) -> Result<Vec<InputRow>> {
    records.iter().map(|cells| parse_record(cells)).collect()
}

/// A parsed wide-form column header:
/// `{t1..t5}_{T_unit}_(from|to)_{s1..s5}_{S_unit}[_suffix]`.
///
/// The subject half is written first and lands in target position; the
/// `from`/`to` token is the positional tag that separates source splits
/// from discharge splits.
#[derive(Clone, Debug, PartialEq)]
pub struct WideColumn {
    pub target: SectorAddress,
    pub source: SectorAddress,
    pub parameter: Parameter,
    pub phase: Phase,
}

pub fn parse_wide_header(name: &str) -> Result<WideColumn> {
    let tokens: SmallVec<[&str; 14]> = name.split(DELIMITER).collect();
    if tokens.len() != 13 && tokens.len() != 14 {
        return ingest_err!(
            MalformedLink,
            format!(
                "wide column {name:?} splits into {} tokens, expected 13 or 14",
                tokens.len()
            )
        );
    }

    let direction = match tokens[6] {
        "from" => Direction::From,
        "to" => Direction::To,
        other => {
            return ingest_err!(
                MalformedLink,
                format!("wide column {name:?} has {other:?} where from/to belongs")
            );
        }
    };

    let parameter = match tokens.get(13) {
        None => Parameter::FlowValue,
        Some(&"intensity") => Parameter::Intensity,
        Some(&"fraction") => Parameter::Fraction,
        Some(other) => {
            return ingest_err!(
                UnknownParameter,
                format!("wide column {name:?} has unknown suffix {other:?}")
            );
        }
    };

    let target = SectorAddress::new(
        [
            tokens[0].to_string(),
            tokens[1].to_string(),
            tokens[2].to_string(),
            tokens[3].to_string(),
            tokens[4].to_string(),
        ],
        tokens[5].to_string(),
    );
    let source = SectorAddress::new(
        [
            tokens[7].to_string(),
            tokens[8].to_string(),
            tokens[9].to_string(),
            tokens[10].to_string(),
            tokens[11].to_string(),
        ],
        tokens[12].to_string(),
    );

    Ok(WideColumn {
        target,
        source,
        parameter,
        phase: classify(parameter, direction),
    })
}

/// Melt a wide-form table row-wise into classified rows. Each data row
/// is a region plus one value per compound column, in column order.
pub fn melt_wide(columns: &[&str], rows: &[(String, Vec<f64>)]) -> Result<Vec<InputRow>> {
    let parsed: Vec<WideColumn> = columns
        .iter()
        .map(|name| parse_wide_header(name))
        .collect::<Result<_>>()?;

    let mut out = Vec::with_capacity(parsed.len() * rows.len());
    for (region, values) in rows {
        if values.len() != parsed.len() {
            return ingest_err!(
                WrongColumnCount,
                format!(
                    "region {region:?} has {} values for {} columns",
                    values.len(),
                    parsed.len()
                )
            );
        }
        for (col, value) in parsed.iter().zip(values.iter()) {
            out.push(InputRow {
                region: region.clone(),
                phase: col.phase,
                target: col.target.clone(),
                source: col.source.clone(),
                parameter: col.parameter,
                value: *value,
            });
        }
    }

    Ok(out)
}
