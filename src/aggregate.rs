// Copyright 2021 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::BTreeMap;

use crate::agg_err;
use crate::common::Result;
use crate::naming::{LinkParts, MAX_LEVEL, decode_link};
use crate::results::{FlowTable, OutputRow, OutputTable};

/// One deconstructed flow: a decoded link name plus its value.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkRecord {
    pub link: LinkParts,
    pub value: f64,
}

/// A flow table split back into components, with the granularity its
/// link names carry. All names in one table must carry the same
/// granularity; an empty table supports any output level.
#[derive(Clone, Debug, PartialEq)]
pub struct Deconstructed {
    pub records: Vec<LinkRecord>,
    pub input_level: u8,
}

pub fn deconstruct(table: &FlowTable) -> Result<Deconstructed> {
    let mut records = Vec::with_capacity(table.rows.len());
    let mut input_level: Option<u8> = None;
    for row in &table.rows {
        let link = decode_link(&row.name)?;
        match input_level {
            None => input_level = Some(link.level()),
            Some(k) if k != link.level() => {
                return agg_err!(
                    MalformedLink,
                    format!(
                        "link {:?} is level {} in a level-{k} table",
                        row.name,
                        link.level()
                    )
                );
            }
            Some(_) => {}
        }
        records.push(LinkRecord {
            link,
            value: row.value,
        });
    }

    Ok(Deconstructed {
        records,
        input_level: input_level.unwrap_or(MAX_LEVEL),
    })
}

/// Roll a flow table up to the requested granularity: truncate both
/// address halves to `level` names and group-sum over the remaining
/// columns. Grouping keys are ordered, so the output is deterministic;
/// the addition order within a group is not constrained.
pub fn aggregate(table: &FlowTable, level: u8) -> Result<OutputTable> {
    if level < 1 || level > MAX_LEVEL {
        return agg_err!(BadLevel, format!("level must be 1..={MAX_LEVEL}, got {level}"));
    }

    let deconstructed = deconstruct(table)?;
    if level > deconstructed.input_level {
        return agg_err!(
            GranularityTooFine,
            format!(
                "requested level {level}, input carries level {}",
                deconstructed.input_level
            )
        );
    }

    let mut groups: BTreeMap<(String, Vec<String>, Vec<String>, String), f64> = BTreeMap::new();
    for record in deconstructed.records {
        let LinkParts {
            region,
            mut source,
            mut target,
            unit,
        } = record.link;
        source.truncate(level as usize);
        target.truncate(level as usize);
        *groups.entry((region, source, target, unit)).or_insert(0.0) += record.value;
    }

    let rows = groups
        .into_iter()
        .map(|((region, source, target, units), value)| OutputRow {
            region,
            source,
            target,
            units,
            value,
        })
        .collect();

    Ok(OutputTable { level, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::results::FlowRecord;

    fn table(rows: &[(&str, f64)]) -> FlowTable {
        FlowTable {
            rows: rows
                .iter()
                .map(|(name, value)| FlowRecord {
                    name: name.to_string(),
                    value: *value,
                })
                .collect(),
            collisions: 0,
        }
    }

    #[test]
    fn deconstruct_detects_level() {
        let t = table(&[("01_a_b_to_c_d_mgd", 1.0), ("01_e_f_to_g_h_mgd", 2.0)]);
        let d = deconstruct(&t).unwrap();
        assert_eq!(d.input_level, 2);
        assert_eq!(d.records.len(), 2);
        assert_eq!(d.records[0].link.source, vec!["a", "b"]);
    }

    #[test]
    fn deconstruct_rejects_mixed_levels() {
        let t = table(&[("01_a_b_to_c_d_mgd", 1.0), ("01_e_to_g_mgd", 2.0)]);
        let err = deconstruct(&t).unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedLink);
    }

    #[test]
    fn aggregate_groups_and_sums_by_prefix() {
        let t = table(&[
            ("01_A1_Ca_x_y_z_to_T1_u_v_w_q_mgd", 4.0),
            ("01_A1_Cb_x_y_z_to_T1_u_v_w_q_mgd", 1.0),
        ]);
        let out = aggregate(&t, 1).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].source, vec!["A1"]);
        assert_eq!(out.rows[0].target, vec!["T1"]);
        assert_eq!(out.rows[0].units, "mgd");
        assert_eq!(out.rows[0].value, 5.0);

        // at level 2 the two sources stay distinct
        let out = aggregate(&t, 2).unwrap();
        assert_eq!(out.rows.len(), 2);
    }

    #[test]
    fn aggregate_rejects_out_of_range_level() {
        let t = table(&[]);
        assert_eq!(aggregate(&t, 0).unwrap_err().code, ErrorCode::BadLevel);
        assert_eq!(aggregate(&t, 6).unwrap_err().code, ErrorCode::BadLevel);
    }

    #[test]
    fn aggregate_rejects_finer_than_input() {
        let t = table(&[("01_a_b_to_c_d_mgd", 1.0)]);
        let err = aggregate(&t, 3).unwrap_err();
        assert_eq!(err.code, ErrorCode::GranularityTooFine);
    }

    #[test]
    fn aggregate_empty_table_is_empty_at_any_level() {
        let t = table(&[]);
        for level in 1..=5 {
            assert!(aggregate(&t, level).unwrap().rows.is_empty());
        }
    }

    #[test]
    fn aggregate_output_is_sorted_by_group_key() {
        let t = table(&[("02_z_to_a_mgd", 1.0), ("01_b_to_c_mgd", 2.0)]);
        let out = aggregate(&t, 1).unwrap();
        assert_eq!(out.rows[0].region, "01");
        assert_eq!(out.rows[1].region, "02");
    }
}
