// Copyright 2021 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! CSV output sink: the configured output path receives the aggregated
//! table with a `region, s1..sL, t1..tL, units, value` header.

use interflow_engine::{
    Calculator, ErrorCode, FlowIndex, InputRow, Parameter, Phase, SectorAddress, Specs,
};

fn collect_row(region: &str, s1: &str, t1: &str, value: f64) -> InputRow {
    InputRow {
        region: region.to_string(),
        phase: Phase::Collect,
        target: SectorAddress::from_levels(&[t1], "mgd"),
        source: SectorAddress::from_levels(&[s1], "mgd"),
        parameter: Parameter::FlowValue,
        value,
    }
}

#[test]
fn run_to_file_writes_aggregated_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flows.csv");

    let index = FlowIndex::from_rows(vec![
        collect_row("01", "a", "b", 10.0),
        collect_row("02", "a", "b", 50.0),
    ]);
    let mut specs = Specs::new(1);
    specs.output_path = Some(path.clone());
    let calc = Calculator::new(&index, specs).unwrap();

    let table = calc.run_to_file().unwrap();
    assert_eq!(table.rows.len(), 2);

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let header: Vec<String> = reader
        .headers()
        .unwrap()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(header, vec!["region", "s1", "t1", "units", "value"]);

    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(&records[0][0], "01");
    assert_eq!(&records[0][4], "10");
    assert_eq!(&records[1][0], "02");
    assert_eq!(&records[1][4], "50");
}

#[test]
fn run_to_file_without_sink_is_an_error() {
    let index = FlowIndex::from_rows(vec![collect_row("01", "a", "b", 10.0)]);
    let calc = Calculator::new(&index, Specs::new(1)).unwrap();
    let err = calc.run_to_file().unwrap_err();
    assert_eq!(err.code, ErrorCode::Generic);
}
