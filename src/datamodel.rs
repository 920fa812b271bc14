// Copyright 2021 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::common::Result;
use crate::ingest_err;
use crate::naming::{MAX_LEVEL, SectorAddress};

/// The four calculation phases, in execution order. Order among phases
/// is load-bearing; order of rows within a phase is authorial order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Collect,
    Calculate,
    Source,
    Discharge,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Collect,
        Phase::Calculate,
        Phase::Source,
        Phase::Discharge,
    ];

    pub fn parse(s: &str) -> Result<Phase> {
        match s {
            "A_collect" => Ok(Phase::Collect),
            "B_calculate" => Ok(Phase::Calculate),
            "C_source" => Ok(Phase::Source),
            "D_discharge" => Ok(Phase::Discharge),
            _ => ingest_err!(UnknownParameter, format!("unknown row type {s:?}")),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Phase::Collect => "A_collect",
            Phase::Calculate => "B_calculate",
            Phase::Source => "C_source",
            Phase::Discharge => "D_discharge",
        };
        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parameter {
    FlowValue,
    Intensity,
    Fraction,
}

impl Parameter {
    pub fn parse(s: &str) -> Result<Parameter> {
        match s {
            "flow_value" => Ok(Parameter::FlowValue),
            "intensity" => Ok(Parameter::Intensity),
            "fraction" => Ok(Parameter::Fraction),
            _ => ingest_err!(UnknownParameter, format!("unknown parameter {s:?}")),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Parameter::FlowValue => "flow_value",
            Parameter::Intensity => "intensity",
            Parameter::Fraction => "fraction",
        };
        write!(f, "{name}")
    }
}

/// Positional tag on a fraction row: which side of the subject the
/// second address half was written on. `From` marks a source split,
/// `To` a discharge split. Captured at parse time; the two are not
/// distinguishable from the parameter value alone.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    From,
    To,
}

/// Derive the phase of a row from its parameter and, for fraction rows,
/// its positional tag.
pub fn classify(parameter: Parameter, direction: Direction) -> Phase {
    match parameter {
        Parameter::FlowValue => Phase::Collect,
        Parameter::Intensity => Phase::Calculate,
        Parameter::Fraction => match direction {
            Direction::From => Phase::Source,
            Direction::To => Phase::Discharge,
        },
    }
}

/// Does an explicitly tagged phase agree with the row's parameter?
pub(crate) fn phase_matches(phase: Phase, parameter: Parameter) -> bool {
    matches!(
        (phase, parameter),
        (Phase::Collect, Parameter::FlowValue)
            | (Phase::Calculate, Parameter::Intensity)
            | (Phase::Source, Parameter::Fraction)
            | (Phase::Discharge, Parameter::Fraction)
    )
}

/// One classified observation: a (region, target, source, parameter,
/// value) record. Immutable after ingest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputRow {
    pub region: String,
    pub phase: Phase,
    pub target: SectorAddress,
    pub source: SectorAddress,
    pub parameter: Parameter,
    pub value: f64,
}

/// Calculation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Specs {
    /// Output granularity, 1..=5.
    pub level: u8,
    /// When set, restrict the calculation to this region.
    pub region: Option<String>,
    /// Drop sector-to-itself flows from the result.
    pub remove_loops: bool,
    /// Optional CSV sink for the aggregated output table.
    pub output_path: Option<PathBuf>,
}

impl Default for Specs {
    fn default() -> Self {
        Specs {
            level: MAX_LEVEL,
            region: None,
            remove_loops: true,
            output_path: None,
        }
    }
}

impl Specs {
    pub fn new(level: u8) -> Self {
        Specs {
            level,
            ..Default::default()
        }
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn keep_loops(mut self) -> Self {
        self.remove_loops = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.level < 1 || self.level > MAX_LEVEL {
            return crate::calc_err!(
                BadLevel,
                format!("level must be 1..={MAX_LEVEL}, got {}", self.level)
            );
        }
        Ok(())
    }
}
