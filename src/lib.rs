// Copyright 2021 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod common;
pub mod datamodel;

mod aggregate;
mod calc;
mod index;
mod naming;
mod results;
mod table;

pub use self::aggregate::{Deconstructed, LinkRecord, aggregate, deconstruct};
pub use self::calc::Calculator;
pub use self::common::{Error, ErrorCode, ErrorKind, Result};
pub use self::datamodel::{Direction, InputRow, Parameter, Phase, Specs, classify};
pub use self::index::FlowIndex;
pub use self::naming::{
    DELIMITER, LINK_TOKEN, LinkParts, MAX_LEVEL, SectorAddress, TOTAL, decode_link, encode_link,
    encode_total,
};
pub use self::results::{FlowRecord, FlowTable, OutputRow, OutputTable};
pub use self::table::{
    COLUMN_COUNT, WideColumn, melt_wide, parse_record, parse_table, parse_wide_header,
};
