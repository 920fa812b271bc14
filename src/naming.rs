// Copyright 2021 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::agg_err;
use crate::common::Result;

/// Separator used to build flat dictionary keys out of structured
/// addresses. Sub-level names and units must not contain it.
pub const DELIMITER: char = '_';

/// Sentinel sub-level name: addresses are always 5 deep, with absent
/// sub-levels padded out by this name rather than by a shorter tuple.
pub const TOTAL: &str = "total";

/// Literal token separating the source and target halves of a link name.
pub const LINK_TOKEN: &str = "to";

/// The deepest supported sector granularity.
pub const MAX_LEVEL: u8 = 5;

/// A hierarchical sector address: five nested level names plus a
/// resource-unit tag. Units are opaque; equality is textual.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectorAddress {
    pub levels: [String; 5],
    pub unit: String,
}

impl SectorAddress {
    pub fn new(levels: [String; 5], unit: String) -> Self {
        SectorAddress { levels, unit }
    }

    /// Build an address from up to 5 level names, padding the remainder
    /// with the sentinel sub-level.
    pub fn from_levels(levels: &[&str], unit: &str) -> Self {
        debug_assert!(levels.len() <= MAX_LEVEL as usize);
        let mut padded: [String; 5] = [
            TOTAL.to_string(),
            TOTAL.to_string(),
            TOTAL.to_string(),
            TOTAL.to_string(),
            TOTAL.to_string(),
        ];
        for (slot, level) in padded.iter_mut().zip(levels.iter()) {
            *slot = (*level).to_string();
        }
        SectorAddress {
            levels: padded,
            unit: unit.to_string(),
        }
    }

    /// The first `level` sub-level names.
    pub fn truncated(&self, level: u8) -> &[String] {
        &self.levels[..level as usize]
    }

    /// Same sector path in a different unit.
    pub fn with_unit(&self, unit: &str) -> Self {
        SectorAddress {
            levels: self.levels.clone(),
            unit: unit.to_string(),
        }
    }
}

/// Canonical key for a per-sector total: `{region}_{t1..t5}_{unit}`.
pub fn encode_total(region: &str, addr: &SectorAddress) -> String {
    let mut name = String::with_capacity(region.len() + 8 * 6);
    name.push_str(region);
    for level in addr.levels.iter() {
        name.push(DELIMITER);
        name.push_str(level);
    }
    name.push(DELIMITER);
    name.push_str(&addr.unit);
    name
}

/// Canonical key for a source→target flow:
/// `{region}_{s1..s5}_to_{t1..t5}_{unit_t}`.
///
/// Only the target-side unit appears in the name; the source-side unit is
/// deliberately omitted, and downstream aggregation relies on that.
pub fn encode_link(region: &str, source: &SectorAddress, target: &SectorAddress) -> String {
    let mut name = String::with_capacity(region.len() + 8 * 12);
    name.push_str(region);
    for level in source.levels.iter() {
        name.push(DELIMITER);
        name.push_str(level);
    }
    name.push(DELIMITER);
    name.push_str(LINK_TOKEN);
    for level in target.levels.iter() {
        name.push(DELIMITER);
        name.push_str(level);
    }
    name.push(DELIMITER);
    name.push_str(&target.unit);
    name
}

/// A link name split back into its components. `source` and `target`
/// hold the same number of level names, between 1 and 5.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkParts {
    pub region: String,
    pub source: Vec<String>,
    pub target: Vec<String>,
    pub unit: String,
}

impl LinkParts {
    /// The granularity carried by this link name.
    pub fn level(&self) -> u8 {
        self.source.len() as u8
    }
}

/// Split a link name into its components.
///
/// A well-formed name tokenizes as region, K source levels, the literal
/// `to`, K target levels, and a unit, for K in 1..=5. Together with the
/// value column of the deconstructed table that is 6, 8, 10, 12 or 14
/// columns; anything else is malformed.
pub fn decode_link(name: &str) -> Result<LinkParts> {
    let tokens: SmallVec<[&str; 13]> = name.split(DELIMITER).collect();
    let n = tokens.len();

    // n = 2K + 3 for K in 1..=5
    if n < 5 || n > 13 || n % 2 == 0 {
        return agg_err!(
            MalformedLink,
            format!("link name {name:?} splits into {n} tokens")
        );
    }
    let level = (n - 3) / 2;
    if tokens[1 + level] != LINK_TOKEN {
        return agg_err!(
            MalformedLink,
            format!("link name {name:?} has no {LINK_TOKEN:?} separator at depth {level}")
        );
    }

    let source = tokens[1..1 + level]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let target = tokens[2 + level..2 + 2 * level]
        .iter()
        .map(|s| s.to_string())
        .collect();

    Ok(LinkParts {
        region: tokens[0].to_string(),
        source,
        target,
        unit: tokens[n - 1].to_string(),
    })
}
