// Copyright 2021 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Property tests for the link-name codec: decoding inverts encoding
//! for every well-formed address pair, and names off the recognized
//! shapes are rejected rather than misread.

use proptest::prelude::*;

use interflow_engine::{LINK_TOKEN, SectorAddress, decode_link, encode_link};

// sub-level names and units are opaque, but must not contain the
// delimiter
fn level_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,7}"
}

proptest! {
    #[test]
    fn decode_inverts_encode(
        region in "[a-z0-9]{1,5}",
        source in proptest::collection::vec(level_name(), 5),
        source_unit in "[a-z]{1,5}",
        target in proptest::collection::vec(level_name(), 5),
        target_unit in "[a-z]{1,5}",
    ) {
        let source_refs: Vec<&str> = source.iter().map(String::as_str).collect();
        let target_refs: Vec<&str> = target.iter().map(String::as_str).collect();
        let s = SectorAddress::from_levels(&source_refs, &source_unit);
        let t = SectorAddress::from_levels(&target_refs, &target_unit);

        let parts = decode_link(&encode_link(&region, &s, &t)).unwrap();
        prop_assert_eq!(parts.level(), 5);
        prop_assert_eq!(&parts.region, &region);
        prop_assert_eq!(&parts.source, &source);
        prop_assert_eq!(&parts.target, &target);
        // the source unit never survives the encoding
        prop_assert_eq!(&parts.unit, &target_unit);
    }

    #[test]
    fn arbitrary_token_soup_never_misdecodes(
        tokens in proptest::collection::vec("[a-z0-9]{1,5}", 1..20),
    ) {
        let n = tokens.len();
        let well_formed = n >= 5
            && n <= 13
            && n % 2 == 1
            && tokens[(n - 1) / 2] == LINK_TOKEN;
        prop_assume!(!well_formed);

        let name = tokens.join("_");
        prop_assert!(decode_link(&name).is_err(), "{name}");
    }

    #[test]
    fn decoded_levels_match_token_count(level in 1usize..=5) {
        let source: Vec<String> = (0..level).map(|i| format!("s{i}")).collect();
        let target: Vec<String> = (0..level).map(|i| format!("t{i}")).collect();
        let name = format!(
            "01_{}_{}_{}_mgd",
            source.join("_"),
            LINK_TOKEN,
            target.join("_")
        );
        let parts = decode_link(&name).unwrap();
        prop_assert_eq!(parts.level() as usize, level);
        prop_assert_eq!(parts.source, source);
        prop_assert_eq!(parts.target, target);
    }
}
