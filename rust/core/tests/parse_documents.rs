// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoding of the shared fixture document from disk.

use approx::assert_relative_eq;
use bimjson_core::{group_by_thickness, parse_value, read_segments, try_parse_reader};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

const FIXTURE_PATH: &str = "../../tests/models/walls.bimjson";

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(FIXTURE_PATH)
}

#[test]
fn test_fixture_segments() {
    let segments = read_segments(fixture());

    let ids: Vec<&str> = segments.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["W-001", "W-002", "W-003", "W-004", "W-005", "W-006", "W-008"]);

    let thicknesses: Vec<f64> = segments.iter().map(|s| s.thickness_cm).collect();
    for (actual, expected) in thicknesses.iter().zip([20.0, 20.0, 20.0, 25.0, 10.0, 10.0, 12.5]) {
        assert_relative_eq!(*actual, expected);
    }

    assert_relative_eq!(segments[0].length_mm(), 5000.0);
    assert_relative_eq!(segments[4].length_mm(), 2500.0);
    assert_relative_eq!(segments[5].length_mm(), 50.0);
}

#[test]
fn test_fixture_groups() {
    let groups = group_by_thickness(&read_segments(fixture()));
    let summary: Vec<(f64, usize)> = groups.iter().map(|g| (g.thickness_cm, g.count)).collect();
    assert_eq!(summary, vec![(10.0, 2), (12.5, 1), (20.0, 3), (25.0, 1)]);
}

#[test]
fn test_strict_and_materialised_paths_agree() {
    let file = File::open(fixture()).unwrap();
    let strict = try_parse_reader(BufReader::new(file)).unwrap();

    let content = std::fs::read_to_string(fixture()).unwrap();
    let document: serde_json::Value = serde_json::from_str(&content).unwrap();

    assert_eq!(strict, parse_value(&document));
    assert_eq!(strict, read_segments(fixture()));
}
