// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BIMJSON / GeoJSON wall feature parser
//!
//! The streaming entry points drive a `serde_json` deserializer with a
//! custom visitor: the root object is walked key by key, and each element
//! of `features` is materialised on its own, converted, and dropped.
//! Memory use is bounded by the largest single feature, not the document.
//!
//! Decoding is lenient by contract. A feature that is not a usable
//! LineString is skipped, malformed numbers read as 0, and a syntax or I/O
//! error stops the walk but keeps every segment decoded so far.

use crate::attributes::{coerce_number, resolve_thickness_cm};
use crate::error::{Error, Result};
use crate::types::{Point2D, WallSegment};
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use uuid::Uuid;

/// Root `type` values that mark a document as importable
const ACCEPTED_TYPES: [&str; 2] = ["FeatureCollection", "BIMJSON"];

const LINE_STRING: &str = "LineString";

const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Read wall segments from a file on disk
///
/// A missing or unreadable file yields an empty result.
pub fn read_segments(path: impl AsRef<Path>) -> Vec<WallSegment> {
    let path = path.as_ref();
    match File::open(path) {
        Ok(file) => parse_reader(BufReader::with_capacity(READ_BUFFER_SIZE, file)),
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "Cannot open BIMJSON document");
            Vec::new()
        }
    }
}

/// Decode wall segments from a reader, keeping partial results on error
///
/// The reader is consumed byte by byte by `serde_json`, so pass a buffered
/// reader for file or socket sources.
pub fn parse_reader<R: Read>(reader: R) -> Vec<WallSegment> {
    let mut collector = Collector::default();
    if let Err(err) = decode_into(reader, &mut collector) {
        tracing::warn!(
            error = %err,
            decoded = collector.segments.len(),
            "BIMJSON decoding stopped early, keeping segments read so far"
        );
    }
    collector.finish()
}

/// Decode wall segments from a reader, failing on the first error
pub fn try_parse_reader<R: Read>(reader: R) -> Result<Vec<WallSegment>> {
    let mut collector = Collector::default();
    decode_into(reader, &mut collector)?;
    if !collector.is_accepted() {
        return Err(Error::UnsupportedType(collector.root_type));
    }
    Ok(collector.segments)
}

/// Decode wall segments from an in-memory string
///
/// Uses the streaming path, so truncated input behaves like a truncated file.
pub fn parse_str(content: &str) -> Vec<WallSegment> {
    parse_reader(content.as_bytes())
}

/// Decode wall segments from an already materialised document
///
/// Produces the same segments as [`parse_reader`] for a well-formed document.
pub fn parse_value(document: &Value) -> Vec<WallSegment> {
    let Some(root) = document.as_object() else {
        return Vec::new();
    };
    if !root.get("type").is_some_and(is_accepted_type) {
        return Vec::new();
    }

    root.get("features")
        .and_then(Value::as_array)
        .map(|features| {
            features
                .iter()
                .enumerate()
                .filter_map(|(ordinal, feature)| segment_from_feature(ordinal, feature))
                .collect()
        })
        .unwrap_or_default()
}

fn is_accepted_type(value: &Value) -> bool {
    value.as_str().is_some_and(|t| ACCEPTED_TYPES.contains(&t))
}

fn decode_into<R: Read>(reader: R, collector: &mut Collector) -> Result<()> {
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    DocumentSeed { collector }.deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(())
}

/// Convert one feature into a segment if it carries a usable LineString
fn segment_from_feature(ordinal: usize, feature: &Value) -> Option<WallSegment> {
    let object = feature.as_object()?;
    let geometry = object.get("geometry")?.as_object()?;
    if geometry.get("type").and_then(Value::as_str) != Some(LINE_STRING) {
        return None;
    }

    // v1 imports straight walls: only the first two vertices are used
    let (a, b) = match geometry.get("coordinates")?.as_array()?.as_slice() {
        [first, second, ..] => (point(first)?, point(second)?),
        _ => return None,
    };

    let properties = object.get("properties").and_then(Value::as_object);
    let id = object
        .get("id")
        .and_then(id_token)
        .or_else(|| properties.and_then(|p| p.get("id")).and_then(id_token))
        .unwrap_or_else(|| fallback_id(ordinal, feature));
    let thickness_cm = properties.map(resolve_thickness_cm).unwrap_or(0.0);

    Some(WallSegment {
        id,
        thickness_cm,
        a,
        b,
    })
}

/// First two coordinates of a position; elevation is dropped
fn point(position: &Value) -> Option<Point2D> {
    match position.as_array()?.as_slice() {
        [x, y, ..] => Some(Point2D::new(coerce_number(x), coerce_number(y))),
        _ => None,
    }
}

fn id_token(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Opaque id for a feature without one, stable across re-reads of the same document
fn fallback_id(ordinal: usize, feature: &Value) -> String {
    let name = format!("{}:{}", ordinal, feature);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
        .simple()
        .to_string()
}

/// State shared by the visitors while walking the document
#[derive(Default)]
struct Collector {
    segments: Vec<WallSegment>,
    root_type: Option<String>,
    features_seen: usize,
}

impl Collector {
    fn is_accepted(&self) -> bool {
        self.root_type
            .as_deref()
            .is_some_and(|t| ACCEPTED_TYPES.contains(&t))
    }

    fn finish(self) -> Vec<WallSegment> {
        if !self.is_accepted() {
            tracing::debug!(root_type = ?self.root_type, "Rejected document type");
            return Vec::new();
        }
        tracing::debug!(
            features = self.features_seen,
            segments = self.segments.len(),
            "Decoded BIMJSON document"
        );
        self.segments
    }
}

struct DocumentSeed<'a> {
    collector: &'a mut Collector,
}

impl<'de, 'a> DeserializeSeed<'de> for DocumentSeed<'a> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(DocumentVisitor {
            collector: self.collector,
        })
    }
}

struct DocumentVisitor<'a> {
    collector: &'a mut Collector,
}

impl<'de, 'a> Visitor<'de> for DocumentVisitor<'a> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a BIMJSON document object")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        let collector = self.collector;
        // Keep walking after `features` so a trailing `type` is still seen
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "type" => {
                    let value: Value = map.next_value()?;
                    collector.root_type = Some(match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    });
                }
                "features" => {
                    // A repeated key replaces the earlier array, as in a materialised map
                    collector.segments.clear();
                    collector.features_seen = 0;
                    map.next_value_seed(FeaturesSeed {
                        collector: &mut *collector,
                    })?
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(())
    }
}

struct FeaturesSeed<'a> {
    collector: &'a mut Collector,
}

impl<'de, 'a> DeserializeSeed<'de> for FeaturesSeed<'a> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(FeaturesVisitor {
            collector: self.collector,
        })
    }
}

/// Walks the `features` array; any other value is skipped
struct FeaturesVisitor<'a> {
    collector: &'a mut Collector,
}

impl<'de, 'a> Visitor<'de> for FeaturesVisitor<'a> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of features")
    }

    fn visit_seq<S>(self, mut seq: S) -> std::result::Result<(), S::Error>
    where
        S: SeqAccess<'de>,
    {
        let collector = self.collector;
        while let Some(feature) = seq.next_element::<Value>()? {
            let ordinal = collector.features_seen;
            collector.features_seen += 1;
            if let Some(segment) = segment_from_feature(ordinal, &feature) {
                collector.segments.push(segment);
            }
        }
        Ok(())
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_str<E: de::Error>(self, _: &str) -> std::result::Result<(), E> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    const SINGLE_WALL: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[0, 0], [1000, 0]] },
                "properties": { "thickness_cm": 20 }
            }
        ]
    }"#;

    #[test]
    fn test_single_wall() {
        let segments = parse_str(SINGLE_WALL);

        assert_eq!(segments.len(), 1);
        assert_relative_eq!(segments[0].thickness_cm, 20.0);
        assert_relative_eq!(segments[0].length_mm(), 1000.0);
        assert_eq!(segments[0].a, Point2D::new(0.0, 0.0));
        assert_eq!(segments[0].b, Point2D::new(1000.0, 0.0));
        assert!(!segments[0].id.is_empty());
    }

    #[test]
    fn test_bimjson_type_accepted() {
        let content = SINGLE_WALL.replace("FeatureCollection", "BIMJSON");
        assert_eq!(parse_str(&content).len(), 1);
    }

    #[test]
    fn test_other_types_rejected() {
        let wrong = SINGLE_WALL.replace("FeatureCollection", "Feature");
        assert!(parse_str(&wrong).is_empty());

        let missing = r#"{"features": [{"geometry": {"type": "LineString", "coordinates": [[0,0],[1,1]]}}]}"#;
        assert!(parse_str(missing).is_empty());

        assert!(parse_str("[1, 2, 3]").is_empty());
        assert!(parse_str("").is_empty());
    }

    #[test]
    fn test_type_after_features() {
        let content = r#"{
            "features": [{"id": "w1", "geometry": {"type": "LineString", "coordinates": [[0,0],[500,0]]}}],
            "type": "BIMJSON"
        }"#;
        let segments = parse_str(content);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].id, "w1");
    }

    #[test]
    fn test_repeated_features_key_keeps_last() {
        let content = r#"{
            "type": "BIMJSON",
            "features": [{"id": "a", "geometry": {"type": "LineString", "coordinates": [[0,0],[500,0]]}}],
            "features": [{"id": "b", "geometry": {"type": "LineString", "coordinates": [[0,0],[0,500]]}}]
        }"#;
        let streamed = parse_str(content);
        let document: Value = serde_json::from_str(content).unwrap();

        let ids: Vec<&str> = streamed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(streamed, parse_value(&document));
    }

    #[test]
    fn test_id_precedence() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [
                {"id": "feature-id", "geometry": {"type": "LineString", "coordinates": [[0,0],[1,0]]},
                 "properties": {"id": "prop-id"}},
                {"geometry": {"type": "LineString", "coordinates": [[0,0],[1,0]]},
                 "properties": {"id": "prop-id"}},
                {"id": 42, "geometry": {"type": "LineString", "coordinates": [[0,0],[1,0]]}},
                {"id": null, "geometry": {"type": "LineString", "coordinates": [[0,0],[1,0]]}}
            ]
        }"#;
        let segments = parse_str(content);

        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0].id, "feature-id");
        assert_eq!(segments[1].id, "prop-id");
        assert_eq!(segments[2].id, "42");
        assert_eq!(segments[3].id.len(), 32);
    }

    #[test]
    fn test_fallback_ids_are_distinct() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [
                {"geometry": {"type": "LineString", "coordinates": [[0,0],[1,0]]}},
                {"geometry": {"type": "LineString", "coordinates": [[0,0],[1,0]]}}
            ]
        }"#;
        let segments = parse_str(content);
        assert_eq!(segments.len(), 2);
        assert_ne!(segments[0].id, segments[1].id);
    }

    #[test]
    fn test_only_first_two_points_and_xy() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [
                {"geometry": {"type": "LineString",
                              "coordinates": [[10, 20, 3000], [110, 20, 3000], [500, 500, 0]]}}
            ]
        }"#;
        let segments = parse_str(content);
        assert_eq!(segments[0].a, Point2D::new(10.0, 20.0));
        assert_eq!(segments[0].b, Point2D::new(110.0, 20.0));
        assert_eq!(segments[0].thickness_cm, 0.0);
    }

    #[test]
    fn test_unusable_features_are_skipped() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [
                {"geometry": {"type": "Point", "coordinates": [0, 0]}},
                {"geometry": {"type": "LineString", "coordinates": [[0, 0]]}},
                {"geometry": {"type": "LineString", "coordinates": [[0], [1, 1]]}},
                {"geometry": null},
                "not a feature",
                {"id": "ok", "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}}
            ]
        }"#;
        let segments = parse_str(content);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].id, "ok");
    }

    #[test]
    fn test_malformed_coordinates_coerce_to_zero() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [
                {"geometry": {"type": "LineString", "coordinates": [["abc", "250.5"], [null, {"x": 1}]]}}
            ]
        }"#;
        let segments = parse_str(content);
        assert_eq!(segments[0].a, Point2D::new(0.0, 250.5));
        assert_eq!(segments[0].b, Point2D::new(0.0, 0.0));
    }

    #[test]
    fn test_truncated_document_keeps_prefix() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [
                {"id": "a", "geometry": {"type": "LineString", "coordinates": [[0,0],[1000,0]]}},
                {"id": "b", "geometry": {"type": "LineString", "coordinates": [[0,0],[2000,0]]}},
                {"id": "c", "geometry": {"type": "LineStr"#;
        let segments = parse_str(content);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].id, "b");

        assert!(try_parse_reader(content.as_bytes()).is_err());
    }

    #[test]
    fn test_non_array_features_ignored() {
        let content = r#"{"type": "FeatureCollection", "features": {"a": 1}, "name": "x"}"#;
        assert!(parse_str(content).is_empty());
        assert!(try_parse_reader(content.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_try_parse_reports_unsupported_type() {
        let err = try_parse_reader(r#"{"type": "Topology", "features": []}"#.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(Some(ref t)) if t == "Topology"));
    }

    #[test]
    fn test_value_and_stream_agree() {
        let content = r#"{
            "type": "BIMJSON",
            "crs": {"name": "local"},
            "features": [
                {"id": "a", "geometry": {"type": "LineString", "coordinates": [[0,0],[1000,0]]},
                 "properties": {"thicknessMm": 150}},
                {"geometry": {"type": "LineString", "coordinates": [[0,0],[0,"900"]]},
                 "properties": {"revit": {"mapping": {"thickness_cm": 12.5}}}},
                {"geometry": {"type": "Polygon", "coordinates": []}}
            ]
        }"#;
        let streamed = parse_str(content);
        let document: Value = serde_json::from_str(content).unwrap();
        let materialised = parse_value(&document);

        assert_eq!(streamed, materialised);
        assert_eq!(streamed.len(), 2);
    }

    #[test]
    fn test_reparse_is_identical() {
        let content = json!({
            "type": "FeatureCollection",
            "features": [
                {"geometry": {"type": "LineString", "coordinates": [[0, 0], [100, 0]]}},
                {"geometry": {"type": "LineString", "coordinates": [[0, 0], [0, 100]]},
                 "properties": {"thickness": 200}}
            ]
        })
        .to_string();

        assert_eq!(parse_str(&content), parse_str(&content));
    }

    #[test]
    fn test_missing_file() {
        assert!(read_segments("/definitely/not/here.bimjson").is_empty());
    }
}
