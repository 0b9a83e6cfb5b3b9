// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attribute resolution for feature property bags
//!
//! Exporters disagree on where wall thickness lives and in which unit, so
//! the resolver walks a fixed list of key paths and takes the first one
//! that is present.

use serde_json::{Map, Value};

/// Where a thickness value may be found, and what to divide it by to get cm
struct ThicknessSource {
    path: &'static [&'static str],
    divisor: f64,
}

/// Lookup order, first present key wins
const THICKNESS_SOURCES: &[ThicknessSource] = &[
    ThicknessSource { path: &["thicknessCm"], divisor: 1.0 },
    ThicknessSource { path: &["ThicknessCm"], divisor: 1.0 },
    ThicknessSource { path: &["thickness_cm"], divisor: 1.0 },
    ThicknessSource { path: &["computed", "thickness_cm"], divisor: 1.0 },
    ThicknessSource { path: &["revit", "mapping", "thickness_cm"], divisor: 1.0 },
    ThicknessSource { path: &["thicknessMm"], divisor: 10.0 },
    ThicknessSource { path: &["ThicknessMm"], divisor: 10.0 },
    ThicknessSource { path: &["thickness_mm"], divisor: 10.0 },
    // Bare "thickness" is millimetres
    ThicknessSource { path: &["thickness"], divisor: 10.0 },
];

/// Resolve wall thickness in centimetres from a feature's properties
///
/// Returns 0 when no known key is present. A present key whose value cannot
/// be read as a number also yields 0; later keys are not consulted.
pub fn resolve_thickness_cm(properties: &Map<String, Value>) -> f64 {
    for source in THICKNESS_SOURCES {
        if let Some(value) = lookup(properties, source.path) {
            let cm = coerce_number(value) / source.divisor;
            return if cm > 0.0 { cm } else { 0.0 };
        }
    }
    0.0
}

fn lookup<'a>(properties: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (last, parents) = path.split_last()?;
    let mut current = properties;
    for key in parents {
        current = current.get(*key)?.as_object()?;
    }
    current.get(*last)
}

/// Read a JSON token as a finite number
///
/// Numbers pass through, strings are parsed as decimals, and everything
/// else (including unparsable strings, NaN and infinities) becomes 0.
pub fn coerce_number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => fast_float::parse::<f64, _>(s.trim()).unwrap_or(0.0),
        _ => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}
