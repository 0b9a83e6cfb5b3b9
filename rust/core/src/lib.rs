// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BIMJSON Core
//!
//! Decoding of BIMJSON / GeoJSON line-feature documents into wall segments.
//!
//! ## Overview
//!
//! - **Streaming Parser**: features are decoded one at a time straight from
//!   a reader, so arbitrarily large documents never sit in memory whole
//! - **Attribute Resolution**: wall thickness is looked up in the feature's
//!   property bag through an ordered list of key variants
//! - **Grouping**: segments are summarised by thickness rounded to 0.01 cm
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bimjson_core::{group_by_thickness, read_segments};
//!
//! let segments = read_segments("plan.bimjson");
//! for group in group_by_thickness(&segments) {
//!     println!("{:.2} cm: {} walls", group.thickness_cm, group.count);
//! }
//! ```
//!
//! ## Accepted Documents
//!
//! ```json
//! {
//!   "type": "FeatureCollection",
//!   "features": [
//!     {
//!       "id": "w1",
//!       "geometry": { "type": "LineString", "coordinates": [[0, 0], [1000, 0]] },
//!       "properties": { "thickness_cm": 20 }
//!     }
//!   ]
//! }
//! ```

pub mod attributes;
pub mod error;
pub mod grouping;
pub mod parser;
pub mod types;

pub use attributes::{coerce_number, resolve_thickness_cm};
pub use error::{Error, Result};
pub use grouping::group_by_thickness;
pub use parser::{parse_reader, parse_str, parse_value, read_segments, try_parse_reader};
pub use types::{Point2D, ThicknessGroup, ThicknessKey, WallSegment};
