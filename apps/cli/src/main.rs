// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! bimjson-import - import BIMJSON wall segments through the host bridge.
//!
//! Reads a BIMJSON/GeoJSON document, prints its thickness groups and runs a
//! full import against an in-memory host document:
//!
//! 1. One wall type is created per thickness group, plus two levels and a
//!    reference object at the origin.
//! 2. The host executor runs on its own thread, woken by the bridge.
//! 3. `fetch-selectable-data` and `import-segments` requests are issued
//!    through the bridge and the import report is printed.

use anyhow::{bail, Context, Result};
use bimjson_core::{group_by_thickness, read_segments, ThicknessGroup};
use bimjson_host::memory::{InMemoryDocument, InMemoryHost};
use bimjson_host::{mm_to_feet, ImportOptions, ReferenceTransform};
use bimjson_messaging::{
    ElementId, ImportPlan, ImportReport, RequestBody, SegmentSource, SelectableData, TypeMapping,
};
use clap::Parser;
use std::path::PathBuf;

mod config;
mod session;

use config::{Config, LogFormat};
use session::HostSession;

const BASE_LEVEL_ID: i64 = 1;
const TOP_LEVEL_ID: i64 = 2;
const REFERENCE_ID: i64 = 500;
const FIRST_WALL_TYPE_ID: i64 = 1000;

/// Command-line arguments for bimjson-import
#[derive(Parser, Debug)]
#[command(name = "bimjson-import")]
#[command(about = "Import BIMJSON wall segments into an in-memory host document")]
#[command(version)]
struct Args {
    /// BIMJSON or GeoJSON FeatureCollection to import
    path: PathBuf,

    /// Elevation of the base level in millimeters
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    base_elevation_mm: f64,

    /// Elevation of the top level in millimeters
    #[arg(long, default_value_t = 3000.0, allow_negative_numbers = true)]
    top_elevation_mm: f64,

    /// Only print the thickness groups
    #[arg(long)]
    groups_only: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    init_tracing(config.log_format);

    let args = Args::parse();
    tracing::info!(
        path = %args.path.display(),
        timeout_secs = config.request_timeout_secs,
        min_wall_length_mm = config.min_wall_length_mm,
        "Starting BIMJSON import"
    );

    let segments = read_segments(&args.path);
    let groups = group_by_thickness(&segments);
    tracing::info!(segments = segments.len(), groups = groups.len(), "Document parsed");

    if args.groups_only {
        return print_groups(&groups, args.json);
    }
    if segments.is_empty() {
        bail!("No wall segments found in {}", args.path.display());
    }

    let host = InMemoryHost::new(build_document(&args, &groups));
    let options = ImportOptions {
        min_length_mm: config.min_wall_length_mm,
        ..ImportOptions::default()
    };
    let session = HostSession::start(host, options, config.request_timeout())?;

    let selectable = session.request(RequestBody::FetchSelectableData).await?;
    let data = match selectable.selectable_data() {
        Some(data) if selectable.success => data.clone(),
        _ => bail!("Host refused to list selectable data: {:?}", selectable.diagnostics),
    };

    let plan = build_plan(&data, &groups, SegmentSource::Segments(segments))?;
    let response = session
        .request(RequestBody::ImportSegments(Some(plan)))
        .await
        .context("Import request failed")?;
    let report = match response.import_report() {
        Some(report) if response.success => report.clone(),
        _ => bail!("Import was rejected: {:?}", response.diagnostics),
    };

    let host = session.stop()?;
    if let Some(doc) = host.document() {
        tracing::info!(walls = doc.walls().len(), "Host document updated");
    }

    print_report(&groups, &report, args.json)
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,bimjson=debug".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn wall_type_name(thickness_cm: f64) -> String {
    format!("Generic {} cm", thickness_cm)
}

/// Two levels, one wall type per thickness group and a reference at the origin
fn build_document(args: &Args, groups: &[ThicknessGroup]) -> InMemoryDocument {
    let doc = InMemoryDocument::new()
        .with_level(ElementId(BASE_LEVEL_ID), "Base", mm_to_feet(args.base_elevation_mm))
        .with_level(ElementId(TOP_LEVEL_ID), "Top", mm_to_feet(args.top_elevation_mm))
        .with_reference(ElementId(REFERENCE_ID), "Source", ReferenceTransform::identity());

    groups
        .iter()
        .zip(FIRST_WALL_TYPE_ID..)
        .fold(doc, |doc, (group, id)| {
            doc.with_wall_type(
                ElementId(id),
                &wall_type_name(group.thickness_cm),
                mm_to_feet(group.thickness_cm * 10.0),
            )
        })
}

/// Map each thickness group to the wall type of the same name
fn build_plan(data: &SelectableData, groups: &[ThicknessGroup], source: SegmentSource) -> Result<ImportPlan> {
    let reference = data
        .references
        .first()
        .context("Host document has no reference object")?;
    let base = data
        .levels
        .iter()
        .find(|level| level.id == ElementId(BASE_LEVEL_ID))
        .context("Base level missing")?;
    let top = data
        .levels
        .iter()
        .find(|level| level.id == ElementId(TOP_LEVEL_ID))
        .context("Top level missing")?;

    let mappings = groups
        .iter()
        .filter_map(|group| {
            let name = wall_type_name(group.thickness_cm);
            data.wall_types
                .iter()
                .find(|wall_type| wall_type.name == name)
                .map(|wall_type| TypeMapping {
                    thickness_cm: group.thickness_cm,
                    wall_type_id: wall_type.id.to_string(),
                })
        })
        .collect();

    Ok(ImportPlan {
        source,
        reference_id: reference.id.to_string(),
        base_level_id: base.id.to_string(),
        top_level_id: top.id.to_string(),
        mappings,
    })
}

fn print_groups(groups: &[ThicknessGroup], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(groups)?);
        return Ok(());
    }
    println!("{:>14}  {:>6}", "thickness (cm)", "count");
    for group in groups {
        println!("{:>14.2}  {:>6}", group.thickness_cm, group.count);
    }
    Ok(())
}

fn print_report(groups: &[ThicknessGroup], report: &ImportReport, json: bool) -> Result<()> {
    if json {
        let output = serde_json::json!({ "groups": groups, "report": report });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_groups(groups, false)?;
    println!();
    println!(
        "created {}, skipped {}, failed {}",
        report.created, report.skipped, report.failed
    );
    for item in &report.items {
        match (&item.created_id, &item.reason) {
            (Some(id), _) => println!("  {:<16} created  #{}", item.source_id, id),
            (None, Some(reason)) => println!(
                "  {:<16} {:<8} {} {}",
                item.source_id,
                format!("{:?}", item.status).to_lowercase(),
                reason,
                item.message
            ),
            (None, None) => println!("  {:<16} {:?}", item.source_id, item.status),
        }
    }
    Ok(())
}
