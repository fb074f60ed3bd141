//! # RoofIQ CLI
//!
//! Measures a traced roof outline and assembles its report.
//!
//! ```text
//! roof_cli <polygon.json> [--address TEXT] [--image FILE] [--pdf OUT] [--settings FILE]
//! ```
//!
//! The polygon file holds either a bare `[[lon, lat], ...]` ring or a GeoJSON
//! Polygon. Measurement and report are printed to stdout as JSON. Set
//! `RUST_LOG=debug` for progress output on stderr.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::info;
use roof_core::pdf::{ReportRenderer, TypstRenderer};
use roof_core::{
    CapturedImage, Polygon, ReportAssembler, ReportInput, RoofError, RoofResult, Settings,
};

const USAGE: &str =
    "usage: roof_cli <polygon.json> [--address TEXT] [--image FILE] [--pdf OUT] [--settings FILE]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    polygon: PathBuf,
    address: Option<String>,
    image: Option<PathBuf>,
    pdf: Option<PathBuf>,
    settings: Option<PathBuf>,
}

impl Args {
    fn parse(mut argv: impl Iterator<Item = String>) -> RoofResult<Args> {
        let mut polygon = None;
        let mut args = Args::default();

        while let Some(arg) = argv.next() {
            let mut value = |flag: &str| {
                argv.next()
                    .ok_or_else(|| RoofError::invalid_input(flag, "", format!("Missing value. {}", USAGE)))
            };
            match arg.as_str() {
                "--address" => args.address = Some(value("--address")?),
                "--image" => args.image = Some(value("--image")?.into()),
                "--pdf" => args.pdf = Some(value("--pdf")?.into()),
                "--settings" => args.settings = Some(value("--settings")?.into()),
                flag if flag.starts_with("--") => {
                    return Err(RoofError::invalid_input("argument", flag, format!("Unknown option. {}", USAGE)));
                }
                path if polygon.is_none() => polygon = Some(PathBuf::from(path)),
                extra => {
                    return Err(RoofError::invalid_input("argument", extra, format!("Unexpected argument. {}", USAGE)));
                }
            }
        }

        args.polygon = polygon.ok_or_else(|| RoofError::invalid_input("polygon", "", USAGE))?;
        Ok(args)
    }
}

fn read_file(path: &Path) -> RoofResult<Vec<u8>> {
    fs::read(path).map_err(|e| RoofError::file_error("read", path.display().to_string(), e.to_string()))
}

fn run(args: Args) -> RoofResult<()> {
    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    }
    .apply_env();

    let polygon: Polygon = serde_json::from_slice(&read_file(&args.polygon)?)?;
    let measurement = polygon.measure()?;
    info!(
        "measured {} points: {} sq ft, {} ft",
        measurement.vertex_count, measurement.area_sq_ft.0, measurement.perimeter_ft.0
    );

    let address = args.address.unwrap_or_else(|| "Unknown address".to_string());
    let mut input = ReportInput::for_measurement(address, measurement.centroid, measurement.clone())?;
    if let Some(path) = &args.image {
        input = input.with_image(CapturedImage::from_bytes(read_file(path)?));
    }

    let report = ReportAssembler::new(settings.report).assemble(input)?;

    let output = serde_json::json!({
        "measurement": measurement,
        "report": report,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(path) = &args.pdf {
        let pdf = TypstRenderer.render(&report)?;
        fs::write(path, pdf).map_err(|e| RoofError::file_error("write", path.display().to_string(), e.to_string()))?;
        info!("wrote {}", path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let result = Args::parse(std::env::args().skip(1)).and_then(run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error [{}]: {}", e.error_code(), e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}
