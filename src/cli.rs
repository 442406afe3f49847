// ============================================================================
// rasterfill CLI: headless bucket fills via command-line arguments
// ============================================================================
//
// Usage examples:
//   rasterfill -i sketch.png --seed 40,12 --color "#ff0000"
//   rasterfill -i sketch.png --seed 5,5 --seed 60,60 --tolerance 0 -o out.png
//   rasterfill -i "frames/*.png" --seed 0,0 --fill-mode behind --output-dir out/
//   rasterfill -i ink.png --overlay paper.png --reference all --flatten --seed 10,10
//
// Each seed after the first continues the same fill gesture, so drag-to-fill
// gating applies to it exactly as it would under a dragged pointer.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use image::Rgba;

use crate::canvas::{BoundedImage, IntRect};
use crate::components::layers::{Layer, LayerStack};
use crate::components::tools::{FillMode, ReferenceMode};
use crate::io::{SaveFormat, encode_and_write, export_region, load_image_sync};
use crate::ops::bucket::{BucketFill, BucketProgress};
use crate::ops::expand::MAX_EXPAND;
use crate::settings::FillSettings;

/// Frame the loaded images are keyed at.
const FRAME: i32 = 1;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// rasterfill headless bucket-fill processor.
#[derive(Parser, Debug)]
#[command(
    name = "rasterfill",
    version,
    about = "Tolerance-based bucket fill for raster images",
    long_about = "Flood-fill raster images from one or more seed points without a GUI.\n\
                  Defaults come from the rasterfill settings file; flags override them.\n\n\
                  Example:\n  \
                  rasterfill -i sketch.png --seed 40,12 --color \"#ff0000\" --expand 2\n  \
                  rasterfill -i \"*.png\" --seed 0,0 --fill-mode behind --output-dir out/"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "frames/*.png").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Seed point in canvas pixels. Repeat to continue the same gesture.
    #[arg(long, required = true, value_name = "X,Y", allow_hyphen_values = true)]
    pub seed: Vec<String>,

    /// Fill colour: "#rrggbb", "#rrggbbaa" or "r,g,b[,a]" (straight alpha).
    #[arg(short, long, value_name = "COLOR")]
    pub color: Option<String>,

    /// Per-channel colour tolerance.
    #[arg(short, long, value_name = "N")]
    pub tolerance: Option<u32>,

    /// Match only exact colours.
    #[arg(long)]
    pub no_tolerance: bool,

    /// Grow the filled region outward by N pixels (0 disables, at most 1024).
    #[arg(
        short,
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(0..=MAX_EXPAND as i64)
    )]
    pub expand: Option<u32>,

    /// How the fill is written: over, replace or behind.
    #[arg(long, value_name = "MODE")]
    pub fill_mode: Option<String>,

    /// Which pixels decide the fill region: current (the input) or all (input + overlays).
    #[arg(long, value_name = "current|all")]
    pub reference: Option<String>,

    /// Extra layers stacked above the input. Only sampled with `--reference all`.
    #[arg(long, value_name = "FILE")]
    pub overlay: Vec<PathBuf>,

    /// Write the composite of all layers instead of the filled input layer.
    #[arg(long)]
    pub flatten: bool,

    /// Crop the output to its non-transparent pixels and report the bounds.
    #[arg(long)]
    pub autocrop: bool,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// JPEG quality (1-100).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// Store the effective fill settings as the new defaults.
    #[arg(long)]
    pub save_defaults: bool,

    /// Print per-file timing and fill details.
    #[arg(short, long)]
    pub verbose: bool,
}

/// What happened to one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillReport {
    pub fills: usize,
    pub refused: usize,
    pub written: IntRect,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let settings = match apply_overrides(FillSettings::load(), &args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let seeds = match args.seed.iter().map(|s| parse_point(s)).collect::<Result<Vec<_>, _>>() {
        Ok(seeds) => seeds,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.save_defaults {
        match settings.save() {
            Ok(path) => println!("saved defaults to {}", path.display()),
            Err(e) => {
                eprintln!("error: could not save defaults: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let mut overlays = Vec::with_capacity(args.overlay.len());
    for path in &args.overlay {
        match load_image_sync(path) {
            Ok(img) => overlays.push(img),
            Err(e) => {
                eprintln!("error: could not load overlay '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let format = args
        .output
        .as_deref()
        .and_then(SaveFormat::from_path)
        .unwrap_or(SaveFormat::Png);

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            format,
        ) else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                input_path.display()
            );
            any_failure = true;
            continue;
        };

        let job = FillJob {
            seeds: &seeds,
            settings: &settings,
            overlays: &overlays,
            format,
            quality: args.quality,
            flatten: args.flatten,
            autocrop: args.autocrop,
            verbose: args.verbose,
        };
        match run_one(input_path, &output_path, &job) {
            Ok(report) => {
                crate::log_info!(
                    "{} -> {}: {} fill(s), {} refused",
                    input_path.display(),
                    output_path.display(),
                    report.fills,
                    report.refused
                );
                if report.fills == 0 {
                    println!("  note: nothing was filled");
                }
                if args.autocrop {
                    let r = report.written;
                    println!("  bounds: {},{} {}x{}", r.x, r.y, r.width, r.height);
                }
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                crate::log_err!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

struct FillJob<'a> {
    seeds: &'a [(i32, i32)],
    settings: &'a FillSettings,
    overlays: &'a [BoundedImage],
    format: SaveFormat,
    quality: u8,
    flatten: bool,
    autocrop: bool,
    verbose: bool,
}

fn run_one(input: &Path, output: &Path, job: &FillJob<'_>) -> Result<FillReport, String> {
    // -- Step 1: Load ----------------------------------------------------
    let target = load_image_sync(input).map_err(|e| format!("load failed: {}", e))?;
    let canvas = target.bounds();
    let (mut stack, layer_index) = build_stack(input, target, job.overlays);

    // -- Step 2: Fill ----------------------------------------------------
    let Some(&first) = job.seeds.first() else {
        return Err("no seed point given".to_string());
    };
    let mut bucket = BucketFill::new(
        &stack,
        layer_index,
        FRAME,
        first,
        job.settings.bucket_color,
        job.settings.properties,
    );
    let mut fills = 0;
    let mut refused = 0;
    for &seed in job.seeds {
        let verbose = job.verbose;
        let filled = bucket.paint(&mut stack, seed, |progress, _, _| {
            if verbose && progress == BucketProgress::DidFillTarget {
                println!("  filled at {},{}", seed.0, seed.1);
            }
        });
        if filled {
            fills += 1;
        } else {
            refused += 1;
        }
    }

    // -- Step 3: Save ----------------------------------------------------
    let mut result = if job.flatten {
        stack.flatten_visible_bitmaps(FRAME)
    } else {
        stack
            .bitmap_at(layer_index, FRAME)
            .cloned()
            .unwrap_or_default()
    };
    let written = if job.autocrop {
        result.auto_crop();
        result.bounds()
    } else {
        canvas
    };
    if written.is_empty() {
        return Err("nothing left to write after auto-crop".to_string());
    }

    encode_and_write(&export_region(&result, written), output, job.format, job.quality)
        .map_err(|e| format!("save failed: {}", e))?;

    Ok(FillReport {
        fills,
        refused,
        written,
    })
}

/// Input image as the bottom bitmap layer, overlays stacked above it.
fn build_stack(
    input: &Path,
    target: BoundedImage,
    overlays: &[BoundedImage],
) -> (LayerStack, usize) {
    let name = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Background")
        .to_string();
    let mut stack = LayerStack::new(target.bounds());
    let mut layer = Layer::new_bitmap(name);
    layer.set_keyframe(FRAME, target);
    let index = stack.push(layer);
    for (i, img) in overlays.iter().enumerate() {
        let mut overlay = Layer::new_bitmap(format!("Overlay {}", i + 1));
        overlay.set_keyframe(FRAME, img.clone());
        stack.push(overlay);
    }
    (stack, index)
}

// ============================================================================
// Helpers
// ============================================================================

/// Layer command-line flags over the stored defaults.
fn apply_overrides(mut settings: FillSettings, args: &CliArgs) -> Result<FillSettings, String> {
    let p = &mut settings.properties;
    if let Some(t) = args.tolerance {
        p.tolerance = t;
        p.tolerance_enabled = true;
    }
    if args.no_tolerance {
        p.tolerance_enabled = false;
    }
    if let Some(e) = args.expand {
        p.expand = e;
        p.expand_enabled = e > 0;
    }
    if let Some(mode) = &args.fill_mode {
        p.fill_mode = FillMode::from_config_str(mode)
            .ok_or_else(|| format!("unknown fill mode '{}' (over, replace, behind)", mode))?;
    }
    if let Some(mode) = &args.reference {
        p.reference_mode = ReferenceMode::from_config_str(mode)
            .ok_or_else(|| format!("unknown reference mode '{}' (current, all)", mode))?;
    }
    if let Some(c) = &args.color {
        settings.bucket_color = parse_color(c)?;
    }
    Ok(settings)
}

/// Parse "X,Y" in canvas pixels. Negative coordinates are allowed.
fn parse_point(s: &str) -> Result<(i32, i32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("invalid seed '{}': expected X,Y", s))?;
    let x = x
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid seed x in '{}': {}", s, e))?;
    let y = y
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid seed y in '{}': {}", s, e))?;
    Ok((x, y))
}

/// Parse "#rgb", "#rrggbb", "#rrggbbaa" or "r,g,b[,a]".
fn parse_color(s: &str) -> Result<Rgba<u8>, String> {
    let s = s.trim();
    let Some(hex) = s.strip_prefix('#') else {
        return FillSettings::str_to_color(s).ok_or_else(|| format!("invalid colour '{}'", s));
    };
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2).unwrap_or(""), 16);
    let parsed = match hex.len() {
        3 => {
            let short = |i: usize| {
                u8::from_str_radix(hex.get(i..i + 1).unwrap_or(""), 16).map(|v| v * 17)
            };
            short(0).and_then(|r| Ok(Rgba([r, short(1)?, short(2)?, 255])))
        }
        6 => channel(0).and_then(|r| Ok(Rgba([r, channel(2)?, channel(4)?, 255]))),
        8 => channel(0).and_then(|r| Ok(Rgba([r, channel(2)?, channel(4)?, channel(6)?]))),
        _ => return Err(format!("invalid colour '{}': expected 3, 6 or 8 hex digits", s)),
    };
    parsed.map_err(|e| format!("invalid colour '{}': {}", s, e))
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, single-file input)
/// 2. `--output-dir` (batch directory, keeps the input stem)
/// 3. Fallback: `<stem>_filled.<ext>` next to the input
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}_filled.{}", stem, ext)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["rasterfill", "-i", "in.png", "--seed", "1,2"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn points_accept_negatives_and_spaces() {
        assert_eq!(parse_point("3,4"), Ok((3, 4)));
        assert_eq!(parse_point(" -7 , 12 "), Ok((-7, 12)));
        assert!(parse_point("3;4").is_err());
        assert!(parse_point("x,4").is_err());
    }

    #[test]
    fn colours_in_hex_and_decimal() {
        assert_eq!(parse_color("#ff0000"), Ok(Rgba([255, 0, 0, 255])));
        assert_eq!(parse_color("#00ff0080"), Ok(Rgba([0, 255, 0, 128])));
        assert_eq!(parse_color("#f0a"), Ok(Rgba([255, 0, 170, 255])));
        assert_eq!(parse_color("10,20,30"), Ok(Rgba([10, 20, 30, 255])));
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("#gg0000").is_err());
        assert!(parse_color("red").is_err());
    }

    #[test]
    fn output_path_priority() {
        let input = Path::new("art/cat.png");
        assert_eq!(
            build_output_path(input, Some(Path::new("x.jpg")), None, SaveFormat::Jpeg),
            Some(PathBuf::from("x.jpg"))
        );
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out")), SaveFormat::Png),
            Some(PathBuf::from("out/cat.png"))
        );
        assert_eq!(
            build_output_path(input, None, None, SaveFormat::Png),
            Some(PathBuf::from("art/cat_filled.png"))
        );
    }

    #[test]
    fn flags_override_defaults() {
        let base = FillSettings::default();
        let s = apply_overrides(
            base,
            &args(&[
                "--tolerance",
                "5",
                "--expand",
                "3",
                "--fill-mode",
                "replace",
                "--reference",
                "all",
                "-c",
                "#0000ff",
            ]),
        )
        .expect("valid flags");
        assert_eq!(s.properties.tolerance, 5);
        assert!(s.properties.expand_enabled);
        assert_eq!(s.properties.expand, 3);
        assert_eq!(s.properties.fill_mode, FillMode::Replace);
        assert_eq!(s.properties.reference_mode, ReferenceMode::AllVisibleLayers);
        assert_eq!(s.bucket_color, Rgba([0, 0, 255, 255]));

        let s = apply_overrides(base, &args(&["--no-tolerance", "--expand", "0"]))
            .expect("valid flags");
        assert_eq!(s.properties.squared_tolerance(), 0);
        assert!(!s.properties.expand_enabled);

        assert!(apply_overrides(base, &args(&["--fill-mode", "sideways"])).is_err());
    }

    #[test]
    fn expand_flag_is_range_checked() {
        let base = ["rasterfill", "-i", "in.png", "--seed", "1,2", "--expand"];
        let at_cap = MAX_EXPAND.to_string();
        let ok = CliArgs::try_parse_from(base.iter().copied().chain([at_cap.as_str()]));
        assert_eq!(ok.expect("cap is accepted").expand, Some(MAX_EXPAND));
        for too_big in ["1025", "40000", "3000000000"] {
            let parsed = CliArgs::try_parse_from(base.iter().copied().chain([too_big]));
            assert!(parsed.is_err(), "--expand {} should be rejected", too_big);
        }
    }

    #[test]
    fn seeds_repeat_and_allow_negatives() {
        let a = args(&["--seed", "-3,-4"]);
        assert_eq!(a.seed, vec!["1,2".to_string(), "-3,-4".to_string()]);
    }
}
