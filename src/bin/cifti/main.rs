//! cifti-cli - build and inspect CIFTI-2 dense time series.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use cifti::cifti::{read_dense_series, registry, ModelIndices, StructureKind};
use cifti::pipeline::{GenerateCifti, GenerateConfig};
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable overriding the verbosity flags.
const LOG_ENV: &str = "CIFTI_LOG";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered: Vec<&str> = Vec::new();
    for arg in &args {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered.push(arg),
        }
    }
    init_logging(level);

    let Some((&command, rest)) = filtered.split_first() else {
        print_help();
        return ExitCode::SUCCESS;
    };

    let result = match command {
        "generate" | "g" => cmd_generate(rest),
        "info" | "i" => match rest.first() {
            Some(path) => cmd_info(Path::new(path)),
            None => Err(anyhow::anyhow!("missing file argument\nUsage: cifti-cli info <file.dtseries.nii>")),
        },
        "models" | "m" => {
            cmd_models();
            Ok(())
        }
        "-V" | "--version" => {
            println!("cifti-cli {} (built {})", env!("CARGO_PKG_VERSION"), env!("CIFTI_BUILD_DATE"));
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        // A dtseries file on its own is shorthand for `info`
        path if path.ends_with(".dtseries.nii") => cmd_info(Path::new(path)),
        other => Err(anyhow::anyhow!("unknown command '{}' (try 'cifti-cli help')", other)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn print_help() {
    println!("cifti-cli - CIFTI-2 dense time series toolkit");
    println!();
    println!("USAGE:");
    println!("    cifti-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    g, generate [config.json] [FLAGS]   Build a .dtseries.nii from BOLD, GIFTI and annotations");
    println!("    i, info     <file>                  Show series, brain models and metadata of a dtseries");
    println!("    m, models                           List structures in column order");
    println!("    h, help                             Show this help");
    println!();
    println!("GENERATE FLAGS (override the config file):");
    println!("    --bold <file>              4D BOLD volume (.nii / .nii.gz)");
    println!("    --gifti <left> <right>     Surface series, left then right");
    println!("    --tr <seconds>             Repetition time");
    println!("    --surface-target <name>    fsaverage5 | fsaverage6 | fsaverage");
    println!("    --volume-target <name>     MNI152NLin2009cAsym");
    println!("    --subjects-dir <dir>       FreeSurfer SUBJECTS_DIR (default: $SUBJECTS_DIR)");
    println!("    --templates-dir <dir>      Directory holding the label atlas dataset");
    println!("    --label-file <file>        Explicit label atlas");
    println!("    --atlas-url <url>          Provenance URL stored as download_link");
    println!("    --out-dir <dir>            Output directory (default: .)");
    println!("    --no-mmap                  Read volumes without memory mapping");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only show errors");
    println!("    -V, --version    Show version and build date");
    println!();
    println!("    {} overrides the verbosity flags (e.g. {}=cifti=debug)", LOG_ENV, LOG_ENV);
    println!();
    println!("EXAMPLES:");
    println!("    cifti-cli generate run.json");
    println!("    cifti-cli generate --bold bold.nii.gz --gifti lh.func.gii rh.func.gii --tr 2 \\");
    println!("        --subjects-dir /opt/subjects --templates-dir /opt/templates");
    println!("    cifti-cli info sub-01_bold.dtseries.nii");
}

/// Value following a flag.
fn flag_value<'a>(args: &[&'a str], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i).copied().with_context(|| format!("{} needs a value", flag))
}

fn cmd_generate(args: &[&str]) -> Result<()> {
    let mut config = match args.first() {
        Some(path) if !path.starts_with("--") => {
            info!("Loading config: {}", path);
            GenerateConfig::load(path).with_context(|| format!("loading {}", path))?
        }
        _ => GenerateConfig::default(),
    };
    if config.subjects_dir.as_os_str().is_empty() {
        if let Some(dir) = env::var_os("SUBJECTS_DIR") {
            config.subjects_dir = PathBuf::from(dir);
        }
    }

    let start = usize::from(args.first().is_some_and(|a| !a.starts_with("--")));
    let mut i = start;
    while i < args.len() {
        let flag = args[i];
        match flag {
            "--bold" => config.bold_file = flag_value(args, &mut i, flag)?.into(),
            "--gifti" => {
                let left = flag_value(args, &mut i, flag)?;
                let right = flag_value(args, &mut i, flag)?;
                config.gifti_files = vec![left.into(), right.into()];
            }
            "--tr" => {
                let value = flag_value(args, &mut i, flag)?;
                config.repetition_time = value.parse().with_context(|| format!("bad --tr '{}'", value))?;
            }
            "--surface-target" => config.surface_target = flag_value(args, &mut i, flag)?.to_string(),
            "--volume-target" => config.volume_target = flag_value(args, &mut i, flag)?.to_string(),
            "--subjects-dir" => config.subjects_dir = flag_value(args, &mut i, flag)?.into(),
            "--templates-dir" => config.templates_dir = flag_value(args, &mut i, flag)?.into(),
            "--label-file" => config.label_file = Some(flag_value(args, &mut i, flag)?.into()),
            "--atlas-url" => config.atlas_url = Some(flag_value(args, &mut i, flag)?.to_string()),
            "--out-dir" => config.out_dir = flag_value(args, &mut i, flag)?.into(),
            "--no-mmap" => config.use_mmap = false,
            other => bail!("unknown generate flag '{}'", other),
        }
        i += 1;
    }
    debug!("Config: {:?}", config);

    let output = GenerateCifti::new(config).run().context("generating dense series")?;
    println!("{}", output.path.display());
    info!("{} frames x {} columns ({})", output.frames, output.columns, output.base_name);
    Ok(())
}

fn cmd_info(path: &Path) -> Result<()> {
    let dense = read_dense_series(path).with_context(|| format!("reading {}", path.display()))?;
    let header = &dense.header;

    println!("File: {}", path.display());
    println!(
        "Series: {} frames, start {} step {} {} (exponent {})",
        header.series.num_points, header.series.start, header.series.step, header.series.unit, header.series.exponent
    );
    println!("Columns: {}", header.num_columns());
    println!();

    println!("Brain models:");
    for model in &header.brain_models {
        let detail = match &model.indices {
            ModelIndices::Surface { total_vertices, .. } => format!("of {} vertices", total_vertices),
            ModelIndices::Volume { .. } => "voxels".to_string(),
        };
        println!(
            "  {:<45} offset {:>7}  count {:>7}  {}",
            model.structure, model.index_offset, model.index_count, detail
        );
    }

    if let Some(volume) = &header.volume {
        println!();
        println!(
            "Volume: {}x{}x{} (meter exponent {})",
            volume.dims[0], volume.dims[1], volume.dims[2], volume.meter_exponent
        );
    }

    if !header.metadata.is_empty() {
        println!();
        println!("Metadata:");
        for (key, value) in header.metadata.iter() {
            println!("  {} = {}", key, value);
        }
    }
    Ok(())
}

fn cmd_models() {
    for (i, spec) in registry::structures().iter().enumerate() {
        let kind = match spec.kind {
            StructureKind::Surface { hemisphere } => format!("surface ({})", hemisphere.prefix()),
            StructureKind::Volume { label_codes } => format!("volume {:?}", label_codes),
        };
        println!("{:>2}  {:<45} {}", i, spec.name, kind);
    }
}
