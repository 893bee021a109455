use clap::Parser;
use heimdallr_core::cli::{Cli, OutputFormat};
use heimdallr_core::{
    save_results, CaseDirectory, CaseMetadata, EngineConfig, MetricsEngine, MetricsResult,
    TextReport,
};
use log::{error, info};
use std::process;

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    if !cli.case_dir.is_dir() {
        eprintln!("Error: {} is not a directory", cli.case_dir.display());
        process::exit(1);
    }
    if !cli.volume.is_file() {
        eprintln!("Error: volume {} not found", cli.volume.display());
        process::exit(1);
    }

    let case = CaseDirectory::new(&cli.case_dir);
    let case_id = cli.case_id.clone().unwrap_or_else(|| case.case_id());

    let metadata = match load_metadata(&cli, &case) {
        Ok(metadata) => metadata,
        Err(e) => {
            error!("Failed to read case metadata: {}", e);
            eprintln!("Error: Failed to read case metadata: {}", e);
            process::exit(1);
        }
    };
    info!(
        "Processing case {} ({}, kVp {})",
        case_id, metadata.modality, metadata.kvp
    );

    let mut config = EngineConfig::new().with_render_overlays(!cli.no_overlays);
    if let Some(dir) = &cli.overlay_dir {
        config = config.with_overlay_dir(dir);
    }
    let engine = MetricsEngine::new(config);

    let result = match engine.calculate_case_with(&case_id, &metadata, &case, &cli.volume) {
        Ok(result) => result,
        Err(e) => {
            error!("Metrics calculation failed: {}", e);
            eprintln!("Error: Metrics calculation failed: {}", e);
            process::exit(1);
        }
    };

    if let Some(path) = &cli.output {
        if let Err(e) = save_results(&result, path) {
            eprintln!("Error: Failed to write {}: {}", path.display(), e);
            process::exit(1);
        }
        info!("Wrote {}", path.display());
    }

    output_result(&result, cli.format);
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

/// DICOM header when given, otherwise the case sidecar
fn load_metadata(cli: &Cli, case: &CaseDirectory) -> heimdallr_core::Result<CaseMetadata> {
    match &cli.dicom {
        Some(path) => CaseMetadata::from_dicom_file(path),
        None => CaseMetadata::from_sidecar(case.sidecar_path()),
    }
}

fn output_result(result: &MetricsResult, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("{}", TextReport::new(result));
        }
        OutputFormat::Json => match result.to_json_pretty() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize to JSON: {}", e);
                eprintln!("Error: Failed to serialize to JSON: {}", e);
                process::exit(1);
            }
        },
    }
}
