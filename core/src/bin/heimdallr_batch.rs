use clap::Parser;
use heimdallr_core::volume::MASK_EXTENSION;
use heimdallr_core::{save_results, CaseDirectory, CaseMetadata, EngineConfig, MetricsEngine};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process;

/// Recompute metrics for every processed case folder
#[derive(Parser, Debug)]
#[command(name = "heimdallr-batch")]
#[command(about = "Recompute resultados.json for every case in an output directory")]
#[command(version)]
struct Cli {
    /// Directory holding one folder per processed case
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Directory holding the archived intensity volumes
    #[arg(value_name = "NIFTI_DIR")]
    nifti_dir: PathBuf,

    /// Skip overlay rendering
    #[arg(long)]
    no_overlays: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    for dir in [&cli.output_dir, &cli.nifti_dir] {
        if !dir.is_dir() {
            eprintln!("Error: {} is not a directory", dir.display());
            process::exit(1);
        }
    }

    let cases = match collect_case_dirs(&cli.output_dir) {
        Ok(cases) => cases,
        Err(e) => {
            error!("Failed to read directory: {}", e);
            eprintln!("Error: Failed to read directory: {}", e);
            process::exit(1);
        }
    };
    if cases.is_empty() {
        eprintln!("Error: No case folders found in {}", cli.output_dir.display());
        process::exit(1);
    }
    info!("Starting batch processing for {} cases", cases.len());

    let engine = MetricsEngine::new(EngineConfig::new().with_render_overlays(!cli.no_overlays));
    let mut succeeded = 0usize;

    for (idx, case_path) in cases.iter().enumerate() {
        let case = CaseDirectory::new(case_path);
        let case_id = case.case_id();
        info!("[{}/{}] Processing {}", idx + 1, cases.len(), case_id);

        match process_case(&engine, &case, &cli.nifti_dir) {
            Ok(()) => succeeded += 1,
            Err(e) => error!("Failed to process {}: {}", case_id, e),
        }
    }

    info!(
        "Batch processing complete: {}/{} cases succeeded",
        succeeded,
        cases.len()
    );
    if succeeded == 0 {
        process::exit(1);
    }
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

fn process_case(
    engine: &MetricsEngine,
    case: &CaseDirectory,
    nifti_dir: &Path,
) -> heimdallr_core::Result<()> {
    let case_id = case.case_id();
    let metadata = CaseMetadata::from_sidecar(case.sidecar_path())?;
    let volume_path = locate_volume(nifti_dir, &case_id, &metadata)?.ok_or_else(|| {
        heimdallr_core::HeimdallrError::InvalidValue(format!("no NIfTI found for {}", case_id))
    })?;

    let result = engine.calculate_case_with(&case_id, &metadata, case, &volume_path)?;
    save_results(&result, case.results_path())?;
    Ok(())
}

/// Case folders sorted by name
fn collect_case_dirs(output_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(output_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Finds the archived volume for a case
///
/// Tries `<case_id>.nii.gz`, then `<ClinicalName>.nii.gz`, then the first
/// archive file (by name) whose name contains the case id.
fn locate_volume(
    nifti_dir: &Path,
    case_id: &str,
    metadata: &CaseMetadata,
) -> std::io::Result<Option<PathBuf>> {
    let direct = nifti_dir.join(format!("{}{}", case_id, MASK_EXTENSION));
    if direct.is_file() {
        return Ok(Some(direct));
    }

    if let Some(name) = &metadata.clinical_name {
        let by_name = nifti_dir.join(format!("{}{}", name, MASK_EXTENSION));
        if by_name.is_file() {
            return Ok(Some(by_name));
        }
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(nifti_dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(MASK_EXTENSION) && n.contains(case_id))
            .unwrap_or(false);
        if matches && path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();
    if candidates.len() > 1 {
        warn!(
            "{} archive files match {}, using {}",
            candidates.len(),
            case_id,
            candidates[0].display()
        );
    }
    Ok(candidates.into_iter().next())
}
