use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use card_scan::batch::process_batch;
use card_scan::ocr::ensure_tesseract;
use card_scan::{log, paths, CardExtractor, CardRecord, ExtractorConfig};

#[derive(Parser, Debug)]
#[command(name = "card-scan")]
#[command(version, about = "Extract name, type, attribute and ATK/DEF from card photos", long_about = None)]
struct Cli {
    /// Config file (default: config.json next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of attribute reference icons
    #[arg(long, global = true)]
    templates: Option<PathBuf>,

    /// Path to the tesseract executable
    #[arg(long, global = true)]
    tesseract: Option<PathBuf>,

    /// Tesseract language data directory
    #[arg(long, global = true)]
    tessdata: Option<PathBuf>,

    /// Save the raw zone crops of every card here
    #[arg(long, global = true)]
    debug_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract card records and print them as JSON
    Scan {
        /// Card image files
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Number of worker threads (default: available cores)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Also append every record to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Locate Tesseract and download missing language data
    Setup,

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        log(&format!("[PANIC]{} {}", location, msg));
    }));

    let cli = Cli::parse();

    paths::ensure_directories()?;
    card_scan::init_log_file(paths::get_logs_dir().join("card-scan.log"));

    let config_path = cli.config.clone().unwrap_or_else(paths::get_config_path);

    match &cli.command {
        Commands::Scan {
            images,
            jobs,
            csv,
            pretty,
        } => {
            let config = load_config(&cli, &config_path);
            scan(config, images, *jobs, csv.clone(), *pretty)
        }
        Commands::Setup => {
            let config = load_config(&cli, &config_path);
            let found = ensure_tesseract(&config.ocr)?;
            println!("tesseract: {}", found.executable.display());
            println!("tessdata:  {}", found.tessdata.display());
            Ok(())
        }
        Commands::InitConfig { force } => {
            if config_path.exists() && !force {
                return Err(anyhow!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                ));
            }
            ExtractorConfig::save_default(&config_path)
                .with_context(|| format!("Failed to write {}", config_path.display()))?;
            log(&format!("Default config written to {}", config_path.display()));
            Ok(())
        }
    }
}

/// Loads the config file and applies the command line overrides.
fn load_config(cli: &Cli, config_path: &std::path::Path) -> ExtractorConfig {
    let mut config = ExtractorConfig::load(config_path);

    if let Some(dir) = &cli.templates {
        config.template_dir = dir.clone();
    }
    config.template_dir = paths::resolve_asset_path(&config.template_dir);

    if let Some(exe) = &cli.tesseract {
        config.ocr.tesseract_path = Some(exe.clone());
    }
    if let Some(dir) = &cli.tessdata {
        config.ocr.tessdata_dir = Some(dir.clone());
    }
    if let Some(dir) = &cli.debug_dir {
        config.debug_dir = Some(dir.clone());
    }
    config
}

fn scan(
    config: ExtractorConfig,
    images: &[PathBuf],
    jobs: Option<usize>,
    csv: Option<PathBuf>,
    pretty: bool,
) -> Result<()> {
    let jobs = jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    let extractor = Arc::new(CardExtractor::from_config(config)?);
    let outcomes = process_batch(extractor, images, jobs, csv.as_deref())?;

    let mut records: Vec<CardRecord> = Vec::with_capacity(outcomes.len());
    let mut failed = 0;
    for outcome in outcomes {
        match outcome.result {
            Ok(record) => records.push(record),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {:#}", outcome.item.path.display(), e);
            }
        }
    }

    let json = match (records.as_slice(), pretty) {
        ([single], true) if images.len() == 1 => serde_json::to_string_pretty(single)?,
        ([single], false) if images.len() == 1 => serde_json::to_string(single)?,
        (_, true) => serde_json::to_string_pretty(&records)?,
        (_, false) => serde_json::to_string(&records)?,
    };
    if !records.is_empty() || images.len() > 1 {
        println!("{}", json);
    }

    if failed > 0 {
        return Err(anyhow!("{} of {} cards failed", failed, images.len()));
    }
    Ok(())
}
