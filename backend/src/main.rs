//! Estate seed CLI - seed the estate store and reconcile reference files
//!
//! # Main Commands
//!
//! ```bash
//! estate-seed seed                          # Seed every tier from the built-in catalog
//! estate-seed seed --catalog c.json --seed 42 --stages category,property
//! estate-seed reconcile wards.csv --column 2  # Check parent codes against provinces
//! estate-seed serve                         # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! estate-seed parse wards.csv               # Parse a reference file to JSON rows
//! estate-seed catalog                       # Print the built-in catalog
//! estate-seed validate catalog.json         # Validate a catalog file
//! ```
//!
//! The store is read from `SEED_STORE_URL` / `SEED_STORE_KEY` (a `.env` file
//! is loaded if present). `--dry-run` uses an in-memory store instead.

use clap::{Parser, Subcommand, ValueEnum};
use estate_seed::{
    default_catalog, parse_file_auto, reconcile_with_store, run_seed, CatalogError, FloorConflictPolicy,
    MemoryStore, ReconcileOptions, RestStore, SeedCatalog, SeedError, SeedOptions, StageKind, Store,
    StoreError,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "estate-seed")]
#[command(about = "Seed the estate admin store and reconcile reference files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FloorConflictArg {
    /// Update floors in place on (building_id, floor_number)
    Upsert,
    /// Plain insert; duplicates are left to the store
    Insert,
}

impl From<FloorConflictArg> for FloorConflictPolicy {
    fn from(arg: FloorConflictArg) -> Self {
        match arg {
            FloorConflictArg::Upsert => FloorConflictPolicy::Upsert,
            FloorConflictArg::Insert => FloorConflictPolicy::Insert,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the seed pipeline
    Seed {
        /// Catalog JSON file (default: built-in catalog)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Random seed for reproducible floors and units
        #[arg(long)]
        seed: Option<u64>,

        /// Floor write mode
        #[arg(long, value_enum, default_value = "upsert")]
        floor_conflict: FloorConflictArg,

        /// Comma-separated subset of stages (e.g. category,property)
        #[arg(long, value_delimiter = ',', value_parser = parse_stage)]
        stages: Vec<StageKind>,

        /// Seed an in-memory store instead of the configured one
        #[arg(long)]
        dry_run: bool,

        /// Stop starting new stages after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Output file for the JSON report (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reconcile a reference file against canonical codes in the store
    Reconcile {
        /// Reference file (CSV, any common encoding)
        input: PathBuf,

        /// Zero-based index of the parent-code column
        #[arg(short, long)]
        column: usize,

        /// Table holding the canonical codes
        #[arg(long, default_value = "provinces")]
        table: String,

        /// Code column of the canonical table
        #[arg(long, default_value = "code")]
        code_column: String,

        /// Number of sample rows in the report
        #[arg(long, default_value = "5")]
        sample: usize,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a reference file and output its rows as JSON
    Parse {
        /// Input file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the built-in seed catalog
    Catalog {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a catalog JSON file
    Validate {
        /// Catalog JSON file
        input: PathBuf,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Serve against an in-memory store
        #[arg(long)]
        dry_run: bool,
    },
}

fn parse_stage(value: &str) -> Result<StageKind, String> {
    StageKind::from_name(value.trim()).ok_or_else(|| {
        let known: Vec<&str> = StageKind::ALL.iter().map(|s| s.name()).collect();
        format!("unknown stage '{}' (expected one of: {})", value, known.join(", "))
    })
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Seed {
            catalog,
            seed,
            floor_conflict,
            stages,
            dry_run,
            timeout_secs,
            output,
        } => {
            let options = SeedOptions {
                rng_seed: seed,
                floor_conflict: floor_conflict.into(),
                stages: (!stages.is_empty()).then_some(stages),
                timeout_secs,
                ..SeedOptions::default()
            };
            cmd_seed(catalog.as_deref(), options, dry_run, output.as_deref()).await
        }

        Commands::Reconcile {
            input,
            column,
            table,
            code_column,
            sample,
            output,
        } => {
            let options = ReconcileOptions {
                column,
                canonical_table: table,
                canonical_column: code_column,
                sample_size: sample,
            };
            cmd_reconcile(&input, &options, output.as_deref()).await
        }

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Catalog { output } => cmd_catalog(output.as_deref()),

        Commands::Validate { input } => cmd_validate(&input),

        Commands::Serve { port, dry_run } => cmd_serve(port, dry_run).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn open_store(dry_run: bool) -> Result<Arc<dyn Store>, StoreError> {
    if dry_run {
        eprintln!("🧪 Dry run: using an in-memory store");
        return Ok(Arc::new(MemoryStore::with_estate_constraints()));
    }
    Ok(Arc::new(RestStore::from_env()?))
}

async fn cmd_seed(
    catalog_path: Option<&Path>,
    options: SeedOptions,
    dry_run: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = match catalog_path {
        Some(path) => {
            eprintln!("📋 Catalog: {}", path.display());
            SeedCatalog::load(path)?
        }
        None => default_catalog(),
    };
    eprintln!(
        "   {} categories, {} properties, {} zones, {} buildings",
        catalog.categories.len(),
        catalog.properties.len(),
        catalog.zones.len(),
        catalog.buildings.len()
    );

    let store = open_store(dry_run).map_err(SeedError::Precondition)?;

    // Ctrl-C stops the run between stages.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⏹️  Interrupted: finishing current stage");
            on_signal.cancel();
        }
    });

    let report = run_seed(store.as_ref(), &catalog, &options, &cancel).await?;

    let json = serde_json::to_string_pretty(&report)?;
    write_output(&json, output)?;

    eprintln!("\n📊 {} ({} ms)", report.summary, report.duration_ms);
    if !report.overall_success {
        for stage in report.stages.iter().filter(|s| !s.success) {
            eprintln!("   ❌ {}: {}", stage.name, stage.error.as_deref().unwrap_or("failed"));
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn cmd_reconcile(
    input: &Path,
    options: &ReconcileOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Reconciling: {}", input.display());

    let bytes = fs::read(input)?;
    let store = open_store(false)?;
    let report = reconcile_with_store(store.as_ref(), &bytes, options).await?;

    eprintln!("   Data rows: {}", report.total_data_rows);
    eprintln!("   Parent codes: {}", report.unique_parent_codes.len());
    eprintln!("   Canonical codes: {}", report.canonical_codes.len());
    eprintln!("   Matching: {}", report.matching_codes.len());
    if !report.is_fully_matched() {
        eprintln!("   ⚠️  Unmatched: {}", report.unmatched_codes.join(", "));
    }

    let json = serde_json::to_string_pretty(&report)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let parsed = parse_file_auto(input)?;
    eprintln!("   Encoding: {}", parsed.encoding);
    if let Some(header) = parsed.header() {
        eprintln!("   Columns: {}", header.join(", "));
    }
    eprintln!("✅ Parsed {} data rows", parsed.data_row_count());

    let json = serde_json::to_string_pretty(&parsed.rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_catalog(output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let json = default_catalog().to_json()?;
    write_output(&json, output)
}

fn cmd_validate(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());

    match SeedCatalog::load(input) {
        Ok(catalog) => {
            eprintln!(
                "✅ Valid catalog: {} categories, {} properties, {} zones, {} buildings",
                catalog.categories.len(),
                catalog.properties.len(),
                catalog.zones.len(),
                catalog.buildings.len()
            );
            Ok(())
        }
        Err(CatalogError::Invalid(errors)) => {
            eprintln!("\n❌ {} schema error(s):", errors.len());
            for err in errors.iter().take(10) {
                eprintln!("   - {}", err);
            }
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn cmd_serve(port: u16, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = match open_store(dry_run) {
        Ok(store) => store,
        Err(e) => {
            // Seed requests will report the precondition failure.
            eprintln!("⚠️  {}", e);
            Arc::new(MemoryStore::unavailable())
        }
    };
    estate_seed::server::start_server(port, store).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
