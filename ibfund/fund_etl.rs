// fund_etl.rs
// Batch driver: flatten downloaded fundamental report XML into columnar
// files, then load those into a SQLite database.
//
// Use it like this:
//   fund_etl process --fundamentals-dir ./fundamentals --export-dir ./export
//   fund_etl load --export-dir ./export --db ./fundamentals.db
//   fund_etl run

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use ibfund::pipeline::process_all;
use ibfund::store::load_export_dir;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  #[clap(subcommand)]
  command: Command,
}

#[derive(Parser, Debug)]
enum Command {
  /// Flatten every fundamentals XML file into columnar export files.
  Process(ProcessArgs),
  /// Load the exported columnar files into the SQLite database.
  Load(LoadArgs),
  /// Process, then load.
  Run(RunArgs),
}

#[derive(Parser, Debug)]
struct ProcessArgs {
  /// Directory holding one subdirectory per company.
  #[arg(long, default_value = "fundamentals")]
  fundamentals_dir: PathBuf,
  /// Output directory for columnar files.
  #[arg(long, default_value = "export")]
  export_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct LoadArgs {
  /// Directory holding the exported columnar files.
  #[arg(long, default_value = "export")]
  export_dir: PathBuf,
  /// SQLite database path. Falls back to the FUNDAMENTALS_DB environment
  /// variable, then to fundamentals.db.
  #[arg(long)]
  db: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RunArgs {
  #[arg(long, default_value = "fundamentals")]
  fundamentals_dir: PathBuf,
  #[arg(long, default_value = "export")]
  export_dir: PathBuf,
  #[arg(long)]
  db: Option<PathBuf>,
}

fn resolve_db_path(cli: Option<PathBuf>) -> PathBuf {
  cli
    .or_else(|| std::env::var_os("FUNDAMENTALS_DB").map(PathBuf::from))
    .unwrap_or_else(|| PathBuf::from("fundamentals.db"))
}

fn main() -> Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
  let args = Args::parse();

  match args.command {
    Command::Process(p) => {
      process_all(&p.fundamentals_dir, &p.export_dir)
        .context("Processing fundamentals failed")?;
    }
    Command::Load(l) => {
      let db = resolve_db_path(l.db);
      let loaded = load_export_dir(&l.export_dir, &db)
        .context("Loading export files failed")?;
      info!("Loaded {} table(s) into {:?}", loaded, db);
    }
    Command::Run(r) => {
      process_all(&r.fundamentals_dir, &r.export_dir)
        .context("Processing fundamentals failed")?;
      let db = resolve_db_path(r.db);
      let loaded = load_export_dir(&r.export_dir, &db)
        .context("Loading export files failed")?;
      info!("Loaded {} table(s) into {:?}", loaded, db);
    }
  }
  Ok(())
}
