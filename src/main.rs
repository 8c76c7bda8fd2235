use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use todo_today::StartScreen;
use todo_today::core::config::{self, CliOverrides};
use todo_today::store::JsonStore;
use todo_today::tui;

#[derive(Parser)]
#[command(name = "todo-today", about = "Task lists in the terminal")]
struct Args {
    /// JSON file holding lists and tasks
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// Screen shown at startup, and where Back lands with no history
    #[arg(long, value_enum)]
    home: Option<StartScreen>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    let file_config = config::load_config().map_err(|e| {
        eprintln!("todo-today: {}", e);
        std::io::Error::other(e)
    })?;
    let resolved = config::resolve(
        &file_config,
        &CliOverrides {
            data_file: args.data_file,
            debug: args.debug,
            home: args.home,
        },
    );

    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let level = if resolved.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Some(parent) = resolved.log_file.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Ok(log_file) = File::create(&resolved.log_file) {
        let _ = WriteLogger::init(level, log_config, log_file);
    }

    log::info!(
        "Todo Today starting up (data: {}, home: {:?})",
        resolved.data_file.display(),
        resolved.home
    );

    let store = JsonStore::open(&resolved.data_file).map_err(|e| {
        log::error!("Failed to open {}: {}", resolved.data_file.display(), e);
        eprintln!("todo-today: {}: {}", resolved.data_file.display(), e);
        std::io::Error::other(e)
    })?;

    tui::run(resolved, Arc::new(store))
}
