//! Views display CLI
//!
//! Entry point for the `views-display` command-line tool.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use views_display::{Engine, EngineSettings, StoredView, View};
use views_registry::builtin::GenericHandlerDescriptor;
use views_registry::{HandlerCategory, InMemoryHandlerCatalog, InMemoryPluginCatalog};

#[derive(Parser)]
#[command(name = "views-display")]
#[command(about = "Inspect option inheritance of views displays", version)]
struct Cli {
    /// Engine settings file (TOML)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective options of a display
    Inspect {
        /// Stored view (JSON)
        view: PathBuf,

        /// Display id
        #[arg(long, short = 'd')]
        display: String,

        /// Print a single option instead of all of them
        #[arg(long, short = 'o')]
        option: Option<String>,
    },

    /// Validate every display of a view
    Validate {
        /// Stored view (JSON)
        view: PathBuf,
    },

    /// Print the export items of a display
    Export {
        /// Stored view (JSON)
        view: PathBuf,

        /// Display id
        #[arg(long, short = 'd')]
        display: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match EngineSettings::build(cli.settings.as_deref(), None) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Inspect { view, display, option } => {
            run_inspect(settings, &view, &display, option.as_deref());
        }
        Commands::Validate { view } => {
            run_validate(settings, &view);
        }
        Commands::Export { view, display } => {
            run_export(settings, &view, &display);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Handler catalog trusting every column the stored view names.
///
/// The CLI has no data dictionary, so each (table, field, type) used by a
/// handler spec gets a generic handler.
fn handler_catalog_for(stored: &StoredView) -> InMemoryHandlerCatalog {
    let mut catalog = InMemoryHandlerCatalog::with_builtins();
    for display in &stored.display {
        for category in HandlerCategory::ALL {
            let Some(Value::Object(specs)) = display.display_options.get(category.plural()) else {
                continue;
            };
            for spec in specs.values() {
                let table = spec.get("table").and_then(Value::as_str).unwrap_or_default();
                let field = spec.get("field").and_then(Value::as_str).unwrap_or_default();
                catalog.register(
                    table,
                    field,
                    category.handler_type(),
                    Arc::new(GenericHandlerDescriptor::new(category.handler_type(), category)),
                );
            }
        }
    }
    catalog
}

fn load_view(settings: EngineSettings, path: &Path) -> Result<View, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let stored = StoredView::from_json(&text).map_err(|e| e.to_string())?;
    let engine = Engine::new(
        settings,
        Arc::new(InMemoryPluginCatalog::with_builtins()),
        Arc::new(handler_catalog_for(&stored)),
    );
    engine.load_view(&stored).map_err(|e| e.to_string())
}

fn load_or_exit(settings: EngineSettings, path: &Path) -> View {
    match load_view(settings, path) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error loading view: {}", e);
            process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn run_inspect(settings: EngineSettings, path: &Path, display_id: &str, option: Option<&str>) {
    let view = load_or_exit(settings, path);
    let Some(display) = view.display(display_id) else {
        eprintln!("No display '{}' in view '{}'", display_id, view.name());
        process::exit(1);
    };

    match option {
        Some(key) => match display.get_option(key) {
            Some(value) => print_json(value),
            None => {
                eprintln!("Display '{}' has no option '{}'", display_id, key);
                process::exit(1);
            }
        },
        None => print_json(&display.effective_options()),
    }
}

fn run_validate(settings: EngineSettings, path: &Path) {
    let view = load_or_exit(settings, path);

    let mut failed = false;
    for display in view.displays() {
        let errors = display.validate();
        if errors.is_empty() {
            println!("{}: ok", display.id());
            continue;
        }
        failed = true;
        println!("{}:", display.id());
        for error in errors {
            println!("  - {}", error);
        }
    }

    if failed {
        process::exit(1);
    }
}

fn run_export(settings: EngineSettings, path: &Path, display_id: &str) {
    let view = load_or_exit(settings, path);
    let Some(display) = view.display(display_id) else {
        eprintln!("No display '{}' in view '{}'", display_id, view.name());
        process::exit(1);
    };
    print_json(&display.export_options());
}
