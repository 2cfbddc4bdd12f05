//! installkit - command-line entry point

use std::path::Path;
use std::process::exit;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use installkit::cli::{Cli, Commands};
use installkit::command::{CommandRunner, ShellRunner};
use installkit::plan::InstallPlan;
use installkit::progress::ChargingBar;
use installkit::registry::{native_config_store, ConfigStore, InMemoryConfigStore};
use installkit::sequence::SequenceState;
use installkit::task::TaskContext;

/// Initialize the subscriber; `RUST_LOG` overrides the default `info` level
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logger();
    debug!("installkit starting up");

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Validate { plan } => {
            info!("Validating install plan: {:?}", plan);
            match InstallPlan::load_from_file(&plan).and_then(|p| p.validate().map(|_| p)) {
                Ok(loaded) => {
                    println!(
                        "✓ Install plan is valid: {} ({} steps)",
                        loaded.name.as_deref().unwrap_or("unnamed"),
                        loaded.steps.len()
                    );
                }
                Err(e) => {
                    error!("Install plan validation failed: {:#}", e);
                    eprintln!("✗ Install plan validation failed: {:#}", e);
                    exit(1);
                }
            }
        }
        Commands::Run {
            plan,
            dry_run,
            registry_snapshot,
            no_progress,
        } => match run_plan(&plan, dry_run, registry_snapshot.as_deref(), no_progress) {
            Ok(SequenceState::Cancelled) => println!("✓ Installation cancelled"),
            Ok(_) => println!("✓ Installation completed"),
            Err(e) => {
                error!("{:#}", e);
                eprintln!("✗ {:#}", e);
                exit(1);
            }
        },
    }
}

/// Load, build and execute a plan; returns the terminal sequence state
fn run_plan(
    plan_path: &Path,
    dry_run: bool,
    registry_snapshot: Option<&Path>,
    no_progress: bool,
) -> Result<SequenceState> {
    let plan = InstallPlan::load_from_file(plan_path)?;

    let runner: Arc<dyn CommandRunner> = Arc::new(ShellRunner::new());
    let config_store: Arc<dyn ConfigStore> = match registry_snapshot {
        Some(path) => Arc::new(
            InMemoryConfigStore::load_from_file(path)
                .with_context(|| format!("Failed to load registry snapshot {:?}", path))?,
        ),
        None => native_config_store(Arc::clone(&runner)),
    };
    let ctx = TaskContext::new(runner, config_store);

    let mut sequence = plan.build(&ctx)?.dry_run(dry_run);
    if !no_progress {
        let message = plan.name.clone().unwrap_or_else(|| "Installing".to_string());
        sequence = sequence.with_progress(Box::new(ChargingBar::stderr().with_message(message)));
    }

    let token = sequence.cancel_token();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    info!(
        plan = plan.name.as_deref().unwrap_or("unnamed"),
        steps = sequence.len(),
        "running install plan"
    );
    sequence.execute()?;
    Ok(sequence.state())
}
