//! Sunstone command-line interface.
//!
//! Drive the registry, compiler and backends from TOML project files:
//! ```sh
//! sunstone-cli backends
//! sunstone-cli describe meep
//! sunstone-cli validate project.toml
//! sunstone-cli preview project.toml
//! sunstone-cli run project.toml -o out/
//! ```

mod config;
mod runner;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sunstone_compute::builtin_registry;
use sunstone_core::preview::to_preview_text;
use sunstone_core::{CoreError, Dispatcher};

#[derive(Parser)]
#[command(name = "sunstone-cli")]
#[command(about = "Sunstone: waveform synthesis and simulation backend dispatch")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered backends.
    Backends,
    /// Print a backend's capability descriptor as JSON.
    Describe {
        /// Backend name.
        name: String,
    },
    /// Compile a project without running it.
    Validate {
        /// Path to the project file.
        config: PathBuf,
    },
    /// Print the compiled spec as preview text.
    Preview {
        /// Path to the project file.
        config: PathBuf,
    },
    /// Sample waveforms and write them to CSV.
    Synthesize {
        /// Path to the project file.
        config: PathBuf,
        /// Only this waveform id.
        #[arg(long)]
        waveform: Option<String>,
        /// Samples per waveform.
        #[arg(long, default_value_t = 1024)]
        samples: usize,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the backend-native translation of a project.
    Translate {
        /// Path to the project file.
        config: PathBuf,
    },
    /// Compile a project and run it on its backend.
    Run {
        /// Path to the project file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Give up waiting for the backend after this many seconds.
        #[arg(long)]
        timeout: Option<f64>,
        /// Python interpreter for the Meep backend (overrides config file setting).
        #[arg(long)]
        python: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backends => {
            let registry = builtin_registry(None)?;
            println!("Available backends:");
            println!();
            for summary in registry.list() {
                println!("  {:<12} {}", summary.name, summary.label);
            }
            Ok(())
        }
        Commands::Describe { name } => {
            let registry = builtin_registry(None)?;
            let descriptor = registry.describe(&name)?;
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let registry = builtin_registry(job.simulation.python.clone())?;
            let (project, spec) = runner::compile_job(&registry, &job)?;
            println!(
                "Project is valid for '{}': {} waveform(s), {} source(s)",
                spec.backend(),
                project.waveforms().len(),
                spec.sources().len()
            );
            Ok(())
        }
        Commands::Preview { config } => {
            let job = config::load_config(&config)?;
            let registry = builtin_registry(job.simulation.python.clone())?;
            let (_, spec) = runner::compile_job(&registry, &job)?;
            println!("{}", to_preview_text(&spec)?);
            Ok(())
        }
        Commands::Synthesize {
            config,
            waveform,
            samples,
            output,
        } => {
            let job = config::load_config(&config)?;
            let project = runner::build_project(&job)?;
            let traces =
                runner::sample_waveforms(&project, waveform.as_deref(), samples, job.simulation.run_time)?;
            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
            runner::write_traces_csv(&traces, &out_dir.join("waveforms.csv"))?;
            Ok(())
        }
        Commands::Translate { config } => {
            let job = config::load_config(&config)?;
            let registry = builtin_registry(job.simulation.python.clone())?;
            let (_, spec) = runner::compile_job(&registry, &job)?;
            match Dispatcher::new(registry).translate(&spec)? {
                Some(text) => println!("{text}"),
                None => bail!("backend '{}' has no native input format", spec.backend()),
            }
            Ok(())
        }
        Commands::Run {
            config,
            output,
            timeout,
            python,
        } => {
            println!("Sunstone");
            println!("========");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let registry = builtin_registry(python.or_else(|| job.simulation.python.clone()))?;
            let (_, spec) = runner::compile_job(&registry, &job)?;
            println!("Backend: {} ({} source(s))", spec.backend(), spec.sources().len());

            let mut dispatcher = Dispatcher::new(Arc::clone(&registry));
            if let Some(secs) = timeout {
                let limit = Duration::try_from_secs_f64(secs)
                    .with_context(|| format!("invalid timeout {secs}"))?;
                dispatcher = dispatcher.with_timeout(limit);
            }

            let handle = match dispatcher.dispatch(&spec) {
                Ok(handle) => handle,
                Err(CoreError::BackendExecution {
                    backend,
                    message,
                    diagnostics: Some(diagnostics),
                }) => {
                    eprintln!("{diagnostics}");
                    bail!("backend '{backend}' failed: {message}");
                }
                Err(e) => return Err(e.into()),
            };

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
            runner::write_outputs(&handle, &job, &out_dir)?;
            for note in &handle.output.notes {
                println!("  {note}");
            }
            println!("Run {} complete in {:.3} s.", handle.run_id, handle.elapsed.as_secs_f64());
            Ok(())
        }
    }
}
