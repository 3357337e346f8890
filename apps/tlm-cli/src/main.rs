use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tlm_components::{Configurator, ParamKind};
use tlm_core::MessageHandler;
use tlm_model::{ModelResult, build_system, load_model};
use tlm_sim::{Engine, SimOutcome};
use tracing::Level;

#[derive(Parser)]
#[command(name = "tlm-cli")]
#[command(about = "TLM system simulation tool", long_about = None)]
struct Cli {
    /// Log scheduler details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a model file
    Run {
        /// Path to the model file (.yaml, .yml or .json)
        model_path: PathBuf,
        /// Start time in seconds, overrides the model options
        #[arg(long)]
        start_time: Option<f64>,
        /// Stop time in seconds, overrides the model options
        #[arg(long)]
        stop_time: Option<f64>,
        /// Timestep in seconds, overrides the model options
        #[arg(long)]
        timestep: Option<f64>,
        /// Worker threads for the C and Q tiers
        #[arg(long)]
        threads: Option<usize>,
        /// Number of log samples, overrides the model options
        #[arg(long)]
        samples: Option<usize>,
        /// Write the logged node data to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Run the pre-simulation model checks only
    Check {
        /// Path to the model file (.yaml, .yml or .json)
        model_path: PathBuf,
    },
    /// List the registered component types
    Components,
}

struct RunArgs {
    start_time: Option<f64>,
    stop_time: Option<f64>,
    timestep: Option<f64>,
    threads: Option<usize>,
    samples: Option<usize>,
    csv: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let engine = Engine::new();
    let result = match cli.command {
        Commands::Run {
            model_path,
            start_time,
            stop_time,
            timestep,
            threads,
            samples,
            csv,
        } => cmd_run(
            &engine,
            &model_path,
            RunArgs {
                start_time,
                stop_time,
                timestep,
                threads,
                samples,
                csv,
            },
        ),
        Commands::Check { model_path } => cmd_check(&engine, &model_path),
        Commands::Components => {
            cmd_components(&engine);
            Ok(ExitCode::SUCCESS)
        }
    };
    print_messages(engine.messages());

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_run(engine: &Engine, model_path: &Path, args: RunArgs) -> ModelResult<ExitCode> {
    let model = load_model(model_path)?;
    let mut options = model.options.clone();
    if let Some(t) = args.start_time {
        options.start_time = t;
    }
    if let Some(t) = args.stop_time {
        options.stop_time = t;
    }
    if let Some(ts) = args.timestep {
        options.timestep = ts;
    }
    if let Some(n) = args.threads {
        options.threads = Some(n);
    }
    if let Some(n) = args.samples {
        options.num_log_samples = n;
    }
    options.validate()?;

    println!("Simulating model: {}", model.name);
    println!(
        "  t = {} .. {} s, timestep = {} s, steps = {}",
        options.start_time,
        options.stop_time,
        options.timestep,
        options.num_steps()
    );

    let mut system = build_system(engine, &model)?;
    let measured = system.run(&options)?;
    let code = match measured.outcome {
        SimOutcome::Finished => {
            println!(
                "✓ Simulation finished in {:.1} ms",
                measured.elapsed.as_secs_f64() * 1e3
            );
            ExitCode::SUCCESS
        }
        SimOutcome::Stopped { at } => {
            println!("✗ Simulation stopped at t = {at} s");
            ExitCode::from(2)
        }
    };

    let log = system.log_data();
    println!("  Log samples: {}", log.num_samples());
    println!("  Nodes: {}", log.nodes().len());

    if let Some(path) = args.csv {
        let file = std::fs::File::create(&path)?;
        log.write_csv(std::io::BufWriter::new(file))?;
        println!("✓ Wrote {} samples to {}", log.num_samples(), path.display());
    }
    Ok(code)
}

fn cmd_check(engine: &Engine, model_path: &Path) -> ModelResult<ExitCode> {
    println!("Checking model: {}", model_path.display());
    let model = load_model(model_path)?;
    let system = build_system(engine, &model)?;
    let problems = system.check_model_before_simulation();
    if problems.is_empty() {
        println!("✓ Model is ready to simulate ({} components)", system.num_components());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("✗ {} problem(s):", problems.len());
        for p in &problems {
            println!("  {p}");
        }
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_components(engine: &Engine) {
    let factory = engine.factory();
    println!("Registered component types:");
    for key in factory.keys() {
        let Some(mut comp) = factory.create(key) else {
            continue;
        };
        let mut cfg = Configurator::new();
        comp.configure(&mut cfg);
        let ports: Vec<&str> = cfg.ports().iter().map(|p| p.name.as_str()).collect();
        let params: Vec<&str> = cfg
            .params()
            .iter()
            .filter(|p| matches!(p.kind, ParamKind::Constant | ParamKind::Text))
            .map(|p| p.name.as_str())
            .collect();
        println!("  {key} [{}]", comp.cqs_type());
        println!("    ports: {}", ports.join(", "));
        if !params.is_empty() {
            println!("    parameters: {}", params.join(", "));
        }
    }
}

fn print_messages(messages: &MessageHandler) {
    for m in messages.drain() {
        eprintln!("{}", m.text);
    }
}
