//! Somnowave CLI
//!
//! Commands:
//! - run: monitor a live radar link and record epochs to a CSV file
//! - replay: run the pipeline over a recorded byte capture

use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Duration, Local, NaiveDateTime, Timelike};

use somnowave::{
    CsvRecorder, LinearTrustGate, Monitor, RateTrustGate, ReaderTransport, SleepStageClassifier,
    ThresholdSleepModel, VitalsError, SOMNOWAVE_VERSION,
};

/// Somnowave - radar vitals monitor and sleep-stage recorder
#[derive(Parser)]
#[command(name = "somnowave")]
#[command(version = SOMNOWAVE_VERSION)]
#[command(about = "Record breathing, heart rate and sleep stages from a vitals radar", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor a live radar link
    Run {
        /// Serial device node carrying the radar's data stream
        #[arg(short, long, default_value = "/dev/ttyTHS1")]
        device: PathBuf,

        /// Recording path; prompts for a dataset name when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Trust-gate parameter file (JSON); defaults are built in
        #[arg(long)]
        gate_params: Option<PathBuf>,

        /// Sleep-model parameter file (JSON); defaults are built in
        #[arg(long)]
        model_params: Option<PathBuf>,
    },

    /// Run the pipeline over a recorded byte capture
    Replay {
        /// Capture file of raw frames
        #[arg(short, long)]
        input: PathBuf,

        /// Recording path; prompts for a dataset name when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sleep-model parameter file (JSON); defaults are built in
        #[arg(long)]
        model_params: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("somnowave: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), VitalsError> {
    match cli.command {
        Commands::Run {
            device,
            output,
            gate_params,
            model_params,
        } => {
            let recorder = open_recorder(output)?;
            let (breathing_gate, cardiac_gate) = load_gates(gate_params.as_deref())?;
            let model = load_model(model_params.as_deref())?;
            let mut monitor = Monitor::new(recorder, breathing_gate, cardiac_gate, model);

            let file = File::open(&device).map_err(VitalsError::Transport)?;
            let mut transport = ReaderTransport::new(file);
            monitor.run(&mut transport, || Local::now().naive_local())
        }
        Commands::Replay {
            input,
            output,
            model_params,
        } => {
            let recorder = open_recorder(output)?;
            let model = load_model(model_params.as_deref())?;
            let mut monitor = Monitor::new(
                recorder,
                Box::new(LinearTrustGate::breathing_default()),
                Box::new(LinearTrustGate::cardiac_default()),
                model,
            );

            let file = File::open(&input).map_err(VitalsError::Transport)?;
            let mut transport = ReaderTransport::new(file);
            monitor.run(&mut transport, replay_clock())
        }
    }
}

/// Open the recording, prompting for a dataset name when no path was given.
fn open_recorder(output: Option<PathBuf>) -> Result<CsvRecorder, VitalsError> {
    let path = match output {
        Some(path) => path,
        None => {
            print!("Input file name = ");
            io::stdout().flush().map_err(VitalsError::Transport)?;
            let mut name = String::new();
            io::stdin()
                .read_line(&mut name)
                .map_err(VitalsError::Transport)?;
            let name = name.trim();
            fs::create_dir_all("dataset").map_err(VitalsError::Transport)?;
            PathBuf::from(format!("dataset/{name}.csv"))
        }
    };
    CsvRecorder::create(path)
}

fn load_gates(
    path: Option<&std::path::Path>,
) -> Result<(Box<dyn RateTrustGate>, Box<dyn RateTrustGate>), VitalsError> {
    match path {
        None => Ok((
            Box::new(LinearTrustGate::breathing_default()),
            Box::new(LinearTrustGate::cardiac_default()),
        )),
        Some(path) => {
            let json = fs::read_to_string(path).map_err(VitalsError::Transport)?;
            let gate = LinearTrustGate::from_json(&json)?;
            Ok((Box::new(gate.clone()), Box::new(gate)))
        }
    }
}

fn load_model(
    path: Option<&std::path::Path>,
) -> Result<Box<dyn SleepStageClassifier>, VitalsError> {
    match path {
        None => Ok(Box::new(ThresholdSleepModel::default())),
        Some(path) => {
            let json = fs::read_to_string(path).map_err(VitalsError::Transport)?;
            Ok(Box::new(ThresholdSleepModel::from_json(&json)?))
        }
    }
}

/// Synthetic clock for replays: starts at the previous minute boundary and
/// advances one second per frame, so alignment fires immediately.
fn replay_clock() -> impl FnMut() -> NaiveDateTime {
    let start = Local::now().naive_local().with_second(0).unwrap_or_else(|| {
        Local::now().naive_local()
    });
    let mut elapsed = -1i64;
    move || {
        elapsed += 1;
        start + Duration::seconds(elapsed)
    }
}
