pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use aimana_core::config::LoadOptions;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "aimana",
    about = "AIMANA discount optimizer operator CLI",
    long_about = "Run discount recommendations offline and inspect the configuration, candidate grid, history dataset, and models the service runs with.",
    after_help = "Examples:\n  aimana predict --request quote.json --trace\n  aimana doctor --json\n  aimana candidates"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Config file to load instead of ./aimana.toml or ./config/aimana.toml"
    )]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Recommend discounts for a quote request JSON file")]
    Predict {
        #[arg(long, help = "Path to a quote request JSON document")]
        request: PathBuf,
        #[arg(long, help = "Include the reference record and the full scored candidate table")]
        trace: bool,
    },
    #[command(about = "Print the configured discount candidate grid")]
    Candidates,
    #[command(about = "Print the distinct form values found in the history dataset")]
    Options,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, history dataset, and model readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            ..LoadOptions::default()
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let result = match &cli.command {
        Command::Predict { request, trace } => commands::predict::run(&options, request, *trace),
        Command::Candidates => commands::candidates::run(&options),
        Command::Options => commands::options::run(&options),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, *json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
