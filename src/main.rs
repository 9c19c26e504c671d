//! Native Enum CLI
//!
//! Lists files or directories below a root using one of the traversal
//! strategies.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{info, warn};
use std::process::ExitCode;

use native_enum::pool::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_WORKER_COUNT};
use native_enum::{scanner, ScanConfig, Strategy};

const ABOUT: &str = r#"
Native Enum - fast file and directory enumeration

Examples:
  native_enum files --root C:\data                      List every file below C:\data
  native_enum files --root C:\data --no-recursive       Only files directly in C:\data
  native_enum files --root C:\data --strategy fan-out   One task per directory
  native_enum dirs --root \\server\share --workers 32   Directories, 32 pool workers
  native_enum files --root C:\data --json               JSON summary
"#;

/// Fast file and directory enumeration
#[derive(Parser)]
#[command(name = "native_enum")]
#[command(author, version, about = ABOUT, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List files below a root
    Files(ScanArgs),
    /// List directories below a root
    Dirs(ScanArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Single-threaded depth-first walk
    Sequential,
    /// One concurrent task per directory
    FanOut,
    /// Fixed worker pool draining a shared queue
    Pool,
}

#[derive(Args)]
struct ScanArgs {
    /// Root directory to enumerate
    #[arg(short = 'r', long)]
    root: String,

    /// Traversal strategy
    #[arg(short = 's', long, value_enum, default_value = "pool")]
    strategy: StrategyArg,

    /// Worker count for the pool strategy
    #[arg(short = 'w', long, default_value_t = DEFAULT_WORKER_COUNT)]
    workers: usize,

    /// Output channel capacity for the pool strategy
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    channel_capacity: usize,

    /// Do not descend into subdirectories
    #[arg(long)]
    no_recursive: bool,

    /// Print a JSON summary instead of one path per line
    #[arg(long)]
    json: bool,
}

impl ScanArgs {
    fn config(&self) -> ScanConfig {
        let strategy = match self.strategy {
            StrategyArg::Sequential => Strategy::Sequential,
            StrategyArg::FanOut => Strategy::FanOut,
            StrategyArg::Pool => Strategy::WorkerPool {
                workers: self.workers,
            },
        };
        ScanConfig::builder()
            .root(self.root.as_str())
            .recursive(!self.no_recursive)
            .strategy(strategy)
            .channel_capacity(self.channel_capacity)
            .build()
    }
}

fn run(args: &ScanArgs, directories: bool) -> ExitCode {
    let config = args.config();
    info!("Config: {:?}", config);

    if args.json {
        let result = if directories {
            scanner::scan_directories(&config)
        } else {
            scanner::scan(&config)
        };
        for err in &result.errors {
            warn!("{}", err);
        }
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize result: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return if result.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    let mut errors = 0usize;
    let mut report = |line: Result<String, native_enum::ScanError>| match line {
        Ok(path) => println!("{}", path),
        Err(err) => {
            warn!("{}", err);
            errors += 1;
        }
    };

    let started = if directories {
        scanner::enumerate_directories(&config)
            .map(|stream| stream.for_each(|d| report(d.map(|d| d.path().to_string()))))
    } else {
        scanner::enumerate_files(&config)
            .map(|stream| stream.for_each(|f| report(f.map(|f| f.path().to_string()))))
    };

    if let Err(err) = started {
        eprintln!("{}", err);
        return ExitCode::FAILURE;
    }
    if errors > 0 {
        eprintln!("Completed with {} errors", errors);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Files(args)) => run(&args, false),
        Some(Commands::Dirs(args)) => run(&args, true),
        None => {
            println!("{}", ABOUT);
            println!("Use 'native_enum files --help' for scan options");
            ExitCode::SUCCESS
        }
    }
}
