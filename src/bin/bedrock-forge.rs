//! Bedrock Forge CLI Binary

use bedrock_forge::error::ForgeError;
use bedrock_forge::logging::{init_logging, resolve_log_file_path};
use bedrock_forge::tooling::cli::{Cli, CliContext};
use clap::Parser;
use std::process;

fn main() {
    let cli = Cli::parse();

    let mut context = match CliContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    // Flags override the configured logging section.
    let logging = &mut context.config_mut().logging;
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        logging.format = format.clone();
    }
    if let Some(output) = &cli.log_output {
        logging.output = output.clone();
    }
    if logging.output.contains("file") {
        match resolve_log_file_path(cli.log_file.clone(), logging.file.clone(), Some(cli.workspace.as_path())) {
            Ok(path) => logging.file = Some(path),
            Err(e) => {
                eprintln!("Error resolving log file: {}", e);
                process::exit(1);
            }
        }
    }
    let logging = logging.clone();
    if let Err(e) = init_logging(Some(&logging)) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            if let ForgeError::Validation { report, .. } = &e {
                println!("{}", report);
            }
            eprintln!("Error: {}", e);
            for line in e.details() {
                eprintln!("  - {}", line);
            }
            eprintln!("{} error(s)", e.error_count());
            process::exit(1);
        }
    }
}
