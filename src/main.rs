//! Capstan CLI - versioned prompt and trigger configurations for AI agents.

use capstan::cli::Cli;
use capstan::commands;
use capstan::models::Scope;
use capstan::storage;
use clap::Parser;
use std::path::PathBuf;
use std::process;

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    // Data directory: --data-dir flag > CAP_DATA_DIR env > platform default
    let data_dir: PathBuf = match cli.data_dir {
        Some(dir) => dir,
        None => match storage::default_data_dir() {
            Ok(dir) => dir,
            Err(e) => {
                report_error(&e, human);
                process::exit(1);
            }
        },
    };

    let scope = Scope::new(cli.org, cli.actor);

    match commands::run(cli.command, &data_dir, &scope) {
        Ok(output) => output.print(human),
        Err(e) => {
            report_error(&e, human);
            process::exit(1);
        }
    }
}

fn report_error(e: &capstan::Error, human: bool) {
    if human {
        eprintln!("Error: {}", e);
    } else {
        eprintln!(
            "{}",
            serde_json::json!({ "error": e.to_string() })
        );
    }
}
