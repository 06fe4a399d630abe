use clap::Parser;
use colored::Colorize;
use std::process;

use musil::repl::REPL;
use musil::runtime::Runtime;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "musil")]
#[command(version = VERSION)]
#[command(about = "Musil - an interactive scripting language for music, numeric and signal-processing work", long_about = None)]
struct Cli {
    /// Keep the REPL alive after evaluating the given files
    #[arg(short = 'i', long)]
    interactive: bool,

    /// Script files to evaluate in order
    files: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    let runtime = Runtime::new();

    if cli.files.is_empty() {
        let repl = REPL::new(runtime);
        repl.run();
        return;
    }

    let mut failed = false;
    for file in &cli.files {
        if let Err(err) = runtime.load_file(file) {
            eprintln!("{} {}", "error:".red().bold(), err);
            failed = true;
        }
    }

    if cli.interactive {
        let repl = REPL::new(runtime);
        repl.run();
    }

    if failed {
        process::exit(1);
    }
}
