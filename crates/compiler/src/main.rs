//! AntEater CLI
//!
//! Compiles the given source files into one program, runs it, and prints
//! the captured output. Exit status is non-zero if any compilation or
//! runtime error was raised.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use ant_compiler::{AntConfig, AntVm};

#[derive(ClapParser)]
#[command(name = "ant")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "AntEater interpreter - compile and run AntEater scripts", long_about = None)]
struct Cli {
    /// Source files to compile and run, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Dump the parse tree of each file before code generation
    #[arg(short = 't', long)]
    print_tree: bool,

    /// Dump the generated bytecode after all files are compiled
    #[arg(short = 'c', long)]
    print_code: bool,

    /// Wait for Enter before exiting
    #[arg(short = 'p', long)]
    pause: bool,

    /// Configuration file (defaults to ant.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("ANT_LOG"))
        .init();

    let cli = Cli::parse();

    let mut config = match AntConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    config.merge_flags(cli.print_tree, cli.print_code, cli.pause);

    let mut vm = AntVm::new();
    vm.print_tree = config.print_tree;

    for file in &cli.files {
        if let Err(e) = vm.compile_file(file) {
            eprintln!("{}", e);
            eprintln!("Compilation failed. Terminating.");
            finish(config.pause, 1);
        }
    }

    if config.print_code {
        println!("{}", vm.dump_code());
    }

    let result = vm.run();
    println!("\nOutput:");
    print!("{}", result.output);

    finish(config.pause, if result.error.is_some() { 1 } else { 0 })
}

fn finish(pause: bool, status: i32) -> ! {
    if pause {
        println!("Press Enter to exit...");
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
    }
    process::exit(status)
}
