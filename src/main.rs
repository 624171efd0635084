#![deny(clippy::redundant_clone)]
#![deny(clippy::unwrap_used)]

use clap::{ArgAction, Parser};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use alphabet_lang::{build, lsp::LanguageServer, repl, run};

#[derive(Parser)]
#[command(name = "Alphabet")]
#[command(
    bin_name = "alphabet",
    version = "2.0.0",
    disable_version_flag = true,
    about = "The Alphabet programming language",
    long_about = "Alphabet is a small object-oriented scripting language where every keyword is a single letter and every type is a small integer. Sources are compiled to bytecode and run on an in-process stack VM."
)]
struct AlphabetCli {
    /// Source file to run (starts the REPL when omitted)
    file: Option<String>,

    /// Compile only, don't run
    #[arg(short = 'c', long = "compile")]
    compile: bool,

    /// Output file for the compiled bytecode
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<String>,

    /// Start the interactive REPL
    #[arg(long)]
    repl: bool,

    /// Start the Language Server Protocol server
    #[arg(long)]
    lsp: bool,

    /// Show version information
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: (),
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = AlphabetCli::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        std::process::exit(if err.use_stderr() { 1 } else { 0 });
    });

    if cli.lsp {
        let mut server = LanguageServer::new();
        return server.run().into_diagnostic();
    }

    if cli.repl || (cli.file.is_none() && !cli.compile) {
        return repl::start();
    }

    let Some(file) = cli.file else {
        eprintln!("Error: no input file specified");
        eprintln!("Use --help for usage information");
        std::process::exit(1);
    };

    if cli.compile {
        build(file, cli.output)
    } else {
        run(file)
    }
}
