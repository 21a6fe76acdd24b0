//! `pekel`: convert between JSON and pekel streams on stdin/stdout.
//!
//! Usage:
//!   pekel pack   < doc.json  > doc.pkl
//!   pekel unpack < doc.pkl   > doc.json

use std::io::{self, Read, Write};

use anyhow::Context;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::WarnLevel;
use pekel::DecoderOptions;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<WarnLevel>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode JSON from stdin as a pekel stream on stdout
    Pack,
    /// Decode a pekel stream from stdin as JSON on stdout
    Unpack {
        /// Maximum container nesting accepted from the input
        #[arg(long, value_name = "N", default_value_t = DecoderOptions::default().max_depth)]
        max_depth: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(io::stderr)
        .init();

    let mut stdout = io::stdout().lock();
    match cli.cmd {
        Commands::Pack => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading JSON from stdin")?;
            let bytes = pekel_cli::pack(buf.trim())?;
            stdout.write_all(&bytes)?;
        }
        Commands::Unpack { max_depth } => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("reading pekel stream from stdin")?;
            let json = pekel_cli::unpack(&buf, DecoderOptions { max_depth })?;
            writeln!(stdout, "{json}")?;
        }
    }
    stdout.flush()?;
    Ok(())
}
