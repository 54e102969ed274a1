//! Bank Statement CSV - CLI tool exporting statement transactions to CSV.

use bankstatement::{
    csv_format::CsvStatement, read_statement, DecoderChain, Registry, Result, BANK_BBVA, FORMAT_PDF,
};
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bankstatement_csv")]
#[command(about = "Export bank statement transactions to CSV", long_about = None)]
struct Cli {
    /// Input statement file
    input: PathBuf,

    /// Wrap the input stream with a decoder (available: multipart)
    #[arg(short, long)]
    decoder: Vec<String>,

    /// Bank to try reading for
    #[arg(short, long, default_value = BANK_BBVA)]
    bank: String,

    /// Bank statement file format
    #[arg(short, long, default_value = FORMAT_PDF)]
    format: String,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    outdir: PathBuf,

    /// Include header row
    #[arg(short = 'H', long)]
    headers: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let decoders = DecoderChain::from_names(&cli.decoder)?;
    let reader = Registry::with_builtin().reader(&cli.bank, &cli.format)?;

    let mut input = File::open(&cli.input)?;
    let statement = read_statement(&mut input, &decoders, reader.as_ref())?;

    let csv = CsvStatement::new(statement, cli.headers);
    let path = cli.outdir.join(csv.file_name());
    let mut output = File::create(&path)?;
    csv.write_to(&mut output)?;

    tracing::info!(path = %path.display(), transactions = csv.statement.transactions.len(), "wrote csv");
    Ok(())
}
