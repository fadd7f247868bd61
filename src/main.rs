use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use uff_tables::{read_uff, ReadOptions, RecordSource, UffFile};

/// Reshape Universal File Format (UFF) measurement files into time- and
/// frequency-domain tables.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the time and/or frequency tables built from a UFF file.
    Read {
        file: PathBuf,

        /// JSON file with read options. The flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Identifier pattern for time responses, matched from the start of id1.
        #[arg(short, long)]
        time_pattern: Option<String>,

        /// Skip the time table.
        #[arg(long, conflicts_with = "time_pattern")]
        no_time: bool,

        /// Identifier pattern for frequency-domain records.
        #[arg(short, long)]
        freq_pattern: Option<String>,

        /// Skip the frequency table.
        #[arg(long, conflicts_with = "freq_pattern")]
        no_freq: bool,

        /// Header field used in column labels; repeat for multi-part labels.
        #[arg(short = 'k', long = "header-key")]
        header_keys: Vec<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,

        /// Print diagnostics as JSON lines on stderr.
        #[arg(long)]
        diagnostics: bool,
    },

    /// List the datasets in a UFF file and summarise each function record.
    Info { file: PathBuf },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Pretty,
    Csv,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Read {
            file,
            config,
            time_pattern,
            no_time,
            freq_pattern,
            no_freq,
            header_keys,
            format,
            diagnostics,
        } => {
            let mut options = match &config {
                Some(path) => ReadOptions::from_json_file(path)
                    .with_context(|| format!("loading options from {}", path.display()))?,
                None => ReadOptions::default(),
            };
            if time_pattern.is_some() {
                options.time_pattern = time_pattern;
            }
            if no_time {
                options.time_pattern = None;
            }
            if freq_pattern.is_some() {
                options.freq_pattern = freq_pattern;
            }
            if no_freq {
                options.freq_pattern = None;
            }
            if !header_keys.is_empty() {
                options.header_keys = header_keys;
            }
            print_tables(&file, &options, format, diagnostics)
        }
        Commands::Info { file } => print_file_info(&file),
    }
}

fn print_tables(file: &Path, options: &ReadOptions, format: OutputFormat, diagnostics: bool) -> Result<()> {
    let output = read_uff(file, options).with_context(|| format!("reading {}", file.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (i, entry) in output.tables.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "# {}", entry.domain)?;
        match format {
            OutputFormat::Pretty if entry.table.is_empty() => writeln!(out, "(no matching records)")?,
            OutputFormat::Pretty => writeln!(out, "{}", entry.table.to_pretty_string()?)?,
            OutputFormat::Csv => entry.table.write_csv(&mut out)?,
        }
    }

    if diagnostics {
        for d in &output.diagnostics {
            eprintln!("{}", serde_json::to_string(d)?);
        }
    }
    Ok(())
}

fn print_file_info(path: &Path) -> Result<()> {
    let file = UffFile::open(path).with_context(|| format!("opening {}", path.display()))?;
    let set_types = file.set_types().context("scanning datasets")?;

    println!("UFF File Information");
    println!("====================");
    println!();
    println!("File: {}", path.display());
    println!("Datasets: {}", set_types.len());

    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for t in &set_types {
        *counts.entry(*t).or_default() += 1;
    }
    for (t, n) in &counts {
        println!("  type {t:>5}: {n}");
    }
    println!();

    let records = file.read_sets().context("decoding type-58 records")?.into_records();
    println!("Function records ({}):", records.len());
    for rec in &records {
        let range = match (rec.x.first(), rec.x.last()) {
            (Some(first), Some(last)) => format!("{first:.6e} .. {last:.6e}"),
            _ => "-".to_string(),
        };
        println!(
            "  {:<32} {:<36} {:>7} pts  {}{}",
            rec.id1,
            rec.kind().to_string(),
            rec.len(),
            range,
            if rec.data.is_complex() { "  complex" } else { "" }
        );
    }
    Ok(())
}
