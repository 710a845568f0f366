use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use vibescol::{
    aggregate, AggregateOptions, BlockBuilder, EncodingType, FileReader, FileWriter,
    GlobalIdBitmap, MultiReaderStack, WriterOptions,
};

#[derive(Parser)]
#[command(name = "vibescol", version = "0.1.0", about = "Columnar append-only storage engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a CSV of `id,value` lines into a new vibescol file
    Write {
        #[arg(short, long)]
        output: PathBuf,
        input: PathBuf,
        /// Pairs per block before a new one is flushed
        #[arg(long, default_value = "10000")]
        block_size: u32,
        /// Integer encoding: raw (default), varint-ids, varint-values, varint-both
        #[arg(short, long, default_value = "raw")]
        encoding: String,
    },
    /// Print a file's header and per-block footer statistics
    Info {
        input: PathBuf,
        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Dump one block's decoded pairs, or every block if `--block` is omitted
    Read {
        input: PathBuf,
        #[arg(long)]
        block: Option<usize>,
    },
    /// Compute count/min/max/sum/avg, optionally filtered and parallel
    Aggregate {
        input: PathBuf,
        #[arg(long)]
        allow: Option<PathBuf>,
        #[arg(long)]
        deny: Option<PathBuf>,
        /// 0 = sequential, negative = rayon default pool, positive = N workers
        #[arg(long, default_value = "0")]
        parallel: i32,
        /// Bypass the footer-stats fast path even without filters
        #[arg(long)]
        skip_precalculated: bool,
    },
    /// Aggregate across files newest-to-oldest, shadowing overlapping IDs
    MergeAggregate {
        /// Files ordered oldest-first (last argument is the newest)
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[arg(long)]
        allow: Option<PathBuf>,
        #[arg(long)]
        deny: Option<PathBuf>,
        #[arg(long, default_value = "0")]
        parallel: i32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    match Cli::parse().command {
        Commands::Write { output, input, block_size, encoding } => {
            let encoding_type = parse_encoding(&encoding)?;
            let writer = FileWriter::create(&output, WriterOptions { block_size_target: block_size, encoding_type })?;
            let mut builder = BlockBuilder::new(writer);

            let (ids, values) = read_pairs_csv(&input)?;
            builder.write(&ids, &values)?;
            let total = builder.total_items();
            builder.close()?;

            println!("Wrote {} pair(s) → {}", total, output.display());
        }

        Commands::Info { input, format } => {
            let mut reader = FileReader::open(&input)?;
            let checksum_ok = reader.verify_file_checksum().is_ok();
            let info = FileInfo {
                path: input.display().to_string(),
                version: reader.version(),
                encoding: reader.encoding_type(),
                block_count: reader.block_count(),
                checksum_ok,
                blocks: reader.footer_entries().to_vec(),
            };

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&info)?),
                "text" => print_info_text(&info),
                other => return Err(format!("unknown format '{other}'").into()),
            }
        }

        Commands::Read { input, block } => {
            let mut reader = FileReader::open(&input)?;
            let range: Vec<usize> = match block {
                Some(b) => vec![b],
                None => (0..reader.block_count()).collect(),
            };
            for i in range {
                let (ids, values) = reader.get_pairs(i)?;
                for (id, value) in ids.iter().zip(values.iter()) {
                    println!("{id},{value}");
                }
            }
        }

        Commands::Aggregate { input, allow, deny, parallel, skip_precalculated } => {
            let mut reader = FileReader::open(&input)?;
            let opts = AggregateOptions {
                skip_precalculated,
                allow_filter: allow.map(|p| read_id_bitmap(&p)).transpose()?,
                deny_filter: deny.map(|p| read_id_bitmap(&p)).transpose()?,
                parallel,
            };
            let result = aggregate(&mut reader, &opts)?;
            print_result(&result);
        }

        Commands::MergeAggregate { inputs, allow, deny, parallel } => {
            let mut stack = MultiReaderStack::new();
            for path in &inputs {
                stack.push(FileReader::open(path)?);
            }
            let opts = AggregateOptions {
                skip_precalculated: true,
                allow_filter: allow.map(|p| read_id_bitmap(&p)).transpose()?,
                deny_filter: deny.map(|p| read_id_bitmap(&p)).transpose()?,
                parallel,
            };
            let result = stack.aggregate(&opts)?;
            print_result(&result);
        }
    }

    Ok(())
}

#[derive(serde::Serialize)]
struct FileInfo {
    path: String,
    version: u32,
    encoding: EncodingType,
    block_count: usize,
    checksum_ok: bool,
    blocks: Vec<vibescol::FooterEntry>,
}

fn print_info_text(info: &FileInfo) {
    println!("── vibescol file ────────────────────────────────────────");
    println!("  Path            {}", info.path);
    println!("  Format version  {}", info.version);
    println!("  Encoding        {:?}", info.encoding);
    println!("  Blocks          {}", info.block_count);
    for (i, entry) in info.blocks.iter().enumerate() {
        println!(
            "    [{i:4}] offset={:<8} size={:<6} ids=[{},{}] values=[{},{}] sum={} count={}",
            entry.block_offset,
            entry.block_size,
            entry.min_id,
            entry.max_id,
            entry.min_value,
            entry.max_value,
            entry.sum,
            entry.count
        );
    }
    println!("  file_crc64      {}", if info.checksum_ok { "OK" } else { "MISMATCH" });
}

fn print_result(result: &vibescol::AggregateResult) {
    println!("count = {}", result.count);
    println!("min   = {}", result.min());
    println!("max   = {}", result.max());
    println!("sum   = {}", result.sum);
    println!("avg   = {:.4}", result.avg());
}

fn parse_encoding(s: &str) -> Result<EncodingType, Box<dyn std::error::Error>> {
    Ok(match s {
        "raw" => EncodingType::Raw,
        "varint-ids" => EncodingType::VarintIds,
        "varint-values" => EncodingType::VarintValues,
        "varint-both" => EncodingType::VarintBoth,
        other => return Err(format!("unknown encoding '{other}'").into()),
    })
}

/// Parse `id,value` lines (no header row).
fn read_pairs_csv(path: &PathBuf) -> Result<(Vec<u64>, Vec<i64>), Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(path)?);
    let mut ids = Vec::new();
    let mut values = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (id_str, value_str) = line
            .split_once(',')
            .ok_or_else(|| format!("malformed pair line: {line}"))?;
        ids.push(id_str.trim().parse::<u64>()?);
        values.push(value_str.trim().parse::<i64>()?);
    }
    Ok((ids, values))
}

/// Parse one ID per line into a `GlobalIdBitmap` for use as an allow/deny
/// filter.
fn read_id_bitmap(path: &PathBuf) -> Result<GlobalIdBitmap, Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(path)?);
    let mut bitmap = GlobalIdBitmap::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        bitmap.insert(line.parse::<u64>()?);
    }
    Ok(bitmap)
}
