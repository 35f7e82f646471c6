//! blockctl: inspect Bitcoin headers and blocks, decode targets and run a
//! midstate nonce search from the command line.

mod miner;
mod state;

use anyhow::{bail, Context, Result};
use block_core::hash::display_hex_to_hash;
use block_core::{Block, BlockHeader, RawTransaction, BLOCK_VERSION};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::miner::{Miner, MinerConfig};
use crate::state::{BlockReport, HeaderReport, RewardReport, TargetReport};

#[derive(Parser)]
#[command(name = "blockctl")]
#[command(version)]
#[command(about = "Inspect Bitcoin blocks and search for proof of work", long_about = None)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an 80-byte block header
    Header {
        /// Serialized header as hex
        hex: String,
    },

    /// Parse a serialized block
    ///
    /// Transactions must use the legacy serialization; blocks carrying
    /// segregated witness data are rejected.
    Block {
        /// Serialized block as hex
        hex: String,
    },

    /// Decode compact target bits
    Target {
        /// Bits as hex, with or without 0x
        bits: String,
    },

    /// Block subsidy at a height
    Reward {
        height: u64,
    },

    /// Search for a nonce over a coinbase-only view of a block
    Mine {
        /// Previous block hash (display format)
        #[arg(long)]
        prev_hash: String,

        /// Compact target bits
        #[arg(long, default_value = "0x1d00ffff")]
        bits: String,

        /// Block timestamp (defaults to now)
        #[arg(long)]
        time: Option<u32>,

        /// Height of the block being mined
        #[arg(long)]
        height: u32,

        /// Block version
        #[arg(long, default_value_t = BLOCK_VERSION)]
        version: u32,

        /// Payout scriptPubKey as hex
        #[arg(long)]
        payout_script: String,

        /// Fees added to the subsidy, in satoshis
        #[arg(long, default_value_t = 0)]
        fees: u64,

        /// Merkle edge hash (internal byte order hex), bottom level first
        #[arg(long = "edge")]
        edges: Vec<String>,

        /// Starting extra nonce (random if omitted)
        #[arg(long)]
        extra_nonce: Option<u64>,

        /// Nonces per batch
        #[arg(long, default_value_t = 1 << 20)]
        batch: u32,

        /// Stop after this many batches
        #[arg(long, default_value_t = 16)]
        max_batches: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Commands::Header { hex } => {
            let bytes = decode_hex(&hex)?;
            let (header, rest) = BlockHeader::from_bytes(&bytes).context("failed to parse header")?;
            if !rest.is_empty() {
                log::warn!("ignoring {} bytes after the header", rest.len());
            }
            print_json(&HeaderReport::new(&header)?)?;
        }

        Commands::Block { hex } => {
            print_json(&block_report(&decode_hex(&hex)?)?)?;
        }

        Commands::Target { bits } => {
            let bits = parse_bits(&bits)?;
            print_json(&TargetReport::from_bits(bits)?)?;
        }

        Commands::Reward { height } => {
            print_json(&RewardReport::new(height))?;
        }

        Commands::Mine {
            prev_hash,
            bits,
            time,
            height,
            version,
            payout_script,
            fees,
            edges,
            extra_nonce,
            batch,
            max_batches,
        } => {
            let config = MinerConfig {
                height,
                version,
                prev_block_hash: display_hex_to_hash(&prev_hash).context("invalid --prev-hash")?,
                time: match time {
                    Some(time) => time,
                    None => now()?,
                },
                bits: parse_bits(&bits)?,
                payout_script: decode_hex(&payout_script).context("invalid --payout-script")?,
                fees,
                merkle_edge: edges.iter().map(String::as_str).map(parse_edge).collect::<Result<_>>()?,
            };
            let extra_nonce = match extra_nonce {
                Some(extra_nonce) => extra_nonce,
                None => random_extra_nonce()?,
            };

            log::info!(
                "mining height {height} with {} edge hashes, {max_batches} batches of {batch}",
                config.merkle_edge.len()
            );
            let mut miner = Miner::new(config, extra_nonce).context("failed to build block")?;
            let stats = miner.run(batch, max_batches)?;
            print_json(stats)?;
        }
    }

    Ok(())
}

/// Parse a serialized block and report on it. The header in the report is
/// the one from the input, merkle root included.
fn block_report(bytes: &[u8]) -> Result<BlockReport> {
    let (header, _) = BlockHeader::from_bytes(bytes).context("failed to parse block header")?;
    let (block, rest) = Block::<RawTransaction>::from_bytes(bytes).context("failed to parse block")?;
    if !rest.is_empty() {
        bail!("{} trailing bytes after block", rest.len());
    }
    Ok(BlockReport::new(&header, &block, bytes.len())?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(s.trim()).context("invalid hex")
}

/// Parse compact bits given as hex, `0x` prefix optional.
fn parse_bits(s: &str) -> Result<u32> {
    let digits = s.trim().trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).with_context(|| format!("invalid bits {s:?}"))
}

/// An edge hash is given in internal byte order, exactly as it is hashed.
fn parse_edge(s: &str) -> Result<[u8; 32]> {
    let bytes = decode_hex(s)?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow::anyhow!("edge hash must be 32 bytes, got {}", bytes.len()))
}

fn now() -> Result<u32> {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .context("system clock is before 1970")?
        .as_secs();
    u32::try_from(secs).context("timestamp does not fit in 32 bits")
}

fn random_extra_nonce() -> Result<u64> {
    let mut seed = [0u8; 8];
    getrandom::getrandom(&mut seed).map_err(|e| anyhow::anyhow!("failed to seed extra nonce: {e}"))?;
    Ok(u64::from_le_bytes(seed))
}
