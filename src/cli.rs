//! cli component of huffmania.
//!
//! lines starting with `> ` denote valid invocations. `<description>` denotes a required
//! argument, while `[description]` denotes an optional argument.
//!
//! # Encoding
//!
//! > `huffmania enc <input file> <output file> [--config <json>] [--preset <name>] [--capacity <bytes>]
//! >   [--frequencies <json>]`
//!
//! the input is counted once, a tree is built from the counts and the input is packed with it.
//! the output file holds only the packed bits behind an 8-byte bit count. the tree itself is
//! never written into it: instead the frequency table is saved next to the output as
//! `{file stem}.freq.json` (or to `--frequencies`), and the decoder rebuilds the identical tree
//! from it.
//!
//! # Decoding
//!
//! > `huffmania dec <input file> <output file> [--frequencies <json>] [--config <json>] [--preset <name>]`
//!
//! the frequency table defaults to the `{file stem}.freq.json` sidecar of the input file.
//!
//! # Testing
//!
//! > `huffmania test <input file> [--config <json>] [--preset <name>]`
//!
//! compresses the file, immediately decompresses it and compares the result with the original.
//!
//! # Dumping
//!
//! > `huffmania dump <input file> [--json]`
//!
//! prints the frequency of every used byte and the code assigned to it.
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use huffmania::{CodecConfig, FrequencyTable, HuffmanError};

pub mod decode;
pub mod dump;
pub mod encode;

/// Error types for CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Huffman error: {0}")]
    Huffman(#[from] HuffmanError),

    #[error("Compressor error: {0}")]
    Compressor(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("Roundtrip of {} did not reproduce the original data", .0.display())]
    RoundTripMismatch(PathBuf),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// CLI arguments for the huffmania application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Supported commands for huffmania
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode (compress) a file
    #[command(alias = "enc")]
    Encode(EncodeArgs),

    /// Decode (decompress) a file
    #[command(alias = "dec")]
    Decode(DecodeArgs),

    /// Test compression/decompression roundtrip
    Test(TestArgs),

    /// Print the frequencies and codes of a file
    Dump(DumpArgs),
}

/// Codec configuration sources, shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Load the codec configuration from a JSON file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Use a predefined configuration preset (default, strict, wide)
    #[arg(long)]
    pub preset: Option<String>,

    /// Override the output stream capacity, in bytes
    #[arg(long)]
    pub capacity: Option<usize>,
}

impl ConfigArgs {
    /// Resolves the configuration with priority:
    /// 1. Configuration file (--config)
    /// 2. Preset (--preset)
    /// 3. Default configuration
    ///
    /// --capacity is applied on top of whichever was picked.
    pub fn resolve(&self) -> Result<CodecConfig> {
        let mut config = match (&self.config, &self.preset) {
            (Some(path), _) => CodecConfig::from_json(&fs::read_to_string(path)?)?,
            (None, Some(name)) => CodecConfig::preset(name).ok_or_else(|| CliError::UnknownPreset(name.clone()))?,
            (None, None) => CodecConfig::default(),
        };
        if let Some(capacity) = self.capacity {
            config.stream_capacity = capacity;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Arguments specific to the encode command
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Path to the input file
    pub input: PathBuf,

    /// Path for the output file
    pub output: PathBuf,

    /// Where to save the frequency table (defaults to `{output stem}.freq.json`)
    #[arg(long)]
    pub frequencies: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments specific to the decode command
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Path to the input file
    pub input: PathBuf,

    /// Path for the output file
    pub output: PathBuf,

    /// Frequency table the input was encoded with (defaults to `{input stem}.freq.json`)
    #[arg(long)]
    pub frequencies: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments specific to the test command
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Path to the original file
    pub input: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments specific to the dump command
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Path to the input file
    pub input: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Path of the frequency sidecar belonging to `base`: `{file stem}.freq.json` in the same folder.
pub fn sidecar_path(base: &Path) -> Result<PathBuf> {
    let file_stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| CliError::InvalidPath(base.to_path_buf()))?;

    let mut path = base.to_path_buf();
    path.set_file_name(format!("{}.freq.json", file_stem));
    Ok(path)
}

pub fn save_frequencies(frequencies: &FrequencyTable, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(frequencies)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_frequencies(path: &Path) -> Result<FrequencyTable> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_sits_next_to_the_file() {
        let path = sidecar_path(Path::new("out/winter.huff")).unwrap();
        assert_eq!(path, Path::new("out/winter.freq.json"));
    }

    #[test]
    fn config_priority() {
        let args = ConfigArgs {
            preset: Some("strict".to_string()),
            capacity: Some(64),
            ..ConfigArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.single_symbol, huffmania::SingleSymbolPolicy::Reject);
        assert_eq!(config.stream_capacity, 64);

        let unknown = ConfigArgs {
            preset: Some("o1".to_string()),
            ..ConfigArgs::default()
        };
        assert!(matches!(unknown.resolve(), Err(CliError::UnknownPreset(_))));
    }

    #[test]
    fn zero_capacity_override_is_invalid() {
        let args = ConfigArgs {
            capacity: Some(0),
            ..ConfigArgs::default()
        };
        assert!(matches!(args.resolve(), Err(CliError::Huffman(HuffmanError::InvalidConfig(_)))));
    }
}
