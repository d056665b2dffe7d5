use clap::{Parser, Subcommand};
use std::path::PathBuf;

use webpforge_common::{Encoding, MetadataPolicy, Quality};

#[derive(Parser)]
#[command(name = "webpforge")]
#[command(author, version, about = "Convert images to WebP with native, CLI or cloud backends")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert an image to WebP
    Convert(ConvertArgs),

    /// Probe every backend and report whether it can run here
    CheckBackends {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a shorthand size ("2M", "512K") and print it in bytes
    ParseSize {
        /// Size to parse
        size: String,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(clap::Args)]
pub struct ConvertArgs {
    /// Source image
    pub source: String,

    /// Destination WebP file
    pub destination: String,

    /// Backend to use: native, vips, cwebp or cloud
    #[arg(short, long, default_value = "native")]
    pub backend: String,

    /// Quality 0-100 or "auto"
    #[arg(short, long)]
    pub quality: Option<Quality>,

    /// lossy, lossless or auto (smaller of both)
    #[arg(long)]
    pub encoding: Option<Encoding>,

    /// Encoder preset (default, picture, photo, drawing, icon, text)
    #[arg(long)]
    pub preset: Option<String>,

    /// Metadata to keep: none, all, or a list such as "exif,icc"
    #[arg(long)]
    pub metadata: Option<MetadataPolicy>,

    /// Near-lossless level for lossless encoding (100 disables it)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub near_lossless: Option<u8>,

    /// Alpha channel quality
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub alpha_quality: Option<u8>,

    /// Use sharp (slower, more accurate) RGB to YUV conversion
    #[arg(long)]
    pub smart_subsample: bool,

    /// Output the conversion report as JSON
    #[arg(long)]
    pub json: bool,
}
