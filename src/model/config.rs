use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "melgen",
    about = "Generate a short four-part algorithmic composition as MIDI files!"
)]
pub struct Args {
    /// Number of 4/4 bars to generate.
    pub bars: u32,

    /// Seed for the rhythm/melody generator. Defaults to the current time,
    /// so repeated runs produce different pieces unless pinned.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Directory the four .mid files are written into.
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// General MIDI instrument number for all four parts, 1-based
    /// (1 = Acoustic Grand Piano).
    #[arg(short, long, default_value_t = 1)]
    pub instrument: u32,

    /// Dry run (log the generated notes and exit without writing files).
    #[arg(short, long, default_value_t = false)]
    pub dry_run: bool,
}
