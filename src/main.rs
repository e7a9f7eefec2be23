use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use melgen::{Args, CounterpointRules, Part, Piece, compose, render_part};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let seed = args.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    });

    info!("Composing {} bars with seed {}..!", args.bars, seed);
    let composition = compose(args.bars, seed, &CounterpointRules);

    if args.dry_run {
        info!("Previewing {} generated notes..!", composition.melody.len());
        let notes = composition.melody.iter().zip(&composition.durations);
        for (i, (pitch, duration)) in notes.enumerate() {
            info!("Note {}: pitch={} duration={}", i, pitch, duration);
        }
        return Ok(());
    }

    fs::create_dir_all(&args.out_dir).with_context(|| {
        format!(
            "Failed to create output directory '{}'",
            args.out_dir.display()
        )
    })?;

    let mut piece = Piece::new();
    for (n, part) in Part::ALL.into_iter().enumerate() {
        piece.reset();
        render_part(&mut piece, &composition, part, args.instrument)?;
        debug!(
            "Rendered {} part with {} events..!",
            part.name(),
            piece.score().len()
        );

        let path = args.out_dir.join(format!("{}_{}.mid", n + 1, part.name()));
        piece.save(&path)?;
        info!("Wrote '{}'..!", path.display());
    }

    info!("Music created successfully..!");
    Ok(())
}
