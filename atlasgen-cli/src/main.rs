use std::path::PathBuf;

use anyhow::{Context, Result};
use atlasgen_core::pipeline::{self, Config};
use atlasgen_core::sprite_pack::MAX_ATLAS_EDGE;
use atlasgen_core::VERSION;
use clap::{ArgAction, CommandFactory, Parser};

#[derive(Parser, Debug)]
#[command(name = "atlasgen", version = VERSION, about = "Pack asset catalog images into per-folder texture atlases")]
struct Cli {
    /// Source asset catalog
    #[arg(value_name = "xcassetsIn")]
    input: Option<PathBuf>,
    /// Output catalog for the atlas image bundles
    #[arg(value_name = "xcassetsOut")]
    atlas_out: Option<PathBuf>,
    /// Output catalog for the frame-map data bundles
    #[arg(value_name = "xcassetDataOut")]
    data_out: Option<PathBuf>,
    /// Directory the catalog paths are resolved in (default: ./resources)
    #[arg(long)]
    root: Option<PathBuf>,
    /// Largest atlas edge in pixels
    #[arg(long, default_value_t = MAX_ATLAS_EDGE)]
    max_edge: u32,
    /// Rebuild even if the input catalog carries a customVersion
    #[arg(long)]
    force: bool,
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (Some(input), Some(atlas_out), Some(data_out)) = (cli.input, cli.atlas_out, cli.data_out) else {
        println!("atlasgen xcassetsIn xcassetsOut xcassetDataOut\n");
        Cli::command().print_help()?;
        return Ok(());
    };

    let anchor = match cli.root {
        Some(root) => root,
        None => pipeline::resources_anchor(&std::env::current_dir().context("cannot read working directory")?),
    };
    let mut cfg = Config::new(input, atlas_out, data_out).anchored(&anchor);
    cfg.max_edge = cli.max_edge;
    cfg.force = cli.force;

    let summary = pipeline::run(&cfg)?;
    if summary.up_to_date {
        println!("no update needed");
        return Ok(());
    }
    log::info!("wrote {} atlases, skipped {}", summary.packed.len(), summary.skipped.len());
    for s in &summary.skipped {
        log::warn!("  {}@{}: {}", s.group, s.scale, s.reason);
    }
    Ok(())
}
