pub mod cli;
pub mod model;
pub mod parser;
pub mod processor;
pub mod writer;

use anyhow::{Context, bail};
use clap::Parser;
use log::{LevelFilter, info};

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    // 1. ── Load ───────────────────────────────────────────────────────
    let raw_project = parser::load(args.environment.as_deref(), &args.inputs)
        .with_context(|| "Loading environment and sources")?;

    // 2. ── Compile ────────────────────────────────────────────────────
    let processed = processor::run(&raw_project.environment, &raw_project.scripts, &args.options())
        .with_context(|| "Compiling scripts")?;

    // 3. ── Write outputs ──────────────────────────────────────────────
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Creating {}", args.output.display()))?;

    writer::bin::emit(&processed, &args.output).with_context(|| "Writing binary artifacts")?;
    if args.listing {
        writer::listing::emit(&processed, &args.output).with_context(|| "Writing listings")?;
    }
    if args.header {
        writer::c::emit(&args.output).with_context(|| "Writing C header")?;
    }

    info!(
        "{} compiled, {} failed, {} warnings, {} errors",
        processed.scripts.len(),
        processed.failed.len(),
        processed.warnings,
        processed.errors
    );

    // 4. ── Report ─────────────────────────────────────────────────────
    if !processed.failed.is_empty() {
        bail!("{} script(s) failed: {}", processed.failed.len(), processed.failed.join(", "));
    }

    Ok(())
}
