use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use linkplan::config::{EngineSettings, MissionManifest, load_catalog, load_missions, load_settings};
use linkplan::export::json;
use linkplan::timeline::facade::catalog as catalog_facade;
use linkplan::timeline::{BatchOptions, LegOutcome, MissionTimeline, compute_legs};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Pre-flight link availability timelines for X/Ka/Ku transports"
)]
struct Cli {
    /// Satellite catalog: YAML list, TOML record, or directory of TOML records
    #[arg(long)]
    catalog: PathBuf,

    /// Engine settings (TOML or YAML); defaults apply when omitted
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Mission manifest file holding timed routes and transport plans (repeatable)
    #[arg(long = "mission", required = true)]
    missions: Vec<PathBuf>,

    /// Maximum worker threads for concurrent legs
    #[arg(long)]
    threads: Option<usize>,

    /// Write JSON results to this path (`-` for stdout)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => load_settings(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => EngineSettings::default(),
    };
    let catalog_configs = load_catalog(&cli.catalog)
        .with_context(|| format!("loading catalog from {}", cli.catalog.display()))?;
    let catalog = catalog_facade::from_config(&catalog_configs, &settings);
    info!(satellites = catalog.len(), "catalog loaded");

    let mut manifests: Vec<MissionManifest> = Vec::new();
    for path in &cli.missions {
        let loaded = load_missions(path)
            .with_context(|| format!("loading missions from {}", path.display()))?;
        manifests.extend(loaded);
    }
    if manifests.is_empty() {
        bail!("no mission legs found in the supplied files");
    }

    let options = BatchOptions {
        max_workers: cli.threads,
    };
    let outcomes = compute_legs(&manifests, &catalog, &settings, &options)?;

    let to_stdout = cli.output.as_deref() == Some(Path::new("-"));
    if to_stdout {
        print_summary(&mut io::stderr().lock(), &outcomes)?;
    } else {
        print_summary(&mut io::stdout().lock(), &outcomes)?;
    }

    if let Some(path) = &cli.output {
        json::write_batch(path, &outcomes)
            .with_context(|| format!("writing results to {}", path.display()))?;
    }

    let failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count();
    if failed == outcomes.len() {
        bail!("all {failed} mission legs failed");
    }
    Ok(())
}

fn print_summary(out: &mut dyn Write, outcomes: &[LegOutcome]) -> io::Result<()> {
    for outcome in outcomes {
        match &outcome.result {
            Ok(timeline) => print_timeline(out, timeline)?,
            Err(err) => writeln!(out, "{}: FAILED: {err}", outcome.mission_id)?,
        }
    }
    Ok(())
}

fn print_timeline(out: &mut dyn Write, timeline: &MissionTimeline) -> io::Result<()> {
    let stats = &timeline.statistics;
    let minutes = |seconds: i64| seconds as f64 / 60.0;
    let next = match stats.next_conflict_seconds {
        Some(seconds) => format!("+{:.0} min", minutes(seconds)),
        None => "none".to_string(),
    };
    writeln!(
        out,
        "{}: {:.0} min, nominal {:.1} / degraded {:.1} / critical {:.1} min, next conflict {}, {} segments",
        timeline.mission_id,
        timeline.window.duration().num_seconds() as f64 / 60.0,
        minutes(stats.nominal_seconds),
        minutes(stats.degraded_seconds),
        minutes(stats.critical_seconds),
        next,
        timeline.segments.len()
    )?;
    for segment in timeline.segments.iter().filter(|segment| !segment.is_nominal()) {
        writeln!(
            out,
            "  {} {} -> {} {} [{}]",
            segment.id,
            segment.start.format("%Y-%m-%dT%H:%MZ"),
            segment.end.format("%H:%MZ"),
            segment.status,
            segment.reasons.join("; ")
        )?;
    }
    Ok(())
}
