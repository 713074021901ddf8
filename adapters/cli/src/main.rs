#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the Outbreak simulation in a terminal.

mod render;
mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use outbreak_core::CellCoord;
use outbreak_engine::{EngineConfig, TickEngine};
use outbreak_system_spawning::Config as GenerationConfig;
use outbreak_world::query;
use tracing::{info, warn};

use crate::scenario::Scenario;

#[derive(Parser, Debug)]
#[command(
    name = "outbreak",
    version,
    about = "Simulate a zombie outbreak on a wrap-around grid"
)]
struct Cli {
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 200)]
    ticks: u64,
    /// Keep ticking past `--ticks` until humans or zombies are gone.
    #[arg(long)]
    until_extinct: bool,
    /// Hard stop for `--until-extinct` runs.
    #[arg(long, default_value_t = 100_000)]
    max_ticks: u64,
    /// Print the census every N ticks.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    report_every: u64,
    /// Print an ASCII frame alongside every census line.
    #[arg(long)]
    render: bool,
    /// Seed for world generation and every tick tie-break.
    #[arg(long)]
    seed: Option<u64>,
    /// TOML scenario overriding the generation and rule defaults.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Grid width, overriding the scenario.
    #[arg(long)]
    width: Option<u32>,
    /// Grid height, overriding the scenario.
    #[arg(long)]
    height: Option<u32>,
    /// Initial human count, overriding the scenario.
    #[arg(long)]
    humans: Option<u32>,
    /// Initial zombie count, overriding the scenario.
    #[arg(long)]
    zombies: Option<u32>,
    /// Weapon pickup count, overriding the scenario.
    #[arg(long)]
    weapons: Option<u32>,
    /// Describe the cell `COLUMN,ROW` once the run ends.
    #[arg(long, value_name = "COLUMN,ROW", value_parser = parse_cell)]
    inspect: Option<CellCoord>,
}

impl Cli {
    fn configure(&self) -> Result<(GenerationConfig, EngineConfig)> {
        let mut generation = GenerationConfig::default();
        let mut engine = EngineConfig::default();

        if let Some(path) = &self.scenario {
            Scenario::load(path)?.apply(&mut generation, &mut engine);
        }

        let overrides = [
            (&mut generation.width, self.width),
            (&mut generation.height, self.height),
            (&mut generation.humans, self.humans),
            (&mut generation.zombies, self.zombies),
            (&mut generation.weapons, self.weapons),
        ];
        for (target, value) in overrides {
            if let Some(value) = value {
                *target = value;
            }
        }
        if let Some(seed) = self.seed {
            engine.rng_seed = seed;
        }

        Ok((generation, engine))
    }
}

fn parse_cell(value: &str) -> Result<CellCoord, String> {
    let (column, row) = value
        .split_once(',')
        .ok_or_else(|| format!("expected COLUMN,ROW, got `{value}`"))?;
    let column = column
        .trim()
        .parse()
        .map_err(|error| format!("invalid column `{column}`: {error}"))?;
    let row = row
        .trim()
        .parse()
        .map_err(|error| format!("invalid row `{row}`: {error}"))?;
    Ok(CellCoord::new(column, row))
}

/// Entry point for the Outbreak command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let (generation, config) = cli.configure()?;

    let (mut engine, summary) = TickEngine::generate(&generation, config).with_context(|| {
        format!(
            "failed to generate a {}x{} world",
            generation.width, generation.height
        )
    })?;
    info!(seed = config.rng_seed, "simulation ready");
    println!(
        "generated {}x{} world: {} houses, {} zombies, {} humans, {} weapons ({} skipped)",
        generation.width,
        generation.height,
        summary.houses,
        summary.zombies,
        summary.humans,
        summary.weapons,
        summary.skipped
    );

    let limit = if cli.until_extinct {
        cli.max_ticks
    } else {
        cli.ticks
    };
    for _ in 0..limit {
        let report = engine.tick();
        if report.aborted {
            warn!(tick = report.tick, "continuing after abandoned tick");
        }

        let census = engine.census();
        let extinct = census.humans == 0 || census.zombies == 0;
        if report.tick % cli.report_every == 0 || (cli.until_extinct && extinct) {
            println!(
                "tick {:>5}: {:>4} humans ({:>3} armed) {:>4} zombies {:>3} weapons",
                report.tick, census.humans, census.armed_humans, census.zombies, census.weapons
            );
            if cli.render {
                print!("{}", render::frame(engine.world()));
            }
        }

        if cli.until_extinct && extinct {
            break;
        }
    }

    if let Some(cell) = cli.inspect {
        let inspection = query::inspect(engine.world(), cell);
        println!(
            "cell ({}, {}): {:?}, weapons {:?}",
            inspection.cell.column(),
            inspection.cell.row(),
            inspection.occupant,
            inspection.weapons
        );
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "outbreak",
            "--seed",
            "9",
            "--width",
            "30",
            "--humans",
            "4",
            "--inspect",
            "3, 7",
        ])
        .expect("arguments parse");

        let (generation, engine) = cli.configure().expect("configuration resolves");

        assert_eq!(engine.rng_seed, 9);
        assert_eq!(generation.width, 30);
        assert_eq!(generation.height, 50);
        assert_eq!(generation.humans, 4);
        assert_eq!(cli.inspect, Some(CellCoord::new(3, 7)));
    }

    #[test]
    fn report_interval_must_be_positive() {
        assert!(Cli::try_parse_from(["outbreak", "--report-every", "0"]).is_err());
    }

    #[test]
    fn malformed_cells_are_rejected() {
        assert!(parse_cell("12").is_err());
        assert!(parse_cell("a,3").is_err());
        assert_eq!(parse_cell("4,5"), Ok(CellCoord::new(4, 5)));
    }
}
