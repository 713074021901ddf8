//! TOML scenario files that override the generation and engine defaults.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use outbreak_engine::EngineConfig;
use outbreak_system_spawning::Config as GenerationConfig;
use serde::Deserialize;

const SUPPORTED_SCENARIO_VERSION: u32 = 1;

/// Partial configuration loaded from disk. Absent keys keep their defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    version: u32,
    seed: Option<u64>,
    #[serde(default)]
    grid: GridSection,
    #[serde(default)]
    houses: HouseSection,
    #[serde(default)]
    population: PopulationSection,
    #[serde(default)]
    rules: RuleSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GridSection {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HouseSection {
    count: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PopulationSection {
    zombies: Option<u32>,
    humans: Option<u32>,
    weapons: Option<u32>,
    weapon_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSection {
    weapon_cooldown: Option<u32>,
    sense_range: Option<u32>,
}

impl Scenario {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid scenario {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let scenario: Self =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        if scenario.version != SUPPORTED_SCENARIO_VERSION {
            bail!(
                "unsupported scenario version {}; expected {}",
                scenario.version,
                SUPPORTED_SCENARIO_VERSION
            );
        }
        Ok(scenario)
    }

    pub(crate) fn apply(&self, generation: &mut GenerationConfig, engine: &mut EngineConfig) {
        fn set<T: Copy>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        set(&mut engine.rng_seed, self.seed);
        set(&mut engine.weapon_cooldown, self.rules.weapon_cooldown);
        set(&mut engine.sense_range, self.rules.sense_range);

        set(&mut generation.width, self.grid.width);
        set(&mut generation.height, self.grid.height);
        set(&mut generation.house_count, self.houses.count);
        set(&mut generation.house_width, self.houses.width);
        set(&mut generation.house_height, self.houses.height);
        set(&mut generation.house_attempts, self.houses.attempts);
        set(&mut generation.zombies, self.population.zombies);
        set(&mut generation.humans, self.population.humans);
        set(&mut generation.weapons, self.population.weapons);
        set(&mut generation.weapon_attempts, self.population.weapon_attempts);
    }
}
