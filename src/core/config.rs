//! Colony configuration with documented constants
//!
//! All tunable numbers live here. The defaults reproduce the pacing of the
//! original hive game: a worker lives roughly 1000 seconds without eating,
//! a larva fed at stage 4 needs 80 seconds to digest its meal, and a flower
//! appears in the field every five seconds.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{ColonyError, Result};
use crate::core::types::{CellKind, Resource, Role};

/// How much of each resource one agent can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryLimits {
    pub nectar: u32,
    pub water: u32,
    pub honey: u32,
}

impl CarryLimits {
    pub fn of(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Nectar => self.nectar,
            Resource::Water => self.water,
            Resource::Honey => self.honey,
        }
    }
}

/// Geometry and pacing of the forage field outside the hive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub width: f32,
    pub height: f32,

    /// Hive entrance; foragers return here and newborn foragers leave from here
    pub base_x: f32,
    /// Distance of the hive entrance above the bottom of the field
    pub base_height: f32,

    /// A new flower appears this often (ms)
    pub flower_interval_ms: f32,
    /// Unclaimed flowers wither after this long (ms)
    pub flower_lifetime_ms: f32,
    /// Foragers notice a flower inside this radius
    pub aura_radius: f32,
    /// Flowers never spawn left of this x (keeps them away from the hive tree)
    pub flower_min_x: f32,

    /// Fraction of the width treated as an edge when wandering
    pub edge_bias: f32,
    /// Foragers above this fraction of the height are nudged back down
    pub flight_band: f32,
    /// Wandering foragers pick a new heading after a random interval in this range (ms)
    pub wander_min_ms: i32,
    pub wander_max_ms: i32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            base_x: 190.0,
            base_height: 140.0,
            flower_interval_ms: 5000.0,
            flower_lifetime_ms: 45000.0,
            aura_radius: 50.0,
            flower_min_x: 200.0,
            edge_bias: 0.05,
            flight_band: 0.8,
            wander_min_ms: 1000,
            wander_max_ms: 3000,
        }
    }
}

/// Comb grid generated when a colony is founded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HiveLayout {
    pub rows: u32,
    pub cols: u32,
    /// Horizontal pitch between cell origins (cell width plus gap)
    pub cell_pitch: f32,
    pub cell_height: f32,
    /// Space above the first row reserved for the status bar
    pub top_margin: f32,

    /// Percent chances (must sum to 100) for honey, nectar, water; brood takes the rest
    pub honey_percent: u32,
    pub nectar_percent: u32,
    pub water_percent: u32,

    /// Cells of each kind activated at founding
    pub initial_active_per_kind: usize,
    pub initial_workers: usize,
    pub initial_foragers: usize,
}

impl Default for HiveLayout {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 22,
            cell_pitch: 56.0,
            cell_height: 52.0,
            top_margin: 105.0,
            honey_percent: 30,
            nectar_percent: 30,
            water_percent: 15,
            initial_active_per_kind: 2,
            initial_workers: 2,
            initial_foragers: 2,
        }
    }
}

/// Configuration for one colony session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColonyConfig {
    // === ENERGY ===
    /// Energy of a freshly spawned agent and the ceiling for eating
    pub max_energy: f32,

    /// Energy lost per second by workers
    ///
    /// At 0.1/s a full worker starves after about 1000 seconds.
    pub worker_energy_decay: f32,

    /// Energy lost per second by foragers
    ///
    /// Foragers never eat in the hive, so this defaults to zero.
    pub forager_energy_decay: f32,

    /// Fraction of max energy at or below which a worker goes to eat
    pub eat_threshold: f32,

    /// Energy paid on every arrival at a travel target
    pub travel_cost: f32,

    /// Most honey units eaten in one meal
    pub meal_size: u32,

    /// Energy restored per honey unit eaten
    pub energy_per_honey: f32,

    // === CARRYING ===
    pub worker_capacity: CarryLimits,
    pub forager_capacity: CarryLimits,

    /// Nectar a worker gathers before making honey; it also gathers half this much water
    pub honey_yield_threshold: u32,

    /// Upper bound of the random nectar a forager takes from one flower
    pub forager_nectar_yield: u32,
    /// Upper bound of the random water a forager takes from one flower
    pub forager_water_yield: u32,

    // === CELLS ===
    pub nectar_capacity: u32,
    pub water_capacity: u32,
    pub honey_capacity: u32,

    /// Amount added by one player deposit
    pub player_deposit_unit: u32,

    // === BROOD ===
    /// Stages a larva passes through; advancing past this spawns an agent
    pub brood_max_stage: u8,

    /// Honey a larva needs per stage (required = stage * this)
    pub honey_per_stage: u32,

    /// Digestion time per nutrient unit (ms)
    pub nutrient_ms: f32,

    /// Probability that a hatchling is a worker rather than a forager
    pub worker_spawn_share: f32,

    // === TIMING ===
    /// Time honey matures in its cell before the worker deposits it (ms)
    pub maturation_ms: f32,

    /// Time a forager lingers on a flower after collecting (ms)
    pub collect_delay_ms: f32,

    // === LOCOMOTION (autopilot only) ===
    pub worker_speed: f32,
    pub forager_speed: f32,

    /// Pause after a worker reaches a cell, before the step resolves (ms)
    pub arrival_settle_ms: f32,

    /// Time the hive-side deposit sequence of a returning forager takes (ms)
    pub deposit_sequence_ms: f32,

    pub field: FieldConfig,
    pub layout: HiveLayout,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            max_energy: 100.0,
            worker_energy_decay: 0.1,
            forager_energy_decay: 0.0,
            eat_threshold: 0.2,
            travel_cost: 3.0,
            meal_size: 10,
            energy_per_honey: 10.0,

            worker_capacity: CarryLimits {
                nectar: 2,
                water: 1,
                honey: 10,
            },
            forager_capacity: CarryLimits {
                nectar: 5,
                water: 3,
                honey: 0,
            },
            honey_yield_threshold: 2,
            forager_nectar_yield: 6,
            forager_water_yield: 3,

            nectar_capacity: 40,
            water_capacity: 30,
            honey_capacity: 40,
            player_deposit_unit: 1,

            brood_max_stage: 4,
            honey_per_stage: 2,
            nutrient_ms: 10000.0,
            worker_spawn_share: 0.5,

            maturation_ms: 5000.0,
            collect_delay_ms: 1000.0,

            worker_speed: 150.0,
            forager_speed: 50.0,
            arrival_settle_ms: 500.0,
            deposit_sequence_ms: 3000.0,

            field: FieldConfig::default(),
            layout: HiveLayout::default(),
        }
    }
}

impl ColonyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ColonyConfig =
            toml::from_str(content).map_err(|e| ColonyError::ConfigLoad(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ColonyError::ConfigLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn capacity_of(&self, kind: CellKind) -> u32 {
        match kind {
            CellKind::Nectar => self.nectar_capacity,
            CellKind::Water => self.water_capacity,
            CellKind::Honey => self.honey_capacity,
            CellKind::Brood => 0,
        }
    }

    pub fn carry_limits(&self, role: Role) -> &CarryLimits {
        match role {
            Role::Worker => &self.worker_capacity,
            Role::Forager => &self.forager_capacity,
        }
    }

    pub fn energy_decay(&self, role: Role) -> f32 {
        match role {
            Role::Worker => self.worker_energy_decay,
            Role::Forager => self.forager_energy_decay,
        }
    }

    /// Energy at or below which a worker is hungry
    pub fn hunger_line(&self) -> f32 {
        self.max_energy * self.eat_threshold
    }

    /// Water a worker gathers per batch of honey
    pub fn water_per_batch(&self) -> u32 {
        self.honey_yield_threshold / 2
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_energy <= 0.0 {
            return Err(ColonyError::InvalidConfig("max_energy must be positive".into()));
        }

        if self.worker_energy_decay < 0.0 || self.forager_energy_decay < 0.0 {
            return Err(ColonyError::InvalidConfig(
                "energy decay rates must not be negative".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.eat_threshold) {
            return Err(ColonyError::InvalidConfig(format!(
                "eat_threshold ({}) must be a fraction in [0, 1]",
                self.eat_threshold
            )));
        }

        if !(0.0..=1.0).contains(&self.worker_spawn_share) {
            return Err(ColonyError::InvalidConfig(format!(
                "worker_spawn_share ({}) must be a probability",
                self.worker_spawn_share
            )));
        }

        if self.worker_capacity.nectar < self.honey_yield_threshold
            || self.worker_capacity.water < self.water_per_batch()
        {
            return Err(ColonyError::InvalidConfig(format!(
                "worker capacity ({} nectar, {} water) cannot hold a honey batch ({} nectar, {} water)",
                self.worker_capacity.nectar,
                self.worker_capacity.water,
                self.honey_yield_threshold,
                self.water_per_batch()
            )));
        }

        let largest_meal = u32::from(self.brood_max_stage) * self.honey_per_stage;
        if self.worker_capacity.honey < largest_meal {
            return Err(ColonyError::InvalidConfig(format!(
                "worker honey capacity ({}) is below the largest larva meal ({})",
                self.worker_capacity.honey, largest_meal
            )));
        }

        if self.forager_capacity.honey != 0 {
            return Err(ColonyError::InvalidConfig(
                "foragers cannot carry honey".into(),
            ));
        }

        if self.brood_max_stage == 0 {
            return Err(ColonyError::InvalidConfig("brood_max_stage must be at least 1".into()));
        }

        if self.worker_speed <= 0.0 || self.forager_speed <= 0.0 {
            return Err(ColonyError::InvalidConfig("speeds must be positive".into()));
        }

        let layout = &self.layout;
        if layout.honey_percent + layout.nectar_percent + layout.water_percent > 100 {
            return Err(ColonyError::InvalidConfig(
                "layout percentages exceed 100".into(),
            ));
        }

        if self.field.wander_min_ms > self.field.wander_max_ms {
            return Err(ColonyError::InvalidConfig(
                "wander_min_ms must not exceed wander_max_ms".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ColonyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_hunger_line_and_batch() {
        let config = ColonyConfig::default();
        assert!((config.hunger_line() - 20.0).abs() < 0.001);
        assert_eq!(config.water_per_batch(), 1);
        assert_eq!(config.capacity_of(CellKind::Water), 30);
        assert_eq!(config.carry_limits(Role::Forager).honey, 0);
    }

    #[test]
    fn test_rejects_forager_honey() {
        let mut config = ColonyConfig::default();
        config.forager_capacity.honey = 2;
        assert!(matches!(config.validate(), Err(ColonyError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_small_worker_honey_capacity() {
        let mut config = ColonyConfig::default();
        config.worker_capacity.honey = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ColonyConfig::from_toml_str(
            r#"
            max_energy = 120.0
            honey_capacity = 60

            [field]
            flower_interval_ms = 2500.0
            "#,
        )
        .unwrap();

        assert!((config.max_energy - 120.0).abs() < 0.001);
        assert_eq!(config.honey_capacity, 60);
        assert_eq!(config.nectar_capacity, 40);
        assert!((config.field.flower_interval_ms - 2500.0).abs() < 0.001);
        assert_eq!(config.layout.rows, 10);
    }

    #[test]
    fn test_bad_toml_is_config_load_error() {
        let err = ColonyConfig::from_toml_str("max_energy = \"lots\"").unwrap_err();
        assert!(matches!(err, ColonyError::ConfigLoad(_)));
    }

    #[test]
    fn test_invalid_values_rejected_on_parse() {
        let err = ColonyConfig::from_toml_str("eat_threshold = 1.5").unwrap_err();
        assert!(matches!(err, ColonyError::InvalidConfig(_)));
    }
}
