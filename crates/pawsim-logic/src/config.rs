//! Designer-tunable simulation constants.
//!
//! All probabilities, intervals and thresholds used by the behavior core
//! live here rather than in the code that consumes them. Every section
//! deserializes with `#[serde(default)]`, so a config file only needs to
//! name the values it overrides.
//!
//! ```
//! use pawsim_logic::config::{validate_config, SimConfig};
//!
//! let config = SimConfig::from_json(r#"{ "detection": { "attraction_chance": 1.0 } }"#).unwrap();
//! assert_eq!(config.detection.attraction_chance, 1.0);
//! assert!(validate_config(&config).is_empty());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Navigation executor tuning (seconds and world units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Minimum time between path requests caused by target movement.
    pub repath_interval: f32,
    /// Target displacement that counts as "moved" for re-pathing.
    pub target_move_epsilon: f32,
    /// Per-tick displacement below which the agent counts as stationary.
    pub stuck_move_threshold: f32,
    /// Stationary time before a forced re-path.
    pub stuck_timeout: f32,
    /// Extra tolerance added to the planner's stopping distance.
    pub arrival_radius: f32,
    /// Allowed disagreement between planner distance and straight-line distance.
    pub arrival_slack: f32,
    /// Consecutive premature arrivals tolerated before navigation fails.
    pub max_desync_recoveries: u32,
    pub walk_speed: f32,
    pub run_speed: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            repath_interval: 0.5,
            target_move_epsilon: 0.05,
            stuck_move_threshold: 0.01,
            stuck_timeout: 0.5,
            arrival_radius: 0.2,
            arrival_slack: 0.2,
            max_desync_recoveries: 5,
            walk_speed: 3.0,
            run_speed: 4.0,
        }
    }
}

/// Toy detection throttling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub radius: f32,
    /// Probability (0-1) that a successful scan attracts the pet.
    pub attraction_chance: f32,
    /// Minimum seconds between scans.
    pub check_interval: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            radius: 5.0,
            attraction_chance: 0.4,
            check_interval: 1.5,
        }
    }
}

/// Interaction sequence timings and boredom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Time spent in `Attracted` before committing (T1).
    pub attract_duration: f32,
    /// Time spent interacting with a toy (T2).
    pub interact_duration: f32,
    /// Rest period after an interaction (T3). Zero skips `Cooldown`.
    pub cooldown_duration: f32,
    /// Chance (0-1) of becoming bored after a completed interaction.
    pub boredom_chance: f32,
    /// Seconds until a bored pet recovers.
    pub boredom_recovery: f32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            attract_duration: 2.5,
            interact_duration: 4.0,
            cooldown_duration: 3.0,
            boredom_chance: 0.3,
            boredom_recovery: 120.0,
        }
    }
}

/// Energy and satiety rates. Values are on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedsConfig {
    /// Energy lost per second while awake.
    pub energy_decay: f32,
    /// Energy regained per second while sleeping.
    pub energy_recovery: f32,
    /// Satiety lost per second.
    pub satiety_decay: f32,
    pub tired_threshold: f32,
    pub hungry_threshold: f32,
    /// Energy at which a sleeping pet gets up.
    pub wake_threshold: f32,
    /// Length of a meal in seconds.
    pub eating_duration: f32,
    /// Radius searched for beds and food.
    pub search_radius: f32,
}

impl Default for NeedsConfig {
    fn default() -> Self {
        Self {
            energy_decay: 1.0,
            energy_recovery: 2.0,
            satiety_decay: 0.5,
            tired_threshold: 5.0,
            hungry_threshold: 5.0,
            wake_threshold: 100.0,
            eating_duration: 3.0,
            search_radius: 50.0,
        }
    }
}

/// Idle wandering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanderConfig {
    pub enabled: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Pause between wander legs.
    pub pause: f32,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_distance: 1.5,
            max_distance: 6.0,
            pause: 2.0,
        }
    }
}

/// Surface rebuild scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebakeConfig {
    /// Delay between the first request and the build.
    pub debounce: f32,
}

impl Default for RebakeConfig {
    fn default() -> Self {
        Self { debounce: 1.0 }
    }
}

/// Walkable area of the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: f32,
    pub depth: f32,
    pub cell_size: f32,
    pub stopping_distance: f32,
    /// Ticks a new path stays pending before agents can follow it.
    pub planning_delay_ticks: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 24.0,
            depth: 16.0,
            cell_size: 0.25,
            stopping_distance: 0.1,
            planning_delay_ticks: 1,
        }
    }
}

/// Complete simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub navigation: NavigationConfig,
    pub detection: DetectionConfig,
    pub behavior: BehaviorConfig,
    pub needs: NeedsConfig,
    pub wander: WanderConfig,
    pub rebake: RebakeConfig,
    pub surface: SurfaceConfig,
    /// Seed for the simulation RNG. `None` picks one from entropy.
    pub seed: Option<u64>,
}

impl SimConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        let errors = validate_config(&config);
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

fn check_probability(errors: &mut Vec<String>, name: &str, value: f32) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(format!("{} must be within 0..=1 (got {})", name, value));
    }
}

fn check_positive(errors: &mut Vec<String>, name: &str, value: f32) {
    if value.is_nan() || value <= 0.0 {
        errors.push(format!("{} must be positive (got {})", name, value));
    }
}

fn check_non_negative(errors: &mut Vec<String>, name: &str, value: f32) {
    if value.is_nan() || value < 0.0 {
        errors.push(format!("{} must not be negative (got {})", name, value));
    }
}

/// Validate a config. Returns a list of problems (empty = valid).
pub fn validate_config(config: &SimConfig) -> Vec<String> {
    let mut errors = Vec::new();

    let nav = &config.navigation;
    check_positive(&mut errors, "navigation.repath_interval", nav.repath_interval);
    check_non_negative(&mut errors, "navigation.target_move_epsilon", nav.target_move_epsilon);
    check_non_negative(&mut errors, "navigation.stuck_move_threshold", nav.stuck_move_threshold);
    check_positive(&mut errors, "navigation.stuck_timeout", nav.stuck_timeout);
    check_non_negative(&mut errors, "navigation.arrival_radius", nav.arrival_radius);
    check_non_negative(&mut errors, "navigation.arrival_slack", nav.arrival_slack);
    check_positive(&mut errors, "navigation.walk_speed", nav.walk_speed);
    check_positive(&mut errors, "navigation.run_speed", nav.run_speed);

    check_positive(&mut errors, "detection.radius", config.detection.radius);
    check_probability(&mut errors, "detection.attraction_chance", config.detection.attraction_chance);
    check_non_negative(&mut errors, "detection.check_interval", config.detection.check_interval);

    let behavior = &config.behavior;
    check_non_negative(&mut errors, "behavior.attract_duration", behavior.attract_duration);
    check_non_negative(&mut errors, "behavior.interact_duration", behavior.interact_duration);
    check_non_negative(&mut errors, "behavior.cooldown_duration", behavior.cooldown_duration);
    check_probability(&mut errors, "behavior.boredom_chance", behavior.boredom_chance);
    check_non_negative(&mut errors, "behavior.boredom_recovery", behavior.boredom_recovery);

    let needs = &config.needs;
    check_non_negative(&mut errors, "needs.energy_decay", needs.energy_decay);
    check_positive(&mut errors, "needs.energy_recovery", needs.energy_recovery);
    check_non_negative(&mut errors, "needs.satiety_decay", needs.satiety_decay);
    check_positive(&mut errors, "needs.eating_duration", needs.eating_duration);
    if needs.wake_threshold <= needs.tired_threshold {
        errors.push("needs.wake_threshold must exceed needs.tired_threshold".to_string());
    }

    if config.wander.min_distance > config.wander.max_distance {
        errors.push("wander.min_distance must not exceed wander.max_distance".to_string());
    }
    check_non_negative(&mut errors, "wander.pause", config.wander.pause);

    check_non_negative(&mut errors, "rebake.debounce", config.rebake.debounce);

    let surface = &config.surface;
    check_positive(&mut errors, "surface.width", surface.width);
    check_positive(&mut errors, "surface.depth", surface.depth);
    check_positive(&mut errors, "surface.cell_size", surface.cell_size);
    check_non_negative(&mut errors, "surface.stopping_distance", surface.stopping_distance);

    errors
}
