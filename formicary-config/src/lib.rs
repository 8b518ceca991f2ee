//! Configuration loading and validation for the foraging simulation.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::{fs, io};

// --- Error Type ---

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

// --- Configuration Sections ---

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WorldSettings {
    /// Half side length of the square patrol area; ants beyond this box
    /// get turned back toward the origin.
    #[serde(default = "default_half_extent")]
    pub half_extent: f32,
}

fn default_half_extent() -> f32 {
    50.0
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            half_extent: default_half_extent(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ColonySettings {
    #[serde(default)]
    pub position: [f32; 3],
}

impl Default for ColonySettings {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
        }
    }
}

impl ColonySettings {
    pub fn position_vec(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InitialState {
    #[serde(default = "default_ant_count")]
    pub ants: u32,
    #[serde(default = "default_food_count")]
    pub food: u32,
}

fn default_ant_count() -> u32 {
    20
}
fn default_food_count() -> u32 {
    30
}

impl Default for InitialState {
    fn default() -> Self {
        Self {
            ants: default_ant_count(),
            food: default_food_count(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MovementSettings {
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,
    /// Linear ramp toward max speed, units per second squared.
    #[serde(default = "default_acceleration")]
    pub acceleration: f32,
    /// Speed an ant restarts at after a pickup or drop-off stop.
    #[serde(default = "default_restart_speed")]
    pub restart_speed: f32,
    /// Lerp fraction per second applied when turning toward the desired
    /// heading.
    #[serde(default = "default_turn_rate")]
    pub turn_rate: f32,
    /// Weight of the wander direction blended into the desired heading.
    #[serde(default = "default_jitter_weight")]
    pub jitter_weight: f32,
    /// Seconds between wander-heading retimings.
    #[serde(default = "default_wander_interval")]
    pub wander_interval: f32,
    #[serde(default = "default_max_wander_turn_degrees")]
    pub max_wander_turn_degrees: f32,
    /// Minimum seconds between boundary turnarounds.
    #[serde(default = "default_boundary_cooldown")]
    pub boundary_cooldown: f32,
}

fn default_max_speed() -> f32 {
    4.0
}
fn default_acceleration() -> f32 {
    2.0
}
fn default_restart_speed() -> f32 {
    1.0
}
fn default_turn_rate() -> f32 {
    2.0
}
fn default_jitter_weight() -> f32 {
    0.3
}
fn default_wander_interval() -> f32 {
    1.0
}
fn default_max_wander_turn_degrees() -> f32 {
    30.0
}
fn default_boundary_cooldown() -> f32 {
    2.0
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            max_speed: default_max_speed(),
            acceleration: default_acceleration(),
            restart_speed: default_restart_speed(),
            turn_rate: default_turn_rate(),
            jitter_weight: default_jitter_weight(),
            wander_interval: default_wander_interval(),
            max_wander_turn_degrees: default_max_wander_turn_degrees(),
            boundary_cooldown: default_boundary_cooldown(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SensorSettings {
    /// Sensor-cone centers in ant-local space (+z is forward).
    #[serde(default = "default_front_offset")]
    pub front_offset: [f32; 3],
    #[serde(default = "default_left_offset")]
    pub left_offset: [f32; 3],
    #[serde(default = "default_right_offset")]
    pub right_offset: [f32; 3],
    #[serde(default = "default_sensor_radius")]
    pub radius: f32,
}

fn default_front_offset() -> [f32; 3] {
    [0.0, 0.0, 2.0]
}
fn default_left_offset() -> [f32; 3] {
    [-1.5, 0.0, 1.5]
}
fn default_right_offset() -> [f32; 3] {
    [1.5, 0.0, 1.5]
}
fn default_sensor_radius() -> f32 {
    1.0
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            front_offset: default_front_offset(),
            left_offset: default_left_offset(),
            right_offset: default_right_offset(),
            radius: default_sensor_radius(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PheromoneSettings {
    /// Seconds of accumulated delta between trail deposits.
    #[serde(default = "default_drop_interval")]
    pub drop_interval: f32,
    /// Intensity lost per second; tuned for a multi-second trail lifetime.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f32,
    #[serde(default = "default_initial_intensity")]
    pub initial_intensity: f32,
}

fn default_drop_interval() -> f32 {
    0.5
}
fn default_decay_rate() -> f32 {
    0.05
}
fn default_initial_intensity() -> f32 {
    1.0
}

impl Default for PheromoneSettings {
    fn default() -> Self {
        Self {
            drop_interval: default_drop_interval(),
            decay_rate: default_decay_rate(),
            initial_intensity: default_initial_intensity(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ForagingSettings {
    #[serde(default = "default_detection_range")]
    pub detection_range: f32,
    #[serde(default = "default_pickup_range")]
    pub pickup_range: f32,
    /// Range at which a carrying ant locks onto the colony as its target.
    #[serde(default = "default_colony_detection_range")]
    pub colony_detection_range: f32,
    #[serde(default = "default_drop_off_range")]
    pub drop_off_range: f32,
}

fn default_detection_range() -> f32 {
    10.0
}
fn default_pickup_range() -> f32 {
    3.0
}
fn default_colony_detection_range() -> f32 {
    25.0
}
fn default_drop_off_range() -> f32 {
    5.0
}

impl Default for ForagingSettings {
    fn default() -> Self {
        Self {
            detection_range: default_detection_range(),
            pickup_range: default_pickup_range(),
            colony_detection_range: default_colony_detection_range(),
            drop_off_range: default_drop_off_range(),
        }
    }
}

// --- Top-Level Config Struct ---

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_framerate")]
    pub framerate: u32,
    #[serde(default)]
    pub world: WorldSettings,
    #[serde(default)]
    pub colony: ColonySettings,
    #[serde(default)]
    pub initial_state: InitialState,
    #[serde(default)]
    pub movement: MovementSettings,
    #[serde(default)]
    pub sensors: SensorSettings,
    #[serde(default)]
    pub pheromones: PheromoneSettings,
    #[serde(default)]
    pub foraging: ForagingSettings,
    /// Hard cap applied to the per-tick delta, so a long host pause does
    /// not teleport agents.
    #[serde(default = "default_max_delta")]
    pub max_delta: f32,
}

fn default_framerate() -> u32 {
    60
}
fn default_max_delta() -> f32 {
    0.25
}

impl Default for Config {
    fn default() -> Self {
        Self {
            framerate: default_framerate(),
            world: WorldSettings::default(),
            colony: ColonySettings::default(),
            initial_state: InitialState::default(),
            movement: MovementSettings::default(),
            sensors: SensorSettings::default(),
            pheromones: PheromoneSettings::default(),
            foraging: ForagingSettings::default(),
            max_delta: default_max_delta(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.framerate == 0 {
            return Err(ConfigError::Validation("framerate cannot be zero".into()));
        }
        if self.world.half_extent <= 0.0 {
            return Err(ConfigError::Validation(
                "world.half_extent must be positive".into(),
            ));
        }
        if self.foraging.pickup_range > self.foraging.detection_range {
            return Err(ConfigError::Validation(
                "foraging.pickup_range cannot exceed foraging.detection_range".into(),
            ));
        }
        if self.foraging.drop_off_range > self.foraging.colony_detection_range {
            return Err(ConfigError::Validation(
                "foraging.drop_off_range cannot exceed foraging.colony_detection_range".into(),
            ));
        }
        if self.pheromones.decay_rate <= 0.0 {
            return Err(ConfigError::Validation(
                "pheromones.decay_rate must be positive".into(),
            ));
        }
        if self.pheromones.drop_interval <= 0.0 {
            return Err(ConfigError::Validation(
                "pheromones.drop_interval must be positive".into(),
            ));
        }
        if self.movement.max_speed <= 0.0 {
            return Err(ConfigError::Validation(
                "movement.max_speed must be positive".into(),
            ));
        }
        if self.movement.acceleration < 0.0 {
            return Err(ConfigError::Validation(
                "movement.acceleration cannot be negative".into(),
            ));
        }
        if self.movement.restart_speed < 0.0 {
            return Err(ConfigError::Validation(
                "movement.restart_speed cannot be negative".into(),
            ));
        }
        if self.movement.wander_interval <= 0.0 {
            return Err(ConfigError::Validation(
                "movement.wander_interval must be positive".into(),
            ));
        }
        if self.movement.max_wander_turn_degrees < 0.0 {
            return Err(ConfigError::Validation(
                "movement.max_wander_turn_degrees cannot be negative".into(),
            ));
        }
        if self.sensors.radius <= 0.0 {
            return Err(ConfigError::Validation(
                "sensors.radius must be positive".into(),
            ));
        }
        if self.max_delta <= 0.0 {
            return Err(ConfigError::Validation(
                "max_delta must be positive".into(),
            ));
        }
        Ok(())
    }
}

// --- Loading Function ---

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
