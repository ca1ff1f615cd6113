//! Configuration Vault – reads/writes `~/.torque/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use torque_hal::SimPlantConfig;
use torque_runtime::{DriveTrainConfig, NavigationConfig, RobotSettings};

/// Persisted robot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Control loop period in milliseconds.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,

    /// Upper bound on ticks per run; the run ends there even if the routine
    /// has not finished.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    #[serde(default)]
    pub drive: DriveTrainConfig,

    #[serde(default)]
    pub odometry: OdometrySection,

    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub sim: SimSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometrySection {
    #[serde(default = "default_odometry_device")]
    pub device: String,
}

/// Plant limits for the simulated base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSection {
    #[serde(default = "default_max_speed")]
    pub max_speed_mm_per_sec: f64,
    #[serde(default = "default_max_turn")]
    pub max_turn_deg_per_sec: f64,
}

fn default_tick_period_ms() -> u64 {
    20
}
fn default_max_ticks() -> u64 {
    3000
}
fn default_odometry_device() -> String {
    "odo".to_string()
}
fn default_max_speed() -> f64 {
    600.0
}
fn default_max_turn() -> f64 {
    180.0
}

impl Default for OdometrySection {
    fn default() -> Self {
        Self {
            device: default_odometry_device(),
        }
    }
}

impl Default for SimSection {
    fn default() -> Self {
        Self {
            max_speed_mm_per_sec: default_max_speed(),
            max_turn_deg_per_sec: default_max_turn(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period_ms(),
            max_ticks: default_max_ticks(),
            drive: DriveTrainConfig::default(),
            odometry: OdometrySection::default(),
            navigation: NavigationConfig::default(),
            sim: SimSection::default(),
        }
    }
}

impl Config {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms.max(1))
    }

    pub fn robot_settings(&self) -> RobotSettings {
        RobotSettings {
            drive: self.drive.clone(),
            odometry_device: self.odometry.device.clone(),
            navigation: self.navigation,
        }
    }

    /// The sim plant integrates one control period per odometry poll.
    pub fn plant_config(&self) -> SimPlantConfig {
        SimPlantConfig {
            max_speed_mm_per_sec: self.sim.max_speed_mm_per_sec,
            max_turn_deg_per_sec: self.sim.max_turn_deg_per_sec,
            step: self.tick_period(),
        }
    }
}

/// Return the path to `~/.torque/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".torque").join("config.toml")
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `TORQUE_*` environment variable overrides to `cfg`.  Values that do
/// not parse are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `TORQUE_TICK_MS` | `tick_period_ms` |
/// | `TORQUE_MAX_TICKS` | `max_ticks` |
/// | `TORQUE_DRIVE_GAIN` | `navigation.drive_gain` |
/// | `TORQUE_ROTATION_GAIN` | `navigation.rotation_gain` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("TORQUE_TICK_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.tick_period_ms = ms;
    }
    if let Ok(v) = std::env::var("TORQUE_MAX_TICKS")
        && let Ok(n) = v.trim().parse::<u64>()
    {
        cfg.max_ticks = n;
    }
    if let Ok(v) = std::env::var("TORQUE_DRIVE_GAIN")
        && let Ok(gain) = v.trim().parse::<f64>()
    {
        cfg.navigation.drive_gain = gain;
    }
    if let Ok(v) = std::env::var("TORQUE_ROTATION_GAIN")
        && let Ok(gain) = v.trim().parse::<f64>()
    {
        cfg.navigation.rotation_gain = gain;
    }
}

/// Save the config to a specific path, creating its directory if necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.drive.front_left, "motor_front_left");
        assert_eq!(loaded.drive.limits.slew_rate_per_sec, 0.5);
        assert_eq!(loaded.navigation.position_threshold, 0.1);
        assert_eq!(loaded.odometry.device, "odo");
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .expect("meta")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("torque.toml");
        std::fs::write(
            &path,
            "max_ticks = 10\n\n[drive]\nslew_rate_per_sec = 2.0\n\n[navigation]\nposition_threshold = 15.0\n",
        )
        .unwrap();

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.max_ticks, 10);
        assert_eq!(cfg.drive.limits.slew_rate_per_sec, 2.0);
        assert_eq!(cfg.drive.limits.dead_zone, 0.05);
        assert_eq!(cfg.navigation.position_threshold, 15.0);
        assert_eq!(cfg.navigation.heading_threshold, 1.0);
        assert_eq!(cfg.sim.max_speed_mm_per_sec, 600.0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("torque.toml");
        std::fs::write(&path, "tick_period_ms = \"fast\"").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(err.starts_with("Failed to parse config"));
    }

    #[test]
    fn config_path_points_to_torque_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".torque"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn settings_and_plant_follow_config() {
        let mut cfg = Config::default();
        cfg.tick_period_ms = 10;
        cfg.odometry.device = "pinpoint".into();
        cfg.sim.max_speed_mm_per_sec = 1200.0;

        let settings = cfg.robot_settings();
        assert_eq!(settings.odometry_device, "pinpoint");
        let plant = cfg.plant_config();
        assert_eq!(plant.step, Duration::from_millis(10));
        assert_eq!(plant.max_speed_mm_per_sec, 1200.0);
    }

    #[test]
    fn apply_env_overrides_changes_tick_period() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("TORQUE_TICK_MS", "50") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.tick_period_ms, 50);
        unsafe { std::env::remove_var("TORQUE_TICK_MS") };
    }

    #[test]
    fn apply_env_overrides_changes_gains() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe {
            std::env::set_var("TORQUE_DRIVE_GAIN", "0.02");
            std::env::set_var("TORQUE_ROTATION_GAIN", "0.03");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.navigation.drive_gain, 0.02);
        assert_eq!(cfg.navigation.rotation_gain, 0.03);
        unsafe {
            std::env::remove_var("TORQUE_DRIVE_GAIN");
            std::env::remove_var("TORQUE_ROTATION_GAIN");
        }
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_max_ticks() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("TORQUE_MAX_TICKS", "forever") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.max_ticks, 3000);
        unsafe { std::env::remove_var("TORQUE_MAX_TICKS") };
    }
}
