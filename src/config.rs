/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub simulation: SimulationConfig,
    pub gamepad: GamepadConfig,
    pub logging: LoggingConfig,
    /// Directory holding `*.level.json`, `basics.json` and map files.
    pub data_dir: PathBuf,
    pub start_level: u32,
}

#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub action_interval: Duration,
    pub ticks_interval: Duration,
    pub frame_sleep_ms: u64,
    /// Fixed seed for reproducible runs; drawn at startup when absent.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub restart: Vec<String>,
    pub respawn: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
    pub file: PathBuf,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    simulation: TomlSimulation,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    logging: TomlLogging,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSimulation {
    #[serde(default = "default_action_interval")]
    action_interval_ms: u64,
    #[serde(default = "default_ticks_interval")]
    ticks_interval_ms: u64,
    #[serde(default = "default_frame_sleep")]
    frame_sleep_ms: u64,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_respawn")]
    respawn: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlLogging {
    #[serde(default = "default_log_filter")]
    filter: String,
    #[serde(default = "default_log_file")]
    file: String,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_data_dir")]
    data_dir: String,
    #[serde(default = "default_start_level")]
    start_level: u32,
}

// ── Defaults ──

fn default_action_interval() -> u64 { 100 }
fn default_ticks_interval() -> u64 { 100 }
fn default_frame_sleep() -> u64 { 16 }

fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_restart() -> Vec<String> { vec!["Y".into()] }
fn default_respawn() -> Vec<String> { vec!["X".into()] }

fn default_log_filter() -> String { "info".into() }
fn default_log_file() -> String { "gameone.log".into() }

fn default_data_dir() -> String { "data".into() }
fn default_start_level() -> u32 { 1 }

impl Default for TomlSimulation {
    fn default() -> Self {
        TomlSimulation {
            action_interval_ms: default_action_interval(),
            ticks_interval_ms: default_ticks_interval(),
            frame_sleep_ms: default_frame_sleep(),
            seed: None,
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
            restart: default_restart(),
            respawn: default_respawn(),
        }
    }
}

impl Default for TomlLogging {
    fn default() -> Self {
        TomlLogging {
            filter: default_log_filter(),
            file: default_log_file(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            data_dir: default_data_dir(),
            start_level: default_start_level(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) XDG data home.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let Some(text) = read_config_text(&search_dirs) else {
            return GameConfig::from_toml(TomlConfig::default(), &search_dirs);
        };
        GameConfig::from_toml_str(&text, &search_dirs).unwrap_or_else(|e| {
            eprintln!("Warning: config.toml parse error: {e}");
            eprintln!("Using default settings.");
            GameConfig::from_toml(TomlConfig::default(), &search_dirs)
        })
    }

    /// Parse config text. A relative `data_dir` resolves against the first
    /// of `search_dirs` that contains it.
    pub fn from_toml_str(text: &str, search_dirs: &[PathBuf]) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(toml_cfg, search_dirs))
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Resolve data directory
        let data_dir_str = &toml_cfg.general.data_dir;
        let data_dir = if PathBuf::from(data_dir_str).is_absolute() {
            PathBuf::from(data_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(data_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(data_dir_str))
        };

        GameConfig {
            simulation: SimulationConfig {
                action_interval: Duration::from_millis(toml_cfg.simulation.action_interval_ms),
                ticks_interval: Duration::from_millis(toml_cfg.simulation.ticks_interval_ms),
                frame_sleep_ms: toml_cfg.simulation.frame_sleep_ms,
                seed: toml_cfg.simulation.seed,
            },
            gamepad: GamepadConfig {
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
                restart: toml_cfg.gamepad.restart,
                respawn: toml_cfg.gamepad.respawn,
            },
            logging: LoggingConfig {
                filter: toml_cfg.logging.filter,
                file: PathBuf::from(toml_cfg.logging.file),
            },
            data_dir,
            start_level: toml_cfg.general.start_level,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[PathBuf::from(".")])
    }
}

/// Candidate directories to search: exe dir + CWD + XDG data home (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/gameone)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/gameone");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Text of the first readable config.toml in the candidate directories.
/// Runs before logging is up, so problems go to stderr.
fn read_config_text(search_dirs: &[PathBuf]) -> Option<String> {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return Some(text),
                Err(e) => eprintln!("Warning: could not read {}: {e}", path.display()),
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = GameConfig::from_toml_str("", &[PathBuf::from("/nonexistent")]).unwrap();
        assert_eq!(cfg.simulation.action_interval, Duration::from_millis(100));
        assert_eq!(cfg.simulation.ticks_interval, Duration::from_millis(100));
        assert_eq!(cfg.simulation.seed, None);
        assert_eq!(cfg.start_level, 1);
        assert_eq!(cfg.logging.filter, "info");
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let text = "[simulation]\naction_interval_ms = 250\nseed = 7\n\n[general]\nstart_level = 2\n";
        let cfg = GameConfig::from_toml_str(text, &[PathBuf::from("/nonexistent")]).unwrap();
        assert_eq!(cfg.simulation.action_interval, Duration::from_millis(250));
        assert_eq!(cfg.simulation.ticks_interval, Duration::from_millis(100));
        assert_eq!(cfg.simulation.seed, Some(7));
        assert_eq!(cfg.start_level, 2);
        assert_eq!(cfg.gamepad.respawn, vec!["X".to_string()]);
    }

    #[test]
    fn relative_data_dir_resolves_against_existing_base() {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir(base.path().join("levels")).unwrap();
        let text = "[general]\ndata_dir = \"levels\"\n";
        let cfg = GameConfig::from_toml_str(text, &[base.path().to_path_buf()]).unwrap();
        assert_eq!(cfg.data_dir, base.path().join("levels"));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(GameConfig::from_toml_str("[simulation", &[PathBuf::from(".")]).is_err());
    }
}
