use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use std::fmt;

use focus_pose::constants::{DEFAULT_CALIBRATION_FRAMES, DEFAULT_FOCUS_THRESHOLD_DEG};
use focus_pose::SessionConfig;

use crate::constants::{
    DEFAULT_LANDMARK_TIMEOUT_SECS, DEFAULT_MAX_FRAME_BYTES, DEFAULT_MAX_WS_CONNECTIONS,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub cors_origin: String,
    pub focus: FocusConfig,
    pub landmarks: LandmarkConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct FocusConfig {
    pub calibration_frames: usize,
    pub threshold_deg: f64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            calibration_frames: DEFAULT_CALIBRATION_FRAMES,
            threshold_deg: DEFAULT_FOCUS_THRESHOLD_DEG,
        }
    }
}

impl FocusConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            calibration_frames: self.calibration_frames,
            threshold_deg: self.threshold_deg,
        }
    }
}

#[derive(Clone)]
pub struct LandmarkConfig {
    pub mock: bool,
    pub api_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub max_frame_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: DEFAULT_MAX_WS_CONNECTIONS,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl fmt::Debug for LandmarkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LandmarkConfig")
            .field("mock", &self.mock)
            .field("api_url", &self.api_url)
            .field("api_key", &"***REDACTED***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        let calibration_frames = env_or_parse("CALIBRATION_FRAMES", DEFAULT_CALIBRATION_FRAMES);
        let threshold_deg = env_or_parse("FOCUS_THRESHOLD_DEG", DEFAULT_FOCUS_THRESHOLD_DEG);

        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 8000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            cors_origin: env_or("CORS_ORIGIN", "*"),
            focus: FocusConfig {
                calibration_frames: if calibration_frames >= 1 {
                    calibration_frames
                } else {
                    tracing::warn!(calibration_frames, "CALIBRATION_FRAMES must be >= 1, using default");
                    DEFAULT_CALIBRATION_FRAMES
                },
                threshold_deg: if threshold_deg.is_finite() && threshold_deg > 0.0 {
                    threshold_deg
                } else {
                    tracing::warn!(threshold_deg, "FOCUS_THRESHOLD_DEG must be positive, using default");
                    DEFAULT_FOCUS_THRESHOLD_DEG
                },
            },
            landmarks: LandmarkConfig {
                mock: env_or_bool("LANDMARK_MOCK", true),
                api_url: env_or("LANDMARK_API_URL", ""),
                api_key: env_or("LANDMARK_API_KEY", ""),
                timeout_secs: env_or_parse("LANDMARK_TIMEOUT_SECS", DEFAULT_LANDMARK_TIMEOUT_SECS),
            },
            limits: LimitsConfig {
                max_ws_connections: env_or_parse("MAX_WS_CONNECTIONS", DEFAULT_MAX_WS_CONNECTIONS),
                max_frame_bytes: env_or_parse("MAX_FRAME_BYTES", DEFAULT_MAX_FRAME_BYTES),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn managed_keys() -> &'static [&'static str] {
        &[
            "HOST",
            "PORT",
            "RUST_LOG",
            "CORS_ORIGIN",
            "CALIBRATION_FRAMES",
            "FOCUS_THRESHOLD_DEG",
            "LANDMARK_MOCK",
            "LANDMARK_API_KEY",
            "LANDMARK_TIMEOUT_SECS",
            "MAX_WS_CONNECTIONS",
        ]
    }

    fn clear_keys(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.cors_origin, "*");
        assert_eq!(cfg.focus.calibration_frames, 10);
        assert_eq!(cfg.focus.threshold_deg, 40.0);
        assert!(cfg.landmarks.mock);
        assert_eq!(cfg.limits.max_ws_connections, DEFAULT_MAX_WS_CONNECTIONS);
    }

    #[test]
    fn parses_numeric_values() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "4000");
        env::set_var("CALIBRATION_FRAMES", "5");
        env::set_var("FOCUS_THRESHOLD_DEG", "25.5");
        env::set_var("MAX_WS_CONNECTIONS", "3");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.focus.calibration_frames, 5);
        assert_eq!(cfg.focus.threshold_deg, 25.5);
        assert_eq!(cfg.limits.max_ws_connections, 3);
        clear_keys(managed_keys());
    }

    #[test]
    fn invalid_values_fall_back() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "bad");
        env::set_var("CALIBRATION_FRAMES", "0");
        env::set_var("FOCUS_THRESHOLD_DEG", "-3");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.focus.calibration_frames, 10);
        assert_eq!(cfg.focus.threshold_deg, 40.0);
        clear_keys(managed_keys());
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("LANDMARK_MOCK", "off");
        env::set_var("LANDMARK_API_KEY", "super-secret-token");

        let cfg = Config::from_env();
        assert!(!cfg.landmarks.mock);
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("super-secret-token"));
        assert!(printed.contains("REDACTED"));
        clear_keys(managed_keys());
    }
}
