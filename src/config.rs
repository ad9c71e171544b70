use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::DEFAULT_MAX_STEPS_PER_TURN;
use crate::renderer::TemplateMode;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Process configuration, loaded from the environment (with `.env` support).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Redis connection url for the durable state backend.
    pub redis_url: String,
    /// Fixed conversation TTL in seconds, refreshed on every write.
    pub redis_ttl_secs: u64,
    /// When false the process runs on the in-memory store only.
    pub use_redis: bool,
    /// Directory holding `<flow_id>.json` definitions.
    pub flows_dir: PathBuf,
    /// Flow used when the transport does not name one.
    pub default_flow_id: String,
    /// Placeholder convention the loaded flows use.
    pub template_mode: TemplateMode,
    /// Upper bound on auto-advanced steps per inbound turn. Guards against
    /// authored auto-advance cycles, which the engine does not detect.
    pub max_steps_per_turn: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379/0".to_string(),
            redis_ttl_secs: 3600,
            use_redis: true,
            flows_dir: PathBuf::from("flows"),
            default_flow_id: "demo".to_string(),
            template_mode: TemplateMode::SingleBrace,
            max_steps_per_turn: DEFAULT_MAX_STEPS_PER_TURN,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_ok() {
            info!("loaded environment from .env");
        }
        let defaults = Settings::default();
        let template_mode = match env::var("CHATFLOW_TEMPLATE_MODE").as_deref() {
            Ok("double_brace") => TemplateMode::DoubleBrace,
            Ok("single_brace") => TemplateMode::SingleBrace,
            _ => defaults.template_mode,
        };
        Self {
            redis_url: env::var("CHATFLOW_REDIS_URL").unwrap_or(defaults.redis_url),
            redis_ttl_secs: env_or("CHATFLOW_REDIS_TTL_SECS", defaults.redis_ttl_secs),
            use_redis: env_or("CHATFLOW_USE_REDIS", defaults.use_redis),
            flows_dir: env::var("CHATFLOW_FLOWS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.flows_dir),
            default_flow_id: env::var("CHATFLOW_DEFAULT_FLOW")
                .unwrap_or(defaults.default_flow_id),
            template_mode,
            max_steps_per_turn: env_or("CHATFLOW_MAX_STEPS", defaults.max_steps_per_turn),
        }
    }
}
