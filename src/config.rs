use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use log::warn;

pub(crate) const PROMPT: &str = "ish> ";

const DEFAULT_HISTORY_FILE: &str = ".ish_history.jsonl";
const DEFAULT_SUGGEST_SOCKET: &str = "/tmp/shell_suggest.sock";
const DEFAULT_SUGGEST_PORT: u16 = 9999;
const DEFAULT_SUGGEST_TIMEOUT_MS: u64 = 150;
const DEFAULT_MODEL: &str = "Claude Haiku 4.5";

/// Shell configuration, resolved once at startup from the environment.
#[derive(Debug)]
pub struct Config {
    pub history_path: PathBuf,
    pub suggest_socket: PathBuf,
    pub suggest_addr: SocketAddr,
    pub suggest_timeout: Duration,
    pub model: String,
}

impl Config {
    /// Builds the configuration from `ISH_*` environment variables, falling
    /// back to the documented defaults. Malformed overrides are reported
    /// and ignored rather than refusing to start.
    pub fn from_env() -> Config {
        let history_path = env::var_os("ISH_HISTORY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_history_path);

        let suggest_socket = env::var_os("ISH_SUGGEST_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SUGGEST_SOCKET));

        let suggest_addr = parse_or_default(
            "ISH_SUGGEST_ADDR",
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_SUGGEST_PORT),
        );

        let timeout_ms = parse_or_default("ISH_SUGGEST_TIMEOUT_MS", DEFAULT_SUGGEST_TIMEOUT_MS);

        let model = env::var("ISH_SUGGEST_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Config {
            history_path,
            suggest_socket,
            suggest_addr,
            suggest_timeout: Duration::from_millis(timeout_ms),
            model,
        }
    }
}

fn default_history_path() -> PathBuf {
    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(DEFAULT_HISTORY_FILE),
        None => PathBuf::from(DEFAULT_HISTORY_FILE),
    }
}

fn parse_or_default<T: std::str::FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(value) => match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("ignoring malformed {}={:?}", var, value);
                default
            }
        },
        Err(_) => default,
    }
}
