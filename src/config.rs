use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub go_bin: PathBuf,
    pub workspace_root: PathBuf,
    pub compile_timeout: Duration,
    pub run_timeout: Duration,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port: u16 = parse_env("PORT", 42069);
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            go_bin: PathBuf::from(env::var("GO_BIN").unwrap_or_else(|_| "go".to_string())),
            workspace_root: env::var("WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join("gobox")),
            compile_timeout: Duration::from_millis(parse_env("COMPILE_TIMEOUT_MS", 5_000)),
            run_timeout: Duration::from_millis(parse_env("RUN_TIMEOUT_MS", 10_000)),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
