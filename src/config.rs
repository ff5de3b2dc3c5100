use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;
const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;
pub const CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";
pub const DEFAULT_USAGE_ENDPOINT: &str = "https://api.anthropic.com/api/oauth/usage";
pub const CREDENTIALS_FILE_NAME: &str = ".credentials.json";
pub const CACHE_FILE_NAME: &str = ".statusline-cache.json";
const FALLBACK_CACHE_FILE_NAME: &str = "claude-statusline-cache.json";

/// Everything the usage subsystem needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct StatuslineConfig {
    /// `None` when neither the override nor a home directory resolves.
    pub config_dir: Option<PathBuf>,
    pub cache_path: PathBuf,
    pub cache_ttl: Duration,
    pub endpoint: String,
    pub timeout: Duration,
}

impl StatuslineConfig {
    pub fn from_env() -> Self {
        let config_dir = resolve_config_dir(env::var_os(CONFIG_DIR_ENV), dirs::home_dir());
        Self {
            cache_path: cache_path_for(config_dir.as_deref()),
            config_dir,
            cache_ttl: Duration::from_secs(env_u64(
                "CLAUDE_STATUSLINE_CACHE_TTL_SECONDS",
                DEFAULT_CACHE_TTL_SECONDS,
            )),
            endpoint: DEFAULT_USAGE_ENDPOINT.to_string(),
            timeout: Duration::from_secs(env_u64(
                "CLAUDE_STATUSLINE_TIMEOUT_SECONDS",
                DEFAULT_FETCH_TIMEOUT_SECONDS,
            )),
        }
    }

    pub fn for_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            cache_path: cache_path_for(Some(&dir)),
            config_dir: Some(dir),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            endpoint: DEFAULT_USAGE_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
        }
    }

    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.config_dir
            .as_ref()
            .map(|dir| dir.join(CREDENTIALS_FILE_NAME))
    }
}

pub fn resolve_config_dir(
    override_dir: Option<OsString>,
    home: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(custom) = override_dir {
        match custom.to_str() {
            Some(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    return Some(PathBuf::from(trimmed));
                }
            }
            // Not UTF-8: taken verbatim.
            None => return Some(PathBuf::from(custom)),
        }
    }

    home.map(|home| home.join(".claude"))
}

pub fn cache_path_for(config_dir: Option<&Path>) -> PathBuf {
    match config_dir {
        Some(dir) => dir.join(CACHE_FILE_NAME),
        None => env::temp_dir().join(FALLBACK_CACHE_FILE_NAME),
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    const CACHE_TTL_ENV: &str = "CLAUDE_STATUSLINE_CACHE_TTL_SECONDS";
    const TIMEOUT_ENV: &str = "CLAUDE_STATUSLINE_TIMEOUT_SECONDS";

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn override_dir_wins_over_home() {
        let dir = resolve_config_dir(
            Some(OsString::from("/opt/claude")),
            Some(PathBuf::from("/home/me")),
        );
        assert_eq!(dir, Some(PathBuf::from("/opt/claude")));
    }

    #[test]
    fn blank_override_falls_back_to_home() {
        let dir = resolve_config_dir(Some(OsString::from("   ")), Some(PathBuf::from("/home/me")));
        assert_eq!(dir, Some(PathBuf::from("/home/me").join(".claude")));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_override_is_kept_verbatim() {
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(b"/tmp/cl\xffaude".to_vec());
        let dir = resolve_config_dir(Some(raw.clone()), Some(PathBuf::from("/home/me")))
            .expect("override dir");
        assert_eq!(dir.as_os_str(), raw.as_os_str());
    }

    #[test]
    fn unresolvable_dir_is_none() {
        assert_eq!(resolve_config_dir(None, None), None);
    }

    #[test]
    fn cache_path_falls_back_to_temp_dir() {
        let path = cache_path_for(None);
        assert!(path.starts_with(env::temp_dir()));
        assert!(path.ends_with(FALLBACK_CACHE_FILE_NAME));
    }

    #[test]
    fn for_dir_colocates_cache_and_credentials() {
        let cfg = StatuslineConfig::for_dir("/tmp/claude-home");
        assert_eq!(cfg.cache_path, PathBuf::from("/tmp/claude-home").join(CACHE_FILE_NAME));
        assert_eq!(
            cfg.credentials_path(),
            Some(PathBuf::from("/tmp/claude-home").join(CREDENTIALS_FILE_NAME))
        );
        assert_eq!(cfg.cache_ttl, Duration::from_secs(300));
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.endpoint, DEFAULT_USAGE_ENDPOINT);
    }

    #[test]
    fn from_env_honors_overrides_and_ignores_invalid_values() {
        let _mutex = env_lock().lock().expect("env lock");
        let tmp = TempDir::new().expect("temp dir");

        unsafe {
            env::set_var(CONFIG_DIR_ENV, tmp.path());
            env::set_var(CACHE_TTL_ENV, " 120 ");
            env::set_var(TIMEOUT_ENV, "3");
        }
        let cfg = StatuslineConfig::from_env();
        assert_eq!(cfg.config_dir.as_deref(), Some(tmp.path()));
        assert_eq!(cfg.cache_path, tmp.path().join(CACHE_FILE_NAME));
        assert_eq!(cfg.cache_ttl, Duration::from_secs(120));
        assert_eq!(cfg.timeout, Duration::from_secs(3));
        assert_eq!(cfg.endpoint, DEFAULT_USAGE_ENDPOINT);

        unsafe {
            env::set_var(CACHE_TTL_ENV, "abc");
            env::set_var(TIMEOUT_ENV, "0");
        }
        let cfg = StatuslineConfig::from_env();
        assert_eq!(cfg.cache_ttl, Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS));
        assert_eq!(cfg.timeout, Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS));

        unsafe {
            env::remove_var(CONFIG_DIR_ENV);
            env::remove_var(CACHE_TTL_ENV);
            env::remove_var(TIMEOUT_ENV);
        }
    }
}
