//! Configuration structs grouped by concern, loaded from the environment.

use super::env_keys::{fork as fork_keys, observability as obv_keys};
use super::loader::{env_bool, env_optional, env_or, env_parse};
use std::path::PathBuf;

/// Observability: quiet, log_level, log_json, audit_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::FORKRUN_QUIET, &[], false),
                log_level: env_or(obv_keys::FORKRUN_LOG_LEVEL, &[], || {
                    "forkrun=info".to_string()
                }),
                log_json: env_bool(obv_keys::FORKRUN_LOG_JSON, &[], false),
                audit_log: env_optional(obv_keys::FORKRUN_AUDIT_LOG, &[]),
            }
        })
    }
}

/// Defaults for forked runs. Builder calls and CLI flags override these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkConfig {
    /// Parent directory for run workspaces; `None` means the system temp dir.
    pub workspace_root: Option<PathBuf>,
    /// Niceness increment for the child; 0 leaves priority unchanged.
    pub nice_level: i32,
    pub capture_stdout: bool,
    pub capture_stderr: bool,
}

impl Default for ForkConfig {
    fn default() -> Self {
        Self {
            workspace_root: None,
            nice_level: 0,
            capture_stdout: true,
            capture_stderr: true,
        }
    }
}

impl ForkConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let defaults = Self::default();
        Self {
            workspace_root: env_optional(
                fork_keys::FORKRUN_WORKSPACE_ROOT,
                fork_keys::WORKSPACE_ROOT_ALIASES,
            )
            .map(PathBuf::from),
            nice_level: env_parse(fork_keys::FORKRUN_NICE, &[]).unwrap_or(defaults.nice_level),
            capture_stdout: env_bool(
                fork_keys::FORKRUN_CAPTURE_STDOUT,
                &[],
                defaults.capture_stdout,
            ),
            capture_stderr: env_bool(
                fork_keys::FORKRUN_CAPTURE_STDERR,
                &[],
                defaults.capture_stderr,
            ),
        }
    }
}
