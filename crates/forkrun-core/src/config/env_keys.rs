//! Environment variable keys.

/// Fork controller defaults
pub mod fork {
    /// Directory under which per-run workspaces are created (default: system temp dir).
    pub const FORKRUN_WORKSPACE_ROOT: &str = "FORKRUN_WORKSPACE_ROOT";
    pub const WORKSPACE_ROOT_ALIASES: &[&str] = &["FORKRUN_TMPDIR"];

    /// Niceness increment applied in the child before user code runs.
    pub const FORKRUN_NICE: &str = "FORKRUN_NICE";

    pub const FORKRUN_CAPTURE_STDOUT: &str = "FORKRUN_CAPTURE_STDOUT";
    pub const FORKRUN_CAPTURE_STDERR: &str = "FORKRUN_CAPTURE_STDERR";
}

/// Observability and logging
pub mod observability {
    pub const FORKRUN_QUIET: &str = "FORKRUN_QUIET";
    pub const FORKRUN_LOG_LEVEL: &str = "FORKRUN_LOG_LEVEL";
    pub const FORKRUN_LOG_JSON: &str = "FORKRUN_LOG_JSON";
    pub const FORKRUN_AUDIT_LOG: &str = "FORKRUN_AUDIT_LOG";
}
