use anyhow::{Context, Result};

/// Tunables for the toolkit's default constructions, analogous to the
/// source's build-time constants (pool size, default joinability) but
/// adjustable at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolkitConfig {
    /// Worker count for [`crate::pool::ThreadPool::new`] when the caller
    /// doesn't size it explicitly.
    pub default_pool_capacity: usize,
    /// Whether a freshly created [`crate::thread_handle::ThreadHandle`]
    /// starts out joinable.
    pub joinable_by_default: bool,
    /// `tracing_subscriber::EnvFilter` directive used by
    /// [`crate::logging::init_tracing`] when `RUST_LOG` isn't set.
    pub tracing_filter: String,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            default_pool_capacity: 4,
            joinable_by_default: true,
            tracing_filter: "info".to_string(),
        }
    }
}

/// Load configuration, currently just the built-in defaults. Kept as a
/// fallible entry point so a future file- or env-backed source can replace
/// the body without changing callers.
pub fn load_config() -> Result<ToolkitConfig> {
    Ok(ToolkitConfig::default())
}

/// Parse a pool capacity from a string, rejecting zero (a zero-worker pool
/// can never make progress).
pub fn parse_pool_capacity(s: &str) -> Result<usize> {
    let capacity: usize = s.parse().context("invalid pool capacity value")?;
    if capacity == 0 {
        anyhow::bail!("pool capacity must be at least 1");
    }
    Ok(capacity)
}
