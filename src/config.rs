//! Runtime configuration, loaded from the environment the same way the teacher resolves its
//! checkpoint settings.
//!
//! Grounded on `weavegraph::runtimes::runtime_config::RuntimeConfig::resolve_sqlite_db_name`:
//! `dotenvy::dotenv()` loads a local `.env` if present, then `std::env::var` overrides defaults.

/// Tunables for a [`crate::graph::Graph`] run.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Upper bound on concurrently in-flight async nodes within one wave. `None` means
    /// unbounded (every ready async node in the wave is dispatched at once).
    pub max_concurrency: Option<usize>,
    /// Governs what the implicit planner does when a consumer's input set matches more than
    /// one producer's output set exactly. When true (the default),
    /// [`crate::error::ExecutorError::AmbiguousTopology`] rejects the graph. When false, the
    /// planner picks the alphabetically-first candidate and logs the rest via `tracing::warn!`
    /// rather than failing construction.
    pub strict_ambiguous_topology: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            max_concurrency: None,
            strict_ambiguous_topology: true,
        }
    }
}

impl ExecutorConfig {
    /// Loads overrides from `FLOWLOOM_MAX_CONCURRENCY` and `FLOWLOOM_STRICT_TOPOLOGY`,
    /// reading a `.env` file first if one is present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = ExecutorConfig::default();

        if let Ok(raw) = std::env::var("FLOWLOOM_MAX_CONCURRENCY") {
            match raw.parse::<usize>() {
                Ok(n) => config.max_concurrency = Some(n),
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid FLOWLOOM_MAX_CONCURRENCY"),
            }
        }

        if let Ok(raw) = std::env::var("FLOWLOOM_STRICT_TOPOLOGY") {
            match raw.parse::<bool>() {
                Ok(b) => config.strict_ambiguous_topology = b,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid FLOWLOOM_STRICT_TOPOLOGY"),
            }
        }

        config
    }
}
