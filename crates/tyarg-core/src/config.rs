use std::sync::OnceLock;

/// Default ceiling on structural recursion depth for one traversal.
pub const DEFAULT_MAX_DEPTH: usize = 256;

fn env_true(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|val| truthy(&val))
}

fn truthy(val: &str) -> bool {
    let trimmed = val.trim();
    !trimmed.is_empty() && !matches!(trimmed, "0" | "false" | "FALSE" | "False")
}

fn bool_from_env(key: &str) -> bool {
    env_true(key).unwrap_or(false)
}

fn usize_from_env(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// Knobs for type-parameter resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Structural recursion deeper than this stops descending and reports a warning.
    pub max_depth: usize,
    /// Report inference problems as warnings instead of errors.
    pub lossy: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            lossy: false,
        }
    }
}

impl ResolverConfig {
    /// Reads `TYARG_MAX_DEPTH` and `TYARG_LOSSY` once per process.
    pub fn from_env() -> Self {
        static CONFIG: OnceLock<ResolverConfig> = OnceLock::new();
        *CONFIG.get_or_init(|| ResolverConfig {
            max_depth: usize_from_env("TYARG_MAX_DEPTH")
                .filter(|depth| *depth > 0)
                .unwrap_or(DEFAULT_MAX_DEPTH),
            lossy: bool_from_env("TYARG_LOSSY"),
        })
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_lossy(mut self, lossy: bool) -> Self {
        self.lossy = lossy;
        self
    }
}
