/// Controls scheduler limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of modules. Default: 32.
    pub max_modules: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { max_modules: 32 }
    }
}
