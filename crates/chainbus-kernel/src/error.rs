use crate::module::ModuleId;

/// Errors that can occur while assembling a scheduler.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// The id does not name a module added to this scheduler.
    #[error("unknown module {0}")]
    UnknownModule(ModuleId),

    /// The dependency would close a cycle.
    #[error("dependency {source_name} -> {target_name} would create a cycle")]
    CyclicDependency {
        source_name: String,
        target_name: String,
    },

    /// The scheduler is full.
    #[error("too many modules (max {max})")]
    TooManyModules { max: usize },
}

pub type Result<T> = std::result::Result<T, KernelError>;
