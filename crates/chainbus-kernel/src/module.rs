/// A unit of firmware driven by the [`Scheduler`](crate::Scheduler).
pub trait Module {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Ticks between calls. 0 means every step.
    fn period(&self) -> u32 {
        0
    }

    /// Bring the module up. Called every period until it returns `true`.
    fn init(&mut self) -> bool;

    /// Do one slice of work. Only called once the module is ready.
    fn poll(&mut self);
}

/// Handle returned by [`Scheduler::add`](crate::Scheduler::add).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) usize);

impl ModuleId {
    /// Position in registration order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
