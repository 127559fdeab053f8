use tracing::{debug, warn};

use crate::config::SchedulerConfig;
use crate::error::{KernelError, Result};
use crate::graph::has_cycle;
use crate::module::{Module, ModuleId};

struct Slot {
    module: Box<dyn Module>,
    ready: bool,
    last_init: Option<u32>,
    last_poll: Option<u32>,
}

/// Point-in-time view of one module, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStatus {
    pub id: ModuleId,
    pub name: String,
    pub ready: bool,
    pub period: u32,
}

/// Steps a fixed set of modules from a single main loop.
pub struct Scheduler {
    slots: Vec<Slot>,
    /// `dependencies[i]` lists the modules that must be ready before `i`.
    dependencies: Vec<Vec<usize>>,
    visited: Vec<bool>,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create an empty scheduler with default config.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create an empty scheduler with explicit config.
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            slots: Vec::new(),
            dependencies: Vec::new(),
            visited: Vec::new(),
            config,
        }
    }

    /// Add a module. Modules are stepped in the order they were added.
    pub fn add(&mut self, module: impl Module + 'static) -> Result<ModuleId> {
        if self.slots.len() >= self.config.max_modules {
            return Err(KernelError::TooManyModules {
                max: self.config.max_modules,
            });
        }
        let id = ModuleId(self.slots.len());
        debug!(module = module.name(), %id, "module added");
        self.slots.push(Slot {
            module: Box::new(module),
            ready: false,
            last_init: None,
            last_poll: None,
        });
        self.dependencies.push(Vec::new());
        Ok(id)
    }

    /// Declare that `source` needs `target` ready before it is initialised.
    ///
    /// Rejected without changing the graph if either id is unknown or the
    /// edge would close a cycle anywhere in the graph.
    pub fn depend(&mut self, source: ModuleId, target: ModuleId) -> Result<()> {
        self.check(source)?;
        self.check(target)?;
        if self.dependencies[source.0].contains(&target.0) {
            return Ok(());
        }

        self.dependencies[source.0].push(target.0);
        if has_cycle(&self.dependencies) {
            self.dependencies[source.0].pop();
            let err = KernelError::CyclicDependency {
                source_name: self.slots[source.0].module.name().to_string(),
                target_name: self.slots[target.0].module.name().to_string(),
            };
            warn!(error = %err, "dependency rejected");
            return Err(err);
        }
        Ok(())
    }

    /// Run one pass at time `ticks`.
    ///
    /// Each module not yet ready is initialised (its dependencies first) when
    /// its period has elapsed; each ready module is polled when its period
    /// has elapsed. Tick arithmetic wraps.
    pub fn step(&mut self, ticks: u32) {
        self.visited.clear();
        self.visited.resize(self.slots.len(), false);

        for index in 0..self.slots.len() {
            self.init_module(index, ticks);

            let slot = &mut self.slots[index];
            if slot.ready && due(slot.last_poll, ticks, slot.module.period()) {
                slot.module.poll();
                slot.last_poll = Some(ticks);
            }
        }
    }

    fn init_module(&mut self, index: usize, ticks: u32) {
        if self.visited[index] {
            return;
        }
        self.visited[index] = true;
        if self.slots[index].ready {
            return;
        }

        for position in 0..self.dependencies[index].len() {
            let dependency = self.dependencies[index][position];
            self.init_module(dependency, ticks);
        }
        if self.dependencies[index]
            .iter()
            .any(|&dependency| !self.slots[dependency].ready)
        {
            return;
        }

        let slot = &mut self.slots[index];
        if due(slot.last_init, ticks, slot.module.period()) {
            slot.ready = slot.module.init();
            slot.last_init = Some(ticks);
            if slot.ready {
                debug!(module = slot.module.name(), "module ready");
            }
        }
    }

    fn check(&self, id: ModuleId) -> Result<()> {
        if id.0 < self.slots.len() {
            Ok(())
        } else {
            Err(KernelError::UnknownModule(id))
        }
    }

    /// True once `id` has reported ready.
    pub fn is_ready(&self, id: ModuleId) -> Result<bool> {
        self.check(id)?;
        Ok(self.slots[id.0].ready)
    }

    /// Every module in registration order.
    pub fn status(&self) -> Vec<ModuleStatus> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| ModuleStatus {
                id: ModuleId(index),
                name: slot.module.name().to_string(),
                ready: slot.ready,
                period: slot.module.period(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("modules", &self.status())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

fn due(last: Option<u32>, now: u32, period: u32) -> bool {
    match last {
        None => true,
        Some(last) => now.wrapping_sub(last) >= period,
    }
}
