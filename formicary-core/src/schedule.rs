use std::collections::HashMap;

use thiserror::Error;

use crate::world::World;

/// Core trait that all behavior systems implement. Systems run to
/// completion once per tick, in the order the schedule resolved at build
/// time.
pub trait System: Send + Sync {
    /// Stable name used for ordering constraints and logging.
    fn name(&self) -> &'static str;

    /// Executes the system logic.
    fn run(&mut self, world: &mut World);
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("dependency cycle among systems: {0:?}")]
    Cycle(Vec<String>),
    #[error("ordering constraint references unknown system '{0}'")]
    UnknownSystem(String),
    #[error("system '{0}' registered twice")]
    DuplicateName(String),
}

struct ScheduleEntry {
    name: String,
    system: Box<dyn System>,
    before: Vec<String>,
    after: Vec<String>,
}

/// Collects systems together with before/after hints, then resolves them
/// into a fixed total order. Building fails loudly on cycles; a broken
/// schedule is a startup fault, not something to recover from at runtime.
#[derive(Default)]
pub struct ScheduleBuilder {
    entries: Vec<ScheduleEntry>,
}

impl ScheduleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a system; chain `.before(..)` / `.after(..)` on the returned
    /// handle to constrain its position.
    pub fn add<S: System + 'static>(&mut self, system: S) -> SystemHandle<'_> {
        let name = system.name().to_string();
        self.entries.push(ScheduleEntry {
            name,
            system: Box::new(system),
            before: Vec::new(),
            after: Vec::new(),
        });
        SystemHandle {
            entry: self.entries.last_mut().expect("entry just pushed"),
        }
    }

    /// Topologically sort the dependency graph into an execution order.
    pub fn build(self) -> Result<Schedule, ScheduleError> {
        let count = self.entries.len();

        let mut index_by_name: HashMap<&str, usize> = HashMap::with_capacity(count);
        for (idx, entry) in self.entries.iter().enumerate() {
            if index_by_name.insert(entry.name.as_str(), idx).is_some() {
                return Err(ScheduleError::DuplicateName(entry.name.clone()));
            }
        }

        // Edge a -> b means a must run before b.
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut in_degree: Vec<usize> = vec![0; count];

        for (idx, entry) in self.entries.iter().enumerate() {
            for name in &entry.before {
                let other = *index_by_name
                    .get(name.as_str())
                    .ok_or_else(|| ScheduleError::UnknownSystem(name.clone()))?;
                successors[idx].push(other);
                in_degree[other] += 1;
            }
            for name in &entry.after {
                let other = *index_by_name
                    .get(name.as_str())
                    .ok_or_else(|| ScheduleError::UnknownSystem(name.clone()))?;
                successors[other].push(idx);
                in_degree[idx] += 1;
            }
        }

        // Kahn's algorithm; always picking the lowest registration index
        // keeps the order deterministic among unconstrained systems.
        let mut ready: Vec<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut order: Vec<usize> = Vec::with_capacity(count);

        while let Some(&next) = ready.iter().min() {
            ready.retain(|&i| i != next);
            order.push(next);
            for &succ in &successors[next] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.push(succ);
                }
            }
        }

        if order.len() != count {
            let stuck: Vec<String> = self
                .entries
                .iter()
                .enumerate()
                .filter(|(i, _)| !order.contains(i))
                .map(|(_, e)| e.name.clone())
                .collect();
            return Err(ScheduleError::Cycle(stuck));
        }

        let mut slots: Vec<Option<Box<dyn System>>> =
            self.entries.into_iter().map(|e| Some(e.system)).collect();
        let systems = order
            .into_iter()
            .map(|idx| slots[idx].take().expect("each index appears once"))
            .collect();

        Ok(Schedule { systems })
    }
}

/// Handle for attaching ordering constraints to the most recently added
/// system.
pub struct SystemHandle<'a> {
    entry: &'a mut ScheduleEntry,
}

impl SystemHandle<'_> {
    pub fn before(self, name: &str) -> Self {
        self.entry.before.push(name.to_string());
        self
    }

    pub fn after(self, name: &str) -> Self {
        self.entry.after.push(name.to_string());
        self
    }
}

/// A fixed, dependency-resolved pipeline of systems.
pub struct Schedule {
    systems: Vec<Box<dyn System>>,
}

impl Schedule {
    pub fn builder() -> ScheduleBuilder {
        ScheduleBuilder::new()
    }

    /// Run every system once, in order, to completion.
    pub fn run(&mut self, world: &mut World) {
        for system in &mut self.systems {
            log::trace!("running system '{}'", system.name());
            system.run(world);
        }
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Resolved execution order, mostly for diagnostics and tests.
    pub fn order(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_component;

    #[derive(Debug, Clone, Copy)]
    struct Counter(u32);
    impl_component!(Counter);

    struct Named(&'static str);

    impl System for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn run(&mut self, _world: &mut World) {}
    }

    struct Doubler;

    impl System for Doubler {
        fn name(&self) -> &'static str {
            "doubler"
        }

        fn run(&mut self, world: &mut World) {
            let entities = world.query().with::<Counter>().entities();
            for entity in entities {
                if let Some(counter) = world.get_component_mut::<Counter>(entity) {
                    counter.0 *= 2;
                }
            }
        }
    }

    #[test]
    fn unconstrained_systems_keep_registration_order() {
        let mut builder = Schedule::builder();
        builder.add(Named("a"));
        builder.add(Named("b"));
        builder.add(Named("c"));
        let schedule = builder.build().unwrap();
        assert_eq!(schedule.order(), vec!["a", "b", "c"]);
    }

    #[test]
    fn before_and_after_constraints_are_honored() {
        let mut builder = Schedule::builder();
        builder.add(Named("move"));
        builder.add(Named("sense")).before("move");
        builder.add(Named("deposit")).after("move");
        builder.add(Named("decay")).after("deposit");
        let schedule = builder.build().unwrap();

        let order = schedule.order();
        let pos = |name: &str| order.iter().position(|n| *n == name).unwrap();
        assert!(pos("sense") < pos("move"));
        assert!(pos("move") < pos("deposit"));
        assert!(pos("deposit") < pos("decay"));
    }

    #[test]
    fn cycle_is_a_build_error() {
        let mut builder = Schedule::builder();
        builder.add(Named("a")).before("b");
        builder.add(Named("b")).before("a");
        assert!(matches!(builder.build(), Err(ScheduleError::Cycle(_))));
    }

    #[test]
    fn unknown_constraint_target_is_a_build_error() {
        let mut builder = Schedule::builder();
        builder.add(Named("a")).after("missing");
        assert!(matches!(
            builder.build(),
            Err(ScheduleError::UnknownSystem(_))
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut builder = Schedule::builder();
        builder.add(Named("a"));
        builder.add(Named("a"));
        assert!(matches!(
            builder.build(),
            Err(ScheduleError::DuplicateName(_))
        ));
    }

    #[test]
    fn schedule_runs_systems_against_world() {
        let mut world = World::new();
        let entity = world.spawn();
        world.add_component(entity, Counter(3));

        let mut builder = Schedule::builder();
        builder.add(Doubler);
        let mut schedule = builder.build().unwrap();
        schedule.run(&mut world);

        assert_eq!(world.get_component::<Counter>(entity).unwrap().0, 6);
    }
}
