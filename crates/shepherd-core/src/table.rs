use std::{
    collections::BTreeMap,
    sync::{Mutex, PoisonError},
};

use shepherd_types::Service;

use crate::process::Pid;

/// Runtime state of one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// No live child process.
    Idle,
    /// A child is running. The child is the leader of its own process group,
    /// so `pid` doubles as the group id.
    Live { pid: Pid },
    /// A run-once service that finished; never restarted.
    Terminal,
}

impl ServiceState {
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, ServiceState::Live { .. })
    }
}

#[derive(Debug)]
struct Entry {
    service: Service,
    state: ServiceState,
}

/// Shared registry of services and their live process handles.
///
/// The single source of truth for liveness: a service is up exactly when its
/// state is `Live`. Entries are created once at construction and never
/// removed; only their state mutates. The lock is never held across a
/// blocking OS call; callers snapshot, release, then act.
#[derive(Debug)]
pub struct ServiceTable {
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl ServiceTable {
    #[must_use]
    pub fn new(services: BTreeMap<String, Service>) -> Self {
        let entries = services
            .into_iter()
            .map(|(name, service)| {
                (
                    name,
                    Entry {
                        service,
                        state: ServiceState::Idle,
                    },
                )
            })
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone of the full definition map, for graph building.
    #[must_use]
    pub fn definitions(&self) -> BTreeMap<String, Service> {
        self.lock()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.service.clone()))
            .collect()
    }

    /// Snapshot of one service definition.
    #[must_use]
    pub fn definition(&self, name: &str) -> Option<Service> {
        self.lock().get(name).map(|entry| entry.service.clone())
    }

    #[must_use]
    pub fn state(&self, name: &str) -> Option<ServiceState> {
        self.lock().get(name).map(|entry| entry.state)
    }

    /// True when the named service has a live child. Unknown names are never
    /// live, which is what makes a dependency on an undefined service fail
    /// its probe forever.
    #[must_use]
    pub fn is_live(&self, name: &str) -> bool {
        self.state(name).is_some_and(ServiceState::is_live)
    }

    pub fn set_state(&self, name: &str, state: ServiceState) {
        if let Some(entry) = self.lock().get_mut(name) {
            entry.state = state;
        }
    }

    /// `(name, pid)` of every live service at the instant the lock is taken.
    #[must_use]
    pub fn live_processes(&self) -> Vec<(String, Pid)> {
        self.lock()
            .iter()
            .filter_map(|(name, entry)| match entry.state {
                ServiceState::Live { pid } => Some((name.clone(), pid)),
                ServiceState::Idle | ServiceState::Terminal => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(names: &[&str]) -> ServiceTable {
        let services = names
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    Service {
                        name: name.to_string(),
                        cmd: String::new(),
                        run_once: false,
                        deps: Vec::new(),
                        checks: None,
                    },
                )
            })
            .collect();
        ServiceTable::new(services)
    }

    #[test]
    fn services_start_idle() {
        let table = table(&["a"]);
        assert_eq!(table.state("a"), Some(ServiceState::Idle));
        assert!(!table.is_live("a"));
    }

    #[test]
    fn unknown_names_are_not_live() {
        let table = table(&["a"]);
        assert_eq!(table.state("ghost"), None);
        assert!(!table.is_live("ghost"));
    }

    #[test]
    fn state_transitions_are_observable() {
        let table = table(&["a"]);

        table.set_state("a", ServiceState::Live { pid: 42 });
        assert!(table.is_live("a"));

        table.set_state("a", ServiceState::Idle);
        assert!(!table.is_live("a"));

        table.set_state("a", ServiceState::Terminal);
        assert_eq!(table.state("a"), Some(ServiceState::Terminal));
    }

    #[test]
    fn live_processes_skips_idle_and_terminal() {
        let table = table(&["a", "b", "c"]);
        table.set_state("a", ServiceState::Live { pid: 7 });
        table.set_state("c", ServiceState::Terminal);

        assert_eq!(table.live_processes(), vec![("a".to_string(), 7)]);
    }
}
