use std::{collections::BTreeMap, sync::Arc, time::Duration};

use libc::SIGINT;
use shepherd_types::Service;
use tokio::{
    signal::unix::{signal, SignalKind},
    sync::oneshot,
    task::JoinHandle,
};

use crate::{
    checker::Checker,
    error::{Error, Result},
    graph::DepGraph,
    logger::Logger,
    ports::{PortListenerLookup, ProcfsPortLookup},
    process,
    table::{ServiceState, ServiceTable},
};

/// Period between health-check rounds for every running service.
pub const CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// The orchestrator: one supervision task per service, one checker task per
/// live child, and one signal task driving coordinated shutdown.
pub struct Supervisor {
    table: Arc<ServiceTable>,
    logger: Arc<Logger>,
    ports: Arc<dyn PortListenerLookup>,
    check_interval: Duration,
}

impl Supervisor {
    #[must_use]
    pub fn new(services: BTreeMap<String, Service>, verbose: bool) -> Self {
        Self {
            table: Arc::new(ServiceTable::new(services)),
            logger: Arc::new(Logger::stdout(verbose)),
            ports: Arc::new(ProcfsPortLookup),
            check_interval: CHECK_INTERVAL,
        }
    }

    /// Replace the listener lookup. Tests use a table-backed fake.
    #[must_use]
    pub fn with_port_lookup(mut self, ports: Arc<dyn PortListenerLookup>) -> Self {
        self.ports = ports;
        self
    }

    /// Replace the probe period.
    #[must_use]
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Replace the status logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Shared service table, the single source of truth for liveness.
    #[must_use]
    pub fn table(&self) -> Arc<ServiceTable> {
        Arc::clone(&self.table)
    }

    /// Validate the dependency graph and run the fleet.
    ///
    /// Supervision tasks are created in topological order but execute
    /// concurrently: a dependent is not delayed until its dependencies are
    /// ready. Readiness converges at runtime through the dependency probe,
    /// which keeps restarting a dependent until its dependencies are live.
    ///
    /// Returns when every supervision task has completed, which happens only
    /// when all services are run-once and each has exited. A SIGINT or
    /// SIGTERM at the supervisor instead terminates the whole process with
    /// status 1.
    ///
    /// # Errors
    ///
    /// Returns `Error::CyclicDependency` if the manifest's dependency graph
    /// has a cycle; no process has been spawned at that point.
    pub async fn start(&self) -> Result<()> {
        let graph = DepGraph::build(&self.table.definitions());
        if graph.is_cyclic() {
            return Err(Error::CyclicDependency);
        }

        let start_order = graph.topological_order();
        tracing::debug!(?start_order, "starting supervision tasks");

        let mut tasks: Vec<JoinHandle<()>> = Vec::with_capacity(start_order.len());
        for name in start_order {
            tasks.push(tokio::spawn(supervise(
                Arc::clone(&self.table),
                Arc::clone(&self.logger),
                Arc::clone(&self.ports),
                self.check_interval,
                name,
            )));
        }

        {
            let table = Arc::clone(&self.table);
            tokio::spawn(async move {
                let Ok(mut interrupt) = signal(SignalKind::interrupt()) else {
                    return;
                };
                let Ok(mut terminate) = signal(SignalKind::terminate()) else {
                    return;
                };
                tokio::select! {
                    _ = interrupt.recv() => {}
                    _ = terminate.recv() => {}
                }
                exit_with(&table, 1);
            });
        }

        for task in tasks {
            let _ = task.await;
        }

        Ok(())
    }

    /// Send SIGINT to every live process group. The set of groups is
    /// snapshotted under the table lock; the signals go out after it is
    /// released.
    pub fn signal_fleet(&self) {
        signal_fleet(&self.table);
    }

    /// Coordinated shutdown: SIGINT to every live process group, then
    /// terminate the supervisor with `status`. Children are not waited for;
    /// the OS reaps them as the supervisor goes down.
    pub fn exit(&self, status: i32) -> ! {
        exit_with(&self.table, status)
    }
}

fn signal_fleet(table: &ServiceTable) {
    for (name, pid) in table.live_processes() {
        if let Err(err) = process::signal_group(pid, SIGINT) {
            tracing::warn!(service = %name, "failed to signal process group: {err}");
        }
    }
}

fn exit_with(table: &ServiceTable, status: i32) -> ! {
    signal_fleet(table);
    std::process::exit(status)
}

/// Per-service lifecycle loop: spawn, watch, reap, restart.
///
/// The restart is unconditional: there is no backoff and no distinction
/// between a crash and a clean exit. A run-once service ends its task after
/// the first exit.
async fn supervise(
    table: Arc<ServiceTable>,
    logger: Arc<Logger>,
    ports: Arc<dyn PortListenerLookup>,
    check_interval: Duration,
    name: String,
) {
    loop {
        let Some(service) = table.definition(&name) else {
            return;
        };

        let (mut child, pid) = match process::spawn_in_group(&service.cmd) {
            Ok(spawned) => spawned,
            Err(err) => {
                tracing::error!(service = %name, "spawn failed: {err}");
                logger.info(&format!("{name} failed to start: {err}"));
                if service.run_once {
                    table.set_state(&name, ServiceState::Terminal);
                    return;
                }
                continue;
            }
        };

        // Live before the checker starts, so the first dependency probe of a
        // dependent can already see this service.
        table.set_state(&name, ServiceState::Live { pid });
        logger.info(&format!("{name} has been started"));

        let (stop_tx, stop_rx) = oneshot::channel();
        let checker = Checker::new(
            Arc::clone(&table),
            Arc::clone(&logger),
            Arc::clone(&ports),
            service.clone(),
            pid,
            check_interval,
        );
        tokio::spawn(checker.run(stop_rx));

        let status = child.wait().await;

        // Idle before the stop signal and before the next iteration spawns.
        table.set_state(&name, ServiceState::Idle);
        let _ = stop_tx.send(());

        match status {
            Ok(status) => logger.info(&format!("{name} exited with {status}")),
            Err(err) => tracing::error!(service = %name, "wait failed: {err}"),
        }

        if service.run_once {
            table.set_state(&name, ServiceState::Terminal);
            return;
        }
    }
}
