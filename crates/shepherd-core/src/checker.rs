use std::{sync::Arc, time::Duration};

use libc::SIGINT;
use shepherd_types::Service;
use tokio::{select, sync::oneshot, time};

use crate::{
    logger::Logger,
    ports::{PortListenerLookup, Protocol},
    process::{self, Pid},
    table::ServiceTable,
};

/// Periodic health probes for one live child process.
///
/// A checker lives exactly as long as the child generation it watches: the
/// supervision loop fires the stop channel once, after the child has exited.
/// A failing probe signals the child's process group and keeps ticking; the
/// restart itself is driven by the supervision loop reaping the child.
pub(crate) struct Checker {
    table: Arc<ServiceTable>,
    logger: Arc<Logger>,
    ports: Arc<dyn PortListenerLookup>,
    service: Service,
    pid: Pid,
    interval: Duration,
}

impl Checker {
    pub(crate) fn new(
        table: Arc<ServiceTable>,
        logger: Arc<Logger>,
        ports: Arc<dyn PortListenerLookup>,
        service: Service,
        pid: Pid,
        interval: Duration,
    ) -> Self {
        Self {
            table,
            logger,
            ports,
            service,
            pid,
            interval,
        }
    }

    pub(crate) async fn run(self, mut stop: oneshot::Receiver<()>) {
        self.logger
            .info(&format!("{} checks started", self.service.name));

        // First round one full period after the child came up.
        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        loop {
            select! {
                _ = &mut stop => {
                    self.logger.info(&format!("{} checks stopped", self.service.name));
                    return;
                }
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    /// One round: dependency, command, TCP and UDP probes, in that order.
    async fn tick(&self) {
        if !self.deps_live() {
            self.kick("dependency check");
        }
        if !self.command_healthy().await {
            self.kick("health command");
        }
        if !self.ports_owned(Protocol::Tcp) {
            self.kick("tcp port check");
        }
        if !self.ports_owned(Protocol::Udp) {
            self.kick("udp port check");
        }
    }

    fn deps_live(&self) -> bool {
        self.service.deps.iter().all(|dep| self.table.is_live(dep))
    }

    async fn command_healthy(&self) -> bool {
        let Some(checks) = &self.service.checks else {
            return true;
        };
        if checks.cmd.is_empty() {
            return true;
        }

        match process::run_check(&checks.cmd).await {
            Ok(status) => status.success(),
            Err(err) => {
                tracing::warn!(service = %self.service.name, "health command failed to run: {err}");
                false
            }
        }
    }

    /// Every declared port must be owned by the supervised child itself; a
    /// missing listener or a foreign pid fails the probe.
    fn ports_owned(&self, proto: Protocol) -> bool {
        let Some(checks) = &self.service.checks else {
            return true;
        };
        let ports = match proto {
            Protocol::Tcp => &checks.tcp_ports,
            Protocol::Udp => &checks.udp_ports,
        };

        ports.iter().all(|port| {
            matches!(
                self.ports.listener_pid(proto, port),
                Ok(Some(pid)) if pid == self.pid
            )
        })
    }

    fn kick(&self, probe: &str) {
        if let Err(err) = process::signal_group(self.pid, SIGINT) {
            tracing::warn!(service = %self.service.name, "failed to signal process group: {err}");
        }
        self.logger.info(&format!(
            "{probe} for {} failed, service has been restarted",
            self.service.name
        ));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::io;

    use shepherd_types::ServiceChecks;

    use crate::table::ServiceState;

    use super::*;

    /// Table-backed stand-in for the procfs lookup.
    #[derive(Default)]
    struct FakePorts(HashMap<(Protocol, String), Pid>);

    impl PortListenerLookup for FakePorts {
        fn listener_pid(&self, proto: Protocol, port: &str) -> io::Result<Option<Pid>> {
            Ok(self.0.get(&(proto, port.to_string())).copied())
        }
    }

    fn service(name: &str, deps: &[&str], checks: Option<ServiceChecks>) -> Service {
        Service {
            name: name.to_string(),
            cmd: String::new(),
            run_once: false,
            deps: deps.iter().map(ToString::to_string).collect(),
            checks,
        }
    }

    fn make_checker(service: Service, pid: Pid, ports: FakePorts) -> (Checker, Arc<ServiceTable>) {
        let mut services = BTreeMap::new();
        for dep in &service.deps {
            services.insert(dep.clone(), self::service(dep, &[], None));
        }
        services.insert(service.name.clone(), service.clone());

        let table = Arc::new(ServiceTable::new(services));
        let checker = Checker::new(
            Arc::clone(&table),
            Arc::new(Logger::new(false, io::sink())),
            Arc::new(ports),
            service,
            pid,
            Duration::from_millis(500),
        );
        (checker, table)
    }

    #[test]
    fn dependency_probe_follows_table_state() {
        let (checker, table) = make_checker(service("web", &["db"], None), 1, FakePorts::default());

        assert!(!checker.deps_live());

        table.set_state("db", ServiceState::Live { pid: 2 });
        assert!(checker.deps_live());

        table.set_state("db", ServiceState::Idle);
        assert!(!checker.deps_live());
    }

    #[test]
    fn dependency_probe_fails_for_undefined_services() {
        let (checker, _table) = make_checker(service("web", &["ghost"], None), 1, FakePorts::default());
        assert!(!checker.deps_live());
    }

    #[tokio::test]
    async fn command_probe_runs_the_shell() {
        let healthy = ServiceChecks {
            cmd: "true".to_string(),
            ..ServiceChecks::default()
        };
        let (checker, _table) = make_checker(service("web", &[], Some(healthy)), 1, FakePorts::default());
        assert!(checker.command_healthy().await);

        let unhealthy = ServiceChecks {
            cmd: "false".to_string(),
            ..ServiceChecks::default()
        };
        let (checker, _table) =
            make_checker(service("web", &[], Some(unhealthy)), 1, FakePorts::default());
        assert!(!checker.command_healthy().await);
    }

    #[tokio::test]
    async fn empty_command_probe_passes() {
        let (checker, _table) = make_checker(service("web", &[], None), 1, FakePorts::default());
        assert!(checker.command_healthy().await);

        let blank = ServiceChecks::default();
        let (checker, _table) = make_checker(service("web", &[], Some(blank)), 1, FakePorts::default());
        assert!(checker.command_healthy().await);
    }

    #[test]
    fn port_probe_requires_the_supervised_pid() {
        let checks = ServiceChecks {
            tcp_ports: vec!["80".to_string()],
            ..ServiceChecks::default()
        };

        let owned = FakePorts(HashMap::from([((Protocol::Tcp, "80".to_string()), 7)]));
        let (checker, _table) = make_checker(service("web", &[], Some(checks.clone())), 7, owned);
        assert!(checker.ports_owned(Protocol::Tcp));

        let foreign = FakePorts(HashMap::from([((Protocol::Tcp, "80".to_string()), 8)]));
        let (checker, _table) = make_checker(service("web", &[], Some(checks.clone())), 7, foreign);
        assert!(!checker.ports_owned(Protocol::Tcp));

        let missing = FakePorts::default();
        let (checker, _table) = make_checker(service("web", &[], Some(checks)), 7, missing);
        assert!(!checker.ports_owned(Protocol::Tcp));
    }

    #[test]
    fn port_probe_without_declared_ports_passes() {
        let (checker, _table) = make_checker(service("web", &[], None), 7, FakePorts::default());
        assert!(checker.ports_owned(Protocol::Tcp));
        assert!(checker.ports_owned(Protocol::Udp));
    }

    #[tokio::test]
    async fn stop_channel_ends_the_checker() {
        let (checker, _table) = make_checker(service("web", &[], None), 1, FakePorts::default());
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(checker.run(stop_rx));
        stop_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("checker should stop promptly")
            .unwrap();
    }
}
