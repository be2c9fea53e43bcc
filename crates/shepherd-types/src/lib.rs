/// A single supervised service as declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Unique name, the key of the manifest entry.
    pub name: String,
    /// Shell command line, run under `sh -c`.
    pub cmd: String,
    /// Do not restart the service after it exits.
    pub run_once: bool,
    /// Names of the services this one requires.
    pub deps: Vec<String>,
    /// Health checks attached while the service is running.
    pub checks: Option<ServiceChecks>,
}

/// Health checks declared under a service's `checks` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceChecks {
    /// Command whose zero exit status means healthy. Empty skips the probe.
    pub cmd: String,
    /// TCP ports the service's own process must be listening on, in decimal form.
    pub tcp_ports: Vec<String>,
    /// UDP ports the service's own process must be listening on, in decimal form.
    pub udp_ports: Vec<String>,
}
