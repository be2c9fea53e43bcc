use serde::ser::Error as _;
use shepherd_types::{Service, ServiceChecks};

use crate::{
    raw::{RawChecks, RawService},
    ManifestError,
};

impl RawService {
    pub(crate) fn into_service(self, name: String) -> Service {
        Service {
            name,
            cmd: self.cmd,
            run_once: self.run_once,
            deps: self.deps,
            checks: self.checks.map(RawChecks::into_checks),
        }
    }

    pub(crate) fn from_service(service: &Service) -> Result<Self, ManifestError> {
        Ok(Self {
            cmd: service.cmd.clone(),
            run_once: service.run_once,
            deps: service.deps.clone(),
            checks: service
                .checks
                .as_ref()
                .map(RawChecks::from_checks)
                .transpose()?,
        })
    }
}

impl RawChecks {
    fn into_checks(self) -> ServiceChecks {
        ServiceChecks {
            cmd: self.cmd,
            tcp_ports: self.tcp_ports.iter().map(u16::to_string).collect(),
            udp_ports: self.udp_ports.iter().map(u16::to_string).collect(),
        }
    }

    fn from_checks(checks: &ServiceChecks) -> Result<Self, ManifestError> {
        Ok(Self {
            cmd: checks.cmd.clone(),
            tcp_ports: parse_ports(&checks.tcp_ports)?,
            udp_ports: parse_ports(&checks.udp_ports)?,
        })
    }
}

fn parse_ports(ports: &[String]) -> Result<Vec<u16>, ManifestError> {
    ports
        .iter()
        .map(|port| {
            port.parse().map_err(|_| {
                ManifestError::Malformed(serde_yaml::Error::custom(format!(
                    "port `{port}` is not a port number"
                )))
            })
        })
        .collect()
}
