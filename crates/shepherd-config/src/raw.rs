use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Serde mirror of the manifest document: a mapping from service name to the
/// service's fields. The schema is open; fields not listed here are ignored
/// by the YAML layer.
pub(crate) type RawManifest = BTreeMap<String, RawService>;

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct RawService {
    #[serde(default)]
    pub cmd: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub run_once: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checks: Option<RawChecks>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct RawChecks {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tcp_ports: Vec<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub udp_ports: Vec<u16>,
}

fn is_false(value: &bool) -> bool {
    !*value
}
