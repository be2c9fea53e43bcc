use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use shepherd_types::Service;

mod adapter;
mod raw;

/// Error type for manifest parsing.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("manifest not readable: {0}")]
    NotReadable(#[source] io::Error),

    #[error("malformed manifest: {0}")]
    Malformed(#[from] serde_yaml::Error),
}

/// Load a service manifest from a file path.
///
/// # Errors
///
/// Returns a `ManifestError` if the manifest file is missing, unreadable, or
/// not a YAML document of the expected shape.
pub fn load_from_path(path: &Path) -> Result<BTreeMap<String, Service>, ManifestError> {
    let text = std::fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => ManifestError::NotFound(path.to_path_buf()),
        _ => ManifestError::NotReadable(err),
    })?;
    parse_str(&text)
}

/// Parse a service manifest from a string.
///
/// The top-level shape is `mapping<service-name, mapping<field, value>>`.
/// Unrecognized fields are ignored; a type mismatch inside a recognized field
/// is `Malformed`. An empty document parses to an empty service set. No
/// semantic validation happens here: dependency targets are not resolved and
/// an absent `cmd` defaults to the empty string.
///
/// # Errors
///
/// Returns `ManifestError::Malformed` if the document cannot be decoded.
pub fn parse_str(text: &str) -> Result<BTreeMap<String, Service>, ManifestError> {
    let raw: Option<raw::RawManifest> = serde_yaml::from_str(text)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, service)| (name.clone(), service.into_service(name)))
        .collect())
}

/// Re-serialize a resolved service set as a manifest document.
///
/// Parsing the output yields the same service set; defaults are elided.
///
/// # Errors
///
/// Returns `ManifestError::Malformed` if a normalized port string is not a
/// port number, or if serialization itself fails.
pub fn to_yaml(services: &BTreeMap<String, Service>) -> Result<String, ManifestError> {
    let raw = services
        .iter()
        .map(|(name, service)| Ok((name.clone(), raw::RawService::from_service(service)?)))
        .collect::<Result<raw::RawManifest, ManifestError>>()?;
    Ok(serde_yaml::to_string(&raw)?)
}
