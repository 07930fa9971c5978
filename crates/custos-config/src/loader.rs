//! Layered configuration loading.
//!
//! Configuration resolves in two layers: the defaults embedded in the
//! binary, then an optional TOML overlay merged on top. The overlay may
//! be partial; tables merge key by key and scalar values replace their
//! defaults.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Production defaults compiled into the binary.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Upper bound on an overlay file, in bytes. Config files are small;
/// anything past this is not a config file.
const MAX_CONFIG_FILE_SIZE: usize = 1_048_576;

/// Source label used in parse errors for the embedded defaults.
const EMBEDDED: &str = "<embedded defaults>";

/// Loads configuration from the embedded defaults plus an optional
/// overlay file.
///
/// A missing overlay file is skipped, not an error, so a fixed path can
/// be probed without checking for existence first.
pub(crate) fn load(overlay: Option<&Path>) -> ConfigResult<Config> {
    let mut merged = parse_source(EMBEDDED, DEFAULTS_TOML)?;
    let mut source = EMBEDDED.to_owned();
    if let Some(path) = overlay
        && let Some(value) = try_load_file(path)?
    {
        deep_merge(&mut merged, value);
        source = path.display().to_string();
    }
    finish(merged, &source)
}

/// Loads configuration from the embedded defaults plus a required
/// overlay file.
///
/// Unlike [`load`], a missing file is an error here.
pub(crate) fn load_file(path: &Path) -> ConfigResult<Config> {
    let mut merged = parse_source(EMBEDDED, DEFAULTS_TOML)?;
    let value = read_file(path)?;
    deep_merge(&mut merged, value);
    finish(merged, &path.display().to_string())
}

/// Deserializes and validates a merged TOML tree.
fn finish(merged: toml::Value, source: &str) -> ConfigResult<Config> {
    let config: Config = merged.try_into().map_err(|error| ConfigError::Parse {
        path: source.to_owned(),
        source: error,
    })?;
    validate::config(&config)?;
    Ok(config)
}

/// Reads an overlay file, returning `Ok(None)` when it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            check_size(path, contents.len())?;
            parse_source(&path.display().to_string(), &contents).map(Some)
        },
        Err(source) if source.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config overlay at path, using defaults");
            Ok(None)
        },
        Err(source) => Err(ConfigError::Read {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Reads a required config file.
fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    check_size(path, contents.len())?;
    parse_source(&path.display().to_string(), &contents)
}

/// Rejects oversized config files.
///
/// The size comes from the bytes already read, so the check and the
/// parse always see the same content.
fn check_size(path: &Path, size: usize) -> ConfigResult<()> {
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Oversized {
            path: path.display().to_string(),
            size,
            limit: MAX_CONFIG_FILE_SIZE,
        });
    }
    Ok(())
}

fn parse_source(path: &str, contents: &str) -> ConfigResult<toml::Value> {
    toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })
}

/// Merges `overlay` into `base`.
///
/// Tables merge recursively; scalars and arrays in the overlay replace
/// the base value outright.
fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_table.insert(key, value);
                    },
                }
            }
        },
        (slot, value) => *slot = value,
    }
}
