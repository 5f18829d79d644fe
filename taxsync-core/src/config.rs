//! Connection configuration persistence.
//!
//! # Storage layout
//!
//! ```text
//! ~/.taxsync/
//!   connections/
//!     <taxonomy_id>.yaml   (one file per connected taxonomy — mode 0600)
//! ```
//!
//! # API pattern
//!
//! Every path-touching function has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::ConfigError;
use crate::types::{ConceptUri, LangTag, SyncConfiguration, TaxonomyId};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.taxsync/connections/` — creates the directory (mode `0700`)
/// if it does not yet exist.
pub fn connections_dir_at(home: &Path) -> Result<PathBuf, ConfigError> {
    let dir = home.join(".taxsync").join("connections");
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

/// `<home>/.taxsync/connections/<taxonomy>.yaml` — pure, no I/O.
pub fn connection_path_at(home: &Path, taxonomy: &TaxonomyId) -> PathBuf {
    home.join(".taxsync")
        .join("connections")
        .join(format!("{}.yaml", taxonomy.0))
}

// ---------------------------------------------------------------------------
// 2. Create / load / save
// ---------------------------------------------------------------------------

/// Create a new connection between a taxonomy and a remote concept scheme
/// and persist it. Re-connecting an already connected taxonomy overwrites
/// the existing file (scheme or language map changed).
#[allow(clippy::too_many_arguments)]
pub fn connect_at(
    home: &Path,
    id: impl Into<String>,
    taxonomy: TaxonomyId,
    scheme_uri: ConceptUri,
    project_id: impl Into<String>,
    server_url: impl Into<String>,
    languages: BTreeMap<LangTag, LangTag>,
    default_language: LangTag,
) -> Result<SyncConfiguration, ConfigError> {
    if !languages.contains_key(&default_language) {
        return Err(ConfigError::MissingDefaultLanguage {
            language: default_language.0,
        });
    }
    let now = Utc::now();
    let created_at = match load_at(home, &taxonomy) {
        Ok(existing) => existing.created_at,
        Err(ConfigError::ConnectionNotFound { .. }) => now,
        Err(e) => return Err(e),
    };
    let config = SyncConfiguration {
        id: id.into(),
        taxonomy,
        scheme_uri,
        project_id: project_id.into(),
        server_url: server_url.into(),
        languages,
        default_language,
        created_at,
        updated_at: now,
    };
    save_at(home, &config)?;
    Ok(config)
}

/// Load the connection configuration for `taxonomy`.
///
/// Returns `ConfigError::ConnectionNotFound` if absent, `ConfigError::Parse`
/// (with path + line context) if malformed YAML.
pub fn load_at(home: &Path, taxonomy: &TaxonomyId) -> Result<SyncConfiguration, ConfigError> {
    let path = connection_path_at(home, taxonomy);
    if !path.exists() {
        return Err(ConfigError::ConnectionNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load(taxonomy: &TaxonomyId) -> Result<SyncConfiguration, ConfigError> {
    load_at(&home()?, taxonomy)
}

/// Atomically save a connection configuration.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &SyncConfiguration) -> Result<(), ConfigError> {
    connections_dir_at(home)?;
    let path = connection_path_at(home, &config.taxonomy);
    let tmp = path.with_file_name(format!("{}.yaml.tmp", config.taxonomy.0));

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml)?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &SyncConfiguration) -> Result<(), ConfigError> {
    save_at(&home()?, config)
}

/// All stored connections, sorted by taxonomy id.
pub fn list_at(home: &Path) -> Result<Vec<SyncConfiguration>, ConfigError> {
    let dir = home.join(".taxsync").join("connections");
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut entries: Vec<_> = std::fs::read_dir(&dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    let mut configs = Vec::new();
    for entry in entries {
        let fname = entry.file_name();
        let name = fname.to_string_lossy();
        if !name.ends_with(".yaml") {
            continue;
        }
        let contents = std::fs::read_to_string(entry.path())?;
        let config: SyncConfiguration = serde_yaml::from_str(&contents).map_err(|e| {
            ConfigError::Parse {
                path: entry.path(),
                source: e,
            }
        })?;
        configs.push(config);
    }
    Ok(configs)
}

/// `list_at` convenience wrapper.
pub fn list() -> Result<Vec<SyncConfiguration>, ConfigError> {
    list_at(&home()?)
}

/// Remove the connection for `taxonomy`. The caller is responsible for
/// cascading deletion of hash records and run logs (the engine's state
/// store owns those files).
pub fn delete_at(home: &Path, taxonomy: &TaxonomyId) -> Result<(), ConfigError> {
    let path = connection_path_at(home, taxonomy);
    if !path.exists() {
        return Err(ConfigError::ConnectionNotFound { path });
    }
    std::fs::remove_file(&path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Language ordering
// ---------------------------------------------------------------------------

/// The configured language pairs with the default language first.
///
/// Mappings with an empty remote tag are dropped. Fails if the default
/// language itself has no mapping.
pub fn ordered_languages(
    config: &SyncConfiguration,
) -> Result<Vec<(LangTag, LangTag)>, ConfigError> {
    let default_remote = config
        .languages
        .get(&config.default_language)
        .filter(|remote| !remote.is_empty())
        .ok_or_else(|| ConfigError::MissingDefaultLanguage {
            language: config.default_language.0.clone(),
        })?;

    let mut ordered = vec![(config.default_language.clone(), default_remote.clone())];
    for (local, remote) in &config.languages {
        if *local == config.default_language || remote.is_empty() {
            continue;
        }
        ordered.push((local.clone(), remote.clone()));
    }
    Ok(ordered)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
