//! Startup discovery
//!
//! One-shot scan of the data directory that materializes the genesis
//! namespace from `bloomd.<name>` subdirectories left by a previous run.
//! Single-threaded, runs before the vacuum task starts. Filters are
//! opened cold: the bits stay proxied until the first access.

use std::fs;
use std::sync::Arc;

use tracing::{error, info};

use crate::domain::config::FilterConfig;
use crate::domain::entry::FilterEntry;
use crate::domain::name_map::NameMap;
use crate::error::{BackendError, FilterError};
use crate::ports::outbound::FilterProvider;
use crate::FILTER_DIR_PREFIX;

/// Scan `config.data_dir` and add one cold entry per filter directory.
///
/// Individual filters that fail to open are logged and skipped; only a
/// failing scan is an error. A missing data directory is created so a
/// fresh deployment comes up with an empty namespace.
pub(crate) fn discover_existing<P: FilterProvider>(
    config: &FilterConfig,
    provider: &P,
    map: &mut NameMap,
) -> Result<usize, FilterError> {
    fs::create_dir_all(&config.data_dir).map_err(BackendError::from)?;

    let mut found = 0;
    for dirent in fs::read_dir(&config.data_dir).map_err(BackendError::from)? {
        let dirent = dirent.map_err(BackendError::from)?;

        let file_name = dirent.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if name.len() <= FILTER_DIR_PREFIX.len() || !name.starts_with(FILTER_DIR_PREFIX) {
            continue;
        }
        if !dirent.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }

        let filter_name = &name[FILTER_DIR_PREFIX.len()..];
        match provider.open(config, filter_name, false) {
            Ok(backend) => {
                map.insert(
                    filter_name.to_string(),
                    Arc::new(FilterEntry::new(backend, None, false)),
                );
                found += 1;
            }
            Err(err) => {
                error!("failed to load filter '{}': {}", filter_name, err);
            }
        }
    }

    info!("found {} existing filters", found);
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StandardProvider;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> FilterConfig {
        FilterConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_data_dir_finds_nothing() {
        let dir = TempDir::new().unwrap();
        let mut map = NameMap::new();

        let found = discover_existing(&config(&dir), &StandardProvider, &mut map).unwrap();
        assert_eq!(found, 0);
        assert!(map.is_empty());
    }

    #[test]
    fn test_missing_data_dir_is_created() {
        let dir = TempDir::new().unwrap();
        let cfg = FilterConfig {
            data_dir: dir.path().join("not-yet"),
            ..Default::default()
        };
        let mut map = NameMap::new();

        assert_eq!(
            discover_existing(&cfg, &StandardProvider, &mut map).unwrap(),
            0
        );
        assert!(cfg.data_dir.is_dir());
    }

    #[test]
    fn test_matching_directories_materialize_cold() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("bloomd.alpha")).unwrap();
        fs::create_dir(dir.path().join("bloomd.beta")).unwrap();
        // ignored: wrong prefix, bare prefix, plain file
        fs::create_dir(dir.path().join("other.gamma")).unwrap();
        fs::create_dir(dir.path().join("bloomd.")).unwrap();
        fs::write(dir.path().join("bloomd.file"), b"x").unwrap();

        let mut map = NameMap::new();
        let found = discover_existing(&config(&dir), &StandardProvider, &mut map).unwrap();

        assert_eq!(found, 2);
        let entry = map.get("alpha").expect("alpha discovered");
        assert!(!entry.is_hot(), "discovered filters start cold");
        assert!(entry.backend().is_proxied());
        assert!(map.contains("beta"));
        assert!(!map.contains("gamma"));
    }
}
