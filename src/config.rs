use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

const CONFIG_HEADER: &str = "# litshelf configuration (written by `litshelf init`)\n\n";

/// What the store needs to know at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database: PathBuf,
}

impl StoreConfig {
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self { database: database.into() }
    }
}

/// On-disk `litshelf.toml`.
///
/// ```toml
/// database = "/home/me/.litshelf/literature.db"
///
/// [limits]
/// list = 20
/// search = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct LitshelfConfig {
    /// Database file; relative paths are relative to the config file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Result limits used when `--limit` is not given
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub list: usize,
    pub search: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            list: DEFAULT_LIST_LIMIT,
            search: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl LitshelfConfig {
    pub fn with_database(database: impl Into<PathBuf>) -> Self {
        Self {
            database: Some(database.into()),
            ..Self::default()
        }
    }

    /// The configured database, anchored at the directory holding `config_file`
    pub fn database_path(&self, config_file: &Path) -> Option<PathBuf> {
        let database = self.database.as_ref()?;
        if database.is_relative() {
            let base = config_file.parent().unwrap_or_else(|| Path::new(""));
            Some(base.join(database))
        } else {
            Some(database.clone())
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("litshelf.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".litshelf").join("literature.db")
}

/// Read `litshelf.toml`. A missing file is `None`; a malformed one is an error.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<LitshelfConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };

    let config = toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(config))
}

/// Like [`load_config`], falling back to the built-in defaults
pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<LitshelfConfig> {
    Ok(load_config(path)?.unwrap_or_default())
}

pub fn write_config(path: &Path, config: &LitshelfConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let body = toml::to_string_pretty(config)?;
    std::fs::write(path, format!("{CONFIG_HEADER}{body}"))
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Work out which database to use.
///
/// An explicit path (flag or `LITERATURE_DB_PATH`, both handled by the CLI
/// parser) wins over the config file.
pub fn resolve_store_config(
    explicit: Option<PathBuf>,
    config_path: Option<&Path>,
) -> anyhow::Result<StoreConfig> {
    if let Some(database) = explicit {
        return Ok(StoreConfig::new(database));
    }

    let path = config_path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let database = load_config(Some(&path))?.and_then(|c| c.database_path(&path));

    match database {
        Some(database) => Ok(StoreConfig::new(database)),
        None => anyhow::bail!(
            "no database configured: pass --database, set LITERATURE_DB_PATH, or run `litshelf init`"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("litshelf.toml");
        write_config(&config_path, &LitshelfConfig::with_database("from-file.db"), false).unwrap();

        let resolved = resolve_store_config(Some(PathBuf::from("/tmp/explicit.db")), Some(&config_path)).unwrap();
        assert_eq!(resolved.database, PathBuf::from("/tmp/explicit.db"));
    }

    #[test]
    fn test_relative_path_is_relative_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("litshelf.toml");
        write_config(&config_path, &LitshelfConfig::with_database("data/literature.db"), false).unwrap();

        let resolved = resolve_store_config(None, Some(&config_path)).unwrap();
        assert_eq!(resolved.database, dir.path().join("data/literature.db"));
    }

    #[test]
    fn test_missing_configuration_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_store_config(None, Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("no database configured"));
    }

    #[test]
    fn test_write_config_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("litshelf.toml");
        let config = LitshelfConfig::default();

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();
    }

    #[test]
    fn test_written_file_has_header_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("litshelf.toml");
        let config = LitshelfConfig::with_database("/data/literature.db");

        write_config(&path, &config, false).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# litshelf configuration"));
        assert!(text.contains("[limits]"));

        assert_eq!(load_config(Some(&path)).unwrap(), Some(config));
    }

    #[test]
    fn test_partial_limits_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("litshelf.toml");
        std::fs::write(&path, "database = \"lit.db\"\n\n[limits]\nsearch = 3\n").unwrap();

        let config = load_or_default(Some(&path)).unwrap();
        assert_eq!(config.limits.search, 3);
        assert_eq!(config.limits.list, DEFAULT_LIST_LIMIT);
    }

    #[test]
    fn test_missing_file_gives_default_limits() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.limits, Limits::default());
        assert!(config.database.is_none());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("litshelf.toml");
        std::fs::write(&path, "databse = \"typo.db\"\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }
}
