use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{BibliographicProvider, Config, CoreError, WebProvider};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub search: Option<SearchConfig>,
    pub concurrency: Option<ConcurrencyConfig>,
    pub identity: Option<IdentityConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub scan_limit: Option<usize>,
    pub bibliographic: Option<String>,
    pub primary_web: Option<String>,
    pub secondary_web: Option<String>,
    pub searxng_url: Option<String>,
    pub openalex_mailto: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    pub num_workers: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
}

/// Platform config directory path: `<config_dir>/citecheck/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("citecheck").join("config.toml"))
}

/// Load config by cascading CWD `.citecheck.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".citecheck.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

fn pick<S, T>(
    overlay: &Option<S>,
    base: &Option<S>,
    field: impl Fn(&S) -> Option<T>,
) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (bs, os) = (&base.search, &overlay.search);
    let (bc, oc) = (&base.concurrency, &overlay.concurrency);
    let (bi, oi) = (&base.identity, &overlay.identity);

    ConfigFile {
        search: Some(SearchConfig {
            scan_limit: pick(os, bs, |s| s.scan_limit),
            bibliographic: pick(os, bs, |s| s.bibliographic.clone()),
            primary_web: pick(os, bs, |s| s.primary_web.clone()),
            secondary_web: pick(os, bs, |s| s.secondary_web.clone()),
            searxng_url: pick(os, bs, |s| s.searxng_url.clone()),
            openalex_mailto: pick(os, bs, |s| s.openalex_mailto.clone()),
        }),
        concurrency: Some(ConcurrencyConfig {
            num_workers: pick(oc, bc, |c| c.num_workers),
            timeout_secs: pick(oc, bc, |c| c.timeout_secs),
        }),
        identity: Some(IdentityConfig {
            user_agent: pick(oi, bi, |i| i.user_agent.clone()),
            accept_language: pick(oi, bi, |i| i.accept_language.clone()),
        }),
    }
}

impl ConfigFile {
    /// Apply every value present in the file onto `config`.
    ///
    /// Unknown provider names are a configuration error.
    pub fn apply_to(&self, config: &mut Config) -> Result<(), CoreError> {
        if let Some(search) = &self.search {
            if let Some(n) = search.scan_limit {
                config.scan_limit = n;
            }
            if let Some(ref name) = search.bibliographic {
                config.bibliographic = name
                    .parse::<BibliographicProvider>()
                    .map_err(CoreError::Config)?;
            }
            if let Some(ref name) = search.primary_web {
                config.primary_web = name.parse::<WebProvider>().map_err(CoreError::Config)?;
            }
            if let Some(ref name) = search.secondary_web {
                config.secondary_web = name.parse::<WebProvider>().map_err(CoreError::Config)?;
            }
            if search.searxng_url.is_some() {
                config.searxng_url = search.searxng_url.clone();
            }
            if search.openalex_mailto.is_some() {
                config.openalex_mailto = search.openalex_mailto.clone();
            }
        }
        if let Some(concurrency) = &self.concurrency {
            if let Some(n) = concurrency.num_workers {
                config.num_workers = n;
            }
            if let Some(secs) = concurrency.timeout_secs {
                config.timeout_secs = secs;
            }
        }
        if let Some(identity) = &self.identity {
            if let Some(ref ua) = identity.user_agent {
                config.identity.user_agent = ua.clone();
            }
            if let Some(ref lang) = identity.accept_language {
                config.identity.accept_language = lang.clone();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_parses() {
        let toml_str = "[search]\nscan_limit = 8\nprimary_web = \"bing\"\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        let search = parsed.search.unwrap();
        assert_eq!(search.scan_limit, Some(8));
        assert!(search.secondary_web.is_none());
        assert!(parsed.concurrency.is_none());
    }

    #[test]
    fn merge_overlay_wins_and_base_survives() {
        let base = ConfigFile {
            search: Some(SearchConfig {
                scan_limit: Some(3),
                searxng_url: Some("http://base:8080".into()),
                ..Default::default()
            }),
            concurrency: Some(ConcurrencyConfig {
                timeout_secs: Some(20),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            search: Some(SearchConfig {
                scan_limit: Some(7),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        let search = merged.search.unwrap();
        assert_eq!(search.scan_limit, Some(7));
        assert_eq!(search.searxng_url.as_deref(), Some("http://base:8080"));
        assert_eq!(merged.concurrency.unwrap().timeout_secs, Some(20));
    }

    #[test]
    fn apply_sets_present_fields_only() {
        let file = ConfigFile {
            search: Some(SearchConfig {
                bibliographic: Some("openalex".into()),
                secondary_web: Some("searxng".into()),
                searxng_url: Some("http://localhost:8080".into()),
                ..Default::default()
            }),
            identity: Some(IdentityConfig {
                accept_language: Some("de-DE".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut config = Config::default();
        file.apply_to(&mut config).unwrap();
        assert_eq!(config.bibliographic, BibliographicProvider::OpenAlex);
        assert_eq!(config.primary_web, WebProvider::Google);
        assert_eq!(config.secondary_web, WebProvider::Searxng);
        assert_eq!(config.identity.accept_language, "de-DE");
        assert_eq!(config.scan_limit, crate::DEFAULT_SCAN_LIMIT);
    }

    #[test]
    fn apply_rejects_unknown_provider() {
        let file = ConfigFile {
            search: Some(SearchConfig {
                primary_web: Some("altavista".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut config = Config::default();
        assert!(matches!(
            file.apply_to(&mut config),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn unparseable_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[search\nscan_limit = ").unwrap();
        assert!(load_from_path(&path).is_none());
    }
}
