use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::FolioConfig,
    validate::validate,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["folio.toml", "folio.yaml", "folio.yml", "folio.json"];

/// Environment variable consulted when `evaluator.api_key` is unset.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Load config from the given path (any supported format).
///
/// Validation errors fail the load; warnings are logged.
pub fn load_config(path: &Path) -> Result<FolioConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    let config = parse_config(&raw, path)?;

    let result = validate(&config);
    for warning in result.warnings() {
        warn!(path = %path.display(), "{warning}");
    }
    if result.has_errors() {
        let problems = result
            .errors()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::Invalid {
            path: path.to_path_buf(),
            problems,
        });
    }
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./folio.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/folio/folio.{toml,yaml,yml,json}` (user-global)
///
/// Returns `FolioConfig::default()` if no config file is found or the file
/// cannot be parsed.
pub fn discover_and_load() -> FolioConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    FolioConfig::default()
}

/// Fill secrets that the file left empty from the process environment.
pub fn apply_env_overrides(config: &mut FolioConfig, lookup: impl Fn(&str) -> Option<String>) {
    if config.evaluator.api_key.is_none()
        && let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty())
    {
        config.evaluator.api_key = Some(Secret::new(key));
    }
}

fn find_config_file() -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .or_else(|| {
            let dir = config_dir()?;
            CONFIG_FILENAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|p| p.exists())
        })
}

/// Returns the user-global config directory (`~/.config/folio/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "folio").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<FolioConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        _ => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, folio_common::Mode, rstest::rstest, secrecy::ExposeSecret, std::io::Write};

    fn write_config(name: &str, body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(body.as_bytes())
            .unwrap();
        (dir, path)
    }

    #[rstest]
    #[case("folio.toml", "[review]\ndebounce_ms = 250\n")]
    #[case("folio.yaml", "review:\n  debounce_ms: 250\n")]
    #[case("folio.json", r#"{"review": {"debounce_ms": 250}}"#)]
    fn loads_every_supported_format(#[case] name: &str, #[case] body: &str) {
        let (_dir, path) = write_config(name, body);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.review.debounce_ms, 250);
        assert_eq!(cfg.review.default_mode, Mode::Basic);
    }

    #[test]
    fn rejects_unknown_extension() {
        let (_dir, path) = write_config("folio.ini", "debounce=1");
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let (_dir, path) = write_config("folio.toml", "[review\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("folio.toml"));
    }

    #[test]
    fn out_of_range_values_fail_the_load() {
        let (_dir, path) = write_config("folio.toml", "[review]\nfragment_limit = 0\n");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::Invalid { .. }));
        assert!(err.to_string().contains("review.fragment_limit"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_config(Path::new("/nonexistent/folio.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn env_fills_missing_api_key() {
        let mut cfg = FolioConfig::default();
        apply_env_overrides(&mut cfg, |name| {
            (name == API_KEY_ENV).then(|| "sk-env".to_string())
        });
        assert_eq!(
            cfg.evaluator.api_key.as_ref().unwrap().expose_secret(),
            "sk-env"
        );
    }

    #[test]
    fn file_api_key_wins_over_env() {
        let mut cfg = FolioConfig::default();
        cfg.evaluator.api_key = Some(Secret::new("sk-file".into()));
        apply_env_overrides(&mut cfg, |_| Some("sk-env".to_string()));
        assert_eq!(
            cfg.evaluator.api_key.as_ref().unwrap().expose_secret(),
            "sk-file"
        );
    }
}
