use {anyhow::Result, folio_config::FolioConfig, serde_json::Value};

const REDACTED: &str = "[REDACTED]";

/// Keys holding credentials, at any depth.
const SECRET_KEYS: &[&str] = &["api_key", "token"];

pub fn print_config(config: &FolioConfig) -> Result<()> {
    if let Some(dir) = folio_config::config_dir() {
        eprintln!("# user config dir: {}", dir.display());
    }
    for diagnostic in folio_config::validate(config).diagnostics {
        eprintln!("# {diagnostic}");
    }
    println!("{}", render(config)?);
    Ok(())
}

/// TOML rendering of `config` with credentials masked.
fn render(config: &FolioConfig) -> Result<String> {
    let mut value = serde_json::to_value(config)?;
    scrub(&mut value);
    Ok(toml::to_string_pretty(&value)?)
}

/// Mask secrets and drop nulls, which TOML cannot represent.
fn scrub(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for (key, v) in map.iter_mut() {
                if SECRET_KEYS.contains(&key.as_str()) && v.is_string() {
                    *v = Value::String(REDACTED.into());
                } else {
                    scrub(v);
                }
            }
        },
        Value::Array(items) => items.iter_mut().for_each(scrub),
        _ => {},
    }
}
