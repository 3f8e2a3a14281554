//! API key lookup, done once at startup. The resolved value is handed to the
//! dispatcher explicitly.

use std::{fs, path::Path};

pub const API_KEY_NAME: &str = "RAPIDAPI_KEY";

/// Secrets file first, then the process environment (after `.env`).
pub fn resolve_api_key(secrets_path: &Path) -> Option<String> {
    if let Some(key) = api_key_from_file(secrets_path) {
        log::debug!("{API_KEY_NAME} read from {}", secrets_path.display());
        return Some(key);
    }

    if let Ok(path) = dotenvy::dotenv() {
        log::debug!("Loaded environment from {}", path.display());
    }

    let key = api_key_from_env(|name| std::env::var(name).ok());
    if key.is_none() {
        log::warn!("{API_KEY_NAME} not found, remote try-on is disabled");
    }
    key
}

pub fn api_key_from_file(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    let table = match toml::from_str::<toml::Table>(&text) {
        Ok(table) => table,
        Err(e) => {
            log::warn!("Ignore invalid secrets file {}. {e}", path.display());
            return None;
        }
    };

    table
        .get(API_KEY_NAME)
        .and_then(|value| value.as_str())
        .and_then(non_empty)
}

pub fn api_key_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    lookup(API_KEY_NAME).as_deref().and_then(non_empty)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");

        assert_eq!(api_key_from_file(&path), None);

        fs::write(&path, "RAPIDAPI_KEY = \" abc123 \"\n").unwrap();
        assert_eq!(api_key_from_file(&path), Some("abc123".to_string()));

        fs::write(&path, "RAPIDAPI_KEY = \"\"\n").unwrap();
        assert_eq!(api_key_from_file(&path), None);

        fs::write(&path, "OTHER = \"x\"\n").unwrap();
        assert_eq!(api_key_from_file(&path), None);

        fs::write(&path, "not = [toml").unwrap();
        assert_eq!(api_key_from_file(&path), None);
    }

    #[test]
    fn test_api_key_from_env() {
        assert_eq!(
            api_key_from_env(|name| (name == API_KEY_NAME).then(|| "k".to_string())),
            Some("k".to_string())
        );
        assert_eq!(api_key_from_env(|_| None), None);
        assert_eq!(api_key_from_env(|_| Some("  ".to_string())), None);
    }

    #[test]
    fn test_secrets_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        fs::write(&path, "RAPIDAPI_KEY = \"from-file\"\n").unwrap();

        assert_eq!(resolve_api_key(&path), Some("from-file".to_string()));
    }
}
