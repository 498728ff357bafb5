//! Resolves the cloud vision/embedding provider's API key (spec §9).
//!
//! Resolution order: (1) an explicit override passed by the caller, (2) a
//! subscription-managed key from the platform secure store scoped to the
//! signed-in user, (3) a file at `~/.config/<AppName>/<provider>-api-key.txt`,
//! (4) an environment variable named per provider. A valid key is a
//! non-empty, whitespace-trimmed string of at least 10 characters.

use std::path::PathBuf;

const MIN_KEY_LEN: usize = 10;

/// Abstracts the platform secure store (keychain/credential manager) as a
/// capability — out of scope to implement per-platform here, so callers
/// supply one, or `None` to skip tier 2 entirely.
pub trait SecureStore: Send + Sync {
    fn fetch(&self, service_id: &str) -> Option<String>;
}

pub struct ApiKeyResolver<'a> {
    pub app_name: &'a str,
    pub provider: &'a str,
    pub secure_store: Option<&'a dyn SecureStore>,
    pub config_dir: Option<PathBuf>,
}

impl<'a> ApiKeyResolver<'a> {
    pub fn new(app_name: &'a str, provider: &'a str) -> Self {
        Self { app_name, provider, secure_store: None, config_dir: None }
    }

    pub fn with_secure_store(mut self, store: &'a dyn SecureStore) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Overrides the `~/.config` base directory; used by tests to avoid
    /// touching the real home directory.
    pub fn with_config_dir(mut self, dir: PathBuf) -> Self {
        self.config_dir = Some(dir);
        self
    }

    pub fn resolve(&self, explicit_override: Option<&str>) -> Option<String> {
        if let Some(key) = explicit_override {
            if is_valid(key) {
                return Some(key.trim().to_string());
            }
        }

        if let Some(store) = self.secure_store {
            let service_id = format!("{}/{}", self.app_name, self.provider);
            if let Some(key) = store.fetch(&service_id) {
                if is_valid(&key) {
                    return Some(key.trim().to_string());
                }
            }
        }

        if let Some(path) = self.config_file_path() {
            if let Ok(contents) = std::fs::read_to_string(&path) {
                if is_valid(&contents) {
                    return Some(contents.trim().to_string());
                }
            }
        }

        let env_var = format!("{}_API_KEY", self.provider.to_uppercase());
        if let Ok(key) = std::env::var(&env_var) {
            if is_valid(&key) {
                return Some(key.trim().to_string());
            }
        }

        None
    }

    fn config_file_path(&self) -> Option<PathBuf> {
        let base = self.config_dir.clone().or_else(|| dirs_home().map(|h| h.join(".config")))?;
        Some(base.join(self.app_name).join(format!("{}-api-key.txt", self.provider)))
    }
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn is_valid(key: &str) -> bool {
    key.trim().len() >= MIN_KEY_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubStore(Option<String>);
    impl SecureStore for StubStore {
        fn fetch(&self, _service_id: &str) -> Option<String> {
            self.0.clone()
        }
    }

    #[test]
    fn explicit_override_wins_when_valid() {
        let resolver = ApiKeyResolver::new("Videx", "gemini");
        assert_eq!(resolver.resolve(Some("sk-abcdefghij")), Some("sk-abcdefghij".to_string()));
    }

    #[test]
    fn too_short_override_is_rejected_falls_through() {
        let resolver = ApiKeyResolver::new("Videx", "gemini");
        assert_eq!(resolver.resolve(Some("short")), None);
    }

    #[test]
    fn secure_store_used_when_no_override() {
        let store = StubStore(Some("secure-store-key-123".to_string()));
        let resolver = ApiKeyResolver::new("Videx", "gemini").with_secure_store(&store);
        assert_eq!(resolver.resolve(None), Some("secure-store-key-123".to_string()));
    }

    #[test]
    fn config_file_used_when_store_empty() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("Videx");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("gemini-api-key.txt"), "  file-based-key-1  \n").unwrap();

        let store = StubStore(None);
        let resolver = ApiKeyResolver::new("Videx", "gemini")
            .with_secure_store(&store)
            .with_config_dir(dir.path().to_path_buf());
        assert_eq!(resolver.resolve(None), Some("file-based-key-1".to_string()));
    }

    #[test]
    fn no_source_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        std::env::remove_var("GEMINI_API_KEY");
        let resolver = ApiKeyResolver::new("Videx", "gemini").with_config_dir(dir.path().to_path_buf());
        assert_eq!(resolver.resolve(None), None);
    }
}
