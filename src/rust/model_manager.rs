use std::path::{Component, Path, PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Digest};

use crate::classifier::{OnnxModelProvider, CONFIG_FILE, MODEL_FILE, TOKENIZER_FILE};

pub const ENV_CACHE_DIR: &str = "TXCAT_CACHE";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not downloaded: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid manifest: {0}")]
    InvalidManifest(#[from] serde_json::Error),
    #[error("Invalid model name: {0:?}")]
    InvalidName(String),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// Where to fetch a model bundle from and the SHA-256 of each file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub model_url: String,
    pub tokenizer_url: String,
    pub config_url: String,
    pub model_hash: String,
    pub tokenizer_hash: String,
    pub config_hash: String,
}

impl ModelInfo {
    /// Reads a model manifest (a JSON object with the fields of `ModelInfo`).
    pub fn from_manifest(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path)?;
        let info: Self = serde_json::from_str(&raw)?;
        validate_model_name(&info.name)?;
        Ok(info)
    }

    fn files(&self) -> [(&'static str, &str, &str); 3] {
        [
            (MODEL_FILE, self.model_url.as_str(), self.model_hash.as_str()),
            (TOKENIZER_FILE, self.tokenizer_url.as_str(), self.tokenizer_hash.as_str()),
            (CONFIG_FILE, self.config_url.as_str(), self.config_hash.as_str()),
        ]
    }
}

/// Local cache of model bundles, one directory per model name.
#[derive(Debug, Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var(ENV_CACHE_DIR) {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("txcat").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("txcat").join("models");
        }

        // 4. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("txcat").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn get_model_dir(&self, name: &str) -> PathBuf {
        self.models_dir.join(name)
    }

    pub fn get_model_path(&self, name: &str) -> PathBuf {
        self.get_model_dir(name).join(MODEL_FILE)
    }

    pub fn get_tokenizer_path(&self, name: &str) -> PathBuf {
        self.get_model_dir(name).join(TOKENIZER_FILE)
    }

    pub fn get_config_path(&self, name: &str) -> PathBuf {
        self.get_model_dir(name).join(CONFIG_FILE)
    }

    pub fn is_model_downloaded(&self, name: &str) -> bool {
        if validate_model_name(name).is_err() {
            return false;
        }
        let dir = self.get_model_dir(name);
        let present = [MODEL_FILE, TOKENIZER_FILE, CONFIG_FILE]
            .iter()
            .all(|file| dir.join(file).exists());
        log::debug!("Model '{}' downloaded: {} ({:?})", name, present, dir);
        present
    }

    /// Provider for a downloaded model; fails if any file is missing.
    pub fn provider(&self, name: &str) -> Result<OnnxModelProvider, ModelError> {
        validate_model_name(name)?;
        if !self.is_model_downloaded(name) {
            return Err(ModelError::NotDownloaded(name.to_string()));
        }
        Ok(OnnxModelProvider::from_dir(self.get_model_dir(name)))
    }

    pub async fn download_model(&self, info: &ModelInfo) -> Result<(), ModelError> {
        validate_model_name(&info.name)?;
        let _lock = self.download_lock.lock().await;

        let model_dir = self.get_model_dir(&info.name);
        log::info!("Creating model directory at {:?}", model_dir);
        fs::create_dir_all(&model_dir)?;

        for (file, url, hash) in info.files() {
            let path = model_dir.join(file);
            let result = if path.exists() && self.verify_file(&path, hash)? {
                log::info!("Existing {} verified successfully", file);
                Ok(())
            } else {
                if path.exists() {
                    log::warn!("{} verification failed, redownloading", file);
                }
                self.download_and_verify_file(url, &path, hash, file).await
            };

            if let Err(e) = result {
                log::error!("Failed to set up {}: {}", file, e);
                // Cleanup on failure
                let _ = self.remove_download(&info.name);
                return Err(e);
            }
        }

        log::info!("Model '{}' ready to use", info.name);
        Ok(())
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);
        log::debug!("Verifying {:?}: calculated {}, expected {}", path, hash, expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    pub fn verify_model(&self, info: &ModelInfo) -> Result<bool, ModelError> {
        validate_model_name(&info.name)?;
        let model_dir = self.get_model_dir(&info.name);
        log::info!("Verifying model files in {:?}", model_dir);

        for (file, _, hash) in info.files() {
            let path = model_dir.join(file);
            if !path.exists() {
                log::info!("{} does not exist", file);
                return Ok(false);
            }
            if !self.verify_file(&path, hash)? {
                log::info!("{} hash verification failed", file);
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: &str,
        file_type: &str,
    ) -> Result<(), ModelError> {
        log::info!("Downloading {} from {} to {:?}", file_type, url, path);
        let response = reqwest::get(url).await?.error_for_status()?;
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        let hash = sha256_hex(&bytes);
        if !hash.eq_ignore_ascii_case(expected_hash) {
            log::error!("{} hash mismatch: expected {}, got {}", file_type, expected_hash, hash);
            return Err(ModelError::HashMismatch {
                file_type: file_type.to_string(),
                expected: expected_hash.to_string(),
                actual: hash,
            });
        }

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;

        // Verify after writing
        if !self.verify_file(path, expected_hash)? {
            return Err(ModelError::VerificationFailed);
        }

        log::info!("{} downloaded and verified successfully", file_type);
        Ok(())
    }

    pub fn remove_download(&self, name: &str) -> Result<(), ModelError> {
        validate_model_name(name)?;
        let dir = self.get_model_dir(name);
        for file in [MODEL_FILE, TOKENIZER_FILE, CONFIG_FILE] {
            let path = dir.join(file);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Ensures that a model is downloaded and verified.
    /// If the model doesn't exist, it will be downloaded.
    /// If verification fails, it will be re-downloaded.
    pub async fn ensure_model_downloaded(&self, info: &ModelInfo) -> Result<(), ModelError> {
        if !self.is_model_downloaded(&info.name) {
            log::info!("Model '{}' not found, downloading...", info.name);
            self.download_model(info).await?;
        } else if !self.verify_model(info)? {
            log::info!("Model '{}' verification failed, re-downloading...", info.name);
            self.remove_download(&info.name)?;
            self.download_model(info).await?;
        } else {
            log::info!("Model '{}' verification successful", info.name);
        }
        Ok(())
    }
}

/// A model name must be a single plain path component so that its directory
/// stays inside the models directory.
pub fn validate_model_name(name: &str) -> Result<(), ModelError> {
    let mut components = Path::new(name).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !plain || name.contains(&['/', '\\'][..]) {
        return Err(ModelError::InvalidName(name.to_string()));
    }
    Ok(())
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_manager(tag: &str) -> ModelManager {
        let dir = env::temp_dir().join(format!("txcat-mm-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        ModelManager::new(dir).unwrap()
    }

    fn write_bundle(manager: &ModelManager, name: &str) -> ModelInfo {
        let dir = manager.get_model_dir(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MODEL_FILE), b"onnx bytes").unwrap();
        fs::write(dir.join(TOKENIZER_FILE), b"{}").unwrap();
        fs::write(dir.join(CONFIG_FILE), br#"{"id2label": {"0": "groceries"}}"#).unwrap();
        ModelInfo {
            name: name.to_string(),
            model_url: "http://127.0.0.1:9/model.onnx".to_string(),
            tokenizer_url: "http://127.0.0.1:9/tokenizer.json".to_string(),
            config_url: "http://127.0.0.1:9/config.json".to_string(),
            model_hash: sha256_hex(b"onnx bytes"),
            tokenizer_hash: sha256_hex(b"{}"),
            config_hash: sha256_hex(br#"{"id2label": {"0": "groceries"}}"#),
        }
    }

    #[test]
    fn test_paths() {
        let manager = temp_manager("paths");
        assert!(manager.get_model_path("txn-minilm").ends_with("txn-minilm/model.onnx"));
        assert!(manager.get_tokenizer_path("txn-minilm").ends_with("txn-minilm/tokenizer.json"));
        assert!(manager.get_config_path("txn-minilm").ends_with("txn-minilm/config.json"));
    }

    #[test]
    fn test_verify_model() {
        let manager = temp_manager("verify");
        let info = write_bundle(&manager, "bundle");
        assert!(manager.is_model_downloaded("bundle"));
        assert!(manager.verify_model(&info).unwrap());
        assert!(manager.provider("bundle").is_ok());

        // Corrupt file and verify
        fs::write(manager.get_model_path("bundle"), "corrupted data").unwrap();
        assert!(!manager.verify_model(&info).unwrap());

        manager.remove_download("bundle").unwrap();
        assert!(!manager.is_model_downloaded("bundle"));
        assert!(!manager.verify_model(&info).unwrap());
        assert!(matches!(manager.provider("bundle"), Err(ModelError::NotDownloaded(_))));
    }

    #[tokio::test]
    async fn test_ensure_downloaded_skips_verified_bundle() {
        let manager = temp_manager("ensure");
        let info = write_bundle(&manager, "bundle");
        // The URLs are unreachable, so this only succeeds if nothing is fetched.
        manager.ensure_model_downloaded(&info).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_download_cleans_up() {
        let manager = temp_manager("cleanup");
        let mut info = write_bundle(&manager, "bundle");
        info.config_hash = "0".repeat(64);
        assert!(manager.download_model(&info).await.is_err());
        assert!(!manager.get_model_path("bundle").exists());
    }

    #[test]
    fn test_manifest() {
        let manager = temp_manager("manifest");
        let info = write_bundle(&manager, "bundle");
        let path = manager.get_model_dir("bundle").join("manifest.json");
        fs::write(&path, serde_json::to_string(&info).unwrap()).unwrap();
        assert_eq!(ModelInfo::from_manifest(&path).unwrap(), info);

        fs::write(&path, "{").unwrap();
        assert!(matches!(ModelInfo::from_manifest(&path), Err(ModelError::InvalidManifest(_))));
    }

    #[tokio::test]
    async fn test_rejects_names_outside_cache() {
        let manager = temp_manager("names");
        let outside = manager.models_dir.parent().unwrap().join(format!("txcat-outside-{}", std::process::id()));
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join(MODEL_FILE), b"keep me").unwrap();

        let escaping = format!("../{}", outside.file_name().unwrap().to_str().unwrap());
        for name in [escaping.as_str(), "..", ".", "", "a/b", "a\\b", "/abs"] {
            assert!(matches!(validate_model_name(name), Err(ModelError::InvalidName(_))), "{:?}", name);
            assert!(matches!(manager.remove_download(name), Err(ModelError::InvalidName(_))));
            assert!(!manager.is_model_downloaded(name));
            assert!(matches!(manager.provider(name), Err(ModelError::InvalidName(_))));
        }
        assert!(outside.join(MODEL_FILE).exists());

        let mut info = write_bundle(&manager, "bundle");
        info.name = escaping;
        assert!(matches!(manager.verify_model(&info), Err(ModelError::InvalidName(_))));
        assert!(matches!(manager.download_model(&info).await, Err(ModelError::InvalidName(_))));

        let path = manager.get_model_dir("bundle").join("manifest.json");
        fs::write(&path, serde_json::to_string(&info).unwrap()).unwrap();
        assert!(matches!(ModelInfo::from_manifest(&path), Err(ModelError::InvalidName(_))));
        assert!(outside.join(MODEL_FILE).exists());

        assert!(validate_model_name("txn-minilm").is_ok());
        fs::remove_dir_all(&outside).unwrap();
    }

    #[test]
    fn test_default_models_dir() {
        env::set_var(ENV_CACHE_DIR, "/tmp/test-cache");
        let path = ModelManager::get_default_models_dir();
        env::remove_var(ENV_CACHE_DIR);
        assert!(path.to_str().unwrap().contains("/tmp/test-cache/models"));

        let path = ModelManager::get_default_models_dir();
        assert!(path.to_str().unwrap().contains("txcat"));
    }
}
