use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// A downloadable model file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSource {
    pub file_name: String,
    pub url: String,
}

impl ModelSource {
    pub fn new(file_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            url: url.into(),
        }
    }
}

/// Locates model files on disk, downloading them into the cache on a miss.
///
/// Resolution order:
/// 1. Cache directory
/// 2. Bundled directory (development / pre-packaged installs)
/// 3. Download to the cache directory
#[derive(Clone, Debug)]
pub struct ModelResolver {
    cache_dir: PathBuf,
    bundled_dir: Option<PathBuf>,
}

impl ModelResolver {
    pub fn new(cache_dir: PathBuf, bundled_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir,
            bundled_dir,
        }
    }

    /// Resolver rooted at the platform cache directory.
    pub fn with_default_cache() -> Result<Self, ModelResolveError> {
        Ok(Self::new(model_cache_dir()?, None))
    }

    pub fn with_bundled_dir(mut self, dir: PathBuf) -> Self {
        self.bundled_dir = Some(dir);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path of an already-available copy without touching the network.
    pub fn find_local(&self, source: &ModelSource) -> Option<PathBuf> {
        let cached = self.cache_dir.join(&source.file_name);
        if cached.exists() {
            return Some(cached);
        }
        self.bundled_dir
            .as_ref()
            .map(|dir| dir.join(&source.file_name))
            .filter(|p| p.exists())
    }

    pub fn resolve(
        &self,
        source: &ModelSource,
        progress: Option<&ProgressFn>,
    ) -> Result<PathBuf, ModelResolveError> {
        if let Some(path) = self.find_local(source) {
            log::debug!("Using local model {}", path.display());
            return Ok(path);
        }

        fs::create_dir_all(&self.cache_dir).map_err(ModelResolveError::CacheDir)?;
        let dest = self.cache_dir.join(&source.file_name);
        log::info!("Downloading {} from {}", source.file_name, source.url);
        download(&source.url, &dest, progress)?;
        Ok(dest)
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/EmotionLens/models/`
/// - Linux: `$XDG_CACHE_HOME/EmotionLens/models/` or `~/.cache/EmotionLens/models/`
/// - Windows: `%LOCALAPPDATA%/EmotionLens/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join(APP_DIR_NAME).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<&ProgressFn>) -> Result<(), ModelResolveError> {
    let download_err = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };

    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;
    let total = response.content_length().unwrap_or(0);
    let bytes = response.bytes().map_err(download_err)?;

    // Written under a temp name and renamed so a failed download never
    // leaves a truncated model at `dest`.
    let temp_path = dest.with_extension("part");
    let write_err = |source| ModelResolveError::Write {
        path: temp_path.clone(),
        source,
    };
    let mut file = fs::File::create(&temp_path).map_err(write_err)?;

    let mut downloaded: u64 = 0;
    for chunk in bytes.chunks(1024 * 1024) {
        file.write_all(chunk).map_err(write_err)?;
        downloaded += chunk.len() as u64;
        if let Some(cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const UNREACHABLE_URL: &str = "http://invalid.nonexistent.example.com/model.onnx";

    fn source() -> ModelSource {
        ModelSource::new("test_model.onnx", UNREACHABLE_URL)
    }

    #[test]
    fn test_resolve_prefers_cached_file() {
        let tmp = TempDir::new().unwrap();
        let cached = tmp.path().join("test_model.onnx");
        fs::write(&cached, b"cached").unwrap();

        let resolver = ModelResolver::new(tmp.path().to_path_buf(), None);
        assert_eq!(resolver.resolve(&source(), None).unwrap(), cached);
    }

    #[test]
    fn test_resolve_falls_back_to_bundled_dir() {
        let tmp = TempDir::new().unwrap();
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("test_model.onnx"), b"bundled").unwrap();

        let resolver =
            ModelResolver::new(tmp.path().join("cache"), None).with_bundled_dir(bundled.clone());
        let path = resolver.resolve(&source(), None).unwrap();
        assert_eq!(path, bundled.join("test_model.onnx"));
        assert!(!resolver.cache_dir().exists(), "no download attempted");
    }

    #[test]
    fn test_find_local_misses_when_absent() {
        let tmp = TempDir::new().unwrap();
        let resolver = ModelResolver::new(tmp.path().to_path_buf(), Some(tmp.path().join("b")));
        assert!(resolver.find_local(&source()).is_none());
    }

    #[test]
    fn test_resolve_download_failure_leaves_no_partial_file() {
        let tmp = TempDir::new().unwrap();
        let resolver = ModelResolver::new(tmp.path().join("cache"), None);
        let result = resolver.resolve(&source(), None);
        assert!(matches!(result, Err(ModelResolveError::Download { .. })));

        let dest = tmp.path().join("cache").join("test_model.onnx");
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }

    #[test]
    fn test_model_cache_dir_is_app_scoped() {
        let path = model_cache_dir().unwrap();
        assert!(path.ends_with(Path::new(APP_DIR_NAME).join("models")));
    }
}
