//! Configuration types for orientation normalisation and splitting.
//!
//! All pipeline behaviour is controlled through [`SplitConfig`], built via
//! its [`SplitConfigBuilder`]. The HTTP listener has its own small
//! [`ServerConfig`] because the only thing the environment supplies for it
//! is a port.

use crate::error::SplitError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// Default rasterisation DPI.
pub const DEFAULT_DPI: u32 = 200;

/// Default upper bound on pages per request.
pub const DEFAULT_MAX_PAGES: usize = 500;

/// Default upper bound on decoded document size (64 MiB).
pub const DEFAULT_MAX_INPUT_BYTES: usize = 64 * 1024 * 1024;

/// Default per-request wall-clock budget in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Configuration for a normalise-and-split run.
///
/// Built via [`SplitConfig::builder()`] or using [`SplitConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfsplit::SplitConfig;
///
/// let config = SplitConfig::builder()
///     .dpi(150)
///     .concurrency(4)
///     .max_pages(100)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct SplitConfig {
    /// Rasterisation DPI used for orientation detection and for the
    /// corrected output pages. Range: 72–600. Default: 200.
    ///
    /// This is the quality/cost knob of the whole pipeline: the corrected
    /// document is built from these rasters, so lower values shrink memory
    /// and output size at the price of classifier accuracy and print quality.
    pub dpi: u32,

    /// Number of pages rasterised and classified at once. Default: number of
    /// available cores.
    pub concurrency: usize,

    /// Reject documents with more pages than this. Default: 500.
    pub max_pages: usize,

    /// Reject decoded documents larger than this many bytes. Default: 64 MiB.
    pub max_input_bytes: usize,

    /// Wall-clock budget for one HTTP request in seconds. Default: 300.
    ///
    /// On expiry the request fails at once. Pages already rendering finish
    /// in the background but skip classification.
    pub request_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Settings for the bundled Tesseract orientation classifier.
    pub tesseract: TesseractConfig,

    /// Explicit path to libpdfium. Falls back to `PDFIUM_LIB_PATH`, then to
    /// the system library search path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            concurrency: default_concurrency(),
            max_pages: DEFAULT_MAX_PAGES,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            password: None,
            tesseract: TesseractConfig::default(),
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SplitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitConfig")
            .field("dpi", &self.dpi)
            .field("concurrency", &self.concurrency)
            .field("max_pages", &self.max_pages)
            .field("max_input_bytes", &self.max_input_bytes)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("tesseract", &self.tesseract)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

impl SplitConfig {
    /// Create a new builder for `SplitConfig`.
    pub fn builder() -> SplitConfigBuilder {
        SplitConfigBuilder {
            config: Self::default(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Builder for [`SplitConfig`].
#[derive(Debug)]
pub struct SplitConfigBuilder {
    config: SplitConfig,
}

impl SplitConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n;
        self
    }

    pub fn max_input_bytes(mut self, n: usize) -> Self {
        self.config.max_input_bytes = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn tesseract(mut self, tesseract: TesseractConfig) -> Self {
        self.config.tesseract = tesseract;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SplitConfig, SplitError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(SplitError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(SplitError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_pages == 0 {
            return Err(SplitError::InvalidConfig("max_pages must be ≥ 1".into()));
        }
        if c.max_input_bytes == 0 {
            return Err(SplitError::InvalidConfig(
                "max_input_bytes must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(SplitError::InvalidConfig(
                "request_timeout_secs must be ≥ 1".into(),
            ));
        }
        if let Some(conf) = c.tesseract.min_confidence {
            if !conf.is_finite() || conf < 0.0 {
                return Err(SplitError::InvalidConfig(format!(
                    "min_confidence must be a non-negative number, got {conf}"
                )));
            }
        }
        Ok(self.config)
    }
}

/// How the bundled [`crate::pipeline::tesseract::TesseractClassifier`]
/// invokes the `tesseract` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TesseractConfig {
    /// Program name or path. Default: `tesseract`.
    pub binary: PathBuf,

    /// Value for `-l`. Default: `osd`. `None` omits the flag.
    pub lang: Option<String>,

    /// OSD results whose "Orientation confidence" falls below this are
    /// reported as unknown. Default: none (every parsed rotation is trusted).
    pub min_confidence: Option<f32>,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            lang: Some("osd".to_string()),
            min_confidence: None,
        }
    }
}

/// Listener settings for the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind. Default: `0.0.0.0`.
    pub host: String,
    /// TCP port. Default: `$PORT`, else 8080.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Read `PORT` from the environment, keeping the default when it is
    /// unset or not a valid port number.
    pub fn from_env() -> Self {
        Self::with_port_var(std::env::var("PORT").ok().as_deref())
    }

    fn with_port_var(port: Option<&str>) -> Self {
        let mut config = Self::default();
        match port.map(|p| (p, p.trim().parse::<u16>())) {
            None => {}
            Some((_, Ok(port))) => config.port = port,
            Some((raw, Err(e))) => warn!(
                "Ignoring invalid PORT {:?} ({}), listening on {}",
                raw, e, config.port
            ),
        }
        config
    }

    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_var_parsing() {
        assert_eq!(ServerConfig::with_port_var(None).port, 8080);
        assert_eq!(ServerConfig::with_port_var(Some(" 9090 ")).port, 9090);
        // Malformed values fall back to the default.
        assert_eq!(ServerConfig::with_port_var(Some("eighty")).port, 8080);
        assert_eq!(ServerConfig::with_port_var(Some("70000")).port, 8080);
    }

    #[test]
    fn defaults_follow_documented_values() {
        let c = SplitConfig::default();
        assert_eq!(c.dpi, 200);
        assert_eq!(c.max_pages, 500);
        assert!(c.concurrency >= 1);
        assert_eq!(c.tesseract.lang.as_deref(), Some("osd"));
    }

    #[test]
    fn builder_clamps_dpi() {
        let c = SplitConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, 72);
        let c = SplitConfig::builder().dpi(5000).build().unwrap();
        assert_eq!(c.dpi, 600);
    }

    #[test]
    fn builder_floors_concurrency() {
        let c = SplitConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn zero_max_pages_is_rejected() {
        let err = SplitConfig::builder().max_pages(0).build().unwrap_err();
        assert!(matches!(err, SplitError::InvalidConfig(_)));
    }

    #[test]
    fn negative_confidence_is_rejected() {
        let tesseract = TesseractConfig {
            min_confidence: Some(-1.0),
            ..TesseractConfig::default()
        };
        assert!(SplitConfig::builder().tesseract(tesseract).build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = SplitConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn server_bind_addr() {
        let s = ServerConfig {
            host: "127.0.0.1".into(),
            port: 9000,
        };
        assert_eq!(s.bind_addr(), "127.0.0.1:9000");
    }
}
