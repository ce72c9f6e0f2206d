//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

/// Upload limit used when `MAX_FILE_SIZE` is unset or unparseable (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Slack allowed on top of the file limit for multipart boundaries and part headers.
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Size expressions such as `512`, `10MB`, `1.5 kb` or `2G`.
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*([kmg]?)b?$").expect("valid regex literal")
});

/// Image extensions accepted in every deployment.
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Image extensions accepted when SVG uploads are enabled.
const IMAGE_EXTENSIONS_WITH_SVG: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg"];

/// Application configuration.
///
/// Resolved once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// Directory holding uploaded files (default: ./uploads).
    pub upload_dir: PathBuf,

    /// Maximum size of a single upload in bytes (default: 10 MiB).
    pub max_file_size: u64,

    /// Base URL prepended to `/files/<name>` (default: http://localhost:<port>).
    pub public_host: String,

    /// Shared secret required by write endpoints. Writes always fail when unset.
    pub upload_secret: Option<String>,

    /// Accept `.svg` uploads in addition to raster images (default: false).
    pub allow_svg: bool,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = lookup("PORT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "3000".to_string())
            .trim()
            .parse()
            .context("PORT must be a valid u16")?;

        let upload_dir = lookup("UPLOAD_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("uploads"));

        let max_file_size = lookup("MAX_FILE_SIZE")
            .map(|v| parse_size(&v))
            .unwrap_or(DEFAULT_MAX_FILE_SIZE);

        let public_host = lookup("PUBLIC_HOST")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim()
            .trim_end_matches('/')
            .to_string();

        let upload_secret = lookup("UPLOAD_SECRET").filter(|v| !v.is_empty());

        let allow_svg = lookup("ALLOW_SVG")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec!["*".to_string()]);

        Ok(Self {
            port,
            upload_dir,
            max_file_size,
            public_host,
            upload_secret,
            allow_svg,
            cors_allowed_origins,
        })
    }

    /// Lowercased extensions (with leading dot) accepted for upload and listing.
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        if self.allow_svg {
            IMAGE_EXTENSIONS_WITH_SVG
        } else {
            IMAGE_EXTENSIONS
        }
    }

    /// Public URL of a stored file.
    pub fn public_url(&self, name: &str) -> String {
        format!("{}/files/{}", self.public_host, urlencoding::encode(name))
    }

    /// Upper bound on a whole upload request body.
    pub fn request_body_limit(&self) -> usize {
        usize::try_from(self.max_file_size.saturating_add(MULTIPART_OVERHEAD))
            .unwrap_or(usize::MAX)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("upload_dir", &self.upload_dir)
            .field("max_file_size", &self.max_file_size)
            .field("public_host", &self.public_host)
            .field("upload_secret", &self.upload_secret.as_ref().map(|_| "<redacted>"))
            .field("allow_svg", &self.allow_svg)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

/// Parse a human-readable size such as `10MB` into bytes.
///
/// Units are binary (`KB` = 1024). A missing unit or a bare `B` means bytes.
/// Expressions that cannot be parsed, and zero, resolve to
/// [`DEFAULT_MAX_FILE_SIZE`]; this function never fails.
pub fn parse_size(expr: &str) -> u64 {
    let expr = expr.trim();

    let bytes = match SIZE_PATTERN.captures(expr) {
        Some(caps) => {
            let number: f64 = caps[1].parse().unwrap_or(0.0);
            let multiplier: u64 = match caps[2].to_ascii_uppercase().as_str() {
                "K" => 1 << 10,
                "M" => 1 << 20,
                "G" => 1 << 30,
                _ => 1,
            };
            // Whole numbers are computed exactly; fractions are floored.
            match caps[1].parse::<u64>() {
                Ok(whole) => whole.saturating_mul(multiplier),
                Err(_) => (number * multiplier as f64).floor() as u64,
            }
        }
        None => expr.parse::<u64>().unwrap_or(0),
    };

    if bytes == 0 {
        DEFAULT_MAX_FILE_SIZE
    } else {
        bytes
    }
}

/// Render a byte count for humans, e.g. `10 MB` or `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        return format!("{bytes} B");
    }

    let rendered = format!("{value:.2}");
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{rendered} {}", UNITS[unit])
}
