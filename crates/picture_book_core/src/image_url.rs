//! crates/picture_book_core/src/image_url.rs
//!
//! Turns whatever the backend stored for a page image into a URL a browser can load.

use regex::Regex;
use std::sync::OnceLock;

const BUCKET_AUTH_HOST: &str = "storage.cloud.google.com";
const BUCKET_PUBLIC_HOST: &str = "storage.googleapis.com";

fn drive_prefix() -> &'static Regex {
    static DRIVE: OnceLock<Regex> = OnceLock::new();
    DRIVE.get_or_init(|| Regex::new(r"(?i)(^|[^a-z])[a-z]:[\\/]").expect("drive prefix pattern is valid"))
}

/// Rewrites stored image locations against the backend's public base URL.
#[derive(Debug, Clone)]
pub struct ImageUrlNormalizer {
    backend_base: String,
    rewrite_bucket_host: bool,
}

impl ImageUrlNormalizer {
    pub fn new(backend_base: impl Into<String>, rewrite_bucket_host: bool) -> Self {
        let backend_base = backend_base.into().trim_end_matches('/').to_string();
        Self {
            backend_base,
            rewrite_bucket_host,
        }
    }

    pub fn backend_base(&self) -> &str {
        &self.backend_base
    }

    /// Normalizes a storybook page image.
    ///
    /// Local filesystem paths written by older backends are served from the
    /// generated-images static directory, keyed by their file name.
    pub fn page_image(&self, stored: Option<&str>) -> Option<String> {
        let stored = stored.map(str::trim).filter(|s| !s.is_empty())?;

        if is_filesystem_path(stored) {
            let file_name = trailing_file_name(stored)?;
            return Some(format!(
                "{}/uploads/generated_images/{}",
                self.backend_base, file_name
            ));
        }
        Some(self.absolute_or_joined(stored))
    }

    /// Normalizes the uploaded photo's location for preview.
    pub fn uploaded_image(&self, stored: Option<&str>) -> Option<String> {
        let stored = stored.map(str::trim).filter(|s| !s.is_empty())?;

        if is_absolute_http(stored) {
            return Some(self.rewrite_bucket(stored));
        }
        let file_name = trailing_file_name(stored)?;
        Some(format!("{}/uploads/{}", self.backend_base, file_name))
    }

    fn absolute_or_joined(&self, stored: &str) -> String {
        if is_absolute_http(stored) {
            self.rewrite_bucket(stored)
        } else if stored.starts_with('/') {
            format!("{}{}", self.backend_base, stored)
        } else {
            format!("{}/{}", self.backend_base, stored.trim_start_matches("./"))
        }
    }

    // The authenticated bucket host needs a browser login; the public host serves
    // the same object without one.
    fn rewrite_bucket(&self, url: &str) -> String {
        if !self.rewrite_bucket_host {
            return url.to_string();
        }
        match url.split_once("://") {
            Some((scheme, rest)) if rest.starts_with(BUCKET_AUTH_HOST) => {
                format!("{}://{}{}", scheme, BUCKET_PUBLIC_HOST, &rest[BUCKET_AUTH_HOST.len()..])
            }
            _ => url.to_string(),
        }
    }
}

fn is_absolute_http(s: &str) -> bool {
    let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn is_filesystem_path(s: &str) -> bool {
    s.contains('\\') || (!is_absolute_http(s) && drive_prefix().is_match(s))
}

fn trailing_file_name(s: &str) -> Option<&str> {
    s.rsplit(|c| c == '/' || c == '\\')
        .next()
        .filter(|name| !name.is_empty())
}
