//! Blocking HTTP GETs via libcurl: small text bodies and file downloads.
//!
//! Both run in the current thread; call from `spawn_blocking` when used from
//! async code.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use crate::config::GlennaConfig;

/// Transfer limits applied to every request.
#[derive(Debug, Clone, Copy)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    /// Overall limit for one request, including the body.
    pub timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(600),
        }
    }
}

impl From<&GlennaConfig> for HttpOptions {
    fn from(cfg: &GlennaConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.request_timeout_secs),
        }
    }
}

/// Failure of a single GET.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, DNS, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("GET {url} returned HTTP {code}")]
    Http { url: String, code: u32 },
    /// Writing the body to disk failed.
    #[error("storage: {0}")]
    Storage(#[source] io::Error),
    #[error("response body is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn easy_for(url: &str, opts: &HttpOptions) -> Result<curl::easy::Easy, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    easy.timeout(opts.timeout)?;
    Ok(easy)
}

fn check_status(easy: &mut curl::easy::Easy, url: &str) -> Result<(), FetchError> {
    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http {
            url: url.to_string(),
            code,
        });
    }
    Ok(())
}

/// GET `url` and return the body as text.
pub fn fetch_text(url: &str, opts: &HttpOptions) -> Result<String, FetchError> {
    let mut body = Vec::new();
    let mut easy = easy_for(url, opts)?;
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }
    check_status(&mut easy, url)?;
    Ok(String::from_utf8(body)?)
}

/// GET `url` and write the body to `dest`, creating or truncating it.
/// Returns the number of bytes written. On error `dest` may hold a partial body.
pub fn download_to_path(url: &str, dest: &Path, opts: &HttpOptions) -> Result<u64, FetchError> {
    let mut file = File::create(dest).map_err(FetchError::Storage)?;
    let mut written = 0u64;
    let mut write_err: Option<io::Error> = None;

    let mut easy = easy_for(url, opts)?;
    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| match file.write_all(data) {
            Ok(()) => {
                written += data.len() as u64;
                Ok(data.len())
            }
            Err(e) => {
                tracing::warn!("payload write failed: {}", e);
                write_err = Some(e);
                Ok(0) // abort transfer
            }
        })?;
        transfer.perform()
    };

    if let Some(e) = write_err {
        return Err(FetchError::Storage(e));
    }
    performed?;
    check_status(&mut easy, url)?;
    file.sync_all().map_err(FetchError::Storage)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{}/d3d9.dll.md5sum", port)
    }

    #[test]
    fn options_from_config() {
        let mut cfg = GlennaConfig::default();
        cfg.connect_timeout_secs = 5;
        cfg.request_timeout_secs = 90;
        let opts = HttpOptions::from(&cfg);
        assert_eq!(opts.connect_timeout, Duration::from_secs(5));
        assert_eq!(opts.timeout, Duration::from_secs(90));
    }

    #[test]
    fn fetch_text_connection_refused_is_curl_error() {
        let err = fetch_text(&closed_port_url(), &HttpOptions::default()).unwrap_err();
        assert!(matches!(err, FetchError::Curl(_)), "got {:?}", err);
    }

    #[test]
    fn download_to_unwritable_path_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing-dir").join("d3d9.dll");
        let err = download_to_path(&closed_port_url(), &dest, &HttpOptions::default()).unwrap_err();
        assert!(matches!(err, FetchError::Storage(_)), "got {:?}", err);
    }

    #[test]
    fn http_error_display_names_status() {
        let err = FetchError::Http {
            url: "http://example.com/x".into(),
            code: 404,
        };
        assert_eq!(err.to_string(), "GET http://example.com/x returned HTTP 404");
    }
}
