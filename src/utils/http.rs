use once_cell::sync::Lazy;
use reqwest::{Client, Proxy};
use serde_json::Value;

use crate::error::{AppError, AppResult};

#[cfg(not(any(feature = "tls-native", feature = "tls-rustls")))]
compile_error!("one TLS backend feature must be enabled: `tls-native` or `tls-rustls`");

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TlsBackendSelection {
    NativeTls,
    Rustls,
}

// None when the platform cannot build a client at all (e.g. no TLS roots).
static SHARED_CLIENT: Lazy<Option<Client>> = Lazy::new(|| {
    match create_base_client(DEFAULT_TIMEOUT_SECS) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::error!("Failed to build shared HTTP client: {}", e);
            None
        }
    }
});

fn parse_tls_backend_override() -> Option<TlsBackendSelection> {
    let raw = std::env::var("FREEGAMES_TLS_BACKEND").ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "native" | "native-tls" | "default-tls" => Some(TlsBackendSelection::NativeTls),
        "rustls" => Some(TlsBackendSelection::Rustls),
        _ => None,
    }
}

fn supports_tls_backend(selection: TlsBackendSelection) -> bool {
    match selection {
        TlsBackendSelection::NativeTls => cfg!(feature = "tls-native"),
        TlsBackendSelection::Rustls => cfg!(feature = "tls-rustls"),
    }
}

fn compiled_default_tls_backend() -> TlsBackendSelection {
    if cfg!(feature = "tls-rustls") {
        TlsBackendSelection::Rustls
    } else {
        TlsBackendSelection::NativeTls
    }
}

fn selected_tls_backend() -> TlsBackendSelection {
    if let Some(requested) = parse_tls_backend_override() {
        if supports_tls_backend(requested) {
            return requested;
        }
        tracing::warn!(
            "FREEGAMES_TLS_BACKEND requested an unavailable backend for this build; falling back to compiled default"
        );
    }
    compiled_default_tls_backend()
}

fn apply_tls_backend(builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
    match selected_tls_backend() {
        TlsBackendSelection::NativeTls => builder,
        TlsBackendSelection::Rustls => {
            #[cfg(feature = "tls-rustls")]
            {
                builder.use_rustls_tls()
            }
            #[cfg(not(feature = "tls-rustls"))]
            {
                builder
            }
        }
    }
}

fn create_base_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    let mut builder = apply_tls_backend(Client::builder())
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(crate::constants::USER_AGENT.as_str());

    if let Ok(proxy_url) = std::env::var("FREEGAMES_HTTP_PROXY") {
        let proxy_url = proxy_url.trim();
        if !proxy_url.is_empty() {
            match Proxy::all(proxy_url) {
                Ok(proxy) => {
                    builder = builder.proxy(proxy);
                    tracing::info!("HTTP shared client enabled upstream proxy: {}", proxy_url);
                }
                Err(e) => {
                    tracing::error!("invalid_proxy_url: {}, error: {}", proxy_url, e);
                }
            }
        }
    }

    builder.build()
}

pub fn get_client() -> Option<Client> {
    SHARED_CLIENT.clone()
}

/// GET `url` and decode the body as JSON.
pub async fn get_json(client: &Client, url: &str) -> AppResult<Value> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Unknown(format!(
            "unexpected_http_status: {} for {}",
            status.as_u16(),
            url
        )));
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
