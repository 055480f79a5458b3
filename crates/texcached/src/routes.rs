//! Host-then-path request classification.
//!
//! Kept free of any I/O so the whole routing table can be tested as a pure
//! function of method, host and path.

use axum::http::Method;
use texcache_core::ProxyConfig;

/// Which service a health probe describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// The default host: processed packages, passthrough, metadata.
    Proxy,
    /// The dedicated binary-object host.
    Binaries,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// CORS preflight on any path.
    Preflight,
    Health(Service),
    /// Processed resolution of a package name.
    Processed(String),
    /// Raw TeX Live archive passthrough.
    RawArchive(String),
    /// Registry metadata only.
    Registry(String),
    /// Verbatim object-store entry.
    Binary(String),
    XzWasm,
    MethodNotAllowed,
    NotFound,
}

impl Route {
    pub fn classify(method: &Method, host: Option<&str>, path: &str, config: &ProxyConfig) -> Route {
        if *method == Method::OPTIONS {
            return Route::Preflight;
        }
        if *method != Method::GET && *method != Method::HEAD {
            return Route::MethodNotAllowed;
        }

        let host = host.map(strip_port);
        if matches_host(host, config.binary_host.as_deref()) {
            return match path {
                "/" | "/health" => Route::Health(Service::Binaries),
                _ => binary_route(path.trim_start_matches('/').to_string()),
            };
        }
        if matches_host(host, config.package_host.as_deref()) {
            return match path {
                "/" | "/health" => Route::Health(Service::Proxy),
                _ => {
                    let name = path.trim_start_matches('/');
                    Route::Processed(name.strip_prefix("fetch/").unwrap_or(name).to_string())
                }
            };
        }

        match path {
            "/" | "/health" => return Route::Health(Service::Proxy),
            "/xzwasm.js" => return Route::XzWasm,
            _ => {}
        }

        if let Some(name) = path
            .strip_prefix("/api/fetch/")
            .or_else(|| path.strip_prefix("/fetch/"))
        {
            return Route::Processed(name.to_string());
        }
        if let Some(name) = path.strip_prefix("/api/texlive/") {
            return Route::RawArchive(name.to_string());
        }
        if let Some(name) = path.strip_prefix("/api/ctan-pkg/") {
            return Route::Registry(name.to_string());
        }
        if let Some(key) = path.strip_prefix("/bundles/") {
            return binary_route(key.to_string());
        }
        if let Some(key) = path.strip_prefix("/wasm/") {
            return if key.is_empty() {
                Route::NotFound
            } else {
                binary_route(format!("wasm/{}", key))
            };
        }
        Route::NotFound
    }
}

fn binary_route(key: String) -> Route {
    if key.is_empty() {
        Route::NotFound
    } else {
        Route::Binary(key)
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !name.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

fn matches_host(host: Option<&str>, configured: Option<&str>) -> bool {
    match (host, configured) {
        (Some(host), Some(configured)) => host.eq_ignore_ascii_case(configured),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.binary_host = Some("bin.example".into());
        config.package_host = Some("pkg.example".into());
        config
    }

    fn get(host: Option<&str>, path: &str) -> Route {
        Route::classify(&Method::GET, host, path, &config())
    }

    #[test]
    fn test_default_host_paths() {
        assert_eq!(get(None, "/"), Route::Health(Service::Proxy));
        assert_eq!(get(Some("localhost:8787"), "/health"), Route::Health(Service::Proxy));
        assert_eq!(get(None, "/api/fetch/tikz"), Route::Processed("tikz".into()));
        assert_eq!(get(None, "/fetch/tikz"), Route::Processed("tikz".into()));
        assert_eq!(get(None, "/api/texlive/amsmath"), Route::RawArchive("amsmath".into()));
        assert_eq!(get(None, "/api/ctan-pkg/pgf"), Route::Registry("pgf".into()));
        assert_eq!(get(None, "/bundles/core.data"), Route::Binary("core.data".into()));
        assert_eq!(get(None, "/wasm/engine.wasm"), Route::Binary("wasm/engine.wasm".into()));
        assert_eq!(get(None, "/xzwasm.js"), Route::XzWasm);
        assert_eq!(get(None, "/elsewhere"), Route::NotFound);
        assert_eq!(get(None, "/bundles/"), Route::NotFound);
    }

    #[test]
    fn test_empty_name_still_routes_to_validation() {
        assert_eq!(get(None, "/api/fetch/"), Route::Processed(String::new()));
    }

    #[test]
    fn test_host_dispatch_wins_over_path() {
        assert_eq!(get(Some("bin.example"), "/"), Route::Health(Service::Binaries));
        assert_eq!(
            get(Some("BIN.example:443"), "/api/fetch/tikz"),
            Route::Binary("api/fetch/tikz".into())
        );
        assert_eq!(get(Some("pkg.example"), "/tikz"), Route::Processed("tikz".into()));
        assert_eq!(get(Some("pkg.example"), "/fetch/tikz"), Route::Processed("tikz".into()));
        assert_eq!(get(Some("pkg.example"), "/health"), Route::Health(Service::Proxy));
    }

    #[test]
    fn test_methods() {
        let config = config();
        assert_eq!(Route::classify(&Method::OPTIONS, None, "/anything", &config), Route::Preflight);
        assert_eq!(
            Route::classify(&Method::HEAD, None, "/api/fetch/tikz", &config),
            Route::Processed("tikz".into())
        );
        assert_eq!(
            Route::classify(&Method::POST, None, "/api/fetch/tikz", &config),
            Route::MethodNotAllowed
        );
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.org:8080"), "example.org");
        assert_eq!(strip_port("example.org"), "example.org");
        assert_eq!(strip_port("[::1]:80"), "[::1]");
    }
}
