//! Proxy installation rewrites the process environment, so it runs in its
//! own test binary with a single test.

use restcfg_client::{FsBackend, apply_proxy};
use restcfg_core::EnvConfig;

const PROXY: &str = "http://proxy.internal:3128";

#[test]
fn proxy_is_installed_process_wide() {
    assert!(!apply_proxy("  "));
    assert!(std::env::var("http_proxy").map_or(true, |v| v != PROXY));

    let backend =
        FsBackend::with_env_config(["RestClient"], EnvConfig::default().with_proxy(PROXY));
    assert_eq!(backend.env_config().proxy.as_deref(), Some(PROXY));
    assert_eq!(std::env::var("http_proxy").as_deref(), Ok(PROXY));
    assert_eq!(std::env::var("https_proxy").as_deref(), Ok(PROXY));

    // Already installed: reported as in effect, values untouched
    assert!(apply_proxy(&format!(" {PROXY} ")));
    assert_eq!(std::env::var("https_proxy").as_deref(), Ok(PROXY));
}
