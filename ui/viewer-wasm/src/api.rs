//! Config loading.
//!
//! The viewer config is fetched relative to the page, so `?viewer=` can point
//! at a static file or at the config service's `/configs/{name}` route.

use anyhow::{Context, anyhow};
use cv_api_types::ViewerConfig;
use gloo_net::http::Request;
use tracing::{info, warn};

pub async fn fetch_config(path: &str) -> anyhow::Result<ViewerConfig> {
    let response = Request::get(path)
        .send()
        .await
        .map_err(|err| anyhow!("fetch {path}: {err}"))?;

    if !response.ok() {
        return Err(anyhow!("fetch {path}: HTTP {}", response.status()));
    }

    let text = response
        .text()
        .await
        .map_err(|err| anyhow!("read {path}: {err}"))?;
    ViewerConfig::from_json(&text).with_context(|| format!("parse {path}"))
}

/// The config at `path`, or the built-in defaults when it cannot be loaded.
pub async fn load_config(path: &str) -> ViewerConfig {
    match fetch_config(path).await {
        Ok(config) => {
            info!(path, layers = config.layers.len(), "viewer config loaded");
            config
        }
        Err(err) => {
            warn!("{err:#}; starting with an empty config");
            ViewerConfig::default()
        }
    }
}
