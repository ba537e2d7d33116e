use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
};
use cv_api_types::ViewerConfig;
use serde::Serialize;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::{ApiResult, AppState, bad_request, internal_error, not_found, unprocessable};

#[derive(Debug, Serialize)]
pub(crate) struct ConfigListResponse {
    configs: Vec<String>,
}

/// Names of every config in `dir` that parses and validates, sorted.
pub(crate) async fn scan(dir: &FsPath) -> anyhow::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to read config directory: {}", dir.display()))?;

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|stem| stem.to_str()).map(str::to_owned) else {
            continue;
        };

        match load(&path).await {
            Ok(Ok(_)) => names.push(name),
            Ok(Err(problems)) => warn!(config = %name, "skipping config: {}", problems.join("; ")),
            Err(err) => warn!(config = %name, "skipping config: {err:#}"),
        }
    }

    names.sort();
    Ok(names)
}

/// Outer error: the file could not be read. Inner error: it was read but is
/// not a usable viewer config.
async fn load(path: &FsPath) -> anyhow::Result<Result<ViewerConfig, Vec<String>>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let config = match ViewerConfig::from_json(&raw) {
        Ok(config) => config,
        Err(err) => return Ok(Err(vec![err.to_string()])),
    };

    let problems: Vec<String> = config.validate().iter().map(ToString::to_string).collect();
    if problems.is_empty() {
        Ok(Ok(config))
    } else {
        Ok(Err(problems))
    }
}

/// Map a request name such as `North_Haven` or `North_Haven.json` to a file
/// directly inside the config directory.
fn resolve(dir: &FsPath, name: &str) -> Option<PathBuf> {
    let stem = name.strip_suffix(".json").unwrap_or(name);
    let safe = !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '));
    safe.then(|| dir.join(format!("{stem}.json")))
}

pub(crate) async fn list_configs(State(state): State<Arc<AppState>>) -> ApiResult<ConfigListResponse> {
    let configs = scan(&state.config_dir).await.map_err(internal_error)?;
    Ok(Json(ConfigListResponse { configs }))
}

pub(crate) async fn get_config(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<ViewerConfig> {
    let path = resolve(&state.config_dir, &name).ok_or_else(|| bad_request("invalid config name"))?;

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(not_found("unknown config"));
    }

    match load(&path).await.map_err(internal_error)? {
        Ok(config) => Ok(Json(config)),
        Err(problems) => Err(unprocessable("config failed validation", problems)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    const VALID: &str = r#"{
        "title": "North Haven",
        "layers": [{
            "url": "https://example.test/FeatureServer/0",
            "title": "Zoning",
            "fieldName": "Zoning",
            "combobox1": "zoning1",
            "combobox2": "zoning2"
        }]
    }"#;

    fn config_dir() -> anyhow::Result<tempfile::TempDir> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("North_Haven.json"), VALID)?;
        std::fs::write(dir.path().join("Broken.json"), "{\"layers\": [")?;
        std::fs::write(
            dir.path().join("Incomplete.json"),
            r#"{"layers": [{"title": "Zoning", "url": "u"}]}"#,
        )?;
        std::fs::write(dir.path().join("notes.txt"), "not a config")?;
        Ok(dir)
    }

    async fn get(dir: &FsPath, uri: &str) -> anyhow::Result<(StatusCode, serde_json::Value)> {
        let state = Arc::new(AppState {
            config_dir: dir.to_path_buf(),
        });
        let response = app(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty())?)
            .await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn lists_only_valid_configs() -> anyhow::Result<()> {
        let dir = config_dir()?;
        let (status, body) = get(dir.path(), "/configs").await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["configs"], serde_json::json!(["North_Haven"]));
        Ok(())
    }

    #[tokio::test]
    async fn serves_config_with_defaults_filled_in() -> anyhow::Result<()> {
        let dir = config_dir()?;
        let (status, body) = get(dir.path(), "/configs/North_Haven.json").await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "North Haven");
        assert_eq!(body["layers"][0]["isVisible"], true);
        assert_eq!(body["search"]["maxResults"], 300);
        Ok(())
    }

    #[tokio::test]
    async fn reports_unknown_malformed_and_invalid_configs() -> anyhow::Result<()> {
        let dir = config_dir()?;

        let (status, _) = get(dir.path(), "/configs/Branford").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get(dir.path(), "/configs/Broken").await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["problems"].as_array().map(Vec::len), Some(1));

        let (status, body) = get(dir.path(), "/configs/Incomplete").await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["problems"].as_array().map(Vec::len), Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn refuses_names_outside_the_directory() -> anyhow::Result<()> {
        let dir = config_dir()?;
        let (status, _) = get(dir.path(), "/configs/..%2Fsecrets").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resolve(dir.path(), "../secrets").is_none());
        assert!(resolve(dir.path(), "").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn health_reports_ok() -> anyhow::Result<()> {
        let dir = config_dir()?;
        let (status, body) = get(dir.path(), "/health").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        Ok(())
    }
}
