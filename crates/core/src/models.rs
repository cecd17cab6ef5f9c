use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;

use crate::error::{HeroldError, Result};

pub const KOKORO_GITHUB_REPO: &str = "hexgrad/Kokoro";
pub const KOKORO_RELEASE_TAG: &str = "v0.2.0";
pub const KOKORO_MODELS: [&str; 2] = ["kokoro-v0_19.onnx", "voices.json"];

#[derive(Debug, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

#[derive(Debug, Default)]
pub struct ModelDownloadReport {
    pub model_dir: PathBuf,
    pub already_present: Vec<String>,
    pub downloaded: Vec<String>,
    /// Expected models the release did not ship.
    pub missing: Vec<String>,
}

/// Match the expected model files against a release's assets
pub fn select_assets<'a>(
    release: &'a Release,
    models: &[&str],
) -> (Vec<&'a ReleaseAsset>, Vec<String>) {
    let mut found = Vec::new();
    let mut missing = Vec::new();

    for model in models {
        match release.assets.iter().find(|asset| asset.name == *model) {
            Some(asset) => found.push(asset),
            None => missing.push(model.to_string()),
        }
    }

    (found, missing)
}

pub fn release_url() -> String {
    format!(
        "https://api.github.com/repos/{}/releases/tags/{}",
        KOKORO_GITHUB_REPO, KOKORO_RELEASE_TAG
    )
}

/// Instructions shown when the release cannot be fetched
pub fn manual_install_hint(model_dir: &Path) -> String {
    format!(
        "Clone the Kokoro repository and copy models manually:\n  git clone https://github.com/{repo}.git\n  cp Kokoro/*.onnx {dir}/\n  cp Kokoro/voices.json {dir}/",
        repo = KOKORO_GITHUB_REPO,
        dir = model_dir.display()
    )
}

async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> Result<()> {
    let result = async {
        let bytes = client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        fs::write(dest, &bytes).await?;
        Ok::<_, HeroldError>(())
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(dest).await;
        return Err(HeroldError::ModelDownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        });
    }
    Ok(())
}

/// Make sure the Kokoro model cache is populated
pub async fn ensure_kokoro_models(model_dir: &Path) -> Result<ModelDownloadReport> {
    fs::create_dir_all(model_dir).await?;

    let mut report = ModelDownloadReport {
        model_dir: model_dir.to_path_buf(),
        ..Default::default()
    };

    report.already_present = KOKORO_MODELS
        .iter()
        .filter(|model| model_dir.join(model).exists())
        .map(|model| model.to_string())
        .collect();
    if !report.already_present.is_empty() {
        return Ok(report);
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("herold/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let url = release_url();
    tracing::info!(%url, "fetching kokoro release");
    let release = async {
        client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Release>()
            .await
    }
    .await
    .map_err(|e| HeroldError::ModelDownloadFailed {
        url: url.clone(),
        reason: format!("{e}\n{}", manual_install_hint(model_dir)),
    })?;

    let (assets, missing) = select_assets(&release, &KOKORO_MODELS);
    for name in &missing {
        tracing::warn!(model = %name, "model not found in release assets");
    }
    report.missing = missing;

    for asset in assets {
        let dest = model_dir.join(&asset.name);
        download_file(&client, &asset.browser_download_url, &dest).await?;
        tracing::info!(model = %asset.name, "downloaded model");
        report.downloaded.push(asset.name.clone());
    }

    Ok(report)
}
