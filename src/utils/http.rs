use reqwest::header::ETAG;
use reqwest::{Client, ClientBuilder, Response};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{PipelineError, Result};

pub fn create_client(config: &Config) -> Result<Client> {
    let mut builder = ClientBuilder::new()
        .user_agent(config.user_agent.as_str())
        .pool_max_idle_per_host(config.concurrency.max(1));

    if let Some(seconds) = config.request_timeout_seconds {
        builder = builder.timeout(Duration::from_secs(seconds));
    }

    builder
        .build()
        .map_err(|e| PipelineError::network("<client>", e))
}

/// Single GET that treats any non-2xx status as a failure.
pub async fn fetch(client: &Client, url: &str) -> Result<Response> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PipelineError::network(url, e))?;

    let status = response.status();
    if !status.is_success() {
        warn!("HTTP error {}: {}", status, url);
        return Err(PipelineError::Status {
            url: url.to_string(),
            status,
        });
    }

    Ok(response)
}

pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = fetch(client, url).await?;
    let body = response
        .bytes()
        .await
        .map_err(|e| PipelineError::network(url, e))?;
    Ok(body.to_vec())
}

/// Streams `url` into `target` and returns the response's ETag, if any.
///
/// The body goes to `<target>.part` first and is renamed over `target` once
/// complete, so an interrupted transfer never replaces a good file.
pub async fn download_to(client: &Client, url: &str, target: &Path) -> Result<Option<String>> {
    let response = fetch(client, url).await?;

    let token = response
        .headers()
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .filter(|token| !token.is_empty());

    let partial = partial_path(target);
    if let Err(e) = stream_body(response, url, &partial).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }

    tokio::fs::rename(&partial, target)
        .await
        .map_err(|e| PipelineError::file(target, e))?;

    debug!("Saved {} to {}", url, target.display());
    Ok(token)
}

async fn stream_body(mut response: Response, url: &str, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| PipelineError::file(path, e))?;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| PipelineError::network(url, e))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| PipelineError::file(path, e))?;
    }

    file.flush().await.map_err(|e| PipelineError::file(path, e))?;
    Ok(())
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
