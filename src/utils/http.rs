// src/utils/http.rs

//! HTTP client utilities.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::FetcherConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &FetcherConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    let language = HeaderValue::from_str(&config.accept_language)
        .map_err(|e| AppError::config(format!("invalid accept_language: {e}")))?;
    headers.insert(ACCEPT_LANGUAGE, language);

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a page body as text, failing on non-success status codes.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    fetch_text_with_cookies(client, url, None).await
}

/// Like [`fetch_text`], sending `cookies` as the `Cookie` header when given.
pub async fn fetch_text_with_cookies(
    client: &reqwest::Client,
    url: &str,
    cookies: Option<&HeaderValue>,
) -> Result<String> {
    let mut request = client.get(url);
    if let Some(cookies) = cookies {
        request = request.header(COOKIE, cookies.clone());
    }
    let text = request
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(text)
}

/// Download a resource to a local file, streaming the body.
///
/// The file is written next to its destination and renamed into place once
/// the body is complete.
pub async fn download_to(client: &reqwest::Client, url: &str, dest: &Path) -> Result<()> {
    let mut response = client.get(url).send().await?.error_for_status()?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = dest.with_extension("part");
    let mut file = tokio::fs::File::create(&tmp).await?;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, dest).await?;
    Ok(())
}
