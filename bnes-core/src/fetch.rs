//! Downloads the council page, keeping the body of failed responses for inspection.

use std::path::{Path, PathBuf};

use chrono::Local;
use reqwest::{Client, StatusCode};

const ARTIFACT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H%M%S";

#[derive(thiserror::Error, Debug)]
/// Errors raised while fetching the collections page.
pub enum FetchError {
    /// The request could not be completed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The server answered with something other than 200 OK.
    #[error("page fetch failed with status {status}, response saved to {}", .artifact.display())]
    Status {
        /// Status returned by the server.
        status: StatusCode,
        /// File holding the response body.
        artifact: PathBuf,
    },
    /// The response body of a failed fetch could not be saved.
    #[error("page fetch failed with status {status} and the response could not be saved to {}: {source}", .path.display())]
    Artifact {
        /// Status returned by the server.
        status: StatusCode,
        /// File that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// GET `url` and return the body of a 200 response.
///
/// Any other status writes the body to a timestamped file in `diagnostics_dir`.
///
/// # Errors
///
/// Returns a [`FetchError`] when the request fails or the status is not 200.
pub async fn fetch_page(
    client: &Client,
    url: &str,
    diagnostics_dir: &Path,
) -> Result<String, FetchError> {
    tracing::debug!(url, "fetching collections page");
    let response = client.get(url).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if status == StatusCode::OK {
        return Ok(body);
    }

    let filename = format!(
        "{} response.html",
        Local::now().format(ARTIFACT_TIMESTAMP_FORMAT)
    );
    let path = diagnostics_dir.join(filename);
    if let Err(source) = tokio::fs::write(&path, body).await {
        tracing::error!(%status, path = %path.display(), error = %source, "page fetch failed and response could not be saved");
        return Err(FetchError::Artifact {
            status,
            path,
            source,
        });
    }

    tracing::error!(%status, path = %path.display(), "page fetch failed, response saved");
    Err(FetchError::Status {
        status,
        artifact: path,
    })
}
