use anyhow::{Context, Result};
use std::path::Path;

/// Fetch a text resource. URLs go over HTTP; anything else is a local path,
/// which keeps `generate` runnable against checked-out copies of the data.
pub async fn load_text(source: &str) -> Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let response = reqwest::get(source)
            .await
            .with_context(|| format!("Failed to fetch {}", source))?
            .error_for_status()
            .with_context(|| format!("Bad response status for {}", source))?;
        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body of {}", source))
    } else {
        tokio::fs::read_to_string(Path::new(source))
            .await
            .with_context(|| format!("Failed to read file {}", source))
    }
}
