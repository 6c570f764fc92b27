use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("http status is not a success: {0}")]
    HttpStatus(u16),
}

/// Fetches the page body as text. A single plain GET, no custom headers, no
/// retries; any non-2xx status fails the request.
pub async fn fetch_html(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let url = Url::parse(url)?;

    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    Ok(response.text().await?)
}
