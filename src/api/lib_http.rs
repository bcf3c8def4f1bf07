use reqwest::{
    blocking::Client,
    header::{ACCEPT, USER_AGENT},
    StatusCode,
};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid request: {0}")]
    Request(String),
    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: StatusCode },
    #[error("Invalid json from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Issue one GET request and return the json body as is.
pub fn get_json(url: &str) -> Result<Value, FetchError> {
    let client = Client::new();
    let response = client
        .get(url)
        .header(ACCEPT, "application/json")
        .header(USER_AGENT, concat!("ukgrid/", env!("CARGO_PKG_VERSION")))
        .send()
        .map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;
    if response.status() != StatusCode::OK {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }
    let body = response.text().map_err(|source| FetchError::Network {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|source| FetchError::Json {
        url: url.to_string(),
        source,
    })
}
