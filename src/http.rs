// src/http.rs
// Shared HTTP client for the assistant and GitHub collaborators

use std::time::Duration;

/// Default request timeout for a single API call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connect timeout
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub const USER_AGENT: &str = concat!("proposal-police/", env!("CARGO_PKG_VERSION"));

/// Create the shared HTTP client with appropriate defaults.
///
/// Created once at startup and handed to both API clients so they share
/// one connection pool.
pub fn create_shared_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(10)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Turn a non-2xx response into `PoliceError::Api`, keeping the body for logs
pub async fn check_status(response: reqwest::Response) -> crate::error::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(crate::error::PoliceError::Api {
        status: status.as_u16(),
        body,
    })
}
