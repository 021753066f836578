//! Invocations through the Lambda Runtime Interface Emulator
//!
//! The Lambda base images serve the invoke API on port 8080 inside the
//! container. Function containers publish that port on localhost and events
//! are POSTed to it; the response body is the handler's return value.

use crate::error::ContainerError;
use bytes::Bytes;
use std::net::{Ipv4Addr, TcpListener};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Port the emulator listens on inside the container
pub const RUNTIME_API_PORT: u16 = 8080;

pub const INVOCATION_PATH: &str = "/2015-03-31/functions/function/invocations";

const FUNCTION_ERROR_HEADER: &str = "X-Amz-Function-Error";

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// What the function returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub status_code: u16,
    pub payload: Bytes,
    /// Set when the handler raised, e.g. `Unhandled`
    pub function_error: Option<String>,
}

/// A localhost port nothing is listening on right now
pub fn free_local_port() -> Result<u16, ContainerError> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}

/// Client for one container's invoke endpoint
#[derive(Debug, Clone)]
pub struct RuntimeApiClient {
    client: reqwest::Client,
    url: String,
}

impl RuntimeApiClient {
    /// Endpoint published on `127.0.0.1:<host_port>`
    pub fn new(host_port: u16) -> Self {
        Self::with_base_url(&format!("http://127.0.0.1:{host_port}"))
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}{INVOCATION_PATH}", base_url.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST `payload` and wait for the function's response.
    ///
    /// The emulator needs a moment after the container starts before it
    /// accepts requests, so failed sends are retried until `startup` has
    /// elapsed. `timeout` bounds each request.
    pub async fn invoke(
        &self,
        payload: Bytes,
        startup: Duration,
        timeout: Duration,
    ) -> Result<InvocationResult, ContainerError> {
        let ready_by = Instant::now() + startup;

        loop {
            let sent = self
                .client
                .post(&self.url)
                .timeout(timeout)
                .body(payload.clone())
                .send()
                .await;

            match sent {
                Ok(response) => return Self::read(response).await,
                Err(e) if e.is_timeout() => {
                    return Err(ContainerError::InvocationTimedOut(timeout.as_secs()))
                }
                Err(e) if Instant::now() < ready_by => {
                    debug!(url = %self.url, error = %e, "Runtime API not ready, retrying");
                    tokio::time::sleep(RETRY_INTERVAL).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn read(response: reqwest::Response) -> Result<InvocationResult, ContainerError> {
        let status_code = response.status().as_u16();
        let function_error = response
            .headers()
            .get(FUNCTION_ERROR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let payload = response.bytes().await?;

        debug!(status_code, bytes = payload.len(), ?function_error, "Function responded");
        Ok(InvocationResult {
            status_code,
            payload,
            function_error,
        })
    }
}
