// API client module: the blocking HTTP side of the simulator.
//
// `ApiClient` posts one form per USSD exchange and probes the health
// endpoint. It never returns transport errors to its caller: every fault
// is turned into a terminal `UssdResponse` so the phone display can show
// it like any other message.

use crate::config::SimConfig;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const CANNOT_CONNECT: &str =
    "Error: Cannot connect to server. Please ensure the API is running.";

/// Server reply for one exchange. Field names follow the server's JSON.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UssdResponse {
    pub message: String,
    #[serde(rename = "endSession")]
    pub end_session: bool,
}

impl UssdResponse {
    /// A synthetic terminal response, used for every mapped fault.
    pub fn ended(message: impl Into<String>) -> Self {
        UssdResponse {
            message: message.into(),
            end_session: true,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.end_session
    }
}

/// Form payload for one exchange. Serialized as `SessionId`,
/// `PhoneNumber`, `Text` and `ServiceCode`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct UssdRequest<'a> {
    pub session_id: &'a str,
    pub phone_number: &'a str,
    pub text: &'a str,
    pub service_code: &'a str,
}

/// One request/response exchange against the USSD endpoint.
///
/// Implementations are infallible by contract: faults come back as a
/// response with `end_session` set.
pub trait Transport {
    fn submit(&self, text: &str, session_id: &str, phone_number: &str) -> UssdResponse;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn submit(&self, text: &str, session_id: &str, phone_number: &str) -> UssdResponse {
        (**self).submit(text, session_id, phone_number)
    }
}

/// Blocking reqwest client bound to the configured endpoints.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    api_url: String,
    health_url: String,
    service_code: String,
    request_timeout: Option<Duration>,
    health_timeout: Duration,
}

impl ApiClient {
    /// Build a client from the resolved configuration. The main exchange
    /// uses `request_timeout`; the health probe overrides it per request.
    pub fn new(config: &SimConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            api_url: config.api_url.clone(),
            health_url: config.health_url.clone(),
            service_code: config.service_code.clone(),
            request_timeout: config.request_timeout,
            health_timeout: config.health_timeout,
        })
    }

    /// GET the health endpoint. Anything but a 200 inside the short
    /// timeout counts as unavailable.
    pub fn health_check(&self) -> bool {
        let res = self
            .client
            .get(&self.health_url)
            .timeout(self.health_timeout)
            .send();
        match res {
            Ok(res) if res.status() == StatusCode::OK => {
                tracing::info!(url = %self.health_url, "health check passed");
                true
            }
            Ok(res) => {
                tracing::warn!(url = %self.health_url, status = %res.status(), "health check failed");
                false
            }
            Err(e) => {
                tracing::warn!(url = %self.health_url, error = %e, "health check failed");
                false
            }
        }
    }

    fn fault_response(&self, err: &reqwest::Error) -> UssdResponse {
        // Timeouts during connect also report is_connect, so check first.
        if err.is_timeout() {
            let secs = self.request_timeout.map(|d| d.as_secs()).unwrap_or_default();
            UssdResponse::ended(format!("Error: Request timed out after {secs}s"))
        } else if err.is_connect() {
            UssdResponse::ended(CANNOT_CONNECT)
        } else {
            UssdResponse::ended(format!("Error: {err}"))
        }
    }
}

impl Transport for ApiClient {
    fn submit(&self, text: &str, session_id: &str, phone_number: &str) -> UssdResponse {
        let form = UssdRequest {
            session_id,
            phone_number,
            text,
            service_code: &self.service_code,
        };
        tracing::debug!(session_id, text, "sending USSD request");

        let res = match self.client.post(&self.api_url).form(&form).send() {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!(session_id, error = %e, "USSD request failed");
                return self.fault_response(&e);
            }
        };

        let status = res.status();
        if status != StatusCode::OK {
            tracing::warn!(session_id, %status, "USSD endpoint returned an error status");
            return UssdResponse::ended(format!(
                "Error: Server returned status {}",
                status.as_u16()
            ));
        }

        match res.text() {
            Ok(body) => parse_body(&body),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "failed to read USSD response body");
                self.fault_response(&e)
            }
        }
    }
}

/// Decode a 200 body. A body that does not match the contract ends the
/// session the same way a transport fault does.
pub fn parse_body(body: &str) -> UssdResponse {
    match serde_json::from_str::<UssdResponse>(body) {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(error = %e, "malformed USSD response body");
            UssdResponse::ended(format!("Error: Invalid response from server: {e}"))
        }
    }
}
