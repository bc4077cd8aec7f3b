use serde::Deserialize;

use super::{ProviderDeliveryState, ProviderReceipt, SmsTransport, TransportError};
use crate::models::TransportCredentials;

/// Twilio error code for a recipient number the provider cannot route
const ERR_INVALID_TO_NUMBER: u32 = 21211;
/// Twilio error code for an unverified/blocked recipient on trial accounts
const ERR_UNVERIFIED_TO_NUMBER: u32 = 21608;

/// Live Twilio REST client.
pub struct TwilioTransport {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl TwilioTransport {
    /// Create a client against a specific API base (tests point this at a
    /// local mock server).
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    /// Production Twilio endpoint with a 30s request timeout
    pub fn live() -> Self {
        Self::new("https://api.twilio.com", 30)
    }

    fn map_send_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            TransportError::Network(format!("cannot reach provider at {}", self.base_url))
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// Subset of Twilio's message resource we care about
#[derive(Deserialize)]
struct MessageResource {
    sid: String,
    status: Option<String>,
}

/// Twilio error body: `{"code": 21211, "message": "...", "status": 400}`
#[derive(Deserialize)]
struct TwilioErrorBody {
    code: Option<u32>,
}

impl SmsTransport for TwilioTransport {
    fn send_sms(
        &self,
        creds: &TransportCredentials,
        to: &str,
        body: &str,
    ) -> Result<ProviderReceipt, TransportError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, creds.account_sid
        );
        let form = [
            ("To", to),
            ("From", creds.from_number.as_str()),
            ("Body", body),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&creds.account_sid, Some(&creds.auth_token))
            .form(&form)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status.is_success() {
            let parsed: MessageResource = response
                .json()
                .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;
            return Ok(ProviderReceipt {
                message_ref: parsed.sid,
            });
        }

        Err(classify_http_failure(
            status.as_u16(),
            response.json::<TwilioErrorBody>().ok(),
        ))
    }

    fn fetch_status(
        &self,
        creds: &TransportCredentials,
        message_ref: &str,
    ) -> Result<ProviderDeliveryState, TransportError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages/{}.json",
            self.base_url, creds.account_sid, message_ref
        );

        let response = self
            .client
            .get(&url)
            .basic_auth(&creds.account_sid, Some(&creds.auth_token))
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_http_failure(
                status.as_u16(),
                response.json::<TwilioErrorBody>().ok(),
            ));
        }

        let parsed: MessageResource = response
            .json()
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        Ok(map_delivery_state(parsed.status.as_deref().unwrap_or("")))
    }
}

fn classify_http_failure(status: u16, body: Option<TwilioErrorBody>) -> TransportError {
    match status {
        401 | 403 => TransportError::AuthRejected,
        429 => TransportError::RateLimited,
        400..=499 => match body.and_then(|b| b.code) {
            Some(ERR_INVALID_TO_NUMBER) | Some(ERR_UNVERIFIED_TO_NUMBER) => {
                TransportError::RecipientRejected
            }
            _ => TransportError::ProviderError { status },
        },
        500..=599 => TransportError::ProviderUnavailable { status },
        other => TransportError::ProviderError { status: other },
    }
}

fn map_delivery_state(status: &str) -> ProviderDeliveryState {
    match status {
        "delivered" | "read" => ProviderDeliveryState::Delivered,
        "undelivered" | "failed" => ProviderDeliveryState::Undelivered,
        // queued / accepted / sending / sent — not final yet
        _ => ProviderDeliveryState::InFlight,
    }
}
