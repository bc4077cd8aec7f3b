//! Alert dispatch: validate, compose, obtain credentials, send with
//! retry/backoff, audit. One `send_alert` call produces exactly one audit
//! record whatever happens after validation — retries are folded into it as
//! an attempt counter.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::compose::compose;
use crate::crypto::{CryptoError, EncryptedData, VaultKey};
use crate::db::{DatabaseError, Store};
use crate::models::{
    DeliveryOutcome, DeliveryStatus, EmergencyAlert, PatientContext, ReasonCode,
    TransportCredentials, UrgencyLevel,
};
use crate::phone;
use crate::transport::{ProviderDeliveryState, SmsTransport, TransportError};

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transport is not configured")]
    NotConfigured,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Storage(#[from] DatabaseError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Retry budget for transient transport failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each attempt after that
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff after the given (1-based) failed attempt: `base * 2^(n-1)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Orchestrates send attempts against the transport. Owns no global state:
/// the transport is an injected capability, credentials are read from the
/// store and decrypted per send, and every outcome lands in the audit store.
pub struct AlertDispatcher {
    transport: Arc<dyn SmsTransport>,
    store: Arc<Store>,
    vault: Arc<VaultKey>,
    retry: RetryPolicy,
}

impl AlertDispatcher {
    pub fn new(transport: Arc<dyn SmsTransport>, store: Arc<Store>, vault: Arc<VaultKey>) -> Self {
        Self {
            transport,
            store,
            vault,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Decrypt the stored transport credentials. Plaintext exists only in
    /// the returned value, which zeroizes on drop.
    pub fn credentials(&self) -> Result<TransportCredentials, AlertError> {
        let config = self
            .store
            .load_transport_config()?
            .filter(|c| c.configured)
            .ok_or(AlertError::NotConfigured)?;

        let encrypted = EncryptedData::from_base64(&config.encrypted_token)?;
        let token_bytes = self.vault.decrypt(&encrypted)?;
        let auth_token =
            String::from_utf8(token_bytes).map_err(|_| CryptoError::CorruptedCiphertext)?;

        Ok(TransportCredentials {
            account_sid: config.account_sid,
            auth_token,
            from_number: config.from_number,
        })
    }

    /// Send one alert to one recipient. `Pending -> Sent | Failed`; the
    /// returned outcome carries the audit record id, final status, provider
    /// reference (on accepted sends), reason code and attempt count.
    pub async fn send_alert(
        &self,
        context: &PatientContext,
        urgency: UrgencyLevel,
        notes: &str,
        recipient: &str,
    ) -> Result<DeliveryOutcome, AlertError> {
        // Identifier generated at send-attempt time; stable across retries.
        let alert_id = Uuid::new_v4();

        // Recipient format check happens before anything touches the
        // transport. An empty recipient cannot even be audited (records
        // require a non-empty recipient), so it surfaces as a plain error.
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(AlertError::Validation(
                "recipient phone number is empty".into(),
            ));
        }

        let message = compose(context, urgency, notes);

        let Some(normalized) = phone::normalize(recipient) else {
            tracing::warn!(alert_id = %alert_id, "recipient failed format validation");
            let alert = self.build_record(
                alert_id,
                context,
                urgency,
                &message,
                recipient,
                notes,
                DeliveryStatus::Failed,
                None,
                Some(ReasonCode::InvalidRecipient),
                0,
            );
            self.append_audit(&alert);
            return Ok(DeliveryOutcome::from_alert(&alert));
        };

        if let Err(explanation) = context.validate() {
            tracing::warn!(alert_id = %alert_id, "patient context failed validation");
            let alert = self.build_record(
                alert_id,
                context,
                urgency,
                &message,
                &normalized,
                notes,
                DeliveryStatus::Failed,
                None,
                Some(ReasonCode::InvalidContext),
                0,
            );
            self.append_audit(&alert);
            return Err(AlertError::Validation(explanation));
        }

        // Credentials: missing configuration is an auditable outcome; a
        // vault failure is fatal for the operation but still audited.
        let creds = match self.credentials() {
            Ok(creds) => creds,
            Err(AlertError::NotConfigured) => {
                let alert = self.build_record(
                    alert_id,
                    context,
                    urgency,
                    &message,
                    &normalized,
                    notes,
                    DeliveryStatus::Failed,
                    None,
                    Some(ReasonCode::NotConfigured),
                    0,
                );
                self.append_audit(&alert);
                return Ok(DeliveryOutcome::from_alert(&alert));
            }
            Err(err) => {
                let alert = self.build_record(
                    alert_id,
                    context,
                    urgency,
                    &message,
                    &normalized,
                    notes,
                    DeliveryStatus::Failed,
                    None,
                    Some(ReasonCode::CredentialsUnavailable),
                    0,
                );
                self.append_audit(&alert);
                return Err(err);
            }
        };

        let (status, message_ref, reason, attempts) = self
            .attempt_send(alert_id, creds, &normalized, &message)
            .await;

        let alert = self.build_record(
            alert_id,
            context,
            urgency,
            &message,
            &normalized,
            notes,
            status,
            message_ref,
            reason,
            attempts,
        );
        self.append_audit(&alert);

        tracing::info!(
            alert_id = %alert_id,
            status = status.as_str(),
            attempts,
            "alert dispatch settled"
        );

        Ok(DeliveryOutcome::from_alert(&alert))
    }

    /// Query the provider for an accepted alert's delivery state and refine
    /// `Sent -> Delivered | Undelivered` in place. Alerts in any other state
    /// are returned as-is without contacting the provider.
    pub async fn refresh_delivery_status(
        &self,
        alert_id: &Uuid,
    ) -> Result<DeliveryStatus, AlertError> {
        let alert = self.store.get_alert(alert_id)?;

        let (DeliveryStatus::Sent, Some(message_ref)) = (alert.status, alert.message_ref.clone())
        else {
            return Ok(alert.status);
        };

        let creds = self.credentials()?;
        let transport = Arc::clone(&self.transport);
        let state = tokio::task::spawn_blocking(move || {
            transport.fetch_status(&creds, &message_ref)
        })
        .await
        .map_err(|e| TransportError::Network(format!("status worker failed: {e}")))??;

        let refined = match state {
            ProviderDeliveryState::InFlight => return Ok(DeliveryStatus::Sent),
            ProviderDeliveryState::Delivered => DeliveryStatus::Delivered,
            ProviderDeliveryState::Undelivered => DeliveryStatus::Undelivered,
        };

        self.store.update_alert_status(alert_id, refined, None)?;
        tracing::info!(alert_id = %alert_id, status = refined.as_str(), "delivery status refined");
        Ok(refined)
    }

    /// Run the transport call with retry/backoff. Backoff waits are
    /// non-blocking; the blocking provider client runs on a worker thread.
    async fn attempt_send(
        &self,
        alert_id: Uuid,
        creds: TransportCredentials,
        to: &str,
        body: &str,
    ) -> (DeliveryStatus, Option<String>, Option<ReasonCode>, u32) {
        let max = self.retry.max_attempts.max(1);

        for attempt in 1..=max {
            let transport = Arc::clone(&self.transport);
            let creds = creds.clone();
            let to = to.to_string();
            let body = body.to_string();

            let result = tokio::task::spawn_blocking(move || {
                transport.send_sms(&creds, &to, &body)
            })
            .await
            .unwrap_or_else(|e| {
                Err(TransportError::Network(format!("send worker failed: {e}")))
            });

            match result {
                Ok(receipt) => {
                    return (
                        DeliveryStatus::Sent,
                        Some(receipt.message_ref),
                        None,
                        attempt,
                    );
                }
                Err(err) if err.is_transient() && attempt < max => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        alert_id = %alert_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient transport failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::warn!(
                        alert_id = %alert_id,
                        attempt,
                        error = %err,
                        "transport failure, not retrying"
                    );
                    return (
                        DeliveryStatus::Failed,
                        None,
                        Some(err.reason_code()),
                        attempt,
                    );
                }
            }
        }

        // Loop always returns from the final attempt
        (
            DeliveryStatus::Failed,
            None,
            Some(ReasonCode::NetworkError),
            max,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build_record(
        &self,
        id: Uuid,
        context: &PatientContext,
        urgency: UrgencyLevel,
        message: &str,
        recipient: &str,
        notes: &str,
        status: DeliveryStatus,
        message_ref: Option<String>,
        reason: Option<ReasonCode>,
        attempts: u32,
    ) -> EmergencyAlert {
        EmergencyAlert {
            id,
            created_at: Utc::now().naive_utc(),
            case_reference: context.case_reference.clone(),
            urgency,
            message: message.to_string(),
            recipient: recipient.to_string(),
            status,
            message_ref,
            reason,
            attempts,
            notes: notes.to_string(),
            context: context.redacted_snapshot(),
        }
    }

    /// Audit append is an independent failure domain: a storage error is
    /// reported through the log, never by masking the delivery outcome.
    fn append_audit(&self, alert: &EmergencyAlert) {
        if let Err(err) = self.store.append_alert(alert) {
            tracing::error!(alert_id = %alert.id, error = %err, "audit append failed");
        }
    }
}
