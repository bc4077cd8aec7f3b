//! Scripted transport double. Lives in the crate proper (not behind
//! `cfg(test)`) so host applications can exercise their alert wiring without
//! contacting a provider.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ProviderDeliveryState, ProviderReceipt, SmsTransport, TransportError};
use crate::models::TransportCredentials;

/// Outcome the mock should produce for one send attempt
pub enum ScriptedSend {
    Accept { message_ref: String },
    Fail(TransportError),
}

/// Counting, scriptable test double. With an empty script every send is
/// accepted with a generated reference.
#[derive(Default)]
pub struct MockTransport {
    sends: AtomicUsize,
    status_fetches: AtomicUsize,
    script: Mutex<VecDeque<ScriptedSend>>,
    delivery_state: Mutex<Option<ProviderDeliveryState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome for the next unscripted send
    pub fn push_outcome(&self, outcome: ScriptedSend) {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(outcome);
    }

    /// Queue `n` transient failures in a row
    pub fn push_transient_failures(&self, n: usize) {
        for _ in 0..n {
            self.push_outcome(ScriptedSend::Fail(TransportError::Network(
                "connection reset".into(),
            )));
        }
    }

    /// State reported by `fetch_status` (defaults to `InFlight`)
    pub fn set_delivery_state(&self, state: ProviderDeliveryState) {
        *self.delivery_state.lock().expect("mock state lock") = Some(state);
    }

    /// How many times `send_sms` was invoked
    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn status_fetch_count(&self) -> usize {
        self.status_fetches.load(Ordering::SeqCst)
    }
}

impl SmsTransport for MockTransport {
    fn send_sms(
        &self,
        _creds: &TransportCredentials,
        _to: &str,
        _body: &str,
    ) -> Result<ProviderReceipt, TransportError> {
        let attempt = self.sends.fetch_add(1, Ordering::SeqCst) + 1;
        let scripted = self.script.lock().expect("mock script lock").pop_front();
        match scripted {
            Some(ScriptedSend::Accept { message_ref }) => Ok(ProviderReceipt { message_ref }),
            Some(ScriptedSend::Fail(err)) => Err(err),
            None => Ok(ProviderReceipt {
                message_ref: format!("MOCK-{attempt}"),
            }),
        }
    }

    fn fetch_status(
        &self,
        _creds: &TransportCredentials,
        _message_ref: &str,
    ) -> Result<ProviderDeliveryState, TransportError> {
        self.status_fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.delivery_state.lock().expect("mock state lock");
        Ok(state.unwrap_or(ProviderDeliveryState::InFlight))
    }
}
