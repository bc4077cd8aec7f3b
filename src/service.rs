//! Operator-facing facade. `AlertService` owns the store, the vault key and
//! the dispatcher, and exposes the full surface an embedding application
//! needs: transport setup, contact registry, alert issuance, audit queries,
//! export and retention.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::ServicePaths;
use crate::crypto::{CryptoError, VaultKey};
use crate::db::Store;
use crate::dispatch::{AlertDispatcher, AlertError, RetryPolicy};
use crate::export::export_alerts;
use crate::models::{
    AlertFilter, DeliveryOutcome, DeliveryStatus, EmergencyAlert, EmergencyContact, ExportFormat,
    PatientContext, StoredTransportConfig, TransportStatus, UrgencyLevel,
};
use crate::phone;
use crate::transport::SmsTransport;

pub struct AlertService {
    store: Arc<Store>,
    vault: Arc<VaultKey>,
    dispatcher: AlertDispatcher,
    transport: Arc<dyn SmsTransport>,
}

impl AlertService {
    /// Open (or initialize) a deployment at the given paths.
    ///
    /// Key resolution: load the vault key (environment secret first, then
    /// the key file). On a genuinely fresh deployment — no key and no
    /// encrypted material in the database — a key is generated. If encrypted
    /// material exists but the key is gone, this fails loudly rather than
    /// minting a key that can never decrypt it.
    pub fn open(paths: &ServicePaths, transport: Arc<dyn SmsTransport>) -> Result<Self, AlertError> {
        let store = Arc::new(Store::open(&paths.db_path())?);
        let keys_dir = paths.keys_dir();

        let vault = match VaultKey::load(&keys_dir) {
            Ok(vault) => vault,
            Err(CryptoError::KeyUnavailable(path)) => {
                if store.has_stored_secret()? {
                    return Err(CryptoError::KeyUnavailable(path).into());
                }
                tracing::info!("no vault key found, generating one for a fresh deployment");
                VaultKey::generate(&keys_dir)?
            }
            Err(err) => return Err(err.into()),
        };
        let vault = Arc::new(vault);

        let dispatcher = AlertDispatcher::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            Arc::clone(&vault),
        );

        Ok(Self {
            store,
            vault,
            dispatcher,
            transport,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.dispatcher = self.dispatcher.with_retry_policy(retry);
        self
    }

    // ── Transport configuration ──────────────────────────────────────────

    /// Store provider credentials. The auth token is encrypted under the
    /// vault key before it touches the database; the whole row is replaced,
    /// so a reconfiguration also clears any previous test timestamp.
    pub fn configure_transport(
        &self,
        account_sid: &str,
        auth_token: &str,
        from_number: &str,
    ) -> Result<(), AlertError> {
        let account_sid = account_sid.trim();
        if account_sid.is_empty() {
            return Err(AlertError::Validation("account SID is empty".into()));
        }
        if auth_token.trim().is_empty() {
            return Err(AlertError::Validation("auth token is empty".into()));
        }
        let from_number = phone::normalize(from_number).ok_or_else(|| {
            AlertError::Validation("sender phone number is not a valid E.164 number".into())
        })?;

        let encrypted = self.vault.encrypt(auth_token.trim().as_bytes())?;
        self.store.save_transport_config(&StoredTransportConfig {
            account_sid: account_sid.to_string(),
            encrypted_token: encrypted.to_base64(),
            from_number,
            configured: true,
            last_tested: None,
        })?;

        tracing::info!("transport configuration updated");
        Ok(())
    }

    /// Non-secret view of the stored configuration, `None` when unset
    pub fn transport_status(&self) -> Result<Option<TransportStatus>, AlertError> {
        Ok(self
            .store
            .load_transport_config()?
            .as_ref()
            .map(TransportStatus::from))
    }

    /// Send a real test message through the configured transport and record
    /// the test timestamp on success. Returns the provider's message
    /// reference.
    pub async fn test_configuration(&self, to: &str) -> Result<String, AlertError> {
        let to = phone::normalize(to).ok_or_else(|| {
            AlertError::Validation("test recipient is not a valid E.164 number".into())
        })?;

        let creds = self.dispatcher.credentials()?;
        let transport = Arc::clone(&self.transport);
        let receipt = tokio::task::spawn_blocking(move || {
            transport.send_sms(&creds, &to, "Alertline configuration test")
        })
        .await
        .map_err(|e| {
            crate::transport::TransportError::Network(format!("send worker failed: {e}"))
        })??;

        self.store.mark_tested(Utc::now().naive_utc())?;
        tracing::info!("transport configuration test succeeded");
        Ok(receipt.message_ref)
    }

    // ── Contact registry ─────────────────────────────────────────────────

    /// Register an emergency contact. Lower priority values are notified
    /// first.
    pub fn add_contact(
        &self,
        name: &str,
        phone: &str,
        priority: i64,
    ) -> Result<EmergencyContact, AlertError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AlertError::Validation("contact name is empty".into()));
        }
        let phone = phone::normalize(phone).ok_or_else(|| {
            AlertError::Validation("contact phone number is not a valid E.164 number".into())
        })?;

        Ok(self.store.add_contact(name, &phone, priority)?)
    }

    pub fn contacts(&self, active_only: bool) -> Result<Vec<EmergencyContact>, AlertError> {
        Ok(self.store.contacts(active_only)?)
    }

    /// Deactivate a contact; its rows and audit history remain
    pub fn deactivate_contact(&self, id: &Uuid) -> Result<bool, AlertError> {
        Ok(self.store.deactivate_contact(id)?)
    }

    // ── Alert issuance ───────────────────────────────────────────────────

    /// Send an alert to every active contact, in priority order. One outcome
    /// (and one audit record) per contact; a failure for one contact does not
    /// stop delivery to the rest.
    pub async fn send_alert(
        &self,
        context: &PatientContext,
        urgency: UrgencyLevel,
        notes: &str,
    ) -> Result<Vec<DeliveryOutcome>, AlertError> {
        context
            .validate()
            .map_err(AlertError::Validation)?;

        let contacts = self.store.contacts(true)?;
        if contacts.is_empty() {
            return Err(AlertError::Validation(
                "no active emergency contacts are registered".into(),
            ));
        }

        let mut outcomes = Vec::with_capacity(contacts.len());
        for contact in &contacts {
            let outcome = self
                .dispatcher
                .send_alert(context, urgency, notes, &contact.phone)
                .await?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Send an alert to one explicit recipient, bypassing the registry
    pub async fn send_alert_to(
        &self,
        context: &PatientContext,
        urgency: UrgencyLevel,
        notes: &str,
        recipient: &str,
    ) -> Result<DeliveryOutcome, AlertError> {
        self.dispatcher
            .send_alert(context, urgency, notes, recipient)
            .await
    }

    /// Issue an alert without awaiting delivery. The returned handle resolves
    /// to the same outcomes `send_alert` would produce; the caller's flow is
    /// never blocked on provider latency or retry backoff.
    pub fn spawn_send_alert(
        self: &Arc<Self>,
        context: PatientContext,
        urgency: UrgencyLevel,
        notes: String,
    ) -> tokio::task::JoinHandle<Result<Vec<DeliveryOutcome>, AlertError>> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.send_alert(&context, urgency, &notes).await })
    }

    // ── Audit history ────────────────────────────────────────────────────

    pub fn history(&self, filter: &AlertFilter) -> Result<Vec<EmergencyAlert>, AlertError> {
        Ok(self.store.query_alerts(filter)?)
    }

    pub fn get_alert(&self, id: &Uuid) -> Result<EmergencyAlert, AlertError> {
        Ok(self.store.get_alert(id)?)
    }

    /// Export filtered history as CSV or JSON bytes
    pub fn export_history(
        &self,
        format: ExportFormat,
        filter: &AlertFilter,
    ) -> Result<Vec<u8>, AlertError> {
        let alerts = self.store.query_alerts(filter)?;
        Ok(export_alerts(&alerts, format)?)
    }

    /// Delete audit records older than the retention window
    /// ([`crate::config::DEFAULT_RETENTION_DAYS`] unless the deployment says
    /// otherwise). Records exactly at the cutoff are retained. Returns the
    /// number deleted.
    pub fn purge_history(&self, retention_days: i64) -> Result<usize, AlertError> {
        let purged = self.store.purge_older_than(retention_days)?;
        if purged > 0 {
            tracing::info!(purged, retention_days, "audit records purged");
        }
        Ok(purged)
    }

    /// Ask the provider for the current delivery state of an accepted alert
    pub async fn refresh_delivery_status(
        &self,
        alert_id: &Uuid,
    ) -> Result<DeliveryStatus, AlertError> {
        self.dispatcher.refresh_delivery_status(alert_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Diagnosis, Gender, ReasonCode};
    use crate::transport::mock::{MockTransport, ScriptedSend};
    use crate::transport::TransportError;
    use std::time::Duration;

    struct Fixture {
        service: Arc<AlertService>,
        transport: Arc<MockTransport>,
        dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let service = AlertService::open(
            &ServicePaths::new(dir.path()),
            Arc::clone(&transport) as Arc<dyn SmsTransport>,
        )
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        });

        Fixture {
            service: Arc::new(service),
            transport,
            dir,
        }
    }

    fn configured_fixture() -> Fixture {
        let f = fixture();
        f.service
            .configure_transport("AC_test", "auth-token", "+15550100")
            .unwrap();
        f
    }

    fn context() -> PatientContext {
        PatientContext {
            case_reference: "C-42".into(),
            age: 7,
            gender: Gender::Female,
            top_diagnosis: Some(Diagnosis {
                name: "Disorder X".into(),
                confidence: 0.82,
            }),
            symptoms: vec!["seizures".into(), "hypotonia".into()],
        }
    }

    #[test]
    fn fresh_deployment_generates_a_key() {
        let f = fixture();
        assert!(VaultKey::exists(&ServicePaths::new(f.dir.path()).keys_dir()));
    }

    #[test]
    fn reopen_without_key_but_with_stored_secret_fails() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ServicePaths::new(dir.path());
        let transport = Arc::new(MockTransport::new());

        {
            let service =
                AlertService::open(&paths, Arc::clone(&transport) as Arc<dyn SmsTransport>)
                    .unwrap();
            service
                .configure_transport("AC_test", "auth-token", "+15550100")
                .unwrap();
        }

        std::fs::remove_dir_all(paths.keys_dir()).unwrap();
        let result = AlertService::open(&paths, transport as Arc<dyn SmsTransport>);
        assert!(matches!(
            result,
            Err(AlertError::Crypto(CryptoError::KeyUnavailable(_)))
        ));
    }

    #[test]
    fn transport_status_reflects_configuration() {
        let f = fixture();
        assert!(f.service.transport_status().unwrap().is_none());

        f.service
            .configure_transport("AC_test", "auth-token", "+1 555 010 0000")
            .unwrap();

        let status = f.service.transport_status().unwrap().unwrap();
        assert!(status.configured);
        assert_eq!(status.account_sid, "AC_test");
        // Sender number is normalized on the way in
        assert_eq!(status.from_number, "+15550100000");
        assert!(status.last_tested.is_none());
    }

    #[test]
    fn configure_rejects_bad_sender_number() {
        let f = fixture();
        let result = f.service.configure_transport("AC_test", "token", "not-a-number");
        assert!(matches!(result, Err(AlertError::Validation(_))));
    }

    #[tokio::test]
    async fn configuration_test_sends_and_records_timestamp() {
        let f = configured_fixture();
        let message_ref = f.service.test_configuration("+15550199").await.unwrap();
        assert!(!message_ref.is_empty());
        assert_eq!(f.transport.send_count(), 1);

        let status = f.service.transport_status().unwrap().unwrap();
        assert!(status.last_tested.is_some());
    }

    #[tokio::test]
    async fn configuration_test_without_config_fails() {
        let f = fixture();
        let result = f.service.test_configuration("+15550199").await;
        assert!(matches!(result, Err(AlertError::NotConfigured)));
        assert_eq!(f.transport.send_count(), 0);
    }

    #[tokio::test]
    async fn alerts_go_to_active_contacts_in_priority_order() {
        let f = configured_fixture();
        f.service.add_contact("Backup", "+15550102", 2).unwrap();
        f.service.add_contact("Primary", "+15550101", 1).unwrap();
        let retired = f.service.add_contact("Retired", "+15550103", 3).unwrap();
        f.service.deactivate_contact(&retired.id).unwrap();

        let outcomes = f
            .service
            .send_alert(&context(), UrgencyLevel::Critical, "")
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == DeliveryStatus::Sent));
        assert_eq!(f.transport.send_count(), 2);

        let records = f.service.history(&AlertFilter::default()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn one_failing_contact_does_not_block_the_rest() {
        let f = configured_fixture();
        f.service.add_contact("Primary", "+15550101", 1).unwrap();
        f.service.add_contact("Backup", "+15550102", 2).unwrap();
        f.transport
            .push_outcome(ScriptedSend::Fail(TransportError::RecipientRejected));

        let outcomes = f
            .service
            .send_alert(&context(), UrgencyLevel::High, "")
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].status, DeliveryStatus::Failed);
        assert_eq!(outcomes[0].reason, Some(ReasonCode::RecipientRejected));
        assert_eq!(outcomes[1].status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn send_without_contacts_is_rejected() {
        let f = configured_fixture();
        let result = f.service.send_alert(&context(), UrgencyLevel::High, "").await;
        assert!(matches!(result, Err(AlertError::Validation(_))));
        assert_eq!(f.transport.send_count(), 0);
    }

    #[tokio::test]
    async fn spawned_send_does_not_block_the_caller() {
        let f = configured_fixture();
        f.service.add_contact("Primary", "+15550101", 1).unwrap();

        let handle =
            f.service
                .spawn_send_alert(context(), UrgencyLevel::Critical, String::new());
        let outcomes = handle.await.unwrap().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn export_covers_filtered_history() {
        let f = configured_fixture();
        f.service.add_contact("Primary", "+15550101", 1).unwrap();
        f.service
            .send_alert(&context(), UrgencyLevel::Critical, "")
            .await
            .unwrap();

        let csv = f
            .service
            .export_history(ExportFormat::Csv, &AlertFilter::default())
            .unwrap();
        let text = String::from_utf8(csv).unwrap();
        assert!(text.lines().count() == 2);
        assert!(text.contains("C-42"));

        let json = f
            .service
            .export_history(ExportFormat::Json, &AlertFilter::default())
            .unwrap();
        let parsed: Vec<EmergencyAlert> = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[tokio::test]
    async fn purge_reports_zero_on_fresh_history() {
        let f = configured_fixture();
        f.service.add_contact("Primary", "+15550101", 1).unwrap();
        f.service
            .send_alert(&context(), UrgencyLevel::Low, "")
            .await
            .unwrap();

        // Everything is newer than the retention window
        assert_eq!(f.service.purge_history(30).unwrap(), 0);
        assert_eq!(f.service.history(&AlertFilter::default()).unwrap().len(), 1);
    }
}
