use estate::config::AppConfig;
use estate::workflows::estate::{
    ActivityEntry, CrmGateway, EstateService, InMemoryEstateRepository, LeadId, LeadRequest,
    NotificationError, Notifier, OutboundEmail, RecordRef,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

pub(crate) type ApiService = EstateService<InMemoryEstateRepository, TracingNotifier>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Writes activity entries to the log and keeps outgoing mail in a local outbox.
#[derive(Default, Clone)]
pub(crate) struct TracingNotifier {
    outbox: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl TracingNotifier {
    pub(crate) fn outbox(&self) -> Vec<OutboundEmail> {
        self.outbox
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Notifier for TracingNotifier {
    fn post_activity(&self, entry: ActivityEntry) -> Result<(), NotificationError> {
        let RecordRef::Property(property) = &entry.record;
        info!(
            property = %property,
            recipients = entry.recipients.len(),
            body = %entry.body,
            "activity posted"
        );
        Ok(())
    }

    fn send_email(&self, email: OutboundEmail) -> Result<(), NotificationError> {
        info!(to = %email.to, subject = %email.subject, "email queued");
        self.outbox
            .lock()
            .map_err(|_| NotificationError::Transport("outbox mutex poisoned".to_string()))?
            .push(email);
        Ok(())
    }
}

/// Process-local CRM stand-in, enabled with `APP_CRM_ENABLED`.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCrm {
    leads: Arc<Mutex<Vec<LeadRequest>>>,
}

impl InMemoryCrm {
    pub(crate) fn leads(&self) -> Vec<LeadRequest> {
        self.leads
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl CrmGateway for InMemoryCrm {
    fn create_lead(&self, lead: LeadRequest) -> Result<LeadId, NotificationError> {
        let mut guard = self
            .leads
            .lock()
            .map_err(|_| NotificationError::Transport("crm mutex poisoned".to_string()))?;
        info!(title = %lead.title, "crm lead created");
        guard.push(lead);
        Ok(LeadId(format!("lead-{:04}", guard.len())))
    }
}

pub(crate) struct Backends {
    pub(crate) notifier: Arc<TracingNotifier>,
    pub(crate) crm: Option<Arc<InMemoryCrm>>,
}

/// Wire the estate service with in-process backends according to `config`.
pub(crate) fn build_service(config: &AppConfig) -> (ApiService, Backends) {
    let notifier = Arc::new(TracingNotifier::default());
    let mut service = EstateService::new(
        Arc::new(InMemoryEstateRepository::default()),
        notifier.clone(),
    )
    .with_website_base_url(config.website.base_url.clone())
    .with_mail_from(config.notifications.mail_from.clone());

    let crm = config
        .notifications
        .crm_enabled
        .then(|| Arc::new(InMemoryCrm::default()));
    if let Some(crm) = &crm {
        service = service.with_crm(crm.clone());
    }

    (service, Backends { notifier, crm })
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate::config::{
        AppEnvironment, NotificationConfig, ServerConfig, TelemetryConfig, WebsiteConfig,
    };

    fn config(crm_enabled: bool) -> AppConfig {
        AppConfig {
            environment: AppEnvironment::Test,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
            },
            website: WebsiteConfig {
                base_url: Some("https://homes.example.com".to_string()),
            },
            notifications: NotificationConfig {
                mail_from: "listings@homes.example.com".to_string(),
                crm_enabled,
            },
        }
    }

    #[test]
    fn crm_is_wired_only_when_enabled() {
        let (_, backends) = build_service(&config(false));
        assert!(backends.crm.is_none());

        let (_, backends) = build_service(&config(true));
        assert!(backends.crm.is_some());
    }

    #[test]
    fn notifier_keeps_sent_mail() {
        let notifier = TracingNotifier::default();
        notifier
            .send_email(OutboundEmail {
                to: "agent@example.com".to_string(),
                from: "listings@homes.example.com".to_string(),
                subject: "New inquiry".to_string(),
                body_html: "<p>hello</p>".to_string(),
            })
            .expect("queued");
        assert_eq!(notifier.outbox().len(), 1);
    }
}
