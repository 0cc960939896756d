//! Outbound hooks: activity history, e-mail and CRM leads. These run after a
//! unit of work has been committed and their failures are only logged.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::{PartnerId, PropertyId, UserId};

/// Record an activity entry is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "model", content = "id", rename_all = "snake_case")]
pub enum RecordRef {
    Property(PropertyId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub record: RecordRef,
    /// HTML body; callers escape any user-provided text.
    pub body: String,
    pub recipients: Vec<UserId>,
    pub email_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body_html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRequest {
    pub title: String,
    pub contact_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub description: String,
    pub property_id: PropertyId,
    pub partner_id: Option<PartnerId>,
    pub salesperson: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

/// Notification transport failure.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Activity log and mail transport.
pub trait Notifier: Send + Sync {
    fn post_activity(&self, entry: ActivityEntry) -> Result<(), NotificationError>;
    fn send_email(&self, email: OutboundEmail) -> Result<(), NotificationError>;
}

/// Optional CRM integration turning website inquiries into leads.
pub trait CrmGateway: Send + Sync {
    fn create_lead(&self, lead: LeadRequest) -> Result<LeadId, NotificationError>;
}

/// A deferred side effect queued while a unit of work is prepared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    Activity(ActivityEntry),
    Email(OutboundEmail),
    Lead(LeadRequest),
}

impl SideEffect {
    fn kind(&self) -> &'static str {
        match self {
            SideEffect::Activity(_) => "activity",
            SideEffect::Email(_) => "email",
            SideEffect::Lead(_) => "lead",
        }
    }
}

/// Tally of a dispatch round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Run each effect once, logging and swallowing failures.
pub fn dispatch<N>(
    notifier: &N,
    crm: Option<&dyn CrmGateway>,
    effects: Vec<SideEffect>,
) -> DispatchReport
where
    N: Notifier + ?Sized,
{
    let mut report = DispatchReport::default();
    for effect in effects {
        let kind = effect.kind();
        let outcome = match effect {
            SideEffect::Activity(entry) => notifier.post_activity(entry),
            SideEffect::Email(email) => notifier.send_email(email),
            SideEffect::Lead(lead) => match crm {
                Some(crm) => crm.create_lead(lead).map(|lead_id| {
                    debug!(lead = %lead_id.0, "crm lead created");
                }),
                None => {
                    debug!(property = %lead.property_id, "no crm gateway configured; lead skipped");
                    report.skipped += 1;
                    continue;
                }
            },
        };

        match outcome {
            Ok(()) => report.delivered += 1,
            Err(err) => {
                warn!(effect = kind, error = %err, "side effect failed; primary change kept");
                report.failed += 1;
            }
        }
    }
    report
}
