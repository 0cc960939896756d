//! Website inquiry intake: contact dedup, activity note, optional CRM lead and
//! a heads-up e-mail to the assigned salesperson.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{Partner, PartnerId, PropertyId};
use super::error::EstateServiceError;
use super::notify::{
    ActivityEntry, LeadRequest, Notifier, OutboundEmail, RecordRef, SideEffect,
};
use super::repository::{ChangeSet, EstateRepository};
use super::service::{clean, next_partner_id, EstateService};

pub const DEFAULT_VISITOR_NAME: &str = "Website Visitor";

/// Form fields posted from a listing page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InquirySubmission {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InquiryConfirmation {
    pub property_id: PropertyId,
    pub property_name: String,
    pub partner_id: Option<PartnerId>,
    pub message: String,
}

/// Cleaned inquiry fields, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InquiryDetails {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub property_url: Option<String>,
    pub message: Option<String>,
}

impl InquiryDetails {
    pub fn from_submission(submission: InquirySubmission, property_url: Option<String>) -> Self {
        Self {
            name: clean(submission.name).unwrap_or_else(|| DEFAULT_VISITOR_NAME.to_string()),
            email: clean(submission.email),
            phone: clean(submission.phone),
            property_url,
            message: clean(submission.message),
        }
    }
}

/// HTML note for the listing history. Every visitor-supplied value is escaped.
pub fn render_inquiry_body(details: &InquiryDetails) -> String {
    let email = details
        .email
        .as_deref()
        .map(escape_html)
        .map(|email| format!("<a href=\"mailto:{email}\">{email}</a>"))
        .unwrap_or_else(|| "-".to_string());
    let phone = details
        .phone
        .as_deref()
        .map(escape_html)
        .map(|phone| format!("<a href=\"tel:{phone}\">{phone}</a>"))
        .unwrap_or_else(|| "-".to_string());
    let url = details
        .property_url
        .as_deref()
        .map(escape_html)
        .map(|url| format!("<a href=\"{url}\" target=\"_blank\" rel=\"noopener\">{url}</a>"))
        .unwrap_or_else(|| "-".to_string());
    let message = details
        .message
        .as_deref()
        .map(|message| escape_html(message).replace('\n', "<br/>"))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "<div>\
         <p><strong>Website inquiry</strong></p>\
         <ul>\
         <li><strong>Name:</strong> {name}</li>\
         <li><strong>Email:</strong> {email}</li>\
         <li><strong>Phone:</strong> {phone}</li>\
         <li><strong>Property URL:</strong> {url}</li>\
         </ul>\
         <div><strong>Message:</strong><br/>{message}</div>\
         </div>",
        name = escape_html(&details.name),
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

impl<R, N> EstateService<R, N>
where
    R: EstateRepository + 'static,
    N: Notifier + 'static,
{
    /// Accept a website inquiry on a public listing.
    pub fn submit_inquiry(
        &self,
        property_id: &PropertyId,
        submission: InquirySubmission,
    ) -> Result<InquiryConfirmation, EstateServiceError> {
        let property = self.load_property(property_id)?;
        if !property.is_public() {
            return Err(EstateServiceError::not_found("property", property_id));
        }

        let property_url = self
            .website_base_url
            .as_deref()
            .map(|base| format!("{}/properties/{}", base.trim_end_matches('/'), property.id));
        let details = InquiryDetails::from_submission(submission, property_url);
        let partner = self.partner_for_inquiry(&details)?;
        let salesperson = match &property.salesperson {
            Some(user) => self.repository.fetch_salesperson(user)?,
            None => None,
        };

        let body = render_inquiry_body(&details);
        let mut effects = vec![SideEffect::Activity(ActivityEntry {
            record: RecordRef::Property(property.id.clone()),
            body: body.clone(),
            recipients: salesperson.iter().map(|s| s.id.clone()).collect(),
            email_from: details.email.clone(),
        })];
        effects.push(SideEffect::Lead(LeadRequest {
            title: format!("Website inquiry: {}", property.name),
            contact_name: details.name.clone(),
            email: details.email.clone(),
            phone: details.phone.clone(),
            description: body.clone(),
            property_id: property.id.clone(),
            partner_id: partner.as_ref().map(|p| p.id.clone()),
            salesperson: property.salesperson.clone(),
        }));
        if let Some(to) = salesperson.as_ref().and_then(|s| s.email.clone()) {
            effects.push(SideEffect::Email(OutboundEmail {
                to,
                from: self.mail_from.clone(),
                subject: format!("New inquiry for {}", property.name),
                body_html: body,
            }));
        }

        let report = self.dispatch(effects);
        info!(
            property = %property.id,
            partner = ?partner.as_ref().map(|p| p.id.as_str()),
            delivered = report.delivered,
            failed = report.failed,
            "website inquiry received"
        );

        Ok(InquiryConfirmation {
            property_id: property.id,
            message: format!(
                "Thank you, {}. The agent for {} will get back to you shortly.",
                details.name, property.name
            ),
            property_name: property.name,
            partner_id: partner.map(|p| p.id),
        })
    }

    /// Reuse the contact with the same e-mail, or create one. No e-mail, no contact.
    fn partner_for_inquiry(
        &self,
        details: &InquiryDetails,
    ) -> Result<Option<Partner>, EstateServiceError> {
        let Some(email) = details.email.as_deref() else {
            return Ok(None);
        };
        if let Some(existing) = self.repository.partner_by_email(email)? {
            return Ok(Some(existing));
        }

        let partner = Partner {
            id: next_partner_id(),
            name: details.name.clone(),
            email: Some(email.to_string()),
            phone: details.phone.clone(),
        };
        let mut changes = ChangeSet::new();
        changes.partners.push(partner.clone());
        self.repository.commit(changes)?;
        info!(partner = %partner.id, "contact created from website inquiry");
        Ok(Some(partner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_visitor_input_and_keeps_line_breaks() {
        let details = InquiryDetails::from_submission(
            InquirySubmission {
                name: Some("<b>Eve</b>".to_string()),
                email: Some("eve@example.com".to_string()),
                phone: None,
                message: Some("line one\n<script>x</script>".to_string()),
            },
            Some("https://homes.example.com/properties/prop-1".to_string()),
        );
        let body = render_inquiry_body(&details);

        assert!(body.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(body.contains("line one<br/>&lt;script&gt;x&lt;/script&gt;"));
        assert!(body.contains("mailto:eve@example.com"));
        assert!(body.contains("<strong>Phone:</strong> -"));
        assert!(body.contains("https://homes.example.com/properties/prop-1"));
        assert!(!body.contains("<script>"));
    }

    #[test]
    fn blank_fields_fall_back_to_defaults() {
        let details = InquiryDetails::from_submission(
            InquirySubmission {
                name: Some("   ".to_string()),
                message: Some(String::new()),
                ..InquirySubmission::default()
            },
            None,
        );
        assert_eq!(details.name, DEFAULT_VISITOR_NAME);
        assert_eq!(details.email, None);

        let body = render_inquiry_body(&details);
        assert!(body.contains("<strong>Property URL:</strong> -"));
        assert!(body.contains("<br/>-</div>"));
    }
}
