//! Offer engine.
//!
//! Sending an offer renders the chosen template, turns it into a PDF, records
//! an `Offer` row and mails the letter to the candidate. The row is committed
//! before the mail goes out, so a transport failure leaves the record in
//! place and comes back as a delivery warning rather than an error.

use crate::{
    config::AppSettings,
    core::{context::RequestContext, salary::format_salary},
    entities::{
        Candidate, CandidateModel, CandidateStatus, JobPosting, OfferModel, OfferStatus,
        OfferTemplate, candidate, offer,
    },
    errors::{Error, FieldErrors, Result},
    services::{Attachment, FileStore, Mailer, OutgoingMail, pdf, storage::sanitize_file_name},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Shown for candidates who applied without a job posting.
pub const GENERAL_APPLICATION: &str = "General Application";

const OFFER_STATUS_MESSAGE: &str =
    "Offers can only be sent to candidates in Offer or Offered status.";

/// Salary as submitted: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SalaryInput {
    Number(serde_json::Number),
    Text(String),
}

impl SalaryInput {
    fn to_decimal(&self) -> Option<Decimal> {
        let text = match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().replace(',', ""),
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .ok()
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

/// The send-offer form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OfferTerms {
    pub offer_template_id: Option<i64>,
    pub salary: Option<SalaryInput>,
    /// `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`
    pub expiration_date: Option<String>,
    /// Included verbatim in the mail when present
    pub message: Option<String>,
    /// Name of the PDF attachment; derived from the candidate name when absent
    pub attachment_name: Option<String>,
}

/// Terms that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTerms {
    pub offer_template_id: i64,
    pub salary: Decimal,
    pub start_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub message: Option<String>,
}

/// Whether the letter reached the mail transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Delivery {
    Sent,
    /// The offer is recorded but the mail was not accepted; the operator may resend.
    Failed { warning: String },
}

/// Result of [`send_offer`].
#[derive(Debug, Clone, Serialize)]
pub struct OfferOutcome {
    pub offer: OfferModel,
    /// The candidate after any status transition
    pub candidate: CandidateModel,
    pub delivery: Delivery,
}

/// External collaborators and limits used while sending.
pub struct OfferServices<'a> {
    pub files: &'a dyn FileStore,
    pub mailer: &'a dyn Mailer,
    pub pdf_timeout: Duration,
    pub mail_timeout: Duration,
}

impl<'a> OfferServices<'a> {
    /// Uses the timeouts from `settings`.
    #[must_use]
    pub fn new(files: &'a dyn FileStore, mailer: &'a dyn Mailer, settings: &AppSettings) -> Self {
        Self {
            files,
            mailer,
            pdf_timeout: Duration::from_secs(settings.pdf_timeout_secs),
            mail_timeout: Duration::from_secs(settings.mail_timeout_secs),
        }
    }
}

fn parse_date(field: &str, label: &str, raw: Option<&str>, errors: &mut FieldErrors) -> Option<NaiveDate> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => {
            errors.add(field, format!("The {label} field is required."));
            None
        }
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| errors.add(field, format!("The {label} is not a valid date.")))
            .ok(),
    }
}

/// Checks the form against `today`.
///
/// # Errors
/// `Validation` listing every failing field.
pub fn validate_terms(terms: &OfferTerms, today: NaiveDate) -> Result<ValidatedTerms> {
    let mut errors = FieldErrors::new();

    if terms.offer_template_id.is_none() {
        errors.add("offer_template_id", "The offer template id field is required.");
    }

    let salary = match terms.salary.as_ref().filter(|s| !s.is_blank()) {
        None => {
            errors.add("salary", "The salary field is required.");
            None
        }
        Some(input) => match input.to_decimal() {
            None => {
                errors.add("salary", "The salary must be a number.");
                None
            }
            Some(amount) if amount.is_sign_negative() => {
                errors.add("salary", "The salary must be at least 0.");
                None
            }
            Some(amount) => Some(amount),
        },
    };

    let start_date = parse_date("start_date", "start date", terms.start_date.as_deref(), &mut errors);
    let expiration_date = parse_date(
        "expiration_date",
        "expiration date",
        terms.expiration_date.as_deref(),
        &mut errors,
    );
    if let Some(start) = start_date {
        if start < today {
            errors.add("start_date", "The start date must be a date after or equal to today.");
        }
        if expiration_date.is_some_and(|expiration| expiration < start) {
            errors.add(
                "expiration_date",
                "The expiration date must be a date after or equal to start date.",
            );
        }
    }

    errors.into_result()?;
    match (terms.offer_template_id, salary, start_date, expiration_date) {
        (Some(offer_template_id), Some(salary), Some(start_date), Some(expiration_date)) => {
            Ok(ValidatedTerms {
                offer_template_id,
                salary,
                start_date,
                expiration_date,
                message: terms
                    .message
                    .as_ref()
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty()),
            })
        }
        _ => Err(Error::field("offer_template_id", "The offer template id field is required.")),
    }
}

fn placeholder_value<'v>(values: &'v [(&str, String)], key: &str) -> Option<&'v str> {
    values.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
}

/// Splits a known `{{key}}` or `{key}` token off the front of `text`.
fn take_placeholder<'t, 'v>(
    text: &'t str,
    values: &'v [(&str, String)],
) -> Option<(&'v str, &'t str)> {
    if let Some((key, after)) = text.strip_prefix("{{").and_then(|inner| inner.split_once("}}")) {
        if let Some(value) = placeholder_value(values, key) {
            return Some((value, after));
        }
    }
    let (key, after) = text.strip_prefix('{')?.split_once('}')?;
    placeholder_value(values, key).map(|value| (value, after))
}

/// Replaces `{key}` (and `{{key}}`) tokens. Unknown tokens are left as-is.
///
/// The body is scanned once, so substituted values are never re-read as
/// tokens.
#[must_use]
pub fn render_placeholders(body: &str, values: &[(&str, String)]) -> String {
    let mut rendered = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        rest = &rest[open..];
        if let Some((value, after)) = take_placeholder(rest, values) {
            rendered.push_str(value);
            rest = after;
        } else {
            rendered.push('{');
            rest = &rest[1..];
        }
    }
    rendered.push_str(rest);
    rendered
}

/// Long date form used in letters, e.g. "March 1, 2026".
#[must_use]
pub fn format_letter_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn letter_values(
    ctx: &RequestContext,
    candidate: &CandidateModel,
    job_title: &str,
    terms: &ValidatedTerms,
) -> Vec<(&'static str, String)> {
    vec![
        ("candidate_name", candidate.full_name()),
        ("job_title", job_title.to_string()),
        ("salary", format_salary(terms.salary)),
        ("start_date", format_letter_date(terms.start_date)),
        ("expiration_date", format_letter_date(terms.expiration_date)),
        ("company_name", ctx.branding.company_name.clone()),
    ]
}

/// Escapes text for inclusion in an HTML body.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML body of the offer mail.
#[must_use]
pub fn offer_mail_body(
    candidate: &CandidateModel,
    job_title: &str,
    custom_message: Option<&str>,
    app_name: &str,
) -> String {
    let middle = match custom_message {
        Some(message) => format!("    <p>{}</p>\n", escape_html(message)),
        None => concat!(
            "    <p>Please find attached your official offer letter outlining the details of ",
            "your employment, including salary, start date, and benefits.</p>\n",
            "    <p>We kindly ask that you review the attached document and let us know your ",
            "decision by the expiration date mentioned within the letter.</p>\n",
        )
        .to_string(),
    };

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n    <title>Job Offer</title>\n</head>\n\
         <body style=\"font-family: Arial, sans-serif; line-height: 1.6;\">\n\
         \x20   <p>Dear {} {},</p>\n\
         \x20   <p>We are delighted to offer you the position of {} with us.</p>\n\
         {middle}\
         \x20   <p>If you have any questions, please feel free to reach out to us.</p>\n\
         \x20   <p>Looking forward to welcoming you to the team!</p>\n\
         \x20   <p>Best Regards,</p>\n\
         \x20   <p>{}</p>\n</body>\n</html>\n",
        escape_html(&candidate.first_name),
        escape_html(&candidate.last_name),
        escape_html(job_title),
        escape_html(app_name),
    )
}

/// Default attachment name, e.g. `Offer_Letter_Alice_Ng.pdf`.
#[must_use]
pub fn default_attachment_name(candidate: &CandidateModel) -> String {
    sanitize_file_name(&format!(
        "Offer_Letter_{}_{}.pdf",
        candidate.first_name, candidate.last_name
    ))
}

/// Composes the offer mail with the letter attached.
#[must_use]
pub fn compose_offer_mail(
    ctx: &RequestContext,
    candidate: &CandidateModel,
    job_title: &str,
    custom_message: Option<&str>,
    attachment_name: &str,
    pdf_bytes: Vec<u8>,
) -> OutgoingMail {
    OutgoingMail {
        from: ctx.branding.mail_from.clone(),
        from_name: ctx.branding.app_name.clone(),
        to: candidate.email.clone(),
        subject: format!("Job Offer from {}", ctx.branding.app_name),
        html_body: offer_mail_body(candidate, job_title, custom_message, &ctx.branding.app_name),
        attachments: vec![Attachment {
            file_name: attachment_name.to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: pdf_bytes,
        }],
    }
}

fn ensure_offerable(candidate: &CandidateModel) -> Result<()> {
    if candidate.status.accepts_offer() {
        Ok(())
    } else {
        Err(Error::InvalidState {
            message: OFFER_STATUS_MESSAGE.to_string(),
        })
    }
}

/// Sends an offer letter to a candidate in Offer or Offered status.
///
/// Each call records a new `Offer` row with status `sent`; earlier offers are
/// kept. After the mail transport accepts the message a candidate in `Offer`
/// moves to `Offered`.
///
/// # Errors
/// - `Validation` for missing or invalid terms, or an unknown template
/// - `InvalidState` if the candidate is not in Offer or Offered status
/// - `NotFound` if the candidate does not exist
/// - `Timeout` if the PDF cannot be rendered in time
///
/// A mail transport failure is not an error; see [`Delivery::Failed`].
#[instrument(skip(db, services, ctx, terms))]
pub async fn send_offer(
    db: &DatabaseConnection,
    services: &OfferServices<'_>,
    ctx: &RequestContext,
    candidate_id: i64,
    terms: &OfferTerms,
) -> Result<OfferOutcome> {
    let terms_valid = validate_terms(terms, ctx.today())?;

    let candidate = Candidate::find_by_id(candidate_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Candidate", candidate_id))?;
    ensure_offerable(&candidate)?;

    let template = OfferTemplate::find_by_id(terms_valid.offer_template_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            Error::field("offer_template_id", "The selected offer template id is invalid.")
        })?;
    let job_title = match candidate.job_id {
        Some(job_id) => JobPosting::find_by_id(job_id).one(db).await?.map(|j| j.title),
        None => None,
    }
    .unwrap_or_else(|| GENERAL_APPLICATION.to_string());

    let letter = render_placeholders(
        &template.body,
        &letter_values(ctx, &candidate, &job_title, &terms_valid),
    );
    let title = format!("Offer Letter - {}", candidate.full_name());
    let pdf_bytes = tokio::time::timeout(
        services.pdf_timeout,
        tokio::task::spawn_blocking(move || pdf::render_text_pdf(&title, &letter)),
    )
    .await
    .map_err(|_| Error::Timeout {
        operation: "Offer PDF generation",
        seconds: services.pdf_timeout.as_secs(),
    })??;

    let attachment_name = terms
        .attachment_name
        .as_deref()
        .map(sanitize_file_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_attachment_name(&candidate));
    let pdf_handle = services
        .files
        .put(&format!("offers/{candidate_id}"), &attachment_name, pdf_bytes.clone())
        .await?;

    let offer = match record_offer(db, candidate_id, &terms_valid, &pdf_handle).await {
        Ok(offer) => offer,
        Err(e) => {
            if let Err(cleanup) = services.files.delete(&pdf_handle).await {
                warn!("Failed to remove unrecorded offer letter {}: {}", pdf_handle, cleanup);
            }
            return Err(e);
        }
    };
    info!("Recorded offer {} for candidate {}", offer.id, candidate_id);

    let mail = compose_offer_mail(
        ctx,
        &candidate,
        &job_title,
        terms_valid.message.as_deref(),
        &attachment_name,
        pdf_bytes,
    );
    let sent = match tokio::time::timeout(services.mail_timeout, services.mailer.send(&mail)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation: "Offer mail delivery",
            seconds: services.mail_timeout.as_secs(),
        }),
    };

    match sent {
        Ok(()) => {
            let candidate = mark_offered(db, candidate_id).await?;
            info!("Offer {} mailed to {}", offer.id, candidate.email);
            Ok(OfferOutcome {
                offer,
                candidate,
                delivery: Delivery::Sent,
            })
        }
        Err(e) => {
            warn!("Offer {} recorded but mail failed: {}", offer.id, e);
            Ok(OfferOutcome {
                offer,
                candidate,
                delivery: Delivery::Failed {
                    warning: format!(
                        "The offer was saved but the email could not be sent: {e}. You may resend it."
                    ),
                },
            })
        }
    }
}

async fn record_offer(
    db: &DatabaseConnection,
    candidate_id: i64,
    terms: &ValidatedTerms,
    pdf_handle: &str,
) -> Result<OfferModel> {
    let txn = db.begin().await?;

    // status may have moved since the form was validated
    let candidate = Candidate::find_by_id(candidate_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Candidate", candidate_id))?;
    ensure_offerable(&candidate)?;

    let now = Utc::now();
    let offer = offer::ActiveModel {
        candidate_id: Set(candidate_id),
        offer_template_id: Set(terms.offer_template_id),
        salary: Set(terms.salary),
        start_date: Set(terms.start_date),
        expiration_date: Set(terms.expiration_date),
        message: Set(terms.message.clone()),
        status: Set(OfferStatus::Sent),
        pdf_path: Set(Some(pdf_handle.to_string())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(offer)
}

async fn mark_offered(db: &DatabaseConnection, candidate_id: i64) -> Result<CandidateModel> {
    let txn = db.begin().await?;
    let current = Candidate::find_by_id(candidate_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Candidate", candidate_id))?;

    let updated = if current.status == CandidateStatus::Offer {
        let mut active: candidate::ActiveModel = current.into();
        active.status = Set(CandidateStatus::Offered);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        info!("Candidate {} status changed from Offer to Offered", candidate_id);
        updated
    } else {
        current
    };

    txn.commit().await?;
    Ok(updated)
}
