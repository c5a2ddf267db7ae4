//! Raw document → typed record mapping.
//!
//! Stored documents are loosely typed and written by several generations of
//! the ingestion pipeline, so every field is optional here and falls back to
//! a fixed default.

use chrono::DateTime;
use serde_json::Value;
use tracing::debug;

use crate::model::{Certificate, UserProfile, VerificationStatus};
use crate::store::Document;

/// Image fields in resolution priority order: storage URL first, then the
/// legacy URL fields, then raw storage paths.
pub const IMAGE_FIELDS: [&str; 5] = [
    "image_storage_url",
    "image_url",
    "imageUrl",
    "image_path",
    "imagePath",
];

/// Non-empty string value of a field. Numbers are rendered as text.
fn text(doc: &Document, field: &str) -> Option<String> {
    match doc.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_or(doc: &Document, field: &str, default: &str) -> String {
    text(doc, field).unwrap_or_else(|| default.to_string())
}

/// Parse a stored instant into epoch milliseconds.
///
/// Accepts integer or float milliseconds, numeric strings and RFC 3339
/// strings. Anything else is 0.
#[allow(clippy::cast_possible_truncation)]
pub fn millis(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().ok().unwrap_or_else(|| {
                DateTime::parse_from_rfc3339(s).map_or(0, |dt| dt.timestamp_millis())
            })
        }
        _ => 0,
    }
}

/// Parse a stored score into a percentage clamped to [0,100].
pub fn score(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(v) if v.is_finite() => v.clamp(0.0, 100.0),
        _ => 0.0,
    }
}

/// Parse a stored status; unknown or missing values are PENDING.
pub fn status(value: Option<&Value>) -> VerificationStatus {
    match value.and_then(Value::as_str) {
        Some(raw) => VerificationStatus::parse(raw).unwrap_or_else(|| {
            debug!(raw, "Unrecognised verification status, treating as PENDING");
            VerificationStatus::Pending
        }),
        None => VerificationStatus::Pending,
    }
}

/// First non-empty image reference in [`IMAGE_FIELDS`] order.
pub fn image_url(doc: &Document) -> Option<String> {
    IMAGE_FIELDS.iter().find_map(|field| text(doc, field))
}

/// Map a `profiles` document to a [`UserProfile`].
pub fn profile(doc: &Document) -> UserProfile {
    let email = text_or(doc, "email", "");
    let name = text(doc, "full_name")
        .or_else(|| (!email.is_empty()).then(|| email.clone()))
        .unwrap_or_else(|| "Unknown".to_string());

    UserProfile {
        id: doc.id.clone(),
        name,
        email,
        phone: text_or(doc, "phone", "N/A"),
        student_id: text_or(doc, "student_id", "N/A"),
        institution: text_or(doc, "institution", "N/A"),
        department: text_or(doc, "department", "N/A"),
        profile_picture_url: text_or(doc, "profile_picture_url", ""),
        created_at: millis(doc.get("created_at")),
    }
}

/// Map a `certificates` document to a [`Certificate`].
pub fn certificate(doc: &Document) -> Certificate {
    let recorded_type = text(doc, "certificate_type");
    Certificate {
        id: doc.id.clone(),
        user_email: text_or(doc, "user_email", ""),
        student_name: text_or(doc, "student_name", "Unknown"),
        student_id: text_or(doc, "student_id", "N/A"),
        certificate_title: text_or(doc, "certificate_title", "Untitled"),
        issuer_name: text_or(doc, "issuer_name", "Unknown"),
        issue_date: text_or(doc, "issue_date", "N/A"),
        type_recorded: recorded_type.is_some(),
        certificate_type: recorded_type.unwrap_or_else(|| "General".to_string()),
        duration: text_or(doc, "duration", "N/A"),
        course_name: text_or(doc, "course_name", ""),
        institution_name: text_or(doc, "institution_name", ""),
        grade: text_or(doc, "grade", ""),
        extracted_text: text_or(doc, "extracted_text", ""),
        score: score(doc.get("score")),
        verification_status: status(doc.get("verification_status")),
        remarks: text_or(doc, "remarks", ""),
        image_url: image_url(doc),
        timestamp: millis(doc.get("timestamp")),
        created_at: millis(doc.get("created_at")),
        updated_at: millis(doc.get("updated_at")),
    }
}
