//! Typed record shapes consumed by every console view.

use serde::{Deserialize, Serialize};

/// Collection holding end-user profiles.
pub const PROFILES: &str = "profiles";
/// Collection holding uploaded certificates.
pub const CERTIFICATES: &str = "certificates";

/// Verification outcome of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    /// Display order used by the status histogram.
    pub const ALL: [Self; 3] = [Self::Verified, Self::Pending, Self::Rejected];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Verified => "VERIFIED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parse a stored status in any letter case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "VERIFIED" => Some(Self::Verified),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered end-user (certificate holder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub student_id: String,
    pub institution: String,
    pub department: String,
    pub profile_picture_url: String,
    /// Epoch milliseconds; 0 when unknown.
    pub created_at: i64,
}

/// An uploaded credential and its verification outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: String,
    pub user_email: String,
    pub student_name: String,
    pub student_id: String,
    pub certificate_title: String,
    pub issuer_name: String,
    pub issue_date: String,
    pub certificate_type: String,
    /// False when the stored document had no `certificate_type` and the
    /// field above holds the display default.
    #[serde(skip)]
    pub type_recorded: bool,
    pub duration: String,
    pub course_name: String,
    pub institution_name: String,
    pub grade: String,
    pub extracted_text: String,
    /// Percentage in [0,100].
    pub score: f64,
    pub verification_status: VerificationStatus,
    pub remarks: String,
    /// Resolved display image, if any of the image fields is set.
    pub image_url: Option<String>,
    /// Upload instant, epoch milliseconds.
    pub timestamp: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Certificate {
    /// Key for the type histogram; untyped certificates count as "Unknown"
    /// rather than joining the "General" bucket.
    pub fn type_key(&self) -> &str {
        if self.type_recorded {
            &self.certificate_type
        } else {
            "Unknown"
        }
    }

    /// Instant the verification outcome was last touched.
    pub const fn reviewed_at(&self) -> i64 {
        if self.updated_at > 0 {
            self.updated_at
        } else {
            self.timestamp
        }
    }

    pub fn is_reviewed(&self) -> bool {
        self.verification_status != VerificationStatus::Pending
    }
}

/// Per-user certificate counts, computed at view time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateCounts {
    pub total: usize,
    pub verified: usize,
    pub pending: usize,
    pub rejected: usize,
}

impl CertificateCounts {
    pub fn tally<'a>(certs: impl IntoIterator<Item = &'a Certificate>) -> Self {
        let mut counts = Self::default();
        for cert in certs {
            counts.total += 1;
            match cert.verification_status {
                VerificationStatus::Verified => counts.verified += 1,
                VerificationStatus::Pending => counts.pending += 1,
                VerificationStatus::Rejected => counts.rejected += 1,
            }
        }
        counts
    }
}

/// Row of the user list: profile plus its certificate count.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub certificates: usize,
}

/// User detail view: profile, counts and owned certificates.
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    pub profile: UserProfile,
    pub counts: CertificateCounts,
    pub certificates: Vec<Certificate>,
}

/// Row of the verification list.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationRecord {
    #[serde(flatten)]
    pub certificate: Certificate,
    pub reviewed_at: i64,
}

impl From<Certificate> for VerificationRecord {
    fn from(certificate: Certificate) -> Self {
        let reviewed_at = certificate.reviewed_at();
        Self {
            certificate,
            reviewed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_any_case() {
        assert_eq!(VerificationStatus::parse("verified"), Some(VerificationStatus::Verified));
        assert_eq!(VerificationStatus::parse(" Rejected "), Some(VerificationStatus::Rejected));
        assert_eq!(VerificationStatus::parse("approved"), None);
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&VerificationStatus::Verified).unwrap_or_default();
        assert_eq!(json, "\"VERIFIED\"");
    }
}
