//! Record repository over the console's collections.
//!
//! Thin typed accessor on top of a [`DocumentStore`]: every read is a full
//! collection or single-document fetch, every write a single-document call.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::db::unix_millis;
use crate::error::{Error, Result};
use crate::model::{
    Certificate, CertificateCounts, UserDetail, UserProfile, UserSummary, VerificationRecord,
    VerificationStatus, CERTIFICATES, PROFILES,
};
use crate::normalize;
use crate::store::{Document, DocumentStore, Fields};

/// Validated edit of a certificate's verification outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: VerificationStatus,
    pub score: f64,
    pub remarks: String,
}

impl StatusUpdate {
    /// Reject out-of-range input before anything reaches the store.
    pub fn new(status: VerificationStatus, score: f64, remarks: impl Into<String>) -> Result<Self> {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(Error::Validation(format!(
                "Score must be between 0 and 100, got {score}"
            )));
        }
        Ok(Self {
            status,
            score,
            remarks: remarks.into(),
        })
    }

    fn into_fields(self, now_millis: i64) -> Fields {
        let mut fields = Fields::new();
        fields.insert("verification_status".into(), json!(self.status.as_str()));
        fields.insert("score".into(), json!(self.score));
        fields.insert("remarks".into(), json!(self.remarks));
        fields.insert("updated_at".into(), json!(now_millis));
        fields
    }
}

/// Outcome of deleting a user together with their certificates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// Certificate ids removed.
    pub deleted: Vec<String>,
    /// Certificate ids whose delete failed, with the error.
    pub failed: Vec<(String, String)>,
    /// Whether the profile itself was removed.
    pub profile_deleted: bool,
}

/// Typed access to profiles and certificates.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    // =========================================================================
    // Generic operations
    // =========================================================================

    pub async fn list_all(&self, collection: &str) -> Result<Vec<Document>> {
        Ok(self.store.list(collection).await?)
    }

    pub async fn get_by_id(&self, collection: &str, id: &str) -> Result<Document> {
        self.store
            .get(collection, id)
            .await?
            .ok_or_else(|| crate::store::StoreError::not_found(collection, id).into())
    }

    pub async fn update_fields(&self, collection: &str, id: &str, partial: Fields) -> Result<()> {
        Ok(self.store.update(collection, id, partial).await?)
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        Ok(self.store.delete(collection, id).await?)
    }

    pub async fn query_by_equality(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        Ok(self.store.query_eq(collection, field, value).await?)
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    pub async fn list_profiles(&self) -> Result<Vec<UserProfile>> {
        let docs = self.list_all(PROFILES).await?;
        Ok(docs.iter().map(normalize::profile).collect())
    }

    pub async fn get_profile(&self, id: &str) -> Result<UserProfile> {
        Ok(normalize::profile(&self.get_by_id(PROFILES, id).await?))
    }

    /// Every profile with its certificate count, matched by exact email.
    pub async fn list_user_summaries(&self) -> Result<Vec<UserSummary>> {
        let profiles = self.list_profiles().await?;
        let certificates = self.list_certificates().await?;

        Ok(profiles
            .into_iter()
            .map(|profile| {
                let count = certificates
                    .iter()
                    .filter(|c| c.user_email == profile.email)
                    .count();
                UserSummary {
                    profile,
                    certificates: count,
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn user_detail(&self, id: &str) -> Result<UserDetail> {
        let profile = self.get_profile(id).await?;
        let certificates = self.certificates_for_user(&profile.email).await?;
        let counts = CertificateCounts::tally(&certificates);
        Ok(UserDetail {
            profile,
            counts,
            certificates,
        })
    }

    // =========================================================================
    // Certificates
    // =========================================================================

    pub async fn list_certificates(&self) -> Result<Vec<Certificate>> {
        let docs = self.list_all(CERTIFICATES).await?;
        Ok(docs.iter().map(normalize::certificate).collect())
    }

    pub async fn get_certificate(&self, id: &str) -> Result<Certificate> {
        Ok(normalize::certificate(
            &self.get_by_id(CERTIFICATES, id).await?,
        ))
    }

    pub async fn certificates_for_user(&self, email: &str) -> Result<Vec<Certificate>> {
        if email.is_empty() {
            return Ok(Vec::new());
        }
        let docs = self
            .query_by_equality(CERTIFICATES, "user_email", &json!(email))
            .await?;
        Ok(docs.iter().map(normalize::certificate).collect())
    }

    /// Certificates that have left PENDING.
    pub async fn list_verifications(&self) -> Result<Vec<VerificationRecord>> {
        Ok(self
            .list_certificates()
            .await?
            .into_iter()
            .filter(Certificate::is_reviewed)
            .map(VerificationRecord::from)
            .collect())
    }

    #[instrument(skip(self, update), fields(status = %update.status))]
    pub async fn update_certificate_status(&self, id: &str, update: StatusUpdate) -> Result<()> {
        self.update_fields(CERTIFICATES, id, update.into_fields(unix_millis()))
            .await?;
        info!(certificate_id = %id, "Certificate status updated");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_certificate(&self, id: &str) -> Result<()> {
        // Surface not-found instead of silently succeeding.
        self.get_by_id(CERTIFICATES, id).await?;
        self.delete(CERTIFICATES, id).await?;
        info!(certificate_id = %id, "Certificate deleted");
        Ok(())
    }

    /// Delete a profile and every certificate owned by its email.
    ///
    /// Best effort, no rollback: each certificate delete is attempted even
    /// after an earlier one fails, and the profile is only removed when all
    /// of them succeeded, so a retry finds the remaining certificates.
    #[instrument(skip(self))]
    pub async fn delete_user_with_certificates(&self, id: &str) -> Result<CascadeReport> {
        let profile = self.get_profile(id).await?;
        let certificates = self.certificates_for_user(&profile.email).await?;

        let mut report = CascadeReport::default();
        for cert in certificates {
            match self.store.delete(CERTIFICATES, &cert.id).await {
                Ok(()) => report.deleted.push(cert.id),
                Err(e) => {
                    warn!(certificate_id = %cert.id, error = %e, "Certificate delete failed");
                    report.failed.push((cert.id, e.to_string()));
                }
            }
        }

        if !report.failed.is_empty() {
            return Err(Error::PartialDelete(report));
        }

        self.delete(PROFILES, id).await?;
        report.profile_deleted = true;
        info!(user_id = %id, certificates = report.deleted.len(), "User deleted");
        Ok(report)
    }
}
