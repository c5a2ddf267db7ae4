//! View state machines for the console's list, detail and edit-status views.
//!
//! Each view reloads on its own; nothing here is shared between views.

use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{Certificate, UserSummary, VerificationRecord, VerificationStatus};
use crate::repository::{Repository, StatusUpdate};

/// Fetch lifecycle of a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum ViewState<T> {
    Loading,
    Loaded(T),
    Empty,
    Error(String),
}

impl<T> ViewState<T> {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Loaded(_) => "loaded",
            Self::Empty => "empty",
            Self::Error(_) => "error",
        }
    }
}

impl<T> ViewState<Vec<T>> {
    fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            Self::Empty
        } else {
            Self::Loaded(rows)
        }
    }
}

/// Row types that support the list views' search box and status filter.
pub trait Searchable {
    /// Case-insensitive substring match; `needle` is already lowercased.
    fn matches(&self, needle: &str) -> bool;

    fn status(&self) -> Option<VerificationStatus> {
        None
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

impl Searchable for UserSummary {
    fn matches(&self, needle: &str) -> bool {
        contains(&self.profile.name, needle)
            || contains(&self.profile.email, needle)
            || contains(&self.profile.student_id, needle)
    }
}

impl Searchable for Certificate {
    fn matches(&self, needle: &str) -> bool {
        contains(&self.id, needle)
            || contains(&self.certificate_title, needle)
            || contains(&self.student_name, needle)
            || contains(&self.certificate_type, needle)
    }

    fn status(&self) -> Option<VerificationStatus> {
        Some(self.verification_status)
    }
}

impl Searchable for VerificationRecord {
    fn matches(&self, needle: &str) -> bool {
        contains(&self.certificate.id, needle) || contains(&self.certificate.student_name, needle)
    }

    fn status(&self) -> Option<VerificationStatus> {
        Some(self.certificate.verification_status)
    }
}

/// Status filter of the certificate list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(VerificationStatus),
}

impl StatusFilter {
    fn admits(self, status: Option<VerificationStatus>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => status == Some(wanted),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        VerificationStatus::parse(s)
            .map(Self::Only)
            .ok_or_else(|| Error::Validation(format!("Unknown status filter: {s}")))
    }
}

/// Serialized list response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListPage<'a, T> {
    pub state: &'static str,
    pub total: usize,
    pub rows: Vec<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A list view: fetched rows plus the active search and filter.
///
/// The unfiltered rows are kept, so search and filter changes never refetch.
#[derive(Debug, Clone)]
pub struct ListView<T> {
    source: ViewState<Vec<T>>,
    query: String,
    filter: StatusFilter,
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self {
            source: ViewState::Loading,
            query: String::new(),
            filter: StatusFilter::All,
        }
    }
}

impl<T: Searchable> ListView<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loading → Loaded | Empty | Error.
    pub fn complete(&mut self, fetched: Result<Vec<T>>) {
        self.source = match fetched {
            Ok(rows) => ViewState::from_rows(rows),
            Err(e) => {
                warn!(error = %e, "List fetch failed");
                ViewState::Error(e.to_string())
            }
        };
    }

    pub fn search(&mut self, query: &str) {
        self.query = query.trim().to_lowercase();
    }

    pub fn filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
    }

    /// Number of fetched rows before search and filter.
    pub fn total(&self) -> usize {
        match &self.source {
            ViewState::Loaded(rows) => rows.len(),
            _ => 0,
        }
    }

    /// Rows passing the current search and filter.
    pub fn visible(&self) -> ViewState<Vec<&T>> {
        match &self.source {
            ViewState::Loaded(rows) => ViewState::from_rows(
                rows.iter()
                    .filter(|row| self.filter.admits(row.status()))
                    .filter(|row| self.query.is_empty() || row.matches(&self.query))
                    .collect(),
            ),
            ViewState::Loading => ViewState::Loading,
            ViewState::Empty => ViewState::Empty,
            ViewState::Error(message) => ViewState::Error(message.clone()),
        }
    }

    pub fn page(&self) -> ListPage<'_, T> {
        let visible = self.visible();
        let state = visible.name();
        let (rows, error) = match visible {
            ViewState::Loaded(rows) => (rows, None),
            ViewState::Error(message) => (Vec::new(), Some(message)),
            ViewState::Loading | ViewState::Empty => (Vec::new(), None),
        };
        ListPage {
            state,
            total: self.total(),
            rows,
            error,
        }
    }
}

/// Submission phase of the edit-status form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "message", rename_all = "lowercase")]
pub enum FormPhase {
    Editing,
    Saving,
    Saved,
    Failed(String),
}

/// Edit-status form for one certificate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusForm {
    pub certificate_id: String,
    pub status: VerificationStatus,
    pub score: f64,
    pub remarks: String,
    pub phase: FormPhase,
}

impl StatusForm {
    pub fn new(
        certificate_id: impl Into<String>,
        status: VerificationStatus,
        score: f64,
        remarks: impl Into<String>,
    ) -> Self {
        Self {
            certificate_id: certificate_id.into(),
            status,
            score,
            remarks: remarks.into(),
            phase: FormPhase::Editing,
        }
    }

    /// Form prefilled with the certificate's current outcome.
    pub fn for_certificate(cert: &Certificate) -> Self {
        Self::new(&cert.id, cert.verification_status, cert.score, &cert.remarks)
    }

    pub const fn is_editable(&self) -> bool {
        matches!(self.phase, FormPhase::Editing | FormPhase::Failed(_))
    }

    /// Editing → Saving → Saved | Failed.
    ///
    /// Validation failures go straight to Failed without a store call. A
    /// failed form stays editable and can be submitted again.
    pub async fn submit(&mut self, repo: &Repository) -> Result<()> {
        if !self.is_editable() {
            return Err(Error::Validation("Form is not editable".into()));
        }

        let update = match StatusUpdate::new(self.status, self.score, self.remarks.clone()) {
            Ok(update) => update,
            Err(e) => {
                self.phase = FormPhase::Failed(e.to_string());
                return Err(e);
            }
        };

        self.phase = FormPhase::Saving;
        match repo
            .update_certificate_status(&self.certificate_id, update)
            .await
        {
            Ok(()) => {
                self.phase = FormPhase::Saved;
                Ok(())
            }
            Err(e) => {
                self.phase = FormPhase::Failed(e.to_string());
                Err(e)
            }
        }
    }
}
