//! Statistics and dashboard aggregation over normalized certificates.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike};
use serde::Serialize;

use crate::model::{Certificate, VerificationStatus};

/// Score bands, highest first: (label, inclusive lower bound).
pub const SCORE_BANDS: [(&str, f64); 5] = [
    ("90-100", 90.0),
    ("80-89", 80.0),
    ("70-79", 70.0),
    ("60-69", 60.0),
    ("Below 60", f64::NEG_INFINITY),
];

pub const TOP_INSTITUTIONS: usize = 10;
pub const RECENT_CERTIFICATES: usize = 10;

/// One histogram entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub key: String,
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

impl Bucket {
    fn new(key: impl Into<String>, count: usize, total: usize) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            count,
            percentage: percentage(count, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_certificates: usize,
    pub total_users: usize,
    pub verified: usize,
    pub verified_rate: f64,
    pub average_score: f64,
}

/// Full statistics view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub summary: Summary,
    pub by_status: Vec<Bucket>,
    pub by_type: Vec<Bucket>,
    pub by_month: Vec<Bucket>,
    pub by_score: Vec<Bucket>,
    pub top_institutions: Vec<Bucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentCertificate {
    pub id: String,
    pub student_name: String,
    pub certificate_title: String,
    pub verification_status: VerificationStatus,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub total_users: usize,
    pub total_certificates: usize,
    pub verified: usize,
    pub pending: usize,
    pub recent: Vec<RecentCertificate>,
}

/// `count / total * 100`, one decimal place; 0 when `total` is 0.
#[allow(clippy::cast_precision_loss)]
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(count as f64 / total as f64 * 100.0)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Counts per status in [`VerificationStatus::ALL`] order.
pub fn status_histogram(certs: &[Certificate]) -> Vec<Bucket> {
    VerificationStatus::ALL
        .iter()
        .map(|status| {
            let count = certs
                .iter()
                .filter(|c| c.verification_status == *status)
                .count();
            Bucket::new(status.as_str(), count, certs.len())
        })
        .collect()
}

/// Group by key, preserving the order each key was first seen.
fn first_seen_counts<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for key in keys {
        match counts.iter_mut().find(|(k, _)| k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key.to_string(), 1)),
        }
    }
    counts
}

/// Counts per certificate type in first-seen order; untyped records are
/// bucketed as "Unknown".
pub fn type_histogram(certs: &[Certificate]) -> Vec<Bucket> {
    first_seen_counts(certs.iter().map(Certificate::type_key))
        .into_iter()
        .map(|(key, count)| Bucket::new(key, count, certs.len()))
        .collect()
}

/// Uploads per UTC calendar month, oldest first.
///
/// Keys are `YYYY-MM`, labels `Mon YYYY`. Certificates without an upload
/// timestamp are skipped; percentages are still relative to all certificates.
pub fn monthly_histogram(certs: &[Certificate]) -> Vec<Bucket> {
    let mut months: BTreeMap<(i32, u32), (String, usize)> = BTreeMap::new();
    for cert in certs.iter().filter(|c| c.timestamp > 0) {
        let Some(at) = DateTime::from_timestamp_millis(cert.timestamp) else {
            continue;
        };
        months
            .entry((at.year(), at.month()))
            .or_insert_with(|| (at.format("%b %Y").to_string(), 0))
            .1 += 1;
    }

    months
        .into_iter()
        .map(|((year, month), (label, count))| Bucket {
            key: format!("{year:04}-{month:02}"),
            label,
            count,
            percentage: percentage(count, certs.len()),
        })
        .collect()
}

fn score_band(score: f64) -> &'static str {
    SCORE_BANDS
        .iter()
        .find(|(_, floor)| score >= *floor)
        .map_or("Below 60", |(label, _)| label)
}

/// Counts per score band; all five bands are always present.
pub fn score_histogram(certs: &[Certificate]) -> Vec<Bucket> {
    SCORE_BANDS
        .iter()
        .map(|(label, _)| {
            let count = certs.iter().filter(|c| score_band(c.score) == *label).count();
            Bucket::new(*label, count, certs.len())
        })
        .collect()
}

/// Ten most common institutions, descending; ties keep first-seen order.
pub fn top_institutions(certs: &[Certificate]) -> Vec<Bucket> {
    let mut counts = first_seen_counts(certs.iter().map(|c| {
        if c.institution_name.trim().is_empty() {
            "Unknown"
        } else {
            c.institution_name.as_str()
        }
    }));
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(TOP_INSTITUTIONS);
    counts
        .into_iter()
        .map(|(key, count)| Bucket::new(key, count, certs.len()))
        .collect()
}

#[allow(clippy::cast_precision_loss)]
pub fn summary(certs: &[Certificate], total_users: usize) -> Summary {
    let verified = certs
        .iter()
        .filter(|c| c.verification_status == VerificationStatus::Verified)
        .count();
    let average_score = if certs.is_empty() {
        0.0
    } else {
        round1(certs.iter().map(|c| c.score).sum::<f64>() / certs.len() as f64)
    };
    Summary {
        total_certificates: certs.len(),
        total_users,
        verified,
        verified_rate: percentage(verified, certs.len()),
        average_score,
    }
}

pub fn report(certs: &[Certificate], total_users: usize) -> StatisticsReport {
    StatisticsReport {
        summary: summary(certs, total_users),
        by_status: status_histogram(certs),
        by_type: type_histogram(certs),
        by_month: monthly_histogram(certs),
        by_score: score_histogram(certs),
        top_institutions: top_institutions(certs),
    }
}

pub fn dashboard(certs: &[Certificate], total_users: usize) -> Dashboard {
    let mut recent: Vec<&Certificate> = certs.iter().collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Dashboard {
        total_users,
        total_certificates: certs.len(),
        verified: certs
            .iter()
            .filter(|c| c.verification_status == VerificationStatus::Verified)
            .count(),
        pending: certs
            .iter()
            .filter(|c| c.verification_status == VerificationStatus::Pending)
            .count(),
        recent: recent
            .into_iter()
            .take(RECENT_CERTIFICATES)
            .map(|c| RecentCertificate {
                id: c.id.clone(),
                student_name: c.student_name.clone(),
                certificate_title: c.certificate_title.clone(),
                verification_status: c.verification_status,
                timestamp: c.timestamp,
            })
            .collect(),
    }
}
