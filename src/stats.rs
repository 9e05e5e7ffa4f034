//! Statistics over the translation store
//!
//! Read-only and recomputed on every call.

use crate::{
    error::StoreError,
    store::{TranslationRecord, TranslationStore},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

pub const TOP_LIMIT: i64 = 10;
pub const RECENT_LIMIT: i64 = 5;

/// Snapshot of the computed statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationStats {
    pub total_count: i64,
    pub total_views: i64,
    pub avg_views: f64,
    pub popular_count: i64,
    pub popular_pct: f64,
    pub one_view_count: i64,
    pub one_view_pct: f64,
    /// `(source, view_count)`, most viewed first
    pub top: Vec<(String, i64)>,
    /// `(source, created_at)`, newest first
    pub recent: Vec<(String, i64)>,
}

fn percentage(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Render a store timestamp; unrepresentable values fall back to raw milliseconds
pub fn format_timestamp(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{} ms", millis),
    }
}

pub struct StatsReporter {
    store: Arc<dyn TranslationStore>,
}

impl StatsReporter {
    pub fn new(store: Arc<dyn TranslationStore>) -> Self {
        Self { store }
    }

    pub async fn collect(&self) -> Result<TranslationStats, StoreError> {
        let summary = self.store.summary().await?;
        let top = self.store.top_by_views(TOP_LIMIT).await?;
        let recent = self.store.most_recent(RECENT_LIMIT).await?;

        let avg_views = if summary.total_count > 0 {
            summary.total_views as f64 / summary.total_count as f64
        } else {
            0.0
        };

        Ok(TranslationStats {
            total_count: summary.total_count,
            total_views: summary.total_views,
            avg_views,
            popular_count: summary.popular_count,
            popular_pct: percentage(summary.popular_count, summary.total_count),
            one_view_count: summary.one_view_count,
            one_view_pct: percentage(summary.one_view_count, summary.total_count),
            top: top
                .into_iter()
                .map(|TranslationRecord { source, view_count, .. }| (source, view_count))
                .collect(),
            recent: recent
                .into_iter()
                .map(|TranslationRecord { source, created_at, .. }| (source, created_at))
                .collect(),
        })
    }

    pub async fn get_stats_text(&self) -> Result<String, StoreError> {
        Ok(render(&self.collect().await?))
    }
}

/// Human-readable report
pub fn render(stats: &TranslationStats) -> String {
    let mut lines = vec![
        "📊 Translation statistics".to_string(),
        String::new(),
        format!("Total records: {}", stats.total_count),
        format!("Total views: {}", stats.total_views),
        format!("Average views per record: {:.2}", stats.avg_views),
        format!(
            "Records with >1 view: {} ({:.1}%)",
            stats.popular_count, stats.popular_pct
        ),
        format!(
            "Records with 1 view: {} ({:.1}%)",
            stats.one_view_count, stats.one_view_pct
        ),
    ];

    if !stats.top.is_empty() {
        lines.push(String::new());
        lines.push(format!("Top {} by views:", TOP_LIMIT));
        lines.extend(
            stats
                .top
                .iter()
                .enumerate()
                .map(|(idx, (source, views))| format!("{}. {} — {}", idx + 1, source, views)),
        );
    }

    if !stats.recent.is_empty() {
        lines.push(String::new());
        lines.push("Recently added:".to_string());
        lines.extend(
            stats
                .recent
                .iter()
                .map(|(source, created_at)| format!("- {} — {}", source, format_timestamp(*created_at))),
        );
    }

    lines.join("\n")
}
