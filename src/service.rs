//! Lookup-or-fetch-or-store
//!
//! A cache hit bumps the view counter and never touches the network. A miss
//! asks the translator once and stores the result. When two requests miss the
//! same key at the same time, the store's uniqueness constraint lets exactly
//! one insert win; the loser re-reads the winner's record and counts its view.

use crate::{
    completion::Translator,
    error::{ServiceError, StoreError},
    logging::preview,
    store::{TranslationRecord, TranslationStore},
};
use std::sync::Arc;
use tracing::{debug, info};

/// Cache key for `source`: trimmed and lower-cased
pub fn normalize(source: &str) -> String {
    source.trim().to_lowercase()
}

pub struct TranslationService {
    store: Arc<dyn TranslationStore>,
    translator: Arc<dyn Translator>,
    target_language: String,
}

impl TranslationService {
    pub fn new(
        store: Arc<dyn TranslationStore>,
        translator: Arc<dyn Translator>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            store,
            translator,
            target_language: target_language.into(),
        }
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Return the cached translation of `source`, creating it on first request
    ///
    /// Blank input yields `Ok(None)` without touching the store or translator.
    pub async fn get_translation(&self, source: &str) -> Result<Option<TranslationRecord>, ServiceError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let key = normalize(trimmed);

        if let Some(record) = self.store.find(&key).await? {
            let record = self.store.increment_view(&record).await?;
            debug!(
                source = %preview(&key, 50),
                view_count = record.view_count,
                "Translation cache hit"
            );
            return Ok(Some(record));
        }

        let translation = self.translator.translate(trimmed, &self.target_language).await?;

        let record = match self.store.insert(&key, &translation).await {
            Ok(record) => {
                info!(source = %preview(&key, 50), id = record.id, "Stored new translation");
                record
            }
            Err(StoreError::Conflict(_)) => {
                debug!(source = %preview(&key, 50), "Concurrent insert won, reusing stored translation");
                let existing = self
                    .store
                    .find(&key)
                    .await?
                    .ok_or_else(|| StoreError::Conflict(key.clone()))?;
                self.store.increment_view(&existing).await?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Some(record))
    }
}
