//! Feedback records labelled by the classifier.
//!
//! [`RecordService`] pairs an [`InferenceService`] with a [`ResilientStore`]:
//! reads are annotated with a freshly computed label, writes persist one.

use chrono::{Local, NaiveDate};
use feedlabel_ai::{Encoder, InferenceError, InferenceService, ScoreModel};
use feedlabel_core::{Label, MAX_DAY_COUNT, Record, RecordFields, ValidationError, recent_days};
use feedlabel_store::{Connect, ResilientStore, StoreError, records};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Per-request failure.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// HTTP-style status: 400 when the caller sent bad input, 500 otherwise.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Inference(_) | Self::Store(_) => 500,
        }
    }
}

/// Labels stored feedback on read and on write.
pub struct RecordService<'a, C: Connect, E, M> {
    inference: &'a InferenceService<E, M>,
    store: &'a ResilientStore<C>,
}

impl<'a, C, E, M> RecordService<'a, C, E, M>
where
    C: Connect,
    E: Encoder,
    M: ScoreModel,
{
    pub fn new(inference: &'a InferenceService<E, M>, store: &'a ResilientStore<C>) -> Self {
        Self { inference, store }
    }

    /// Classify free text without touching the store.
    pub fn classify(&self, text: &str) -> Result<Label, ServiceError> {
        Ok(self.inference.classify(text)?)
    }

    /// Records created on `date`, each with a freshly computed label.
    pub fn label_by_date(&self, date: NaiveDate) -> Result<Vec<Record>, ServiceError> {
        let rows = records::fetch_by_day(self.store, date)?;
        self.annotate(rows)
    }

    /// Records from today and the `n - 1` days before it, newest day first.
    /// `n` above [`MAX_DAY_COUNT`] is rejected before any query runs.
    pub fn label_recent_days(&self, n: u32) -> Result<Vec<Record>, ServiceError> {
        self.label_recent_days_from(Local::now().date_naive(), n)
    }

    pub fn label_recent_days_from(
        &self,
        today: NaiveDate,
        n: u32,
    ) -> Result<Vec<Record>, ServiceError> {
        if n > MAX_DAY_COUNT {
            return Err(ValidationError::DayCountTooLarge {
                got: i64::from(n),
                max: MAX_DAY_COUNT,
            }
            .into());
        }
        let mut labelled = Vec::new();
        for day in recent_days(today, n) {
            labelled.extend(self.label_by_date(day)?);
        }
        debug!(days = n, count = labelled.len(), "labelled recent records");
        Ok(labelled)
    }

    /// Like [`label_recent_days`](Self::label_recent_days), but also writes
    /// each label back. Returns the number of records updated.
    pub fn label_and_persist_recent_days(&self, n: u32) -> Result<usize, ServiceError> {
        self.label_and_persist_recent_days_from(Local::now().date_naive(), n)
    }

    pub fn label_and_persist_recent_days_from(
        &self,
        today: NaiveDate,
        n: u32,
    ) -> Result<usize, ServiceError> {
        let mut updated = 0;
        for record in self.label_recent_days_from(today, n)? {
            let Some(label) = record.label else { continue };
            records::update_label(self.store, record.id, label)?;
            updated += 1;
        }
        info!(days = n, updated, "persisted labels");
        Ok(updated)
    }

    /// Validate, classify and insert a new record.
    ///
    /// Nothing is written unless every required field is present.
    pub fn create_record(&self, fields: RecordFields) -> Result<Record, ServiceError> {
        let new = fields.validate().inspect_err(|e| {
            warn!(error = %e, "rejected record");
        })?;
        let label = self.inference.classify(&new.subject)?;
        let created_at = Local::now().naive_local();
        let record = records::insert(self.store, &new, Some(label), created_at)?;
        info!(id = record.id, label = label.index(), "created record");
        Ok(record)
    }

    /// The record with `id` and a freshly computed label, if it exists.
    pub fn label_by_id(&self, id: i64) -> Result<Option<Record>, ServiceError> {
        match records::fetch_by_id(self.store, id)? {
            Some(record) => Ok(Some(self.label(record)?)),
            None => {
                debug!(id, "record not found");
                Ok(None)
            }
        }
    }

    fn annotate(&self, rows: Vec<Record>) -> Result<Vec<Record>, ServiceError> {
        rows.into_iter().map(|r| self.label(r)).collect()
    }

    fn label(&self, record: Record) -> Result<Record, ServiceError> {
        let label = self.inference.classify(&record.subject)?;
        Ok(record.with_label(label))
    }
}
