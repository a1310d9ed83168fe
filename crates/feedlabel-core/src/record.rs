//! Feedback records and the label assigned to them.

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Predicted category for a piece of feedback: the index of the winning class.
///
/// Serialised as a bare integer, which is also what the store keeps in the
/// `aciklama` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(pub usize);

impl Label {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted feedback record (`sorun_bildir` row).
///
/// JSON keys follow the wire names used by existing clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    #[serde(rename = "ogrenci_id")]
    pub student_id: i64,
    #[serde(rename = "ders_id")]
    pub course_id: i64,
    #[serde(rename = "secenek_id")]
    pub option_id: i64,
    #[serde(rename = "icerik_id")]
    pub content_id: i64,
    /// The complaint text itself.
    #[serde(rename = "sorun")]
    pub subject: String,
    #[serde(rename = "durum")]
    pub status: i64,
    #[serde(rename = "tip")]
    pub kind: String,
    #[serde(rename = "mobil")]
    pub mobile: i64,
    /// Creation time rendered as `YYYY-MM-DD HH:MM:SS`.
    #[serde(rename = "tarih")]
    pub created_at: String,
    /// `None` until the record has been classified.
    pub label: Option<Label>,
}

impl Record {
    /// Copy of this record carrying `label`.
    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }
}

/// Untrusted input for creating a record.
///
/// Every field is optional so that presence can be checked explicitly;
/// [`validate`](Self::validate) turns it into a [`NewRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFields {
    pub ogrenci_id: Option<i64>,
    pub ders_id: Option<i64>,
    pub secenek_id: Option<i64>,
    pub icerik_id: Option<i64>,
    pub sorun: Option<String>,
    pub durum: Option<i64>,
    pub tip: Option<String>,
    pub mobil: Option<i64>,
}

/// A validated record ready to be classified and inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub student_id: i64,
    pub course_id: i64,
    pub option_id: i64,
    pub content_id: i64,
    pub subject: String,
    pub status: i64,
    pub kind: String,
    pub mobile: i64,
}

/// Fields a [`RecordFields`] must carry to be accepted.
pub const REQUIRED_FIELDS: &[&str] = &[
    "ogrenci_id",
    "ders_id",
    "secenek_id",
    "icerik_id",
    "sorun",
    "durum",
    "tip",
    "mobil",
];

impl RecordFields {
    /// Check that every required field is present and well-formed.
    ///
    /// Reports all missing fields at once, in [`REQUIRED_FIELDS`] order.
    /// `durum` and `mobil` are flags and must be 0 or 1.
    pub fn validate(self) -> Result<NewRecord, ValidationError> {
        let mut missing = Vec::new();
        if self.ogrenci_id.is_none() {
            missing.push("ogrenci_id");
        }
        if self.ders_id.is_none() {
            missing.push("ders_id");
        }
        if self.secenek_id.is_none() {
            missing.push("secenek_id");
        }
        if self.icerik_id.is_none() {
            missing.push("icerik_id");
        }
        if self.sorun.is_none() {
            missing.push("sorun");
        }
        if self.durum.is_none() {
            missing.push("durum");
        }
        if self.tip.is_none() {
            missing.push("tip");
        }
        if self.mobil.is_none() {
            missing.push("mobil");
        }

        let (
            Some(student_id),
            Some(course_id),
            Some(option_id),
            Some(content_id),
            Some(subject),
            Some(status),
            Some(kind),
            Some(mobile),
        ) = (
            self.ogrenci_id,
            self.ders_id,
            self.secenek_id,
            self.icerik_id,
            self.sorun,
            self.durum,
            self.tip,
            self.mobil,
        )
        else {
            return Err(ValidationError::MissingFields(
                missing.into_iter().map(String::from).collect(),
            ));
        };

        for (field, value) in [("durum", status), ("mobil", mobile)] {
            if value != 0 && value != 1 {
                return Err(ValidationError::InvalidField {
                    field: field.to_string(),
                    reason: format!("expected 0 or 1, got {value}"),
                });
            }
        }

        Ok(NewRecord {
            student_id,
            course_id,
            option_id,
            content_id,
            subject,
            status,
            kind,
            mobile,
        })
    }
}
