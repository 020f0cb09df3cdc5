//! Document log storage
//!
//! Document entries persisted as a JSON array, plus the form fields that can be
//! filled from a scan.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::scanner::ScanCommit;

/// Routing category of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentCategory {
    #[serde(rename = "LBC")]
    Lbc,
    Registered,
    #[serde(rename = "Pick-up")]
    PickUp,
    #[serde(rename = "Personal Delivery")]
    PersonalDelivery,
    Email,
    #[serde(rename = "CAR")]
    Car,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 19] = [
        Self::Lbc,
        Self::Registered,
        Self::PickUp,
        Self::PersonalDelivery,
        Self::Email,
        Self::Car,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::R9,
        Self::R10,
        Self::R11,
        Self::R12,
        Self::R13,
    ];

    /// Display label (also the stored JSON value)
    pub fn label(self) -> &'static str {
        match self {
            Self::Lbc => "LBC",
            Self::Registered => "Registered",
            Self::PickUp => "Pick-up",
            Self::PersonalDelivery => "Personal Delivery",
            Self::Email => "Email",
            Self::Car => "CAR",
            Self::R1 => "R1",
            Self::R2 => "R2",
            Self::R3 => "R3",
            Self::R4 => "R4",
            Self::R5 => "R5",
            Self::R6 => "R6",
            Self::R7 => "R7",
            Self::R8 => "R8",
            Self::R9 => "R9",
            Self::R10 => "R10",
            Self::R11 => "R11",
            Self::R12 => "R12",
            Self::R13 => "R13",
        }
    }
}

impl Default for DocumentCategory {
    fn default() -> Self {
        Self::Registered
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for DocumentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown category '{}'", wanted))
    }
}

/// Processing status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DocumentStatus {
    #[default]
    Pending,
    Approved,
    Archived,
}

impl DocumentStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Archived => "Archived",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// A stored document entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub reference_number: String,
    /// ISO date (YYYY-MM-DD)
    pub date: String,
    pub status: DocumentStatus,
    pub notes: String,
    pub category: DocumentCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signatory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dots_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_released: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks_courier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_mailed: Option<String>,
}

/// A document before it has an id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewDocument {
    pub title: String,
    pub reference_number: String,
    pub date: String,
    pub status: DocumentStatus,
    pub notes: String,
    pub category: DocumentCategory,
    pub to: Option<String>,
    pub signatory: Option<String>,
    pub subject: Option<String>,
    pub dots_no: Option<String>,
    pub date_released: Option<String>,
    pub remarks_courier: Option<String>,
    pub tracking_number: Option<String>,
    pub date_mailed: Option<String>,
}

impl NewDocument {
    fn with_id(self, id: String) -> Document {
        Document {
            id,
            title: self.title,
            reference_number: self.reference_number,
            date: self.date,
            status: self.status,
            notes: self.notes,
            category: self.category,
            to: self.to,
            signatory: self.signatory,
            subject: self.subject,
            dots_no: self.dots_no,
            date_released: self.date_released,
            remarks_courier: self.remarks_courier,
            tracking_number: self.tracking_number,
            date_mailed: self.date_mailed,
        }
    }
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub reference_number: Option<String>,
    pub date: Option<String>,
    pub status: Option<DocumentStatus>,
    pub notes: Option<String>,
    pub category: Option<DocumentCategory>,
    pub to: Option<String>,
    pub signatory: Option<String>,
    pub subject: Option<String>,
    pub dots_no: Option<String>,
    pub date_released: Option<String>,
    pub remarks_courier: Option<String>,
    pub tracking_number: Option<String>,
    pub date_mailed: Option<String>,
}

impl DocumentUpdate {
    fn apply(self, doc: &mut Document) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }
        fn set_opt(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set(&mut doc.title, self.title);
        set(&mut doc.reference_number, self.reference_number);
        set(&mut doc.date, self.date);
        set(&mut doc.status, self.status);
        set(&mut doc.notes, self.notes);
        set(&mut doc.category, self.category);
        set_opt(&mut doc.to, self.to);
        set_opt(&mut doc.signatory, self.signatory);
        set_opt(&mut doc.subject, self.subject);
        set_opt(&mut doc.dots_no, self.dots_no);
        set_opt(&mut doc.date_released, self.date_released);
        set_opt(&mut doc.remarks_courier, self.remarks_courier);
        set_opt(&mut doc.tracking_number, self.tracking_number);
        set_opt(&mut doc.date_mailed, self.date_mailed);
    }
}

/// Free-text fields a scan can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Title,
    ReferenceNumber,
    Notes,
    To,
    Signatory,
    Subject,
    DotsNo,
    RemarksCourier,
    TrackingNumber,
}

impl FormField {
    pub const ALL: [FormField; 9] = [
        Self::Title,
        Self::ReferenceNumber,
        Self::Notes,
        Self::To,
        Self::Signatory,
        Self::Subject,
        Self::DotsNo,
        Self::RemarksCourier,
        Self::TrackingNumber,
    ];

    /// Label shown in the scanner header
    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::ReferenceNumber => "Reference Number",
            Self::Notes => "Notes",
            Self::To => "To",
            Self::Signatory => "Signatory",
            Self::Subject => "Subject",
            Self::DotsNo => "DOTS No.",
            Self::RemarksCourier => "Remarks / Courier",
            Self::TrackingNumber => "Tracking Number",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FormField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "title" => Ok(Self::Title),
            "reference" | "referencenumber" => Ok(Self::ReferenceNumber),
            "notes" => Ok(Self::Notes),
            "to" => Ok(Self::To),
            "signatory" => Ok(Self::Signatory),
            "subject" => Ok(Self::Subject),
            "dotsno" | "dots" => Ok(Self::DotsNo),
            "remarkscourier" | "remarks" | "courier" => Ok(Self::RemarksCourier),
            "trackingnumber" | "tracking" => Ok(Self::TrackingNumber),
            _ => Err(format!("unknown form field '{}'", s)),
        }
    }
}

/// A document being filled in, scan by scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentDraft {
    pub document: NewDocument,
}

impl DocumentDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable slot behind a form field
    pub fn field_mut(&mut self, field: FormField) -> &mut String {
        let doc = &mut self.document;
        match field {
            FormField::Title => &mut doc.title,
            FormField::ReferenceNumber => &mut doc.reference_number,
            FormField::Notes => &mut doc.notes,
            FormField::To => doc.to.get_or_insert_with(String::new),
            FormField::Signatory => doc.signatory.get_or_insert_with(String::new),
            FormField::Subject => doc.subject.get_or_insert_with(String::new),
            FormField::DotsNo => doc.dots_no.get_or_insert_with(String::new),
            FormField::RemarksCourier => doc.remarks_courier.get_or_insert_with(String::new),
            FormField::TrackingNumber => doc.tracking_number.get_or_insert_with(String::new),
        }
    }

    /// Current value of a form field
    pub fn field(&self, field: FormField) -> &str {
        let doc = &self.document;
        match field {
            FormField::Title => &doc.title,
            FormField::ReferenceNumber => &doc.reference_number,
            FormField::Notes => &doc.notes,
            FormField::To => doc.to.as_deref().unwrap_or(""),
            FormField::Signatory => doc.signatory.as_deref().unwrap_or(""),
            FormField::Subject => doc.subject.as_deref().unwrap_or(""),
            FormField::DotsNo => doc.dots_no.as_deref().unwrap_or(""),
            FormField::RemarksCourier => doc.remarks_courier.as_deref().unwrap_or(""),
            FormField::TrackingNumber => doc.tracking_number.as_deref().unwrap_or(""),
        }
    }

    /// Overwrite a form field with text
    pub fn set_field(&mut self, field: FormField, text: impl Into<String>) {
        *self.field_mut(field) = text.into();
    }

    /// Store confirmed scan text into the field the scanner was opened for
    pub fn apply_commit(&mut self, commit: ScanCommit) {
        debug!("Scan committed to {}", commit.field);
        self.set_field(commit.field, commit.text);
    }

    pub fn into_new_document(self) -> NewDocument {
        self.document
    }
}

/// Category filter, including the combined pick-up/delivery group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    /// Pick-up or Personal Delivery
    PickupDelivery,
    Only(DocumentCategory),
}

impl CategoryFilter {
    fn matches(self, category: DocumentCategory) -> bool {
        match self {
            Self::All => true,
            Self::PickupDelivery => {
                matches!(category, DocumentCategory::PickUp | DocumentCategory::PersonalDelivery)
            }
            Self::Only(c) => c == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    /// `all`, `pickup/delivery` or a category name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "all" => Ok(Self::All),
            "pickupdelivery" => Ok(Self::PickupDelivery),
            _ => s.parse().map(Self::Only),
        }
    }
}

/// Search term plus status and category filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    /// Case-insensitive match on title, reference number and notes
    pub term: Option<String>,
    pub status: Option<DocumentStatus>,
    pub category: CategoryFilter,
}

impl DocumentFilter {
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(term) = self.term.as_deref().filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            let hit = [&doc.title, &doc.reference_number, &doc.notes]
                .iter()
                .any(|f| f.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        if let Some(status) = self.status {
            if doc.status != status {
                return false;
            }
        }
        self.category.matches(doc.category)
    }
}

/// Document list persisted to a JSON file
#[derive(Debug, Default)]
pub struct DocumentStore {
    path: Option<PathBuf>,
    documents: Vec<Document>,
}

impl DocumentStore {
    /// Store that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: &Path) -> Result<Self> {
        let documents = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read documents from {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse documents in {:?}", path))?
        } else {
            Vec::new()
        };

        info!("Loaded {} documents from {:?}", documents.len(), path);
        Ok(Self {
            path: Some(path.to_path_buf()),
            documents,
        })
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.documents)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write documents to {:?}", path))?;
        debug!("Saved {} documents to {:?}", self.documents.len(), path);
        Ok(())
    }

    /// All documents in insertion order
    pub fn list(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Add a document with a generated id
    pub fn create(&mut self, new: NewDocument) -> Result<Document> {
        let doc = new.with_id(uuid::Uuid::new_v4().to_string());
        self.documents.push(doc.clone());
        self.save()?;
        info!("Created document {} ({})", doc.id, doc.title);
        Ok(doc)
    }

    /// Apply a partial update; `None` when no document has `id`
    pub fn update(&mut self, id: &str, update: DocumentUpdate) -> Result<Option<Document>> {
        let Some(doc) = self.documents.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        update.apply(doc);
        let updated = doc.clone();
        self.save()?;
        Ok(Some(updated))
    }

    /// Remove a document; false when no document has `id`
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let Some(pos) = self.documents.iter().position(|d| d.id == id) else {
            return Ok(false);
        };
        let removed = self.documents.remove(pos);
        self.save()?;
        info!("Deleted document {} ({})", removed.id, removed.title);
        Ok(true)
    }

    /// Documents matching `filter`, in insertion order
    pub fn search<'a>(&'a self, filter: &'a DocumentFilter) -> impl Iterator<Item = &'a Document> + 'a {
        self.documents.iter().filter(move |d| filter.matches(d))
    }

    /// Number of documents per category (zero counts included)
    pub fn count_by_category(&self) -> Vec<(DocumentCategory, usize)> {
        DocumentCategory::ALL
            .into_iter()
            .map(|c| (c, self.documents.iter().filter(|d| d.category == c).count()))
            .collect()
    }
}
