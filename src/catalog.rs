//! Question catalog: the fixed, ordered list of questions the wizard asks.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// How a raw answer is coerced before it goes into the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
        }
    }
}

/// One question of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Answer record field name.
    pub key: String,
    /// Question text shown to the user.
    pub prompt: String,
    pub kind: FieldKind,
    /// Input hint (presentation only).
    pub placeholder: String,
}

impl FieldDescriptor {
    pub fn text(
        key: impl Into<String>,
        prompt: impl Into<String>,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            prompt: prompt.into(),
            kind: FieldKind::Text,
            placeholder: placeholder.into(),
        }
    }

    pub fn number(
        key: impl Into<String>,
        prompt: impl Into<String>,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            prompt: prompt.into(),
            kind: FieldKind::Number,
            placeholder: placeholder.into(),
        }
    }
}

/// An immutable, non-empty list of questions with unique keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    fields: Vec<FieldDescriptor>,
}

impl Catalog {
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, CatalogError> {
        if fields.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.key.as_str()) {
                return Err(CatalogError::DuplicateKey {
                    key: field.key.clone(),
                });
            }
        }
        Ok(Self { fields })
    }

    /// The used-car questionnaire sent to the valuation service.
    pub fn vehicle() -> Self {
        Self {
            fields: vec![
                FieldDescriptor::text("brand", "What's the brand of your car?", "e.g., Maruti, Hyundai"),
                FieldDescriptor::text("model", "What's the model?", "e.g., Swift, i20"),
                FieldDescriptor::number("year", "What year was it manufactured?", "2018"),
                FieldDescriptor::number("km_driven", "How many kilometers driven?", "50000"),
                FieldDescriptor::number("owners", "How many owners?", "1"),
                FieldDescriptor::text("fuel_type", "Fuel type?", "Petrol/Diesel/CNG"),
                FieldDescriptor::text("transmission", "Transmission type?", "Manual/Automatic"),
                FieldDescriptor::number("engine_cc", "Engine capacity (CC)?", "1200"),
                FieldDescriptor::number("seats", "Number of seats?", "5"),
            ],
        }
    }

    pub fn get(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for a constructed catalog; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Index of the final question.
    pub fn last_index(&self) -> usize {
        self.fields.len() - 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }
}
