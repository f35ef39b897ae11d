use crate::error::UnknownField;
use crate::field::Field;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decoded contents of a metadata document. A missing key means "no value",
/// which is distinct from an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord {
    fields: BTreeMap<Field, String>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) -> Option<String> {
        self.fields.insert(field, value.into())
    }

    pub fn remove(&mut self, field: Field) -> Option<String> {
        self.fields.remove(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.fields.iter().map(|(field, value)| (*field, value.as_str()))
    }
}

impl FromIterator<(Field, String)> for MetadataRecord {
    fn from_iter<I: IntoIterator<Item = (Field, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(Field, &'a str)> for MetadataRecord {
    fn from_iter<I: IntoIterator<Item = (Field, &'a str)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(field, value)| (field, value.to_string()))
            .collect()
    }
}

/// The selected fields of a write. Only keys present here are applied; an
/// empty string is a value that gets written, never a request to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldUpdate(MetadataRecord);

impl FieldUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.0.set(field, value);
        self
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.0.set(field, value);
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter()
    }

    /// Returns a copy of `self` with every key of `other` applied on top.
    pub fn overlay(&self, other: &FieldUpdate) -> FieldUpdate {
        let mut merged = self.clone();
        for (field, value) in other.iter() {
            merged.set(field, value);
        }
        merged
    }

    /// Builds an update from caller-facing keys, rejecting keys outside the
    /// vocabulary.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, UnknownField>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut update = FieldUpdate::new();
        for (key, value) in pairs {
            let field: Field = key.as_ref().parse()?;
            update.set(field, value);
        }
        Ok(update)
    }
}

impl From<MetadataRecord> for FieldUpdate {
    fn from(record: MetadataRecord) -> Self {
        FieldUpdate(record)
    }
}

impl FromIterator<(Field, String)> for FieldUpdate {
    fn from_iter<I: IntoIterator<Item = (Field, String)>>(iter: I) -> Self {
        FieldUpdate(iter.into_iter().collect())
    }
}
