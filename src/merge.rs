use crate::field::Field;
use crate::record::{FieldUpdate, MetadataRecord};

/// Applies the selected fields of `update` on top of `existing`. Fields the
/// update does not name keep their existing value.
pub fn merge(existing: &MetadataRecord, update: &FieldUpdate) -> MetadataRecord {
    let mut merged = existing.clone();
    for (field, value) in update.iter() {
        merged.set(field, value);
    }
    merged
}

/// Computes the part of an update that differs per file of a batch.
pub trait PerFileUpdate: Send + Sync {
    fn update_for(&self, index: usize, total: usize) -> FieldUpdate;
}

impl<F> PerFileUpdate for F
where
    F: Fn(usize, usize) -> FieldUpdate + Send + Sync,
{
    fn update_for(&self, index: usize, total: usize) -> FieldUpdate {
        self(index, total)
    }
}

/// Sequential numbering across an ordered batch: file `i` receives
/// `start + i` in `field`, and every file receives the batch size in
/// `count_field` when one is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub field: Field,
    pub start: i64,
    pub count_field: Option<Field>,
}

impl Sequence {
    pub fn new(field: Field, start: i64) -> Self {
        Self {
            field,
            start,
            count_field: None,
        }
    }

    pub fn with_count(mut self, count_field: Field) -> Self {
        self.count_field = Some(count_field);
        self
    }
}

impl PerFileUpdate for Sequence {
    fn update_for(&self, index: usize, total: usize) -> FieldUpdate {
        let number = self.start.saturating_add(index as i64);
        let mut update = FieldUpdate::new().with(self.field, number.to_string());
        if let Some(count_field) = self.count_field {
            update.set(count_field, total.to_string());
        }
        update
    }
}

/// The update applied to the file at `index`: the batch-wide base with the
/// per-file fields layered on top.
pub fn effective_update(
    base: &FieldUpdate,
    per_file: Option<&dyn PerFileUpdate>,
    index: usize,
    total: usize,
) -> FieldUpdate {
    match per_file {
        Some(per_file) => base.overlay(&per_file.update_for(index, total)),
        None => base.clone(),
    }
}
