use _cbmeta_core::merge::effective_update;
use _cbmeta_core::{merge, Field, FieldUpdate, MetadataRecord, PerFileUpdate, Sequence};

fn existing() -> MetadataRecord {
    [
        (Field::Series, "Saga"),
        (Field::Number, "1"),
        (Field::Writer, "Brian K. Vaughan"),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_empty_update_changes_nothing() {
    let record = existing();
    assert_eq!(merge(&record, &FieldUpdate::new()), record);
    assert_eq!(merge(&MetadataRecord::new(), &FieldUpdate::new()), MetadataRecord::new());
}

#[test]
fn test_merge_applies_only_selected_fields() {
    let update = FieldUpdate::new()
        .with(Field::Number, "2")
        .with(Field::Publisher, "Image");
    let merged = merge(&existing(), &update);

    assert_eq!(merged.get(Field::Number), Some("2"));
    assert_eq!(merged.get(Field::Publisher), Some("Image"));
    assert_eq!(merged.get(Field::Series), Some("Saga"));
    assert_eq!(merged.get(Field::Writer), Some("Brian K. Vaughan"));
    assert_eq!(merged.len(), 4);
}

#[test]
fn test_selected_empty_value_is_written() {
    let update = FieldUpdate::new().with(Field::Writer, "");
    let merged = merge(&existing(), &update);
    assert_eq!(merged.get(Field::Writer), Some(""));
    assert_ne!(merged, existing());
}

#[test]
fn test_sequence_numbers_each_position() {
    let sequence = Sequence::new(Field::Number, 5).with_count(Field::IssueCount);
    let numbers: Vec<String> = (0..3)
        .map(|index| {
            let update = sequence.update_for(index, 3);
            assert_eq!(update.get(Field::IssueCount), Some("3"));
            update.get(Field::Number).unwrap().to_string()
        })
        .collect();
    assert_eq!(numbers, ["5", "6", "7"]);
}

#[test]
fn test_sequence_without_count_touches_one_field() {
    let update = Sequence::new(Field::AlternateNumber, 1).update_for(0, 10);
    assert_eq!(update.len(), 1);
    assert_eq!(update.get(Field::AlternateNumber), Some("1"));
}

#[test]
fn test_per_file_fields_override_the_base() {
    let base = FieldUpdate::new()
        .with(Field::Number, "99")
        .with(Field::Series, "Saga");
    let sequence = Sequence::new(Field::Number, 1);
    let update = effective_update(&base, Some(&sequence), 1, 2);
    assert_eq!(update.get(Field::Number), Some("2"));
    assert_eq!(update.get(Field::Series), Some("Saga"));
    assert_eq!(effective_update(&base, None, 1, 2), base);
}
