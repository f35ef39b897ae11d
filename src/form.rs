use crate::error::UnknownField;
use crate::field::Field;
use crate::record::FieldUpdate;

const LANGUAGE_CODES: &[(&str, &str)] = &[
    ("English", "en"),
    ("Spanish", "es"),
    ("French", "fr"),
    ("German", "de"),
    ("Italian", "it"),
    ("Japanese", "ja"),
    ("Korean", "ko"),
    ("Chinese (Simplified)", "zh-Hans"),
    ("Vietnamese", "vi"),
];

/// Fields edited as a checkbox; ticking one always writes `Yes`.
const FLAG_FIELDS: &[Field] = &[Field::BlackAndWhite, Field::Read];

const FLAG_VALUE: &str = "Yes";

/// Maps a language display name to its ISO code. Names outside the table,
/// including codes typed directly, are returned unchanged.
pub fn language_to_iso(name: &str) -> String {
    LANGUAGE_CODES
        .iter()
        .find(|(display, _)| *display == name)
        .map(|(_, code)| (*code).to_string())
        .unwrap_or_else(|| name.to_string())
}

pub fn language_names() -> impl Iterator<Item = &'static str> {
    LANGUAGE_CODES.iter().map(|(display, _)| *display)
}

fn normalize(field: Field, raw: &str) -> String {
    let value = raw.trim();
    if FLAG_FIELDS.contains(&field) {
        FLAG_VALUE.to_string()
    } else if field == Field::Language {
        language_to_iso(value)
    } else {
        value.to_string()
    }
}

impl FieldUpdate {
    /// Builds an update from the ticked fields of the editor form.
    pub fn from_form<I, K, V>(pairs: I) -> Result<Self, UnknownField>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut update = FieldUpdate::new();
        for (key, value) in pairs {
            let field: Field = key.as_ref().parse()?;
            update.set(field, normalize(field, value.as_ref()));
        }
        Ok(update)
    }
}
