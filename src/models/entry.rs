use std::collections::BTreeMap;

use eyre::{Result, eyre};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use crate::models::publication::PublicationEntry;

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Accepts YAML scalars of any type for a string field (`date: 2020` is common in CVs)
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(s) => s,
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalEntry {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub highlights: Option<Vec<String>>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulletEntry {
    #[serde(default)]
    pub bullet: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OneLineEntry {
    pub label: String,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Text,
    Publication,
    Normal,
    Bullet,
    OneLine,
}

/// A raw field value before template processing
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Number(i64),
}

impl FieldValue {
    pub fn is_hidden(&self) -> bool {
        match self {
            FieldValue::Text(text) => text == HIDDEN,
            FieldValue::List(items) => items.len() == 1 && items[0] == HIDDEN,
            FieldValue::Number(_) => false,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::List(items) => items.join(", "),
            FieldValue::Number(n) => n.to_string(),
        }
    }
}

/// Marker value that removes a field from the rendered entry
pub const HIDDEN: &str = "__HIDDEN__";

/// An entry of a CV section
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Text(String),
    Publication(PublicationEntry),
    Normal(NormalEntry),
    Bullet(BulletEntry),
    OneLine(OneLineEntry),
}

impl Entry {
    /// Detects the entry type from the keys present in the YAML node
    pub fn from_yaml(value: &Value) -> Result<Entry> {
        let mapping = match value {
            Value::String(text) => return Ok(Entry::Text(text.clone())),
            Value::Mapping(mapping) => mapping,
            other => return Err(eyre!("unsupported CV entry: {:?}", other)),
        };

        let has = |key: &str| mapping.contains_key(key);

        let entry = if has("bullet") {
            Entry::Bullet(serde_yaml::from_value(value.clone())?)
        } else if has("title") {
            Entry::Publication(serde_yaml::from_value(value.clone())?)
        } else if has("label") {
            Entry::OneLine(serde_yaml::from_value(value.clone())?)
        } else if has("name") {
            Entry::Normal(serde_yaml::from_value(value.clone())?)
        } else {
            return Err(eyre!("cannot determine the type of CV entry: {:?}", value));
        };

        Ok(entry)
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Text(_) => EntryKind::Text,
            Entry::Publication(_) => EntryKind::Publication,
            Entry::Normal(_) => EntryKind::Normal,
            Entry::Bullet(_) => EntryKind::Bullet,
            Entry::OneLine(_) => EntryKind::OneLine,
        }
    }

    /// Provided fields keyed by their upper-cased placeholder name
    pub fn fields(&self) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();

        match self {
            Entry::Text(_) => {}
            Entry::Publication(entry) => {
                insert_text(&mut fields, "TITLE", &Some(entry.title.clone()));
                insert_text(&mut fields, "SUMMARY", &entry.summary);
                insert_text(&mut fields, "DOI", &entry.doi);
                insert_text(&mut fields, "URL", &entry.url);
                insert_text(&mut fields, "JOURNAL", &entry.journal);
                insert_text(&mut fields, "DATE", &entry.date);
                if !entry.authors.is_empty() {
                    fields.insert("AUTHORS".to_string(), FieldValue::List(entry.authors.clone()));
                }
                if let Some(citations) = entry.citations {
                    fields.insert("CITATIONS".to_string(), FieldValue::Number(citations));
                }
                if let Some(media) = &entry.media_coverage {
                    fields.insert("MEDIA_COVERAGE".to_string(), FieldValue::List(media.clone()));
                }
            }
            Entry::Normal(entry) => {
                insert_text(&mut fields, "NAME", &Some(entry.name.clone()));
                insert_text(&mut fields, "LOCATION", &entry.location);
                insert_text(&mut fields, "DATE", &entry.date);
                insert_text(&mut fields, "START_DATE", &entry.start_date);
                insert_text(&mut fields, "END_DATE", &entry.end_date);
                insert_text(&mut fields, "SUMMARY", &entry.summary);
                insert_text(&mut fields, "URL", &entry.url);
                if let Some(highlights) = &entry.highlights {
                    fields.insert("HIGHLIGHTS".to_string(), FieldValue::List(highlights.clone()));
                }
            }
            Entry::Bullet(entry) => {
                insert_text(&mut fields, "BULLET", &entry.bullet);
                insert_text(&mut fields, "DATE", &entry.date);
                insert_text(&mut fields, "NAME", &entry.name);
                insert_text(&mut fields, "INSTITUTION", &entry.institution);
                insert_text(&mut fields, "TOPIC", &entry.topic);
            }
            Entry::OneLine(entry) => {
                insert_text(&mut fields, "LABEL", &Some(entry.label.clone()));
                insert_text(&mut fields, "DETAILS", &entry.details);
            }
        }

        fields
    }
}

fn insert_text(fields: &mut BTreeMap<String, FieldValue>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        fields.insert(key.to_string(), FieldValue::Text(value.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(raw: &str) -> Value {
        serde_yaml::from_str(raw).unwrap()
    }

    #[test]
    fn detects_entry_types() {
        assert_eq!(Entry::from_yaml(&yaml("'Plain text'")).unwrap().kind(), EntryKind::Text);
        assert_eq!(
            Entry::from_yaml(&yaml("bullet: Python, Rust")).unwrap().kind(),
            EntryKind::Bullet
        );
        assert_eq!(
            Entry::from_yaml(&yaml("title: Paper\nauthors: [A, B]")).unwrap().kind(),
            EntryKind::Publication
        );
        assert_eq!(
            Entry::from_yaml(&yaml("label: Research Citations\ndetails: many")).unwrap().kind(),
            EntryKind::OneLine
        );
        assert_eq!(
            Entry::from_yaml(&yaml("name: NoisePy\nhighlights: [fast]")).unwrap().kind(),
            EntryKind::Normal
        );
        assert!(Entry::from_yaml(&yaml("foo: bar")).is_err());
        assert!(Entry::from_yaml(&yaml("42")).is_err());
    }

    #[test]
    fn fields_skip_missing_values() {
        let entry = Entry::from_yaml(&yaml("name: Course\nstart_date: 2020-09\nend_date: present"))
            .unwrap();
        let fields = entry.fields();

        assert_eq!(fields.get("NAME"), Some(&FieldValue::Text("Course".to_string())));
        assert_eq!(fields.get("START_DATE"), Some(&FieldValue::Text("2020-09".to_string())));
        assert!(!fields.contains_key("LOCATION"));
        assert!(!fields.contains_key("HIGHLIGHTS"));
    }

    #[test]
    fn hidden_marker() {
        assert!(FieldValue::Text(HIDDEN.to_string()).is_hidden());
        assert!(FieldValue::List(vec![HIDDEN.to_string()]).is_hidden());
        assert!(!FieldValue::Number(0).is_hidden());
    }
}
