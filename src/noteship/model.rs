use serde::{Deserialize, Serialize};

/// A note as returned by the ETAPI. Owned by the server; this tool only
/// reads and patches it through the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub note_id: String,
    pub title: String,
    #[serde(rename = "type", default = "default_note_type")]
    pub note_type: String,
    #[serde(default)]
    pub is_protected: bool,
    #[serde(default)]
    pub date_created: String,
    #[serde(default)]
    pub attributes: Vec<Label>,
}

fn default_note_type() -> String {
    "text".to_string()
}

impl Note {
    pub fn new(note_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            title: title.into(),
            note_type: "text".to_string(),
            is_protected: false,
            date_created: String::new(),
            attributes: Vec::new(),
        }
    }

    pub fn is_text(&self) -> bool {
        self.note_type == "text"
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.attributes
            .iter()
            .any(|a| a.kind == "label" && a.name == name)
    }
}

/// A key/value tag on a note (ETAPI "attribute" of type label).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    #[serde(rename = "type", default = "default_label_kind")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub value: String,
}

fn default_label_kind() -> String {
    "label".to_string()
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: "label".to_string(),
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Server information from `GET /etapi/app-info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub app_version: String,
    #[serde(default)]
    pub db_version: i64,
    #[serde(default)]
    pub build_date: String,
}

/// Content extracted from a fetched web page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub text: String,
    pub authors: Vec<String>,
    pub published: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_deserializes_etapi_payload() {
        let json = r#"{
            "noteId": "abc123",
            "title": "My note",
            "type": "text",
            "isProtected": false,
            "dateCreated": "2025-03-01 10:22:33.000+0100",
            "attributes": [{"type": "label", "name": "link", "value": ""}]
        }"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.note_id, "abc123");
        assert!(note.is_text());
        assert!(note.has_label("link"));
        assert!(!note.has_label("url"));
    }

    #[test]
    fn note_tolerates_missing_optionals() {
        let note: Note = serde_json::from_str(r#"{"noteId": "x", "title": "t"}"#).unwrap();
        assert_eq!(note.note_type, "text");
        assert!(note.attributes.is_empty());
    }
}
