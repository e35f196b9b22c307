//! Provider labels.

use serde::{Deserialize, Serialize};

use super::LabelId;

/// A label as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Provider label id (e.g. `Label_12` or `SPAM`).
    pub id: LabelId,
    /// Display name, matched against `move_to_folder`.
    pub name: String,
}

impl Label {
    pub fn new(id: impl Into<LabelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Well-known Gmail system label ids.
pub mod system_labels {
    use super::LabelId;

    /// Returns the inbox label ID.
    pub fn inbox() -> LabelId {
        LabelId::from("INBOX")
    }

    /// Returns the unread marker label ID.
    pub fn unread() -> LabelId {
        LabelId::from("UNREAD")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_deserializes_from_provider_shape() {
        let label: Label = serde_json::from_str(r#"{"id":"Label_3","name":"Receipts"}"#).unwrap();
        assert_eq!(label, Label::new("Label_3", "Receipts"));
    }

    #[test]
    fn system_labels_are_distinct() {
        assert_ne!(system_labels::inbox(), system_labels::unread());
    }
}
