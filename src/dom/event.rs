//! Host UI events.
//!
//! Terminal hosts deliver crossterm key and mouse events; form-like hosts
//! deliver a text value. Every event converts into an [`Action`] whose kind is
//! the event name, so DOM sources can feed reducers directly.

use crossterm::event::{KeyCode, KeyEvent, MouseEvent};
use serde_json::Value;

use crate::types::Action;

/// Payload carried by a [`DomEvent`].
#[derive(Clone, Debug, PartialEq)]
pub enum EventData {
    None,
    Key(KeyEvent),
    Mouse(MouseEvent),
    Value(String),
}

/// An event dispatched on a host element.
#[derive(Clone, Debug, PartialEq)]
pub struct DomEvent {
    /// Event name (e.g. "click", "keyDown", "change").
    pub name: String,
    /// Description of the element that dispatched it (`tag#id.class`).
    pub target: String,
    pub data: EventData,
}

impl DomEvent {
    pub fn new(name: impl Into<String>, target: impl Into<String>, data: EventData) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            data,
        }
    }

    /// Text value, for `Value` payloads.
    pub fn value(&self) -> Option<&str> {
        match &self.data {
            EventData::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn key_code(&self) -> Option<KeyCode> {
        match &self.data {
            EventData::Key(key) => Some(key.code),
            _ => None,
        }
    }

    pub fn mouse(&self) -> Option<&MouseEvent> {
        match &self.data {
            EventData::Mouse(mouse) => Some(mouse),
            _ => None,
        }
    }
}

impl From<DomEvent> for Action {
    fn from(event: DomEvent) -> Self {
        let payload = match event.data {
            EventData::Value(value) => Value::String(value),
            EventData::Key(key) => match key.code {
                KeyCode::Char(c) => Value::String(c.to_string()),
                other => Value::String(format!("{other:?}")),
            },
            EventData::Mouse(mouse) => serde_json::json!({
                "column": mouse.column,
                "row": mouse.row,
            }),
            EventData::None => Value::Null,
        };
        Action::with_payload(event.name, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    #[test]
    fn test_value_event_to_action() {
        let event = DomEvent::new("change", "input.new-todo", EventData::Value("milk".into()));
        assert_eq!(event.value(), Some("milk"));

        let action: Action = event.into();
        assert!(action.is("change"));
        assert_eq!(action.payload_str(), Some("milk"));
    }

    #[test]
    fn test_key_event_accessors() {
        let key = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        let event = DomEvent::new("keyDown", "input", EventData::Key(key));

        assert_eq!(event.key_code(), Some(KeyCode::Enter));
        assert_eq!(event.value(), None);

        let action: Action = event.into();
        assert_eq!(action.payload_str(), Some("Enter"));
    }
}
