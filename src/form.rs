//! Service editor state.
//!
//! Holds the raw text of each field while the editor modal is open and turns
//! it into a [`ServiceDraft`] on submit.

use thiserror::Error;

use crate::data::{ServiceDraft, ServiceRecord};

/// Protocols offered by the editor.
pub const PROTOCOLS: [&str; 2] = ["https", "http"];

/// Why the form cannot be submitted yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("Port must be a number between 1 and 65535, got '{0}'")]
    InvalidPort(String),

    #[error("Unsupported protocol '{0}'")]
    InvalidProtocol(String),
}

/// An editable field, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Id,
    Host,
    Port,
    Protocol,
    Path,
    Env,
    Active,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Name,
        Field::Id,
        Field::Host,
        Field::Port,
        Field::Protocol,
        Field::Path,
        Field::Env,
        Field::Active,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Id => "Id",
            Field::Host => "Host",
            Field::Port => "Port",
            Field::Protocol => "Protocol",
            Field::Path => "Path",
            Field::Env => "Env",
            Field::Active => "Active",
        }
    }

    /// Fields toggled with Space rather than typed into.
    pub fn is_choice(&self) -> bool {
        matches!(self, Field::Protocol | Field::Active)
    }

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Create/edit form for a service definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceForm {
    /// Id of the service being edited; `None` when creating.
    pub editing: Option<String>,
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: String,
    pub protocol: String,
    pub path: String,
    pub env: String,
    pub active: bool,
    pub focus: Field,
    /// Validation message from the last submit attempt.
    pub error: Option<String>,
}

impl ServiceForm {
    /// Blank form for a new service.
    pub fn create() -> Self {
        Self {
            editing: None,
            id: String::new(),
            name: String::new(),
            host: String::new(),
            port: String::new(),
            protocol: "https".to_string(),
            path: "/".to_string(),
            env: String::new(),
            active: true,
            focus: Field::Name,
            error: None,
        }
    }

    /// Form prefilled from an existing record.
    pub fn edit(record: &ServiceRecord) -> Self {
        Self {
            editing: Some(record.id.clone()),
            id: record.id.clone(),
            name: record.name.clone(),
            host: record.host.clone(),
            port: record.port.map(|p| p.to_string()).unwrap_or_default(),
            protocol: record.protocol.clone(),
            path: record.path.clone(),
            env: record.env.clone().unwrap_or_default(),
            active: record.active,
            focus: Field::Name,
            error: None,
        }
    }

    pub fn title(&self) -> &'static str {
        if self.editing.is_some() {
            "Edit Service"
        } else {
            "New Service"
        }
    }

    /// The id is fixed once a service exists.
    pub fn is_locked(&self, field: Field) -> bool {
        field == Field::Id && self.editing.is_some()
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
        if self.is_locked(self.focus) {
            self.focus = self.focus.next();
        }
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
        if self.is_locked(self.focus) {
            self.focus = self.focus.prev();
        }
    }

    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Name => Some(&mut self.name),
            Field::Id => Some(&mut self.id),
            Field::Host => Some(&mut self.host),
            Field::Port => Some(&mut self.port),
            Field::Path => Some(&mut self.path),
            Field::Env => Some(&mut self.env),
            Field::Protocol | Field::Active => None,
        }
    }

    /// Display value of a field.
    pub fn value(&self, field: Field) -> String {
        match field {
            Field::Name => self.name.clone(),
            Field::Id => {
                if self.id.is_empty() && self.editing.is_none() {
                    format!("({})", self.name.trim())
                } else {
                    self.id.clone()
                }
            }
            Field::Host => self.host.clone(),
            Field::Port => self.port.clone(),
            Field::Protocol => self.protocol.clone(),
            Field::Path => self.path.clone(),
            Field::Env => self.env.clone(),
            Field::Active => if self.active { "[x]" } else { "[ ]" }.to_string(),
        }
    }

    /// Type a character into the focused field.
    pub fn input(&mut self, c: char) {
        if self.focus.is_choice() {
            if c == ' ' {
                self.toggle();
            }
            return;
        }
        if self.is_locked(self.focus) {
            return;
        }
        if self.focus == Field::Port && !c.is_ascii_digit() {
            return;
        }
        if let Some(text) = self.text_mut(self.focus) {
            text.push(c);
        }
        self.error = None;
    }

    pub fn backspace(&mut self) {
        if self.is_locked(self.focus) {
            return;
        }
        if let Some(text) = self.text_mut(self.focus) {
            text.pop();
        }
    }

    /// Flip the focused choice field.
    pub fn toggle(&mut self) {
        match self.focus {
            Field::Active => self.active = !self.active,
            Field::Protocol => {
                let idx = PROTOCOLS.iter().position(|p| *p == self.protocol).unwrap_or(0);
                self.protocol = PROTOCOLS[(idx + 1) % PROTOCOLS.len()].to_string();
            }
            _ => {}
        }
    }

    /// Validate and build the payload.
    ///
    /// The id falls back to the trimmed name, an empty path becomes `/`,
    /// and an empty env is omitted.
    pub fn to_draft(&self) -> Result<ServiceDraft, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::Missing("Name"));
        }
        let host = self.host.trim();
        if host.is_empty() {
            return Err(FormError::Missing("Host"));
        }

        let id = match self.id.trim() {
            "" => name.to_string(),
            id => id.to_string(),
        };

        let port = match self.port.trim() {
            "" => None,
            raw => match raw.parse::<u16>() {
                Ok(p) if p > 0 => Some(p),
                _ => return Err(FormError::InvalidPort(raw.to_string())),
            },
        };

        if !PROTOCOLS.contains(&self.protocol.as_str()) {
            return Err(FormError::InvalidProtocol(self.protocol.clone()));
        }

        let path = match self.path.trim() {
            "" => "/".to_string(),
            p => p.to_string(),
        };
        let env = Some(self.env.trim().to_string()).filter(|e| !e.is_empty());

        Ok(ServiceDraft {
            id,
            name: name.to_string(),
            host: host.to_string(),
            port,
            protocol: self.protocol.clone(),
            path,
            env,
            active: self.active,
        })
    }
}
