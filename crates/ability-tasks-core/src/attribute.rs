//! Attribute identities and change notifications.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identity of a numeric attribute (for example `Health` or `Mana`).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Attribute {
    name: Arc<str>,
}

impl Attribute {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<String> for Attribute {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for Attribute {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<Attribute> for String {
    fn from(attribute: Attribute) -> Self {
        attribute.name.to_string()
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute({})", self.name)
    }
}

/// Payload of an attribute change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    pub attribute: Attribute,
    pub new_value: f32,
    pub old_value: f32,
}
