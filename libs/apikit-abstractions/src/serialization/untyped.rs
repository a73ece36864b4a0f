use std::collections::BTreeMap;

/// Schema-less value for fields the model does not declare.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UntypedNode {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<UntypedNode>),
    Object(BTreeMap<String, UntypedNode>),
}

/// Unmodeled fields of a parsable object, keyed by field name.
pub type AdditionalData = BTreeMap<String, UntypedNode>;

impl UntypedNode {
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for UntypedNode {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for UntypedNode {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for UntypedNode {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for UntypedNode {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for UntypedNode {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}
