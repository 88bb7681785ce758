use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A dataset row or node record as handed over by the caller.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    Chord,
    #[default]
    Network,
    Rings,
    #[serde(alias = "flow")]
    Sankey,
}

impl DiagramKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "chord" => Some(Self::Chord),
            "network" => Some(Self::Network),
            "rings" => Some(Self::Rings),
            "sankey" | "flow" => Some(Self::Sankey),
            _ => None,
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagramKind::Chord => "chord",
            DiagramKind::Network => "network",
            DiagramKind::Rings => "rings",
            DiagramKind::Sankey => "sankey",
        };
        f.write_str(name)
    }
}

/// One diagram worth of already-loaded input arrays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagramInput {
    #[serde(default)]
    pub kind: DiagramKind,
    /// Center node id (rings only).
    #[serde(default)]
    pub center: Option<String>,
    /// Dataset rows; take precedence for display values.
    #[serde(default)]
    pub data: Vec<Record>,
    /// Explicit node records; take precedence for positional and size hints.
    #[serde(default)]
    pub nodes: Vec<Record>,
    #[serde(default)]
    pub links: Vec<Record>,
}

/// How a link refers to one of its nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// Zero-based position in the caller's node array.
    Index(usize),
    Id(String),
    /// An inline node-shaped object; its id comes from the id accessor.
    Node(Record),
}

impl Endpoint {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(num) => num
                .as_u64()
                .and_then(|idx| usize::try_from(idx).ok())
                .map(Endpoint::Index),
            Value::String(id) => Some(Endpoint::Id(id.clone())),
            Value::Object(record) => Some(Endpoint::Node(record.clone())),
            _ => None,
        }
    }
}

/// A link before its endpoints are resolved against the node set.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLink {
    pub source: Endpoint,
    pub target: Endpoint,
    pub value: Option<f32>,
}

impl RawLink {
    pub fn new(source: Endpoint, target: Endpoint, value: Option<f32>) -> Self {
        Self {
            source,
            target,
            value,
        }
    }
}

/// Field names used to read links out of generic records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkKeys {
    pub source: String,
    pub target: String,
    pub value: String,
}

impl Default for LinkKeys {
    fn default() -> Self {
        Self {
            source: "source".to_string(),
            target: "target".to_string(),
            value: "value".to_string(),
        }
    }
}

type IdFn = dyn Fn(&Record, usize) -> Option<String> + Send + Sync;

/// Derives a node id from a record and its position in the input array.
#[derive(Clone)]
pub enum IdAccessor {
    Field(String),
    Custom(Arc<IdFn>),
}

impl IdAccessor {
    pub fn field(name: impl Into<String>) -> Self {
        IdAccessor::Field(name.into())
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Record, usize) -> Option<String> + Send + Sync + 'static,
    {
        IdAccessor::Custom(Arc::new(f))
    }

    pub fn id_of(&self, record: &Record, index: usize) -> Option<String> {
        match self {
            IdAccessor::Field(name) => record.get(name).and_then(value_to_id),
            IdAccessor::Custom(f) => f(record, index),
        }
    }

    /// Field used when a record has to be synthesised from a bare id.
    pub(crate) fn field_name(&self) -> &str {
        match self {
            IdAccessor::Field(name) => name.as_str(),
            IdAccessor::Custom(_) => "id",
        }
    }
}

impl Default for IdAccessor {
    fn default() -> Self {
        IdAccessor::Field("id".to_string())
    }
}

impl fmt::Debug for IdAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdAccessor::Field(name) => f.debug_tuple("Field").field(name).finish(),
            IdAccessor::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

pub(crate) fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn value_to_f32(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn endpoint_from_value_covers_all_reference_kinds() {
        assert_eq!(Endpoint::from_value(&json!(2)), Some(Endpoint::Index(2)));
        assert_eq!(
            Endpoint::from_value(&json!("alpha")),
            Some(Endpoint::Id("alpha".to_string()))
        );
        assert!(matches!(
            Endpoint::from_value(&json!({"id": "beta"})),
            Some(Endpoint::Node(_))
        ));
        assert_eq!(Endpoint::from_value(&json!(-1)), None);
        assert_eq!(Endpoint::from_value(&json!(null)), None);
    }

    #[test]
    fn id_accessor_reads_numbers_and_custom_functions() {
        let rec = record(json!({"id": 7, "name": "seven"}));
        assert_eq!(IdAccessor::default().id_of(&rec, 0), Some("7".to_string()));
        let by_name = IdAccessor::custom(|r, _| r.get("name").and_then(value_to_id));
        assert_eq!(by_name.id_of(&rec, 0), Some("seven".to_string()));
    }

    #[test]
    fn diagram_kind_parses_aliases() {
        assert_eq!(DiagramKind::from_token("Flow"), Some(DiagramKind::Sankey));
        assert_eq!(DiagramKind::from_token("rings"), Some(DiagramKind::Rings));
        assert_eq!(DiagramKind::from_token("pie"), None);
    }
}
