//! Record model - identity, timestamps and attributes shared by every kind.

use chrono::{NaiveDateTime, Timelike};
use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::id::RecordId;
use crate::kind::EntityKind;
use crate::Time;

/// Attribute map of a record, in insertion order.
pub type Attributes = Map<String, Value>;

/// Name of the discriminator field in serialized records.
pub const CLASS_FIELD: &str = "__class__";

/// Canonical timestamp rendering.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

// `%.f` makes the fractional part optional when parsing.
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Attributes that can never be assigned through [`Record::set`].
pub const RESERVED_FIELDS: [&str; 4] = ["id", "created_at", "updated_at", CLASS_FIELD];

/// A persistent entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    kind: EntityKind,
    id: RecordId,
    created_at: Time,
    updated_at: Time,
    attributes: Attributes,
}

impl Record {
    /// Create a fresh record with a new id and both timestamps set to now.
    pub fn new(kind: EntityKind) -> Self {
        let now = now();
        Self {
            kind,
            id: RecordId::new(),
            created_at: now,
            updated_at: now,
            attributes: Attributes::new(),
        }
    }

    /// Reconstruct a record from field values.
    ///
    /// Fields are adopted verbatim except the discriminator. Timestamps are
    /// parsed from their serialized form; a missing id or timestamp is
    /// synthesized as for a fresh record. `updated_at` is raised to
    /// `created_at` when it would precede it.
    pub fn from_fields(kind: EntityKind, mut fields: Attributes) -> Result<Self, ModelError> {
        fields.remove(CLASS_FIELD);
        let now = now();

        let id = match fields.remove("id") {
            Some(Value::String(s)) => RecordId::from(s),
            Some(other) => RecordId::from(other.to_string()),
            None => RecordId::new(),
        };
        let created_at = fields
            .remove("created_at")
            .map(|value| parse_timestamp("created_at", &value))
            .transpose()?;
        let updated_at = fields
            .remove("updated_at")
            .map(|value| parse_timestamp("updated_at", &value))
            .transpose()?;
        // updated_at never precedes created_at
        let (created_at, updated_at) = match (created_at, updated_at) {
            (Some(created), Some(updated)) => (created, updated.max(created)),
            (Some(created), None) => (created, now.max(created)),
            (None, Some(updated)) => (now.min(updated), updated),
            (None, None) => (now, now),
        };

        Ok(Self { kind, id, created_at, updated_at, attributes: fields })
    }

    /// Reconstruct a record from its serialized map, dispatching on `__class__`.
    pub fn from_dict(value: &Value) -> Result<Self, ModelError> {
        let object = value.as_object().ok_or(ModelError::NotAnObject)?;
        let kind: EntityKind = object
            .get(CLASS_FIELD)
            .and_then(Value::as_str)
            .ok_or(ModelError::MissingDiscriminator)?
            .parse()?;
        Self::from_fields(kind, object.clone())
    }

    /// Entity kind.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Record id.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Creation time.
    pub fn created_at(&self) -> Time {
        self.created_at
    }

    /// Last save time.
    pub fn updated_at(&self) -> Time {
        self.updated_at
    }

    /// All non-identity attributes.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Read one attribute.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Read a string attribute.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Assign an attribute. Returns `false` for reserved names, which are left
    /// untouched.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        if RESERVED_FIELDS.contains(&name) {
            return false;
        }
        self.attributes.insert(name.to_string(), value);
        true
    }

    /// Refresh `updated_at`. Never moves it before `created_at`.
    pub fn touch(&mut self) {
        self.updated_at = now().max(self.created_at);
    }

    /// Serialize to the persisted map form.
    pub fn to_dict(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".into(), Value::String(self.id.to_string()));
        map.insert("created_at".into(), Value::String(format_timestamp(self.created_at)));
        map.insert("updated_at".into(), Value::String(format_timestamp(self.updated_at)));
        for (key, value) in &self.attributes {
            map.insert(key.clone(), value.clone());
        }
        map.insert(CLASS_FIELD.into(), Value::String(self.kind.name().into()));
        Value::Object(map)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] ({}) {{", self.kind, self.id)?;
        write!(f, "'id': {}", repr_str(self.id.as_str()))?;
        write!(f, ", 'created_at': {}", repr_str(&format_timestamp(self.created_at)))?;
        write!(f, ", 'updated_at': {}", repr_str(&format_timestamp(self.updated_at)))?;
        for (key, value) in &self.attributes {
            write!(f, ", {}: {}", repr_str(key), render(value))?;
        }
        f.write_str("}")
    }
}

/// Current time truncated to the precision timestamps are persisted with.
pub fn now() -> Time {
    let now = chrono::Utc::now().naive_utc();
    let micros = now.nanosecond() / 1_000 * 1_000;
    now.with_nanosecond(micros).unwrap_or(now)
}

/// Render a timestamp in canonical form.
pub fn format_timestamp(t: Time) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a serialized timestamp field.
pub fn parse_timestamp(field: &str, value: &Value) -> Result<Time, ModelError> {
    let malformed = || ModelError::MalformedInput {
        field: field.to_string(),
        value: value.to_string(),
    };
    let s = value.as_str().ok_or_else(malformed)?;
    NaiveDateTime::parse_from_str(s, TIMESTAMP_PARSE_FORMAT).map_err(|_| malformed())
}

/// Quote a string the way Python's `repr` does: single quotes unless the
/// text contains a single quote and no double quote.
pub fn repr_str(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => repr_str(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", repr_str(k), render(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        Value::Number(n) => n.to_string(),
    }
}
