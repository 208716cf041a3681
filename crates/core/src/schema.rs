//! Per-kind field schema.
//!
//! Records accept arbitrary attributes, but each kind has a known set of
//! domain fields. The schema drives the relational column layout and the
//! numeric coercion applied when a known field is assigned.

use serde_json::Value;

use crate::kind::EntityKind;

/// Storage type of a known field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Free text
    Text,
    /// Integer column
    Integer,
    /// Floating-point column
    Float,
    /// List of record ids, persisted through a join table
    IdList,
}

/// A known field of an entity kind.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Attribute name
    pub name: &'static str,
    /// Column type
    pub ty: FieldType,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Parent kind for foreign-key fields
    pub references: Option<EntityKind>,
}

impl FieldSpec {
    const fn new(name: &'static str, ty: FieldType, nullable: bool) -> Self {
        Self { name, ty, nullable, references: None }
    }

    const fn foreign(name: &'static str, parent: EntityKind) -> Self {
        Self { name, ty: FieldType::Text, nullable: false, references: Some(parent) }
    }

    /// Value written for a non-nullable integer column left unset.
    pub fn default_value(&self) -> Option<Value> {
        match (self.ty, self.nullable) {
            (FieldType::Integer, false) => Some(Value::from(0)),
            (FieldType::IdList, _) => Some(Value::Array(Vec::new())),
            _ => None,
        }
    }

    /// Coerce a value to this field's type when it parses as one.
    ///
    /// Values that don't parse are returned unchanged.
    pub fn coerce(&self, value: Value) -> Value {
        match self.ty {
            FieldType::Integer => match &value {
                Value::String(s) => s.trim().parse::<i64>().map(Value::from).unwrap_or(value),
                Value::Number(n) if !n.is_i64() => n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                    .map(|f| Value::from(f as i64))
                    .unwrap_or(value),
                _ => value,
            },
            FieldType::Float => match &value {
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(Value::from)
                    .unwrap_or(value),
                Value::Number(n) => n.as_f64().map(Value::from).unwrap_or(value),
                _ => value,
            },
            FieldType::Text | FieldType::IdList => value,
        }
    }
}

const USER_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("email", FieldType::Text, false),
    FieldSpec::new("password", FieldType::Text, false),
    FieldSpec::new("first_name", FieldType::Text, true),
    FieldSpec::new("last_name", FieldType::Text, true),
];

const STATE_FIELDS: &[FieldSpec] = &[FieldSpec::new("name", FieldType::Text, false)];

const CITY_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("name", FieldType::Text, false),
    FieldSpec::foreign("state_id", EntityKind::State),
];

const AMENITY_FIELDS: &[FieldSpec] = &[FieldSpec::new("name", FieldType::Text, false)];

const PLACE_FIELDS: &[FieldSpec] = &[
    FieldSpec::foreign("city_id", EntityKind::City),
    FieldSpec::foreign("user_id", EntityKind::User),
    FieldSpec::new("name", FieldType::Text, false),
    FieldSpec::new("description", FieldType::Text, true),
    FieldSpec::new("number_rooms", FieldType::Integer, false),
    FieldSpec::new("number_bathrooms", FieldType::Integer, false),
    FieldSpec::new("max_guest", FieldType::Integer, false),
    FieldSpec::new("price_by_night", FieldType::Integer, false),
    FieldSpec::new("latitude", FieldType::Float, true),
    FieldSpec::new("longitude", FieldType::Float, true),
    FieldSpec::new("amenity_ids", FieldType::IdList, true),
];

const REVIEW_FIELDS: &[FieldSpec] = &[
    FieldSpec::foreign("place_id", EntityKind::Place),
    FieldSpec::foreign("user_id", EntityKind::User),
    FieldSpec::new("text", FieldType::Text, false),
];

/// Known fields of a kind, in column order.
pub fn fields(kind: EntityKind) -> &'static [FieldSpec] {
    match kind {
        EntityKind::BaseModel => &[],
        EntityKind::User => USER_FIELDS,
        EntityKind::Place => PLACE_FIELDS,
        EntityKind::State => STATE_FIELDS,
        EntityKind::City => CITY_FIELDS,
        EntityKind::Amenity => AMENITY_FIELDS,
        EntityKind::Review => REVIEW_FIELDS,
    }
}

/// Look up one known field.
pub fn field(kind: EntityKind, name: &str) -> Option<&'static FieldSpec> {
    fields(kind).iter().find(|f| f.name == name)
}

/// Kinds whose records reference `parent`, with the referencing field.
pub fn dependents(parent: EntityKind) -> Vec<(EntityKind, &'static str)> {
    EntityKind::ALL
        .into_iter()
        .flat_map(|kind| {
            fields(kind)
                .iter()
                .filter(move |f| f.references == Some(parent))
                .map(move |f| (kind, f.name))
        })
        .collect()
}
