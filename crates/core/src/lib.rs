//! HBNB core data models.
//!
//! This crate defines the record type shared by every entity of the rental
//! listing domain, the closed set of entity kinds, and their field schema.

#![warn(missing_docs)]

mod error;
mod id;
mod kind;
mod record;
pub mod schema;

pub use error::ModelError;
pub use id::RecordId;
pub use kind::EntityKind;
pub use record::{
    format_timestamp, now, parse_timestamp, repr_str, Attributes, Record, CLASS_FIELD,
    RESERVED_FIELDS, TIMESTAMP_FORMAT,
};
pub use schema::{FieldSpec, FieldType};

/// Timestamp type
pub type Time = chrono::NaiveDateTime;
