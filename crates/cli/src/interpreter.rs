//! The command interpreter.
//!
//! Every line is parsed independently into a [`Command`] and dispatched
//! against the storage engine. User-input errors and lookup misses are
//! written to the output as fixed messages; only storage failures propagate.

use std::io::Write;

use hbnb_core::{repr_str, schema, Attributes, EntityKind, Record, RESERVED_FIELDS};
use hbnb_storage::{RecordKey, Storage, StorageError};
use serde_json::{Map, Value};
use tracing::debug;

use crate::command::{parse_line, unquote, Command, Line, Operation};
use crate::help;

const CLASS_MISSING: &str = "** class name missing **";
const CLASS_UNKNOWN: &str = "** class doesn't exist **";
const ID_MISSING: &str = "** instance id missing **";
const NOT_FOUND: &str = "** no instance found **";
const ATTRIBUTE_MISSING: &str = "** attribute name missing **";
const VALUE_MISSING: &str = "** value missing **";
const BAD_DICTIONARY: &str = "** invalid dictionary **";

/// Errors that escape a command.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Writing to the output failed
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Result of one command.
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Whether the shell should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line
    Continue,
    /// Leave the shell
    Exit,
}

/// Line interpreter bound to one storage engine.
pub struct Console {
    storage: Box<dyn Storage>,
}

impl Console {
    /// Interactive prompt.
    pub const PROMPT: &'static str = "(hbnb) ";

    /// Create an interpreter over `storage`.
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The storage engine.
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Release the storage session.
    pub async fn close(&mut self) -> Result<()> {
        Ok(self.storage.close().await?)
    }

    /// Execute one line, writing its output to `out`.
    pub async fn onecmd<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Flow> {
        let command = match parse_line(line) {
            Line::Empty => return Ok(Flow::Continue),
            Line::Unknown(line) => {
                writeln!(out, "*** Unknown syntax: {line}")?;
                return Ok(Flow::Continue);
            }
            Line::Command(command) => command,
        };
        debug!(op = command.op.name(), kind = ?command.kind, "dispatching");

        match command.op {
            Operation::Create => self.create(&command, out).await?,
            Operation::Show => self.show(&command, out).await?,
            Operation::Destroy => self.destroy(&command, out).await?,
            Operation::All => self.all(&command, out).await?,
            Operation::Count => self.count(&command, out).await?,
            Operation::Update => self.update(&command, out).await?,
            Operation::Help => self.help(&command, out)?,
            Operation::Quit => return Ok(Flow::Exit),
            Operation::Eof => {
                writeln!(out)?;
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    async fn create<W: Write>(&mut self, command: &Command, out: &mut W) -> Result<()> {
        let Some(kind) = required_kind(command, out)? else {
            return Ok(());
        };

        let record = match Record::from_fields(kind, parse_params(kind, &command.args)) {
            Ok(record) => record,
            Err(e) => {
                writeln!(out, "** {e} **")?;
                return Ok(());
            }
        };
        let id = record.id().clone();
        self.storage.register_new(record).await?;
        writeln!(out, "{id}")?;
        self.storage.persist().await?;
        Ok(())
    }

    async fn show<W: Write>(&mut self, command: &Command, out: &mut W) -> Result<()> {
        if let Some(record) = self.lookup(command, out).await? {
            writeln!(out, "{record}")?;
        }
        Ok(())
    }

    async fn destroy<W: Write>(&mut self, command: &Command, out: &mut W) -> Result<()> {
        if let Some(record) = self.lookup(command, out).await? {
            self.storage.delete(&RecordKey::of(&record)).await?;
            self.storage.persist().await?;
        }
        Ok(())
    }

    async fn all<W: Write>(&mut self, command: &Command, out: &mut W) -> Result<()> {
        let filter = match &command.kind {
            None => None,
            Some(name) => match name.parse::<EntityKind>() {
                Ok(kind) => Some(kind),
                Err(_) => {
                    writeln!(out, "{CLASS_UNKNOWN}")?;
                    return Ok(());
                }
            },
        };

        let rendered: Vec<String> = self
            .storage
            .all(filter)
            .await?
            .values()
            .map(|record| repr_str(&record.to_string()))
            .collect();
        writeln!(out, "[{}]", rendered.join(", "))?;
        Ok(())
    }

    async fn count<W: Write>(&mut self, command: &Command, out: &mut W) -> Result<()> {
        let Some(name) = &command.kind else {
            writeln!(out, "{CLASS_MISSING}")?;
            return Ok(());
        };
        let count = match name.parse::<EntityKind>() {
            Ok(kind) => self.storage.count(kind).await?,
            Err(_) => 0,
        };
        writeln!(out, "{count}")?;
        Ok(())
    }

    async fn update<W: Write>(&mut self, command: &Command, out: &mut W) -> Result<()> {
        let Some(mut record) = self.lookup(command, out).await? else {
            return Ok(());
        };

        let Some(attribute) = command.args.get(1) else {
            writeln!(out, "{ATTRIBUTE_MISSING}")?;
            return Ok(());
        };

        if attribute.starts_with('{') {
            let Some(pairs) = parse_dictionary(attribute) else {
                writeln!(out, "{BAD_DICTIONARY}")?;
                return Ok(());
            };
            for (name, value) in pairs {
                let raw = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                self.apply_update(&mut record, &name, &raw).await?;
            }
            return Ok(());
        }

        let Some(value) = command.args.get(2) else {
            writeln!(out, "{VALUE_MISSING}")?;
            return Ok(());
        };
        self.apply_update(&mut record, &unquote(attribute), &unquote(value)).await
    }

    async fn apply_update(&mut self, record: &mut Record, name: &str, raw: &str) -> Result<()> {
        if RESERVED_FIELDS.contains(&name) {
            debug!(attribute = name, "ignoring update of reserved attribute");
            return Ok(());
        }
        record.set(name, coerce_value(record.kind(), name, raw));
        self.storage.save_record(record).await?;
        Ok(())
    }

    fn help<W: Write>(&self, command: &Command, out: &mut W) -> Result<()> {
        match &command.kind {
            None => write!(out, "{}", help::overview())?,
            Some(topic) => match topic.parse::<Operation>() {
                Ok(op) => writeln!(out, "{}", help::topic(op))?,
                Err(_) => writeln!(out, "*** No help on {topic}")?,
            },
        }
        Ok(())
    }

    /// Validate kind and id, then fetch the record, reporting each failure.
    async fn lookup<W: Write>(&self, command: &Command, out: &mut W) -> Result<Option<Record>> {
        let Some(kind) = required_kind(command, out)? else {
            return Ok(None);
        };
        let Some(id) = command.args.first() else {
            writeln!(out, "{ID_MISSING}")?;
            return Ok(None);
        };

        let key = RecordKey::new(kind, unquote(id));
        let record = self.storage.get(&key).await?;
        if record.is_none() {
            writeln!(out, "{NOT_FOUND}")?;
        }
        Ok(record)
    }
}

/// Resolve the command's kind, reporting a missing or unknown name.
fn required_kind<W: Write>(command: &Command, out: &mut W) -> Result<Option<EntityKind>> {
    let Some(name) = &command.kind else {
        writeln!(out, "{CLASS_MISSING}")?;
        return Ok(None);
    };
    match name.parse::<EntityKind>() {
        Ok(kind) => Ok(Some(kind)),
        Err(_) => {
            writeln!(out, "{CLASS_UNKNOWN}")?;
            Ok(None)
        }
    }
}

/// Parse `create` parameters.
///
/// `key="quoted value"` becomes a string (underscores read as spaces),
/// unquoted values with a dot become floats and the rest integers. Values
/// that fail their numeric parse, and tokens without `=`, are skipped.
fn parse_params(kind: EntityKind, args: &[String]) -> Attributes {
    let mut fields = Attributes::new();
    for arg in args {
        let Some((key, raw)) = arg.split_once('=') else {
            continue;
        };
        if key.is_empty() {
            continue;
        }

        let value = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            let inner = &raw[1..raw.len() - 1];
            Value::String(inner.replace('_', " ").replace("\\\"", "\""))
        } else if raw.contains('.') {
            match raw.parse::<f64>() {
                Ok(f) if f.is_finite() => Value::from(f),
                _ => continue,
            }
        } else {
            match raw.parse::<i64>() {
                Ok(i) => Value::from(i),
                Err(_) => continue,
            }
        };

        let value = match schema::field(kind, key) {
            Some(spec) => spec.coerce(value),
            None => value,
        };
        fields.insert(key.to_string(), value);
    }
    fields
}

/// Parse the dictionary form of `update`, accepting single-quoted keys and
/// strings.
fn parse_dictionary(token: &str) -> Option<Map<String, Value>> {
    serde_json::from_str(token)
        .or_else(|_| serde_json::from_str(&token.replace('\'', "\"")))
        .ok()
}

/// Coerce an update value: integers and finite floats by syntax, then the
/// field's schema type for known numeric fields.
fn coerce_value(kind: EntityKind, name: &str, raw: &str) -> Value {
    let value = if let Ok(i) = raw.parse::<i64>() {
        Value::from(i)
    } else {
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::from(f),
            _ => Value::String(raw.to_string()),
        }
    };
    match schema::field(kind, name) {
        Some(spec) => spec.coerce(value),
        None => value,
    }
}
