//! Record readers: turning raw cached bytes into a [`Record`]
//!
//! A reader either infers the schema from the payload or applies one that was
//! configured up front. The lookup service does not care which.

pub mod json;

use crate::error::ParseError;
use crate::record::{Record, RecordSchema};

pub use json::{JsonRecordReader, SchemaAccess};

/// Parses one record out of a byte payload
pub trait RecordReader: Send + Sync {
    /// Parse exactly one record
    ///
    /// `schema_hint`, when given, takes precedence over the reader's own
    /// schema strategy.
    fn parse(&self, bytes: &[u8], schema_hint: Option<&RecordSchema>) -> Result<Record, ParseError>;
}
