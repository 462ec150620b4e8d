//! A schema builder for Protocol Buffers descriptor records.
//!
//! [`Builder`] ingests parsed schema descriptors (JSON-shaped records for
//! messages, enums, services, extensions and imports) into a reflection
//! tree of named types, resolves every symbolic type reference against
//! scoped lookup rules, and projects the result into plain values that
//! message encoding and decoding can be driven from.
//!
//! Parsing of textual `.proto` sources is not part of this crate; an
//! external parser producing descriptor records can be plugged in through
//! [`file::SchemaParser`], and descriptor JSON works out of the box.
//!
//! # Examples
//!
//! ```
//! # use serde_json::json;
//! # use protoflect::{file::MemoryLoader, Builder, Builtin};
//! # fn main() -> Result<(), protoflect::Error> {
//! let mut loader = MemoryLoader::new();
//! loader.add(
//!     "types.json",
//!     r#"{ "package": "types", "messages": [{ "name": "Timestamp" }] }"#,
//! );
//!
//! let mut builder = Builder::with_loader(loader);
//! builder.import(
//!     json!({
//!         "package": "api",
//!         "imports": ["types.json"],
//!         "messages": [{
//!             "name": "Event",
//!             "fields": [
//!                 { "rule": "optional", "name": "at", "type": "types.Timestamp", "id": 1 },
//!                 { "rule": "optional", "name": "kind", "type": "string", "id": 2 },
//!             ],
//!         }],
//!     }),
//!     Some("api.json".into()),
//! )?;
//!
//! let event = builder.build_path("api.Event")?.expect("defined above");
//! let at = &event.as_message().unwrap().fields[0];
//! assert_eq!(at.ty, Builtin::Message);
//! assert_eq!(at.type_name.as_deref(), Some("types.Timestamp"));
//! # Ok(())
//! # }
//! ```
#![warn(missing_debug_implementations, missing_docs)]
#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/protoflect/0.1.0/")]

pub mod descriptor;
pub mod file;
pub mod project;
pub mod reflect;

mod build;
mod case;
mod error;
mod types;

pub use self::build::{Builder, ImportLocation};
pub use self::error::Error;
pub use self::types::{Builtin, Rule, Syntax, ID_MAX, ID_MIN};
