//! Shape-based classification of descriptor records.
//!
//! Descriptor records carry no discriminator tag; the kind of a record is
//! recognized from which keys it carries. These predicates are the
//! authoritative definition of each record shape.

use serde_json::{Map, Value};

/// The recognized kinds of descriptor record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Definition {
    /// A message definition: a `name` and neither `values` nor `rpc`.
    Message,
    /// An enum definition: a `name` and a non-empty `values` list.
    Enum,
    /// A service definition: a `name` and an `rpc` mapping.
    Service,
    /// An extend block: a `ref` naming the target message.
    Extend,
    /// A message field: `rule`, `name` and `type` strings plus an `id`.
    Field,
}

/// Classifies a descriptor record by its shape.
///
/// Returns `None` when the record matches no known shape. Extend blocks and
/// fields are probed before the broader message shape, so a field-shaped
/// record in a namespace list is rejected rather than misread as a message.
pub fn classify(def: &Map<String, Value>) -> Option<Definition> {
    if is_extend_map(def) {
        Some(Definition::Extend)
    } else if is_message_field_map(def) {
        Some(Definition::Field)
    } else if is_enum_map(def) {
        Some(Definition::Enum)
    } else if is_service_map(def) {
        Some(Definition::Service)
    } else if is_message_map(def) {
        Some(Definition::Message)
    } else {
        None
    }
}

/// Whether the value is a message definition record.
pub fn is_message(def: &Value) -> bool {
    def.as_object().map_or(false, is_message_map)
}

/// Whether the value is an enum definition record.
pub fn is_enum(def: &Value) -> bool {
    def.as_object().map_or(false, is_enum_map)
}

/// Whether the value is a service definition record.
pub fn is_service(def: &Value) -> bool {
    def.as_object().map_or(false, is_service_map)
}

/// Whether the value is an extend block record.
pub fn is_extend(def: &Value) -> bool {
    def.as_object().map_or(false, is_extend_map)
}

/// Whether the value is a message field record.
pub fn is_message_field(def: &Value) -> bool {
    def.as_object().map_or(false, is_message_field_map)
}

fn is_message_map(def: &Map<String, Value>) -> bool {
    def.get("name").map_or(false, Value::is_string)
        && !def.contains_key("values")
        && !def.contains_key("rpc")
}

fn is_enum_map(def: &Map<String, Value>) -> bool {
    def.get("name").map_or(false, Value::is_string)
        && def
            .get("values")
            .and_then(Value::as_array)
            .map_or(false, |values| !values.is_empty())
}

fn is_service_map(def: &Map<String, Value>) -> bool {
    def.get("name").map_or(false, Value::is_string)
        && def.get("rpc").map_or(false, Value::is_object)
}

fn is_extend_map(def: &Map<String, Value>) -> bool {
    def.get("ref").map_or(false, Value::is_string)
}

fn is_message_field_map(def: &Map<String, Value>) -> bool {
    def.get("rule").map_or(false, Value::is_string)
        && def.get("name").map_or(false, Value::is_string)
        && def.get("type").map_or(false, Value::is_string)
        && def.contains_key("id")
}
