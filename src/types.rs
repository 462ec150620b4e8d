//! The builtin type registry and the numeric bounds for field ids.

use std::fmt;

/// The smallest legal field id.
pub const ID_MIN: u32 = 1;

/// The largest legal field id.
pub const ID_MAX: u32 = 536_870_911;

/// A builtin type tag.
///
/// Field types start out as strings in descriptor records. During
/// resolution every field ends up with one of these tags: scalar fields map
/// directly, while symbolic references become [`Enum`](Builtin::Enum),
/// [`Message`](Builtin::Message) or [`Group`](Builtin::Group) together with
/// a pointer to the referenced node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// 32-bit signed varint.
    Int32,
    /// 32-bit unsigned varint.
    Uint32,
    /// 32-bit signed varint, zigzag encoded.
    Sint32,
    /// 32-bit fixed-width unsigned integer.
    Fixed32,
    /// 32-bit fixed-width signed integer.
    Sfixed32,
    /// 64-bit signed varint.
    Int64,
    /// 64-bit unsigned varint.
    Uint64,
    /// 64-bit signed varint, zigzag encoded.
    Sint64,
    /// 64-bit fixed-width unsigned integer.
    Fixed64,
    /// 64-bit fixed-width signed integer.
    Sfixed64,
    /// Boolean.
    Bool,
    /// Single-precision floating point.
    Float,
    /// Double-precision floating point.
    Double,
    /// UTF-8 string.
    String,
    /// Arbitrary byte sequence.
    Bytes,
    /// A reference to an enum type.
    Enum,
    /// A reference to a message type.
    Message,
    /// A reference to a group (proto2 legacy message encoding).
    Group,
}

impl Builtin {
    /// Looks up a builtin by its descriptor name, e.g. `"int32"`.
    pub fn from_name(name: &str) -> Option<Builtin> {
        let builtin = match name {
            "int32" => Builtin::Int32,
            "uint32" => Builtin::Uint32,
            "sint32" => Builtin::Sint32,
            "fixed32" => Builtin::Fixed32,
            "sfixed32" => Builtin::Sfixed32,
            "int64" => Builtin::Int64,
            "uint64" => Builtin::Uint64,
            "sint64" => Builtin::Sint64,
            "fixed64" => Builtin::Fixed64,
            "sfixed64" => Builtin::Sfixed64,
            "bool" => Builtin::Bool,
            "float" => Builtin::Float,
            "double" => Builtin::Double,
            "string" => Builtin::String,
            "bytes" => Builtin::Bytes,
            "enum" => Builtin::Enum,
            "message" => Builtin::Message,
            "group" => Builtin::Group,
            _ => return None,
        };
        Some(builtin)
    }

    /// Returns the descriptor name of this builtin.
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Int32 => "int32",
            Builtin::Uint32 => "uint32",
            Builtin::Sint32 => "sint32",
            Builtin::Fixed32 => "fixed32",
            Builtin::Sfixed32 => "sfixed32",
            Builtin::Int64 => "int64",
            Builtin::Uint64 => "uint64",
            Builtin::Sint64 => "sint64",
            Builtin::Fixed64 => "fixed64",
            Builtin::Sfixed64 => "sfixed64",
            Builtin::Bool => "bool",
            Builtin::Float => "float",
            Builtin::Double => "double",
            Builtin::String => "string",
            Builtin::Bytes => "bytes",
            Builtin::Enum => "enum",
            Builtin::Message => "message",
            Builtin::Group => "group",
        }
    }

    /// Whether this builtin is allowed as a map key type.
    ///
    /// Map keys must be integers, booleans or strings.
    pub fn is_valid_map_key(&self) -> bool {
        matches!(
            self,
            Builtin::Int32
                | Builtin::Uint32
                | Builtin::Sint32
                | Builtin::Fixed32
                | Builtin::Sfixed32
                | Builtin::Int64
                | Builtin::Uint64
                | Builtin::Sint64
                | Builtin::Fixed64
                | Builtin::Sfixed64
                | Builtin::Bool
                | Builtin::String
        )
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The rule of a message field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The field must be present (proto2 only).
    Required,
    /// The field may be absent.
    Optional,
    /// The field holds a list of values.
    Repeated,
    /// The field holds a key/value map.
    Map,
}

impl Rule {
    /// Parses a rule from its descriptor name.
    pub fn from_name(name: &str) -> Option<Rule> {
        match name {
            "required" => Some(Rule::Required),
            "optional" => Some(Rule::Optional),
            "repeated" => Some(Rule::Repeated),
            "map" => Some(Rule::Map),
            _ => None,
        }
    }
}

/// The schema dialect a definition was declared under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Syntax {
    /// The `proto2` dialect. Definitions without an explicit tag default here.
    #[default]
    Proto2,
    /// The `proto3` dialect.
    Proto3,
}

impl Syntax {
    /// Parses a syntax tag from its descriptor value.
    pub fn from_name(name: &str) -> Option<Syntax> {
        match name {
            "proto2" => Some(Syntax::Proto2),
            "proto3" => Some(Syntax::Proto3),
            _ => None,
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Syntax::Proto2 => f.write_str("proto2"),
            Syntax::Proto3 => f.write_str("proto3"),
        }
    }
}
