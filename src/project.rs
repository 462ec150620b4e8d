//! The build projection: plain values materialized from a resolved tree.
//!
//! [`Builder::build`](crate::Builder::build) snapshots the reflection tree
//! into these types. They own their data, carry fully qualified names for
//! every resolved reference, and can be traversed without the builder.

use serde_json::{Map, Value};

use crate::reflect::{FieldType, NodeId, NodeKind, Tree};
use crate::types::{Builtin, Rule, Syntax};

/// A projected node: a namespace, message, enum or service.
#[derive(Debug, Clone, PartialEq)]
pub enum Built {
    /// A plain namespace.
    Namespace(BuiltNamespace),
    /// A message type.
    Message(BuiltMessage),
    /// An enum type.
    Enum(BuiltEnum),
    /// A service.
    Service(BuiltService),
}

/// A projected namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltNamespace {
    /// The namespace name; empty for the root.
    pub name: String,
    /// The fully qualified name; empty for the root.
    pub full_name: String,
    /// Options set on the namespace.
    pub options: Map<String, Value>,
    /// Nested namespaces, messages, enums and services.
    pub nested: Vec<Built>,
}

/// A projected message.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltMessage {
    /// The message name.
    pub name: String,
    /// The fully qualified name.
    pub full_name: String,
    /// The dialect the message was declared under.
    pub syntax: Syntax,
    /// Whether the message is a proto2 group.
    pub group: bool,
    /// The declared extension id range, if any.
    pub extensions: Option<[u32; 2]>,
    /// Options set on the message.
    pub options: Map<String, Value>,
    /// Declared fields and attached extension fields, in insertion order.
    pub fields: Vec<BuiltField>,
    /// Oneof groups declared by the message.
    pub oneofs: Vec<BuiltOneOf>,
    /// Nested messages, enums and services.
    pub nested: Vec<Built>,
}

/// A projected field.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltField {
    /// The field name. For extension fields this is the runtime key.
    pub name: String,
    /// The field rule.
    pub rule: Rule,
    /// The field id.
    pub id: u32,
    /// The resolved builtin tag of the field type.
    pub ty: Builtin,
    /// The fully qualified name of the referenced type, for message, group
    /// and enum fields.
    pub type_name: Option<String>,
    /// The resolved map key type, for map fields.
    pub key_type: Option<Builtin>,
    /// The name of the oneof the field belongs to, if any.
    pub oneof: Option<String>,
    /// Options set on the field.
    pub options: Map<String, Value>,
}

/// A projected oneof group.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltOneOf {
    /// The oneof name.
    pub name: String,
    /// The names of the member fields, in declaration order.
    pub fields: Vec<String>,
}

/// A projected enum.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltEnum {
    /// The enum name.
    pub name: String,
    /// The fully qualified name.
    pub full_name: String,
    /// The dialect the enum was declared under.
    pub syntax: Syntax,
    /// Options set on the enum.
    pub options: Map<String, Value>,
    /// The enum values, in declaration order.
    pub values: Vec<BuiltEnumValue>,
}

/// A projected enum value.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltEnumValue {
    /// The value name.
    pub name: String,
    /// The numeric value.
    pub id: i32,
}

/// A projected service.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltService {
    /// The service name.
    pub name: String,
    /// The fully qualified name.
    pub full_name: String,
    /// Options set on the service.
    pub options: Map<String, Value>,
    /// The rpc methods, in declaration order.
    pub methods: Vec<BuiltMethod>,
}

/// A projected rpc method.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltMethod {
    /// The method name.
    pub name: String,
    /// The fully qualified name of the resolved request message.
    pub request: String,
    /// The fully qualified name of the resolved response message.
    pub response: String,
    /// Whether the client streams requests.
    pub request_stream: bool,
    /// Whether the server streams responses.
    pub response_stream: bool,
    /// Options set on the method.
    pub options: Map<String, Value>,
}

impl Built {
    /// Returns the name of the projected node.
    pub fn name(&self) -> &str {
        match self {
            Built::Namespace(namespace) => &namespace.name,
            Built::Message(message) => &message.name,
            Built::Enum(enum_) => &enum_.name,
            Built::Service(service) => &service.name,
        }
    }

    /// Returns the message if this node is one.
    pub fn as_message(&self) -> Option<&BuiltMessage> {
        match self {
            Built::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Returns the enum if this node is one.
    pub fn as_enum(&self) -> Option<&BuiltEnum> {
        match self {
            Built::Enum(enum_) => Some(enum_),
            _ => None,
        }
    }

    /// Returns the service if this node is one.
    pub fn as_service(&self) -> Option<&BuiltService> {
        match self {
            Built::Service(service) => Some(service),
            _ => None,
        }
    }

    fn nested(&self) -> &[Built] {
        match self {
            Built::Namespace(namespace) => &namespace.nested,
            Built::Message(message) => &message.nested,
            Built::Enum(_) | Built::Service(_) => &[],
        }
    }

    fn get(&self, name: &str) -> Option<&Built> {
        self.nested().iter().find(|nested| nested.name() == name)
    }
}

impl BuiltNamespace {
    /// Returns the directly nested node with the given name.
    pub fn get(&self, name: &str) -> Option<&Built> {
        self.nested.iter().find(|nested| nested.name() == name)
    }

    /// Returns the node at the given dotted path, or `None` when any
    /// segment is missing.
    pub fn get_path(&self, path: &str) -> Option<&Built> {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current)
    }
}

pub(crate) fn project_namespace(tree: &Tree, id: NodeId) -> BuiltNamespace {
    let node = tree.node(id);
    let options = match node.kind() {
        NodeKind::Namespace(namespace) => namespace.options.clone(),
        _ => Map::new(),
    };
    BuiltNamespace {
        name: node.name().to_owned(),
        full_name: tree.full_name(id),
        options,
        nested: project_children(tree, id),
    }
}

fn project_children(tree: &Tree, id: NodeId) -> Vec<Built> {
    tree.node(id)
        .children()
        .iter()
        .filter_map(|&child| project_node(tree, child))
        .collect()
}

fn project_node(tree: &Tree, id: NodeId) -> Option<Built> {
    let node = tree.node(id);
    match node.kind() {
        NodeKind::Namespace(_) => Some(Built::Namespace(project_namespace(tree, id))),
        NodeKind::Message(message) => {
            let mut fields = Vec::new();
            let mut oneofs = Vec::new();
            for &child in node.children() {
                let child_node = tree.node(child);
                match child_node.kind() {
                    NodeKind::Field(field) => fields.push(project_field(tree, child, field)),
                    NodeKind::OneOf(oneof) => oneofs.push(BuiltOneOf {
                        name: child_node.name().to_owned(),
                        fields: oneof
                            .fields
                            .iter()
                            .map(|&member| tree.node(member).name().to_owned())
                            .collect(),
                    }),
                    _ => {}
                }
            }
            Some(Built::Message(BuiltMessage {
                name: node.name().to_owned(),
                full_name: tree.full_name(id),
                syntax: message.syntax,
                group: message.group,
                extensions: message.extensions,
                options: message.options.clone(),
                fields,
                oneofs,
                nested: project_children(tree, id),
            }))
        }
        NodeKind::Enum(enum_) => {
            let values = node
                .children()
                .iter()
                .filter_map(|&child| {
                    let child_node = tree.node(child);
                    match child_node.kind() {
                        NodeKind::EnumValue(value) => Some(BuiltEnumValue {
                            name: child_node.name().to_owned(),
                            id: value.id,
                        }),
                        _ => None,
                    }
                })
                .collect();
            Some(Built::Enum(BuiltEnum {
                name: node.name().to_owned(),
                full_name: tree.full_name(id),
                syntax: enum_.syntax,
                options: enum_.options.clone(),
                values,
            }))
        }
        NodeKind::Service(service) => {
            let methods = node
                .children()
                .iter()
                .filter_map(|&child| {
                    let child_node = tree.node(child);
                    match child_node.kind() {
                        NodeKind::Method(method) => Some(BuiltMethod {
                            name: child_node.name().to_owned(),
                            request: method
                                .resolved_request
                                .map(|request| tree.full_name(request))
                                .unwrap_or_else(|| method.request.clone()),
                            response: method
                                .resolved_response
                                .map(|response| tree.full_name(response))
                                .unwrap_or_else(|| method.response.clone()),
                            request_stream: method.request_stream,
                            response_stream: method.response_stream,
                            options: method.options.clone(),
                        }),
                        _ => None,
                    }
                })
                .collect();
            Some(Built::Service(BuiltService {
                name: node.name().to_owned(),
                full_name: tree.full_name(id),
                options: service.options.clone(),
                methods,
            }))
        }
        // Fields, oneofs, enum values and methods are projected by their
        // parents; extension markers have no projection of their own.
        _ => None,
    }
}

fn project_field(tree: &Tree, id: NodeId, field: &crate::reflect::FieldNode) -> BuiltField {
    let (ty, type_name) = match &field.field_type {
        FieldType::Builtin(builtin) => (*builtin, None),
        FieldType::Resolved { builtin, node } => (*builtin, Some(tree.full_name(*node))),
        // `build` always resolves before projecting.
        FieldType::Named(_) => unreachable!("projecting an unresolved field"),
    };
    BuiltField {
        name: tree.node(id).name().to_owned(),
        rule: field.rule,
        id: field.id,
        ty,
        type_name,
        key_type: field.key_type.as_ref().and_then(FieldType::builtin),
        oneof: field
            .oneof
            .map(|oneof| tree.node(oneof).name().to_owned()),
        options: field.options.clone(),
    }
}
