//! The reflection tree produced by the builder.
//!
//! Nodes live in an arena owned by [`Tree`] and refer to each other through
//! [`NodeId`] indices. The owning edges (parent to children) form a strict
//! tree rooted at an anonymous namespace; resolution edges such as a field's
//! resolved type are plain indices and imply no ownership, so recursive
//! message types are representable without cycles among owning edges.

use serde_json::{Map, Value};

use crate::types::{Builtin, Rule, Syntax};

#[cfg(test)]
mod tests;

/// An index identifying a node within a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// The arena holding every reflection node of one builder.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

/// A single node of the reflection tree.
#[derive(Debug)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

/// The kind-specific payload of a [`Node`].
#[derive(Debug)]
pub enum NodeKind {
    /// A plain namespace.
    Namespace(NamespaceNode),
    /// A message type. Its children are fields, oneofs and nested types.
    Message(MessageNode),
    /// A field declared by a message, or an extension field attached to one.
    Field(FieldNode),
    /// A named group of mutually exclusive fields within one message.
    OneOf(OneOfNode),
    /// An enum type. Its children are enum values.
    Enum(EnumNode),
    /// A single named value of an enum.
    EnumValue(EnumValueNode),
    /// A service. Its children are rpc methods.
    Service(ServiceNode),
    /// A single rpc method of a service.
    Method(MethodNode),
    /// The marker left at an `extend` site, pointing at the extension field
    /// it added to the target message.
    Extension(ExtensionNode),
}

/// Payload of a plain namespace node.
#[derive(Debug, Default)]
pub struct NamespaceNode {
    /// Option names and values set on this namespace.
    pub options: Map<String, Value>,
}

/// Payload of a message node.
#[derive(Debug)]
pub struct MessageNode {
    /// Option names and values set on this message.
    pub options: Map<String, Value>,
    /// The declared extension id range, clamped to the global id bounds.
    pub extensions: Option<[u32; 2]>,
    /// Whether this message is a proto2 group.
    pub group: bool,
    /// The dialect the message was declared under.
    pub syntax: Syntax,
}

/// Payload of a field node.
#[derive(Debug)]
pub struct FieldNode {
    /// The field rule.
    pub rule: Rule,
    /// The field id, unique within the owning message.
    pub id: u32,
    /// The field type; symbolic references are bound during resolution.
    pub field_type: FieldType,
    /// The map key type, present only when `rule` is [`Rule::Map`].
    pub key_type: Option<FieldType>,
    /// Option names and values set on this field.
    pub options: Map<String, Value>,
    /// The oneof this field belongs to, always a sibling of the field.
    pub oneof: Option<NodeId>,
    /// The dialect of the declaring message.
    pub syntax: Syntax,
    /// For extension fields, the [`Extension`](NodeKind::Extension) marker
    /// at the declaration site.
    pub extension: Option<NodeId>,
}

/// Payload of a oneof node.
#[derive(Debug, Default)]
pub struct OneOfNode {
    /// The member fields, in declaration order.
    pub fields: Vec<NodeId>,
}

/// Payload of an enum node.
#[derive(Debug)]
pub struct EnumNode {
    /// Option names and values set on this enum.
    pub options: Map<String, Value>,
    /// The dialect the enum was declared under.
    pub syntax: Syntax,
}

/// Payload of an enum value node.
#[derive(Debug)]
pub struct EnumValueNode {
    /// The numeric value.
    pub id: i32,
}

/// Payload of a service node.
#[derive(Debug, Default)]
pub struct ServiceNode {
    /// Option names and values set on this service.
    pub options: Map<String, Value>,
}

/// Payload of an rpc method node.
#[derive(Debug)]
pub struct MethodNode {
    /// The declared request type name.
    pub request: String,
    /// The declared response type name.
    pub response: String,
    /// Whether the client streams requests.
    pub request_stream: bool,
    /// Whether the server streams responses.
    pub response_stream: bool,
    /// Option names and values set on this method.
    pub options: Map<String, Value>,
    /// The resolved request message, set by the resolution pass.
    pub resolved_request: Option<NodeId>,
    /// The resolved response message, set by the resolution pass.
    pub resolved_response: Option<NodeId>,
}

/// Payload of an extension marker node.
#[derive(Debug)]
pub struct ExtensionNode {
    /// The extension field this marker introduced on the target message.
    pub field: NodeId,
}

/// The type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// An unresolved type string: either a builtin name or a symbolic
    /// reference. This is the state of every field before resolution.
    Named(String),
    /// A builtin scalar type.
    Builtin(Builtin),
    /// A resolved reference to an enum, message or group node.
    Resolved {
        /// The builtin tag of the referent: `enum`, `message` or `group`.
        builtin: Builtin,
        /// The referenced node.
        node: NodeId,
    },
}

impl FieldType {
    /// Returns the builtin tag, once resolution has assigned one.
    pub fn builtin(&self) -> Option<Builtin> {
        match self {
            FieldType::Named(_) => None,
            FieldType::Builtin(builtin) | FieldType::Resolved { builtin, .. } => Some(*builtin),
        }
    }

    /// Returns the referenced node for resolved message and enum types.
    pub fn resolved_node(&self) -> Option<NodeId> {
        match self {
            FieldType::Resolved { node, .. } => Some(*node),
            _ => None,
        }
    }
}

impl Node {
    /// Returns the name of this node.
    ///
    /// For extension fields this is the runtime key: the fully qualified
    /// name of the `extend` site joined with the effective field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent namespace, or `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the children of this node, in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns the kind-specific payload.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns the message payload if this node is a message.
    pub fn as_message(&self) -> Option<&MessageNode> {
        match &self.kind {
            NodeKind::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Returns the field payload if this node is a field.
    pub fn as_field(&self) -> Option<&FieldNode> {
        match &self.kind {
            NodeKind::Field(field) => Some(field),
            _ => None,
        }
    }

    /// Returns the enum payload if this node is an enum.
    pub fn as_enum(&self) -> Option<&EnumNode> {
        match &self.kind {
            NodeKind::Enum(enum_) => Some(enum_),
            _ => None,
        }
    }

    /// Returns the oneof payload if this node is a oneof.
    pub fn as_oneof(&self) -> Option<&OneOfNode> {
        match &self.kind {
            NodeKind::OneOf(oneof) => Some(oneof),
            _ => None,
        }
    }

    /// Returns the method payload if this node is an rpc method.
    pub fn as_method(&self) -> Option<&MethodNode> {
        match &self.kind {
            NodeKind::Method(method) => Some(method),
            _ => None,
        }
    }

    /// Whether this node can contain named types: a namespace, message,
    /// enum or service.
    pub fn is_namespace(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Namespace(_) | NodeKind::Message(_) | NodeKind::Enum(_) | NodeKind::Service(_)
        )
    }
}

impl Tree {
    pub(crate) fn new() -> Self {
        Tree {
            nodes: vec![Node {
                name: String::new(),
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Namespace(NamespaceNode::default()),
            }],
        }
    }

    /// Returns the id of the anonymous root namespace.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the node with the given id.
    ///
    /// # Panics
    ///
    /// Panics if the id does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    /// Returns the number of nodes in the tree, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds nothing but the root namespace.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub(crate) fn add(&mut self, parent: NodeId, name: String, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name,
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.node_mut(parent).children.push(id);
        id
    }

    /// Returns the child of `parent` with the given name, if any.
    pub fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).name == name)
    }

    /// Returns the field child of `message` with the given id, if any.
    /// Extension fields previously attached to the message count.
    pub fn field_with_id(&self, message: NodeId, id: u32) -> Option<NodeId> {
        self.node(message)
            .children
            .iter()
            .copied()
            .find(|&child| matches!(&self.node(child).kind, NodeKind::Field(f) if f.id == id))
    }

    /// Returns the dot-joined path of names from the root to this node,
    /// omitting the root itself.
    pub fn full_name(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if node.parent.is_some() {
                segments.push(node.name.as_str());
            }
            current = node.parent;
        }
        segments.reverse();
        segments.join(".")
    }

    /// Resolves a dotted name against a scope and its ancestors.
    ///
    /// A reference with a leading dot is looked up from the root only.
    /// Otherwise the scope itself is searched first, then each ancestor up
    /// to the root, taking the first scope in which every segment descends
    /// to a child. With `exclude_non_namespace` set, hits that cannot
    /// contain named types (fields, enum values, methods, oneofs,
    /// extension markers) are filtered out.
    pub fn resolve(
        &self,
        scope: NodeId,
        reference: &str,
        exclude_non_namespace: bool,
    ) -> Option<NodeId> {
        let (start, reference) = match reference.strip_prefix('.') {
            Some(rest) => (self.root(), rest),
            None => (scope, reference),
        };
        if reference.is_empty() {
            return None;
        }

        let mut current = Some(start);
        while let Some(scope) = current {
            if let Some(hit) = self.resolve_in(scope, reference, exclude_non_namespace) {
                return Some(hit);
            }
            current = self.node(scope).parent;
        }
        None
    }

    fn resolve_in(
        &self,
        scope: NodeId,
        reference: &str,
        exclude_non_namespace: bool,
    ) -> Option<NodeId> {
        let mut ptr = scope;
        for segment in reference.split('.') {
            let child = self.child_named(ptr, segment)?;
            if exclude_non_namespace && !self.node(child).is_namespace() {
                return None;
            }
            ptr = child;
        }
        Some(ptr)
    }

    pub(crate) fn options_mut(&mut self, id: NodeId) -> Option<&mut Map<String, Value>> {
        match &mut self.node_mut(id).kind {
            NodeKind::Namespace(namespace) => Some(&mut namespace.options),
            NodeKind::Message(message) => Some(&mut message.options),
            NodeKind::Enum(enum_) => Some(&mut enum_.options),
            NodeKind::Service(service) => Some(&mut service.options),
            _ => None,
        }
    }
}
