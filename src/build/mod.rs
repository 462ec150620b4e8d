use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::case;
use crate::descriptor::{classify, Definition};
use crate::error::{Error, ErrorKind};
use crate::file::{FsLoader, ResourceLoader, SchemaParser};
use crate::project::{project_namespace, Built, BuiltNamespace};
use crate::reflect::{
    EnumNode, EnumValueNode, ExtensionNode, FieldNode, FieldType, MessageNode, MethodNode,
    NamespaceNode, NodeId, NodeKind, OneOfNode, ServiceNode, Tree,
};
use crate::types::{Builtin, Rule, Syntax, ID_MAX, ID_MIN};

mod import;

pub use import::ImportLocation;

/// Builds a resolved reflection tree from descriptor records.
///
/// Construction happens in two phases. Ingestion ([`define`](Builder::define),
/// [`create`](Builder::create), [`import`](Builder::import)) walks definition
/// records and attaches reflection nodes under a moving insertion pointer.
/// Resolution ([`resolve_all`](Builder::resolve_all), run implicitly by
/// [`build`](Builder::build)) then binds every symbolic type reference to a
/// concrete node and enforces cross-dialect rules.
///
/// A `Builder` is single-threaded and not reentrant; after an error the
/// tree may be partially populated and the builder should be discarded.
///
/// # Examples
///
/// ```
/// # use serde_json::json;
/// # use protoflect::Builder;
/// # fn main() -> Result<(), protoflect::Error> {
/// let mut builder = Builder::new();
/// builder.define("pkg")?.create(json!({
///     "name": "Message",
///     "fields": [{ "rule": "optional", "name": "id", "type": "int32", "id": 1 }],
/// }))?;
///
/// let message = builder.build_path("pkg.Message")?.expect("defined above");
/// assert_eq!(message.as_message().unwrap().fields[0].name, "id");
/// # Ok(())
/// # }
/// ```
pub struct Builder {
    tree: Tree,
    ptr: NodeId,
    resolved: bool,
    built: Option<Arc<BuiltNamespace>>,
    files: HashSet<String>,
    import_root: Option<String>,
    convert_field_names: bool,
    loader: Box<dyn ResourceLoader>,
    parser: Option<Box<dyn SchemaParser>>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Builder {
    /// Creates a new `Builder` resolving imports against the file system.
    pub fn new() -> Self {
        Builder::with_loader(FsLoader::new())
    }

    /// Creates a new `Builder` with a custom [`ResourceLoader`] for looking
    /// up imported files.
    pub fn with_loader<L>(loader: L) -> Self
    where
        L: ResourceLoader + 'static,
    {
        let tree = Tree::new();
        let root = tree.root();
        Builder {
            tree,
            ptr: root,
            resolved: false,
            built: None,
            files: HashSet::new(),
            import_root: None,
            convert_field_names: false,
            loader: Box::new(loader),
            parser: None,
        }
    }

    /// Set whether extension field names are rewritten to camelCase for
    /// their runtime key. The extension marker keeps the declared name.
    pub fn convert_fields_to_camel_case(&mut self, yes: bool) -> &mut Self {
        self.convert_field_names = yes;
        self
    }

    /// Installs an external text parser for non-JSON imports.
    ///
    /// Without one, `.proto` import names are transparently rewritten to
    /// their `.json` siblings before fetching.
    pub fn schema_parser<P>(&mut self, parser: P) -> &mut Self
    where
        P: SchemaParser + 'static,
    {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Returns the reflection tree built so far.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Moves the insertion pointer back to the root namespace.
    pub fn reset(&mut self) -> &mut Self {
        self.ptr = self.tree.root();
        self
    }

    /// Defines a (possibly dotted) namespace and moves the insertion
    /// pointer into it, reusing segments that already exist.
    pub fn define(&mut self, namespace: &str) -> Result<&mut Self, Error> {
        if !case::is_valid_namespace(namespace) {
            return Err(Error::from_kind(ErrorKind::IllegalNamespace {
                name: namespace.to_owned(),
            }));
        }
        for segment in namespace.split('.') {
            match self.tree.child_named(self.ptr, segment) {
                Some(child) if self.tree.node(child).is_namespace() => self.ptr = child,
                Some(_) => {
                    return Err(Error::from_kind(ErrorKind::IllegalNamespace {
                        name: namespace.to_owned(),
                    }))
                }
                None => {
                    self.ptr = self.tree.add(
                        self.ptr,
                        segment.to_owned(),
                        NodeKind::Namespace(NamespaceNode::default()),
                    );
                }
            }
        }
        self.invalidate();
        Ok(self)
    }

    /// Creates reflection nodes for one definition record or an ordered
    /// sequence of them, underneath the insertion pointer.
    ///
    /// Nested message types are descended into with an explicit work stack;
    /// when a definition list is exhausted the pointer ascends one level.
    pub fn create(&mut self, defs: Value) -> Result<&mut Self, Error> {
        let list: VecDeque<Value> = match defs {
            Value::Null => return Ok(self),
            Value::Array(items) => items.into(),
            def @ Value::Object(_) => VecDeque::from([def]),
            other => return Err(invalid_definition(&other)),
        };
        if list.is_empty() {
            return Ok(self);
        }

        let mut stack = vec![list];
        while let Some(mut defs) = stack.pop() {
            loop {
                let Some(def) = defs.pop_front() else {
                    // Finished this namespace level.
                    self.ptr = self
                        .tree
                        .node(self.ptr)
                        .parent()
                        .unwrap_or_else(|| self.tree.root());
                    break;
                };
                let mut def = match def {
                    Value::Object(map) => map,
                    other => return Err(invalid_definition(&other)),
                };
                match classify(&def) {
                    Some(Definition::Message) => {
                        let message = self.create_message(&def)?;
                        let mut nested = VecDeque::new();
                        for key in ["messages", "enums", "services"] {
                            if let Some(Value::Array(items)) = def.remove(key) {
                                nested.extend(items);
                            }
                        }
                        if !nested.is_empty() {
                            // Push the remainder of this level back and
                            // continue inside the new message.
                            stack.push(defs);
                            defs = nested;
                            self.ptr = message;
                        }
                    }
                    Some(Definition::Enum) => {
                        self.create_enum(&def)?;
                    }
                    Some(Definition::Service) => {
                        self.create_service(&def)?;
                    }
                    Some(Definition::Extend) => {
                        self.create_extend(&def)?;
                    }
                    _ => return Err(invalid_definition(&Value::Object(def))),
                }
            }
        }

        self.invalidate();
        Ok(self)
    }

    /// Resolves every symbolic type reference in the tree.
    ///
    /// Fields get their builtin tag and, for message and enum references, a
    /// pointer to the referent; rpc methods get their request and response
    /// messages. The insertion pointer is reset afterwards.
    pub fn resolve_all(&mut self) -> Result<&mut Self, Error> {
        let start = self.ptr;
        self.resolve_node(start)?;
        self.reset();
        self.resolved = true;
        Ok(self)
    }

    /// Ensures resolution has run and returns the cached projection of the
    /// whole namespace tree.
    pub fn build(&mut self) -> Result<Arc<BuiltNamespace>, Error> {
        if !self.resolved {
            self.reset();
            self.resolve_all()?;
        }
        if let Some(built) = &self.built {
            return Ok(built.clone());
        }
        let built = Arc::new(project_namespace(&self.tree, self.tree.root()));
        self.built = Some(built.clone());
        Ok(built)
    }

    /// Like [`build`](Builder::build), but returns the projected subtree at
    /// the given dotted path, or `None` when any segment is missing.
    pub fn build_path(&mut self, path: &str) -> Result<Option<Built>, Error> {
        let root = self.build()?;
        Ok(root.get_path(path).cloned())
    }

    /// Looks up the raw reflection node at the given dotted path from the
    /// root. The empty path addresses the root namespace.
    pub fn lookup(&self, path: &str, exclude_non_namespace: bool) -> Option<NodeId> {
        if path.is_empty() {
            return Some(self.tree.root());
        }
        self.tree
            .resolve(self.tree.root(), path, exclude_non_namespace)
    }

    fn invalidate(&mut self) {
        self.resolved = false;
        self.built = None;
    }

    fn create_message(&mut self, def: &Map<String, Value>) -> Result<NodeId, Error> {
        let name = def["name"].as_str().expect("checked by classifier");
        let syntax = parse_syntax(def)?;
        let group = def.get("isGroup").and_then(Value::as_bool).unwrap_or(false);
        let options = take_options(def, name)?;
        let extensions = parse_extension_range(def)?;

        let message = self.tree.add(
            self.ptr,
            name.to_owned(),
            NodeKind::Message(MessageNode {
                options,
                extensions,
                group,
                syntax,
            }),
        );

        // Oneofs are created before fields so member references always see
        // an existing sibling.
        let mut oneofs = HashMap::new();
        match def.get("oneofs") {
            None | Some(Value::Null) => {}
            Some(Value::Object(decls)) => {
                for oneof_name in decls.keys() {
                    let oneof = self.tree.add(
                        message,
                        oneof_name.clone(),
                        NodeKind::OneOf(OneOfNode::default()),
                    );
                    oneofs.insert(oneof_name.clone(), oneof);
                }
            }
            Some(other) => return Err(invalid_definition(other)),
        }

        match def.get("fields") {
            None | Some(Value::Null) => {}
            Some(Value::Array(fields)) => {
                for fld in fields {
                    self.create_field(message, fld, &oneofs, syntax)?;
                }
            }
            Some(other) => return Err(invalid_definition(other)),
        }

        Ok(message)
    }

    fn create_field(
        &mut self,
        message: NodeId,
        fld: &Value,
        oneofs: &HashMap<String, NodeId>,
        syntax: Syntax,
    ) -> Result<NodeId, Error> {
        let fld = parse_field_shape(fld)?;
        if self.tree.field_with_id(message, fld.id).is_some() {
            return Err(Error::from_kind(ErrorKind::DuplicateFieldId {
                message: self.tree.full_name(message),
                id: fld.id,
            }));
        }
        let oneof = match fld.oneof {
            None => None,
            Some(oneof_name) => match oneofs.get(oneof_name) {
                Some(&oneof) => Some(oneof),
                None => {
                    return Err(Error::from_kind(ErrorKind::IllegalOneof {
                        field: fld.name.to_owned(),
                        oneof: oneof_name.to_owned(),
                    }))
                }
            },
        };

        let field = self.tree.add(
            message,
            fld.name.to_owned(),
            NodeKind::Field(FieldNode {
                rule: fld.rule,
                id: fld.id,
                field_type: FieldType::Named(fld.field_type.to_owned()),
                key_type: fld.key_type.map(|k| FieldType::Named(k.to_owned())),
                options: fld.options,
                oneof,
                syntax,
                extension: None,
            }),
        );
        if let Some(oneof) = oneof {
            if let NodeKind::OneOf(node) = &mut self.tree.node_mut(oneof).kind {
                node.fields.push(field);
            }
        }
        Ok(field)
    }

    fn create_enum(&mut self, def: &Map<String, Value>) -> Result<NodeId, Error> {
        let name = def["name"].as_str().expect("checked by classifier");
        let syntax = parse_syntax(def)?;
        let options = take_options(def, name)?;
        let enum_ = self.tree.add(
            self.ptr,
            name.to_owned(),
            NodeKind::Enum(EnumNode { options, syntax }),
        );

        let values = def["values"].as_array().expect("checked by classifier");
        for value in values {
            let (value_name, id) = match (
                value.get("name").and_then(Value::as_str),
                value.get("id").and_then(Value::as_i64),
            ) {
                (Some(name), Some(id)) if i32::try_from(id).is_ok() => (name, id as i32),
                _ => return Err(invalid_definition(value)),
            };
            self.tree.add(
                enum_,
                value_name.to_owned(),
                NodeKind::EnumValue(EnumValueNode { id }),
            );
        }
        Ok(enum_)
    }

    fn create_service(&mut self, def: &Map<String, Value>) -> Result<NodeId, Error> {
        let name = def["name"].as_str().expect("checked by classifier");
        let options = take_options(def, name)?;
        let service = self.tree.add(
            self.ptr,
            name.to_owned(),
            NodeKind::Service(ServiceNode { options }),
        );

        let rpc = def["rpc"].as_object().expect("checked by classifier");
        for (method_name, method) in rpc {
            let (request, response) = match (
                method.get("request").and_then(Value::as_str),
                method.get("response").and_then(Value::as_str),
            ) {
                (Some(request), Some(response)) => (request, response),
                _ => return Err(invalid_definition(method)),
            };
            let options = method
                .as_object()
                .map(|m| take_options(m, method_name))
                .transpose()?
                .unwrap_or_default();
            self.tree.add(
                service,
                method_name.clone(),
                NodeKind::Method(MethodNode {
                    request: request.to_owned(),
                    response: response.to_owned(),
                    request_stream: method
                        .get("request_stream")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    response_stream: method
                        .get("response_stream")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    options,
                    resolved_request: None,
                    resolved_response: None,
                }),
            );
        }
        Ok(service)
    }

    fn create_extend(&mut self, def: &Map<String, Value>) -> Result<(), Error> {
        let reference = def["ref"].as_str().expect("checked by classifier");
        let target = self
            .tree
            .resolve(self.ptr, reference, true)
            .filter(|&target| self.tree.node(target).as_message().is_some());
        let Some(target) = target else {
            // Well-known descriptor schemas are declared but never loaded;
            // extending them is a no-op.
            if is_internal_reference(reference) {
                return Ok(());
            }
            return Err(Error::from_kind(ErrorKind::ExtendedNotDefined {
                reference: reference.to_owned(),
            }));
        };

        let syntax = parse_syntax(def)?;
        let fields = match def.get("fields") {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(fields)) => fields.as_slice(),
            Some(other) => return Err(invalid_definition(other)),
        };

        for fld in fields {
            let fld = parse_field_shape(fld)?;
            if self.tree.field_with_id(target, fld.id).is_some() {
                return Err(Error::from_kind(ErrorKind::DuplicateFieldId {
                    message: self.tree.full_name(target),
                    id: fld.id,
                }));
            }
            let [lo, hi] = self
                .tree
                .node(target)
                .as_message()
                .and_then(|m| m.extensions)
                .unwrap_or([ID_MIN, ID_MAX]);
            if fld.id < lo || fld.id > hi {
                return Err(Error::from_kind(ErrorKind::IllegalExtendedId {
                    message: self.tree.full_name(target),
                    id: fld.id,
                }));
            }

            let mut effective_name = fld.name.to_owned();
            if self.convert_field_names {
                effective_name = case::to_camel_case(&effective_name);
            }
            let site = self.tree.full_name(self.ptr);
            let runtime_key = if site.is_empty() {
                effective_name
            } else {
                format!("{site}.{effective_name}")
            };

            let field = self.tree.add(
                target,
                runtime_key,
                NodeKind::Field(FieldNode {
                    rule: fld.rule,
                    id: fld.id,
                    field_type: FieldType::Named(fld.field_type.to_owned()),
                    key_type: fld.key_type.map(|k| FieldType::Named(k.to_owned())),
                    options: fld.options,
                    oneof: None,
                    syntax,
                    extension: None,
                }),
            );
            let extension = self.tree.add(
                self.ptr,
                fld.name.to_owned(),
                NodeKind::Extension(ExtensionNode { field }),
            );
            if let NodeKind::Field(node) = &mut self.tree.node_mut(field).kind {
                node.extension = Some(extension);
            }
        }
        Ok(())
    }

    fn resolve_node(&mut self, id: NodeId) -> Result<(), Error> {
        let node = self.tree.node(id);
        if node.is_namespace() {
            let children = node.children().to_vec();
            for child in children {
                self.resolve_node(child)?;
            }
            Ok(())
        } else if node.as_field().is_some() {
            self.resolve_field(id)
        } else if node.as_method().is_some() {
            self.resolve_method(id)
        } else {
            // Enum values, oneofs and extension markers carry nothing to
            // resolve.
            Ok(())
        }
    }

    fn resolve_field(&mut self, id: NodeId) -> Result<(), Error> {
        let node = self.tree.node(id);
        let field = node.as_field().expect("resolve_field on non-field");
        let scope = match field.extension {
            Some(extension) => self.tree.node(extension).parent(),
            None => node.parent(),
        }
        .unwrap_or_else(|| self.tree.root());
        let syntax = field.syntax;

        let resolved = match &field.field_type {
            FieldType::Builtin(_) | FieldType::Resolved { .. } => None,
            FieldType::Named(name) => match Builtin::from_name(name) {
                Some(builtin) => Some(FieldType::Builtin(builtin)),
                None => {
                    if !case::is_valid_type_ref(name) {
                        return Err(self.unresolvable(id, name));
                    }
                    let Some(referent) = self.tree.resolve(scope, name, true) else {
                        return Err(self.unresolvable(id, name));
                    };
                    match &self.tree.node(referent).kind {
                        NodeKind::Enum(enum_) => {
                            if syntax == Syntax::Proto3 && enum_.syntax != Syntax::Proto3 {
                                return Err(Error::from_kind(ErrorKind::SyntaxMismatch {
                                    field: self.tree.full_name(id),
                                    reference: self.tree.full_name(referent),
                                }));
                            }
                            Some(FieldType::Resolved {
                                builtin: Builtin::Enum,
                                node: referent,
                            })
                        }
                        NodeKind::Message(message) => Some(FieldType::Resolved {
                            builtin: if message.group {
                                Builtin::Group
                            } else {
                                Builtin::Message
                            },
                            node: referent,
                        }),
                        _ => return Err(self.unresolvable(id, name)),
                    }
                }
            },
        };

        let field = match &mut self.tree.node_mut(id).kind {
            NodeKind::Field(field) => field,
            _ => unreachable!("resolve_field on non-field"),
        };
        if let Some(resolved) = resolved {
            field.field_type = resolved;
        }

        if field.rule == Rule::Map {
            let key_name = match &field.key_type {
                Some(FieldType::Named(name)) => Some(name.clone()),
                Some(_) => None,
                None => Some(String::new()),
            };
            if let Some(key_name) = key_name {
                match Builtin::from_name(&key_name).filter(Builtin::is_valid_map_key) {
                    Some(builtin) => {
                        let field = match &mut self.tree.node_mut(id).kind {
                            NodeKind::Field(field) => field,
                            _ => unreachable!(),
                        };
                        field.key_type = Some(FieldType::Builtin(builtin));
                    }
                    None => {
                        return Err(Error::from_kind(ErrorKind::IllegalKeyType {
                            field: self.tree.full_name(id),
                            key_type: key_name,
                        }))
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_method(&mut self, id: NodeId) -> Result<(), Error> {
        let node = self.tree.node(id);
        let method = node.as_method().expect("resolve_method on non-method");
        let scope = node.parent().unwrap_or_else(|| self.tree.root());

        let request = self.resolve_message_ref(scope, &method.request, id)?;
        let response = self.resolve_message_ref(scope, &method.response, id)?;

        if let NodeKind::Method(method) = &mut self.tree.node_mut(id).kind {
            method.resolved_request = Some(request);
            method.resolved_response = Some(response);
        }
        Ok(())
    }

    fn resolve_message_ref(
        &self,
        scope: NodeId,
        reference: &str,
        owner: NodeId,
    ) -> Result<NodeId, Error> {
        if !case::is_valid_type_ref(reference) {
            return Err(self.unresolvable(owner, reference));
        }
        self.tree
            .resolve(scope, reference, true)
            .filter(|&hit| self.tree.node(hit).as_message().is_some())
            .ok_or_else(|| self.unresolvable(owner, reference))
    }

    fn unresolvable(&self, owner: NodeId, reference: &str) -> Error {
        Error::from_kind(ErrorKind::UnresolvableType {
            owner: self.tree.full_name(owner),
            reference: reference.to_owned(),
        })
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("tree", &self.tree)
            .field("resolved", &self.resolved)
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}

/// The validated shape of one field descriptor.
struct FieldShape<'a> {
    rule: Rule,
    name: &'a str,
    id: u32,
    field_type: &'a str,
    key_type: Option<&'a str>,
    oneof: Option<&'a str>,
    options: Map<String, Value>,
}

fn parse_field_shape(fld: &Value) -> Result<FieldShape<'_>, Error> {
    let Some(def) = fld.as_object() else {
        return Err(invalid_definition(fld));
    };
    if !crate::descriptor::is_message_field(fld) {
        return Err(invalid_definition(fld));
    }
    let name = def["name"].as_str().expect("checked by classifier");
    let Some(rule) = Rule::from_name(def["rule"].as_str().expect("checked by classifier")) else {
        return Err(invalid_definition(fld));
    };
    let id = match def["id"].as_u64() {
        Some(id) if (ID_MIN as u64..=u32::MAX as u64).contains(&id) => id as u32,
        _ => return Err(invalid_definition(fld)),
    };
    let key_type = match def.get("keytype") {
        None | Some(Value::Null) => None,
        Some(Value::String(key_type)) => Some(key_type.as_str()),
        Some(_) => return Err(invalid_definition(fld)),
    };
    let oneof = match def.get("oneof") {
        None | Some(Value::Null) => None,
        Some(Value::String(oneof)) => Some(oneof.as_str()),
        Some(_) => return Err(invalid_definition(fld)),
    };
    Ok(FieldShape {
        rule,
        name,
        id,
        field_type: def["type"].as_str().expect("checked by classifier"),
        key_type: if rule == Rule::Map { key_type } else { None },
        oneof,
        options: take_options(def, name)?,
    })
}

fn parse_syntax(def: &Map<String, Value>) -> Result<Syntax, Error> {
    match def.get("syntax") {
        None | Some(Value::Null) => Ok(Syntax::default()),
        Some(Value::String(syntax)) => Syntax::from_name(syntax).ok_or_else(|| {
            Error::from_kind(ErrorKind::UnknownSyntax {
                syntax: syntax.clone(),
            })
        }),
        Some(other) => Err(Error::from_kind(ErrorKind::UnknownSyntax {
            syntax: other.to_string(),
        })),
    }
}

fn parse_extension_range(def: &Map<String, Value>) -> Result<Option<[u32; 2]>, Error> {
    match def.get("extensions") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(range)) => {
            let (lo, hi) = match (
                range.first().and_then(Value::as_i64),
                range.get(1).and_then(Value::as_i64),
            ) {
                (Some(lo), Some(hi)) if range.len() == 2 => (lo, hi),
                _ => return Err(invalid_definition(&Value::Array(range.clone()))),
            };
            // Clamp to the globally legal id interval.
            let lo = lo.clamp(ID_MIN as i64, ID_MAX as i64) as u32;
            let hi = hi.clamp(ID_MIN as i64, ID_MAX as i64) as u32;
            Ok(Some([lo, hi]))
        }
        Some(other) => Err(invalid_definition(other)),
    }
}

fn take_options(def: &Map<String, Value>, owner: &str) -> Result<Map<String, Value>, Error> {
    match def.get("options") {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(options)) => Ok(options.clone()),
        Some(_) => Err(Error::from_kind(ErrorKind::IllegalOptions {
            owner: owner.to_owned(),
        })),
    }
}

fn invalid_definition(def: &Value) -> Error {
    let name = def
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>");
    Error::from_kind(ErrorKind::InvalidDefinition {
        name: name.to_owned(),
    })
}

fn is_internal_reference(reference: &str) -> bool {
    reference
        .strip_prefix('.')
        .unwrap_or(reference)
        .starts_with("google.protobuf.")
}
