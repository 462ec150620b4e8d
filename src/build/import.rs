//! Import composition: merging a descriptor file and everything it
//! transitively references into one namespace tree.

use serde_json::{Map, Value};

use crate::error::{Error, ErrorKind};
use crate::file;

use super::{invalid_definition, Builder};

/// Identifies the file a descriptor is imported from.
///
/// The name is canonicalized and recorded, making a second import of the
/// same file a silent no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportLocation {
    /// A plain file path, relative or absolute.
    File(String),
    /// A path split into an import root and a file relative to it. The
    /// root overrides the active import root while this file's own imports
    /// are being resolved.
    Rooted {
        /// The directory imports are resolved against.
        root: String,
        /// The file, relative to `root`.
        file: String,
    },
}

impl From<&str> for ImportLocation {
    fn from(path: &str) -> Self {
        ImportLocation::File(path.to_owned())
    }
}

impl From<String> for ImportLocation {
    fn from(path: String) -> Self {
        ImportLocation::File(path)
    }
}

impl Builder {
    /// Merges one descriptor file into the tree and recursively imports
    /// everything it references.
    ///
    /// String entries in the file's `imports` list are resolved against the
    /// active import root (derived from `location` unless overridden),
    /// fetched through the resource loader and imported in turn; inlined
    /// descriptor objects are imported directly under a synthesized name.
    /// The well-known `google/protobuf/descriptor.proto` is skipped. After
    /// the imports, the file's `package` is defined, its options merged
    /// onto the package namespace, and its messages, enums, services and
    /// finally extends created there. The insertion pointer ends at the
    /// root.
    pub fn import(
        &mut self,
        json: Value,
        location: Option<ImportLocation>,
    ) -> Result<&mut Self, Error> {
        let mut json = match json {
            Value::Object(map) => map,
            other => return Err(invalid_definition(&other)),
        };

        let mut delim = '/';
        let mut filename = None;
        let mut root_override = None;
        match location {
            Some(ImportLocation::File(name)) => {
                if !self.files.insert(file::canonicalize(&name)) {
                    self.reset();
                    return Ok(self);
                }
                filename = Some(name);
            }
            Some(ImportLocation::Rooted { root, file: name }) => {
                let root = file::canonicalize(&root);
                if root.contains('\\') || name.contains('\\') {
                    delim = '\\';
                }
                let combined = format!("{root}{delim}{name}");
                if !self.files.insert(file::canonicalize(&combined)) {
                    self.reset();
                    return Ok(self);
                }
                root_override = Some(root);
                filename = Some(name);
            }
            None => {}
        }

        if let Some(Value::Array(imports)) = json.remove("imports") {
            if !imports.is_empty() {
                if let Some(root) = &root_override {
                    self.import_root = Some(root.clone());
                }
                let import_root = match (&self.import_root, &filename) {
                    (Some(root), _) => Some(root.clone()),
                    (None, Some(name)) => {
                        let (root, derived_delim) = file::derive_root(name);
                        delim = derived_delim;
                        Some(root)
                    }
                    (None, None) => None,
                };

                for (index, entry) in imports.into_iter().enumerate() {
                    match entry {
                        Value::String(import_file) => {
                            let Some(root) = &import_root else {
                                return Err(Error::from_kind(ErrorKind::ImportRootUnknown {
                                    file: import_file,
                                }));
                            };
                            // The well-known descriptor schema is declared
                            // by many files but never needed here.
                            if import_file == "google/protobuf/descriptor.proto" {
                                continue;
                            }
                            let path = format!("{root}{delim}{import_file}");
                            if self.files.contains(&file::canonicalize(&path)) {
                                continue;
                            }
                            self.fetch_and_import(path)?;
                        }
                        entry @ Value::Object(_) => {
                            let location = filename.as_deref().map(|name| {
                                ImportLocation::File(file::inline_import_name(name, index))
                            });
                            self.import(entry, location)?;
                        }
                        other => return Err(invalid_definition(&other)),
                    }
                }

                if root_override.is_some() {
                    self.import_root = None;
                }
            }
        }

        if json.get("syntax").is_some() {
            propagate_syntax(&mut json);
        }

        match json.get("package") {
            None | Some(Value::Null) => {}
            Some(Value::String(package)) => {
                let package = package.clone();
                self.define(&package)?;
            }
            Some(other) => return Err(invalid_definition(other)),
        }

        let base = self.ptr;
        match json.get("options") {
            None | Some(Value::Null) => {}
            Some(Value::Object(options)) => {
                let options = options.clone();
                if let Some(target) = self.tree.options_mut(base) {
                    for (key, value) in options {
                        target.insert(key, value);
                    }
                }
            }
            Some(_) => {
                return Err(Error::from_kind(ErrorKind::IllegalOptions {
                    owner: self.tree.full_name(base),
                }))
            }
        }

        // Extends come last so they can reference types declared earlier in
        // the same file; the pointer returns to the package namespace after
        // each group so they resolve from there.
        for key in ["messages", "enums", "services", "extends"] {
            if let Some(defs) = json.remove(key) {
                if !defs.is_null() {
                    self.create(defs)?;
                    self.ptr = base;
                }
            }
        }

        self.reset();
        Ok(self)
    }

    /// Fetches a schema file through the resource loader, decodes it and
    /// imports it together with everything it transitively references.
    pub fn import_file(&mut self, path: &str) -> Result<&mut Self, Error> {
        self.fetch_and_import(path.to_owned())?;
        Ok(self)
    }

    fn fetch_and_import(&mut self, mut path: String) -> Result<(), Error> {
        // Without a text parser, `.proto` names fall back to their
        // pre-generated `.json` siblings.
        if file::has_extension(&path, ".proto") && self.parser.is_none() {
            path = file::swap_proto_extension(&path);
        }
        let Some(contents) = self.loader.fetch(&path) else {
            return Err(Error::from_kind(ErrorKind::ImportMissing { file: path }));
        };
        let descriptor = match &self.parser {
            Some(parser) if !file::has_extension(&path, ".json") => {
                let source = std::str::from_utf8(&contents).map_err(Error::new)?;
                parser.parse(&path, source)?
            }
            _ => serde_json::from_slice(&contents).map_err(|err| {
                Error::from_kind(ErrorKind::DecodeImport {
                    file: path.clone(),
                    err,
                })
            })?,
        };
        self.import(descriptor, Some(ImportLocation::File(path)))?;
        Ok(())
    }
}

/// Stamps a file-level `syntax` tag onto every nested message and enum
/// descriptor. Messages recurse; enums do not nest further.
fn propagate_syntax(parent: &mut Map<String, Value>) {
    let Some(syntax) = parent.get("syntax").cloned() else {
        return;
    };
    if let Some(Value::Array(messages)) = parent.get_mut("messages") {
        for child in messages {
            if let Value::Object(child) = child {
                child.insert("syntax".to_owned(), syntax.clone());
                propagate_syntax(child);
            }
        }
    }
    if let Some(Value::Array(enums)) = parent.get_mut("enums") {
        for child in enums {
            if let Value::Object(child) = child {
                child.insert("syntax".to_owned(), syntax.clone());
            }
        }
    }
}
