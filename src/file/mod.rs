//! Interfaces for customizing how imported schema files are located.
//!
//! The builder never touches the file system directly: every import goes
//! through a [`ResourceLoader`]. The default is [`FsLoader`], but schemas
//! can be served from memory ([`MemoryLoader`]) or from several sources in
//! order ([`ChainLoader`]). Textual `.proto` sources are handled by an
//! external parser plugged in through [`SchemaParser`].

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use serde_json::Value;

use crate::error::Error;

#[cfg(test)]
mod tests;

/// A strategy for locating imported schema files.
pub trait ResourceLoader {
    /// Fetches the contents of the file with the given name, or `None` if
    /// it does not exist.
    fn fetch(&self, path: &str) -> Option<Bytes>;
}

impl<T> ResourceLoader for Box<T>
where
    T: ResourceLoader + ?Sized,
{
    fn fetch(&self, path: &str) -> Option<Bytes> {
        (**self).fetch(path)
    }
}

/// An external parser turning textual schema source into descriptor JSON.
///
/// The builder itself only consumes descriptor records. When a parser is
/// installed, imports with a non-`.json` extension are routed through it;
/// without one, `.proto` import names fall back to their `.json` siblings.
pub trait SchemaParser {
    /// Parses `source` into a descriptor record tree.
    ///
    /// `name` is the file name the source was loaded from, for diagnostics.
    fn parse(&self, name: &str, source: &str) -> Result<Value, Error>;
}

/// A [`ResourceLoader`] reading from the file system.
#[derive(Debug, Default)]
pub struct FsLoader {
    _priv: (),
}

impl FsLoader {
    /// Creates a new instance of [`FsLoader`].
    pub fn new() -> Self {
        Default::default()
    }
}

impl ResourceLoader for FsLoader {
    fn fetch(&self, path: &str) -> Option<Bytes> {
        std::fs::read(path).ok().map(Bytes::from)
    }
}

/// A [`ResourceLoader`] serving files from an in-memory map.
///
/// Names are normalized with the same lexical rules the builder uses for
/// import deduplication, so `./a/b.json` and `a/b.json` address the same
/// entry.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    files: HashMap<String, Bytes>,
}

impl MemoryLoader {
    /// Creates an empty [`MemoryLoader`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a file under the given name, replacing any previous contents.
    pub fn add(&mut self, path: impl AsRef<str>, contents: impl Into<Bytes>) -> &mut Self {
        self.files
            .insert(canonicalize(path.as_ref()), contents.into());
        self
    }
}

impl ResourceLoader for MemoryLoader {
    fn fetch(&self, path: &str) -> Option<Bytes> {
        self.files.get(&canonicalize(path)).cloned()
    }
}

/// A [`ResourceLoader`] trying several loaders in order, first hit wins.
#[derive(Default)]
pub struct ChainLoader {
    loaders: Vec<Box<dyn ResourceLoader>>,
}

impl ChainLoader {
    /// Creates an empty [`ChainLoader`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a loader to the chain.
    pub fn add<L>(&mut self, loader: L) -> &mut Self
    where
        L: ResourceLoader + 'static,
    {
        self.loaders.push(Box::new(loader));
        self
    }
}

impl ResourceLoader for ChainLoader {
    fn fetch(&self, path: &str) -> Option<Bytes> {
        self.loaders.iter().find_map(|loader| loader.fetch(path))
    }
}

impl fmt::Debug for ChainLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainLoader")
            .field("len", &self.loaders.len())
            .finish_non_exhaustive()
    }
}

/// Lexically normalizes a file name for import deduplication.
///
/// Empty and `.` segments are dropped and `..` segments folded, with the
/// delimiter style of the input preserved. This is deterministic and never
/// consults the file system, so virtual loaders dedup the same way the
/// default one does.
pub(crate) fn canonicalize(path: &str) -> String {
    let delim = if path.contains('\\') { "\\" } else { "/" };
    let absolute = path.starts_with('/') || path.starts_with('\\');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(&last) if last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let mut out = String::with_capacity(path.len());
    if absolute {
        out.push_str(delim);
    }
    out.push_str(&segments.join(delim));
    out
}

/// Derives the import root from a file name: everything up to the last
/// path separator, or `.` when there is none. Returns the root together
/// with the delimiter to use when joining imports against it.
pub(crate) fn derive_root(filename: &str) -> (String, char) {
    if let Some(idx) = filename.rfind('/') {
        let root = &filename[..idx];
        if root.is_empty() {
            ("/".to_owned(), '/')
        } else {
            (root.to_owned(), '/')
        }
    } else if let Some(idx) = filename.rfind('\\') {
        (filename[..idx].to_owned(), '\\')
    } else {
        (".".to_owned(), '/')
    }
}

/// Synthesizes a unique name for an inlined import of `filename`:
/// `_import<index>` is spliced in before the extension, or appended when
/// the name has none.
pub(crate) fn inline_import_name(filename: &str, index: usize) -> String {
    if let Some(idx) = filename.rfind('.') {
        let ext = &filename[idx + 1..];
        if !ext.is_empty()
            && ext
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return format!("{}_import{}.{}", &filename[..idx], index, ext);
        }
    }
    format!("{filename}_import{index}")
}

pub(crate) fn has_extension(path: &str, ext: &str) -> bool {
    path.len() >= ext.len()
        && path.as_bytes()[path.len() - ext.len()..].eq_ignore_ascii_case(ext.as_bytes())
}

/// Rewrites a `.proto` name to its `.json` sibling.
pub(crate) fn swap_proto_extension(path: &str) -> String {
    debug_assert!(has_extension(path, ".proto"));
    format!("{}.json", &path[..path.len() - ".proto".len()])
}
