use std::collections::HashMap;

use crate::container::ContainerIndex;

/// Name of the pickle entry describing the saved object graph, relative to the root.
pub const DESCRIPTOR_NAME: &str = "data.pkl";
/// Directory holding tensor storages, relative to the root.
pub const PAYLOAD_DIR: &str = "data";
/// Root used when the archive layout gives no hint.
pub const DEFAULT_ROOT: &str = "archive";

/// Tensor payload entries of an archive, keyed by their storage identifier.
///
/// Payload entries are named `<root>/data/<id>` and the descriptor stream is
/// `<root>/data.pkl`.
#[derive(Debug, Clone)]
pub struct TensorCatalog {
    root: String,
    payloads: HashMap<String, usize>,
    descriptor: Option<usize>,
    entry_count: usize,
}

impl TensorCatalog {
    /// Collects the payload entries of `index`, detecting the root unless `root` is given.
    pub fn new(index: &ContainerIndex, root: Option<&str>) -> Self {
        let root = match root {
            Some(root) => root.trim_end_matches('/').to_string(),
            None => detect_root(index),
        };

        let prefix = format!("{root}/{PAYLOAD_DIR}/");
        let payloads = index
            .entries()
            .iter()
            .enumerate()
            .filter_map(|(position, entry)| {
                let id = entry.name().strip_prefix(&prefix)?;
                (!id.is_empty() && !id.contains('/')).then(|| (id.to_string(), position))
            })
            .collect();

        let descriptor = index.index_of(&format!("{root}/{DESCRIPTOR_NAME}"));

        Self {
            root,
            payloads,
            descriptor,
            entry_count: index.len(),
        }
    }

    /// Top level directory of the archive.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Number of tensor payload entries.
    pub fn payload_count(&self) -> usize {
        self.payloads.len()
    }

    /// Number of entries in the whole archive.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Catalog position of the payload entry with the given identifier.
    pub fn lookup(&self, id: &str) -> Option<usize> {
        self.payloads.get(id).copied()
    }

    /// Identifiers of every payload entry, in no particular order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.payloads.keys().map(String::as_str)
    }

    /// Catalog position of the descriptor stream entry, if present.
    pub fn descriptor(&self) -> Option<usize> {
        self.descriptor
    }

    /// Full name of the descriptor stream entry.
    pub fn descriptor_name(&self) -> String {
        format!("{}/{DESCRIPTOR_NAME}", self.root)
    }
}

/// Finds the top level directory shared by the archive entries.
///
/// `torch.save` names it after the saved file (`archive` by default), so it is taken from the
/// descriptor entry when there is one.
pub fn detect_root(index: &ContainerIndex) -> String {
    let suffix = format!("/{DESCRIPTOR_NAME}");
    let from_descriptor = index
        .entries()
        .iter()
        .find_map(|entry| entry.name().strip_suffix(&suffix));

    if let Some(root) = from_descriptor {
        return root.to_string();
    }

    index
        .entries()
        .iter()
        .find_map(|entry| entry.name().split_once('/').map(|(root, _)| root))
        .unwrap_or(DEFAULT_ROOT)
        .to_string()
}
