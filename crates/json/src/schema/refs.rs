use super::NodeId;
use url::Url;

/// Index of a Reference within its Ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefId(pub usize);

/// Reference is a `$ref` keyword, recorded when its schema was built and
/// resolved only once every document of the compilation is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// Verbatim text of the `$ref` keyword.
    pub text: String,
    /// URI of the schema holding the `$ref`.
    pub from_uri: Url,
    /// Base URI in effect at the schema holding the `$ref`.
    pub from_base_uri: Url,
    /// Resolved target URI, or None if `text` isn't a valid URI reference.
    pub to_uri: Option<Url>,
    /// Fragment-less form of `to_uri`: the resource which must hold the target.
    pub to_base_uri: Option<Url>,
    /// Outcome of resolution, or None if the reference hasn't been resolved.
    pub resolution: Option<Resolution>,
}

impl Reference {
    /// Returns the resolved target Node, if any.
    pub fn target(&self) -> Option<NodeId> {
        match &self.resolution {
            Some(Resolution::Node(id)) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Node(NodeId),
    Dangling(Dangling),
}

/// Dangling describes why a Reference has no target.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Dangling {
    #[error("not a valid URI reference")]
    InvalidUri,
    #[error("no schema is registered with URI '{0}'")]
    MissingResource(String),
    #[error("JSON pointer segment '{segment}' does not exist within '{resource}'")]
    MissingPointer { resource: String, segment: String },
    #[error("anchor '{anchor}' does not exist within '{resource}'")]
    MissingAnchor { resource: String, anchor: String },
}

impl Dangling {
    /// A missing resource contributes nothing to a synthesized type, while
    /// other dangling references stand in for any value.
    pub fn is_missing_resource(&self) -> bool {
        matches!(self, Dangling::MissingResource(_))
    }
}

/// Ledger is the ordered record of every Reference of a Graph.
#[derive(Debug, Default)]
pub struct Ledger(Vec<Reference>);

impl Ledger {
    pub fn push(&mut self, reference: Reference) -> RefId {
        self.0.push(reference);
        RefId(self.0.len() - 1)
    }

    pub fn get(&self, id: RefId) -> &Reference {
        &self.0[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: RefId) -> &mut Reference {
        &mut self.0[id.0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RefId, &Reference)> {
        self.0.iter().enumerate().map(|(ind, r)| (RefId(ind), r))
    }

    /// Iterate over References which resolved to no Node.
    pub fn dangling(&self) -> impl Iterator<Item = (RefId, &Reference, &Dangling)> {
        self.iter().filter_map(|(id, r)| match &r.resolution {
            Some(Resolution::Dangling(dangling)) => Some((id, r, dangling)),
            _ => None,
        })
    }
}
