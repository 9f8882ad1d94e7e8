//! # Paginated Collection Fetching
//!
//! GitHub returns repositories, branches and tags as GraphQL connections of at
//! most 100 edges. [`fetch_all`] walks a connection page by page, following
//! `pageInfo.endCursor` until `hasNextPage` is false, and returns every record
//! in the order the API produced them.
//!
//! Each collection kind implements [`Collection`], which names its query
//! template, where the connection sits in the response, and how a node becomes
//! a record. A failure on any page discards everything accumulated so far.

use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::client::QueryTransport;
use crate::error::{Error, Result};
use crate::query::{QueryParameters, QueryTemplates};

/// Cursor state returned with every page.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
pub struct Edge<N> {
    pub node: N,
}

/// One page of a GraphQL connection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<N> {
    pub edges: Vec<Edge<N>>,
    pub page_info: PageInfo,
}

/// A remote collection that can be fetched page by page.
pub trait Collection {
    /// Node shape inside each edge.
    type Node: DeserializeOwned;
    /// Record handed back to callers.
    type Record;

    /// Base template name, without the `_pagination` suffix.
    const TEMPLATE: &'static str;

    /// JSON pointer from `data` to the connection object.
    const POINTER: &'static str;

    fn record(node: Self::Node) -> Result<Self::Record>;
}

#[derive(Debug, Deserialize)]
pub struct NamedNode {
    pub name: String,
}

/// Repository names of an organization.
pub struct Repositories;

impl Collection for Repositories {
    type Node = NamedNode;
    type Record = String;
    const TEMPLATE: &'static str = "repositories";
    const POINTER: &'static str = "/organization/repositories";

    fn record(node: NamedNode) -> Result<String> {
        Ok(node.name)
    }
}

/// Branch names of a repository.
pub struct Branches;

impl Collection for Branches {
    type Node = NamedNode;
    type Record = String;
    const TEMPLATE: &'static str = "branches";
    const POINTER: &'static str = "/organization/repository/refs";

    fn record(node: NamedNode) -> Result<String> {
        Ok(node.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Signature {
    pub name: Option<String>,
    pub date: Option<String>,
}

/// What a tag ref points at. Lightweight tags point at a commit, annotated
/// tags at a tag object.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
pub enum TagTarget {
    Commit { author: Option<Signature> },
    Tag { tagger: Option<Signature> },
}

#[derive(Debug, Deserialize)]
pub struct TagNode {
    pub name: String,
    pub target: TagTarget,
}

/// A tag with the date it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub name: String,
    pub tagged_date: String,
    pub tagger_name: Option<String>,
}

/// Tags of a repository.
pub struct Tags;

impl Collection for Tags {
    type Node = TagNode;
    type Record = TagRecord;
    const TEMPLATE: &'static str = "tags";
    const POINTER: &'static str = "/organization/repository/tags";

    fn record(node: TagNode) -> Result<TagRecord> {
        let signature = match node.target {
            TagTarget::Commit { author } => author,
            TagTarget::Tag { tagger } => tagger,
        };
        let signature =
            signature.ok_or_else(|| Error::decode(format!("tag {} has no signature", node.name)))?;
        let tagged_date = signature
            .date
            .ok_or_else(|| Error::decode(format!("tag {} has no date", node.name)))?;
        Ok(TagRecord {
            name: node.name,
            tagged_date,
            tagger_name: signature.name,
        })
    }
}

/// Fetch every record of collection `C` for the organization and repository
/// named in `parameters`.
///
/// # Errors
///
/// Any transport or query failure on any page aborts the fetch. A page whose
/// connection is missing or malformed, or that claims a next page without an
/// end cursor, is a `Decode` error.
pub fn fetch_all<C: Collection>(
    transport: &dyn QueryTransport,
    templates: &QueryTemplates,
    organization: &str,
    repository: &str,
) -> Result<Vec<C::Record>> {
    let mut parameters = QueryParameters::new(organization, repository, "", C::TEMPLATE);
    let mut records = Vec::new();
    let mut pages = 0usize;

    loop {
        let query = templates.query_for(&parameters)?;
        let data = transport.query(&query)?;
        let connection = decode_page::<C::Node>(&data, C::POINTER)?;
        pages += 1;

        for edge in connection.edges {
            records.push(C::record(edge.node)?);
        }

        if !connection.page_info.has_next_page {
            break;
        }
        let cursor = connection.page_info.end_cursor.ok_or_else(|| {
            Error::decode(format!(
                "{} page {} has a next page but no end cursor",
                C::TEMPLATE,
                pages
            ))
        })?;
        parameters.advance(cursor);
    }

    debug!(
        "fetched {} {} in {} page(s)",
        records.len(),
        C::TEMPLATE,
        pages
    );
    Ok(records)
}

fn decode_page<N: DeserializeOwned>(data: &Value, pointer: &str) -> Result<Connection<N>> {
    let connection = data
        .pointer(pointer)
        .filter(|v| !v.is_null())
        .ok_or_else(|| Error::decode(format!("response has no connection at {}", pointer)))?;
    Connection::deserialize(connection)
        .map_err(|e| Error::decode(format!("unexpected connection at {}: {}", pointer, e)))
}
