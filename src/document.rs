//! Document Codec
//!
//! Translates between JSON:API documents and the shared record graph.
//! Decoding runs in two passes over `data` plus `included`: the first absorbs
//! every resource object into a per-document pool keyed by `(type, id)` so
//! repeated identifiers alias one [`Node`], the second wires relationship
//! linkage against that pool. Encoding renders a single resource for create
//! or update, writing only the members the action allows.

use crate::error::{Error, Result};
use crate::model::{Node, Schema};
use crate::relationship::{RelationshipSlot, RelationshipState};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Which sync operation a document is encoded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Create,
    Update,
}

/// One decoded page of a collection document.
#[derive(Debug)]
pub(crate) struct DecodedPage {
    pub(crate) nodes: Vec<Node>,
    pub(crate) next: Option<String>,
}

/// Per-document identity pool. Every resource object with the same
/// `(type, id)` maps to the same node, so linkage and `included` entries
/// share one record.
struct Pool {
    records: HashMap<(String, String), Node>,
}

impl Pool {
    fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Pre-register an existing node so the document merges into it instead
    /// of creating a fresh record.
    fn seed(&mut self, type_name: &str, id: &str, node: Node) {
        self.records
            .insert((type_name.to_string(), id.to_string()), node);
    }

    fn get(&self, type_name: &str, id: &str) -> Option<Node> {
        self.records
            .get(&(type_name.to_string(), id.to_string()))
            .cloned()
    }

    fn get_or_create(&mut self, type_name: &str, id: &str) -> Node {
        self.records
            .entry((type_name.to_string(), id.to_string()))
            .or_insert_with(|| Node::decoded(type_name, id))
            .clone()
    }

    /// First pass: merge a resource object's attributes into its pooled node.
    fn absorb(&mut self, value: &Value) -> Result<Node> {
        let (type_name, id) = identifier_of(value)?;
        let node = self.get_or_create(&type_name, &id);
        if let Some(attributes) = value.get("attributes") {
            let attributes = attributes.as_object().ok_or_else(|| {
                Error::Document("resource attributes are not an object".to_string())
            })?;
            let mut record = node.0.borrow_mut();
            for (name, attr_value) in attributes {
                record.attributes.insert(name.clone(), attr_value.clone());
            }
        }
        Ok(node)
    }

    /// Second pass: record relationship linkage on the owning node. Entries
    /// without a `data` member carry no linkage and are skipped.
    fn wire_relationships(&self, value: &Value) -> Result<()> {
        let Some(relationships) = value.get("relationships") else {
            return Ok(());
        };
        let relationships = relationships.as_object().ok_or_else(|| {
            Error::Document("relationships member is not an object".to_string())
        })?;
        let (type_name, id) = identifier_of(value)?;
        let Some(owner) = self.get(&type_name, &id) else {
            return Ok(());
        };
        for (name, entry) in relationships {
            let Some(linkage) = entry.get("data") else {
                continue;
            };
            let state = self.linkage_state(linkage)?;
            owner.set_slot(name, RelationshipSlot::resolved(state));
        }
        Ok(())
    }

    /// Linkage becomes a resolved state when every referenced resource is in
    /// the pool, otherwise an unresolved state that remembers the identifiers.
    fn linkage_state(&self, linkage: &Value) -> Result<RelationshipState> {
        match linkage {
            Value::Null => Ok(RelationshipState::One(None)),
            Value::Object(_) => {
                let (type_name, id) = identifier_of(linkage)?;
                Ok(match self.get(&type_name, &id) {
                    Some(node) => RelationshipState::One(Some(node)),
                    None => RelationshipState::Unresolved {
                        identifiers: Some(vec![(type_name, id)]),
                    },
                })
            }
            Value::Array(items) => {
                let mut identifiers = Vec::with_capacity(items.len());
                let mut nodes = Vec::with_capacity(items.len());
                let mut complete = true;
                for item in items {
                    let (type_name, id) = identifier_of(item)?;
                    match self.get(&type_name, &id) {
                        Some(node) if complete => nodes.push(node),
                        _ => complete = false,
                    }
                    identifiers.push((type_name, id));
                }
                Ok(if complete {
                    RelationshipState::Many(nodes)
                } else {
                    RelationshipState::Unresolved {
                        identifiers: Some(identifiers),
                    }
                })
            }
            _ => Err(Error::Document(
                "relationship linkage is neither null, an identifier, nor an array".to_string(),
            )),
        }
    }
}

fn identifier_of(value: &Value) -> Result<(String, String)> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::Document("resource object is not an object".to_string()))?;
    let type_name = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Document("resource object is missing its type".to_string()))?;
    let id = object.get("id").and_then(Value::as_str).ok_or_else(|| {
        Error::Document(format!(
            "resource object of type \"{type_name}\" is missing its id"
        ))
    })?;
    Ok((type_name.to_string(), id.to_string()))
}

fn root_object(document: &Value) -> Result<&Map<String, Value>> {
    document
        .as_object()
        .ok_or_else(|| Error::Document("response document is not an object".to_string()))
}

fn included_items(root: &Map<String, Value>) -> Result<&[Value]> {
    match root.get("included") {
        None => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(Error::Document(
            "included member is not an array".to_string(),
        )),
    }
}

fn expect_type(schema: &Schema, type_name: &str) -> Result<()> {
    if type_name != schema.type_name {
        return Err(Error::Document(format!(
            "expected a resource of type \"{}\", got \"{}\"",
            schema.type_name, type_name
        )));
    }
    Ok(())
}

fn next_link(root: &Map<String, Value>) -> Result<Option<String>> {
    let links = match root.get("links") {
        None => return Ok(None),
        Some(links) => links
            .as_object()
            .ok_or_else(|| Error::Document("links member is not an object".to_string()))?,
    };
    match links.get("next") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(next)) => Ok(Some(next.clone())),
        Some(_) => Err(Error::Document("next link is not a string".to_string())),
    }
}

/// Decode a single-resource document. `data: null` is a valid document and
/// yields `None`.
pub(crate) fn decode_single(schema: &Schema, document: &Value) -> Result<Option<Node>> {
    let root = root_object(document)?;
    let data = match root.get("data") {
        None | Some(Value::Null) => return Ok(None),
        Some(data) => data,
    };
    if !data.is_object() {
        return Err(Error::Document(
            "primary data is not a resource object".to_string(),
        ));
    }

    let mut pool = Pool::new();
    let primary = pool.absorb(data)?;
    let included = included_items(root)?;
    for item in included {
        pool.absorb(item)?;
    }
    expect_type(schema, &primary.type_name())?;

    pool.wire_relationships(data)?;
    for item in included {
        pool.wire_relationships(item)?;
    }
    Ok(Some(primary))
}

/// Decode one page of a collection document, preserving server order.
pub(crate) fn decode_many(schema: &Schema, document: &Value) -> Result<DecodedPage> {
    let root = root_object(document)?;
    let items: &[Value] = match root.get("data") {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(Error::Document("primary data is not an array".to_string()));
        }
    };

    let mut pool = Pool::new();
    let mut nodes = Vec::with_capacity(items.len());
    for item in items {
        nodes.push(pool.absorb(item)?);
    }
    let included = included_items(root)?;
    for item in included {
        pool.absorb(item)?;
    }
    for node in &nodes {
        expect_type(schema, &node.type_name())?;
    }

    for item in items {
        pool.wire_relationships(item)?;
    }
    for item in included {
        pool.wire_relationships(item)?;
    }
    Ok(DecodedPage {
        nodes,
        next: next_link(root)?,
    })
}

/// Merge a create or update response into the instance that issued it. The
/// node keeps local attributes the server did not echo; echoed attributes are
/// overwritten and echoed relationship linkage resolves the matching slots.
pub(crate) fn merge_response(schema: &Schema, node: &Node, document: &Value) -> Result<()> {
    let root = root_object(document)?;
    let data = match root.get("data") {
        None | Some(Value::Null) => return Ok(()),
        Some(data) => data,
    };
    let (type_name, id) = identifier_of(data)?;
    expect_type(schema, &type_name)?;
    node.0.borrow_mut().id = Some(id.clone());

    let mut pool = Pool::new();
    pool.seed(&type_name, &id, node.clone());
    pool.absorb(data)?;
    let included = included_items(root)?;
    for item in included {
        pool.absorb(item)?;
    }

    pool.wire_relationships(data)?;
    for item in included {
        pool.wire_relationships(item)?;
    }
    Ok(())
}

/// Encode one resource for the given action. Create writes every set
/// attribute the wire accepts on creation; update writes only locally
/// changed attributes that remain writable. Read-only attributes never
/// serialize. The `attributes` member is always present, even when empty.
pub(crate) fn encode_resource(
    schema: &Schema,
    node: &Node,
    action: Action,
    meta: Option<Value>,
) -> Result<Value> {
    let record = node.0.borrow();

    let mut attributes = Map::new();
    for attr in schema.attributes {
        let include = match action {
            Action::Create => attr.write.on_create() && record.attributes.contains_key(attr.name),
            Action::Update => attr.write.on_update() && record.dirty.contains(attr.name),
        };
        if include {
            if let Some(value) = record.attributes.get(attr.name) {
                attributes.insert(attr.name.to_string(), value.clone());
            }
        }
    }

    let mut data = Map::new();
    data.insert("type".to_string(), Value::String(record.type_name.clone()));
    if let Some(id) = &record.id {
        data.insert("id".to_string(), Value::String(id.clone()));
    }
    data.insert("attributes".to_string(), Value::Object(attributes));

    let mut relationships = Map::new();
    for rel in schema.relationships {
        let Some(slot) = record.relationships.get(rel.name) else {
            continue;
        };
        if action == Action::Update && !slot.dirty {
            continue;
        }
        let linkage = match &slot.state {
            RelationshipState::Unresolved { .. } => continue,
            RelationshipState::One(None) => Value::Null,
            RelationshipState::One(Some(target)) => target.identifier()?,
            RelationshipState::Many(targets) => Value::Array(
                targets
                    .iter()
                    .map(Node::identifier)
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        relationships.insert(rel.name.to_string(), json!({ "data": linkage }));
    }
    if !relationships.is_empty() {
        data.insert("relationships".to_string(), Value::Object(relationships));
    }

    let mut doc = Map::new();
    doc.insert("data".to_string(), Value::Object(data));
    if let Some(meta) = meta {
        doc.insert("meta".to_string(), meta);
    }
    Ok(Value::Object(doc))
}

/// Encode a bare identifier collection, as posted to relationship endpoints.
pub(crate) fn encode_identifiers(nodes: &[Node]) -> Result<Value> {
    let identifiers = nodes
        .iter()
        .map(Node::identifier)
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({ "data": identifiers }))
}
