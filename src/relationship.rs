//! Relationship Proxy
//!
//! Lazy handles for to-one and to-many relationships. A proxy starts
//! unresolved, fetches the related resource(s) on first read, and tracks
//! local mutations: `replace` defers to the owner's next `update()`, while
//! `append` posts to the relationship endpoint immediately.

use crate::client::Api;
use crate::document;
use crate::error::{Error, Result};
use crate::model::{sparse_fields, Node, Resource, Schema};
use std::marker::PhantomData;

/// Page size used when paginating through a related collection.
const RELATED_PAGE_SIZE: &str = "100";

/// Value of one relationship slot.
#[derive(Debug, Clone)]
pub(crate) enum RelationshipState {
    /// Not fetched yet. Identifier linkage seen in a decoded document is
    /// remembered so `linked_id(s)` can answer without a request.
    Unresolved {
        identifiers: Option<Vec<(String, String)>>,
    },
    /// Resolved to-one value, possibly null.
    One(Option<Node>),
    /// Resolved ordered collection.
    Many(Vec<Node>),
}

/// Relationship state plus its sync marker. `dirty` means the value was
/// replaced locally and goes out with the owner's next `update()`.
#[derive(Debug, Clone)]
pub(crate) struct RelationshipSlot {
    pub(crate) state: RelationshipState,
    pub(crate) dirty: bool,
}

impl RelationshipSlot {
    pub(crate) fn unresolved() -> Self {
        Self {
            state: RelationshipState::Unresolved { identifiers: None },
            dirty: false,
        }
    }

    pub(crate) fn resolved(state: RelationshipState) -> Self {
        Self {
            state,
            dirty: false,
        }
    }

    pub(crate) fn pending(state: RelationshipState) -> Self {
        Self { state, dirty: true }
    }

    pub(crate) fn is_unresolved(&self) -> bool {
        matches!(self.state, RelationshipState::Unresolved { .. })
    }
}

fn relationship_url(api: &Api, owner: &Node, name: &str) -> Result<String> {
    let owner_id = owner.id().ok_or(Error::Unpersisted)?;
    Ok(api.endpoint(&format!(
        "{}/{}/relationships/{}",
        owner.type_name(),
        owner_id,
        name
    )))
}

/// `include` plus sparse-fieldset parameters for a relationship fetch, so the
/// identifiers in `data` arrive together with the full resources in `included`.
fn inclusion_params(name: &str, target: &Schema) -> Vec<(String, String)> {
    let mut params = vec![("include".to_string(), name.to_string())];
    params.extend(sparse_fields(target));
    params
}

/// Lazy handle for a to-one relationship.
pub struct ToOne<T> {
    owner: Node,
    name: &'static str,
    target: PhantomData<fn() -> T>,
}

impl<T: Resource> ToOne<T> {
    #[doc(hidden)]
    pub fn new(owner: Node, name: &'static str) -> Self {
        Self {
            owner,
            name,
            target: PhantomData,
        }
    }

    /// The related resource, fetching it on first access.
    pub fn get(&self, api: &Api) -> Result<Option<T>> {
        if self.needs_fetch() {
            self.resolve(api)?;
        }
        let record = self.owner.0.borrow();
        match record.relationships.get(self.name).map(|slot| &slot.state) {
            Some(RelationshipState::One(value)) => {
                Ok(value.as_ref().map(|node| T::from_node(node.clone())))
            }
            Some(RelationshipState::Many(_)) => Err(Error::Document(format!(
                "relationship \"{}\" is multi-valued",
                self.name
            ))),
            _ => Ok(None),
        }
    }

    /// Fetch the relationship if it is unresolved. A resolved clean proxy is
    /// left untouched; a proxy with pending local changes is not refetched.
    pub fn resolve(&self, api: &Api) -> Result<()> {
        {
            let record = self.owner.0.borrow();
            if let Some(slot) = record.relationships.get(self.name) {
                if slot.dirty {
                    return Err(Error::PendingChanges {
                        relationship: self.name.to_string(),
                    });
                }
                if !slot.is_unresolved() {
                    return Ok(());
                }
            }
        }
        self.force_resolve(api)
    }

    /// Refetch unconditionally, discarding any pending local replacement.
    pub fn force_resolve(&self, api: &Api) -> Result<()> {
        let schema = T::schema();
        let url = relationship_url(api, &self.owner, self.name)?;
        let document = api
            .get(&url, inclusion_params(self.name, schema))?
            .ok_or_else(|| Error::Document("response had no body".to_string()))?;
        let value = document::decode_single(schema, &document)?;
        self.owner.set_slot(
            self.name,
            RelationshipSlot::resolved(RelationshipState::One(value)),
        );
        Ok(())
    }

    /// Replace the relationship value locally. Takes effect on the owner's
    /// next `update()`.
    pub fn replace(&self, value: Option<&T>) {
        let state = RelationshipState::One(value.map(|v| v.node().clone()));
        self.owner
            .set_slot(self.name, RelationshipSlot::pending(state));
    }

    /// Id of the related resource without fetching it, if locally known.
    pub fn linked_id(&self) -> Option<String> {
        let record = self.owner.0.borrow();
        match record.relationships.get(self.name).map(|slot| &slot.state) {
            Some(RelationshipState::Unresolved {
                identifiers: Some(identifiers),
            }) => identifiers.first().map(|(_, id)| id.clone()),
            Some(RelationshipState::One(Some(node))) => node.id(),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        let record = self.owner.0.borrow();
        record
            .relationships
            .get(self.name)
            .is_some_and(|slot| !slot.is_unresolved())
    }

    pub fn has_pending_changes(&self) -> bool {
        let record = self.owner.0.borrow();
        record
            .relationships
            .get(self.name)
            .is_some_and(|slot| slot.dirty)
    }

    fn needs_fetch(&self) -> bool {
        let record = self.owner.0.borrow();
        record
            .relationships
            .get(self.name)
            .is_none_or(RelationshipSlot::is_unresolved)
    }
}

/// Lazy handle for a to-many relationship.
pub struct ToMany<T> {
    owner: Node,
    name: &'static str,
    target: PhantomData<fn() -> T>,
}

impl<T: Resource> ToMany<T> {
    #[doc(hidden)]
    pub fn new(owner: Node, name: &'static str) -> Self {
        Self {
            owner,
            name,
            target: PhantomData,
        }
    }

    /// The related collection in server order, fetching it on first access.
    pub fn get(&self, api: &Api) -> Result<Vec<T>> {
        if self.needs_fetch() {
            self.resolve(api)?;
        }
        let record = self.owner.0.borrow();
        match record.relationships.get(self.name).map(|slot| &slot.state) {
            Some(RelationshipState::Many(nodes)) => Ok(nodes
                .iter()
                .map(|node| T::from_node(node.clone()))
                .collect()),
            Some(RelationshipState::One(_)) => Err(Error::Document(format!(
                "relationship \"{}\" is single-valued",
                self.name
            ))),
            _ => Ok(Vec::new()),
        }
    }

    /// Ids of the related resources, fetching the collection if needed.
    /// Entries without an id (unpersisted local replacements) are skipped.
    pub fn ids(&self, api: &Api) -> Result<Vec<String>> {
        if self.needs_fetch() {
            self.resolve(api)?;
        }
        let record = self.owner.0.borrow();
        match record.relationships.get(self.name).map(|slot| &slot.state) {
            Some(RelationshipState::Many(nodes)) => {
                Ok(nodes.iter().filter_map(Node::id).collect())
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Fetch the collection if it is unresolved; see [`ToOne::resolve`].
    pub fn resolve(&self, api: &Api) -> Result<()> {
        {
            let record = self.owner.0.borrow();
            if let Some(slot) = record.relationships.get(self.name) {
                if slot.dirty {
                    return Err(Error::PendingChanges {
                        relationship: self.name.to_string(),
                    });
                }
                if !slot.is_unresolved() {
                    return Ok(());
                }
            }
        }
        self.force_resolve(api)
    }

    /// Refetch all pages unconditionally, discarding pending local changes.
    pub fn force_resolve(&self, api: &Api) -> Result<()> {
        let schema = T::schema();
        let url = relationship_url(api, &self.owner, self.name)?;
        let mut params = inclusion_params(self.name, schema);
        params.push(("page[size]".to_string(), RELATED_PAGE_SIZE.to_string()));

        let mut nodes = Vec::new();
        let mut document = api
            .get(&url, params)?
            .ok_or_else(|| Error::Document("response had no body".to_string()))?;
        loop {
            let page = document::decode_many(schema, &document)?;
            nodes.extend(page.nodes);
            match page.next {
                Some(next) => {
                    let next_url = api.resolve_link(&next)?;
                    document = api
                        .get(&next_url, Vec::new())?
                        .ok_or_else(|| Error::Document("response had no body".to_string()))?;
                }
                None => break,
            }
        }

        self.owner.set_slot(
            self.name,
            RelationshipSlot::resolved(RelationshipState::Many(nodes)),
        );
        Ok(())
    }

    /// Replace the whole collection locally. Takes effect on the owner's
    /// next `update()`.
    pub fn replace(&self, values: &[T]) {
        let nodes = values.iter().map(|v| v.node().clone()).collect();
        self.owner
            .set_slot(self.name, RelationshipSlot::pending(RelationshipState::Many(nodes)));
    }

    /// Add resources to the relationship immediately, without waiting for an
    /// `update()` on the owner. Owner and all targets must be persisted. On
    /// success a resolved local collection is extended in place; an
    /// unresolved one stays unresolved and refetches on next read.
    pub fn append(&self, api: &Api, values: &[T]) -> Result<()> {
        let nodes: Vec<Node> = values.iter().map(|v| v.node().clone()).collect();
        let body = document::encode_identifiers(&nodes)?;
        let url = relationship_url(api, &self.owner, self.name)?;
        api.post(&url, body)?;

        let mut record = self.owner.0.borrow_mut();
        let slot = record
            .relationships
            .entry(self.name.to_string())
            .or_insert_with(RelationshipSlot::unresolved);
        if let RelationshipState::Many(existing) = &mut slot.state {
            existing.extend(nodes);
        }
        tracing::debug!(
            "appended {} resources to {}",
            values.len(),
            self.name
        );
        Ok(())
    }

    /// Ids from identifier linkage or a resolved collection, without a request.
    pub fn linked_ids(&self) -> Option<Vec<String>> {
        let record = self.owner.0.borrow();
        match record.relationships.get(self.name).map(|slot| &slot.state) {
            Some(RelationshipState::Unresolved {
                identifiers: Some(identifiers),
            }) => Some(identifiers.iter().map(|(_, id)| id.clone()).collect()),
            Some(RelationshipState::Many(nodes)) => {
                Some(nodes.iter().filter_map(Node::id).collect())
            }
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        let record = self.owner.0.borrow();
        record
            .relationships
            .get(self.name)
            .is_some_and(|slot| !slot.is_unresolved())
    }

    pub fn has_pending_changes(&self) -> bool {
        let record = self.owner.0.borrow();
        record
            .relationships
            .get(self.name)
            .is_some_and(|slot| slot.dirty)
    }

    fn needs_fetch(&self) -> bool {
        let record = self.owner.0.borrow();
        record
            .relationships
            .get(self.name)
            .is_none_or(RelationshipSlot::is_unresolved)
    }
}
