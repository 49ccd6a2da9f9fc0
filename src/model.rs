//! Resource Model
//!
//! Schema descriptors, the shared record handle and the [`Resource`] trait
//! carrying the create/update/delete lifecycle. Resource types are declared
//! with the [`resource!`](crate::resource!) macro, which emits the schema and
//! the typed accessors; everything in this module works on the untyped record
//! underneath.

use crate::client::Api;
use crate::config::EmptyUpdate;
use crate::document::{self, Action};
use crate::error::{Error, Result};
use crate::query::{FilterValue, Query};
use crate::relationship::RelationshipSlot;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// When an attribute is sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Sent on create and update.
    CreateAndUpdate,
    /// Sent on create, immutable afterwards.
    CreateOnly,
    /// Never sent, the server manages the value.
    ReadOnly,
}

impl WriteMode {
    pub(crate) fn on_create(self) -> bool {
        !matches!(self, WriteMode::ReadOnly)
    }

    pub(crate) fn on_update(self) -> bool {
        matches!(self, WriteMode::CreateAndUpdate)
    }
}

/// One declared attribute of a resource type.
#[derive(Debug, Clone, Copy)]
pub struct AttributeDef {
    /// Attribute name on the wire, camelCase as the backend spells it.
    pub name: &'static str,
    pub write: WriteMode,
}

/// Whether a relationship holds one target or an ordered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// One declared relationship of a resource type.
#[derive(Debug, Clone, Copy)]
pub struct RelationshipDef {
    /// Relationship name on the wire.
    pub name: &'static str,
    /// Schema of the target resource type.
    pub target: fn() -> &'static Schema,
    pub cardinality: Cardinality,
}

/// Static descriptor of a resource type: its wire name, attributes and
/// relationships. Emitted once per type by the `resource!` macro.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    /// The JSON:API `type` string.
    pub type_name: &'static str,
    pub attributes: &'static [AttributeDef],
    pub relationships: &'static [RelationshipDef],
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Comma-joined attribute names for `fields[type]` parameters.
    pub fn field_names(&self) -> String {
        self.attributes
            .iter()
            .map(|a| a.name)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Sparse-fieldset query parameter restricting responses to declared attributes.
pub(crate) fn sparse_fields(schema: &Schema) -> Vec<(String, String)> {
    let fields = schema.field_names();
    if fields.is_empty() {
        Vec::new()
    } else {
        vec![(format!("fields[{}]", schema.type_name), fields)]
    }
}

/// In-memory state of one resource instance.
#[derive(Debug, Default)]
pub(crate) struct Record {
    pub(crate) type_name: String,
    /// Server-assigned id, `None` until created.
    pub(crate) id: Option<String>,
    /// Attribute values by wire name, including undeclared ones.
    pub(crate) attributes: Map<String, Value>,
    /// Wire names of attributes changed since the last successful sync.
    pub(crate) dirty: BTreeSet<String>,
    pub(crate) relationships: BTreeMap<String, RelationshipSlot>,
    /// Set after a successful delete; further syncs are rejected.
    pub(crate) deleted: bool,
}

/// Shared handle onto one resource record.
///
/// Clones alias the same record, so all handles produced by one decode pass
/// observe each other's mutations. Handles are reference counted and stay on
/// one thread.
#[derive(Clone)]
pub struct Node(pub(crate) Rc<RefCell<Record>>);

impl Node {
    pub(crate) fn new_record(type_name: &str) -> Self {
        Self(Rc::new(RefCell::new(Record {
            type_name: type_name.to_string(),
            ..Record::default()
        })))
    }

    /// Record for a resource decoded from a document, id already known.
    pub(crate) fn decoded(type_name: &str, id: &str) -> Self {
        Self(Rc::new(RefCell::new(Record {
            type_name: type_name.to_string(),
            id: Some(id.to_string()),
            ..Record::default()
        })))
    }

    /// True when both handles alias the same record.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn id(&self) -> Option<String> {
        self.0.borrow().id.clone()
    }

    #[doc(hidden)]
    pub fn type_name(&self) -> String {
        self.0.borrow().type_name.clone()
    }

    #[doc(hidden)]
    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.0.borrow().attributes.get(name).cloned()
    }

    #[doc(hidden)]
    pub fn set_attribute(&self, name: &str, value: Value) {
        let mut record = self.0.borrow_mut();
        record.attributes.insert(name.to_string(), value);
        record.dirty.insert(name.to_string());
    }

    pub(crate) fn is_deleted(&self) -> bool {
        self.0.borrow().deleted
    }

    pub(crate) fn mark_deleted(&self) {
        self.0.borrow_mut().deleted = true;
    }

    pub(crate) fn set_slot(&self, name: &str, slot: RelationshipSlot) {
        self.0
            .borrow_mut()
            .relationships
            .insert(name.to_string(), slot);
    }

    /// JSON:API resource identifier, `{"type": ..., "id": ...}`.
    pub(crate) fn identifier(&self) -> Result<Value> {
        let record = self.0.borrow();
        let id = record.id.as_ref().ok_or(Error::Unpersisted)?;
        Ok(serde_json::json!({"type": record.type_name, "id": id}))
    }

    /// True while any attribute or relationship change awaits an `update()`.
    pub fn has_pending_changes(&self) -> bool {
        let record = self.0.borrow();
        !record.dirty.is_empty() || record.relationships.values().any(|slot| slot.dirty)
    }

    /// Clear sync markers after a successful create or update. Relationship
    /// slots still dirty fall back to unresolved so the next read refetches
    /// the authoritative value.
    pub(crate) fn finish_sync(&self) {
        let mut record = self.0.borrow_mut();
        record.dirty.clear();
        for slot in record.relationships.values_mut() {
            if slot.dirty {
                *slot = RelationshipSlot::unresolved();
            }
        }
    }

    /// Overwrite local attributes with another record's, dropping local edits.
    pub(crate) fn replace_attributes_from(&self, other: &Node) {
        let fresh = other.0.borrow().attributes.clone();
        let mut record = self.0.borrow_mut();
        record.attributes = fresh;
        record.dirty.clear();
    }

    #[doc(hidden)]
    pub fn same_identity_and_attributes(&self, other: &Node) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let a = self.0.borrow();
        let b = other.0.borrow();
        a.type_name == b.type_name && a.id == b.id && a.attributes == b.attributes
    }

    /// Debug formatting used by generated resource types: id plus the first
    /// few attributes, never recursing into relationships.
    #[doc(hidden)]
    pub fn debug_fmt(&self, name: &str, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const CUTOFF: usize = 3;
        let record = self.0.borrow();
        let mut builder = f.debug_struct(name);
        builder.field("id", &record.id);
        for (key, value) in record.attributes.iter().take(CUTOFF) {
            builder.field(key, value);
        }
        if record.attributes.len() > CUTOFF {
            builder.finish_non_exhaustive()
        } else {
            builder.finish()
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(record) => write!(
                f,
                "Node({} {})",
                record.type_name,
                record.id.as_deref().unwrap_or("-")
            ),
            Err(_) => f.write_str("Node(<borrowed>)"),
        }
    }
}

#[doc(hidden)]
pub fn to_json<T: serde::Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[doc(hidden)]
pub fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> Option<T> {
    serde_json::from_value(value).ok()
}

/// A typed JSON:API resource backed by a shared record.
///
/// The declared operations mirror the protocol: `create` POSTs the instance,
/// `update` PATCHes the changed fields, `delete` removes it remotely. All of
/// them block until the server answers and surface failures as [`Error`].
pub trait Resource: Sized {
    /// Static schema describing attributes and relationships on the wire.
    fn schema() -> &'static Schema;

    #[doc(hidden)]
    fn node(&self) -> &Node;

    #[doc(hidden)]
    fn from_node(node: Node) -> Self;

    /// Fresh unpersisted instance with nothing set.
    fn new() -> Self {
        Self::from_node(Node::new_record(Self::schema().type_name))
    }

    /// Server-assigned id, `None` until [`create`](Resource::create) succeeds.
    fn id(&self) -> Option<String> {
        self.node().id()
    }

    fn is_persisted(&self) -> bool {
        self.node().id().is_some()
    }

    /// Untyped read of a wire attribute, including undeclared ones the
    /// server sent along.
    fn raw_attribute(&self, name: &str) -> Option<Value> {
        self.node().attribute(name)
    }

    /// Start an unfiltered query over this resource type.
    fn query() -> Query<Self> {
        Query::new()
    }

    /// Shorthand for `query().filter(...)`.
    fn filter(attribute: &str, operator: &str, value: impl Into<FilterValue>) -> Query<Self> {
        Query::new().filter(attribute, operator, value)
    }

    /// Fetch one resource by id. Answers [`Error::NotFound`] when the id does
    /// not exist.
    fn get(api: &Api, id: &str) -> Result<Self> {
        let schema = Self::schema();
        let url = api.endpoint(&format!("{}/{}", schema.type_name, id));
        let document = api
            .get(&url, sparse_fields(schema))?
            .ok_or_else(|| Error::Document("response had no body".to_string()))?;
        match document::decode_single(schema, &document)? {
            Some(node) => Ok(Self::from_node(node)),
            None => Err(Error::NotFound { errors: Vec::new() }),
        }
    }

    /// Create this instance remotely. On success the server-assigned id and
    /// any computed attributes are merged into the instance in place.
    fn create(&self, api: &Api) -> Result<()> {
        self.create_with_meta(api, None)
    }

    /// [`create`](Resource::create) with a document-level `meta` object.
    fn create_with_meta(&self, api: &Api, meta: Option<Value>) -> Result<()> {
        let schema = Self::schema();
        let node = self.node();
        if let Some(id) = node.id() {
            return Err(Error::PersistedAlready { id });
        }
        let body = document::encode_resource(schema, node, Action::Create, meta)?;
        let url = api.endpoint(schema.type_name);
        let document = api
            .post(&url, body)?
            .ok_or_else(|| Error::Document("create response had no body".to_string()))?;
        document::merge_response(schema, node, &document)?;
        node.finish_sync();
        tracing::debug!("created {} {:?}", schema.type_name, node.id());
        Ok(())
    }

    /// Send changed attributes and pending relationship replacements as a
    /// PATCH. Unchanged fields are omitted. On failure the pending markers
    /// are kept, so the same call can be retried.
    fn update(&self, api: &Api) -> Result<()> {
        self.update_with_meta(api, None)
    }

    /// [`update`](Resource::update) with a document-level `meta` object.
    fn update_with_meta(&self, api: &Api, meta: Option<Value>) -> Result<()> {
        let schema = Self::schema();
        let node = self.node();
        if node.is_deleted() {
            return Err(Error::StaleInstance);
        }
        let Some(id) = node.id() else {
            return Err(Error::Unpersisted);
        };
        if meta.is_none()
            && !node.has_pending_changes()
            && api.config().empty_update == EmptyUpdate::Skip
        {
            tracing::debug!("skipping update of {} {}, nothing changed", schema.type_name, id);
            return Ok(());
        }
        let body = document::encode_resource(schema, node, Action::Update, meta)?;
        let url = api.endpoint(&format!("{}/{}", schema.type_name, id));
        let document = api.patch(&url, body)?;
        if let Some(document) = &document {
            document::merge_response(schema, node, document)?;
        }
        node.finish_sync();
        Ok(())
    }

    /// Delete this resource remotely. The local instance becomes stale:
    /// further `update` or `delete` calls fail.
    fn delete(&self, api: &Api) -> Result<()> {
        self.delete_with_meta(api, None)
    }

    /// [`delete`](Resource::delete) with a `meta` object in the request body.
    fn delete_with_meta(&self, api: &Api, meta: Option<Value>) -> Result<()> {
        let schema = Self::schema();
        let node = self.node();
        if node.is_deleted() {
            return Err(Error::StaleInstance);
        }
        let Some(id) = node.id() else {
            return Err(Error::Unpersisted);
        };
        let body = serde_json::json!({ "meta": meta.unwrap_or_else(|| Value::Object(Map::new())) });
        let url = api.endpoint(&format!("{}/{}", schema.type_name, id));
        api.delete(&url, body)?;
        node.mark_deleted();
        tracing::debug!("deleted {} {}", schema.type_name, id);
        Ok(())
    }

    /// Refetch this instance by id and overwrite its attributes wholesale.
    /// Local attribute edits that were never synced are discarded.
    fn refresh(&self, api: &Api) -> Result<()> {
        let node = self.node();
        let Some(id) = node.id() else {
            return Err(Error::Unpersisted);
        };
        let fresh = Self::get(api, &id)?;
        node.replace_attributes_from(fresh.node());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Api;
    use crate::config::ApiConfig;
    use crate::http::{FakeTransport, Method};
    use crate::models::{Component, Membership, MonitoringList};
    use serde_json::json;

    fn test_api(fake: &FakeTransport) -> Api {
        let config = ApiConfig::new("test-token").with_base_url("https://example.com/api/v2");
        Api::with_transport(config, Box::new(fake.clone()))
    }

    fn skip_api(fake: &FakeTransport) -> Api {
        let config = ApiConfig::new("test-token")
            .with_base_url("https://example.com/api/v2")
            .with_empty_update(crate::config::EmptyUpdate::Skip);
        Api::with_transport(config, Box::new(fake.clone()))
    }

    #[test]
    fn create_posts_and_merges_the_response_in_place() {
        let fake = FakeTransport::new();
        fake.respond(
            201,
            json!({
                "data": {
                    "type": "monitoringLists",
                    "id": "77",
                    "attributes": {"name": "prod", "active": true, "createdAt": "2025-01-01T00:00:00Z"}
                }
            }),
        );
        let api = test_api(&fake);

        let list = MonitoringList::new();
        list.set_name("prod");
        list.create(&api).unwrap();

        assert_eq!(list.id().as_deref(), Some("77"));
        assert!(list.is_persisted());
        assert_eq!(list.active(), Some(true));
        assert_eq!(list.created_at().as_deref(), Some("2025-01-01T00:00:00Z"));

        let requests = fake.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, "https://example.com/api/v2/monitoringLists");
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["data"]["type"], "monitoringLists");
        assert_eq!(body["data"]["attributes"]["name"], "prod");
        assert!(body["data"].get("id").is_none());
    }

    #[test]
    fn second_create_fails_locally() {
        let fake = FakeTransport::new();
        fake.respond(
            201,
            json!({"data": {"type": "monitoringLists", "id": "1", "attributes": {}}}),
        );
        let api = test_api(&fake);

        let list = MonitoringList::new();
        list.set_name("x");
        list.create(&api).unwrap();

        let err = list.create(&api).unwrap_err();
        assert!(matches!(err, Error::PersistedAlready { id } if id == "1"));
        assert_eq!(fake.requests().len(), 1);
    }

    #[test]
    fn update_sends_only_dirty_update_writable_attributes() {
        let fake = FakeTransport::new();
        fake.respond(
            200,
            json!({
                "data": {
                    "type": "memberships",
                    "id": "5",
                    "attributes": {"userName": "jane", "role": "member", "expiresAt": "2026-01-01"}
                }
            }),
        );
        fake.respond(
            200,
            json!({"data": {"type": "memberships", "id": "5", "attributes": {"expiresAt": "2027-01-01"}}}),
        );
        let api = test_api(&fake);

        let membership = Membership::get(&api, "5").unwrap();
        membership.set_expires_at("2027-01-01");
        membership.update(&api).unwrap();

        let requests = fake.requests();
        assert_eq!(requests[1].method, Method::Patch);
        assert_eq!(requests[1].url, "https://example.com/api/v2/memberships/5");
        let attrs = requests[1].body.as_ref().unwrap()["data"]["attributes"]
            .as_object()
            .unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs["expiresAt"], "2027-01-01");
        assert_eq!(requests[1].body.as_ref().unwrap()["data"]["id"], "5");
    }

    #[test]
    fn create_only_attributes_are_excluded_from_updates() {
        let fake = FakeTransport::new();
        fake.respond(
            200,
            json!({"data": {"type": "memberships", "id": "5", "attributes": {"role": "member"}}}),
        );
        fake.respond(
            200,
            json!({"data": {"type": "memberships", "id": "5", "attributes": {}}}),
        );
        let api = test_api(&fake);

        let membership = Membership::get(&api, "5").unwrap();
        membership.set_role("admin");
        membership.set_expires_at("2030-01-01");
        membership.update(&api).unwrap();

        let attrs = fake.requests()[1].body.as_ref().unwrap()["data"]["attributes"]
            .as_object()
            .unwrap()
            .clone();
        assert!(attrs.contains_key("expiresAt"));
        assert!(!attrs.contains_key("role"));
    }

    #[test]
    fn update_without_id_fails_locally() {
        let fake = FakeTransport::new();
        let api = test_api(&fake);
        let list = MonitoringList::new();
        assert!(matches!(list.update(&api), Err(Error::Unpersisted)));
        assert!(fake.requests().is_empty());
    }

    #[test]
    fn failed_update_keeps_dirty_state_for_retry() {
        let fake = FakeTransport::new();
        fake.respond(
            200,
            json!({"data": {"type": "monitoringLists", "id": "9", "attributes": {"name": "old"}}}),
        );
        fake.respond(
            422,
            json!({"errors": [{"status": "422", "title": "Invalid name"}]}),
        );
        fake.respond(
            200,
            json!({"data": {"type": "monitoringLists", "id": "9", "attributes": {"name": "new"}}}),
        );
        let api = test_api(&fake);

        let list = MonitoringList::get(&api, "9").unwrap();
        list.set_name("new");
        assert!(matches!(list.update(&api), Err(Error::Validation { .. })));

        // The delta is unchanged on retry
        list.update(&api).unwrap();
        let requests = fake.requests();
        assert_eq!(
            requests[1].body.as_ref().unwrap()["data"]["attributes"],
            requests[2].body.as_ref().unwrap()["data"]["attributes"]
        );
    }

    #[test]
    fn empty_update_send_policy_issues_a_patch() {
        let fake = FakeTransport::new();
        fake.respond(
            200,
            json!({"data": {"type": "monitoringLists", "id": "3", "attributes": {"name": "a"}}}),
        );
        fake.respond(
            200,
            json!({"data": {"type": "monitoringLists", "id": "3", "attributes": {"name": "a"}}}),
        );
        let api = test_api(&fake);

        let list = MonitoringList::get(&api, "3").unwrap();
        list.update(&api).unwrap();

        let requests = fake.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, Method::Patch);
        let attrs = requests[1].body.as_ref().unwrap()["data"]["attributes"]
            .as_object()
            .unwrap()
            .clone();
        assert!(attrs.is_empty());
    }

    #[test]
    fn empty_update_skip_policy_issues_no_request() {
        let fake = FakeTransport::new();
        fake.respond(
            200,
            json!({"data": {"type": "monitoringLists", "id": "3", "attributes": {"name": "a"}}}),
        );
        let api = skip_api(&fake);

        let list = MonitoringList::get(&api, "3").unwrap();
        list.update(&api).unwrap();
        assert_eq!(fake.requests().len(), 1);

        // A real change still goes out
        fake.respond(
            200,
            json!({"data": {"type": "monitoringLists", "id": "3", "attributes": {"name": "b"}}}),
        );
        list.set_name("b");
        list.update(&api).unwrap();
        assert_eq!(fake.requests().len(), 2);
    }

    #[test]
    fn delete_sends_meta_body_and_marks_the_instance_stale() {
        let fake = FakeTransport::new();
        fake.respond(
            200,
            json!({"data": {"type": "monitoringLists", "id": "4", "attributes": {"name": "a"}}}),
        );
        fake.respond_empty(204);
        let api = test_api(&fake);

        let list = MonitoringList::get(&api, "4").unwrap();
        list.delete(&api).unwrap();

        let requests = fake.requests();
        assert_eq!(requests[1].method, Method::Delete);
        assert_eq!(requests[1].body.as_ref().unwrap(), &json!({"meta": {}}));

        assert!(matches!(list.update(&api), Err(Error::StaleInstance)));
        assert!(matches!(list.delete(&api), Err(Error::StaleInstance)));
        assert_eq!(fake.requests().len(), 2);
    }

    #[test]
    fn get_requests_sparse_fieldsets() {
        let fake = FakeTransport::new();
        fake.respond(
            200,
            json!({"data": {"type": "components", "id": "11", "attributes": {"name": "openssl"}}}),
        );
        let api = test_api(&fake);

        let component = Component::get(&api, "11").unwrap();
        assert_eq!(component.name().as_deref(), Some("openssl"));

        let request = &fake.requests()[0];
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "https://example.com/api/v2/components/11");
        let fields = request
            .query
            .iter()
            .find(|(k, _)| k == "fields[components]")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert!(fields.contains("vendor"));
        assert!(fields.contains("endOfLifeOn"));
    }

    #[test]
    fn get_with_null_data_is_not_found() {
        let fake = FakeTransport::new();
        fake.respond(200, json!({"data": null}));
        let api = test_api(&fake);
        assert!(matches!(
            Component::get(&api, "404"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn get_maps_server_404() {
        let fake = FakeTransport::new();
        fake.respond(
            404,
            json!({"errors": [{"status": "404", "title": "Record not found"}]}),
        );
        let api = test_api(&fake);
        let err = Component::get(&api, "nope").unwrap_err();
        match err {
            Error::NotFound { errors } => {
                assert_eq!(errors[0].title.as_deref(), Some("Record not found"));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn refresh_discards_local_edits() {
        let fake = FakeTransport::new();
        fake.respond(
            200,
            json!({"data": {"type": "monitoringLists", "id": "8", "attributes": {"name": "server"}}}),
        );
        fake.respond(
            200,
            json!({"data": {"type": "monitoringLists", "id": "8", "attributes": {"name": "server", "active": true}}}),
        );
        let api = test_api(&fake);

        let list = MonitoringList::get(&api, "8").unwrap();
        list.set_name("local-edit");
        list.refresh(&api).unwrap();

        assert_eq!(list.name().as_deref(), Some("server"));
        assert_eq!(list.active(), Some(true));

        // Nothing dirty is left behind, so a skip-policy update is a no-op
        let api = skip_api(&fake);
        list.update(&api).unwrap();
        assert_eq!(fake.requests().len(), 2);
    }

    #[test]
    fn undeclared_attributes_are_reachable_untyped() {
        let fake = FakeTransport::new();
        fake.respond(
            200,
            json!({
                "data": {
                    "type": "components",
                    "id": "2",
                    "attributes": {"name": "zlib", "futureField": 42}
                }
            }),
        );
        let api = test_api(&fake);

        let component = Component::get(&api, "2").unwrap();
        assert_eq!(component.raw_attribute("futureField"), Some(json!(42)));
        assert_eq!(component.raw_attribute("missing"), None);
    }

    #[test]
    fn node_debug_is_flat_and_truncated() {
        let node = Node::decoded("components", "123");
        node.set_attribute("a", json!(1));
        node.set_attribute("b", json!(2));
        node.set_attribute("c", json!(3));
        node.set_attribute("d", json!(4));
        let rendered = format!("{node:?}");
        assert_eq!(rendered, "Node(components 123)");

        struct Wrap(Node);
        impl std::fmt::Debug for Wrap {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.debug_fmt("Component", f)
            }
        }
        let rendered = format!("{:?}", Wrap(node));
        assert!(rendered.starts_with("Component {"));
        assert!(rendered.contains("id:"));
        assert!(rendered.contains(".."));
    }
}
