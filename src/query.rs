//! Query Builder
//!
//! Immutable, chainable collection queries. A query compiles to `filter`,
//! `page[size]`, sparse-fieldset and `sort` parameters; iterating it walks
//! the collection endpoint page by page, following `links.next` until the
//! server stops handing one out.

use crate::client::Api;
use crate::document;
use crate::error::{Error, Result};
use crate::model::{sparse_fields, Node, Resource};
use std::marker::PhantomData;

const DEFAULT_PAGE_SIZE: usize = 100;

/// A filter operand. Lists collapse to the comma-separated form the wire
/// expects for set operators like `any`.
pub struct FilterValue(String);

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(values: Vec<&str>) -> Self {
        Self(values.join(","))
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        Self(values.join(","))
    }
}

impl From<&[&str]> for FilterValue {
    fn from(values: &[&str]) -> Self {
        Self(values.join(","))
    }
}

impl From<&[String]> for FilterValue {
    fn from(values: &[String]) -> Self {
        Self(values.join(","))
    }
}

/// A collection query for resources of type `T`.
pub struct Query<T> {
    filters: Vec<(String, String, String)>,
    sort: Option<String>,
    page_size: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("filters", &self.filters)
            .field("sort", &self.sort)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            sort: self.sort.clone(),
            page_size: self.page_size,
            _marker: PhantomData,
        }
    }
}

impl<T: Resource> Query<T> {
    pub(crate) fn new() -> Self {
        Self {
            filters: Vec::new(),
            sort: None,
            page_size: DEFAULT_PAGE_SIZE,
            _marker: PhantomData,
        }
    }

    /// Add a `filter[attribute][operator]=value` constraint. Operators are
    /// passed through to the server unvalidated.
    pub fn filter(mut self, attribute: &str, operator: &str, value: impl Into<FilterValue>) -> Self {
        self.filters
            .push((attribute.to_string(), operator.to_string(), value.into().0));
        self
    }

    /// Sort ascending by one attribute. At most one sort key per query.
    pub fn asc(mut self, attribute: &str) -> Result<Self> {
        if let Some(existing) = self.sort.take() {
            return Err(Error::MultipleSortKeys { existing });
        }
        self.sort = Some(attribute.to_string());
        Ok(self)
    }

    /// Sort descending by one attribute.
    pub fn desc(self, attribute: &str) -> Result<Self> {
        self.asc(&format!("-{attribute}"))
    }

    /// Number of resources requested per page. Must be at least one.
    pub fn page_size(mut self, size: usize) -> Result<Self> {
        if size < 1 {
            return Err(Error::InvalidPageSize { size });
        }
        self.page_size = size;
        Ok(self)
    }

    /// The compiled request parameters for the first page.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 3);
        for (attribute, operator, value) in &self.filters {
            params.push((format!("filter[{attribute}][{operator}]"), value.clone()));
        }
        params.push(("page[size]".to_string(), self.page_size.to_string()));
        params.extend(sparse_fields(T::schema()));
        if let Some(sort) = &self.sort {
            params.push(("sort".to_string(), sort.clone()));
        }
        params
    }

    /// Iterate over every matching resource. Each call starts over from the
    /// first page; pages are fetched lazily as the iterator advances.
    pub fn iter<'a>(&self, api: &'a Api) -> Pages<'a, T> {
        let url = api.endpoint(T::schema().type_name);
        Pages {
            api,
            next_request: Some((url, self.to_params())),
            buffer: Vec::new().into_iter(),
            failed: false,
            _marker: PhantomData,
        }
    }

    /// Collect every matching resource.
    pub fn all(&self, api: &Api) -> Result<Vec<T>> {
        self.iter(api).collect()
    }

    /// The first matching resource, requested with a page size of one.
    pub fn first(&self, api: &Api) -> Result<Option<T>> {
        let mut single = self.clone();
        single.page_size = 1;
        single.iter(api).next().transpose()
    }
}

/// Lazy iterator over the pages of a collection query.
///
/// Yields one `Result` per resource. After the first error the iterator is
/// exhausted; a fresh [`Query::iter`] starts over from page one.
pub struct Pages<'a, T> {
    api: &'a Api,
    next_request: Option<(String, Vec<(String, String)>)>,
    buffer: std::vec::IntoIter<Node>,
    failed: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> Pages<'_, T> {
    fn fetch(&mut self, url: &str, params: Vec<(String, String)>) -> Result<()> {
        // An empty body counts as a final empty page.
        let Some(document) = self.api.get(url, params)? else {
            return Ok(());
        };
        let page = document::decode_many(T::schema(), &document)?;
        self.buffer = page.nodes.into_iter();
        if let Some(next) = page.next {
            let next_url = self.api.resolve_link(&next)?;
            // Follow-up parameters are already baked into the link.
            self.next_request = Some((next_url, Vec::new()));
        }
        Ok(())
    }
}

impl<T: Resource> Iterator for Pages<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(node) = self.buffer.next() {
                return Some(Ok(T::from_node(node)));
            }
            let (url, params) = self.next_request.take()?;
            if let Err(err) = self.fetch(&url, params) {
                self.failed = true;
                return Some(Err(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::http::FakeTransport;
    use crate::models::Component;
    use serde_json::json;

    fn test_api(fake: &FakeTransport) -> Api {
        let config = ApiConfig::new("test-token").with_base_url("https://example.com/api/v2");
        Api::with_transport(config, Box::new(fake.clone()))
    }

    fn page(ids: &[&str], next: Option<&str>) -> serde_json::Value {
        let data: Vec<_> = ids
            .iter()
            .map(|id| json!({"type": "components", "id": id, "attributes": {"name": "c"}}))
            .collect();
        json!({"data": data, "links": {"next": next}})
    }

    #[test]
    fn params_compile_filters_page_size_fields_and_sort() {
        let params = Component::filter("name", "eq", "curl")
            .filter("active", "eq", "true")
            .desc("createdAt")
            .unwrap()
            .to_params();

        assert_eq!(params[0], ("filter[name][eq]".to_string(), "curl".to_string()));
        assert_eq!(
            params[1],
            ("filter[active][eq]".to_string(), "true".to_string())
        );
        assert_eq!(params[2], ("page[size]".to_string(), "100".to_string()));
        assert!(params
            .iter()
            .any(|(key, value)| key == "fields[components]" && value.contains("name")));
        assert_eq!(
            params.last().unwrap(),
            &("sort".to_string(), "-createdAt".to_string())
        );
    }

    #[test]
    fn list_values_collapse_to_comma_separated_form() {
        let params = Component::filter("id", "any", vec!["1", "2", "3"]).to_params();
        assert_eq!(params[0], ("filter[id][any]".to_string(), "1,2,3".to_string()));
    }

    #[test]
    fn a_second_sort_key_is_rejected() {
        let err = Component::query()
            .asc("name")
            .unwrap()
            .desc("version")
            .unwrap_err();
        assert!(matches!(err, Error::MultipleSortKeys { existing } if existing == "name"));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(matches!(
            Component::query().page_size(0),
            Err(Error::InvalidPageSize { size: 0 })
        ));
    }

    #[test]
    fn iteration_follows_next_links_without_repeating_params() {
        let fake = FakeTransport::new();
        let api = test_api(&fake);
        fake.respond(200, page(&["1"], Some("/api/v2/components?page[after]=1")));
        fake.respond(200, page(&["2"], None));

        let components = Component::query().all(&api).unwrap();
        let ids: Vec<_> = components.iter().filter_map(Component::id).collect();
        assert_eq!(ids, ["1", "2"]);

        let http = fake.requests();
        assert_eq!(http[0].url, "https://example.com/api/v2/components");
        assert!(http[0]
            .query
            .contains(&("page[size]".to_string(), "100".to_string())));
        assert_eq!(
            http[1].url,
            "https://example.com/api/v2/components?page[after]=1"
        );
        assert!(http[1].query.is_empty());
    }

    #[test]
    fn each_iteration_starts_from_the_first_page() {
        let fake = FakeTransport::new();
        let api = test_api(&fake);
        let query = Component::filter("name", "eq", "curl");

        fake.respond(200, page(&["1"], None));
        fake.respond(200, page(&[], None));
        let first_pass = query.all(&api).unwrap();
        let second_pass = query.all(&api).unwrap();
        assert_eq!(first_pass.len(), 1);
        assert!(second_pass.is_empty());

        let http = fake.requests();
        assert_eq!(http[0].url, http[1].url);
        assert_eq!(http[0].query, http[1].query);
    }

    #[test]
    fn first_requests_a_single_resource_page() {
        let fake = FakeTransport::new();
        let api = test_api(&fake);
        fake.respond(200, page(&["7"], None));

        let first = Component::query().first(&api).unwrap().unwrap();
        assert_eq!(first.id().as_deref(), Some("7"));
        assert!(fake.requests()[0]
            .query
            .contains(&("page[size]".to_string(), "1".to_string())));
    }

    #[test]
    fn first_of_an_empty_collection_is_none() {
        let fake = FakeTransport::new();
        let api = test_api(&fake);
        fake.respond(200, page(&[], None));
        assert!(Component::query().first(&api).unwrap().is_none());
    }

    #[test]
    fn an_empty_response_body_ends_iteration() {
        let fake = FakeTransport::new();
        let api = test_api(&fake);
        fake.respond_empty(200);
        assert!(Component::query().all(&api).unwrap().is_empty());
    }

    #[test]
    fn a_failed_fetch_yields_one_error_then_fuses() {
        let fake = FakeTransport::new();
        let api = test_api(&fake);
        fake.respond_empty(502);

        let mut pages = Component::query().iter(&api);
        assert!(matches!(
            pages.next(),
            Some(Err(Error::Transport {
                status: Some(502),
                ..
            }))
        ));
        assert!(pages.next().is_none());
    }
}
