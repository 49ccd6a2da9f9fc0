//! Property-based tests using proptest
//!
//! These tests verify query parameter compilation and package URL parsing
//! against randomized inputs.

use proptest::prelude::*;
use vilocify::models::Component;
use vilocify::purl::{match_purl, Purl};
use vilocify::{Error, Query, Resource};

/// Attribute names as they appear on the wire
fn arb_attribute() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9]{0,15}".prop_map(|s| s.to_string())
}

/// Filter operators accepted by the server
fn arb_operator() -> impl Strategy<Value = String> {
    prop_oneof!["eq", "ne", "in", "any", "after", "before"].prop_map(|s| s.to_string())
}

/// Build a query from a list of filter triples
fn query_from(filters: &[(String, String, String)]) -> Query<Component> {
    let mut query = Component::query();
    for (attribute, operator, value) in filters {
        query = query.filter(attribute, operator, value.as_str());
    }
    query
}

proptest! {
    /// Filters compile in insertion order, one parameter each
    #[test]
    fn filters_compile_in_insertion_order(
        filters in prop::collection::vec(
            (arb_attribute(), arb_operator(), ".{0,30}"),
            1..8,
        )
    ) {
        let params = query_from(&filters).to_params();
        for (i, (attribute, operator, value)) in filters.iter().enumerate() {
            prop_assert_eq!(&params[i].0, &format!("filter[{}][{}]", attribute, operator));
            prop_assert_eq!(&params[i].1, value);
        }
    }

    /// Every compiled query carries exactly one page size parameter
    #[test]
    fn page_size_is_always_present(size in 1usize..10_000) {
        let params = Component::query().page_size(size).unwrap().to_params();
        let sizes: Vec<_> = params.iter().filter(|(k, _)| k == "page[size]").collect();
        prop_assert_eq!(sizes.len(), 1);
        prop_assert_eq!(&sizes[0].1, &size.to_string());
    }

    /// The sort parameter compiles last, with a leading minus for descending
    #[test]
    fn sort_compiles_last(attribute in arb_attribute(), descending in any::<bool>()) {
        let query = if descending {
            Component::query().desc(&attribute).unwrap()
        } else {
            Component::query().asc(&attribute).unwrap()
        };
        let expected = if descending {
            format!("-{attribute}")
        } else {
            attribute.clone()
        };
        let params = query.to_params();
        let (key, value) = params.last().unwrap();
        prop_assert_eq!(key, "sort");
        prop_assert_eq!(value, &expected);
    }

    /// A second sort key is rejected no matter the direction combination
    #[test]
    fn second_sort_key_is_always_rejected(
        first in arb_attribute(),
        second in arb_attribute(),
        directions in (any::<bool>(), any::<bool>()),
    ) {
        let query = if directions.0 {
            Component::query().desc(&first).unwrap()
        } else {
            Component::query().asc(&first).unwrap()
        };
        let result = if directions.1 {
            query.desc(&second)
        } else {
            query.asc(&second)
        };
        prop_assert!(
            matches!(result, Err(Error::MultipleSortKeys { .. })),
            "expected Err(Error::MultipleSortKeys)"
        );
    }

    /// List filter values join with commas and split back losslessly
    #[test]
    fn list_values_join_with_commas(
        values in prop::collection::vec("[^,]{0,10}", 1..10)
    ) {
        let params = Component::filter("id", "in", values.clone()).to_params();
        let compiled = &params[0].1;
        let split: Vec<String> = compiled.split(',').map(String::from).collect();
        prop_assert_eq!(split, values);
    }
}

/// Tests for package URL parsing and component matching
mod purl_parsing_tests {
    use super::*;

    /// Well-formed purls for the ecosystems the matcher knows about
    fn arb_known_purl() -> impl Strategy<Value = (String, String, String)> {
        (
            prop_oneof![
                "cargo", "composer", "cpan", "gem", "golang", "hackage", "npm", "nuget", "pub",
                "pypi", "swift",
            ],
            "[a-z][a-z0-9._-]{0,20}",
            "[0-9][0-9a-z.]{0,8}",
        )
            .prop_map(|(t, name, version)| (t.to_string(), name, version))
    }

    proptest! {
        /// Parsing never panics, whatever the input
        #[test]
        fn parse_never_panics(input in ".*") {
            let _ = Purl::parse(&input);
        }

        /// Matching never panics on any parseable input
        #[test]
        fn match_is_total_over_parsed_purls(input in ".*") {
            if let Ok(purl) = Purl::parse(&input) {
                let _ = match_purl(&purl);
            }
        }

        /// Known ecosystems always produce a name and a version
        #[test]
        fn known_ecosystems_always_match((t, name, version) in arb_known_purl()) {
            let purl = Purl::parse(&format!("pkg:{t}/{name}@{version}")).unwrap();
            let matched = match_purl(&purl);
            let matched_name = matched.name.unwrap();
            prop_assert!(matched_name.ends_with(&name));
            prop_assert_eq!(matched.version, Some(version));
        }

        /// A leading `v` on the version is dropped from the match
        #[test]
        fn version_prefix_v_is_stripped(digits in "[0-9]{1,6}") {
            let purl = Purl::parse(&format!("pkg:npm/left-pad@v{digits}")).unwrap();
            prop_assert_eq!(match_purl(&purl).version, Some(digits));
        }

        /// Qualifier keys are case-insensitive on the wire
        #[test]
        fn qualifier_keys_normalize_to_lowercase(
            key in "[a-zA-Z]{1,10}",
            value in "[a-z0-9.-]{1,10}",
        ) {
            let purl = Purl::parse(&format!("pkg:rpm/redhat/openssl@3.0?{key}={value}")).unwrap();
            prop_assert_eq!(purl.qualifiers.get(&key.to_lowercase()), Some(&value));
        }

        /// The subpath fragment never changes what is parsed
        #[test]
        fn subpath_is_ignored(
            (t, name, version) in arb_known_purl(),
            subpath in "[a-z][a-z/]{0,15}",
        ) {
            let base = format!("pkg:{t}/{name}@{version}");
            let with_subpath = format!("{base}#{subpath}");
            prop_assert_eq!(Purl::parse(&base).unwrap(), Purl::parse(&with_subpath).unwrap());
        }
    }
}
