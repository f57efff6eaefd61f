//! Property-based tests using proptest
//!
//! These tests verify projection planning, filter rendering and scalar
//! coercion using randomized inputs.

use chrono::{FixedOffset, TimeZone};
use jazz_client::materialize::scalar::{coerce, format_timestamp, parse_timestamp};
use jazz_client::query::DEFAULT_REPORT_PATH;
use jazz_client::schema::{Catalog, ResourceDescriptor, ScalarKind};
use jazz_client::{Filter, UrlBuilder, Value};
use proptest::prelude::*;
use std::collections::HashSet;

/// Generate a filter value free of quotes
fn arb_value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 _./-]{1,20}"
}

/// Pick one of the listable builtin types
fn arb_listable() -> impl Strategy<Value = String> {
    let catalog = Catalog::builtin();
    let names: Vec<String> = catalog
        .names()
        .into_iter()
        .filter(|name| catalog.lookup(name).map_or(false, |d| d.is_listable()))
        .map(str::to_string)
        .collect();
    prop::sample::select(names)
}

fn decoded_fields(url: &str) -> String {
    let (_, fields) = url.split_once("?fields=").unwrap();
    urlencoding::decode(fields).unwrap().into_owned()
}

proptest! {
    /// Projections contain no duplicate paths and at most one top-level wildcard
    #[test]
    fn test_projection_is_well_formed(name in arb_listable()) {
        let catalog = Catalog::builtin();
        let descriptor = catalog.lookup(&name).unwrap();
        let projection = catalog.projection(descriptor);

        let unique: HashSet<&String> = projection.iter().collect();
        prop_assert_eq!(unique.len(), projection.len());
        let wildcards = projection.iter().filter(|p| p.as_str() == "*").count();
        prop_assert!(wildcards <= 1);
        prop_assert!(projection.iter().all(|p| !p.is_empty() && !p.starts_with('/')));
    }

    /// Planning twice gives the same projection
    #[test]
    fn test_projection_is_deterministic(name in arb_listable()) {
        let catalog = Catalog::builtin();
        let descriptor = catalog.lookup(&name).unwrap();
        let first = catalog.projection(descriptor).into_owned();
        let fresh = descriptor.clone();
        prop_assert_eq!(first, catalog.projection(&fresh).into_owned());
    }

    /// Every value of a field shows up as an alternative of one term
    #[test]
    fn test_filter_alternatives(values in prop::collection::vec(arb_value(), 1..6)) {
        let catalog = Catalog::builtin();
        let contributor = catalog.lookup("Contributor").unwrap();
        let filter = Filter::new().with_any("userId", values.iter());
        let predicate = filter.predicate(&catalog, contributor).unwrap();

        prop_assert!(predicate.starts_with('['));
        prop_assert!(predicate.ends_with(']'));
        for value in &values {
            let term = format!("userId=\"{}\"", value);
            prop_assert!(predicate.contains(&term));
        }
        prop_assert_eq!(predicate.matches(" or ").count(), values.len() - 1);
        prop_assert!(!predicate.contains(" and "));
    }

    /// List URLs carry the filter only in the encoded `fields` parameter
    #[test]
    fn test_list_url_encoding(value in arb_value()) {
        let catalog = Catalog::builtin();
        let urls = UrlBuilder::new(&catalog, DEFAULT_REPORT_PATH);
        let contributor = catalog.lookup("Contributor").unwrap();
        let url = urls
            .list_url(contributor, &Filter::new().with("name", &value))
            .unwrap();

        prop_assert!(!url.contains(' '));
        prop_assert!(!url.contains('"'));
        prop_assert_eq!(
            decoded_fields(&url),
            format!("contributor/contributor[name=\"{}\"]/(itemId)", value)
        );
    }

    /// Integers survive surrounding whitespace
    #[test]
    fn test_coerce_int(n in any::<i64>(), pad in "[ \t]{0,3}") {
        let text = format!("{pad}{n}{pad}");
        prop_assert_eq!(coerce(ScalarKind::Int, "id", &text).unwrap(), Value::Int(n));
    }

    /// Rendered timestamps parse back to the same instant and offset
    #[test]
    fn test_timestamp_round_trip(
        millis in 0i64..4_102_444_800_000,
        offset_minutes in -12i32 * 60..=14 * 60,
    ) {
        let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
        let value = offset.timestamp_millis_opt(millis).unwrap();
        let parsed = parse_timestamp("modified", &format_timestamp(&value)).unwrap();
        prop_assert_eq!(parsed, value);
        prop_assert_eq!(parsed.offset(), value.offset());
    }

    /// Embedded chains nest their sub-projections under the field path
    #[test]
    fn test_embedded_chain(depth in 1usize..5) {
        let mut builder = Catalog::builder();
        for level in 0..depth {
            let next = format!("L{}", level + 1);
            let descriptor = ResourceDescriptor::new(format!("L{level}"), "test", "", "")
                .without_base()
                .with_field("name", "string")
                .with_field("inner", &format!("*{next}"));
            builder = builder.register(descriptor);
        }
        builder = builder.register(
            ResourceDescriptor::new(format!("L{depth}"), "test", "", "").without_base()
        );
        builder = builder.register(
            ResourceDescriptor::new("Root", "test", "root", "")
                .without_base()
                .with_field("chain", "*L0"),
        );
        let catalog = builder.build().unwrap();

        let root = catalog.lookup("Root").unwrap();
        let projection = catalog.projection(root);
        prop_assert_eq!(projection.len(), 1);
        prop_assert!(projection[0].starts_with("chain/"));
    }
}
