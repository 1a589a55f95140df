//! Integration tests for parsing ERS documents.
//!
//! These tests check that search result pages and resource documents captured
//! from an ISE node are understood by the appliance-ise models.

use std::fs;
use std::path::PathBuf;

use appliance_core::XmlElement;
use appliance_ise::models::{total, IDENTITY_NS};
use appliance_ise::{has_next_page, resources, NewInternalUser};

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Load and parse an XML fixture.
fn load_fixture(name: &str) -> XmlElement {
    let fixture_path = fixtures_dir().join(name);
    let body = fs::read(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read fixture at {}: {}",
            fixture_path.display(),
            e
        )
    });

    XmlElement::parse(&body)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {}", name, e))
        .unwrap_or_else(|| panic!("Fixture {} holds no element", name))
}

#[test]
fn test_search_page_entries() {
    let page = load_fixture("endpoint_search.xml");

    let entries = resources(&page);
    assert_eq!(entries.len(), 2, "Expected 2 entries on the first page");
    assert_eq!(entries[0].name.as_deref(), Some("00:0C:29:4A:19:01"));
    // empty descriptions are dropped
    assert_eq!(entries[0].description, None);
    assert_eq!(entries[1].description.as_deref(), Some("lobby camera"));
    assert!(entries.iter().all(|entry| entry.uuid().is_some()));
}

#[test]
fn test_search_page_navigation() {
    let first = load_fixture("endpoint_search.xml");
    let last = load_fixture("endpoint_search_last.xml");

    assert!(has_next_page(&first));
    assert!(!has_next_page(&last), "previousPage must not count as a next page");
    assert_eq!(total(&first), Some(3));
    assert_eq!(total(&last), Some(3));
}

#[test]
fn test_non_uuid_ids_are_kept() {
    let page = load_fixture("endpoint_search_last.xml");

    let entries = resources(&page);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, "legacy-entry");
    assert_eq!(entries[0].uuid(), None);
    assert_eq!(entries[0].description, None);
}

#[test]
fn test_internal_user_document() {
    let user = load_fixture("internaluser.xml");

    assert!(user.is_named(Some(IDENTITY_NS), "internaluser"));
    assert_eq!(user.attribute("name"), Some("jdoe"));
    assert_eq!(user.attribute("description"), Some("contractor & lab user"));
    assert_eq!(user.child_text(None, "email"), Some("jdoe@example.net"));
    assert_eq!(user.child_text(None, "passwordIDStore"), Some("Internal Users"));

    let entry = user
        .child(None, "customAttributes")
        .and_then(|attributes| attributes.child(None, "entry"))
        .expect("Should have a custom attribute entry");
    assert_eq!(entry.child_text(None, "key"), Some("FIREWALL"));
    assert_eq!(entry.child_text(None, "value"), Some("edge-01"));
}

#[test]
fn test_new_internal_user_matches_captured_layout() {
    let captured = load_fixture("internaluser.xml");
    let built = NewInternalUser::new(
        "jdoe",
        "a1740510-8c01-11e6-996c-525400b48521",
        "mypassword".to_string(),
    )
    .with_description("contractor & lab user")
    .with_contact(
        Some("jdoe@example.net".to_string()),
        Some("Jamie".to_string()),
        Some("Doe".to_string()),
    )
    .with_custom_attribute("FIREWALL", Some("edge-01".to_string()))
    .to_element();

    // captured documents carry a self link the create payload omits
    let captured_fields: Vec<&str> = captured
        .children
        .iter()
        .map(|child| child.name.as_str())
        .filter(|name| *name != "link")
        .collect();
    let built_fields: Vec<&str> = built
        .children
        .iter()
        .map(|child| child.name.as_str())
        .filter(|name| *name != "enablePassword")
        .collect();
    assert_eq!(built_fields, captured_fields);

    for field in ["email", "firstName", "lastName", "identityGroups", "password"] {
        assert_eq!(
            built.child_text(None, field),
            captured.child_text(None, field),
            "field {} differs",
            field
        );
    }
}
