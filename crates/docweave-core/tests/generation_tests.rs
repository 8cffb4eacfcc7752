/*
 * generation_tests.rs
 * Copyright (c) 2025 Posit, PBC
 */

mod common;

use common::*;
use docweave_core::package::CT_DOCUMENT_MAIN;
use docweave_core::{
    AuxStore, Composer, DATA_ROOT_PATH, DEFAULT_STORE_NAMESPACE, DataContext, DocumentMetadata, Error,
    GenerationRequest, Generator, PlaceholderKind, PlaceholderSpec, Registry,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

fn order(items: &[&str]) -> DataContext {
    let items: String = items
        .iter()
        .enumerate()
        .map(|(i, name)| format!("<Item><Id>i-{}</Id><Name>{}</Name></Item>", i + 1, name))
        .collect();
    DataContext::parse(&format!(
        "<Order><Id>o-1</Id><Name>Test Order</Name><items>{}</items></Order>",
        items
    ))
    .unwrap()
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.insert(
        PlaceholderSpec::new("C", PlaceholderKind::Container)
            .with_paths(Some("./Id[1]"), None)
            .unwrap(),
    );
    registry.insert(
        PlaceholderSpec::new("R", PlaceholderKind::Recursive)
            .with_paths(Some("./Id[1]"), Some("./items[1]"))
            .unwrap(),
    );
    registry.insert(
        PlaceholderSpec::new("T", PlaceholderKind::NonRecursive)
            .with_paths(None, Some("./Name[1]"))
            .unwrap(),
    );
    registry.insert(
        PlaceholderSpec::new("ItemName", PlaceholderKind::NonRecursive)
            .with_paths(None, Some("./Name[1]"))
            .unwrap(),
    );
    registry.insert(PlaceholderSpec::new("Skip", PlaceholderKind::Ignore));
    registry
}

fn generate(template: Vec<u8>, data: DataContext) -> Vec<u8> {
    let request = GenerationRequest::new(template, data).with_registry(registry());
    Generator::default().generate(&request).unwrap()
}

/// Container `C` holding title `T` and a paragraph-level Recursive `R` whose
/// item text comes from `ItemName`.
fn order_template() -> Vec<u8> {
    let body = sdt(
        "C",
        1,
        &format!(
            "{}{}",
            para(&sdt("T", 2, &run("title"))),
            para(&sdt("R", 3, &sdt("ItemName", 4, &run("item"))))
        ),
    );
    DocxBuilder::new(&body).template().build()
}

#[test]
fn test_recursive_region_expands_in_collection_order() {
    let template = DocxBuilder::new(&para(&sdt("R", 1, &sdt("ItemName", 2, &run("x"))))).build();
    let output = generate(template, order(&["Item 1", "Item 2", "Item 3"]));
    let tree = document(&output);

    assert_eq!(texts(&tree, "ItemName"), vec!["Item 1", "Item 2", "Item 3"]);
    assert_eq!(texts(&tree, "R").len(), 3);
    assert!(!tags(&tree).contains(&"R".to_string()));
    assert_eq!(
        tags(&tree)
            .into_iter()
            .filter(|t| t.starts_with("R:"))
            .collect::<Vec<_>>(),
        vec!["R:i-1", "R:i-2", "R:i-3"]
    );
}

#[test]
fn test_end_to_end_generate_then_refresh() {
    let first = generate(order_template(), order(&["Item 1", "Item 2"]));
    let tree = document(&first);
    assert_eq!(texts(&tree, "ItemName"), vec!["Item 1", "Item 2"]);
    assert_eq!(texts(&tree, "T"), vec!["Test Order"]);
    assert_eq!(tags(&tree)[0], "C:o-1");

    let package = open(&first);
    let store = AuxStore::load(&package, "word/document.xml", DEFAULT_STORE_NAMESPACE)
        .unwrap()
        .unwrap();
    assert!(store.archived("C").is_some());
    assert_eq!(
        package.content_type_override("word/document.xml").unwrap().as_deref(),
        Some(CT_DOCUMENT_MAIN)
    );

    let refreshed = generate(first, order(&["Item 1", "Item 2", "Item 11", "Item 21"]));
    let tree = document(&refreshed);
    assert_eq!(
        texts(&tree, "ItemName"),
        vec!["Item 1", "Item 2", "Item 11", "Item 21"]
    );
    assert_eq!(texts(&tree, "T"), vec!["Test Order"]);

    let package = open(&refreshed);
    let stores = package
        .part_names()
        .filter(|name| name.starts_with("customXml/item") && !name.contains("Props"))
        .count();
    assert_eq!(stores, 1);
}

#[test]
fn test_refresh_shrinking_collection() {
    let first = generate(order_template(), order(&["a", "b", "c"]));
    let refreshed = generate(first, order(&["a"]));
    assert_eq!(texts(&document(&refreshed), "ItemName"), vec!["a"]);
}

#[test]
fn test_ids_unique_after_cloning() {
    let template = DocxBuilder::new(&para(&sdt("R", 5, &sdt("ItemName", 5, &run("x")))))
        .header(&para(&sdt("T", 5, &run("h"))))
        .build();
    let output = generate(template, order(&["a", "b", "c", "d"]));
    let package = open(&output);

    let mut ids = sdt_ids(&document(&output));
    ids.extend(sdt_ids(&package.read_xml("word/header1.xml").unwrap()));
    assert_eq!(ids.len(), 9);
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn test_unknown_and_ignored_regions_pass_through() {
    let body = format!(
        "{}{}{}",
        para(&sdt("Skip", 1, &run("ignored"))),
        para(&sdt("Vendor:99", 2, &run("host text"))),
        para(&sdt("T", 3, &run("title")))
    );
    let output = generate(DocxBuilder::new(&body).build(), order(&[]));
    let tree = document(&output);
    assert_eq!(tags(&tree), vec!["Skip", "Vendor:99", "T"]);
    assert_eq!(texts(&tree, "Skip"), vec!["ignored"]);
    assert_eq!(texts(&tree, "Vendor"), vec!["host text"]);
    assert_eq!(texts(&tree, "T"), vec!["Test Order"]);
}

#[test]
fn test_missing_values_become_empty() {
    let mut registry = registry();
    registry.insert(
        PlaceholderSpec::new("Nothing", PlaceholderKind::NonRecursive)
            .with_paths(None, Some("./Missing[1]"))
            .unwrap(),
    );
    let template = DocxBuilder::new(&para(&sdt("Nothing", 1, &run("placeholder")))).build();
    let request = GenerationRequest::new(template, order(&[])).with_registry(registry);
    let output = Generator::default().generate(&request).unwrap();
    assert_eq!(texts(&document(&output), "Nothing"), vec![""]);
}

#[test]
fn test_headers_and_footers_are_filled() {
    let template = DocxBuilder::new(&para(&run("body")))
        .header(&para(&sdt("T", 1, &run("h"))))
        .footer(&para(&sdt("T", 2, &run("f"))))
        .build();
    let output = generate(template, order(&[]));
    let package = open(&output);
    for part in ["word/header1.xml", "word/footer1.xml"] {
        let tree = package.read_xml(part).unwrap();
        assert_eq!(texts(&tree, "T"), vec!["Test Order"], "{}", part);
    }
}

#[test]
fn test_metadata_and_binding_snapshot_persisted() {
    let path = format!("{}/Order[1]/Name[1]", DATA_ROOT_PATH);
    let mut registry = Registry::new();
    registry.insert(
        PlaceholderSpec::new("T", PlaceholderKind::NonRecursive)
            .with_paths(None, Some(&path))
            .unwrap(),
    );
    let template = DocxBuilder::new(&para(&sdt("T", 1, &run("x")))).build();
    let request = GenerationRequest::new(template, order(&["a"]))
        .with_registry(registry)
        .with_metadata(DocumentMetadata {
            document_type: "Order".to_string(),
            version: "2.0".to_string(),
        })
        .with_data_binding(true);
    let output = Generator::default().generate(&request).unwrap();

    let package = open(&output);
    let store = AuxStore::load(&package, "word/document.xml", DEFAULT_STORE_NAMESPACE)
        .unwrap()
        .unwrap();
    assert_eq!(store.metadata().map(|m| m.version.as_str()), Some("2.0"));
    assert!(store.snapshot().is_some_and(|s| s.contains("Test Order")));

    let tree = document(&output);
    let node = tree.descendants_named(tree.root(), "w:sdt")[0];
    let binding = docweave_core::wordml::data_binding(&tree, node).unwrap();
    assert_eq!(binding.xpath, path);
    assert_eq!(binding.store_item_id.as_deref(), Some(store.item_id()));
    assert_eq!(texts(&tree, "T"), vec!["Test Order"]);
}

#[test]
fn test_bound_refresh_then_compose() {
    let item_path = format!("{}/Order[1]/items[1]/Item[{{0}}]/Name[1]", DATA_ROOT_PATH);
    let mut registry = Registry::new();
    registry.insert(
        PlaceholderSpec::new("C", PlaceholderKind::Container)
            .with_paths(Some("./Id[1]"), None)
            .unwrap(),
    );
    registry.insert(
        PlaceholderSpec::new("R", PlaceholderKind::Recursive)
            .with_paths(Some("./Id[1]"), Some("./items[1]"))
            .unwrap(),
    );
    registry.insert(
        PlaceholderSpec::new("ItemName", PlaceholderKind::NonRecursive)
            .with_paths(None, Some(&item_path))
            .unwrap(),
    );
    let bound = |template: Vec<u8>, items: &[&str]| {
        let request = GenerationRequest::new(template, order(items))
            .with_registry(registry.clone())
            .with_data_binding(true);
        Generator::default().generate(&request).unwrap()
    };

    let template = DocxBuilder::new(&sdt(
        "C",
        1,
        &para(&sdt("R", 2, &sdt("ItemName", 3, &run("item")))),
    ))
    .build();
    let first = bound(template, &["Item 1", "Item 2"]);
    assert_eq!(texts(&document(&first), "ItemName"), vec!["Item 1", "Item 2"]);

    let refreshed = bound(first, &["Item 1", "Item 2", "Item 11", "Item 21"]);
    let tree = document(&refreshed);
    assert_eq!(
        texts(&tree, "ItemName"),
        vec!["Item 1", "Item 2", "Item 11", "Item 21"]
    );
    let paths: Vec<String> = tree
        .descendants_named(tree.root(), "w:sdt")
        .into_iter()
        .filter_map(|s| docweave_core::wordml::data_binding(&tree, s))
        .map(|binding| binding.xpath)
        .collect();
    assert_eq!(
        paths,
        (1..=4)
            .map(|i| format!("{}/Order[1]/items[1]/Item[{}]/Name[1]", DATA_ROOT_PATH, i))
            .collect::<Vec<_>>()
    );

    let composed = Composer::default().compose(&refreshed, &[], None).unwrap();
    let tree = document(&composed);
    assert!(tree.descendants_named(tree.root(), "w:sdt").is_empty());
    assert_eq!(tree.text_content(tree.root()), "Item 1Item 2Item 11Item 21");
}

#[test]
fn test_introspected_registry() {
    let data = DataContext::parse(
        r#"<root>
  <contentControl tag="Items" type="1" refTagValue="id" refControlValue="value"/>
  <contentControl tag="ItemName" type="2" refTagValue="id" refControlValue="value"/>
  <field contentControlTagREFS="Items" id="o-1">
    <field contentControlTagREFS="ItemName" id="i-1" value="Item 1"/>
    <field contentControlTagREFS="ItemName" id="i-2" value="Item 2"/>
  </field>
</root>"#,
    )
    .unwrap();
    let template = DocxBuilder::new(&para(&sdt("Items", 1, &sdt("ItemName", 2, &run("x"))))).build();
    let output = Generator::default()
        .generate(&GenerationRequest::new(template, data))
        .unwrap();
    let tree = document(&output);
    assert_eq!(texts(&tree, "ItemName"), vec!["Item 1", "Item 2"]);
}

#[test]
fn test_contract_violations() {
    let empty = GenerationRequest::new(Vec::new(), order(&[])).with_registry(registry());
    assert!(matches!(
        Generator::default().generate(&empty),
        Err(Error::InvalidArgument(_))
    ));

    let no_registry = GenerationRequest::new(DocxBuilder::new("").build(), order(&[]));
    assert!(matches!(
        Generator::default().generate(&no_registry),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_corrupt_store_fails_refresh() {
    let first = generate(order_template(), order(&["a"]));
    let mut package = open(&first);
    let part = package
        .part_names()
        .find(|name| name.starts_with("customXml/item") && !name.contains("Props"))
        .unwrap()
        .to_string();
    package.set_part(
        &part,
        format!(r#"<ns0:DocumentRootNode xmlns:ns0="{}">"#, DEFAULT_STORE_NAMESPACE).into_bytes(),
    );
    let broken = package.to_bytes().unwrap();

    let request = GenerationRequest::new(broken, order(&["a", "b"])).with_registry(registry());
    assert!(matches!(
        Generator::default().generate(&request),
        Err(Error::CorruptStore(_))
    ));
}
