/*
 * generator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template walking and document generation.
//!
//! A walk visits every element of a part in document order. Content
//! controls whose tag names a registered placeholder are handed to the
//! handler for the placeholder's kind; everything else is descended into.
//! Handlers are plain function pointers collected in a [`HandlerTable`], so
//! callers can override one kind and still fall through to the default
//! behavior by calling the public default handler themselves.

use crate::data::DataContext;
use crate::error::{Error, Result};
use crate::ids;
use crate::package::{Package, REL_FOOTER, REL_HEADER};
use crate::registry::{PlaceholderKind, PlaceholderSpec, Registry};
use crate::request::{EngineConfig, GenerationRequest};
use crate::store::AuxStore;
use crate::{tag, wordml};
use docweave_xml::{LocationPath, NodeId, XmlTree};
use tracing::{debug, info, trace, warn};

/// A recognized content control together with the data node it is filled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// The `w:sdt` element.
    pub node: NodeId,
    /// Current position in the data context.
    pub data: NodeId,
}

/// Handles one recognized content control.
pub type Handler = fn(&mut Walk<'_>, &mut XmlTree, Region, &PlaceholderSpec) -> Result<()>;

/// One handler per placeholder kind.
#[derive(Clone, Copy)]
pub struct HandlerTable {
    pub ignore: Handler,
    pub non_recursive: Handler,
    pub recursive: Handler,
    pub container: Handler,
}

impl HandlerTable {
    pub fn handler(&self, kind: PlaceholderKind) -> Handler {
        match kind {
            PlaceholderKind::Ignore => self.ignore,
            PlaceholderKind::NonRecursive => self.non_recursive,
            PlaceholderKind::Recursive => self.recursive,
            PlaceholderKind::Container => self.container,
        }
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self {
            ignore: leave_untouched,
            non_recursive: fill_value,
            recursive: expand_items,
            container: populate_container,
        }
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable").finish_non_exhaustive()
    }
}

/// State shared by every handler during one generation call.
pub struct Walk<'a> {
    registry: &'a Registry,
    data: &'a XmlTree,
    store: &'a mut AuxStore,
    /// The persisted store shape, for resolving absolute binding paths.
    store_tree: Option<XmlTree>,
    use_data_binding: bool,
    handlers: HandlerTable,
}

impl<'a> Walk<'a> {
    /// Set up a walk.
    ///
    /// With data binding on, the store's current snapshot is materialized
    /// once so bound controls can show the value they point at.
    pub fn new(
        registry: &'a Registry,
        data: &'a DataContext,
        store: &'a mut AuxStore,
        use_data_binding: bool,
        handlers: HandlerTable,
    ) -> Result<Self> {
        let store_tree = if use_data_binding {
            Some(store.to_tree()?)
        } else {
            None
        };
        Ok(Self {
            registry,
            data: data.tree(),
            store,
            store_tree,
            use_data_binding,
            handlers,
        })
    }

    pub fn data(&self) -> &'a XmlTree {
        self.data
    }

    pub fn store(&mut self) -> &mut AuxStore {
        self.store
    }

    pub fn store_item_id(&self) -> &str {
        self.store.item_id()
    }

    pub fn uses_data_binding(&self) -> bool {
        self.use_data_binding
    }

    /// Visit `node`: dispatch it if it is a registered content control,
    /// otherwise descend into its element children.
    pub fn visit(&mut self, tree: &mut XmlTree, node: NodeId, data: NodeId) -> Result<()> {
        if !tree.is_element(node) {
            return Ok(());
        }
        let registry = self.registry;
        let spec = if wordml::is_sdt(tree, node) {
            wordml::tag(tree, node)
                .map(tag::name_of)
                .filter(|name| !name.is_empty())
                .and_then(|name| registry.get(name))
        } else {
            None
        };
        match spec {
            Some(spec) => {
                trace!(placeholder = %spec.name, kind = ?spec.kind, "dispatching content control");
                let handler = self.handlers.handler(spec.kind);
                handler(self, tree, Region { node, data }, spec)
            }
            None => self.visit_children(tree, node, data),
        }
    }

    /// Visit the element children of `node` as they are now. Children
    /// inserted while visiting are not revisited; children moved elsewhere
    /// are skipped, and the rest are dropped once `node` itself has been
    /// removed from the document.
    pub fn visit_children(&mut self, tree: &mut XmlTree, node: NodeId, data: NodeId) -> Result<()> {
        let children: Vec<NodeId> = tree.child_elements(node).collect();
        for child in children {
            if !tree.is_attached(node) {
                break;
            }
            if tree.parent(child) != Some(node) {
                continue;
            }
            self.visit(tree, child, data)?;
        }
        Ok(())
    }

    /// The literal value behind a binding path: absolute paths point into the
    /// store, relative ones into the data at `at`.
    fn bound_value(&self, path: &str, at: NodeId) -> Option<String> {
        let compiled = LocationPath::compile(path).ok()?;
        if path.trim_start().starts_with('/') {
            let store = self.store_tree.as_ref()?;
            compiled.string_value(store, store.root())
        } else {
            compiled.string_value(self.data, at)
        }
    }
}

/// Default Ignore handler: the control and everything inside it stay as they are.
pub fn leave_untouched(
    _walk: &mut Walk<'_>,
    _tree: &mut XmlTree,
    _region: Region,
    _spec: &PlaceholderSpec,
) -> Result<()> {
    Ok(())
}

/// Default NonRecursive handler: retag with the item key and fill in the value.
pub fn fill_value(
    walk: &mut Walk<'_>,
    tree: &mut XmlTree,
    region: Region,
    spec: &PlaceholderSpec,
) -> Result<()> {
    let data = walk.data();
    if let Some(key) = spec.resolve_key(data, region.data) {
        wordml::set_tag(tree, region.node, &tag::encode(&spec.name, &key));
    }

    let binding = if walk.uses_data_binding() {
        spec.binding_path(data, region.data)
    } else {
        None
    };
    let value = match binding {
        Some(path) => {
            wordml::set_data_binding(tree, region.node, &path, walk.store_item_id());
            walk.bound_value(&path, region.data)
                .or_else(|| spec.resolve_value(data, region.data))
        }
        None => spec.resolve_value(data, region.data),
    };
    wordml::set_content(tree, region.node, value.as_deref().unwrap_or_default());
    Ok(())
}

/// Default Recursive handler: one copy of the region per collection item,
/// in collection order, then the template region is removed.
///
/// When the control sits inside a paragraph, the paragraph is the repeated
/// unit and everything else in each copy is walked against the item too.
/// The template paragraph goes away with the template control unless the
/// collection is empty, in which case only the control is removed and the
/// rest of the paragraph stays.
pub fn expand_items(
    walk: &mut Walk<'_>,
    tree: &mut XmlTree,
    region: Region,
    spec: &PlaceholderSpec,
) -> Result<()> {
    let data = walk.data();
    let sdt = region.node;
    let paragraph = tree.parent(sdt).filter(|&parent| tree.is(parent, "w:p"));
    let unit = paragraph.unwrap_or(sdt);

    let items = spec.select_items(data, region.data).unwrap_or_else(|| {
        warn!(placeholder = %spec.name, "lookup selected no collection; region removed");
        Vec::new()
    });
    debug!(placeholder = %spec.name, items = items.len(), "expanding recursive region");

    for &item in &items {
        let (copy, cloned_sdt) = tree.deep_clone_tracking(unit, sdt);
        tree.insert_before(unit, copy);
        let Some(cloned_sdt) = cloned_sdt else {
            continue;
        };
        if let Some(key) = spec.resolve_key(data, item) {
            wordml::set_tag(tree, cloned_sdt, &tag::encode(&spec.name, &key));
        }
        if copy == cloned_sdt {
            walk.visit_children(tree, cloned_sdt, item)?;
            continue;
        }
        let children: Vec<NodeId> = tree.child_elements(copy).collect();
        for child in children {
            if child == cloned_sdt {
                walk.visit_children(tree, cloned_sdt, item)?;
            } else if tree.parent(child) == Some(copy) {
                walk.visit(tree, child, item)?;
            }
        }
    }

    match paragraph {
        Some(paragraph) if items.is_empty() => {
            tree.detach(sdt);
            let remaining = tree
                .child_elements(paragraph)
                .any(|child| !tree.is(child, "w:pPr"));
            if !remaining {
                tree.detach(paragraph);
            }
        }
        _ => tree.detach(unit),
    }
    Ok(())
}

/// Default Container handler.
///
/// The first generation archives the control's markup in the store. Later
/// generations swap the live control for a fresh copy of that archive
/// before descending, so expanded content never compounds.
pub fn populate_container(
    walk: &mut Walk<'_>,
    tree: &mut XmlTree,
    region: Region,
    spec: &PlaceholderSpec,
) -> Result<()> {
    let mut node = region.node;
    match walk.store().archived(&spec.name).map(str::to_string) {
        Some(markup) => {
            let scope = tree.parent(node).unwrap_or(tree.root());
            let fresh = tree.import_fragment(&markup, scope).map_err(|e| {
                Error::CorruptStore(format!("archived container '{}': {}", spec.name, e))
            })?;
            tree.replace(node, fresh);
            node = fresh;
            debug!(placeholder = %spec.name, "restored container from archive");
        }
        None => {
            let markup =
                docweave_xml::fragment_xml(tree, node).map_err(|e| Error::xml("container", e))?;
            walk.store().record_archive(&spec.name, markup)?;
            debug!(placeholder = %spec.name, "archived container");
        }
    }

    if let Some(key) = spec.resolve_key(walk.data(), region.data) {
        wordml::set_tag(tree, node, &tag::encode(&spec.name, &key));
    }
    walk.visit_children(tree, node, region.data)
}

/// Fills templates and refreshes generated documents.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: EngineConfig,
}

impl Generator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate (or refresh) a document.
    ///
    /// Headers are walked first, then footers, then the body. Afterwards
    /// content control ids are made unique across all of them and the store
    /// is written back into the package.
    ///
    /// A refresh reads the archive from the package and writes it back, so
    /// concurrent refreshes of the same document must be serialized by the
    /// caller; otherwise the last write wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty template or when no
    /// registry is supplied and none can be introspected from the data.
    pub fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
        if request.template.is_empty() {
            return Err(Error::InvalidArgument("template document is empty".to_string()));
        }
        let introspected;
        let registry = match &request.registry {
            Some(registry) => registry,
            None => {
                introspected = Registry::from_data_context(&request.data);
                if introspected.is_empty() {
                    return Err(Error::InvalidArgument(
                        "no placeholder registry supplied and none declared in the data".to_string(),
                    ));
                }
                debug!(placeholders = introspected.len(), "introspected placeholder registry");
                &introspected
            }
        };

        let mut package = Package::open(&request.template)?;
        if package.convert_template_to_document()? {
            debug!("converted template package to a document");
        }
        let main = package.main_document_part()?;

        let mut parts: Vec<(String, XmlTree)> = Vec::new();
        for rel_type in [REL_HEADER, REL_FOOTER] {
            for part in package.related_parts(&main, rel_type)? {
                if package.has_part(&part) {
                    let tree = package.read_xml(&part)?;
                    parts.push((part, tree));
                }
            }
        }
        let body = package.read_xml(&main)?;
        parts.push((main.clone(), body));

        let mut store = AuxStore::load_or_create(&package, &main, &self.config.store_namespace)?;
        if let Some(metadata) = &request.metadata {
            store.set_metadata(metadata.clone());
        }
        if request.use_data_binding {
            store.set_snapshot(Some(request.data.to_fragment()?));
        }

        {
            let mut walk = Walk::new(
                registry,
                &request.data,
                &mut store,
                request.use_data_binding,
                self.config.handlers,
            )?;
            for (part, tree) in parts.iter_mut() {
                debug!(part = %part, "walking part");
                let root = tree.root();
                walk.visit(tree, root, request.data.root())?;
            }
        }

        let mut trees: Vec<&mut XmlTree> = parts.iter_mut().map(|(_, tree)| tree).collect();
        ids::ensure_unique_ids(&mut trees);

        store.save(&mut package, &main)?;
        for (part, tree) in &parts {
            package.write_xml(part, tree)?;
        }
        let bytes = package.to_bytes()?;
        info!(
            parts = parts.len(),
            archived = store.archive_len(),
            bytes = bytes.len(),
            "generated document"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DATA_ROOT_PATH, DEFAULT_STORE_NAMESPACE};
    use crate::wordml::W_NS;
    use docweave_xml::{outer_xml, parse};
    use pretty_assertions::assert_eq;

    const ORDER: &str = r#"<Order><Id>o-1</Id><Name>Test Order</Name><items><Item><Id>i-1</Id><Name>Item 1</Name></Item><Item><Id>i-2</Id><Name>Item 2</Name></Item></items></Order>"#;

    const ORDER_3: &str = r#"<Order><Id>o-1</Id><Name>Test Order</Name><items><Item><Id>i-1</Id><Name>Item 1</Name></Item><Item><Id>i-2</Id><Name>Item 2</Name></Item><Item><Id>i-3</Id><Name>Item 3</Name></Item></items></Order>"#;

    fn doc(body: &str) -> XmlTree {
        parse(&format!(
            r#"<w:document xmlns:w="{}"><w:body>{}</w:body></w:document>"#,
            W_NS, body
        ))
        .unwrap()
    }

    fn sdt(tag: &str, content: &str) -> String {
        format!(
            r#"<w:sdt><w:sdtPr><w:tag w:val="{}"/><w:id w:val="1"/></w:sdtPr><w:sdtContent>{}</w:sdtContent></w:sdt>"#,
            tag, content
        )
    }

    fn run(text: &str) -> String {
        format!("<w:r><w:t>{}</w:t></w:r>", text)
    }

    fn para(inner: &str) -> String {
        format!("<w:p>{}</w:p>", inner)
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
            PlaceholderSpec::new("N", PlaceholderKind::NonRecursive)
                .with_paths(None, Some("./Name[1]"))
                .unwrap(),
        );
        registry.insert(PlaceholderSpec::new("I", PlaceholderKind::Ignore));
        registry
    }

    fn walk_with(
        tree: &mut XmlTree,
        registry: &Registry,
        data: &DataContext,
        store: &mut AuxStore,
        handlers: HandlerTable,
    ) {
        let mut walk = Walk::new(registry, data, store, false, handlers).unwrap();
        let root = tree.root();
        walk.visit(tree, root, data.root()).unwrap();
    }

    fn walk(tree: &mut XmlTree, data: &DataContext, store: &mut AuxStore) {
        walk_with(tree, &registry(), data, store, HandlerTable::default());
    }

    fn tags(tree: &XmlTree) -> Vec<String> {
        tree.descendants_named(tree.root(), "w:sdt")
            .into_iter()
            .filter_map(|s| wordml::tag(tree, s).map(str::to_string))
            .collect()
    }

    fn texts_of(tree: &XmlTree, name: &str) -> Vec<String> {
        tree.descendants_named(tree.root(), "w:sdt")
            .into_iter()
            .filter(|s| wordml::tag(tree, *s).map(tag::name_of) == Some(name))
            .map(|s| wordml::region_text(tree, s))
            .collect()
    }

    #[test]
    fn test_block_recursive_region_repeats_in_order() {
        let data = DataContext::parse(ORDER).unwrap();
        let mut store = AuxStore::new(DEFAULT_STORE_NAMESPACE);
        let mut tree = doc(&sdt("R", &para(&sdt("N", &run("name")))));
        walk(&mut tree, &data, &mut store);

        assert_eq!(tags(&tree), vec!["R:i-1", "N", "R:i-2", "N"]);
        assert_eq!(texts_of(&tree, "N"), vec!["Item 1", "Item 2"]);
    }

    #[test]
    fn test_paragraph_is_repeated_unit() {
        let data = DataContext::parse(ORDER).unwrap();
        let mut store = AuxStore::new(DEFAULT_STORE_NAMESPACE);
        let mut tree = doc(&para(&format!("{}{}", run("- "), sdt("R", &sdt("N", &run("x"))))));
        walk(&mut tree, &data, &mut store);

        let body = wordml::body(&tree).unwrap();
        assert_eq!(tree.children_named(body, "w:p").len(), 2);
        assert_eq!(texts_of(&tree, "N"), vec!["Item 1", "Item 2"]);
    }

    #[test]
    fn test_empty_and_missing_collections_remove_region() {
        let mut store = AuxStore::new(DEFAULT_STORE_NAMESPACE);
        for data in ["<Order><items/></Order>", "<Order/>"] {
            let data = DataContext::parse(data).unwrap();
            let mut tree = doc(&format!("{}{}", sdt("R", &para(&run("x"))), para(&run("after"))));
            walk(&mut tree, &data, &mut store);
            assert!(tags(&tree).is_empty());
            assert_eq!(tree.text_content(tree.root()), "after");
        }
    }

    #[test]
    fn test_empty_collection_keeps_rest_of_paragraph() {
        let data = DataContext::parse("<Order><Id>o-1</Id><Name>Test Order</Name><items/></Order>").unwrap();
        let mut store = AuxStore::new(DEFAULT_STORE_NAMESPACE);
        let mut tree = doc(&para(&format!(
            "{}{}{}",
            run("Label: "),
            sdt("N", &run("t")),
            sdt("R", &sdt("N", &run("x")))
        )));
        walk(&mut tree, &data, &mut store);

        let body = wordml::body(&tree).unwrap();
        assert_eq!(tree.children_named(body, "w:p").len(), 1);
        assert_eq!(tags(&tree), vec!["N"]);
        assert_eq!(texts_of(&tree, "N"), vec!["Test Order"]);
        assert_eq!(tree.text_content(tree.root()), "Label: Test Order");
    }

    #[test]
    fn test_empty_collection_drops_paragraph_left_empty() {
        let data = DataContext::parse("<Order><items/></Order>").unwrap();
        let mut store = AuxStore::new(DEFAULT_STORE_NAMESPACE);
        let mut tree = doc(&format!(
            "{}{}",
            para(&format!("<w:pPr/>{}", sdt("R", &run("x")))),
            para(&run("after"))
        ));
        walk(&mut tree, &data, &mut store);

        let body = wordml::body(&tree).unwrap();
        assert_eq!(tree.children_named(body, "w:p").len(), 1);
        assert_eq!(tree.text_content(tree.root()), "after");
    }

    #[test]
    fn test_paragraph_siblings_filled_per_item() {
        let mut registry = registry();
        registry.insert(
            PlaceholderSpec::new("K", PlaceholderKind::NonRecursive)
                .with_paths(None, Some("./Id[1]"))
                .unwrap(),
        );
        let data = DataContext::parse(ORDER).unwrap();
        let mut store = AuxStore::new(DEFAULT_STORE_NAMESPACE);
        let mut tree = doc(&para(&format!(
            "{}{}",
            sdt("R", &sdt("N", &run("x"))),
            sdt("K", &run("t"))
        )));
        walk_with(&mut tree, &registry, &data, &mut store, HandlerTable::default());

        let body = wordml::body(&tree).unwrap();
        assert_eq!(tree.children_named(body, "w:p").len(), 2);
        assert_eq!(texts_of(&tree, "N"), vec!["Item 1", "Item 2"]);
        assert_eq!(texts_of(&tree, "K"), vec!["i-1", "i-2"]);
        assert_eq!(tree.text_content(tree.root()), "Item 1i-1Item 2i-2");
    }

    #[test]
    fn test_ignored_and_unknown_controls_untouched() {
        let data = DataContext::parse(ORDER).unwrap();
        let mut store = AuxStore::new(DEFAULT_STORE_NAMESPACE);
        let body = format!(
            "{}{}{}",
            sdt("I", &para(&sdt("N", &run("inner")))),
            sdt("Unknown:7", &para(&run("keep"))),
            sdt("", &para(&run("untagged")))
        );
        let mut tree = doc(&body);
        let before = outer_xml(&tree, tree.root()).unwrap();
        walk(&mut tree, &data, &mut store);
        assert_eq!(outer_xml(&tree, tree.root()).unwrap(), before);
    }

    #[test]
    fn test_unknown_control_is_descended_into() {
        let data = DataContext::parse(ORDER).unwrap();
        let mut store = AuxStore::new(DEFAULT_STORE_NAMESPACE);
        let mut tree = doc(&sdt("Other", &para(&sdt("N", &run("x")))));
        walk(&mut tree, &data, &mut store);
        assert_eq!(texts_of(&tree, "N"), vec!["Test Order"]);
        assert_eq!(tags(&tree)[0], "Other");
    }

    #[test]
    fn test_container_refresh_does_not_compound() {
        let mut store = AuxStore::new(DEFAULT_STORE_NAMESPACE);
        let template = sdt("C", &para(&sdt("R", &sdt("N", &run("x")))));
        let mut tree = doc(&template);

        let first = DataContext::parse(ORDER).unwrap();
        walk(&mut tree, &first, &mut store);
        assert_eq!(store.archive_len(), 1);
        assert_eq!(tags(&tree)[0], "C:o-1");
        assert_eq!(tree.descendants_named(tree.root(), "w:p").len(), 2);

        let second = DataContext::parse(ORDER_3).unwrap();
        walk(&mut tree, &second, &mut store);
        assert_eq!(store.archive_len(), 1);
        assert_eq!(tree.descendants_named(tree.root(), "w:p").len(), 3);
        assert_eq!(texts_of(&tree, "N"), vec!["Item 1", "Item 2", "Item 3"]);
        assert_eq!(tags(&tree)[0], "C:o-1");
    }

    #[test]
    fn test_corrupt_archive_is_reported() {
        let mut store = AuxStore::new(DEFAULT_STORE_NAMESPACE);
        store.record_archive("C", "<w:sdt>".to_string()).unwrap();
        let data = DataContext::parse(ORDER).unwrap();
        let registry = registry();
        let mut tree = doc(&sdt("C", &para(&run("x"))));
        let mut walk = Walk::new(&registry, &data, &mut store, false, HandlerTable::default()).unwrap();
        let root = tree.root();
        let err = walk.visit(&mut tree, root, data.root()).unwrap_err();
        assert!(matches!(err, Error::CorruptStore(_)));
    }

    fn shout(
        walk: &mut Walk<'_>,
        tree: &mut XmlTree,
        region: Region,
        spec: &PlaceholderSpec,
    ) -> Result<()> {
        if spec.name != "N" {
            return fill_value(walk, tree, region, spec);
        }
        let value = spec.resolve_value(walk.data(), region.data).unwrap_or_default();
        wordml::set_content(tree, region.node, &value.to_uppercase());
        Ok(())
    }

    #[test]
    fn test_handler_override_falls_through() {
        let mut registry = registry();
        registry.insert(
            PlaceholderSpec::new("Id", PlaceholderKind::NonRecursive)
                .with_paths(None, Some("./Id[1]"))
                .unwrap(),
        );
        let handlers = HandlerTable {
            non_recursive: shout,
            ..HandlerTable::default()
        };
        let data = DataContext::parse(ORDER).unwrap();
        let mut store = AuxStore::new(DEFAULT_STORE_NAMESPACE);
        let mut tree = doc(&format!("{}{}", sdt("N", &para(&run("x"))), sdt("Id", &para(&run("x")))));
        walk_with(&mut tree, &registry, &data, &mut store, handlers);
        assert_eq!(texts_of(&tree, "N"), vec!["TEST ORDER"]);
        assert_eq!(texts_of(&tree, "Id"), vec!["o-1"]);
    }

    #[test]
    fn test_data_binding_points_into_store() {
        let path = format!("{}/Order[1]/Name[1]", DATA_ROOT_PATH);
        let mut registry = Registry::new();
        registry.insert(
            PlaceholderSpec::new("N", PlaceholderKind::NonRecursive)
                .with_paths(None, Some(&path))
                .unwrap(),
        );
        let data = DataContext::parse(ORDER).unwrap();
        let mut store = AuxStore::new(DEFAULT_STORE_NAMESPACE);
        store.set_snapshot(Some(data.to_fragment().unwrap()));
        let item_id = store.item_id().to_string();

        let mut tree = doc(&sdt("N", &para(&run("x"))));
        {
            let mut walk =
                Walk::new(&registry, &data, &mut store, true, HandlerTable::default()).unwrap();
            let root = tree.root();
            walk.visit(&mut tree, root, data.root()).unwrap();
        }

        let node = tree.descendants_named(tree.root(), "w:sdt")[0];
        let binding = wordml::data_binding(&tree, node).unwrap();
        assert_eq!(binding.xpath, path);
        assert_eq!(binding.store_item_id.as_deref(), Some(item_id.as_str()));
        assert_eq!(wordml::region_text(&tree, node), "Test Order");
    }
}
