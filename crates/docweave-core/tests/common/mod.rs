/*
 * common/mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! In-memory `.docx` packages for integration tests.

#![allow(dead_code)]

use docweave_core::package::{
    CT_DOCUMENT_MAIN, CT_SETTINGS, CT_TEMPLATE_MAIN, Package, REL_FOOTER, REL_HEADER,
    REL_OFFICE_DOCUMENT, REL_SETTINGS,
};
use docweave_core::wordml::{R_NS, W_NS};
use docweave_xml::XmlTree;
use std::io::{Cursor, Write};

const CT_HEADER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
const CT_FOOTER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";

#[derive(Debug, Clone, Default)]
pub struct DocxBuilder {
    body: String,
    headers: Vec<String>,
    footers: Vec<String>,
    settings: Option<String>,
    template: bool,
}

impl DocxBuilder {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            ..Self::default()
        }
    }

    /// Use the `.dotx` main content type.
    pub fn template(mut self) -> Self {
        self.template = true;
        self
    }

    pub fn header(mut self, content: &str) -> Self {
        self.headers.push(content.to_string());
        self
    }

    pub fn footer(mut self, content: &str) -> Self {
        self.footers.push(content.to_string());
        self
    }

    /// Inner markup of `w:settings`.
    pub fn settings(mut self, content: &str) -> Self {
        self.settings = Some(content.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let main_type = if self.template { CT_TEMPLATE_MAIN } else { CT_DOCUMENT_MAIN };
        let mut overrides = vec![("/word/document.xml".to_string(), main_type)];
        let mut rels = Vec::new();
        let mut files: Vec<(String, String)> = Vec::new();

        for (i, header) in self.headers.iter().enumerate() {
            let name = format!("header{}.xml", i + 1);
            overrides.push((format!("/word/{}", name), CT_HEADER));
            rels.push((REL_HEADER, name.clone()));
            files.push((
                format!("word/{}", name),
                format!(r#"<w:hdr xmlns:w="{}">{}</w:hdr>"#, W_NS, header),
            ));
        }
        for (i, footer) in self.footers.iter().enumerate() {
            let name = format!("footer{}.xml", i + 1);
            overrides.push((format!("/word/{}", name), CT_FOOTER));
            rels.push((REL_FOOTER, name.clone()));
            files.push((
                format!("word/{}", name),
                format!(r#"<w:ftr xmlns:w="{}">{}</w:ftr>"#, W_NS, footer),
            ));
        }
        if let Some(settings) = &self.settings {
            overrides.push(("/word/settings.xml".to_string(), CT_SETTINGS));
            rels.push((REL_SETTINGS, "settings.xml".to_string()));
            files.push((
                "word/settings.xml".to_string(),
                format!(r#"<w:settings xmlns:w="{}">{}</w:settings>"#, W_NS, settings),
            ));
        }

        let mut content_types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>"#,
        );
        for (part, content_type) in &overrides {
            content_types.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                part, content_type
            ));
        }
        content_types.push_str("</Types>");

        let package_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{}" Target="word/document.xml"/></Relationships>"#,
            REL_OFFICE_DOCUMENT
        );

        let mut document_rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (i, (rel_type, target)) in rels.iter().enumerate() {
            document_rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{}" Target="{}"/>"#,
                i + 1,
                rel_type,
                target
            ));
        }
        document_rels.push_str("</Relationships>");

        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{}" xmlns:r="{}"><w:body>{}</w:body></w:document>"#,
            W_NS, R_NS, self.body
        );

        files.push(("[Content_Types].xml".to_string(), content_types));
        files.push(("_rels/.rels".to_string(), package_rels));
        files.push(("word/document.xml".to_string(), document));
        files.push(("word/_rels/document.xml.rels".to_string(), document_rels));

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options: zip::write::FileOptions<'_, ()> =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in files {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

pub fn sdt(tag: &str, id: u32, content: &str) -> String {
    format!(
        r#"<w:sdt><w:sdtPr><w:tag w:val="{}"/><w:id w:val="{}"/></w:sdtPr><w:sdtContent>{}</w:sdtContent></w:sdt>"#,
        tag, id, content
    )
}

/// A content control bound into the document store.
pub fn bound_sdt(xpath: &str, content: &str) -> String {
    format!(
        r#"<w:sdt><w:sdtPr><w:dataBinding w:xpath="{}" w:storeItemID="{{00000000-0000-0000-0000-000000000000}}"/></w:sdtPr><w:sdtContent>{}</w:sdtContent></w:sdt>"#,
        xpath, content
    )
}

pub fn para(inner: &str) -> String {
    format!("<w:p>{}</w:p>", inner)
}

pub fn run(text: &str) -> String {
    format!("<w:r><w:t>{}</w:t></w:r>", text)
}

/// A `w:sectPr` with a page width marker and fixed margins.
pub fn section(width: u32) -> String {
    format!(
        r#"<w:sectPr><w:pgSz w:w="{}" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440"/></w:sectPr>"#,
        width
    )
}

pub fn open(bytes: &[u8]) -> Package {
    Package::open(bytes).unwrap()
}

pub fn document(bytes: &[u8]) -> XmlTree {
    open(bytes).read_xml("word/document.xml").unwrap()
}

/// Tags of every content control in `tree`, in document order.
pub fn tags(tree: &XmlTree) -> Vec<String> {
    tree.descendants_named(tree.root(), "w:sdt")
        .into_iter()
        .filter_map(|s| docweave_core::wordml::tag(tree, s).map(str::to_string))
        .collect()
}

/// Visible text of every control whose tag name is `name`.
pub fn texts(tree: &XmlTree, name: &str) -> Vec<String> {
    tree.descendants_named(tree.root(), "w:sdt")
        .into_iter()
        .filter(|s| docweave_core::wordml::tag(tree, *s).map(docweave_core::tag::name_of) == Some(name))
        .map(|s| docweave_core::wordml::region_text(tree, s))
        .collect()
}

/// Every `w:sdtPr/w:id` value in `tree`.
pub fn sdt_ids(tree: &XmlTree) -> Vec<String> {
    tree.descendants_named(tree.root(), "w:sdt")
        .into_iter()
        .filter_map(|s| docweave_core::wordml::id_element(tree, s))
        .filter_map(|id| tree.attribute(id, "w:val").map(str::to_string))
        .collect()
}
