/*
 * protection.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Document editing restrictions (`w:documentProtection` in the settings part).
//!
//! The password is never stored. Word checks it against a salted SHA-512
//! hash: `H0 = SHA512(salt || UTF-16LE(password))`, then
//! `Hn = SHA512(Hn-1 || LE32(n - 1))` for every spin.

use crate::error::Result;
use crate::package::{CT_SETTINGS, Package, REL_SETTINGS};
use crate::wordml::W_NS;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use docweave_xml::{XmlDeclaration, XmlTree};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha512};
use tracing::debug;

const SPIN_COUNT: u32 = 100_000;
const SALT_LEN: usize = 16;
const SETTINGS_PART: &str = "word/settings.xml";

/// Settings children that must come before `w:documentProtection`.
const PRECEDING: &[&str] = &[
    "writeProtection",
    "view",
    "zoom",
    "removePersonalInformation",
    "removeDateAndTime",
    "doNotDisplayPageBoundaries",
    "displayBackgroundShape",
    "printPostScriptOverText",
    "printFractionalCharacterWidth",
    "printFormsData",
    "embedTrueTypeFonts",
    "embedSystemFonts",
    "saveSubsetFonts",
    "saveFormsData",
    "mirrorMargins",
    "alignBordersAndEdges",
    "bordersDoNotSurroundHeader",
    "bordersDoNotSurroundFooter",
    "gutterAtTop",
    "hideSpellingErrors",
    "hideGrammaticalErrors",
    "activeWritingStyle",
    "proofState",
    "formsDesign",
    "attachedTemplate",
    "linkStyles",
    "stylePaneFormatFilter",
    "stylePaneSortMethod",
    "documentType",
    "mailMerge",
    "revisionView",
    "trackRevisions",
    "doNotTrackMoves",
    "doNotTrackFormatting",
];

/// What editing remains allowed in a protected document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditRestriction {
    #[default]
    ReadOnly,
    /// Only form fields and content controls can be edited.
    Forms,
    Comments,
    TrackedChanges,
}

impl EditRestriction {
    /// Value of `w:edit`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "readOnly",
            Self::Forms => "forms",
            Self::Comments => "comments",
            Self::TrackedChanges => "trackedChanges",
        }
    }
}

/// A restriction plus the password that lifts it.
#[derive(Debug)]
pub struct Protection {
    pub edit: EditRestriction,
    pub password: SecretString,
}

impl Protection {
    pub fn new(edit: EditRestriction, password: SecretString) -> Self {
        Self { edit, password }
    }
}

/// Hash a password the way Word verifies `w:documentProtection`.
pub fn hash_password(password: &str, salt: &[u8], spin_count: u32) -> Vec<u8> {
    let utf16: Vec<u8> = password.encode_utf16().flat_map(u16::to_le_bytes).collect();
    let mut hash = Sha512::new().chain_update(salt).chain_update(&utf16).finalize();
    for i in 0..spin_count {
        hash = Sha512::new()
            .chain_update(hash)
            .chain_update(i.to_le_bytes())
            .finalize();
    }
    hash.to_vec()
}

/// Enforce `protection` on the package, replacing any existing protection.
/// Creates the settings part when the document has none.
pub fn protect(package: &mut Package, main_part: &str, protection: &Protection) -> Result<()> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = hash_password(protection.password.expose_secret(), &salt, SPIN_COUNT);

    let (part, mut settings) = settings_part(package, main_part)?;
    remove_protection(&mut settings);

    let root = settings.root();
    let spin_count = SPIN_COUNT.to_string();
    let hash_value = STANDARD.encode(&hash);
    let salt_value = STANDARD.encode(salt);
    let node = settings.create_element_with(
        "w:documentProtection",
        &[
            ("w:edit", protection.edit.as_str()),
            ("w:enforcement", "1"),
            ("w:algorithmName", "SHA-512"),
            ("w:hashValue", hash_value.as_str()),
            ("w:saltValue", salt_value.as_str()),
            ("w:spinCount", spin_count.as_str()),
        ],
    );
    let anchor = settings
        .child_elements(root)
        .filter(|c| {
            settings
                .name(*c)
                .is_some_and(|n| PRECEDING.contains(&n.local.as_str()))
        })
        .last();
    match anchor {
        Some(anchor) => settings.insert_after(anchor, node),
        None => settings.prepend_child(root, node),
    }

    package.write_xml(&part, &settings)?;
    debug!(part = %part, edit = protection.edit.as_str(), "document protection applied");
    Ok(())
}

/// Lift any editing restriction. Returns whether one was present.
pub fn unprotect(package: &mut Package, main_part: &str) -> Result<bool> {
    let Some(part) = package.related_parts(main_part, REL_SETTINGS)?.into_iter().next() else {
        return Ok(false);
    };
    if !package.has_part(&part) {
        return Ok(false);
    }
    let mut settings = package.read_xml(&part)?;
    if !remove_protection(&mut settings) {
        return Ok(false);
    }
    package.write_xml(&part, &settings)?;
    debug!(part = %part, "document protection removed");
    Ok(true)
}

/// The current protection restriction, if any is enforced.
pub fn restriction(package: &Package, main_part: &str) -> Result<Option<String>> {
    let Some(part) = package.related_parts(main_part, REL_SETTINGS)?.into_iter().next() else {
        return Ok(None);
    };
    if !package.has_part(&part) {
        return Ok(None);
    }
    let settings = package.read_xml(&part)?;
    Ok(settings
        .first_child(settings.root(), "w:documentProtection")
        .and_then(|p| settings.attribute(p, "w:edit"))
        .map(str::to_string))
}

fn remove_protection(settings: &mut XmlTree) -> bool {
    let existing = settings.children_named(settings.root(), "w:documentProtection");
    let found = !existing.is_empty();
    for node in existing {
        settings.detach(node);
    }
    found
}

fn settings_part(package: &mut Package, main_part: &str) -> Result<(String, XmlTree)> {
    if let Some(part) = package.related_parts(main_part, REL_SETTINGS)?.into_iter().next() {
        if package.has_part(&part) {
            let tree = package.read_xml(&part)?;
            return Ok((part, tree));
        }
    }
    let mut tree = XmlTree::new("w:settings");
    tree.set_declaration(Some(XmlDeclaration::default()));
    let root = tree.root();
    tree.set_attribute(root, "xmlns:w", W_NS);
    let part = if package.has_part(SETTINGS_PART) {
        package.next_free_name("word/settings", ".xml")
    } else {
        SETTINGS_PART.to_string()
    };
    package.write_xml(&part, &tree)?;
    package.add_relationship(main_part, REL_SETTINGS, &part)?;
    package.set_content_type_override(&part, CT_SETTINGS)?;
    Ok((part, tree))
}
