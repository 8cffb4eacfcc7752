/*
 * tag.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The `name:instance` identity stored in a content control's tag.

/// Join a placeholder name and instance id.
pub fn encode(name: &str, instance: &str) -> String {
    format!("{}:{}", name, instance)
}

/// Split a tag on its first `:`.
///
/// A tag without a separator is all name; an empty tag decodes to two empty
/// strings. Never fails: callers treat an empty name as "not a placeholder".
pub fn decode(tag: &str) -> (&str, &str) {
    tag.split_once(':').unwrap_or((tag, ""))
}

/// The placeholder name half of a tag.
pub fn name_of(tag: &str) -> &str {
    decode(tag).0
}
