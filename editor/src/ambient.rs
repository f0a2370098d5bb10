//! Synthetic ambient declarations from markup attributes.
//!
//! The ids and classes present in the markup panes become string-literal
//! overloads on `Document`, so the script pane autocompletes
//! `getElementById("…")` and friends against what the page actually
//! contains.

use std::collections::BTreeSet;
use std::fmt::Write;

/// Conventional path of the generated declaration file inside the worker's
/// virtual file system.
pub const AMBIENT_TYPES_PATH: &str = "index.d.ts";

/// Renders the ambient declaration file for the given id and class sets.
///
/// Tokens containing quotes or backslashes are skipped — they cannot appear
/// in a well-formed string-literal type and would corrupt the file.
#[must_use]
pub fn document_ambient_types(ids: &BTreeSet<String>, classes: &BTreeSet<String>) -> String {
    let mut members = String::new();

    for id in ids.iter().filter(|t| is_literal_safe(t)) {
        let _ = write!(
            members,
            "getElementById<E extends HTMLElement = HTMLElement>(elementId: '{id}'): E; \
             querySelector<E extends HTMLElement = HTMLElement>(query: '#{id}'): E; "
        );
    }

    for class in classes.iter().filter(|t| is_literal_safe(t)) {
        let _ = write!(
            members,
            "getElementsByClassName<E extends HTMLElement = HTMLElement>(className: '{class}'): HTMLCollection; \
             querySelector<E extends HTMLElement = HTMLElement>(query: '.{class}'): E; \
             querySelectorAll<E extends HTMLElement = HTMLElement>(query: '.{class}'): NodeList; "
        );
    }

    format!("export {{}}; declare global {{ interface Document {{ {members}}} }}")
}

fn is_literal_safe(token: &str) -> bool {
    !token.contains(['\'', '"', '\\'])
}
