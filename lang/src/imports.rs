//! Bare-specifier discovery in script source.
//!
//! A textual scan over the current script snapshot, covering static and
//! dynamic imports, CommonJS requires, and triple-slash reference
//! directives. Relative and absolute specifiers are not external packages
//! and are skipped.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

fn specifier_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // import { x } from 'pkg' / import x from "pkg" / export ... from 'pkg'
            r#"(?:import|export)\s[^'"()]*?from\s*['"]([^'"]+)['"]"#,
            // side-effect import: import 'pkg'
            r#"import\s*['"]([^'"]+)['"]"#,
            // dynamic import: import('pkg')
            r#"import\s*\(\s*['"]([^'"]+)['"]"#,
            // CommonJS: require('pkg')
            r#"\brequire\s*\(\s*['"]([^'"]+)['"]"#,
        ]
        .iter()
        .map(|p| Regex::new(p).expect("specifier pattern"))
        .collect()
    })
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"///\s*<reference\s+types\s*=\s*"([^"]+)""#).expect("reference pattern")
    })
}

/// External package names referenced by `source`, deduplicated.
///
/// Subpath imports collapse to their package (`lodash/fp` → `lodash`,
/// `@scope/pkg/sub` → `@scope/pkg`); `node:` builtins are skipped.
#[must_use]
pub fn scan_imports(source: &str) -> BTreeSet<String> {
    let mut packages = BTreeSet::new();

    for pattern in specifier_patterns() {
        for capture in pattern.captures_iter(source) {
            if let Some(pkg) = bare_package(&capture[1]) {
                packages.insert(pkg);
            }
        }
    }
    for capture in reference_pattern().captures_iter(source) {
        if let Some(pkg) = bare_package(&capture[1]) {
            packages.insert(pkg);
        }
    }

    packages
}

/// Triple-slash `types` references in a declaration file.
#[must_use]
pub fn scan_reference_types(source: &str) -> BTreeSet<String> {
    reference_pattern()
        .captures_iter(source)
        .filter_map(|c| bare_package(&c[1]))
        .collect()
}

/// Reduces a module specifier to a bare package name, if it is one.
#[must_use]
pub fn bare_package(specifier: &str) -> Option<String> {
    if specifier.is_empty()
        || specifier.starts_with('.')
        || specifier.starts_with('/')
        || specifier.starts_with("node:")
    {
        return None;
    }

    let mut parts = specifier.split('/');
    let first = parts.next()?;
    if let Some(scope) = first.strip_prefix('@') {
        let name = parts.next()?;
        if scope.is_empty() || name.is_empty() {
            return None;
        }
        Some(format!("{first}/{name}"))
    } else {
        Some(first.to_string())
    }
}

/// Directory name used for a package's declarations under `@types`.
///
/// Scoped packages are mangled the way the registry publishes them:
/// `@scope/name` → `scope__name`.
#[must_use]
pub fn types_package_name(package: &str) -> String {
    match package.strip_prefix('@').and_then(|r| r.split_once('/')) {
        Some((scope, name)) => format!("{scope}__{name}"),
        None => package.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packages(source: &str) -> Vec<String> {
        scan_imports(source).into_iter().collect()
    }

    #[test]
    fn static_import_forms() {
        assert_eq!(packages("import { x } from 'left-pad'"), vec!["left-pad"]);
        assert_eq!(packages(r#"import x from "dayjs""#), vec!["dayjs"]);
        assert_eq!(packages("import 'polyfill'"), vec!["polyfill"]);
        assert_eq!(
            packages("export { thing } from 'shared-lib'"),
            vec!["shared-lib"]
        );
    }

    #[test]
    fn dynamic_import_and_require() {
        assert_eq!(packages("const m = await import('ms')"), vec!["ms"]);
        assert_eq!(packages("const fs = require('graceful-fs')"), vec!["graceful-fs"]);
    }

    #[test]
    fn relative_and_builtin_specifiers_are_skipped() {
        assert!(packages("import { a } from './local'").is_empty());
        assert!(packages("import { b } from '../up'").is_empty());
        assert!(packages("import { c } from '/abs'").is_empty());
        assert!(packages("import fs from 'node:fs'").is_empty());
    }

    #[test]
    fn subpaths_collapse_to_the_package() {
        assert_eq!(packages("import fp from 'lodash/fp'"), vec!["lodash"]);
        assert_eq!(
            packages("import { css } from '@emotion/react/jsx-runtime'"),
            vec!["@emotion/react"]
        );
    }

    #[test]
    fn reference_directives_are_discovered() {
        let source = "/// <reference types=\"node\" />\nimport x from 'ws'";
        assert_eq!(packages(source), vec!["node", "ws"]);
        assert_eq!(
            scan_reference_types(source).into_iter().collect::<Vec<_>>(),
            vec!["node"]
        );
    }

    #[test]
    fn duplicates_collapse() {
        let source = "import a from 'ms'\nimport b from 'ms'\nconst c = require('ms')";
        assert_eq!(packages(source), vec!["ms"]);
    }

    #[test]
    fn scoped_names_mangle_for_types_lookup() {
        assert_eq!(types_package_name("left-pad"), "left-pad");
        assert_eq!(types_package_name("@emotion/react"), "emotion__react");
    }
}
