// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment extraction failures into miette diagnostics.
//!
//! Unknown keys and unknown enum values (`quota.backend = "sqllite"`) get a
//! "did you mean" hint chosen by Jaro-Winkler similarity, and a source span
//! when the offending file can be located.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::{Error as FigmentError, Kind};
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Below this similarity no suggestion is offered.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// One problem found while loading `tripcast.toml`.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}` in {section}")]
    #[diagnostic(
        code(tripcast::config::unknown_key),
        help("{}", hint(suggestion.as_deref(), "valid keys", valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Dotted section path, or `top level`.
        section: String,
        suggestion: Option<String>,
        /// Comma-separated keys the section accepts.
        valid_keys: String,
        #[label("not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{value}` is not a valid value for `{key}`")]
    #[diagnostic(
        code(tripcast::config::unknown_value),
        help("{}", hint(suggestion.as_deref(), "accepted values", accepted))
    )]
    UnknownValue {
        key: String,
        value: String,
        suggestion: Option<String>,
        accepted: String,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(tripcast::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(tripcast::config::missing_key),
        help("every [[agencies]] entry needs `id` and `template_name`; add `{key} = ...`")
    )]
    MissingKey { key: String },

    /// Raised by [`crate::validation`] after a successful extraction.
    #[error("validation error: {message}")]
    #[diagnostic(code(tripcast::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(tripcast::config::other))]
    Other(String),
}

fn hint(suggestion: Option<&str>, what: &str, choices: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {what}: {choices}"),
        None => format!("{what}: {choices}"),
    }
}

/// Dotted path of the value the error points at, e.g. `retry.max_retries`.
fn dotted(path: &[String]) -> String {
    path.join(".")
}

/// Converts every error contained in `err`.
///
/// `toml_sources` holds `(path, content)` pairs used to attach spans.
pub fn figment_to_config_errors(
    err: FigmentError,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &FigmentError, toml_sources: &[(String, String)]) -> ConfigError {
    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let (span, src) = locate(error, field, toml_sources);
            ConfigError::UnknownKey {
                key: field.clone(),
                section: if error.path.is_empty() {
                    "top level".to_string()
                } else {
                    format!("[{}]", dotted(&error.path))
                },
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::UnknownVariant(value, accepted) => ConfigError::UnknownValue {
            key: dotted(&error.path),
            value: value.clone(),
            suggestion: suggest_key(value, accepted),
            accepted: accepted.join(", "),
        },
        Kind::MissingField(field) => {
            let mut path = error.path.clone();
            path.push(field.to_string());
            ConfigError::MissingKey { key: dotted(&path) }
        }
        Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
            key: dotted(&error.path),
            detail: format!("found {actual}, expected {expected}"),
            expected: expected.clone(),
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

/// Span of `field` in the file figment attributes the error to.
fn locate(
    error: &FigmentError,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some(figment::Source::File(file)) = error.metadata.as_ref().and_then(|m| m.source.as_ref())
    else {
        return (None, None);
    };
    let file = file.display().to_string();
    let Some((name, content)) = toml_sources.iter().find(|(p, _)| *p == file) else {
        return (None, None);
    };

    match find_key_offset(content, &error.path, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` as a key below the `[section]` (or
/// `[[section]]`) header named by `path[0]`; top-level keys are searched
/// before the first header.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let mut offset = 0;
    let mut in_section = path.is_empty();

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            let name = trimmed
                .trim_end()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .trim();
            in_section = path.first().is_some_and(|section| section == name);
        } else if in_section {
            if let Some(rest) = trimmed.strip_prefix(field) {
                if rest.trim_start().starts_with('=') {
                    return Some(offset + (line.len() - trimmed.len()));
                }
            }
        }
        offset += line.len();
    }
    None
}

/// Closest entry of `valid` to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid: &[&str]) -> Option<String> {
    valid
        .iter()
        .map(|candidate| (strsim::jaro_winkler(unknown, candidate), *candidate))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.to_string())
}

/// Prints each error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
