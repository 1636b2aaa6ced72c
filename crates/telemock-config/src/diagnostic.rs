// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment extraction failures into miette diagnostics.
//!
//! Unknown keys get a "did you mean" hint based on Jaro-Winkler similarity
//! and, when the offending file can be read, a labelled source span.

#![allow(unused_assignments)] // miette's Diagnostic derive trips this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Similarity above which a known key is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A configuration problem ready for rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(telemock::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a known key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for `{key}`: {detail}")]
    #[diagnostic(code(telemock::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(code(telemock::config::missing_key))]
    MissingKey { key: String },

    /// A value parsed but failed a semantic check.
    #[error("invalid value: {message}")]
    #[diagnostic(code(telemock::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(telemock::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? known keys: {valid_keys}"),
        None => format!("known keys: {valid_keys}"),
    }
}

/// Convert every error carried by a `figment::Error` into a [`ConfigError`].
///
/// `sources` pairs file paths with their contents and is only used to
/// attach source spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let (span, src) = locate(&error, field, sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion: suggest_key(field, expected),
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.to_string(),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {actual}"),
                expected: expected.clone(),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

fn locate(
    error: &figment::Error,
    field: &str,
    sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some(path) = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| s.file_path())
        .map(|p| p.display().to_string())
    else {
        return (None, None);
    };

    let Some((name, content)) = sources.iter().find(|(p, _)| *p == path) else {
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

/// Byte offset of `field` inside the `[section]` named by the first path element.
///
/// Top-level fields are searched from the start of the document.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = match path.first() {
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    let mut cursor = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        let assigns = trimmed
            .strip_prefix(field)
            .is_some_and(|rest| rest.trim_start().starts_with('='));
        if assigns {
            return Some(cursor + (line.len() - trimmed.len()));
        }
        cursor += line.len();
    }
    None
}

/// Best known key for a misspelled one, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|k| (strsim::jaro_winkler(unknown, k), *k))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, k)| k.to_string())
}

/// Print diagnostics to stderr with miette's graphical renderer.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}
