//! Embedded variable resolution.
//!
//! String payloads and KeyValue `value` fields may reference other
//! variables inline:
//!
//! ```text
//! "ip is #App:1:ip!String"           internal Playbook variable
//! "token is &{TC:TEXT:api_token}"     external, runtime-resolved
//! ```
//!
//! [`scan`] is a pure pass over the text. [`EmbeddedResolver`] looks each
//! match up once and builds the output from the original segments and the
//! replacements. Replacement text is never scanned again, so resolution is
//! exactly one level deep and chained references cannot expand further.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::codec::TypedValue;
use crate::constants::{BINARY_TOKEN, NULL_TOKEN};
use crate::variable::{self, Variable, VariableType};

fn embedded_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"(?P<internal>{})|(?P<external>[&$]\{{(?P<provider>[A-Za-z]+):(?P<lookup>[A-Za-z0-9_.\-\[\]]+):(?P<id>[A-Za-z0-9_.\-\[\]]+)\}})",
            variable::variable_pattern()
        );
        Regex::new(&pattern).expect("embedded pattern is valid")
    })
}

/// What an embedded match refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedRef {
    /// A Playbook variable in the same context.
    Internal(Variable),
    /// A runtime value such as `&{TC:TEXT:name}`.
    External {
        /// Provider segment, e.g. `TC`.
        provider: String,
        /// Lookup segment, e.g. `TEXT`.
        lookup: String,
        /// Identifier segment.
        id: String,
    },
}

/// One variable reference found in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedMatch {
    /// Byte range of the reference in the scanned text.
    pub range: Range<usize>,
    /// The parsed reference.
    pub reference: EmbeddedRef,
}

/// Finds every embedded reference in `text`, in order.
///
/// # Examples
///
/// ```
/// use tc_playbook::resolver::{scan, EmbeddedRef};
///
/// let found = scan("ip #App:1:ip!String and &{TC:TEXT:tok}");
/// assert_eq!(found.len(), 2);
/// assert!(matches!(found[0].reference, EmbeddedRef::Internal(_)));
/// assert_eq!(found[1].range, 24..38);
/// ```
pub fn scan(text: &str) -> Vec<EmbeddedMatch> {
    embedded_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            if let Some(m) = caps.name("internal") {
                let parsed = variable::parse(m.as_str())?;
                return Some(EmbeddedMatch {
                    range: m.range(),
                    reference: EmbeddedRef::Internal(parsed),
                });
            }
            let m = caps.name("external")?;
            Some(EmbeddedMatch {
                range: m.range(),
                reference: EmbeddedRef::External {
                    provider: caps["provider"].to_string(),
                    lookup: caps["lookup"].to_string(),
                    id: caps["id"].to_string(),
                },
            })
        })
        .collect()
}

/// Resolves external `&{Provider:Lookup:id}` references.
///
/// Implementations typically read from the App's runtime (keychain values,
/// environment, platform text variables). Without an external resolver,
/// external references are left in the text untouched.
#[async_trait]
pub trait ExternalResolver: Send + Sync {
    /// Returns the value for the reference, or `None` if it is unknown.
    async fn resolve(&self, provider: &str, lookup: &str, id: &str) -> Option<String>;
}

/// Reads internal variables for the resolver.
///
/// Implemented by [`PlaybookStore`](crate::playbook::PlaybookStore); lookups
/// must not perform embedded resolution themselves.
#[async_trait]
pub trait VariableLookup: Send + Sync {
    /// Reads and decodes `variable`, or `None` if it is absent or unreadable.
    async fn lookup(&self, variable: &Variable) -> Option<TypedValue>;
}

/// Renders a looked-up value as substitution text.
///
/// Structured values become compact JSON so the result stays valid when
/// embedded inside a JSON document.
pub fn render(value: Option<&TypedValue>) -> String {
    match value {
        None => NULL_TOKEN.to_string(),
        Some(value) if value.is_binary() => BINARY_TOKEN.to_string(),
        Some(TypedValue::String(s)) => s.clone(),
        Some(TypedValue::Raw(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
        Some(other) => other
            .to_json()
            .map_or_else(|| NULL_TOKEN.to_string(), |json| json.to_string()),
    }
}

/// Single-pass embedded variable resolver.
pub struct EmbeddedResolver<'a> {
    lookup: &'a dyn VariableLookup,
    external: Option<&'a dyn ExternalResolver>,
    max_scan_bytes: usize,
}

impl std::fmt::Debug for EmbeddedResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedResolver")
            .field("external", &self.external.is_some())
            .field("max_scan_bytes", &self.max_scan_bytes)
            .finish_non_exhaustive()
    }
}

impl<'a> EmbeddedResolver<'a> {
    /// Creates a resolver over `lookup`.
    pub fn new(lookup: &'a dyn VariableLookup, max_scan_bytes: usize) -> Self {
        Self {
            lookup,
            external: None,
            max_scan_bytes,
        }
    }

    /// Adds an external resolver.
    pub fn with_external(mut self, external: Option<&'a dyn ExternalResolver>) -> Self {
        self.external = external;
        self
    }

    /// Replaces every embedded reference in `text`.
    ///
    /// Binary-typed references become `<binary>` without a read; references
    /// that resolve to nothing become `<null>`. Texts longer than the scan
    /// bound are returned unchanged.
    pub async fn resolve_text(&self, text: &str) -> String {
        if text.len() > self.max_scan_bytes {
            tracing::warn!(
                len = text.len(),
                max = self.max_scan_bytes,
                "text exceeds embedded scan bound, returned unresolved"
            );
            return text.to_string();
        }

        let matches = scan(text);
        if matches.is_empty() {
            return text.to_string();
        }

        let mut resolved: HashMap<&str, String> = HashMap::new();
        let mut output = String::with_capacity(text.len());
        let mut cursor = 0;
        for m in &matches {
            let original = &text[m.range.clone()];
            output.push_str(&text[cursor..m.range.start]);
            cursor = m.range.end;

            if let Some(replacement) = resolved.get(original) {
                output.push_str(replacement);
                continue;
            }
            let replacement = match &m.reference {
                EmbeddedRef::Internal(var) => self.resolve_internal(var).await,
                EmbeddedRef::External { provider, lookup, id } => match self.external {
                    Some(external) => external
                        .resolve(provider, lookup, id)
                        .await
                        .unwrap_or_else(|| NULL_TOKEN.to_string()),
                    None => original.to_string(),
                },
            };
            output.push_str(&replacement);
            resolved.insert(original, replacement);
        }
        output.push_str(&text[cursor..]);
        output
    }

    /// Typed value of a variable referenced inside a text.
    pub async fn lookup(&self, variable: &Variable) -> Option<TypedValue> {
        self.lookup.lookup(variable).await
    }

    async fn resolve_internal(&self, variable: &Variable) -> String {
        if variable.variable_type().single() == VariableType::Binary {
            return BINARY_TOKEN.to_string();
        }
        let value = self.lookup.lookup(variable).await;
        tracing::debug!(variable = %variable, found = value.is_some(), "resolved embedded variable");
        render(value.as_ref())
    }
}
