//! Playbook variable parsing.
//!
//! A Playbook variable is the canonical identifier of a stored value:
//!
//! ```text
//! #<AppType>:<jobId>:<key>!<Type>
//! #App:1234:threat.ip!String
//! ```
//!
//! `AppType` is letters only, `jobId` is digits, `key` is drawn from
//! alphanumerics plus `.`, `_`, `-`, `[` and `]`, and `Type` is one of the
//! standard types or a custom `[A-Za-z0-9_-]+` token.
//!
//! Input that does not match the grammar is not an error: [`parse`] returns
//! `None` and [`type_of`] reports [`VariableType::String`], which lets
//! literal values flow through the same read API as variable references.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PlaybookError;

/// Type alternation shared by the anchored parser and the embedded scanner.
///
/// Array names precede their single counterparts and the standard names
/// precede the custom token, so `!StringArray` never stops at `String` and
/// a custom token can never shadow a standard type.
pub(crate) const TYPE_PATTERN: &str = concat!(
    r"StringArray|BinaryArray|KeyValueArray|TCEntityArray|TCEnhancedEntityArray",
    r"|String|Binary|KeyValue|TCEntity|TCEnhancedEntity",
    r"|[A-Za-z0-9_-]+",
);

/// Unanchored variable pattern with named groups.
pub(crate) fn variable_pattern() -> String {
    format!(
        r"#(?P<app_type>[A-Za-z]+):(?P<job_id>\d+):(?P<key>[A-Za-z0-9_.\-\[\]]+)!(?P<type>{TYPE_PATTERN})"
    )
}

fn anchored_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("^{}$", variable_pattern())).expect("variable pattern is valid")
    })
}

/// Standard type names a custom token may not start with.
const RESERVED_PREFIXES: [&str; 5] = ["String", "Binary", "KeyValue", "TCEntity", "TCEnhancedEntity"];

/// The declared type of a Playbook variable.
///
/// The eight base kinds come in Single/Array pairs. The legacy enhanced
/// entity types are kept distinct so a parsed variable prints back
/// unchanged, but they encode and decode through the TCEntity codecs.
/// Anything else is a [`Custom`](Self::Custom) token, stored raw.
///
/// # Examples
///
/// ```
/// use tc_playbook::VariableType;
///
/// let t: VariableType = "StringArray".parse().unwrap();
/// assert_eq!(t, VariableType::StringArray);
/// assert!(t.is_array());
/// assert_eq!(t.single(), VariableType::String);
///
/// let custom: VariableType = "Indicator".parse().unwrap();
/// assert_eq!(custom, VariableType::Custom("Indicator".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VariableType {
    /// Base64-encoded bytes.
    Binary,
    /// Array of base64-encoded bytes.
    BinaryArray,
    /// A `{key, value}` record.
    KeyValue,
    /// Array of `{key, value}` records.
    KeyValueArray,
    /// Text.
    String,
    /// Array of text.
    StringArray,
    /// A `{id, value, type}` entity record.
    TcEntity,
    /// Array of entity records.
    TcEntityArray,
    /// Legacy enhanced entity, decoded as [`TcEntity`](Self::TcEntity).
    TcEnhancedEntity,
    /// Legacy enhanced entity array, decoded as [`TcEntityArray`](Self::TcEntityArray).
    TcEnhancedEntityArray,
    /// A non-standard type token.
    Custom(String),
}

impl VariableType {
    /// All standard (non-custom) types.
    pub const STANDARD: [VariableType; 10] = [
        Self::Binary,
        Self::BinaryArray,
        Self::KeyValue,
        Self::KeyValueArray,
        Self::String,
        Self::StringArray,
        Self::TcEntity,
        Self::TcEntityArray,
        Self::TcEnhancedEntity,
        Self::TcEnhancedEntityArray,
    ];

    /// Returns the wire name used in the variable suffix.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Binary => "Binary",
            Self::BinaryArray => "BinaryArray",
            Self::KeyValue => "KeyValue",
            Self::KeyValueArray => "KeyValueArray",
            Self::String => "String",
            Self::StringArray => "StringArray",
            Self::TcEntity => "TCEntity",
            Self::TcEntityArray => "TCEntityArray",
            Self::TcEnhancedEntity => "TCEnhancedEntity",
            Self::TcEnhancedEntityArray => "TCEnhancedEntityArray",
            Self::Custom(name) => name,
        }
    }

    /// Returns `true` for the Array kinds.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Self::BinaryArray
                | Self::KeyValueArray
                | Self::StringArray
                | Self::TcEntityArray
                | Self::TcEnhancedEntityArray
        )
    }

    /// Returns `true` for non-standard type tokens.
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// The Single counterpart of an Array kind; Single kinds map to themselves.
    pub fn single(&self) -> VariableType {
        match self {
            Self::BinaryArray => Self::Binary,
            Self::KeyValueArray => Self::KeyValue,
            Self::StringArray => Self::String,
            Self::TcEntityArray => Self::TcEntity,
            Self::TcEnhancedEntityArray => Self::TcEnhancedEntity,
            other => other.clone(),
        }
    }

    /// The Array counterpart of a Single kind; Array kinds map to themselves.
    ///
    /// Custom tokens have no Array counterpart and map to themselves.
    pub fn array(&self) -> VariableType {
        match self {
            Self::Binary => Self::BinaryArray,
            Self::KeyValue => Self::KeyValueArray,
            Self::String => Self::StringArray,
            Self::TcEntity => Self::TcEntityArray,
            Self::TcEnhancedEntity => Self::TcEnhancedEntityArray,
            other => other.clone(),
        }
    }

    /// The type whose codec handles this type.
    ///
    /// Enhanced entity types collapse onto the TCEntity codecs; every other
    /// type is its own codec kind.
    pub fn codec_kind(&self) -> VariableType {
        match self {
            Self::TcEnhancedEntity => Self::TcEntity,
            Self::TcEnhancedEntityArray => Self::TcEntityArray,
            other => other.clone(),
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for VariableType {
    fn from(name: &str) -> Self {
        match name {
            "Binary" => Self::Binary,
            "BinaryArray" => Self::BinaryArray,
            "KeyValue" => Self::KeyValue,
            "KeyValueArray" => Self::KeyValueArray,
            "String" => Self::String,
            "StringArray" => Self::StringArray,
            "TCEntity" => Self::TcEntity,
            "TCEntityArray" => Self::TcEntityArray,
            "TCEnhancedEntity" => Self::TcEnhancedEntity,
            "TCEnhancedEntityArray" => Self::TcEnhancedEntityArray,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for VariableType {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<VariableType> for String {
    fn from(variable_type: VariableType) -> Self {
        variable_type.as_str().to_string()
    }
}

impl FromStr for VariableType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// A parsed Playbook variable.
///
/// # Examples
///
/// ```
/// use tc_playbook::{Variable, VariableType};
///
/// let var: Variable = "#App:7979:threat.ip!String".parse().unwrap();
/// assert_eq!(var.app_type(), "App");
/// assert_eq!(var.job_id(), "7979");
/// assert_eq!(var.key(), "threat.ip");
/// assert_eq!(var.variable_type(), &VariableType::String);
/// assert_eq!(var.to_string(), "#App:7979:threat.ip!String");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    app_type: String,
    job_id: String,
    key: String,
    variable_type: VariableType,
}

impl Variable {
    /// Builds a variable from its parts without validating them.
    pub fn new(
        app_type: impl Into<String>,
        job_id: impl Into<String>,
        key: impl Into<String>,
        variable_type: VariableType,
    ) -> Self {
        Self {
            app_type: app_type.into(),
            job_id: job_id.into(),
            key: key.into(),
            variable_type,
        }
    }

    /// The producing App type (`App`, `Trigger`, ...).
    pub fn app_type(&self) -> &str {
        &self.app_type
    }

    /// The job id segment.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// The variable key name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The declared type.
    pub fn variable_type(&self) -> &VariableType {
        &self.variable_type
    }

    /// The `key-Type` index used to disambiguate one key registered with
    /// several types.
    pub fn key_type(&self) -> String {
        key_type_index(&self.key, &self.variable_type)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}:{}:{}!{}",
            self.app_type, self.job_id, self.key, self.variable_type
        )
    }
}

impl FromStr for Variable {
    type Err = PlaybookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s).ok_or_else(|| PlaybookError::InvalidVariable {
            key: s.to_string(),
            reason: "does not match #<AppType>:<jobId>:<key>!<Type>".to_string(),
        })
    }
}

/// Builds the `key-Type` index string.
pub(crate) fn key_type_index(key: &str, variable_type: &VariableType) -> String {
    format!("{key}-{variable_type}")
}

/// Parses a variable string, returning `None` when it does not match.
///
/// Surrounding whitespace is ignored. The whole remaining string must match
/// the grammar.
///
/// # Examples
///
/// ```
/// use tc_playbook::variable::parse;
///
/// assert!(parse("#App:1:name!String").is_some());
/// assert!(parse("  #Trigger:42:items[0]!StringArray ").is_some());
/// assert!(parse("just text").is_none());
/// assert!(parse("#App:x:name!String").is_none());
/// ```
pub fn parse(raw: &str) -> Option<Variable> {
    let caps = anchored_regex().captures(raw.trim())?;
    let type_token = &caps["type"];
    let variable_type = VariableType::from(type_token);
    if variable_type.is_custom()
        && RESERVED_PREFIXES
            .iter()
            .any(|prefix| type_token.starts_with(prefix))
    {
        return None;
    }
    Some(Variable {
        app_type: caps["app_type"].to_string(),
        job_id: caps["job_id"].to_string(),
        key: caps["key"].to_string(),
        variable_type,
    })
}

/// Returns `true` when `raw` is a Playbook variable.
pub fn is_variable(raw: &str) -> bool {
    parse(raw).is_some()
}

/// Returns the type of `raw`, defaulting to [`VariableType::String`] for
/// literal (non-variable) input.
///
/// # Examples
///
/// ```
/// use tc_playbook::variable::type_of;
/// use tc_playbook::VariableType;
///
/// assert_eq!(type_of("#App:1:e!TCEntity"), VariableType::TcEntity);
/// assert_eq!(type_of("1.2.3.4"), VariableType::String);
/// ```
pub fn type_of(raw: &str) -> VariableType {
    parse(raw).map_or(VariableType::String, |v| v.variable_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_standard_type() {
        for t in VariableType::STANDARD {
            let raw = format!("#App:1:k!{t}");
            let var = parse(&raw).unwrap_or_else(|| panic!("{raw} should parse"));
            assert_eq!(var.variable_type(), &t);
            assert_eq!(var.to_string(), raw);
        }
    }

    #[test]
    fn key_allows_brackets_dots_dashes() {
        let var = parse("#App:9:a.b_c-d[0]!String").unwrap();
        assert_eq!(var.key(), "a.b_c-d[0]");
    }

    #[test]
    fn custom_type_token() {
        let var = parse("#App:1:x!Address_Type-2").unwrap();
        assert_eq!(
            var.variable_type(),
            &VariableType::Custom("Address_Type-2".to_string())
        );
        assert!(var.variable_type().is_custom());
    }

    #[test]
    fn custom_token_cannot_extend_standard_name() {
        assert!(parse("#App:1:x!Stringy").is_none());
        assert!(parse("#App:1:x!BinaryBlob").is_none());
        assert!(parse("#App:1:x!TCEntityish").is_none());
    }

    #[test]
    fn rejects_malformed() {
        assert!(parse("").is_none());
        assert!(parse("#App:1:x").is_none());
        assert!(parse("#App1:1:x!String").is_none());
        assert!(parse("#App:1:x y!String").is_none());
        assert!(parse("prefix #App:1:x!String").is_none());
        assert!(parse("#App:1:x!String suffix").is_none());
        assert!(parse("#App:1:!String").is_none());
    }

    #[test]
    fn type_of_defaults_to_string() {
        assert_eq!(type_of("hello"), VariableType::String);
        assert_eq!(type_of("#App:1:x!BinaryArray"), VariableType::BinaryArray);
    }

    #[test]
    fn single_and_array_pairs() {
        assert_eq!(VariableType::KeyValue.array(), VariableType::KeyValueArray);
        assert_eq!(VariableType::KeyValueArray.single(), VariableType::KeyValue);
        assert_eq!(
            VariableType::TcEnhancedEntityArray.codec_kind(),
            VariableType::TcEntityArray
        );
        let custom = VariableType::Custom("X".to_string());
        assert_eq!(custom.array(), custom);
        assert!(!custom.is_array());
    }

    #[test]
    fn key_type_index_format() {
        let var = parse("#App:1:ip!StringArray").unwrap();
        assert_eq!(var.key_type(), "ip-StringArray");
    }

    #[test]
    fn variable_from_str_error() {
        let err = "nope".parse::<Variable>().unwrap_err();
        assert!(matches!(err, PlaybookError::InvalidVariable { .. }));
    }

    #[test]
    fn variable_type_serde_as_string() {
        let json = serde_json::to_string(&VariableType::TcEntityArray).unwrap();
        assert_eq!(json, "\"TCEntityArray\"");
        let back: VariableType = serde_json::from_str("\"Custom1\"").unwrap();
        assert_eq!(back, VariableType::Custom("Custom1".to_string()));
    }
}
