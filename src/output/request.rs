//! The set of output variables a downstream consumer requested.

use std::collections::{HashMap, HashSet};

use crate::variable::{self, key_type_index, Variable, VariableType};

/// Output variables requested by downstream Apps.
///
/// Built once per session from the literal list the platform supplies.
/// Lookups work by key alone or by key and type, since one key may be
/// requested with several types (`#App:1:ip!String` and
/// `#App:1:ip!StringArray`).
///
/// # Examples
///
/// ```
/// use tc_playbook::{OutputRequest, VariableType};
///
/// let request = OutputRequest::from_csv("#App:1:ip!String,#App:1:ip!StringArray");
/// assert!(request.is_requested("ip"));
/// assert!(request.is_requested_typed("ip", &VariableType::StringArray));
/// assert!(!request.is_requested_typed("ip", &VariableType::Binary));
/// assert_eq!(
///     request.variable("ip", &VariableType::String).map(|v| v.to_string()),
///     Some("#App:1:ip!String".to_string())
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct OutputRequest {
    variables: Vec<Variable>,
    by_key: HashMap<String, usize>,
    by_key_type: HashMap<String, usize>,
    literal: HashSet<String>,
}

impl OutputRequest {
    /// An empty request: nothing is requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a request from variable strings.
    ///
    /// Entries that are not valid variables are skipped with a warning.
    /// Duplicates are kept once.
    pub fn from_variables<I, S>(variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut request = Self::new();
        for raw in variables {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            match variable::parse(raw) {
                Some(parsed) => request.insert(parsed),
                None => tracing::warn!(entry = raw, "skipping invalid output variable"),
            }
        }
        request
    }

    /// Builds a request from the platform's comma-separated form.
    pub fn from_csv(raw: &str) -> Self {
        Self::from_variables(raw.split(','))
    }

    fn insert(&mut self, parsed: Variable) {
        let literal = parsed.to_string();
        if !self.literal.insert(literal) {
            return;
        }
        let index = self.variables.len();
        // Last registration wins for key-only lookups.
        self.by_key.insert(parsed.key().to_string(), index);
        self.by_key_type.insert(parsed.key_type(), index);
        self.variables.push(parsed);
    }

    /// Returns `true` when any variable with `key` was requested.
    pub fn is_requested(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Returns `true` when `key` was requested with `variable_type`.
    pub fn is_requested_typed(&self, key: &str, variable_type: &VariableType) -> bool {
        self.by_key_type.contains_key(&key_type_index(key, variable_type))
    }

    /// Returns `true` when exactly this variable was requested.
    pub fn contains(&self, variable: &Variable) -> bool {
        self.literal.contains(&variable.to_string())
    }

    /// The requested variable for `key` and `variable_type`.
    pub fn variable(&self, key: &str, variable_type: &VariableType) -> Option<&Variable> {
        self.by_key_type
            .get(&key_type_index(key, variable_type))
            .map(|&i| &self.variables[i])
    }

    /// The requested variable registered last for `key`.
    pub fn variable_by_key(&self, key: &str) -> Option<&Variable> {
        self.by_key.get(key).map(|&i| &self.variables[i])
    }

    /// Requested variables in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    /// Number of requested variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns `true` when nothing was requested.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for OutputRequest {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_variables(iter)
    }
}
