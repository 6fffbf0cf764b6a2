//! Protocol registry for resolving `name:key=value` specifiers.
//!
//! The registry maps protocol names to an argument schema and a tokenizer
//! factory. A specifier such as `katcp:unescape` is split on `:`; the first
//! field names the protocol and each further field is `key` or `key=value`,
//! checked against that protocol's schema.
//!
//! # Example
//!
//! ```
//! use ntsh::protocol::ProtocolRegistry;
//!
//! let registry = ProtocolRegistry::builtin();
//! let config = registry.resolve("katcp:unescape").unwrap();
//!
//! assert_eq!(config.name(), "katcp");
//! assert!(config.options().flag("unescape"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::{KatcpTokenizer, PlainTokenizer, Tokenizer, TokenizedLine};

/// Errors from resolving a protocol specifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolConfigError {
    /// No protocol of this name is registered.
    #[error("'{name}' is not a recognised protocol (known: {known})")]
    UnknownProtocol {
        /// Requested protocol name.
        name: String,
        /// Comma separated list of registered names.
        known: String,
    },

    /// The key is not in the protocol's schema.
    #[error("'{key}' is not a valid argument for protocol {protocol} ({accepted})")]
    UnknownOption {
        /// Protocol being configured.
        protocol: String,
        /// Rejected key.
        key: String,
        /// The protocol's arguments with their help text.
        accepted: String,
    },

    /// A non-boolean argument was given without `=value`.
    #[error("Argument '{key}' for protocol {protocol} requires a value")]
    MissingValue {
        /// Protocol being configured.
        protocol: String,
        /// Key missing its value.
        key: String,
    },

    /// The value does not parse as the argument's kind.
    #[error("'{value}' is not a valid value for {key} in protocol {protocol}")]
    InvalidValue {
        /// Protocol being configured.
        protocol: String,
        /// Key being set.
        key: String,
        /// Rejected value.
        value: String,
    },
}

/// Type of a protocol argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Flag: bare `key` means true, or `key=true|false|yes|no|on|off|1|0`.
    Bool,
    /// Signed integer, `key=N`.
    Integer,
    /// Free text, `key=text`.
    Text,
}

/// Description of one protocol argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentSpec {
    /// Key as written in the specifier.
    pub name: &'static str,
    /// Value type.
    pub kind: ArgKind,
    /// One-line description, listed when an unknown argument is given.
    pub help: &'static str,
}

impl fmt::Display for ArgumentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ArgKind::Bool => write!(f, "{}: {}", self.name, self.help),
            ArgKind::Integer => write!(f, "{}=N: {}", self.name, self.help),
            ArgKind::Text => write!(f, "{}=TEXT: {}", self.name, self.help),
        }
    }
}

/// Human readable summary of a schema, e.g. `arguments: unescape: ...`.
fn describe_schema(schema: &[ArgumentSpec]) -> String {
    if schema.is_empty() {
        return "it takes no arguments".to_string();
    }
    let listed: Vec<String> = schema.iter().map(ToString::to_string).collect();
    format!("arguments: {}", listed.join("; "))
}

/// A parsed argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// Value of a [`ArgKind::Bool`] flag.
    Bool(bool),
    /// Value of an [`ArgKind::Integer`] argument.
    Integer(i64),
    /// Value of an [`ArgKind::Text`] argument, verbatim.
    Text(String),
}

/// Validated arguments for one protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolOptions {
    values: BTreeMap<String, ArgValue>,
}

impl ProtocolOptions {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Boolean flag; absent means false.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(ArgValue::Bool(true)))
    }

    /// Integer argument, if set.
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(ArgValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    /// Text argument, if set.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ArgValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Set a value, replacing any earlier one.
    pub fn insert(&mut self, key: impl Into<String>, value: ArgValue) {
        self.values.insert(key.into(), value);
    }

    /// Number of arguments set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no arguments were given.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A resolved protocol: its name, options, and the tokenizer built from them.
#[derive(Clone)]
pub struct ProtocolConfig {
    name: String,
    options: ProtocolOptions,
    tokenizer: Arc<dyn Tokenizer>,
}

impl ProtocolConfig {
    /// Plain text with no options.
    pub fn plain() -> Self {
        Self {
            name: "plain".to_string(),
            options: ProtocolOptions::new(),
            tokenizer: Arc::new(PlainTokenizer),
        }
    }

    /// Protocol name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validated options.
    pub fn options(&self) -> &ProtocolOptions {
        &self.options
    }

    /// Shared tokenizer instance.
    pub fn tokenizer(&self) -> Arc<dyn Tokenizer> {
        Arc::clone(&self.tokenizer)
    }

    /// Tokenize a line with this protocol.
    pub fn tokenize(&self, line: &str) -> TokenizedLine {
        self.tokenizer.tokenize(line)
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self::plain()
    }
}

impl fmt::Debug for ProtocolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolConfig")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Boxed tokenizer factory.
type Factory = Box<dyn Fn(&ProtocolOptions) -> Arc<dyn Tokenizer> + Send + Sync>;

/// Entry for a registered protocol.
struct ProtocolEntry {
    /// Accepted arguments.
    schema: &'static [ArgumentSpec],
    /// Builds a tokenizer from validated options.
    factory: Factory,
}

/// Registry mapping protocol names to schemas and tokenizer factories.
pub struct ProtocolRegistry {
    /// Protocols by name, kept sorted for listings.
    protocols: BTreeMap<String, ProtocolEntry>,
}

impl ProtocolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            protocols: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in `plain` and `katcp` protocols.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("plain", &[], PlainTokenizer::from_options);
        registry.register(
            "katcp",
            super::katcp::ARGUMENTS,
            KatcpTokenizer::from_options,
        );
        registry
    }

    /// Register a protocol, replacing any earlier one of the same name.
    ///
    /// # Arguments
    ///
    /// * `name` - Protocol name used in specifiers
    /// * `schema` - Arguments the protocol accepts
    /// * `factory` - Builds a tokenizer from validated options
    pub fn register<F, T>(&mut self, name: &str, schema: &'static [ArgumentSpec], factory: F)
    where
        F: Fn(&ProtocolOptions) -> T + Send + Sync + 'static,
        T: Tokenizer + 'static,
    {
        let factory: Factory =
            Box::new(move |options: &ProtocolOptions| -> Arc<dyn Tokenizer> {
                Arc::new(factory(options))
            });
        self.protocols
            .insert(name.to_string(), ProtocolEntry { schema, factory });
    }

    /// Check whether a protocol is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.protocols.contains_key(name)
    }

    /// Get the argument schema of a protocol.
    pub fn schema(&self, name: &str) -> Option<&'static [ArgumentSpec]> {
        self.protocols.get(name).map(|e| e.schema)
    }

    /// Registered protocol names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }

    /// Resolve a specifier such as `katcp:unescape` into a configuration.
    pub fn resolve(&self, specifier: &str) -> Result<ProtocolConfig, ProtocolConfigError> {
        let mut fields = specifier.split(':');
        let name = fields.next().unwrap_or_default();
        let entry = self
            .protocols
            .get(name)
            .ok_or_else(|| ProtocolConfigError::UnknownProtocol {
                name: name.to_string(),
                known: self.names().collect::<Vec<_>>().join(", "),
            })?;

        let mut options = ProtocolOptions::new();
        for field in fields {
            let (key, value) = match field.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (field, None),
            };
            let arg = entry
                .schema
                .iter()
                .find(|arg| arg.name == key)
                .ok_or_else(|| ProtocolConfigError::UnknownOption {
                    protocol: name.to_string(),
                    key: key.to_string(),
                    accepted: describe_schema(entry.schema),
                })?;
            options.insert(key, parse_value(name, arg, value)?);
        }

        tracing::debug!(protocol = name, ?options, "resolved protocol");
        Ok(ProtocolConfig {
            name: name.to_string(),
            tokenizer: (entry.factory)(&options),
            options,
        })
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn parse_value(
    protocol: &str,
    arg: &ArgumentSpec,
    value: Option<&str>,
) -> Result<ArgValue, ProtocolConfigError> {
    let invalid = |value: &str| ProtocolConfigError::InvalidValue {
        protocol: protocol.to_string(),
        key: arg.name.to_string(),
        value: value.to_string(),
    };

    match (arg.kind, value) {
        (ArgKind::Bool, None) => Ok(ArgValue::Bool(true)),
        (ArgKind::Bool, Some(v)) => match v.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(ArgValue::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(ArgValue::Bool(false)),
            _ => Err(invalid(v)),
        },
        (_, None) => Err(ProtocolConfigError::MissingValue {
            protocol: protocol.to_string(),
            key: arg.name.to_string(),
        }),
        (ArgKind::Integer, Some(v)) => v.parse().map(ArgValue::Integer).map_err(|_| invalid(v)),
        (ArgKind::Text, Some(v)) => Ok(ArgValue::Text(v.to_string())),
    }
}
