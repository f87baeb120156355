use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use super::registry::DEFAULT_CHANNEL;

const BUNDLED_CHANNELS: &str = include_str!("../../../config/channels.json");

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("failed to read channel mapping {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid channel mapping: {0}")]
    Json(#[from] serde_json::Error),
    #[error("channel \"{0}\" is defined more than once")]
    DuplicateChannel(String),
    #[error("channel name \"{0}\" is reserved for the fallback destination")]
    ReservedName(String),
    #[error("channel name must not be blank")]
    BlankName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRule {
    pub name: String,
    pub marchitecture: BTreeSet<String>,
    pub products: BTreeSet<String>,
}

impl ChannelRule {
    pub fn new<M, P>(name: impl Into<String>, marchitecture: M, products: P) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            name: name.into(),
            marchitecture: marchitecture.into_iter().map(Into::into).collect(),
            products: products.into_iter().map(Into::into).collect(),
        }
    }
}

/// Channel rules in definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMapping {
    rules: Vec<ChannelRule>,
}

impl ChannelMapping {
    pub fn new(rules: Vec<ChannelRule>) -> Result<Self, MappingError> {
        let mut seen = HashSet::with_capacity(rules.len());
        for rule in &rules {
            let name = rule.name.trim();
            if name.is_empty() {
                return Err(MappingError::BlankName);
            }
            if name == DEFAULT_CHANNEL {
                return Err(MappingError::ReservedName(rule.name.clone()));
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(MappingError::DuplicateChannel(rule.name.clone()));
            }
        }
        Ok(Self { rules })
    }

    pub fn bundled() -> Result<Self, MappingError> {
        Self::from_json(BUNDLED_CHANNELS)
    }

    pub fn from_json(raw: &str) -> Result<Self, MappingError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, MappingError> {
        let raw = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Reads `path` when given, otherwise falls back to the bundled table.
    pub fn load(path: Option<&Path>) -> Result<Self, MappingError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::bundled(),
        }
    }

    pub fn rules(&self) -> &[ChannelRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSets {
    #[serde(default)]
    marchitecture: BTreeSet<String>,
    #[serde(default)]
    products: BTreeSet<String>,
}

struct MappingVisitor;

impl<'de> Visitor<'de> for MappingVisitor {
    type Value = Vec<ChannelRule>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object mapping channel names to topic sets")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut rules = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, sets)) = access.next_entry::<String, RuleSets>()? {
            rules.push(ChannelRule {
                name,
                marchitecture: sets.marchitecture,
                products: sets.products,
            });
        }
        Ok(rules)
    }
}

impl<'de> Deserialize<'de> for ChannelMapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rules = deserializer.deserialize_map(MappingVisitor)?;
        ChannelMapping::new(rules).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn bundled_mapping_keeps_definition_order() {
        let mapping = ChannelMapping::bundled().expect("bundled mapping must parse");
        let names: Vec<&str> = mapping.rules().iter().map(|rule| rule.name.as_str()).collect();

        assert_eq!(
            names,
            vec!["analytics", "containers", "frontend", "iot", "machine-learning"]
        );
        assert!(mapping.rules()[1].products.contains("amazon-ecs"));
    }

    #[test]
    fn order_follows_document_not_alphabet() {
        let mapping = ChannelMapping::from_json(
            r#"{"zeta": {"products": ["a"]}, "alpha": {"marchitecture": ["b"]}}"#,
        )
        .expect("mapping must parse");

        assert_eq!(mapping.rules()[0].name, "zeta");
        assert!(mapping.rules()[0].marchitecture.is_empty());
        assert_eq!(mapping.rules()[1].name, "alpha");
    }

    #[test]
    fn rejects_duplicate_channels() {
        let error = ChannelMapping::new(vec![
            ChannelRule::new("iot", ["internet-of-things"], Vec::<String>::new()),
            ChannelRule::new("iot", Vec::<String>::new(), ["aws-iot-core"]),
        ])
        .expect_err("duplicate names must fail");

        assert!(matches!(error, MappingError::DuplicateChannel(name) if name == "iot"));
    }

    #[test]
    fn rejects_reserved_default_name() {
        let result = ChannelMapping::from_json(r#"{"default": {"products": ["x"]}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_rule_fields() {
        let result = ChannelMapping::from_json(r#"{"iot": {"product": ["x"]}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn loads_mapping_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        write!(
            file,
            r#"{{"security": {{"marchitecture": ["security-identity-compliance"]}}}}"#
        )
        .expect("temp file should be writable");

        let mapping = ChannelMapping::load(Some(file.path())).expect("file mapping must load");
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.rules()[0].name, "security");
    }

    #[test]
    fn missing_file_is_io_error() {
        let error = ChannelMapping::from_file(Path::new("/nonexistent/channels.json"))
            .expect_err("missing file must fail");
        assert!(matches!(error, MappingError::Io { .. }));
    }
}
