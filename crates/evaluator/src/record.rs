use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use thiserror::Error;

use crate::error::EvaluationError;

/// The fixed set of fields a contract tag record carries.
///
/// Configuration and reports refer to fields by their snake_case name; JSON
/// Lines inputs use the human-readable keys returned by [`Field::json_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ContractAddress,
    ProjectName,
    PublicNameTag,
    UiLink,
    PublicNote,
}

/// Longest acceptable `Public Name Tag`, in characters.
pub const MAX_NAME_TAG_CHARS: usize = 50;

/// How a field's raw value is canonicalized before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    Identifier,
    Link,
    Text,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::ContractAddress,
        Field::ProjectName,
        Field::PublicNameTag,
        Field::UiLink,
        Field::PublicNote,
    ];

    /// Fields a tagging pipeline has to fill in for a given address.
    pub const DESCRIPTIVE: [Field; 4] = [
        Field::ProjectName,
        Field::PublicNameTag,
        Field::UiLink,
        Field::PublicNote,
    ];

    pub fn json_key(self) -> &'static str {
        match self {
            Field::ContractAddress => "Contract Address",
            Field::ProjectName => "Project Name",
            Field::PublicNameTag => "Public Name Tag",
            Field::UiLink => "UI/Website Link",
            Field::PublicNote => "Public Note",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::ContractAddress => "contract_address",
            Field::ProjectName => "project_name",
            Field::PublicNameTag => "public_name_tag",
            Field::UiLink => "ui_link",
            Field::PublicNote => "public_note",
        }
    }

    pub fn from_json_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.json_key() == key)
    }

    /// Accepts either the JSON key or the snake_case name.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.json_key() == key || field.name() == key)
    }

    pub fn normalization(self) -> Normalization {
        match self {
            Field::ContractAddress => Normalization::Identifier,
            Field::UiLink => Normalization::Link,
            Field::ProjectName | Field::PublicNameTag | Field::PublicNote => Normalization::Text,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed CAIP-10 address '{0}': expected namespace:chainId:address")]
pub struct MalformedAddress(pub String);

/// A CAIP-10 account identifier, `namespace:chainId:address`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractAddress {
    namespace: String,
    chain_id: String,
    address: String,
}

impl ContractAddress {
    pub fn parse(raw: &str) -> Result<Self, MalformedAddress> {
        let trimmed = raw.trim();
        let segments: Vec<&str> = trimmed.split(':').collect();
        let [namespace, chain_id, address] = segments.as_slice() else {
            return Err(MalformedAddress(trimmed.to_string()));
        };
        let well_formed = [namespace, chain_id, address]
            .iter()
            .all(|segment| !segment.is_empty() && !segment.chars().any(char::is_whitespace));
        if !well_formed {
            return Err(MalformedAddress(trimmed.to_string()));
        }
        Ok(Self {
            namespace: namespace.to_ascii_lowercase(),
            chain_id: chain_id.to_ascii_lowercase(),
            address: address.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Canonical form used for exact comparison: the address segment keeps its case.
    pub fn canonical(&self) -> String {
        format!("{}:{}:{}", self.namespace, self.chain_id, self.address)
    }

    /// Case-insensitive form used to join predictions to ground truth.
    pub fn join_key(&self) -> String {
        self.canonical().to_ascii_lowercase()
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.chain_id, self.address)
    }
}

/// Why an input line could not become a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputErrorKind {
    InvalidJson,
    NotAnObject,
    InvalidValue,
    MissingAddress,
    MalformedAddress,
}

/// A problem with a single input line. The line is excluded from scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputError {
    pub line: usize,
    pub kind: InputErrorKind,
    /// The raw `Contract Address`, when the line carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub reason: String,
}

impl InputError {
    pub fn new(
        line: usize,
        kind: InputErrorKind,
        key: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            line,
            kind,
            key,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "line {} ({}): {}", self.line, key, self.reason),
            None => write!(f, "line {}: {}", self.line, self.reason),
        }
    }
}

/// One contract's tags, loaded from a single JSON Lines entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    line: usize,
    address: ContractAddress,
    key: String,
    values: BTreeMap<Field, String>,
}

impl Record {
    pub fn new(line: usize, values: BTreeMap<Field, String>) -> Result<Self, InputError> {
        let raw_address = values.get(&Field::ContractAddress).ok_or_else(|| {
            InputError::new(
                line,
                InputErrorKind::MissingAddress,
                None,
                format!("missing required field '{}'", Field::ContractAddress),
            )
        })?;
        let address = ContractAddress::parse(raw_address).map_err(|err| {
            InputError::new(
                line,
                InputErrorKind::MalformedAddress,
                Some(raw_address.trim().to_string()),
                err.to_string(),
            )
        })?;
        let key = address.join_key();
        Ok(Self {
            line,
            address,
            key,
            values,
        })
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn address(&self) -> &ContractAddress {
        &self.address
    }

    /// The raw value of a field, or `None` when the entry did not carry it.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }
}

/// The on-disk shape of a record, used when emitting predictions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLine {
    #[serde(rename = "Contract Address")]
    pub contract_address: String,
    #[serde(rename = "Project Name", default)]
    pub project_name: String,
    #[serde(rename = "Public Name Tag", default)]
    pub public_name_tag: String,
    #[serde(rename = "UI/Website Link", default)]
    pub ui_link: String,
    #[serde(rename = "Public Note", default)]
    pub public_note: String,
}

impl RecordLine {
    /// A line with the address filled in and every descriptive field left empty.
    pub fn empty(contract_address: impl Into<String>) -> Self {
        Self {
            contract_address: contract_address.into(),
            ..Self::default()
        }
    }
}

/// Records loaded from one source, indexed by join key.
#[derive(Debug, Clone)]
pub struct RecordCollection {
    name: String,
    records: Vec<Record>,
    index: HashMap<String, usize>,
    errors: Vec<InputError>,
}

impl RecordCollection {
    /// Builds the collection, failing on the first duplicated join key.
    pub fn new(
        name: impl Into<String>,
        records: Vec<Record>,
        errors: Vec<InputError>,
    ) -> Result<Self, EvaluationError> {
        let name = name.into();
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if let Some(first) = index.insert(record.key().to_string(), position) {
                return Err(EvaluationError::DuplicateKey {
                    collection: name,
                    key: record.key().to_string(),
                    first_line: records[first].line(),
                    line: record.line(),
                });
            }
        }
        Ok(Self {
            name,
            records,
            index,
            errors,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.index.get(key).map(|&position| &self.records[position])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn errors(&self) -> &[InputError] {
        &self.errors
    }

    /// Raw addresses of lines rejected for a malformed CAIP-10 address.
    pub fn malformed_addresses(&self) -> impl Iterator<Item = &str> {
        self.errors
            .iter()
            .filter(|err| err.kind == InputErrorKind::MalformedAddress)
            .filter_map(|err| err.key.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: usize, address: &str) -> Record {
        let mut values = BTreeMap::new();
        values.insert(Field::ContractAddress, address.to_string());
        Record::new(line, values).unwrap()
    }

    #[test]
    fn parses_caip10_and_lowercases_namespace_and_chain() {
        let address = ContractAddress::parse("  EIP155:1:0xAbC ").unwrap();
        assert_eq!(address.namespace(), "eip155");
        assert_eq!(address.chain_id(), "1");
        assert_eq!(address.address(), "0xAbC");
        assert_eq!(address.canonical(), "eip155:1:0xAbC");
        assert_eq!(address.join_key(), "eip155:1:0xabc");
    }

    #[test]
    fn rejects_addresses_without_three_segments() {
        for raw in ["0xabc", "eip155:0xabc", "eip155::0xabc", "a:b:c:d", "eip155:1:0x a", ""] {
            assert!(ContractAddress::parse(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn field_keys_resolve_both_spellings() {
        assert_eq!(Field::from_key("UI/Website Link"), Some(Field::UiLink));
        assert_eq!(Field::from_key("ui_link"), Some(Field::UiLink));
        assert_eq!(Field::from_json_key("ui_link"), None);
        assert_eq!(Field::from_key("Website"), None);
    }

    #[test]
    fn record_requires_contract_address() {
        let err = Record::new(3, BTreeMap::new()).unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.kind, InputErrorKind::MissingAddress);
        assert!(err.reason.contains("Contract Address"));
    }

    #[test]
    fn malformed_addresses_are_kept_for_reporting() {
        let mut values = BTreeMap::new();
        values.insert(Field::ContractAddress, " 0xBBB ".to_string());
        let err = Record::new(4, values).unwrap_err();
        assert_eq!(err.kind, InputErrorKind::MalformedAddress);
        assert_eq!(err.key.as_deref(), Some("0xBBB"));

        let collection =
            RecordCollection::new("predictions", vec![record(1, "eip155:1:0xaaa")], vec![err])
                .unwrap();
        assert_eq!(collection.malformed_addresses().collect::<Vec<_>>(), vec!["0xBBB"]);
    }

    #[test]
    fn duplicate_keys_fail_the_collection() {
        let records = vec![record(1, "eip155:1:0xABC"), record(2, "eip155:1:0xabc")];
        let err = RecordCollection::new("predictions", records, Vec::new()).unwrap_err();
        match err {
            EvaluationError::DuplicateKey {
                collection,
                key,
                first_line,
                line,
            } => {
                assert_eq!(collection, "predictions");
                assert_eq!(key, "eip155:1:0xabc");
                assert_eq!((first_line, line), (1, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn record_line_uses_json_keys() {
        let line = RecordLine::empty("eip155:1:0xabc");
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["Contract Address"], "eip155:1:0xabc");
        assert_eq!(json["UI/Website Link"], "");
    }
}
