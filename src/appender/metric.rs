use crate::partition::Partition;

use super::Error;

pub const METRIC_NAME_LABEL: &str = "__name__";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Identity of a series: its sorted label set, canonical key and hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    name: String,
    labels: Vec<Label>,
    key: String,
    hash: u64,
}

impl Metric {
    pub fn new(mut labels: Vec<Label>) -> Result<Self, Error> {
        labels.sort();
        if let Some(label) = labels.iter().find(|l| !is_valid_label_name(&l.name)) {
            return Err(Error::InvalidMetric(format!("invalid label name {:?}", label.name)));
        }
        if let Some(pair) = labels.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(Error::InvalidMetric(format!("duplicate label {}", pair[0].name)));
        }

        let name = labels
            .iter()
            .find(|l| l.name == METRIC_NAME_LABEL)
            .map(|l| l.value.clone())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::InvalidMetric(format!("missing {} label", METRIC_NAME_LABEL)))?;

        let pairs: Vec<String> = labels
            .iter()
            .filter(|l| l.name != METRIC_NAME_LABEL)
            .map(|l| format!("{}=\"{}\"", l.name, escape_label_value(&l.value)))
            .collect();
        let key = format!("{}{{{}}}", name, pairs.join(","));

        let digest = blake3::hash(key.as_bytes());
        let mut first8 = [0u8; 8];
        first8.copy_from_slice(&digest.as_bytes()[..8]);

        Ok(Self {
            name,
            labels,
            key,
            hash: u64::from_le_bytes(first8),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Path of this metric's item inside `partition`
    pub fn item_path(&self, partition: &Partition) -> String {
        format!("{}/{}.{}", partition.path(), self.name, self.hash)
    }
}

/// Label names become column names, so they follow the `[a-zA-Z_][a-zA-Z0-9_]*` form
fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
