use crate::collection::GraphCollection;
use crate::HgcError;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Per-sample attributes read from a delimited table. The header row names the attributes,
/// the first column names the samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeTable {
    attributes: Vec<String>,
    samples: BTreeMap<String, BTreeMap<String, String>>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a table from `path`.
    ///
    /// # Parameters
    /// * `path` - the table file.
    /// * `separator` - the field separator, usually `,`.
    ///
    /// # Returns
    /// * `UnreadableSource` if the file can't be read, has no header, or names a sample twice.
    pub fn load(path: impl AsRef<Path>, separator: char) -> Result<Self, HgcError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| HgcError::unreadable(path, e))?;
        Self::parse_str(&text, separator).map_err(|reason| HgcError::unreadable(path, reason))
    }

    fn parse_str(text: &str, separator: char) -> Result<Self, String> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let header = lines.next().ok_or("the table has no header row")?;
        let attributes: Vec<String> = header
            .split(separator)
            .skip(1)
            .map(|name| name.trim().to_string())
            .collect();

        let mut samples = BTreeMap::new();
        for line in lines {
            let mut fields = line.split(separator).map(str::trim);
            let sample = fields.next().unwrap_or_default().to_string();
            let values: BTreeMap<String, String> = attributes
                .iter()
                .cloned()
                .zip(fields.map(str::to_string))
                .filter(|(_, value)| !value.is_empty())
                .collect();
            if samples.insert(sample.clone(), values).is_some() {
                return Err(format!("sample \"{sample}\" appears more than once"));
            }
        }
        Ok(Self {
            attributes,
            samples,
        })
    }

    /// Adds the samples of `other`, replacing the attributes of samples already known.
    pub fn merge(&mut self, other: AttributeTable) {
        for attribute in other.attributes {
            if !self.attributes.contains(&attribute) {
                self.attributes.push(attribute);
            }
        }
        for (sample, values) in other.samples {
            if self.samples.insert(sample.clone(), values).is_some() {
                warn!("Attributes of sample \"{sample}\" were loaded before and are overwritten.");
            }
        }
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn contains_sample(&self, sample: &str) -> bool {
        self.samples.contains_key(sample)
    }

    pub fn value(&self, sample: &str, attribute: &str) -> Option<&str> {
        self.samples
            .get(sample)
            .and_then(|values| values.get(attribute))
            .map(String::as_str)
    }
}

/// Builds one display label per graph of the collection, in graph id order.
///
/// With an empty `attribute` every label is `<id>_<graph name>`. Otherwise it is
/// `<id>_<attribute value>`, falling back to the graph name when the sample has no
/// attributes or lacks this one. Fallbacks are logged for the first `sample_graph_count`
/// graphs, which are the ones expected to have attributes.
pub fn generate_labels(
    collection: &dyn GraphCollection,
    attributes: &AttributeTable,
    attribute: &str,
    sample_graph_count: usize,
) -> Result<Vec<String>, HgcError> {
    let mut labels = Vec::with_capacity(collection.graph_count());
    for graph_id in 0..collection.graph_count() {
        let name = collection.graph_name(graph_id)?;
        if attribute.is_empty() {
            labels.push(format!("{graph_id}_{name}"));
            continue;
        }
        match attributes.value(&name, attribute) {
            Some(value) => labels.push(format!("{graph_id}_{value}")),
            None => {
                if graph_id < sample_graph_count {
                    if attributes.contains_sample(&name) {
                        warn!("Sample \"{name}\" has no value for attribute \"{attribute}\"; labelled by name.");
                    } else {
                        warn!("No attributes loaded for sample \"{name}\"; labelled by name.");
                    }
                }
                labels.push(format!("{graph_id}_{name}"));
            }
        }
    }
    Ok(labels)
}
