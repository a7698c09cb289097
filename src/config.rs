use crate::bridge::LabelKeys;
use crate::engine::EditCosts;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

// Defaults for parameters
const OUT_DIR_DEFAULT: &str = "out";
const EDIT_COST_MODE_DEFAULT: EditCostMode = EditCostMode::Auto;
const OPTIMAL_ORDERING_DEFAULT: bool = true;
const SEPARATOR_DEFAULT: char = ',';

/// Where the distance engine's edit costs come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCostMode {
    /// The engine's built-in constant costs.
    Constant,
    /// Costs registered with [`PipelineConfigBuilder::custom_costs`].
    Custom,
    /// Costs derived by the engine from a cost dataset.
    Auto,
}

impl FromStr for EditCostMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "constant" => Ok(EditCostMode::Constant),
            "custom" => Ok(EditCostMode::Custom),
            "auto" => Ok(EditCostMode::Auto),
            other => Err(format!(
                "unknown edit cost mode \"{other}\", expected constant, custom or auto"
            )),
        }
    }
}

/// Settings of a clustering run that stay fixed across stages. Use
/// `PipelineConfig::default()` unless a setting needs changing.
#[derive(Clone)]
pub struct PipelineConfig {
    pub(crate) out_dir: PathBuf,
    pub(crate) label_keys: LabelKeys,
    pub(crate) edit_cost_mode: EditCostMode,
    pub(crate) custom_costs: Option<Arc<dyn EditCosts>>,
    pub(crate) optimal_ordering: bool,
    pub(crate) separator: char,
}

/// Builder object to set custom pipeline settings.
pub struct PipelineConfigBuilder {
    out_dir: Option<PathBuf>,
    label_keys: Option<LabelKeys>,
    edit_cost_mode: Option<EditCostMode>,
    custom_costs: Option<Arc<dyn EditCosts>>,
    optimal_ordering: Option<bool>,
    separator: Option<char>,
}

impl PipelineConfig {
    /// Enters the builder pattern, allowing settings to be changed using various setter
    /// methods.
    ///
    /// # Returns
    /// * the pipeline configuration builder
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            out_dir: None,
            label_keys: None,
            edit_cost_mode: None,
            custom_costs: None,
            optimal_ordering: None,
            separator: None,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn label_keys(&self) -> &LabelKeys {
        &self.label_keys
    }

    pub fn edit_cost_mode(&self) -> EditCostMode {
        self.edit_cost_mode
    }

    pub fn custom_costs(&self) -> Option<&Arc<dyn EditCosts>> {
        self.custom_costs.as_ref()
    }

    pub fn optimal_ordering(&self) -> bool {
        self.optimal_ordering
    }

    pub fn separator(&self) -> char {
        self.separator
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Debug for PipelineConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("out_dir", &self.out_dir)
            .field("label_keys", &self.label_keys)
            .field("edit_cost_mode", &self.edit_cost_mode)
            .field("custom_costs", &self.custom_costs.is_some())
            .field("optimal_ordering", &self.optimal_ordering)
            .field("separator", &self.separator)
            .finish()
    }
}

impl PipelineConfigBuilder {
    /// Sets the directory artifacts are written to. Defaults to `out`.
    ///
    /// # Parameters
    /// * out_dir - the output directory
    ///
    /// # Returns
    /// * the pipeline configuration builder
    pub fn out_dir(mut self, out_dir: impl AsRef<Path>) -> PipelineConfigBuilder {
        self.out_dir = Some(out_dir.as_ref().to_path_buf());
        self
    }

    /// Sets the attribute keys holding node and edge labels in graph files. Empty keys
    /// are replaced by the defaults, `hgc-node-label` and `hgc-edge-label`.
    ///
    /// # Parameters
    /// * node - the node label key
    /// * edge - the edge label key
    ///
    /// # Returns
    /// * the pipeline configuration builder
    pub fn label_keys(mut self, node: &str, edge: &str) -> PipelineConfigBuilder {
        let defaults = LabelKeys::default();
        let node = PipelineConfigBuilder::key_or_default(node, &defaults.node, "node");
        let edge = PipelineConfigBuilder::key_or_default(edge, &defaults.edge, "edge");
        self.label_keys = Some(LabelKeys::new(node, edge));
        self
    }

    /// Sets where edit costs come from. Defaults to `Auto`.
    ///
    /// # Returns
    /// * the pipeline configuration builder
    pub fn edit_cost_mode(mut self, edit_cost_mode: EditCostMode) -> PipelineConfigBuilder {
        self.edit_cost_mode = Some(edit_cost_mode);
        self
    }

    /// Registers user supplied edit costs. They are only used when the pipeline is
    /// configured with custom edit costs.
    ///
    /// # Returns
    /// * the pipeline configuration builder
    pub fn custom_costs(mut self, costs: Arc<dyn EditCosts>) -> PipelineConfigBuilder {
        self.custom_costs = Some(costs);
        self
    }

    /// Sets whether clustering reorders leaves so that neighbouring leaves are as similar
    /// as possible. Slower, but gives a reproducible leaf layout. Defaults to true.
    pub fn optimal_ordering(mut self, optimal_ordering: bool) -> PipelineConfigBuilder {
        self.optimal_ordering = Some(optimal_ordering);
        self
    }

    /// Sets the field separator of attribute tables. Defaults to `,`.
    pub fn separator(mut self, separator: char) -> PipelineConfigBuilder {
        self.separator = Some(separator);
        self
    }

    /// Finishes the building of the configuration.
    ///
    /// # Returns
    /// * the pipeline configuration
    pub fn build(self) -> PipelineConfig {
        PipelineConfig {
            out_dir: self.out_dir.unwrap_or_else(|| PathBuf::from(OUT_DIR_DEFAULT)),
            label_keys: self.label_keys.unwrap_or_default(),
            edit_cost_mode: self.edit_cost_mode.unwrap_or(EDIT_COST_MODE_DEFAULT),
            custom_costs: self.custom_costs,
            optimal_ordering: self.optimal_ordering.unwrap_or(OPTIMAL_ORDERING_DEFAULT),
            separator: self.separator.unwrap_or(SEPARATOR_DEFAULT),
        }
    }

    fn key_or_default(key: &str, default: &str, element: &str) -> String {
        if key.trim().is_empty() {
            warn!("Empty {element} label key, using \"{default}\".");
            default.to_string()
        } else {
            key.to_string()
        }
    }
}
