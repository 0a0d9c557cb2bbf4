//! Loading of the declarative route-mapping file.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::Direction;

/// Template pair for one route. An absent field means that direction is
/// undefined for the route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteTemplates {
    #[serde(default)]
    pub forward: Option<String>,
    #[serde(default)]
    pub reverse: Option<String>,
}

/// All route transformations, keyed by action name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub mappings: HashMap<String, RouteTemplates>,
}

impl MappingConfig {
    /// Template for a route and direction, if defined.
    pub fn template(&self, route: &str, direction: Direction) -> Option<&str> {
        let templates = self.mappings.get(route)?;
        match direction {
            Direction::Forward => templates.forward.as_deref(),
            Direction::Reverse => templates.reverse.as_deref(),
        }
    }
}

/// Error loading the mapping file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read mappings file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse mappings YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("no mappings found in configuration file")]
    Empty,
}

/// Read and parse the mapping file. A file with zero mappings is an error.
pub fn load_mappings(path: &Path) -> Result<MappingConfig, LoadError> {
    let raw = std::fs::read_to_string(path)?;
    let config = parse_mappings(&raw)?;

    tracing::info!(
        path = %path.display(),
        routes = config.mappings.len(),
        "loaded route mappings"
    );
    Ok(config)
}

fn parse_mappings(raw: &str) -> Result<MappingConfig, LoadError> {
    let config: MappingConfig = serde_yaml::from_str(raw)?;
    if config.mappings.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(config)
}
