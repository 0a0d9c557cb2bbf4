//! Per-route payload transformation.
//!
//! # Responsibilities
//! - Hold the route templates loaded at startup
//! - Apply a template to a JSON payload in a given direction
//! - Shape transform failures into the structured `mappingError` body
//!
//! # Design Decisions
//! - The expression engine is a port: a pure `(template, json) → json`
//!   evaluator injected at construction
//! - Mappings load once; absence of the file is non-fatal and yields a
//!   transformer with no mappings
//! - Errors keep route + direction so the client body can name them

pub mod jsonata;
pub mod loader;

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;

pub use jsonata::JsonataEvaluator;
pub use loader::{load_mappings, MappingConfig, RouteTemplates};

/// Direction of a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Reverse => f.write_str("reverse"),
        }
    }
}

/// What went wrong while applying a template.
#[derive(Debug, Error)]
pub enum TransformErrorKind {
    #[error("no {0} template defined")]
    TemplateNotDefined(Direction),

    #[error("input is not valid JSON: {0}")]
    ParseInput(String),

    #[error("template failed to compile: {0}")]
    CompileTemplate(String),

    #[error("template evaluation failed: {0}")]
    Evaluate(String),
}

/// A transformation failure, carrying the route and direction it hit.
#[derive(Debug, Error)]
#[error("transformation error for route '{route}' ({direction}): {kind}")]
pub struct TransformError {
    pub route: String,
    pub direction: Direction,
    #[source]
    pub kind: TransformErrorKind,
}

/// Pure expression evaluator the transformer delegates to.
pub trait TemplateEvaluator: Send + Sync {
    /// Evaluate `template` against `input`, returning the produced JSON.
    fn evaluate(&self, template: &str, input: &[u8]) -> Result<Vec<u8>, TransformErrorKind>;
}

/// Applies loaded route templates to request/response payloads.
pub struct Transformer {
    config: MappingConfig,
    evaluator: Arc<dyn TemplateEvaluator>,
}

impl Transformer {
    pub fn new(config: MappingConfig, evaluator: Arc<dyn TemplateEvaluator>) -> Self {
        Self { config, evaluator }
    }

    /// A transformer with no mappings; every `has_mapping` is false.
    pub fn disabled(evaluator: Arc<dyn TemplateEvaluator>) -> Self {
        Self {
            config: MappingConfig::default(),
            evaluator,
        }
    }

    /// Whether any template pair is defined for the route.
    pub fn has_mapping(&self, route: &str) -> bool {
        self.config.mappings.contains_key(route)
    }

    pub fn transform_forward(&self, route: &str, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        self.transform(route, Direction::Forward, input)
    }

    pub fn transform_reverse(&self, route: &str, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        self.transform(route, Direction::Reverse, input)
    }

    fn transform(
        &self,
        route: &str,
        direction: Direction,
        input: &[u8],
    ) -> Result<Vec<u8>, TransformError> {
        let fail = |kind| TransformError {
            route: route.to_string(),
            direction,
            kind,
        };

        let template = self
            .config
            .template(route, direction)
            .ok_or_else(|| fail(TransformErrorKind::TemplateNotDefined(direction)))?;

        tracing::debug!(route = %route, direction = %direction, "applying transformation");
        self.evaluator.evaluate(template, input).map_err(fail)
    }
}

/// Structured body returned to the client when a transform fails.
pub fn mapping_error_body(route: &str, err: &TransformError) -> Value {
    json!({
        "mappingError": {
            "route": route,
            "direction": err.direction.to_string(),
            "message": "Failed to transform response",
            "details": err.kind.to_string(),
        }
    })
}
