//! JSONata-backed template evaluator.
//!
//! Templates are compiled per evaluation; the arena and the compiled
//! expression share a lifetime, so nothing is cached across calls.

use bumpalo::Bump;
use jsonata_rs::JsonAta;

use super::{TemplateEvaluator, TransformErrorKind};

/// Evaluates route templates as JSONata expressions.
#[derive(Debug, Default)]
pub struct JsonataEvaluator;

impl JsonataEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateEvaluator for JsonataEvaluator {
    fn evaluate(&self, template: &str, input: &[u8]) -> Result<Vec<u8>, TransformErrorKind> {
        // Validate the input separately so parse failures are not
        // misreported as evaluation failures.
        let _: serde_json::Value = serde_json::from_slice(input)
            .map_err(|err| TransformErrorKind::ParseInput(err.to_string()))?;
        let input = std::str::from_utf8(input)
            .map_err(|err| TransformErrorKind::ParseInput(err.to_string()))?;

        let arena = Bump::new();
        let expr = JsonAta::new(template, &arena)
            .map_err(|err| TransformErrorKind::CompileTemplate(err.to_string()))?;

        let result = expr
            .evaluate(Some(input), None)
            .map_err(|err| TransformErrorKind::Evaluate(err.to_string()))?;

        let serialized = result.serialize(false);
        if serialized.is_empty() {
            // The expression produced no value; render it as JSON null.
            return Ok(b"null".to_vec());
        }
        Ok(serialized.into_bytes())
    }
}
