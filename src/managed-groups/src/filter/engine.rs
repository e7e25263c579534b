//! CEL filter compilation and evaluation

use cel_interpreter::objects::Value as CelValue;
use cel_interpreter::{Context, Program};
use serde_json::Value;
use tracing::debug;

use crate::filter::{
    convert::json_to_cel,
    error::{FilterError, Result},
};

/// Variable the evaluated item is bound to
pub const ITEM_VARIABLE: &str = "item";

/// Stateless entry point for filter syntax checks
pub struct FilterEngine;

impl FilterEngine {
    /// Check that `expr` is a syntactically valid expression
    ///
    /// # Errors
    /// Returns the parser's message when the expression cannot be compiled
    pub fn validate(expr: &str) -> Result<()> {
        Program::compile(expr)
            .map(|_| ())
            .map_err(|e| FilterError::Compilation(format!("{:?}", e)))
    }
}

/// Compiled filter over JSON items
///
/// An empty expression matches every item.
pub struct Filter {
    program: Option<Program>,
}

impl Filter {
    /// Compile a filter
    ///
    /// # Errors
    /// Returns error if the expression cannot be compiled
    pub fn new(expr: &str) -> Result<Self> {
        if expr.trim().is_empty() {
            return Ok(Self { program: None });
        }

        let program =
            Program::compile(expr).map_err(|e| FilterError::Compilation(format!("{:?}", e)))?;
        Ok(Self {
            program: Some(program),
        })
    }

    /// Evaluate the filter with `item` bound to the given value
    ///
    /// # Errors
    /// Returns error if evaluation fails or the result is not boolean
    pub fn evaluate(&self, item: &Value) -> Result<bool> {
        let Some(program) = &self.program else {
            return Ok(true);
        };

        let mut ctx = Context::default();
        ctx.add_variable_from_value(ITEM_VARIABLE, json_to_cel(item));

        let result = program
            .execute(&ctx)
            .map_err(|e| FilterError::Evaluation(format!("{:?}", e)))?;

        match result {
            CelValue::Bool(b) => Ok(b),
            _ => Err(FilterError::NonBooleanResult),
        }
    }

    /// Whether the item passes the filter; evaluation failures do not match
    pub fn matches(&self, item: &Value) -> bool {
        match self.evaluate(item) {
            Ok(matched) => matched,
            Err(e) => {
                debug!(error = %e, "Filter evaluation did not produce a match");
                false
            }
        }
    }
}
