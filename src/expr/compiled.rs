// expr/compiled.rs
// Compiled evaluator plus the process-wide compilation cache

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::ast::Expr;
use super::parser::{parse, SymbolTable};
use crate::error::ExprError;

/// A formula compiled against a fixed symbol schema: the value tree plus
/// one symbolic-derivative tree per feature variable. Shared across every
/// term of a force collection and, through the cache, across collections
/// using the same formula and schema. Never mutated after compilation.
#[derive(Debug)]
pub struct CompiledExpression {
    formula: String,
    value: Expr,
    derivatives: Vec<Expr>,
    n_features: usize,
    n_term_params: usize,
    n_globals: usize,
}

impl CompiledExpression {
    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn slot_count(&self) -> usize {
        self.n_features + self.n_term_params + self.n_globals
    }

    /// Evaluate the formula. Slot order is features, per-term parameters,
    /// globals; lengths must match the schema the formula was compiled
    /// against.
    pub fn evaluate(&self, features: &[f64], term_params: &[f64], globals: &[f64]) -> f64 {
        let slots = self.pack(features, term_params, globals);
        self.value.eval(&slots)
    }

    /// Evaluate d(value)/d(feature i).
    pub fn derivative(
        &self,
        feature: usize,
        features: &[f64],
        term_params: &[f64],
        globals: &[f64],
    ) -> f64 {
        let slots = self.pack(features, term_params, globals);
        self.derivatives[feature].eval(&slots)
    }

    /// Evaluate the value and every feature derivative in one pass over a
    /// shared slot array. This is the hot path used by the force evaluator.
    pub fn evaluate_with_gradient(
        &self,
        features: &[f64],
        term_params: &[f64],
        globals: &[f64],
        gradient: &mut [f64],
    ) -> f64 {
        let slots = self.pack(features, term_params, globals);
        for (i, d) in self.derivatives.iter().enumerate() {
            gradient[i] = d.eval(&slots);
        }
        self.value.eval(&slots)
    }

    fn pack(&self, features: &[f64], term_params: &[f64], globals: &[f64]) -> SmallVec<[f64; 8]> {
        debug_assert_eq!(features.len(), self.n_features);
        debug_assert_eq!(term_params.len(), self.n_term_params);
        debug_assert_eq!(globals.len(), self.n_globals);
        let mut slots = SmallVec::with_capacity(self.slot_count());
        slots.extend_from_slice(features);
        slots.extend_from_slice(term_params);
        slots.extend_from_slice(globals);
        slots
    }
}

static EXPR_CACHE: Lazy<Mutex<HashMap<String, Arc<CompiledExpression>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Compile a formula against a symbol schema, reusing a cached compilation
/// when the identical formula/schema pair has been seen before.
pub fn compile(
    formula: &str,
    features: &[&str],
    term_params: &[String],
    globals: &[String],
) -> Result<Arc<CompiledExpression>, ExprError> {
    // \u{1} cannot appear in identifiers or formulas, so the key is unambiguous.
    let key = format!(
        "{}\u{1}{}\u{1}{}\u{1}{}",
        formula,
        features.join(","),
        term_params.join(","),
        globals.join(","),
    );
    if let Some(cached) = EXPR_CACHE.lock().get(&key) {
        return Ok(Arc::clone(cached));
    }
    let symbols = SymbolTable {
        features,
        term_params,
        globals,
    };
    let value = parse(formula, &symbols)?;
    let derivatives = (0..features.len()).map(|i| value.diff(i)).collect();
    let compiled = Arc::new(CompiledExpression {
        formula: formula.to_string(),
        value,
        derivatives,
        n_features: features.len(),
        n_term_params: term_params.len(),
        n_globals: globals.len(),
    });
    EXPR_CACHE.lock().insert(key, Arc::clone(&compiled));
    Ok(compiled)
}
