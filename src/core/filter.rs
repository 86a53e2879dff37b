//! Decides whether an observed object is forwarded to the callbacks.
//!
//! Two independent gates, both over the JSON form of the object:
//! - namespace inclusion (`matches_namespace`)
//! - expression exclusion (`matches_filter`, true means "drop")
//!
//! Evaluation problems never escape: an object that cannot be serialized has
//! no namespace and is not excluded; an expression that errors or yields a
//! non-boolean counts as `false` and bumps a diagnostic counter.

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::key::namespace_of;
use super::ExpressionEvaluator;
use super::PathExpressionEvaluator;
use crate::metrics::FILTER_NON_BOOLEAN_RESULTS;
use crate::Selector;

pub struct ObjectFilter {
    namespaces: Vec<String>,
    excludes: Vec<String>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    non_boolean_results: AtomicU64,
}

impl fmt::Debug for ObjectFilter {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ObjectFilter")
            .field("namespaces", &self.namespaces)
            .field("excludes", &self.excludes)
            .finish()
    }
}

impl ObjectFilter {
    pub fn new(selector: &Selector) -> Self {
        Self::with_evaluator(selector, Arc::new(PathExpressionEvaluator))
    }

    pub fn with_evaluator(
        selector: &Selector,
        evaluator: Arc<dyn ExpressionEvaluator>,
    ) -> Self {
        Self {
            namespaces: selector.namespaces.clone(),
            excludes: selector.excludes.clone(),
            evaluator,
            non_boolean_results: AtomicU64::new(0),
        }
    }

    /// True when there is no allow-list or the object's namespace is on it.
    pub fn matches_namespace<T: Serialize + ?Sized>(
        &self,
        obj: &T,
    ) -> bool {
        if self.namespaces.is_empty() {
            return true;
        }
        match serde_json::to_value(obj) {
            Ok(value) => self.namespace_allowed(&value),
            Err(e) => {
                debug!("namespace unknown, object not serializable: {}", e);
                false
            }
        }
    }

    /// True when any exclusion expression evaluates to `true`.
    pub fn matches_filter<T: Serialize + ?Sized>(
        &self,
        obj: &T,
    ) -> bool {
        if self.excludes.is_empty() {
            return false;
        }
        match serde_json::to_value(obj) {
            Ok(value) => self.excluded(&value),
            Err(e) => {
                debug!("exclusion skipped, object not serializable: {}", e);
                false
            }
        }
    }

    /// Inclusion gate passed and exclusion gate failed. Serializes once.
    pub fn accepts<T: Serialize + ?Sized>(
        &self,
        obj: &T,
    ) -> bool {
        if self.namespaces.is_empty() && self.excludes.is_empty() {
            return true;
        }
        match serde_json::to_value(obj) {
            Ok(value) => self.namespace_allowed(&value) && !self.excluded(&value),
            // no namespace can be determined
            Err(_) => self.namespaces.is_empty(),
        }
    }

    /// Number of expression results that were not booleans (or failed) and
    /// were counted as `false`.
    pub fn non_boolean_results(&self) -> u64 {
        self.non_boolean_results.load(Ordering::Relaxed)
    }

    fn namespace_allowed(
        &self,
        value: &Value,
    ) -> bool {
        if self.namespaces.is_empty() {
            return true;
        }
        namespace_of(value).is_some_and(|ns| self.namespaces.iter().any(|allowed| allowed == ns))
    }

    fn excluded(
        &self,
        value: &Value,
    ) -> bool {
        // every expression is evaluated so the diagnostics see all of them
        let mut excluded = false;
        for expression in &self.excludes {
            let outcome = self
                .evaluator
                .evaluate(expression, value)
                .map_err(|e| e.to_string())
                .and_then(|result| parse_bool(&result).ok_or(result));
            match outcome {
                Ok(true) => excluded = true,
                Ok(false) => {}
                Err(result) => {
                    self.non_boolean_results.fetch_add(1, Ordering::Relaxed);
                    FILTER_NON_BOOLEAN_RESULTS.with_label_values(&[expression.as_str()]).inc();
                    debug!(
                        expression = %expression,
                        result = %result,
                        "exclusion expression did not yield a boolean, treated as false"
                    );
                }
            }
        }
        excluded
    }
}

/// Boolean spellings accepted from an evaluator.
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
