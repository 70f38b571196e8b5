//! The canonical success predicate.
//!
//! An outcome record counts as successful if ANY of the following hold:
//! the `success` flag is `true`, the `status` equals `"completed"`, or a
//! graded `success_rate` is present and exceeds 0.5. All three checks are
//! evaluated independently; none short-circuits another.

use serde_json::{Map, Value};

/// Graded success rate above which a record counts as successful.
pub const GRADED_SUCCESS_THRESHOLD: f64 = 0.5;

/// Status label that marks a record as successful.
pub const COMPLETED_STATUS: &str = "completed";

/// Anything that carries the three success indicators.
pub trait SuccessSignal {
    /// Explicit boolean success flag.
    fn success_flag(&self) -> Option<bool>;

    /// Explicit status label.
    fn status_label(&self) -> Option<&str>;

    /// Graded success value, nominally in [0, 1].
    fn graded_rate(&self) -> Option<f64>;

    fn is_successful(&self) -> bool {
        let flagged = self.success_flag() == Some(true);
        let completed = self.status_label() == Some(COMPLETED_STATUS);
        let graded = self
            .graded_rate()
            .is_some_and(|rate| rate > GRADED_SUCCESS_THRESHOLD);
        flagged | completed | graded
    }
}

impl SuccessSignal for Map<String, Value> {
    fn success_flag(&self) -> Option<bool> {
        self.get("success").and_then(Value::as_bool)
    }

    fn status_label(&self) -> Option<&str> {
        self.get("status").and_then(Value::as_str)
    }

    fn graded_rate(&self) -> Option<f64> {
        self.get("success_rate").and_then(Value::as_f64)
    }
}

impl<T: SuccessSignal + ?Sized> SuccessSignal for &T {
    fn success_flag(&self) -> Option<bool> {
        (**self).success_flag()
    }

    fn status_label(&self) -> Option<&str> {
        (**self).status_label()
    }

    fn graded_rate(&self) -> Option<f64> {
        (**self).graded_rate()
    }
}

/// Fraction of `items` that satisfy the success predicate; 0.0 when empty.
pub fn success_rate<S: SuccessSignal>(items: &[S]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let successful = items.iter().filter(|item| item.is_successful()).count();
    successful as f64 / items.len() as f64
}
