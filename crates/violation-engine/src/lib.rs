//! Violation Engine
//!
//! Evaluates per-frame features against the proctoring rules and converts the
//! jittery per-frame signal into a low-false-positive event stream: each
//! violation kind must hold for N consecutive frames before it fires, and a
//! per-kind cooldown bounds how often it can fire again. A predicate going
//! false for even one frame resets that kind's counter.

mod classifier;
mod rules;

pub use classifier::ViolationClassifier;
pub use rules::{ClassifierConfig, KindRule, Severity, ViolationKind, ViolationRecord};
