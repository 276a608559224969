//! Builtin registry history and golden corpus, embedded for standalone use.

/// Builtin pattern registry (all shipped versions).
pub static BUILTIN_REGISTRY: &str = include_str!("../../data/registry.json");

/// Builtin golden corpus of hand-verified company cards.
pub static BUILTIN_CORPUS: &str = include_str!("../../data/golden_cards.json");
