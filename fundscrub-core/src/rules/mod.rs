// Main rules module - the declarative rule set shared by the classifier,
// the validator and the rewriting instructions:
// - taxonomy.rs: noise rule table (pattern + category + context requirement)
// - repair.rs: digit-preserving in-line repairs and the digit verifier

pub mod repair;
pub mod taxonomy;

pub use repair::{digits_preserved, Repaired, Repairer, REPAIR_RULES};
pub use taxonomy::{
    ContextRequirement, Detector, NoiseRule, NoiseRuleSet, BANK_CARD_MARKER, NOISE_GLYPHS,
    NOISE_RULES,
};
