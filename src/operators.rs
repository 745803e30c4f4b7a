//! Human descriptions for the PIT mutators we know about.
//! Lookup is total: unknown ids fall back to the report text, then the raw id.

const GREGOR: &str = "org.pitest.mutationtest.engine.gregor.mutators.";

pub struct MutatorInfo {
    pub short_name: &'static str,
    pub description: &'static str,
}

pub const KNOWN_MUTATORS: &[MutatorInfo] = &[
    MutatorInfo { short_name: "ConditionalsBoundaryMutator", description: "Changed conditional boundary (e.g., < to <=)" },
    MutatorInfo { short_name: "IncrementsMutator", description: "Changed increment/decrement (e.g., ++ to --)" },
    MutatorInfo { short_name: "MathMutator", description: "Changed math operator (e.g., + to -)" },
    MutatorInfo { short_name: "NegateConditionalsMutator", description: "Negated conditional (e.g., == to !=)" },
    MutatorInfo { short_name: "ReturnValsMutator", description: "Changed return value" },
    MutatorInfo { short_name: "VoidMethodCallMutator", description: "Removed void method call" },
    MutatorInfo { short_name: "EmptyObjectReturnValsMutator", description: "Replaced return with empty object" },
    MutatorInfo { short_name: "FalseReturnValsMutator", description: "Replaced boolean return with false" },
    MutatorInfo { short_name: "TrueReturnValsMutator", description: "Replaced boolean return with true" },
    MutatorInfo { short_name: "NullReturnValsMutator", description: "Replaced return with null" },
    MutatorInfo { short_name: "PrimitiveReturnsMutator", description: "Replaced primitive return with 0" },
];

/// Description for a fully-qualified mutator id, if it is one of ours.
pub fn known_description(mutator_id: &str) -> Option<&'static str> {
    let short = mutator_id.strip_prefix(GREGOR)?;
    KNOWN_MUTATORS
        .iter()
        .find(|m| m.short_name == short)
        .map(|m| m.description)
}

pub fn describe_mutator(mutator_id: &str, report_description: Option<&str>) -> String {
    if let Some(known) = known_description(mutator_id) {
        return known.to_string();
    }
    if let Some(desc) = report_description.filter(|d| !d.trim().is_empty()) {
        return desc.to_string();
    }
    if mutator_id.trim().is_empty() {
        return "unknown mutator".to_string();
    }
    mutator_id.to_string()
}
