//! Specialist vocabulary used to keep recommendations specific.

/// Specialist used by degraded results
pub const FALLBACK_SPECIALIST: &str = "Internal Medicine Specialist";

/// Generic provider labels that never count as a specialist recommendation.
/// Compared against the lowercased, trimmed specialist type.
const GENERIC_LABELS: &[&str] = &[
    "doctor",
    "a doctor",
    "your doctor",
    "physician",
    "medical doctor",
    "general physician",
    "general practitioner",
    "gp",
    "family doctor",
    "family physician",
    "family medicine",
    "family medicine physician",
    "healthcare provider",
    "health care provider",
    "general healthcare provider",
    "general health care provider",
    "medical professional",
    "clinician",
    "urgent care",
];

/// Substrings that mark a label as primary-care regardless of phrasing
const GENERIC_MARKERS: &[&str] = &["primary care", "general practi", "family doctor"];

/// Stems of recognised specialties. Matching is by substring on the lowercased label.
const SPECIALTY_STEMS: &[&str] = &[
    "allerg",
    "anesthesiolog",
    "audiolog",
    "cardiolog",
    "dermatolog",
    "dietitian",
    "endocrinolog",
    "gastroenterolog",
    "geneticist",
    "genetic counselor",
    "geriatric",
    "gynecolog",
    "hematolog",
    "hepatolog",
    "immunolog",
    "infectious disease",
    "integrative medicine",
    "functional medicine",
    "internal medicine",
    "internist",
    "nephrolog",
    "neurolog",
    "neurosurg",
    "nutrition",
    "obstetric",
    "oncolog",
    "ophthalmolog",
    "optometr",
    "orthopedi",
    "orthopaedi",
    "otolaryngolog",
    "ent specialist",
    "ear, nose",
    "pain medicine",
    "pain management",
    "pediatric",
    "physiatr",
    "physical medicine",
    "physical therap",
    "podiatr",
    "psychiatr",
    "psycholog",
    "pulmonolog",
    "radiolog",
    "reproductive",
    "rheumatolog",
    "sleep medicine",
    "sleep specialist",
    "sports medicine",
    "surgeon",
    "urolog",
    "vascular",
];

/// True when the label names a generic or primary-care provider
pub fn is_generic_provider(label: &str) -> bool {
    let normalized = normalize(label);
    GENERIC_LABELS.contains(&normalized.as_str())
        || GENERIC_MARKERS.iter().any(|m| normalized.contains(m))
}

/// True when the label contains a recognised specialty stem
pub fn is_known_specialty(label: &str) -> bool {
    let normalized = normalize(label);
    SPECIALTY_STEMS.iter().any(|stem| normalized.contains(stem))
}

/// A label is acceptable when it is a known specialty and not a generic provider
pub fn is_specific_specialty(label: &str) -> bool {
    !is_generic_provider(label) && is_known_specialty(label)
}

fn normalize(label: &str) -> String {
    label
        .trim()
        .trim_end_matches('.')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
