//! Emergency screening of user-authored text.
//!
//! Runs before any completion call. Patterns are deliberately broad: a
//! missed emergency is worse than an unnecessary warning, so negations and
//! context are not considered.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::request::AnalysisRequest;

/// Kinds of emergency the screen recognises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyCategory {
    ChestPain,
    BreathingDifficulty,
    SevereHeadache,
    SevereBleeding,
    LossOfConsciousness,
    AlteredMentalState,
    Stroke,
    Anaphylaxis,
    SelfHarm,
    SevereAbdominalPain,
    CoughingBlood,
    Seizure,
    SevereBurn,
    PoisoningOverdose,
}

impl EmergencyCategory {
    /// Stable identifier for logs and metrics
    pub fn code(&self) -> &'static str {
        match self {
            Self::ChestPain => "chest_pain",
            Self::BreathingDifficulty => "breathing_difficulty",
            Self::SevereHeadache => "severe_headache",
            Self::SevereBleeding => "severe_bleeding",
            Self::LossOfConsciousness => "loss_of_consciousness",
            Self::AlteredMentalState => "altered_mental_state",
            Self::Stroke => "stroke",
            Self::Anaphylaxis => "anaphylaxis",
            Self::SelfHarm => "self_harm",
            Self::SevereAbdominalPain => "severe_abdominal_pain",
            Self::CoughingBlood => "coughing_blood",
            Self::Seizure => "seizure",
            Self::SevereBurn => "severe_burn",
            Self::PoisoningOverdose => "poisoning_overdose",
        }
    }

    /// Plain-language description used in the warning
    pub fn label(&self) -> &'static str {
        match self {
            Self::ChestPain => "chest pain or pressure",
            Self::BreathingDifficulty => "difficulty breathing",
            Self::SevereHeadache => "a sudden or severe headache",
            Self::SevereBleeding => "severe or uncontrolled bleeding",
            Self::LossOfConsciousness => "loss of consciousness or fainting",
            Self::AlteredMentalState => "confusion or an altered mental state",
            Self::Stroke => "possible stroke signs",
            Self::Anaphylaxis => "signs of a severe allergic reaction",
            Self::SelfHarm => "thoughts of suicide or self-harm",
            Self::SevereAbdominalPain => "severe abdominal pain",
            Self::CoughingBlood => "coughing or vomiting blood",
            Self::Seizure => "a seizure or convulsions",
            Self::SevereBurn => "a severe burn",
            Self::PoisoningOverdose => "possible poisoning or overdose",
        }
    }
}

impl fmt::Display for EmergencyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A positive screen result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmergencyMatch {
    pub category: EmergencyCategory,
    /// Which pattern fired (not the user's text)
    pub pattern: &'static str,
}

impl EmergencyMatch {
    /// User-facing warning for this match
    pub fn warning(&self) -> String {
        let mut warning = format!(
            "SEEK IMMEDIATE MEDICAL ATTENTION\n\n\
             Your description mentions {}, which may indicate a medical emergency. \
             Call 911 or go to the nearest emergency room now. \
             Do not drive yourself - call an ambulance if needed.",
            self.category.label()
        );
        if self.category == EmergencyCategory::SelfHarm {
            warning.push_str(
                "\n\nIf you are having thoughts of harming yourself, call or text 988 \
                 (Suicide & Crisis Lifeline, US) or your local emergency number right now. \
                 You do not have to go through this alone.",
            );
        }
        warning
    }
}

struct EmergencyPattern {
    regex: Regex,
    category: EmergencyCategory,
    description: &'static str,
}

fn pattern(regex_str: &str, category: EmergencyCategory, description: &'static str) -> EmergencyPattern {
    EmergencyPattern {
        regex: Regex::new(regex_str).expect("Invalid emergency regex pattern"),
        category,
        description,
    }
}

static EMERGENCY_PATTERNS: LazyLock<Vec<EmergencyPattern>> = LazyLock::new(|| {
    use EmergencyCategory::*;
    vec![
        pattern(
            r"(?i)\bchest\s+(?:pain|pressure|tightness|discomfort|heaviness)|\bheart\s+attack|\bpain\s+in\s+(?:my|the)\s+chest|\bcrushing[^.]*\bchest",
            ChestPain,
            "chest pain/pressure",
        ),
        pattern(
            r"(?i)\b(?:difficulty|trouble|struggling|hard)\s+(?:to\s+)?breath(?:e|ing)|\bcan'?t\s+breathe|\bcannot\s+breathe|\bunable\s+to\s+breathe|\bshort(?:ness)?\s+of\s+breath|\bgasping|\bnot\s+breathing",
            BreathingDifficulty,
            "breathing difficulty",
        ),
        pattern(
            r"(?i)\b(?:severe|worst|thunderclap|excruciating|sudden)\s+(?:\w+\s+){0,2}headache",
            SevereHeadache,
            "sudden/severe headache",
        ),
        pattern(
            r"(?i)\b(?:severe|heavy|uncontrolled|profuse)\s+bleeding|\bbleeding\s+(?:that\s+)?(?:won'?t|will\s+not|doesn'?t|does\s+not)\s+stop|\bcan'?t\s+stop\s+(?:the\s+)?bleeding|\bbleeding\s+heavily",
            SevereBleeding,
            "uncontrolled bleeding",
        ),
        pattern(
            r"(?i)\b(?:loss\s+of|lost|losing)\s+consciousness|\bpass(?:ed|es|ing)?\s+out|\bfaint(?:ed|ing|s)|\bblack(?:ed|ing|s)?\s+out|\bunconscious|\bunresponsive",
            LossOfConsciousness,
            "loss of consciousness",
        ),
        pattern(
            r"(?i)\bconfus|\bdisorient|\baltered\s+mental|\bdeliri",
            AlteredMentalState,
            "altered mental state",
        ),
        pattern(
            r"(?i)\bstroke|\b(?:face|facial)\s+droop|\bdrooping\s+(?:face|mouth|eyelid)|\barm\s+weakness|\bweakness\s+(?:on|in)\s+one\s+side|\bone\s+side\s+of\s+(?:my|the|his|her)\s+(?:body|face)|\bslurred\s+speech|\b(?:speech|speaking)\s+difficult|\bdifficulty\s+(?:speaking|talking)|\bsudden\s+numbness",
            Stroke,
            "stroke indicators",
        ),
        pattern(
            r"(?i)\banaphyla|\bsevere\s+allergic|\bthroat\s+(?:is\s+)?(?:swelling|closing|tightening)|\bswollen\s+(?:throat|tongue)|\btongue\s+(?:is\s+)?swelling",
            Anaphylaxis,
            "anaphylaxis signs",
        ),
        pattern(
            r"(?i)\bsuicid|\bself[-\s]?harm|\bhurt(?:ing)?\s+myself|\bkill(?:ing)?\s+myself|\bwant\s+to\s+die|\bend\s+my\s+life|\bno\s+reason\s+to\s+live",
            SelfHarm,
            "suicidal or self-harm ideation",
        ),
        pattern(
            r"(?i)\b(?:severe|excruciating|unbearable|intense)\s+(?:\w+\s+)?(?:abdominal|stomach|belly)\s+pain",
            SevereAbdominalPain,
            "severe abdominal pain",
        ),
        pattern(
            r"(?i)\bcough(?:ing|ed|s)?\s+(?:up\s+)?blood|\b(?:vomit(?:ing|ed)?|throw(?:ing)?\s+up)\s+blood|\bblood\s+in\s+(?:my\s+)?vomit|\bhemoptysis",
            CoughingBlood,
            "coughing or vomiting blood",
        ),
        pattern(
            r"(?i)\bseizure|\bconvuls",
            Seizure,
            "seizure",
        ),
        pattern(
            r"(?i)\b(?:severe|third[-\s]degree|chemical|electrical)\s+burn",
            SevereBurn,
            "severe burn",
        ),
        pattern(
            r"(?i)\bpoison|\boverdos|\btook\s+too\s+many\s+(?:pills|tablets|capsules)|\bswallowed\s+(?:bleach|chemicals|detergent)",
            PoisoningOverdose,
            "poisoning or overdose",
        ),
    ]
});

/// Screen a set of texts. Returns the first match in category order.
pub fn screen_texts<'a, I>(texts: I) -> Option<EmergencyMatch>
where
    I: IntoIterator<Item = &'a str>,
{
    let normalized: Vec<String> = texts
        .into_iter()
        .map(|t| t.replace(['\u{2018}', '\u{2019}'], "'"))
        .collect();

    EMERGENCY_PATTERNS.iter().find_map(|p| {
        normalized
            .iter()
            .any(|text| p.regex.is_match(text))
            .then_some(EmergencyMatch {
                category: p.category,
                pattern: p.description,
            })
    })
}

/// Screen every user-authored field of a validated request
pub fn screen_request(request: &AnalysisRequest) -> Option<EmergencyMatch> {
    screen_texts(request.screenable_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::SymptomEntry;

    fn category_of(text: &str) -> Option<EmergencyCategory> {
        screen_texts([text]).map(|m| m.category)
    }

    #[test]
    fn crushing_chest_pain_is_an_emergency() {
        assert_eq!(
            category_of("Sudden crushing chest pain radiating to left arm"),
            Some(EmergencyCategory::ChestPain)
        );
    }

    #[test]
    fn every_category_has_a_trigger() {
        let cases = [
            ("pressure in my chest, chest tightness", EmergencyCategory::ChestPain),
            ("I can’t breathe when lying down", EmergencyCategory::BreathingDifficulty),
            ("worst headache of my life", EmergencyCategory::SevereHeadache),
            ("a cut with bleeding that won't stop", EmergencyCategory::SevereBleeding),
            ("I passed out at work yesterday", EmergencyCategory::LossOfConsciousness),
            ("my father seems disoriented", EmergencyCategory::AlteredMentalState),
            ("face drooping on the left", EmergencyCategory::Stroke),
            ("my throat is closing after peanuts", EmergencyCategory::Anaphylaxis),
            ("having suicidal thoughts lately", EmergencyCategory::SelfHarm),
            ("severe lower abdominal pain since noon", EmergencyCategory::SevereAbdominalPain),
            ("coughing up blood in the mornings", EmergencyCategory::CoughingBlood),
            ("had a seizure this morning", EmergencyCategory::Seizure),
            ("third-degree burn on my hand", EmergencyCategory::SevereBurn),
            ("I think I took an overdose", EmergencyCategory::PoisoningOverdose),
            ("I have had two strokes in the past", EmergencyCategory::Stroke),
            ("severe burning on my arm after hot oil spill", EmergencyCategory::SevereBurn),
            ("she faints when she stands up", EmergencyCategory::LossOfConsciousness),
            ("he passes out after exercise", EmergencyCategory::LossOfConsciousness),
            ("periods of unconsciousness", EmergencyCategory::LossOfConsciousness),
            ("increasingly confusing thoughts and disorientation", EmergencyCategory::AlteredMentalState),
        ];
        for (text, expected) in cases {
            assert_eq!(category_of(text), Some(expected), "text: {text}");
        }
    }

    #[test]
    fn chronic_non_urgent_symptoms_pass() {
        for text in [
            "Fatigue for 3 months, worse after meals, also dry skin",
            "Joint stiffness in the mornings and brain fog",
            "Occasional bloating after dairy",
            "Mild headache at the end of the work day",
        ] {
            assert_eq!(category_of(text), None, "text: {text}");
        }
    }

    #[test]
    fn emergency_in_any_text_triggers() {
        let found = screen_texts(["tired all the time", "also I fainted twice"]);
        assert_eq!(
            found.map(|m| m.category),
            Some(EmergencyCategory::LossOfConsciousness)
        );
    }

    #[test]
    fn screen_request_sees_additional_context() {
        let request = AnalysisRequest {
            symptoms: vec![SymptomEntry::new("tired and achy for weeks")],
            age_range: None,
            existing_conditions: vec![],
            medications: vec![],
            additional_context: Some("I have been thinking about self-harm".into()),
            refinement: None,
        };
        assert_eq!(
            screen_request(&request).map(|m| m.category),
            Some(EmergencyCategory::SelfHarm)
        );
    }

    #[test]
    fn self_harm_warning_includes_crisis_line() {
        let m = EmergencyMatch {
            category: EmergencyCategory::SelfHarm,
            pattern: "x",
        };
        assert!(m.warning().contains("988"));

        let m = EmergencyMatch {
            category: EmergencyCategory::ChestPain,
            pattern: "x",
        };
        assert!(m.warning().contains("chest pain"));
        assert!(!m.warning().contains("988"));
    }
}
