//! Prompt construction for the analysis, refinement, and follow-up question calls.
//!
//! Every builder is a pure function of its inputs so prompts can be
//! asserted on directly in tests.

use crate::contract::FORBIDDEN_PHRASES;
use crate::request::{AnalysisRequest, FollowupAnswer, SymptomEntry};
use crate::result::{AnalysisResult, Priority, SpecialistRecommendation};

/// Maximum number of specialists the generator may suggest
pub const MAX_SPECIALISTS: usize = 3;

const ROLE: &str = "You are a medical navigation advisor helping people find the right kind of specialist.";

const HOLISTIC_FRAMEWORK: &str = r#"HOLISTIC ANALYSIS FRAMEWORK:
Analyze the symptoms from a systems-medicine perspective. The body is an interconnected system: a problem in one area can surface as symptoms in seemingly unrelated areas.

Actively look for:
- Cross-system connections (e.g. hormonal changes affecting energy, weight, mood, and digestion together)
- Cascade effects (e.g. a nutritional deficiency producing neurological, skin, and immune symptoms)
- Bidirectional relationships (e.g. the gut-brain axis, immune-endocrine interactions)
- A root pattern that explains several symptoms at once

Pattern categories to consider:
- Endocrine/Hormonal: thyroid, adrenal, and reproductive hormones affecting energy, weight, mood, temperature, digestion
- Autoimmune: inflammation affecting several organ systems at once
- Nutritional: vitamin or mineral deficiencies with diverse effects (fatigue, nerves, skin, immunity)
- Metabolic: blood sugar dysregulation and insulin resistance across systems
- Inflammatory: chronic inflammation appearing in different body systems
- Gut-related: microbiome imbalance affecting digestion, mood, immunity, skin
- Stress/HPA axis: chronic stress affecting hormones, immunity, digestion, sleep

Worked connections:
- Fatigue + weight gain + cold sensitivity + constipation may point to thyroid-driven slowing of metabolism across systems
- Joint pain + fatigue + brain fog + digestive upset could suggest an autoimmune or systemic inflammatory process
- Fatigue + tingling + mood changes + pale skin might reflect a B12 deficiency affecting nerves, blood, and energy
- Headaches + fatigue + digestive issues + anxiety could involve the gut-brain axis

When a pattern fits, explain HOW the systems are linked and recommend the specialist who treats the ROOT system rather than each symptom separately."#;

const ANALYSIS_SHAPE: &str = r#"{
  "analysis": {
    "symptom_clusters": [
      {
        "symptoms": ["symptom1", "symptom2"],
        "possible_connections": "How and why these symptoms may connect across body systems",
        "system_involvement": "Body systems involved, e.g. 'Endocrine and Metabolic'"
      }
    ],
    "potential_root_causes": [
      {
        "category": "Specific category, e.g. 'Endocrine - Thyroid'",
        "description": "How this root cause could cascade into symptoms across body systems",
        "related_symptoms": ["symptom1", "symptom2"],
        "confidence": "possible|likely|consider",
        "systemic_explanation": "One-sentence summary of the cross-system link"
      }
    ]
  },
  "specialist_recommendations": [
    {
      "specialist_type": "Named specialty, e.g. 'Endocrinologist' or 'Rheumatologist'",
      "reason": "Why this specialist fits these symptoms",
      "priority": "primary|secondary",
      "what_they_treat": "What this specialist treats"
    }
  ],
  "educational_resources": [
    {
      "title": "Resource title",
      "source": "Credible source, e.g. 'NIH', 'Mayo Clinic', 'MedlinePlus'",
      "relevance": "Why this resource helps"
    }
  ],
  "next_steps": [
    "Actionable, non-prescriptive step, e.g. 'Consider scheduling a visit with the recommended specialist'"
  ]
}"#;

const REFINED_SHAPE: &str = r#"{
  "analysis": {
    "refinement_summary": "What the follow-up answers revealed about systemic connections, and what changed in the recommendations and why",
    "symptom_clusters": [
      {
        "symptoms": ["symptom1", "symptom2"],
        "possible_connections": "How the answers clarify the links between these symptoms",
        "system_involvement": "Body systems involved"
      }
    ],
    "potential_root_causes": [
      {
        "category": "Specific category",
        "description": "How this root cause could cascade across body systems, using the new information",
        "related_symptoms": ["symptom1"],
        "confidence": "possible|likely|consider"
      }
    ]
  },
  "specialist_recommendations": [
    {
      "specialist_type": "Named specialty",
      "reason": "Why this specialist fits, considering the follow-up answers",
      "priority": "primary|secondary",
      "what_they_treat": "What this specialist treats"
    }
  ],
  "educational_resources": [
    {"title": "Resource title", "source": "Credible source", "relevance": "Why this helps"}
  ],
  "next_steps": ["Actionable step considering the follow-up context"]
}"#;

const QUESTIONS_SHAPE: &str = r#"{
  "questions": [
    {
      "id": "q1",
      "question": "Clear, specific question?",
      "type": "text",
      "context": "Why this question matters",
      "options": null
    },
    {
      "id": "q2",
      "question": "Question with a fixed set of answers?",
      "type": "select",
      "context": "Why this helps",
      "options": ["Option 1", "Option 2", "Option 3"]
    }
  ]
}"#;

/// Build the prompt for a validated request, choosing the refinement
/// variant when the request carries refinement context.
pub fn build_prompt(request: &AnalysisRequest) -> String {
    match &request.refinement {
        Some(refinement) => build_refinement_prompt(
            request,
            &refinement.initial_analysis,
            &refinement.followup_answers,
        ),
        None => build_analysis_prompt(request),
    }
}

/// Prompt for the first analysis pass
pub fn build_analysis_prompt(request: &AnalysisRequest) -> String {
    let mut out = String::new();
    out.push_str(ROLE);
    out.push_str("\n\n");
    out.push_str(&constraints());
    out.push('\n');
    out.push_str(HOLISTIC_FRAMEWORK);
    out.push_str("\n\n");
    out.push_str(&user_information(request));
    out.push_str("\nSYMPTOMS:\n");
    for (i, symptom) in request.symptoms.iter().enumerate() {
        out.push_str(&detailed_symptom(i + 1, symptom));
    }
    out.push_str("\nTASK:\nAnalyze these symptoms and respond with JSON of exactly this shape:\n\n");
    out.push_str(ANALYSIS_SHAPE);
    out.push_str("\n\nProvide ONLY the JSON object, with no additional text.");
    out
}

/// Prompt for the refinement pass
pub fn build_refinement_prompt(
    request: &AnalysisRequest,
    initial: &AnalysisResult,
    answers: &[FollowupAnswer],
) -> String {
    let mut out = String::new();
    out.push_str(ROLE);
    out.push_str(" You are performing a REFINED analysis using the user's answers to follow-up questions.\n\n");

    out.push_str("ORIGINAL SYMPTOMS:\n");
    for (i, symptom) in request.symptoms.iter().enumerate() {
        out.push_str(&brief_symptom(i + 1, symptom));
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&user_information(request));

    out.push_str("\nINITIAL SPECIALIST RECOMMENDATIONS:\n");
    if initial.specialist_recommendations.is_empty() {
        out.push_str("- Under evaluation\n");
    }
    for rec in initial.specialist_recommendations.iter().take(MAX_SPECIALISTS) {
        out.push_str(&format!("- {} ({}): {}\n", rec.specialist_type, priority_label(rec), rec.reason));
    }

    let causes: Vec<&str> = initial
        .analysis
        .potential_root_causes
        .iter()
        .take(3)
        .map(|c| c.category.as_str())
        .collect();
    if !causes.is_empty() {
        out.push_str(&format!("\nINITIAL ROOT-CAUSE CATEGORIES: {}\n", causes.join(", ")));
    }

    out.push_str("\nFOLLOW-UP QUESTIONS & ANSWERS:\n");
    for (i, qa) in answers.iter().enumerate() {
        out.push_str(&format!("Q{n}: {}\nA{n}: {}\n\n", qa.question, qa.answer, n = i + 1));
    }

    out.push_str(
        "TASK:\nUse the follow-up answers to refine the analysis and update the specialist \
         recommendations. In `refinement_summary`, explain what the answers revealed, what \
         changed compared with the initial recommendations, and why (or why they stayed the same).\n\n",
    );
    out.push_str(HOLISTIC_FRAMEWORK);
    out.push_str("\n\n");
    out.push_str(&constraints());
    out.push_str("\nOUTPUT FORMAT (JSON only):\n");
    out.push_str(REFINED_SHAPE);
    out.push_str("\n\nProvide ONLY the JSON object, with no additional text.");
    out
}

/// Prompt for the secondary call that produces follow-up questions
pub fn build_question_prompt(request: &AnalysisRequest, initial: &AnalysisResult) -> String {
    let mut out = String::new();
    out.push_str(
        "You are a medical navigation advisor. Based on the initial symptom analysis below, \
         generate 3-5 specific follow-up questions that will help narrow down the specialist \
         recommendation.\n\n",
    );

    out.push_str("INITIAL SYMPTOMS:\n");
    for (i, symptom) in request.symptoms.iter().enumerate() {
        out.push_str(&brief_symptom(i + 1, symptom));
        out.push('\n');
    }

    let causes: Vec<&str> = initial
        .analysis
        .potential_root_causes
        .iter()
        .take(3)
        .map(|c| c.category.as_str())
        .collect();
    let specialists: Vec<&str> = initial
        .specialist_recommendations
        .iter()
        .take(MAX_SPECIALISTS)
        .map(|s| s.specialist_type.as_str())
        .collect();

    out.push_str("\nINITIAL ANALYSIS:\n");
    out.push_str(&format!(
        "Potential Root Causes: {}\n",
        join_or(&causes, "Under evaluation")
    ));
    out.push_str(&format!(
        "Specialist Recommendations: {}\n",
        join_or(&specialists, "To be determined")
    ));

    out.push_str(
        r#"
FOCUS:
Ask questions that reveal:
- The timeline of symptom development (what appeared first, what followed)
- Triggers and relieving factors (stress, diet, sleep, hormonal cycles)
- Related symptoms the person may not have connected (fatigue, digestion, mood, sleep, skin, temperature sensitivity)
- Details that distinguish between similar conditions or patterns

RULES:
- Use plain language, no medical jargon
- Never ask the person to diagnose themselves
- Each question must help identify a root cause or systemic pattern
- Questions must be answerable with free text or a simple selection
- Use ids "q1", "q2", ... in order; "select" questions must list their options, "text" questions use null options

OUTPUT FORMAT (JSON only):
"#,
    );
    out.push_str(QUESTIONS_SHAPE);
    out.push_str("\n\nGenerate 3-5 questions. Provide ONLY the JSON object, with no additional text.");
    out
}

fn constraints() -> String {
    let forbidden = FORBIDDEN_PHRASES
        .iter()
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CRITICAL RULES:\n\
         - Never diagnose conditions and never give treatment or medication advice\n\
         - Only suggest specialist types who can address the interconnected issues\n\
         - Use advisory language only: \"may indicate\", \"consider\", \"could be related to\"\n\
         - Never use these phrases anywhere in the response: {forbidden}\n\
         - Provide 1-{MAX_SPECIALISTS} specialist recommendations\n\
         - DO NOT recommend a \"Primary Care Physician\", general practitioner, family doctor, or any generic provider\n\
         - Every specialist_type must name a specific specialty (e.g. Endocrinologist, Rheumatologist, Gastroenterologist)\n\
         - Every root-cause description must explain the cross-system or cascading mechanism, not just name a label\n\
         - Include educational context from credible sources\n"
    )
}

fn user_information(request: &AnalysisRequest) -> String {
    format!(
        "USER INFORMATION:\n\
         Age Range: {}\n\
         Existing Conditions: {}\n\
         Current Medications: {}\n\
         Additional Context: {}\n",
        request.age_range.as_deref().unwrap_or("Not provided"),
        join_or(&as_strs(&request.existing_conditions), "None reported"),
        join_or(&as_strs(&request.medications), "None reported"),
        request.additional_context.as_deref().unwrap_or("None provided"),
    )
}

fn detailed_symptom(n: usize, symptom: &SymptomEntry) -> String {
    format!(
        "\nSymptom {n}:\n\
         - Description: {}\n\
         - Duration: {}\n\
         - Severity: {}\n\
         - Frequency: {}\n",
        symptom.description,
        symptom.duration.as_deref().unwrap_or("Not specified"),
        symptom.severity.map(|s| s.as_str()).unwrap_or("Not specified"),
        symptom.frequency.as_deref().unwrap_or("Not specified"),
    )
}

fn brief_symptom(n: usize, symptom: &SymptomEntry) -> String {
    format!(
        "{n}. {} (Duration: {}, Severity: {})",
        symptom.description,
        symptom.duration.as_deref().unwrap_or("Not specified"),
        symptom.severity.map(|s| s.as_str()).unwrap_or("Not specified"),
    )
}

fn priority_label(rec: &SpecialistRecommendation) -> &'static str {
    match rec.priority {
        Priority::Primary => "primary",
        Priority::Secondary => "secondary",
    }
}

fn as_strs(items: &[String]) -> Vec<&str> {
    items.iter().map(String::as_str).collect()
}

fn join_or(items: &[&str], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Refinement, Severity};
    use crate::result::{FollowupQuestion, QuestionType};

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            symptoms: vec![SymptomEntry {
                description: "Fatigue for 3 months, worse after meals".into(),
                duration: Some("3 months".into()),
                severity: Some(Severity::Moderate),
                frequency: None,
            }],
            age_range: Some("30-40".into()),
            existing_conditions: vec![],
            medications: vec!["levothyroxine".into()],
            additional_context: None,
            refinement: None,
        }
    }

    fn initial_result() -> AnalysisResult {
        AnalysisResult {
            specialist_recommendations: vec![SpecialistRecommendation {
                specialist_type: "Endocrinologist".into(),
                priority: Priority::Primary,
                reason: "Hormonal pattern".into(),
                what_they_treat: "Hormone disorders".into(),
            }],
            followup_questions: vec![FollowupQuestion {
                id: "q1".into(),
                question: "Do you feel cold often?".into(),
                question_type: QuestionType::Text,
                context: None,
                options: None,
            }],
            ..AnalysisResult::default()
        }
    }

    #[test]
    fn analysis_prompt_embeds_rules_framework_data_and_shape() {
        let prompt = build_analysis_prompt(&request());
        assert!(prompt.contains("Never diagnose"));
        assert!(prompt.contains("Primary Care Physician"));
        assert!(prompt.contains("\"you have\""));
        assert!(prompt.contains("Gut-related"));
        assert!(prompt.contains("Stress/HPA axis"));
        assert!(prompt.contains("- Description: Fatigue for 3 months, worse after meals"));
        assert!(prompt.contains("- Severity: moderate"));
        assert!(prompt.contains("- Frequency: Not specified"));
        assert!(prompt.contains("Current Medications: levothyroxine"));
        assert!(prompt.contains("Existing Conditions: None reported"));
        assert!(prompt.contains("\"specialist_recommendations\""));
        assert!(!prompt.contains("refinement_summary"));
    }

    #[test]
    fn refinement_prompt_embeds_transcript_and_prior_recommendations() {
        let mut req = request();
        req.refinement = Some(Refinement {
            initial_analysis: initial_result(),
            followup_answers: vec![FollowupAnswer {
                question_id: "q1".into(),
                question: "Do you feel cold often?".into(),
                answer: "Yes, even in summer".into(),
            }],
        });

        let prompt = build_prompt(&req);
        assert!(prompt.contains("REFINED analysis"));
        assert!(prompt.contains("1. Fatigue for 3 months, worse after meals (Duration: 3 months, Severity: moderate)"));
        assert!(prompt.contains("- Endocrinologist (primary): Hormonal pattern"));
        assert!(prompt.contains("Q1: Do you feel cold often?\nA1: Yes, even in summer"));
        assert!(prompt.contains("refinement_summary"));
        assert!(prompt.contains("what changed"));
        assert!(prompt.contains("CRITICAL RULES"));
    }

    #[test]
    fn question_prompt_summarizes_initial_analysis() {
        let prompt = build_question_prompt(&request(), &initial_result());
        assert!(prompt.contains("Specialist Recommendations: Endocrinologist"));
        assert!(prompt.contains("Potential Root Causes: Under evaluation"));
        assert!(prompt.contains("Triggers and relieving factors"));
        assert!(prompt.contains("\"questions\""));
    }

    #[test]
    fn prompts_are_deterministic() {
        assert_eq!(build_prompt(&request()), build_prompt(&request()));
    }
}
