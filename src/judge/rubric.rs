// src/judge/rubric.rs
// The scoring rubric is immutable, versioned, process-wide constant data. The
// same definition feeds both the instruction document sent to the judge model
// and the parser that validates its response, so the two cannot drift apart.

use std::collections::HashMap;

use super::types::DimensionScore;

#[derive(Debug, Clone, Copy)]
pub struct Dimension {
    pub key: &'static str,
    pub label: &'static str,
    pub max: i64,
    pub weight: f64,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Rubric {
    pub version: &'static str,
    pub dimensions: &'static [Dimension],
}

/// Rubric v1: seven dimensions, each scored 0-10 by the judge. Weights sum to
/// 10.0 so the weighted sum of raw scores spans 0-100.
pub static RUBRIC_V1: Rubric = Rubric {
    version: "v1",
    dimensions: &[
        Dimension {
            key: "role_definition",
            label: "Role Definition",
            max: 10,
            weight: 1.2,
            description: "Does the prompt establish who the agent is, its domain, and its persona?",
        },
        Dimension {
            key: "structure",
            label: "Structure",
            max: 10,
            weight: 1.4,
            description: "Is the prompt organized into clear sections rather than an unbroken wall of text?",
        },
        Dimension {
            key: "instruction_clarity",
            label: "Instruction Clarity",
            max: 10,
            weight: 1.8,
            description: "Are the instructions specific and unambiguous, with concrete do/don't rules?",
        },
        Dimension {
            key: "examples",
            label: "Examples",
            max: 10,
            weight: 1.6,
            description: "Does the prompt include few-shot examples of desired responses?",
        },
        Dimension {
            key: "guardrails",
            label: "Guardrails",
            max: 10,
            weight: 1.6,
            description: "Does the prompt set boundaries the agent held under pressure in the conversation?",
        },
        Dimension {
            key: "failure_handling",
            label: "Failure Handling",
            max: 10,
            weight: 1.4,
            description: "Does the prompt say what to do when the agent cannot help or lacks information?",
        },
        Dimension {
            key: "conversation_quality",
            label: "Conversation Quality",
            max: 10,
            weight: 1.0,
            description: "Judged from the transcript: were the simulated replies on-tone, relevant, and consistent?",
        },
    ],
};

impl Rubric {
    pub fn dimension(&self, key: &str) -> Option<&'static Dimension> {
        self.dimensions.iter().find(|d| d.key == key)
    }

    /// Weighted overall score, rounded to the nearest integer. The judge is
    /// instructed to apply this same formula; the platform recomputes it to
    /// flag drift.
    pub fn weighted_overall(&self, scores: &HashMap<String, DimensionScore>) -> i64 {
        let sum: f64 = self
            .dimensions
            .iter()
            .filter_map(|d| scores.get(d.key).map(|s| s.score as f64 * d.weight))
            .sum();
        sum.round() as i64
    }

    /// The judge instruction document: the model's operating instructions for
    /// turning a transcript into a structured verdict.
    pub fn instruction(&self) -> String {
        let mut doc = String::from(
            "You are an expert prompt-engineering coach grading a practice attempt.\n\
             The user drafted a system prompt for a customer-support AI agent and then\n\
             simulated a conversation against it. Evaluate the SYSTEM PROMPT (using the\n\
             transcript as evidence of how it held up) on the dimensions below.\n\n\
             Scoring dimensions (score each as an integer from 0 to 10):\n",
        );

        for dim in self.dimensions {
            doc.push_str(&format!(
                "- {key} (\"{label}\", weight {weight}): {description}\n",
                key = dim.key,
                label = dim.label,
                weight = dim.weight,
                description = dim.description,
            ));
        }

        doc.push_str(
            "\nThe overall_score is the weight-multiplied sum of the dimension scores,\n\
             rounded to the nearest integer (0-100).\n\n\
             Also report:\n\
             - strengths: 2-4 short statements about what the prompt does well.\n\
             - improvements: 2-4 short, actionable statements about what to fix first.\n\
             - prompt_efficiency: an object with total_tokens (integer estimate of the\n\
               prompt's token count), redundancy_flag (one of \"none\", \"low\",\n\
               \"moderate\", \"high\"), and compression_suggestion (one sentence).\n\n\
             Respond with STRICT JSON only. No prose, no markdown, no code fences.\n\
             The response must have exactly this shape:\n\
             {\n\
               \"overall_score\": <integer 0-100>,\n\
               \"dimension_scores\": {\n",
        );

        for (i, dim) in self.dimensions.iter().enumerate() {
            doc.push_str(&format!(
                "    \"{key}\": {{\"score\": <integer 0-{max}>, \"max\": {max}, \"note\": \"<one sentence>\"}}{comma}\n",
                key = dim.key,
                max = dim.max,
                comma = if i + 1 < self.dimensions.len() { "," } else { "" },
            ));
        }

        doc.push_str(
            "  },\n\
               \"strengths\": [\"...\"],\n\
               \"improvements\": [\"...\"],\n\
               \"prompt_efficiency\": {\"total_tokens\": <integer>, \"redundancy_flag\": \"none\", \"compression_suggestion\": \"...\"}\n\
             }\n",
        );

        doc
    }
}
