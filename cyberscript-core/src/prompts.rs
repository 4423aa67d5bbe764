//! Fixed prompt text sent to the text and image models.

use crate::types::Complexity;

/// System instruction for scenario generation.
pub const SYSTEM_INSTRUCTION: &str = "You are CyberScript, an AI-driven cybersecurity attack storyboard generator.
Your task is to transform a target organization description into a structured, realistic, fictional cyber attack scenario.

Your output MUST ONLY follow this exact structure and contain no other sections or conversational filler:
1. OVERVIEW: High-level executive summary.
2. ATTACK STORYBOARD (PHASED): Sequential attack steps.
3. SAMPLE LOGS: Technical log telemetry.
4. ATTACK FLOW DIAGRAM (TEXT): Text-based killchain flow.
5. MITIGATION & LESSONS: Tactical mitigations and learning points.

STRICT CONSTRAINTS:
- DO NOT include 'Defense Strategy' sections within the attack steps.
- DO NOT include 'Student Learning Objectives' or extraneous educational boxes.
- DO NOT add conversational preamble or concluding remarks.
- Follow the provided JSON schema exactly.";

/// Used when the target description is blank.
pub const DEFAULT_TARGET_DESCRIPTION: &str = "A generic enterprise environment";

/// Stylistic preamble prepended to every visual prompt.
pub const IMAGE_STYLE_PREAMBLE: &str = "High quality, cinematic digital art, moody lighting, cybersecurity thriller aesthetic, professional training illustration: ";

/// Build the user turn for a scenario request.
pub fn scenario_user_prompt(complexity: Complexity, description: &str) -> String {
    let target = match description.trim() {
        "" => DEFAULT_TARGET_DESCRIPTION,
        trimmed => trimmed,
    };
    format!(
        "Generate a CyberScript attack storyboard for:\n\
         Target Description: {}\n\
         Difficulty Level: {}\n\n\
         Ensure you strictly follow the 5-part structure defined in the system instructions.",
        target, complexity
    )
}

/// Wrap a step's visual prompt in the fixed style preamble.
pub fn image_prompt(visual_prompt: &str) -> String {
    format!("{}{}", IMAGE_STYLE_PREAMBLE, visual_prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_contains_inputs() {
        let prompt = scenario_user_prompt(Complexity::Advanced, "  A regional health clinic ");
        assert!(prompt.contains("Target Description: A regional health clinic\n"));
        assert!(prompt.contains("Difficulty Level: Advanced"));
    }

    #[test]
    fn test_user_prompt_blank_description_falls_back() {
        let prompt = scenario_user_prompt(Complexity::Beginner, "   ");
        assert!(prompt.contains(DEFAULT_TARGET_DESCRIPTION));
    }

    #[test]
    fn test_system_instruction_names_five_sections() {
        for section in [
            "1. OVERVIEW",
            "2. ATTACK STORYBOARD (PHASED)",
            "3. SAMPLE LOGS",
            "4. ATTACK FLOW DIAGRAM (TEXT)",
            "5. MITIGATION & LESSONS",
        ] {
            assert!(SYSTEM_INSTRUCTION.contains(section), "missing {}", section);
        }
    }

    #[test]
    fn test_image_prompt_wraps_with_preamble() {
        let prompt = image_prompt("a dark server room");
        assert!(prompt.starts_with("High quality, cinematic digital art"));
        assert!(prompt.ends_with(": a dark server room"));
        assert_eq!(image_prompt(""), IMAGE_STYLE_PREAMBLE);
    }
}
