// Prompt template for the skill analysis call. The system prompt is
// `llm_client::prompts::JSON_ONLY_SYSTEM`.

/// Replace `{cv_text}`, `{skills_json}`, `{extra_instructions}` and `{output_keys}`
/// before sending.
pub const SKILL_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the provided CV text based ONLY on the "Required Skills" list below.

CV TEXT:
--- START CV ---
{cv_text}
--- END CV ---

REQUIRED SKILLS:
{skills_json}

INSTRUCTIONS:
1. Identify ONLY skills from the REQUIRED SKILLS list that are mentioned or strongly implied in the CV. List them in `matched_skills`, spelled exactly as in the list.
2. List ONLY skills from the REQUIRED SKILLS list NOT found in the CV in `missing_skills`, spelled exactly as in the list.
3. Calculate `match_score` (integer 0-100): (number of matched skills / total required skills) * 100, rounded to the nearest integer.{extra_instructions}

OUTPUT FORMAT:
Return ONLY a single valid JSON object with exactly these keys. No extra text, comments, or markdown.
{
{output_keys}
}"#;

pub const BASE_OUTPUT_KEYS: &str = r#"  "matched_skills": ["Skill A", "Skill B"],
  "missing_skills": ["Skill C"],
  "match_score": <integer 0-100>"#;

pub const INSIGHT_INSTRUCTIONS: &str = "
4. List the candidate's main strengths relative to the required skills in `strengths` (short phrases).
5. List the main weaknesses or gaps relative to the required skills in `weaknesses` (short phrases).";

pub const INSIGHT_OUTPUT_KEYS: &str = r#",
  "strengths": ["short phrase"],
  "weaknesses": ["short phrase"]"#;
