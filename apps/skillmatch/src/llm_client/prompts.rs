// Cross-cutting prompt fragments. Task prompts live next to the code that sends them.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to a prompt when the source text was cut to fit the character budget.
pub const TRUNCATION_NOTE: &str = " ... [CV text truncated]";
