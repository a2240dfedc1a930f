use super::SanitizeError;

/// Returns the outermost `{...}` span of an LLM reply.
///
/// Fence markers are stripped first, then the span runs from the first `{` to the last `}`
/// inclusive. Prose before or after the object is discarded; whether the span is valid
/// JSON is the parser's problem, not this function's.
pub fn extract_json_object(raw: &str) -> Result<&str, SanitizeError> {
    let text = strip_json_fences(raw);

    let start = text.find('{').ok_or(SanitizeError::NoJsonObject)?;
    let end = text.rfind('}').ok_or(SanitizeError::NoJsonObject)?;
    if end < start {
        return Err(SanitizeError::InvertedSpan);
    }

    Ok(&text[start..=end])
}

/// Strips a leading ```json / ``` fence and a trailing ``` fence, each only if present.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```JSON"))
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.trim();
    text.strip_suffix("```").map(str::trim).unwrap_or(text)
}
