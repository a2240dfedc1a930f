// Skill analysis: prompt construction, the model call, and sanitizing the reply.
// All model calls go through llm_client; nothing here talks HTTP directly.

pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod sanitizer;
