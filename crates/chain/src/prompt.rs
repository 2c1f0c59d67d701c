//! Prompt assembly.
//!
//! Templates use `{name}` placeholders filled from an explicit map. Every
//! placeholder is checked before any output is produced, `{{` and `}}`
//! render as literal braces, and substituted values are copied as-is
//! (a context containing `{x}` is never expanded).

use docchat_core::error::TemplateError;
use std::collections::HashMap;

/// Line that fences the retrieved context inside the system message.
pub const CONTEXT_DELIMITER: &str = "----------------";

/// Built-in persona for corporate ESG / sustainability report documents.
pub const DEFAULT_PERSONA: &str = concat!(
    "You are a helpful assistant that answers questions about corporate ",
    "ESG and sustainability reports. You are given excerpts extracted from ",
    "the report PDFs and a question about them."
);

/// Assistant message placed ahead of the history in every request.
pub const DEFAULT_GREETING: &str =
    "Hi! Ask me anything about the sustainability reports I have indexed.";

const SYSTEM_TEMPLATE: &str = "{persona}

Use the following pieces of context to answer the question at the end.
- If the question asks for an executive summary, start with a one-paragraph overview and follow it with the key points.
- If the question asks for a list, answer with a bulleted list.
- Otherwise give a clear, general answer in a few short paragraphs.
If the context contains the answer, do not refuse and do not say you cannot help.
If you don't know the answer, just say that you don't know; don't make one up.
Cite the source documents where possible.
----------------
{context}
----------------";

const USER_TEMPLATE: &str = "{question}";

enum Segment<'t> {
    Literal(&'t str),
    Placeholder(&'t str),
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let bytes = template.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                // Keep one brace of the pair.
                segments.push(Segment::Literal(&template[literal_start..=i]));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                let Some(len) = template[i + 1..].find('}') else {
                    return Err(TemplateError::Malformed {
                        position: i,
                        reason: "unterminated '{'".into(),
                    });
                };
                let name = &template[i + 1..i + 1 + len];
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(TemplateError::Malformed {
                        position: i,
                        reason: format!("invalid placeholder name '{name}'"),
                    });
                }
                segments.push(Segment::Literal(&template[literal_start..i]));
                segments.push(Segment::Placeholder(name));
                i += len + 2;
                literal_start = i;
            }
            b'}' => {
                return Err(TemplateError::Malformed {
                    position: i,
                    reason: "unmatched '}'".into(),
                });
            }
            _ => i += 1,
        }
    }
    segments.push(Segment::Literal(&template[literal_start..]));
    Ok(segments)
}

/// Render `template`, substituting every `{name}` from `values`.
///
/// Fails with [`TemplateError::MissingVariable`] naming the first
/// placeholder that has no value, or [`TemplateError::Malformed`] for
/// unbalanced braces.
pub fn render_template(
    template: &str,
    values: &HashMap<&str, &str>,
) -> Result<String, TemplateError> {
    let segments = parse(template)?;

    if let Some(missing) = segments.iter().find_map(|s| match s {
        Segment::Placeholder(name) if !values.contains_key(name) => Some(*name),
        _ => None,
    }) {
        return Err(TemplateError::MissingVariable {
            name: missing.to_string(),
        });
    }

    let mut out = String::with_capacity(template.len());
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Placeholder(name) => out.push_str(values[name]),
        }
    }
    Ok(out)
}

/// Renders the system message and the per-question prompt.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona: String,
    greeting: String,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.into(),
            greeting: DEFAULT_GREETING.into(),
        }
    }
}

impl PromptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// System message: persona, answer instructions, and `context`
    /// verbatim between two [`CONTEXT_DELIMITER`] lines.
    pub fn render_system_message(&self, context: &str) -> Result<String, TemplateError> {
        let values = HashMap::from([("persona", self.persona.as_str()), ("context", context)]);
        render_template(SYSTEM_TEMPLATE, &values)
    }

    /// The question, passed through unchanged.
    pub fn render_user_prompt(&self, question: &str) -> Result<String, TemplateError> {
        render_template(USER_TEMPLATE, &HashMap::from([("question", question)]))
    }
}
