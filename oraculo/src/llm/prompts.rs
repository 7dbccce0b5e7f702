//! Prompt templates for the answer and continuation requests
//!
//! These templates use basic `format!()` interpolation for type safety.

use crate::ephemeris::Transits;

/// Render transits as one `Body: degrees°` line per body.
pub fn format_transits(transits: &Transits) -> String {
    transits
        .iter()
        .map(|body| format!("{}: {:.2}°", body.name, body.degrees))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Generate the prompt that answers a user question
///
/// # Arguments
/// * `transits` - Current planetary positions (may be empty)
/// * `max_tokens` - Completion budget the answer must fit in
/// * `question` - The user's message, verbatim
///
/// # Example
/// ```
/// use oraculo::llm::prompts::answer_prompt;
///
/// let prompt = answer_prompt(&Vec::new(), 200, "¿Cómo me irá hoy?");
/// assert!(prompt.contains("¿Cómo me irá hoy?"));
/// assert!(prompt.contains("200 tokens"));
/// ```
pub fn answer_prompt(transits: &Transits, max_tokens: u32, question: &str) -> String {
    let transits = format_transits(transits);

    format!(
        r#"Eres un astrólogo experto. Basado en estos tránsitos planetarios actuales:
{transits}

Responde la consulta del usuario con precisión y dentro del límite de tokens disponibles ({max_tokens} tokens).
Si el espacio es limitado, da la respuesta más clara y resumida posible sin cortar información importante.
Consulta del usuario: {question}"#
    )
}

/// Generate the prompt that asks the provider to finish a cut-off answer
pub fn continuation_prompt(partial_answer: &str) -> String {
    format!(
        r#"La respuesta anterior quedó incompleta:
"{partial_answer}"

Continúa la respuesta dentro del límite de tokens disponibles.
Evita repetir lo que ya has dicho y concéntrate en completar la idea."#
    )
}
