//! Prompt templates and memory line formats for consultations.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Placeholder used when a user has no accumulated context yet.
pub const NO_PREVIOUS_RECORDS: &str = "No previous records available.";

/// Instruction sent alongside every image.
pub const IMAGE_ANALYSIS_INSTRUCTION: &str = "Analyze this medical image. Identify findings, abnormalities, and suggest next steps. Provide a summary for medical records.";

/// Prefix of every image data URI. Uploads are always labelled JPEG,
/// whatever their real format.
pub const IMAGE_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Words that promote a text consultation into the user's context.
pub const PROMOTION_KEYWORDS: [&str; 2] = ["diagnosis", "medicine"];

/// Build the system prompt for a text consultation.
pub fn consultation_system_prompt(context: &str, question: &str) -> String {
    let context = if context.is_empty() {
        NO_PREVIOUS_RECORDS
    } else {
        context
    };

    format!(
        r#"You are Dr.Care, an advanced AI Medical Assistant.

PATIENT MEDICAL CONTEXT:
{context}

CURRENT USER QUESTION:
{question}

INSTRUCTIONS:
1. Use Patient Context (X-Rays, history) if relevant.
2. Format with **Bold Headings** and bullet points.
3. Be concise and professional.
"#
    )
}

/// Whether a consultation should be copied into the user's context.
///
/// Plain substring match on the lowercased text, so incidental mentions
/// count too.
pub fn should_promote(text: &str) -> bool {
    let lowered = text.to_lowercase();
    PROMOTION_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// History line for one text exchange.
pub fn history_line(text: &str, reply: &str) -> String {
    format!("User: {} | Bot: {}", text, reply)
}

/// Context entry for a promoted text consultation.
pub fn consultation_note(text: &str) -> String {
    format!("\n- Consultation Note: {}\n", text)
}

/// Context entry for an image analysis.
pub fn image_analysis_note(filename: &str, analysis: &str) -> String {
    format!("\n[IMAGE ANALYSIS - {}]: {}\n", filename, analysis)
}

/// Encode raw image bytes as a JPEG data URI.
pub fn image_data_uri(image: &[u8]) -> String {
    format!("{}{}", IMAGE_DATA_URI_PREFIX, STANDARD.encode(image))
}
