//! Reply termination checks and the agreement marker.

/// Sentinel a participant appends to signal it is ready to end the exchange.
pub const AGREEMENT_TOKEN: &str = "##TARTISMA_SONU##";

/// Characters that count as a proper sentence ending.
pub const ENDING_CHARS: [char; 3] = ['.', '!', '?'];

/// True when `text`, ignoring trailing whitespace, ends with `.`, `!` or `?`.
pub fn is_complete(text: &str) -> bool {
    text.trim_end().ends_with(ENDING_CHARS)
}

/// Terminate an unfinished reply with a period.
///
/// Already terminated text only loses its trailing whitespace.
pub fn normalize(text: &str) -> String {
    let trimmed = text.trim_end();
    if is_complete(trimmed) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

pub fn contains_agreement_marker(text: &str, marker: &str) -> bool {
    !marker.is_empty() && text.contains(marker)
}
