//! Input sanitization.
//!
//! Every inbound value passes through here before it is validated, shown
//! in the chat log, or forwarded to the remote text generator.

/// Maximum characters kept for display in the chat log.
pub const CHAT_MAX_CHARS: usize = 1000;

/// Maximum characters forwarded to the text generator.
pub const RESPONDER_MAX_CHARS: usize = 500;

/// Trim, drop angle brackets, collapse whitespace runs and truncate to
/// `max_chars` characters.
pub fn sanitize(input: &str, max_chars: usize) -> String {
    let collapsed = input
        .split(|c: char| c == '<' || c == '>')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    collapsed.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

/// Sanitize for display in the chat log.
pub fn sanitize_for_chat(input: &str) -> String {
    sanitize(input, CHAT_MAX_CHARS)
}

/// Sanitize before forwarding to the text generator.
pub fn sanitize_for_responder(input: &str) -> String {
    sanitize(input, RESPONDER_MAX_CHARS)
}

/// Lowercase and strip Portuguese diacritics, for keyword matching.
pub fn fold(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
