//! Title Generation
//!
//! Prompt construction and answer cleanup for generating a short document
//! title from its text.

/// Longest title kept, in characters
pub const MAX_TITLE_CHARS: usize = 60;

/// Build the prompt asking for a title for `content`
pub fn title_prompt(content: &str) -> String {
    format!(
        "Based on the following note content, generate a short, descriptive title \
         (at most {MAX_TITLE_CHARS} characters). The title must be clear, concise and \
         reflect the main topic of the content. Reply ONLY with the title, without \
         quotes or any additional explanation.\n\nNote content:\n{}",
        content.trim()
    )
}

/// Trim whitespace and one layer of surrounding quotes, then cap the length
///
/// Returns `None` when nothing usable is left.
pub fn clean_title(raw: &str) -> Option<String> {
    let is_quote = |c: char| c == '"' || c == '\'';

    let mut title = raw.trim();
    if title.starts_with(is_quote) {
        title = &title[1..];
    }
    if title.ends_with(is_quote) {
        title = &title[..title.len() - 1];
    }

    let title: String = title.trim().chars().take(MAX_TITLE_CHARS).collect();
    let title = title.trim_end().to_string();

    (!title.is_empty()).then_some(title)
}
