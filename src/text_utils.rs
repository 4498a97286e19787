// src/text_utils.rs
// Utility functions for text formatting

/// Capitalize the first letter of every whitespace-separated word
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_whitespace() {
            at_word_start = true;
            out.push(ch);
        } else if at_word_start {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::title_case;

    #[test]
    fn capitalizes_each_word() {
        assert_eq!(title_case("playing"), "Playing");
        assert_eq!(title_case("paused"), "Paused");
        assert_eq!(title_case("now BUFFERING again"), "Now Buffering Again");
        assert_eq!(title_case(""), "");
    }
}
