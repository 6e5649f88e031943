//! Inline directives embedded by models in free text.
//!
//! Models on the directive contract end their reply with `{MOOD: happy}` and,
//! when a picture is wanted, `{DRAW: a red balloon}` (`GENERATE_IMAGE` is
//! accepted as a synonym). Tag names match case-insensitively and captures may
//! span lines. Every matched span is removed from the display text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DRAW_DIRECTIVE: Regex =
        Regex::new(r"(?is)\{\s*(?:DRAW|GENERATE_IMAGE)\s*:(.*?)\}").unwrap();
    static ref MOOD_DIRECTIVE: Regex = Regex::new(r"(?is)\{\s*MOOD\s*:(.*?)\}").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Directives {
    /// Display text with every directive span removed.
    pub text: String,
    pub mood: Option<String>,
    pub draw: Option<String>,
}

fn first_capture(pattern: &Regex, raw: &str) -> Option<String> {
    pattern
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn extract_directives(raw: &str) -> Directives {
    let draw = first_capture(&DRAW_DIRECTIVE, raw);
    let mood = first_capture(&MOOD_DIRECTIVE, raw);

    let without_draw = DRAW_DIRECTIVE.replace_all(raw, "");
    let text = MOOD_DIRECTIVE.replace_all(&without_draw, "").trim().to_string();

    Directives { text, mood, draw }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_both_tags_in_either_order() {
        for raw in [
            "Here is your balloon! 🎈 {MOOD: happy} {DRAW: a red balloon}",
            "Here is your balloon! 🎈 {DRAW: a red balloon} {MOOD: happy}",
        ] {
            let d = extract_directives(raw);
            assert_eq!(d.text, "Here is your balloon! 🎈");
            assert_eq!(d.mood.as_deref(), Some("happy"));
            assert_eq!(d.draw.as_deref(), Some("a red balloon"));
        }
    }

    #[test]
    fn tag_names_are_case_insensitive_and_generate_image_is_a_synonym() {
        let d = extract_directives("Ta-da! {mood:Surprised}{generate_image: a purple cat}");
        assert_eq!(d.text, "Ta-da!");
        assert_eq!(d.mood.as_deref(), Some("Surprised"));
        assert_eq!(d.draw.as_deref(), Some("a purple cat"));
    }

    #[test]
    fn captures_may_span_lines() {
        let d = extract_directives("Look!\n{DRAW: a castle\non a cloud}\n{MOOD: happy}");
        assert_eq!(d.text, "Look!");
        assert_eq!(d.draw.as_deref(), Some("a castle\non a cloud"));
    }

    #[test]
    fn capture_stops_at_the_first_closing_brace() {
        let d = extract_directives("{DRAW: a dog} and {MOOD: sad} later }");
        assert_eq!(d.draw.as_deref(), Some("a dog"));
        assert_eq!(d.mood.as_deref(), Some("sad"));
        assert_eq!(d.text, "and  later }");
    }

    #[test]
    fn plain_text_passes_through_untouched() {
        let d = extract_directives("  Just a chat about {curly} things.  ");
        assert_eq!(d, Directives {
            text: "Just a chat about {curly} things.".to_string(),
            mood: None,
            draw: None,
        });
    }

    #[test]
    fn every_occurrence_is_stripped_but_the_first_wins() {
        let d = extract_directives("{MOOD: happy} Hi {MOOD: sad} there {DRAW: one}{DRAW: two}");
        assert_eq!(d.mood.as_deref(), Some("happy"));
        assert_eq!(d.draw.as_deref(), Some("one"));
        assert!(!d.text.contains('{'));
    }

    #[test]
    fn empty_captures_count_as_absent() {
        let d = extract_directives("Hmm {DRAW:   } {MOOD:}");
        assert_eq!(d.text, "Hmm");
        assert_eq!(d.draw, None);
        assert_eq!(d.mood, None);
    }
}
