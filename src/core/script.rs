//! Script sequencing: turning raw script text into an ordered list of turns.
//!
//! A rehearsal script is plain text with one dialogue line per row in the form
//! `SPEAKER: line text`. Lines without a separator (stage directions, page
//! numbers left over from extraction) carry no speaker and are dropped rather
//! than guessed at.

/// A single turn of dialogue attributed to one speaker.
///
/// Immutable once parsed. The sequence order of a parsed script is the input
/// line order, and that order is significant: it is the playback and
/// verification order of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    /// Speaker name, trimmed and uppercased.
    pub speaker: String,
    /// The dialogue text, trimmed.
    pub text: String,
}

/// Parses raw script text into an ordered sequence of [`ScriptLine`]s.
///
/// Blank lines are discarded. Each remaining line is split on the *first*
/// `:` into speaker and text; both sides are trimmed and the speaker is
/// uppercased. Lines without a separator are discarded. Duplicates are
/// preserved and no normalization happens beyond trim/uppercase.
pub fn parse_script(script_text: &str) -> Vec<ScriptLine> {
    script_text
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let (speaker, text) = line.split_once(':')?;
            Some(ScriptLine {
                speaker: speaker.trim().to_uppercase(),
                text: text.trim().to_string(),
            })
        })
        .collect()
}

/// Returns the distinct speaker names of a parsed script, in order of first
/// appearance. Used by the upload endpoint so clients can offer role selection.
pub fn character_names(lines: &[ScriptLine]) -> Vec<String> {
    let mut seen = Vec::new();
    for line in lines {
        if !seen.iter().any(|s| s == &line.speaker) {
            seen.push(line.speaker.clone());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_script() {
        let script = "JACK: Hello there\nMARY: Hi Jack";
        let lines = parse_script(script);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].speaker, "JACK");
        assert_eq!(lines[0].text, "Hello there");
        assert_eq!(lines[1].speaker, "MARY");
        assert_eq!(lines[1].text, "Hi Jack");
    }

    #[test]
    fn test_speaker_is_trimmed_and_uppercased() {
        let lines = parse_script("  jack : Hello  ");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].speaker, "JACK");
        assert_eq!(lines[0].text, "Hello");
    }

    #[test]
    fn test_blank_and_separatorless_lines_dropped() {
        let script = "JACK: Hello\n\n   \n(stage direction)\nPage 3\nMARY: Hi";
        let lines = parse_script(script);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].speaker, "JACK");
        assert_eq!(lines[1].speaker, "MARY");
    }

    #[test]
    fn test_splits_on_first_separator_only() {
        let lines = parse_script("NARRATOR: Meanwhile: back at the ranch");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].speaker, "NARRATOR");
        assert_eq!(lines[0].text, "Meanwhile: back at the ranch");
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        let script = "A: one\nB: two\nA: one\nA: three";
        let lines = parse_script(script);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "one", "three"]);
    }

    #[test]
    fn test_empty_script() {
        assert!(parse_script("").is_empty());
        assert!(parse_script("\n\n").is_empty());
    }

    #[test]
    fn test_character_names_first_appearance_order() {
        let lines = parse_script("MARY: a\nJACK: b\nMARY: c\nBOB: d");
        assert_eq!(character_names(&lines), vec!["MARY", "JACK", "BOB"]);
    }
}
