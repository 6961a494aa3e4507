use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::Display;

pub const FALLBACK_CHOICES: [&str; 2] = ["Continue the story", "Ask what's happening"];

const CHOICE_MARKER: &str = "CHOICE ";
const BULLETS: [&str; 3] = ["- ", "• ", "* "];
const NUMBERS: [&str; 2] = ["1. ", "2. "];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice(String);

impl Choice {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Shortens the label for a button, keeping whole characters.
    pub fn label(&self, max_chars: usize) -> String {
        if self.0.chars().count() <= max_chars {
            return self.0.clone();
        }
        let mut label: String = self.0.chars().take(max_chars.saturating_sub(1)).collect();
        label.push('…');
        label
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for Choice {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Which heuristic produced the choices. `Fallback` means the text held no
/// usable options and the default pair was substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ExtractionTier {
    Tagged,
    Bulleted,
    Numbered,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub choices: [Choice; 2],
    pub tier: ExtractionTier,
}

impl Extraction {
    pub fn fallback() -> Self {
        Self {
            choices: FALLBACK_CHOICES.map(Choice::new),
            tier: ExtractionTier::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.tier == ExtractionTier::Fallback
    }

    pub fn pair(&self) -> (&str, &str) {
        (self.choices[0].as_str(), self.choices[1].as_str())
    }

    pub fn get(&self, index: usize) -> Option<&Choice> {
        self.choices.get(index)
    }
}

pub struct ChoiceExtractor;

impl ChoiceExtractor {
    /// Pulls exactly two choices out of model output. Tiers are tried in order
    /// and the first tier that matches anything wins; if it matched fewer than
    /// two lines the default pair is returned instead.
    pub fn extract(text: &str) -> Extraction {
        let tiers: [(ExtractionTier, fn(&str) -> Option<&str>); 3] = [
            (ExtractionTier::Tagged, tagged),
            (ExtractionTier::Bulleted, bulleted),
            (ExtractionTier::Numbered, numbered),
        ];

        for (tier, matcher) in tiers {
            let found: Vec<&str> = text.lines().filter_map(matcher).collect();
            if found.is_empty() {
                continue;
            }
            if found.len() < 2 {
                break;
            }
            return Extraction {
                choices: [Choice::new(found[0]), Choice::new(found[1])],
                tier,
            };
        }

        Extraction::fallback()
    }

    /// Byte offset of the first `CHOICE ` marker on a tagged line, if any.
    pub fn first_marker(text: &str) -> Option<usize> {
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            if tagged(line).is_some() {
                return line.find(CHOICE_MARKER).map(|marker| offset + marker);
            }
            offset += line.len();
        }
        None
    }
}

fn tagged(line: &str) -> Option<&str> {
    let marker = line.find(CHOICE_MARKER)?;
    let after_marker = &line[marker + CHOICE_MARKER.len()..];
    let colon = after_marker.find(':')?;
    // Models like to bold the tag ("**CHOICE A:** ..."), drop the leftovers.
    let text = after_marker[colon + 1..].trim_matches(|c: char| c.is_whitespace() || c == '*');
    (!text.is_empty()).then_some(text)
}

fn bulleted(line: &str) -> Option<&str> {
    strip_any(line.trim(), &BULLETS)
}

fn numbered(line: &str) -> Option<&str> {
    strip_any(line.trim(), &NUMBERS)
}

fn strip_any<'a>(line: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes
        .iter()
        .find_map(|prefix| line.strip_prefix(prefix))
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_offset_points_at_marker() {
        let text = "The tape hisses.\nCHOICE A: Rewind\nCHOICE B: Eject";
        assert_eq!(ChoiceExtractor::first_marker(text), Some(17));
        assert_eq!(&text[..17], "The tape hisses.\n");

        let inline = "You hesitate at the door. CHOICE A: Run\nCHOICE B: Hide";
        assert_eq!(ChoiceExtractor::first_marker(inline), Some(26));
    }

    #[test]
    fn tagged_strips_emphasis_and_skips_empty_labels() {
        assert_eq!(tagged("CHOICE A: *Run*  "), Some("Run"));
        assert_eq!(tagged("CHOICE A: **"), None);
        assert_eq!(tagged("CHOICE B:   "), None);

        let extraction = ChoiceExtractor::extract("CHOICE A:\nCHOICE B: Hide\nCHOICE C: *Run*");
        assert_eq!(extraction.pair(), ("Hide", "Run"));
    }

    #[test]
    fn tagged_ignores_colon_before_marker() {
        assert_eq!(tagged("Note: nothing here"), None);
        assert_eq!(tagged("**CHOICE B:** Stay home"), Some("Stay home"));
    }

    #[test]
    fn bullet_prefix_keeps_multibyte_text_intact() {
        assert_eq!(bulleted("  • Follow Colin"), Some("Follow Colin"));
    }

    #[test]
    fn label_is_truncated_on_char_boundary() {
        let choice = Choice::new("Ééééé");
        assert_eq!(choice.label(3), "Éé…");
        assert_eq!(choice.label(10), "Ééééé");
    }
}
