//! State pattern registry.
//!
//! A UI state is recognized when every registered phrase appears in the OCR
//! text (case-insensitive, with a small edit-distance slack since OCR mangles
//! individual glyphs) and every registered regex matches. States are checked
//! in priority order; the first hit wins.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Scripted response bound to a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSpec {
    /// Tap a key (named key or single character, see `input::parse_key`).
    PressKey { key: String },
    /// Click the n-th dialogue option (0-based, top to bottom).
    ClickOption { index: usize },
    /// Click the center of the dialogue panel.
    ClickCenter,
    /// Detect and log only; the active mode decides what to do.
    Ignore,
}

/// Declarative state definition (JSON-loadable for user extensions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatePattern {
    pub state: String,
    /// Phrases that must *all* appear in the OCR text.
    #[serde(default)]
    pub phrases: Vec<String>,
    /// Regexes that must *all* match the OCR text.
    #[serde(default)]
    pub regexes: Vec<String>,
    pub action: ActionSpec,
    /// Higher priority states are checked first.
    #[serde(default)]
    pub priority: i32,
}

/// A pattern with its regexes compiled.
pub struct Pattern {
    pub def: StatePattern,
    regexes: Vec<Regex>,
}

impl Pattern {
    fn compile(def: StatePattern) -> Result<Self> {
        let regexes = def
            .regexes
            .iter()
            .map(|r| Regex::new(r).with_context(|| format!("pattern {:?} regex {:?}", def.state, r)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { def, regexes })
    }

    fn matches(&self, text_lower: &str) -> bool {
        self.def
            .phrases
            .iter()
            .all(|phrase| phrase_in_text(text_lower, &phrase.to_ascii_lowercase()))
            && self.regexes.iter().all(|re| re.is_match(text_lower))
    }
}

pub struct Registry {
    patterns: Vec<Pattern>,
}

impl Registry {
    /// The shipped state set.
    pub fn builtin() -> Self {
        let defs = vec![
            StatePattern {
                state: "confirm_prompt".into(),
                phrases: vec!["are you sure".into()],
                regexes: vec![],
                action: ActionSpec::ClickOption { index: 0 },
                priority: 20,
            },
            StatePattern {
                state: "revive_prompt".into(),
                phrases: vec!["you have died".into()],
                regexes: vec![],
                action: ActionSpec::ClickOption { index: 0 },
                priority: 20,
            },
            StatePattern {
                state: "quest_offer".into(),
                phrases: vec!["quest".into()],
                regexes: vec![r"\b(accept|decline)\b".into()],
                action: ActionSpec::ClickOption { index: 0 },
                priority: 10,
            },
            StatePattern {
                state: "quest_turn_in".into(),
                phrases: vec!["quest complete".into()],
                regexes: vec![],
                action: ActionSpec::ClickOption { index: 0 },
                priority: 10,
            },
            StatePattern {
                state: "vendor_greeting".into(),
                phrases: vec!["wares".into()],
                regexes: vec![],
                action: ActionSpec::Ignore,
                priority: 5,
            },
            StatePattern {
                state: "attack_no_effect".into(),
                phrases: vec!["no effect".into()],
                regexes: vec![],
                action: ActionSpec::Ignore,
                priority: 5,
            },
            StatePattern {
                state: "level_up".into(),
                phrases: vec!["level".into()],
                regexes: vec![r"\blevel\s+\d+\b".into()],
                action: ActionSpec::Ignore,
                priority: 5,
            },
            StatePattern {
                state: "loot_toast".into(),
                phrases: vec![],
                regexes: vec![r"\byou (receive|loot|pick up)\b".into()],
                action: ActionSpec::Ignore,
                priority: 2,
            },
            // Deliberately last: lots of dialogue ends with a bare continue.
            StatePattern {
                state: "continue_prompt".into(),
                phrases: vec!["continue".into()],
                regexes: vec![],
                action: ActionSpec::PressKey { key: "space".into() },
                priority: 0,
            },
        ];

        let patterns = defs
            .into_iter()
            .map(|d| Pattern::compile(d).expect("builtin pattern must compile"))
            .collect();

        Self::sorted(patterns)
    }

    /// Builtin set merged with user patterns from `path` (if present).
    ///
    /// User patterns with the same state name replace the builtin ones.
    pub fn with_user_patterns(path: &Path) -> Result<Self> {
        let mut registry = Self::builtin();
        if !path.is_file() {
            return Ok(registry);
        }

        let file = File::open(path).with_context(|| format!("open {:?}", path))?;
        let defs: Vec<StatePattern> =
            serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parse {:?}", path))?;

        for def in defs {
            registry.patterns.retain(|p| p.def.state != def.state);
            registry.patterns.push(Pattern::compile(def)?);
        }

        Ok(Self::sorted(registry.patterns))
    }

    fn sorted(mut patterns: Vec<Pattern>) -> Self {
        patterns.sort_by_key(|p| std::cmp::Reverse(p.def.priority));
        Self { patterns }
    }

    /// Classify OCR text into a state. Unmatched text is `None`.
    pub fn classify(&self, text: &str) -> Option<&Pattern> {
        if text.trim().is_empty() {
            return None;
        }
        let lower = text.to_ascii_lowercase();
        self.patterns.iter().find(|p| p.matches(&lower))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Does `phrase` appear in `text`? Both must already be lowercase.
///
/// Falls back to a sliding word-window Levenshtein check so that OCR glyph
/// errors ("cornplete") still match. The slack scales with phrase length and
/// is capped to keep short phrases strict.
fn phrase_in_text(text: &str, phrase: &str) -> bool {
    if text.contains(phrase) {
        return true;
    }

    // Strip punctuation for the fuzzy pass; OCR sprinkles stray marks.
    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
            .collect()
    };
    let text = clean(text);
    let phrase = clean(phrase);

    let slack = (phrase.len() / 6).clamp(1, 3);
    let phrase_words = phrase.split_whitespace().count().max(1);
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < phrase_words {
        return false;
    }

    words
        .windows(phrase_words)
        .any(|window| levenshtein::levenshtein(&window.join(" "), &phrase) <= slack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_text_classifies_the_state() {
        let registry = Registry::builtin();
        let hit = registry
            .classify("A new quest awaits you. Accept or decline?")
            .expect("should classify");
        assert_eq!(hit.def.state, "quest_offer");
    }

    #[test]
    fn unmatched_text_returns_none() {
        let registry = Registry::builtin();
        assert!(registry.classify("the weather is lovely in the highlands").is_none());
        assert!(registry.classify("").is_none());
    }

    #[test]
    fn ocr_glyph_errors_still_match() {
        let registry = Registry::builtin();
        let hit = registry
            .classify("Quest cornplete! Claim your reward.")
            .expect("slack should absorb the OCR error");
        assert_eq!(hit.def.state, "quest_turn_in");
    }

    #[test]
    fn regex_gate_blocks_phrase_only_matches() {
        let registry = Registry::builtin();
        // "quest" appears but there is no accept/decline option.
        let hit = registry.classify("this quest continues to the east");
        // Falls through to the low-priority continue prompt.
        assert_eq!(hit.map(|p| p.def.state.as_str()), Some("continue_prompt"));
    }

    #[test]
    fn priority_orders_overlapping_states() {
        let registry = Registry::builtin();
        let hit = registry
            .classify("Are you sure you want to continue?")
            .expect("should classify");
        assert_eq!(hit.def.state, "confirm_prompt");
    }

    #[test]
    fn user_patterns_override_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.json");
        std::fs::write(
            &path,
            r#"[{
                "state": "continue_prompt",
                "phrases": ["continue"],
                "action": {"press_key": {"key": "enter"}},
                "priority": 0
            }]"#,
        )
        .unwrap();

        let registry = Registry::with_user_patterns(&path).unwrap();
        let hit = registry.classify("press continue").unwrap();
        assert_eq!(
            hit.def.action,
            ActionSpec::PressKey { key: "enter".into() }
        );
    }
}
