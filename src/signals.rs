//! Lexical Signal Extractor
//!
//! Scores an utterance for emotional valence and intensity using fixed
//! keyword tables. Deterministic keyword heuristic, not a classifier.

use crate::models::{EmotionLabel, SignalResult};

const MIN_SCORE: i8 = -5;
const MAX_SCORE: i8 = 5;
const MAX_INTENSITY: u8 = 3;

/// Default keyword lists
const POSITIVE_WORDS: &[&str] = &[
    "happy", "excited", "great", "awesome", "love", "win", "celebrate", "thrilled",
];

const NEGATIVE_WORDS: &[&str] = &[
    "sad", "worried", "anxious", "scared", "angry", "upset", "nervous", "regret",
];

const STRESS_WORDS: &[&str] = &[
    "overwhelmed", "burnout", "stress", "panic", "tired", "broke", "debt", "late",
];

/// Word tables used by the extractor. Entries must be lower-case.
#[derive(Debug, Clone)]
pub struct SignalLexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub stress: Vec<String>,
}

impl Default for SignalLexicon {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            positive: owned(POSITIVE_WORDS),
            negative: owned(NEGATIVE_WORDS),
            stress: owned(STRESS_WORDS),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignalExtractor {
    lexicon: SignalLexicon,
}

impl SignalExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lexicon(lexicon: SignalLexicon) -> Self {
        Self { lexicon }
    }

    /// Score a raw utterance. Never fails; empty text is neutral.
    pub fn analyze(&self, text: &str) -> SignalResult {
        let lowered = text.to_lowercase();

        // Each list entry counts once, however often it occurs.
        let hits = |words: &[String]| -> i32 {
            words.iter().filter(|w| lowered.contains(w.as_str())).count() as i32
        };

        let raw_score = hits(&self.lexicon.positive)
            - hits(&self.lexicon.negative)
            - hits(&self.lexicon.stress);

        let mut intensity: u8 = 1;
        if text.matches('!').count() >= 2 {
            intensity += 1;
        }
        if has_uppercase_run(text, 3) {
            intensity += 1;
        }
        let intensity = intensity.min(MAX_INTENSITY);

        let label = if raw_score >= 2 && intensity >= 2 {
            EmotionLabel::Euphoric
        } else if raw_score > 0 {
            EmotionLabel::Positive
        } else if raw_score < -1 {
            EmotionLabel::Stressed
        } else if raw_score < 0 {
            EmotionLabel::Concerned
        } else {
            EmotionLabel::Neutral
        };

        let score = (raw_score + i32::from(intensity) - 1)
            .clamp(i32::from(MIN_SCORE), i32::from(MAX_SCORE)) as i8;

        SignalResult {
            label,
            score,
            intensity,
        }
    }
}

/// True when `text` holds at least `len` consecutive ASCII capitals
fn has_uppercase_run(text: &str, len: usize) -> bool {
    let mut run = 0;
    for c in text.chars() {
        if c.is_ascii_uppercase() {
            run += 1;
            if run >= len {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_neutral() {
        let result = SignalExtractor::new().analyze("");
        assert_eq!(
            result,
            SignalResult {
                label: EmotionLabel::Neutral,
                score: 0,
                intensity: 1
            }
        );
    }

    #[test]
    fn test_excited_with_exclamations() {
        let result = SignalExtractor::new().analyze("I am so happy and excited!!!");
        assert!(matches!(
            result.label,
            EmotionLabel::Euphoric | EmotionLabel::Positive
        ));
        assert!(result.score > 0);
        assert!(result.intensity >= 2);
    }

    #[test]
    fn test_stress_words_yield_stressed() {
        let result =
            SignalExtractor::new().analyze("I'm panicking about my credit card debt!!");
        assert_eq!(result.label, EmotionLabel::Stressed);
        assert_eq!(result.intensity, 2);
        // -2 from panic + debt, +1 from intensity
        assert_eq!(result.score, -1);
    }

    #[test]
    fn test_single_negative_is_concerned() {
        let result = SignalExtractor::new().analyze("a bit worried about rent");
        assert_eq!(result.label, EmotionLabel::Concerned);
        assert_eq!(result.score, -1);
    }

    #[test]
    fn test_repeated_word_counts_once() {
        let result = SignalExtractor::new().analyze("happy happy happy");
        assert_eq!(result.label, EmotionLabel::Positive);
        assert_eq!(result.score, 1);
    }

    #[test]
    fn test_uppercase_run_raises_intensity() {
        let extractor = SignalExtractor::new();
        assert_eq!(extractor.analyze("I WON the raffle").intensity, 2);
        assert_eq!(extractor.analyze("I Won").intensity, 1);
        assert_eq!(extractor.analyze("WOW!! great").intensity, 3);
    }

    #[test]
    fn test_bounds_hold_for_extreme_inputs() {
        let extractor = SignalExtractor::new();
        let cases = [
            "HAPPY EXCITED GREAT AWESOME LOVE WIN CELEBRATE THRILLED!!!!!!",
            "sad worried anxious scared angry upset nervous regret overwhelmed burnout stress panic tired broke debt late",
            "!!!!!!!!!!!!!!!!",
            "ÀÉÎ ñ 💸💸💸",
            "   ",
        ];

        for c in cases {
            let r = extractor.analyze(c);
            assert!((-5..=5).contains(&r.score), "score out of range for {c:?}");
            assert!((1..=3).contains(&r.intensity), "intensity out of range for {c:?}");
        }
    }

    #[test]
    fn test_custom_lexicon() {
        let extractor = SignalExtractor::with_lexicon(SignalLexicon {
            positive: vec!["masaya".into()],
            negative: vec![],
            stress: vec!["utang".into()],
        });

        assert_eq!(extractor.analyze("Masaya ako").label, EmotionLabel::Positive);
        assert_eq!(extractor.analyze("may utang ako").label, EmotionLabel::Concerned);
    }
}
