//! Lexicon scorer used when no sentiment model is reachable.

/// Lowercase single words and their weight. Positive weights lie in
/// `(0.0, 1.0]`, negative ones in `[-1.0, 0.0)`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    ("good", 0.3),
    ("great", 0.4),
    ("excellent", 0.5),
    ("amazing", 0.5),
    ("wonderful", 0.5),
    ("best", 0.5),
    ("love", 0.5),
    ("loved", 0.5),
    ("happy", 0.4),
    ("success", 0.4),
    ("successful", 0.4),
    ("praise", 0.4),
    ("praised", 0.4),
    ("improve", 0.3),
    ("improved", 0.3),
    ("progress", 0.3),
    ("welcome", 0.3),
    ("welcomed", 0.3),
    ("support", 0.2),
    ("win", 0.4),
    ("victory", 0.5),
    ("bad", -0.4),
    ("poor", -0.4),
    ("terrible", -0.6),
    ("awful", -0.6),
    ("horrible", -0.6),
    ("worst", -0.6),
    ("hate", -0.5),
    ("angry", -0.4),
    ("protest", -0.4),
    ("corruption", -0.6),
    ("scandal", -0.6),
    ("fraud", -0.7),
    ("failed", -0.4),
    ("failure", -0.4),
    ("crisis", -0.5),
    ("problem", -0.3),
    ("concern", -0.3),
    ("accident", -0.5),
    ("killed", -0.7),
    ("ban", -0.5),
];

fn weight_of(word: &str) -> Option<f32> {
    LEXICON
        .iter()
        .find(|(entry, _)| *entry == word)
        .map(|&(_, weight)| weight)
}

/// Sum the weights of every lexicon word in `text`, clamped to `[-1.0, 1.0]`.
///
/// Words are split on whitespace, stripped of surrounding punctuation and
/// lowercased. Text with no lexicon words scores `0.0`.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphabetic())
                .to_lowercase()
        })
        .filter_map(|word| weight_of(&word))
        .sum::<f32>()
        .clamp(-1.0, 1.0)
}
