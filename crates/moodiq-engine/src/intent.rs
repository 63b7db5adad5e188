//! Keyword-based question classification.
//!
//! Classification is pure string matching over the lower-cased question,
//! evaluated in a fixed priority order: a question matching two keyword
//! families always resolves the same way regardless of phrasing order.

/// The closed emotion label set the classifier recognizes in questions.
pub const KNOWN_EMOTIONS: [&str; 7] = [
    "angry", "disgust", "fear", "happy", "neutral", "sad", "surprise",
];

const MOST_COMMON_KEYWORDS: [&str; 3] = ["most", "common", "frequent"];
const RECENT_KEYWORDS: [&str; 3] = ["recent", "latest", "last"];
const PATTERN_KEYWORDS: [&str; 2] = ["pattern", "trend"];
const GENERAL_MOOD_KEYWORDS: [&str; 3] = ["feel", "emotion", "mood"];
const NEGATIVE_KEYWORDS: [&str; 3] = ["struggling", "concern", "negative"];
const GROUP_KEYWORDS: [&str; 3] = ["team", "department", "organizational"];

/// What a question is asking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    MostCommon,
    Recent,
    Pattern,
    /// Carries the emotion label the question mentions.
    SpecificEmotion(String),
    GeneralMood,
    Negative,
    GroupHealth,
    Generic,
}

/// Classify a free-text question. First matching family wins.
pub fn classify(question: &str) -> Intent {
    let q = question.to_lowercase();
    let matches_any = |keywords: &[&str]| keywords.iter().any(|k| q.contains(k));

    if matches_any(&MOST_COMMON_KEYWORDS) {
        Intent::MostCommon
    } else if matches_any(&RECENT_KEYWORDS) {
        Intent::Recent
    } else if matches_any(&PATTERN_KEYWORDS) {
        Intent::Pattern
    } else if let Some(label) = first_mentioned_emotion(&q) {
        Intent::SpecificEmotion(label)
    } else if matches_any(&GENERAL_MOOD_KEYWORDS) {
        Intent::GeneralMood
    } else if matches_any(&NEGATIVE_KEYWORDS) {
        Intent::Negative
    } else if matches_any(&GROUP_KEYWORDS) {
        Intent::GroupHealth
    } else {
        Intent::Generic
    }
}

/// The known label whose occurrence starts earliest in the question.
fn first_mentioned_emotion(q: &str) -> Option<String> {
    KNOWN_EMOTIONS
        .iter()
        .filter_map(|label| q.find(label).map(|pos| (pos, *label)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, label)| label.to_string())
}
