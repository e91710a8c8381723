//! Topic-category detection over combined user and assistant text
//!
//! Eight fixed topic categories; every matching topic is returned, in
//! category order, as the turn's topic set.

/// The eight topic categories and their keyword lexicons.
const TOPIC_LEXICONS: &[(&str, &[&str])] = &[
    (
        "work",
        &["work", "job", "office", "meeting", "boss", "deadline", "project", "colleague"],
    ),
    (
        "family",
        &["family", "mother", "father", "mom", "dad", "sister", "brother", "kids", "parents"],
    ),
    (
        "health",
        &["health", "doctor", "exercise", "sleep", "diet", "gym", "medication", "tired"],
    ),
    (
        "hobbies",
        &["hobby", "painting", "reading", "music", "guitar", "gardening", "photography", "gaming"],
    ),
    (
        "travel",
        &["travel", "trip", "vacation", "flight", "hotel", "abroad", "visit"],
    ),
    (
        "food",
        &["food", "cooking", "recipe", "restaurant", "dinner", "lunch", "baking"],
    ),
    (
        "finance",
        &["money", "budget", "savings", "rent", "invest", "salary", "bills"],
    ),
    (
        "relationships",
        &["friend", "partner", "girlfriend", "boyfriend", "date", "wedding", "relationship"],
    ),
];

/// All topic categories matched in the combined turn text, in fixed
/// category order. The result is a set: each topic appears at most once.
pub fn detect_topics(user_message: &str, assistant_message: &str) -> Vec<String> {
    let combined = format!("{} {}", user_message, assistant_message).to_lowercase();

    TOPIC_LEXICONS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| combined.contains(kw)))
        .map(|(topic, _)| topic.to_string())
        .collect()
}
