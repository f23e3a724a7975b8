use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Describe,
    Missing,
    Hist,
    Model,
    Unknown,
}

/// A classified question plus the dataset column it mentions, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub column: Option<String>,
}

/// Ordered rules: the first rule with a keyword matching any word wins.
/// A trailing `*` marks a stem that matches any word it begins; other
/// keywords match whole words only.
const RULES: &[(IntentKind, &[&str])] = &[
    (IntentKind::Model, &["model*", "predict*", "train", "training", "trained"]),
    (IntentKind::Hist, &["age", "ages", "hist", "histogram*", "plot*", "distribution*"]),
    (IntentKind::Missing, &["missing", "null*", "nan"]),
    (IntentKind::Describe, &["describe*", "summar*", "statistic*", "stats", "overview"]),
];

/// Words after which the next mentioned column is the one to predict.
const TARGET_CUES: &[&str] = &["predict*", "target", "forecast*"];

/// Skipped between a target cue and the column name.
const FILLER: &[&str] = &["the", "a", "an", "column", "of", "is", "to", "whether"];

fn matches(word: &str, keyword: &str) -> bool {
    match keyword.strip_suffix('*') {
        Some(stem) => word.starts_with(stem),
        None => word == keyword,
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Longest column whose words start at `tokens[at]`.
fn column_at<'a>(tokens: &[String], at: usize, columns: &[&'a str]) -> Option<&'a str> {
    let rest = tokens.get(at..)?;
    columns
        .iter()
        .filter(|c| {
            let needle = words(c);
            !needle.is_empty() && rest.starts_with(&needle)
        })
        .max_by_key(|c| c.len())
        .copied()
}

/// First column named right after a target cue such as "predict" or "target".
fn cued_column<'a>(tokens: &[String], columns: &[&'a str]) -> Option<&'a str> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| TARGET_CUES.iter().any(|k| matches(t, k)))
        .find_map(|(i, _)| {
            let start = (i + 1..tokens.len())
                .find(|&j| !FILLER.contains(&tokens[j].as_str()))?;
            column_at(tokens, start, columns)
        })
}

/// Classify a free-text question. `columns` are the candidate column names.
///
/// A column named right after a target cue wins; otherwise the longest column
/// that appears as whole words in the text is extracted.
pub fn classify(text: &str, columns: &[&str]) -> Intent {
    let tokens = words(text);
    let kind = RULES
        .iter()
        .find(|(_, keywords)| {
            tokens
                .iter()
                .any(|t| keywords.iter().any(|k| matches(t, k)))
        })
        .map_or(IntentKind::Unknown, |(kind, _)| *kind);

    let column = cued_column(&tokens, columns)
        .or_else(|| {
            (0..tokens.len())
                .filter_map(|i| column_at(&tokens, i, columns))
                .max_by_key(|c| c.len())
        })
        .map(str::to_string);

    Intent { kind, column }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[&str] = &["PassengerId", "Age", "Sex", "Survived", "Ticket Class"];

    #[test]
    fn test_rules_in_order() {
        assert_eq!(classify("Train a model on this", COLUMNS).kind, IntentKind::Model);
        assert_eq!(classify("can you predict survival", COLUMNS).kind, IntentKind::Model);
        assert_eq!(classify("Show the histogram", COLUMNS).kind, IntentKind::Hist);
        assert_eq!(classify("which values are null?", COLUMNS).kind, IntentKind::Missing);
        assert_eq!(classify("give me summary statistics", COLUMNS).kind, IntentKind::Describe);
        // model outranks plot
        assert_eq!(classify("plot the model", COLUMNS).kind, IntentKind::Model);
    }

    #[test]
    fn test_keywords_match_whole_words() {
        assert_eq!(classify("which agent handled this", COLUMNS).kind, IntentKind::Unknown);
        assert_eq!(classify("what is on the agenda", COLUMNS).kind, IntentKind::Unknown);
        assert_eq!(classify("tell me the history", COLUMNS).kind, IntentKind::Unknown);
        assert_eq!(classify("how old are they, by ages", COLUMNS).kind, IntentKind::Hist);
        assert_eq!(classify("summarise it", COLUMNS).kind, IntentKind::Describe);
        assert_eq!(classify("build predictions", COLUMNS).kind, IntentKind::Model);
    }

    #[test]
    fn test_target_follows_cue() {
        let intent = classify("predict Sex from PassengerId and Ticket Class", COLUMNS);
        assert_eq!(intent.kind, IntentKind::Model);
        assert_eq!(intent.column.as_deref(), Some("Sex"));

        let intent = classify("use ticket class to predict the age", COLUMNS);
        assert_eq!(intent.column.as_deref(), Some("Age"));

        let intent = classify("train on PassengerId with target column Sex", COLUMNS);
        assert_eq!(intent.column.as_deref(), Some("Sex"));

        // no cue: the longest mention
        let intent = classify("train a model on sex and survived", COLUMNS);
        assert_eq!(intent.column.as_deref(), Some("Survived"));
    }

    #[test]
    fn test_unknown_fallback() {
        let intent = classify("hello there", COLUMNS);
        assert_eq!(intent, Intent { kind: IntentKind::Unknown, column: None });
        assert_eq!(classify("", &[]).kind, IntentKind::Unknown);
    }

    #[test]
    fn test_column_extraction() {
        let intent = classify("plot the distribution of age", COLUMNS);
        assert_eq!(intent.kind, IntentKind::Hist);
        assert_eq!(intent.column.as_deref(), Some("Age"));

        let intent = classify("missing values in ticket class", COLUMNS);
        assert_eq!(intent.column.as_deref(), Some("Ticket Class"));

        // substrings of a word are not columns
        assert_eq!(classify("describe the passengers", COLUMNS).column, None);
    }
}
