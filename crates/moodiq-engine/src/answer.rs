//! Deterministic answer synthesis.
//!
//! Every branch renders one templated sentence from the aggregated
//! counts of the supplied record set. The record set is whatever the
//! engine selected: vector search hits or a (possibly actor-filtered)
//! cache snapshot.

use crate::config::EngineConfig;
use crate::intent::Intent;
use crate::stats::{EmotionDistribution, aggregate};
use moodiq_index::DocMeta;

/// Answer returned when the cache is empty even after a rebuild.
pub const NO_DATA_ANSWER: &str =
    "No emotion data available yet. Please record some mood events first.";

/// Occurrence count above which a mentioned emotion is called
/// "significant" rather than "minor".
pub const SIGNIFICANT_COUNT: usize = 2;

/// Render the answer for `intent` over `records`.
///
/// `actor` is the filter that produced `records`, if any; an empty set
/// under a filter gets the actor-specific message instead of the
/// per-intent one, and never falls back to unfiltered data.
pub fn synthesize(intent: &Intent, records: &[DocMeta], actor: Option<&str>, config: &EngineConfig) -> String {
    if records.is_empty() {
        return match actor {
            Some(id) => no_data_for_actor(id),
            None => no_data_message(intent).to_string(),
        };
    }

    let dist = aggregate(records.iter().map(|m| (m.emotion.as_str(), m.confidence)));

    match intent {
        Intent::MostCommon => {
            let most = dist.dominant().expect("non-empty record set");
            format!(
                "Based on the records, '{}' is the most common emotion, appearing {} times in relevant data.",
                most.emotion, most.count
            )
        }
        Intent::Recent => {
            // The set is most-relevant/newest first; the head is the latest
            let latest = &records[0];
            format!(
                "The most recent emotion detected was '{}' at {}.",
                latest.emotion,
                short_time(&latest.timestamp)
            )
        }
        Intent::Pattern => {
            let summary: Vec<String> = dist
                .entries()
                .iter()
                .map(|s| format!("{}: {} times", s.emotion, s.count))
                .collect();
            let most = dist.dominant().expect("non-empty record set");
            format!(
                "The emotional patterns show: {}. This indicates varying emotional states with emphasis on {}.",
                summary.join(", "),
                most.emotion
            )
        }
        Intent::SpecificEmotion(label) => {
            let count = dist.count_of(label);
            let weight = if count > SIGNIFICANT_COUNT {
                "a significant"
            } else {
                "a minor"
            };
            format!(
                "'{}' appears {} times in the relevant records, suggesting it's {} part of the emotional pattern.",
                label, count, weight
            )
        }
        Intent::GeneralMood => {
            let most = dist.dominant().expect("non-empty record set");
            format!(
                "Overall emotional state shows: {}. The dominant emotion is {}.",
                count_summary(&dist),
                most.emotion
            )
        }
        Intent::Negative => {
            let negative_count: usize = config
                .negative_emotions
                .iter()
                .map(|e| dist.count_of(e))
                .sum();
            if negative_count > 0 {
                format!(
                    "Found {} negative emotion instances. Consider reaching out to those affected for support.",
                    negative_count
                )
            } else {
                "No concerning emotional patterns detected.".to_string()
            }
        }
        Intent::GroupHealth => {
            let positive: usize = config
                .positive_emotions
                .iter()
                .map(|e| dist.count_of(e))
                .sum();
            let positivity = positive as f64 / dist.total() as f64 * 100.0;
            format!(
                "Team emotional health: {}. Overall positivity: {:.1}%.",
                count_summary(&dist),
                positivity
            )
        }
        Intent::Generic => {
            let most = dist.dominant().expect("non-empty record set");
            format!(
                "Based on relevant emotion records: {}. The dominant emotion in this context is {}.",
                count_summary(&dist),
                most.emotion
            )
        }
    }
}

/// "e1 (3x), e2 (1x)" in descending count order.
fn count_summary(dist: &EmotionDistribution) -> String {
    dist.by_count_desc()
        .iter()
        .map(|s| format!("{} ({}x)", s.emotion, s.count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The distinct answer for an actor filter that matched nothing.
pub fn no_data_for_actor(actor: &str) -> String {
    format!("No emotion data found for actor '{}'.", actor)
}

fn no_data_message(intent: &Intent) -> &'static str {
    match intent {
        Intent::MostCommon => "No emotion patterns found.",
        Intent::Recent => "No recent emotion data found.",
        Intent::Pattern => "No emotional patterns found.",
        Intent::SpecificEmotion(_) => "No data found for the specified emotion.",
        Intent::GeneralMood => "No emotional data available.",
        Intent::Negative => "No concerning emotional patterns detected.",
        Intent::GroupHealth => "No team emotional data available.",
        Intent::Generic => "No relevant emotion data found for your query.",
    }
}

fn short_time(timestamp: &str) -> String {
    timestamp.chars().take(19).collect::<String>().replace('T', " ")
}
