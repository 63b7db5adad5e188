//! Formatted insight reports.
//!
//! Rendering is fully deterministic: fixed section order, bar length =
//! floor(percentage / 3) capped at 20 characters, and exact threshold
//! constants for the qualitative analysis block.

use crate::config::EngineConfig;
use crate::stats::EmotionDistribution;

/// Report returned when no events exist at all.
pub const NO_DATA_REPORT: &str =
    "No emotion data available yet. Start by recording some mood events.";

/// One bar character per 3 percentage points.
const BAR_PCT_DIVISOR: f64 = 3.0;
/// Bars never exceed this many characters.
const BAR_MAX_LEN: usize = 20;

/// Average confidence at or above which detection counts as clear.
const HIGH_CONFIDENCE: f64 = 85.0;
/// Average confidence below which capture quality is called out.
const LOW_CONFIDENCE: f64 = 70.0;
/// Distinct labels at or above which variety is called high.
const HIGH_VARIETY: usize = 5;
/// Distinct labels at or below which the state is called stable.
const LOW_VARIETY: usize = 2;

/// Render the insight report for a distribution.
///
/// `actor` is the filter the distribution was computed under, if any;
/// an empty actor-scoped distribution gets its own message.
pub fn render(dist: &EmotionDistribution, actor: Option<&str>, config: &EngineConfig) -> String {
    if dist.is_empty() {
        return match actor {
            Some(id) => format!("No emotion data found for actor '{}'.", id),
            None => NO_DATA_REPORT.to_string(),
        };
    }

    let most = dist.dominant().expect("non-empty distribution");
    let most_pct = dist.percentage(most);

    let mut report = format!(
        "╔══════════════════════════════════════════════════════════╗\n\
         ║            EMOTION ANALYSIS INSIGHTS                     ║\n\
         ╚══════════════════════════════════════════════════════════╝\n\
         \n\
         📊 Summary:\n   \
         • Total Records: {}\n   \
         • Most Common: {} ({}x, {:.1}%)\n   \
         • Average Confidence: {:.1}%\n\
         \n\
         📈 Distribution:",
        dist.total(),
        capitalize(&most.emotion),
        most.count,
        most_pct,
        most.average_confidence(),
    );

    for stat in dist.by_count_desc() {
        let pct = dist.percentage(stat);
        report.push_str(&format!(
            "\n   {:<12}: {:>3} ({:>5.1}%) {}",
            capitalize(&stat.emotion),
            stat.count,
            pct,
            bar(pct)
        ));
    }

    report.push_str("\n\n💡 Analysis:\n");

    if config.is_positive(&most.emotion) {
        report.push_str("   ✅ Overall emotional state appears balanced and positive.\n");
    } else if config.is_negative(&most.emotion) {
        report.push_str(&format!(
            "   ⚠️  Predominant {} emotions detected.\n",
            most.emotion
        ));
        report.push_str("   💙 Consider wellness programs and support initiatives.\n");
    }

    let variety = dist.variety();
    if variety >= HIGH_VARIETY {
        report.push_str("   🎭 High emotional variety detected - showing healthy emotional range.\n");
    } else if variety <= LOW_VARIETY {
        report.push_str("   📌 Limited emotional variety - emotional state appears stable.\n");
    }

    let avg_confidence = dist.overall_average_confidence();
    if avg_confidence >= HIGH_CONFIDENCE {
        report.push_str(&format!(
            "   🎯 High detection confidence ({:.1}%) - emotions are clearly defined.\n",
            avg_confidence
        ));
    } else if avg_confidence < LOW_CONFIDENCE {
        report.push_str(&format!(
            "   📷 Lower detection confidence ({:.1}%) - consider improving capture conditions.\n",
            avg_confidence
        ));
    }

    report
}

/// Bar of `floor(pct / 3)` block characters, capped at 20.
fn bar(pct: f64) -> String {
    let len = ((pct / BAR_PCT_DIVISOR) as usize).min(BAR_MAX_LEN);
    "█".repeat(len)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::aggregate;

    fn dist_of(records: Vec<(&str, f64)>) -> EmotionDistribution {
        aggregate(records)
    }

    #[test]
    fn test_bar_length_at_30_pct_is_10() {
        assert_eq!(bar(30.0).chars().count(), 10);
    }

    #[test]
    fn test_bar_length_at_70_pct_caps_at_20() {
        // floor(70 / 3) = 23, capped
        assert_eq!(bar(70.0).chars().count(), 20);
    }

    #[test]
    fn test_bar_length_floors() {
        assert_eq!(bar(8.9).chars().count(), 2);
        assert_eq!(bar(9.0).chars().count(), 3);
    }

    #[test]
    fn test_empty_distribution_message() {
        let dist = dist_of(vec![]);
        assert_eq!(render(&dist, None, &EngineConfig::default()), NO_DATA_REPORT);
    }

    #[test]
    fn test_empty_actor_scope_distinct_message() {
        let dist = dist_of(vec![]);
        let report = render(&dist, Some("emp042"), &EngineConfig::default());
        assert_eq!(report, "No emotion data found for actor 'emp042'.");
    }

    #[test]
    fn test_summary_section() {
        let dist = dist_of(vec![("happy", 90.0), ("happy", 80.0), ("sad", 60.0)]);
        let report = render(&dist, None, &EngineConfig::default());

        assert!(report.contains("EMOTION ANALYSIS INSIGHTS"));
        assert!(report.contains("• Total Records: 3"));
        assert!(report.contains("• Most Common: Happy (2x, 66.7%)"));
        assert!(report.contains("• Average Confidence: 85.0%"));
    }

    #[test]
    fn test_distribution_rows_sorted_by_count() {
        let dist = dist_of(vec![("sad", 60.0), ("happy", 90.0), ("happy", 80.0)]);
        let report = render(&dist, None, &EngineConfig::default());

        let happy_pos = report.find("Happy").unwrap();
        let sad_pos = report.find("Sad").unwrap();
        assert!(happy_pos < sad_pos);
    }

    #[test]
    fn test_positive_dominant_message() {
        let dist = dist_of(vec![("happy", 90.0), ("happy", 80.0), ("sad", 60.0)]);
        let report = render(&dist, None, &EngineConfig::default());
        assert!(report.contains("balanced and positive"));
        assert!(!report.contains("wellness programs"));
    }

    #[test]
    fn test_negative_dominant_warning() {
        let dist = dist_of(vec![("sad", 60.0), ("sad", 70.0), ("happy", 90.0)]);
        let report = render(&dist, None, &EngineConfig::default());
        assert!(report.contains("Predominant sad emotions detected."));
        assert!(report.contains("wellness programs and support initiatives"));
    }

    #[test]
    fn test_variety_thresholds() {
        let high = dist_of(vec![
            ("happy", 80.0),
            ("sad", 80.0),
            ("angry", 80.0),
            ("fear", 80.0),
            ("surprise", 80.0),
        ]);
        assert!(render(&high, None, &EngineConfig::default()).contains("High emotional variety"));

        let low = dist_of(vec![("happy", 80.0), ("sad", 80.0)]);
        assert!(render(&low, None, &EngineConfig::default()).contains("Limited emotional variety"));

        let mid = dist_of(vec![("happy", 80.0), ("sad", 80.0), ("angry", 80.0)]);
        let report = render(&mid, None, &EngineConfig::default());
        assert!(!report.contains("emotional variety"));
    }

    #[test]
    fn test_confidence_thresholds() {
        let high = dist_of(vec![("happy", 85.0), ("happy", 85.0)]);
        assert!(render(&high, None, &EngineConfig::default()).contains("High detection confidence (85.0%)"));

        let low = dist_of(vec![("happy", 69.0), ("happy", 69.0)]);
        assert!(render(&low, None, &EngineConfig::default()).contains("Lower detection confidence (69.0%)"));

        let mid = dist_of(vec![("happy", 75.0), ("happy", 75.0)]);
        let report = render(&mid, None, &EngineConfig::default());
        assert!(!report.contains("detection confidence"));
    }

    #[test]
    fn test_boundary_confidence_70_has_no_note() {
        let dist = dist_of(vec![("happy", 70.0)]);
        let report = render(&dist, None, &EngineConfig::default());
        assert!(!report.contains("Lower detection confidence"));
    }
}
