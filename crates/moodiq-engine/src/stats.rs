//! Emotion frequency statistics.
//!
//! The distribution keeps its entries in first-encounter order so that
//! "highest count, earliest seen wins ties" is a stable, testable rule
//! rather than an accident of hash iteration.

/// Per-emotion tally within one record set.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionStat {
    pub emotion: String,
    pub count: usize,
    pub confidence_sum: f64,
}

impl EmotionStat {
    pub fn average_confidence(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.confidence_sum / self.count as f64
        }
    }
}

/// Derived distribution over a record set; never stored.
#[derive(Debug, Clone, Default)]
pub struct EmotionDistribution {
    total: usize,
    entries: Vec<EmotionStat>,
}

impl EmotionDistribution {
    /// Entries in first-encounter order.
    pub fn entries(&self) -> &[EmotionStat] {
        &self.entries
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of distinct emotion labels seen.
    pub fn variety(&self) -> usize {
        self.entries.len()
    }

    pub fn count_of(&self, emotion: &str) -> usize {
        self.entries
            .iter()
            .find(|s| s.emotion == emotion)
            .map_or(0, |s| s.count)
    }

    /// Share of the total, in percent.
    pub fn percentage(&self, stat: &EmotionStat) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            stat.count as f64 / self.total as f64 * 100.0
        }
    }

    /// Highest-count entry; ties resolve to the earliest-seen emotion.
    pub fn dominant(&self) -> Option<&EmotionStat> {
        let mut best: Option<&EmotionStat> = None;
        for stat in &self.entries {
            if best.is_none_or(|b| stat.count > b.count) {
                best = Some(stat);
            }
        }
        best
    }

    /// Entries sorted by count descending; equal counts keep
    /// first-encounter order (stable sort).
    pub fn by_count_desc(&self) -> Vec<&EmotionStat> {
        let mut sorted: Vec<&EmotionStat> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.count.cmp(&a.count));
        sorted
    }

    /// Mean confidence over every record in the set.
    pub fn overall_average_confidence(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let sum: f64 = self.entries.iter().map(|s| s.confidence_sum).sum();
        sum / self.total as f64
    }
}

/// Count emotions and sum confidences over `(emotion, confidence)` pairs.
///
/// Pure: the same input sequence always produces the same distribution,
/// including entry order.
pub fn aggregate<'a, I>(records: I) -> EmotionDistribution
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut dist = EmotionDistribution::default();

    for (emotion, confidence) in records {
        dist.total += 1;
        match dist.entries.iter_mut().find(|s| s.emotion == emotion) {
            Some(stat) => {
                stat.count += 1;
                stat.confidence_sum += confidence;
            }
            None => dist.entries.push(EmotionStat {
                emotion: emotion.to_string(),
                count: 1,
                confidence_sum: confidence,
            }),
        }
    }

    dist
}
