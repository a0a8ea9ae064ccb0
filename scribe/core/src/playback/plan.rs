//! Playback Plans
//!
//! A plan is the ordered list of buffer snapshots that animates one text
//! buffer into another with minimal visible churn:
//!
//! ```text
//! current = "abcXYZ"   target = "abcQZ"   lcp = 3
//!
//! deletion  ─▶ "abc"                 (tail beyond the shared prefix removed)
//! insertion ─▶ "abcQZ"               (target tail typed back in)
//! ```
//!
//! Chunk sizes are fixed once at the start of each phase, so a phase emits at
//! most `*_chunk_steps` snapshots. Lengths count characters, never bytes, so
//! every snapshot is valid text.
//!
//! The last snapshot always equals the target exactly. Equal inputs give an
//! empty plan.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Pacing and chunking of a playback
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackTiming {
    /// Shortest pause between snapshots
    pub min_delay: Duration,
    /// Longest pause between snapshots
    pub max_delay: Duration,
    /// Smallest number of characters removed per deletion step
    pub delete_chunk_min: usize,
    /// Target number of deletion steps
    pub delete_chunk_steps: usize,
    /// Smallest number of characters added per insertion step
    pub append_chunk_min: usize,
    /// Target number of insertion steps
    pub append_chunk_steps: usize,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(3),
            delete_chunk_min: 20,
            delete_chunk_steps: 8,
            append_chunk_min: 100,
            append_chunk_steps: 10,
        }
    }
}

impl PlaybackTiming {
    /// Clamp chunk sizes and step counts to at least 1 and raise `max_delay`
    /// to `min_delay` when smaller
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            min_delay: self.min_delay,
            max_delay: self.max_delay.max(self.min_delay),
            delete_chunk_min: self.delete_chunk_min.max(1),
            delete_chunk_steps: self.delete_chunk_steps.max(1),
            append_chunk_min: self.append_chunk_min.max(1),
            append_chunk_steps: self.append_chunk_steps.max(1),
        }
    }

    /// Draw a pause uniformly from `[min_delay, max_delay]`
    pub fn sample_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        let timing = self.sanitized();
        if timing.max_delay == timing.min_delay {
            timing.min_delay
        } else {
            rng.gen_range(timing.min_delay..=timing.max_delay)
        }
    }
}

/// Ordered snapshots from a current buffer to a target
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaybackPlan {
    snapshots: Vec<String>,
}

impl PlaybackPlan {
    /// Snapshots in playback order
    #[must_use]
    pub fn snapshots(&self) -> &[String] {
        &self.snapshots
    }

    /// Number of snapshots
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the plan is a no-op
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Final snapshot (the target), if any
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.snapshots.last().map(String::as_str)
    }

    /// Take the snapshots
    #[must_use]
    pub fn into_snapshots(self) -> Vec<String> {
        self.snapshots
    }
}

impl IntoIterator for PlaybackPlan {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.into_iter()
    }
}

/// Length in characters of the longest common prefix
#[must_use]
pub fn longest_common_prefix(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Byte offset of every char boundary, including the end
fn char_boundaries(s: &str) -> Vec<usize> {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .collect()
}

/// Compute the snapshots animating `current` into `target`
pub fn build_plan(current: &str, target: &str, timing: &PlaybackTiming) -> PlaybackPlan {
    if current == target {
        return PlaybackPlan::default();
    }

    let timing = timing.sanitized();
    let lcp = longest_common_prefix(current, target);
    let mut snapshots = Vec::new();

    // Deletion phase
    let current_bounds = char_boundaries(current);
    let mut working = current_bounds.len() - 1;
    let delete_chunk = timing
        .delete_chunk_min
        .max((working - lcp).div_ceil(timing.delete_chunk_steps));
    while working > lcp {
        working = working.saturating_sub(delete_chunk).max(lcp);
        snapshots.push(current[..current_bounds[working]].to_string());
    }

    // Insertion phase
    let target_bounds = char_boundaries(target);
    let target_len = target_bounds.len() - 1;
    let append_chunk = timing
        .append_chunk_min
        .max((target_len - lcp).div_ceil(timing.append_chunk_steps));
    let mut appended = lcp;
    while appended < target_len {
        appended = (appended + append_chunk).min(target_len);
        snapshots.push(target[..target_bounds[appended]].to_string());
    }

    if snapshots.last().map(String::as_str) != Some(target) {
        snapshots.push(target.to_string());
    }

    PlaybackPlan { snapshots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_chunks() -> PlaybackTiming {
        PlaybackTiming {
            delete_chunk_min: 1,
            delete_chunk_steps: 8,
            append_chunk_min: 1,
            append_chunk_steps: 10,
            ..Default::default()
        }
    }

    /// Each step only trims or extends the tail beyond the shared prefix
    fn assert_tail_edits(current: &str, target: &str, plan: &PlaybackPlan) {
        let lcp = longest_common_prefix(current, target);
        let prefix: String = target.chars().take(lcp).collect();
        let mut previous = current.to_string();
        for snapshot in plan.snapshots() {
            assert_ne!(snapshot, &previous, "snapshot repeated");
            assert!(snapshot.starts_with(&prefix));
            let tail_edit = previous.starts_with(snapshot.as_str())
                || snapshot.starts_with(previous.as_str());
            assert!(tail_edit, "{previous:?} -> {snapshot:?} is not a tail edit");
            previous = snapshot.clone();
        }
    }

    #[test]
    fn test_lcp_counts_chars() {
        assert_eq!(longest_common_prefix("abcXYZ", "abcQZ"), 3);
        assert_eq!(longest_common_prefix("héllo", "hélp"), 3);
        assert_eq!(longest_common_prefix("", "x"), 0);
    }

    #[test]
    fn test_scenario_plan_ends_at_target() {
        let plan = build_plan("abcXYZ", "abcQZ", &PlaybackTiming::default());
        assert_eq!(plan.last(), Some("abcQZ"));
        assert_eq!(plan.snapshots(), &["abc".to_string(), "abcQZ".to_string()]);
    }

    #[test]
    fn test_equal_inputs_give_empty_plan() {
        assert!(build_plan("same", "same", &PlaybackTiming::default()).is_empty());
    }

    #[test]
    fn test_pure_insertion_and_deletion() {
        let timing = small_chunks();
        let grow = build_plan("", "0123456789abcdefghij", &timing);
        assert_eq!(grow.len(), 10);
        assert_eq!(grow.snapshots()[0], "01");
        assert_tail_edits("", "0123456789abcdefghij", &grow);

        let shrink = build_plan("0123456789abcdefghij", "", &timing);
        assert_eq!(shrink.len(), 7);
        assert_eq!(shrink.snapshots()[0], "0123456789abcdefg");
        assert_eq!(shrink.last(), Some(""));
    }

    #[test]
    fn test_chunk_fixed_per_phase() {
        let timing = small_chunks();
        let current = "x".repeat(16);
        let plan = build_plan(&current, "", &timing);
        let lengths: Vec<usize> = plan.snapshots().iter().map(String::len).collect();
        assert_eq!(lengths, vec![14, 12, 10, 8, 6, 4, 2, 0]);
    }

    #[test]
    fn test_default_minimums_dominate_short_edits() {
        let plan = build_plan("hello world", "hello there", &PlaybackTiming::default());
        assert_eq!(plan.snapshots(), &["hello ".to_string(), "hello there".to_string()]);
    }

    #[test]
    fn test_multibyte_snapshots_are_valid() {
        let current = "日本語のテキスト";
        let target = "日本の文章です";
        let plan = build_plan(current, target, &small_chunks());
        assert_eq!(plan.last(), Some(target));
        assert_tail_edits(current, target, &plan);
    }

    #[test]
    fn test_convergence_over_many_pairs() {
        let samples = ["", "a", "abc", "abcdef", "abXdef", "zzz", "abc\nline two\n", "ab"];
        for timing in [PlaybackTiming::default(), small_chunks()] {
            for current in samples {
                for target in samples {
                    let plan = build_plan(current, target, &timing);
                    if current == target {
                        assert!(plan.is_empty());
                        continue;
                    }
                    assert_eq!(plan.last(), Some(target));
                    assert_tail_edits(current, target, &plan);
                }
            }
        }
    }

    #[test]
    fn test_sanitized_clamps() {
        let timing = PlaybackTiming {
            min_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(2),
            delete_chunk_min: 0,
            delete_chunk_steps: 0,
            append_chunk_min: 0,
            append_chunk_steps: 0,
        }
        .sanitized();
        assert_eq!(timing.max_delay, Duration::from_millis(5));
        assert_eq!(timing.delete_chunk_min, 1);
        assert_eq!(timing.delete_chunk_steps, 1);
        assert_eq!(timing.append_chunk_min, 1);
        assert_eq!(timing.append_chunk_steps, 1);

        let plan = build_plan("abcd", "", &timing);
        assert_eq!(plan.snapshots(), &["".to_string()]);
    }

    #[test]
    fn test_sample_delay_in_range() {
        let timing = PlaybackTiming::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let delay = timing.sample_delay(&mut rng);
            assert!(delay >= timing.min_delay && delay <= timing.max_delay);
        }
    }
}
