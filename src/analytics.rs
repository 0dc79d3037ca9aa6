//! Funnel analytics engine — pure reductions over the session records.
//!
//! Everything here is recomputed from scratch on every call so the results
//! always reflect the current repository contents. No caching, no state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::funnel::{FUNNEL_STEPS, STEP_COUNT};
use crate::session::SessionRecord;

/// Aggregate funnel statistics. Derived on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub total_sessions: usize,
    /// Percentage of sessions that completed every step.
    pub completion_rate: f64,
    /// Step number → percentage of sessions that dropped off there.
    /// Empty when there are no sessions, otherwise one entry per step.
    pub drop_off_rates: BTreeMap<u32, f64>,
    /// Step with the greatest drop-off rate; ties resolve to the lowest
    /// step number. Step 1 when there are no sessions.
    pub most_common_drop_off: u32,
}

impl AnalysisResult {
    /// The step with the greatest drop-off rate and that rate,
    /// first-max-wins. `None` when no rates have been computed.
    pub fn highest_drop_off(&self) -> Option<(u32, f64)> {
        let mut best: Option<(u32, f64)> = None;
        for (&step, &rate) in &self.drop_off_rates {
            match best {
                Some((_, best_rate)) if rate <= best_rate => {}
                _ => best = Some((step, rate)),
            }
        }
        best
    }
}

/// Reduce the record set to aggregate statistics.
pub fn analyze(records: &[SessionRecord]) -> AnalysisResult {
    let total_sessions = records.len();
    if total_sessions == 0 {
        return AnalysisResult {
            total_sessions: 0,
            completion_rate: 0.0,
            drop_off_rates: BTreeMap::new(),
            most_common_drop_off: 1,
        };
    }

    let completed = records.iter().filter(|r| r.is_complete()).count();
    let completion_rate = completed as f64 / total_sessions as f64 * 100.0;

    let mut drop_off_rates = BTreeMap::new();
    for step in 1..=STEP_COUNT as u32 {
        let drop_offs = records
            .iter()
            .filter(|r| r.drop_off_step == Some(step))
            .count();
        drop_off_rates.insert(step, drop_offs as f64 / total_sessions as f64 * 100.0);
    }

    // First-max-wins: a later step must be strictly greater to take over,
    // so ties resolve to the lowest step number.
    let most_common_drop_off = drop_off_rates
        .iter()
        .fold((1u32, f64::NEG_INFINITY), |(best_step, best_rate), (&step, &rate)| {
            if rate > best_rate {
                (step, rate)
            } else {
                (best_step, best_rate)
            }
        })
        .0;

    AnalysisResult {
        total_sessions,
        completion_rate,
        drop_off_rates,
        most_common_drop_off,
    }
}

/// One bar of the step-completion chart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepCompletion {
    pub step_number: u32,
    pub name: &'static str,
    /// Sessions whose outcome for this step is completed, regardless of
    /// whether the session later dropped off.
    pub completions: usize,
    pub percentage: f64,
}

/// Per-step completion counts across all records.
pub fn completion_chart(records: &[SessionRecord]) -> Vec<StepCompletion> {
    let total = records.len();
    FUNNEL_STEPS
        .iter()
        .map(|step| {
            let completions = records
                .iter()
                .filter(|r| {
                    r.steps
                        .iter()
                        .any(|s| s.step_number == step.id && s.completed)
                })
                .count();
            StepCompletion {
                step_number: step.id,
                name: step.name,
                completions,
                percentage: if total > 0 {
                    completions as f64 / total as f64 * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect()
}

/// One bar of the drop-off chart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDropOff {
    pub step_number: u32,
    pub name: &'static str,
    pub count: usize,
    pub percentage: f64,
    /// This step's share of the maximum drop-off count, for relative bar
    /// sizing. Zero when no session dropped off anywhere.
    pub relative: f64,
}

/// Per-step drop-off counts across all records.
pub fn drop_off_chart(records: &[SessionRecord]) -> Vec<StepDropOff> {
    let total = records.len();
    let counts: Vec<usize> = FUNNEL_STEPS
        .iter()
        .map(|step| {
            records
                .iter()
                .filter(|r| r.drop_off_step == Some(step.id))
                .count()
        })
        .collect();
    let max = counts.iter().copied().max().unwrap_or(0);

    FUNNEL_STEPS
        .iter()
        .zip(counts)
        .map(|(step, count)| StepDropOff {
            step_number: step.id,
            name: step.name,
            count,
            percentage: if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            relative: if max > 0 {
                count as f64 / max as f64
            } else {
                0.0
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::session::StepOutcome;

    /// A record that completed `completed_steps` steps, dropping off on the
    /// next one (or completing fully when all steps are done).
    fn record(completed_steps: usize) -> SessionRecord {
        let mut steps = StepOutcome::seed_all();
        for s in steps.iter_mut().take(completed_steps) {
            s.completed = true;
            s.timestamp = Some(Utc::now());
        }
        let drop_off_step = if completed_steps >= STEP_COUNT {
            None
        } else {
            Some(completed_steps as u32 + 1)
        };
        SessionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: "user_test".into(),
            steps,
            completed_at: Utc::now(),
            drop_off_step,
        }
    }

    #[test]
    fn empty_input_yields_degenerate_result() {
        let result = analyze(&[]);
        assert_eq!(result.total_sessions, 0);
        assert_eq!(result.completion_rate, 0.0);
        assert!(result.drop_off_rates.is_empty());
        assert_eq!(result.most_common_drop_off, 1);
        assert!(result.highest_drop_off().is_none());
    }

    #[test]
    fn reference_scenario_three_complete_seven_drop_at_four() {
        let mut records: Vec<SessionRecord> = (0..3).map(|_| record(STEP_COUNT)).collect();
        records.extend((0..7).map(|_| record(3)));

        let result = analyze(&records);
        assert_eq!(result.total_sessions, 10);
        assert_eq!(result.completion_rate, 30.0);
        assert_eq!(result.drop_off_rates[&4], 70.0);
        assert_eq!(result.drop_off_rates[&1], 0.0);
        assert_eq!(result.most_common_drop_off, 4);
        assert_eq!(result.highest_drop_off(), Some((4, 70.0)));
    }

    #[test]
    fn drop_off_rates_sum_to_non_completed_share() {
        let records = vec![record(5), record(0), record(2), record(2), record(4)];
        let result = analyze(&records);
        let sum: f64 = result.drop_off_rates.values().sum();
        let non_completed = records.iter().filter(|r| !r.is_complete()).count();
        let expected = non_completed as f64 / records.len() as f64 * 100.0;
        assert!((sum - expected).abs() < 1e-9);
    }

    #[test]
    fn tie_breaks_to_lowest_step() {
        // One drop-off each at steps 2 and 5
        let records = vec![record(1), record(4)];
        let result = analyze(&records);
        assert_eq!(result.drop_off_rates[&2], result.drop_off_rates[&5]);
        assert_eq!(result.most_common_drop_off, 2);
        assert_eq!(result.highest_drop_off(), Some((2, 50.0)));
    }

    #[test]
    fn all_completed_defaults_most_common_to_step_one() {
        let records = vec![record(5), record(5)];
        let result = analyze(&records);
        assert_eq!(result.completion_rate, 100.0);
        assert!(result.drop_off_rates.values().all(|&r| r == 0.0));
        assert_eq!(result.most_common_drop_off, 1);
    }

    #[test]
    fn completion_chart_counts_are_outcome_independent() {
        // One full completion, one drop-off after completing steps 1-2
        let records = vec![record(5), record(2)];
        let chart = completion_chart(&records);
        assert_eq!(chart.len(), STEP_COUNT);
        assert_eq!(chart[0].completions, 2);
        assert_eq!(chart[1].completions, 2);
        assert_eq!(chart[2].completions, 1);
        assert_eq!(chart[4].completions, 1);
        assert_eq!(chart[0].percentage, 100.0);
        assert_eq!(chart[2].percentage, 50.0);
    }

    #[test]
    fn drop_off_chart_scales_bars_to_max() {
        // Two drop-offs at step 3, one at step 1
        let records = vec![record(2), record(2), record(0), record(5)];
        let chart = drop_off_chart(&records);
        assert_eq!(chart[2].count, 2);
        assert_eq!(chart[2].relative, 1.0);
        assert_eq!(chart[0].count, 1);
        assert_eq!(chart[0].relative, 0.5);
        assert_eq!(chart[4].count, 0);
        assert_eq!(chart[4].relative, 0.0);
        assert_eq!(chart[2].percentage, 50.0);
    }

    #[test]
    fn charts_handle_empty_input() {
        assert!(completion_chart(&[]).iter().all(|c| c.completions == 0 && c.percentage == 0.0));
        assert!(drop_off_chart(&[]).iter().all(|d| d.count == 0 && d.relative == 0.0));
    }

    #[test]
    fn analysis_serializes_camel_case() {
        let result = analyze(&[record(1)]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalSessions"], 1);
        assert_eq!(json["completionRate"], 0.0);
        assert_eq!(json["mostCommonDropOff"], 2);
        assert_eq!(json["dropOffRates"]["2"], 100.0);
    }
}
