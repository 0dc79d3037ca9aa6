//! Insight rule engine — maps funnel analytics to recommendation text.
//!
//! A fixed, ordered table of deterministic threshold rules. Each rule looks
//! at the [`AnalysisResult`] and appends zero or one message; the final list
//! is truncated to the insight cap. Evaluation order matters because the
//! truncation depends on it. This is template selection, not inference.

use tracing::debug;

use crate::analytics::AnalysisResult;
use crate::funnel::step_name;

/// Maximum number of insights kept per generation run.
pub const INSIGHT_LIMIT: usize = 5;

/// A single threshold rule.
pub struct InsightRule {
    /// Short identifier for logging.
    pub name: &'static str,
    /// Produces a message when the rule fires.
    pub evaluate: fn(&AnalysisResult) -> Option<String>,
}

/// Ordered rule table with a result cap.
pub struct InsightEngine {
    rules: Vec<InsightRule>,
    limit: usize,
}

impl InsightEngine {
    /// The standard rule table, in evaluation order.
    pub fn default_rules() -> Self {
        let rules = vec![
            InsightRule {
                name: "completion_tier",
                evaluate: completion_tier,
            },
            InsightRule {
                name: "highest_drop_off",
                evaluate: highest_drop_off,
            },
            InsightRule {
                name: "upload_id_friction",
                evaluate: upload_id_friction,
            },
            InsightRule {
                name: "payment_abandonment",
                evaluate: payment_abandonment,
            },
            InsightRule {
                name: "email_verification",
                evaluate: email_verification,
            },
            InsightRule {
                name: "general_optimizations",
                evaluate: general_optimizations,
            },
            InsightRule {
                name: "volume_behavior",
                evaluate: volume_behavior,
            },
        ];
        Self {
            rules,
            limit: INSIGHT_LIMIT,
        }
    }

    /// An empty rule table (for testing).
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            limit: INSIGHT_LIMIT,
        }
    }

    /// Override the result cap.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Evaluate all rules in order and truncate to the cap.
    pub fn generate(&self, analysis: &AnalysisResult) -> Vec<String> {
        let mut insights = Vec::new();
        for rule in &self.rules {
            if let Some(message) = (rule.evaluate)(analysis) {
                debug!(rule = rule.name, "Insight rule fired");
                insights.push(message);
            }
        }
        insights.truncate(self.limit);
        insights
    }
}

// ── Rule implementations ────────────────────────────────────────────

/// Rule 1: completion-rate tier. Always fires, exactly one branch.
fn completion_tier(analysis: &AnalysisResult) -> Option<String> {
    let rate = analysis.completion_rate;
    let message = if rate < 30.0 {
        format!(
            "⚠️ Critical: Only {rate:.1}% of users complete onboarding. Consider simplifying \
             the process or reducing the number of required steps."
        )
    } else if rate < 60.0 {
        format!(
            "📊 Your completion rate of {rate:.1}% has room for improvement. Focus on the \
             steps with highest drop-off rates."
        )
    } else {
        format!(
            "✅ Great! Your completion rate of {rate:.1}% is above average. Continue \
             optimizing for even better results."
        )
    };
    Some(message)
}

/// Rule 2: the worst step, when its drop-off rate exceeds 20%.
fn highest_drop_off(analysis: &AnalysisResult) -> Option<String> {
    let (step, rate) = analysis.highest_drop_off()?;
    if rate <= 20.0 {
        return None;
    }
    Some(format!(
        "🔍 Step {step} ({}) has the highest drop-off rate at {rate:.1}%. Consider adding \
         progress indicators, clearer instructions, or reducing form complexity.",
        step_name(step)
    ))
}

/// Rule 3: Upload ID (step 4) drop-off above 15%.
fn upload_id_friction(analysis: &AnalysisResult) -> Option<String> {
    let rate = analysis.drop_off_rates.get(&4).copied().unwrap_or(0.0);
    if rate <= 15.0 {
        return None;
    }
    Some(
        "📁 High drop-off at ID Upload suggests friction. Recommendations: Add file format \
         examples, implement drag-and-drop, provide clear privacy assurance, or make this \
         step optional initially."
            .to_string(),
    )
}

/// Rule 4: Payment (step 5) drop-off above 25%.
fn payment_abandonment(analysis: &AnalysisResult) -> Option<String> {
    let rate = analysis.drop_off_rates.get(&5).copied().unwrap_or(0.0);
    if rate <= 25.0 {
        return None;
    }
    Some(
        "💳 Payment step shows significant abandonment. Consider: offering a free trial \
         period, displaying security badges, providing multiple payment options, or \
         implementing guest checkout."
            .to_string(),
    )
}

/// Rule 5: Email Verification (step 2) drop-off above 20%.
fn email_verification(analysis: &AnalysisResult) -> Option<String> {
    let rate = analysis.drop_off_rates.get(&2).copied().unwrap_or(0.0);
    if rate <= 20.0 {
        return None;
    }
    Some(
        "📧 Email verification drop-off is high. Improvements: implement magic links, \
         reduce verification time, provide clear next steps, or allow users to continue \
         while verification is pending."
            .to_string(),
    )
}

/// Rule 6: generic best practices. Always fires.
fn general_optimizations(_analysis: &AnalysisResult) -> Option<String> {
    Some(
        "💡 Recommended optimizations: Add a progress bar showing completion percentage, \
         implement auto-save for partially completed forms, and provide clear value \
         propositions at each step."
            .to_string(),
    )
}

/// Rule 7: behavior analysis once there is enough volume.
fn volume_behavior(analysis: &AnalysisResult) -> Option<String> {
    if analysis.total_sessions <= 10 {
        return None;
    }
    Some(
        "🎯 User behavior analysis suggests implementing smart defaults and conditional \
         logic to reduce form fields based on user type selection in the profile setup \
         step."
            .to_string(),
    )
}
