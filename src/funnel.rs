//! Funnel definition — the fixed ordered list of onboarding steps.
//!
//! Consumed by both the session state machine (to seed step outcomes) and
//! the insight rule engine (to name steps in recommendation text).

use serde::Serialize;

/// Number of steps in the funnel.
pub const STEP_COUNT: usize = 5;

/// A single onboarding step. Static configuration, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FunnelStep {
    /// 1-based step number.
    pub id: u32,
    /// Display name.
    pub name: &'static str,
    /// Short description shown on the step card.
    pub description: &'static str,
}

/// The funnel, in order. Index `i` holds step number `i + 1`.
pub const FUNNEL_STEPS: [FunnelStep; STEP_COUNT] = [
    FunnelStep {
        id: 1,
        name: "Sign Up",
        description: "Create your account",
    },
    FunnelStep {
        id: 2,
        name: "Email Verification",
        description: "Verify your email address",
    },
    FunnelStep {
        id: 3,
        name: "Profile Setup",
        description: "Complete your profile",
    },
    FunnelStep {
        id: 4,
        name: "Upload ID",
        description: "Upload identification",
    },
    FunnelStep {
        id: 5,
        name: "Payment",
        description: "Add payment method",
    },
];

/// Look up a step by its 1-based number.
pub fn step(number: u32) -> Option<&'static FunnelStep> {
    if (1..=STEP_COUNT as u32).contains(&number) {
        Some(&FUNNEL_STEPS[(number - 1) as usize])
    } else {
        None
    }
}

/// Display name for a step number, or "Unknown" if out of range.
pub fn step_name(number: u32) -> &'static str {
    step(number).map(|s| s.name).unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_numbered_in_order() {
        for (i, s) in FUNNEL_STEPS.iter().enumerate() {
            assert_eq!(s.id as usize, i + 1);
        }
    }

    #[test]
    fn lookup_by_number() {
        assert_eq!(step(1).unwrap().name, "Sign Up");
        assert_eq!(step(4).unwrap().name, "Upload ID");
        assert_eq!(step(5).unwrap().name, "Payment");
        assert!(step(0).is_none());
        assert!(step(6).is_none());
    }

    #[test]
    fn step_name_falls_back_for_out_of_range() {
        assert_eq!(step_name(2), "Email Verification");
        assert_eq!(step_name(99), "Unknown");
    }
}
