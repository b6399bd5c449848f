//! C2 — Calibrator.
//!
//! Bridges a structural timing gap: the provider's real prompt-token count
//! arrives in `afterModel`, one callback *after* the decision has to be
//! made in `beforeModel`. Between the two, tool execution can append large
//! tool-result messages that the stale real count knows nothing about.
//!
//! No teacher module does this directly — `TokenBudget` in the teacher
//! compares a single heuristic against a threshold with no real-count
//! correction at all. This is new code, built from the documented
//! algorithm, kept in the teacher's plain-function style (`effective_window`
//! and friends are free functions on a small struct, not a service).

use tracing::debug;

/// Used when no real token count has ever been observed for this agent.
const DEFAULT_FACTOR: f64 = 2.0;

/// Ceiling on the correction ratio. Guards against one JSON-heavy turn
/// producing a freak ratio that would pessimistically trigger compaction
/// forever.
const MAX_FACTOR: f64 = 5.0;

/// Combine the current heuristic with the agent's calibration history into
/// a single count safe to compare against a threshold.
///
/// `r_last` is the last provider-reported prompt-token count (0 if none
/// yet observed); `h_last` is the heuristic estimate of the request that
/// produced `r_last`.
pub fn calibrate(h_now: u32, r_last: u32, h_last: u32) -> u32 {
    if r_last == 0 {
        let estimate = (h_now as f64) * DEFAULT_FACTOR;
        debug!(h_now, "no calibration data yet, using default factor");
        return estimate.round() as u32;
    }

    let mut correction = if h_last == 0 {
        MAX_FACTOR
    } else {
        r_last as f64 / h_last as f64
    };
    if correction < 1.0 {
        correction = 1.0;
    }
    if correction > MAX_FACTOR {
        correction = MAX_FACTOR;
    }

    let calibrated = (h_now as f64) * correction;
    let result = calibrated.max(r_last as f64).round() as u32;
    debug!(h_now, r_last, h_last, correction, result, "calibrated token estimate");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_prior_data_uses_default_factor() {
        assert_eq!(calibrate(1000, 0, 0), 2000);
        assert_eq!(calibrate(0, 0, 0), 0);
    }

    #[test]
    fn correction_floors_at_one() {
        // r_last < h_last would give correction < 1.0; must clamp up to 1.0.
        let result = calibrate(1000, 500, 2000);
        assert_eq!(result, 1000.max(500));
    }

    #[test]
    fn correction_ceilings_at_max_factor() {
        // r_last / h_last = 100 would blow past MAX_FACTOR.
        let result = calibrate(1000, 100_000, 1000);
        assert_eq!(result, (1000.0 * MAX_FACTOR) as u32);
    }

    #[test]
    fn result_is_monotone_and_bounded() {
        // Invariant 2 from spec.md §8.
        for h_now in [0u32, 10, 500, 70_000] {
            for r_last in [0u32, 1, 10_000, 140_000] {
                for h_last in [1u32, 10, 35_000] {
                    let result = calibrate(h_now, r_last, h_last);
                    assert!(result >= r_last);
                    assert!(result >= h_now);
                    assert!(result as u64 <= (h_now as u64) * (MAX_FACTOR as u64) + r_last as u64);
                }
            }
        }
    }

    #[test]
    fn bridges_tool_growth_between_calls() {
        // Scenario S4: heuristic 70_000, real 140_000; next heuristic 90_000
        // must calibrate to >= 180_000.
        let result = calibrate(90_000, 140_000, 70_000);
        assert!(result >= 180_000, "expected >= 180000, got {result}");
    }
}
