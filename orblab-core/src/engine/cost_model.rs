//! Cost model — friction-aware conversion of theoretical to realized R.
//!
//! Friction is a flat per-contract dollar amount (commission + spread +
//! slippage). It is embedded into both legs of the trade: the risk leg grows
//! by the friction, the reward leg shrinks by it.
//!
//! The minimum-viable-risk gate rejects trades whose friction exceeds a
//! fixed share of the dollar stop distance. It runs at fill time, before any
//! R-multiple exists.

use serde::{Deserialize, Serialize};

use crate::domain::{InstrumentSpec, Outcome, TradeOutcome};

/// Default ceiling on friction / dollar risk.
pub const MAX_FRICTION_RATIO: f64 = 0.30;

/// Friction-adjusted view of one trade. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealizedResult {
    pub realized_risk_dollars: f64,
    pub realized_reward_dollars: f64,
    pub realized_rr: f64,
    pub friction_ratio: f64,
    pub passes_cost_gate: bool,
}

/// Instrument friction, optionally inflated for stress testing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    spec: InstrumentSpec,
    friction_multiplier: f64,
}

impl CostModel {
    pub fn new(spec: InstrumentSpec) -> Self {
        Self {
            spec,
            friction_multiplier: 1.0,
        }
    }

    /// Same instrument with friction scaled by `multiplier` (e.g. 1.25).
    pub fn with_friction_multiplier(&self, multiplier: f64) -> Self {
        Self {
            friction_multiplier: multiplier,
            ..self.clone()
        }
    }

    pub fn spec(&self) -> &InstrumentSpec {
        &self.spec
    }

    pub fn friction_multiplier(&self) -> f64 {
        self.friction_multiplier
    }

    /// Round-trip friction in dollars for one contract.
    pub fn total_friction(&self) -> f64 {
        self.spec.total_friction() * self.friction_multiplier
    }

    /// Friction as a share of the dollar stop distance. Infinite for a
    /// zero-width stop.
    pub fn friction_ratio(&self, risk_points: f64) -> f64 {
        let risk_dollars = risk_points * self.spec.point_value;
        if risk_dollars > 0.0 {
            self.total_friction() / risk_dollars
        } else {
            f64::INFINITY
        }
    }

    pub fn passes_gate(&self, risk_points: f64) -> bool {
        self.friction_ratio(risk_points) <= MAX_FRICTION_RATIO
    }

    /// Convert a theoretical risk/reward pair into realized dollars and RR.
    pub fn realize(&self, risk_points: f64, reward_points: f64) -> RealizedResult {
        let friction = self.total_friction();
        let realized_risk_dollars = risk_points * self.spec.point_value + friction;
        let realized_reward_dollars = reward_points * self.spec.point_value - friction;
        let realized_rr = if realized_risk_dollars > 0.0 {
            realized_reward_dollars / realized_risk_dollars
        } else {
            0.0
        };
        RealizedResult {
            realized_risk_dollars,
            realized_reward_dollars,
            realized_rr,
            friction_ratio: self.friction_ratio(risk_points),
            passes_cost_gate: self.passes_gate(risk_points),
        }
    }

    /// Trade result in realized-risk units: a win earns `realized_rr`, a loss
    /// costs exactly one realized risk. Unresolved trades are marked to the
    /// exit with friction charged. `None` for trades that fail the gate.
    pub fn realized_r(
        &self,
        trade: &TradeOutcome,
        realized: &RealizedResult,
        risk_points: f64,
    ) -> Option<f64> {
        if !realized.passes_cost_gate || realized.realized_risk_dollars <= 0.0 {
            return None;
        }
        let r = match trade.outcome {
            Outcome::Win => realized.realized_rr,
            Outcome::Loss => -1.0,
            Outcome::Unresolved => {
                let pnl = trade.theoretical_r * risk_points * self.spec.point_value
                    - self.total_friction();
                pnl / realized.realized_risk_dollars
            }
            _ => return None,
        };
        Some(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(point_value: f64, friction: f64) -> InstrumentSpec {
        InstrumentSpec {
            symbol: "TEST".into(),
            tick_size: 0.25,
            tick_value: point_value * 0.25,
            point_value,
            commission_round_trip: friction,
            spread_cost: 0.0,
            slippage_cost: 0.0,
        }
    }

    #[test]
    fn friction_embedded_in_both_legs() {
        let cost = CostModel::new(spec(50.0, 25.0));
        // 4 points risk = $200, 6 points reward = $300
        let r = cost.realize(4.0, 6.0);
        assert!((r.realized_risk_dollars - 225.0).abs() < 1e-10);
        assert!((r.realized_reward_dollars - 275.0).abs() < 1e-10);
        assert!((r.realized_rr - 275.0 / 225.0).abs() < 1e-10);
        assert!(r.passes_cost_gate);
    }

    #[test]
    fn tiny_stop_fails_gate() {
        // 0.10 points * $10 = $1.00 risk, $8.40 friction -> 840%
        let cost = CostModel::new(spec(10.0, 8.40));
        let r = cost.realize(0.10, 0.15);
        assert!((r.friction_ratio - 8.4).abs() < 1e-9);
        assert!(!r.passes_cost_gate);
        assert!(!cost.passes_gate(0.10));
    }

    #[test]
    fn gate_threshold_is_inclusive() {
        let cost = CostModel::new(spec(10.0, 3.0));
        // $3 friction / $10 risk = exactly 0.30
        assert!(cost.passes_gate(1.0));
        assert!(!cost.passes_gate(0.99));
    }

    #[test]
    fn zero_risk_always_fails_gate() {
        let cost = CostModel::new(spec(10.0, 0.0));
        assert!(!cost.passes_gate(0.0));
    }

    #[test]
    fn multiplier_scales_friction() {
        let base = CostModel::new(spec(50.0, 20.0));
        let stressed = base.with_friction_multiplier(1.5);
        assert!((stressed.total_friction() - 30.0).abs() < 1e-10);
        assert_eq!(base.total_friction(), 20.0);
        assert!(stressed.realize(2.0, 3.0).realized_rr < base.realize(2.0, 3.0).realized_rr);
    }

    #[test]
    fn conversion_is_idempotent() {
        let cost = CostModel::new(spec(20.0, 14.2));
        let first = cost.realize(3.5, 5.25);
        let _ = cost.realize(0.1, 9.0);
        let _ = cost.realize(12.0, 1.0);
        let again = cost.realize(3.5, 5.25);
        assert_eq!(first, again);
    }
}
