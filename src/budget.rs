//! Client-side placement budget.
//!
//! A fixed window counter: the first placement opens a window of
//! `windowSeconds`, each placement spends one unit of `remaining`, and the
//! window closing refills it. Two independent blocks sit on top: a server
//! imposed `cooldown_until`, and the optional minimum spacing
//! `cooldownSeconds` between consecutive placements.
//!
//! The server is authoritative. Its responses overwrite `remaining` and the
//! cooldown, so the local counter only has to be right until the next reply.
//! All times are host milliseconds.

#[cfg(test)]
#[path = "budget_test.rs"]
mod budget_test;

use serde::Serialize;

use crate::api::{CooldownInfo, LimitInfo};
use crate::config::BudgetLimits;

/// Snapshot for UI and debug output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    pub remaining: u32,
    pub max_per_window: u32,
    pub retry_after_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateBudget {
    limits: BudgetLimits,
    remaining: u32,
    window_start_ms: Option<f64>,
    cooldown_until_ms: Option<f64>,
    last_placement_ms: Option<f64>,
}

impl RateBudget {
    #[must_use]
    pub fn from_limits(limits: BudgetLimits) -> Self {
        Self {
            limits,
            remaining: limits.max_pixels_per_window,
            window_start_ms: None,
            cooldown_until_ms: None,
            last_placement_ms: None,
        }
    }

    #[must_use]
    pub fn limits(&self) -> BudgetLimits {
        self.limits
    }

    /// Placements left at `now`, counting a window that has already closed as refilled.
    #[must_use]
    pub fn remaining(&self, now_ms: f64) -> u32 {
        if self.window_closed(now_ms) {
            self.limits.max_pixels_per_window
        } else {
            self.remaining
        }
    }

    #[must_use]
    pub fn can_place(&self, now_ms: f64) -> bool {
        self.retry_after_ms(now_ms) <= 0.0
    }

    /// Milliseconds until the next placement is allowed; `0` when one is allowed now.
    #[must_use]
    pub fn retry_after_ms(&self, now_ms: f64) -> f64 {
        let mut wait: f64 = 0.0;
        if self.remaining(now_ms) == 0 {
            // An exhausted budget without an open window waits a full window.
            let reset_at = self.window_start_ms.unwrap_or(now_ms) + self.window_ms();
            wait = wait.max(reset_at - now_ms);
        }
        if let Some(until) = self.cooldown_until_ms {
            wait = wait.max(until - now_ms);
        }
        if let Some(last) = self.last_placement_ms
            && self.limits.cooldown_seconds > 0.0
        {
            wait = wait.max(last + self.limits.cooldown_seconds * 1000.0 - now_ms);
        }
        wait.max(0.0)
    }

    /// Spend one placement. Returns `false`, changing nothing, when the budget forbids it.
    pub fn record_placement(&mut self, now_ms: f64) -> bool {
        if !self.can_place(now_ms) {
            return false;
        }
        self.roll_window(now_ms);
        if self.window_start_ms.is_none() {
            self.window_start_ms = Some(now_ms);
        }
        self.remaining = self.remaining.saturating_sub(1);
        self.last_placement_ms = Some(now_ms);
        true
    }

    /// Adopt the budget a successful placement reported.
    pub fn apply_server_info(&mut self, info: CooldownInfo, now_ms: f64) {
        self.roll_window(now_ms);
        self.remaining = info.remaining.min(self.limits.max_pixels_per_window);
        if self.window_start_ms.is_none() && self.remaining < self.limits.max_pixels_per_window {
            self.window_start_ms = Some(now_ms);
        }
        self.cooldown_until_ms = (info.cooldown_seconds.is_finite() && info.cooldown_seconds > 0.0)
            .then(|| now_ms + info.cooldown_seconds * 1000.0);
    }

    /// The server refused for budget reasons: nothing is left until it says otherwise.
    pub fn mark_exhausted(&mut self, info: Option<LimitInfo>, now_ms: f64) {
        self.roll_window(now_ms);
        self.remaining = 0;
        if self.window_start_ms.is_none() {
            self.window_start_ms = Some(now_ms);
        }
        if let Some(wait) = info.and_then(|i| i.retry_after_ms()) {
            self.cooldown_until_ms = Some(now_ms + wait);
        }
    }

    #[must_use]
    pub fn status(&self, now_ms: f64) -> BudgetStatus {
        BudgetStatus {
            remaining: self.remaining(now_ms),
            max_per_window: self.limits.max_pixels_per_window,
            retry_after_ms: self.retry_after_ms(now_ms),
        }
    }

    fn window_ms(&self) -> f64 {
        f64::from(self.limits.window_seconds) * 1000.0
    }

    fn window_closed(&self, now_ms: f64) -> bool {
        self.window_start_ms.is_some_and(|start| now_ms - start >= self.window_ms())
    }

    fn roll_window(&mut self, now_ms: f64) {
        if self.window_closed(now_ms) {
            self.remaining = self.limits.max_pixels_per_window;
            self.window_start_ms = None;
        }
    }
}
