//! Cap-correction reconciliation.
//!
//! The report generator caps each user's session time at a fixed ceiling,
//! while the organization's "Avg Session Time" field actually carries the
//! uncapped total. Reconciliation hands the part of that total not already
//! claimed by uncapped users to the capped users, weighted by event count.
//!
//! # Algorithm Summary
//!
//! 1. Users reporting exactly the cap with at least one event are capped.
//! 2. Budget = `avg_session_minutes - sum(uncapped minutes)`, floored at zero.
//! 3. Budget is apportioned by event share (truncated, then largest
//!    remainders), with every capped user floored at one minute.
//! 4. The organization total is recomputed from the corrected users.

use crate::types::{Organization, User};

/// Per-user session ceiling applied by the upstream report generator.
pub const DEFAULT_CAP_MINUTES: u64 = 240;

/// Configuration for cap reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Reported minutes equal to this value (with events > 0) mark a capped user.
    /// Default: 240.
    pub cap_minutes: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            cap_minutes: DEFAULT_CAP_MINUTES,
        }
    }
}

/// What reconciliation did to an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapCorrection {
    /// No user hit the cap; the total is the plain sum of reported minutes.
    Uncapped,
    /// Capped users were rewritten from the organization budget.
    Redistributed {
        capped_users: usize,
        remaining_minutes: u64,
    },
}

/// Whether a user's reported time is the upstream cap rather than a real value.
///
/// Zero-event users at the cap are not considered capped.
pub const fn is_capped(user: &User, config: &ReconcileConfig) -> bool {
    user.total_time_minutes == config.cap_minutes && user.events > 0
}

/// Corrects capped user minutes in place and recomputes the organization total.
pub fn reconcile(org: &mut Organization, config: &ReconcileConfig) -> CapCorrection {
    let capped: Vec<usize> = org
        .users
        .iter()
        .enumerate()
        .filter(|(_, u)| is_capped(u, config))
        .map(|(i, _)| i)
        .collect();

    if capped.is_empty() {
        org.total_time_minutes = org.user_minutes();
        return CapCorrection::Uncapped;
    }

    let uncapped_minutes = org
        .users
        .iter()
        .filter(|u| !is_capped(u, config))
        .map(|u| u.total_time_minutes)
        .fold(0, u64::saturating_add);
    let remaining_minutes = org.avg_session_minutes.saturating_sub(uncapped_minutes);

    let weights: Vec<u64> = capped.iter().map(|&i| org.users[i].events).collect();
    // Shares are truncated, then topped up from the largest remainders so the
    // budget is met exactly rather than left short by plain truncation.
    let shares = apportion(remaining_minutes, &weights);

    for (&i, share) in capped.iter().zip(shares) {
        org.users[i].total_time_minutes = share.max(1);
    }

    org.total_time_minutes = org.user_minutes();

    tracing::debug!(
        organization = %org.name,
        capped_users = capped.len(),
        remaining_minutes,
        total_minutes = org.total_time_minutes,
        "redistributed capped session time"
    );

    CapCorrection::Redistributed {
        capped_users: capped.len(),
        remaining_minutes,
    }
}

/// Splits `budget` across `weights` without ever exceeding it.
///
/// Each share is first truncated; the minutes lost to truncation then go one
/// at a time to the largest remainders (earlier entries win ties). When every
/// weight is zero the budget is split evenly.
pub fn apportion(budget: u64, weights: &[u64]) -> Vec<u64> {
    if weights.is_empty() {
        return Vec::new();
    }

    let total_weight: u128 = weights.iter().map(|&w| u128::from(w)).sum();
    if total_weight == 0 {
        return apportion(budget, &vec![1; weights.len()]);
    }

    let budget_wide = u128::from(budget);
    let mut shares = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for &weight in weights {
        let scaled = budget_wide * u128::from(weight);
        shares.push(scaled / total_weight);
        remainders.push(scaled % total_weight);
    }

    // Sum of truncated shares never exceeds the budget, and the shortfall is
    // strictly less than the number of weights.
    let allocated: u128 = shares.iter().sum();
    let leftover = usize::try_from(budget_wide - allocated).unwrap_or(0);

    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]));
    for &i in order.iter().take(leftover) {
        shares[i] += 1;
    }

    shares
        .into_iter()
        .map(|s| u64::try_from(s).unwrap_or(u64::MAX))
        .collect()
}
