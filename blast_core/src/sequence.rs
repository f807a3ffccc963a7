//! # Firing Sequence
//!
//! Orders classified holes into a theoretical firing sequence: roles fire in
//! the configured order (reamers first, bulk last), and within a role holes
//! fire from the lowest row up, centre before flanks.
//!
//! Delays never decrease along the sequence. Each role starts at its
//! configured base delay, or one inter-hole step after the previous role's
//! last hole when the previous role runs past that base.

use serde::{Deserialize, Serialize};

use crate::classify::{BlastRole, ClassifiedHole};
use crate::errors::{DesignError, DesignResult};

/// One role in the firing order with its base delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiringStep {
    pub role: BlastRole,
    pub base_delay_ms: u32,
}

impl FiringStep {
    pub fn new(role: BlastRole, base_delay_ms: u32) -> Self {
        FiringStep { role, base_delay_ms }
    }
}

/// Firing order and delay timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiringPlan {
    /// Roles in firing order; must list every role exactly once
    pub steps: Vec<FiringStep>,
    /// Delay between consecutive holes of the same role (ms)
    pub inter_hole_delay_ms: u32,
}

impl Default for FiringPlan {
    fn default() -> Self {
        FiringPlan {
            steps: vec![
                FiringStep::new(BlastRole::Reamer, 0),
                FiringStep::new(BlastRole::Floor, 25),
                FiringStep::new(BlastRole::CutColumn, 50),
                FiringStep::new(BlastRole::Wall, 80),
                FiringStep::new(BlastRole::AuxWall, 110),
                FiringStep::new(BlastRole::AuxBack, 140),
                FiringStep::new(BlastRole::Back, 170),
                FiringStep::new(BlastRole::Bulk, 200),
            ],
            inter_hole_delay_ms: 5,
        }
    }
}

/// Longest accepted delay between consecutive holes (ms)
pub const MAX_INTER_HOLE_DELAY_MS: u32 = 1_000;

/// Latest accepted role base delay (ms)
pub const MAX_BASE_DELAY_MS: u32 = 60_000;

impl FiringPlan {
    /// Check that every role appears exactly once, base delays strictly
    /// increase in firing order, and all delays stay within bounds.
    pub fn validate(&self) -> DesignResult<()> {
        for role in BlastRole::ALL {
            let n = self.steps.iter().filter(|s| s.role == role).count();
            if n != 1 {
                return Err(DesignError::invalid_config(
                    "firing.steps",
                    format!("role '{}' must appear exactly once, found {}", role, n),
                ));
            }
        }
        if self
            .steps
            .windows(2)
            .any(|w| w[1].base_delay_ms <= w[0].base_delay_ms)
        {
            return Err(DesignError::invalid_config(
                "firing.steps",
                "base delays must strictly increase in firing order",
            ));
        }
        if let Some(step) = self.steps.iter().find(|s| s.base_delay_ms > MAX_BASE_DELAY_MS) {
            return Err(DesignError::invalid_config(
                "firing.steps",
                format!(
                    "base delay of '{}' is {} ms, limit is {} ms",
                    step.role, step.base_delay_ms, MAX_BASE_DELAY_MS
                ),
            ));
        }
        if self.inter_hole_delay_ms > MAX_INTER_HOLE_DELAY_MS {
            return Err(DesignError::invalid_config(
                "firing.inter_hole_delay_ms",
                format!(
                    "{} ms exceeds the limit of {} ms",
                    self.inter_hole_delay_ms, MAX_INTER_HOLE_DELAY_MS
                ),
            ));
        }
        Ok(())
    }

    /// Roles in firing order
    pub fn order(&self) -> Vec<BlastRole> {
        self.steps.iter().map(|s| s.role).collect()
    }
}

/// A hole with its position in the firing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequencedHole {
    #[serde(flatten)]
    pub hole: ClassifiedHole,
    /// 1-based global firing rank
    pub order: usize,
    /// Relative detonation delay (ms)
    pub delay_ms: u32,
}

/// Build the firing sequence for a classified round.
///
/// Holes whose role is absent from the plan are not sequenced; a validated
/// plan lists every role, so every hole appears exactly once. A delay that
/// does not fit in `u32` milliseconds is an `InvalidConfig` error.
///
/// # Example
///
/// ```rust
/// use blast_core::classify::{classify, default_role_quotas};
/// use blast_core::grid::{generate_grid, GridPolicy};
/// use blast_core::sequence::{sequence, FiringPlan};
///
/// let holes = generate_grid(5.2, 6.1, 0.60, 0.80, &GridPolicy::default());
/// let classified = classify(&holes, 5.2, 6.1, &default_role_quotas());
/// let seq = sequence(&classified, 5.2, &FiringPlan::default()).unwrap();
///
/// assert_eq!(seq.len(), 84);
/// assert_eq!(seq[0].order, 1);
/// assert!(seq.windows(2).all(|w| w[0].delay_ms <= w[1].delay_ms));
/// ```
pub fn sequence(holes: &[ClassifiedHole], width: f64, plan: &FiringPlan) -> DesignResult<Vec<SequencedHole>> {
    let center_x = width / 2.0;
    let mut sequenced = Vec::with_capacity(holes.len());
    let mut last_delay: Option<u32> = None;

    for step in &plan.steps {
        let mut group: Vec<&ClassifiedHole> = holes.iter().filter(|h| h.role == step.role).collect();
        if group.is_empty() {
            continue;
        }
        group.sort_by(|a, b| {
            a.y.total_cmp(&b.y)
                .then_with(|| (a.x - center_x).abs().total_cmp(&(b.x - center_x).abs()))
        });

        let base = match last_delay {
            Some(prev) => step.base_delay_ms.max(delay_after(prev, 1, plan, step.role)?),
            None => step.base_delay_ms,
        };
        if base != step.base_delay_ms {
            tracing::debug!(
                role = %step.role,
                configured = step.base_delay_ms,
                effective = base,
                "role base delay pushed back to keep delays increasing"
            );
        }

        for (idx, hole) in group.into_iter().enumerate() {
            let delay_ms = delay_after(base, idx, plan, step.role)?;
            sequenced.push(SequencedHole {
                hole: *hole,
                order: sequenced.len() + 1,
                delay_ms,
            });
            last_delay = Some(delay_ms);
        }
    }

    Ok(sequenced)
}

/// `start + steps * inter_hole_delay_ms`, or an error when it leaves `u32`.
fn delay_after(start: u32, steps: usize, plan: &FiringPlan, role: BlastRole) -> DesignResult<u32> {
    u64::try_from(steps)
        .ok()
        .and_then(|n| n.checked_mul(u64::from(plan.inter_hole_delay_ms)))
        .and_then(|offset| offset.checked_add(u64::from(start)))
        .and_then(|delay| u32::try_from(delay).ok())
        .ok_or_else(|| {
            DesignError::invalid_config(
                "firing.inter_hole_delay_ms",
                format!("delay for role '{}' overflows the firing timeline", role),
            )
        })
}
