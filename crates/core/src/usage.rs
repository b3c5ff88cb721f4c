//! Usage Gate: whether the current tier may open a given spread
//!
//! The gate is consulted by the caller before a reading starts; the
//! orchestrator never looks at it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::SpreadType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadCounts {
    pub one_card: u32,
    pub three_card: u32,
    pub five_card: u32,
}

impl SpreadCounts {
    fn get(&self, spread: SpreadType) -> u32 {
        match spread {
            SpreadType::Single => self.one_card,
            SpreadType::Three => self.three_card,
            SpreadType::Five => self.five_card,
        }
    }

    fn get_mut(&mut self, spread: SpreadType) -> &mut u32 {
        match spread {
            SpreadType::Single => &mut self.one_card,
            SpreadType::Three => &mut self.three_card,
            SpreadType::Five => &mut self.five_card,
        }
    }
}

/// Monthly limits, `None` means unlimited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadLimits {
    pub one_card: Option<u32>,
    pub three_card: Option<u32>,
    pub five_card: Option<u32>,
}

impl SpreadLimits {
    fn get(&self, spread: SpreadType) -> Option<u32> {
        match spread {
            SpreadType::Single => self.one_card,
            SpreadType::Three => self.three_card,
            SpreadType::Five => self.five_card,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadFlags {
    pub one_card: bool,
    pub three_card: bool,
    pub five_card: bool,
}

impl SpreadFlags {
    fn get(&self, spread: SpreadType) -> bool {
        match spread {
            SpreadType::Single => self.one_card,
            SpreadType::Three => self.three_card,
            SpreadType::Five => self.five_card,
        }
    }

    fn set(&mut self, spread: SpreadType, value: bool) {
        match spread {
            SpreadType::Single => self.one_card = value,
            SpreadType::Three => self.three_card = value,
            SpreadType::Five => self.five_card = value,
        }
    }
}

/// Usage report as served by the usage service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub usage: SpreadCounts,
    pub limits: SpreadLimits,
    pub can_use: SpreadFlags,
}

impl UsageSnapshot {
    /// Snapshot for a fresh month under the given limits
    pub fn fresh(limits: SpreadLimits) -> Self {
        let mut can_use = SpreadFlags {
            one_card: true,
            three_card: true,
            five_card: true,
        };
        for spread in SpreadType::ALL {
            can_use.set(spread, limits.get(spread).map_or(true, |limit| limit > 0));
        }

        Self {
            usage: SpreadCounts::default(),
            limits,
            can_use,
        }
    }
}

pub trait UsageGate: Send + Sync {
    fn can_use_spread(&self, spread: SpreadType) -> bool;

    /// Readings left this month, `None` when unlimited or unknown
    fn remaining(&self, spread: SpreadType) -> Option<u32>;

    /// Count a finished reading against the allowance
    fn record_reading(&mut self, spread: SpreadType);
}

/// Gate backed by the last known usage snapshot
#[derive(Debug, Clone, Default)]
pub struct AllowanceGate {
    snapshot: Option<UsageSnapshot>,
}

impl AllowanceGate {
    pub fn new(snapshot: Option<UsageSnapshot>) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> Option<&UsageSnapshot> {
        self.snapshot.as_ref()
    }
}

impl UsageGate for AllowanceGate {
    fn can_use_spread(&self, spread: SpreadType) -> bool {
        if spread == SpreadType::Single {
            return true;
        }
        // Usage not loaded yet: do not block the user
        self.snapshot
            .as_ref()
            .map_or(true, |snapshot| snapshot.can_use.get(spread))
    }

    fn remaining(&self, spread: SpreadType) -> Option<u32> {
        let snapshot = self.snapshot.as_ref()?;
        let limit = snapshot.limits.get(spread)?;
        Some(limit.saturating_sub(snapshot.usage.get(spread)))
    }

    fn record_reading(&mut self, spread: SpreadType) {
        let Some(snapshot) = self.snapshot.as_mut() else {
            return;
        };

        let used = snapshot.usage.get_mut(spread);
        *used += 1;
        let used = *used;

        let allowed = spread == SpreadType::Single
            || snapshot.limits.get(spread).map_or(true, |limit| used < limit);
        snapshot.can_use.set(spread, allowed);

        debug!(spread = %spread, used, allowed, "Recorded reading against allowance");
    }
}
