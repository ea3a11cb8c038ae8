//! # Local Trust Ledger
//!
//! Keeps the trust level in memory. Every `tasks_per_level` successful tasks
//! raise it by one; a rollback lowers it by one and resets the streak.

use std::sync::Mutex;

use crate::domain::config::TrustConfig;
use crate::domain::traits::{TaskRecord, TrustLedger};

const MIN_LEVEL: i32 = 0;
const MAX_LEVEL: i32 = 5;

#[derive(Debug)]
struct Counters {
    level: i32,
    streak: u32,
}

pub struct LocalTrust {
    tasks_per_level: u32,
    counters: Mutex<Counters>,
}

impl LocalTrust {
    pub fn new(config: &TrustConfig) -> Self {
        Self {
            tasks_per_level: config.tasks_per_level.max(1),
            counters: Mutex::new(Counters {
                level: config.initial_level.clamp(MIN_LEVEL, MAX_LEVEL),
                streak: 0,
            }),
        }
    }
}

impl TrustLedger for LocalTrust {
    fn trust_level(&self) -> i32 {
        self.counters.lock().map(|c| c.level).unwrap_or(MIN_LEVEL)
    }

    fn record_task(&self, record: TaskRecord) {
        let Ok(mut counters) = self.counters.lock() else {
            return;
        };
        if !record.success {
            counters.streak = 0;
            return;
        }
        counters.streak += 1;
        if counters.streak >= self.tasks_per_level && counters.level < MAX_LEVEL {
            counters.level += 1;
            counters.streak = 0;
            tracing::info!("Trust level raised to {}", counters.level);
        }
    }

    fn record_rollback(&self, reason: &str) {
        let Ok(mut counters) = self.counters.lock() else {
            return;
        };
        counters.streak = 0;
        if counters.level > MIN_LEVEL {
            counters.level -= 1;
        }
        tracing::warn!("Trust level lowered to {} ({})", counters.level, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(success: bool) -> TaskRecord {
        TaskRecord {
            description: "phase".to_string(),
            files_modified: Vec::new(),
            success,
        }
    }

    #[test]
    fn test_successes_raise_level() {
        let trust = LocalTrust::new(&TrustConfig {
            initial_level: 1,
            tasks_per_level: 2,
        });
        trust.record_task(task(true));
        assert_eq!(trust.trust_level(), 1);
        trust.record_task(task(true));
        assert_eq!(trust.trust_level(), 2);
    }

    #[test]
    fn test_rollback_lowers_level_and_resets_streak() {
        let trust = LocalTrust::new(&TrustConfig {
            initial_level: 1,
            tasks_per_level: 2,
        });
        trust.record_task(task(true));
        trust.record_rollback("phase failed");
        assert_eq!(trust.trust_level(), 0);
        trust.record_rollback("again");
        assert_eq!(trust.trust_level(), 0);
        trust.record_task(task(true));
        assert_eq!(trust.trust_level(), 0);
    }
}
