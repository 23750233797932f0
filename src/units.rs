//! Sample unit of work: per-user score calculation over session actions
//!
//! Each action either adds to a user's score or scales it, so the
//! update is `score = score * multiply + add` and per-user ordering
//! matters. Partitioning by user id keeps every user's actions inside
//! one partition, which is what makes the partitioned run correct.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::partition::{KeyModuloLocator, PartitionKey, PartitionLocator};
use crate::store::ExecutionRecord;
use crate::worker::WorkUnit;

/// Name under which the sample unit registers
pub const SESSION_SCORE_UNIT: &str = "session-score";

/// What a session action does to its user's score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// Adds the amount to the score
    Plus,
    /// Multiplies the score by the amount
    Multi,
}

/// One recorded user action
#[derive(Debug, Clone)]
pub struct SessionAction {
    pub id: u64,
    pub user_id: u64,
    pub action: ActionType,
    pub amount: f64,
}

impl PartitionKey for SessionAction {
    fn partition_key(&self) -> u64 {
        self.user_id
    }
}

/// Computes user scores from the slice of actions a partition owns
pub struct SessionScoreUnit {
    actions: Vec<SessionAction>,
    locator: KeyModuloLocator,
    scores: Mutex<HashMap<u64, f64>>,
}

impl SessionScoreUnit {
    pub fn new(actions: Vec<SessionAction>) -> Self {
        Self {
            actions,
            locator: KeyModuloLocator,
            scores: Mutex::new(HashMap::new()),
        }
    }

    /// Deterministic synthetic dataset; every worker seeds the same
    /// actions and touches only the users its partition owns.
    pub fn with_generated(seed: u64, users: u64, actions_per_user: u32) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut actions = Vec::with_capacity((users * u64::from(actions_per_user)) as usize);
        let mut id = 0;
        for user_id in 0..users {
            for _ in 0..actions_per_user {
                let (action, amount) = if rng.random_bool(0.5) {
                    (ActionType::Plus, rng.random_range(1.0..100.0))
                } else {
                    (ActionType::Multi, rng.random_range(0.5..2.0))
                };
                actions.push(SessionAction {
                    id,
                    user_id,
                    action,
                    amount,
                });
                id += 1;
            }
        }
        Self::new(actions)
    }

    /// Snapshot of the computed scores
    pub async fn scores(&self) -> HashMap<u64, f64> {
        self.scores.lock().await.clone()
    }
}

#[async_trait]
impl WorkUnit for SessionScoreUnit {
    async fn execute(&self, record: &ExecutionRecord) -> anyhow::Result<()> {
        let owned = self.locator.select_partition(&self.actions, &record.partition);

        let mut scores = self.scores.lock().await;
        for action in owned {
            let score = scores.entry(action.user_id).or_insert(0.0);
            *score = match action.action {
                ActionType::Plus => *score + action.amount,
                ActionType::Multi => *score * action.amount,
            };
        }
        Ok(())
    }
}
