//! Serialization lanes
//!
//! A lane is a named mutual-exclusion domain: at most one mutating
//! operation runs per lane at a time, while read-only operations bypass
//! the lane entirely. Callers wrap tool dispatch in [`LaneRegistry::enqueue`]
//! when related mutations (e.g. edits under one directory) must not
//! interleave even though they target distinct resources.

use crate::error::{QuillError, QuillResult};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::trace;

/// Operation category with respect to lane serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneCategory {
    /// Read-only operations bypass the lane
    ReadOnly,
    /// Mutating operations take the lane's single permit
    Mutating,
}

/// Registry of named serialization lanes
#[derive(Debug, Default)]
pub struct LaneRegistry {
    lanes: DashMap<String, Arc<Semaphore>>,
}

impl LaneRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            lanes: DashMap::new(),
        }
    }

    fn lane(&self, lane_id: &str) -> Arc<Semaphore> {
        self.lanes
            .entry(lane_id.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone()
    }

    /// Run an operation under the named lane.
    ///
    /// Mutating operations hold the lane's single permit for the duration
    /// of the future; read-only operations run immediately. An optional
    /// deadline covers both the wait for the permit and the operation
    /// itself; when it fires the future is dropped and an error returned.
    pub async fn enqueue<F, T>(
        &self,
        lane_id: &str,
        category: LaneCategory,
        limit: Option<Duration>,
        op: F,
    ) -> QuillResult<T>
    where
        F: Future<Output = T>,
    {
        let run = async {
            match category {
                LaneCategory::ReadOnly => op.await,
                LaneCategory::Mutating => {
                    let semaphore = self.lane(lane_id);
                    trace!(lane = lane_id, "waiting for lane permit");
                    // The semaphore is never closed while the registry lives
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .unwrap_or_else(|_| unreachable!("lane semaphore closed"));
                    op.await
                }
            }
        };

        match limit {
            None => Ok(run.await),
            Some(limit) => timeout(limit, run).await.map_err(|_| {
                QuillError::other(format!(
                    "Lane '{}' operation timed out after {:?}",
                    lane_id, limit
                ))
            }),
        }
    }

    /// Number of lanes created so far
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }
}
