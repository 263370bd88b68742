/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: retry.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-03-02 14:05:19
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-05 09:47:32
 */

use crate::error::TransportError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_BACKOFF_MS: u64 = 500;

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_base_backoff_ms() -> u64 {
    DEFAULT_BASE_BACKOFF_MS
}

/// Bounded retry with linear backoff: the wait before attempt `k + 1` is
/// `k * base_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff_ms: DEFAULT_BASE_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts,
            // Millisecond resolution, sub-millisecond remainders round up
            base_backoff_ms: u64::try_from(base_backoff.as_micros().div_ceil(1000))
                .unwrap_or(u64::MAX),
        }
    }

    /// Effective attempt ceiling. A send always makes at least one attempt.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff()
            .checked_mul(attempt)
            .unwrap_or(Duration::MAX)
    }
}

/// States of a background delivery.
///
/// Starts at `Attempting(1)`. `Delivered` and `Failed` are terminal.
#[derive(Debug)]
pub enum DeliveryState {
    Attempting(u32),
    Backoff { next_attempt: u32, delay: Duration },
    Delivered { attempts: u32 },
    Failed { error: TransportError, attempts: u32 },
}

impl DeliveryState {
    /// Transition out of `Attempting(attempt)` given that attempt's result.
    pub fn after_attempt(
        policy: &RetryPolicy,
        attempt: u32,
        result: Result<(), TransportError>,
    ) -> Self {
        match result {
            Ok(()) => Self::Delivered { attempts: attempt },
            Err(error) if !error.is_retryable() || attempt >= policy.attempts() => Self::Failed {
                error,
                attempts: attempt,
            },
            Err(_) => Self::Backoff {
                next_attempt: attempt + 1,
                delay: policy.backoff(attempt),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered { .. } | Self::Failed { .. })
    }
}

/// Suspends the current delivery between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
