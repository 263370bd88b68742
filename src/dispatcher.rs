/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: dispatcher.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-03-02 16:51:08
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-06 10:14:27
 */

//! Hands composed messages to the transport, either inline or in the background.
//!
//! Synchronous sends make exactly one attempt and return the outcome to the
//! caller. Background sends return immediately; a task owning its own
//! [`DeliveryContext`] retries transient failures with linear backoff and
//! reports the terminal outcome on an internal completion channel, which the
//! dispatcher drains into the log.

use crate::error::{ErrorClass, TransportError};
use crate::message::Message;
use crate::retry::{DeliveryState, RetryPolicy, Sleeper, TokioSleeper};
use crate::traits::Transport;
use log::{debug, error, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Synchronous,
    Asynchronous,
}

#[derive(Debug)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Failed { error: TransportError, attempts: u32 },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts } | Self::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Everything a delivery needs once it has left the caller.
///
/// Each background delivery gets its own clone at schedule time, so it never
/// depends on anything owned by the request that scheduled it.
#[derive(Clone)]
pub struct DeliveryContext {
    pub transport: Arc<dyn Transport>,
    pub policy: RetryPolicy,
    pub sleeper: Arc<dyn Sleeper>,
    pub endpoint: String,
}

impl DeliveryContext {
    pub fn new(
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            policy,
            sleeper: Arc::new(TokioSleeper),
            endpoint: endpoint.into(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

/// Terminal report of one background delivery.
#[derive(Debug)]
pub struct Completion {
    pub id: u64,
    pub endpoint: String,
    pub outcome: DeliveryOutcome,
}

impl Completion {
    fn log(&self) {
        match &self.outcome {
            DeliveryOutcome::Delivered { attempts } => debug!(
                "[delivery #{}] Delivered via {} after {} attempt(s)",
                self.id, self.endpoint, attempts
            ),
            DeliveryOutcome::Failed { error, attempts } if error.class() == ErrorClass::Fatal => {
                error!(
                    "[delivery #{}] Fatal error after {} attempt(s) via {}, not retrying: {}",
                    self.id, attempts, self.endpoint, error
                )
            }
            DeliveryOutcome::Failed { error, attempts } => error!(
                "[delivery #{}] All {} attempts via {} failed ({}); giving up: {}",
                self.id,
                attempts,
                self.endpoint,
                error.class(),
                error
            ),
        }
    }
}

pub struct Dispatcher {
    context: DeliveryContext,
    runtime: Handle,
    tracker: TaskTracker,
    completions: mpsc::UnboundedSender<Completion>,
    reporter: Option<JoinHandle<()>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    /// Creates a dispatcher bound to the current tokio runtime. Terminal
    /// outcomes of background deliveries are written to the log.
    pub fn new(context: DeliveryContext) -> anyhow::Result<Self> {
        let (mut dispatcher, mut completions) = Self::with_completions(context)?;

        let reporter = dispatcher.runtime.spawn(async move {
            while let Some(completion) = completions.recv().await {
                completion.log();
            }
        });
        dispatcher.reporter = Some(reporter);

        Ok(dispatcher)
    }

    /// Like [`Dispatcher::new`], but hands the completion stream to the
    /// caller instead of logging it.
    pub fn with_completions(
        context: DeliveryContext,
    ) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<Completion>)> {
        let runtime = Handle::try_current()
            .map_err(|e| anyhow::anyhow!("Dispatcher requires a tokio runtime: {}", e))?;
        let (completions, receiver) = mpsc::unbounded_channel();

        let dispatcher = Self {
            context,
            runtime,
            tracker: TaskTracker::new(),
            completions,
            reporter: None,
            next_id: AtomicU64::new(1),
        };

        Ok((dispatcher, receiver))
    }

    /// Returns the outcome for synchronous sends, `None` once a background
    /// send has been scheduled.
    pub async fn send(&self, message: Message, mode: DeliveryMode) -> Option<DeliveryOutcome> {
        match mode {
            DeliveryMode::Synchronous => Some(self.send_now(message).await),
            DeliveryMode::Asynchronous => {
                self.send_in_background(message);
                None
            }
        }
    }

    /// Single attempt, no retry, no backoff.
    pub async fn send_now(&self, message: Message) -> DeliveryOutcome {
        match self.context.transport.deliver(&message).await {
            Ok(()) => {
                debug!(
                    "Delivered {:?} to {} recipient(s) via {}",
                    message.subject(),
                    message.recipients().len(),
                    self.context.endpoint
                );
                DeliveryOutcome::Delivered { attempts: 1 }
            }
            Err(error) => {
                error!(
                    "Failed to send {:?} from {} to {:?} via {} ({}): {}",
                    message.subject(),
                    message.sender(),
                    message.recipients(),
                    self.context.endpoint,
                    error.class(),
                    error
                );
                DeliveryOutcome::Failed { error, attempts: 1 }
            }
        }
    }

    /// Schedules a background delivery and returns immediately.
    ///
    /// Safe to call from threads that are not part of the runtime.
    pub fn send_in_background(&self, message: Message) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let context = self.context.clone();
        let completions = self.completions.clone();
        let message = Arc::new(message);

        debug!(
            "[delivery #{}] Scheduled {:?} for {} recipient(s)",
            id,
            message.subject(),
            message.recipients().len()
        );

        self.tracker.spawn_on(
            async move {
                let endpoint = context.endpoint.clone();
                let outcome = run_delivery(id, context, message).await;
                // Nobody is listening once the runtime is shutting down
                let _ = completions.send(Completion {
                    id,
                    endpoint,
                    outcome,
                });
            },
            &self.runtime,
        );
    }

    /// Waits for every scheduled background delivery to reach a terminal
    /// state and for its report to be logged. Nothing is cancelled.
    pub async fn shutdown(self) {
        let Self {
            tracker,
            completions,
            reporter,
            ..
        } = self;

        tracker.close();
        tracker.wait().await;

        drop(completions);
        if let Some(reporter) = reporter {
            let _ = reporter.await;
        }
    }
}

async fn run_delivery(id: u64, context: DeliveryContext, message: Arc<Message>) -> DeliveryOutcome {
    let total = context.policy.attempts();
    let mut state = DeliveryState::Attempting(1);

    loop {
        state = match state {
            DeliveryState::Attempting(attempt) => {
                let result = context.transport.deliver(&message).await;
                if let Err(error) = &result {
                    log_failed_attempt(id, attempt, total, &context.endpoint, error);
                }
                DeliveryState::after_attempt(&context.policy, attempt, result)
            }
            DeliveryState::Backoff {
                next_attempt,
                delay,
            } => {
                debug!(
                    "[delivery #{}] Retrying in {:?} (attempt {}/{})",
                    id, delay, next_attempt, total
                );
                context.sleeper.sleep(delay).await;
                DeliveryState::Attempting(next_attempt)
            }
            DeliveryState::Delivered { attempts } => {
                return DeliveryOutcome::Delivered { attempts };
            }
            DeliveryState::Failed { error, attempts } => {
                return DeliveryOutcome::Failed { error, attempts };
            }
        };
    }
}

fn log_failed_attempt(id: u64, attempt: u32, total: u32, endpoint: &str, error: &TransportError) {
    match error.class() {
        ErrorClass::Transient => warn!(
            "[delivery #{}] SMTP error sending via {} (attempt {}/{}, {}): {}",
            id,
            endpoint,
            attempt,
            total,
            error.class(),
            error
        ),
        ErrorClass::Unclassified => warn!(
            "[delivery #{}] Unexpected error sending via {} (attempt {}/{}, {}): {}",
            id,
            endpoint,
            attempt,
            total,
            error.class(),
            error
        ),
        ErrorClass::Fatal => error!(
            "[delivery #{}] SMTP error sending via {} (attempt {}/{}, {}): {}",
            id,
            endpoint,
            attempt,
            total,
            error.class(),
            error
        ),
    }
}

#[cfg(test)]
#[path = "./dispatcher_tests.rs"]
mod dispatcher_tests;
