//! Message dispatcher - Routes each message to exactly one handler

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use super::handler::{Handler, ReplyChannel};
use super::matcher::{Rule, RuleSet};
use crate::application::errors::DispatchError;
use crate::domain::entities::Message;
use crate::domain::traits::Bot;

/// How events from the stream are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    /// One at a time, in arrival order
    Sequential,
    /// One task per event, bounded by `max_in_flight`
    #[default]
    Concurrent,
}

#[derive(Debug, Clone)]
pub struct DispatcherOptions {
    pub mode: DispatchMode,
    pub max_in_flight: usize,
    pub shutdown_timeout: Duration,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Concurrent,
            max_in_flight: 64,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

/// Result of dispatching a single message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled { handler: String },
    Failed { handler: String, error: String },
    /// No rule matched; the message was dropped
    Unrouted,
}

/// Why the run loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The transport closed the event stream
    StreamEnded,
    /// The shutdown token was cancelled
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub dispatched: usize,
    /// In-flight handlers aborted after the shutdown timeout
    pub abandoned: usize,
}

/// Routes messages through the compiled rule set and invokes handlers
#[derive(Clone)]
pub struct MessageDispatcher {
    rules: Arc<RuleSet>,
    bot: Arc<dyn Bot>,
    options: DispatcherOptions,
}

impl MessageDispatcher {
    pub fn new(rules: Arc<RuleSet>, bot: Arc<dyn Bot>) -> Self {
        Self {
            rules,
            bot,
            options: DispatcherOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DispatcherOptions) -> Self {
        self.options = options;
        self
    }

    /// Select the rule responsible for a message
    pub fn route(&self, message: &Message) -> Result<&Rule, DispatchError> {
        self.rules
            .route(&message.text)
            .ok_or_else(|| DispatchError::NoRuleMatched(message.text.clone()))
    }

    /// Route a message and invoke its handler once. Handler errors are
    /// logged here and never retried.
    pub async fn dispatch(&self, message: Message) -> DispatchOutcome {
        match self.select_handler(&message) {
            Some(handler) => self.invoke(handler, message).await,
            None => DispatchOutcome::Unrouted,
        }
    }

    fn select_handler(&self, message: &Message) -> Option<Arc<dyn Handler>> {
        let rule = match self.route(message) {
            Ok(rule) => rule,
            Err(e) => {
                tracing::error!(
                    chat_id = message.chat_id,
                    message_id = %message.id,
                    "Routing invariant violated: {}",
                    e
                );
                return None;
            }
        };

        tracing::debug!(
            chat_id = message.chat_id,
            message_id = %message.id,
            sent_at = %message.timestamp,
            handler = rule.handler().name(),
            "Routing via {}",
            rule.matcher()
        );
        Some(Arc::clone(rule.handler()))
    }

    async fn invoke(&self, handler: Arc<dyn Handler>, message: Message) -> DispatchOutcome {
        let reply = ReplyChannel::new(Arc::clone(&self.bot), message.chat_id);
        match handler.handle(&message, &reply).await {
            Ok(()) => DispatchOutcome::Handled {
                handler: handler.name().to_string(),
            },
            Err(e) => {
                if e.is_user_error() {
                    tracing::warn!(
                        chat_id = message.chat_id,
                        message_id = %message.id,
                        handler = handler.name(),
                        "Handler rejected input: {}",
                        e
                    );
                } else {
                    tracing::error!(
                        chat_id = message.chat_id,
                        message_id = %message.id,
                        handler = handler.name(),
                        "Handler failed: {}",
                        e
                    );
                }
                DispatchOutcome::Failed {
                    handler: handler.name().to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    /// Consume the event stream until it ends or `shutdown` is cancelled.
    ///
    /// Each event runs in its own task so a panicking handler cannot take
    /// the loop down. In sequential mode at most one task exists at a time.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<Message>,
        shutdown: CancellationToken,
    ) -> RunSummary {
        let limit = match self.options.mode {
            DispatchMode::Sequential => 1,
            DispatchMode::Concurrent => self.options.max_in_flight.max(1),
        };
        let permits = Arc::new(Semaphore::new(limit));
        let mut in_flight = InFlight::default();
        let mut dispatched = 0;

        tracing::info!(mode = ?self.options.mode, max_in_flight = limit, "Dispatcher started");

        let outcome = loop {
            in_flight.reap();

            let permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break RunOutcome::Shutdown,
                permit = Arc::clone(&permits).acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                break RunOutcome::Shutdown;
            };

            let message = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break RunOutcome::Shutdown,
                message = events.recv() => match message {
                    Some(message) => message,
                    None => break RunOutcome::StreamEnded,
                },
            };

            dispatched += 1;
            let Some(handler) = self.select_handler(&message) else {
                continue;
            };

            let context = TaskContext {
                handler: handler.name().to_string(),
                chat_id: message.chat_id,
                message_id: message.id.clone(),
            };
            let dispatcher = self.clone();
            in_flight.spawn(context, async move {
                let _permit = permit;
                dispatcher.invoke(handler, message).await
            });
        };

        match outcome {
            RunOutcome::Shutdown => {
                tracing::info!("Shutdown requested, no longer accepting messages")
            }
            RunOutcome::StreamEnded => tracing::info!("Event stream ended"),
        }

        let abandoned = in_flight.drain(self.options.shutdown_timeout).await;
        if abandoned > 0 {
            tracing::warn!(
                "Abandoned {} in-flight handlers after {:?}",
                abandoned,
                self.options.shutdown_timeout
            );
        }

        tracing::info!(dispatched, "Dispatcher stopped");
        RunSummary {
            outcome,
            dispatched,
            abandoned,
        }
    }
}

/// The event a dispatch task is handling
struct TaskContext {
    handler: String,
    chat_id: i64,
    message_id: String,
}

/// Running dispatch tasks, keyed so a panic can be traced to its event
#[derive(Default)]
struct InFlight {
    tasks: JoinSet<DispatchOutcome>,
    contexts: HashMap<task::Id, TaskContext>,
}

impl InFlight {
    fn spawn<F>(&mut self, context: TaskContext, future: F)
    where
        F: std::future::Future<Output = DispatchOutcome> + Send + 'static,
    {
        let task = self.tasks.spawn(future);
        self.contexts.insert(task.id(), context);
    }

    /// Collect tasks that already finished
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next_with_id() {
            self.log_join(joined);
        }
    }

    /// Wait for running tasks up to `timeout`, abort the rest
    async fn drain(&mut self, timeout: Duration) -> usize {
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = self.tasks.join_next_with_id() => match joined {
                    Some(joined) => self.log_join(joined),
                    None => return 0,
                },
                _ = &mut deadline => {
                    let abandoned = self.tasks.len();
                    self.tasks.abort_all();
                    while let Some(joined) = self.tasks.join_next_with_id().await {
                        self.log_join(joined);
                    }
                    return abandoned;
                }
            }
        }
    }

    fn log_join(&mut self, joined: Result<(task::Id, DispatchOutcome), JoinError>) {
        let e = match joined {
            Ok((id, outcome)) => {
                self.contexts.remove(&id);
                tracing::trace!("Dispatch finished: {:?}", outcome);
                return;
            }
            Err(e) => e,
        };

        let Some(ctx) = self.contexts.remove(&e.id()) else {
            tracing::error!("Dispatch task failed: {}", e);
            return;
        };
        if e.is_panic() {
            tracing::error!(
                handler = %ctx.handler,
                chat_id = ctx.chat_id,
                message_id = %ctx.message_id,
                "Handler panicked: {}",
                e
            );
        } else {
            tracing::warn!(
                handler = %ctx.handler,
                chat_id = ctx.chat_id,
                message_id = %ctx.message_id,
                "Handler abandoned at shutdown"
            );
        }
    }
}
