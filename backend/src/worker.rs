use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::FutureExt;
use uuid::Uuid;

use crate::pipeline::{AnalysisTask, Pipeline};

#[derive(Debug, thiserror::Error)]
#[error("analysis worker is not running")]
pub struct QueueClosed;

/// Hands analysis tasks to the background worker.
#[derive(Debug, Clone)]
pub struct Queue {
    tx: tokio::sync::mpsc::UnboundedSender<AnalysisTask>,
}

impl Queue {
    pub fn submit(&self, task: AnalysisTask) -> Result<(), QueueClosed> {
        self.tx.send(task).map_err(|_| QueueClosed)
    }
}

pub fn queue() -> (Queue, tokio::sync::mpsc::UnboundedReceiver<AnalysisTask>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    (Queue { tx }, rx)
}

/// Runs every submitted task as its own tokio task until the queue is closed
/// and all started tasks finished.
///
/// A game that is already being processed is not started a second time. A
/// panicking task fails its job instead of leaving it in progress.
pub async fn run(
    pipeline: Arc<Pipeline>,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<AnalysisTask>,
) {
    let mut tasks = tokio::task::JoinSet::new();
    let mut running = Running::default();

    loop {
        tokio::select! {
            task = rx.recv() => {
                let task = match task {
                    Some(t) => t,
                    None => break,
                };

                if !running.claim(task.game_id) {
                    tracing::warn!(game = %task.game_id, "Game is already being processed");
                    continue;
                }

                let handle = tasks.spawn(supervise(pipeline.clone(), task));
                running.track(handle.id(), task.game_id);
            }
            Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                running.finish(joined);
            }
        }
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        running.finish(joined);
    }

    tracing::info!("Analysis worker stopped");
}

/// Games with a started task, keyed by the tokio task running them.
#[derive(Debug, Default)]
struct Running {
    games: HashSet<Uuid>,
    tasks: HashMap<tokio::task::Id, Uuid>,
}

impl Running {
    /// False while the game still has a task.
    fn claim(&mut self, game_id: Uuid) -> bool {
        self.games.insert(game_id)
    }

    fn track(&mut self, task: tokio::task::Id, game_id: Uuid) {
        self.tasks.insert(task, game_id);
    }

    /// Releases the game of a joined task, whether it returned or not.
    fn finish(&mut self, joined: Result<(tokio::task::Id, Uuid), tokio::task::JoinError>) {
        let task = match joined {
            Ok((task, _)) => task,
            Err(e) => {
                tracing::error!("Joining analysis task: {:?}", e);
                e.id()
            }
        };

        if let Some(game_id) = self.tasks.remove(&task) {
            self.games.remove(&game_id);
        }
    }
}

async fn supervise(pipeline: Arc<Pipeline>, task: AnalysisTask) -> Uuid {
    let result = std::panic::AssertUnwindSafe(pipeline.advance(task))
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(job)) => {
            tracing::info!(game = %task.game_id, stage = %job.stage, "Task finished");
        }
        Ok(Err(e)) => {
            tracing::error!(game = %task.game_id, "Could not record task outcome: {}", e);
        }
        Err(_) => {
            tracing::error!(game = %task.game_id, "Task panicked");
            let failed = crate::pipeline::fail_job(
                pipeline.gateway().as_ref(),
                task.game_id,
                "Processing failed: analysis task panicked".to_owned(),
            )
            .await;
            if let Err(e) = failed {
                tracing::error!(game = %task.game_id, "Marking job as failed: {}", e);
            }
        }
    }

    task.game_id
}
