// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Single-consumer FIFO that serializes every mutating operation of the engine.
//!
//! Producers hold a [`TaskSender`] and never wait for the task to run. One worker
//! (either [`EventQueue::run`] on a tokio task, or [`EventQueue::drain`] driven by the
//! caller) executes the tasks strictly in submission order. A failing or panicking task
//! is logged and the queue moves on to the next one.

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use log::{debug, error, info, warn};
use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::errors::EngineError;

/// Executes tasks popped from an [`EventQueue`].
#[async_trait]
pub trait TaskHandler<T: Send + 'static>: Send {
    async fn handle(&mut self, task: T) -> anyhow::Result<()>;

    /// Called once when the worker loop stops.
    async fn on_shutdown(&mut self) {}
}

/// Cloneable producer side of the queue.
pub struct TaskSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for TaskSender<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T> TaskSender<T> {
    /// Appends a task. Never blocks; fails only when the worker is gone.
    pub fn enqueue(&self, task: T) -> Result<(), EngineError> {
        self.tx.send(task).map_err(|_| EngineError::QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct EventQueue<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T: Send + 'static> EventQueue<T> {
    pub fn new() -> (TaskSender<T>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (TaskSender { tx }, Self { rx })
    }

    /// Executes queued tasks until the queue is empty and returns how many ran.
    ///
    /// Tasks enqueued by the tasks themselves are picked up by the same drain.
    pub async fn drain<H: TaskHandler<T>>(&mut self, handler: &mut H) -> usize {
        let mut executed = 0;
        while let Ok(task) = self.rx.try_recv() {
            execute(handler, task).await;
            executed += 1;
        }
        executed
    }

    /// Pops the next task without executing it.
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Spawns the worker loop on the tokio runtime.
    pub fn run<H: TaskHandler<T> + 'static>(mut self, mut handler: H) -> QueueHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            loop {
                select! {
                    biased;
                    _ = &mut shutdown_rx => {
                        info!("Event queue shutdown requested");
                        break;
                    }
                    maybe_task = self.rx.recv() => {
                        match maybe_task {
                            Some(task) => execute(&mut handler, task).await,
                            None => {
                                debug!("All task senders dropped; stopping event queue");
                                break;
                            }
                        }
                    }
                }
            }
            self.rx.close();
            handler.on_shutdown().await;
        });
        QueueHandle { join, shutdown_tx: Some(shutdown_tx) }
    }
}

async fn execute<T: Send + 'static, H: TaskHandler<T>>(handler: &mut H, task: T) {
    match AssertUnwindSafe(handler.handle(task)).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Queued task failed: {:#}", e),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            error!("Queued task panicked: {}", message);
        }
    }
}

/// Handle to control the event queue worker.
pub struct QueueHandle {
    join: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl QueueHandle {
    /// Request cooperative shutdown without awaiting the worker.
    pub fn request_shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Request cooperative shutdown and await worker completion.
    pub async fn shutdown(mut self) -> Result<(), tokio::task::JoinError> {
        self.request_shutdown();
        self.join.await
    }

    /// Forcefully abort the worker. Shutdown hooks do not run.
    pub fn abort(self) {
        self.join.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum TestTask {
        Record(u32),
        Fail(u32),
        Panic,
        Spawn(u32),
    }

    struct Recorder {
        seen: Arc<Mutex<Vec<u32>>>,
        shutdowns: Arc<Mutex<u32>>,
        sender: TaskSender<TestTask>,
    }

    #[async_trait]
    impl TaskHandler<TestTask> for Recorder {
        async fn handle(&mut self, task: TestTask) -> anyhow::Result<()> {
            match task {
                TestTask::Record(n) => {
                    self.seen.lock().unwrap().push(n);
                    Ok(())
                }
                TestTask::Fail(n) => Err(anyhow::anyhow!("task {} failed", n)),
                TestTask::Panic => panic!("boom"),
                TestTask::Spawn(n) => {
                    self.seen.lock().unwrap().push(n);
                    self.sender.enqueue(TestTask::Record(n + 1))?;
                    Ok(())
                }
            }
        }

        async fn on_shutdown(&mut self) {
            *self.shutdowns.lock().unwrap() += 1;
        }
    }

    fn setup() -> (TaskSender<TestTask>, EventQueue<TestTask>, Recorder) {
        let (sender, queue) = EventQueue::new();
        let recorder = Recorder {
            seen: Arc::new(Mutex::new(Vec::new())),
            shutdowns: Arc::new(Mutex::new(0)),
            sender: sender.clone(),
        };
        (sender, queue, recorder)
    }

    #[tokio::test]
    async fn tasks_run_in_enqueue_order() {
        let (sender, mut queue, mut recorder) = setup();
        for n in [5, 1, 4, 2, 3] {
            sender.enqueue(TestTask::Record(n)).unwrap();
        }
        assert_eq!(queue.drain(&mut recorder).await, 5);
        assert_eq!(*recorder.seen.lock().unwrap(), vec![5, 1, 4, 2, 3]);
    }

    #[tokio::test]
    async fn failing_and_panicking_tasks_do_not_halt_queue() {
        let (sender, mut queue, mut recorder) = setup();
        sender.enqueue(TestTask::Record(1)).unwrap();
        sender.enqueue(TestTask::Fail(2)).unwrap();
        sender.enqueue(TestTask::Panic).unwrap();
        sender.enqueue(TestTask::Record(3)).unwrap();
        assert_eq!(queue.drain(&mut recorder).await, 4);
        assert_eq!(*recorder.seen.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn tasks_enqueued_during_drain_run_after_earlier_ones() {
        let (sender, mut queue, mut recorder) = setup();
        sender.enqueue(TestTask::Spawn(10)).unwrap();
        sender.enqueue(TestTask::Record(20)).unwrap();
        assert_eq!(queue.drain(&mut recorder).await, 3);
        assert_eq!(*recorder.seen.lock().unwrap(), vec![10, 20, 11]);
    }

    #[tokio::test]
    async fn drain_on_empty_queue_runs_nothing() {
        let (_sender, mut queue, mut recorder) = setup();
        assert_eq!(queue.drain(&mut recorder).await, 0);
    }

    #[tokio::test]
    async fn spawned_worker_processes_and_shuts_down() {
        let (sender, queue, recorder) = setup();
        let seen = recorder.seen.clone();
        let shutdowns = recorder.shutdowns.clone();
        let handle = queue.run(recorder);

        let (done_tx, done_rx) = oneshot::channel::<()>();
        sender.enqueue(TestTask::Record(1)).unwrap();
        sender.enqueue(TestTask::Panic).unwrap();
        sender.enqueue(TestTask::Record(2)).unwrap();
        // Wait until the worker reached the last task.
        tokio::spawn(async move {
            loop {
                if seen.lock().unwrap().len() == 2 {
                    let _ = done_tx.send(());
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            }
        });
        done_rx.await.unwrap();

        handle.shutdown().await.unwrap();
        assert_eq!(*shutdowns.lock().unwrap(), 1);
        assert_eq!(sender.enqueue(TestTask::Record(3)), Err(EngineError::QueueClosed));
    }
}
