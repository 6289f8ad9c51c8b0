//! # Async Queue
//!
//! A strictly serial queue of asynchronous tasks over a state value. Each task
//! receives the state produced by the previous one and returns the next state,
//! so two tasks never observe a half-applied state even when they suspend.
//!
//! The initial state is itself a future, which makes the initial load the
//! first task of the queue: nothing pushed later can run before it settles.

use crate::error::CommonError;
use crate::result::CommonResult;
use futures::future::BoxFuture;
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

type Task<S> = Box<dyn FnOnce(S) -> BoxFuture<'static, S> + Send>;

enum Message<S> {
    Run(Task<S>),
    Flush(oneshot::Sender<()>),
}

pub struct AsyncQueue<S> {
    sender: mpsc::UnboundedSender<Message<S>>,
}

impl<S: Send + 'static> AsyncQueue<S> {
    /// Spawn the worker. Must be called within a tokio runtime.
    pub fn new<F>(initial: F) -> Self
    where
        F: Future<Output = S> + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Message<S>>();
        tokio::spawn(async move {
            let mut state = initial.await;
            while let Some(message) = receiver.recv().await {
                match message {
                    Message::Run(task) => state = task(state).await,
                    Message::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("async queue worker finished");
        });
        Self { sender }
    }

    /// Enqueue a task. It runs after every previously pushed task has completed.
    pub fn push_task<F, Fut>(&self, task: F) -> CommonResult<()>
    where
        F: FnOnce(S) -> Fut + Send + 'static,
        Fut: Future<Output = S> + Send + 'static,
    {
        let task: Task<S> = Box::new(move |state| Box::pin(task(state)));
        self.sender
            .send(Message::Run(task))
            .map_err(|_| CommonError::QueueClosed)
    }

    /// Resolve once every task pushed so far has completed.
    pub async fn wait_for_completion(&self) -> CommonResult<()> {
        let (done, wait) = oneshot::channel();
        self.sender
            .send(Message::Flush(done))
            .map_err(|_| CommonError::QueueClosed)?;
        wait.await.map_err(|_| CommonError::QueueClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn test_tasks_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let queue = AsyncQueue::new(async { 0u32 });

        for i in 0..5u64 {
            let log = log.clone();
            queue
                .push_task(move |state: u32| async move {
                    // Earlier tasks sleep longer; order must still hold.
                    tokio::time::sleep(Duration::from_millis(10 * (5 - i))).await;
                    log.lock().unwrap().push(state);
                    state + 1
                })
                .unwrap();
        }
        queue.wait_for_completion().await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_initial_state_runs_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let initial_log = log.clone();
        let queue = AsyncQueue::new(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            initial_log.lock().unwrap().push("load");
        });
        let task_log = log.clone();
        queue
            .push_task(move |_| async move {
                task_log.lock().unwrap().push("update");
            })
            .unwrap();
        queue.wait_for_completion().await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["load", "update"]);
    }
}
