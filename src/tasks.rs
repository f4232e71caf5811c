//! Background work that must not block the frame loop.
//!
//! Tasks run on a tokio runtime and never touch game state. Each one finishes by posting a
//! [`TaskResult`], which the frame loop drains at the start of every unpaused frame.

use std::future::Future;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::audio::loader::SoundClip;

/// Completion message posted by a background task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    /// The calibration polling window finished with one RMS sample per poll.
    CalibrationSampled { samples: Vec<f32> },
    /// A screamer load finished. `None` when no candidate file could be read and decoded.
    SoundLoaded { id: String, clip: Option<SoundClip> },
}

/// Cloneable handle for starting tasks. Held by the components that own long-running work.
#[derive(Clone)]
pub struct TaskSpawner {
    handle: Handle,
    sender: UnboundedSender<TaskResult>,
}

impl TaskSpawner {
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        let sender = self.sender.clone();
        self.handle.spawn(async move {
            let result = task.await;
            if sender.send(result).is_err() {
                debug!("Task finished after the game shut down");
            }
        });
    }
}

/// Receiving end of the task channel, owned by the frame loop.
pub struct TaskQueue {
    spawner: TaskSpawner,
    receiver: UnboundedReceiver<TaskResult>,
}

impl TaskQueue {
    pub fn new(handle: Handle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            spawner: TaskSpawner { handle, sender },
            receiver,
        }
    }

    /// Builds a queue on the runtime the caller is running inside, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    pub fn spawner(&self) -> TaskSpawner {
        self.spawner.clone()
    }

    /// Takes every result that has arrived so far without waiting for more.
    pub fn drain(&mut self) -> Vec<TaskResult> {
        let mut results = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(result) => results.push(result),
                Err(TryRecvError::Empty) => break,
                // The queue holds a sender itself, so this only happens during teardown.
                Err(TryRecvError::Disconnected) => break,
            }
        }
        results
    }

    /// Waits for the next result. Used by tests and tools that run outside the frame loop.
    pub async fn recv(&mut self) -> Option<TaskResult> {
        self.receiver.recv().await
    }
}
