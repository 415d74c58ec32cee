//! Marshalling work onto the UI thread.
//!
//! Web content may only be touched from the thread that owns the WebView.
//! Background tasks post closures through a [`MainThread`] handle; the UI
//! thread drains them from its [`MainLoop`].

use std::fmt;

use async_channel::{Receiver, Sender, unbounded};
use log::warn;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable handle for posting jobs to the UI thread.
#[derive(Clone)]
pub struct MainThread {
    sender: Sender<Job>,
}

/// Queue of posted jobs, owned by the UI thread.
pub struct MainLoop {
    receiver: Receiver<Job>,
}

/// Creates a connected handle and loop.
#[must_use]
pub fn main_thread() -> (MainThread, MainLoop) {
    let (sender, receiver) = unbounded();
    (MainThread { sender }, MainLoop { receiver })
}

impl MainThread {
    /// Queues `job` to run on the UI thread.
    ///
    /// Jobs posted after the loop is dropped are discarded.
    pub fn post<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.sender.try_send(Box::new(job)).is_err() {
            warn!("main loop is gone, dropping posted job");
        }
    }
}

impl MainLoop {
    /// Runs every job queued so far and returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Waits for the next job and runs it. Returns `false` once every
    /// [`MainThread`] handle is gone.
    pub async fn tick(&self) -> bool {
        match self.receiver.recv().await {
            Ok(job) => {
                job();
                true
            }
            Err(_) => false,
        }
    }

    /// Runs jobs until every [`MainThread`] handle is dropped.
    pub async fn run(self) {
        while self.tick().await {}
    }
}

impl fmt::Debug for MainThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainThread")
            .field("queued", &self.sender.len())
            .finish()
    }
}

impl fmt::Debug for MainLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainLoop")
            .field("queued", &self.receiver.len())
            .finish()
    }
}
