//! Background polling of device drivers.
//!
//! A [`Poller`] runs one closure over and over on its own thread, sleeping a fixed interval in
//! between, until it is told to stop.  Drivers that share a board share it through a
//! [`BoardMutex`](crate::BoardMutex), typically an `Arc<Mutex<Board<..>>>`.
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::Error;

pub struct Poller {
    name: String,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Start a thread named `name` that calls `cycle` every `interval`.
    ///
    /// A failing cycle is logged and the loop goes on, the next cycle is the retry.
    pub fn spawn<F>(name: &str, interval: Duration, mut cycle: F) -> io::Result<Self>
    where
        F: FnMut() -> Result<(), Error> + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let thread_name = name.to_owned();

        let handle = thread::Builder::new().name(name.to_owned()).spawn(move || {
            log::debug!("poller {} started", thread_name);
            while flag.load(Ordering::Acquire) {
                if let Err(e) = cycle() {
                    log::warn!("poller {}: {}", thread_name, e);
                }
                thread::sleep(interval);
            }
            log::debug!("poller {} stopped", thread_name);
        })?;

        Ok(Self {
            name: name.to_owned(),
            running,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the thread is still looping.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ask the thread to stop after its current cycle.
    pub fn terminate(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Wait for the thread to finish.  Does not stop it, see [`terminate()`](Self::terminate).
    pub fn join(mut self) {
        self.join_inner();
    }

    fn join_inner(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("poller {} panicked", self.name);
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.terminate();
        self.join_inner();
    }
}
