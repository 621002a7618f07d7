pub mod ui;

pub use self::ui::*;
use anyhow::{bail, format_err, Result};
use std::{
    ops::ControlFlow,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};
use tracing::error;

/// A service that is a loop that does something
///
/// Returning `Break` ends this service's loop normally.
pub trait LoopService: Send {
    fn run_iteration(&mut self) -> Result<ControlFlow<()>>;

    /// Called once when a stop request ends the loop
    fn stopped(&mut self) {}
}

/// Service execution control instance
///
/// All services are basically a loop, and we would like to be able to
/// gracefully terminate them, and handle any top-level error of any
/// of them by gracefully stopping everything else.
///
/// Stop requests are only observed between iterations.
#[derive(Clone, Default)]
pub struct ServiceControl {
    stop_all: Arc<AtomicBool>,
}

impl ServiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_all(&self) {
        self.stop_all.store(true, Ordering::SeqCst);
    }

    pub fn is_stopping(&self) -> bool {
        self.stop_all.load(Ordering::SeqCst)
    }

    /// Start a new service as a loop
    ///
    /// This will take care of checking termination condition and
    /// handling any errors returned by the service. A loop ended by a
    /// stop request, rather than by `Break` or an error, gets a final
    /// `LoopService::stopped` call.
    pub fn spawn_loop(&self, mut service: impl LoopService + 'static) -> JoinHandle {
        let stop = Arc::new(AtomicBool::new(false));

        JoinHandle::new(
            stop.clone(),
            thread::spawn({
                let stop_all = self.stop_all.clone();
                move || match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    loop {
                        if stop.load(Ordering::SeqCst) || stop_all.load(Ordering::SeqCst) {
                            service.stopped();
                            return Ok(());
                        }
                        match service.run_iteration() {
                            Ok(ControlFlow::Continue(())) => {}
                            Ok(ControlFlow::Break(())) => return Ok(()),
                            Err(e) => {
                                stop_all.store(true, Ordering::SeqCst);
                                return Err(e);
                            }
                        }
                    }
                })) {
                    Err(_e) => {
                        stop_all.store(true, Ordering::SeqCst);
                        bail!("service panicked");
                    }
                    Ok(res) => res,
                }
            }),
        )
    }
}

/// Simple thread join wrapper that joins the thread on drop
pub struct JoinHandle {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<()>>>,
}

impl JoinHandle {
    fn new(stop: Arc<AtomicBool>, handle: thread::JoinHandle<Result<()>>) -> Self {
        JoinHandle {
            stop,
            thread: Some(handle),
        }
    }

    fn join_mut(&mut self) -> Result<()> {
        if let Some(h) = self.thread.take() {
            h.join().map_err(|e| format_err!("join failed: {:?}", e))?
        } else {
            Ok(())
        }
    }

    pub fn join(mut self) -> Result<()> {
        self.join_mut()
    }
}

impl Drop for JoinHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(e) = self.join_mut() {
            error!(error = %format!("{:#}", e), "service failed");
        }
    }
}
