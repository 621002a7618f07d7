use super::*;
use anyhow::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, warn};

type Reply = mpsc::SyncSender<Result<Decision, DecisionError>>;

/// Bounds how long a single decision may take
///
/// The inner decider runs on one long-lived worker thread, so at most
/// one decision is ever in flight. A late answer is dropped and the
/// bidder is treated as having passed; while that late call is still
/// running, further calls are answered `Unavailable` without reaching
/// the inner decider.
pub struct DeadlineDecider {
    jobs: Mutex<mpsc::Sender<(BidContext, Reply)>>,
    busy: Arc<AtomicBool>,
    timeout: Duration,
}

impl DeadlineDecider {
    pub fn new<D>(inner: D, timeout: Duration) -> Result<Self>
    where
        D: BidDecider + 'static,
    {
        let (tx, rx) = mpsc::channel::<(BidContext, Reply)>();
        let busy = Arc::new(AtomicBool::new(false));

        thread::Builder::new().name("bid-decision".into()).spawn({
            let busy = busy.clone();
            move || {
                // ends once the decider is dropped
                for (context, reply) in rx {
                    let res = inner.decide(&context);
                    busy.store(false, Ordering::SeqCst);
                    // caller may have given up already
                    let _ = reply.send(res);
                }
            }
        })?;

        Ok(Self {
            jobs: Mutex::new(tx),
            busy,
            timeout,
        })
    }
}

impl BidDecider for DeadlineDecider {
    fn decide(&self, context: &BidContext) -> Result<Decision, DecisionError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(
                bidder = %context.bidder.id,
                item = %context.item.id,
                "previous decision still running"
            );
            return Err(DecisionError::Unavailable(
                "previous decision still running".to_owned(),
            ));
        }

        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        if self.jobs.lock().send((context.clone(), reply_tx)).is_err() {
            self.busy.store(false, Ordering::SeqCst);
            return Err(DecisionError::Unavailable(
                "decision worker died".to_owned(),
            ));
        }

        match reply_rx.recv_timeout(self.timeout) {
            Ok(res) => res,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    bidder = %context.bidder.id,
                    item = %context.item.id,
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "bid decision timed out"
                );
                Err(DecisionError::Timeout(self.timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(DecisionError::Unavailable(
                "decision worker died".to_owned(),
            )),
        }
    }
}
