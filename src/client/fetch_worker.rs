//! Background fetch dispatcher
//!
//! Runs each snapshot request on its own named thread and hands the results
//! back over a channel that the main loop polls without blocking. Requests
//! may overlap, and a hung request never delays the ones issued after it.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, warn};

use crate::core::error::ViewerError;
use crate::core::io_traits::{FetchResponse, FetchTag, SnapshotFetcher, SnapshotSource};

/// `SnapshotSource` backed by one worker thread per request
pub struct FetchDispatcher<F> {
    fetcher: Arc<F>,
    tx: Sender<FetchResponse>,
    rx: Receiver<FetchResponse>,
    in_flight: Arc<AtomicUsize>,
    shutdown_flag: Arc<AtomicBool>,
}

impl<F: SnapshotFetcher + Send + Sync + 'static> FetchDispatcher<F> {
    pub fn new(fetcher: F) -> Self {
        let (tx, rx) = unbounded();
        Self {
            fetcher: Arc::new(fetcher),
            tx,
            rx,
            in_flight: Arc::new(AtomicUsize::new(0)),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests issued but not yet answered by their worker
    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl<F> FetchDispatcher<F> {
    /// Stop delivering results. Workers still running finish on their own
    /// and their results are discarded.
    fn shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
    }
}

impl<F: SnapshotFetcher + Send + Sync + 'static> SnapshotSource for FetchDispatcher<F> {
    fn request(&mut self, tag: FetchTag) {
        if self.shutdown_flag.load(Ordering::SeqCst) {
            debug!(request = %tag.request, "[FETCH] Dispatcher shut down, ignoring request");
            return;
        }

        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let shutdown_flag = Arc::clone(&self.shutdown_flag);
        let thread_tag = tag.clone();

        in_flight.fetch_add(1, Ordering::SeqCst);

        let spawned = thread::Builder::new()
            .name(format!("fetch-{}", tag.request))
            .spawn(move || {
                let tag = thread_tag;
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    fetcher.fetch(&tag.request)
                }));

                let result = result.unwrap_or_else(|panic_info| {
                    let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        format!("fetch thread panic: {}", s)
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        format!("fetch thread panic: {}", s)
                    } else {
                        "fetch thread panic".to_string()
                    };
                    error!(request = %tag.request, "[FETCH] {}", msg);
                    Err(ViewerError::state(msg))
                });

                in_flight.fetch_sub(1, Ordering::SeqCst);

                if shutdown_flag.load(Ordering::SeqCst) {
                    return;
                }
                let _ = tx.send(FetchResponse::new(tag, result));
            });

        if let Err(e) = spawned {
            warn!(request = %tag.request, error = %e, "[FETCH] Cannot spawn worker");
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let _ = self.tx.send(FetchResponse::new(
                tag,
                Err(ViewerError::network("cannot spawn fetch worker", e)),
            ));
        }
    }

    fn poll_response(&mut self) -> Option<FetchResponse> {
        match self.rx.try_recv() {
            Ok(response) => Some(response),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl<F> Drop for FetchDispatcher<F> {
    fn drop(&mut self) {
        debug!("[FETCH] Dispatcher dropped, discarding late results");
        self.shutdown();
    }
}
