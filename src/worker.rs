//! The FTL worker thread: owns the single `Ssd` instance and drains
//! requests off the `to_ftl` rings, dispatching each to `Ssd::service` and
//! pushing the completed request onto the matching `to_poller` ring.
//!
//! Mirrors the dataplane polling loop the device model this is based on
//! runs: wait for a start signal, then spin over every poller's ring,
//! servicing whatever is queued and triggering background GC in between.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use rings::Ring;

use crate::device::Ssd;
use crate::request::Request;

/// How long the worker sleeps between polls while waiting for the
/// dataplane to start. Matches the coarse 100ms poll the upstream thread
/// uses before it has any work to do.
const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct FtlWorker {
    to_ftl: Vec<Arc<Ring<Box<Request>>>>,
    to_poller: Vec<Arc<Ring<Box<Request>>>>,
    started: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl FtlWorker {
    pub fn new(
        to_ftl: Vec<Arc<Ring<Box<Request>>>>,
        to_poller: Vec<Arc<Ring<Box<Request>>>>,
        started: Arc<AtomicBool>,
    ) -> Self {
        assert_eq!(to_ftl.len(), to_poller.len(), "one to_poller ring is required per to_ftl ring");
        FtlWorker {
            to_ftl,
            to_poller,
            started,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Spawns the worker thread, which takes ownership of `ssd` for its
    /// entire lifetime. No other thread touches FTL state; only the rings
    /// are shared.
    pub fn spawn(self, mut ssd: Ssd) -> JoinHandle<Ssd> {
        std::thread::spawn(move || {
            while !self.started.load(Ordering::Acquire) {
                if self.shutdown.load(Ordering::Acquire) {
                    return ssd;
                }
                std::thread::sleep(STARTUP_POLL_INTERVAL);
            }

            while !self.shutdown.load(Ordering::Acquire) {
                let mut serviced_any = false;
                for (to_ftl, to_poller) in self.to_ftl.iter().zip(self.to_poller.iter()) {
                    let Some(mut req) = to_ftl.try_pop() else {
                        continue;
                    };
                    serviced_any = true;
                    ssd.service(&mut req);
                    if to_poller.try_push(req).is_err() {
                        log::error!("to_poller ring full, dropping completed request");
                    }

                    if ssd.should_gc() {
                        ssd.do_gc(false);
                    }
                }
                if !serviced_any {
                    std::thread::yield_now();
                }
            }
            ssd
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SsdParams;
    use crate::request::Opcode;

    #[test]
    fn worker_services_a_request_end_to_end() {
        let to_ftl = vec![Arc::new(Ring::new(8))];
        let to_poller = vec![Arc::new(Ring::new(8))];
        let started = Arc::new(AtomicBool::new(true));

        let worker = FtlWorker::new(to_ftl.clone(), to_poller.clone(), started);
        let shutdown = worker.shutdown_handle();
        let ssd = Ssd::new(SsdParams::small_for_test());
        let handle = worker.spawn(ssd);

        to_ftl[0]
            .try_push(Box::new(Request::new(Opcode::Write, 0, 2, 0)))
            .unwrap();

        let completed = loop {
            if let Some(req) = to_poller[0].try_pop() {
                break req;
            }
            std::thread::sleep(Duration::from_millis(5));
        };
        assert!(completed.reqlat > 0);

        shutdown.store(true, Ordering::Release);
        handle.join().unwrap();
    }
}
