//! Blocking request/response plumbing for platform helper threads.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};

use crate::error::PlatformError;

struct Envelope<Req, Resp> {
    request: Req,
    reply: Sender<Resp>,
}

/// Caller side: every [`call`](Self::call) blocks until the serving thread answers.
pub struct RequestChannel<Req, Resp> {
    tx: Sender<Envelope<Req, Resp>>,
}

impl<Req, Resp> Clone for RequestChannel<Req, Resp> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

/// Serving side, owned by the helper thread.
pub struct RequestServer<Req, Resp> {
    rx: Receiver<Envelope<Req, Resp>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServeOutcome {
    Served,
    Idle,
    /// Every [`RequestChannel`] is gone; the helper should exit.
    Disconnected,
}

pub fn request_channel<Req, Resp>() -> (RequestChannel<Req, Resp>, RequestServer<Req, Resp>) {
    let (tx, rx) = unbounded();
    (RequestChannel { tx }, RequestServer { rx })
}

impl<Req, Resp> RequestChannel<Req, Resp> {
    pub fn call(&self, request: Req) -> Result<Resp, PlatformError> {
        let (reply, response) = bounded(1);
        self.tx
            .send(Envelope { request, reply })
            .map_err(|_| PlatformError::HelperThreadGone)?;
        response.recv().map_err(|_| PlatformError::HelperThreadGone)
    }
}

impl<Req, Resp> RequestServer<Req, Resp> {
    /// Waits up to `timeout` for one request and answers it with `handler`.
    pub fn serve_timeout(&self, timeout: Duration, handler: impl FnOnce(Req) -> Resp) -> ServeOutcome {
        match self.rx.recv_timeout(timeout) {
            Ok(Envelope { request, reply }) => {
                // The caller may have given up; nothing to do about it here.
                let _ = reply.send(handler(request));
                ServeOutcome::Served
            }
            Err(RecvTimeoutError::Timeout) => ServeOutcome::Idle,
            Err(RecvTimeoutError::Disconnected) => ServeOutcome::Disconnected,
        }
    }
}

/// A named helper thread that runs until told to stop, joined with a bounded wait.
pub struct HelperThread {
    name: String,
    stop: Sender<()>,
    done: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl HelperThread {
    /// Spawns `body`, which must return once the receiver it is given yields or disconnects.
    pub fn spawn(name: &str, body: impl FnOnce(Receiver<()>) + Send + 'static) -> Result<Self, PlatformError> {
        let (stop, stop_rx) = bounded(1);
        let (done_tx, done) = bounded(1);
        let handle = std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                body(stop_rx);
                let _ = done_tx.send(());
            })
            .map_err(|e| PlatformError::WindowCreation(format!("spawning {name}: {e}")))?;
        tracing::debug!(thread = name, "helper thread started");
        Ok(Self {
            name: name.to_owned(),
            stop,
            done,
            handle: Some(handle),
        })
    }

    /// Signals the thread and waits up to `timeout` for it to finish. On timeout the
    /// thread is left detached.
    pub fn stop(mut self, timeout: Duration) -> Result<(), PlatformError> {
        let _ = self.stop.send(());
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        tracing::warn!(thread = %self.name, "helper thread panicked");
                    }
                }
                tracing::debug!(thread = %self.name, "helper thread stopped");
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(thread = %self.name, ?timeout, "helper thread did not stop in time");
                self.handle.take();
                Err(PlatformError::HelperThreadTimeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_blocks_until_served() {
        let (chan, server) = request_channel::<u32, u32>();
        let worker = std::thread::spawn(move || {
            while server.serve_timeout(Duration::from_millis(10), |v| v * 2) != ServeOutcome::Disconnected {}
        });
        assert_eq!(chan.call(21).ok(), Some(42));
        assert_eq!(chan.clone().call(5).ok(), Some(10));
        drop(chan);
        assert!(worker.join().is_ok());
    }

    #[test]
    fn call_fails_once_server_is_gone() {
        let (chan, server) = request_channel::<(), ()>();
        drop(server);
        assert!(matches!(chan.call(()), Err(PlatformError::HelperThreadGone)));
    }

    #[test]
    fn helper_thread_stops_on_signal() {
        let thread = HelperThread::spawn("svga3d-test-pump", |stop| loop {
            match stop.recv_timeout(Duration::from_millis(5)) {
                Err(RecvTimeoutError::Timeout) => continue,
                _ => break,
            }
        })
        .map_err(|e| e.to_string());
        let thread = match thread {
            Ok(t) => t,
            Err(e) => panic!("spawn failed: {e}"),
        };
        assert!(thread.stop(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn stuck_helper_reports_a_timeout() {
        // Platforms keep resources the helper may still touch alive when this fails.
        let thread = match HelperThread::spawn("svga3d-test-stuck", |_stop| {
            std::thread::sleep(Duration::from_millis(300));
        }) {
            Ok(t) => t,
            Err(e) => panic!("spawn failed: {e}"),
        };
        assert!(matches!(
            thread.stop(Duration::from_millis(10)),
            Err(PlatformError::HelperThreadTimeout(_))
        ));
    }
}
