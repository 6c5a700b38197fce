/*
 * dispatch.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Wirehttp, an HTTP/1.1 client library.
 *
 * Wirehttp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Wirehttp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Wirehttp.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Completion delivery onto a caller-chosen execution context.
//!
//! A worker that finishes a request hands a `Completion` to a `CompletionSink` instead of calling
//! back itself. `CompletionQueue` is the stock sink: the owning context calls `drain` from its
//! own loop (timer, frame tick, event loop) and the callbacks run there.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::protocol::http::request::Request;

pub type CompletionCallback = Box<dyn FnOnce(Request) + Send + 'static>;

/// A finished request and the callback waiting for it.
pub struct Completion {
    request: Request,
    callback: CompletionCallback,
}

impl Completion {
    pub fn new(request: Request, callback: CompletionCallback) -> Self {
        Self { request, callback }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Invoke the callback on the current thread.
    pub fn run(self) {
        (self.callback)(self.request)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("uri", &self.request.uri().to_string())
            .field("state", &self.request.state())
            .finish_non_exhaustive()
    }
}

/// Receives finished requests on behalf of some execution context.
pub trait CompletionSink: Send + Sync {
    fn enqueue(&self, completion: Completion);
}

/// Thread-safe queue of completions, drained by its owner.
pub struct CompletionQueue {
    tx: mpsc::UnboundedSender<Completion>,
    rx: Mutex<mpsc::UnboundedReceiver<Completion>>,
    pending: AtomicUsize,
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            pending: AtomicUsize::new(0),
        }
    }

    /// Completions enqueued and not yet drained.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Run every queued callback on the calling thread, in enqueue order. Returns how many ran.
    ///
    /// The queue lock is released before callbacks run, so a callback may send again or drain.
    pub fn drain(&self) -> usize {
        let ready: Vec<Completion> = {
            let mut rx = self.rx.lock().unwrap_or_else(|e| e.into_inner());
            std::iter::from_fn(|| rx.try_recv().ok()).collect()
        };
        self.pending.fetch_sub(ready.len(), Ordering::AcqRel);
        let count = ready.len();
        for completion in ready {
            completion.run();
        }
        count
    }
}

impl CompletionSink for CompletionQueue {
    fn enqueue(&self, completion: Completion) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        // The receiver lives as long as self, so send cannot fail.
        let _ = self.tx.send(completion);
    }
}

impl fmt::Debug for CompletionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn drain_runs_callbacks_in_order_on_caller_thread() {
        let queue = CompletionQueue::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for path in ["/a", "/b"] {
            let seen = seen.clone();
            let request = Request::get(&format!("http://h.test{}", path)).unwrap();
            queue.enqueue(Completion::new(
                request,
                Box::new(move |r: Request| {
                    seen.lock()
                        .unwrap()
                        .push((r.uri().path().to_string(), std::thread::current().id()));
                }),
            ));
        }
        assert_eq!(queue.pending(), 2);
        assert!(seen.lock().unwrap().is_empty());

        assert_eq!(queue.drain(), 2);
        assert_eq!(queue.pending(), 0);
        let seen = seen.lock().unwrap();
        let here = std::thread::current().id();
        assert_eq!(
            *seen,
            vec![("/a".to_string(), here), ("/b".to_string(), here)]
        );
    }

    #[test]
    fn drain_on_empty_queue() {
        assert_eq!(CompletionQueue::new().drain(), 0);
    }
}
