//! Scan-completion handoff.
//!
//! A counting, one-shot signal bridging the context that observes the end
//! of a scan (interrupt) to the worker task that processes it. The signal
//! is split once into a [`CompletionReleaser`] for the engine and a
//! [`CompletionWaiter`] for the scheduler.
//!
//! The waiter arms the signal before every trigger. A release is only
//! accepted while an armed scan has not been released yet, so pending
//! releases can never exceed outstanding scans and a stray or duplicated
//! interrupt cannot let the worker run ahead of the hardware.

use core::cell::Cell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::AtomicWaker;

#[derive(Clone, Copy, Default)]
struct Counts {
    /// Triggered scans not yet acquired.
    armed: u32,
    /// Completed scans not yet acquired. Always `<= armed`.
    released: u32,
}

pub struct CompletionSignal {
    counts: Mutex<CriticalSectionRawMutex, Cell<Counts>>,
    waker: AtomicWaker,
}

impl CompletionSignal {
    pub const fn new() -> Self {
        Self {
            counts: Mutex::new(Cell::new(Counts {
                armed: 0,
                released: 0,
            })),
            waker: AtomicWaker::new(),
        }
    }

    /// Hand out the producing and consuming halves.
    ///
    /// Takes `&mut self` so each instance can be split exactly once.
    pub fn split(&mut self) -> (CompletionReleaser<'_>, CompletionWaiter<'_>) {
        let signal = &*self;
        (CompletionReleaser { signal }, CompletionWaiter { signal })
    }

    fn update<R>(&self, f: impl FnOnce(&mut Counts) -> R) -> R {
        self.counts.lock(|cell| {
            let mut counts = cell.get();
            let result = f(&mut counts);
            cell.set(counts);
            result
        })
    }

    fn counts(&self) -> Counts {
        self.counts.lock(Cell::get)
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Producing half. Never blocks; safe to use from interrupt context.
pub struct CompletionReleaser<'a> {
    signal: &'a CompletionSignal,
}

impl CompletionReleaser<'_> {
    /// Report one finished scan.
    ///
    /// Returns `false` (and changes nothing) when no armed scan is waiting
    /// for a release.
    pub fn release(&self) -> bool {
        let accepted = self.signal.update(|c| {
            if c.released < c.armed {
                c.released += 1;
                true
            } else {
                false
            }
        });
        if accepted {
            self.signal.waker.wake();
        }
        accepted
    }
}

/// Consuming half, owned by the scheduler.
pub struct CompletionWaiter<'a> {
    signal: &'a CompletionSignal,
}

impl CompletionWaiter<'_> {
    /// Expect one more release. Call before triggering the scan so an
    /// immediate completion is not rejected.
    pub fn arm(&mut self) {
        self.signal
            .update(|c| c.armed = c.armed.saturating_add(1));
    }

    /// Armed scans not yet acquired.
    pub fn outstanding(&self) -> u32 {
        self.signal.counts().armed
    }

    /// Releases waiting to be acquired.
    pub fn pending(&self) -> u32 {
        self.signal.counts().released
    }

    /// Consume a release if one is pending.
    pub fn try_acquire(&mut self) -> bool {
        self.signal.update(|c| {
            if c.released > 0 {
                c.released -= 1;
                c.armed -= 1;
                true
            } else {
                false
            }
        })
    }

    /// Wait until a release is pending and consume it.
    pub async fn acquire(&mut self) {
        poll_fn(|cx| {
            self.signal.waker.register(cx.waker());
            if self.try_acquire() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }

    /// Give up on one armed scan that has not been released. A release
    /// arriving for it later is rejected.
    ///
    /// Returns `false` if every armed scan has already been released.
    pub fn disarm(&mut self) -> bool {
        self.signal.update(|c| {
            if c.armed > c.released {
                c.armed -= 1;
                true
            } else {
                false
            }
        })
    }
}
