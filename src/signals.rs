//! Signal plumbing: masking SIGWINCH around terminal writes, turning
//! asynchronous resize notifications into synchronous window updates, and
//! catching SIGINT while the terminal is in raw mode.

use std::ffi::c_int;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::sys::signal::{
    pthread_sigmask, sigaction, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal,
};

use crate::driver::TerminalDriver;
use crate::error::TerminalError;
use crate::window::{TerminalWindow, WindowHandle};

/// Set from the SIGWINCH handler, drained by `ResizeWatcher::dispatch`.
static RESIZE_PENDING: AtomicBool = AtomicBool::new(false);
static WATCHER_INSTALLED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigwinch(_: c_int) {
    RESIZE_PENDING.store(true, Ordering::SeqCst);
}

/// Blocks a fixed set of signals for the calling thread for as long as the
/// returned guard lives.
#[derive(Debug, Clone)]
pub struct SignalSuspender {
    signals: SigSet,
}

impl SignalSuspender {
    pub fn new(signals: &[Signal]) -> Self {
        let mut set = SigSet::empty();
        for &signal in signals {
            set.add(signal);
        }
        Self { signals: set }
    }

    /// Suspends terminal resize notifications.
    pub fn resize() -> Self {
        Self::new(&[Signal::SIGWINCH])
    }

    pub fn suspend(&self) -> Result<SignalGuard, TerminalError> {
        let mut previous = SigSet::empty();
        pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&self.signals), Some(&mut previous))?;
        Ok(SignalGuard { previous })
    }
}

/// Restores the signal mask that was in effect before `suspend`.
#[must_use = "signals are unblocked as soon as the guard is dropped"]
pub struct SignalGuard {
    previous: SigSet,
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        if let Err(e) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None) {
            tracing::error!("Failed to restore signal mask: {}", e);
        }
    }
}

/// Owns the process-wide SIGWINCH handler. Only one may exist at a time.
///
/// The handler itself only raises a flag; the window is updated when the
/// main loop calls `dispatch`, with SIGWINCH blocked.
pub struct ResizeWatcher<D> {
    window: WindowHandle<D>,
    suspender: SignalSuspender,
    previous: SigAction,
}

impl<D: TerminalDriver> ResizeWatcher<D> {
    pub fn install(window: WindowHandle<D>, suspender: SignalSuspender) -> Result<Self, TerminalError> {
        if WATCHER_INSTALLED.swap(true, Ordering::SeqCst) {
            return Err(TerminalError::ResizeWatcherInstalled);
        }
        RESIZE_PENDING.store(false, Ordering::SeqCst);

        let action = SigAction::new(
            SigHandler::Handler(on_sigwinch),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );

        // SAFETY: the handler only stores into an atomic.
        let previous = match unsafe { sigaction(Signal::SIGWINCH, &action) } {
            Ok(previous) => previous,
            Err(e) => {
                WATCHER_INSTALLED.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        tracing::debug!("Installed SIGWINCH handler");

        Ok(Self {
            window,
            suspender,
            previous,
        })
    }

    /// Marks a resize as pending without waiting for the signal, e.g. when
    /// the input layer reports one.
    pub fn notify(&self) {
        RESIZE_PENDING.store(true, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        RESIZE_PENDING.load(Ordering::SeqCst)
    }

    /// Runs the window's resize handling if a resize arrived since the last
    /// call. Returns whether anything was dispatched.
    pub fn dispatch(&self) -> Result<bool, TerminalError> {
        if !RESIZE_PENDING.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }

        let _guard = self.suspender.suspend()?;
        TerminalWindow::on_resize(&self.window)?;
        Ok(true)
    }
}

impl<D> Drop for ResizeWatcher<D> {
    fn drop(&mut self) {
        // SAFETY: reinstates whatever disposition was active before install.
        if let Err(e) = unsafe { sigaction(Signal::SIGWINCH, &self.previous) } {
            tracing::error!("Failed to restore SIGWINCH handler: {}", e);
        }
        WATCHER_INSTALLED.store(false, Ordering::SeqCst);
    }
}

/// Set when the process receives SIGINT. In raw mode Ctrl-C arrives as a key
/// press instead, so this mostly catches `kill -INT`.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    /// Registers the process-wide handler; can only succeed once.
    pub fn install() -> Result<Self, TerminalError> {
        let flag = Self::default();
        let raised = Arc::clone(&flag.raised);
        ctrlc::set_handler(move || raised.store(true, Ordering::SeqCst))?;
        Ok(flag)
    }

    pub fn trigger(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
