use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{JoinHandle, yield_now};
use std::time::Duration;

use log::{debug, warn};
use parking_lot::{FairMutex, Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::codec::Level;
use crate::error::GpioError;
use crate::gpio::{EdgePoller, SysfsBackend};

pub type Callback = Box<dyn FnMut(bool) + Send>;

struct Subscriber {
    line: u32,
    value_path: PathBuf,
    callback: Arc<Mutex<Callback>>,
}

/// Dispatches readiness events of every watched line, one at a time.
///
/// A fired event means "at least one edge happened since the last drain";
/// it is not a log of every transition.
pub struct EventLoop {
    backend: Arc<dyn SysfsBackend>,
    poller: FairMutex<Box<dyn EdgePoller>>,
    subscribers: RwLock<FxHashMap<u64, Subscriber>>,
    next_token: AtomicU64,
    wait_timeout: Duration,
}

impl EventLoop {
    pub fn new(
        backend: Arc<dyn SysfsBackend>,
        poller: Box<dyn EdgePoller>,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            poller: FairMutex::new(poller),
            subscribers: RwLock::new(FxHashMap::default()),
            next_token: AtomicU64::new(1),
            wait_timeout,
        }
    }

    pub(crate) fn attach(
        self: &Arc<Self>,
        line: u32,
        value_path: PathBuf,
        callback: Callback,
    ) -> Result<Watcher, GpioError> {
        self.detach_line(line)?;

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().insert(
            token,
            Subscriber {
                line,
                value_path: value_path.clone(),
                callback: Arc::new(Mutex::new(callback)),
            },
        );
        if let Err(e) = self.poller.lock().register(token, &value_path) {
            self.subscribers.write().remove(&token);
            return Err(e);
        }
        debug!("watching gpio{line} (token {token})");

        Ok(Watcher {
            line,
            token,
            events: Some(Arc::clone(self)),
        })
    }

    fn detach(&self, token: u64) -> Result<bool, GpioError> {
        let Some(sub) = self.subscribers.write().remove(&token) else {
            return Ok(false);
        };
        debug!("stop watching gpio{} (token {token})", sub.line);
        self.poller.lock().deregister(token)?;
        Ok(true)
    }

    pub(crate) fn detach_line(&self, line: u32) -> Result<(), GpioError> {
        if let Some(token) = self.token_for(line) {
            self.detach(token)?;
        }
        Ok(())
    }

    fn token_for(&self, line: u32) -> Option<u64> {
        self.subscribers
            .read()
            .iter()
            .find(|(_, sub)| sub.line == line)
            .map(|(token, _)| *token)
    }

    pub fn is_listening(&self, line: u32) -> bool {
        self.token_for(line).is_some()
    }

    fn is_registered(&self, token: u64) -> bool {
        self.subscribers.read().contains_key(&token)
    }

    pub fn watched_lines(&self) -> Vec<u32> {
        let mut lines: Vec<u32> = self.subscribers.read().values().map(|s| s.line).collect();
        lines.sort_unstable();
        lines
    }

    /// Waits up to `timeout` for events and dispatches them: sample the line,
    /// invoke its callback, then drain. Returns how many callbacks ran.
    pub fn dispatch_pending(&self, timeout: Duration) -> Result<usize, GpioError> {
        let mut ready = Vec::new();
        self.poller.lock().wait(timeout, &mut ready)?;

        let mut dispatched = 0;
        for token in ready {
            let target = self
                .subscribers
                .read()
                .get(&token)
                .map(|s| (s.line, s.value_path.clone(), Arc::clone(&s.callback)));
            let Some((line, value_path, callback)) = target else {
                continue;
            };

            match self.backend.read(&value_path) {
                Ok(raw) => {
                    let value = Level::decode(&raw).is_high();
                    let mut callback = callback.lock();
                    (*callback)(value);
                    dispatched += 1;
                }
                Err(GpioError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                    warn!("gpio{line} was unexported, stop watching");
                    self.detach(token)?;
                    continue;
                }
                Err(e) => warn!("read value for gpio{line} failed: {e}"),
            }

            if let Err(e) = self.poller.lock().drain(token) {
                warn!("drain for gpio{line} failed: {e}");
            }
        }
        Ok(dispatched)
    }

    /// Runs dispatch on a dedicated thread until the returned runner is dropped.
    pub fn start(self: &Arc<Self>) -> EventLoopRunner {
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_flag = cancel.clone();
        let events = Arc::clone(self);

        let handle = std::thread::spawn(move || {
            while !cancel_flag.load(Ordering::Relaxed) {
                if let Err(e) = events.dispatch_pending(events.wait_timeout) {
                    warn!("event dispatch error: {e}");
                    yield_now();
                }
            }
        });

        EventLoopRunner {
            cancel,
            handle: Some(handle),
        }
    }
}

pub struct EventLoopRunner {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for EventLoopRunner {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Subscription to one line's edge events. Dropping it detaches.
pub struct Watcher {
    line: u32,
    token: u64,
    events: Option<Arc<EventLoop>>,
}

impl Watcher {
    pub fn line(&self) -> u32 {
        self.line
    }

    /// False once detached, or once replaced by a newer watcher on the same line.
    pub fn is_attached(&self) -> bool {
        self.events
            .as_ref()
            .is_some_and(|events| events.is_registered(self.token))
    }

    /// Removes the registration and closes the descriptor. Calling it again is a no-op.
    pub fn detach(&mut self) -> Result<(), GpioError> {
        match self.events.take() {
            Some(events) => events.detach(self.token).map(|_| ()),
            None => Ok(()),
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        if let Err(e) = self.detach() {
            warn!("detach watcher for gpio{} failed: {e}", self.line);
        }
    }
}
