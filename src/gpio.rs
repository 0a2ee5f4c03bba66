use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use crate::codec::{Direction, Edge};
use crate::config::GpioConfig;
use crate::error::GpioError;
use crate::line::Line;
use crate::registry::LineRegistry;
use crate::validate::Bound;
use crate::watcher::EventLoop;

/// Blocking access to the kernel's GPIO control files.
pub trait SysfsBackend: Send + Sync {
    fn write(&self, path: &Path, contents: &str) -> Result<(), GpioError>;
    fn read(&self, path: &Path) -> Result<String, GpioError>;
    /// Existence probe. Absence is an expected answer, not an error.
    fn exists(&self, path: &Path) -> bool;
    /// Creates a readiness facility able to watch this backend's value files.
    fn poller(&self) -> Result<Box<dyn EdgePoller>, GpioError>;
}

/// Priority-event readiness facility over opened `value` files.
///
/// Each registration owns one open descriptor, identified by `token`.
pub trait EdgePoller: Send {
    /// Opens `value_path`, drains the stale event indicator, then registers the
    /// descriptor for priority events.
    fn register(&mut self, token: u64, value_path: &Path) -> Result<(), GpioError>;
    /// Removes the registration and closes its descriptor. Unknown tokens are ignored.
    fn deregister(&mut self, token: u64) -> Result<(), GpioError>;
    /// Consumes the pending event indicator of a registration.
    fn drain(&mut self, token: u64) -> Result<(), GpioError>;
    /// Waits up to `timeout` and appends the tokens that have an event pending.
    fn wait(&mut self, timeout: Duration, ready: &mut Vec<u64>) -> Result<(), GpioError>;
}

pub(crate) struct GpioContext {
    pub root: PathBuf,
    pub bound: Bound,
    pub backend: Arc<dyn SysfsBackend>,
    pub registry: LineRegistry,
    pub events: Arc<EventLoop>,
}

/// Factory for [`Line`] controllers sharing one backend, registry and event loop.
#[derive(Clone)]
pub struct Gpio {
    ctx: Arc<GpioContext>,
}

impl Gpio {
    pub fn new(backend: Arc<dyn SysfsBackend>, config: &GpioConfig) -> Result<Self, GpioError> {
        let bound = Bound::new(config.bound.low, config.bound.high)?;
        let events = Arc::new(EventLoop::new(
            backend.clone(),
            backend.poller()?,
            config.event_wait_timeout(),
        ));

        Ok(Self {
            ctx: Arc::new(GpioContext {
                root: config.root.clone(),
                bound,
                backend,
                registry: LineRegistry::new(),
                events,
            }),
        })
    }

    pub fn with_defaults(backend: Arc<dyn SysfsBackend>) -> Result<Self, GpioError> {
        Self::new(backend, &GpioConfig::default())
    }

    pub fn bound(&self) -> Bound {
        self.ctx.bound
    }

    pub fn root(&self) -> &Path {
        &self.ctx.root
    }

    pub fn registry(&self) -> &LineRegistry {
        &self.ctx.registry
    }

    pub fn events(&self) -> &Arc<EventLoop> {
        &self.ctx.events
    }

    /// Validates `id` against the bound. No control file is touched.
    pub fn line<I: Into<i64>>(&self, id: I) -> Result<Line, GpioError> {
        let id = self.ctx.bound.validate(id.into())?;
        Ok(Line::new(id, self.ctx.clone()))
    }

    pub fn parse_line(&self, text: &str) -> Result<Line, GpioError> {
        let id = self.ctx.bound.parse(text)?;
        Ok(Line::new(id, self.ctx.clone()))
    }

    pub fn setup_line<I, D, E>(&self, id: I, direction: D, edge: E) -> Result<Line, GpioError>
    where
        I: Into<i64>,
        D: TryInto<Direction>,
        E: TryInto<Edge>,
        GpioError: From<D::Error> + From<E::Error>,
    {
        let line = self.line(id)?;
        line.setup(direction, edge)?;
        Ok(line)
    }

    /// Sets up every id in order. A failure is reported for its id and does
    /// not undo or stop the others.
    pub fn setup_lines(
        &self,
        ids: &[u32],
        direction: Direction,
        edge: Edge,
    ) -> Vec<(u32, Result<Line, GpioError>)> {
        ids.iter()
            .map(|&id| {
                let result = self.setup_line(id, direction, edge);
                if let Err(e) = &result {
                    warn!("setup of gpio{id} failed: {e}");
                }
                (id, result)
            })
            .collect()
    }

    /// Releases every line this process still has recorded as claimed.
    pub fn release_all(&self) -> Vec<(u32, Result<(), GpioError>)> {
        self.ctx
            .registry
            .ids()
            .into_iter()
            .map(|id| {
                let result = Line::new(id, self.ctx.clone()).release();
                (id, result)
            })
            .collect()
    }
}
