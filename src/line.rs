use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;

use crate::codec::{Direction, Edge, Level};
use crate::error::GpioError;
use crate::gpio::GpioContext;
use crate::watcher::Watcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineState {
    Unclaimed,
    Claimed,
    Configured,
    Active,
}

/// Controller for one GPIO line.
///
/// Operations other than [`claim`](Line::claim), [`setup`](Line::setup),
/// [`up`](Line::up) and [`down`](Line::down) require the line to be claimed
/// and fail with [`GpioError::NotClaimed`] otherwise, without touching any
/// control file.
#[derive(Clone)]
pub struct Line {
    id: u32,
    ctx: Arc<GpioContext>,
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Line").field("id", &self.id).finish()
    }
}

impl Line {
    pub(crate) fn new(id: u32, ctx: Arc<GpioContext>) -> Self {
        Self { id, ctx }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    fn line_dir(&self) -> PathBuf {
        self.ctx.root.join(format!("gpio{}", self.id))
    }

    fn attr(&self, name: &str) -> PathBuf {
        self.line_dir().join(name)
    }

    fn ensure_claimed(&self) -> Result<(), GpioError> {
        if self.is_claimed() {
            Ok(())
        } else {
            Err(GpioError::NotClaimed(self.id))
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.ctx.backend.exists(&self.line_dir())
    }

    pub fn claim(&self) -> Result<(), GpioError> {
        debug!("export gpio{}", self.id);
        self.ctx
            .backend
            .write(&self.ctx.root.join("export"), &self.id.to_string())?;
        self.ctx.registry.record_claim(self.id);
        Ok(())
    }

    /// Unexports the line. Any watcher on it is detached first.
    pub fn release(&self) -> Result<(), GpioError> {
        self.ensure_claimed()?;
        self.ctx.events.detach_line(self.id)?;
        debug!("unexport gpio{}", self.id);
        self.ctx
            .backend
            .write(&self.ctx.root.join("unexport"), &self.id.to_string())?;
        self.ctx.registry.forget(self.id);
        Ok(())
    }

    /// Claims the line if needed, then writes direction and edge.
    ///
    /// Both arguments are validated before anything is written. When this
    /// process already configured the line identically, nothing is written.
    pub fn setup<D, E>(&self, direction: D, edge: E) -> Result<(), GpioError>
    where
        D: TryInto<Direction>,
        E: TryInto<Edge>,
        GpioError: From<D::Error> + From<E::Error>,
    {
        let direction = direction.try_into()?;
        let edge = edge.try_into()?;

        let claimed = self.is_claimed();
        if claimed {
            if let Some(known) = self.ctx.registry.get(self.id)
                && known.direction == Some(direction)
                && known.edge == Some(edge)
            {
                debug!("gpio{} already set up as {direction}/{edge}", self.id);
                return Ok(());
            }
        } else {
            self.claim()?;
        }

        // an armed edge blocks switching to `out`
        if direction == Direction::Out {
            self.write_edge(edge)?;
            self.write_direction(direction)
        } else {
            self.write_direction(direction)?;
            self.write_edge(edge)
        }
    }

    pub fn set_direction<D>(&self, direction: D) -> Result<(), GpioError>
    where
        D: TryInto<Direction>,
        GpioError: From<D::Error>,
    {
        let direction = direction.try_into()?;
        self.ensure_claimed()?;
        self.write_direction(direction)
    }

    pub fn set_edge<E>(&self, edge: E) -> Result<(), GpioError>
    where
        E: TryInto<Edge>,
        GpioError: From<E::Error>,
    {
        let edge = edge.try_into()?;
        self.ensure_claimed()?;
        self.write_edge(edge)
    }

    fn write_direction(&self, direction: Direction) -> Result<(), GpioError> {
        debug!("direction gpio{} {direction}", self.id);
        self.ctx
            .backend
            .write(&self.attr("direction"), direction.as_str())?;
        self.ctx.registry.record_direction(self.id, direction);
        Ok(())
    }

    fn write_edge(&self, edge: Edge) -> Result<(), GpioError> {
        debug!("edge gpio{} {edge}", self.id);
        if edge != Edge::None && self.direction() == Some(Direction::Out) {
            warn!("gpio{} is an output, edge {edge} has no effect", self.id);
        }
        self.ctx.backend.write(&self.attr("edge"), edge.as_str())?;
        self.ctx.registry.record_edge(self.id, edge);
        Ok(())
    }

    /// Drives the line. Anything that does not convert to [`Level::High`] is low.
    pub fn write<L: Into<Level>>(&self, level: L) -> Result<(), GpioError> {
        let level = level.into();
        self.ensure_claimed()?;
        if self.direction() == Some(Direction::In) {
            return Err(GpioError::NotOutput(self.id));
        }
        debug!("write gpio{} {level}", self.id);
        self.ctx.backend.write(&self.attr("value"), level.encode())
    }

    pub fn read(&self) -> Result<bool, GpioError> {
        self.ensure_claimed()?;
        let raw = self.ctx.backend.read(&self.attr("value"))?;
        let level = Level::decode(&raw);
        debug!("read gpio{} {level}", self.id);
        Ok(level.is_high())
    }

    pub fn up(&self) -> Result<(), GpioError> {
        self.drive(Level::High)
    }

    pub fn down(&self) -> Result<(), GpioError> {
        self.drive(Level::Low)
    }

    // Claims as output when needed, and turns a known input around. The
    // kernel refuses `out` while an edge interrupt is armed, so edge goes first.
    fn drive(&self, level: Level) -> Result<(), GpioError> {
        if !self.is_claimed() {
            self.setup(Direction::Out, Edge::None)?;
        } else if self.direction() == Some(Direction::In) {
            self.ctx.events.detach_line(self.id)?;
            self.set_edge(Edge::None)?;
            self.set_direction(Direction::Out)?;
        }
        self.write(level)
    }

    /// Direction last written by this process, if any.
    pub fn direction(&self) -> Option<Direction> {
        self.ctx.registry.get(self.id).and_then(|c| c.direction)
    }

    /// Edge last written by this process, if any.
    pub fn edge(&self) -> Option<Edge> {
        self.ctx.registry.get(self.id).and_then(|c| c.edge)
    }

    pub fn state(&self) -> LineState {
        if !self.is_claimed() {
            return LineState::Unclaimed;
        }
        if self.ctx.events.is_listening(self.id) {
            return LineState::Active;
        }
        match self.ctx.registry.get(self.id) {
            Some(c) if c.direction.is_some() || c.edge.is_some() => LineState::Configured,
            _ => LineState::Claimed,
        }
    }

    /// Watches the line for transitions on both edges.
    ///
    /// The line is reconfigured as an input with edge `both` regardless of its
    /// previous setup. A watcher already attached to this line is detached.
    /// The callback receives the value sampled after each event; events that
    /// arrive faster than dispatch are coalesced.
    pub fn listen<F>(&self, callback: F) -> Result<Watcher, GpioError>
    where
        F: FnMut(bool) + Send + 'static,
    {
        self.listen_with_edge(Edge::Both, callback)
    }

    pub fn listen_with_edge<F>(&self, edge: Edge, callback: F) -> Result<Watcher, GpioError>
    where
        F: FnMut(bool) + Send + 'static,
    {
        if edge == Edge::None {
            return Err(GpioError::InvalidEdge(edge.to_string()));
        }
        self.setup(Direction::In, edge)?;
        self.ctx
            .events
            .attach(self.id, self.attr("value"), Box::new(callback))
    }
}
