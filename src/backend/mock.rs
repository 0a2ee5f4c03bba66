use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::codec::{Direction, Edge, Level};
use crate::config::DEFAULT_GPIO_ROOT;
use crate::error::GpioError;
use crate::gpio::{EdgePoller, SysfsBackend};

/// In-memory stand-in for the sysfs GPIO tree.
///
/// Export creates `gpio<id>/{direction,edge,value}` with kernel defaults,
/// unexport removes them, and re-exporting or unexporting twice fails the way
/// the kernel does. External voltage changes are simulated with
/// [`MockSysfs::set_input`].
pub struct MockSysfs {
    root: PathBuf,
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<MockState>,
    changed: Condvar,
}

#[derive(Default)]
struct MockState {
    dirs: FxHashSet<PathBuf>,
    files: FxHashMap<PathBuf, String>,
    // bumped on every edge that the line's edge setting lets through
    edge_counts: FxHashMap<PathBuf, u64>,
    writes: Vec<(PathBuf, String)>,
    open_descriptors: usize,
}

impl Default for MockSysfs {
    fn default() -> Self {
        Self::new(DEFAULT_GPIO_ROOT)
    }
}

impl MockSysfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut state = MockState::default();
        state.dirs.insert(root.clone());
        state.files.insert(root.join("export"), String::new());
        state.files.insert(root.join("unexport"), String::new());

        Self {
            root,
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                changed: Condvar::new(),
            }),
        }
    }

    fn line_dir(&self, id: u32) -> PathBuf {
        self.root.join(format!("gpio{id}"))
    }

    /// Current contents of `gpio<id>/<attr>`, if the line is exported.
    pub fn attr(&self, id: u32, attr: &str) -> Option<String> {
        let path = self.line_dir(id).join(attr);
        self.shared.state.lock().files.get(&path).cloned()
    }

    /// Every successful control file write, in order.
    pub fn writes(&self) -> Vec<(PathBuf, String)> {
        self.shared.state.lock().writes.clone()
    }

    pub fn open_descriptors(&self) -> usize {
        self.shared.state.lock().open_descriptors
    }

    /// Simulates an external signal on an exported line. Raises an event when
    /// the transition matches the line's edge setting.
    pub fn set_input(&self, id: u32, level: Level) -> Result<(), GpioError> {
        let value_path = self.line_dir(id).join("value");
        let edge_path = self.line_dir(id).join("edge");
        let mut state = self.shared.state.lock();

        let previous = match state.files.get(&value_path) {
            Some(raw) => Level::decode(raw),
            None => return Err(not_found(&value_path)),
        };
        let edge: Edge = state
            .files
            .get(&edge_path)
            .map(|raw| raw.parse::<Edge>())
            .transpose()?
            .unwrap_or_default();

        state
            .files
            .insert(value_path.clone(), level.encode().to_string());
        if edge.triggers(previous, level) {
            *state.edge_counts.entry(value_path).or_default() += 1;
            self.shared.changed.notify_all();
        }
        Ok(())
    }

    fn export(&self, state: &mut MockState, path: &Path, contents: &str) -> Result<(), GpioError> {
        let id = parse_id(path, contents)?;
        let dir = self.line_dir(id);
        if state.dirs.contains(&dir) {
            return Err(GpioError::io(path, io::ErrorKind::ResourceBusy.into()));
        }
        state.files.insert(dir.join("direction"), "in".to_string());
        state.files.insert(dir.join("edge"), "none".to_string());
        state.files.insert(dir.join("value"), "0".to_string());
        state.dirs.insert(dir);
        Ok(())
    }

    fn unexport(&self, state: &mut MockState, path: &Path, contents: &str) -> Result<(), GpioError> {
        let id = parse_id(path, contents)?;
        let dir = self.line_dir(id);
        if !state.dirs.remove(&dir) {
            return Err(GpioError::io(path, io::ErrorKind::InvalidInput.into()));
        }
        state.files.retain(|file, _| !file.starts_with(&dir));
        state.edge_counts.retain(|file, _| !file.starts_with(&dir));
        Ok(())
    }
}

fn parse_id(path: &Path, contents: &str) -> Result<u32, GpioError> {
    contents
        .trim()
        .parse()
        .map_err(|_| GpioError::io(path, io::ErrorKind::InvalidInput.into()))
}

fn not_found(path: &Path) -> GpioError {
    GpioError::io(path, io::ErrorKind::NotFound.into())
}

impl SysfsBackend for MockSysfs {
    fn write(&self, path: &Path, contents: &str) -> Result<(), GpioError> {
        let mut state = self.shared.state.lock();

        if path == self.root.join("export") {
            self.export(&mut state, path, contents)?;
        } else if path == self.root.join("unexport") {
            self.unexport(&mut state, path, contents)?;
        } else {
            if !state.files.contains_key(path) {
                return Err(not_found(path));
            }
            let accepted = match path.file_name().and_then(|n| n.to_str()) {
                Some("direction") => {
                    let edge = path.with_file_name("edge");
                    if contents == "out"
                        && state.files.get(&edge).is_some_and(|e| e.as_str() != "none")
                    {
                        // EIO, as gpiolib answers while an edge irq is requested
                        return Err(GpioError::io(path, io::Error::from_raw_os_error(5)));
                    }
                    contents.parse::<Direction>().is_ok()
                }
                Some("edge") => contents.parse::<Edge>().is_ok(),
                Some("value") => {
                    let direction = path.with_file_name("direction");
                    if state.files.get(&direction).map(String::as_str) != Some("out") {
                        return Err(GpioError::io(path, io::ErrorKind::PermissionDenied.into()));
                    }
                    true
                }
                _ => true,
            };
            if !accepted {
                return Err(GpioError::io(path, io::ErrorKind::InvalidInput.into()));
            }
            state.files.insert(path.to_path_buf(), contents.to_string());
        }

        state.writes.push((path.to_path_buf(), contents.to_string()));
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<String, GpioError> {
        let state = self.shared.state.lock();
        state
            .files
            .get(path)
            .map(|contents| format!("{contents}\n"))
            .ok_or_else(|| not_found(path))
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.shared.state.lock();
        state.dirs.contains(path) || state.files.contains_key(path)
    }

    fn poller(&self) -> Result<Box<dyn EdgePoller>, GpioError> {
        Ok(Box::new(MockPoller {
            shared: self.shared.clone(),
            registrations: FxHashMap::default(),
        }))
    }
}

struct MockRegistration {
    value_path: PathBuf,
    seen: u64,
}

/// Readiness facility over [`MockSysfs`]: a registration is ready while the
/// edge count of its value file is ahead of what it last drained, or once the
/// file is gone.
pub struct MockPoller {
    shared: Arc<Shared>,
    registrations: FxHashMap<u64, MockRegistration>,
}

impl MockPoller {
    fn collect_ready(&self, state: &MockState, ready: &mut Vec<u64>) {
        for (token, reg) in &self.registrations {
            // a descriptor whose file was removed stays readable, as in sysfs
            let removed = !state.files.contains_key(&reg.value_path);
            let count = state.edge_counts.get(&reg.value_path).copied().unwrap_or(0);
            if removed || count > reg.seen {
                ready.push(*token);
            }
        }
        ready.sort_unstable();
    }
}

impl EdgePoller for MockPoller {
    fn register(&mut self, token: u64, value_path: &Path) -> Result<(), GpioError> {
        let mut state = self.shared.state.lock();
        if !state.files.contains_key(value_path) {
            return Err(not_found(value_path));
        }
        let seen = state.edge_counts.get(value_path).copied().unwrap_or(0);
        state.open_descriptors += 1;
        self.registrations.insert(
            token,
            MockRegistration {
                value_path: value_path.to_path_buf(),
                seen,
            },
        );
        Ok(())
    }

    fn deregister(&mut self, token: u64) -> Result<(), GpioError> {
        if self.registrations.remove(&token).is_some() {
            self.shared.state.lock().open_descriptors -= 1;
        }
        Ok(())
    }

    fn drain(&mut self, token: u64) -> Result<(), GpioError> {
        let state = self.shared.state.lock();
        if let Some(reg) = self.registrations.get_mut(&token) {
            reg.seen = state.edge_counts.get(&reg.value_path).copied().unwrap_or(0);
        }
        Ok(())
    }

    fn wait(&mut self, timeout: Duration, ready: &mut Vec<u64>) -> Result<(), GpioError> {
        let mut state = self.shared.state.lock();
        self.collect_ready(&state, ready);
        if ready.is_empty() && !timeout.is_zero() {
            let _ = self.shared.changed.wait_for(&mut state, timeout);
            self.collect_ready(&state, ready);
        }
        Ok(())
    }
}
