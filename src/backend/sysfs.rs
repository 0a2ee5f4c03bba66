use log::debug;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags};
use rustc_hash::FxHashMap;

use crate::error::GpioError;
use crate::gpio::{EdgePoller, SysfsBackend};

const EPOLL_EVENT_BUFFER_CAPACITY: usize = 32;

/// Kernel sysfs GPIO interface, accessed with plain blocking file I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct KernelSysfs;

impl KernelSysfs {
    pub fn new() -> Self {
        Self
    }
}

impl SysfsBackend for KernelSysfs {
    fn write(&self, path: &Path, contents: &str) -> Result<(), GpioError> {
        fs::write(path, contents).map_err(|e| GpioError::io(path, e))
    }

    fn read(&self, path: &Path) -> Result<String, GpioError> {
        fs::read_to_string(path).map_err(|e| GpioError::io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        match fs::metadata(path) {
            Ok(_) => true,
            Err(e) => {
                debug!("stat {}: {e}", path.display());
                false
            }
        }
    }

    fn poller(&self) -> Result<Box<dyn EdgePoller>, GpioError> {
        Ok(Box::new(EpollPoller::new()?))
    }
}

struct Registration {
    path: PathBuf,
    file: File,
}

/// epoll instance watching `value` files for `EPOLLPRI`, which the kernel
/// raises on a configured edge and keeps raised until the file is read again.
pub struct EpollPoller {
    epoll: Epoll,
    registrations: FxHashMap<u64, Registration>,
}

impl EpollPoller {
    pub fn new() -> Result<Self, GpioError> {
        let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC)
            .map_err(|e| GpioError::io("epoll", io::Error::from(e)))?;
        Ok(Self {
            epoll,
            registrations: FxHashMap::default(),
        })
    }
}

fn drain_file(path: &Path, file: &mut File) -> Result<(), GpioError> {
    let mut buf = [0u8; 8];
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read(&mut buf))
        .map(|_| ())
        .map_err(|e| GpioError::io(path, e))
}

impl EdgePoller for EpollPoller {
    fn register(&mut self, token: u64, value_path: &Path) -> Result<(), GpioError> {
        let mut file = File::open(value_path).map_err(|e| GpioError::io(value_path, e))?;
        drain_file(value_path, &mut file)?;
        self.epoll
            .add(&file, EpollEvent::new(EpollFlags::EPOLLPRI, token))
            .map_err(|e| GpioError::io(value_path, io::Error::from(e)))?;
        self.registrations.insert(
            token,
            Registration {
                path: value_path.to_path_buf(),
                file,
            },
        );
        Ok(())
    }

    fn deregister(&mut self, token: u64) -> Result<(), GpioError> {
        // the descriptor closes when the registration drops, even on error
        if let Some(reg) = self.registrations.remove(&token) {
            self.epoll
                .delete(&reg.file)
                .map_err(|e| GpioError::io(&reg.path, io::Error::from(e)))?;
        }
        Ok(())
    }

    fn drain(&mut self, token: u64) -> Result<(), GpioError> {
        match self.registrations.get_mut(&token) {
            Some(reg) => drain_file(&reg.path, &mut reg.file),
            None => Ok(()),
        }
    }

    fn wait(&mut self, timeout: Duration, ready: &mut Vec<u64>) -> Result<(), GpioError> {
        let mut events = [EpollEvent::empty(); EPOLL_EVENT_BUFFER_CAPACITY];
        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);

        let count = match self.epoll.wait(&mut events, millis) {
            Ok(n) => n,
            Err(Errno::EINTR) => 0,
            Err(e) => return Err(GpioError::io("epoll", io::Error::from(e))),
        };
        ready.extend(events[..count].iter().map(|event| event.data()));
        Ok(())
    }
}
