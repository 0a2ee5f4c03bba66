use std::sync::Arc;

use crate::config::GpioConfig;
use crate::gpio::SysfsBackend;

#[cfg(feature = "hardware-gpio")]
pub mod sysfs;
pub mod mock;

pub use mock::MockSysfs;
#[cfg(feature = "hardware-gpio")]
pub use sysfs::{EpollPoller, KernelSysfs};

/// Backend selected by the crate features: `mock-gpio`, or a build without
/// `hardware-gpio`, gets the in-memory tree rooted at `config.root`.
pub fn backend_for(config: &GpioConfig) -> Arc<dyn SysfsBackend> {
    #[cfg(any(feature = "mock-gpio", not(feature = "hardware-gpio")))]
    {
        Arc::new(MockSysfs::new(&config.root))
    }
    #[cfg(all(feature = "hardware-gpio", not(feature = "mock-gpio")))]
    {
        let _ = config;
        Arc::new(KernelSysfs::new())
    }
}
