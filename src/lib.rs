pub mod backend;
mod chase;
mod codec;
mod config;
mod error;
mod events;
mod gpio;
mod line;
mod registry;
mod validate;
mod watcher;

pub use chase::Chase;
pub use codec::{DOWN, Direction, Edge, Level, UP};
pub use config::{AppConfig, ChaseConfig, DEFAULT_GPIO_ROOT, GpioConfig};
pub use error::{GpioError, InvalidId};
pub use events::{EventBroadcaster, LineEvent};
pub use gpio::{EdgePoller, Gpio, SysfsBackend};
pub use line::{Line, LineState};
pub use registry::{LineConfig, LineRegistry};
pub use validate::{BOUND_HIGH, BOUND_LOW, Bound, validate_direction, validate_edge};
pub use watcher::{Callback, EventLoop, EventLoopRunner, Watcher};

#[cfg(feature = "hardware-gpio")]
pub use backend::KernelSysfs;
pub use backend::MockSysfs;
