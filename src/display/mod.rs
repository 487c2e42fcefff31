// src/display/mod.rs
//! Native displays and the message-based driver layer behind them.
//!
//! - PlatformDriver: platform-specific primitives (one implementation per backend)
//! - Display: owned native window plus its backing surface
//! - Messages: request/response protocol between `System` and the driver

pub mod driver;
pub mod drivers;
pub mod messages;
mod window;

pub use driver::PlatformDriver;
pub use messages::{
    DriverError, DriverEvent, DriverRequest, DriverResponse, MonitorId, MonitorInfo, WindowId,
    WindowSpec,
};
pub use window::Display;
