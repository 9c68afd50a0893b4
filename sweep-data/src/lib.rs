pub mod device_info;
pub mod device_state;
pub mod sample;
pub mod scan;
pub mod telemetry;

pub use device_info::DeviceInfo;
pub use device_state::DeviceState;
pub use sample::Sample;
pub use scan::Scan;
pub use telemetry::Telemetry;
