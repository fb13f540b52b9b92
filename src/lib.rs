mod config;
mod context;
mod device;
mod error;
#[cfg(test)]
mod fake;
mod instance;
mod logger;
mod platform;
mod system_info;
#[cfg(feature = "enable_tracing")]
mod tracing;
mod version;

pub use config::{AppInfo, BootstrapConfig, PlatformKind};
pub use context::{BootstrapState, Context, QueueHandle, QueueTable};
pub use device::{
    DeviceCategory, PhysicalDeviceSelector, QueueFamilyIndices, QueueType, SelectedDevice,
    find_queue_families,
};
pub use error::*;
pub use instance::{
    portability_device_extension, portability_instance_extensions, required_window_extensions,
    resolve_extensions, resolve_layers,
};
pub use logger::{Logger, MAX_LINE_LEN, Severity};
pub use platform::{AshPlatform, DeviceCreateDesc, InstanceCreateDesc, PhysicalDeviceInfo, Platform};
pub use system_info::{SystemInfo, VALIDATION_LAYER_NAME, check_capabilities};
pub use version::Version;
