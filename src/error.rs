use crate::context::BootstrapState;
use ash::vk;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Instance error: {0}")]
    Instance(#[from] InstanceError),
    #[error("Physical device error: {0}")]
    PhysicalDevice(#[from] PhysicalDeviceError),
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("Cannot initialize from state {0:?}")]
    InvalidState(BootstrapState),
    #[error("Handle {0} was not created by this platform")]
    UnknownHandle(&'static str),
    #[error("Ash loading error: {0}")]
    AshLoading(#[from] ash::LoadingError),
    #[error("Window handle error: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialOrd, PartialEq, Eq, Ord, Hash)]
pub enum CapabilityKind {
    Extension,
    Layer,
}

impl Display for CapabilityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityKind::Extension => f.write_str("extension"),
            CapabilityKind::Layer => f.write_str("layer"),
        }
    }
}

#[derive(Debug, PartialOrd, PartialEq, Eq, Ord, Error)]
pub enum InstanceError {
    #[error("Requested {kind} not present: {name}")]
    MissingCapability { kind: CapabilityKind, name: String },
    #[error("Invalid name {0:?}: names must not contain NUL bytes")]
    InvalidName(String),
    #[error("Failed to create instance: {0}")]
    FailedCreateInstance(vk::Result),
}

#[derive(Debug, PartialOrd, PartialEq, Eq, Ord, Error)]
pub enum PhysicalDeviceError {
    #[error("Failed to enumerate physical devices")]
    FailedToEnumeratePhysicalDevices,
    #[error("No physical devices found")]
    NoDeviceFound,
    #[error("No suitable device")]
    NoSuitableDevice,
}

#[derive(Debug, PartialOrd, PartialEq, Eq, Ord, Error)]
pub enum DeviceError {
    #[error("No graphics queue family assigned")]
    UnassignedQueueFamily,
    #[error("Failed to create logical device: {0}")]
    FailedCreateDevice(vk::Result),
}

#[derive(Debug, PartialOrd, PartialEq, Eq, Ord, Error)]
pub enum QueueError {
    #[error("Graphics unavailable")]
    GraphicsUnavailable,
}

pub type Result<T> = std::result::Result<T, Error>;
