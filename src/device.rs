use crate::config::BootstrapConfig;
use crate::instance::portability_device_extension;
use crate::logger::Logger;
use crate::platform::{DeviceCreateDesc, Platform};
use crate::{DeviceError, PhysicalDeviceError, vk_error, vk_info};
use ash::vk;

#[repr(u8)]
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum DeviceCategory {
    #[default]
    Other = 0,
    Integrated = 1,
    Discrete = 2,
    VirtualGpu = 3,
    Cpu = 4,
}

impl From<vk::PhysicalDeviceType> for DeviceCategory {
    fn from(device_type: vk::PhysicalDeviceType) -> Self {
        match device_type {
            vk::PhysicalDeviceType::INTEGRATED_GPU => DeviceCategory::Integrated,
            vk::PhysicalDeviceType::DISCRETE_GPU => DeviceCategory::Discrete,
            vk::PhysicalDeviceType::VIRTUAL_GPU => DeviceCategory::VirtualGpu,
            vk::PhysicalDeviceType::CPU => DeviceCategory::Cpu,
            _ => DeviceCategory::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    Graphics,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some()
    }
}

/// Scans families in order and keeps the first graphics-capable one.
pub fn find_queue_families(
    families: &[vk::QueueFamilyProperties],
    log: Option<&Logger>,
) -> QueueFamilyIndices {
    let mut indices = QueueFamilyIndices::default();

    vk_info!(log, "{} queue families:", families.len());
    for (index, family) in (0u32..).zip(families) {
        if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            vk_info!(log, "\t{index} : {} queue(s) : graphics", family.queue_count);
            indices.graphics = Some(index);
            if indices.is_complete() {
                vk_info!(log, "all needed queue family indices found");
                break;
            }
        } else {
            vk_info!(log, "\t{index} : {} queue(s) : not graphics", family.queue_count);
        }
    }

    indices
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedDevice {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub category: DeviceCategory,
    pub queue_families: QueueFamilyIndices,
}

/// Picks the first enumerated device that has a graphics queue family and is an
/// integrated GPU.
///
/// This is a first-match policy. It does not rank devices, and it will pass over discrete
/// GPUs entirely until a device rating system replaces it.
pub struct PhysicalDeviceSelector<'a, P: Platform + ?Sized> {
    platform: &'a P,
    instance: vk::Instance,
    log: Option<&'a Logger>,
}

impl<'a, P: Platform + ?Sized> PhysicalDeviceSelector<'a, P> {
    pub fn new(platform: &'a P, instance: vk::Instance) -> Self {
        Self {
            platform,
            instance,
            log: None,
        }
    }

    pub fn logger(mut self, log: Option<&'a Logger>) -> Self {
        self.log = log;
        self
    }

    fn is_device_suitable(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> crate::Result<Option<SelectedDevice>> {
        let info = self
            .platform
            .physical_device_info(self.instance, physical_device)?;
        let families = self
            .platform
            .queue_family_properties(self.instance, physical_device)?;
        let queue_families = find_queue_families(&families, self.log);
        let category = DeviceCategory::from(info.device_type);

        if category == DeviceCategory::Integrated && queue_families.is_complete() {
            vk_info!(self.log, "device ({}) is suitable and will be used", info.name);
            Ok(Some(SelectedDevice {
                handle: physical_device,
                name: info.name,
                category,
                queue_families,
            }))
        } else {
            vk_info!(self.log, "device ({}) is not suitable: {category:?}", info.name);
            Ok(None)
        }
    }

    #[cfg_attr(feature = "enable_tracing", tracing::instrument(skip(self)))]
    pub fn select(self) -> crate::Result<SelectedDevice> {
        let physical_devices = self.platform.enumerate_physical_devices(self.instance)?;
        if physical_devices.is_empty() {
            vk_error!(self.log, "couldn't find any GPU");
            return Err(PhysicalDeviceError::NoDeviceFound.into());
        }

        for physical_device in physical_devices {
            if let Some(selected) = self.is_device_suitable(physical_device)? {
                #[cfg(feature = "enable_tracing")]
                tracing::info!(name = %selected.name, "Selected physical device");
                return Ok(selected);
            }
        }

        vk_error!(self.log, "couldn't find suitable GPU");
        Err(PhysicalDeviceError::NoSuitableDevice.into())
    }
}

pub(crate) fn device_create_desc(
    config: &BootstrapConfig,
    graphics_family: Option<u32>,
    layers: &[String],
) -> crate::Result<DeviceCreateDesc> {
    let queue_family_index = graphics_family.ok_or(DeviceError::UnassignedQueueFamily)?;

    let extensions = if config.is_portability() {
        vec![portability_device_extension()]
    } else {
        Vec::new()
    };
    let layers = if config.diagnostics {
        layers.to_vec()
    } else {
        Vec::new()
    };

    Ok(DeviceCreateDesc {
        queue_family_index,
        queue_priorities: vec![1.0],
        extensions,
        layers,
    })
}

/// Creates the logical device with a single graphics queue and fetches that queue.
#[cfg_attr(feature = "enable_tracing", tracing::instrument(skip_all))]
pub(crate) fn create_logical_device<P: Platform + ?Sized>(
    platform: &mut P,
    instance: vk::Instance,
    selected: &SelectedDevice,
    config: &BootstrapConfig,
    layers: &[String],
    log: Option<&Logger>,
) -> crate::Result<(vk::Device, vk::Queue)> {
    let desc = device_create_desc(config, selected.queue_families.graphics, layers)?;

    let device = match platform.create_device(instance, selected.handle, &desc) {
        Ok(device) => device,
        Err(err) => {
            vk_error!(log, "logical device couldn't get created: {err}");
            return Err(err);
        }
    };
    vk_info!(log, "logical device created");

    let queue = match platform.device_queue(device, desc.queue_family_index, 0) {
        Ok(queue) => queue,
        Err(err) => {
            vk_error!(log, "graphics queue couldn't get retrieved: {err}");
            platform.destroy_device(device);
            return Err(err);
        }
    };
    vk_info!(log, "logical device queue created");

    Ok((device, queue))
}
