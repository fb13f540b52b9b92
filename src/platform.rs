use crate::{InstanceError, Version};
use ash::vk;
use ash::vk::Handle;
use std::ffi::{CStr, CString};

/// Everything instance creation needs, as plain owned data.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceCreateDesc {
    pub app_name: String,
    pub app_version: Version,
    pub engine_name: String,
    pub engine_version: Version,
    pub api_version: Version,
    pub extensions: Vec<String>,
    pub layers: Vec<String>,
    pub flags: vk::InstanceCreateFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCreateDesc {
    pub queue_family_index: u32,
    pub queue_priorities: Vec<f32>,
    pub extensions: Vec<String>,
    pub layers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalDeviceInfo {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
}

/// The graphics-API calls the bootstrap depends on.
///
/// Implementations own whatever loader state the calls need; the bootstrap only ever
/// passes back handles it received from the same implementation.
pub trait Platform {
    fn instance_extensions(&self) -> crate::Result<Vec<String>>;

    fn instance_layers(&self) -> crate::Result<Vec<String>>;

    fn create_instance(&mut self, desc: &InstanceCreateDesc) -> crate::Result<vk::Instance>;

    fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
    ) -> crate::Result<Vec<vk::PhysicalDevice>>;

    fn physical_device_info(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> crate::Result<PhysicalDeviceInfo>;

    fn queue_family_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> crate::Result<Vec<vk::QueueFamilyProperties>>;

    fn create_device(
        &mut self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceCreateDesc,
    ) -> crate::Result<vk::Device>;

    fn device_queue(
        &self,
        device: vk::Device,
        queue_family_index: u32,
        queue_index: u32,
    ) -> crate::Result<vk::Queue>;

    fn destroy_device(&mut self, device: vk::Device);

    fn destroy_instance(&mut self, instance: vk::Instance);
}

fn to_c_strings(names: &[String]) -> crate::Result<Vec<CString>> {
    names
        .iter()
        .map(|name| {
            CString::new(name.as_str())
                .map_err(|_| crate::Error::from(InstanceError::InvalidName(name.clone())))
        })
        .collect()
}

fn lossy(name: &CStr) -> String {
    name.to_string_lossy().into_owned()
}

/// [`Platform`] over the system Vulkan loader.
pub struct AshPlatform {
    entry: ash::Entry,
    instance: Option<ash::Instance>,
    device: Option<ash::Device>,
}

impl AshPlatform {
    #[cfg_attr(feature = "enable_tracing", tracing::instrument)]
    pub fn load() -> crate::Result<Self> {
        #[cfg(feature = "enable_tracing")]
        tracing::trace!("Loading entry...");
        let entry = unsafe { ash::Entry::load() }?;
        #[cfg(feature = "enable_tracing")]
        tracing::trace!("Entry loaded.");

        Ok(Self {
            entry,
            instance: None,
            device: None,
        })
    }

    /// Highest instance-level API version the loader supports.
    pub fn instance_version(&self) -> crate::Result<Version> {
        let version = unsafe { self.entry.try_enumerate_instance_version() }?;
        Ok(version.map_or(Version::V1_0_0, Version::from_raw))
    }

    /// The loaded instance function table, for callers going on to build a renderer.
    pub fn ash_instance(&self) -> Option<&ash::Instance> {
        self.instance.as_ref()
    }

    pub fn ash_device(&self) -> Option<&ash::Device> {
        self.device.as_ref()
    }

    fn instance(&self, handle: vk::Instance) -> crate::Result<&ash::Instance> {
        self.instance
            .as_ref()
            .filter(|instance| instance.handle() == handle)
            .ok_or(crate::Error::UnknownHandle("VkInstance"))
    }

    fn device(&self, handle: vk::Device) -> crate::Result<&ash::Device> {
        self.device
            .as_ref()
            .filter(|device| device.handle() == handle)
            .ok_or(crate::Error::UnknownHandle("VkDevice"))
    }
}

impl Platform for AshPlatform {
    fn instance_extensions(&self) -> crate::Result<Vec<String>> {
        let properties = unsafe { self.entry.enumerate_instance_extension_properties(None) }?;
        Ok(properties
            .iter()
            .filter_map(|ext| ext.extension_name_as_c_str().ok().map(lossy))
            .collect())
    }

    fn instance_layers(&self) -> crate::Result<Vec<String>> {
        let properties = unsafe { self.entry.enumerate_instance_layer_properties() }?;
        Ok(properties
            .iter()
            .filter_map(|layer| layer.layer_name_as_c_str().ok().map(lossy))
            .collect())
    }

    fn create_instance(&mut self, desc: &InstanceCreateDesc) -> crate::Result<vk::Instance> {
        if self.instance.is_some() {
            return Err(crate::Error::Vulkan(vk::Result::ERROR_INITIALIZATION_FAILED));
        }

        let app_name = CString::new(desc.app_name.as_str())
            .map_err(|_| InstanceError::InvalidName(desc.app_name.clone()))?;
        let engine_name = CString::new(desc.engine_name.as_str())
            .map_err(|_| InstanceError::InvalidName(desc.engine_name.clone()))?;
        let extensions = to_c_strings(&desc.extensions)?;
        let layers = to_c_strings(&desc.layers)?;
        let extension_ptrs = extensions.iter().map(|e| e.as_ptr()).collect::<Vec<_>>();
        let layer_ptrs = layers.iter().map(|l| l.as_ptr()).collect::<Vec<_>>();

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(desc.app_version.into())
            .engine_name(&engine_name)
            .engine_version(desc.engine_version.into())
            .api_version(desc.api_version.into());

        let create_info = vk::InstanceCreateInfo::default()
            .flags(desc.flags)
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe { self.entry.create_instance(&create_info, None) }
            .map_err(InstanceError::FailedCreateInstance)?;
        let handle = instance.handle();
        self.instance = Some(instance);
        Ok(handle)
    }

    fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
    ) -> crate::Result<Vec<vk::PhysicalDevice>> {
        let instance = self.instance(instance)?;
        unsafe { instance.enumerate_physical_devices() }
            .map_err(|_| crate::PhysicalDeviceError::FailedToEnumeratePhysicalDevices.into())
    }

    fn physical_device_info(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> crate::Result<PhysicalDeviceInfo> {
        let instance = self.instance(instance)?;
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let name = properties
            .device_name_as_c_str()
            .map(lossy)
            .unwrap_or_else(|_| format!("{:#x}", physical_device.as_raw()));

        Ok(PhysicalDeviceInfo {
            name,
            device_type: properties.device_type,
        })
    }

    fn queue_family_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> crate::Result<Vec<vk::QueueFamilyProperties>> {
        let instance = self.instance(instance)?;
        Ok(unsafe { instance.get_physical_device_queue_family_properties(physical_device) })
    }

    fn create_device(
        &mut self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceCreateDesc,
    ) -> crate::Result<vk::Device> {
        if self.device.is_some() {
            return Err(crate::Error::Vulkan(vk::Result::ERROR_INITIALIZATION_FAILED));
        }
        let instance = self.instance(instance)?;

        let extensions = to_c_strings(&desc.extensions)?;
        let layers = to_c_strings(&desc.layers)?;
        let extension_ptrs = extensions.iter().map(|e| e.as_ptr()).collect::<Vec<_>>();
        let layer_ptrs = layers.iter().map(|l| l.as_ptr()).collect::<Vec<_>>();

        let queue_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(desc.queue_family_index)
            .queue_priorities(&desc.queue_priorities)];
        let features = vk::PhysicalDeviceFeatures::default();

        // Device layers are deprecated but older loaders still honour them.
        #[allow(deprecated)]
        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_features(&features)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let device = unsafe { instance.create_device(physical_device, &create_info, None) }
            .map_err(crate::DeviceError::FailedCreateDevice)?;
        let handle = device.handle();
        self.device = Some(device);
        Ok(handle)
    }

    fn device_queue(
        &self,
        device: vk::Device,
        queue_family_index: u32,
        queue_index: u32,
    ) -> crate::Result<vk::Queue> {
        let device = self.device(device)?;
        Ok(unsafe { device.get_device_queue(queue_family_index, queue_index) })
    }

    fn destroy_device(&mut self, device: vk::Device) {
        if self.device(device).is_ok() {
            if let Some(device) = self.device.take() {
                unsafe { device.destroy_device(None) };
            }
        }
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        if self.instance(instance).is_ok() {
            if let Some(instance) = self.instance.take() {
                unsafe { instance.destroy_instance(None) };
            }
        }
    }
}
