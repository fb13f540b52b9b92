//! In-memory [`Platform`] for exercising the bootstrap without a GPU.

use crate::platform::{DeviceCreateDesc, InstanceCreateDesc, PhysicalDeviceInfo, Platform};
use ash::vk;
use ash::vk::Handle;
use std::cell::Cell;

const PHYSICAL_DEVICE_BASE: u64 = 0x1000;

#[derive(Debug, Clone)]
pub(crate) struct FakeDevice {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub queue_families: Vec<vk::QueueFlags>,
}

impl FakeDevice {
    pub fn integrated(name: &str, queue_families: &[vk::QueueFlags]) -> Self {
        Self {
            name: name.to_string(),
            device_type: vk::PhysicalDeviceType::INTEGRATED_GPU,
            queue_families: queue_families.to_vec(),
        }
    }

    pub fn discrete(name: &str, queue_families: &[vk::QueueFlags]) -> Self {
        Self {
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            ..Self::integrated(name, queue_families)
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakePlatform {
    pub extensions: Vec<String>,
    pub layers: Vec<String>,
    pub devices: Vec<FakeDevice>,
    pub instance_failure: Option<vk::Result>,
    pub device_failure: Option<vk::Result>,

    pub live_instance: Option<vk::Instance>,
    pub live_device: Option<vk::Device>,
    pub instances_created: usize,
    pub devices_created: usize,
    pub last_instance_desc: Option<InstanceCreateDesc>,
    pub last_device_desc: Option<DeviceCreateDesc>,
    pub device_queries: Cell<usize>,
    next_handle: u64,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            ..Default::default()
        }
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_layers(mut self, layers: &[&str]) -> Self {
        self.layers = layers.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_devices(mut self, devices: Vec<FakeDevice>) -> Self {
        self.devices = devices;
        self
    }

    pub fn physical_device_handle(index: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(PHYSICAL_DEVICE_BASE + index as u64)
    }

    fn device_at(&self, physical_device: vk::PhysicalDevice) -> &FakeDevice {
        self.device_queries.set(self.device_queries.get() + 1);
        let index = physical_device
            .as_raw()
            .checked_sub(PHYSICAL_DEVICE_BASE)
            .expect("physical device handle not issued by this platform");
        &self.devices[index as usize]
    }

    fn assert_live_instance(&self, instance: vk::Instance) {
        assert_eq!(self.live_instance, Some(instance), "instance is not alive");
    }

    fn issue(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl Platform for FakePlatform {
    fn instance_extensions(&self) -> crate::Result<Vec<String>> {
        Ok(self.extensions.clone())
    }

    fn instance_layers(&self) -> crate::Result<Vec<String>> {
        Ok(self.layers.clone())
    }

    fn create_instance(&mut self, desc: &InstanceCreateDesc) -> crate::Result<vk::Instance> {
        assert!(self.live_instance.is_none(), "instance leaked");
        self.last_instance_desc = Some(desc.clone());
        if let Some(result) = self.instance_failure {
            return Err(crate::InstanceError::FailedCreateInstance(result).into());
        }
        let instance = vk::Instance::from_raw(self.issue());
        self.live_instance = Some(instance);
        self.instances_created += 1;
        Ok(instance)
    }

    fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
    ) -> crate::Result<Vec<vk::PhysicalDevice>> {
        self.assert_live_instance(instance);
        Ok((0..self.devices.len())
            .map(Self::physical_device_handle)
            .collect())
    }

    fn physical_device_info(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> crate::Result<PhysicalDeviceInfo> {
        self.assert_live_instance(instance);
        let device = self.device_at(physical_device);
        Ok(PhysicalDeviceInfo {
            name: device.name.clone(),
            device_type: device.device_type,
        })
    }

    fn queue_family_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> crate::Result<Vec<vk::QueueFamilyProperties>> {
        self.assert_live_instance(instance);
        Ok(self
            .device_at(physical_device)
            .queue_families
            .iter()
            .map(|&queue_flags| vk::QueueFamilyProperties {
                queue_flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect())
    }

    fn create_device(
        &mut self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceCreateDesc,
    ) -> crate::Result<vk::Device> {
        self.assert_live_instance(instance);
        assert!(self.live_device.is_none(), "device leaked");
        let families = self.device_at(physical_device).queue_families.len();
        assert!(
            (desc.queue_family_index as usize) < families,
            "queue family index out of bounds"
        );
        self.last_device_desc = Some(desc.clone());
        if let Some(result) = self.device_failure {
            return Err(crate::DeviceError::FailedCreateDevice(result).into());
        }
        let device = vk::Device::from_raw(self.issue());
        self.live_device = Some(device);
        self.devices_created += 1;
        Ok(device)
    }

    fn device_queue(
        &self,
        device: vk::Device,
        queue_family_index: u32,
        queue_index: u32,
    ) -> crate::Result<vk::Queue> {
        assert_eq!(self.live_device, Some(device), "device is not alive");
        Ok(vk::Queue::from_raw(
            0x10_0000 + u64::from(queue_family_index) * 16 + u64::from(queue_index),
        ))
    }

    fn destroy_device(&mut self, device: vk::Device) {
        assert_eq!(self.live_device, Some(device), "device destroyed twice");
        self.live_device = None;
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        assert!(self.live_device.is_none(), "instance destroyed before device");
        assert_eq!(self.live_instance, Some(instance), "instance destroyed twice");
        self.live_instance = None;
    }
}
