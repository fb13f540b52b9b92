use crate::config::BootstrapConfig;
use crate::device::{PhysicalDeviceSelector, QueueType, create_logical_device};
use crate::instance::{create_instance, resolve_extensions, resolve_layers};
use crate::logger::{Logger, Severity};
use crate::platform::Platform;
use crate::system_info::SystemInfo;
use crate::{QueueError, vk_error, vk_info, vk_warn};
use ash::vk;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapState {
    Uninitialized,
    ExtensionsResolved,
    InstanceCreated,
    DeviceSelected,
    LogicalDeviceCreated,
    Ready,
    Failed,
    TornDown,
}

impl BootstrapState {
    fn can_initialize(self) -> bool {
        matches!(
            self,
            BootstrapState::Uninitialized | BootstrapState::Failed | BootstrapState::TornDown
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueHandle {
    pub queue: vk::Queue,
    pub family_index: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueueTable {
    graphics: Option<QueueHandle>,
}

impl QueueTable {
    pub fn get(&self, queue_type: QueueType) -> Option<QueueHandle> {
        match queue_type {
            QueueType::Graphics => self.graphics,
        }
    }

    fn insert(&mut self, queue_type: QueueType, handle: QueueHandle) {
        match queue_type {
            QueueType::Graphics => self.graphics = Some(handle),
        }
    }
}

fn diagnostics<'a>(config: &BootstrapConfig, logger: &'a Logger) -> Option<&'a Logger> {
    config.diagnostics.then_some(logger)
}

/// Owns the instance and logical device created over a [`Platform`].
///
/// Fields fill in the order instance, extension and layer names, physical device, queue
/// family, logical device, queue. [`Context::teardown`] releases them in reverse, and
/// dropping the context tears it down as well.
pub struct Context<P: Platform> {
    platform: P,
    config: BootstrapConfig,
    logger: Logger,
    state: BootstrapState,

    instance: Option<vk::Instance>,
    physical_device: Option<vk::PhysicalDevice>,
    device: Option<vk::Device>,
    extensions: Vec<String>,
    layers: Vec<String>,
    queues: QueueTable,
}

impl<P: Platform> Context<P> {
    /// Uses a logger at [`Severity::Info`] writing to the terminal only.
    pub fn new(platform: P, config: BootstrapConfig) -> Self {
        let mut logger = Logger::new();
        logger.init(Severity::Info, None::<PathBuf>);
        Self::with_logger(platform, config, logger)
    }

    /// The logger must already be initialised when diagnostics are on.
    pub fn with_logger(platform: P, config: BootstrapConfig, logger: Logger) -> Self {
        Self {
            platform,
            config,
            logger,
            state: BootstrapState::Uninitialized,
            instance: None,
            physical_device: None,
            device: None,
            extensions: Vec::new(),
            layers: Vec::new(),
            queues: QueueTable::default(),
        }
    }

    /// Runs the whole bootstrap. On failure everything created so far is destroyed
    /// before the error is returned and the context is left in [`BootstrapState::Failed`].
    #[cfg_attr(feature = "enable_tracing", tracing::instrument(skip(self)))]
    pub fn initialize(&mut self, platform_extensions: &[String]) -> crate::Result<()> {
        if !self.state.can_initialize() {
            return Err(crate::Error::InvalidState(self.state));
        }
        self.state = BootstrapState::Uninitialized;

        match self.run_stages(platform_extensions) {
            Ok(()) => {
                self.state = BootstrapState::Ready;
                vk_info!(diagnostics(&self.config, &self.logger), "vulkan initialized");
                Ok(())
            }
            Err(err) => {
                vk_error!(
                    diagnostics(&self.config, &self.logger),
                    "bootstrap failed in state {:?}: {err}",
                    self.state
                );
                self.release();
                self.state = BootstrapState::Failed;
                Err(err)
            }
        }
    }

    fn run_stages(&mut self, platform_extensions: &[String]) -> crate::Result<()> {
        let log = diagnostics(&self.config, &self.logger);

        let system_info = SystemInfo::query(&self.platform)?;
        let extensions = resolve_extensions(platform_extensions, &self.config, &system_info, log)?;
        if !self.config.is_portability() {
            system_info.check_extensions(&extensions, log)?;
        }
        let layers = resolve_layers(&self.config, &system_info, log)?;
        self.extensions = extensions;
        self.layers = layers;
        self.state = BootstrapState::ExtensionsResolved;

        let instance = create_instance(
            &mut self.platform,
            &self.config,
            &self.extensions,
            &self.layers,
            log,
        )?;
        self.instance = Some(instance);
        self.state = BootstrapState::InstanceCreated;

        let selected = PhysicalDeviceSelector::new(&self.platform, instance)
            .logger(log)
            .select()?;
        self.physical_device = Some(selected.handle);
        self.state = BootstrapState::DeviceSelected;

        let (device, queue) = create_logical_device(
            &mut self.platform,
            instance,
            &selected,
            &self.config,
            &self.layers,
            log,
        )?;
        self.device = Some(device);
        self.state = BootstrapState::LogicalDeviceCreated;

        if let Some(family_index) = selected.queue_families.graphics {
            self.queues.insert(
                QueueType::Graphics,
                QueueHandle {
                    queue,
                    family_index,
                },
            );
        }
        Ok(())
    }

    fn release(&mut self) {
        let log = diagnostics(&self.config, &self.logger);

        if let Some(device) = self.device.take() {
            self.platform.destroy_device(device);
            vk_info!(log, "logical device destroyed");
        }
        if let Some(instance) = self.instance.take() {
            self.platform.destroy_instance(instance);
            vk_info!(log, "instance destroyed");
        }
        self.physical_device = None;
        self.queues = QueueTable::default();
        self.extensions.clear();
        self.layers.clear();
    }

    /// Destroys the logical device, then the instance. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        match self.state {
            BootstrapState::Ready | BootstrapState::Failed => {
                self.release();
                self.state = BootstrapState::TornDown;
            }
            BootstrapState::Uninitialized | BootstrapState::TornDown => {}
            state => {
                // Only reachable if a stage panicked part way through.
                vk_warn!(
                    diagnostics(&self.config, &self.logger),
                    "tearing down from intermediate state {state:?}"
                );
                self.release();
                self.state = BootstrapState::TornDown;
            }
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub fn instance(&self) -> Option<vk::Instance> {
        self.instance
    }

    pub fn physical_device(&self) -> Option<vk::PhysicalDevice> {
        self.physical_device
    }

    pub fn device(&self) -> Option<vk::Device> {
        self.device
    }

    pub fn get_queue(&self, queue_type: QueueType) -> crate::Result<(u32, vk::Queue)> {
        self.queues
            .get(queue_type)
            .map(|handle| (handle.family_index, handle.queue))
            .ok_or_else(|| QueueError::GraphicsUnavailable.into())
    }

    pub fn graphics_queue(&self) -> Option<vk::Queue> {
        self.queues.get(QueueType::Graphics).map(|handle| handle.queue)
    }

    pub fn graphics_family(&self) -> Option<u32> {
        self.queues
            .get(QueueType::Graphics)
            .map(|handle| handle.family_index)
    }

    pub fn enabled_extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn enabled_layers(&self) -> &[String] {
        &self.layers
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

impl<P: Platform> Drop for Context<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlatformKind;
    use crate::error::{CapabilityKind, InstanceError};
    use crate::fake::{FakeDevice, FakePlatform};
    use crate::system_info::VALIDATION_LAYER_NAME;
    use crate::{DeviceError, PhysicalDeviceError};

    const SURFACE: &str = "VK_KHR_surface";
    const PORTABILITY_ENUMERATION: &str = "VK_KHR_portability_enumeration";
    const PROPERTIES2: &str = "VK_KHR_get_physical_device_properties2";

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn healthy_platform() -> FakePlatform {
        FakePlatform::new()
            .with_extensions(&[SURFACE, PORTABILITY_ENUMERATION, PROPERTIES2])
            .with_layers(&[VALIDATION_LAYER_NAME])
            .with_devices(vec![
                FakeDevice::discrete("discrete", &[vk::QueueFlags::GRAPHICS]),
                FakeDevice::integrated(
                    "integrated",
                    &[vk::QueueFlags::COMPUTE, vk::QueueFlags::GRAPHICS],
                ),
            ])
    }

    fn standard() -> BootstrapConfig {
        BootstrapConfig::default()
            .platform(PlatformKind::Standard)
            .diagnostics(false)
    }

    #[test]
    fn initialize_reaches_ready() {
        let mut context = Context::new(healthy_platform(), standard());
        context.initialize(&names(&[SURFACE])).unwrap();

        assert_eq!(context.state(), BootstrapState::Ready);
        assert!(context.instance().is_some());
        assert_eq!(
            context.physical_device(),
            Some(FakePlatform::physical_device_handle(1))
        );
        assert!(context.device().is_some());
        assert_eq!(context.graphics_family(), Some(1));
        let (family, queue) = context.get_queue(QueueType::Graphics).unwrap();
        assert_eq!(family, 1);
        assert_eq!(context.graphics_queue(), Some(queue));
        assert_eq!(context.enabled_extensions(), names(&[SURFACE]).as_slice());
        assert!(context.enabled_layers().is_empty());

        let device_desc = context.platform().last_device_desc.clone().unwrap();
        assert_eq!(device_desc.queue_family_index, 1);
        assert_eq!(device_desc.queue_priorities, vec![1.0]);
        assert!(device_desc.extensions.is_empty());
    }

    #[test]
    fn missing_extension_creates_nothing() {
        let mut context = Context::new(healthy_platform(), standard());
        let err = context
            .initialize(&names(&[SURFACE, "VK_KHR_win32_surface"]))
            .unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Instance(InstanceError::MissingCapability {
                kind: CapabilityKind::Extension,
                ref name,
            }) if name == "VK_KHR_win32_surface"
        ));
        assert_eq!(context.state(), BootstrapState::Failed);
        assert_eq!(context.platform().instances_created, 0);
        assert!(context.platform().last_instance_desc.is_none());
    }

    #[test]
    fn missing_validation_layer_creates_nothing() {
        let platform = healthy_platform().with_layers(&[]);
        let mut context = Context::new(platform, standard().diagnostics(true));

        let err = context.initialize(&names(&[SURFACE])).unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Instance(InstanceError::MissingCapability {
                kind: CapabilityKind::Layer,
                ..
            })
        ));
        assert_eq!(context.platform().instances_created, 0);
    }

    #[test]
    fn zero_devices_unwinds_instance() {
        let platform = healthy_platform().with_devices(vec![]);
        let mut context = Context::new(platform, standard());

        let err = context.initialize(&[]).unwrap_err();

        assert!(matches!(
            err,
            crate::Error::PhysicalDevice(PhysicalDeviceError::NoDeviceFound)
        ));
        assert_eq!(context.platform().device_queries.get(), 0);
        assert_eq!(context.platform().instances_created, 1);
        assert!(context.platform().live_instance.is_none());
        assert!(context.instance().is_none());
        assert_eq!(context.state(), BootstrapState::Failed);
    }

    #[test]
    fn rejected_device_unwinds_instance() {
        let mut platform = healthy_platform();
        platform.device_failure = Some(vk::Result::ERROR_FEATURE_NOT_PRESENT);
        let mut context = Context::new(platform, standard());

        let err = context.initialize(&[]).unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Device(DeviceError::FailedCreateDevice(
                vk::Result::ERROR_FEATURE_NOT_PRESENT
            ))
        ));
        assert!(context.platform().live_instance.is_none());
        assert!(context.platform().live_device.is_none());
        assert!(context.physical_device().is_none());
        assert!(context.get_queue(QueueType::Graphics).is_err());
    }

    #[test]
    fn rejected_instance_is_reported() {
        let mut platform = healthy_platform();
        platform.instance_failure = Some(vk::Result::ERROR_INCOMPATIBLE_DRIVER);
        let mut context = Context::new(platform, standard());

        let err = context.initialize(&[]).unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Instance(InstanceError::FailedCreateInstance(
                vk::Result::ERROR_INCOMPATIBLE_DRIVER
            ))
        ));
        assert_eq!(context.state(), BootstrapState::Failed);
        assert!(context.instance().is_none());
    }

    #[test]
    fn retry_after_failure_and_teardown() {
        let platform = healthy_platform().with_devices(vec![]);
        let mut context = Context::new(platform, standard());
        assert!(context.initialize(&[]).is_err());

        context.teardown();
        assert_eq!(context.state(), BootstrapState::TornDown);

        context.platform.devices =
            vec![FakeDevice::integrated("igpu", &[vk::QueueFlags::GRAPHICS])];
        context.initialize(&[]).unwrap();

        assert_eq!(context.state(), BootstrapState::Ready);
        assert_eq!(context.platform().instances_created, 2);
        assert_eq!(context.graphics_family(), Some(0));
    }

    #[test]
    fn teardown_twice_is_noop() {
        let mut context = Context::new(healthy_platform(), standard());
        context.initialize(&[]).unwrap();

        context.teardown();
        assert_eq!(context.state(), BootstrapState::TornDown);
        assert!(context.instance().is_none());
        assert!(context.device().is_none());
        assert!(context.platform().live_instance.is_none());
        assert!(context.platform().live_device.is_none());

        context.teardown();
        assert_eq!(context.state(), BootstrapState::TornDown);
    }

    #[test]
    fn teardown_before_initialize_is_noop() {
        let mut context = Context::new(healthy_platform(), standard());
        context.teardown();
        assert_eq!(context.state(), BootstrapState::Uninitialized);
    }

    #[test]
    fn initialize_while_ready_is_rejected() {
        let mut context = Context::new(healthy_platform(), standard());
        context.initialize(&[]).unwrap();

        let err = context.initialize(&[]).unwrap_err();

        assert!(matches!(
            err,
            crate::Error::InvalidState(BootstrapState::Ready)
        ));
        assert_eq!(context.state(), BootstrapState::Ready);
        assert_eq!(context.platform().instances_created, 1);
    }

    #[test]
    fn portability_requests_mandated_names() {
        let config = BootstrapConfig::default()
            .platform(PlatformKind::Portability)
            .diagnostics(true)
            .app_name("portable");
        let mut context = Context::new(healthy_platform(), config);

        context.initialize(&names(&[SURFACE])).unwrap();

        let instance_desc = context.platform().last_instance_desc.clone().unwrap();
        assert_eq!(
            instance_desc.extensions,
            names(&[SURFACE, PORTABILITY_ENUMERATION, PROPERTIES2])
        );
        assert_eq!(instance_desc.layers, names(&[VALIDATION_LAYER_NAME]));
        assert_eq!(instance_desc.app_name, "portable");
        assert_eq!(
            instance_desc.flags,
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        );

        let device_desc = context.platform().last_device_desc.clone().unwrap();
        assert_eq!(device_desc.extensions, names(&["VK_KHR_portability_subset"]));
        assert_eq!(device_desc.layers, names(&[VALIDATION_LAYER_NAME]));
        assert_eq!(context.enabled_layers(), names(&[VALIDATION_LAYER_NAME]).as_slice());
    }

    #[test]
    fn mirror_file_receives_stage_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bootstrap.log");
        let mut logger = Logger::new();
        logger.init(Severity::Debug, Some(&path));

        let platform = healthy_platform().with_devices(vec![]);
        let mut context = Context::with_logger(platform, standard().diagnostics(true), logger);
        assert!(context.initialize(&[]).is_err());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[ERROR]"));
        assert!(contents.contains("couldn't find any GPU"));
        assert!(contents.contains("instance destroyed"));
    }

    #[test]
    fn dropping_context_releases_handles() {
        let mut context = Context::new(healthy_platform(), standard());
        context.initialize(&[]).unwrap();
        drop(context);
    }
}
