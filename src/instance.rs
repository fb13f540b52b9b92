use crate::config::BootstrapConfig;
use crate::logger::Logger;
use crate::platform::{InstanceCreateDesc, Platform};
use crate::system_info::{SystemInfo, VALIDATION_LAYER_NAME};
use crate::{vk_debug, vk_error, vk_info};
use ash::vk;
use raw_window_handle::HasDisplayHandle;
use std::ffi::CStr;

fn owned(name: &CStr) -> String {
    name.to_string_lossy().into_owned()
}

/// Instance extensions the portability target cannot enumerate devices without.
pub fn portability_instance_extensions() -> [String; 2] {
    [
        owned(ash::khr::portability_enumeration::NAME),
        owned(ash::khr::get_physical_device_properties2::NAME),
    ]
}

pub fn portability_device_extension() -> String {
    owned(ash::khr::portability_subset::NAME)
}

/// Instance extensions the windowing system needs to create a surface for `display`.
pub fn required_window_extensions(display: &impl HasDisplayHandle) -> crate::Result<Vec<String>> {
    let raw = display.display_handle()?.as_raw();
    let names = ash_window::enumerate_required_extensions(raw)?;
    Ok(names
        .iter()
        .map(|&ptr| owned(unsafe { CStr::from_ptr(ptr) }))
        .collect())
}

/// Final extension list for instance creation.
///
/// On [`crate::PlatformKind::Portability`] the two portability extensions are appended to
/// `platform_extensions` and the combined list is checked here. Otherwise the list is
/// returned as given and the caller is responsible for checking it.
#[cfg_attr(feature = "enable_tracing", tracing::instrument(skip(info, log)))]
pub fn resolve_extensions(
    platform_extensions: &[String],
    config: &BootstrapConfig,
    info: &SystemInfo,
    log: Option<&Logger>,
) -> crate::Result<Vec<String>> {
    let mut extensions = platform_extensions.to_vec();

    if config.is_portability() {
        extensions.extend(portability_instance_extensions());
        info.check_extensions(&extensions, log)?;
    } else {
        vk_debug!(log, "passing {} platform extension(s) through", extensions.len());
    }

    #[cfg(feature = "enable_tracing")]
    tracing::trace!(?extensions);

    Ok(extensions)
}

/// Validation layers to enable, empty unless diagnostics are on.
#[cfg_attr(feature = "enable_tracing", tracing::instrument(skip(info, log)))]
pub fn resolve_layers(
    config: &BootstrapConfig,
    info: &SystemInfo,
    log: Option<&Logger>,
) -> crate::Result<Vec<String>> {
    if !config.diagnostics {
        return Ok(Vec::new());
    }

    let layers = vec![VALIDATION_LAYER_NAME.to_string()];
    info.check_layers(&layers, log)?;

    #[cfg(feature = "enable_tracing")]
    tracing::trace!(?layers);

    Ok(layers)
}

pub(crate) fn instance_create_desc(
    config: &BootstrapConfig,
    extensions: &[String],
    layers: &[String],
) -> InstanceCreateDesc {
    let app = &config.app;
    InstanceCreateDesc {
        app_name: app.app_name.clone(),
        app_version: app.app_version,
        engine_name: app.engine_name.clone(),
        engine_version: app.engine_version,
        api_version: app.api_version,
        extensions: extensions.to_vec(),
        layers: layers.to_vec(),
        // Ignored by drivers that do not implement portability enumeration.
        flags: vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR,
    }
}

#[cfg_attr(feature = "enable_tracing", tracing::instrument(skip_all))]
pub(crate) fn create_instance<P: Platform + ?Sized>(
    platform: &mut P,
    config: &BootstrapConfig,
    extensions: &[String],
    layers: &[String],
    log: Option<&Logger>,
) -> crate::Result<vk::Instance> {
    let desc = instance_create_desc(config, extensions, layers);
    vk_debug!(
        log,
        "application {:?} {} engine {:?} {} api {}",
        desc.app_name,
        desc.app_version,
        desc.engine_name,
        desc.engine_version,
        desc.api_version
    );

    match platform.create_instance(&desc) {
        Ok(instance) => {
            vk_info!(log, "instance created");
            Ok(instance)
        }
        Err(err) => {
            vk_error!(log, "instance couldn't get created: {err}");
            Err(err)
        }
    }
}
