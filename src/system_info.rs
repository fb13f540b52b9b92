use crate::error::{CapabilityKind, InstanceError};
use crate::logger::Logger;
use crate::platform::Platform;
use crate::{vk_error, vk_info};

pub const VALIDATION_LAYER_NAME: &str = "VK_LAYER_KHRONOS_validation";

/// Checks that every `requested` name occurs somewhere in `available`.
///
/// Stops at the first missing name and reports only that one.
pub fn check_capabilities(
    kind: CapabilityKind,
    requested: &[String],
    available: &[String],
    log: Option<&Logger>,
) -> Result<(), InstanceError> {
    vk_info!(log, "checking {} {kind}(s):", requested.len());
    for name in requested {
        if available.iter().any(|candidate| candidate == name) {
            vk_info!(log, "\t- {name} : found");
        } else {
            vk_error!(log, "\t- {name} : not found");
            return Err(InstanceError::MissingCapability {
                kind,
                name: name.clone(),
            });
        }
    }
    vk_info!(log, "{kind}(s) found");
    Ok(())
}

/// Snapshot of the instance extensions and layers the platform reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
    pub available_extensions: Vec<String>,
    pub available_layers: Vec<String>,
}

impl SystemInfo {
    #[cfg_attr(feature = "enable_tracing", tracing::instrument(skip_all))]
    pub fn query<P: Platform + ?Sized>(platform: &P) -> crate::Result<Self> {
        let available_extensions = platform.instance_extensions()?;
        let available_layers = platform.instance_layers()?;

        #[cfg(feature = "enable_tracing")]
        tracing::trace!(
            extensions = available_extensions.len(),
            layers = available_layers.len()
        );

        Ok(Self {
            available_extensions,
            available_layers,
        })
    }

    pub fn is_extension_available(&self, extension: &str) -> bool {
        self.available_extensions.iter().any(|ext| ext == extension)
    }

    pub fn is_layer_available(&self, layer: &str) -> bool {
        self.available_layers.iter().any(|l| l == layer)
    }

    pub fn validation_layers_available(&self) -> bool {
        self.is_layer_available(VALIDATION_LAYER_NAME)
    }

    pub fn check_extensions(
        &self,
        requested: &[String],
        log: Option<&Logger>,
    ) -> Result<(), InstanceError> {
        check_capabilities(
            CapabilityKind::Extension,
            requested,
            &self.available_extensions,
            log,
        )
    }

    pub fn check_layers(
        &self,
        requested: &[String],
        log: Option<&Logger>,
    ) -> Result<(), InstanceError> {
        check_capabilities(CapabilityKind::Layer, requested, &self.available_layers, log)
    }
}
