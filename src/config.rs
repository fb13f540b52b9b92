use crate::Version;

/// Whether the target exposes Vulkan natively or through a portability layer
/// (MoltenVK and friends) that needs extra extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    Standard,
    Portability,
}

impl Default for PlatformKind {
    fn default() -> Self {
        if cfg!(any(target_os = "macos", target_os = "ios", feature = "portability")) {
            PlatformKind::Portability
        } else {
            PlatformKind::Standard
        }
    }
}

/// Identification metadata passed to instance creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub app_name: String,
    pub app_version: Version,
    pub engine_name: String,
    pub engine_version: Version,
    pub api_version: Version,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            app_name: "NDEF".to_string(),
            app_version: Version::new(0, 0, 0),
            engine_name: "NDEF".to_string(),
            engine_version: Version::new(0, 0, 0),
            api_version: Version::V1_3_0,
        }
    }
}

/// Resolved once before bootstrapping and threaded through every stage.
///
/// `diagnostics` turns on logging and the Khronos validation layer; `platform` decides
/// whether the portability extensions are requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub diagnostics: bool,
    pub platform: PlatformKind,
    pub app: AppInfo,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            diagnostics: cfg!(debug_assertions),
            platform: PlatformKind::default(),
            app: AppInfo::default(),
        }
    }
}

impl BootstrapConfig {
    pub fn diagnostics(mut self, enable: bool) -> Self {
        self.diagnostics = enable;
        self
    }

    pub fn platform(mut self, platform: PlatformKind) -> Self {
        self.platform = platform;
        self
    }

    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app.app_name = app_name.into();
        self
    }

    pub fn engine_name(mut self, engine_name: impl Into<String>) -> Self {
        self.app.engine_name = engine_name.into();
        self
    }

    pub fn app_version(mut self, version: Version) -> Self {
        self.app.app_version = version;
        self
    }

    pub fn engine_version(mut self, version: Version) -> Self {
        self.app.engine_version = version;
        self
    }

    pub fn api_version(mut self, version: Version) -> Self {
        self.app.api_version = version;
        self
    }

    pub fn is_portability(&self) -> bool {
        self.platform == PlatformKind::Portability
    }
}
