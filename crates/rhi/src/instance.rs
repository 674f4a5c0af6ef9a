//! Vulkan instance management.
//!
//! Creates the `VkInstance` with the surface extensions the window system
//! asks for, plus the Khronos validation layer and a debug messenger that
//! forwards validation output into `tracing`.

use std::ffi::{CStr, c_char};

use ash::{Entry, vk};
use tracing::{error, info, warn};

use crate::error::RhiError;

/// The Khronos validation layer name.
const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan instance wrapper with optional validation layer support.
pub struct Instance {
    entry: Entry,
    instance: ash::Instance,
    /// Only present when validation is enabled
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Instance {
    /// Creates a new Vulkan instance.
    ///
    /// `surface_extensions` are the platform surface extensions reported by the
    /// window system (see `lumen_platform::required_surface_extensions`). When
    /// `enable_validation` is set but the layer is missing, the instance is
    /// created without it and a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the Vulkan library cannot be loaded, instance
    /// creation fails, or the debug messenger cannot be installed.
    pub fn new(
        app_name: &CStr,
        enable_validation: bool,
        surface_extensions: &[*const c_char],
    ) -> Result<Self, RhiError> {
        let entry = unsafe { Entry::load()? };

        let validation_available =
            enable_validation && Self::is_validation_layer_available(&entry)?;
        if enable_validation && !validation_available {
            warn!("Validation layer requested but not available, proceeding without it");
        }

        let app_info = vk::ApplicationInfo::default()
            .application_name(app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"lumen")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_2);

        let extensions = required_extensions(surface_extensions, validation_available);

        let layers = if validation_available {
            vec![VALIDATION_LAYER_NAME.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        let instance = unsafe { entry.create_instance(&create_info, None)? };

        info!(
            "Vulkan instance created (API 1.2, {} extension(s))",
            extensions.len()
        );

        let (debug_utils, debug_messenger) = if validation_available {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let messenger = Self::setup_debug_messenger(&debug_utils)?;
            info!("Validation layers enabled");
            (Some(debug_utils), Some(messenger))
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    /// Returns the Vulkan instance handle.
    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    /// Returns the Vulkan entry point loader.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Returns whether validation layers are enabled.
    #[inline]
    pub fn has_validation(&self) -> bool {
        self.debug_messenger.is_some()
    }

    fn is_validation_layer_available(entry: &Entry) -> Result<bool, RhiError> {
        let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };

        Ok(available_layers.iter().any(|layer| {
            let layer_name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
            layer_name == VALIDATION_LAYER_NAME
        }))
    }

    fn setup_debug_messenger(
        debug_utils: &ash::ext::debug_utils::Instance,
    ) -> Result<vk::DebugUtilsMessengerEXT, RhiError> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None)? };

        Ok(messenger)
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        info!("Vulkan instance destroyed");
    }
}

/// Builds the instance extension list: the surface extensions, the base
/// `VK_KHR_surface` if the caller left it out, and debug utils for validation.
fn required_extensions(
    surface_extensions: &[*const c_char],
    validation: bool,
) -> Vec<*const c_char> {
    let mut extensions: Vec<*const c_char> = surface_extensions.to_vec();

    let has_surface = extensions
        .iter()
        .any(|&ext| unsafe { CStr::from_ptr(ext) } == ash::khr::surface::NAME);
    if !has_surface {
        extensions.insert(0, ash::khr::surface::NAME.as_ptr());
    }

    if validation {
        extensions.push(ash::ext::debug_utils::NAME.as_ptr());
    }

    extensions
}

/// Routes validation layer messages into `tracing`.
///
/// # Safety
///
/// This function is called from the Vulkan driver and must follow the
/// Vulkan debug callback contract.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let message = if callback_data.p_message.is_null() {
        std::borrow::Cow::Borrowed("(no message)")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let type_str = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "General",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "Validation",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "Performance",
        _ => "Unknown",
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            error!("[Vulkan {}] {}", type_str, message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            warn!("[Vulkan {}] {}", type_str, message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => {
            info!("[Vulkan {}] {}", type_str, message);
        }
        _ => {
            info!("[Vulkan {} Verbose] {}", type_str, message);
        }
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(extensions: &[*const c_char]) -> Vec<&'static CStr> {
        extensions
            .iter()
            .map(|&ext| unsafe { CStr::from_ptr(ext) })
            .collect()
    }

    #[test]
    fn test_required_extensions_adds_surface() {
        let extensions = required_extensions(&[], false);
        assert_eq!(names(&extensions), vec![ash::khr::surface::NAME]);
    }

    #[test]
    fn test_required_extensions_keeps_platform_order() {
        let platform = [
            ash::khr::surface::NAME.as_ptr(),
            ash::khr::xlib_surface::NAME.as_ptr(),
        ];
        let extensions = required_extensions(&platform, false);
        assert_eq!(
            names(&extensions),
            vec![ash::khr::surface::NAME, ash::khr::xlib_surface::NAME]
        );
    }

    #[test]
    fn test_required_extensions_with_validation() {
        let platform = [ash::khr::win32_surface::NAME.as_ptr()];
        let extensions = required_extensions(&platform, true);
        let names = names(&extensions);
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], ash::khr::surface::NAME);
        assert_eq!(names[2], ash::ext::debug_utils::NAME);
    }
}
