// Calendurr: SPIFFS Mount
//
// Registers the "storage" partition under the VFS so std::fs works on it.
// A blank or corrupt partition is formatted on first mount.

use std::ffi::CString;

use esp_idf_sys::{self as sys, esp};

use calendurr::config::STORAGE_MOUNT;

const MAX_OPEN_FILES: usize = 4;

pub fn mount() -> anyhow::Result<()> {
    let base_path = CString::new(STORAGE_MOUNT)?;
    let conf = sys::esp_vfs_spiffs_conf_t {
        base_path: base_path.as_ptr(),
        partition_label: core::ptr::null(),
        max_files: MAX_OPEN_FILES,
        format_if_mount_failed: true,
    };
    esp!(unsafe { sys::esp_vfs_spiffs_register(&conf) })?;

    let (mut total, mut used) = (0usize, 0usize);
    if unsafe { sys::esp_spiffs_info(core::ptr::null(), &mut total, &mut used) } == sys::ESP_OK {
        log::info!("SPIFFS mounted at {}: {} of {} bytes used", STORAGE_MOUNT, used, total);
    }
    Ok(())
}
