//! Device Enumeration Demo
//!
//! Lists the capture devices this platform offers, the modes each device
//! supports, and the resolved default device.

use framegrab::{DeviceCatalog, NONE_DEVICE_ID};

fn main() {
    tracing_subscriber::fmt::init();
    framegrab::init();

    println!("📹 framegrab Device Enumeration");
    println!("===============================");

    let catalog = DeviceCatalog::with_default_backend();
    match catalog.backend_name() {
        Some(name) => println!("Input backend: {name}"),
        None => println!("Input backend: none (sentinel catalog only)"),
    }

    let devices = catalog.list_devices();
    println!("\nFound {} device entr(ies):", devices.len());
    for device in &devices {
        println!("  {} [{}]", device.name, device.id);
        if device.id == NONE_DEVICE_ID {
            continue;
        }
        let modes = catalog.list_modes(&device.id);
        if modes.is_empty() {
            println!("    (no mode information)");
        }
        for mode in modes {
            println!("    {mode}");
        }
    }

    println!("\nDefault device: {}", catalog.default_device_id());
}
