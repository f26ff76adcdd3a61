//! Capture Demo
//!
//! Opens the default capture device, ticks the session registry for a few
//! seconds, and reports what lands in the RGB24 output buffer.

use std::time::Duration;

use framegrab::{CaptureSession, DeviceCatalog, SessionRegistry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    framegrab::init();

    println!("🔴 framegrab Capture Demo");
    println!("=========================");

    let catalog = DeviceCatalog::with_default_backend();
    let registry = SessionRegistry::new();

    let session = CaptureSession::open(&catalog, &registry, None, None)?;
    {
        let session = session.lock();
        println!(
            "Opened default device at {}x{}",
            session.width(),
            session.height()
        );
    }

    let mut frames = 0u32;
    for tick in 0..90 {
        registry.tick_all();

        let mut guard = session.lock();
        if guard.is_dirty() {
            let frame = guard.read_frame()?;
            frames += 1;
            println!(
                "tick {tick:3}: frame {frames} ({} bytes, first pixel rgb({}, {}, {}))",
                frame.len(),
                frame[0],
                frame[1],
                frame[2]
            );
        }
        drop(guard);
        std::thread::sleep(Duration::from_millis(33));
    }

    println!("Captured {frames} frames; closing");
    session.lock().close(&registry)?;
    Ok(())
}
