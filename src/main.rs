// src/main.rs

use anyhow::Context;
use displaykit::display::drivers::create_driver;
use displaykit::{
    create_system, with_instance, ColorSpaceDescriptor, Event, Rgba, System, SystemConfig,
};
use log::{info, warn};
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "displaykit.json";

/// Opens the default display, paints it and reports what the backend offers.
fn run(system: &mut System) -> anyhow::Result<()> {
    info!(
        "Backend '{}' capabilities: {:?}",
        system.driver_name(),
        system.capabilities()
    );

    let mut spaces = Vec::new();
    system
        .list_color_spaces(&mut spaces)
        .context("Failed to list color spaces")?;
    for space in &spaces {
        info!("Color space available: {}", space);
    }

    if system.default_display().is_none() {
        system
            .create_default_display()
            .context("Failed to open the default display")?;
    }
    system.finish_launching().context("Failed to finish launching")?;

    let painted = {
        let display = system
            .default_display_mut()
            .context("Default display vanished")?;
        display.set_title("displaykit demo")?;
        let surface = display.surface_mut()?;
        surface.fill(Rgba::opaque(0x20, 0x40, 0x80))?;
        (surface.width()?, surface.height()?)
    };
    info!("Painted {}x{} backing surface", painted.0, painted.1);

    let srgb = system.create_color_space(ColorSpaceDescriptor::srgb())?;
    let p3 = system.create_color_space(ColorSpaceDescriptor::display_p3())?;
    match system.convert_between_color_space(&srgb, &p3) {
        Ok(conversion) => {
            let mut swatch = system.create_rgba_surface(1, 1, Some(srgb.clone()))?;
            swatch.fill(Rgba::opaque(255, 0, 0))?;
            swatch.apply_conversion(&conversion)?;
            info!("sRGB red in Display P3: {:?}", swatch.pixel(0, 0)?);
        }
        Err(e) => warn!("No sRGB -> P3 conversion: {}", e),
    }

    let queue = system.event_queue()?;
    while let Some(event) = queue.get_event()? {
        match event {
            Event::DisplayClosed(window) => info!("{} asked to close", window),
            other => info!("Event: {:?}", other),
        }
    }
    Ok(())
}

/// Main entry point for the `displaykit` demo.
fn main() -> anyhow::Result<()> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting displaykit demo...");

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = SystemConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load '{}'", config_path.display()))?;
    info!("Configuration loaded from '{}'", config_path.display());

    let driver = create_driver(&config);
    let guard = create_system(config, driver).context("Failed to create the System")?;

    with_instance(run)
        .context("System instance unavailable")?
        .context("Demo run failed")?;

    guard.dispose().context("Failed to dispose the System")?;
    info!("displaykit demo exited successfully.");
    Ok(())
}
