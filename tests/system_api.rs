// tests/system_api.rs
//! End-to-end use of the public API through the headless backend.

use displaykit::{
    Capabilities, ColorSpaceDescriptor, Event, FontKind, HeadlessControl, HeadlessDriver,
    MonitorId, PixelFormat, Rgba, System, SystemConfig, SystemError,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use test_log::test;

fn fixture_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("displaykit-{}-{}", std::process::id(), name))
}

fn write_png(
    name: &str,
    width: u32,
    height: u32,
    color: png::ColorType,
    srgb: bool,
    data: &[u8],
) -> anyhow::Result<PathBuf> {
    let path = fixture_path(name);
    let file = File::create(&path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);
    if srgb {
        encoder.set_srgb(png::SrgbRenderingIntent::Perceptual);
    }
    let mut writer = encoder.write_header()?;
    writer.write_image_data(data)?;
    writer.finish()?;
    Ok(path)
}

fn headless(config: SystemConfig) -> anyhow::Result<(System, HeadlessControl)> {
    let (driver, control) = HeadlessDriver::with_control(config.headless.clone());
    Ok((System::new(config, Box::new(driver))?, control))
}

#[test]
fn it_should_load_png_files_in_both_layouts() -> anyhow::Result<()> {
    let path = write_png(
        "two-pixels.png",
        2,
        1,
        png::ColorType::Rgba,
        true,
        &[255, 0, 0, 255, 0, 0, 255, 128],
    )?;
    let (system, _control) = headless(SystemConfig::default())?;

    let native = system.load_surface(&path)?;
    assert_eq!(native.format()?, PixelFormat::Bgra8);
    assert_eq!(native.pixels()?, &[0, 0, 255, 255, 255, 0, 0, 128]);
    assert!(native.color_space()?.map(|cs| cs.is_srgb()).unwrap_or(false));

    let rgba = system.load_rgba_surface(&path)?;
    assert_eq!(rgba.format()?, PixelFormat::Rgba8);
    assert_eq!(rgba.pixel(0, 0)?, Rgba::opaque(255, 0, 0));
    assert_eq!(rgba.pixel(1, 0)?, Rgba::new(0, 0, 255, 128));

    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn it_should_expand_grayscale_images_and_leave_them_untagged() -> anyhow::Result<()> {
    let path = write_png("gray.png", 3, 1, png::ColorType::Grayscale, false, &[0, 128, 255])?;
    let (system, _control) = headless(SystemConfig::default())?;
    let surface = system.load_rgba_surface(&path)?;
    assert!(surface.color_space()?.is_none());
    assert_eq!(surface.pixel(1, 0)?, Rgba::opaque(128, 128, 128));
    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn it_should_report_unsupported_files_as_decode_failures() -> anyhow::Result<()> {
    let path = fixture_path("not-an-image.png");
    std::fs::write(&path, b"GIF89a")?;
    let (system, _control) = headless(SystemConfig::default())?;
    assert!(matches!(
        system.load_surface(&path),
        Err(SystemError::DecodeFailed { .. })
    ));
    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn it_should_load_sprite_sheet_fonts_once() -> anyhow::Result<()> {
    // Magenta separators around two cells of widths 2 and 1.
    let sep = [255, 0, 255, 255];
    let ink = [255, 255, 255, 255];
    let row: Vec<u8> = [sep, ink, ink, sep, ink, sep].concat();
    let data = [row.clone(), row].concat();
    let path = write_png("sprites.png", 6, 2, png::ColorType::Rgba, false, &data)?;

    let (system, _control) = headless(SystemConfig::default())?;
    let font = system.load_sprite_sheet_font(&path, 2)?;
    assert_eq!(font.kind(), FontKind::SpriteSheet { scale: 2 });
    assert_eq!(font.glyph_count()?, 2);
    assert_eq!(font.line_height()?, 4);
    assert_eq!(font.advance(' ')?, Some(4));
    assert_eq!(font.advance('!')?, Some(2));
    assert!(!font.has_glyph('"')?);
    assert!(font.metrics()?.is_none());

    let again = system.font_manager()?.load_sprite_sheet_font(&path, 2)?;
    assert!(font.same_font(&again));
    let bigger = system.load_sprite_sheet_font(&path, 3)?;
    assert!(!font.same_font(&bigger));
    assert_eq!(system.font_manager()?.len(), 2);

    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn it_should_invalidate_fonts_and_surfaces_on_dispose() -> anyhow::Result<()> {
    let sep = [0, 0, 0, 255];
    let ink = [9, 9, 9, 255];
    let data: Vec<u8> = [sep, ink, sep].concat();
    let path = write_png("one-glyph.png", 3, 1, png::ColorType::Rgba, false, &data)?;

    let (mut system, _control) = headless(SystemConfig::default())?;
    let font = system.load_sprite_sheet_font(&path, 1)?;
    let surface = system.load_surface(&path)?;
    assert!(matches!(
        system.dispose(),
        Err(SystemError::OutstandingHandles {
            displays: 0,
            surfaces: 1
        })
    ));
    assert!(!font.is_valid());
    assert!(matches!(font.line_height(), Err(SystemError::Disposed)));
    assert!(matches!(surface.width(), Err(SystemError::Disposed)));
    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn it_should_follow_a_display_across_monitors_from_the_event_queue() -> anyhow::Result<()> {
    let (mut system, control) = headless(SystemConfig::default())?;
    assert!(system.has_capability(Capabilities::COLOR_SPACES));
    let display = system.create_display(100, 50, 2)?;
    let window = display.window_id()?;
    assert_eq!(display.monitor()?, MonitorId(0));

    control.move_window(window, MonitorId(1))?;
    let event = system.event_queue()?.get_event()?;
    assert_eq!(
        event,
        Some(Event::DisplayMoved {
            window,
            monitor: MonitorId(1)
        })
    );
    assert_eq!(display.monitor()?, MonitorId(1));
    assert_eq!(
        *display.color_space()?.descriptor(),
        ColorSpaceDescriptor::display_p3()
    );
    Ok(())
}

#[test]
fn it_should_convert_a_surface_into_a_wider_gamut() -> anyhow::Result<()> {
    let (system, _control) = headless(SystemConfig::default())?;
    let srgb = system.create_color_space(ColorSpaceDescriptor::srgb())?;
    let p3 = system.create_color_space(ColorSpaceDescriptor::display_p3())?;
    let conversion = system.convert_between_color_space(&srgb, &p3)?;
    assert!(!conversion.is_identity());

    let mut surface = system.create_surface(2, 2, Some(srgb))?;
    surface.fill(Rgba::new(255, 0, 0, 77))?;
    surface.apply_conversion(&conversion)?;
    let px = surface.pixel(1, 1)?;
    assert!(px.r < 255 && px.r > 200, "{:?}", px);
    assert!(px.g > 0, "{:?}", px);
    assert_eq!(px.a, 77);
    assert_eq!(surface.color_space()?, Some(&p3));

    // A second application expects P3 input now.
    let mut other = system.create_surface(1, 1, Some(p3.clone()))?;
    assert!(matches!(
        other.apply_conversion(&conversion),
        Err(SystemError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn it_should_build_a_system_from_a_json_config() -> anyhow::Result<()> {
    let config = SystemConfig::from_json_str(
        r#"{
            "app": { "name": "Painter", "mode": "cli" },
            "display": { "default_width": 200, "default_height": 100, "open_default_display": true },
            "headless": { "native_services": false }
        }"#,
    )?;
    let system = System::from_config(config)?;
    assert_eq!(system.app_name(), "Painter");
    assert_eq!(system.driver_name(), "headless");
    let display = system.default_display().expect("default display");
    assert_eq!(display.size()?, (200, 100));
    assert_eq!(display.title()?, "Painter");
    assert!(system.menus().is_none());
    Ok(())
}
