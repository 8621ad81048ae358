use crate::world::World;
use image::{ImageFormat, RgbaImage};
use log::info;
use std::io::{self, Write};
use std::path::Path;

/// Writes the accumulated framebuffer as an RGBA8 PNG with constant 255
/// alpha. Values are the linear radiance means, clamped and quantized; no
/// gamma curve is applied.
pub fn save_png(world: &World<'_>, path: &Path) -> Result<(), image::ImageError> {
    let width = world.width() as u32;
    let height = world.height() as u32;
    let image = RgbaImage::from_raw(width, height, world.get_imagebuffer(true))
        .expect("imagebuffer length matches framebuffer dimensions");
    image.save_with_format(path, ImageFormat::Png)?;
    info!("wrote {width}x{height} PNG to {}", path.display());
    Ok(())
}

/// Writes the framebuffer as a binary PPM (P6), a dependency-free dump
/// format most image viewers still read.
pub fn save_ppm(world: &World<'_>, path: &Path) -> io::Result<()> {
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);
    write!(file, "P6\n{} {}\n255\n", world.width(), world.height())?;
    file.write_all(&world.get_imagebuffer(false))?;
    file.flush()?;
    info!(
        "wrote {}x{} PPM to {}",
        world.width(),
        world.height(),
        path.display()
    );
    Ok(())
}
