use anyhow::{anyhow, Result};
use ndarray::{s, Array3, Axis};
use crate::compose::{validate, Rgb};
use crate::io::Image;

/// Places `images` side by side, top-aligned, `gap` pixels apart. Shorter images are extended
/// downwards with `background`.
pub fn hstack(images: &[Image], gap: usize, background: Rgb) -> Result<Image> {
    stack(images, Axis(1), gap, background)
}

/// Places `images` one below the other, left-aligned, `gap` pixels apart. Narrower images are
/// extended to the right with `background`.
pub fn vstack(images: &[Image], gap: usize, background: Rgb) -> Result<Image> {
    stack(images, Axis(0), gap, background)
}

fn stack(images: &[Image], axis: Axis, gap: usize, background: Rgb) -> Result<Image> {
    if images.is_empty() {
        return Err(anyhow!("Nothing to stack."));
    }
    images.iter().try_for_each(|image| validate(image.view()))?;

    let cross = Axis(1 - axis.index());
    let extent = images.iter().map(|image| image.len_of(cross)).max().unwrap_or(0);
    let total = images.iter().map(|image| image.len_of(axis)).sum::<usize>() + gap * (images.len() - 1);

    let mut shape = [0_usize; 2];
    shape[axis.index()] = total;
    shape[cross.index()] = extent;
    let mut sheet = Array3::from_shape_fn((shape[0], shape[1], 3), |(_, _, c)| background[c]);

    let mut offset = 0;
    for image in images {
        let (height, width, _) = image.dim();
        let (top, left) = if axis == Axis(0) { (offset, 0) } else { (0, offset) };
        sheet.slice_mut(s![top..top + height, left..left + width, ..]).assign(image);
        offset += image.len_of(axis) + gap;
    }
    Ok(sheet)
}
