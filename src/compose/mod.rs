//! Pixel-level compositing of result cards, including the color-coded frames that mark the query
//! and the correct matches.

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use ndarray::{s, Array3, ArrayView3, Axis};
use crate::error::ViewerError;
use crate::io::{self, Image};

pub mod sheet;

pub type Rgb = [u8; 3];

pub const WHITE: Rgb = [255, 255, 255];
pub const BLACK: Rgb = [0, 0, 0];
pub const GREEN: Rgb = [0, 255, 0];
#[cfg(test)]
pub(crate) const RED: Rgb = [255, 0, 0];

/// Decoration applied around a card.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Frame {
    /// The query image.
    Query,
    /// A gallery result with the same label as the query.
    Match,
    /// Any other gallery result: white padding only, no reserved border.
    Plain,
}

impl Frame {
    pub fn color(&self) -> Option<Rgb> {
        match self {
            Frame::Query => Some(BLACK),
            Frame::Match => Some(GREEN),
            Frame::Plain => None,
        }
    }
}

/// Renders `image` as a `size`×`size` card decorated with `frame`.
pub fn compose_card(image: ArrayView3<u8>, frame: Frame, size: usize, border_size: usize) -> Result<Image> {
    match frame.color() {
        Some(color) => pad_to_square(image, size, border_size, color),
        None => pad_to_square(image, size, 0, WHITE),
    }
}

/// Returns `Ok` if `image` has a non-zero area and exactly three channels.
pub fn validate(image: ArrayView3<u8>) -> Result<()> {
    let (height, width, channels) = image.dim();
    if height == 0 || width == 0 {
        return Err(ViewerError::InvalidImage(format!("zero-area image ({}x{})", height, width)).into());
    }
    if channels != 3 {
        return Err(ViewerError::InvalidImage(format!("expected 3 channels, got {}", channels)).into());
    }
    Ok(())
}

/// Fits `image` into an exact `target_size`×`target_size` square.
///
/// The image is scaled, keeping its aspect ratio, until its longer side equals
/// `target_size - 2 * border_size`; the shorter side is centered with white padding (the extra
/// pixel of an odd margin goes to the bottom or right), and a `border_size`-pixel frame of
/// `border_color` surrounds the result.
///
/// Returns `ViewerError::InvalidImage` for zero-area or non-RGB input, and an error if the border
/// leaves no room for the image.
pub fn pad_to_square(image: ArrayView3<u8>, target_size: usize, border_size: usize, border_color: Rgb) -> Result<Image> {
    validate(image)?;
    if target_size <= 2 * border_size {
        return Err(anyhow!(
            "Target size ({}) must exceed twice the border size ({}).", target_size, border_size));
    }
    let inner = target_size - 2 * border_size;

    let (height, width, _) = image.dim();
    let longest = height.max(width);
    let new_height = (height * inner / longest).max(1);
    let new_width = (width * inner / longest).max(1);
    let resized = resize(image, new_height, new_width)?;

    let delta_h = inner - new_height;
    let delta_w = inner - new_width;
    let padded = pad_constant(
        resized.view(),
        (delta_h / 2, delta_h - delta_h / 2),
        (delta_w / 2, delta_w - delta_w / 2),
        WHITE);

    Ok(pad_constant(padded.view(), (border_size, border_size), (border_size, border_size), border_color))
}

/// Surrounds `image` with constant `color` margins: `vertical` is (top, bottom), `horizontal` is
/// (left, right).
pub fn pad_constant(image: ArrayView3<u8>, vertical: (usize, usize), horizontal: (usize, usize), color: Rgb) -> Image {
    let (height, width, channels) = image.dim();
    let mut padded = Array3::<u8>::zeros((
        height + vertical.0 + vertical.1,
        width + horizontal.0 + horizontal.1,
        channels));
    for (channel, mut plane) in padded.axis_iter_mut(Axis(2)).enumerate() {
        plane.fill(color.get(channel).copied().unwrap_or(0));
    }
    padded
        .slice_mut(s![vertical.0..vertical.0 + height, horizontal.0..horizontal.0 + width, ..])
        .assign(&image);
    padded
}

/// Triangle-filtered resize to `height`×`width`.
pub fn resize(image: ArrayView3<u8>, height: usize, width: usize) -> Result<Image> {
    let (src_height, src_width, _) = image.dim();
    if (src_height, src_width) == (height, width) {
        return Ok(image.to_owned());
    }
    let rgb = io::to_rgb(image)?;
    let resized = imageops::resize(&rgb, u32::try_from(width)?, u32::try_from(height)?, FilterType::Triangle);
    io::from_rgb(resized)
}

#[cfg(test)]
mod tests {
    use ndarray::{s, Array3};
    use crate::compose::{compose_card, pad_constant, pad_to_square, resize, Frame, BLACK, GREEN, RED, WHITE};
    use crate::error::ViewerError;

    fn solid(height: usize, width: usize, color: [u8; 3]) -> Array3<u8> {
        Array3::from_shape_fn((height, width, 3), |(_, _, c)| color[c])
    }

    fn pixel(image: &Array3<u8>, y: usize, x: usize) -> [u8; 3] {
        [image[[y, x, 0]], image[[y, x, 1]], image[[y, x, 2]]]
    }

    #[test]
    fn test_pad_to_square_size_and_border() {
        for (height, width) in [(100, 50), (50, 100), (256, 256), (7, 3), (1000, 999)] {
            let card = pad_to_square(solid(height, width, RED).view(), 256, 6, BLACK).unwrap();
            assert_eq!((256, 256, 3), card.dim());
            for i in 0..256 {
                for b in 0..6 {
                    assert_eq!(BLACK, pixel(&card, b, i));
                    assert_eq!(BLACK, pixel(&card, 255 - b, i));
                    assert_eq!(BLACK, pixel(&card, i, b));
                    assert_eq!(BLACK, pixel(&card, i, 255 - b));
                }
            }
            assert_eq!(RED, pixel(&card, 128, 128));
        }
    }

    #[test]
    fn test_pad_to_square_margins() {
        // 100x50 -> 244x122 inside the border, with 61 white columns on each side.
        let card = pad_to_square(solid(100, 50, RED).view(), 256, 6, GREEN).unwrap();
        assert_eq!(WHITE, pixel(&card, 128, 6));
        assert_eq!(WHITE, pixel(&card, 128, 6 + 60));
        assert_eq!(RED, pixel(&card, 128, 6 + 61));
        assert_eq!(RED, pixel(&card, 128, 6 + 61 + 121));
        assert_eq!(WHITE, pixel(&card, 128, 6 + 61 + 122));
        assert_eq!(RED, pixel(&card, 6, 128));

        // An odd margin puts the extra pixel at the bottom: 10x7 -> 10x7 in a 10x10 square.
        let card = pad_to_square(solid(7, 10, RED).view(), 10, 0, WHITE).unwrap();
        let red_rows = (0..10).filter(|&y| pixel(&card, y, 5) == RED).collect::<Vec<_>>();
        assert_eq!(vec![1, 2, 3, 4, 5, 6, 7], red_rows);
    }

    #[test]
    fn test_pad_to_square_invalid() {
        let err = pad_to_square(Array3::<u8>::zeros((0, 5, 3)).view(), 256, 6, BLACK).unwrap_err();
        assert!(matches!(err.downcast_ref::<ViewerError>(), Some(ViewerError::InvalidImage(_))));

        let err = pad_to_square(Array3::<u8>::zeros((5, 5, 4)).view(), 256, 6, BLACK).unwrap_err();
        assert!(matches!(err.downcast_ref::<ViewerError>(), Some(ViewerError::InvalidImage(_))));

        assert!(pad_to_square(solid(5, 5, RED).view(), 12, 6, BLACK).is_err());
    }

    #[test]
    fn test_compose_card() {
        let image = solid(30, 60, RED);
        let query = compose_card(image.view(), Frame::Query, 64, 4).unwrap();
        let matched = compose_card(image.view(), Frame::Match, 64, 4).unwrap();
        let plain = compose_card(image.view(), Frame::Plain, 64, 4).unwrap();

        assert_eq!(BLACK, pixel(&query, 0, 0));
        assert_eq!(GREEN, pixel(&matched, 63, 63));
        assert_eq!(WHITE, pixel(&plain, 0, 0));
        // Without a border the image spans the full width.
        assert_eq!(RED, pixel(&plain, 32, 0));
        assert_eq!((64, 64, 3), plain.dim());
    }

    #[test]
    fn test_pad_constant() {
        let padded = pad_constant(solid(2, 3, RED).view(), (1, 2), (0, 4), GREEN);
        assert_eq!((5, 7, 3), padded.dim());
        assert_eq!(GREEN, pixel(&padded, 0, 0));
        assert_eq!(RED, pixel(&padded, 1, 0));
        assert_eq!(RED, pixel(&padded, 2, 2));
        assert_eq!(GREEN, pixel(&padded, 2, 3));
        assert_eq!(GREEN, pixel(&padded, 4, 6));
    }

    #[test]
    fn test_resize() {
        let mut image = Array3::<u8>::zeros((2, 2, 3));
        image.slice_mut(s![.., 1, ..]).fill(200);

        let resized = resize(image.view(), 4, 4).unwrap();
        assert_eq!((4, 4, 3), resized.dim());
        assert_eq!(0, resized[[0, 0, 0]]);
        assert_eq!(200, resized[[3, 3, 2]]);
        assert!(resized[[1, 1, 0]] > 0 && resized[[1, 1, 0]] < 200);

        let same = resize(image.view(), 2, 2).unwrap();
        assert_eq!(image, same);

        let shrunk = resize(solid(9, 9, GREEN).view(), 3, 1).unwrap();
        assert_eq!((3, 1, 3), shrunk.dim());
        assert_eq!(GREEN, pixel(&shrunk, 2, 0));
    }
}
