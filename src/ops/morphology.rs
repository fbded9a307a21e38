use image::GrayImage;

use crate::canvas::{ImageGrid, MaskBuffer, MaskError};
use crate::ops::grow::region_grow_add;

// ============================================================================
// MORPHOLOGY — structuring-element dilate/erode over the boolean mask
// ============================================================================
//
// The structuring element is an elliptical (disc) kernel of odd side
// `k ∈ {1, 3, ..., 31}`. Kernels are applied as explicit offset sweeps over
// the flat mask; out-of-bounds neighbours count as background.

/// Odd kernel sizes accepted by the dilate/shrink tools.
pub fn validate_kernel(size: u32) -> Result<(), MaskError> {
    if size % 2 == 1 && (1..=31).contains(&size) {
        Ok(())
    } else {
        Err(MaskError::InvalidKernel(size))
    }
}

/// Offsets of an elliptical kernel of odd side `size`: every cell of the
/// bounding square whose center lies within the disc radius. Even sizes
/// round down to the next odd size.
pub(crate) fn disc_offsets(size: u32) -> Vec<(i32, i32)> {
    let reach = (size as i32 - 1) / 2;
    let r_sq = (reach * reach) as f32 + 0.25;
    let mut offsets = Vec::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            if (dx * dx + dy * dy) as f32 <= r_sq {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

/// Offsets of a square kernel of odd side `size`. Even sizes round down.
pub(crate) fn square_offsets(size: u32) -> Vec<(i32, i32)> {
    let reach = (size as i32 - 1) / 2;
    let mut offsets = Vec::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            offsets.push((dx, dy));
        }
    }
    offsets
}

/// Binary dilate over a 0/255 gray image (used on edge maps).
pub(crate) fn dilate_gray(img: &GrayImage, offsets: &[(i32, i32)]) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let hit = offsets.iter().any(|&(dx, dy)| {
                let nx = x + dx;
                let ny = y + dy;
                nx >= 0
                    && ny >= 0
                    && (nx as u32) < w
                    && (ny as u32) < h
                    && img.get_pixel(nx as u32, ny as u32)[0] > 0
            });
            if hit {
                out.put_pixel(x as u32, y as u32, image::Luma([255]));
            }
        }
    }
    out
}

/// Binary erode over a 0/255 gray image. Out-of-bounds counts as background.
pub(crate) fn erode_gray(img: &GrayImage, offsets: &[(i32, i32)]) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let keep = offsets.iter().all(|&(dx, dy)| {
                let nx = x + dx;
                let ny = y + dy;
                nx >= 0
                    && ny >= 0
                    && (nx as u32) < w
                    && (ny as u32) < h
                    && img.get_pixel(nx as u32, ny as u32)[0] > 0
            });
            if keep {
                out.put_pixel(x as u32, y as u32, image::Luma([255]));
            }
        }
    }
    out
}

fn apply_kernel(mask: &MaskBuffer, offsets: &[(i32, i32)], dilating: bool) -> MaskBuffer {
    let (w, h) = mask.dimensions();
    let mut out = MaskBuffer::new(w, h);
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let mut hit = !dilating;
            for &(dx, dy) in offsets {
                let nx = x + dx;
                let ny = y + dy;
                let set = nx >= 0
                    && ny >= 0
                    && (nx as u32) < w
                    && (ny as u32) < h
                    && mask.get(nx as u32, ny as u32);
                if dilating {
                    if set {
                        hit = true;
                        break;
                    }
                } else if !set {
                    hit = false;
                    break;
                }
            }
            if hit {
                out.set(x as u32, y as u32, true);
            }
        }
    }
    out
}

/// Dilate with a disc kernel of odd side `size`.
pub fn dilate_mask(mask: &MaskBuffer, size: u32) -> Result<MaskBuffer, MaskError> {
    validate_kernel(size)?;
    Ok(apply_kernel(mask, &disc_offsets(size), true))
}

/// Erode with a disc kernel of odd side `size`. Pixels whose kernel reaches
/// past the border erode away.
pub fn erode_mask(mask: &MaskBuffer, size: u32) -> Result<MaskBuffer, MaskError> {
    validate_kernel(size)?;
    Ok(apply_kernel(mask, &disc_offsets(size), false))
}

/// The 8-connected component of the mask containing `click`: a flood fill
/// within the binarized mask itself, using a near-unity intensity window.
pub fn clicked_cluster(mask: &MaskBuffer, click: (u32, u32)) -> Result<MaskBuffer, MaskError> {
    let (w, h) = mask.dimensions();
    let bits: Vec<f32> = mask.data().iter().map(|&v| if v { 1.0 } else { 0.0 }).collect();
    let grid = ImageGrid::new(w, h, bits, (1.0, 1.0))?;
    let mut cluster = MaskBuffer::new(w, h);
    region_grow_add(&grid, &mut cluster, &[click], 0.5, 1.5)?;
    Ok(cluster)
}

/// Dilate at a click point. A click on a masked pixel isolates that
/// component, dilates only it and unions it back — disjoint regions never
/// bridge. A background click dilates the whole mask.
pub fn dilate_at(mask: &mut MaskBuffer, click: (u32, u32), size: u32) -> Result<(), MaskError> {
    validate_kernel(size)?;
    if mask.get(click.0, click.1) {
        let cluster = clicked_cluster(mask, click)?;
        let grown = dilate_mask(&cluster, size)?;
        mask.combine(&grown, crate::canvas::Polarity::Draw)?;
    } else {
        *mask = dilate_mask(mask, size)?;
    }
    Ok(())
}

/// Erode at a click point. A click on a masked pixel takes that component
/// out, erodes it in isolation and substitutes it back; a background click
/// erodes the whole mask.
pub fn shrink_at(mask: &mut MaskBuffer, click: (u32, u32), size: u32) -> Result<(), MaskError> {
    validate_kernel(size)?;
    if mask.get(click.0, click.1) {
        let cluster = clicked_cluster(mask, click)?;
        mask.combine(&cluster, crate::canvas::Polarity::Cut)?;
        let shrunk = erode_mask(&cluster, size)?;
        mask.combine(&shrunk, crate::canvas::Polarity::Draw)?;
    } else {
        *mask = erode_mask(mask, size)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_pixel_mask(w: u32, h: u32, x: u32, y: u32) -> MaskBuffer {
        let mut m = MaskBuffer::new(w, h);
        m.set(x, y, true);
        m
    }

    #[test]
    fn test_kernel_validation() {
        assert!(validate_kernel(1).is_ok());
        assert!(validate_kernel(3).is_ok());
        assert!(validate_kernel(31).is_ok());
        assert!(matches!(validate_kernel(0), Err(MaskError::InvalidKernel(0))));
        assert!(validate_kernel(4).is_err());
        assert!(validate_kernel(33).is_err());
    }

    #[test]
    fn test_unit_kernel_is_identity() {
        let mask = single_pixel_mask(5, 5, 2, 2);
        assert_eq!(dilate_mask(&mask, 1).unwrap(), mask);
        assert_eq!(erode_mask(&mask, 1).unwrap(), mask);
    }

    #[test]
    fn test_dilate_single_pixel_makes_disc() {
        let mask = single_pixel_mask(7, 7, 3, 3);
        let grown = dilate_mask(&mask, 3).unwrap();
        // the size-3 disc is a cross: the diagonal corners stay out
        assert_eq!(grown.count_set(), 5);
        assert!(grown.get(3, 3) && grown.get(2, 3) && grown.get(4, 3));
        assert!(grown.get(3, 2) && grown.get(3, 4));
        assert!(!grown.get(2, 2) && !grown.get(4, 4));
    }

    #[test]
    fn test_erode_reverses_dilate_inside() {
        let mut mask = MaskBuffer::new(9, 9);
        for y in 2..7 {
            for x in 2..7 {
                mask.set(x, y, true);
            }
        }
        let eroded = erode_mask(&mask, 3).unwrap();
        // the 5x5 block erodes to its 3x3 interior
        assert_eq!(eroded.count_set(), 9);
        assert!(eroded.get(3, 3) && eroded.get(5, 5));
        assert!(!eroded.get(2, 2));
    }

    #[test]
    fn test_cluster_dilate_does_not_bridge() {
        // two far-apart single-pixel components
        let mut mask = MaskBuffer::new(11, 11);
        mask.set(2, 2, true);
        mask.set(8, 8, true);
        dilate_at(&mut mask, (2, 2), 3).unwrap();
        // clicked component grew by one pixel in each direction...
        assert!(mask.get(1, 2) && mask.get(3, 2) && mask.get(2, 1) && mask.get(2, 3));
        // ...while the other stayed a lone pixel
        assert!(mask.get(8, 8));
        assert!(!mask.get(7, 8) && !mask.get(8, 7));
    }

    #[test]
    fn test_background_click_dilates_everything() {
        let mut mask = MaskBuffer::new(11, 11);
        mask.set(2, 2, true);
        mask.set(8, 8, true);
        dilate_at(&mut mask, (5, 5), 3).unwrap();
        assert!(mask.get(1, 2));
        assert!(mask.get(7, 8));
    }

    #[test]
    fn test_cluster_shrink_only_clicked_component() {
        let mut mask = MaskBuffer::new(13, 13);
        for y in 1..6 {
            for x in 1..6 {
                mask.set(x, y, true);
            }
        }
        for y in 8..11 {
            for x in 8..11 {
                mask.set(x, y, true);
            }
        }
        shrink_at(&mut mask, (3, 3), 3).unwrap();
        // clicked 5x5 block shrank to its 3x3 interior
        assert!(!mask.get(1, 1));
        assert!(mask.get(3, 3));
        // the other block is untouched
        assert!(mask.get(8, 8) && mask.get(10, 10));
    }

    #[test]
    fn test_shrink_can_remove_small_cluster() {
        let mut mask = single_pixel_mask(5, 5, 2, 2);
        shrink_at(&mut mask, (2, 2), 3).unwrap();
        assert_eq!(mask.count_set(), 0);
    }
}
