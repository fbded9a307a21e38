use image::{GrayImage, Luma};
use imageproc::contours::find_contours;
use imageproc::drawing::draw_polygon_mut;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::convex_hull;
use imageproc::point::Point;

use crate::canvas::{ImageGrid, Region};
use crate::ops::morphology::{disc_offsets, dilate_gray, erode_gray, square_offsets};

// ============================================================================
// CONTOUR-ASSISTED PICKER — one-shot organ-edge segmentation at a click
// ============================================================================
//
// Blur the image, keep only the image half containing the click, edge-detect,
// then repeatedly dilate the edge map until a closed contour shows up that is
// large enough and encloses the click. Spurious internal contours of middling
// size are subtracted from the fill via their convex hulls.
//
// The thresholds below are tuned against clinical kidney series and are kept
// verbatim for behavioral compatibility.

/// Minimum accepted contour area, scaled by pixel spacing (px·mm²).
const MIN_CONTOUR_AREA: f32 = 1500.0;
/// Internal contours whose hull area falls in this fraction window of the
/// parent's area are treated as holes and subtracted.
const HOLE_RATIO_MIN: f32 = 0.03;
const HOLE_RATIO_MAX: f32 = 0.5;
/// How many edge-dilation rounds to attempt before giving up.
const MAX_DILATION_ROUNDS: u32 = 10;
/// Gaussian sigma of the pre-blur (the 31x31-kernel default).
const BLUR_SIGMA: f32 = 5.0;
/// Canny hysteresis thresholds on the normalized blurred image.
const CANNY_LOW: f32 = 10.0;
const CANNY_HIGH: f32 = 30.0;

/// Segment the structure under `click`. Returns the filled region, or `None`
/// when no qualifying contour encloses the click within the retry budget —
/// an informational outcome, not an error.
pub fn pick_region(image: &ImageGrid, click: (u32, u32)) -> Option<Region> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || click.0 >= w || click.1 >= h {
        return None;
    }

    let blurred = gaussian_blur_f32(&normalized_gray(image), BLUR_SIGMA);

    // Bias the search toward the clicked side: zero the other image half.
    // A click on the exact center column matches neither half and finds
    // nothing.
    let half = w as f32 / 2.0;
    let half_cols = w / 2;
    let mut restricted = GrayImage::new(w, h);
    let cols = if (click.0 as f32) > half {
        half_cols..w
    } else if (click.0 as f32) < half {
        0..half_cols
    } else {
        return None;
    };
    for y in 0..h {
        for x in cols.clone() {
            restricted.put_pixel(x, y, *blurred.get_pixel(x, y));
        }
    }

    let edges = canny(&restricted, CANNY_LOW, CANNY_HIGH);
    let (dx, dy) = image.pixel_spacing();
    let px_area = dx * dy;
    let click_pt = (click.0 as f32, click.1 as f32);

    for round in 0..MAX_DILATION_ROUNDS {
        // grow the edge map with an elliptical kernel of side 1+round
        let dilated = if round == 0 {
            edges.clone()
        } else {
            dilate_gray(&edges, &disc_offsets(1 + round))
        };
        let mut contours = find_contours::<i32>(&dilated);
        contours.sort_by(|a, b| contour_area(&b.points).total_cmp(&contour_area(&a.points)));

        for contour in &contours {
            let area = contour_area(&contour.points);
            if area * px_area <= MIN_CONTOUR_AREA {
                continue;
            }
            if signed_distance(&contour.points, click_pt) <= 0.0 {
                continue;
            }
            let mut fill = fill_contour(&contour.points, w, h);
            subtract_internal_holes(&mut fill, &edges, area, round);
            return Some(gray_to_region(&fill));
        }
    }
    None
}

/// Edge pixels strictly interior to the accepted fill mark spurious internal
/// structure (e.g. the renal pelvis). Any such contour whose convex-hull
/// area sits in the hole-ratio window of the parent is subtracted.
fn subtract_internal_holes(fill: &mut GrayImage, edges: &GrayImage, parent_area: f32, round: u32) {
    let (w, h) = fill.dimensions();
    // pull the fill in with a square kernel of side round+3 so the parent's
    // own boundary edges don't qualify
    let interior = erode_gray(fill, &square_offsets(round + 3));
    let mut interior_edges = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            if interior.get_pixel(x, y)[0] > 0 && edges.get_pixel(x, y)[0] > 0 {
                interior_edges.put_pixel(x, y, Luma([255]));
            }
        }
    }

    let mut holes = find_contours::<i32>(&interior_edges);
    holes.sort_by(|a, b| contour_area(&b.points).total_cmp(&contour_area(&a.points)));
    for hole in &holes {
        if contour_area(&hole.points) == 0.0 {
            break;
        }
        let hull = convex_hull(hole.points.as_slice());
        let hull_area = contour_area(&hull);
        if hull_area > HOLE_RATIO_MIN * parent_area && hull_area < HOLE_RATIO_MAX * parent_area {
            let hole_fill = fill_contour(&hull, w, h);
            for y in 0..h {
                for x in 0..w {
                    if hole_fill.get_pixel(x, y)[0] > 0 {
                        fill.put_pixel(x, y, Luma([0]));
                    }
                }
            }
        }
    }
}

/// Rescale the scalar grid to a 0..255 gray image. A flat image maps to all
/// zeros.
fn normalized_gray(image: &ImageGrid) -> GrayImage {
    let (w, h) = image.dimensions();
    let (lo, hi) = image.value_range();
    let range = hi - lo;
    let mut out = GrayImage::new(w, h);
    if range <= 0.0 {
        return out;
    }
    for y in 0..h {
        for x in 0..w {
            let t = (image.value(x, y) - lo) / range;
            out.put_pixel(x, y, Luma([(t * 255.0).round() as u8]));
        }
    }
    out
}

/// Polygon area by the shoelace formula (Green's theorem, absolute value).
fn contour_area(points: &[Point<i32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0i64;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    (sum.abs() as f32) / 2.0
}

/// Signed distance from a point to a closed contour: positive inside,
/// negative outside, zero on the boundary.
fn signed_distance(points: &[Point<i32>], p: (f32, f32)) -> f32 {
    if points.len() < 3 {
        return f32::NEG_INFINITY;
    }
    let mut inside = false;
    let mut min_d_sq = f32::MAX;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let (ax, ay) = (a.x as f32, a.y as f32);
        let (bx, by) = (b.x as f32, b.y as f32);
        // even-odd ray crossing
        if (ay > p.1) != (by > p.1) {
            let xi = ax + (p.1 - ay) / (by - ay) * (bx - ax);
            if p.0 < xi {
                inside = !inside;
            }
        }
        min_d_sq = min_d_sq.min(dist_sq_to_segment(p, (ax, ay), (bx, by)));
    }
    let d = min_d_sq.sqrt();
    if inside { d } else { -d }
}

fn dist_sq_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let abx = b.0 - a.0;
    let aby = b.1 - a.1;
    let apx = p.0 - a.0;
    let apy = p.1 - a.1;
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq > 0.0 {
        ((apx * abx + apy * aby) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let cx = a.0 + t * abx;
    let cy = a.1 + t * aby;
    (p.0 - cx) * (p.0 - cx) + (p.1 - cy) * (p.1 - cy)
}

/// Fill a contour into a 0/255 gray image.
fn fill_contour(points: &[Point<i32>], w: u32, h: u32) -> GrayImage {
    let mut out = GrayImage::new(w, h);
    let mut poly: Vec<Point<i32>> = points.to_vec();
    // draw_polygon_mut requires an open point list
    if poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    if poly.len() >= 3 {
        draw_polygon_mut(&mut out, &poly, Luma([255]));
    }
    out
}

fn gray_to_region(img: &GrayImage) -> Region {
    let (w, h) = img.dimensions();
    let mut region = Region::new(w, h);
    for y in 0..h {
        for x in 0..w {
            if img.get_pixel(x, y)[0] > 0 {
                region.set(x, y, true);
            }
        }
    }
    region
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::ImageGrid;

    /// 160x160 image with a bright disc (radius 30) centered at (40, 80) on
    /// a zero background.
    fn blob_image() -> ImageGrid {
        let mut data = vec![0.0f32; 160 * 160];
        for y in 0..160i32 {
            for x in 0..160i32 {
                let dx = x - 40;
                let dy = y - 80;
                if dx * dx + dy * dy <= 30 * 30 {
                    data[(y * 160 + x) as usize] = 255.0;
                }
            }
        }
        ImageGrid::new(160, 160, data, (1.0, 1.0)).unwrap()
    }

    #[test]
    fn test_pick_finds_clicked_blob() {
        let image = blob_image();
        let region = pick_region(&image, (40, 80)).expect("blob should be found");
        // the click itself is inside the picked region
        assert!(region.get(40, 80));
        // roughly the blob's area (pi * 30^2), with generous slack for the
        // blur and edge dilation
        let n = region.count_set();
        assert!(n > 1500 && n < 6000, "unexpected region size {}", n);
        // nothing selected on the far side of the image
        for y in 0..160 {
            for x in 100..160 {
                assert!(!region.get(x, y));
            }
        }
    }

    #[test]
    fn test_pick_flat_image_finds_nothing() {
        let image = ImageGrid::new(64, 64, vec![7.0; 64 * 64], (1.0, 1.0)).unwrap();
        assert!(pick_region(&image, (10, 10)).is_none());
    }

    #[test]
    fn test_pick_center_column_finds_nothing() {
        let image = blob_image();
        assert!(pick_region(&image, (80, 80)).is_none());
    }

    #[test]
    fn test_pick_out_of_bounds_click() {
        let image = blob_image();
        assert!(pick_region(&image, (500, 80)).is_none());
    }

    #[test]
    fn test_pick_wrong_side_finds_nothing() {
        // click on the empty right half: the blob's half is zeroed away
        let image = blob_image();
        assert!(pick_region(&image, (120, 80)).is_none());
    }

    #[test]
    fn test_small_blob_rejected_by_area_threshold() {
        // radius-10 disc: ~314 px·mm², well under the 1500 minimum
        let mut data = vec![0.0f32; 160 * 160];
        for y in 0..160i32 {
            for x in 0..160i32 {
                let dx = x - 40;
                let dy = y - 80;
                if dx * dx + dy * dy <= 10 * 10 {
                    data[(y * 160 + x) as usize] = 255.0;
                }
            }
        }
        let image = ImageGrid::new(160, 160, data, (1.0, 1.0)).unwrap();
        assert!(pick_region(&image, (40, 80)).is_none());
    }

    #[test]
    fn test_contour_area_shoelace() {
        let square = [
            Point::new(0, 0),
            Point::new(4, 0),
            Point::new(4, 4),
            Point::new(0, 4),
        ];
        assert_eq!(contour_area(&square), 16.0);
        assert_eq!(contour_area(&square[..2]), 0.0);
    }

    #[test]
    fn test_signed_distance_sign() {
        let square = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert!(signed_distance(&square, (5.0, 5.0)) > 0.0);
        assert!(signed_distance(&square, (20.0, 5.0)) < 0.0);
        assert_eq!(signed_distance(&square, (5.0, 0.0)), 0.0);
    }
}
