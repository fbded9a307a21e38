use crate::canvas::Region;

// ============================================================================
// GEOMETRIC FILLS — polygon / rectangle / circle rasterization
// ============================================================================
//
// All fills test the pixel CENTER, i.e. the point (x + 0.5, y + 0.5), and
// return a full-extent region for the caller to combine into the mask.
//
// Polygon containment uses the even-odd rule with zero boundary tolerance:
// a center exactly on the path counts as outside. The path is implicitly
// closed (last point connects back to the first).

/// Rasterize a closed polygon (freehand path or vertex list). Paths with
/// fewer than three points enclose nothing and yield an empty region.
pub fn fill_polygon(path: &[(f32, f32)], width: u32, height: u32) -> Region {
    let mut region = Region::new(width, height);
    if path.len() < 3 {
        return region;
    }
    let mut crossings: Vec<f32> = Vec::new();
    for y in 0..height {
        let yc = y as f32 + 0.5;
        crossings.clear();
        for i in 0..path.len() {
            let (x1, y1) = path[i];
            let (x2, y2) = path[(i + 1) % path.len()];
            // the edge crosses this scanline iff its endpoints straddle it
            if (y1 > yc) != (y2 > yc) {
                crossings.push(x1 + (yc - y1) / (y2 - y1) * (x2 - x1));
            }
        }
        crossings.sort_by(f32::total_cmp);
        // centers strictly between alternate crossing pairs are inside
        for pair in crossings.chunks(2) {
            if pair.len() < 2 {
                break;
            }
            let (lo, hi) = (pair[0], pair[1]);
            let first = ((lo - 0.5).floor() as i64 + 1).max(0);
            let last = ((hi - 0.5).ceil() as i64 - 1).min(width as i64 - 1);
            for x in first..=last {
                region.set(x as u32, y, true);
            }
        }
    }
    region
}

/// Rasterize the axis-aligned box spanned by two corners, inclusive of
/// centers on the min/max edges.
pub fn fill_rectangle(corner1: (f32, f32), corner2: (f32, f32), width: u32, height: u32) -> Region {
    let mut region = Region::new(width, height);
    let (lo_x, hi_x) = (corner1.0.min(corner2.0), corner1.0.max(corner2.0));
    let (lo_y, hi_y) = (corner1.1.min(corner2.1), corner1.1.max(corner2.1));
    // centers xc with lo <= xc <= hi
    let first_x = ((lo_x - 0.5).ceil() as i64).max(0);
    let last_x = ((hi_x - 0.5).floor() as i64).min(width as i64 - 1);
    let first_y = ((lo_y - 0.5).ceil() as i64).max(0);
    let last_y = ((hi_y - 0.5).floor() as i64).min(height as i64 - 1);
    for y in first_y..=last_y {
        for x in first_x..=last_x {
            region.set(x as u32, y as u32, true);
        }
    }
    region
}

/// Rasterize a circle: all centers with squared distance to `center` at most
/// `radius²`.
pub fn fill_circle(center: (f32, f32), radius: f32, width: u32, height: u32) -> Region {
    let mut region = Region::new(width, height);
    if radius < 0.0 {
        return region;
    }
    let r_sq = radius * radius;
    let first_x = ((center.0 - radius - 0.5).floor() as i64).max(0);
    let last_x = ((center.0 + radius + 0.5).ceil() as i64).min(width as i64 - 1);
    let first_y = ((center.1 - radius - 0.5).floor() as i64).max(0);
    let last_y = ((center.1 + radius + 0.5).ceil() as i64).min(height as i64 - 1);
    for y in first_y..=last_y {
        let dy = y as f32 + 0.5 - center.1;
        for x in first_x..=last_x {
            let dx = x as f32 + 0.5 - center.0;
            if dx * dx + dy * dy <= r_sq {
                region.set(x as u32, y as u32, true);
            }
        }
    }
    region
}
