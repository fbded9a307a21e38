use crate::canvas::{ImageGrid, MaskBuffer, MaskError, PaintMode};

// ============================================================================
// REGION GROWING — 8-connected flood fill keyed on an intensity interval
// ============================================================================

const NEIGHBOURS_8: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

/// Intensity range and seed pixels sampled under a square brush footprint.
pub struct FootprintSample {
    pub min: f32,
    pub max: f32,
    pub seeds: Vec<(u32, u32)>,
}

/// Sample the brush footprint centered at `center` (footprint side `size`,
/// reach `(size-1)/2`). Returns `None` when the footprint misses the grid
/// entirely — callers treat that as a silent no-op.
pub fn sample_footprint(
    image: &ImageGrid,
    center: (i32, i32),
    size: u32,
) -> Option<FootprintSample> {
    let reach = (size.max(1) as i32 - 1) / 2;
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut seeds = Vec::new();
    for x in (center.0 - reach)..=(center.0 + reach) {
        for y in (center.1 - reach)..=(center.1 + reach) {
            if !image.in_bounds(x, y) {
                continue;
            }
            let v = image.value(x as u32, y as u32);
            min = min.min(v);
            max = max.max(v);
            seeds.push((x as u32, y as u32));
        }
    }
    if seeds.is_empty() {
        None
    } else {
        Some(FootprintSample { min, max, seeds })
    }
}

fn check_extent(image: &ImageGrid, mask: &MaskBuffer) -> Result<(), MaskError> {
    if image.dimensions() != mask.dimensions() {
        return Err(MaskError::ShapeMismatch {
            expected: image.dimensions(),
            got: mask.dimensions(),
        });
    }
    Ok(())
}

/// Flood-set pixels reachable from the seeds through 8-neighbours whose
/// intensity lies in `[min, max]`, inclusive. Seed pixels themselves are
/// always set. The visited bitmap starts as a copy of the current mask, so
/// already-true pixels are never re-expanded and each pixel is visited at
/// most once.
pub fn region_grow_add(
    image: &ImageGrid,
    mask: &mut MaskBuffer,
    seeds: &[(u32, u32)],
    min: f32,
    max: f32,
) -> Result<(), MaskError> {
    check_extent(image, mask)?;
    let w = image.width() as usize;
    let h = image.height() as usize;
    let mut checked: Vec<bool> = mask.data().to_vec();
    // DFS stack of packed flat indices; a medical slice stays far below
    // u32::MAX pixels
    let mut stack: Vec<u32> = seeds
        .iter()
        .filter(|&&(x, y)| (x as usize) < w && (y as usize) < h)
        .map(|&(x, y)| (y as usize * w + x as usize) as u32)
        .collect();
    while let Some(idx) = stack.pop() {
        let i = idx as usize;
        let x = i % w;
        let y = i / w;
        mask.set_index(i, true);
        for (dx, dy) in NEIGHBOURS_8 {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                continue;
            }
            let ni = ny as usize * w + nx as usize;
            if !checked[ni] {
                checked[ni] = true;
                let v = image.value_at(ni);
                if min <= v && v <= max {
                    stack.push(ni as u32);
                }
            }
        }
    }
    Ok(())
}

/// Symmetric flood that CLEARS matching pixels. The visited bitmap starts as
/// the negation of the mask, so already-false pixels are never re-expanded.
pub fn region_grow_remove(
    image: &ImageGrid,
    mask: &mut MaskBuffer,
    seeds: &[(u32, u32)],
    min: f32,
    max: f32,
) -> Result<(), MaskError> {
    check_extent(image, mask)?;
    let w = image.width() as usize;
    let h = image.height() as usize;
    let mut checked: Vec<bool> = mask.data().iter().map(|&v| !v).collect();
    let mut stack: Vec<u32> = seeds
        .iter()
        .filter(|&&(x, y)| (x as usize) < w && (y as usize) < h)
        .map(|&(x, y)| (y as usize * w + x as usize) as u32)
        .collect();
    while let Some(idx) = stack.pop() {
        let i = idx as usize;
        let x = i % w;
        let y = i / w;
        mask.set_index(i, false);
        for (dx, dy) in NEIGHBOURS_8 {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                continue;
            }
            let ni = ny as usize * w + nx as usize;
            if !checked[ni] {
                checked[ni] = true;
                let v = image.value_at(ni);
                if min <= v && v <= max {
                    stack.push(ni as u32);
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// PAINT BY NUMBERS — global threshold on the footprint's sampled range
// ============================================================================

/// Select (or deselect) every pixel in the WHOLE image whose intensity falls
/// in the exact range observed under the brush footprint. Not a flood fill:
/// connectivity is irrelevant. `Ok(false)` when the footprint sampled
/// nothing.
pub fn paint_by_numbers(
    image: &ImageGrid,
    mask: &mut MaskBuffer,
    center: (i32, i32),
    size: u32,
    mode: PaintMode,
) -> Result<bool, MaskError> {
    check_extent(image, mask)?;
    let Some(sample) = sample_footprint(image, center, size) else {
        return Ok(false);
    };
    match mode {
        PaintMode::Paint => {
            for i in 0..image.data().len() {
                let v = image.value_at(i);
                if sample.min <= v && v <= sample.max {
                    mask.set_index(i, true);
                }
            }
        }
        PaintMode::Erase => {
            // keep only pixels outside the sampled range
            for i in 0..image.data().len() {
                let v = image.value_at(i);
                if !(v < sample.min || sample.max < v) {
                    mask.set_index(i, false);
                }
            }
        }
    }
    Ok(true)
}

// ============================================================================
// SEEDED REGION GROWING — tolerance-scaled interval around the footprint
// ============================================================================

/// Flood from every pixel under the brush footprint, accepting intensities
/// within a tolerance-scaled interval around the sampled range:
/// `center = (min+max)/2`, `half-width = tolerance·(max-min)/2`.
/// `Ok(false)` when the footprint sampled nothing.
pub fn grow_from_brush(
    image: &ImageGrid,
    mask: &mut MaskBuffer,
    center: (i32, i32),
    size: u32,
    tolerance: f32,
    mode: PaintMode,
) -> Result<bool, MaskError> {
    check_extent(image, mask)?;
    let Some(sample) = sample_footprint(image, center, size) else {
        return Ok(false);
    };
    let mid = (sample.max + sample.min) / 2.0;
    let half = tolerance * (sample.max - sample.min) / 2.0;
    let (lo, hi) = (mid - half, mid + half);
    match mode {
        PaintMode::Paint => region_grow_add(image, mask, &sample.seeds, lo, hi)?,
        PaintMode::Erase => region_grow_remove(image, mask, &sample.seeds, lo, hi)?,
    }
    Ok(true)
}
