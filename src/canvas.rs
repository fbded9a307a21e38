use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::history::MaskHistory;
use crate::components::tools::{
    ArrowKey, EditOutcome, Key, PointerEvent, PointerKind, PreviewShape, Tool, ToolCtx,
};

// ============================================================================
// ERRORS
// ============================================================================

/// Hard errors raised by the engine. Expected conditions (empty brush
/// footprint, no contour found, nothing to undo) are modelled as values, not
/// as errors — see the individual operations.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskError {
    /// A mask or region does not match the image extent. Checked before any
    /// mutation, so the target buffer is untouched when this is returned.
    ShapeMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },
    /// Structuring-element size outside the supported odd sizes 1..=31.
    InvalidKernel(u32),
    /// A lookup table that does not hold exactly 256 entries.
    InvalidLut(usize),
}

impl std::fmt::Display for MaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaskError::ShapeMismatch { expected, got } => write!(
                f,
                "Shape mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, got.0, got.1
            ),
            MaskError::InvalidKernel(k) => {
                write!(f, "Invalid kernel size {}: must be odd and in 1..=31", k)
            }
            MaskError::InvalidLut(n) => {
                write!(f, "Invalid LUT: expected 256 entries, got {}", n)
            }
        }
    }
}

impl std::error::Error for MaskError {}

// ============================================================================
// LOOKUP TABLE
// ============================================================================

/// A 256-entry color lookup table. Each entry is an RGB triple with
/// components in `[0, 1]`; the windowed byte value indexes into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut {
    table: Vec<[f32; 3]>,
}

impl Lut {
    pub fn new(table: Vec<[f32; 3]>) -> Result<Self, MaskError> {
        if table.len() != 256 {
            return Err(MaskError::InvalidLut(table.len()));
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &[[f32; 3]] {
        &self.table
    }

    /// Look up the display color for a windowed byte value.
    pub fn rgb(&self, index: u8) -> [u8; 3] {
        let entry = self.table[index as usize];
        [
            (entry[0].clamp(0.0, 1.0) * 255.0).round() as u8,
            (entry[1].clamp(0.0, 1.0) * 255.0).round() as u8,
            (entry[2].clamp(0.0, 1.0) * 255.0).round() as u8,
        ]
    }
}

// ============================================================================
// IMAGE GRID — the scalar raster under the mask
// ============================================================================

/// Scalar grayscale raster plus its display state. Pixel data is fixed for
/// the lifetime of a session; the window and LUT are replaced wholesale,
/// never edited in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGrid {
    width: u32,
    height: u32,
    data: Vec<f32>,
    pixel_spacing: (f32, f32),
    window_center: f32,
    window_width: f32,
    lut: Option<Lut>,
}

impl ImageGrid {
    /// Build a grid from row-major scalar data (`y * width + x` indexing).
    /// The window defaults to the full value range.
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<f32>,
        pixel_spacing: (f32, f32),
    ) -> Result<Self, MaskError> {
        if data.len() != (width as usize) * (height as usize) {
            return Err(MaskError::ShapeMismatch {
                expected: (width, height),
                got: (data.len() as u32, 1),
            });
        }
        let mut grid = Self {
            width,
            height,
            data,
            pixel_spacing,
            window_center: 0.0,
            window_width: 0.0,
            lut: None,
        };
        let (lo, hi) = grid.value_range();
        grid.window_center = (lo + hi) / 2.0;
        grid.window_width = hi - lo;
        Ok(grid)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_spacing(&self) -> (f32, f32) {
        self.pixel_spacing
    }

    /// Scalar value at `(x, y)`. Callers must stay in bounds.
    pub fn value(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Scalar value at a flat row-major index.
    pub fn value_at(&self, index: usize) -> f32 {
        self.data[index]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Minimum and maximum scalar value. `(0, 0)` for an empty grid.
    pub fn value_range(&self) -> (f32, f32) {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for &v in &self.data {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if lo > hi { (0.0, 0.0) } else { (lo, hi) }
    }

    pub fn window(&self) -> (f32, f32) {
        (self.window_center, self.window_width)
    }

    pub fn set_window(&mut self, center: f32, width: f32) {
        self.window_center = center;
        self.window_width = width;
    }

    pub fn lut(&self) -> Option<&Lut> {
        self.lut.as_ref()
    }

    pub fn set_lut(&mut self, lut: Option<Lut>) {
        self.lut = lut;
    }
}

// ============================================================================
// MASK BUFFER
// ============================================================================

/// Boolean raster marking selected pixels. Always the same extent as the
/// image grid it annotates.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskBuffer {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

/// A transient boolean raster produced by one editing gesture. Regions are
/// combined into the mask via [`MaskBuffer::combine`] and then discarded.
pub type Region = MaskBuffer;

impl MaskBuffer {
    /// An all-false mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_data(width: u32, height: u32, data: Vec<bool>) -> Result<Self, MaskError> {
        if data.len() != width as usize * height as usize {
            return Err(MaskError::ShapeMismatch {
                expected: (width, height),
                got: (data.len() as u32, 1),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel state at `(x, y)`; false outside the buffer.
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x < self.width && y < self.height {
            self.data[y as usize * self.width as usize + x as usize]
        } else {
            false
        }
    }

    /// Set a pixel; out-of-bounds writes are dropped.
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            self.data[y as usize * self.width as usize + x as usize] = value;
        }
    }

    pub(crate) fn set_index(&mut self, index: usize, value: bool) {
        self.data[index] = value;
    }

    pub fn data(&self) -> &[bool] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.fill(false);
    }

    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn same_extent(&self, other: &MaskBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Combine a gesture region into the mask. The extent is checked before
    /// any bit changes, so a mismatched region leaves the mask untouched.
    pub fn combine(&mut self, region: &Region, polarity: Polarity) -> Result<(), MaskError> {
        if !self.same_extent(region) {
            return Err(MaskError::ShapeMismatch {
                expected: self.dimensions(),
                got: region.dimensions(),
            });
        }
        match polarity {
            Polarity::Draw => {
                for (dst, &src) in self.data.iter_mut().zip(&region.data) {
                    *dst = *dst || src;
                }
            }
            Polarity::Cut => {
                for (dst, &src) in self.data.iter_mut().zip(&region.data) {
                    *dst = *dst && !src;
                }
            }
            Polarity::Catch => {
                for (dst, &src) in self.data.iter_mut().zip(&region.data) {
                    *dst = *dst && src;
                }
            }
        }
        Ok(())
    }
}

/// How a gesture region folds into the mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Polarity {
    /// Union — add the region to the mask.
    #[default]
    Draw,
    /// Difference — clear the region from the mask.
    Cut,
    /// Intersection — keep only mask pixels inside the region.
    Catch,
}

impl Polarity {
    pub fn label(&self) -> &'static str {
        match self {
            Polarity::Draw => "Draw",
            Polarity::Cut => "Cut",
            Polarity::Catch => "Catch",
        }
    }

    pub fn all() -> &'static [Polarity] {
        &[Polarity::Draw, Polarity::Cut, Polarity::Catch]
    }
}

/// Whether a brush-family tool adds to or removes from the mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PaintMode {
    #[default]
    Paint,
    Erase,
}

impl PaintMode {
    pub fn label(&self) -> &'static str {
        match self {
            PaintMode::Paint => "Paint",
            PaintMode::Erase => "Erase",
        }
    }
}

// ============================================================================
// COMPOSITING
// ============================================================================

/// Map a scalar value through the display window to a byte. Values are
/// clipped to `[center - width/2, center + width/2]` then rescaled to
/// `[0, 255]`. A non-positive width maps everything to 0.
#[inline(always)]
fn window_byte(v: f32, center: f32, width: f32) -> u8 {
    if width <= 0.0 {
        return 0;
    }
    let lo = center - width / 2.0;
    let t = ((v - lo) / width).clamp(0.0, 1.0);
    (t * 255.0).round() as u8
}

/// Composite the windowed grayscale image and the mask overlay into one RGBA
/// frame.
///
/// Opacity convention: `0.0` renders the overlay fully opaque (pure mask
/// color), `1.0` renders it fully transparent — a higher value means a more
/// transparent overlay, matching the transparency steps in
/// [`crate::components::tools::OPACITY_PRESETS`].
///
/// Pure function: recomposite after any window, LUT or mask change.
pub fn composite(
    image: &ImageGrid,
    mask: &MaskBuffer,
    mask_color: [u8; 3],
    mask_opacity: f32,
) -> Result<RgbaImage, MaskError> {
    if image.dimensions() != mask.dimensions() {
        return Err(MaskError::ShapeMismatch {
            expected: image.dimensions(),
            got: mask.dimensions(),
        });
    }
    let (w, h) = image.dimensions();
    let (center, width) = image.window();
    let opacity = mask_opacity.clamp(0.0, 1.0);
    let mut out = RgbaImage::new(w, h);
    if w == 0 || h == 0 {
        return Ok(out);
    }
    let row_bytes = w as usize * 4;
    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w as usize {
                let i = y * w as usize + x;
                let byte = window_byte(image.value_at(i), center, width);
                let mut rgb = match image.lut() {
                    Some(lut) => lut.rgb(byte),
                    None => [byte, byte, byte],
                };
                if mask.data()[i] {
                    for c in 0..3 {
                        rgb[c] = (mask_color[c] as f32 * (1.0 - opacity)
                            + rgb[c] as f32 * opacity)
                            .round() as u8;
                    }
                }
                let o = x * 4;
                row[o] = rgb[0];
                row[o + 1] = rgb[1];
                row[o + 2] = rgb[2];
                row[o + 3] = 255;
            }
        });
    Ok(out)
}

/// Render the mask alone as a translucent RGBA layer: the mask color where
/// set (alpha scaled by the opacity convention above), alpha 0 elsewhere —
/// an unmasked pixel contributes nothing when the shell stacks layers
/// itself.
pub fn mask_overlay(mask: &MaskBuffer, mask_color: [u8; 3], mask_opacity: f32) -> RgbaImage {
    let (w, h) = mask.dimensions();
    let alpha = ((1.0 - mask_opacity.clamp(0.0, 1.0)) * 255.0).round() as u8;
    let mut out = RgbaImage::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }
    let row_bytes = w as usize * 4;
    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w as usize {
                if mask.data()[y * w as usize + x] {
                    let o = x * 4;
                    row[o] = mask_color[0];
                    row[o + 1] = mask_color[1];
                    row[o + 2] = mask_color[2];
                    row[o + 3] = alpha;
                }
                // unmasked pixels stay (0, 0, 0, 0)
            }
        });
    out
}

// ============================================================================
// DISPLAY SETTINGS — view state the shell persists between sessions
// ============================================================================

/// Serializable display state: the window tuple, the LUT and the overlay
/// styling. The shell stores this alongside its own view preferences and
/// replays it onto a fresh session; pixel data never travels through here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub window_center: f32,
    pub window_width: f32,
    /// 256 RGB triples with components in `[0, 1]`, or `None` for plain
    /// grayscale.
    pub lut: Option<Vec<[f32; 3]>>,
    pub mask_color: [u8; 3],
    pub mask_opacity: f32,
}

// ============================================================================
// CANVAS SESSION — one image, one mask, one active tool
// ============================================================================

/// Owns everything one canvas edits: the image grid, the current mask, its
/// undo/redo history and the active tool. All pointer and key events for the
/// canvas are routed through here; the GUI shell maps screen coordinates to
/// image pixel coordinates before calling in.
pub struct CanvasSession {
    image: ImageGrid,
    mask: MaskBuffer,
    history: MaskHistory,
    tool: Tool,
    mask_color: [u8; 3],
    mask_opacity: f32,
    hover: Option<(i32, i32)>,
    /// Pre-edit snapshot captured at gesture start while the history is
    /// still empty; becomes the baseline version on the first commit.
    pending_baseline: Option<MaskBuffer>,
}

impl CanvasSession {
    /// Attach a session to an image with a fresh (all-false) mask layer.
    pub fn new(image: ImageGrid) -> Self {
        let mask = MaskBuffer::new(image.width(), image.height());
        Self {
            image,
            mask,
            history: MaskHistory::default(),
            tool: Tool::default(),
            mask_color: crate::components::colors::layer_color(0),
            mask_opacity: 0.75,
            hover: None,
            pending_baseline: None,
        }
    }

    /// Attach with an existing mask layer (e.g. restored by the shell's
    /// persistence collaborator). Fails on extent mismatch without building
    /// the session.
    pub fn with_mask(image: ImageGrid, mask: MaskBuffer) -> Result<Self, MaskError> {
        if image.dimensions() != mask.dimensions() {
            return Err(MaskError::ShapeMismatch {
                expected: image.dimensions(),
                got: mask.dimensions(),
            });
        }
        let mut session = Self::new(image);
        session.mask = mask;
        Ok(session)
    }

    pub fn image(&self) -> &ImageGrid {
        &self.image
    }

    pub fn mask(&self) -> &MaskBuffer {
        &self.mask
    }

    /// Replace the current mask wholesale (shape-checked). Commits one
    /// history entry so the swap is undoable.
    pub fn set_mask(&mut self, mask: MaskBuffer) -> Result<(), MaskError> {
        if !self.mask.same_extent(&mask) {
            return Err(MaskError::ShapeMismatch {
                expected: self.mask.dimensions(),
                got: mask.dimensions(),
            });
        }
        if self.history.is_empty() {
            self.history.commit(self.mask.clone());
        }
        self.mask = mask;
        self.history.commit(self.mask.clone());
        Ok(())
    }

    /// Detach the layer, handing the final mask snapshot to the caller.
    pub fn detach(self) -> MaskBuffer {
        self.mask
    }

    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    /// Pick the active tool. Any in-progress gesture of the previous tool is
    /// abandoned; tool switches never happen implicitly mid-gesture.
    pub fn set_tool(&mut self, mut tool: Tool) {
        tool.reset_gesture();
        self.tool = tool;
        self.pending_baseline = None;
    }

    pub fn mask_color(&self) -> [u8; 3] {
        self.mask_color
    }

    pub fn set_mask_color(&mut self, color: [u8; 3]) {
        self.mask_color = color;
    }

    /// Color the layer from the fixed palette (random past the end).
    pub fn set_mask_color_index(&mut self, index: usize) {
        self.mask_color = crate::components::colors::layer_color(index);
    }

    pub fn mask_opacity(&self) -> f32 {
        self.mask_opacity
    }

    pub fn set_mask_opacity(&mut self, opacity: f32) {
        self.mask_opacity = opacity.clamp(0.0, 1.0);
    }

    /// Ping-pong the overlay between mostly-opaque and mostly-transparent.
    pub fn toggle_opacity(&mut self) {
        self.mask_opacity = if self.mask_opacity <= 0.25 { 0.75 } else { 0.25 };
    }

    pub fn set_window(&mut self, center: f32, width: f32) {
        self.image.set_window(center, width);
    }

    pub fn set_lut(&mut self, lut: Option<Lut>) {
        self.image.set_lut(lut);
    }

    /// Snapshot the current display state for the shell to persist.
    pub fn display_settings(&self) -> DisplaySettings {
        let (center, width) = self.image.window();
        DisplaySettings {
            window_center: center,
            window_width: width,
            lut: self.image.lut().map(|lut| lut.table().to_vec()),
            mask_color: self.mask_color,
            mask_opacity: self.mask_opacity,
        }
    }

    /// Replay persisted display state. The LUT is validated before anything
    /// changes, so a malformed table leaves the session untouched.
    pub fn apply_display_settings(&mut self, settings: DisplaySettings) -> Result<(), MaskError> {
        let lut = settings.lut.map(Lut::new).transpose()?;
        self.image
            .set_window(settings.window_center, settings.window_width);
        self.image.set_lut(lut);
        self.mask_color = settings.mask_color;
        self.mask_opacity = settings.mask_opacity.clamp(0.0, 1.0);
        Ok(())
    }

    /// Reset to the default grayscale view of this image.
    pub fn set_default_window(&mut self) {
        let (center, width) = crate::components::colors::default_window(&self.image);
        self.image.set_window(center, width);
        self.image.set_lut(None);
    }

    /// Clear the whole mask. Commits one history entry; a silent no-op (and
    /// no entry) when the mask is already empty.
    pub fn erase_all(&mut self) -> bool {
        if self.mask.count_set() == 0 {
            return false;
        }
        if self.history.is_empty() {
            self.history.commit(self.mask.clone());
        }
        self.mask.clear();
        self.history.commit(self.mask.clone());
        true
    }

    /// Route one pointer event to the active tool.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> EditOutcome {
        let ix = event.pos.0.floor() as i32;
        let iy = event.pos.1.floor() as i32;
        self.hover = Some((ix, iy));

        // Wheel zooms regardless of the active tool; the shell applies the
        // factor to its view transform.
        if event.kind == PointerKind::Wheel {
            let factor = if event.wheel_delta < 0.0 {
                1.25
            } else {
                1.0 / 1.25
            };
            return EditOutcome::Zoom(factor);
        }
        // Right press asks the shell to show the tool's option dialog (see
        // `Tool::options`); it never starts a gesture.
        if event.kind == PointerKind::Press && event.buttons.right {
            return EditOutcome::OptionsRequested;
        }

        let Self {
            image,
            mask,
            history,
            tool,
            pending_baseline,
            ..
        } = self;
        let mut ctx = ToolCtx {
            image,
            mask,
            history,
            baseline: pending_baseline,
        };
        tool.handle_pointer(&mut ctx, event)
    }

    /// Route one key event. Arrow keys are passed through to the shell for
    /// slice navigation; everything else is ignored.
    pub fn handle_key(&mut self, key: Key) -> EditOutcome {
        match key {
            Key::ArrowLeft => EditOutcome::Arrow(ArrowKey::Left),
            Key::ArrowUp => EditOutcome::Arrow(ArrowKey::Up),
            Key::ArrowRight => EditOutcome::Arrow(ArrowKey::Right),
            Key::ArrowDown => EditOutcome::Arrow(ArrowKey::Down),
            Key::Other(_) => EditOutcome::Ignored,
        }
    }

    /// Step back one mask version. Returns false when there is nothing to
    /// undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo().cloned() {
            Some(version) => {
                self.mask = version;
                true
            }
            None => false,
        }
    }

    /// Step forward one mask version. Returns false when there is nothing to
    /// redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo().cloned() {
            Some(version) => {
                self.mask = version;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &MaskHistory {
        &self.history
    }

    /// Composite the full frame (image + mask overlay) for display.
    pub fn composite_frame(&self) -> RgbaImage {
        // Extents match by construction, so this cannot fail.
        composite(&self.image, &self.mask, self.mask_color, self.mask_opacity)
            .unwrap_or_else(|_| RgbaImage::new(self.image.width(), self.image.height()))
    }

    /// The mask overlay alone, for shells that stack layers themselves.
    pub fn overlay_frame(&self) -> RgbaImage {
        mask_overlay(&self.mask, self.mask_color, self.mask_opacity)
    }

    /// In-progress gesture geometry for the shell to draw, if any.
    pub fn preview(&self) -> Option<PreviewShape> {
        self.tool.preview()
    }

    /// Last pointer position, in integer pixel coordinates, for the shell's
    /// coordinate readout.
    pub fn hover_position(&self) -> Option<(i32, i32)> {
        self.hover
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_image(w: u32, h: u32, value: f32) -> ImageGrid {
        ImageGrid::new(w, h, vec![value; (w * h) as usize], (1.0, 1.0)).unwrap()
    }

    #[test]
    fn test_grid_rejects_wrong_data_length() {
        let err = ImageGrid::new(4, 4, vec![0.0; 15], (1.0, 1.0));
        assert!(matches!(err, Err(MaskError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_lut_length_validated() {
        assert!(Lut::new(vec![[0.0, 0.0, 0.0]; 255]).is_err());
        assert!(Lut::new(vec![[0.0, 0.0, 0.0]; 256]).is_ok());
    }

    #[test]
    fn test_window_byte_mapping() {
        // window [0, 100] maps linearly onto [0, 255]
        assert_eq!(window_byte(0.0, 50.0, 100.0), 0);
        assert_eq!(window_byte(100.0, 50.0, 100.0), 255);
        assert_eq!(window_byte(50.0, 50.0, 100.0), 128);
        // values outside the window clip
        assert_eq!(window_byte(-10.0, 50.0, 100.0), 0);
        assert_eq!(window_byte(500.0, 50.0, 100.0), 255);
        // degenerate window is opaque black
        assert_eq!(window_byte(75.0, 50.0, 0.0), 0);
        assert_eq!(window_byte(75.0, 50.0, -3.0), 0);
    }

    #[test]
    fn test_combine_polarities() {
        let mut mask = MaskBuffer::new(4, 1);
        let mut region = MaskBuffer::new(4, 1);
        region.set(1, 0, true);
        region.set(2, 0, true);

        mask.combine(&region, Polarity::Draw).unwrap();
        assert_eq!(mask.data(), &[false, true, true, false]);

        // drawing then cutting the same region restores the region's pixels
        mask.set(0, 0, true);
        mask.combine(&region, Polarity::Cut).unwrap();
        assert_eq!(mask.data(), &[true, false, false, false]);

        mask.combine(&region, Polarity::Catch).unwrap();
        assert_eq!(mask.count_set(), 0);
    }

    #[test]
    fn test_combine_shape_mismatch_leaves_mask_unchanged() {
        let mut mask = MaskBuffer::new(4, 4);
        mask.set(2, 2, true);
        let before = mask.clone();
        let region = MaskBuffer::new(3, 3);
        assert!(mask.combine(&region, Polarity::Draw).is_err());
        assert_eq!(mask, before);
    }

    #[test]
    fn test_composite_opacity_endpoints() {
        let mut image = flat_image(2, 1, 100.0);
        // window [0, 200]: value 100 maps to byte 128
        image.set_window(100.0, 200.0);
        let mut mask = MaskBuffer::new(2, 1);
        mask.set(0, 0, true);

        // opacity 0 = pure mask color
        let frame = composite(&image, &mask, [255, 0, 0], 0.0).unwrap();
        assert_eq!(frame.get_pixel(0, 0).0, [255, 0, 0, 255]);
        // opacity 1 = fully transparent overlay
        let frame = composite(&image, &mask, [255, 0, 0], 1.0).unwrap();
        assert_eq!(frame.get_pixel(0, 0).0, [128, 128, 128, 255]);
        // unmasked pixel is plain grayscale either way
        assert_eq!(frame.get_pixel(1, 0).0, [128, 128, 128, 255]);
    }

    #[test]
    fn test_composite_applies_lut() {
        let mut image = flat_image(1, 1, 50.0);
        image.set_window(50.0, 100.0); // byte 128
        let mut table = vec![[0.0, 0.0, 0.0]; 256];
        table[128] = [1.0, 0.5, 0.0];
        image.set_lut(Some(Lut::new(table).unwrap()));
        let mask = MaskBuffer::new(1, 1);
        let frame = composite(&image, &mask, [0, 255, 0], 1.0).unwrap();
        assert_eq!(frame.get_pixel(0, 0).0, [255, 128, 0, 255]);
    }

    #[test]
    fn test_composite_shape_mismatch() {
        let image = flat_image(4, 4, 0.0);
        let mask = MaskBuffer::new(3, 4);
        assert!(composite(&image, &mask, [255, 0, 0], 0.5).is_err());
    }

    #[test]
    fn test_mask_overlay_alpha() {
        let mut mask = MaskBuffer::new(2, 1);
        mask.set(0, 0, true);
        let overlay = mask_overlay(&mask, [0, 255, 0], 0.75);
        assert_eq!(overlay.get_pixel(0, 0).0, [0, 255, 0, 64]);
        // unmasked pixel carries zero alpha
        assert_eq!(overlay.get_pixel(1, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_session_attach_rejects_mismatched_mask() {
        let image = flat_image(4, 4, 0.0);
        let mask = MaskBuffer::new(5, 4);
        assert!(CanvasSession::with_mask(image, mask).is_err());
    }

    #[test]
    fn test_session_erase_all_is_undoable() {
        let image = flat_image(4, 4, 0.0);
        let mut mask = MaskBuffer::new(4, 4);
        mask.set(1, 1, true);
        let mut session = CanvasSession::with_mask(image, mask).unwrap();

        assert!(session.erase_all());
        assert_eq!(session.mask().count_set(), 0);
        // second erase on an empty mask is a silent no-op
        assert!(!session.erase_all());

        assert!(session.can_undo());
        assert!(session.undo());
        assert_eq!(session.mask().count_set(), 1);
        assert!(session.redo());
        assert_eq!(session.mask().count_set(), 0);
    }

    #[test]
    fn test_display_settings_round_trip() {
        let mut session = CanvasSession::new(flat_image(4, 4, 50.0));
        session.set_window(60.0, 80.0);
        session.set_lut(Some(Lut::new(vec![[0.5, 0.5, 0.5]; 256]).unwrap()));
        session.set_mask_color([0, 0, 255]);
        session.set_mask_opacity(0.4);

        let settings = session.display_settings();
        let mut restored = CanvasSession::new(flat_image(4, 4, 50.0));
        restored.apply_display_settings(settings).unwrap();
        assert_eq!(restored.image().window(), (60.0, 80.0));
        assert_eq!(restored.mask_color(), [0, 0, 255]);
        assert_eq!(restored.mask_opacity(), 0.4);
        assert!(restored.image().lut().is_some());
    }

    #[test]
    fn test_display_settings_bad_lut_rejected() {
        let mut session = CanvasSession::new(flat_image(4, 4, 50.0));
        let before = session.display_settings();
        let bad = DisplaySettings {
            window_center: 1.0,
            window_width: 2.0,
            lut: Some(vec![[0.0, 0.0, 0.0]; 100]),
            mask_color: [1, 2, 3],
            mask_opacity: 0.5,
        };
        assert!(matches!(
            session.apply_display_settings(bad),
            Err(MaskError::InvalidLut(100))
        ));
        // nothing changed on the failed apply
        assert_eq!(session.display_settings(), before);
    }

    #[test]
    fn test_toggle_opacity_ping_pong() {
        let mut session = CanvasSession::new(flat_image(2, 2, 0.0));
        assert_eq!(session.mask_opacity(), 0.75);
        session.toggle_opacity();
        assert_eq!(session.mask_opacity(), 0.25);
        session.toggle_opacity();
        assert_eq!(session.mask_opacity(), 0.75);
    }

    #[test]
    fn test_arrow_keys_pass_through() {
        let mut session = CanvasSession::new(flat_image(2, 2, 0.0));
        assert_eq!(
            session.handle_key(Key::ArrowLeft),
            EditOutcome::Arrow(ArrowKey::Left)
        );
        assert_eq!(session.handle_key(Key::Other(65)), EditOutcome::Ignored);
    }
}
