use serde::{Deserialize, Serialize};

use crate::canvas::{ImageGrid, MaskBuffer, PaintMode, Polarity, Region};
use crate::components::history::MaskHistory;
use crate::ops::{contour, grow, morphology, shapes};
use crate::{log_err, log_info};

// ============================================================================
// POINTER / KEY EVENTS — delivered by the input collaborator in image pixel
// coordinates; the engine performs no coordinate transforms itself.
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerKind {
    Press,
    Move,
    Release,
    Hover,
    DoubleClick,
    Wheel,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Buttons {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    /// Position in image pixel coordinates.
    pub pos: (f32, f32),
    pub buttons: Buttons,
    pub modifiers: Modifiers,
    /// Scroll amount; only meaningful for `Wheel` events.
    pub wheel_delta: f32,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, pos: (f32, f32)) -> Self {
        Self {
            kind,
            pos,
            buttons: Buttons::default(),
            modifiers: Modifiers::default(),
            wheel_delta: 0.0,
        }
    }

    /// A left-button press.
    pub fn press(pos: (f32, f32)) -> Self {
        let mut ev = Self::new(PointerKind::Press, pos);
        ev.buttons.left = true;
        ev
    }

    /// A move with the left button held.
    pub fn drag(pos: (f32, f32)) -> Self {
        let mut ev = Self::new(PointerKind::Move, pos);
        ev.buttons.left = true;
        ev
    }

    /// A move with no buttons held.
    pub fn moved(pos: (f32, f32)) -> Self {
        Self::new(PointerKind::Move, pos)
    }

    pub fn release(pos: (f32, f32)) -> Self {
        Self::new(PointerKind::Release, pos)
    }

    pub fn hover(pos: (f32, f32)) -> Self {
        Self::new(PointerKind::Hover, pos)
    }

    pub fn double_click(pos: (f32, f32)) -> Self {
        let mut ev = Self::new(PointerKind::DoubleClick, pos);
        ev.buttons.left = true;
        ev
    }

    pub fn wheel(pos: (f32, f32), delta: f32) -> Self {
        let mut ev = Self::new(PointerKind::Wheel, pos);
        ev.wheel_delta = delta;
        ev
    }
}

/// Key events from the input collaborator. Only the arrow keys carry
/// meaning; everything else arrives as a raw code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowUp,
    ArrowRight,
    ArrowDown,
    Other(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrowKey {
    Left,
    Up,
    Right,
    Down,
}

// ============================================================================
// OUTCOMES — what one dispatched event did
// ============================================================================

/// Result of routing one event through the active tool. `MaskEdited` means
/// the mask changed (recomposite); a history entry exists once the gesture
/// completes. The zoom/pan/arrow variants are requests for the shell, which
/// owns the view transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EditOutcome {
    Ignored,
    /// Update the coordinate readout.
    Hover { x: i32, y: i32 },
    /// The in-progress gesture preview changed; redraw it (see
    /// [`Tool::preview`]).
    PreviewChanged,
    /// The mask changed; recomposite.
    MaskEdited,
    /// The display window changed; recomposite.
    WindowChanged,
    /// Scale the view by this factor.
    Zoom(f32),
    /// Scroll the view by this delta (image pixels).
    Pan { dx: f32, dy: f32 },
    /// Show the active tool's option dialog (see [`Tool::options`]).
    OptionsRequested,
    /// The contour picker ran but nothing qualified; the mask is unchanged.
    NoRegionFound,
    /// Arrow key pass-through for slice navigation.
    Arrow(ArrowKey),
}

// ============================================================================
// TOOL OPTIONS — field specs for the shell's generic option dialog
// ============================================================================

pub const BRUSH_SIZE_PRESETS: [u32; 8] = [1, 3, 5, 7, 9, 11, 21, 31];
pub const KERNEL_SIZE_PRESETS: [u32; 8] = [1, 3, 5, 7, 9, 11, 21, 31];
pub const TOLERANCE_PRESETS: [f32; 10] =
    [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
/// Overlay transparency steps: 0.0 = opaque overlay, 1.0 = invisible.
pub const OPACITY_PRESETS: [f32; 7] = [0.0, 0.10, 0.25, 0.50, 0.75, 0.90, 1.0];

/// One input field of a tool's option dialog. The engine describes the
/// field; the shell renders it and hands the chosen value back through
/// [`Tool::set_option`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionField {
    pub label: String,
    pub kind: OptionKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OptionKind {
    /// Pick one of a fixed set of integer presets.
    IntChoice { presets: Vec<u32>, value: u32 },
    /// A bounded float.
    Float { min: f32, max: f32, value: f32 },
    /// Pick one of a list of labelled alternatives.
    Choice { options: Vec<String>, value: usize },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    Int(u32),
    Float(f32),
    Choice(usize),
}

impl OptionField {
    fn int_choice(label: &str, presets: &[u32], value: u32) -> Self {
        Self {
            label: label.to_string(),
            kind: OptionKind::IntChoice {
                presets: presets.to_vec(),
                value,
            },
        }
    }

    fn float(label: &str, min: f32, max: f32, value: f32) -> Self {
        Self {
            label: label.to_string(),
            kind: OptionKind::Float { min, max, value },
        }
    }

    fn choice(label: &str, options: Vec<String>, value: usize) -> Self {
        Self {
            label: label.to_string(),
            kind: OptionKind::Choice { options, value },
        }
    }
}

// ============================================================================
// TOOL CONTEXT — the buffers a tool may touch during dispatch
// ============================================================================

/// Borrows of exactly the session state a tool needs while handling one
/// event. Built by the session per dispatch; tools never reach upward into
/// shared canvas state.
pub struct ToolCtx<'a> {
    pub(crate) image: &'a mut ImageGrid,
    pub(crate) mask: &'a mut MaskBuffer,
    pub(crate) history: &'a mut MaskHistory,
    /// Pre-edit snapshot slot, populated at gesture start while the history
    /// is still empty.
    pub(crate) baseline: &'a mut Option<MaskBuffer>,
}

impl ToolCtx<'_> {
    /// Call before the first mutation of a gesture. While the history is
    /// empty this captures the pre-edit mask, which becomes the baseline
    /// version on the first commit.
    fn begin_gesture(&mut self) {
        if self.history.is_empty() && self.baseline.is_none() {
            *self.baseline = Some(self.mask.clone());
        }
    }

    /// Record the completed gesture in the history.
    fn commit_gesture(&mut self) {
        if self.history.is_empty() {
            if let Some(base) = self.baseline.take() {
                self.history.commit(base);
            }
        }
        *self.baseline = None;
        self.history.commit(self.mask.clone());
    }

    /// Combine a finished gesture region and commit in one step.
    fn commit_region(&mut self, region: &Region, polarity: Polarity) -> EditOutcome {
        self.begin_gesture();
        match self.mask.combine(region, polarity) {
            Ok(()) => {
                self.commit_gesture();
                EditOutcome::MaskEdited
            }
            Err(err) => {
                log_err!("gesture region rejected: {}", err);
                EditOutcome::Ignored
            }
        }
    }
}

fn int_pos(ev: PointerEvent) -> (i32, i32) {
    (ev.pos.0.floor() as i32, ev.pos.1.floor() as i32)
}

fn hover_outcome(ev: PointerEvent) -> EditOutcome {
    let (x, y) = int_pos(ev);
    EditOutcome::Hover { x, y }
}

/// Paint the square brush footprint; returns whether any in-bounds pixel
/// was touched (an entirely off-grid footprint is a silent no-op).
fn paint_footprint(mask: &mut MaskBuffer, center: (i32, i32), size: u32, value: bool) -> bool {
    let reach = (size.max(1) as i32 - 1) / 2;
    let (w, h) = mask.dimensions();
    let mut touched = false;
    for x in (center.0 - reach)..=(center.0 + reach) {
        if x < 0 || x as u32 >= w {
            continue;
        }
        for y in (center.1 - reach)..=(center.1 + reach) {
            if y < 0 || y as u32 >= h {
                continue;
            }
            mask.set(x as u32, y as u32, value);
            touched = true;
        }
    }
    touched
}

// ============================================================================
// PREVIEW GEOMETRY — drawn by the shell, never rasterized into the mask
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum PreviewShape {
    /// Freehand/polygon boundary; the closing edge back to the first point
    /// is implied.
    Path { points: Vec<(f32, f32)> },
    Rect { min: (f32, f32), max: (f32, f32) },
    Circle { center: (f32, f32), radius: f32 },
    /// Square brush outline around the pointer.
    Brush { center: (i32, i32), size: u32 },
}

// ============================================================================
// PER-TOOL STATE
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct PanState {
    dragging: bool,
    last: (f32, f32),
}

#[derive(Clone, Debug, Default)]
pub struct WindowLevelState {
    dragging: bool,
    last: (f32, f32),
    /// Intensity range of the image, sampled once on first use.
    range: Option<(f32, f32)>,
}

#[derive(Clone, Debug, Default)]
pub struct ThresholdState {
    center: f32,
    width: f32,
    vmin: f32,
    vmax: f32,
    armed: bool,
    dragging: bool,
    last: (f32, f32),
    dirty: bool,
}

/// Shared state of the plain brush and the paint-by-numbers brush.
#[derive(Clone, Debug)]
pub struct BrushState {
    pub mode: PaintMode,
    pub size: u32,
    cursor: Option<(i32, i32)>,
    stroking: bool,
    dirty: bool,
}

impl BrushState {
    pub fn new(mode: PaintMode) -> Self {
        Self {
            mode,
            size: 3,
            cursor: None,
            stroking: false,
            dirty: false,
        }
    }
}

impl Default for BrushState {
    fn default() -> Self {
        Self::new(PaintMode::Paint)
    }
}

#[derive(Clone, Debug)]
pub struct GrowToolState {
    pub mode: PaintMode,
    /// Seed footprint side in pixels.
    pub size: u32,
    pub tolerance: f32,
    cursor: Option<(i32, i32)>,
    stroking: bool,
    dirty: bool,
}

impl GrowToolState {
    pub fn new(mode: PaintMode) -> Self {
        Self {
            mode,
            size: 3,
            tolerance: 5.0,
            cursor: None,
            stroking: false,
            dirty: false,
        }
    }
}

impl Default for GrowToolState {
    fn default() -> Self {
        Self::new(PaintMode::Paint)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PenShape {
    #[default]
    Freehand,
    Polygon,
    Rectangle,
    Circle,
}

impl PenShape {
    pub fn label(&self) -> &'static str {
        match self {
            PenShape::Freehand => "Freehand",
            PenShape::Polygon => "Polygon",
            PenShape::Rectangle => "Rectangle",
            PenShape::Circle => "Circle",
        }
    }

    pub fn all() -> &'static [PenShape] {
        &[
            PenShape::Freehand,
            PenShape::Polygon,
            PenShape::Rectangle,
            PenShape::Circle,
        ]
    }

    fn index(&self) -> usize {
        match self {
            PenShape::Freehand => 0,
            PenShape::Polygon => 1,
            PenShape::Rectangle => 2,
            PenShape::Circle => 3,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PenState {
    pub shape: PenShape,
    pub polarity: Polarity,
    /// Freehand stroke / polygon vertices (polygon keeps a floating last
    /// vertex that tracks the pointer).
    path: Vec<(f32, f32)>,
    /// Rectangle first corner / circle center.
    anchor: Option<(f32, f32)>,
    /// Rectangle drag corner.
    corner: Option<(f32, f32)>,
    radius: f32,
}

impl PenState {
    pub fn new(shape: PenShape, polarity: Polarity) -> Self {
        Self {
            shape,
            polarity,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct MorphToolState {
    pub kernel_size: u32,
}

impl Default for MorphToolState {
    fn default() -> Self {
        Self { kernel_size: 3 }
    }
}

// ============================================================================
// THE TOOL — closed sum type dispatched by pattern matching
// ============================================================================

/// The active editing tool. Exactly one is active per canvas; switching
/// happens only through an explicit pick, never mid-gesture. Option values
/// (sizes, tolerance) persist across gestures; in-progress gesture state is
/// reset between gestures.
#[derive(Clone, Debug)]
pub enum Tool {
    Pan(PanState),
    Zoom,
    WindowLevel(WindowLevelState),
    Threshold(ThresholdState),
    Brush(BrushState),
    PaintByNumbers(BrushState),
    RegionGrow(GrowToolState),
    Pen(PenState),
    Dilate(MorphToolState),
    Shrink(MorphToolState),
    ContourPick,
}

impl Default for Tool {
    fn default() -> Self {
        Tool::Pan(PanState::default())
    }
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pan(_) => "Pan",
            Tool::Zoom => "Zoom",
            Tool::WindowLevel(_) => "Window/level",
            Tool::Threshold(_) => "Threshold",
            Tool::Brush(s) => match s.mode {
                PaintMode::Paint => "Paint brush",
                PaintMode::Erase => "Eraser",
            },
            Tool::PaintByNumbers(s) => match s.mode {
                PaintMode::Paint => "Paint by numbers",
                PaintMode::Erase => "Erase by numbers",
            },
            Tool::RegionGrow(s) => match s.mode {
                PaintMode::Paint => "Paint by growing",
                PaintMode::Erase => "Erase by growing",
            },
            Tool::Pen(s) => s.polarity.label(),
            Tool::Dilate(_) => "Dilate",
            Tool::Shrink(_) => "Shrink",
            Tool::ContourPick => "Contour picker",
        }
    }

    /// The default tool roster, in toolbar order.
    pub fn default_tools() -> Vec<Tool> {
        vec![
            Tool::Pan(PanState::default()),
            Tool::Zoom,
            Tool::WindowLevel(WindowLevelState::default()),
            Tool::Threshold(ThresholdState::default()),
            Tool::Brush(BrushState::new(PaintMode::Paint)),
            Tool::PaintByNumbers(BrushState::new(PaintMode::Paint)),
            Tool::RegionGrow(GrowToolState::new(PaintMode::Paint)),
            Tool::Brush(BrushState::new(PaintMode::Erase)),
            Tool::PaintByNumbers(BrushState::new(PaintMode::Erase)),
            Tool::RegionGrow(GrowToolState::new(PaintMode::Erase)),
            Tool::Pen(PenState::new(PenShape::Freehand, Polarity::Draw)),
            Tool::Pen(PenState::new(PenShape::Freehand, Polarity::Cut)),
            Tool::Pen(PenState::new(PenShape::Freehand, Polarity::Catch)),
            Tool::Dilate(MorphToolState::default()),
            Tool::Shrink(MorphToolState::default()),
            Tool::ContourPick,
        ]
    }

    /// Abandon any in-progress gesture. Option values are kept.
    pub fn reset_gesture(&mut self) {
        match self {
            Tool::Pan(s) => s.dragging = false,
            Tool::WindowLevel(s) => s.dragging = false,
            Tool::Threshold(s) => {
                s.dragging = false;
                s.dirty = false;
            }
            Tool::Brush(s) | Tool::PaintByNumbers(s) => {
                s.stroking = false;
                s.dirty = false;
                s.cursor = None;
            }
            Tool::RegionGrow(s) => {
                s.stroking = false;
                s.dirty = false;
                s.cursor = None;
            }
            Tool::Pen(s) => {
                s.path.clear();
                s.anchor = None;
                s.corner = None;
                s.radius = 0.0;
            }
            Tool::Zoom | Tool::Dilate(_) | Tool::Shrink(_) | Tool::ContourPick => {}
        }
    }

    /// Field specs for the tool's option dialog, rendered by the shell.
    pub fn options(&self) -> Vec<OptionField> {
        match self {
            Tool::Brush(s) | Tool::PaintByNumbers(s) => {
                vec![OptionField::int_choice("Brush size", &BRUSH_SIZE_PRESETS, s.size)]
            }
            Tool::RegionGrow(s) => vec![
                OptionField::int_choice("Seed size", &BRUSH_SIZE_PRESETS, s.size),
                OptionField::float("Tolerance", 1.0, 10.0, s.tolerance),
            ],
            Tool::Pen(s) => vec![OptionField::choice(
                "Shape",
                PenShape::all().iter().map(|p| p.label().to_string()).collect(),
                s.shape.index(),
            )],
            Tool::Dilate(s) | Tool::Shrink(s) => vec![OptionField::int_choice(
                "Kernel size",
                &KERNEL_SIZE_PRESETS,
                s.kernel_size,
            )],
            _ => Vec::new(),
        }
    }

    /// Apply one option value collected by the shell. Returns false when the
    /// field index or value does not fit the tool.
    pub fn set_option(&mut self, field: usize, value: OptionValue) -> bool {
        match (self, field, value) {
            (Tool::Brush(s) | Tool::PaintByNumbers(s), 0, OptionValue::Int(v)) => {
                s.size = v.clamp(1, 31);
                true
            }
            (Tool::RegionGrow(s), 0, OptionValue::Int(v)) => {
                s.size = v.clamp(1, 31);
                true
            }
            (Tool::RegionGrow(s), 1, OptionValue::Float(v)) => {
                s.tolerance = v.clamp(1.0, 10.0);
                true
            }
            (Tool::Pen(s), 0, OptionValue::Choice(i)) => match PenShape::all().get(i) {
                Some(shape) => {
                    s.shape = *shape;
                    s.path.clear();
                    s.anchor = None;
                    s.corner = None;
                    true
                }
                None => false,
            },
            (Tool::Dilate(s) | Tool::Shrink(s), 0, OptionValue::Int(v)) => {
                if morphology::validate_kernel(v).is_ok() {
                    s.kernel_size = v;
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// In-progress gesture geometry for the shell to draw.
    pub fn preview(&self) -> Option<PreviewShape> {
        match self {
            Tool::Brush(s) | Tool::PaintByNumbers(s) => s.cursor.map(|center| {
                PreviewShape::Brush {
                    center,
                    size: s.size,
                }
            }),
            Tool::RegionGrow(s) => s.cursor.map(|center| PreviewShape::Brush {
                center,
                size: s.size,
            }),
            Tool::Pen(s) => s.preview(),
            _ => None,
        }
    }

    pub(crate) fn handle_pointer(&mut self, ctx: &mut ToolCtx<'_>, ev: PointerEvent) -> EditOutcome {
        match self {
            Tool::Pan(s) => s.handle(ev),
            Tool::Zoom => handle_zoom(ev),
            Tool::WindowLevel(s) => s.handle(ctx, ev),
            Tool::Threshold(s) => s.handle(ctx, ev),
            Tool::Brush(s) => s.handle_brush(ctx, ev),
            Tool::PaintByNumbers(s) => s.handle_by_numbers(ctx, ev),
            Tool::RegionGrow(s) => s.handle(ctx, ev),
            Tool::Pen(s) => s.handle(ctx, ev),
            Tool::Dilate(s) => s.handle(ctx, ev, false),
            Tool::Shrink(s) => s.handle(ctx, ev, true),
            Tool::ContourPick => handle_contour_pick(ctx, ev),
        }
    }
}

// ============================================================================
// PER-TOOL DISPATCH
// ============================================================================

impl PanState {
    fn handle(&mut self, ev: PointerEvent) -> EditOutcome {
        match ev.kind {
            PointerKind::Press if ev.buttons.left => {
                self.dragging = true;
                self.last = ev.pos;
                EditOutcome::Ignored
            }
            PointerKind::Move if ev.buttons.left && self.dragging => {
                let dx = ev.pos.0 - self.last.0;
                let dy = ev.pos.1 - self.last.1;
                self.last = ev.pos;
                EditOutcome::Pan { dx, dy }
            }
            PointerKind::Release => {
                self.dragging = false;
                EditOutcome::Ignored
            }
            PointerKind::Hover | PointerKind::Move => hover_outcome(ev),
            _ => EditOutcome::Ignored,
        }
    }
}

/// Click to double the view scale, shift-click to halve it. Fine steps come
/// from the wheel, which every tool forwards as a zoom.
fn handle_zoom(ev: PointerEvent) -> EditOutcome {
    match ev.kind {
        PointerKind::Press if ev.buttons.left => {
            EditOutcome::Zoom(if ev.modifiers.shift { 0.5 } else { 2.0 })
        }
        PointerKind::Hover | PointerKind::Move => hover_outcome(ev),
        _ => EditOutcome::Ignored,
    }
}

impl WindowLevelState {
    fn handle(&mut self, ctx: &mut ToolCtx<'_>, ev: PointerEvent) -> EditOutcome {
        match ev.kind {
            PointerKind::Press if ev.buttons.left => {
                self.dragging = true;
                self.last = ev.pos;
                if self.range.is_none() {
                    self.range = Some(ctx.image.value_range());
                }
                EditOutcome::Ignored
            }
            PointerKind::Move if ev.buttons.left && self.dragging => {
                let dx = ev.pos.0 - self.last.0;
                let dy = ev.pos.1 - self.last.1;
                self.last = ev.pos;
                let (lo, hi) = self.range.unwrap_or_else(|| ctx.image.value_range());
                let full = hi - lo;
                let (mut center, mut width) = ctx.image.window();
                // speed grows away from the range midpoint / with the width
                let vy = full / 1024.0 + (center - (lo + full / 2.0)).abs() / 256.0;
                center += vy * dy;
                let vx = full / 512.0 + width / 64.0;
                width -= vx * dx;
                if width < 1.0 {
                    width = 1.0;
                }
                ctx.image.set_window(center, width);
                EditOutcome::WindowChanged
            }
            PointerKind::Release => {
                self.dragging = false;
                EditOutcome::Ignored
            }
            PointerKind::Hover | PointerKind::Move => hover_outcome(ev),
            _ => EditOutcome::Ignored,
        }
    }
}

impl ThresholdState {
    fn handle(&mut self, ctx: &mut ToolCtx<'_>, ev: PointerEvent) -> EditOutcome {
        match ev.kind {
            PointerKind::Press if ev.buttons.left => {
                ctx.begin_gesture();
                if !self.armed {
                    let (center, width) = ctx.image.window();
                    let (lo, hi) = ctx.image.value_range();
                    self.center = center;
                    self.width = width;
                    self.vmin = lo;
                    self.vmax = hi;
                    self.armed = true;
                }
                self.dragging = true;
                self.last = ev.pos;
                self.apply(ctx);
                EditOutcome::MaskEdited
            }
            PointerKind::Move if ev.buttons.left && self.dragging => {
                let dx = ev.pos.0 - self.last.0;
                let dy = ev.pos.1 - self.last.1;
                self.last = ev.pos;
                self.adjust(dx, dy);
                self.apply(ctx);
                EditOutcome::MaskEdited
            }
            PointerKind::Release => {
                if self.dragging {
                    self.dragging = false;
                    if std::mem::take(&mut self.dirty) {
                        ctx.commit_gesture();
                        return EditOutcome::MaskEdited;
                    }
                }
                EditOutcome::Ignored
            }
            PointerKind::Hover | PointerKind::Move => hover_outcome(ev),
            _ => EditOutcome::Ignored,
        }
    }

    fn adjust(&mut self, dx: f32, dy: f32) {
        let range = self.vmax - self.vmin;
        let v0 = range / 512.0;
        let vy = v0 + (self.center - (self.vmin + range / 2.0)).abs() / 64.0;
        self.center -= vy * dy;
        let vx = v0 + self.width / 64.0;
        self.width += vx * dx;
        if self.width < 1.0 {
            self.width = 1.0;
        }
    }

    /// Replace the whole mask with the in-window intensity set.
    fn apply(&mut self, ctx: &mut ToolCtx<'_>) {
        let lo = self.center - self.width / 2.0;
        let hi = self.center + self.width / 2.0;
        for i in 0..ctx.image.data().len() {
            let v = ctx.image.value_at(i);
            ctx.mask.set_index(i, lo <= v && v <= hi);
        }
        self.dirty = true;
    }
}

impl BrushState {
    fn handle_brush(&mut self, ctx: &mut ToolCtx<'_>, ev: PointerEvent) -> EditOutcome {
        let pos = int_pos(ev);
        match ev.kind {
            PointerKind::Press if ev.buttons.left => {
                ctx.begin_gesture();
                self.stroking = true;
                self.cursor = Some(pos);
                if paint_footprint(ctx.mask, pos, self.size, self.mode == PaintMode::Paint) {
                    self.dirty = true;
                    EditOutcome::MaskEdited
                } else {
                    EditOutcome::Ignored
                }
            }
            PointerKind::Move => {
                self.cursor = Some(pos);
                if ev.buttons.left && self.stroking {
                    if paint_footprint(ctx.mask, pos, self.size, self.mode == PaintMode::Paint) {
                        self.dirty = true;
                        EditOutcome::MaskEdited
                    } else {
                        EditOutcome::Ignored
                    }
                } else {
                    hover_outcome(ev)
                }
            }
            PointerKind::Release => {
                if self.stroking {
                    self.stroking = false;
                    if std::mem::take(&mut self.dirty) {
                        ctx.commit_gesture();
                        return EditOutcome::MaskEdited;
                    }
                }
                EditOutcome::Ignored
            }
            PointerKind::Hover => {
                self.cursor = Some(pos);
                hover_outcome(ev)
            }
            _ => EditOutcome::Ignored,
        }
    }

    fn handle_by_numbers(&mut self, ctx: &mut ToolCtx<'_>, ev: PointerEvent) -> EditOutcome {
        let pos = int_pos(ev);
        match ev.kind {
            PointerKind::Press if ev.buttons.left => {
                ctx.begin_gesture();
                self.stroking = true;
                self.cursor = Some(pos);
                self.run(ctx, pos)
            }
            PointerKind::Move => {
                self.cursor = Some(pos);
                if ev.buttons.left && self.stroking {
                    self.run(ctx, pos)
                } else {
                    hover_outcome(ev)
                }
            }
            PointerKind::Release => {
                if self.stroking {
                    self.stroking = false;
                    if std::mem::take(&mut self.dirty) {
                        ctx.commit_gesture();
                        return EditOutcome::MaskEdited;
                    }
                }
                EditOutcome::Ignored
            }
            PointerKind::Hover => {
                self.cursor = Some(pos);
                hover_outcome(ev)
            }
            _ => EditOutcome::Ignored,
        }
    }

    fn run(&mut self, ctx: &mut ToolCtx<'_>, pos: (i32, i32)) -> EditOutcome {
        match grow::paint_by_numbers(ctx.image, ctx.mask, pos, self.size, self.mode) {
            Ok(true) => {
                self.dirty = true;
                EditOutcome::MaskEdited
            }
            Ok(false) => EditOutcome::Ignored,
            Err(err) => {
                log_err!("paint by numbers failed: {}", err);
                EditOutcome::Ignored
            }
        }
    }
}

impl GrowToolState {
    fn handle(&mut self, ctx: &mut ToolCtx<'_>, ev: PointerEvent) -> EditOutcome {
        let pos = int_pos(ev);
        match ev.kind {
            PointerKind::Press if ev.buttons.left => {
                ctx.begin_gesture();
                self.stroking = true;
                self.cursor = Some(pos);
                self.run(ctx, pos)
            }
            PointerKind::Move => {
                self.cursor = Some(pos);
                if ev.buttons.left && self.stroking {
                    self.run(ctx, pos)
                } else {
                    hover_outcome(ev)
                }
            }
            PointerKind::Release => {
                if self.stroking {
                    self.stroking = false;
                    if std::mem::take(&mut self.dirty) {
                        ctx.commit_gesture();
                        return EditOutcome::MaskEdited;
                    }
                }
                EditOutcome::Ignored
            }
            PointerKind::Hover => {
                self.cursor = Some(pos);
                hover_outcome(ev)
            }
            _ => EditOutcome::Ignored,
        }
    }

    fn run(&mut self, ctx: &mut ToolCtx<'_>, pos: (i32, i32)) -> EditOutcome {
        match grow::grow_from_brush(ctx.image, ctx.mask, pos, self.size, self.tolerance, self.mode)
        {
            Ok(true) => {
                self.dirty = true;
                EditOutcome::MaskEdited
            }
            Ok(false) => EditOutcome::Ignored,
            Err(err) => {
                log_err!("region growing failed: {}", err);
                EditOutcome::Ignored
            }
        }
    }
}

impl PenState {
    fn preview(&self) -> Option<PreviewShape> {
        match self.shape {
            PenShape::Freehand | PenShape::Polygon => {
                if self.path.len() >= 2 {
                    Some(PreviewShape::Path {
                        points: self.path.clone(),
                    })
                } else {
                    None
                }
            }
            PenShape::Rectangle => match (self.anchor, self.corner) {
                (Some(a), Some(c)) => Some(PreviewShape::Rect {
                    min: (a.0.min(c.0), a.1.min(c.1)),
                    max: (a.0.max(c.0), a.1.max(c.1)),
                }),
                _ => None,
            },
            PenShape::Circle => self.anchor.map(|center| PreviewShape::Circle {
                center,
                radius: self.radius,
            }),
        }
    }

    fn handle(&mut self, ctx: &mut ToolCtx<'_>, ev: PointerEvent) -> EditOutcome {
        match self.shape {
            PenShape::Freehand => self.handle_freehand(ctx, ev),
            PenShape::Polygon => self.handle_polygon(ctx, ev),
            PenShape::Rectangle => self.handle_rectangle(ctx, ev),
            PenShape::Circle => self.handle_circle(ctx, ev),
        }
    }

    fn handle_freehand(&mut self, ctx: &mut ToolCtx<'_>, ev: PointerEvent) -> EditOutcome {
        match ev.kind {
            PointerKind::Press if ev.buttons.left => {
                self.path = vec![ev.pos];
                EditOutcome::PreviewChanged
            }
            PointerKind::Move if ev.buttons.left && !self.path.is_empty() => {
                if self.path.last() != Some(&ev.pos) {
                    self.path.push(ev.pos);
                }
                EditOutcome::PreviewChanged
            }
            PointerKind::Release => {
                if self.path.is_empty() {
                    return EditOutcome::Ignored;
                }
                let path = std::mem::take(&mut self.path);
                if path.len() < 3 {
                    return EditOutcome::Ignored;
                }
                let (w, h) = ctx.mask.dimensions();
                let region = shapes::fill_polygon(&path, w, h);
                ctx.commit_region(&region, self.polarity)
            }
            PointerKind::Hover | PointerKind::Move => hover_outcome(ev),
            _ => EditOutcome::Ignored,
        }
    }

    fn handle_polygon(&mut self, ctx: &mut ToolCtx<'_>, ev: PointerEvent) -> EditOutcome {
        match ev.kind {
            PointerKind::Press if ev.buttons.left => {
                if self.path.is_empty() {
                    // anchor plus a floating vertex that tracks the pointer
                    self.path = vec![ev.pos, ev.pos];
                } else {
                    let n = self.path.len();
                    self.path[n - 1] = ev.pos;
                    self.path.push(ev.pos);
                }
                EditOutcome::PreviewChanged
            }
            PointerKind::Hover | PointerKind::Move => {
                if let Some(last) = self.path.last_mut() {
                    *last = ev.pos;
                    EditOutcome::PreviewChanged
                } else {
                    hover_outcome(ev)
                }
            }
            PointerKind::DoubleClick if ev.buttons.left => {
                if self.path.is_empty() {
                    return EditOutcome::Ignored;
                }
                let n = self.path.len();
                self.path[n - 1] = ev.pos;
                let path = std::mem::take(&mut self.path);
                if path.len() < 3 {
                    return EditOutcome::Ignored;
                }
                let (w, h) = ctx.mask.dimensions();
                let region = shapes::fill_polygon(&path, w, h);
                ctx.commit_region(&region, self.polarity)
            }
            _ => EditOutcome::Ignored,
        }
    }

    fn handle_rectangle(&mut self, ctx: &mut ToolCtx<'_>, ev: PointerEvent) -> EditOutcome {
        match ev.kind {
            PointerKind::Press if ev.buttons.left => {
                self.anchor = Some(ev.pos);
                self.corner = None;
                EditOutcome::PreviewChanged
            }
            PointerKind::Move if ev.buttons.left && self.anchor.is_some() => {
                self.corner = Some(ev.pos);
                EditOutcome::PreviewChanged
            }
            PointerKind::Release => {
                let anchor = self.anchor.take();
                let corner = self.corner.take();
                match (anchor, corner) {
                    (Some(a), Some(c)) => {
                        let (w, h) = ctx.mask.dimensions();
                        let region = shapes::fill_rectangle(a, c, w, h);
                        ctx.commit_region(&region, self.polarity)
                    }
                    _ => EditOutcome::Ignored,
                }
            }
            PointerKind::Hover | PointerKind::Move => hover_outcome(ev),
            _ => EditOutcome::Ignored,
        }
    }

    fn handle_circle(&mut self, ctx: &mut ToolCtx<'_>, ev: PointerEvent) -> EditOutcome {
        match ev.kind {
            PointerKind::Press if ev.buttons.left => {
                self.anchor = Some(ev.pos);
                self.radius = 0.0;
                EditOutcome::PreviewChanged
            }
            PointerKind::Move if ev.buttons.left && self.anchor.is_some() => {
                if let Some(center) = self.anchor {
                    let dx = ev.pos.0 - center.0;
                    let dy = ev.pos.1 - center.1;
                    self.radius = (dx * dx + dy * dy).sqrt();
                }
                EditOutcome::PreviewChanged
            }
            PointerKind::Release => match self.anchor.take() {
                Some(center) => {
                    let radius = self.radius;
                    self.radius = 0.0;
                    let (w, h) = ctx.mask.dimensions();
                    let region = shapes::fill_circle(center, radius, w, h);
                    ctx.commit_region(&region, self.polarity)
                }
                None => EditOutcome::Ignored,
            },
            PointerKind::Hover | PointerKind::Move => hover_outcome(ev),
            _ => EditOutcome::Ignored,
        }
    }
}

impl MorphToolState {
    fn handle(&mut self, ctx: &mut ToolCtx<'_>, ev: PointerEvent, shrink: bool) -> EditOutcome {
        match ev.kind {
            PointerKind::Press if ev.buttons.left => {
                let pos = int_pos(ev);
                if !ctx.image.in_bounds(pos.0, pos.1) {
                    return EditOutcome::Ignored;
                }
                let click = (pos.0 as u32, pos.1 as u32);
                ctx.begin_gesture();
                let before = ctx.mask.clone();
                let result = if shrink {
                    morphology::shrink_at(ctx.mask, click, self.kernel_size)
                } else {
                    morphology::dilate_at(ctx.mask, click, self.kernel_size)
                };
                match result {
                    Ok(()) => {
                        if *ctx.mask != before {
                            ctx.commit_gesture();
                            EditOutcome::MaskEdited
                        } else {
                            EditOutcome::Ignored
                        }
                    }
                    Err(err) => {
                        log_err!("morphology failed: {}", err);
                        EditOutcome::Ignored
                    }
                }
            }
            PointerKind::Hover | PointerKind::Move => hover_outcome(ev),
            _ => EditOutcome::Ignored,
        }
    }
}

fn handle_contour_pick(ctx: &mut ToolCtx<'_>, ev: PointerEvent) -> EditOutcome {
    match ev.kind {
        PointerKind::Press if ev.buttons.left => {
            let pos = int_pos(ev);
            if !ctx.image.in_bounds(pos.0, pos.1) {
                return EditOutcome::Ignored;
            }
            match contour::pick_region(ctx.image, (pos.0 as u32, pos.1 as u32)) {
                Some(region) => ctx.commit_region(&region, Polarity::Draw),
                None => {
                    log_info!("contour picker: no region found at ({}, {})", pos.0, pos.1);
                    EditOutcome::NoRegionFound
                }
            }
        }
        PointerKind::Hover | PointerKind::Move => hover_outcome(ev),
        _ => EditOutcome::Ignored,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasSession, ImageGrid};

    fn session_10x10() -> CanvasSession {
        let image = ImageGrid::new(10, 10, vec![0.0; 100], (1.0, 1.0)).unwrap();
        CanvasSession::new(image)
    }

    #[test]
    fn test_brush_paint_undo_redo() {
        let mut session = session_10x10();
        session.set_tool(Tool::Brush(BrushState::new(PaintMode::Paint)));

        assert_eq!(
            session.handle_pointer(PointerEvent::press((5.0, 5.0))),
            EditOutcome::MaskEdited
        );
        assert_eq!(
            session.handle_pointer(PointerEvent::release((5.0, 5.0))),
            EditOutcome::MaskEdited
        );

        // exactly the 3x3 footprint [4..6]² is set
        assert_eq!(session.mask().count_set(), 9);
        for y in 4..=6 {
            for x in 4..=6 {
                assert!(session.mask().get(x, y));
            }
        }

        assert!(session.undo());
        assert_eq!(session.mask().count_set(), 0);
        assert!(session.redo());
        assert_eq!(session.mask().count_set(), 9);
    }

    #[test]
    fn test_brush_stroke_is_one_history_entry() {
        let mut session = session_10x10();
        session.set_tool(Tool::Brush(BrushState::new(PaintMode::Paint)));
        session.handle_pointer(PointerEvent::press((2.0, 2.0)));
        session.handle_pointer(PointerEvent::drag((3.0, 2.0)));
        session.handle_pointer(PointerEvent::drag((4.0, 2.0)));
        session.handle_pointer(PointerEvent::release((4.0, 2.0)));

        // one undo reverts the whole stroke
        assert!(session.undo());
        assert_eq!(session.mask().count_set(), 0);
        assert!(!session.can_undo());
    }

    #[test]
    fn test_brush_off_grid_is_silent_noop() {
        let mut session = session_10x10();
        session.set_tool(Tool::Brush(BrushState::new(PaintMode::Paint)));
        assert_eq!(
            session.handle_pointer(PointerEvent::press((-20.0, -20.0))),
            EditOutcome::Ignored
        );
        assert_eq!(
            session.handle_pointer(PointerEvent::release((-20.0, -20.0))),
            EditOutcome::Ignored
        );
        assert_eq!(session.mask().count_set(), 0);
        assert!(!session.can_undo());
    }

    #[test]
    fn test_eraser_clears_painted_pixels() {
        let mut session = session_10x10();
        session.set_tool(Tool::Brush(BrushState::new(PaintMode::Paint)));
        session.handle_pointer(PointerEvent::press((5.0, 5.0)));
        session.handle_pointer(PointerEvent::release((5.0, 5.0)));

        let mut eraser = BrushState::new(PaintMode::Erase);
        eraser.size = 1;
        session.set_tool(Tool::Brush(eraser));
        session.handle_pointer(PointerEvent::press((5.0, 5.0)));
        session.handle_pointer(PointerEvent::release((5.0, 5.0)));

        assert_eq!(session.mask().count_set(), 8);
        assert!(!session.mask().get(5, 5));
    }

    #[test]
    fn test_freehand_pen_commits_on_release() {
        let mut session = session_10x10();
        session.set_tool(Tool::Pen(PenState::new(PenShape::Freehand, Polarity::Draw)));
        session.handle_pointer(PointerEvent::press((2.0, 2.0)));
        session.handle_pointer(PointerEvent::drag((6.0, 2.0)));
        session.handle_pointer(PointerEvent::drag((6.0, 6.0)));
        session.handle_pointer(PointerEvent::drag((2.0, 6.0)));
        // the path closes implicitly on release
        assert_eq!(
            session.handle_pointer(PointerEvent::release((2.0, 6.0))),
            EditOutcome::MaskEdited
        );
        assert_eq!(session.mask().count_set(), 16);
        assert!(session.can_undo());
    }

    #[test]
    fn test_polygon_pen_commits_on_double_click() {
        let mut session = session_10x10();
        session.set_tool(Tool::Pen(PenState::new(PenShape::Polygon, Polarity::Draw)));
        session.handle_pointer(PointerEvent::press((2.0, 2.0)));
        session.handle_pointer(PointerEvent::moved((2.0, 6.0)));
        session.handle_pointer(PointerEvent::press((2.0, 6.0)));
        session.handle_pointer(PointerEvent::moved((6.0, 6.0)));
        session.handle_pointer(PointerEvent::press((6.0, 6.0)));
        // no commit yet: the mask is untouched while the preview floats
        assert_eq!(session.mask().count_set(), 0);
        assert_eq!(
            session.handle_pointer(PointerEvent::double_click((6.0, 2.0))),
            EditOutcome::MaskEdited
        );
        assert_eq!(session.mask().count_set(), 16);
    }

    #[test]
    fn test_rectangle_cut_polarity() {
        let mut session = session_10x10();
        // draw a rectangle, then cut a sub-rectangle back out
        session.set_tool(Tool::Pen(PenState::new(PenShape::Rectangle, Polarity::Draw)));
        session.handle_pointer(PointerEvent::press((1.0, 1.0)));
        session.handle_pointer(PointerEvent::drag((8.0, 8.0)));
        session.handle_pointer(PointerEvent::release((8.0, 8.0)));
        let drawn = session.mask().count_set();
        assert_eq!(drawn, 49); // centers in [1,8]² => 7x7

        session.set_tool(Tool::Pen(PenState::new(PenShape::Rectangle, Polarity::Cut)));
        session.handle_pointer(PointerEvent::press((3.0, 3.0)));
        session.handle_pointer(PointerEvent::drag((6.0, 6.0)));
        session.handle_pointer(PointerEvent::release((6.0, 6.0)));
        assert_eq!(session.mask().count_set(), 49 - 9);
        assert!(!session.mask().get(4, 4));
        assert!(session.mask().get(1, 1));
    }

    #[test]
    fn test_rectangle_click_without_drag_is_noop() {
        let mut session = session_10x10();
        session.set_tool(Tool::Pen(PenState::new(PenShape::Rectangle, Polarity::Draw)));
        session.handle_pointer(PointerEvent::press((3.0, 3.0)));
        assert_eq!(
            session.handle_pointer(PointerEvent::release((3.0, 3.0))),
            EditOutcome::Ignored
        );
        assert!(!session.can_undo());
    }

    #[test]
    fn test_circle_pen_catch_polarity() {
        let mut session = session_10x10();
        session.set_tool(Tool::Pen(PenState::new(PenShape::Rectangle, Polarity::Draw)));
        session.handle_pointer(PointerEvent::press((1.0, 1.0)));
        session.handle_pointer(PointerEvent::drag((9.0, 9.0)));
        session.handle_pointer(PointerEvent::release((9.0, 9.0)));
        let before = session.mask().count_set();

        session.set_tool(Tool::Pen(PenState::new(PenShape::Circle, Polarity::Catch)));
        session.handle_pointer(PointerEvent::press((5.0, 5.0)));
        session.handle_pointer(PointerEvent::drag((5.0, 8.0)));
        session.handle_pointer(PointerEvent::release((5.0, 8.0)));
        let after = session.mask().count_set();
        // catch keeps only the circle's interior
        assert!(after < before && after > 0);
        assert!(session.mask().get(5, 5));
        assert!(!session.mask().get(1, 1));
    }

    #[test]
    fn test_window_level_drag() {
        let image =
            ImageGrid::new(10, 10, (0..100).map(|v| v as f32).collect(), (1.0, 1.0)).unwrap();
        let mut session = CanvasSession::new(image);
        session.set_tool(Tool::WindowLevel(WindowLevelState::default()));
        let before = session.image().window();

        session.handle_pointer(PointerEvent::press((5.0, 5.0)));
        assert_eq!(
            session.handle_pointer(PointerEvent::drag((5.0, 9.0))),
            EditOutcome::WindowChanged
        );
        let after = session.image().window();
        // a downward drag raises the center, width untouched
        assert!(after.0 > before.0);
        assert_eq!(after.1, before.1);
        // window changes never touch the mask history
        assert!(!session.can_undo());
    }

    #[test]
    fn test_threshold_replaces_mask_and_commits_once() {
        let image =
            ImageGrid::new(10, 10, (0..100).map(|v| v as f32).collect(), (1.0, 1.0)).unwrap();
        let mut session = CanvasSession::new(image);
        session.set_tool(Tool::Threshold(ThresholdState::default()));

        // press applies the image window [0, 99] as a threshold: everything
        // matches
        assert_eq!(
            session.handle_pointer(PointerEvent::press((5.0, 5.0))),
            EditOutcome::MaskEdited
        );
        assert_eq!(session.mask().count_set(), 100);
        // dragging left shrinks the width; no history entry until release
        assert!(!session.can_undo());
        session.handle_pointer(PointerEvent::drag((-300.0, 5.0)));
        assert!(session.mask().count_set() < 100);
        session.handle_pointer(PointerEvent::release((-300.0, 5.0)));
        assert!(session.can_undo());
        assert!(session.undo());
        assert_eq!(session.mask().count_set(), 0);
    }

    #[test]
    fn test_region_grow_tool_press() {
        // row 0 dark, rest bright — growing from row 0 selects only row 0
        let mut data = vec![100.0; 25];
        for x in 0..5 {
            data[x] = 10.0;
        }
        let image = ImageGrid::new(5, 5, data, (1.0, 1.0)).unwrap();
        let mut session = CanvasSession::new(image);
        let mut tool_state = GrowToolState::new(PaintMode::Paint);
        tool_state.size = 1;
        tool_state.tolerance = 1.0;
        session.set_tool(Tool::RegionGrow(tool_state));

        session.handle_pointer(PointerEvent::press((2.0, 0.0)));
        session.handle_pointer(PointerEvent::release((2.0, 0.0)));
        assert_eq!(session.mask().count_set(), 5);
        for x in 0..5 {
            assert!(session.mask().get(x, 0));
        }
    }

    #[test]
    fn test_wheel_zooms_for_any_tool() {
        let mut session = session_10x10();
        session.set_tool(Tool::Brush(BrushState::default()));
        assert_eq!(
            session.handle_pointer(PointerEvent::wheel((5.0, 5.0), -1.0)),
            EditOutcome::Zoom(1.25)
        );
        assert_eq!(
            session.handle_pointer(PointerEvent::wheel((5.0, 5.0), 1.0)),
            EditOutcome::Zoom(1.0 / 1.25)
        );
    }

    #[test]
    fn test_right_click_requests_options() {
        let mut session = session_10x10();
        session.set_tool(Tool::Brush(BrushState::default()));
        let mut ev = PointerEvent::new(PointerKind::Press, (5.0, 5.0));
        ev.buttons.right = true;
        assert_eq!(session.handle_pointer(ev), EditOutcome::OptionsRequested);
        assert_eq!(session.mask().count_set(), 0);
    }

    #[test]
    fn test_pan_reports_drag_delta() {
        let mut session = session_10x10();
        session.handle_pointer(PointerEvent::press((2.0, 2.0)));
        assert_eq!(
            session.handle_pointer(PointerEvent::drag((5.0, 4.0))),
            EditOutcome::Pan { dx: 3.0, dy: 2.0 }
        );
    }

    #[test]
    fn test_hover_updates_readout_without_editing() {
        let mut session = session_10x10();
        session.set_tool(Tool::Brush(BrushState::default()));
        assert_eq!(
            session.handle_pointer(PointerEvent::hover((3.7, 8.2))),
            EditOutcome::Hover { x: 3, y: 8 }
        );
        assert_eq!(session.hover_position(), Some((3, 8)));
        assert_eq!(session.mask().count_set(), 0);
    }

    #[test]
    fn test_tool_switch_abandons_gesture() {
        let mut session = session_10x10();
        session.set_tool(Tool::Pen(PenState::new(PenShape::Freehand, Polarity::Draw)));
        session.handle_pointer(PointerEvent::press((2.0, 2.0)));
        session.handle_pointer(PointerEvent::drag((6.0, 2.0)));
        session.set_tool(Tool::Pan(PanState::default()));
        // the abandoned stroke never reaches the mask
        assert_eq!(session.mask().count_set(), 0);
        assert!(!session.can_undo());
    }

    #[test]
    fn test_option_fields_round_trip() {
        let mut tool = Tool::RegionGrow(GrowToolState::default());
        let fields = tool.options();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].label, "Seed size");
        assert!(tool.set_option(0, OptionValue::Int(7)));
        assert!(tool.set_option(1, OptionValue::Float(2.5)));
        match &tool {
            Tool::RegionGrow(s) => {
                assert_eq!(s.size, 7);
                assert_eq!(s.tolerance, 2.5);
            }
            _ => unreachable!(),
        }
        // wrong field index is rejected
        assert!(!tool.set_option(5, OptionValue::Int(3)));
    }

    #[test]
    fn test_kernel_option_rejects_even_sizes() {
        let mut tool = Tool::Dilate(MorphToolState::default());
        assert!(!tool.set_option(0, OptionValue::Int(4)));
        assert!(tool.set_option(0, OptionValue::Int(5)));
    }

    #[test]
    fn test_preview_shapes() {
        let mut session = session_10x10();
        session.set_tool(Tool::Pen(PenState::new(PenShape::Circle, Polarity::Draw)));
        assert!(session.preview().is_none());
        session.handle_pointer(PointerEvent::press((5.0, 5.0)));
        session.handle_pointer(PointerEvent::drag((5.0, 8.0)));
        assert_eq!(
            session.preview(),
            Some(PreviewShape::Circle {
                center: (5.0, 5.0),
                radius: 3.0
            })
        );
        // preview never touches the mask
        assert_eq!(session.mask().count_set(), 0);
    }

    #[test]
    fn test_default_tool_roster() {
        let tools = Tool::default_tools();
        assert_eq!(tools.len(), 16);
        assert_eq!(tools[0].label(), "Pan");
        assert_eq!(tools[4].label(), "Paint brush");
        assert_eq!(tools[7].label(), "Eraser");
        assert_eq!(tools[15].label(), "Contour picker");
    }
}
