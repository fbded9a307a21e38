//! Interactive raster mask-editing engine for grayscale image viewers.
//!
//! The crate is the editing core of a medical-image workstation: a windowed
//! grayscale-to-color compositing pipeline, a versioned binary mask with
//! branch-truncating undo/redo, and a pointer-driven tool state machine
//! covering brushes, intensity thresholding, paint-by-numbers, seeded region
//! growing, geometric pens, cluster-aware morphology and a contour-assisted
//! one-shot picker.
//!
//! The GUI shell owns windows, menus, persistence and the screen-to-image
//! coordinate transform; it feeds [`CanvasSession::handle_pointer`] events
//! already mapped to image pixel coordinates and redraws from
//! [`CanvasSession::composite_frame`] whenever an [`EditOutcome`] says the
//! display changed.
//!
//! ```no_run
//! use maskcanvas::{CanvasSession, ImageGrid, PointerEvent, Tool};
//! use maskcanvas::{BrushState, PaintMode};
//!
//! let image = ImageGrid::new(256, 256, vec![0.0; 256 * 256], (1.0, 1.0))?;
//! let mut session = CanvasSession::new(image);
//! session.set_tool(Tool::Brush(BrushState::new(PaintMode::Paint)));
//! session.handle_pointer(PointerEvent::press((40.0, 60.0)));
//! session.handle_pointer(PointerEvent::release((40.0, 60.0)));
//! assert!(session.can_undo());
//! let frame = session.composite_frame();
//! # Ok::<(), maskcanvas::MaskError>(())
//! ```

pub mod canvas;
pub mod components;
pub mod logger;
pub mod ops;

pub use canvas::{
    CanvasSession, DisplaySettings, ImageGrid, Lut, MaskBuffer, MaskError, PaintMode, Polarity,
    Region, composite, mask_overlay,
};
pub use components::colors::{MASK_PALETTE, default_window, layer_color};
pub use components::history::{MaskHistory, MaskVersion};
pub use components::tools::{
    ArrowKey, BRUSH_SIZE_PRESETS, BrushState, Buttons, EditOutcome, GrowToolState,
    KERNEL_SIZE_PRESETS, Key, Modifiers, MorphToolState, OPACITY_PRESETS, OptionField, OptionKind,
    OptionValue, PanState, PenShape, PenState, PointerEvent, PointerKind, PreviewShape,
    TOLERANCE_PRESETS, ThresholdState, Tool, WindowLevelState,
};
