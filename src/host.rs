use crate::dom;
use crate::style::inline_box;
use kuchiki::NodeRef;

/// The rendering environment the engine measures against.
///
/// Anything that can report the rendered box height of a node laid out at a
/// given width satisfies it; the engine never inspects concrete element types
/// beyond the selectors it is configured with.
pub trait LayoutHost {
    /// Border-box height of `node` at `width_px`, excluding margins. `0.0` when
    /// the node has not been laid out yet.
    fn box_height(&self, node: &NodeRef, width_px: f32) -> f32;

    fn margin_bottom(&self, node: &NodeRef) -> f32;

    /// Width of the live content area, used to size off-screen probes.
    fn content_width(&self, node: &NodeRef) -> f32;

    /// Width in pixels of a `1in` probe.
    fn pixels_per_inch(&self) -> f32;
}

/// Hands control back to the host so pending style and layout work lands
/// before the next measurement.
pub trait FrameScheduler {
    fn yield_until_rendered(&mut self, frames: u32);
}

/// Stacked-block layout: an element is as tall as its inline `height`, or the
/// sum of its element children and their bottom margins. Text has no height.
#[derive(Debug, Clone)]
pub struct BlockLayout {
    ppi: f32,
    content_width: f32,
}

impl BlockLayout {
    pub fn new() -> Self {
        Self {
            ppi: crate::metrics::DEFAULT_PPI,
            content_width: 794.0,
        }
    }

    pub fn with_pixels_per_inch(mut self, ppi: f32) -> Self {
        self.ppi = ppi;
        self
    }

    pub fn with_content_width(mut self, width: f32) -> Self {
        self.content_width = width;
        self
    }
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutHost for BlockLayout {
    fn box_height(&self, node: &NodeRef, width_px: f32) -> f32 {
        if node.as_element().is_none() {
            return 0.0;
        }
        let style = inline_box(dom::get_attr(node, "style").as_deref());
        if style.hidden {
            return 0.0;
        }
        if let Some(height) = style.height {
            return height.max(0.0);
        }
        dom::element_children(node)
            .map(|child| self.box_height(&child, width_px) + self.margin_bottom(&child))
            .sum()
    }

    fn margin_bottom(&self, node: &NodeRef) -> f32 {
        let style = inline_box(dom::get_attr(node, "style").as_deref());
        if style.hidden {
            return 0.0;
        }
        style.margin_bottom.unwrap_or(0.0).max(0.0)
    }

    fn content_width(&self, _node: &NodeRef) -> f32 {
        self.content_width
    }

    fn pixels_per_inch(&self) -> f32 {
        self.ppi
    }
}

/// Scheduler for hosts whose layout is always current.
#[derive(Debug, Default)]
pub struct ImmediateScheduler {
    frames: u64,
}

impl ImmediateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_yielded(&self) -> u64 {
        self.frames
    }
}

impl FrameScheduler for ImmediateScheduler {
    fn yield_until_rendered(&mut self, frames: u32) {
        self.frames += frames as u64;
    }
}
