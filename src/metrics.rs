use crate::style::{CssLength, LengthUnit, RootVars};
use std::cell::Cell;

pub const DEFAULT_PPI: f32 = 96.0;
pub const MIN_USABLE_PX: u32 = 100;
/// Pad kept free at the bottom of a page when a table starts mid-page.
pub const SAFETY_PAD_PX: u32 = 2;

pub const VAR_PAGE_WIDTH: &str = "page-width";
pub const VAR_PAGE_HEIGHT: &str = "page-height";
pub const VAR_PAGE_MARGIN: &str = "page-margin-in";
pub const VAR_HEADER_HEIGHT: &str = "header-h";
pub const VAR_FOOTER_HEIGHT: &str = "footer-h";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl PaperSize {
    /// Portrait width and height in inches.
    pub fn inches(self) -> (f32, f32) {
        match self {
            PaperSize::A3 => (11.69, 16.54),
            PaperSize::A4 => (8.27, 11.69),
            PaperSize::A5 => (5.83, 8.27),
            PaperSize::Letter => (8.5, 11.0),
            PaperSize::Legal => (8.5, 14.0),
            PaperSize::Tabloid => (11.0, 17.0),
        }
    }

    /// Case-insensitive; unknown names fall back to A4.
    pub fn parse(raw: &str) -> PaperSize {
        match raw.trim().to_ascii_lowercase().as_str() {
            "a3" => PaperSize::A3,
            "a5" => PaperSize::A5,
            "letter" => PaperSize::Letter,
            "legal" => PaperSize::Legal,
            "tabloid" => PaperSize::Tabloid,
            _ => PaperSize::A4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn parse(raw: &str) -> Orientation {
        if raw.trim().eq_ignore_ascii_case("landscape") {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    pub fn apply(self, (width, height): (f32, f32)) -> (f32, f32) {
        match self {
            Orientation::Portrait => (width, height),
            Orientation::Landscape => (height, width),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMetrics {
    pub device_scale: f32,
    pub page_width_px: u32,
    pub page_height_px: u32,
    pub margin_inches: f32,
    pub reserved_header_px: u32,
    pub reserved_footer_px: u32,
    pub usable_page_px: u32,
}

impl PageMetrics {
    fn derive(
        device_scale: f32,
        (width_in, height_in): (f32, f32),
        margin_inches: f32,
        reserved_header_px: u32,
        reserved_footer_px: u32,
    ) -> Self {
        let page_width_px = round_px(width_in * device_scale);
        let page_height_px = round_px(height_in * device_scale);
        let margins_px = (margin_inches * 2.0 * device_scale).round();
        let usable = (page_height_px as f32
            - margins_px
            - reserved_header_px as f32
            - reserved_footer_px as f32)
            .round();
        let usable_page_px = if usable.is_finite() && usable > MIN_USABLE_PX as f32 {
            usable as u32
        } else {
            MIN_USABLE_PX
        };
        Self {
            device_scale,
            page_width_px,
            page_height_px,
            margin_inches,
            reserved_header_px,
            reserved_footer_px,
            usable_page_px,
        }
    }
}

/// Inputs of [`read_metrics`]. Every field is optional; absent values fall back
/// to the paper preset, zero margin and zero reserved chrome.
#[derive(Debug, Clone, Default)]
pub struct MetricsSource {
    pub page_width: Option<CssLength>,
    pub page_height: Option<CssLength>,
    pub margin: Option<CssLength>,
    pub header: Option<CssLength>,
    pub footer: Option<CssLength>,
}

impl MetricsSource {
    pub fn from_root_vars(vars: &RootVars) -> Self {
        Self {
            page_width: vars.length(VAR_PAGE_WIDTH),
            page_height: vars.length(VAR_PAGE_HEIGHT),
            margin: vars.length(VAR_PAGE_MARGIN),
            header: vars.length(VAR_HEADER_HEIGHT),
            footer: vars.length(VAR_FOOTER_HEIGHT),
        }
    }

    /// Measured header/footer heights replace the declared ones.
    pub fn with_chrome(mut self, header_px: Option<u32>, footer_px: Option<u32>) -> Self {
        if let Some(px) = header_px {
            self.header = Some(CssLength::px(px as f32));
        }
        if let Some(px) = footer_px {
            self.footer = Some(CssLength::px(px as f32));
        }
        self
    }
}

pub fn read_metrics(
    source: &MetricsSource,
    paper: PaperSize,
    orientation: Orientation,
    ppi: f32,
) -> PageMetrics {
    let ppi = sanitize_ppi(ppi);
    let (default_w, default_h) = orientation.apply(paper.inches());
    let width_in = positive_inches(source.page_width, ppi).unwrap_or(default_w);
    let height_in = positive_inches(source.page_height, ppi).unwrap_or(default_h);
    let margin_in = positive_inches(source.margin, ppi).unwrap_or(0.0);
    let header_px = chrome_px(source.header, ppi);
    let footer_px = chrome_px(source.footer, ppi);
    PageMetrics::derive(ppi, (width_in, height_in), margin_in, header_px, footer_px)
}

fn positive_inches(length: Option<CssLength>, ppi: f32) -> Option<f32> {
    let inches = length?.to_inches(ppi, LengthUnit::In)?;
    (inches > 0.0).then_some(inches)
}

fn chrome_px(length: Option<CssLength>, ppi: f32) -> u32 {
    length
        .and_then(|len| len.to_px(ppi, LengthUnit::Px))
        .map(round_px)
        .unwrap_or(0)
}

pub(crate) fn round_px(value: f32) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}

fn sanitize_ppi(ppi: f32) -> f32 {
    if ppi.is_finite() && ppi > 0.0 {
        ppi
    } else {
        DEFAULT_PPI
    }
}

/// Device density, probed once per session.
#[derive(Debug, Default)]
pub struct DensityCache {
    ppi: Cell<Option<f32>>,
}

impl DensityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, probe: impl FnOnce() -> f32) -> f32 {
        if let Some(ppi) = self.ppi.get() {
            return ppi;
        }
        let ppi = sanitize_ppi(probe());
        self.ppi.set(Some(ppi));
        ppi
    }
}
