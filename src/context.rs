use crate::metrics::{Orientation, PageMetrics, PaperSize};

/// Caller-facing print options. Defaults mirror a plain A4 portrait print
/// with continuation titles and page numbers turned on.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintConfig {
    pub paper: PaperSize,
    pub orientation: Orientation,
    pub show_table_titles: bool,
    pub table_title: String,
    pub show_page_numbers: bool,
    /// Shown by the page chrome only; pagination never reads it.
    pub watermark_opacity: u8,
    /// Extra frames to wait while a measurement still reads zero.
    pub measure_retries: u32,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            paper: PaperSize::A4,
            orientation: Orientation::Portrait,
            show_table_titles: true,
            table_title: "Table".to_string(),
            show_page_numbers: true,
            watermark_opacity: 15,
            measure_retries: 2,
        }
    }
}

impl PrintConfig {
    pub fn with_paper(mut self, paper: PaperSize, orientation: Orientation) -> Self {
        self.paper = paper;
        self.orientation = orientation;
        self
    }

    pub fn with_table_titles(mut self, show: bool, title: impl Into<String>) -> Self {
        self.show_table_titles = show;
        let title = title.into();
        if !title.trim().is_empty() {
            self.table_title = title;
        }
        self
    }

    pub fn with_page_numbers(mut self, show: bool) -> Self {
        self.show_page_numbers = show;
        self
    }

    pub fn with_watermark_opacity(mut self, opacity: u8) -> Self {
        self.watermark_opacity = opacity.min(100);
        self
    }

    pub fn with_measure_retries(mut self, retries: u32) -> Self {
        self.measure_retries = retries;
        self
    }

    /// `(⟨title⟩ - ⟨n⟩)`, where `n` counts fragments from one.
    pub fn continuation_title(&self, fragment_number: usize) -> String {
        format!("({} - {})", self.table_title, fragment_number)
    }
}

/// State of one pagination step. Built fresh from the live document every
/// time and dropped when the step ends.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: u64,
    pub metrics: PageMetrics,
    pub content_width: f32,
    pub config: PrintConfig,
}

impl RunContext {
    pub fn new(run_id: u64, metrics: PageMetrics, content_width: f32, config: &PrintConfig) -> Self {
        Self {
            run_id,
            metrics,
            content_width,
            config: config.clone(),
        }
    }

    pub fn usable_page_px(&self) -> u32 {
        self.metrics.usable_page_px
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_titles_use_the_configured_label() {
        let config = PrintConfig::default().with_table_titles(true, "Invoice lines");
        assert_eq!(config.continuation_title(2), "(Invoice lines - 2)");
        let blank = PrintConfig::default().with_table_titles(false, "  ");
        assert_eq!(blank.table_title, "Table");
        assert!(!blank.show_table_titles);
    }

    #[test]
    fn watermark_opacity_is_clamped() {
        assert_eq!(PrintConfig::default().with_watermark_opacity(180).watermark_opacity, 100);
    }
}
