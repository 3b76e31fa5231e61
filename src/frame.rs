/// One page being filled by the bin-packer.
///
/// `used` covers block heights and the margins between them. The bottom
/// margin of the last block is held apart: it only takes space once another
/// block follows it on the same page.
#[derive(Debug, Clone)]
pub struct PageFrame {
    capacity: u32,
    used: u32,
    trailing_margin: u32,
    blocks: Vec<usize>,
}

impl PageFrame {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            used: 0,
            trailing_margin: 0,
            blocks: Vec::new(),
        }
    }

    /// Space left for the next block, after the previous block's margin.
    pub fn remaining_height(&self) -> u32 {
        self.capacity
            .saturating_sub(self.used)
            .saturating_sub(self.trailing_margin)
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Exact fit counts as fitting.
    pub fn fits(&self, height: u32) -> bool {
        self.used
            .saturating_add(self.trailing_margin)
            .saturating_add(height)
            <= self.capacity
    }

    pub fn push(&mut self, index: usize, height: u32, margin_bottom: u32) {
        self.blocks.push(index);
        self.used = self
            .used
            .saturating_add(self.trailing_margin)
            .saturating_add(height);
        self.trailing_margin = margin_bottom;
    }

    pub fn into_blocks(self) -> Vec<usize> {
        self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_fit_is_accepted() {
        let mut frame = PageFrame::new(1000);
        frame.push(0, 600, 0);
        assert!(frame.fits(400));
        assert!(!frame.fits(401));
        assert_eq!(frame.remaining_height(), 400);
    }

    #[test]
    fn margin_counts_only_between_blocks() {
        let mut frame = PageFrame::new(1000);
        frame.push(0, 590, 10);
        assert_eq!(frame.used(), 590);
        assert_eq!(frame.remaining_height(), 400);
        assert!(frame.fits(400));
        assert!(!frame.fits(401));
        frame.push(1, 400, 25);
        assert_eq!(frame.used(), 1000);
        assert_eq!(frame.into_blocks(), vec![0, 1]);
    }

    #[test]
    fn overfull_frame_reports_no_remaining_space() {
        let mut frame = PageFrame::new(100);
        frame.push(0, 150, 0);
        assert_eq!(frame.remaining_height(), 0);
        assert!(!frame.is_empty());
        assert_eq!(frame.used(), 150);
        assert_eq!(frame.into_blocks(), vec![0]);
    }
}
