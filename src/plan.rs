use crate::paginate::{ContentBlock, Page, paginate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLabel {
    pub page: usize,
    /// First block of the page; its label slot receives the text.
    pub block: usize,
    pub text: String,
}

/// Everything `commit` needs to mark up the live document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationPlan {
    pub pages: Vec<Page>,
    /// Blocks that must start a new page: the leading block of every page
    /// after the first.
    pub break_before: Vec<usize>,
    pub overflow: Vec<usize>,
    pub labels: Vec<PageLabel>,
}

pub fn page_label(number: usize) -> String {
    format!("Page {}", number)
}

pub fn plan_pages(blocks: &[ContentBlock], usable_page_px: u32) -> PaginationPlan {
    PaginationPlan::from_pages(paginate(blocks, usable_page_px), blocks)
}

impl PaginationPlan {
    pub fn from_pages(pages: Vec<Page>, blocks: &[ContentBlock]) -> Self {
        let break_before = pages
            .iter()
            .skip(1)
            .filter_map(|page| page.blocks.first().copied())
            .collect();
        let overflow = blocks
            .iter()
            .filter(|block| block.oversized)
            .map(|block| block.index)
            .collect();
        let labels = pages
            .iter()
            .enumerate()
            .filter_map(|(page, content)| {
                content.blocks.first().map(|&block| PageLabel {
                    page,
                    block,
                    text: page_label(page + 1),
                })
            })
            .collect();
        Self {
            pages,
            break_before,
            overflow,
            labels,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_of(&self, block: usize) -> Option<usize> {
        self.pages.iter().position(|page| page.blocks.contains(&block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaks_labels_and_overflow_follow_the_pages() {
        let blocks: Vec<ContentBlock> = [300, 300, 300, 1400, 300]
            .iter()
            .enumerate()
            .map(|(index, &height)| ContentBlock::new(index, height, 0, 1000))
            .collect();
        let plan = plan_pages(&blocks, 1000);
        assert_eq!(plan.page_count(), 3);
        assert_eq!(plan.break_before, vec![3, 4]);
        assert_eq!(plan.overflow, vec![3]);
        let labels: Vec<(usize, &str)> = plan
            .labels
            .iter()
            .map(|label| (label.block, label.text.as_str()))
            .collect();
        assert_eq!(labels, vec![(0, "Page 1"), (3, "Page 2"), (4, "Page 3")]);
        assert_eq!(plan.page_of(2), Some(0));
        assert_eq!(plan.page_of(9), None);
    }

    #[test]
    fn empty_input_plans_nothing() {
        let plan = plan_pages(&[], 1000);
        assert_eq!(plan, PaginationPlan::default());
    }
}
