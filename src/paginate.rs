use crate::dom;
use crate::error::PrintError;
use crate::frame::PageFrame;
use crate::geometry::{OffscreenClone, Prober};
use crate::host::{FrameScheduler, LayoutHost};
use crate::metrics::SAFETY_PAD_PX;
use kuchiki::NodeRef;

/// A measured section. Rebuilt for every run; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBlock {
    pub index: usize,
    pub height: u32,
    pub margin_bottom: u32,
    pub oversized: bool,
}

impl ContentBlock {
    pub fn new(index: usize, height: u32, margin_bottom: u32, usable_page_px: u32) -> Self {
        Self {
            index,
            height,
            margin_bottom,
            oversized: height > usable_page_px,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub blocks: Vec<usize>,
    /// Block heights plus the margins between them; the last block's bottom
    /// margin falls at the page break and is not counted.
    pub used: u32,
    /// A single block taller than the page; it overflows instead of splitting.
    pub overflow: bool,
}

/// Greedy first-fit over document order. A block never moves backwards and
/// nothing is reordered; an oversized block gets a page of its own.
pub fn paginate(blocks: &[ContentBlock], usable_page_px: u32) -> Vec<Page> {
    let mut pages = Vec::new();
    let mut frame = PageFrame::new(usable_page_px);

    let close = |frame: PageFrame, pages: &mut Vec<Page>| {
        if frame.is_empty() {
            return;
        }
        let used = frame.used();
        pages.push(Page {
            blocks: frame.into_blocks(),
            used,
            overflow: false,
        });
    };

    for block in blocks {
        if block.height > usable_page_px {
            close(
                std::mem::replace(&mut frame, PageFrame::new(usable_page_px)),
                &mut pages,
            );
            pages.push(Page {
                blocks: vec![block.index],
                used: block.height,
                overflow: true,
            });
            continue;
        }
        if !frame.is_empty() && !frame.fits(block.height) {
            close(
                std::mem::replace(&mut frame, PageFrame::new(usable_page_px)),
                &mut pages,
            );
        }
        frame.push(block.index, block.height, block.margin_bottom);
    }
    close(frame, &mut pages);
    pages
}

/// Free space left on the page holding `target`, before `target` starts,
/// minus the safety pad.
pub fn remaining_before(blocks: &[ContentBlock], target: usize, usable_page_px: u32) -> u32 {
    let pages = paginate(blocks, usable_page_px);
    let page = pages
        .iter()
        .find(|page| page.blocks.contains(&target))
        .or_else(|| pages.first());
    let mut frame = PageFrame::new(usable_page_px);
    if let Some(page) = page {
        for block in page
            .blocks
            .iter()
            .take_while(|&&index| index < target)
            .filter_map(|&index| blocks.iter().find(|b| b.index == index))
        {
            frame.push(block.index, block.height, block.margin_bottom);
        }
    }
    frame.remaining_height().saturating_sub(SAFETY_PAD_PX)
}

/// Sections of an off-screen clone of `content`, measured in document order.
/// The returned clone keeps the probe alive for follow-up lookups.
pub fn collect_blocks<H: LayoutHost, S: FrameScheduler>(
    prober: &mut Prober<'_, H, S>,
    content: &NodeRef,
    width: f32,
    usable_page_px: u32,
) -> Result<(OffscreenClone, Vec<ContentBlock>), PrintError> {
    let probe = OffscreenClone::new(content, width);
    for stale in dom::select_all(probe.node(), &format!(".{}", dom::CLASS_FORCE_NEW_PAGE)) {
        dom::remove_class(&stale, dom::CLASS_FORCE_NEW_PAGE);
    }
    let sections = dom::select_all(probe.node(), dom::SEL_SECTION);
    if sections.is_empty() {
        return Err(PrintError::NoSections);
    }
    // Give the clone a chance to lay out; sections still reading zero are
    // paginated as zero height.
    prober.settle(
        |host| {
            sections
                .iter()
                .map(|section| host.box_height(section, width))
                .sum::<f32>()
        },
        |total| *total > 0.0,
    );
    let blocks = sections
        .iter()
        .enumerate()
        .map(|(index, section)| {
            ContentBlock::new(
                index,
                prober.height_in(&probe, section),
                prober.margin_bottom(section),
                usable_page_px,
            )
        })
        .collect();
    Ok((probe, blocks))
}
