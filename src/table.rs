use crate::context::RunContext;
use crate::dom;
use crate::error::PrintError;
use crate::geometry::{OffscreenClone, Prober};
use crate::host::{FrameScheduler, LayoutHost};
use crate::metrics::round_px;
use crate::paginate::{collect_blocks, remaining_before};
use kuchiki::NodeRef;
use std::ops::Range;

const FRAGMENT_TABLE_STYLE: &str =
    "width: 100%; border-collapse: collapse; font-size: var(--table-font-size)";

/// Assigns rows to fragments in order. The first fragment may be limited to
/// the space left on its page; every fragment pays for the header and takes
/// at least one row.
pub fn plan_fragments(
    header_px: u32,
    row_heights: &[u32],
    usable_page_px: u32,
    remaining_on_first_page: u32,
) -> Vec<Range<usize>> {
    let mut fragments = Vec::new();
    let mut start = 0;
    while start < row_heights.len() {
        let limit = if start == 0
            && remaining_on_first_page > 0
            && remaining_on_first_page < usable_page_px
        {
            remaining_on_first_page
        } else {
            usable_page_px
        };
        let mut used = header_px;
        let mut end = start;
        while end < row_heights.len() {
            let next = used.saturating_add(row_heights[end]);
            if next > limit {
                break;
            }
            used = next;
            end += 1;
        }
        if end == start {
            end += 1;
        }
        fragments.push(start..end);
        start = end;
    }
    fragments
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentTitle {
    /// Clones of the section's own title and metadata.
    Original,
    Continuation(String),
    None,
}

#[derive(Debug, Clone)]
pub struct TableFragment {
    pub header: Option<NodeRef>,
    pub rows: Range<usize>,
    pub index: usize,
    pub title: FragmentTitle,
    /// The generated `print-section` that replaces the original in the page.
    pub section: NodeRef,
}

#[derive(Debug, Clone)]
pub struct TableSplit {
    pub section: NodeRef,
    pub table: NodeRef,
    pub row_count: usize,
    pub fragments: Vec<TableFragment>,
}

struct MeasuredTable {
    header: Option<NodeRef>,
    header_px: u32,
    rows: Vec<NodeRef>,
    row_heights: Vec<u32>,
}

pub struct TableSplitter<'c> {
    ctx: &'c RunContext,
}

impl<'c> TableSplitter<'c> {
    pub fn new(ctx: &'c RunContext) -> Self {
        Self { ctx }
    }

    /// Splits `table` so that its first fragment fills what is left of the
    /// page its section currently starts on. The live document is not
    /// modified; the caller swaps the fragments in.
    pub fn split_table<H: LayoutHost, S: FrameScheduler>(
        &self,
        prober: &mut Prober<'_, H, S>,
        content: &NodeRef,
        table: &NodeRef,
    ) -> Result<TableSplit, PrintError> {
        let section = dom::closest_with_class(table, dom::CLASS_SECTION)
            .filter(|section| dom::is_within(section, content))
            .ok_or(PrintError::SectionNotFound)?;
        let remaining = self.remaining_on_first_page(prober, content, &section, table)?;
        self.split_with_remaining(prober, &section, table, remaining)
    }

    /// Space left before `section` on its page, measured on a fresh clone of
    /// the whole content container.
    pub fn remaining_on_first_page<H: LayoutHost, S: FrameScheduler>(
        &self,
        prober: &mut Prober<'_, H, S>,
        content: &NodeRef,
        section: &NodeRef,
        table: &NodeRef,
    ) -> Result<u32, PrintError> {
        let usable = self.ctx.usable_page_px();
        let (probe, blocks) = collect_blocks(prober, content, self.ctx.content_width, usable)?;
        let candidates = dom::select_all(probe.node(), dom::SEL_SECTION);
        let target = match_section(&candidates, section, table);
        Ok(remaining_before(&blocks, target, usable))
    }

    pub fn split_with_remaining<H: LayoutHost, S: FrameScheduler>(
        &self,
        prober: &mut Prober<'_, H, S>,
        section: &NodeRef,
        table: &NodeRef,
        remaining_on_first_page: u32,
    ) -> Result<TableSplit, PrintError> {
        let probe = OffscreenClone::new(table, self.ctx.content_width);
        let measured = self.measure(prober, &probe)?;
        let ranges = plan_fragments(
            measured.header_px,
            &measured.row_heights,
            self.ctx.usable_page_px(),
            remaining_on_first_page,
        );
        let fragments = ranges
            .into_iter()
            .enumerate()
            .map(|(index, rows)| self.build_fragment(section, table, &measured, index, rows))
            .collect();
        Ok(TableSplit {
            section: section.clone(),
            table: table.clone(),
            row_count: measured.rows.len(),
            fragments,
        })
    }

    fn measure<H: LayoutHost, S: FrameScheduler>(
        &self,
        prober: &mut Prober<'_, H, S>,
        probe: &OffscreenClone,
    ) -> Result<MeasuredTable, PrintError> {
        let width = probe.width();
        let header = dom::select_first(probe.node(), "thead");
        let body = dom::select_first(probe.node(), "tbody").ok_or(PrintError::MissingTableBody)?;
        let rows = dom::select_all(&body, "tr");
        if rows.is_empty() {
            return Err(PrintError::EmptyTable);
        }
        let (header_px, row_heights) = prober.settle(
            |host| {
                let header_px = header
                    .as_ref()
                    .map(|thead| round_px(host.box_height(thead, width)))
                    .unwrap_or(0);
                let heights: Vec<u32> = rows
                    .iter()
                    .map(|row| round_px(host.box_height(row, width)))
                    .collect();
                (header_px, heights)
            },
            |(header_px, heights)| *header_px > 0 || heights.iter().any(|h| *h > 0),
        );
        Ok(MeasuredTable {
            header: header.map(|thead| dom::deep_clone(&thead)),
            header_px,
            rows: rows.iter().map(dom::deep_clone).collect(),
            row_heights,
        })
    }

    fn build_fragment(
        &self,
        section: &NodeRef,
        table: &NodeRef,
        measured: &MeasuredTable,
        index: usize,
        rows: Range<usize>,
    ) -> TableFragment {
        let shell = dom::empty_like(section).unwrap_or_else(|| dom::shallow_clone(section));
        dom::set_attr(&shell, "class", dom::CLASS_SECTION);
        dom::set_attr(&shell, dom::ATTR_GENERATED, "true");

        let title = if index == 0 {
            for selector in [dom::SEL_TITLE, dom::SEL_META] {
                if let Some(node) = dom::select_first(section, selector) {
                    shell.append(dom::deep_clone(&node));
                }
            }
            FragmentTitle::Original
        } else if self.ctx.config.show_table_titles {
            let text = self.ctx.config.continuation_title(index + 1);
            if let Some(heading) = dom::element_from_markup("<h3></h3>", "h3") {
                dom::set_text(&heading, &text);
                shell.append(heading);
            }
            FragmentTitle::Continuation(text)
        } else {
            FragmentTitle::None
        };

        let fragment_table = dom::empty_like(table).unwrap_or_else(|| dom::shallow_clone(table));
        dom::set_attr(&fragment_table, "style", FRAGMENT_TABLE_STYLE);
        if let Some(header) = &measured.header {
            fragment_table.append(dom::deep_clone(header));
        }
        let body = dom::element_from_markup("<table><tbody></tbody></table>", "tbody")
            .unwrap_or_else(|| dom::shallow_clone(&fragment_table));
        for row_index in rows.clone() {
            let row = dom::deep_clone(&measured.rows[row_index]);
            if let Some(cell) = dom::select_first(&row, "td") {
                dom::set_text(&cell, &(row_index + 1).to_string());
            }
            body.append(row);
        }
        fragment_table.append(body);
        shell.append(fragment_table);

        TableFragment {
            header: measured.header.as_ref().map(dom::deep_clone),
            rows,
            index,
            title,
            section: shell,
        }
    }
}

/// Finds the clone of `section` among `candidates`: first by its title text,
/// then by the table's markup, else the first section.
fn match_section(candidates: &[NodeRef], section: &NodeRef, table: &NodeRef) -> usize {
    let title = dom::select_first(section, dom::SEL_TITLE)
        .map(|h3| dom::trimmed_text(&h3))
        .filter(|text| !text.is_empty());
    if let Some(title) = title {
        let by_title = candidates.iter().position(|candidate| {
            dom::select_first(candidate, dom::SEL_TITLE)
                .map(|h3| dom::trimmed_text(&h3) == title)
                .unwrap_or(false)
        });
        if let Some(index) = by_title {
            return index;
        }
    }
    let markup = dom::inner_html(table);
    candidates
        .iter()
        .position(|candidate| !markup.is_empty() && dom::inner_html(candidate).contains(&markup))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PrintConfig;
    use crate::host::{BlockLayout, ImmediateScheduler};
    use crate::metrics::PageMetrics;
    use kuchiki::traits::TendrilSink;

    fn metrics(usable: u32) -> PageMetrics {
        PageMetrics {
            device_scale: 96.0,
            page_width_px: 794,
            page_height_px: 1122,
            margin_inches: 0.0,
            reserved_header_px: 0,
            reserved_footer_px: 0,
            usable_page_px: usable,
        }
    }

    fn ctx(usable: u32, config: PrintConfig) -> RunContext {
        RunContext::new(1, metrics(usable), 700.0, &config)
    }

    fn document(before_px: u32, rows: usize) -> NodeRef {
        let body: String = (0..rows)
            .map(|i| format!(r#"<tr style="height: 100px"><td>x</td><td>row {i}</td></tr>"#))
            .collect();
        kuchiki::parse_html().one(format!(
            r#"<html><body><div class="print-content">
                 <section class="print-section" style="height: {before_px}px"><h3>Intro</h3></section>
                 <section class="print-section" id="target"><h3>Lines</h3><div class="meta">Q3</div>
                   <table class="splittable-table" style="width: 50%">
                     <thead style="height: 40px"><tr><th>#</th><th>Item</th></tr></thead>
                     <tbody>{body}</tbody>
                   </table>
                 </section>
               </div></body></html>"#
        ))
    }

    #[test]
    fn twelve_rows_split_after_a_partial_first_page() {
        let fragments = plan_fragments(40, &[100; 12], 500, 250);
        assert_eq!(fragments, vec![0..2, 2..6, 6..10, 10..12]);
    }

    #[test]
    fn full_page_budget_when_remaining_is_not_smaller() {
        assert_eq!(plan_fragments(40, &[100; 5], 500, 500), vec![0..4, 4..5]);
        assert_eq!(plan_fragments(40, &[100; 5], 500, 0), vec![0..4, 4..5]);
    }

    #[test]
    fn oversized_rows_still_form_fragments() {
        let fragments = plan_fragments(40, &[900, 50, 900], 500, 100);
        assert_eq!(fragments, vec![0..1, 1..2, 2..3]);
        assert!(plan_fragments(40, &[], 500, 100).is_empty());
    }

    #[test]
    fn fragments_cover_every_row_once() {
        let heights: Vec<u32> = (0..97).map(|i| 20 + (i * 53 % 180)).collect();
        let fragments = plan_fragments(35, &heights, 400, 120);
        let covered: Vec<usize> = fragments.iter().flat_map(|r| r.clone()).collect();
        assert_eq!(covered, (0..97).collect::<Vec<_>>());
        assert!(fragments.iter().all(|r| !r.is_empty()));
    }

    #[test]
    fn splits_into_numbered_fragments_with_titles() {
        let doc = document(760, 12);
        let before = doc.to_string();
        let content = dom::select_first(&doc, dom::SEL_CONTENT).expect("content");
        let table = dom::select_first(&doc, dom::SEL_SPLITTABLE).expect("table");
        let host = BlockLayout::new();
        let mut scheduler = ImmediateScheduler::new();
        let mut prober = Prober::new(&host, &mut scheduler, 2);
        let run = ctx(2000, PrintConfig::default());
        let split = TableSplitter::new(&run)
            .split_table(&mut prober, &content, &table)
            .expect("split");

        // The table's section shares page one with the 760px intro:
        // 2000 - 760 - 2 = 1238 holds the header and eleven rows.
        let ranges: Vec<Range<usize>> = split.fragments.iter().map(|f| f.rows.clone()).collect();
        assert_eq!(ranges, vec![0..11, 11..12]);
        assert_eq!(split.row_count, 12);
        assert_eq!(doc.to_string(), before);

        let first = &split.fragments[0].section;
        assert!(dom::is_generated(first));
        assert_eq!(dom::get_attr(first, "class").as_deref(), Some("print-section"));
        assert_eq!(
            dom::select_first(first, "h3").map(|h| dom::trimmed_text(&h)).as_deref(),
            Some("Lines")
        );
        assert!(dom::select_first(first, ".meta").is_some());
        let fragment_table = dom::select_first(first, "table").expect("table");
        assert_eq!(
            dom::get_attr(&fragment_table, "style").as_deref(),
            Some(FRAGMENT_TABLE_STYLE)
        );
        assert!(dom::select_first(&fragment_table, "thead").is_some());

        let second = &split.fragments[1];
        assert_eq!(second.title, FragmentTitle::Continuation("(Table - 2)".to_string()));
        let numbers: Vec<String> = dom::select_all(&second.section, "tbody tr td:first-child")
            .iter()
            .map(dom::trimmed_text)
            .collect();
        assert_eq!(numbers, vec!["12".to_string()]);
        let first_numbers: Vec<String> = dom::select_all(first, "tbody tr td:first-child")
            .iter()
            .map(dom::trimmed_text)
            .collect();
        assert_eq!(first_numbers.len(), 11);
        assert_eq!(first_numbers[0], "1");
        assert_eq!(first_numbers[10], "11");
        assert!(dom::select_first(&second.section, ".meta").is_none());
    }

    #[test]
    fn continuation_titles_can_be_disabled() {
        let doc = document(0, 12);
        let content = dom::select_first(&doc, dom::SEL_CONTENT).expect("content");
        let table = dom::select_first(&doc, dom::SEL_SPLITTABLE).expect("table");
        let host = BlockLayout::new();
        let mut scheduler = ImmediateScheduler::new();
        let mut prober = Prober::new(&host, &mut scheduler, 2);
        let run = ctx(500, PrintConfig::default().with_table_titles(false, "Table"));
        let split = TableSplitter::new(&run)
            .split_table(&mut prober, &content, &table)
            .expect("split");
        assert!(split.fragments.len() > 1);
        for fragment in &split.fragments[1..] {
            assert_eq!(fragment.title, FragmentTitle::None);
            assert!(dom::select_first(&fragment.section, "h3").is_none());
        }
    }

    #[test]
    fn tables_without_rows_are_structural_no_ops() {
        let doc = kuchiki::parse_html().one(
            r#"<html><body><div class="print-content"><section class="print-section">
                 <table class="splittable-table"><thead><tr><th>a</th></tr></thead></table>
                 <table class="splittable-table"><thead><tr><th>a</th></tr></thead><tbody></tbody></table>
               </section></div></body></html>"#,
        );
        let content = dom::select_first(&doc, dom::SEL_CONTENT).expect("content");
        let tables = dom::select_all(&doc, dom::SEL_SPLITTABLE);
        let host = BlockLayout::new();
        let mut scheduler = ImmediateScheduler::new();
        let mut prober = Prober::new(&host, &mut scheduler, 2);
        let run = ctx(500, PrintConfig::default());
        let splitter = TableSplitter::new(&run);
        let err = splitter.split_table(&mut prober, &content, &tables[0]).unwrap_err();
        assert!(matches!(err, PrintError::MissingTableBody));
        let err = splitter.split_table(&mut prober, &content, &tables[1]).unwrap_err();
        assert!(matches!(err, PrintError::EmptyTable));
        assert!(err.is_skip());
    }

    #[test]
    fn section_lookup_prefers_title_then_markup() {
        let doc = kuchiki::parse_html().one(
            r#"<html><body>
                 <section class="print-section"><h3>A</h3></section>
                 <section class="print-section"><table id="t"><tbody><tr><td>42</td></tr></tbody></table></section>
                 <section class="print-section"><h3> B </h3></section>
               </body></html>"#,
        );
        let sections = dom::select_all(&doc, dom::SEL_SECTION);
        let table = dom::select_first(&doc, "#t").expect("table");
        assert_eq!(match_section(&sections, &sections[2], &table), 2);
        assert_eq!(match_section(&sections, &sections[1], &table), 1);
        let stray = dom::element_from_markup("<table><tbody><tr><td>7</td></tr></tbody></table>", "table")
            .expect("stray");
        assert_eq!(match_section(&sections, &sections[1], &stray), 0);
    }
}
