mod context;
mod debug;
mod dom;
mod error;
mod frame;
mod geometry;
mod host;
mod metrics;
mod paginate;
mod perf;
mod plan;
mod restore;
mod style;
mod table;

pub use context::{PrintConfig, RunContext};
pub use error::PrintError;
pub use frame::PageFrame;
pub use geometry::{OffscreenClone, Prober};
pub use host::{BlockLayout, FrameScheduler, ImmediateScheduler, LayoutHost};
pub use metrics::{
    DensityCache, MetricsSource, Orientation, PageMetrics, PaperSize, read_metrics,
};
pub use paginate::{ContentBlock, Page, paginate, remaining_before};
pub use plan::{PageLabel, PaginationPlan, page_label, plan_pages};
pub use restore::{
    CommitSummary, Fidelity, MutationController, RestoreRecord, RestoreReport, RestoreScope,
    document_digest,
};
pub use style::{CssLength, LengthUnit, RootVars};
pub use table::{FragmentTitle, TableFragment, TableSplit, TableSplitter, plan_fragments};

use debug::{DebugLogger, TableEvent};
use kuchiki::NodeRef;
use perf::PerfLogger;
use std::sync::Arc;

/// Frames to wait after the first chrome measurement, and after the second.
const SETTLE_FRAMES: [u32; 2] = [2, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The caller is about to print; prepare now.
    Begin,
    BeforePrint,
    AfterPrint,
}

#[derive(Debug)]
pub enum LifecycleOutcome {
    Prepared(PrepareReport),
    /// Already prepared for the pending print.
    Skipped,
    Restored(RestoreReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SyncChrome,
    SplitTables,
    Paginate,
    PageNumbers,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::SyncChrome => "sync_chrome",
            Step::SplitTables => "split_tables",
            Step::Paginate => "paginate",
            Step::PageNumbers => "page_numbers",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSummary {
    Chrome {
        header_px: u32,
        footer_px: u32,
        usable_page_px: u32,
    },
    Tables {
        split: usize,
        skipped: usize,
        failed: usize,
        fragments: usize,
    },
    Pages {
        pages: usize,
        page_breaks: usize,
        overflow: usize,
    },
    Labels {
        written: usize,
        cleared: usize,
    },
}

#[derive(Debug)]
pub struct StepReport {
    pub step: Step,
    pub outcome: Result<StepSummary, PrintError>,
    pub elapsed_ms: f64,
}

#[derive(Debug)]
pub struct PrepareReport {
    pub run_id: u64,
    /// Restore of records left over from a cycle that never tore down.
    pub leftover: Option<RestoreReport>,
    pub steps: Vec<StepReport>,
}

impl PrepareReport {
    pub fn is_clean(&self) -> bool {
        self.steps.iter().all(|step| step.outcome.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|step| step.outcome.is_err())
    }

    /// Latest report for `step`.
    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().rev().find(|report| report.step == step)
    }

    pub fn page_count(&self) -> Option<usize> {
        match self.step(Step::Paginate)?.outcome {
            Ok(StepSummary::Pages { pages, .. }) => Some(pages),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct PrintRun<R> {
    pub output: R,
    pub prepared: PrepareReport,
    pub restored: RestoreReport,
}

struct Planned {
    plan: PaginationPlan,
    sections: Vec<NodeRef>,
}

/// Paginates one live document for printing and puts it back afterwards.
pub struct PrintSession<H: LayoutHost, S: FrameScheduler> {
    document: NodeRef,
    host: H,
    scheduler: S,
    config: PrintConfig,
    controller: MutationController,
    density: DensityCache,
    debug: Option<Arc<DebugLogger>>,
    perf: Option<Arc<PerfLogger>>,
    pending_print: bool,
    run_id: u64,
}

#[derive(Clone)]
pub struct PrintSessionBuilder {
    document: NodeRef,
    config: PrintConfig,
    debug_path: Option<std::path::PathBuf>,
    perf_path: Option<std::path::PathBuf>,
}

impl PrintSessionBuilder {
    pub fn new(document: NodeRef) -> Self {
        Self {
            document,
            config: PrintConfig::default(),
            debug_path: None,
            perf_path: None,
        }
    }

    pub fn config(mut self, config: PrintConfig) -> Self {
        self.config = config;
        self
    }

    pub fn debug_log(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn perf_log(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    pub fn build<H: LayoutHost, S: FrameScheduler>(
        self,
        host: H,
        scheduler: S,
    ) -> Result<PrintSession<H, S>, PrintError> {
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        let perf = if let Some(path) = self.perf_path {
            Some(Arc::new(PerfLogger::new(path)?))
        } else {
            None
        };
        Ok(PrintSession {
            controller: MutationController::new(self.document.clone()),
            document: self.document,
            host,
            scheduler,
            config: self.config,
            density: DensityCache::new(),
            debug,
            perf,
            pending_print: false,
            run_id: 0,
        })
    }

    /// A session over [`BlockLayout`], for callers without a rendering host.
    pub fn build_headless(self) -> Result<PrintSession<BlockLayout, ImmediateScheduler>, PrintError> {
        self.build(BlockLayout::new(), ImmediateScheduler::new())
    }
}

impl<H: LayoutHost, S: FrameScheduler> PrintSession<H, S> {
    pub fn document(&self) -> &NodeRef {
        &self.document
    }

    pub fn config(&self) -> &PrintConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn is_prepared(&self) -> bool {
        self.controller.has_pending()
    }

    pub fn handle(&mut self, event: LifecycleEvent) -> LifecycleOutcome {
        match event {
            LifecycleEvent::Begin => {
                let report = self.prepare();
                self.pending_print = true;
                LifecycleOutcome::Prepared(report)
            }
            LifecycleEvent::BeforePrint => {
                if self.pending_print {
                    LifecycleOutcome::Skipped
                } else {
                    LifecycleOutcome::Prepared(self.prepare())
                }
            }
            LifecycleEvent::AfterPrint => {
                self.pending_print = false;
                LifecycleOutcome::Restored(self.teardown())
            }
        }
    }

    /// Prepares, hands the paginated document to `print`, then restores it.
    pub fn print_with<R>(&mut self, print: impl FnOnce(&NodeRef) -> R) -> PrintRun<R> {
        let prepared = self.prepare();
        let output = print(&self.document);
        let restored = self.teardown();
        PrintRun {
            output,
            prepared,
            restored,
        }
    }

    /// Runs every pagination step in order. A failing step is reported and
    /// the next one still runs.
    pub fn prepare(&mut self) -> PrepareReport {
        self.run_id += 1;
        let run_id = self.run_id;
        let leftover = if self.controller.has_pending() {
            let report = self.controller.restore();
            self.log_restore(run_id, &report);
            Some(report)
        } else {
            None
        };

        let mut steps = Vec::with_capacity(5);
        steps.push(self.run_step(Step::SyncChrome, run_id, |session| session.sync_chrome()));
        self.scheduler.yield_until_rendered(SETTLE_FRAMES[0]);
        steps.push(self.run_step(Step::SyncChrome, run_id, |session| session.sync_chrome()));
        self.scheduler.yield_until_rendered(SETTLE_FRAMES[1]);
        steps.push(self.run_step(Step::SplitTables, run_id, |session| {
            session.split_tables(run_id)
        }));
        let mut planned = None;
        steps.push(self.run_step(Step::Paginate, run_id, |session| {
            session.paginate(run_id, &mut planned)
        }));
        steps.push(self.run_step(Step::PageNumbers, run_id, |session| {
            session.page_numbers(planned.as_ref())
        }));

        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(&format!("print.prepare#{}", run_id));
        }
        PrepareReport {
            run_id,
            leftover,
            steps,
        }
    }

    /// Undoes everything `prepare` changed. Safe to call any number of times.
    pub fn teardown(&mut self) -> RestoreReport {
        let report = self.controller.restore();
        self.log_restore(self.run_id, &report);
        self.emit_debug_summary("print.teardown");
        report
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
        if let Some(perf) = self.perf.as_deref() {
            perf.flush();
        }
    }

    fn run_step(
        &mut self,
        step: Step,
        run_id: u64,
        body: impl FnOnce(&mut Self) -> Result<StepSummary, PrintError>,
    ) -> StepReport {
        let started = std::time::Instant::now();
        let outcome = body(self);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Some(logger) = self.debug.as_deref() {
            logger.step(run_id, step.name(), outcome.as_ref().err(), elapsed_ms);
        }
        if let Some(perf) = self.perf.as_deref() {
            perf.log_span_ms(&format!("print.{}", step.name()), run_id, elapsed_ms);
        }
        StepReport {
            step,
            outcome,
            elapsed_ms,
        }
    }

    fn run_context(&self, run_id: u64, content: &NodeRef) -> RunContext {
        let vars = RootVars::from_document(&self.document);
        let source = MetricsSource::from_root_vars(&vars);
        let metrics = self.read_page_metrics(&source);
        RunContext::new(run_id, metrics, self.host.content_width(content), &self.config)
    }

    fn read_page_metrics(&self, source: &MetricsSource) -> PageMetrics {
        let ppi = self.density.resolve(|| self.host.pixels_per_inch());
        read_metrics(source, self.config.paper, self.config.orientation, ppi)
    }

    fn sync_chrome(&mut self) -> Result<StepSummary, PrintError> {
        let (header, footer) = {
            let mut prober =
                Prober::new(&self.host, &mut self.scheduler, self.config.measure_retries);
            prober.measure_chrome(&self.document)
        };
        if let Some(px) = header {
            self.controller
                .set_root_property(metrics::VAR_HEADER_HEIGHT, &format!("{}px", px));
        }
        if let Some(px) = footer {
            self.controller
                .set_root_property(metrics::VAR_FOOTER_HEIGHT, &format!("{}px", px));
        }
        let vars = RootVars::from_document(&self.document);
        let source = MetricsSource::from_root_vars(&vars).with_chrome(header, footer);
        let metrics = self.read_page_metrics(&source);
        Ok(StepSummary::Chrome {
            header_px: metrics.reserved_header_px,
            footer_px: metrics.reserved_footer_px,
            usable_page_px: metrics.usable_page_px,
        })
    }

    fn split_tables(&mut self, run_id: u64) -> Result<StepSummary, PrintError> {
        let content =
            dom::select_first(&self.document, dom::SEL_CONTENT).ok_or(PrintError::MissingContent)?;
        let tables = dom::select_all(&content, dom::SEL_SPLITTABLE);
        let ctx = self.run_context(run_id, &content);
        let (mut split, mut skipped, mut failed, mut fragments) = (0, 0, 0, 0);
        for table in tables {
            let result = {
                let mut prober =
                    Prober::new(&self.host, &mut self.scheduler, self.config.measure_retries);
                TableSplitter::new(&ctx).split_table(&mut prober, &content, &table)
            };
            match result {
                Ok(outcome) => {
                    let sections: Vec<NodeRef> = outcome
                        .fragments
                        .iter()
                        .map(|fragment| fragment.section.clone())
                        .collect();
                    self.controller
                        .replace_with_fragments(&outcome.section, &sections);
                    split += 1;
                    fragments += sections.len();
                    if let Some(logger) = self.debug.as_deref() {
                        logger.table_split(
                            run_id,
                            TableEvent::Split {
                                rows: outcome.row_count,
                                fragments: sections.len(),
                            },
                        );
                    }
                }
                Err(err) => {
                    let event = if err.is_skip() {
                        skipped += 1;
                        TableEvent::Skipped(&err)
                    } else {
                        failed += 1;
                        TableEvent::Failed(&err)
                    };
                    if let Some(logger) = self.debug.as_deref() {
                        logger.table_split(run_id, event);
                    }
                }
            }
        }
        Ok(StepSummary::Tables {
            split,
            skipped,
            failed,
            fragments,
        })
    }

    fn paginate(
        &mut self,
        run_id: u64,
        planned: &mut Option<Planned>,
    ) -> Result<StepSummary, PrintError> {
        let content =
            dom::select_first(&self.document, dom::SEL_CONTENT).ok_or(PrintError::MissingContent)?;
        let ctx = self.run_context(run_id, &content);
        let blocks = {
            let mut prober =
                Prober::new(&self.host, &mut self.scheduler, self.config.measure_retries);
            let (probe, blocks) = paginate::collect_blocks(
                &mut prober,
                &content,
                ctx.content_width,
                ctx.usable_page_px(),
            )?;
            drop(probe);
            blocks
        };
        let sections = dom::select_all(&content, dom::SEL_SECTION);
        let plan = plan_pages(&blocks, ctx.usable_page_px());
        let summary = self.controller.commit(&plan, &sections);
        if let Some(logger) = self.debug.as_deref() {
            for &block in &plan.break_before {
                let page = plan.page_of(block).map(|page| page + 1).unwrap_or(0);
                logger.page_break(run_id, block, page);
            }
            for &block in &plan.overflow {
                let height = blocks.get(block).map(|b| b.height).unwrap_or(0);
                logger.overflow(run_id, block, height, ctx.usable_page_px());
            }
            logger.increment("pages", plan.page_count() as u64);
        }
        let pages = plan.page_count();
        *planned = Some(Planned { plan, sections });
        Ok(StepSummary::Pages {
            pages,
            page_breaks: summary.page_breaks,
            overflow: summary.overflow,
        })
    }

    fn page_numbers(&mut self, planned: Option<&Planned>) -> Result<StepSummary, PrintError> {
        if !self.config.show_page_numbers {
            let cleared = self.controller.clear_page_labels();
            return Ok(StepSummary::Labels {
                written: 0,
                cleared,
            });
        }
        let Some(planned) = planned else {
            return Err(if dom::select_first(&self.document, dom::SEL_CONTENT).is_none() {
                PrintError::MissingContent
            } else {
                PrintError::NoSections
            });
        };
        let written = self
            .controller
            .apply_page_labels(&planned.plan, &planned.sections);
        Ok(StepSummary::Labels {
            written,
            cleared: 0,
        })
    }

    fn log_restore(&self, run_id: u64, report: &RestoreReport) {
        if let Some(logger) = self.debug.as_deref() {
            logger.restore(run_id, report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::TendrilSink;
    use std::time::{SystemTime, UNIX_EPOCH};

    // Header 100px and footer 22px leave 1000px of a 1122px A4 page.
    fn report_document(extra_sections: &str) -> NodeRef {
        let rows: String = (0..12)
            .map(|i| format!(r#"<tr style="height: 100px"><td>0</td><td>item {i}</td></tr>"#))
            .collect();
        kuchiki::parse_html().one(format!(
            r#"<!DOCTYPE html><html><head><style>:root {{ --page-margin-in: 0; }}</style></head><body>
                 <header class="print-header" style="height: 100px"></header>
                 <div class="print-content">
                   <section class="print-section force-new-page" id="a" style="height: 300px"><span class="page-no"></span></section>
                   <section class="print-section" id="b" style="height: 300px"></section>
                   <section class="print-section" id="c"><h3>Lines</h3><div class="meta">FY</div>
                     <table class="splittable-table">
                       <thead style="height: 40px"><tr><th>#</th><th>Item</th></tr></thead>
                       <tbody>{rows}</tbody>
                     </table>
                   </section>
                   <section class="print-section" id="d" style="height: 300px"><span class="page-no">keep</span></section>
                   {extra_sections}
                 </div>
                 <footer class="print-footer" style="height: 22px"></footer>
               </body></html>"#
        ))
    }

    fn labelled_sections(count: usize) -> NodeRef {
        let sections: String = (0..count)
            .map(|i| {
                format!(
                    r#"<section class="print-section" style="height: 600px"><span class="page-no" id="l{i}"></span></section>"#
                )
            })
            .collect();
        kuchiki::parse_html().one(format!(
            r#"<html><body><div class="print-content">{sections}</div></body></html>"#
        ))
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("printflow_{}_{}.log", name, nanos))
    }

    fn session(doc: &NodeRef) -> PrintSession<BlockLayout, ImmediateScheduler> {
        PrintSessionBuilder::new(doc.clone())
            .build_headless()
            .expect("session")
    }

    fn texts(doc: &NodeRef, selector: &str) -> Vec<String> {
        dom::select_all(doc, selector)
            .iter()
            .map(dom::trimmed_text)
            .collect()
    }

    #[test]
    fn prepare_splits_paginates_and_teardown_restores() {
        let doc = report_document("");
        let before = doc.to_string();
        let mut session = session(&doc);

        let report = session.prepare();
        assert!(report.is_clean(), "{:?}", report.steps);
        assert_eq!(
            report.step(Step::SyncChrome).map(|s| s.outcome.as_ref().ok().cloned()),
            Some(Some(StepSummary::Chrome {
                header_px: 100,
                footer_px: 22,
                usable_page_px: 1000
            }))
        );
        assert_eq!(
            report.step(Step::SplitTables).and_then(|s| s.outcome.as_ref().ok().cloned()),
            Some(StepSummary::Tables {
                split: 1,
                skipped: 0,
                failed: 0,
                fragments: 2
            })
        );
        // a+b | rows 1-9 | rows 10-12 + d
        assert_eq!(report.page_count(), Some(3));

        let html = dom::select_first(&doc, "html").expect("html");
        let style = dom::get_attr(&html, "style").unwrap_or_default();
        assert!(style.contains("--header-h: 100px"), "{}", style);
        assert!(style.contains("--footer-h: 22px"), "{}", style);

        let a = dom::select_first(&doc, "#a").expect("a");
        assert!(!dom::has_class(&a, dom::CLASS_FORCE_NEW_PAGE));
        let generated = dom::select_all(&doc, dom::SEL_GENERATED);
        assert_eq!(generated.len(), 2);
        assert!(generated.iter().all(|s| dom::has_class(s, dom::CLASS_FORCE_NEW_PAGE)));
        assert!(dom::select_first(&doc, "#c").is_none());
        // Fragments have no slot of their own and fall back to the first
        // `.page-no` in the content container.
        assert_eq!(texts(&doc, "#a .page-no"), vec!["Page 3"]);
        assert_eq!(texts(&doc, "#d .page-no"), vec!["keep"]);
        let numbers = texts(&generated[1], "tbody tr td:first-child");
        assert_eq!(numbers, vec!["10", "11", "12"]);

        let restored = session.teardown();
        assert_eq!(restored.fidelity, Fidelity::Identical);
        assert_eq!(doc.to_string(), before);
        assert_eq!(session.teardown().restored, 0);
        assert_eq!(doc.to_string(), before);
    }

    #[test]
    fn oversized_blocks_are_flagged() {
        let doc = report_document(
            r#"<section class="print-section" id="tall" style="height: 1400px"></section>"#,
        );
        let mut session = session(&doc);
        let report = session.prepare();
        assert!(matches!(
            report.step(Step::Paginate).map(|s| &s.outcome),
            Some(Ok(StepSummary::Pages { overflow: 1, .. }))
        ));
        let tall = dom::select_first(&doc, "#tall").expect("tall");
        assert!(dom::has_class(&tall, dom::CLASS_OVERFLOW_WARNING));
        assert!(dom::has_class(&tall, dom::CLASS_FORCE_NEW_PAGE));
        session.teardown();
        assert!(!dom::has_class(&tall, dom::CLASS_OVERFLOW_WARNING));
    }

    #[test]
    fn page_numbers_restart_every_run() {
        let doc = labelled_sections(4);
        let mut session = session(&doc);
        session.prepare();
        assert_eq!(
            texts(&doc, ".page-no"),
            vec!["Page 1", "Page 2", "Page 3", "Page 4"]
        );
        // A second prepare without teardown first undoes the previous run.
        let again = session.prepare();
        assert!(again.leftover.is_some());
        assert_eq!(
            texts(&doc, ".page-no"),
            vec!["Page 1", "Page 2", "Page 3", "Page 4"]
        );
        session.teardown();
        assert!(texts(&doc, ".page-no").iter().all(String::is_empty));
    }

    #[test]
    fn disabled_page_numbers_clear_labels() {
        let doc = report_document("");
        let before = doc.to_string();
        let mut session = PrintSessionBuilder::new(doc.clone())
            .config(PrintConfig::default().with_page_numbers(false))
            .build_headless()
            .expect("session");
        let report = session.prepare();
        assert_eq!(
            report.step(Step::PageNumbers).and_then(|s| s.outcome.as_ref().ok().cloned()),
            Some(StepSummary::Labels {
                written: 0,
                cleared: 1
            })
        );
        assert!(texts(&doc, ".page-no").iter().all(String::is_empty));
        session.teardown();
        assert_eq!(doc.to_string(), before);
    }

    #[test]
    fn lifecycle_prepares_once_per_print() {
        let doc = labelled_sections(2);
        let before = doc.to_string();
        let mut session = session(&doc);
        assert!(matches!(
            session.handle(LifecycleEvent::Begin),
            LifecycleOutcome::Prepared(_)
        ));
        assert!(matches!(
            session.handle(LifecycleEvent::BeforePrint),
            LifecycleOutcome::Skipped
        ));
        assert!(session.is_prepared());
        match session.handle(LifecycleEvent::AfterPrint) {
            LifecycleOutcome::Restored(report) => assert_eq!(report.fidelity, Fidelity::Identical),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(doc.to_string(), before);
        assert!(matches!(
            session.handle(LifecycleEvent::BeforePrint),
            LifecycleOutcome::Prepared(_)
        ));
        session.handle(LifecycleEvent::AfterPrint);
        assert_eq!(doc.to_string(), before);
    }

    #[test]
    fn print_with_sees_the_paginated_document() {
        let doc = labelled_sections(3);
        let before = doc.to_string();
        let mut session = session(&doc);
        let run = session.print_with(|document| texts(document, ".page-no"));
        assert_eq!(run.output, vec!["Page 1", "Page 2", "Page 3"]);
        assert!(run.prepared.is_clean());
        assert_eq!(run.restored.fidelity, Fidelity::Identical);
        assert_eq!(doc.to_string(), before);
        // Two sync steps with 2 + 1 settle frames in between.
        assert_eq!(session.scheduler().frames_yielded(), 3);
    }

    #[test]
    fn failing_steps_do_not_stop_the_run() {
        let doc = kuchiki::parse_html().one(
            r#"<html><body><header class="print-header" style="height: 50px"></header><p>loose</p></body></html>"#,
        );
        let before = doc.to_string();
        let mut session = session(&doc);
        let report = session.prepare();
        let outcomes: Vec<(Step, bool)> = report
            .steps
            .iter()
            .map(|s| (s.step, s.outcome.is_ok()))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                (Step::SyncChrome, true),
                (Step::SyncChrome, true),
                (Step::SplitTables, false),
                (Step::Paginate, false),
                (Step::PageNumbers, false),
            ]
        );
        assert!(matches!(
            report.step(Step::Paginate).map(|s| &s.outcome),
            Some(Err(PrintError::MissingContent))
        ));
        assert_eq!(report.failures().count(), 3);
        session.teardown();
        assert_eq!(doc.to_string(), before);
    }

    #[test]
    fn empty_tables_are_skipped_and_the_rest_continues() {
        let doc = report_document(
            r#"<section class="print-section"><table class="splittable-table"><thead><tr><th>x</th></tr></thead><tbody></tbody></table></section>"#,
        );
        let mut session = session(&doc);
        let report = session.prepare();
        assert_eq!(
            report.step(Step::SplitTables).and_then(|s| s.outcome.as_ref().ok().cloned()),
            Some(StepSummary::Tables {
                split: 1,
                skipped: 1,
                failed: 0,
                fragments: 2
            })
        );
        assert!(report.is_clean());
        session.teardown();
    }

    #[test]
    fn steps_are_logged_as_json_lines() {
        let doc = report_document("");
        let debug_path = temp_path("debug");
        let perf_path = temp_path("perf");
        let mut session = PrintSessionBuilder::new(doc.clone())
            .debug_log(&debug_path)
            .perf_log(&perf_path)
            .build_headless()
            .expect("session");
        session.print_with(|_| ());
        drop(session);

        let debug = std::fs::read_to_string(&debug_path).expect("debug log");
        for event in [
            "\"type\":\"print.step\"",
            "\"type\":\"print.table_split\"",
            "\"type\":\"print.page_break\"",
            "\"type\":\"print.restore\"",
            "\"type\":\"debug.summary\"",
        ] {
            assert!(debug.contains(event), "missing {} in {}", event, debug);
        }
        let perf = std::fs::read_to_string(&perf_path).expect("perf log");
        assert!(perf.contains("print.split_tables"));
        let _ = std::fs::remove_file(&debug_path);
        let _ = std::fs::remove_file(&perf_path);
        let _ = std::fs::remove_file(perf::hot_path_for(&perf_path));
    }
}
