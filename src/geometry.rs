use crate::dom;
use crate::host::{FrameScheduler, LayoutHost};
use crate::metrics::round_px;
use kuchiki::NodeRef;

/// A deep clone of a subtree parked in a hidden container at the end of
/// `<body>`. The container is removed when the guard drops.
pub struct OffscreenClone {
    container: NodeRef,
    clone: NodeRef,
    width: f32,
}

impl OffscreenClone {
    pub fn new(node: &NodeRef, width: f32) -> Self {
        let container = dom::element_from_markup("<div></div>", "div")
            .unwrap_or_else(|| dom::shallow_clone(node));
        dom::set_attr(
            &container,
            "style",
            format!(
                "visibility: hidden; position: absolute; left: -99999px; top: -99999px; width: {}px",
                width.max(0.0)
            ),
        );
        let clone = dom::deep_clone(node);
        container.append(clone.clone());
        let root = node.inclusive_ancestors().last();
        if let Some(body) = root.as_ref().and_then(|root| dom::select_first(root, "body")) {
            body.append(container.clone());
        }
        Self {
            container,
            clone,
            width,
        }
    }

    pub fn node(&self) -> &NodeRef {
        &self.clone
    }

    pub fn width(&self) -> f32 {
        self.width
    }
}

impl Drop for OffscreenClone {
    fn drop(&mut self) {
        self.container.detach();
    }
}

/// Reads rendered heights, yielding to the host between zero readings.
pub struct Prober<'a, H: LayoutHost, S: FrameScheduler> {
    host: &'a H,
    scheduler: &'a mut S,
    retries: u32,
}

impl<'a, H: LayoutHost, S: FrameScheduler> Prober<'a, H, S> {
    pub fn new(host: &'a H, scheduler: &'a mut S, retries: u32) -> Self {
        Self {
            host,
            scheduler,
            retries,
        }
    }

    /// Re-reads after a frame while `ready` rejects the value; the last reading
    /// is accepted once the retries run out.
    pub fn settle<T>(&mut self, mut read: impl FnMut(&H) -> T, ready: impl Fn(&T) -> bool) -> T {
        let mut value = read(self.host);
        for _ in 0..self.retries {
            if ready(&value) {
                break;
            }
            self.scheduler.yield_until_rendered(1);
            value = read(self.host);
        }
        value
    }

    /// Height of the first element matching `selector` in the live document,
    /// `None` when there is no such element.
    pub fn measure_live(&mut self, root: &NodeRef, selector: &str) -> Option<u32> {
        let node = dom::select_first(root, selector)?;
        Some(self.settle(|host| live_height(host, &node), |h| *h > 0))
    }

    /// Height of `node` laid out at `width` in an off-screen clone.
    pub fn measure_offscreen(&mut self, node: &NodeRef, width: f32) -> u32 {
        let probe = OffscreenClone::new(node, width);
        self.settle(
            |host| round_px(host.box_height(probe.node(), probe.width())),
            |h| *h > 0,
        )
    }

    /// Rendered heights of the page header and footer, `None` for a missing
    /// element. Re-read while both are present but read zero.
    pub fn measure_chrome(&mut self, root: &NodeRef) -> (Option<u32>, Option<u32>) {
        let header = dom::select_first(root, dom::SEL_HEADER);
        let footer = dom::select_first(root, dom::SEL_FOOTER);
        self.settle(
            |host| {
                (
                    header.as_ref().map(|node| live_height(host, node)),
                    footer.as_ref().map(|node| live_height(host, node)),
                )
            },
            |(header, footer)| {
                (header.is_none() && footer.is_none())
                    || header.unwrap_or(0) > 0
                    || footer.unwrap_or(0) > 0
            },
        )
    }

    /// Single reading, no retry. For nodes inside an already-settled clone.
    pub fn height_in(&self, probe: &OffscreenClone, node: &NodeRef) -> u32 {
        round_px(self.host.box_height(node, probe.width()))
    }

    pub fn margin_bottom(&self, node: &NodeRef) -> u32 {
        round_px(self.host.margin_bottom(node))
    }
}

fn live_height<H: LayoutHost>(host: &H, node: &NodeRef) -> u32 {
    round_px(host.box_height(node, host.content_width(node)))
}
