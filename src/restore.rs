use crate::dom;
use crate::plan::PaginationPlan;
use kuchiki::NodeRef;
use sha2::{Digest, Sha256};

/// How much of a node was snapshotted before it was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreScope {
    /// Only attributes change; the snapshot is a childless shell.
    Attributes,
    /// Descendants change too; the snapshot is a deep clone.
    Subtree,
    /// The node leaves the tree and is itself the pristine copy.
    Detached,
}

#[derive(Debug, Clone)]
pub struct RestoreRecord {
    pub original: NodeRef,
    pub live: NodeRef,
    pub parent: Option<NodeRef>,
    pub next_sibling: Option<NodeRef>,
    pub scope: RestoreScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fidelity {
    Identical,
    Diverged,
    /// Nothing was captured since the last restore.
    Unchecked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub removed_generated: usize,
    /// Detached blocks whose old position was gone; they were prepended to
    /// their parent instead.
    pub fallbacks: usize,
    pub fidelity: Fidelity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub page_breaks: usize,
    pub overflow: usize,
    pub stale_markers: usize,
}

/// Owns every mutation the engine makes to the live document and undoes
/// them on `restore`.
pub struct MutationController {
    document: NodeRef,
    records: Vec<RestoreRecord>,
    generated: Vec<NodeRef>,
    baseline: Option<String>,
}

impl MutationController {
    pub fn new(document: NodeRef) -> Self {
        Self {
            document,
            records: Vec::new(),
            generated: Vec::new(),
            baseline: None,
        }
    }

    pub fn document(&self) -> &NodeRef {
        &self.document
    }

    pub fn has_pending(&self) -> bool {
        !self.records.is_empty() || !self.generated.is_empty()
    }

    pub fn records(&self) -> &[RestoreRecord] {
        &self.records
    }

    /// Snapshots `node` before it is changed. A node keeps one in-place
    /// record; an attribute record widens to a subtree record on demand.
    pub fn capture(&mut self, node: &NodeRef, scope: RestoreScope) {
        if self.baseline.is_none() {
            self.baseline = Some(document_digest(&self.document));
        }
        if scope != RestoreScope::Detached {
            let existing = self
                .records
                .iter_mut()
                .find(|record| record.live == *node && record.scope != RestoreScope::Detached);
            if let Some(record) = existing {
                if record.scope == RestoreScope::Attributes && scope == RestoreScope::Subtree {
                    for child in node.children() {
                        record.original.append(dom::deep_clone(&child));
                    }
                    record.scope = RestoreScope::Subtree;
                }
                return;
            }
        }
        let original = match scope {
            RestoreScope::Attributes => dom::shallow_clone(node),
            RestoreScope::Subtree => dom::deep_clone(node),
            RestoreScope::Detached => node.clone(),
        };
        let next_sibling = node
            .following_siblings()
            .find(|sibling| !dom::is_generated(sibling));
        self.records.push(RestoreRecord {
            original,
            live: node.clone(),
            parent: node.parent(),
            next_sibling,
            scope,
        });
    }

    /// Puts `fragments` where `section` was and takes `section` out of the
    /// tree.
    pub fn replace_with_fragments(&mut self, section: &NodeRef, fragments: &[NodeRef]) {
        if section.parent().is_none() {
            return;
        }
        self.capture(section, RestoreScope::Detached);
        for fragment in fragments {
            dom::set_attr(fragment, dom::ATTR_GENERATED, "true");
            section.insert_before(fragment.clone());
            self.generated.push(fragment.clone());
        }
        section.detach();
    }

    pub fn add_marker(&mut self, node: &NodeRef, class: &str) {
        if dom::has_class(node, class) {
            return;
        }
        if !dom::is_generated(node) {
            self.capture(node, RestoreScope::Attributes);
        }
        dom::add_class(node, class);
    }

    pub fn remove_marker(&mut self, node: &NodeRef, class: &str) -> bool {
        if !dom::has_class(node, class) {
            return false;
        }
        if !dom::is_generated(node) {
            self.capture(node, RestoreScope::Attributes);
        }
        dom::remove_class(node, class);
        true
    }

    pub fn set_text(&mut self, node: &NodeRef, text: &str) {
        if !dom::is_generated(node) {
            self.capture(node, RestoreScope::Subtree);
        }
        dom::set_text(node, text);
    }

    /// Writes `--name: value` into the inline style of `<html>`.
    pub fn set_root_property(&mut self, name: &str, value: &str) -> bool {
        let Some(root) = dom::select_first(&self.document, "html") else {
            return false;
        };
        self.capture(&root, RestoreScope::Attributes);
        dom::set_inline_custom_property(&root, name, value);
        true
    }

    /// Marks page starts and oversized blocks on `sections` (the measured
    /// sections, in the same order as the plan's indices) and clears
    /// markers the plan no longer calls for.
    pub fn commit(&mut self, plan: &PaginationPlan, sections: &[NodeRef]) -> CommitSummary {
        let mut summary = CommitSummary::default();
        for (index, section) in sections.iter().enumerate() {
            if !plan.break_before.contains(&index)
                && self.remove_marker(section, dom::CLASS_FORCE_NEW_PAGE)
            {
                summary.stale_markers += 1;
            }
            if !plan.overflow.contains(&index)
                && self.remove_marker(section, dom::CLASS_OVERFLOW_WARNING)
            {
                summary.stale_markers += 1;
            }
        }
        for &index in &plan.break_before {
            if let Some(section) = sections.get(index) {
                self.add_marker(section, dom::CLASS_FORCE_NEW_PAGE);
                summary.page_breaks += 1;
            }
        }
        for &index in &plan.overflow {
            if let Some(section) = sections.get(index) {
                self.add_marker(section, dom::CLASS_OVERFLOW_WARNING);
                summary.overflow += 1;
            }
        }
        summary
    }

    /// Writes "Page N" into the label slot of each page's leading block.
    /// Returns how many pages received a label.
    pub fn apply_page_labels(&mut self, plan: &PaginationPlan, sections: &[NodeRef]) -> usize {
        let mut written = 0;
        for label in &plan.labels {
            let Some(block) = sections.get(label.block) else {
                continue;
            };
            if let Some(slot) = label_slot(block) {
                self.set_text(&slot, &label.text);
                written += 1;
            }
        }
        written
    }

    pub fn clear_page_labels(&mut self) -> usize {
        let mut slots = dom::select_all(&self.document, dom::SEL_PAGE_LABEL);
        for legacy in dom::select_all(&self.document, dom::SEL_LEGACY_PAGE_LABEL) {
            if !slots.contains(&legacy) {
                slots.push(legacy);
            }
        }
        let mut cleared = 0;
        for slot in slots {
            if !slot.text_contents().is_empty() {
                self.set_text(&slot, "");
                cleared += 1;
            }
        }
        cleared
    }

    /// Undoes every captured mutation, newest first, and removes generated
    /// nodes. Calling it again with nothing captured changes nothing.
    pub fn restore(&mut self) -> RestoreReport {
        let mut removed_generated = 0;
        let mut doomed = std::mem::take(&mut self.generated);
        for swept in dom::select_all(&self.document, dom::SEL_GENERATED) {
            if !doomed.contains(&swept) {
                doomed.push(swept);
            }
        }
        for node in doomed {
            if node.parent().is_some() {
                node.detach();
                removed_generated += 1;
            }
        }

        let mut restored = 0;
        let mut fallbacks = 0;
        while let Some(record) = self.records.pop() {
            match record.scope {
                RestoreScope::Attributes => {
                    dom::copy_attributes(&record.original, &record.live);
                }
                RestoreScope::Subtree => {
                    dom::copy_attributes(&record.original, &record.live);
                    dom::clear_children(&record.live);
                    let children: Vec<NodeRef> = record.original.children().collect();
                    for child in children {
                        record.live.append(child);
                    }
                }
                RestoreScope::Detached => {
                    if !self.reinsert(&record) {
                        fallbacks += 1;
                    }
                }
            }
            restored += 1;
        }

        let fidelity = match self.baseline.take() {
            Some(before) if before == document_digest(&self.document) => Fidelity::Identical,
            Some(_) => Fidelity::Diverged,
            None => Fidelity::Unchecked,
        };
        RestoreReport {
            restored,
            removed_generated,
            fallbacks,
            fidelity,
        }
    }

    /// Returns false when the recorded anchor was gone.
    fn reinsert(&self, record: &RestoreRecord) -> bool {
        let node = &record.original;
        if node.parent().is_some() {
            return true;
        }
        let parent = record
            .parent
            .clone()
            .or_else(|| dom::select_first(&self.document, dom::SEL_CONTENT));
        let Some(parent) = parent else {
            return false;
        };
        match &record.next_sibling {
            Some(anchor) if dom::is_child_of(anchor, &parent) => {
                anchor.insert_before(node.clone());
                true
            }
            Some(_) => {
                parent.prepend(node.clone());
                false
            }
            None => {
                parent.append(node.clone());
                record.parent.is_some()
            }
        }
    }
}

/// `.page-no` in the block, then the first `.page-no` in its container,
/// then the legacy `#page-no` in the block and in its container.
fn label_slot(block: &NodeRef) -> Option<NodeRef> {
    let container = block.parent();
    let in_container = |selector: &str| {
        container
            .as_ref()
            .and_then(|container| dom::select_first(container, selector))
    };
    dom::select_first(block, dom::SEL_PAGE_LABEL)
        .or_else(|| in_container(dom::SEL_PAGE_LABEL))
        .or_else(|| dom::select_first(block, dom::SEL_LEGACY_PAGE_LABEL))
        .or_else(|| in_container(dom::SEL_LEGACY_PAGE_LABEL))
}

pub fn document_digest(document: &NodeRef) -> String {
    sha256_hex(document.to_string().as_bytes())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
