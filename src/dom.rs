use kuchiki::{NodeData, NodeRef};

pub const SEL_CONTENT: &str = ".print-content";
pub const SEL_SECTION: &str = ".print-section";
pub const SEL_SPLITTABLE: &str = "table.splittable-table";
pub const SEL_HEADER: &str = ".print-header";
pub const SEL_FOOTER: &str = ".print-footer";
pub const SEL_PAGE_LABEL: &str = ".page-no";
pub const SEL_LEGACY_PAGE_LABEL: &str = "#page-no";
pub const SEL_TITLE: &str = "h3";
pub const SEL_META: &str = ".meta";
pub const SEL_GENERATED: &str = "[data-generated=\"true\"]";

pub const CLASS_SECTION: &str = "print-section";
pub const CLASS_FORCE_NEW_PAGE: &str = "force-new-page";
pub const CLASS_OVERFLOW_WARNING: &str = "content-overflow-warning";
pub const ATTR_GENERATED: &str = "data-generated";

pub fn select_first(root: &NodeRef, selector: &str) -> Option<NodeRef> {
    root.select_first(selector)
        .ok()
        .map(|node| node.as_node().clone())
}

pub fn select_all(root: &NodeRef, selector: &str) -> Vec<NodeRef> {
    match root.select(selector) {
        Ok(nodes) => nodes.map(|node| node.as_node().clone()).collect(),
        Err(()) => Vec::new(),
    }
}

/// Element children only, in document order.
pub fn element_children(node: &NodeRef) -> impl Iterator<Item = NodeRef> {
    node.children().filter(|child| child.as_element().is_some())
}

/// Copies a subtree into a new detached tree. Template contents are shared.
pub fn deep_clone(node: &NodeRef) -> NodeRef {
    let copy = shallow_clone(node);
    for child in node.children() {
        copy.append(deep_clone(&child));
    }
    copy
}

/// Copies a node and its attributes, without children.
pub fn shallow_clone(node: &NodeRef) -> NodeRef {
    match node.data() {
        NodeData::Element(el) => {
            let attrs = el.attributes.borrow().map.clone();
            NodeRef::new_element(el.name.clone(), attrs)
        }
        NodeData::Text(text) => NodeRef::new_text(text.borrow().clone()),
        NodeData::Comment(text) => NodeRef::new_comment(text.borrow().clone()),
        NodeData::ProcessingInstruction(pi) => {
            let pi = pi.borrow();
            NodeRef::new_processing_instruction(pi.0.clone(), pi.1.clone())
        }
        NodeData::Doctype(doctype) => NodeRef::new_doctype(
            doctype.name.clone(),
            doctype.public_id.clone(),
            doctype.system_id.clone(),
        ),
        NodeData::Document(_) => NodeRef::new_document(),
        NodeData::DocumentFragment => NodeRef::new(NodeData::DocumentFragment),
    }
}

/// An empty element with the same tag as `template` and no attributes.
pub fn empty_like(template: &NodeRef) -> Option<NodeRef> {
    let el = template.as_element()?;
    Some(NodeRef::new_element(el.name.clone(), std::iter::empty()))
}

/// Parses `markup` and returns its first element matching `selector`, detached.
pub fn element_from_markup(markup: &str, selector: &str) -> Option<NodeRef> {
    use kuchiki::traits::TendrilSink;
    let doc = kuchiki::parse_html().one(markup);
    let node = select_first(&doc, selector)?;
    node.detach();
    Some(node)
}

pub fn get_attr(node: &NodeRef, name: &str) -> Option<String> {
    let el = node.as_element()?;
    el.attributes.borrow().get(name).map(str::to_string)
}

pub fn set_attr(node: &NodeRef, name: &str, value: impl Into<String>) {
    if let Some(el) = node.as_element() {
        el.attributes.borrow_mut().insert(name, value.into());
    }
}

pub fn remove_attr(node: &NodeRef, name: &str) {
    if let Some(el) = node.as_element() {
        el.attributes.borrow_mut().remove(name);
    }
}

/// Replaces every attribute of `target` with those of `source`.
pub fn copy_attributes(source: &NodeRef, target: &NodeRef) {
    let (Some(from), Some(to)) = (source.as_element(), target.as_element()) else {
        return;
    };
    let attrs = from.attributes.borrow().map.clone();
    to.attributes.borrow_mut().map = attrs;
}

pub fn has_class(node: &NodeRef, class: &str) -> bool {
    get_attr(node, "class")
        .map(|classes| classes.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

pub fn add_class(node: &NodeRef, class: &str) {
    if has_class(node, class) {
        return;
    }
    let classes = get_attr(node, "class").unwrap_or_default();
    let joined = if classes.trim().is_empty() {
        class.to_string()
    } else {
        format!("{} {}", classes.trim(), class)
    };
    set_attr(node, "class", joined);
}

pub fn remove_class(node: &NodeRef, class: &str) {
    let Some(classes) = get_attr(node, "class") else {
        return;
    };
    let kept: Vec<&str> = classes.split_whitespace().filter(|c| *c != class).collect();
    if kept.is_empty() {
        remove_attr(node, "class");
    } else {
        set_attr(node, "class", kept.join(" "));
    }
}

pub fn closest_with_class(node: &NodeRef, class: &str) -> Option<NodeRef> {
    node.inclusive_ancestors()
        .find(|ancestor| ancestor.as_element().is_some() && has_class(ancestor, class))
}

pub fn is_generated(node: &NodeRef) -> bool {
    get_attr(node, ATTR_GENERATED).as_deref() == Some("true")
}

/// Replaces every child with a single text node.
pub fn set_text(node: &NodeRef, text: &str) {
    clear_children(node);
    if !text.is_empty() {
        node.append(NodeRef::new_text(text));
    }
}

pub fn clear_children(node: &NodeRef) {
    let children: Vec<NodeRef> = node.children().collect();
    for child in children {
        child.detach();
    }
}

pub fn inner_html(node: &NodeRef) -> String {
    node.children().map(|child| child.to_string()).collect()
}

pub fn trimmed_text(node: &NodeRef) -> String {
    node.text_contents().trim().to_string()
}

/// Whether `node` is currently a child of `parent`.
pub fn is_child_of(node: &NodeRef, parent: &NodeRef) -> bool {
    node.parent().map(|p| p == *parent).unwrap_or(false)
}

/// Whether `node` is reachable from `root` through parent links.
pub fn is_within(node: &NodeRef, root: &NodeRef) -> bool {
    node.inclusive_ancestors().any(|ancestor| ancestor == *root)
}

/// Sets `--name: value` in an element's inline style, replacing any previous value.
pub fn set_inline_custom_property(node: &NodeRef, name: &str, value: &str) {
    let property = format!("--{}", name.trim_start_matches('-'));
    let current = get_attr(node, "style").unwrap_or_default();
    let mut declarations: Vec<String> = current
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .filter(|decl| {
            decl.split_once(':')
                .map(|(key, _)| key.trim() != property)
                .unwrap_or(true)
        })
        .map(str::to_string)
        .collect();
    declarations.push(format!("{property}: {value}"));
    set_attr(node, "style", declarations.join("; "));
}
