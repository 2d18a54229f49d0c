use crate::infra::dom::{Document, NodeData, NodeId};

const RAW_TEXT_ELEMENTS: [&str; 6] = ["style", "script", "xmp", "iframe", "noembed", "noframes"];

/// Markup of the children of `id`, as `innerHTML` would produce it.
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    let raw = is_raw_text_parent(doc, id);
    for child in doc.children(id) {
        write_node(doc, *child, raw, &mut out);
    }
    out
}

/// Markup of `id` itself and its subtree.
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    let raw = doc.parent(id).is_some_and(|parent| is_raw_text_parent(doc, parent));
    write_node(doc, id, raw, &mut out);
    out
}

fn is_raw_text_parent(doc: &Document, id: NodeId) -> bool {
    doc.tag_name(id)
        .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag))
}

enum Step {
    Enter { node: NodeId, raw_text: bool },
    Close(NodeId),
}

// Nesting depth is unbounded in parsed input, so the walk keeps its own stack.
fn write_node(doc: &Document, id: NodeId, raw_text: bool, out: &mut String) {
    let mut stack = vec![Step::Enter { node: id, raw_text }];
    while let Some(step) = stack.pop() {
        let (current, raw_text) = match step {
            Step::Close(node) => {
                if let Some(tag) = doc.tag_name(node) {
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
                continue;
            }
            Step::Enter { node, raw_text } => (node, raw_text),
        };
        let Some(node) = doc.get(current) else {
            continue;
        };
        match node.data() {
            NodeData::Document => push_children(&mut stack, node.children(), false),
            NodeData::Text(text) if raw_text => out.push_str(text),
            NodeData::Text(text) => escape_text(text, out),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(element.tag());
                for attr in element.attrs() {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    escape_attribute(&attr.value, out);
                    out.push('"');
                }
                out.push('>');
                if element.is_void() {
                    continue;
                }
                stack.push(Step::Close(current));
                let raw = RAW_TEXT_ELEMENTS.contains(&element.tag());
                push_children(&mut stack, node.children(), raw);
            }
        }
    }
}

fn push_children(stack: &mut Vec<Step>, children: &[NodeId], raw_text: bool) {
    stack.extend(
        children
            .iter()
            .rev()
            .map(|child| Step::Enter { node: *child, raw_text }),
    );
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
}
