//! Structural XML comparison used to match list view definitions

use roxmltree::{Document, Node};

/// View sub-trees that decide whether two views show the same data
pub const VIEW_SECTIONS: [&str; 3] = ["Query", "ViewFields", "RowLimit"];

/// Order-sensitive equality of two element sub-trees.
///
/// Element names, attributes (name, value and order) and trimmed text must
/// all match. Whitespace-only text, comments and processing instructions
/// are ignored.
pub fn nodes_equal(a: Node<'_, '_>, b: Node<'_, '_>) -> bool {
    if a.tag_name().name() != b.tag_name().name() {
        return false;
    }

    let attrs_a: Vec<_> = a.attributes().map(|x| (x.name(), x.value())).collect();
    let attrs_b: Vec<_> = b.attributes().map(|x| (x.name(), x.value())).collect();
    if attrs_a != attrs_b {
        return false;
    }

    let children_a: Vec<_> = a.children().filter(is_significant).collect();
    let children_b: Vec<_> = b.children().filter(is_significant).collect();
    if children_a.len() != children_b.len() {
        return false;
    }

    children_a
        .iter()
        .zip(children_b.iter())
        .all(|(x, y)| match (x.is_element(), y.is_element()) {
            (true, true) => nodes_equal(*x, *y),
            (false, false) => x.text().map(str::trim) == y.text().map(str::trim),
            _ => false,
        })
}

fn is_significant(node: &Node<'_, '_>) -> bool {
    node.is_element() || (node.is_text() && node.text().is_some_and(|t| !t.trim().is_empty()))
}

fn first_named<'a, 'input>(doc: &'a Document<'input>, name: &str) -> Option<Node<'a, 'input>> {
    doc.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// Compare the first `element` sub-tree of two documents.
///
/// Absent in both counts as equal, absent in one does not.
pub fn section_equal(a: &Document<'_>, b: &Document<'_>, element: &str) -> bool {
    match (first_named(a, element), first_named(b, element)) {
        (Some(x), Some(y)) => nodes_equal(x, y),
        (None, None) => true,
        _ => false,
    }
}

/// Whether two `<View>` definitions share query, fields and row limit.
/// Unparsable XML never matches.
pub fn views_match(view_a: &str, view_b: &str) -> bool {
    let (a, b) = match (Document::parse(view_a), Document::parse(view_b)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => {
            log::warn!("Could not parse view XML: {}", e);
            return false;
        }
    };
    VIEW_SECTIONS
        .iter()
        .all(|section| section_equal(&a, &b, section))
}
