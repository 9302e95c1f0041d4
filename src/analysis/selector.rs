//! Element addressing helpers

use scraper::ElementRef;

/// Builds a CSS selector that locates `element` again
///
/// Uses `#id` when the element has an id, `tag.class1.class2` when it has
/// classes, and otherwise a `tag:nth-of-type(n)` path joined with ` > `
/// that climbs to the nearest ancestor with an id (or the document root).
pub fn unique_selector(element: ElementRef<'_>) -> String {
    if let Some(id) = non_empty_attr(element, "id") {
        return format!("#{}", id);
    }

    let classes: Vec<&str> = element
        .value()
        .attr("class")
        .map(|class| class.split_whitespace().collect())
        .unwrap_or_default();
    if !classes.is_empty() {
        return format!("{}.{}", element.value().name(), classes.join("."));
    }

    positional_path(element)
}

/// Tag name followed by the tag names of the immediate element children
///
/// ```
/// use cadence_crawler::analysis::element_signature;
/// use scraper::{Html, Selector};
///
/// let html = Html::parse_fragment("<li><a>x</a> text <span>y</span></li>");
/// let li = html.select(&Selector::parse("li").unwrap()).next().unwrap();
/// assert_eq!(element_signature(li), "li,a,span");
/// ```
pub fn element_signature(element: ElementRef<'_>) -> String {
    let mut parts = vec![element.value().name()];
    parts.extend(
        element
            .children()
            .filter_map(ElementRef::wrap)
            .map(|child| child.value().name()),
    );
    parts.join(",")
}

fn positional_path(element: ElementRef<'_>) -> String {
    let mut path = Vec::new();
    let mut current = Some(element);

    while let Some(node) = current {
        if let Some(id) = non_empty_attr(node, "id") {
            path.push(format!("#{}", id));
            break;
        }

        let name = node.value().name();
        let position = node
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|sibling| sibling.value().name() == name)
            .count()
            + 1;
        path.push(format!("{}:nth-of-type({})", name, position));

        current = node.parent().and_then(ElementRef::wrap);
    }

    path.reverse();
    path.join(" > ")
}

fn non_empty_attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name).filter(|value| !value.is_empty())
}
