use tree_sitter::{Node, Parser, Tree};

fn parse(source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    let language = tree_sitter_java::LANGUAGE;
    parser.set_language(&language.into()).ok()?;
    parser.parse(source, None)
}

fn node_text<'a>(node: Node<'a>, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Source text of the first method declaration named `name`.
///
/// Overloads are not told apart: the first declaration in document order wins.
pub fn find_method(source: &str, name: &str) -> Option<String> {
    let tree = parse(source)?;
    find_method_node(tree.root_node(), name, source).map(|n| node_text(n, source).to_string())
}

fn find_method_node<'a>(node: Node<'a>, name: &str, source: &str) -> Option<Node<'a>> {
    if node.kind() == "method_declaration" {
        if let Some(name_node) = node.child_by_field_name("name") {
            if node_text(name_node, source) == name {
                return Some(node);
            }
        }
    }
    let count = node.child_count();
    for i in 0..count {
        if let Some(child) = node.child(i) {
            if let Some(found) = find_method_node(child, name, source) {
                return Some(found);
            }
        }
    }
    None
}

/// Names of every method declaration, in document order.
pub fn list_methods(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(tree) = parse(source) {
        collect_method_names(tree.root_node(), source, &mut names);
    }
    names
}

fn collect_method_names(node: Node, source: &str, names: &mut Vec<String>) {
    if node.kind() == "method_declaration" {
        if let Some(name_node) = node.child_by_field_name("name") {
            names.push(node_text(name_node, source).to_string());
        }
    }
    let count = node.child_count();
    for i in 0..count {
        if let Some(child) = node.child(i) {
            collect_method_names(child, source, names);
        }
    }
}

/// Byte offset of the closing `}` of a top-level class body.
///
/// Prefers the class named `preferred`, otherwise the first top-level class.
/// Returns `None` when no class is found or its closing brace is missing.
pub fn class_body_close(source: &str, preferred: Option<&str>) -> Option<usize> {
    let tree = parse(source)?;
    let root = tree.root_node();

    let mut classes = Vec::new();
    let count = root.child_count();
    for i in 0..count {
        if let Some(child) = root.child(i) {
            if child.kind() == "class_declaration" {
                classes.push(child);
            }
        }
    }

    let class = preferred
        .and_then(|want| {
            classes.iter().copied().find(|c| {
                c.child_by_field_name("name")
                    .is_some_and(|n| node_text(n, source) == want)
            })
        })
        .or_else(|| classes.first().copied())?;

    let body = class.child_by_field_name("body")?;
    let close = body.end_byte().checked_sub(1)?;
    if source.as_bytes().get(close) == Some(&b'}') {
        Some(close)
    } else {
        None
    }
}
