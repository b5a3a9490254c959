//! HTML to markdown conversion (spec §4.10). Handles headings, paragraphs,
//! lists, emphasis, links and pipe tables (header row retained, `|`
//! escaped in cells). Walks the parsed DOM directly rather than
//! re-parsing a string, so it stays consistent with the rest of the
//! extractor.

use ego_tree::NodeRef;
use scraper::{Html, Node};

pub fn html_to_markdown(document: &Html) -> String {
    let root = document.root_element();
    let mut out = String::new();
    render_children(*root, &mut out);
    collapse_blank_lines(&out)
}

fn render_children(node: NodeRef<Node>, out: &mut String) {
    for child in node.children() {
        render_node(child, out);
    }
}

fn render_node(node: NodeRef<Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            out.push_str(text);
        }
        Node::Element(el) => {
            let tag = el.name();
            match tag {
                "script" | "style" | "noscript" | "head" => {}
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    let level = tag[1..].parse::<usize>().unwrap_or(1);
                    out.push('\n');
                    out.push_str(&"#".repeat(level));
                    out.push(' ');
                    render_children(node, out);
                    out.push('\n');
                }
                "p" | "div" | "section" | "article" => {
                    out.push('\n');
                    render_children(node, out);
                    out.push('\n');
                }
                "br" => out.push('\n'),
                "strong" | "b" => {
                    out.push_str("**");
                    render_children(node, out);
                    out.push_str("**");
                }
                "em" | "i" => {
                    out.push('_');
                    render_children(node, out);
                    out.push('_');
                }
                "a" => {
                    let href = el.attr("href").unwrap_or("");
                    out.push('[');
                    render_children(node, out);
                    out.push(']');
                    out.push('(');
                    out.push_str(href);
                    out.push(')');
                }
                "li" => {
                    out.push_str("\n- ");
                    render_children(node, out);
                }
                "ul" | "ol" => {
                    out.push('\n');
                    render_children(node, out);
                    out.push('\n');
                }
                "table" => {
                    render_table(node, out);
                }
                _ => render_children(node, out),
            }
        }
        _ => {}
    }
}

fn render_table(table_node: NodeRef<Node>, out: &mut String) {
    let rows: Vec<Vec<String>> = table_node
        .descendants()
        .filter(|n| matches!(n.value(), Node::Element(el) if el.name() == "tr"))
        .map(|tr| {
            tr.children()
                .filter(|c| matches!(c.value(), Node::Element(el) if el.name() == "td" || el.name() == "th"))
                .map(|cell| escape_pipes(cell_text(cell).trim()))
                .collect()
        })
        .collect();

    if rows.is_empty() {
        return;
    }

    out.push('\n');
    let header = &rows[0];
    out.push_str("| ");
    out.push_str(&header.join(" | "));
    out.push_str(" |\n");
    out.push_str("| ");
    out.push_str(&vec!["---"; header.len()].join(" | "));
    out.push_str(" |\n");
    for row in &rows[1..] {
        out.push_str("| ");
        out.push_str(&row.join(" | "));
        out.push_str(" |\n");
    }
}

fn cell_text(node: NodeRef<Node>) -> String {
    let mut s = String::new();
    for child in node.descendants() {
        if let Node::Text(t) = child.value() {
            s.push_str(t);
        }
    }
    s
}

fn escape_pipes(s: &str) -> String {
    s.replace('|', "\\|")
}

fn collapse_blank_lines(s: &str) -> String {
    let mut out = String::new();
    let mut blank_run = 0;
    for line in s.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.trim().to_string()
}
