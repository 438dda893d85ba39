//! Rendering of the resolved input graph for `berth inputs`.

use serde_json::json;

use crate::resolver::{InputEdge, InputNode, InputSet};

/// Render the input graph as an indented tree.
///
/// Follows edges are printed as `name follows a/b` and not expanded, so every
/// snapshot appears under exactly one parent.
pub fn format_input_tree(set: &InputSet, project: &str) -> String {
    let mut out = format!("{}\n", project);
    write_children(set, set.root(), "", &mut out);
    out
}

fn write_children(set: &InputSet, node: &InputNode, indent: &str, out: &mut String) {
    let count = node.inputs.len();
    for (i, (name, edge)) in node.inputs.iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        match edge {
            InputEdge::Follows(path) => {
                out.push_str(&format!("{}{}{} follows {}\n", indent, branch, name, path.join("/")));
            }
            InputEdge::Node(id) => {
                let Some(child) = set.node(id) else {
                    continue;
                };
                out.push_str(&format!("{}{}{}: {}\n", indent, branch, name, describe(child)));
                let next = format!("{}{}", indent, if last { "    " } else { "│   " });
                write_children(set, child, &next, out);
            }
        }
    }
}

fn describe(node: &InputNode) -> String {
    let locator = node
        .locked
        .as_ref()
        .or(node.original.as_ref())
        .map(|l| l.to_url_string())
        .unwrap_or_default();
    match node.snapshot.as_ref().and_then(|s| s.rev.as_deref()) {
        Some(rev) if !locator.contains(rev) => format!("{} ({})", locator, rev),
        _ => locator,
    }
}

/// The input graph as JSON: one object per node, keyed by node id.
pub fn input_tree_json(set: &InputSet) -> serde_json::Value {
    let nodes: serde_json::Map<String, serde_json::Value> = set
        .nodes()
        .map(|node| {
            let inputs: serde_json::Map<String, serde_json::Value> = node
                .inputs
                .iter()
                .map(|(name, edge)| {
                    let value = match edge {
                        InputEdge::Node(id) => json!(id),
                        InputEdge::Follows(path) => json!({ "follows": path.join("/") }),
                    };
                    (name.clone(), value)
                })
                .collect();
            let entry = json!({
                "path": node.path.join("/"),
                "locked": node.locked.as_ref().map(|l| l.to_url_string()),
                "narHash": node.snapshot.as_ref().map(|s| s.nar_hash.clone()),
                "inputs": inputs,
            });
            (node.id.clone(), entry)
        })
        .collect();
    json!({ "nodes": nodes })
}
