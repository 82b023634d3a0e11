/*!
 * Text rendering of directory trees
 */

use std::fmt;

use crate::types::TreeNode;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Render a tree with box-drawing connectors. Directories end in `/`.
///
/// ```text
/// project/
/// ├── src/
/// │   └── main.rs
/// └── Cargo.toml
/// ```
pub fn render_tree(node: Option<&TreeNode>) -> String {
    let Some(node) = node else {
        return String::new();
    };

    let mut out = String::new();
    push_label(&mut out, node);
    out.push('\n');
    render_children(&mut out, node, "");
    out
}

fn render_children(out: &mut String, node: &TreeNode, indent: &str) {
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        out.push_str(indent);
        out.push_str(if last { LAST_BRANCH } else { BRANCH });
        push_label(out, child);
        out.push('\n');

        if child.is_dir() {
            let nested = format!("{}{}", indent, if last { SPACE } else { PIPE });
            render_children(out, child, &nested);
        }
    }
}

fn push_label(out: &mut String, node: &TreeNode) {
    out.push_str(&node.name);
    if node.is_dir() {
        out.push('/');
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_tree(Some(self)))
    }
}
