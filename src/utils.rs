/*!
 * Utility functions for ctxscan
 */

#[cfg(test)]
use crate::types::{EntryKind, TreeNode};

/// Format a human-readable file size
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

/// Every file path in a tree, depth-first in listing order
#[cfg(test)]
pub(crate) fn tree_files(node: &TreeNode) -> Vec<&TreeNode> {
    let mut files = Vec::new();
    collect_files(node, &mut files);
    files
}

#[cfg(test)]
fn collect_files<'a>(node: &'a TreeNode, out: &mut Vec<&'a TreeNode>) {
    for child in &node.children {
        match child.kind {
            EntryKind::File => out.push(child),
            EntryKind::Directory => collect_files(child, out),
        }
    }
}
