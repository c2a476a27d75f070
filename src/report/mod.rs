//! Fixed-width text reports over a finished layout.
//!
//! Three tables, laid out column for column:
//! - footprint: first level of the class histogram, flat
//! - class histogram drill-down: the whole type-topology tree
//! - heap tree drill-down: the whole retained-footprint tree

pub mod format;

use std::io::{self, Write};

use crate::aggregator::{HeapLayout, NodeRef, PermTree};
use crate::utils::config::TOTAL_LABEL;
use format::{format_fixed, group_thousands, human_readable_bytes, indent};

/// Footprint table: one row per top-level type
///
/// **Public** - used by the analyze command
///
/// # Example
/// ```ignore
/// write_footprint(&layout, &mut std::io::stdout())?;
/// ```
pub fn write_footprint<W: Write + ?Sized>(layout: &HeapLayout, out: &mut W) -> io::Result<()> {
    out.write_all(footprint(layout).as_bytes())
}

/// Class histogram drill-down
pub fn write_class_histogram<W: Write + ?Sized>(layout: &HeapLayout, out: &mut W) -> io::Result<()> {
    out.write_all(class_histogram(layout).as_bytes())
}

/// Heap tree drill-down
pub fn write_heap_tree<W: Write + ?Sized>(layout: &HeapLayout, out: &mut W) -> io::Result<()> {
    out.write_all(heap_tree(layout).as_bytes())
}

pub fn footprint(layout: &HeapLayout) -> String {
    let tree = layout.class_histogram();
    let root = tree.root();

    let mut out = format!("{} footprint:\n", layout.description());
    out.push_str(&format!(
        " {:>15} {:>10} {:>12} {:>10} {:>15} {:>10}   {}\n",
        "COUNT", "% COUNT", "AVG SZ", "SUM", "RAW SUM", "% SUM", "DESCRIPTION"
    ));
    out.push_str(&format!(
        " {:>15} {:>8} % {:>12} {:>10} {:>15} {:>8} %   {}\n",
        group_thousands(root.total_count()),
        percentage(root.parent_count_percentage()),
        "--",
        human_readable_bytes(root.total_size()),
        group_thousands(root.total_size()),
        percentage(root.parent_size_percentage()),
        TOTAL_LABEL
    ));

    tree.walk(1, Some(1), -1, |node, _| {
        let description = match node.prefix() {
            Some(prefix) if !prefix.is_empty() => prefix.to_string(),
            _ => node.label(),
        };
        out.push_str(&format!(
            " {:>15} {:>8} % {:>12} {:>10} {:>15} {:>8} %   {}\n",
            group_thousands(node.total_count()),
            percentage(node.parent_count_percentage()),
            group_thousands(total_average(&node)),
            human_readable_bytes(node.total_size()),
            group_thousands(node.total_size()),
            percentage(node.parent_size_percentage()),
            description
        ));
    });

    out
}

pub fn class_histogram(layout: &HeapLayout) -> String {
    let mut out = format!(
        "{:>15} {:>10} {:>10} {:>12} {:>10} {:>15} {:>10}   {}\n",
        "COUNT", "PAR% CT", "AVG SIZE", "RAW AVG SZ", "TOTAL SIZE", "RAW T SZ", "PAR% T SZ", "DESCRIPTION"
    );

    drill_down(layout.class_histogram(), |node, depth| {
        out.push_str(&format!(
            "{:>15} {:>8} % {:>10} {:>12} {:>10} {:>15} {:>8} %   {}{}\n",
            group_thousands(node.total_count()),
            percentage(node.parent_count_percentage()),
            human_readable_bytes(total_average(&node)),
            group_thousands(total_average(&node)),
            human_readable_bytes(node.total_size()),
            group_thousands(node.total_size()),
            percentage(node.parent_size_percentage()),
            indent(depth),
            description(&node)
        ));
    });

    out
}

pub fn heap_tree(layout: &HeapLayout) -> String {
    let mut out = format!(
        "{:>15} {:>10} {:>12} {:>10} {:>15} {:>15} {:>10} {:>12} {:>15} {:>10}   {}\n",
        "COUNT",
        "AVG SIZE",
        "RAW AVG SZ",
        "TOTAL SIZE",
        "RAW T SZ",
        "RETAINED CT",
        "PAR% R CT",
        "RETAINED SZ",
        "RAW R SZ",
        "PAR% R SZ",
        "DESCRIPTION"
    );

    drill_down(layout.heap_tree(), |node, depth| {
        out.push_str(&format!(
            "{:>15} {:>10} {:>12} {:>10} {:>15} {:>15} {:>8} % {:>12} {:>15} {:>8} %   {}{}{}\n",
            group_thousands(node.count()),
            human_readable_bytes(node.average()),
            group_thousands(node.average()),
            human_readable_bytes(node.size()),
            group_thousands(node.size()),
            group_thousands(node.total_count()),
            percentage(node.parent_count_percentage()),
            human_readable_bytes(node.total_size()),
            group_thousands(node.total_size()),
            percentage(node.parent_size_percentage()),
            indent(depth),
            description(&node),
            array_label(&node)
        ));
    });

    out
}

fn drill_down<F>(tree: &PermTree, row: F)
where
    F: FnMut(NodeRef<'_>, usize),
{
    tree.walk(0, None, 0, row);
}

fn description(node: &NodeRef<'_>) -> String {
    match node.prefix() {
        Some(prefix) if !prefix.is_empty() => format!("{} {}", prefix, node.label()),
        _ => node.label(),
    }
}

// Histogram rows count nested instances of their type as well.
fn total_average(node: &NodeRef<'_>) -> u64 {
    match node.total_count() {
        0 => 0,
        count => node.total_size() / count,
    }
}

/// Occupancy suffix of array rows: ` [u of l used (p %)]`
pub fn array_label(node: &NodeRef<'_>) -> String {
    match node.array_usage() {
        Some(usage) => format!(
            " [{} of {} used ({} %)]",
            usage.used,
            usage.length,
            percentage(node.use_percentage())
        ),
        None => String::new(),
    }
}

fn percentage(value: f64) -> String {
    format_fixed(value, 2)
}
