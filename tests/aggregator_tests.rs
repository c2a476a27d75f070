use heap_footprint::aggregator::{
    percent, HeapLayout, HeapLayoutBuilder, HistogramDeduplicator, Observation, PathBuilder, PathId,
    PermTree, StatsAccumulator,
};
use heap_footprint::utils::config::MAX_PACKED;
use heap_footprint::utils::AggregationError;
use pretty_assertions::assert_eq;

/// Sum of every non-synthetic row's own count and size
fn gathered(tree: &PermTree) -> (u64, u64) {
    let mut count = 0;
    let mut size = 0;
    tree.walk(1, None, 0, |node, _| {
        if !node.is_synthetic() {
            count += node.count();
            size += node.size();
        }
    });
    (count, size)
}

#[derive(Default)]
struct Fed {
    count: u64,
    size: u64,
}

fn observe(builder: &mut HeapLayoutBuilder, fed: &mut Fed, observation: Observation<'_>) -> PathId {
    fed.count += 1;
    fed.size += observation.size;
    builder.add_observation(observation).unwrap()
}

/// Two roots, an array, and fields; one root type is also reached as a field
fn mixed_layout() -> (HeapLayout, u64, u64) {
    let mut builder = HeapLayoutBuilder::new(HistogramDeduplicator::with_defaults());
    let mut fed = Fed::default();

    let holder = observe(&mut builder, &mut fed, Observation::root("a.Holder", 32));
    let items = observe(
        &mut builder,
        &mut fed,
        Observation::field(holder, "items", "[La.Item;", 48).with_array(8, 3),
    );
    for i in 0..3 {
        let item = observe(&mut builder, &mut fed, Observation::element(items, "[i]", "a.Item", 24));
        observe(&mut builder, &mut fed, Observation::field(item, "name", "java.lang.String", 24));
        if i % 2 == 0 {
            observe(&mut builder, &mut fed, Observation::field(item, "tag", "a.Tag", 16));
        }
    }
    let other = observe(&mut builder, &mut fed, Observation::root("a.Other", 16));
    observe(&mut builder, &mut fed, Observation::field(other, "name", "java.lang.String", 24));
    observe(&mut builder, &mut fed, Observation::field(other, "holder", "a.Holder", 32));

    (builder.build().unwrap(), fed.count, fed.size)
}

#[test]
fn test_count_conservation_across_pivots() {
    let (layout, count, _) = mixed_layout();

    let by_type = gathered(layout.class_histogram()).0;
    let by_label = gathered(layout.heap_tree()).0;

    assert_eq!(by_type, count);
    assert_eq!(by_label, count);
    assert_eq!(layout.total_count(), count);
}

#[test]
fn test_root_totals_match_across_pivots() {
    let (layout, count, size) = mixed_layout();
    let histogram = layout.class_histogram().root();
    let tree = layout.heap_tree().root();

    assert_eq!(histogram.total_count(), count);
    assert_eq!(histogram.total_size(), size);
    assert_eq!(tree.total_count(), count);
    assert_eq!(tree.total_size(), size);
}

#[test]
fn test_root_type_reached_as_field_counts_in_both_pivots() {
    let mut builder = HeapLayoutBuilder::new(HistogramDeduplicator::empty());
    let root = builder.add_observation(Observation::root("a.Node", 16)).unwrap();
    for _ in 0..4 {
        builder
            .add_observation(Observation::field(root, "child", "a.Node", 16))
            .unwrap();
    }
    let layout = builder.build().unwrap();

    for tree in [layout.class_histogram(), layout.heap_tree()] {
        assert_eq!(tree.root().total_count(), 5);
        assert_eq!(tree.root().total_size(), 80);
    }

    // The top-level row holds the root record and carries the nested ones
    let nodes = layout.class_histogram().root().children().next().unwrap();
    assert_eq!(nodes.label(), "a.Node");
    assert_eq!((nodes.count(), nodes.size()), (1, 16));
    assert_eq!((nodes.total_count(), nodes.total_size()), (5, 80));

    let nested = nodes.children().next().unwrap();
    assert_eq!(nested.label(), "Node.child");
    assert_eq!(nested.count(), 4);
    assert_eq!(nested.parent_count_percentage(), 80.0);
}

#[test]
fn test_parent_percentages_are_bounded() {
    let (layout, _, _) = mixed_layout();

    for tree in [layout.class_histogram(), layout.heap_tree()] {
        tree.walk(1, None, 0, |node, _| {
            let parent = node.parent().unwrap();
            if parent.total_count() > 0 {
                let pct = node.parent_count_percentage();
                assert!((0.0..=100.0).contains(&pct), "{} count% = {}", node.label(), pct);
            }
            if parent.total_size() > 0 {
                let pct = node.parent_size_percentage();
                assert!((0.0..=100.0).contains(&pct), "{} size% = {}", node.label(), pct);
            }
        });
    }
}

#[test]
fn test_percent_with_zero_whole() {
    assert_eq!(percent(0, 0), 0.0);
    assert!(percent(5, 0).is_infinite());
    assert_eq!(percent(5, 10), 50.0);
}

#[test]
fn test_extension_is_memoized() {
    let mut paths = PathBuilder::new(HistogramDeduplicator::empty());
    let root = paths.root("A").unwrap();

    let first = paths.extend(root, "x", "B", false).unwrap();
    let second = paths.extend(root, "x", "B", false).unwrap();
    let count = paths.path_count();
    let third = paths.extend(root, "x", "B", false).unwrap();

    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(paths.path_count(), count);
}

fn chain_path_count(length: usize) -> usize {
    let mut paths = PathBuilder::new(HistogramDeduplicator::empty());
    let mut cursor = paths.root("Node").unwrap();
    for _ in 0..length {
        cursor = paths.extend(cursor, "next", "Node", false).unwrap();
    }
    paths.path_count()
}

#[test]
fn test_self_referential_chain_collapses() {
    let short = chain_path_count(10);
    let long = chain_path_count(10_000);

    assert_eq!(short, long);
    assert!(long <= 4, "chain produced {} paths", long);
}

#[test]
fn test_alternating_chain_collapses() {
    let mut paths = PathBuilder::new(HistogramDeduplicator::empty());
    let mut cursor = paths.root("A").unwrap();
    for i in 0..1_000 {
        let (label, type_name) = if i % 2 == 0 { ("b", "B") } else { ("a", "A") };
        cursor = paths.extend(cursor, label, type_name, false).unwrap();
    }

    assert!(paths.path_count() < 10, "got {} paths", paths.path_count());
    assert!(paths.len(cursor).unwrap() <= 9);
}

#[test]
fn test_single_field_example() {
    let mut builder = HeapLayoutBuilder::new(HistogramDeduplicator::empty());
    let root = builder.add_observation(Observation::root("TypeA", 0)).unwrap();
    for _ in 0..3 {
        builder
            .add_observation(Observation::field(root, "x", "TypeB", 16))
            .unwrap();
    }
    let layout = builder.build().unwrap();

    // The class histogram's TypeB branch holds exactly the three records
    let histogram = layout.class_histogram();
    let type_b = histogram
        .root()
        .children()
        .find(|n| n.label() == "TypeB")
        .unwrap();
    assert_eq!(type_b.count(), 3);
    assert_eq!(type_b.size(), 48);

    // The TypeA root is itself an observation of size 0
    for tree in [histogram, layout.heap_tree()] {
        assert_eq!(tree.root().total_count(), 4);
        assert_eq!(tree.root().total_size(), 48);
    }

    let row = type_b.children().next().unwrap();
    assert_eq!(row.label(), "TypeA.x");
    assert_eq!(row.count(), 3);
    assert_eq!(row.size(), 48);
    assert_eq!(row.average(), 16);
    assert_eq!(row.parent_count_percentage(), 100.0);
    assert_eq!(row.parent_size_percentage(), 100.0);
}

#[test]
fn test_doubly_linked_nodes_share_one_segment() {
    let dedup = HistogramDeduplicator::empty()
        .with_merged_fields("Node", [("next", "prev/next"), ("prev", "prev/next")]);
    let mut builder = HeapLayoutBuilder::new(dedup);

    let head = builder.add_observation(Observation::root("List", 16)).unwrap();
    let mut node = builder
        .add_observation(Observation::field(head, "head", "Node", 24))
        .unwrap();
    let first = node;
    for i in 1..5 {
        let label = if i % 2 == 0 { "prev" } else { "next" };
        node = builder
            .add_observation(Observation::field(node, label, "Node", 24))
            .unwrap();
        assert_eq!(node, first);
    }

    let paths = builder.paths();
    assert_eq!(paths.len(first).unwrap(), 3);

    let layout = builder.build().unwrap();
    let list = layout.heap_tree().root().children().next().unwrap();
    assert_eq!(list.child_count(), 1);
    let nodes = list.children().next().unwrap();
    assert_eq!(nodes.count(), 5);
    assert_eq!(nodes.child_count(), 0);
}

#[test]
fn test_terminal_type_stops_extension() {
    let dedup = HistogramDeduplicator::empty().with_terminal_types(["Sink"]);
    let mut paths = PathBuilder::new(dedup);
    let root = paths.root("A").unwrap();
    let sink = paths.extend(root, "out", "Sink", false).unwrap();

    assert!(paths.is_terminal(sink).unwrap());
    assert_eq!(paths.extend(sink, "any", "B", false).unwrap(), sink);
}

#[test]
fn test_terminal_rows_are_elided() {
    let dedup = HistogramDeduplicator::empty().with_terminal_types(["Sink"]);
    let mut builder = HeapLayoutBuilder::new(dedup);
    let root = builder.add_observation(Observation::root("A", 16)).unwrap();
    let sink = builder
        .add_observation(Observation::field(root, "out", "Sink", 16))
        .unwrap();
    builder
        .add_observation(Observation::field(sink, "inner", "B", 8))
        .unwrap();
    let layout = builder.build().unwrap();

    let mut elided = Vec::new();
    layout.heap_tree().walk(0, None, 0, |node, _| {
        if node.is_elided() {
            elided.push((node.label(), node.count()));
        }
    });
    assert_eq!(elided, vec![("A.out (...)".to_string(), 2)]);
}

#[test]
fn test_capacity_boundary() {
    let mut stats = StatsAccumulator::new();
    assert!(stats.set_count(MAX_PACKED).is_ok());
    assert!(matches!(
        stats.set_count(MAX_PACKED + 1),
        Err(AggregationError::CapacityOverflow { .. })
    ));
}
