use hgc::{
    export_collection, import_directory, pull_graph, push_graph, read_graphml_file, AttrValue,
    Attributes, ExchangeGraph, GraphCollection, GraphStore, HgcError, LabelKeys,
    DEFAULT_EDGE_LABEL_KEY, DEFAULT_NODE_LABEL_KEY,
};
use pretty_assertions::assert_eq;
use std::fs;

fn node_label(value: i64) -> Attributes {
    Attributes::from([(DEFAULT_NODE_LABEL_KEY.to_string(), AttrValue::Int(value))])
}

fn edge_label(value: f64) -> Attributes {
    Attributes::from([(DEFAULT_EDGE_LABEL_KEY.to_string(), AttrValue::Float(value))])
}

fn triangle() -> ExchangeGraph {
    let mut graph = ExchangeGraph::new();
    graph.add_node("TP53", node_label(3));
    graph.add_node("MDM2", node_label(-1));
    graph.add_node("CDKN1A", node_label(2));
    graph.add_edge("TP53", "MDM2", edge_label(0.75));
    graph.add_edge("MDM2", "CDKN1A", edge_label(1.5));
    graph.add_edge("CDKN1A", "TP53", edge_label(-2.0));
    graph
}

#[test]
fn export_then_import_keeps_graphs() {
    let keys = LabelKeys::default();
    let mut store = GraphStore::new();
    push_graph(&mut store, &triangle(), "patient-1", &keys).unwrap();
    let mut partial = ExchangeGraph::new();
    partial.add_node("a", Attributes::new());
    partial.add_edge("a", "b", Attributes::new());
    push_graph(&mut store, &partial, "patient-2", &keys).unwrap();

    let out = tempfile::tempdir().unwrap();
    let written = export_collection(&store, out.path(), &keys).unwrap();
    assert_eq!(written.len(), 2);
    assert!(out.path().join("export").join("patient-1.gml").is_file());
    // Exporting again into the existing directory is fine.
    export_collection(&store, out.path(), &keys).unwrap();

    let mut reimported = GraphStore::new();
    let ids = import_directory(&mut reimported, out.path().join("export"), &keys).unwrap();
    assert_eq!(ids, vec![0, 1]);
    for id in ids {
        assert_eq!(reimported.graph_name(id).unwrap(), store.graph_name(id).unwrap());
        assert_eq!(reimported.graph(id).unwrap(), store.graph(id).unwrap());
    }
    let first = reimported.graph(0).unwrap();
    assert_eq!(first.node_labels, vec![3, -1, 2]);
    assert_eq!(first.edge_labels.get(&(2, 0)), Some(&-2.0));
    assert_eq!(reimported.graph(1).unwrap().node_labels, vec![0, 0]);
}

#[test]
fn import_skips_other_files_and_names_by_stem() {
    let dir = tempfile::tempdir().unwrap();
    let keys = LabelKeys::default();
    let graph = triangle();
    hgc::write_graphml_file(&graph, dir.path().join("b.sample.graphml")).unwrap();
    hgc::write_graphml_file(&graph, dir.path().join("a.gml")).unwrap();
    fs::write(dir.path().join("notes.txt"), "not a graph").unwrap();

    let mut store = GraphStore::new();
    import_directory(&mut store, dir.path(), &keys).unwrap();
    assert_eq!(store.graph_count(), 2);
    assert_eq!(store.graph_name(0).unwrap(), "a");
    assert_eq!(store.graph_name(1).unwrap(), "b.sample");
    assert_eq!(store.generation(), 1);
}

#[test]
fn custom_label_keys() {
    let keys = LabelKeys::new("kind", "weight");
    let mut graph = ExchangeGraph::new();
    graph.add_node("x", Attributes::from([("kind".to_string(), AttrValue::from("7"))]));
    graph.add_node("y", Attributes::from([("kind".to_string(), AttrValue::Float(4.9))]));
    graph.add_edge(
        "x",
        "y",
        Attributes::from([("weight".to_string(), AttrValue::Int(2))]),
    );

    let mut store = GraphStore::new();
    let id = push_graph(&mut store, &graph, "g", &keys).unwrap();
    let data = store.graph(id).unwrap();
    assert_eq!(data.node_labels, vec![7, 4]);
    assert_eq!(data.edge_labels.get(&(0, 1)), Some(&2.0));

    let pulled = pull_graph(&store, id, &keys).unwrap();
    assert_eq!(pulled.node("1").and_then(|a| a.get("kind")), Some(&AttrValue::Int(4)));
}

#[test]
fn inconvertible_edge_label() {
    let mut graph = ExchangeGraph::new();
    graph.add_edge(
        "x",
        "y",
        Attributes::from([(DEFAULT_EDGE_LABEL_KEY.to_string(), AttrValue::from("heavy"))]),
    );
    let mut store = GraphStore::new();
    let result = push_graph(&mut store, &graph, "g", &LabelKeys::default());
    assert!(matches!(
        result,
        Err(HgcError::InvalidAttributeValue { ref graph, ref key, .. })
            if graph == "g" && key == DEFAULT_EDGE_LABEL_KEY
    ));
}

#[test]
fn unreadable_sources() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = GraphStore::new();
    let missing = import_directory(&mut store, dir.path().join("nope"), &LabelKeys::default());
    assert!(matches!(missing, Err(HgcError::UnreadableSource { .. })));

    fs::write(dir.path().join("broken.gml"), "<graphml><graph><node/></graph>").unwrap();
    let broken = import_directory(&mut store, dir.path(), &LabelKeys::default());
    assert!(matches!(broken, Err(HgcError::UnreadableSource { .. })));
    assert!(read_graphml_file(dir.path().join("broken.gml")).is_err());
}
