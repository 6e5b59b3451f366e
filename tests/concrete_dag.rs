// tests/concrete_dag.rs

use std::path::Path;
use std::sync::Arc;
use std::thread;

use petgraph::visit::EdgeRef;

use gridrun::dag::{extract_predecessor, ConcreteDag};
use gridrun::task::{InputFile, TaskSpec};
use gridrun_test_utils::builders::task_at;

const UPSTREAM: &str = "ab0123456789abcdef0123456789abcd";
const DOWNSTREAM: &str = "cd0123456789abcdef0123456789abcd";
const FINAL: &str = "ef0123456789abcdef0123456789abcd";

fn spec_reading(name: &str, inputs: &[&str]) -> TaskSpec {
    let mut spec = TaskSpec::new(name, "cat *");
    spec.inputs = inputs.iter().map(|p| InputFile::new(*p)).collect();
    spec
}

#[test]
fn predecessor_found_in_bucket_layout() {
    let path = Path::new("/data/work/ab/cdefghijklmnopqrstuvwxyzABCD/file.txt");
    assert_eq!(
        extract_predecessor(path).as_deref(),
        Some("abcdefghijklmnopqrstuvwxyzABCD")
    );
}

#[test]
fn unmatched_paths_yield_no_predecessor() {
    for path in [
        "/data/reads/sample1.fq",
        "/data/ab/short/file.txt",
        "relative.txt",
        // bucket segment must be exactly two characters
        "/work/abc/cdefghijklmnopqrstuvwxyzABCD/file.txt",
        // the hash directory alone is not enough; a file must live inside it
        "/work/ab/cdefghijklmnopqrstuvwxyzABCD",
    ] {
        assert_eq!(extract_predecessor(Path::new(path)), None, "{path}");
    }
}

#[test]
fn innermost_bucket_wins() {
    let path = Path::new("/xy/0123456789abcdefghijklmnopqr/ab/cdefghijklmnopqrstuvwxyzABCD/out.txt");
    assert_eq!(
        extract_predecessor(path).as_deref(),
        Some("abcdefghijklmnopqrstuvwxyzABCD")
    );
}

#[test]
fn nodes_keep_insertion_order_and_labels() {
    let dag = ConcreteDag::new();
    let root = Path::new("/work");

    assert!(dag.is_empty());
    assert!(dag.add_task(&task_at(root, DOWNSTREAM, TaskSpec::new("sort", "sort"))));
    assert!(dag.add_task(&task_at(root, UPSTREAM, TaskSpec::new("fetch", "curl"))));

    let nodes = dag.nodes();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].index, 0);
    assert_eq!(nodes[0].label, "[cd/012345] sort");
    assert_eq!(nodes[1].index, 1);
    assert_eq!(nodes[1].label, "[ab/012345] fetch");
}

#[test]
fn first_insertion_wins() {
    let dag = ConcreteDag::new();
    let root = Path::new("/work");

    assert!(dag.add_task(&task_at(root, UPSTREAM, TaskSpec::new("fetch", "curl"))));
    assert!(!dag.add_task(&task_at(root, UPSTREAM, TaskSpec::new("renamed", "curl"))));

    assert_eq!(dag.len(), 1);
    let node = dag.get(UPSTREAM).expect("node recorded");
    assert_eq!(node.index, 0);
    assert!(node.label.ends_with("fetch"));
}

#[test]
fn edges_follow_work_directory_inputs() {
    let dag = ConcreteDag::new();
    let root = Path::new("/work");

    let upstream_out = format!("/work/ab/{}/reads.fq", &UPSTREAM[2..]);
    let downstream_out = format!("/work/cd/{}/sorted.fq", &DOWNSTREAM[2..]);

    // record out of dependency order
    dag.add_task(&task_at(
        root,
        FINAL,
        spec_reading("report", &[&downstream_out, "/ref/genome.fa"]),
    ));
    dag.add_task(&task_at(root, DOWNSTREAM, spec_reading("sort", &[&upstream_out])));
    dag.add_task(&task_at(root, UPSTREAM, spec_reading("fetch", &["/ref/urls.txt"])));

    let final_node = dag.get(FINAL).expect("final recorded");
    assert_eq!(final_node.predecessors, vec![DOWNSTREAM.to_string()]);

    let graph = dag.graph();
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    for edge in graph.edge_references() {
        let (from, to) = (&graph[edge.source()].hash, &graph[edge.target()].hash);
        assert!(
            (from == UPSTREAM && to == DOWNSTREAM) || (from == DOWNSTREAM && to == FINAL),
            "unexpected edge {from} -> {to}"
        );
    }

    let labels = dag.topological_labels();
    assert_eq!(
        labels,
        vec![
            "[ab/012345] fetch".to_string(),
            "[cd/012345] sort".to_string(),
            "[ef/012345] report".to_string(),
        ]
    );
}

#[test]
fn unknown_predecessors_add_no_edges() {
    let dag = ConcreteDag::new();
    let elsewhere = "/old-run/zz/0123456789abcdef0123456789abcd/file.txt";
    dag.add_task(&task_at(Path::new("/work"), UPSTREAM, spec_reading("fetch", &[elsewhere])));

    assert_eq!(
        dag.get(UPSTREAM).expect("recorded").predecessors,
        vec!["zz0123456789abcdef0123456789abcd".to_string()]
    );
    assert_eq!(dag.graph().edge_count(), 0);
}

#[test]
fn concurrent_inserts_get_unique_indices() {
    let dag = Arc::new(ConcreteDag::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let dag = dag.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let hash = format!("{:02x}{:030x}", t, i);
                    let task = task_at(Path::new("/work"), &hash, TaskSpec::new(format!("t{t}-{i}"), "true"));
                    assert!(dag.add_task(&task));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("insert thread panicked");
    }

    let nodes = dag.nodes();
    assert_eq!(nodes.len(), 200);
    let indices: Vec<usize> = nodes.iter().map(|n| n.index).collect();
    assert_eq!(indices, (0..200).collect::<Vec<_>>());
}
