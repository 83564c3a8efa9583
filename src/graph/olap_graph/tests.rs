//! Tests for CSR construction and traversal.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use super::*;
use crate::graph::edge::EdgeUnit;

fn graph<E: EdgeData>(threads: usize) -> OlapGraph<E> {
    OlapGraph::with_config(&EngineConfig::default().with_threads(threads)).unwrap()
}

fn path(n: u64) -> Vec<EdgeUnit<Empty>> {
    (0..n - 1).map(|v| EdgeUnit::new(v, v + 1, Empty)).collect()
}

fn sorted(list: AdjList<'_, impl Copy>) -> Vec<usize> {
    let mut v: Vec<usize> = list.neighbours().collect();
    v.sort_unstable();
    v
}

#[test]
fn test_path_graph_dual_direction() {
    let mut g = graph::<Empty>(3);
    g.load_from_array(&path(5), 5, EdgeDirectionPolicy::DualDirection)
        .unwrap();

    assert_eq!(g.num_vertices(), 5);
    assert_eq!(g.num_edges(), 4);
    assert_eq!(g.edge_data_size(), 0);
    assert_eq!(g.out_degree(0), 1);
    assert_eq!(g.in_degree(0), 0);
    assert_eq!(g.out_degree(4), 0);
    assert_eq!(g.in_degree(4), 1);
    assert_eq!(sorted(g.out_edges(2)), vec![3]);
    assert_eq!(sorted(g.in_edges(2)), vec![1]);

    g.transpose();
    assert_eq!(sorted(g.out_edges(2)), vec![1]);
    assert_eq!(g.out_degree(0), 0);
    g.transpose();
    assert_eq!(sorted(g.out_edges(2)), vec![3]);
}

#[test]
fn test_make_symmetric_doubles_edges() {
    let mut g = graph::<Empty>(2);
    g.load_from_array(&path(4), 4, EdgeDirectionPolicy::MakeSymmetric)
        .unwrap();

    assert_eq!(g.num_edges(), 6);
    assert_eq!(sorted(g.out_edges(1)), vec![0, 2]);
    assert_eq!(sorted(g.in_edges(1)), vec![0, 2]);
    assert_eq!(g.in_degree(3), g.out_degree(3));

    // Transpose is a no-op when in/out coincide.
    g.transpose();
    assert_eq!(sorted(g.out_edges(1)), vec![0, 2]);
}

#[test]
fn test_input_symmetric_stores_edges_once() {
    let edges = vec![
        EdgeUnit::new(0, 1, Empty),
        EdgeUnit::new(1, 0, Empty),
        EdgeUnit::new(1, 2, Empty),
        EdgeUnit::new(2, 1, Empty),
    ];
    let mut g = graph::<Empty>(2);
    g.load_from_array(&edges, 3, EdgeDirectionPolicy::InputSymmetric)
        .unwrap();

    assert_eq!(g.num_edges(), 4);
    assert_eq!(sorted(g.out_edges(1)), vec![0, 2]);
    assert_eq!(sorted(g.in_edges(1)), vec![0, 2]);
}

#[test]
fn test_edge_data_follows_its_edge() {
    let edges = vec![
        EdgeUnit::new(0, 1, 1.5f64),
        EdgeUnit::new(0, 2, 2.5),
        EdgeUnit::new(2, 1, 4.0),
    ];
    let mut g = graph::<f64>(2);
    g.load_from_array(&edges, 3, EdgeDirectionPolicy::DualDirection)
        .unwrap();

    assert_eq!(g.edge_data_size(), 8);
    let weight = |list: AdjList<'_, f64>, n: usize| {
        list.iter().find(|u| u.neighbour == n).map(|u| u.edge_data)
    };
    assert_eq!(weight(g.out_edges(0), 2), Some(2.5));
    assert_eq!(weight(g.in_edges(1), 2), Some(4.0));
    assert_eq!(weight(g.in_edges(1), 0), Some(1.5));
}

#[test]
fn test_csr_degrees_sum_to_edges() {
    let edges: Vec<_> = (0..2000u64)
        .map(|i| EdgeUnit::new(i % 97, (i * 31) % 211, Empty))
        .collect();
    for policy in [
        EdgeDirectionPolicy::DualDirection,
        EdgeDirectionPolicy::MakeSymmetric,
        EdgeDirectionPolicy::InputSymmetric,
    ] {
        let mut g = graph::<Empty>(4);
        g.load_from_array(&edges, 211, policy).unwrap();
        let out: usize = (0..211).map(|v| g.out_degree(v)).sum();
        let inc: usize = (0..211).map(|v| g.in_degree(v)).sum();
        assert_eq!(out, g.num_edges(), "{policy:?}");
        assert_eq!(inc, g.num_edges(), "{policy:?}");
        assert!((0..211).all(|v| g.out_edges(v).len() == g.out_degree(v)));
    }
}

#[test]
fn test_empty_inputs_are_rejected() {
    let mut g = graph::<Empty>(1);
    assert!(matches!(
        g.load_from_array(&[], 5, EdgeDirectionPolicy::DualDirection),
        Err(OlapError::EmptyGraph { vertices: 5, edges: 0 })
    ));
    assert!(matches!(
        g.load_from_array(&path(3), 0, EdgeDirectionPolicy::DualDirection),
        Err(OlapError::EmptyGraph { vertices: 0, .. })
    ));
}

#[test]
fn test_out_of_range_endpoint_is_rejected() {
    let mut g = graph::<Empty>(2);
    let edges = vec![EdgeUnit::new(0, 1, Empty), EdgeUnit::new(1, 9, Empty)];
    assert!(matches!(
        g.load_from_array(&edges, 5, EdgeDirectionPolicy::DualDirection),
        Err(OlapError::VertexOutOfRange { vertex: 9, num_vertices: 5 })
    ));
    // A failed load leaves the vertex count unset.
    assert_eq!(g.num_vertices(), 0);
}

#[test]
fn test_vertex_count_is_fixed_once() {
    let mut g = graph::<Empty>(2);
    g.set_num_vertices(5).unwrap();
    g.set_num_vertices(5).unwrap();
    assert!(matches!(
        g.set_num_vertices(6),
        Err(OlapError::VertexCountAlreadySet { current: 5, requested: 6 })
    ));
    assert!(g
        .load_from_array(&path(6), 6, EdgeDirectionPolicy::DualDirection)
        .is_err());
    g.load_from_array(&path(5), 5, EdgeDirectionPolicy::DualDirection)
        .unwrap();
}

#[test]
fn test_edge_limit_comes_from_config() {
    let config = EngineConfig {
        num_threads: Some(1),
        max_num_edges: 3,
        ..EngineConfig::default()
    };
    let mut g = OlapGraph::<Empty>::with_config(&config).unwrap();
    assert!(matches!(
        g.load_from_array(&path(5), 5, EdgeDirectionPolicy::DualDirection),
        Err(OlapError::TooManyEdges { edges: 4, max: 3 })
    ));
}

#[test]
fn test_load_from_bytes() {
    let mut bytes = Vec::new();
    for (s, d) in [(0u64, 1u64), (1, 2), (2, 0)] {
        bytes.extend_from_slice(&s.to_ne_bytes());
        bytes.extend_from_slice(&d.to_ne_bytes());
    }
    let mut g = graph::<Empty>(2);
    assert!(matches!(
        g.load_from_bytes(&bytes[1..], 3, 3, EdgeDirectionPolicy::DualDirection),
        Err(OlapError::EdgeBufferMismatch { expected: 48, actual: 47 })
    ));
    g.load_from_bytes(&bytes, 3, 3, EdgeDirectionPolicy::DualDirection)
        .unwrap();
    assert_eq!(sorted(g.in_edges(0)), vec![2]);
}

#[test]
fn test_max_vertex_id() {
    let g = graph::<Empty>(2);
    assert_eq!(g.max_vertex_id(&path(10)).unwrap(), Some(9));
    assert_eq!(g.max_vertex_id(&[]).unwrap(), None);
}

#[test]
fn test_out_edges_mut_allows_sorting() {
    let edges = vec![
        EdgeUnit::new(0, 3, Empty),
        EdgeUnit::new(0, 1, Empty),
        EdgeUnit::new(0, 2, Empty),
    ];
    let mut g = graph::<Empty>(2);
    g.load_from_array(&edges, 4, EdgeDirectionPolicy::DualDirection)
        .unwrap();
    g.out_edges_mut(0).sort_unstable_by_key(|u| u.neighbour);
    let order: Vec<usize> = g.out_edges(0).neighbours().collect();
    assert_eq!(order, vec![1, 2, 3]);
    assert_eq!(g.in_edges_mut(3).len(), 1);
}

#[test]
fn test_active_max_on_path() {
    let mut g = graph::<Empty>(3);
    g.load_from_array(&path(5), 5, EdgeDirectionPolicy::DualDirection)
        .unwrap();
    let active = g.alloc_vertex_subset().unwrap();
    for v in [0, 2, 4] {
        active.add(v);
    }
    let max = g
        .process_vertex_active(|v| v, &active, 0, usize::max)
        .unwrap();
    assert_eq!(max, 4);
}

#[test]
fn test_in_range_visits_each_vertex_once() {
    let mut g = graph::<Empty>(4);
    g.load_from_array(&path(1000), 1000, EdgeDirectionPolicy::DualDirection)
        .unwrap();
    let mut seen = g.alloc_vertex_array::<AtomicUsize>().unwrap();
    let total: usize = g
        .process_vertex_in_range_sum(
            |v| {
                seen[v].fetch_add(1, Ordering::Relaxed);
                1
            },
            10,
            990,
        )
        .unwrap();
    assert_eq!(total, 980);
    for (v, count) in seen.iter_mut().enumerate() {
        assert_eq!(*count.get_mut(), usize::from((10..990).contains(&v)));
    }
}

#[test]
fn test_with_variants_thread_context() {
    struct Scale(usize);

    let mut g = graph::<Empty>(2);
    g.load_from_array(&path(100), 100, EdgeDirectionPolicy::DualDirection)
        .unwrap();
    let scale = Scale(3);
    let sum = g
        .process_vertex_in_range_with(|s: &Scale, v| s.0 * g.out_degree(v), &scale, 0, 100, 0, |a, b| a + b)
        .unwrap();
    assert_eq!(sum, 3 * 99);

    let mut active = g.alloc_vertex_subset().unwrap();
    active.fill().unwrap();
    let sum = g
        .process_vertex_active_with(|s: &Scale, _| s.0, &scale, &active, 0, |a, b| a + b)
        .unwrap();
    assert_eq!(sum, 300);
}

#[test]
fn test_kill_flag_aborts_traversal() {
    let mut g = graph::<Empty>(2);
    g.load_from_array(&path(10_000), 10_000, EdgeDirectionPolicy::DualDirection)
        .unwrap();
    let flag = Arc::new(AtomicBool::new(false));
    g.set_task_monitor(flag.clone());

    assert!(g.process_vertex_in_range_sum(|_| 1usize, 0, 10_000).is_ok());
    flag.store(true, Ordering::Relaxed);
    let err = g.process_vertex_in_range_sum(|_| 1usize, 0, 10_000).unwrap_err();
    assert!(err.is_task_killed());

    g.clear_task_monitor();
    assert_eq!(g.process_vertex_in_range_sum(|_| 1usize, 0, 10_000).unwrap(), 10_000);
}

#[test]
fn test_if_sparse() {
    // Star: 0 -> 1..=100.
    let edges: Vec<_> = (1..=100).map(|v| EdgeUnit::new(0, v, Empty)).collect();
    let mut g = graph::<Empty>(2);
    g.load_from_array(&edges, 101, EdgeDirectionPolicy::DualDirection)
        .unwrap();
    let active = g.alloc_vertex_subset().unwrap();
    active.add(5);
    assert!(g.if_sparse(&active).unwrap());
    active.add(0);
    assert!(!g.if_sparse(&active).unwrap());
}

#[test]
fn test_vertex_locks_follow_the_graph() {
    let mut g = graph::<Empty>(4);
    g.load_from_array(&path(64), 64, EdgeDirectionPolicy::DualDirection)
        .unwrap();
    let hits = AtomicUsize::new(0);
    g.process_vertex_in_range(
        |_| {
            let _guard = g.guard_vertex_lock(0);
            hits.fetch_add(1, Ordering::Relaxed);
        },
        0,
        64,
        (),
        |(), ()| (),
    )
    .unwrap();
    assert_eq!(hits.load(Ordering::Relaxed), 64);
    g.acquire_vertex_lock(3);
    g.release_vertex_lock(3);
}
