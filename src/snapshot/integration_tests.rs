// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::builder::Builder;
use crate::nodes::{MinMax, MinMaxValue, Sum, ValueInput};
use crate::snapshot::CommitOptions;
use tokio_util::sync::CancellationToken;

#[test]
fn basic_sum_commits_on_change() {
    let mut builder = Builder::new();
    let a = builder.add_input("a", ValueInput::<i64>::new(), 1).unwrap();
    let b = builder.add_input("b", ValueInput::<i64>::new(), 2).unwrap();
    let sum = builder
        .add_calculation("sum", Sum::<i64>::new(vec![a.id().clone(), b.id().clone()]))
        .unwrap();
    let (snapshot, _) = builder.build_and_commit().unwrap();

    assert_eq!(snapshot.get_value(&sum).unwrap(), 3);

    let mut next = snapshot.clone();
    next.change_value(&a, 10).unwrap();
    let (next, changed) = next.commit();

    assert_eq!(next.get_value(&sum).unwrap(), 12);
    assert!(changed.contains(sum.id()));
}

#[test]
fn unrelated_input_does_not_recompute_sibling() {
    let mut builder = Builder::new();
    let a = builder.add_input("a", ValueInput::<i64>::new(), 1).unwrap();
    let b = builder.add_input("b", ValueInput::<i64>::new(), 2).unwrap();
    let c = builder.add_input("c", ValueInput::<i64>::new(), 100).unwrap();
    let sum_ab = builder
        .add_calculation("sum_ab", Sum::<i64>::new(vec![a.id().clone(), b.id().clone()]))
        .unwrap();
    let sum_c = builder
        .add_calculation("sum_c", Sum::<i64>::new(vec![c.id().clone()]))
        .unwrap();
    let (snapshot, _) = builder.build_and_commit().unwrap();

    let mut next = snapshot.clone();
    next.change_value(&a, 5).unwrap();
    let (next, changed) = next.commit();

    assert!(changed.contains(sum_ab.id()));
    assert!(!changed.contains(sum_c.id()));
    assert_eq!(next.get_value(&sum_c).unwrap(), 100);
}

#[test]
fn minmax_tracks_bounds() {
    let mut builder = Builder::new();
    let a = builder.add_input("a", ValueInput::<i64>::new(), 3).unwrap();
    let b = builder.add_input("b", ValueInput::<i64>::new(), 9).unwrap();
    let c = builder.add_input("c", ValueInput::<i64>::new(), -2).unwrap();
    let mm = builder
        .add_calculation(
            "mm",
            MinMax::<i64>::new(vec![a.id().clone(), b.id().clone(), c.id().clone()], 0),
        )
        .unwrap();
    let (snapshot, _) = builder.build_and_commit().unwrap();

    assert_eq!(
        snapshot.get_value(&mm).unwrap(),
        MinMaxValue { min: -2, max: 9 }
    );
}

#[test]
fn lazy_node_is_not_recomputed_during_commit() {
    let mut builder = Builder::new();
    let a = builder.add_input("a", ValueInput::<i64>::new(), 1).unwrap();
    let lazy_sum = builder
        .add_calculation("lazy_sum", Sum::<i64>::lazy(vec![a.id().clone()]))
        .unwrap();
    let (snapshot, _) = builder.build_and_commit().unwrap();

    let mut next = snapshot.clone();
    next.change_value(&a, 41).unwrap();
    let (next, changed) = next.commit();

    // Marked changed (dirtiness propagates) but the heavy recompute is
    // deferred until the value is actually read.
    assert!(changed.contains(lazy_sum.id()));
    assert_eq!(next.get_value(&lazy_sum).unwrap(), 41);
}

#[test]
fn commit_with_no_changes_is_a_no_op() {
    let mut builder = Builder::new();
    let a = builder.add_input("a", ValueInput::<i64>::new(), 1).unwrap();
    let sum = builder
        .add_calculation("sum", Sum::<i64>::new(vec![a.id().clone()]))
        .unwrap();
    let (snapshot, _) = builder.build_and_commit().unwrap();

    let (next, changed) = snapshot.commit();
    assert!(changed.is_empty());
    assert_eq!(next.version_id(), snapshot.version_id());
    assert_eq!(next.get_value(&sum).unwrap(), 1);
}

#[test]
fn cloned_snapshots_are_independent() {
    let mut builder = Builder::new();
    let a = builder.add_input("a", ValueInput::<i64>::new(), 1).unwrap();
    let sum = builder
        .add_calculation("sum", Sum::<i64>::new(vec![a.id().clone()]))
        .unwrap();
    let (snapshot, _) = builder.build_and_commit().unwrap();

    let mut branch_one = snapshot.clone();
    let mut branch_two = snapshot.clone();
    branch_one.change_value(&a, 5).unwrap();
    branch_two.change_value(&a, 9).unwrap();

    let (branch_one, _) = branch_one.commit();
    let (branch_two, _) = branch_two.commit();

    assert_eq!(branch_one.get_value(&sum).unwrap(), 5);
    assert_eq!(branch_two.get_value(&sum).unwrap(), 9);
    assert_eq!(snapshot.get_value(&sum).unwrap(), 1);
}

#[test]
fn unknown_node_is_an_error() {
    let mut builder = Builder::new();
    builder.add_input("a", ValueInput::<i64>::new(), 1).unwrap();
    let (snapshot, _) = builder.build_and_commit().unwrap();

    let foreign = crate::node::NodeId::new("ghost");
    assert!(snapshot.get_value_erased(&foreign).is_err());
}

#[test]
fn a_cancelled_commit_does_not_mint_a_new_version_id() {
    let mut builder = Builder::new();
    let a = builder.add_input("a", ValueInput::<i64>::new(), 1).unwrap();
    builder
        .add_calculation("sum", Sum::<i64>::new(vec![a.id().clone()]))
        .unwrap();
    let (snapshot, _) = builder.build_and_commit().unwrap();

    let mut next = snapshot.clone();
    next.change_value(&a, 41).unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let options = CommitOptions {
        cancellation: Some(token),
        parallel: false,
    };
    let (cancelled, _changed) = next.commit_with(&options);

    assert!(!cancelled.is_consistent());
    assert_eq!(cancelled.version_id(), next.version_id());
}

#[test]
fn reconfiguration_adds_a_node_to_a_live_snapshot() {
    let mut builder = Builder::new();
    let a = builder.add_input("a", ValueInput::<i64>::new(), 1).unwrap();
    builder
        .add_calculation("sum", Sum::<i64>::new(vec![a.id().clone()]))
        .unwrap();
    let (snapshot, _) = builder.build_and_commit().unwrap();

    let mut reconfigured = snapshot.change_configuration();
    let doubled = reconfigured
        .add_calculation("doubled", Sum::<i64>::new(vec![a.id().clone(), a.id().clone()]))
        .unwrap();
    let (next, _) = reconfigured.build_and_commit().unwrap();

    assert_eq!(next.get_value(&a).unwrap(), 1);
    assert_eq!(next.get_value(&doubled).unwrap(), 2);
}

#[test]
fn reconfiguration_removes_a_node_and_its_dependents() {
    let mut builder = Builder::new();
    let a = builder.add_input("a", ValueInput::<i64>::new(), 1).unwrap();
    let sum = builder
        .add_calculation("sum", Sum::<i64>::new(vec![a.id().clone()]))
        .unwrap();
    let total = builder
        .add_calculation("total", Sum::<i64>::new(vec![sum.id().clone()]))
        .unwrap();
    let (snapshot, _) = builder.build_and_commit().unwrap();

    let mut reconfigured = snapshot.change_configuration();
    reconfigured.remove_node_and_dependents(sum.id());
    let (next, _) = reconfigured.build_and_commit().unwrap();

    assert!(next.nodes().any(|id| id == a.id()));
    assert!(!next.nodes().any(|id| id == sum.id()));
    assert!(!next.nodes().any(|id| id == total.id()));
}
