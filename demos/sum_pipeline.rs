// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Walks a tiny three-node graph (`a`, `b`, `total = sum(a, b)`) through a
//! build, a commit, a mutation, and a second commit, narrating each step
//! with `tracing` the way the teacher's CLI narrates a pipeline run.

use statedag::builder::Builder;
use statedag::nodes::{Sum, ValueInput};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut builder = Builder::new();
    let a = builder.add_input("a", ValueInput::<i64>::new(), 1).unwrap();
    let b = builder.add_input("b", ValueInput::<i64>::new(), 2).unwrap();
    let total = builder
        .add_calculation("total", Sum::<i64>::new(vec![a.id().clone(), b.id().clone()]))
        .unwrap();

    let mut snapshot = builder.build().unwrap();
    println!("built: total = {}", snapshot.get_value(&total).unwrap());

    snapshot.change_value(&a, 10).unwrap();
    let (snapshot, changed) = snapshot.commit();
    println!(
        "committed after a=10: total = {} (changed: {})",
        snapshot.get_value(&total).unwrap(),
        changed.len()
    );

    let facade = statedag::StateGraph::new(snapshot);
    facade.change_value(&b, 20).await.unwrap();
    facade.wait_for_all_pending().await.unwrap();
    let current = facade.snapshot().await;
    println!("facade auto-committed after b=20: total = {}", current.get_value(&total).unwrap());
}
