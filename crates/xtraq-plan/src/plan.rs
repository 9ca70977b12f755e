//! Resolution planner: computes a `ResolutionPlan` from prior snapshot
//! state, live procedure tick values, and configured schema/procedure
//! filters.

use std::collections::{HashSet};

use tracing::{debug, info};

use xtraq_common::model::{Invalidation, ResolutionPlan, SnapshotIndex};

use crate::exec_graph::CallerGraph;
use crate::wildcard::matches_any;

/// A procedure as currently seen live in the database (just enough to
/// compare staleness; full metadata is fetched only for objects actually
/// marked for refresh).
#[derive(Debug, Clone)]
pub struct LiveProcedure {
    pub schema: String,
    pub name: String,
    pub modified_ticks: i64,
}

fn object_key(schema: &str, name: &str) -> String {
    format!("{}.{}", schema.to_lowercase(), name.to_lowercase())
}

pub struct PlanInputs<'a> {
    pub configured_schemas: &'a [String],
    pub ignored_schemas: &'a [String],
    /// Wildcard-aware procedure allow-list (`XTRAQ_BUILD_PROCEDURES` /
    /// `--filter`); empty means "no restriction".
    pub procedure_filter: &'a [String],
    pub prior_index: &'a SnapshotIndex,
    pub live_procedures: &'a [LiveProcedure],
    pub live_schemas: &'a [String],
    /// `--no-cache`: bypass the diff and treat everything in scope as due
    /// for refresh.
    pub skip_planner: bool,
    pub max_degree_of_parallelism: usize,
}

/// Compute `effectiveSchemas = configured ∪ schemas present in prior index,
/// minus ignored`; an empty `configured_schemas` means "all live schemas".
fn effective_schemas(inputs: &PlanInputs) -> Vec<String> {
    let ignored: HashSet<String> = inputs.ignored_schemas.iter().map(|s| s.to_lowercase()).collect();
    let prior: HashSet<String> = inputs.prior_index.procedures.iter().map(|p| p.schema.to_lowercase()).collect();

    let mut set: HashSet<String> = if inputs.configured_schemas.is_empty() {
        inputs.live_schemas.iter().map(|s| s.to_lowercase()).collect()
    } else {
        inputs.configured_schemas.iter().map(|s| s.to_lowercase()).collect()
    };
    set.extend(prior);
    set.retain(|s| !ignored.contains(s));

    let mut result: Vec<String> = set.into_iter().collect();
    result.sort();
    result
}

pub fn build_plan(inputs: &PlanInputs) -> ResolutionPlan {
    let effective = effective_schemas(inputs);
    let effective_set: HashSet<&str> = effective.iter().map(|s| s.as_str()).collect();

    let prior_keys: HashSet<String> = inputs
        .prior_index
        .procedures
        .iter()
        .map(|p| object_key(&p.schema, &p.name))
        .collect();

    if inputs.skip_planner {
        info!("skip-planner flag set, refreshing every procedure in scope");
        let objects_to_refresh: Vec<String> = inputs
            .live_procedures
            .iter()
            .filter(|p| effective_set.contains(p.schema.to_lowercase().as_str()))
            .map(|p| object_key(&p.schema, &p.name))
            .collect();
        let missing_snapshots: Vec<String> = objects_to_refresh
            .iter()
            .filter(|k| !prior_keys.contains(*k))
            .cloned()
            .collect();
        return ResolutionPlan {
            effective_schemas: effective,
            invalidation: batch(objects_to_refresh.clone(), inputs.max_degree_of_parallelism),
            missing_snapshots,
            planner_executed: false,
            warm_run: false,
            reused_existing_result: false,
            plan_file_path: None,
        };
    }

    let mut missing_snapshots = Vec::new();
    let mut to_refresh: HashSet<String> = HashSet::new();
    let mut prior_ticks = std::collections::HashMap::new();
    for p in &inputs.prior_index.procedures {
        prior_ticks.insert(object_key(&p.schema, &p.name), p.modified_ticks);
    }

    for live in inputs.live_procedures {
        if !effective_set.contains(live.schema.to_lowercase().as_str()) {
            continue;
        }
        let key = object_key(&live.schema, &live.name);
        let in_filter = matches_any(inputs.procedure_filter, &live.name);

        let is_missing = !prior_keys.contains(&key);
        if is_missing {
            missing_snapshots.push(key.clone());
        }

        if !in_filter {
            continue;
        }

        let stale = match prior_ticks.get(&key) {
            Some(&ticks) => ticks != live.modified_ticks,
            None => true,
        };
        if stale {
            to_refresh.insert(key);
        }
    }

    // Invalidate cross-schema EXEC callers up to two levels deep.
    let mut edge_pairs: Vec<(String, String)> = Vec::new();
    for p in &inputs.prior_index.procedures {
        let caller_key = object_key(&p.schema, &p.name);
        for callee in &p.executed_procedures {
            edge_pairs.push((caller_key.clone(), callee.to_lowercase()));
        }
    }
    let caller_graph = CallerGraph::build(edge_pairs.iter().map(|(c, e)| (c.as_str(), e.as_str())));

    let seed: Vec<String> = to_refresh.iter().cloned().collect();
    for key in seed {
        for caller in caller_graph.callers_within(&key, 2) {
            debug!(object = %caller, "invalidated as EXEC caller of refreshed object");
            to_refresh.insert(caller);
        }
    }

    let mut objects_to_refresh: Vec<String> = to_refresh.into_iter().collect();
    objects_to_refresh.sort();
    let warm_run = objects_to_refresh.is_empty();

    ResolutionPlan {
        effective_schemas: effective,
        invalidation: batch(objects_to_refresh, inputs.max_degree_of_parallelism),
        missing_snapshots,
        planner_executed: true,
        warm_run,
        reused_existing_result: false,
        plan_file_path: None,
    }
}

fn batch(mut objects: Vec<String>, max_degree_of_parallelism: usize) -> Invalidation {
    objects.sort();
    let cap = max_degree_of_parallelism.max(1);
    let refresh_plan: Vec<Vec<String>> = objects.chunks(cap).map(|c| c.to_vec()).collect();
    Invalidation {
        refresh_plan,
        objects_to_refresh: objects,
    }
}
