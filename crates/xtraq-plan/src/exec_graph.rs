//! Cross-schema EXEC caller graph, used to invalidate callers of a refreshed
//! procedure up to two levels deep.

use std::collections::HashMap;

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

/// Edges point callee -> caller, so a walk outward from a refreshed
/// procedure reaches everything that would need to regenerate because it
/// forwards that procedure's result sets.
pub struct CallerGraph {
    graph: DiGraphMap<usize, ()>,
    keys: Vec<String>,
    index_of: HashMap<String, usize>,
}

impl CallerGraph {
    /// `edges` is `(caller_key, callee_key)` pairs, one per recorded
    /// `executedProcedures` entry.
    pub fn build<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut keys = Vec::new();
        let mut index_of = HashMap::new();
        let mut graph = DiGraphMap::new();

        let mut intern = |keys: &mut Vec<String>, index_of: &mut HashMap<String, usize>, s: &str| -> usize {
            if let Some(&idx) = index_of.get(s) {
                return idx;
            }
            let idx = keys.len();
            keys.push(s.to_string());
            index_of.insert(s.to_string(), idx);
            idx
        };

        for (caller, callee) in edges {
            let caller_idx = intern(&mut keys, &mut index_of, caller);
            let callee_idx = intern(&mut keys, &mut index_of, callee);
            graph.add_edge(callee_idx, caller_idx, ());
        }

        CallerGraph { graph, keys, index_of }
    }

    /// Callers of `key` up to `max_depth` levels out, visited set guards
    /// against cycles; `key` itself is never included.
    pub fn callers_within(&self, key: &str, max_depth: u32) -> Vec<String> {
        let Some(&start) = self.index_of.get(key) else {
            return Vec::new();
        };
        let mut visited = std::collections::HashSet::new();
        let mut frontier = vec![start];
        let mut result = Vec::new();
        visited.insert(start);

        for _ in 0..max_depth {
            let mut next = Vec::new();
            for &node in &frontier {
                for caller in self.graph.neighbors_directed(node, Direction::Outgoing) {
                    if visited.insert(caller) {
                        result.push(self.keys[caller].clone());
                        next.push(caller);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_level_invalidation_stops_at_depth() {
        // a calls b, b calls c, c calls d.
        let graph = CallerGraph::build([("a", "b"), ("b", "c"), ("c", "d")]);
        let callers = graph.callers_within("d", 2);
        assert!(callers.contains(&"c".to_string()));
        assert!(callers.contains(&"b".to_string()));
        assert!(!callers.contains(&"a".to_string()));
    }

    #[test]
    fn cycles_do_not_loop_forever() {
        let graph = CallerGraph::build([("a", "b"), ("b", "a")]);
        let callers = graph.callers_within("a", 8);
        assert_eq!(callers, vec!["b".to_string()]);
    }

    #[test]
    fn unknown_key_returns_empty() {
        let graph = CallerGraph::build([("a", "b")]);
        assert!(graph.callers_within("missing", 2).is_empty());
    }
}
