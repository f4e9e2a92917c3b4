//! Precomputed reachability index over the module-set graph.
//!
//! Built once per run. Every set's closure is computed by a depth-first walk
//! in declaration order (own modules first, then nested sets), so diagnostics
//! derived from it are reproducible. Lookups afterwards never walk the graph.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

use crate::core::{DepgenError, DepgenResult};
use crate::models::{ModuleEntry, ModuleSet};

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Reachability index over all module sets.
#[derive(Debug, Default)]
pub struct ModuleSetTraversalCache {
    /// Set name -> modules reachable from it, DFS order
    closures: HashMap<String, Vec<String>>,
    /// Module name -> sets reaching it
    owners: HashMap<String, HashSet<String>>,
    /// Every reachable module, first-seen order
    all_modules: Vec<String>,
    /// Merged entries, same order as `all_modules`
    entries: Vec<ModuleEntry>,
    /// Set names in declaration order
    set_names: Vec<String>,
}

impl ModuleSetTraversalCache {
    /// Build the index.
    ///
    /// Fails with [`DepgenError::UnknownModuleSet`] for a dangling nested
    /// reference and [`DepgenError::ModuleSetCycle`] for a cycle.
    pub fn build(sets: &[ModuleSet]) -> DepgenResult<Self> {
        let by_name: HashMap<&str, &ModuleSet> = sets.iter().map(|s| (s.name.as_str(), s)).collect();

        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
        for set in sets {
            nodes.insert(set.name.as_str(), graph.add_node(set.name.as_str()));
        }
        for set in sets {
            for nested in &set.module_sets {
                let Some(&to) = nodes.get(nested.as_str()) else {
                    return Err(DepgenError::UnknownModuleSet {
                        parent: set.name.clone(),
                        name: nested.clone(),
                    });
                };
                graph.add_edge(nodes[set.name.as_str()], to, ());
            }
        }
        detect_cycles(&graph)?;

        let mut cache = Self {
            set_names: sets.iter().map(|s| s.name.clone()).collect(),
            ..Self::default()
        };

        let mut include_flags: HashMap<&str, bool> = HashMap::new();
        for set in sets {
            for entry in &set.modules {
                *include_flags.entry(entry.name.as_str()).or_default() |= entry.include_dependencies;
            }
        }

        for set in sets {
            let closure = cache.closure_of(set, &by_name);
            for module in &closure {
                cache.owners.entry(module.clone()).or_default().insert(set.name.clone());
            }
        }

        let mut seen = HashSet::new();
        for set in sets {
            for module in &cache.closures[&set.name] {
                if seen.insert(module.clone()) {
                    cache.all_modules.push(module.clone());
                    cache.entries.push(ModuleEntry {
                        name: module.clone(),
                        include_dependencies: include_flags.get(module.as_str()).copied().unwrap_or(false),
                    });
                }
            }
        }

        tracing::debug!(
            target: "dependency",
            "Indexed {} module sets reaching {} modules",
            cache.set_names.len(),
            cache.all_modules.len()
        );
        Ok(cache)
    }

    /// Memoized closure of one set. The graph is acyclic at this point.
    fn closure_of(&mut self, set: &ModuleSet, by_name: &HashMap<&str, &ModuleSet>) -> Vec<String> {
        if let Some(done) = self.closures.get(&set.name) {
            return done.clone();
        }

        let mut seen = HashSet::new();
        let mut closure = Vec::new();
        for entry in &set.modules {
            if seen.insert(entry.name.clone()) {
                closure.push(entry.name.clone());
            }
        }
        for nested in &set.module_sets {
            let child = self.closure_of(by_name[nested.as_str()], by_name);
            for module in child {
                if seen.insert(module.clone()) {
                    closure.push(module);
                }
            }
        }

        self.closures.insert(set.name.clone(), closure.clone());
        closure
    }

    /// Every module reachable from any set, first-seen order.
    pub fn all_module_names(&self) -> &[String] {
        &self.all_modules
    }

    /// Every reachable module with merged flags: a module is generated when
    /// any set lists it with `include-dependencies`.
    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    /// Whether `module` is reachable from the set named `set`.
    pub fn is_reachable_from(&self, module: &str, set: &str) -> bool {
        self.owners.get(module).is_some_and(|owners| owners.contains(set))
    }

    /// Whether any set reaches `module`.
    pub fn contains(&self, module: &str) -> bool {
        self.owners.contains_key(module)
    }

    /// Closure of a set, DFS order.
    pub fn modules_of(&self, set: &str) -> Option<&[String]> {
        self.closures.get(set).map(Vec::as_slice)
    }

    /// Union of the closures of several sets.
    pub fn modules_of_all<'a>(&self, sets: impl IntoIterator<Item = &'a String>) -> HashSet<String> {
        sets.into_iter().filter_map(|s| self.modules_of(s)).flatten().cloned().collect()
    }

    /// Set names in declaration order.
    pub fn set_names(&self) -> &[String] {
        &self.set_names
    }
}

fn detect_cycles(graph: &DiGraph<&str, ()>) -> DepgenResult<()> {
    let mut colors: HashMap<NodeIndex, Color> =
        graph.node_indices().map(|n| (n, Color::White)).collect();
    let mut path = Vec::new();

    for node in graph.node_indices() {
        if colors[&node] == Color::White
            && let Some(cycle) = dfs_visit(graph, node, &mut colors, &mut path)
        {
            return Err(DepgenError::ModuleSetCycle {
                chain: cycle.join(" → "),
            });
        }
    }
    Ok(())
}

fn dfs_visit<'a>(
    graph: &DiGraph<&'a str, ()>,
    node: NodeIndex,
    colors: &mut HashMap<NodeIndex, Color>,
    path: &mut Vec<NodeIndex>,
) -> Option<Vec<&'a str>> {
    colors.insert(node, Color::Gray);
    path.push(node);

    // petgraph yields neighbors newest-edge first; reverse for declaration order
    let mut neighbors: Vec<NodeIndex> = graph.neighbors(node).collect();
    neighbors.reverse();

    for neighbor in neighbors {
        match colors[&neighbor] {
            Color::Gray => {
                let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                let mut cycle: Vec<&str> = path[start..].iter().map(|n| graph[*n]).collect();
                cycle.push(graph[neighbor]);
                return Some(cycle);
            }
            Color::White => {
                if let Some(cycle) = dfs_visit(graph, neighbor, colors, path) {
                    return Some(cycle);
                }
            }
            Color::Black => {}
        }
    }

    path.pop();
    colors.insert(node, Color::Black);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn set(name: &str, modules: &[&str], nested: &[&str]) -> ModuleSet {
        let mut s = ModuleSet::new(name);
        for m in modules {
            s = s.with_module(ModuleEntry::new(*m));
        }
        for n in nested {
            s = s.with_nested(*n);
        }
        s
    }

    #[test]
    fn test_reachability_through_nested_sets() {
        let sets = vec![
            set("product", &["p1"], &["core"]),
            set("core", &["c1", "c2"], &["essential"]),
            set("essential", &["e1", "c1"], &[]),
            set("other", &["o1"], &[]),
        ];
        let cache = ModuleSetTraversalCache::build(&sets).unwrap();

        assert_eq!(cache.modules_of("product").unwrap(), &["p1", "c1", "c2", "e1"]);
        assert!(cache.is_reachable_from("e1", "product"));
        assert!(cache.is_reachable_from("e1", "core"));
        assert!(!cache.is_reachable_from("o1", "product"));
        assert!(!cache.is_reachable_from("p1", "core"));
        assert_eq!(cache.all_module_names(), &["p1", "c1", "c2", "e1", "o1"]);
        assert!(!cache.contains("nowhere"));
    }

    #[test]
    fn test_include_flag_is_merged() {
        let sets = vec![
            set("a", &["m"], &[]),
            ModuleSet::new("b").with_module(ModuleEntry::with_dependencies("m")),
        ];
        let cache = ModuleSetTraversalCache::build(&sets).unwrap();
        assert_eq!(cache.entries(), &[ModuleEntry::with_dependencies("m")]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let sets = vec![set("a", &[], &["b"]), set("b", &[], &["c"]), set("c", &["m"], &["a"])];
        let err = ModuleSetTraversalCache::build(&sets).unwrap_err();
        match err {
            DepgenError::ModuleSetCycle {
                chain,
            } => assert_eq!(chain, "a → b → c → a"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_nested_set_is_rejected() {
        let err = ModuleSetTraversalCache::build(&[set("a", &[], &["ghost"])]).unwrap_err();
        assert!(matches!(err, DepgenError::UnknownModuleSet { .. }));
        assert!(err.is_fatal());
    }

    fn reference_closure(sets: &[ModuleSet], name: &str, out: &mut HashSet<String>) {
        let s = sets.iter().find(|s| s.name == name).unwrap();
        out.extend(s.modules.iter().map(|m| m.name.clone()));
        for nested in &s.module_sets {
            reference_closure(sets, nested, out);
        }
    }

    #[test]
    fn test_matches_reference_dfs_on_random_forests() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..50 {
            let set_count = rng.gen_range(1..12);
            let sets: Vec<ModuleSet> = (0..set_count)
                .map(|i| {
                    let mut s = ModuleSet::new(format!("s{i}"));
                    for _ in 0..rng.gen_range(0..5) {
                        s = s.with_module(ModuleEntry::new(format!("m{}", rng.gen_range(0..30))));
                    }
                    // only reference later sets: acyclic by construction
                    for j in (i + 1)..set_count {
                        if rng.gen_bool(0.25) {
                            s = s.with_nested(format!("s{j}"));
                        }
                    }
                    s
                })
                .collect();

            let cache = ModuleSetTraversalCache::build(&sets).unwrap();
            let mut everything = HashSet::new();
            for s in &sets {
                let mut expected = HashSet::new();
                reference_closure(&sets, &s.name, &mut expected);
                let actual: HashSet<String> = cache.modules_of(&s.name).unwrap().iter().cloned().collect();
                assert_eq!(actual, expected);
                for m in &expected {
                    assert!(cache.is_reachable_from(m, &s.name));
                }
                everything.extend(expected);
            }
            let all: HashSet<String> = cache.all_module_names().iter().cloned().collect();
            assert_eq!(all, everything);
        }
    }
}
