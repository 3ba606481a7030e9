//! Sequence resolution: merging steps across plugins into a
//! dependency-respecting order.
//!
//! The resolver is a short-lived state machine:
//!
//! 1. **Building** — [`SequenceResolver::ingest`] is called once per plugin,
//!    in registration order. Steps are collected by name; a later step under
//!    an already-seen name is dropped with a warning. Forward dependencies
//!    become predecessor edges; reverse dependencies become successor edges.
//! 2. **Finalize** — [`SequenceResolver::finalize`] consumes the resolver and
//!    either produces an ordered [`ResolvedSequence`] or fails with
//!    [`DependencyCycle`] naming every node on the cycle. Cycle detection
//!    happens here, before any step is yielded.
//!
//! Emission is Kahn-style, level by level: within one level (the set of
//! currently-ready nodes) steps keep the order in which they were first
//! ingested. This makes resolved sequences deterministic and reproducible
//! across runs with identical inputs, which callers rely on for debugging
//! and test assertions.
//!
//! A dependency on a name that no step carries is not an error: the name
//! participates in ordering as a silent hint and is skipped at emission.

use hashbrown::{HashMap, HashSet};

use crate::error::DependencyCycle;
use crate::plugin::Plugin;
use crate::step::OperationStep;

// ─────────────────────────────────────────────────────────────────────────────
// SequenceResolver
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the dependency graph for one operation from a plugin collection.
pub struct SequenceResolver {
    operation: String,
    /// Collected steps, keyed by name. First contributor wins.
    steps: HashMap<String, OperationStep>,
    /// Predecessor edges: node → names that must precede it.
    predecessors: HashMap<String, Vec<String>>,
    /// Every node name in first-seen order. Drives the in-level tie-break.
    order: Vec<String>,
}

impl SequenceResolver {
    /// Creates an empty resolver for the named operation.
    #[must_use]
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            steps: HashMap::new(),
            predecessors: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// The operation this resolver is building a sequence for.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Ingests one plugin's steps for the operation.
    ///
    /// Call once per plugin, in registration order — the ingest order is
    /// what makes resolved sequences reproducible.
    pub fn ingest(&mut self, plugin: &dyn Plugin) {
        for step in plugin.operation_steps(&self.operation) {
            self.ingest_step(step);
        }
    }

    /// Ingests a single step, applying the keep-first duplicate policy.
    pub fn ingest_step(&mut self, step: OperationStep) {
        if let Some(existing) = self.steps.get(step.name()) {
            tracing::warn!(
                operation = %self.operation,
                step = %step.name(),
                kept = %existing.plugin(),
                dropped = %step.plugin(),
                "step name contributed by two plugins; ignoring the later contribution",
            );
            return;
        }

        let name = step.name().to_owned();
        self.touch(&name);
        for dependency in step.dependencies() {
            self.touch(dependency);
        }
        for follower in step.reverse_dependencies() {
            self.touch(follower);
        }

        if let Some(preds) = self.predecessors.get_mut(name.as_str()) {
            preds.extend(step.dependencies().iter().cloned());
        }
        for follower in step.reverse_dependencies() {
            if let Some(preds) = self.predecessors.get_mut(follower.as_str()) {
                preds.push(name.clone());
            }
        }

        self.steps.insert(name, step);
    }

    /// Registers a node name on first sight.
    fn touch(&mut self, name: &str) {
        if !self.predecessors.contains_key(name) {
            self.predecessors.insert(name.to_owned(), Vec::new());
            self.order.push(name.to_owned());
        }
    }

    /// Finalizes the graph into an ordered sequence.
    ///
    /// # Errors
    ///
    /// Returns [`DependencyCycle`] if the collected steps cannot be ordered.
    /// The error names every node on the cycle — in step display form where
    /// the node corresponds to a contributed step, as the raw name where it
    /// is a dangling dependency.
    pub fn finalize(mut self) -> Result<ResolvedSequence, DependencyCycle> {
        let mut indegree: HashMap<&str, usize> = self
            .predecessors
            .iter()
            .map(|(name, preds)| (name.as_str(), preds.len()))
            .collect();

        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
        for (name, preds) in &self.predecessors {
            for pred in preds {
                successors
                    .entry(pred.as_str())
                    .or_default()
                    .push(name.as_str());
            }
        }

        let mut emitted: HashSet<&str> = HashSet::new();
        let mut sequence: Vec<&str> = Vec::with_capacity(self.order.len());

        // Level-by-level emission with first-seen order inside each level.
        loop {
            let ready: Vec<&str> = self
                .order
                .iter()
                .map(String::as_str)
                .filter(|&name| !emitted.contains(name) && indegree[name] == 0)
                .collect();
            if ready.is_empty() {
                break;
            }

            for &name in &ready {
                emitted.insert(name);
                sequence.push(name);
            }
            for &name in &ready {
                if let Some(followers) = successors.get(name) {
                    for &follower in followers {
                        if let Some(count) = indegree.get_mut(follower) {
                            *count -= 1;
                        }
                    }
                }
            }
        }

        if emitted.len() < self.order.len() {
            let cycle = find_cycle(&self.order, &self.predecessors, &emitted);
            let steps = cycle
                .into_iter()
                .map(|name| match self.steps.get(name) {
                    Some(step) => step.to_string(),
                    None => name.to_owned(),
                })
                .collect();
            return Err(DependencyCycle {
                operation: self.operation,
                steps,
            });
        }

        let steps = sequence
            .into_iter()
            .filter_map(|name| self.steps.remove(name))
            .collect();
        Ok(ResolvedSequence {
            operation: self.operation,
            steps,
        })
    }
}

/// Extracts one cycle from the unemitted part of the graph.
///
/// Every unemitted node retains at least one unemitted predecessor, so a
/// depth-first walk along predecessor edges restricted to unemitted nodes
/// must revisit a node on the current path.
fn find_cycle<'a>(
    order: &'a [String],
    predecessors: &'a HashMap<String, Vec<String>>,
    emitted: &HashSet<&str>,
) -> Vec<&'a str> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut path: Vec<&str> = Vec::new();
    let mut on_path: HashSet<&str> = HashSet::new();

    for start in order {
        if emitted.contains(start.as_str()) || visited.contains(start.as_str()) {
            continue;
        }
        if let Some(cycle) = walk(
            start.as_str(),
            predecessors,
            emitted,
            &mut visited,
            &mut path,
            &mut on_path,
        ) {
            return cycle;
        }
    }

    Vec::new()
}

fn walk<'a>(
    node: &'a str,
    predecessors: &'a HashMap<String, Vec<String>>,
    emitted: &HashSet<&str>,
    visited: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
    on_path: &mut HashSet<&'a str>,
) -> Option<Vec<&'a str>> {
    visited.insert(node);
    path.push(node);
    on_path.insert(node);

    if let Some(preds) = predecessors.get(node) {
        for pred in preds {
            let pred = pred.as_str();
            if emitted.contains(pred) {
                continue;
            }
            if on_path.contains(pred) {
                let start = path.iter().position(|&n| n == pred).unwrap_or(0);
                return Some(path[start..].to_vec());
            }
            if !visited.contains(pred) {
                if let Some(cycle) =
                    walk(pred, predecessors, emitted, visited, path, on_path)
                {
                    return Some(cycle);
                }
            }
        }
    }

    path.pop();
    on_path.remove(node);
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// ResolvedSequence
// ─────────────────────────────────────────────────────────────────────────────

/// An ordered, dependency-respecting sequence of steps for one operation.
///
/// For every step S and every name N in S's dependencies that corresponds to
/// some step T in the sequence, T precedes S; symmetrically for reverse
/// dependencies.
#[derive(Debug, Clone)]
pub struct ResolvedSequence {
    operation: String,
    steps: Vec<OperationStep>,
}

impl ResolvedSequence {
    /// The operation this sequence belongs to.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// The steps, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[OperationStep] {
        &self.steps
    }

    /// Number of steps in the sequence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the sequence is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterates the steps in execution order.
    pub fn iter(&self) -> core::slice::Iter<'_, OperationStep> {
        self.steps.iter()
    }
}

impl IntoIterator for ResolvedSequence {
    type Item = OperationStep;
    type IntoIter = std::vec::IntoIter<OperationStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResolvedSequence {
    type Item = &'a OperationStep;
    type IntoIter = core::slice::Iter<'a, OperationStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
