use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SchedulerError;

use super::graph::TaskGraph;
use super::types::ParallelGroup;

impl<P> TaskGraph<P> {
    /// Topological leveling using Kahn's algorithm
    ///
    /// Returns execution levels where tasks in the same level can run in
    /// parallel. Within a level, tasks keep their submission order.
    ///
    /// # Algorithm
    ///
    /// 1. Take each node's in-degree (number of in-batch dependencies)
    /// 2. Level 0 = all nodes with in-degree 0
    /// 3. Decrement the in-degree of every dependent of the current level;
    ///    dependents reaching 0 form the next level
    /// 4. Repeat until the frontier is empty
    ///
    /// Expects a graph that already passed [`TaskGraph::validate`]; nodes left
    /// with a positive in-degree are reported as an internal error rather
    /// than dropped.
    ///
    /// # Time Complexity
    ///
    /// O(V log V + E) where V = number of tasks, E = number of dependencies
    pub fn topological_sort(&self) -> Result<Vec<ParallelGroup<P>>, SchedulerError> {
        let mut in_degree: HashMap<&str, usize> = self
            .nodes
            .iter()
            .map(|(id, node)| (id.as_str(), node.in_degree))
            .collect();

        let mut current: Vec<&str> = self
            .insertion_order
            .iter()
            .map(String::as_str)
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();

        let mut groups: Vec<ParallelGroup<P>> = Vec::new();
        let mut processed = 0;

        while !current.is_empty() {
            processed += current.len();

            let mut next: Vec<&str> = Vec::new();
            for task_id in &current {
                for dependent in self.dependents_of(task_id) {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            next.push(dependent.as_str());
                        }
                    }
                }
            }

            // Preserve input order
            next.sort_by_key(|id| self.position(id));

            groups.push(ParallelGroup {
                level: groups.len(),
                tasks: current
                    .iter()
                    .filter_map(|id| self.nodes.get(*id).map(|n| Arc::clone(&n.task)))
                    .collect(),
            });

            current = next;
        }

        if processed != self.nodes.len() {
            let mut stuck: Vec<&str> = in_degree
                .iter()
                .filter(|(_, &degree)| degree > 0)
                .map(|(id, _)| *id)
                .collect();
            stuck.sort_by_key(|id| self.position(id));
            return Err(SchedulerError::Internal(format!(
                "leveling left {} task(s) unresolved (cycle missed by validation): {}",
                self.nodes.len() - processed,
                stuck.join(", ")
            )));
        }

        Ok(groups)
    }
}
