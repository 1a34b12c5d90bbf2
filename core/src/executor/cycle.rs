//! Three-color depth-first cycle detection.
//!
//! White = unvisited, gray = on the current path, black = finished. An edge
//! into a gray node is a back-edge and closes a cycle; the cycle is the slice
//! of the active path starting at that node. A self-dependency is a back-edge
//! from a node to itself and yields a one-element cycle.

use std::collections::HashMap;

use super::graph::TaskGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl<P> TaskGraph<P> {
    /// Every cycle closed by a back-edge, each as an ordered namespace list
    /// following dependency edges.
    ///
    /// Roots are visited in submission order and dependencies in declaration
    /// order, so the result is deterministic. The traversal is iterative so
    /// long dependency chains cannot exhaust the stack.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) plus the length of each reported cycle.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut color: HashMap<&str, Color> = self
            .insertion_order
            .iter()
            .map(|id| (id.as_str(), Color::White))
            .collect();
        let mut cycles = Vec::new();

        for root in &self.insertion_order {
            if color.get(root.as_str()) != Some(&Color::White) {
                continue;
            }

            // Active path: (node, index of the next dependency to explore).
            let mut path: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
            color.insert(root.as_str(), Color::Gray);

            while let Some(top) = path.last_mut() {
                let node = top.0;
                let deps = self.dependencies_of(node);

                if top.1 >= deps.len() {
                    color.insert(node, Color::Black);
                    path.pop();
                    continue;
                }

                let dep = deps[top.1].as_str();
                top.1 += 1;

                match color.get(dep).copied().unwrap_or(Color::Black) {
                    Color::White => {
                        color.insert(dep, Color::Gray);
                        path.push((dep, 0));
                    }
                    Color::Gray => {
                        if let Some(start) = path.iter().position(|(id, _)| *id == dep) {
                            cycles.push(
                                path[start..]
                                    .iter()
                                    .map(|(id, _)| id.to_string())
                                    .collect(),
                            );
                        }
                    }
                    Color::Black => {}
                }
            }
        }

        cycles
    }
}
