//! Port-to-port route graph built from extracted movement columns.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::PipelineError;
use crate::table::Table;

/// Directed multigraph of voyages collapsed to weighted edges: one node per
/// port, edge weight counting how many legs sailed that pair.
pub struct RouteGraph {
    graph: DiGraph<String, usize>,
    node_map: HashMap<String, NodeIndex>,
}

impl RouteGraph {
    pub fn new() -> Self {
        RouteGraph {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Count every (from, to) pair of the two given columns. Rows missing
    /// either side contribute nothing.
    pub fn from_table(table: &Table, from_col: &str, to_col: &str) -> Result<Self, PipelineError> {
        let from = table.require_column(from_col)?;
        let to = table.require_column(to_col)?;

        let mut routes = RouteGraph::new();
        for i in 0..table.n_rows() {
            if let (Some(a), Some(b)) = (table.get(i, from), table.get(i, to)) {
                routes.add_leg(a, b);
            }
        }
        Ok(routes)
    }

    pub fn add_leg(&mut self, from: &str, to: &str) {
        let a = self.node(from);
        let b = self.node(to);
        match self.graph.find_edge(a, b) {
            Some(e) => self.graph[e] += 1,
            None => {
                self.graph.add_edge(a, b, 1);
            }
        }
    }

    fn node(&mut self, port: &str) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(port) {
            return idx;
        }
        let idx = self.graph.add_node(port.to_string());
        self.node_map.insert(port.to_string(), idx);
        idx
    }

    pub fn port_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All edges as (from, to, legs), sorted for stable output.
    pub fn edges(&self) -> Vec<(String, String, usize)> {
        let mut out: Vec<(String, String, usize)> = self
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.graph.edge_endpoints(e)?;
                Some((self.graph[a].clone(), self.graph[b].clone(), self.graph[e]))
            })
            .collect();
        out.sort();
        out
    }

    pub fn legs_between(&self, from: &str, to: &str) -> usize {
        let (Some(&a), Some(&b)) = (self.node_map.get(from), self.node_map.get(to)) else {
            return 0;
        };
        self.graph
            .find_edge(a, b)
            .map(|e| self.graph[e])
            .unwrap_or(0)
    }

    /// Write the edge list as a CSV table.
    pub fn to_table(&self) -> Table {
        let mut t = Table::new(vec!["from".into(), "to".into(), "legs".into()]);
        for (from, to, legs) in self.edges() {
            t.push_row(vec![Some(from), Some(to), Some(legs.to_string())]);
        }
        t
    }
}

impl Default for RouteGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// The ordered sequence of ports visited, read off one column after the
/// table has been sorted on another (typically a date).
pub fn route_sequence(
    table: &mut Table,
    place_col: &str,
    order_col: &str,
) -> Result<Vec<String>, PipelineError> {
    let place = table.require_column(place_col)?;
    let order = table.require_column(order_col)?;
    table.sort_by_columns(&[order]);

    Ok((0..table.n_rows())
        .filter_map(|i| table.get(i, place).map(str::to_string))
        .collect())
}
