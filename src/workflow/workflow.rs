//! Runtime workflow representation using a directed graph.
//!
//! The stored node list is validated against the block registry and compiled
//! into a petgraph `DiGraph`: one vertex per node and one edge per link whose
//! target exists. Dangling links are kept on the nodes themselves so the
//! engine can report them when it reaches them.

use std::collections::{HashMap, HashSet};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::{Bfs, EdgeRef},
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    BlockflowError, Result,
    blocks::BlockRegistry,
    model::WorkflowModel,
    workflow::{
        consts::{RESERVED_NAMES, TRIGGER_KEY},
        edge::{Edge, Handle},
        node::{Node, NodeId},
        template,
    },
};

/// Where a link leads.
#[derive(Debug)]
pub enum Successor<'a> {
    Node(&'a Node),
    /// The link names a node id that is not part of the workflow.
    Missing(NodeId),
    /// No link.
    End,
}

/// A compiled, read-only workflow.
#[derive(Debug, Clone)]
pub struct Workflow {
    id: String,
    name: String,
    graph: DiGraph<Node, Edge>,
    index: HashMap<NodeId, NodeIndex>,
    trigger: NodeIndex,
}

impl Workflow {
    /// Validate every node and build the graph.
    ///
    /// Fails fast on the first invalid node, on duplicate ids and when no
    /// starting trigger can be found.
    pub fn new(
        model: &WorkflowModel,
        registry: &BlockRegistry,
    ) -> Result<Self> {
        let mut graph: DiGraph<Node, Edge> = DiGraph::new();
        let mut index = HashMap::new();

        for node_model in model.nodes.iter() {
            let node = Node::new(node_model, registry)?;
            if RESERVED_NAMES.contains(&node.name.as_str()) {
                return Err(BlockflowError::node(node.id, node.block_type.as_ref(), format!("name '{}' is reserved", node.name)));
            }
            let nid = node.id;
            let idx = graph.add_node(node);
            if index.insert(nid, idx).is_some() {
                return Err(BlockflowError::Workflow(format!("duplicate node id {} in workflow '{}'", nid, model.id)));
            }
        }

        let links: Vec<(NodeIndex, Handle, NodeId)> = graph
            .node_indices()
            .flat_map(|idx| {
                let node = &graph[idx];
                let next = node.next.map(|t| (idx, Handle::Next, t));
                let branches = node.branches.iter().map(move |(k, t)| (idx, Handle::branch(k), *t));
                next.into_iter().chain(branches).collect::<Vec<_>>()
            })
            .collect();
        for (source, handle, target) in links {
            match index.get(&target) {
                Some(target_idx) => {
                    graph.add_edge(source, *target_idx, Edge::new(handle));
                }
                None => warn!(workflow_id = model.id.as_str(), node_id = graph[source].id, target, %handle, "link to unknown node"),
            }
        }

        let trigger = Self::find_trigger(model, &graph, &index)?;
        let workflow = Self {
            id: model.id.clone(),
            name: model.name.clone(),
            graph,
            index,
            trigger,
        };
        workflow.check_reachability();
        workflow.check_references();
        debug!(workflow_id = workflow.id.as_str(), nodes = workflow.len(), "workflow compiled");

        Ok(workflow)
    }

    fn find_trigger(
        model: &WorkflowModel,
        graph: &DiGraph<Node, Edge>,
        index: &HashMap<NodeId, NodeIndex>,
    ) -> Result<NodeIndex> {
        if let Some(tid) = model.trigger_node_id {
            let idx = index.get(&tid).ok_or_else(|| BlockflowError::Workflow(format!("trigger node {} not found in workflow '{}'", tid, model.id)))?;
            if !graph[*idx].is_trigger() {
                return Err(BlockflowError::Workflow(format!("node {} ({}) is not a trigger", tid, graph[*idx].block_type)));
            }
            return Ok(*idx);
        }

        // leftmost trigger on the canvas, lowest id on ties
        graph
            .node_indices()
            .filter(|idx| graph[*idx].is_trigger())
            .min_by(|a, b| graph[*a].x.total_cmp(&graph[*b].x).then(graph[*a].id.cmp(&graph[*b].id)))
            .ok_or_else(|| BlockflowError::Workflow(format!("workflow '{}' has no trigger node", model.id)))
    }

    fn check_reachability(&self) {
        let mut reached = HashSet::new();
        let mut bfs = Bfs::new(&self.graph, self.trigger);
        while let Some(idx) = bfs.next(&self.graph) {
            reached.insert(idx);
        }
        for idx in self.graph.node_indices().filter(|idx| !reached.contains(idx)) {
            let node = &self.graph[idx];
            if !node.is_trigger() {
                debug!(workflow_id = self.id.as_str(), node_id = node.id, "node is not reachable from the trigger");
            }
        }
    }

    fn check_references(&self) {
        let mut roots: HashSet<&str> = self.graph.node_weights().map(|n| n.name.as_str()).collect();
        roots.extend(self.graph.node_weights().map(|n| n.block_type.as_ref()));
        roots.insert(TRIGGER_KEY);

        for node in self.graph.node_weights() {
            let mut texts = Vec::new();
            node.config.iter().for_each(|(_, v)| collect_strings(v, &mut texts));
            for reference in texts.iter().flat_map(|t| template::references(t)) {
                if reference.token.starts_with('<') && !roots.contains(reference.root()) {
                    warn!(workflow_id = self.id.as_str(), node_id = node.id, reference = reference.token.as_str(), "reference to unknown block");
                }
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node the run starts from.
    pub fn trigger(&self) -> &Node {
        &self.graph[self.trigger]
    }

    pub fn node(
        &self,
        id: NodeId,
    ) -> Option<&Node> {
        self.index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Follow `handle` out of node `nid`.
    pub fn successor(
        &self,
        nid: NodeId,
        handle: &Handle,
    ) -> Successor<'_> {
        let Some(idx) = self.index.get(&nid) else {
            return Successor::End;
        };

        if let Some(edge) = self.graph.edges_directed(*idx, Direction::Outgoing).find(|e| &e.weight().handle == handle) {
            return Successor::Node(&self.graph[edge.target()]);
        }

        let node = &self.graph[*idx];
        let target = match handle {
            Handle::Next => node.next,
            Handle::Branch(key) => node.branches.get(key).copied(),
        };
        match target {
            Some(t) => Successor::Missing(t),
            None => Successor::End,
        }
    }

    /// Output a human-readable representation of the workflow graph
    pub fn schema(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("=== Workflow {} ({}) ===", self.id, self.name));
        lines.push(format!("Nodes: {}, Edges: {}, Trigger: {}", self.graph.node_count(), self.graph.edge_count(), self.trigger().id));
        lines.push(String::new());

        let mut indices: Vec<NodeIndex> = self.graph.node_indices().collect();
        indices.sort_by_key(|idx| self.graph[*idx].id);
        for idx in indices {
            let node = &self.graph[idx];
            let mut outgoing: Vec<String> = self
                .graph
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| format!("{}({})", self.graph[e.target()].id, e.weight().handle))
                .collect();
            outgoing.sort();

            if outgoing.is_empty() {
                lines.push(format!("[{}] {} <{}> -> (end)", node.id, node.name, node.block_type));
            } else {
                lines.push(format!("[{}] {} <{}> -> {}", node.id, node.name, node.block_type, outgoing.join(", ")));
            }
        }

        lines.join("\n")
    }
}

fn collect_strings<'a>(
    value: &'a Value,
    out: &mut Vec<&'a str>,
) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(arr) => arr.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(obj) => obj.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::NodeModel;

    fn model(nodes: Vec<NodeModel>) -> WorkflowModel {
        WorkflowModel {
            id: "wf".into(),
            name: "test".into(),
            nodes,
            ..Default::default()
        }
    }

    #[test]
    fn test_compile_and_follow() {
        let registry = BlockRegistry::standard().unwrap();
        let wf = Workflow::new(
            &model(vec![
                NodeModel::new(1, "whatsapp_message", "Incoming").connect(2),
                NodeModel::new(2, "condition", "Check").branch("true", 3).connect(9),
                NodeModel::new(3, "send_text", "Reply").with_config(json!({"message": "ok"})),
            ]),
            &registry,
        )
        .unwrap();

        assert_eq!(wf.trigger().id, 1);
        assert!(matches!(wf.successor(1, &Handle::Next), Successor::Node(n) if n.id == 2));
        assert!(matches!(wf.successor(2, &Handle::branch("true")), Successor::Node(n) if n.id == 3));
        assert!(matches!(wf.successor(2, &Handle::Next), Successor::Missing(9)));
        assert!(matches!(wf.successor(2, &Handle::branch("false")), Successor::End));
        assert!(matches!(wf.successor(3, &Handle::Next), Successor::End));
    }

    #[test]
    fn test_leftmost_trigger_wins() {
        let registry = BlockRegistry::standard().unwrap();
        let wf = Workflow::new(
            &model(vec![
                NodeModel::new(1, "webhook", "Hook").at(300.0, 0.0),
                NodeModel::new(2, "whatsapp_message", "Chat").at(10.0, 0.0),
            ]),
            &registry,
        )
        .unwrap();
        assert_eq!(wf.trigger().id, 2);
    }

    #[test]
    fn test_explicit_trigger() {
        let registry = BlockRegistry::standard().unwrap();
        let mut m = model(vec![
            NodeModel::new(1, "webhook", "Hook").at(300.0, 0.0),
            NodeModel::new(2, "whatsapp_message", "Chat").at(10.0, 0.0),
            NodeModel::new(3, "delay", "Wait"),
        ]);
        m.trigger_node_id = Some(1);
        assert_eq!(Workflow::new(&m, &registry).unwrap().trigger().id, 1);

        m.trigger_node_id = Some(3);
        assert!(Workflow::new(&m, &registry).is_err());
    }

    #[test]
    fn test_no_trigger() {
        let registry = BlockRegistry::standard().unwrap();
        let err = Workflow::new(&model(vec![NodeModel::new(1, "delay", "Wait")]), &registry).unwrap_err();
        assert!(err.to_string().contains("no trigger"));
    }

    #[test]
    fn test_duplicate_ids() {
        let registry = BlockRegistry::standard().unwrap();
        let err = Workflow::new(
            &model(vec![NodeModel::new(1, "whatsapp_message", "A"), NodeModel::new(1, "delay", "B")]),
            &registry,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate node id 1"));
    }

    #[test]
    fn test_reserved_node_names() {
        let registry = BlockRegistry::standard().unwrap();
        for name in ["trigger", "variables"] {
            let err = Workflow::new(
                &model(vec![NodeModel::new(1, "whatsapp_message", "Incoming").connect(2), NodeModel::new(2, "delay", name)]),
                &registry,
            )
            .unwrap_err();
            assert!(matches!(err, BlockflowError::Node { id: 2, .. }));
            assert!(err.to_string().contains(&format!("name '{}' is reserved", name)));
        }
    }

    #[test]
    fn test_invalid_node_fails_fast() {
        let registry = BlockRegistry::standard().unwrap();
        let err = Workflow::new(
            &model(vec![NodeModel::new(1, "whatsapp_message", "A").connect(2), NodeModel::new(2, "send_text", "Reply")]),
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, BlockflowError::Node { id: 2, .. }));
    }

    #[test]
    fn test_schema() {
        let registry = BlockRegistry::standard().unwrap();
        let wf = Workflow::new(
            &model(vec![
                NodeModel::new(1, "whatsapp_message", "Incoming").connect(2),
                NodeModel::new(2, "delay", "Wait"),
            ]),
            &registry,
        )
        .unwrap();
        let schema = wf.schema();
        assert!(schema.contains("[1] Incoming <whatsapp_message> -> 2(next)"));
        assert!(schema.contains("[2] Wait <delay> -> (end)"));
    }
}
