//! Logic plan graph: exhaustive breadth-first state enumeration and
//! shortest-plan extraction.
//!
//! The graph is built once from a grounded action set and an initial state,
//! then only read. States are deduplicated by value, so the build terminates
//! once every reachable state has been expanded. This is an exhaustive
//! enumeration, not heuristic search; [`GraphConfig::max_states`] bounds it.

use std::collections::{HashMap, HashSet, VecDeque};

use lgp_core::{Goal, GroundedAction, LgpError, Plan, Problem, Result, State};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::{debug, info, warn};

use crate::config::GraphConfig;

/// Directed graph of reachable predicate states.
#[derive(Debug, Clone)]
pub struct LogicPlanGraph {
    graph: DiGraph<State, GroundedAction>,
    /// Value index for node deduplication.
    index: HashMap<State, NodeIndex>,
    initial: NodeIndex,
    goal: Goal,
    /// Goal states in discovery order.
    goal_states: Vec<NodeIndex>,
    goal_set: HashSet<NodeIndex>,
    config: GraphConfig,
}

/// Shortest-path tree by edge count from a single source.
struct ShortestPaths {
    /// Predecessors on some shortest path; the first one is the BFS tree parent.
    predecessors: HashMap<NodeIndex, Vec<NodeIndex>>,
}

impl LogicPlanGraph {
    /// Build the graph for an already-grounded problem.
    pub fn from_problem(
        problem: &Problem,
        actions: &[GroundedAction],
        config: GraphConfig,
    ) -> Result<Self> {
        Self::build(problem.initial.clone(), actions, problem.goal.clone(), config)
    }

    /// Enumerate every state reachable from `initial` under `actions`.
    pub fn build(
        initial: State,
        actions: &[GroundedAction],
        goal: Goal,
        config: GraphConfig,
    ) -> Result<Self> {
        if goal.is_satisfied_by(&initial) {
            info!("Goals are already achieved by the initial state");
        }

        let mut graph = DiGraph::new();
        let root = graph.add_node(initial.clone());
        let mut index = HashMap::new();
        index.insert(initial, root);

        let mut this = Self {
            graph,
            index,
            initial: root,
            goal,
            goal_states: Vec::new(),
            goal_set: HashSet::new(),
            config,
        };

        let mut fringe = VecDeque::new();
        fringe.push_back(root);

        while let Some(node) = fringe.pop_front() {
            let state = this.graph[node].clone();
            for action in actions {
                if !action.is_applicable(&state) {
                    continue;
                }
                let (next, is_new) = this.insert_state(action.apply(&state))?;
                if this.graph.find_edge(node, next).is_some() {
                    continue;
                }
                this.graph.add_edge(node, next, action.clone());
                if let Some(undo) = action.reverse() {
                    if undo.apply(&this.graph[next]) != state {
                        return Err(LgpError::InvalidAction {
                            name: action.signature(),
                            message: format!("Reverse action {} does not restore {}", undo, state),
                        });
                    }
                    if this.graph.find_edge(next, node).is_none() {
                        this.graph.add_edge(next, node, undo.clone());
                    }
                }
                if !this.goal_set.contains(&next) && this.goal.is_satisfied_by(&this.graph[next]) {
                    this.goal_set.insert(next);
                    this.goal_states.push(next);
                }
                if is_new {
                    fringe.push_back(next);
                }
            }
        }

        info!(
            "Built logic plan graph: {} states, {} transitions, {} goal states",
            this.graph.node_count(),
            this.graph.edge_count(),
            this.goal_states.len()
        );

        Ok(this)
    }

    /// Insert a state if unseen, enforcing the enumeration cap.
    fn insert_state(&mut self, state: State) -> Result<(NodeIndex, bool)> {
        if let Some(&node) = self.index.get(&state) {
            return Ok((node, false));
        }
        if self.graph.node_count() >= self.config.max_states {
            warn!(
                "Logic plan graph exceeded {} states, aborting enumeration",
                self.config.max_states
            );
            return Err(LgpError::StateSpaceExceeded {
                limit: self.config.max_states,
            });
        }
        let node = self.graph.add_node(state.clone());
        self.index.insert(state, node);
        Ok((node, true))
    }

    /// Plans from `source` to every reachable goal state, shortest first.
    ///
    /// With `all_plans`, every equal-length alternative to each goal is
    /// returned as well (up to [`GraphConfig::max_alternatives`] per goal).
    /// Ordering is deterministic: ascending length, then goal discovery
    /// order, then edge insertion order.
    pub fn plan(&self, source: &State, all_plans: bool) -> Vec<Plan> {
        if self.graph.edge_count() == 0 {
            warn!("Logic plan graph has no transitions. Plan nothing.");
            return Vec::new();
        }
        let Some(&source_node) = self.index.get(source) else {
            warn!("State {} is not recognized in the logic plan graph. Plan nothing.", source);
            return Vec::new();
        };

        let tree = self.shortest_paths(source_node);
        let mut plans: Vec<Plan> = Vec::new();

        for &goal in &self.goal_states {
            if goal != source_node && !tree.predecessors.contains_key(&goal) {
                debug!(
                    "No path found between source {} and goal {}",
                    source, self.graph[goal]
                );
                continue;
            }
            if all_plans {
                let mut paths = Vec::new();
                let mut suffix = vec![goal];
                self.collect_paths(&tree, source_node, &mut suffix, &mut paths);
                plans.extend(paths.iter().map(|nodes| self.to_plan(nodes)));
            } else {
                plans.push(self.to_plan(&self.tree_path(&tree, source_node, goal)));
            }
        }

        plans.sort_by_key(Plan::len);
        plans
    }

    /// Breadth-first shortest-path tree, exploring edges in insertion order.
    fn shortest_paths(&self, source: NodeIndex) -> ShortestPaths {
        let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
        let mut predecessors: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
        let mut queue = VecDeque::new();
        depth.insert(source, 0);
        queue.push_back(source);

        while let Some(node) = queue.pop_front() {
            let d = depth[&node];
            for (_, target) in self.out_edges(node) {
                match depth.get(&target) {
                    None => {
                        depth.insert(target, d + 1);
                        predecessors.insert(target, vec![node]);
                        queue.push_back(target);
                    }
                    Some(&td) if td == d + 1 => {
                        if let Some(preds) = predecessors.get_mut(&target) {
                            preds.push(node);
                        }
                    }
                    Some(_) => {}
                }
            }
        }

        ShortestPaths { predecessors }
    }

    /// Outgoing edges of `node` in insertion order.
    fn out_edges(&self, node: NodeIndex) -> Vec<(EdgeIndex, NodeIndex)> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.id(), e.target()))
            .collect();
        edges.sort_by_key(|(id, _)| id.index());
        edges
    }

    /// Path along the BFS tree parents.
    fn tree_path(&self, tree: &ShortestPaths, source: NodeIndex, goal: NodeIndex) -> Vec<NodeIndex> {
        let mut path = vec![goal];
        let mut node = goal;
        while node != source {
            match tree.predecessors.get(&node).and_then(|p| p.first()) {
                Some(&parent) => {
                    path.push(parent);
                    node = parent;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Enumerate every shortest path ending with `suffix` (stored goal-first).
    fn collect_paths(
        &self,
        tree: &ShortestPaths,
        source: NodeIndex,
        suffix: &mut Vec<NodeIndex>,
        out: &mut Vec<Vec<NodeIndex>>,
    ) {
        if out.len() >= self.config.max_alternatives {
            return;
        }
        let Some(&head) = suffix.last() else {
            return;
        };
        if head == source {
            out.push(suffix.iter().rev().copied().collect());
            return;
        }
        if let Some(preds) = tree.predecessors.get(&head) {
            for &pred in preds {
                suffix.push(pred);
                self.collect_paths(tree, source, suffix, out);
                suffix.pop();
            }
        }
    }

    /// Read the edge labels along a node path.
    fn to_plan(&self, nodes: &[NodeIndex]) -> Plan {
        let path = nodes.iter().map(|&n| self.graph[n].clone()).collect();
        let actions = nodes
            .windows(2)
            .filter_map(|w| self.graph.find_edge(w[0], w[1]))
            .map(|e| self.graph[e].clone())
            .collect();
        Plan::from_search(path, actions)
    }

    /// The state the graph was built from.
    pub fn initial_state(&self) -> &State {
        &self.graph[self.initial]
    }

    /// The goal condition.
    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    /// Goal states in discovery order.
    pub fn goal_states(&self) -> impl Iterator<Item = &State> {
        self.goal_states.iter().map(|&n| &self.graph[n])
    }

    pub fn is_goal(&self, state: &State) -> bool {
        self.index
            .get(state)
            .map_or(false, |n| self.goal_set.contains(n))
    }

    pub fn contains(&self, state: &State) -> bool {
        self.index.contains_key(state)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Transitions leaving `state`, in insertion order.
    pub fn successors(&self, state: &State) -> Vec<(&GroundedAction, &State)> {
        match self.index.get(state) {
            Some(&node) => self
                .out_edges(node)
                .into_iter()
                .map(|(e, target)| (&self.graph[e], &self.graph[target]))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Get the graph configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lgp_core::atom;

    fn state(atoms: impl IntoIterator<Item = lgp_core::Atom>) -> State {
        atoms.into_iter().collect()
    }

    fn mv(from: &str, to: &str) -> GroundedAction {
        GroundedAction::builder("move")
            .parameters([from, to])
            .precondition(atom!("agent-at", from))
            .precondition(atom!("connected", from, to))
            .add_effect(atom!("agent-at", to))
            .del_effect(atom!("agent-at", from))
            .duration(5)
            .build()
            .unwrap()
    }

    fn pick(obj: &str, loc: &str) -> GroundedAction {
        GroundedAction::builder("pick")
            .parameters([obj, loc])
            .precondition(atom!("agent-at", loc))
            .precondition(atom!("on", obj, loc))
            .precondition(atom!("agent-free"))
            .add_effect(atom!("agent-carry", obj))
            .del_effect(atom!("on", obj, loc))
            .del_effect(atom!("agent-free"))
            .duration(2)
            .build()
            .unwrap()
    }

    /// Place onto `loc` while standing at `from`, which may be an adjacent location.
    fn place(obj: &str, from: &str, loc: &str) -> GroundedAction {
        let mut builder = GroundedAction::builder("place")
            .parameters([obj, loc])
            .precondition(atom!("agent-at", from))
            .precondition(atom!("agent-carry", obj));
        if from != loc {
            builder = builder.precondition(atom!("adjacent", from, loc));
        }
        builder
            .add_effect(atom!("on", obj, loc))
            .add_effect(atom!("agent-free"))
            .del_effect(atom!("agent-carry", obj))
            .duration(2)
            .build()
            .unwrap()
    }

    fn two_location_domain() -> (State, Vec<GroundedAction>, Goal) {
        let initial = state([
            atom!("agent-at", "a"),
            atom!("on", "cup", "a"),
            atom!("agent-free"),
            atom!("connected", "a", "b"),
            atom!("connected", "b", "a"),
            atom!("adjacent", "a", "b"),
        ]);
        let actions = vec![
            mv("a", "b"),
            mv("b", "a"),
            pick("cup", "a"),
            pick("cup", "b"),
            place("cup", "a", "a"),
            place("cup", "b", "b"),
            place("cup", "a", "b"),
        ];
        let goal = Goal::new(state([atom!("on", "cup", "b")]), State::new());
        (initial, actions, goal)
    }

    fn diamond_domain() -> (State, Vec<GroundedAction>, Goal) {
        let initial = state([
            atom!("agent-at", "a"),
            atom!("connected", "a", "b"),
            atom!("connected", "a", "c"),
            atom!("connected", "b", "d"),
            atom!("connected", "c", "d"),
        ]);
        let actions = vec![mv("a", "b"), mv("a", "c"), mv("b", "d"), mv("c", "d")];
        let goal = Goal::new(state([atom!("agent-at", "d")]), State::new());
        (initial, actions, goal)
    }

    #[test]
    fn test_two_location_scenario() {
        let (initial, actions, goal) = two_location_domain();
        let graph =
            LogicPlanGraph::build(initial.clone(), &actions, goal.clone(), GraphConfig::default())
                .unwrap();

        let plans = graph.plan(&initial, false);
        assert!(!plans.is_empty());
        let best = &plans[0];
        assert_eq!(best.len(), 2);
        assert_eq!(best.actions()[0].signature(), "pick cup a");
        assert_eq!(best.actions()[1].signature(), "place cup b");
        assert!(goal.is_satisfied_by(best.goal()));
    }

    #[test]
    fn test_plans_reproduce_paths() {
        let (initial, actions, goal) = two_location_domain();
        let graph = LogicPlanGraph::build(initial.clone(), &actions, goal, GraphConfig::default())
            .unwrap();

        let plans = graph.plan(&initial, true);
        assert!(!plans.is_empty());
        for plan in &plans {
            assert_eq!(plan.source(), &initial);
            assert!(graph.is_goal(plan.goal()));
            assert_eq!(plan.actions().len(), plan.path().len() - 1);
            for (i, action) in plan.actions().iter().enumerate() {
                assert_eq!(&action.apply(&plan.path()[i]), &plan.path()[i + 1]);
            }
        }
        for pair in plans.windows(2) {
            assert!(pair[0].len() <= pair[1].len());
        }
    }

    #[test]
    fn test_every_goal_has_a_plan() {
        let (initial, actions, goal) = two_location_domain();
        let graph = LogicPlanGraph::build(initial.clone(), &actions, goal, GraphConfig::default())
            .unwrap();
        let plans = graph.plan(&initial, false);
        assert_eq!(plans.len(), graph.goal_states().count());
        for goal_state in graph.goal_states() {
            assert!(plans.iter().any(|p| p.goal() == goal_state));
        }
    }

    #[test]
    fn test_plan_is_deterministic() {
        let (initial, actions, goal) = diamond_domain();
        let graph = LogicPlanGraph::build(initial.clone(), &actions, goal, GraphConfig::default())
            .unwrap();
        assert_eq!(graph.plan(&initial, true), graph.plan(&initial, true));
        assert_eq!(graph.plan(&initial, false), graph.plan(&initial, false));
    }

    #[test]
    fn test_alternatives() {
        let (initial, actions, goal) = diamond_domain();
        let graph = LogicPlanGraph::build(initial.clone(), &actions, goal, GraphConfig::default())
            .unwrap();

        let single = graph.plan(&initial, false);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].actions()[0].signature(), "move a b");

        let all = graph.plan(&initial, true);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], single[0]);
        assert_eq!(all[1].actions()[0].signature(), "move a c");
        assert_eq!(all[1].len(), 2);
    }

    #[test]
    fn test_alternatives_cap() {
        let (initial, actions, goal) = diamond_domain();
        let config = GraphConfig::default().with_max_alternatives(1);
        let graph = LogicPlanGraph::build(initial.clone(), &actions, goal, config).unwrap();
        assert_eq!(graph.plan(&initial, true).len(), 1);
    }

    #[test]
    fn test_unknown_source_plans_nothing() {
        let (initial, actions, goal) = diamond_domain();
        let graph = LogicPlanGraph::build(initial, &actions, goal, GraphConfig::default()).unwrap();
        let unknown = state([atom!("agent-at", "z")]);
        assert!(!graph.contains(&unknown));
        assert!(graph.plan(&unknown, true).is_empty());
    }

    #[test]
    fn test_plan_from_intermediate_states() {
        let (initial, actions, goal) = diamond_domain();
        let graph =
            LogicPlanGraph::build(initial.clone(), &actions, goal, GraphConfig::default()).unwrap();
        let at_d = initial
            .without(&atom!("agent-at", "a"))
            .with(atom!("agent-at", "d"));
        assert!(graph.is_goal(&at_d));
        let at_b = initial
            .without(&atom!("agent-at", "a"))
            .with(atom!("agent-at", "b"));
        let plans = graph.plan(&at_b, false);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].len(), 1);

        // Nothing leads back from the goal.
        let from_goal = graph.plan(&at_d, false);
        assert_eq!(from_goal.len(), 1);
        assert!(from_goal[0].is_empty());
    }

    #[test]
    fn test_empty_graph_plans_nothing() {
        let initial = state([atom!("agent-at", "a")]);
        let graph = LogicPlanGraph::build(
            initial.clone(),
            &[],
            Goal::new(state([atom!("agent-at", "b")]), State::new()),
            GraphConfig::default(),
        )
        .unwrap();
        assert_eq!(graph.node_count(), 1);
        assert!(graph.plan(&initial, false).is_empty());
    }

    #[test]
    fn test_state_cap() {
        let (initial, actions, goal) = diamond_domain();
        let config = GraphConfig::default().with_max_states(2);
        let result = LogicPlanGraph::build(initial, &actions, goal, config);
        assert_eq!(result.unwrap_err(), LgpError::StateSpaceExceeded { limit: 2 });
    }

    #[test]
    fn test_nodes_are_deduplicated() {
        let (initial, actions, goal) = two_location_domain();
        let graph = LogicPlanGraph::build(initial, &actions, goal, GraphConfig::default()).unwrap();
        // agent at a/b x cup on a / on b / carried.
        assert_eq!(graph.node_count(), 6);
    }

    #[test]
    fn test_reverse_edges() {
        let off = state([atom!("switch-off")]);
        let on = state([atom!("switch-on")]);
        let turn_off = GroundedAction::builder("turn-off")
            .precondition(atom!("switch-on"))
            .add_effect(atom!("switch-off"))
            .del_effect(atom!("switch-on"))
            .build()
            .unwrap();
        let turn_on = GroundedAction::builder("turn-on")
            .precondition(atom!("switch-off"))
            .add_effect(atom!("switch-on"))
            .del_effect(atom!("switch-off"))
            .reverse(turn_off)
            .build()
            .unwrap();

        let graph = LogicPlanGraph::build(
            off.clone(),
            &[turn_on],
            Goal::new(on.clone(), State::new()),
            GraphConfig::default(),
        )
        .unwrap();

        assert_eq!(graph.edge_count(), 2);
        let back = graph.successors(&on);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].0.name(), "turn-off");
        assert_eq!(back[0].1, &off);
    }

    #[test]
    fn test_reverse_must_restore_state() {
        // Deleting an absent atom and adding it back on undo does not round trip.
        let put_down = GroundedAction::builder("put-down")
            .precondition(atom!("holding"))
            .add_effect(atom!("hand-empty"))
            .del_effect(atom!("holding"))
            .build()
            .unwrap();
        let grab = GroundedAction::builder("grab")
            .add_effect(atom!("holding"))
            .del_effect(atom!("hand-empty"))
            .reverse(put_down)
            .build()
            .unwrap();

        let result = LogicPlanGraph::build(
            State::new(),
            &[grab],
            Goal::new(state([atom!("holding")]), State::new()),
            GraphConfig::default(),
        );
        assert!(matches!(result, Err(LgpError::InvalidAction { .. })));
    }
}
