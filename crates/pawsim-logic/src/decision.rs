//! Decision tree for idle pets.
//!
//! A small closed set of nodes. The tree is plain data; what a condition
//! means and what an action does is supplied by a [`Blackboard`], so the
//! same tree drives every pet.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionKind {
    Tired,
    Hungry,
    /// Not bored, so toys are still interesting.
    Curious,
    WanderEnabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    SeekBed,
    SeekFood,
    DetectToy,
    Wander,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Success,
    Failure,
    Running,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecisionNode {
    /// Runs children in order until one does not fail.
    Selector(Vec<DecisionNode>),
    /// Runs children in order until one does not succeed.
    Sequence(Vec<DecisionNode>),
    Condition(ConditionKind),
    Action(ActionKind),
}

/// Binds conditions and actions to one pet.
pub trait Blackboard {
    fn check(&mut self, condition: ConditionKind) -> bool;
    fn act(&mut self, action: ActionKind) -> NodeStatus;
}

impl DecisionNode {
    /// Default idle priorities: rest, eat, play, wander.
    pub fn idle_tree() -> Self {
        use DecisionNode::*;
        Selector(vec![
            Sequence(vec![
                Condition(ConditionKind::Tired),
                Action(ActionKind::SeekBed),
            ]),
            Sequence(vec![
                Condition(ConditionKind::Hungry),
                Action(ActionKind::SeekFood),
            ]),
            Sequence(vec![
                Condition(ConditionKind::Curious),
                Action(ActionKind::DetectToy),
            ]),
            Sequence(vec![
                Condition(ConditionKind::WanderEnabled),
                Action(ActionKind::Wander),
            ]),
        ])
    }

    pub fn evaluate<B: Blackboard + ?Sized>(&self, board: &mut B) -> NodeStatus {
        match self {
            DecisionNode::Selector(children) => {
                for child in children {
                    match child.evaluate(board) {
                        NodeStatus::Failure => continue,
                        status => return status,
                    }
                }
                NodeStatus::Failure
            }
            DecisionNode::Sequence(children) => {
                for child in children {
                    match child.evaluate(board) {
                        NodeStatus::Success => continue,
                        status => return status,
                    }
                }
                NodeStatus::Success
            }
            DecisionNode::Condition(kind) => {
                if board.check(*kind) {
                    NodeStatus::Success
                } else {
                    NodeStatus::Failure
                }
            }
            DecisionNode::Action(kind) => board.act(*kind),
        }
    }
}

impl Default for DecisionNode {
    fn default() -> Self {
        Self::idle_tree()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Script {
        true_conditions: Vec<ConditionKind>,
        action_result: Vec<(ActionKind, NodeStatus)>,
        trace: Vec<ActionKind>,
    }

    impl Blackboard for Script {
        fn check(&mut self, condition: ConditionKind) -> bool {
            self.true_conditions.contains(&condition)
        }

        fn act(&mut self, action: ActionKind) -> NodeStatus {
            self.trace.push(action);
            self.action_result
                .iter()
                .find(|(a, _)| *a == action)
                .map_or(NodeStatus::Success, |(_, s)| *s)
        }
    }

    #[test]
    fn tired_pet_seeks_bed_first() {
        let mut board = Script {
            true_conditions: vec![ConditionKind::Tired, ConditionKind::Hungry, ConditionKind::Curious],
            ..Default::default()
        };
        assert_eq!(DecisionNode::idle_tree().evaluate(&mut board), NodeStatus::Success);
        assert_eq!(board.trace, vec![ActionKind::SeekBed]);
    }

    #[test]
    fn falls_through_failed_actions() {
        let mut board = Script {
            true_conditions: vec![ConditionKind::Tired, ConditionKind::Curious, ConditionKind::WanderEnabled],
            action_result: vec![
                (ActionKind::SeekBed, NodeStatus::Failure),
                (ActionKind::DetectToy, NodeStatus::Failure),
                (ActionKind::Wander, NodeStatus::Running),
            ],
            ..Default::default()
        };
        assert_eq!(DecisionNode::idle_tree().evaluate(&mut board), NodeStatus::Running);
        assert_eq!(
            board.trace,
            vec![ActionKind::SeekBed, ActionKind::DetectToy, ActionKind::Wander]
        );
    }

    #[test]
    fn empty_composites() {
        let mut board = Script::default();
        assert_eq!(DecisionNode::Selector(vec![]).evaluate(&mut board), NodeStatus::Failure);
        assert_eq!(DecisionNode::Sequence(vec![]).evaluate(&mut board), NodeStatus::Success);
    }

    #[test]
    fn tree_round_trips_through_json() {
        let tree = DecisionNode::idle_tree();
        let json = serde_json::to_string(&tree).unwrap();
        let back: DecisionNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
