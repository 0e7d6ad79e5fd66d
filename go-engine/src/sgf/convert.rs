use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::game_tree::{GameTree, NodeId};
use crate::stone::Stone;
use crate::turn::Turn;

use super::types::{self as sgf, Property};

/// Per-move time data extracted from SGF BL/WL/OB/OW properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black_periods: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white_periods: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SgfMetadata {
    pub cols: u8,
    pub rows: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub komi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handicap: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overtime: Option<String>,
}

/// Extract metadata from the root node of an SGF game tree.
fn extract_metadata(sgf_tree: &sgf::GameTree) -> SgfMetadata {
    let mut meta = SgfMetadata {
        cols: 19,
        rows: 19,
        ..Default::default()
    };

    if let Some(root) = sgf_tree.nodes.first() {
        for prop in &root.properties {
            match prop {
                Property::BoardSize(c, r) => {
                    meta.cols = *c;
                    meta.rows = *r;
                }
                Property::Komi(k) => meta.komi = Some(*k),
                Property::Handicap(h) => meta.handicap = Some(*h),
                Property::BlackName(s) => meta.black_name = Some(s.clone()),
                Property::WhiteName(s) => meta.white_name = Some(s.clone()),
                Property::GameName(s) => meta.game_name = Some(s.clone()),
                Property::Result(s) => meta.result = Some(s.clone()),
                Property::TimeLimitSeconds(t) => meta.time_limit_secs = Some(*t),
                Property::OvertimeDescription(s) => meta.overtime = Some(s.clone()),
                _ => {}
            }
        }
    }

    meta
}

/// Extract a Turn from an SGF node's properties, if it contains a move.
fn node_to_turn(node: &sgf::Node) -> Option<Turn> {
    for prop in &node.properties {
        match prop {
            Property::Black(Some(pt)) => return Some(Turn::play(Stone::Black, *pt)),
            Property::Black(None) => return Some(Turn::pass(Stone::Black)),
            Property::White(Some(pt)) => return Some(Turn::play(Stone::White, *pt)),
            Property::White(None) => return Some(Turn::pass(Stone::White)),
            _ => {}
        }
    }
    None
}

/// Extract per-move time data from an SGF node's properties.
fn node_to_move_time(node: &sgf::Node) -> Option<MoveTime> {
    let mut mt = MoveTime::default();
    let mut found = false;
    for prop in &node.properties {
        match prop {
            Property::BlackTime(t) => {
                mt.black_time = Some(*t);
                found = true;
            }
            Property::WhiteTime(t) => {
                mt.white_time = Some(*t);
                found = true;
            }
            Property::BlackOvertimePeriods(p) => {
                mt.black_periods = Some(*p);
                found = true;
            }
            Property::WhiteOvertimePeriods(p) => {
                mt.white_periods = Some(*p);
                found = true;
            }
            _ => {}
        }
    }
    if found { Some(mt) } else { None }
}

/// Result of converting an SGF tree.
pub struct SgfConversion {
    pub tree: GameTree,
    pub metadata: SgfMetadata,
    pub move_times: HashMap<NodeId, MoveTime>,
}

/// Convert an SGF game tree into an engine GameTree + metadata + per-move times.
///
/// Walks the SGF tree recursively, extracting B/W move properties as Turns.
/// Non-move nodes (root properties, comments, etc.) are skipped.
pub fn sgf_to_game_tree(sgf_tree: &sgf::GameTree) -> SgfConversion {
    let metadata = extract_metadata(sgf_tree);
    let mut tree = GameTree::new();
    let mut move_times = HashMap::new();

    walk_sgf_sequence(sgf_tree, &mut tree, None, &mut move_times);

    SgfConversion {
        tree,
        metadata,
        move_times,
    }
}

/// Walk an SGF GameTree's node sequence, adding turns to the engine tree.
/// Returns the last NodeId added (or the parent if no moves were added).
fn walk_sgf_sequence(
    sgf_tree: &sgf::GameTree,
    tree: &mut GameTree,
    parent: Option<NodeId>,
    move_times: &mut HashMap<NodeId, MoveTime>,
) -> Option<NodeId> {
    let mut current = parent;

    // Process sequential nodes
    for node in &sgf_tree.nodes {
        if let Some(turn) = node_to_turn(node) {
            let id = tree.add_child(current, turn);
            if let Some(mt) = node_to_move_time(node) {
                move_times.insert(id, mt);
            }
            current = Some(id);
        }
    }

    // Process variations: each is a sub-GameTree branching from `current`
    for variation in &sgf_tree.variations {
        walk_sgf_sequence(variation, tree, current, move_times);
    }

    current
}

/// Convert an engine GameTree + metadata into an SGF game tree string.
pub fn game_tree_to_sgf(tree: &GameTree, meta: &SgfMetadata) -> String {
    let sgf_tree = build_sgf_tree(tree, meta);
    super::serialize::serialize(&vec![sgf_tree])
}

/// Build an sgf::GameTree from an engine GameTree.
fn build_sgf_tree(tree: &GameTree, meta: &SgfMetadata) -> sgf::GameTree {
    // Root node with metadata properties
    let mut root_props = vec![
        Property::FileFormat(4),
        Property::GameType(1),
        Property::BoardSize(meta.cols, meta.rows),
    ];
    if let Some(k) = meta.komi {
        root_props.push(Property::Komi(k));
    }
    if let Some(h) = meta.handicap
        && h >= 2
    {
        root_props.push(Property::Handicap(h));
    }
    if let Some(ref s) = meta.black_name {
        root_props.push(Property::BlackName(s.clone()));
    }
    if let Some(ref s) = meta.white_name {
        root_props.push(Property::WhiteName(s.clone()));
    }
    if let Some(ref s) = meta.game_name {
        root_props.push(Property::GameName(s.clone()));
    }
    if let Some(ref s) = meta.result {
        root_props.push(Property::Result(s.clone()));
    }
    if let Some(t) = meta.time_limit_secs {
        root_props.push(Property::TimeLimitSeconds(t));
    }
    if let Some(ref s) = meta.overtime {
        root_props.push(Property::OvertimeDescription(s.clone()));
    }

    let root_node = sgf::Node {
        properties: root_props,
    };

    let root_children = tree.root_children();
    if root_children.is_empty() {
        return sgf::GameTree {
            nodes: vec![root_node],
            variations: vec![],
        };
    }

    // Build the main line from the first root child
    let (mut nodes, variations) = build_sgf_line(tree, root_children[0]);
    nodes.insert(0, root_node);

    // Additional root children become variations
    let mut all_variations = variations;
    for &child_id in &root_children[1..] {
        let (var_nodes, var_variations) = build_sgf_line(tree, child_id);
        all_variations.push(sgf::GameTree {
            nodes: var_nodes,
            variations: var_variations,
        });
    }

    sgf::GameTree {
        nodes,
        variations: all_variations,
    }
}

/// Build a line of SGF nodes from a starting engine node, following children[0].
/// Returns (nodes_in_sequence, variations_at_end).
fn build_sgf_line(tree: &GameTree, start: NodeId) -> (Vec<sgf::Node>, Vec<sgf::GameTree>) {
    let mut nodes = Vec::new();
    let mut current = start;

    loop {
        let node = tree.node(current);
        let sgf_node = turn_to_sgf_node(&node.turn);
        nodes.push(sgf_node);

        let children = tree.children_of(Some(current));
        match children.len() {
            0 => return (nodes, vec![]),
            1 => {
                current = children[0];
            }
            _ => {
                // Multiple children: first continues the sequence, rest are variations
                let mut variations = Vec::new();
                for &child_id in &children[1..] {
                    let (var_nodes, var_vars) = build_sgf_line(tree, child_id);
                    variations.push(sgf::GameTree {
                        nodes: var_nodes,
                        variations: var_vars,
                    });
                }

                // Continue with first child
                current = children[0];
                // But we need to wrap the continuation + variations
                let (rest_nodes, rest_vars) = build_sgf_line(tree, current);

                // The continuation becomes its own sub-tree alongside the other variations
                let main_continuation = sgf::GameTree {
                    nodes: rest_nodes,
                    variations: rest_vars,
                };

                // All children become variations
                let mut all_variations = vec![main_continuation];
                all_variations.extend(variations);

                return (nodes, all_variations);
            }
        }
    }
}

/// Convert a Turn into an SGF Node.
fn turn_to_sgf_node(turn: &Turn) -> sgf::Node {
    let prop = match (turn.stone, turn.pos) {
        (Stone::Black, Some(pt)) => Property::Black(Some(pt)),
        (Stone::Black, None) => Property::Black(None),
        (Stone::White, Some(pt)) => Property::White(Some(pt)),
        (Stone::White, None) => Property::White(None),
    };
    sgf::Node {
        properties: vec![prop],
    }
}
