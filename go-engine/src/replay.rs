use crate::Point;
use crate::engine::Engine;
use crate::game_tree::{GameTree, NodeId};
use crate::turn::Turn;

/// Engine wrapper with a game tree and a navigation cursor.
///
/// Maintains a `GameTree` of moves and a `current` node pointer
/// (None = root / empty board). The inner `Engine` is always rebuilt
/// to match the current position.
#[derive(Debug, Clone)]
pub struct Replay {
    cols: u8,
    rows: u8,
    handicap: u8,
    tree: GameTree,
    current: Option<NodeId>,
    engine: Engine,
    /// Remembered navigation path (root-first sequence of NodeIds).
    /// `forward()` follows this path when possible, falling back to children[0].
    path: Vec<NodeId>,
    /// Undo stack: previous engine states for O(1) back().
    history: Vec<Engine>,
}

impl Replay {
    pub fn new(cols: u8, rows: u8) -> Self {
        Self {
            cols,
            rows,
            handicap: 0,
            tree: GameTree::new(),
            current: None,
            engine: Engine::new(cols, rows),
            path: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn with_moves(cols: u8, rows: u8, moves: Vec<Turn>) -> Self {
        let tree = GameTree::from_moves(&moves);
        let path = Self::main_line_path(&tree);
        let current = path.last().copied();
        let engine = Engine::with_moves(cols, rows, moves);
        Self {
            cols,
            rows,
            handicap: 0,
            tree,
            current,
            engine,
            path,
            history: Vec::new(),
        }
    }

    pub fn set_handicap(&mut self, handicap: u8) {
        self.handicap = handicap;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let moves = match self.current {
            Some(id) => self.tree.moves_to(id),
            None => Vec::new(),
        };
        self.engine =
            Engine::with_handicap_and_moves(self.cols, self.rows, self.handicap, moves);
        self.history.clear();
    }

    /// Apply a single turn to the engine (play or pass).
    fn apply_turn(&mut self, turn: Turn) {
        use crate::turn::Move;
        match turn.kind {
            Move::Play => {
                let point = turn.pos.expect("play move must have a point");
                let _ = self.engine.try_play(turn.stone, point);
            }
            Move::Pass => {
                let _ = self.engine.try_pass(turn.stone);
            }
            Move::Resign => {}
        }
    }

    /// Build the main-line path (following children[0] from root to leaf).
    fn main_line_path(tree: &GameTree) -> Vec<NodeId> {
        let roots = tree.root_children();
        if roots.is_empty() {
            return Vec::new();
        }
        let mut path = vec![roots[0]];
        loop {
            let children = tree.children_of(Some(*path.last().unwrap()));
            if children.is_empty() {
                return path;
            }
            path.push(children[0]);
        }
    }

    /// Follow the remembered path from current to a leaf.
    /// Falls back to children[0] when path doesn't cover a node.
    fn leaf_from_current(&self) -> Option<NodeId> {
        let mut current = self.current;
        let mut depth = self.view_index();
        loop {
            let children = self.tree.children_of(current);
            if children.is_empty() {
                return current;
            }
            let next = if depth < self.path.len() && children.contains(&self.path[depth]) {
                self.path[depth]
            } else {
                children[0]
            };
            current = Some(next);
            depth += 1;
        }
    }

    /// Depth of a node (number of moves from root).
    fn depth_of(&self, node_id: NodeId) -> usize {
        self.tree.depth(node_id)
    }

    // -- Accessors --

    pub fn cols(&self) -> u8 {
        self.cols
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn handicap(&self) -> u8 {
        self.handicap
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn tree(&self) -> &GameTree {
        &self.tree
    }

    pub fn current_node(&self) -> Option<NodeId> {
        self.current
    }

    /// Flat moves along the path from root to current node.
    pub fn moves(&self) -> Vec<Turn> {
        match self.current {
            Some(id) => self.tree.moves_to(id),
            None => Vec::new(),
        }
    }

    /// Depth of current node (0 = root/empty board).
    pub fn view_index(&self) -> usize {
        match self.current {
            Some(id) => self.depth_of(id),
            None => 0,
        }
    }

    /// Total depth following first children from current to leaf.
    pub fn total_moves(&self) -> usize {
        match self.leaf_from_current() {
            Some(leaf) => self.depth_of(leaf),
            None => self.view_index(),
        }
    }

    pub fn is_at_latest(&self) -> bool {
        match self.current {
            Some(id) => self.tree.children_of(Some(id)).is_empty(),
            None => self.tree.root_children().is_empty(),
        }
    }

    pub fn is_at_start(&self) -> bool {
        self.current.is_none()
    }

    /// The turn at the current position, if any.
    pub fn last_move(&self) -> Option<&Turn> {
        self.current.map(|id| &self.tree.node(id).turn)
    }

    /// The position of the last played stone at the current view, if any.
    pub fn last_play_pos(&self) -> Option<Point> {
        self.last_move().filter(|t| t.is_play()).and_then(|t| t.pos)
    }

    // -- Game actions --

    /// Play the current turn's stone at the given point.
    /// Adds as a child of the current node (creating a branch if needed).
    /// Returns true if the move was legal.
    pub fn try_play(&mut self, col: u8, row: u8) -> bool {
        let stone = self.engine.current_turn_stone();
        let prev = self.engine.clone();
        if self.engine.try_play(stone, (col, row)).is_ok() {
            self.history.push(prev);
            let turn = Turn::play(stone, (col, row));
            let new_id = self.tree.add_child(self.current, turn);
            self.current = Some(new_id);
            self.path = self.tree.path_to(new_id);
            true
        } else {
            false
        }
    }

    /// Pass the current turn.
    /// Returns true on success.
    pub fn pass(&mut self) -> bool {
        let stone = self.engine.current_turn_stone();
        let prev = self.engine.clone();
        if self.engine.try_pass(stone).is_ok() {
            self.history.push(prev);
            let turn = Turn::pass(stone);
            let new_id = self.tree.add_child(self.current, turn);
            self.current = Some(new_id);
            self.path = self.tree.path_to(new_id);
            true
        } else {
            false
        }
    }

    /// Remove a node and all its descendants from the tree.
    /// If the cursor is within the removed subtree, it moves to the parent.
    pub fn remove_subtree(&mut self, node_id: NodeId) -> bool {
        if node_id >= self.tree.len() {
            return false;
        }

        // Check if cursor is in the subtree being removed
        let cursor_in_subtree = if let Some(cur) = self.current {
            let mut check = Some(cur);
            let mut found = false;
            while let Some(id) = check {
                if id == node_id {
                    found = true;
                    break;
                }
                check = self.tree.node(id).parent;
            }
            found
        } else {
            false
        };

        let parent = self.tree.node(node_id).parent;

        if !self.tree.remove_subtree(node_id) {
            return false;
        }

        if cursor_in_subtree {
            self.current = parent;
            self.path = match parent {
                Some(pid) => self.tree.path_to(pid),
                None => Vec::new(),
            };
            self.rebuild();
        }

        true
    }

    /// Undo the current node (remove it if it's a leaf, then move to parent).
    pub fn undo(&mut self) -> bool {
        match self.current {
            Some(id) => {
                let parent = self.tree.node(id).parent;
                if self.tree.remove_leaf(id) {
                    self.current = parent;
                    self.path = match parent {
                        Some(pid) => self.tree.path_to(pid),
                        None => Vec::new(),
                    };
                    self.rebuild();
                    true
                } else {
                    // Not a leaf — can't undo
                    false
                }
            }
            None => false,
        }
    }

    // -- Navigation --

    /// Step back one move (move to parent). Returns false if already at start.
    pub fn back(&mut self) -> bool {
        match self.current {
            Some(id) => {
                self.current = self.tree.node(id).parent;
                if let Some(prev) = self.history.pop() {
                    self.engine = prev;
                } else {
                    self.rebuild();
                }
                true
            }
            None => false,
        }
    }

    /// Step forward one move, following the remembered path when possible.
    /// Falls back to children[0] if the path doesn't apply.
    pub fn forward(&mut self) -> bool {
        let children = self.tree.children_of(self.current);
        if children.is_empty() {
            return false;
        }
        let depth = self.view_index();
        let next = if depth < self.path.len() && children.contains(&self.path[depth]) {
            self.path[depth]
        } else {
            self.path.truncate(depth);
            self.path.push(children[0]);
            children[0]
        };
        self.history.push(self.engine.clone());
        let turn = &self.tree.node(next).turn;
        self.apply_turn(turn.clone());
        self.current = Some(next);
        true
    }

    /// Jump to the start (empty board).
    pub fn to_start(&mut self) {
        self.current = None;
        self.rebuild();
    }

    /// Jump to the latest move, following the remembered path.
    pub fn to_latest(&mut self) {
        self.current = self.leaf_from_current();
        if let Some(id) = self.current {
            self.path = self.tree.path_to(id);
        }
        self.rebuild();
    }

    /// Jump to a specific node, remembering the path.
    pub fn navigate_to(&mut self, node_id: NodeId) {
        if node_id < self.tree.len() {
            self.current = Some(node_id);
            self.path = self.tree.path_to(node_id);
            self.rebuild();
        }
    }

    /// Replace the full move history with a flat list.
    /// Builds a fresh linear GameTree and sets current to latest.
    pub fn replace_moves(&mut self, moves: Vec<Turn>) {
        self.tree = GameTree::from_moves(&moves);
        self.path = Self::main_line_path(&self.tree);
        self.current = self.path.last().copied();
        self.rebuild();
    }

    /// Merge base moves into the existing tree, preserving branches.
    /// Walks through `moves` using `add_child` (which reuses matching nodes),
    /// so only genuinely new moves are appended. Analysis branches remain intact.
    /// Returns the node ID of the base-line tip (or None for empty moves).
    /// Does NOT move the cursor.
    pub fn merge_base_moves(&mut self, moves: Vec<Turn>) -> Option<NodeId> {
        let old_len = self.tree.len();
        let mut parent: Option<NodeId> = None;
        for turn in moves {
            let id = self.tree.add_child(parent, turn);
            parent = Some(id);
        }
        // Only update path if the tree actually grew (avoid clobbering
        // the user's remembered analysis-branch path on a no-op merge).
        if self.tree.len() > old_len {
            if let Some(tip) = parent {
                self.path = self.tree.path_to(tip);
            }
        }
        parent
    }

    /// Wholesale replace the tree (e.g. from localStorage restore).
    pub fn replace_tree(&mut self, tree: GameTree) {
        self.tree = tree;
        self.path = Self::main_line_path(&self.tree);
        self.current = self.path.last().copied();
        self.rebuild();
    }
}
