use std::collections::HashSet;

use crate::goban::Goban;
use crate::stone::Stone;
use crate::Point;

// ---------------------------------------------------------------------------
// Xorshift128 PRNG (deterministic, no external crate)
// ---------------------------------------------------------------------------

struct Rng {
    s: [u32; 4],
}

impl Rng {
    fn new(seed: u64) -> Self {
        // Split seed into four nonzero 32-bit words
        let mut s = [
            (seed & 0xFFFF_FFFF) as u32,
            (seed >> 32) as u32,
            seed.wrapping_mul(6364136223846793005) as u32,
            (seed.wrapping_mul(6364136223846793005) >> 32) as u32,
        ];
        // Ensure no zero state
        for v in &mut s {
            if *v == 0 {
                *v = 0xDEAD_BEEF;
            }
        }
        Self { s }
    }

    fn next(&mut self) -> u32 {
        let t = self.s[3];
        let mut s = self.s[0];
        self.s[3] = self.s[2];
        self.s[2] = self.s[1];
        self.s[1] = s;
        s ^= s << 11;
        s ^= s >> 8;
        self.s[0] = s ^ t ^ (t >> 19);
        self.s[0]
    }

    fn range(&mut self, n: usize) -> usize {
        (self.next() as usize) % n
    }
}

// ---------------------------------------------------------------------------
// PlayoutBoard — lightweight mutable board for fast random playouts
// ---------------------------------------------------------------------------

struct PlayoutBoard {
    data: Vec<i8>,
    cols: usize,
    rows: usize,
}

impl PlayoutBoard {
    fn from_goban(goban: &Goban) -> Self {
        Self {
            data: goban.board().to_vec(),
            cols: goban.cols() as usize,
            rows: goban.rows() as usize,
        }
    }

    #[inline]
    fn size(&self) -> usize {
        self.cols * self.rows
    }

    #[inline]
    fn get(&self, v: usize) -> i8 {
        self.data[v]
    }

    /// 4-connected neighbors as flat indices.
    fn neighbors(&self, v: usize) -> arrayvec::ArrayVec<usize, 4> {
        let mut result = arrayvec::ArrayVec::new();
        let x = v % self.cols;
        let y = v / self.cols;
        if x > 0 {
            result.push(v - 1);
        }
        if x + 1 < self.cols {
            result.push(v + 1);
        }
        if y > 0 {
            result.push(v - self.cols);
        }
        if y + 1 < self.rows {
            result.push(v + self.cols);
        }
        result
    }

    /// Does the chain containing `v` have at least one liberty? Early-exit DFS.
    fn has_liberties(&self, v: usize, visited: &mut [bool]) -> bool {
        let sign = self.data[v];
        let mut stack = vec![v];
        while let Some(u) = stack.pop() {
            if visited[u] {
                continue;
            }
            visited[u] = true;
            for n in self.neighbors(u) {
                if self.data[n] == 0 {
                    return true;
                }
                if self.data[n] == sign && !visited[n] {
                    stack.push(n);
                }
            }
        }
        false
    }

    /// Flood-fill chain from `v`.
    fn get_chain(&self, v: usize) -> Vec<usize> {
        let sign = self.data[v];
        let mut visited = vec![false; self.size()];
        let mut chain = Vec::new();
        let mut stack = vec![v];
        while let Some(u) = stack.pop() {
            if visited[u] {
                continue;
            }
            visited[u] = true;
            chain.push(u);
            for n in self.neighbors(u) {
                if self.data[n] == sign && !visited[n] {
                    stack.push(n);
                }
            }
        }
        chain
    }

    /// Try to make a pseudo-legal move. Returns Some(captured_vertices) on success,
    /// None if the move is rejected (eye fill, suicide, ko-like recapture).
    fn make_pseudo_move(&mut self, sign: i8, v: usize) -> Option<Vec<usize>> {
        // Reject eye fills: all neighbors are same color or off-board
        let neighbors = self.neighbors(v);
        let all_friendly = neighbors.iter().all(|&n| self.data[n] == sign);
        if all_friendly {
            return None;
        }

        // Place stone
        self.data[v] = sign;

        // Capture opponent chains with 0 liberties
        let opp = -sign;
        let mut captured = Vec::new();
        for &n in &neighbors {
            if self.data[n] == opp {
                let mut vis = vec![false; self.size()];
                if !self.has_liberties(n, &mut vis) {
                    let chain = self.get_chain(n);
                    for &c in &chain {
                        self.data[c] = 0;
                    }
                    captured.extend(chain);
                }
            }
        }

        // Reject suicide (placed stone has no liberties and captured nothing)
        if captured.is_empty() {
            let mut vis = vec![false; self.size()];
            if !self.has_liberties(v, &mut vis) {
                self.data[v] = 0;
                return None;
            }
        }

        // Reject ko-like recaptures: single stone captures single stone AND
        // the capturing stone has exactly 1 liberty (the captured position).
        if captured.len() == 1 {
            let nbrs = self.neighbors(v);
            let is_single = nbrs.iter().all(|&n| self.data[n] != sign);
            let lib_count = nbrs.iter().filter(|&&n| self.data[n] == 0).count();
            if is_single && lib_count == 1 {
                self.data[v] = 0;
                self.data[captured[0]] = opp;
                return None;
            }
        }

        Some(captured)
    }
}

// ---------------------------------------------------------------------------
// Monte Carlo playout
// ---------------------------------------------------------------------------

/// Run a single random playout to completion, returning the final board signs.
fn play_till_end(goban: &Goban, starting_sign: i8, rng: &mut Rng) -> Vec<i8> {
    let mut board = PlayoutBoard::from_goban(goban);
    let size = board.size();

    // Collect playable empty vertices
    let mut empty: Vec<usize> = (0..size).filter(|&i| board.get(i) == 0).collect();

    let mut sign = starting_sign;
    let mut consecutive_passes = 0;

    while consecutive_passes < 2 && !empty.is_empty() {
        let mut played = false;
        let mut attempts = empty.len();

        while attempts > 0 {
            let idx = rng.range(empty.len());
            let v = empty[idx];

            if board.get(v) != 0 {
                empty.swap_remove(idx);
                attempts = attempts.saturating_sub(1);
                continue;
            }

            if let Some(_captured) = board.make_pseudo_move(sign, v) {
                empty.swap_remove(idx);
                played = true;
                break;
            }
            attempts -= 1;
        }

        if played {
            consecutive_passes = 0;
        } else {
            consecutive_passes += 1;
        }

        sign = -sign;
    }

    // Patch remaining empty points with neighbor color
    for i in 0..size {
        if board.get(i) == 0 {
            for n in board.neighbors(i) {
                let ns = board.data[n];
                if ns != 0 {
                    board.data[i] = ns;
                    break;
                }
            }
        }
    }

    board.data
}

/// Run multiple random playouts and return per-vertex ownership probability.
/// Values range from -1.0 (certainly White) to +1.0 (certainly Black).
fn get_probability_map(goban: &Goban, iterations: usize) -> Vec<f64> {
    let size = goban.cols() as usize * goban.rows() as usize;
    let mut black_wins = vec![0i32; size];
    let mut rng = Rng::new(0x5E41_DEAD);

    for i in 0..iterations {
        let starting_sign = if i % 2 == 0 { 1 } else { -1 };
        let result = play_till_end(goban, starting_sign, &mut rng);
        for (v, &s) in result.iter().enumerate() {
            black_wins[v] += s.signum() as i32;
        }
    }

    black_wins
        .iter()
        .map(|&bw| bw as f64 / iterations as f64)
        .collect()
}

/// Simplified-board ownership estimate used internally by the Benson phase
/// of dead-stone detection. Values: `1` Black, `-1` White, `0` neutral.
fn estimate_territory(goban: &Goban, dead_stones: &HashSet<Point>) -> Vec<i8> {
    let cols = goban.cols();
    let rows = goban.rows();
    let size = cols as usize * rows as usize;

    let mut virtual_board = goban.board().to_vec();
    for &(col, row) in dead_stones {
        let idx = row as usize * cols as usize + col as usize;
        if idx < size {
            virtual_board[idx] = 0;
        }
    }

    let mut ownership = vec![0i8; size];
    let mut visited = vec![false; size];

    for y in 0..rows {
        for x in 0..cols {
            let idx = y as usize * cols as usize + x as usize;
            if visited[idx] || virtual_board[idx] != 0 {
                continue;
            }

            let mut region = Vec::new();
            let mut border_colors: u8 = 0;
            let mut stack = vec![(x, y)];

            while let Some(p) = stack.pop() {
                let pi = p.1 as usize * cols as usize + p.0 as usize;
                if visited[pi] {
                    continue;
                }
                visited[pi] = true;
                region.push(pi);

                for n in goban.neighbors(p) {
                    let ni = n.1 as usize * cols as usize + n.0 as usize;
                    if visited[ni] {
                        continue;
                    }
                    if virtual_board[ni] != 0 {
                        match virtual_board[ni].signum() {
                            1 => border_colors |= 1,
                            -1 => border_colors |= 2,
                            _ => {}
                        }
                    } else {
                        stack.push(n);
                    }
                }
            }

            let owner = match border_colors {
                1 => 1i8,
                2 => -1i8,
                _ => 0i8,
            };

            for &pi in &region {
                ownership[pi] = owner;
            }
        }
    }

    ownership
}

/// Find all unconditionally alive stones of `stone` color using Benson's algorithm.
///
/// A chain is unconditionally alive if it has at least two "vital" enclosed regions
/// (empty regions bordered entirely by friendly chains, where every empty point is
/// a liberty of the chain).
pub fn find_unconditionally_alive(goban: &Goban, stone: Stone) -> HashSet<Point> {
    let cols = goban.cols();
    let rows = goban.rows();

    let mut chain_visited = vec![false; cols as usize * rows as usize];
    let mut chains: Vec<Vec<Point>> = Vec::new();

    for y in 0..rows {
        for x in 0..cols {
            let idx = y as usize * cols as usize + x as usize;
            if chain_visited[idx] || goban.stone_at((x, y)) != Some(stone) {
                continue;
            }
            let chain = goban.chain_from((x, y), &mut chain_visited);
            chains.push(chain);
        }
    }

    if chains.is_empty() {
        return HashSet::new();
    }

    let size = cols as usize * rows as usize;
    let mut point_to_chain = vec![usize::MAX; size];
    for (ci, chain) in chains.iter().enumerate() {
        for &(cx, cy) in chain {
            point_to_chain[cy as usize * cols as usize + cx as usize] = ci;
        }
    }

    let mut chain_alive = vec![true; chains.len()];

    loop {
        let regions = find_enclosed_regions(goban, stone, &chains, &chain_alive, &point_to_chain);

        let chain_sets: Vec<HashSet<Point>> = chains
            .iter()
            .map(|chain| chain.iter().copied().collect())
            .collect();
        let mut vital_counts = vec![0usize; chains.len()];
        for region in &regions {
            for &ci in &region.bordering_chains {
                if is_vital_for(goban, region, &chain_sets[ci]) {
                    vital_counts[ci] += 1;
                }
            }
        }

        let mut changed = false;
        for ci in 0..chains.len() {
            if chain_alive[ci] && vital_counts[ci] < 2 {
                chain_alive[ci] = false;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    let mut alive_points = HashSet::new();
    for (ci, chain) in chains.iter().enumerate() {
        if chain_alive[ci] {
            for &pt in chain {
                alive_points.insert(pt);
            }
        }
    }

    alive_points
}

/// An enclosed empty region and the chain indices that border it.
struct EnclosedRegion {
    points: Vec<Point>,
    bordering_chains: Vec<usize>,
}

/// Find all empty regions that are enclosed by the currently-alive chains of `stone` color.
/// A region is enclosed if every bordering stone belongs to an alive chain in the set.
fn find_enclosed_regions(
    goban: &Goban,
    stone: Stone,
    chains: &[Vec<Point>],
    chain_alive: &[bool],
    point_to_chain: &[usize],
) -> Vec<EnclosedRegion> {
    let cols = goban.cols();
    let rows = goban.rows();
    let size = cols as usize * rows as usize;
    let mut visited = vec![false; size];
    let mut regions = Vec::new();

    for y in 0..rows {
        for x in 0..cols {
            let idx = y as usize * cols as usize + x as usize;
            if visited[idx] || goban.stone_at((x, y)).is_some() {
                continue;
            }

            let mut region_points = Vec::new();
            let mut bordering_chain_set = HashSet::new();
            let mut is_enclosed = true;
            let mut stack = vec![(x, y)];

            while let Some(p) = stack.pop() {
                let pi = p.1 as usize * cols as usize + p.0 as usize;
                if visited[pi] {
                    continue;
                }
                visited[pi] = true;
                region_points.push(p);

                for n in goban.neighbors(p) {
                    let ni = n.1 as usize * cols as usize + n.0 as usize;
                    if visited[ni] {
                        continue;
                    }
                    if let Some(s) = goban.stone_at(n) {
                        if s == stone {
                            let ci = point_to_chain[ni];
                            if ci < chains.len() && chain_alive[ci] {
                                bordering_chain_set.insert(ci);
                            } else {
                                is_enclosed = false;
                            }
                        } else {
                            is_enclosed = false;
                        }
                    } else {
                        stack.push(n);
                    }
                }
            }

            if is_enclosed && !region_points.is_empty() {
                regions.push(EnclosedRegion {
                    points: region_points,
                    bordering_chains: bordering_chain_set.into_iter().collect(),
                });
            }
        }
    }

    regions
}

/// Check if a region is vital for a given chain.
/// A region is vital for chain C if every empty point in the region is also a liberty of C.
fn is_vital_for(goban: &Goban, region: &EnclosedRegion, chain_set: &HashSet<Point>) -> bool {
    region.points.iter().all(|&rp| {
        goban.neighbors(rp).iter().any(|n| chain_set.contains(n))
    })
}

/// Detect dead stones using Benson's algorithm + Monte Carlo random playouts.
///
/// Phase 1 — Benson simplified-board heuristic: builds a board with only
/// Benson-alive stones and estimates territory on it. Non-alive stones sitting
/// in opponent Benson-territory are marked dead.
///
/// Phase 2 — Monte Carlo: runs random playouts and checks the average ownership
/// probability of each non-alive chain's liberties. If the liberties are firmly
/// controlled by the opponent, the chain is dead. Chains with zero liberties
/// (already captured in practice) are also marked dead.
///
/// Benson-alive stones are never marked dead.
pub fn detect_dead_stones(goban: &Goban) -> HashSet<Point> {
    let mut alive = find_unconditionally_alive(goban, Stone::Black);
    let alive_white = find_unconditionally_alive(goban, Stone::White);
    alive.extend(&alive_white);

    let cols = goban.cols();
    let rows = goban.rows();
    let size = cols as usize * rows as usize;

    // --- Phase 1: Benson simplified-board territory ---
    let mut simplified_board = vec![0i8; size];
    for &(x, y) in &alive {
        let idx = y as usize * cols as usize + x as usize;
        if let Some(s) = goban.stone_at((x, y)) {
            simplified_board[idx] = s.to_int();
        }
    }
    let simplified_goban =
        Goban::from_state(simplified_board, cols, rows, Default::default(), None);
    let ownership = estimate_territory(&simplified_goban, &HashSet::new());

    let mut dead = HashSet::new();
    for y in 0..rows {
        for x in 0..cols {
            if alive.contains(&(x, y)) {
                continue;
            }
            if let Some(stone) = goban.stone_at((x, y)) {
                let idx = y as usize * cols as usize + x as usize;
                if ownership[idx] == stone.opp().to_int() {
                    dead.insert((x, y));
                }
            }
        }
    }

    // --- Phase 2: Monte Carlo for remaining chains ---
    let prob = get_probability_map(goban, 100);
    let mut visited = vec![false; size];

    for y in 0..rows {
        for x in 0..cols {
            let idx = y as usize * cols as usize + x as usize;
            if visited[idx] {
                continue;
            }

            let stone = match goban.stone_at((x, y)) {
                Some(s) => s,
                None => continue,
            };

            let chain = goban.chain((x, y));
            for &(cx, cy) in &chain {
                visited[cy as usize * cols as usize + cx as usize] = true;
            }

            if chain.iter().any(|pt| alive.contains(pt)) {
                continue;
            }
            if chain.iter().any(|pt| dead.contains(pt)) {
                continue;
            }

            let mut lib_seen = vec![false; size];
            let mut lib_prob_sum = 0.0;
            let mut lib_count = 0;
            for &(cx, cy) in &chain {
                for n in goban.neighbors((cx, cy)) {
                    let ni = n.1 as usize * cols as usize + n.0 as usize;
                    if goban.stone_at(n).is_none() && !lib_seen[ni] {
                        lib_seen[ni] = true;
                        lib_prob_sum += prob[ni];
                        lib_count += 1;
                    }
                }
            }

            if lib_count == 0 {
                for &pt in &chain {
                    dead.insert(pt);
                }
                continue;
            }

            let avg_lib_prob = lib_prob_sum / lib_count as f64;
            let stone_sign = stone.to_int() as f64;
            if stone_sign * avg_lib_prob < 0.0 {
                for &pt in &chain {
                    dead.insert(pt);
                }
            }
        }
    }

    dead
}

/// Toggle all stones in the chain at `point` as dead/alive.
///
/// If any stone in the chain is currently dead, removes all from dead_stones (marks alive).
/// Otherwise, adds all to dead_stones (marks dead).
/// No-op if the point has no stone.
pub fn toggle_dead_chain(goban: &Goban, dead_stones: &mut HashSet<Point>, point: Point) {
    if goban.stone_at(point).is_none() {
        return;
    }

    let chain = goban.chain(point);
    let any_dead = chain.iter().any(|pt| dead_stones.contains(pt));

    if any_dead {
        for &pt in &chain {
            dead_stones.remove(&pt);
        }
    } else {
        for &pt in &chain {
            dead_stones.insert(pt);
        }
    }
}
