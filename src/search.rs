//! Iterative-deepening A* over [`Board`]s.
//!
//! Each pass is a depth-first branch-and-bound search below a fixed bound on
//! `g + h`. Nodes over the bound are pruned, and the smallest of their
//! estimates becomes the bound of the next pass. With the plain Manhattan
//! heuristic the first goal found is an optimal solution.

use std::time::Duration;

use log::{debug, info};
use thiserror::Error;

use crate::{Board, Slide};

const MOVE_COST: u32 = 1;

// keeps every weighted estimate far below `u32::MAX`
const MAX_WEIGHT: f64 = 100.0;

#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum SearchError {
    #[error("heuristic weight must be between 1 and 100, got {0}")]
    InvalidWeight(f64),
    #[error("no node exceeded bound {bound}, so there is no next bound to try")]
    Exhausted { bound: u32 },
}

/// Tuning for [`solve_with`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchConfig {
    weight: f64,
}

impl SearchConfig {
    /// `weight` scales the heuristic. Anything above 1 finds solutions
    /// faster but they are no longer guaranteed to be optimal.
    pub fn new(weight: f64) -> Result<SearchConfig, SearchError> {
        if !(1.0..=MAX_WEIGHT).contains(&weight) {
            return Err(SearchError::InvalidWeight(weight));
        }

        Ok(SearchConfig { weight })
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    fn estimate(&self, heuristic: u32) -> u32 {
        (heuristic as f64 * self.weight).ceil() as u32
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig { weight: 1.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Node {
    pub board: Board,
    pub cost: u32,
    /// `cost` plus the (weighted) heuristic of `board`.
    pub estimate: u32,
}

/// Counters accumulated over every pass of one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub generated: u64,
    pub expanded: u64,
}

impl Stats {
    pub fn expanded_per_second(&self, elapsed: Duration) -> f64 {
        let seconds = elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.expanded as f64 / seconds
        } else {
            0.0
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    pub goal: Node,
    /// Number of moves to reach the goal.
    pub cost: u32,
    /// Bound of the pass that found the goal. Equal to `cost` when unweighted.
    pub bound: u32,
    pub thresholds: Vec<u32>,
    pub stats: Stats,
}

// state shared by every frame of one pass
struct Pass<'a> {
    config: &'a SearchConfig,
    bound: u32,
    next_bound: Option<u32>,
    stats: &'a mut Stats,
}

impl Pass<'_> {
    fn search(&mut self, node: &Node, came_from: Option<usize>) -> Option<Node> {
        for target in node.board.moves().into_iter().flatten() {
            let (board, marker) = match node.board.slide(target, came_from) {
                Slide::Moved { board, came_from } => (board, came_from),
                // not counted as generated
                Slide::Reversal(_) => continue,
            };
            self.stats.generated += 1;

            let heuristic = board.manhattan();
            let cost = node.cost + MOVE_COST;
            let child = Node {
                board,
                cost,
                estimate: cost.saturating_add(self.config.estimate(heuristic)),
            };

            if child.estimate > self.bound {
                self.next_bound = Some(match self.next_bound {
                    Some(next) => next.min(child.estimate),
                    None => child.estimate,
                });
            } else if heuristic == 0 {
                return Some(child);
            } else {
                self.stats.expanded += 1;
                if let Some(goal) = self.search(&child, Some(marker)) {
                    return Some(goal);
                }
            }
        }

        None
    }
}

/// Finds an optimal solution for `board` with the Manhattan heuristic.
///
/// `board` must be solvable, otherwise this never returns.
pub fn solve(board: &Board) -> Result<Solution, SearchError> {
    solve_with(board, &SearchConfig::default())
}

pub fn solve_with(board: &Board, config: &SearchConfig) -> Result<Solution, SearchError> {
    let heuristic = board.manhattan();
    let root = Node {
        board: *board,
        cost: 0,
        estimate: config.estimate(heuristic),
    };

    let mut bound = root.estimate;
    let mut thresholds = vec![bound];
    let mut stats = Stats::default();
    debug!("initial estimate {} (weight {})", bound, config.weight);

    if heuristic == 0 {
        return Ok(Solution {
            goal: root,
            cost: 0,
            bound,
            thresholds,
            stats,
        });
    }

    loop {
        let mut pass = Pass {
            config,
            bound,
            next_bound: None,
            stats: &mut stats,
        };
        let found = pass.search(&root, None);
        let next_bound = pass.next_bound;

        info!(
            "threshold {}: generated {}, expanded {}",
            bound, stats.generated, stats.expanded
        );

        if let Some(goal) = found {
            debug!("solved in {} moves at bound {}", goal.cost, bound);
            return Ok(Solution {
                goal,
                cost: goal.cost,
                bound,
                thresholds,
                stats,
            });
        }

        bound = match next_bound {
            Some(next) => next,
            None => return Err(SearchError::Exhausted { bound }),
        };
        thresholds.push(bound);
    }
}

#[cfg(test)]
mod test {
    use itertools::Itertools;
    use pathfinding::directed::idastar::idastar;
    use proptest::prelude::*;

    use super::*;
    use crate::Direction::{self, *};

    const FOUR_MOVES: [u8; 16] = [4, 1, 2, 3, 5, 9, 6, 7, 0, 8, 10, 11, 12, 13, 14, 15];
    const TWENTY_THREE_MOVES: [u8; 16] = [1, 9, 2, 3, 4, 6, 5, 7, 14, 13, 11, 15, 8, 12, 0, 10];
    const THIRTY_MOVES: [u8; 16] = [8, 3, 0, 1, 5, 4, 2, 7, 9, 14, 6, 10, 12, 13, 15, 11];

    fn optimal_cost(board: &Board) -> u32 {
        let (_, cost) = idastar(
            board,
            |b| b.neighbours().into_iter().map(|n| (n, 1)),
            |b| b.manhattan(),
            |b| b.is_goal(),
        )
        .unwrap();
        cost
    }

    fn direction() -> impl Strategy<Value = Direction> {
        prop_oneof![Just(Up), Just(Down), Just(Left), Just(Right)]
    }

    #[test]
    fn goal_is_solved_before_any_pass() {
        let solution = solve(&Board::goal()).unwrap();

        assert_eq!(solution.bound, 0);
        assert_eq!(solution.cost, 0);
        assert_eq!(solution.thresholds, vec![0]);
        assert_eq!(solution.stats, Stats::default());
        assert!(solution.goal.board.is_goal());
    }

    #[test]
    fn one_move_away() {
        for board in [Board::goal().walk([Right]), Board::goal().walk([Down])] {
            let solution = solve(&board).unwrap();
            assert_eq!(solution.bound, 1);
            assert_eq!(solution.cost, 1);
            assert_eq!(solution.thresholds, vec![1]);
            assert_eq!(solution.stats.expanded, 0);
        }
    }

    #[test]
    fn two_move_scramble_resolves_to_manhattan() {
        let board = Board::goal().walk([Right, Down]);
        let solution = solve(&board).unwrap();

        assert_eq!(solution.bound, board.manhattan());
        assert_eq!(solution.bound, 2);
        assert!(solution.stats.generated > 0);
        assert!(solution.goal.board.is_goal());
    }

    #[test]
    fn counts_match_known_runs() {
        let solution = solve(&Board::new(FOUR_MOVES)).unwrap();
        assert_eq!(solution.thresholds, vec![4]);
        assert_eq!(
            solution.stats,
            Stats {
                generated: 7,
                expanded: 3
            }
        );

        let solution = solve(&Board::new(TWENTY_THREE_MOVES)).unwrap();
        assert_eq!(solution.bound, 23);
        assert_eq!(solution.thresholds, vec![15, 17, 19, 21, 23]);
        assert_eq!(
            solution.stats,
            Stats {
                generated: 3600,
                expanded: 1696
            }
        );
    }

    #[test]
    fn thirty_move_board() {
        let board = Board::new(THIRTY_MOVES);
        let solution = solve(&board).unwrap();

        assert_eq!(solution.bound, 30);
        assert_eq!(solution.cost, 30);
        assert_eq!(solution.thresholds.first(), Some(&board.manhattan()));
        assert!(solution
            .thresholds
            .iter()
            .tuple_windows()
            .all(|(a, b)| a < b));
        assert!(solution.stats.expanded <= solution.stats.generated);
    }

    #[test]
    fn weighted_search_expands_less() {
        let board = Board::new(THIRTY_MOVES);
        let optimal = solve(&board).unwrap();
        let weighted = solve_with(&board, &SearchConfig::new(1.5).unwrap()).unwrap();

        assert!(weighted.goal.board.is_goal());
        assert_eq!(weighted.cost, 32);
        assert_eq!(weighted.bound, 36);
        assert!(weighted.cost > optimal.cost);
        assert!(weighted.stats.expanded < optimal.stats.expanded);
    }

    #[test]
    fn heaviest_weight_still_terminates() {
        let board = Board::goal().walk([Right, Down, Left, Up, Right, Right]);
        let config = SearchConfig::new(100.0).unwrap();
        let solution = solve_with(&board, &config).unwrap();

        assert!(solution.goal.board.is_goal());
        assert!(solution.cost >= optimal_cost(&board));
        assert!(solution.bound < u32::MAX);
    }

    #[test]
    fn rejects_bad_weights() {
        assert_eq!(
            SearchConfig::new(0.5),
            Err(SearchError::InvalidWeight(0.5))
        );
        assert!(SearchConfig::new(f64::NAN).is_err());
        assert_eq!(
            SearchConfig::new(1e10),
            Err(SearchError::InvalidWeight(1e10))
        );
        assert!(SearchConfig::new(f64::INFINITY).is_err());
        assert_eq!(SearchConfig::new(1.0), Ok(SearchConfig::default()));
    }

    #[test]
    fn throughput() {
        let stats = Stats {
            generated: 10,
            expanded: 6,
        };
        assert_eq!(stats.expanded_per_second(Duration::from_secs(2)), 3.0);
        assert_eq!(stats.expanded_per_second(Duration::ZERO), 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn bound_is_optimal_cost(walk in prop::collection::vec(direction(), 0..24)) {
            let steps = walk.len() as u32;
            let board = Board::goal().walk(walk);
            let solution = solve(&board).unwrap();

            prop_assert!(solution.bound <= steps);
            prop_assert_eq!(solution.bound, solution.cost);
            prop_assert_eq!(solution.bound, optimal_cost(&board));
            prop_assert!(solution.goal.board.is_goal());
            prop_assert!(solution.stats.expanded <= solution.stats.generated);
            prop_assert_eq!(solution.thresholds.last(), Some(&solution.bound));
            prop_assert!(solution.thresholds.iter().tuple_windows().all(|(a, b)| a < b));
        }
    }
}
