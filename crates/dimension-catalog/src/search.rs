//! Depth-first search with first-success backtracking.
//!
//! The traversal knows nothing about catalogs or variables. A
//! [`SearchProblem`] supplies the frontier successors, the candidates per
//! frontier node, and when a partial state is good enough.

/// A search over a frontier of nodes, extending a state one candidate at a
/// time.
pub trait SearchProblem {
    type Node: Copy;
    type Candidate;
    type State: Clone;

    /// Candidates for extending `state` at `node`, in the order to try them.
    fn candidates(&self, node: Self::Node, state: &Self::State) -> Vec<Self::Candidate>;

    /// Frontier to explore after a candidate of `node` was taken.
    fn successors(&self, node: Self::Node) -> Vec<Self::Node>;

    fn extend(&self, state: &Self::State, candidate: &Self::Candidate) -> Self::State;

    /// Whether `state`, just extended by `last`, is a result.
    fn is_accepted(&self, state: &Self::State, last: &Self::Candidate) -> bool;

    /// Whether a non-empty state is usable after every extension failed.
    fn is_usable_fallback(&self, _state: &Self::State) -> bool {
        false
    }
}

/// Run the search from `frontier`, returning the first accepted state.
///
/// Frontier nodes and their candidates are tried in order; the first
/// extension that leads to a result ends the search without trying its
/// siblings.
pub fn first_success<P: SearchProblem>(
    problem: &P,
    frontier: &[P::Node],
    initial: P::State,
) -> Option<P::State> {
    explore(problem, frontier, &initial, None)
}

fn explore<P: SearchProblem>(
    problem: &P,
    frontier: &[P::Node],
    state: &P::State,
    last: Option<&P::Candidate>,
) -> Option<P::State> {
    if let Some(last) = last {
        if problem.is_accepted(state, last) {
            return Some(state.clone());
        }
    }
    for &node in frontier {
        let successors = problem.successors(node);
        for candidate in problem.candidates(node, state) {
            let next = problem.extend(state, &candidate);
            if let Some(found) = explore(problem, &successors, &next, Some(&candidate)) {
                return Some(found);
            }
        }
    }
    if last.is_some() && problem.is_usable_fallback(state) {
        return Some(state.clone());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Digits chosen level by level; accepted once the sum hits the target.
    struct DigitSum {
        target: u32,
        depth: usize,
        fallback_len: Option<usize>,
        visited: Cell<usize>,
    }

    impl SearchProblem for DigitSum {
        type Node = usize;
        type Candidate = u32;
        type State = Vec<u32>;

        fn candidates(&self, _node: usize, _state: &Vec<u32>) -> Vec<u32> {
            vec![1, 2, 3]
        }

        fn successors(&self, node: usize) -> Vec<usize> {
            if node + 1 < self.depth {
                vec![node + 1]
            } else {
                Vec::new()
            }
        }

        fn extend(&self, state: &Vec<u32>, candidate: &u32) -> Vec<u32> {
            self.visited.set(self.visited.get() + 1);
            let mut next = state.clone();
            next.push(*candidate);
            next
        }

        fn is_accepted(&self, state: &Vec<u32>, _last: &u32) -> bool {
            state.iter().sum::<u32>() == self.target
        }

        fn is_usable_fallback(&self, state: &Vec<u32>) -> bool {
            self.fallback_len == Some(state.len())
        }
    }

    fn problem(target: u32, depth: usize) -> DigitSum {
        DigitSum {
            target,
            depth,
            fallback_len: None,
            visited: Cell::new(0),
        }
    }

    #[test]
    fn test_first_success_in_candidate_order() {
        let p = problem(5, 3);
        // 1+1+3 is reached before 1+2+2 or 2+3
        assert_eq!(first_success(&p, &[0], Vec::new()), Some(vec![1, 1, 3]));
    }

    #[test]
    fn test_accepts_before_exhausting_depth() {
        let p = problem(2, 3);
        assert_eq!(first_success(&p, &[0], Vec::new()), Some(vec![1, 1]));
    }

    #[test]
    fn test_exhausted_search_returns_none() {
        let p = problem(20, 3);
        assert_eq!(first_success(&p, &[0], Vec::new()), None);
        // 3 + 9 + 27 extensions
        assert_eq!(p.visited.get(), 39);
    }

    #[test]
    fn test_fallback_applies_to_deepest_dead_end() {
        let mut p = problem(20, 3);
        p.fallback_len = Some(2);
        assert_eq!(first_success(&p, &[0], Vec::new()), Some(vec![1, 1]));
    }

    #[test]
    fn test_empty_frontier() {
        let p = problem(0, 3);
        assert_eq!(first_success(&p, &[], Vec::new()), None);
    }
}
