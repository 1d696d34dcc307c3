// ============================================================
// Layer 5 — Branch and Bound Solver
// ============================================================
// Built-in QuadraticSolver for binary programs whose equalities
// are one-hot groups (Σ x = 1, every variable in exactly one
// group). Search proceeds in three phases:
//
//   1. Greedy dive   — each group takes the option with the best
//                      bound, giving a first incumbent
//   2. Polish        — single and pairwise option changes while
//                      they strictly lower the objective
//   3. Branch/bound  — depth-first over groups, pruning any node
//                      whose lower bound reaches the incumbent
//
// Lower bound: every squared term (c + Σ a·x)² is bounded by the
// range its affine part can still reach given the groups not yet
// assigned; if the range contains 0 the term may vanish,
// otherwise it is at least the smaller endpoint squared.
//
// Declared symmetric layers are used to skip mirror images: a
// group may open a new layer only if it is the lowest unused one.
//
// Between options with equal bounds, one that opens a new layer
// comes first, so groups that do not move the objective still
// spread over every layer. Remaining ties follow a seeded option
// rank. The seed also shuffles group order among equal-weight
// groups, so equal seeds reproduce the same search.
//
// Reference: rand crate documentation (StdRng, SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::{
    cmp::Reverse,
    time::{Duration, Instant},
};

use crate::domain::{
    errors::FoldError,
    program::{BinaryProgram, SolveParams, SolveStatus, Solution},
    traits::QuadraticSolver,
};

/// Nodes between two wall-clock checks.
const CLOCK_CHECK_INTERVAL: u64 = 512;

#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBoundSolver;

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        Self
    }
}

impl QuadraticSolver for BranchAndBoundSolver {
    fn name(&self) -> &str {
        "branch-and-bound"
    }

    fn solve(&self, program: &BinaryProgram, params: &SolveParams) -> Result<Solution, FoldError> {
        let space  = SearchSpace::new(program, params.seed)?;
        let mut search = Search::new(&space, params.time_limit);

        // ── Phase 1: greedy dive ─────────────────────────────────────────────
        let mut choice = search
            .greedy()
            .ok_or(FoldError::SolverTimeout { limit: params.time_limit })?;

        // ── Phase 2: local improvement ───────────────────────────────────────
        let mut objective = search.polish(&mut choice);
        tracing::debug!("Incumbent after greedy + polish: {}", objective);
        search.best = Some((objective, choice));

        // ── Phase 3: exhaustive search ───────────────────────────────────────
        if objective > search.root_bound && !search.timed_out {
            search.dfs(0, 0);
        }

        let (best, choice) = search
            .best
            .take()
            .ok_or(FoldError::SolverTimeout { limit: params.time_limit })?;
        objective = best;

        let status = if search.timed_out {
            SolveStatus::TimeLimited
        } else {
            SolveStatus::Optimal
        };

        tracing::debug!(
            "Search finished: objective {}, lower bound {}, {} nodes, {:?}, {:.2}s",
            objective,
            search.root_bound,
            search.nodes,
            status,
            search.started.elapsed().as_secs_f64()
        );

        let values = space.to_values(&choice);
        debug_assert_eq!(program.objective(&values), objective);

        Ok(Solution {
            values,
            objective,
            status,
            nodes: search.nodes,
        })
    }
}

// ─── Search Space ─────────────────────────────────────────────────────────────

/// One one-hot equality: exactly one of `vars` is set.
struct Group {
    vars:    Vec<usize>,
    /// effects[o]: (square, coefficient) pairs when option o is set
    effects: Vec<Vec<(usize, i64)>>,
    /// layer of each option when symmetry is in use
    layers:  Option<Vec<usize>>,
    /// seeded tie-break rank of each option
    rank:    Vec<usize>,
}

struct SearchSpace {
    /// groups in branching order
    groups:    Vec<Group>,
    num_vars:  usize,
    constants: Vec<i64>,
    /// suffix_lo[d][t]: least total the groups d.. can add to square t
    suffix_lo: Vec<Vec<i64>>,
    suffix_hi: Vec<Vec<i64>>,
}

impl SearchSpace {
    fn new(program: &BinaryProgram, seed: u64) -> Result<Self, FoldError> {
        let n         = program.num_vars();
        let n_squares = program.squares().len();
        let mut rng   = StdRng::seed_from_u64(seed);

        // ── One-hot groups from the equalities ───────────────────────────────
        let mut owner: Vec<Option<usize>> = vec![None; n];
        let mut group_vars: Vec<Vec<usize>> = Vec::with_capacity(program.equalities().len());
        for (j, eq) in program.equalities().iter().enumerate() {
            if eq.rhs != 1 || eq.terms.iter().any(|&(_, c)| c != 1) {
                return Err(FoldError::UnsupportedProgram(format!(
                    "equality {j} is not of the form Σ x = 1"
                )));
            }
            if eq.terms.is_empty() {
                return Err(FoldError::InfeasibleModel(format!(
                    "equality {j} requires a sum of 1 over no variables"
                )));
            }
            let mut vars = Vec::with_capacity(eq.terms.len());
            for &(var, _) in &eq.terms {
                if var >= n {
                    return Err(FoldError::UnsupportedProgram(format!(
                        "equality {j} references unknown variable {var}"
                    )));
                }
                if owner[var].replace(group_vars.len()).is_some() {
                    return Err(FoldError::UnsupportedProgram(format!(
                        "variable {var} appears in more than one equality term"
                    )));
                }
                vars.push(var);
            }
            group_vars.push(vars);
        }
        if let Some(var) = owner.iter().position(Option::is_none) {
            return Err(FoldError::UnsupportedProgram(format!(
                "variable {var} is not covered by any equality"
            )));
        }

        // ── Objective effects per variable ───────────────────────────────────
        let mut var_effects: Vec<Vec<(usize, i64)>> = vec![Vec::new(); n];
        for (t, sq) in program.squares().iter().enumerate() {
            for &(var, c) in &sq.terms {
                if var >= n {
                    return Err(FoldError::UnsupportedProgram(format!(
                        "squared term {t} references unknown variable {var}"
                    )));
                }
                match var_effects[var].last_mut() {
                    Some((last_t, acc)) if *last_t == t => *acc += c,
                    _ => var_effects[var].push((t, c)),
                }
            }
        }
        for effects in &mut var_effects {
            effects.retain(|&(_, c)| c != 0);
        }

        let layer_of = symmetric_layer_map(program, &group_vars);

        // ── Groups with their per-square ranges ──────────────────────────────
        let mut weighted: Vec<(i64, Group, Vec<(usize, i64, i64)>)> = group_vars
            .into_iter()
            .map(|vars| {
                let effects: Vec<Vec<(usize, i64)>> =
                    vars.iter().map(|&v| var_effects[v].clone()).collect();
                let ranges = option_ranges(&effects);
                let weight = ranges.iter().map(|&(_, lo, hi)| hi - lo).sum();

                let mut rank: Vec<usize> = (0..vars.len()).collect();
                rank.shuffle(&mut rng);

                let layers = layer_of
                    .as_ref()
                    .map(|map| vars.iter().map(|&v| map[v]).collect());

                (weight, Group { vars, effects, layers, rank }, ranges)
            })
            .collect();

        // seeded order among equal weights, heaviest groups first
        weighted.shuffle(&mut rng);
        weighted.sort_by_key(|(w, _, _)| Reverse(*w));

        // ── Suffix bounds ────────────────────────────────────────────────────
        let depth = weighted.len();
        let mut suffix_lo = vec![vec![0i64; n_squares]; depth + 1];
        let mut suffix_hi = vec![vec![0i64; n_squares]; depth + 1];
        for d in (0..depth).rev() {
            let (lo_next, hi_next) = (suffix_lo[d + 1].clone(), suffix_hi[d + 1].clone());
            suffix_lo[d] = lo_next;
            suffix_hi[d] = hi_next;
            for &(t, lo, hi) in &weighted[d].2 {
                suffix_lo[d][t] += lo;
                suffix_hi[d][t] += hi;
            }
        }

        Ok(Self {
            groups: weighted.into_iter().map(|(_, g, _)| g).collect(),
            num_vars: n,
            constants: program.squares().iter().map(|s| s.constant).collect(),
            suffix_lo,
            suffix_hi,
        })
    }

    fn to_values(&self, choice: &[usize]) -> Vec<bool> {
        let mut values = vec![false; self.num_vars];
        for (group, &o) in self.groups.iter().zip(choice) {
            values[group.vars[o]] = true;
        }
        values
    }
}

/// (square, min, max) contribution of a group, counting 0 for options
/// that leave a square untouched.
fn option_ranges(effects: &[Vec<(usize, i64)>]) -> Vec<(usize, i64, i64)> {
    let mut touched: Vec<usize> = effects.iter().flatten().map(|&(t, _)| t).collect();
    touched.sort_unstable();
    touched.dedup();

    touched
        .into_iter()
        .map(|t| {
            let contrib = effects.iter().map(|opt| {
                opt.iter().find(|&&(tt, _)| tt == t).map_or(0, |&(_, c)| c)
            });
            let lo = contrib.clone().min().unwrap_or(0);
            let hi = contrib.max().unwrap_or(0);
            (t, lo, hi)
        })
        .collect()
}

/// Variable → layer map, or `None` when the declared layers do not
/// give every group exactly one variable per layer.
fn symmetric_layer_map(program: &BinaryProgram, groups: &[Vec<usize>]) -> Option<Vec<usize>> {
    let layers = program.symmetric_layers();
    if layers.len() < 2 {
        return None;
    }

    let mut map: Vec<Option<usize>> = vec![None; program.num_vars()];
    for (l, layer) in layers.iter().enumerate() {
        for &var in layer {
            if var >= map.len() || map[var].replace(l).is_some() {
                tracing::debug!("Ignoring symmetry hint: layers overlap or are out of range");
                return None;
            }
        }
    }

    for vars in groups {
        let mut seen: Vec<usize> = match vars.iter().map(|&v| map[v]).collect::<Option<Vec<_>>>() {
            Some(seen) => seen,
            None => return None,
        };
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != vars.len() || seen.len() != layers.len() {
            tracing::debug!("Ignoring symmetry hint: a group does not span every layer once");
            return None;
        }
    }

    map.into_iter().collect()
}

/// Least square of an integer in [lo, hi].
fn range_square(lo: i64, hi: i64) -> i64 {
    if lo > 0 {
        lo * lo
    } else if hi < 0 {
        hi * hi
    } else {
        0
    }
}

// ─── Search ───────────────────────────────────────────────────────────────────

struct Search<'a> {
    space:      &'a SearchSpace,
    partial:    Vec<i64>,
    choice:     Vec<usize>,
    best:       Option<(i64, Vec<usize>)>,
    root_bound: i64,
    nodes:      u64,
    started:    Instant,
    limit:      Duration,
    timed_out:  bool,
}

impl<'a> Search<'a> {
    fn new(space: &'a SearchSpace, limit: Duration) -> Self {
        let partial = space.constants.clone();
        let mut search = Self {
            space,
            partial,
            choice: vec![0; space.groups.len()],
            best: None,
            root_bound: 0,
            nodes: 0,
            started: Instant::now(),
            limit,
            timed_out: false,
        };
        search.root_bound = search.bound_at(0);
        search
    }

    fn best_objective(&self) -> i64 {
        self.best.as_ref().map_or(i64::MAX, |(obj, _)| *obj)
    }

    fn check_clock(&mut self) -> bool {
        if self.started.elapsed() >= self.limit {
            self.timed_out = true;
        }
        self.timed_out
    }

    /// Lower bound for the current partial sums with groups d.. open.
    fn bound_at(&self, d: usize) -> i64 {
        let (lo, hi) = (&self.space.suffix_lo[d], &self.space.suffix_hi[d]);
        self.partial
            .iter()
            .enumerate()
            .map(|(t, &p)| range_square(p + lo[t], p + hi[t]))
            .sum()
    }

    /// Options group d may take as (bound, reuses a layer, rank, option),
    /// best first.
    fn children(&self, d: usize, opened: usize) -> Vec<(i64, bool, usize, usize)> {
        let group = &self.space.groups[d];
        let base  = self.bound_at(d + 1);
        let (lo, hi) = (&self.space.suffix_lo[d + 1], &self.space.suffix_hi[d + 1]);

        let mut out: Vec<(i64, bool, usize, usize)> = (0..group.vars.len())
            .filter(|&o| group.layers.as_ref().map_or(true, |l| l[o] <= opened))
            .map(|o| {
                let lb = group.effects[o].iter().fold(base, |acc, &(t, c)| {
                    let p = self.partial[t];
                    acc - range_square(p + lo[t], p + hi[t]) + range_square(p + c + lo[t], p + c + hi[t])
                });
                let reuses = group.layers.as_ref().map_or(false, |l| l[o] < opened);
                (lb, reuses, group.rank[o], o)
            })
            .collect();
        out.sort_unstable();
        out
    }

    fn apply(&mut self, d: usize, o: usize, sign: i64) {
        for &(t, c) in &self.space.groups[d].effects[o] {
            self.partial[t] += sign * c;
        }
    }

    fn opened_after(&self, d: usize, o: usize, opened: usize) -> usize {
        match &self.space.groups[d].layers {
            Some(l) if l[o] == opened => opened + 1,
            _ => opened,
        }
    }

    /// Take the best-bound option at every depth. `None` on timeout.
    fn greedy(&mut self) -> Option<Vec<usize>> {
        let mut opened = 0;
        for d in 0..self.space.groups.len() {
            if self.check_clock() {
                return None;
            }
            let (_, _, _, o) = *self.children(d, opened).first()?;
            self.apply(d, o, 1);
            self.choice[d] = o;
            opened = self.opened_after(d, o, opened);
            self.nodes += 1;
        }

        let choice = self.choice.clone();
        for (d, &o) in choice.iter().enumerate() {
            self.apply(d, o, -1);
        }
        Some(choice)
    }

    /// First-improvement local search over single and paired option
    /// changes. Returns the objective of the improved `choice`.
    fn polish(&mut self, choice: &mut [usize]) -> i64 {
        let space: &'a SearchSpace = self.space;
        let groups = &space.groups;
        let mut value = space.constants.clone();
        for (g, &o) in choice.iter().enumerate() {
            for &(t, c) in &groups[g].effects[o] {
                value[t] += c;
            }
        }
        let mut objective: i64 = value.iter().map(|v| v * v).sum();
        let mut scratch = Scratch::new(value.len());

        'passes: loop {
            let mut improved = false;

            for g in 0..groups.len() {
                for o in 0..groups[g].vars.len() {
                    if o == choice[g] {
                        continue;
                    }
                    let delta = scratch.delta(&value, &[(&groups[g].effects[choice[g]], &groups[g].effects[o])]);
                    if delta < 0 {
                        scratch.commit(&mut value);
                        choice[g] = o;
                        objective += delta;
                        improved = true;
                    }
                }
            }

            for g1 in 0..groups.len() {
                if self.check_clock() {
                    break 'passes;
                }
                for g2 in g1 + 1..groups.len() {
                    for o1 in 0..groups[g1].vars.len() {
                        for o2 in 0..groups[g2].vars.len() {
                            if o1 == choice[g1] || o2 == choice[g2] {
                                continue;
                            }
                            let delta = scratch.delta(
                                &value,
                                &[
                                    (&groups[g1].effects[choice[g1]], &groups[g1].effects[o1]),
                                    (&groups[g2].effects[choice[g2]], &groups[g2].effects[o2]),
                                ],
                            );
                            if delta < 0 {
                                scratch.commit(&mut value);
                                choice[g1] = o1;
                                choice[g2] = o2;
                                objective += delta;
                                improved = true;
                            }
                        }
                    }
                }
            }

            if !improved || objective == self.root_bound {
                break;
            }
        }

        objective
    }

    fn dfs(&mut self, d: usize, opened: usize) {
        self.nodes += 1;
        if self.nodes % CLOCK_CHECK_INTERVAL == 0 {
            self.check_clock();
        }
        if self.timed_out {
            return;
        }

        if d == self.space.groups.len() {
            let objective = self.bound_at(d);
            if objective < self.best_objective() {
                tracing::trace!("New incumbent {} at node {}", objective, self.nodes);
                self.best = Some((objective, self.choice.clone()));
            }
            return;
        }

        for (lb, _, _, o) in self.children(d, opened) {
            if lb >= self.best_objective() {
                break;
            }
            self.apply(d, o, 1);
            self.choice[d] = o;
            let next = self.opened_after(d, o, opened);
            self.dfs(d + 1, next);
            self.apply(d, o, -1);

            if self.timed_out || self.best_objective() == self.root_bound {
                return;
            }
        }
    }
}

/// Dense scratch for evaluating a batch of option changes.
struct Scratch {
    diff:    Vec<i64>,
    touched: Vec<usize>,
}

impl Scratch {
    fn new(n: usize) -> Self {
        Self { diff: vec![0; n], touched: Vec::new() }
    }

    /// Objective change of replacing each `from` effect list with its
    /// `to` list. The pending diff stays loaded until the next call.
    fn delta(&mut self, value: &[i64], changes: &[(&Vec<(usize, i64)>, &Vec<(usize, i64)>)]) -> i64 {
        for &t in &self.touched {
            self.diff[t] = 0;
        }
        self.touched.clear();

        for (from, to) in changes {
            for &(t, c) in from.iter() {
                self.touch(t, -c);
            }
            for &(t, c) in to.iter() {
                self.touch(t, c);
            }
        }

        self.touched
            .iter()
            .map(|&t| {
                let v = value[t];
                let w = v + self.diff[t];
                w * w - v * v
            })
            .sum()
    }

    fn touch(&mut self, t: usize, c: i64) {
        if self.diff[t] == 0 && !self.touched.contains(&t) {
            self.touched.push(t);
        }
        self.diff[t] += c;
    }

    fn commit(&mut self, value: &mut [i64]) {
        for &t in &self.touched {
            value[t] += self.diff[t];
            self.diff[t] = 0;
        }
        self.touched.clear();
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn params(seed: u64) -> SolveParams {
        SolveParams { time_limit: Duration::from_secs(10), seed }
    }

    /// n_sites one-hot groups over n_folds layers, balancing `counts`.
    fn partition_program(counts: &[Vec<i64>], n_folds: usize) -> BinaryProgram {
        let n_sites = counts[0].len();
        let var = |f: usize, s: usize| f * n_sites + s;
        let mut p = BinaryProgram::new(n_folds * n_sites);
        for s in 0..n_sites {
            p.add_equality((0..n_folds).map(|f| (var(f, s), 1)).collect(), 1);
        }
        for row in counts {
            let total: i64 = row.iter().sum();
            for f in 0..n_folds {
                p.add_square(
                    row.iter().enumerate().map(|(s, &c)| (var(f, s), n_folds as i64 * c)).collect(),
                    -total,
                );
            }
        }
        p.declare_symmetric_layers(
            (0..n_folds).map(|f| (0..n_sites).map(|s| var(f, s)).collect()).collect(),
        );
        p
    }

    /// Exhaustive minimum for small partition programs.
    fn brute_force(p: &BinaryProgram, n_sites: usize, n_folds: usize) -> i64 {
        let mut best = i64::MAX;
        let total = n_folds.pow(n_sites as u32);
        for code in 0..total {
            let mut x = vec![false; p.num_vars()];
            let mut c = code;
            for s in 0..n_sites {
                x[(c % n_folds) * n_sites + s] = true;
                c /= n_folds;
            }
            best = best.min(p.objective(&x));
        }
        best
    }

    #[test]
    fn test_balanced_example_reaches_zero() {
        let p   = partition_program(&[vec![10, 10, 0, 0], vec![0, 0, 10, 10]], 2);
        let sol = BranchAndBoundSolver::new().solve(&p, &params(0)).unwrap();

        assert_eq!(sol.objective, 0);
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!(p.is_feasible(&sol.values));
        assert_eq!(p.objective(&sol.values), 0);
    }

    #[test]
    fn test_matches_brute_force_on_uneven_counts() {
        let counts = vec![
            vec![7, 3, 0, 5, 2, 9, 1],
            vec![1, 4, 6, 0, 3, 2, 8],
            vec![2, 0, 1, 1, 5, 0, 3],
        ];
        for n_folds in [2, 3] {
            let p   = partition_program(&counts, n_folds);
            let sol = BranchAndBoundSolver::new().solve(&p, &params(7)).unwrap();
            assert_eq!(sol.status, SolveStatus::Optimal);
            assert!(p.is_feasible(&sol.values));
            assert_eq!(sol.objective, p.objective(&sol.values));
            assert_eq!(sol.objective, brute_force(&p, 7, n_folds), "n_folds = {n_folds}");
        }
    }

    #[test]
    fn test_same_seed_same_solution() {
        let counts = vec![vec![5, 5, 5, 5, 5, 5], vec![1, 1, 1, 1, 1, 1]];
        let p = partition_program(&counts, 3);
        let a = BranchAndBoundSolver::new().solve(&p, &params(42)).unwrap();
        let b = BranchAndBoundSolver::new().solve(&p, &params(42)).unwrap();
        assert_eq!(a.values, b.values);
        assert_eq!(a.objective, 0);
    }

    #[test]
    fn test_different_seeds_stay_optimal() {
        let counts = vec![vec![4, 4, 4, 4, 2, 2], vec![0, 2, 2, 0, 1, 1]];
        let p = partition_program(&counts, 2);
        let expected = brute_force(&p, 6, 2);
        for seed in 0..8 {
            let sol = BranchAndBoundSolver::new().solve(&p, &params(seed)).unwrap();
            assert_eq!(sol.objective, expected, "seed {seed}");
        }
    }

    #[test]
    fn test_neutral_sites_fill_every_fold() {
        // only the first site carries counts; the others are free to go anywhere
        let p = partition_program(&[vec![9, 0, 0, 0]], 3);
        for seed in 0..6 {
            let sol = BranchAndBoundSolver::new().solve(&p, &params(seed)).unwrap();
            for f in 0..3 {
                assert!((0..4).any(|s| sol.values[f * 4 + s]), "seed {seed}: fold {f} empty");
            }
        }
    }

    #[test]
    fn test_zero_time_limit_times_out() {
        let p = partition_program(&[vec![1, 2, 3]], 2);
        let err = BranchAndBoundSolver::new()
            .solve(&p, &SolveParams { time_limit: Duration::ZERO, seed: 0 })
            .unwrap_err();
        assert!(matches!(err, FoldError::SolverTimeout { .. }));
    }

    #[test]
    fn test_rejects_general_equalities() {
        let mut p = BinaryProgram::new(2);
        p.add_equality(vec![(0, 2), (1, 1)], 2);
        let err = BranchAndBoundSolver::new().solve(&p, &params(0)).unwrap_err();
        assert!(matches!(err, FoldError::UnsupportedProgram(_)));
    }

    #[test]
    fn test_rejects_uncovered_variable() {
        let mut p = BinaryProgram::new(3);
        p.add_equality(vec![(0, 1), (1, 1)], 1);
        let err = BranchAndBoundSolver::new().solve(&p, &params(0)).unwrap_err();
        assert!(matches!(err, FoldError::UnsupportedProgram(_)));
    }

    #[test]
    fn test_empty_equality_is_infeasible() {
        let mut p = BinaryProgram::new(0);
        p.add_equality(Vec::new(), 1);
        let err = BranchAndBoundSolver::new().solve(&p, &params(0)).unwrap_err();
        assert!(matches!(err, FoldError::InfeasibleModel(_)));
    }

    #[test]
    fn test_works_without_symmetry_hint() {
        // two groups of two options: minimise (x0 + x2 - 1)² + (x1 + x3 - 1)²
        let mut p = BinaryProgram::new(4);
        p.add_equality(vec![(0, 1), (1, 1)], 1);
        p.add_equality(vec![(2, 1), (3, 1)], 1);
        p.add_square(vec![(0, 1), (2, 1)], -1);
        p.add_square(vec![(1, 1), (3, 1)], -1);

        let sol = BranchAndBoundSolver::new().solve(&p, &params(3)).unwrap();
        assert_eq!(sol.objective, 0);
        assert!(sol.values[0] != sol.values[2]);
    }

    #[test]
    fn test_range_square() {
        assert_eq!(range_square(-3, 4), 0);
        assert_eq!(range_square(2, 5), 4);
        assert_eq!(range_square(-6, -1), 1);
    }
}
