// ============================================================
// Layer 3 — Binary Quadratic Program
// ============================================================
// Solver-neutral description of an optimization problem:
//
//   minimise   Σ_k ( c_k + Σ_i a_ki · x_i )²
//   subject to Σ_i b_ji · x_i = r_j      for every equality j
//              x_i ∈ {0, 1}
//
// A sum of squared affine expressions is a convex quadratic,
// and keeping it in this factored form lets a solver bound each
// square independently. All coefficients are integers.
//
// Reference: Rust Book §5 (Structs), §8 (Vectors)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Σ coeff · x_var + constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffineExpr {
    pub terms:    Vec<(usize, i64)>,
    pub constant: i64,
}

impl AffineExpr {
    pub fn eval(&self, x: &[bool]) -> i64 {
        self.constant
            + self
                .terms
                .iter()
                .filter(|(var, _)| x[*var])
                .map(|(_, coeff)| coeff)
                .sum::<i64>()
    }
}

/// Σ coeff · x_var = rhs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearEquality {
    pub terms: Vec<(usize, i64)>,
    pub rhs:   i64,
}

impl LinearEquality {
    pub fn is_satisfied(&self, x: &[bool]) -> bool {
        self.terms
            .iter()
            .filter(|(var, _)| x[*var])
            .map(|(_, coeff)| coeff)
            .sum::<i64>()
            == self.rhs
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinaryProgram {
    num_vars:    usize,
    equalities:  Vec<LinearEquality>,
    squares:     Vec<AffineExpr>,
    /// Equal-length variable layers whose permutation maps solutions
    /// onto solutions of equal objective. Solvers may ignore this.
    symmetric_layers: Vec<Vec<usize>>,
}

impl BinaryProgram {
    pub fn new(num_vars: usize) -> Self {
        Self { num_vars, ..Self::default() }
    }

    pub fn add_equality(&mut self, terms: Vec<(usize, i64)>, rhs: i64) {
        self.equalities.push(LinearEquality { terms, rhs });
    }

    pub fn add_square(&mut self, terms: Vec<(usize, i64)>, constant: i64) {
        self.squares.push(AffineExpr { terms, constant });
    }

    pub fn declare_symmetric_layers(&mut self, layers: Vec<Vec<usize>>) {
        self.symmetric_layers = layers;
    }

    pub fn num_vars(&self) -> usize { self.num_vars }

    pub fn equalities(&self) -> &[LinearEquality] { &self.equalities }

    pub fn squares(&self) -> &[AffineExpr] { &self.squares }

    pub fn symmetric_layers(&self) -> &[Vec<usize>] { &self.symmetric_layers }

    /// Objective value of a full assignment.
    pub fn objective(&self, x: &[bool]) -> i64 {
        self.squares.iter().map(|s| s.eval(x).pow(2)).sum()
    }

    pub fn is_feasible(&self, x: &[bool]) -> bool {
        x.len() == self.num_vars && self.equalities.iter().all(|e| e.is_satisfied(x))
    }
}

/// Parameters every solver call receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveParams {
    /// Wall-clock budget for the search
    pub time_limit: Duration,
    /// Seed for tie-breaking among equally good choices
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Search completed; no better solution exists
    Optimal,
    /// Time limit reached; best solution found so far
    TimeLimited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub values:    Vec<bool>,
    pub objective: i64,
    pub status:    SolveStatus,
    /// Search nodes explored, for diagnostics
    pub nodes:     u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_sums_squares() {
        // (2·x0 − 1)² + (x1 + x0 − 2)²
        let mut p = BinaryProgram::new(2);
        p.add_square(vec![(0, 2)], -1);
        p.add_square(vec![(1, 1), (0, 1)], -2);

        assert_eq!(p.objective(&[false, false]), 1 + 4);
        assert_eq!(p.objective(&[true, false]), 1 + 1);
        assert_eq!(p.objective(&[true, true]), 1);
    }

    #[test]
    fn test_feasibility_checks_every_equality() {
        let mut p = BinaryProgram::new(3);
        p.add_equality(vec![(0, 1), (1, 1)], 1);
        p.add_equality(vec![(2, 1)], 1);

        assert!(p.is_feasible(&[true, false, true]));
        assert!(!p.is_feasible(&[true, true, true]));
        assert!(!p.is_feasible(&[false, true, false]));
        assert!(!p.is_feasible(&[true, false]));
    }
}
