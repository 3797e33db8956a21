//! A solver-agnostic description of a mixed-integer linear program, and its solution with HiGHS.
//!
//! The formulation is assembled into a [`Program`] first so that objective coefficients can be
//! accumulated from several components and so that constraint rows can be tracked by key. It is
//! only translated into a HiGHS problem when it is solved.
use highs::{HighsModelStatus, HighsStatus, RowProblem as Problem, Sense};
use log::debug;
use std::error::Error;
use std::fmt;
use std::ops::{Bound, RangeBounds};

pub mod expression;
pub use expression::LinearExpr;

/// A decision variable (a column of the program)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(usize);

impl Variable {
    /// The column index of the variable
    pub fn index(self) -> usize {
        self.0
    }
}

/// The domain of a decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// A real-valued variable
    Continuous,
    /// A variable taking the value 0 or 1
    Binary,
    /// An integer-valued variable
    Integer,
}

/// A column of the program
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Objective coefficient
    pub cost: f64,
    /// Domain of the variable
    pub kind: VariableKind,
}

/// A constraint row of the program: `lower ≤ Σ coeff × var ≤ upper`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Non-zero coefficients of the row
    pub terms: Vec<(Variable, f64)>,
}

/// Convert a range into a pair of inclusive bounds, with infinities where unbounded
fn to_bounds<B: RangeBounds<f64>>(bounds: &B) -> (f64, f64) {
    let lower = match bounds.start_bound() {
        Bound::Included(value) | Bound::Excluded(value) => *value,
        Bound::Unbounded => f64::NEG_INFINITY,
    };
    let upper = match bounds.end_bound() {
        Bound::Included(value) | Bound::Excluded(value) => *value,
        Bound::Unbounded => f64::INFINITY,
    };

    (lower, upper)
}

/// A mixed-integer linear program to be minimised
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    columns: Vec<Column>,
    rows: Vec<Row>,
    objective_offset: f64,
}

impl Program {
    /// Create an empty program
    pub fn new() -> Self {
        Self::default()
    }

    fn add_column<B: RangeBounds<f64>>(&mut self, bounds: B, kind: VariableKind) -> Variable {
        let (lower, upper) = to_bounds(&bounds);
        self.columns.push(Column {
            lower,
            upper,
            cost: 0.0,
            kind,
        });
        Variable(self.columns.len() - 1)
    }

    /// Add a continuous variable with the given bounds
    pub fn add_continuous<B: RangeBounds<f64>>(&mut self, bounds: B) -> Variable {
        self.add_column(bounds, VariableKind::Continuous)
    }

    /// Add a binary variable
    pub fn add_binary(&mut self) -> Variable {
        self.add_column(0.0..=1.0, VariableKind::Binary)
    }

    /// Add an integer variable with the given bounds
    pub fn add_integer<B: RangeBounds<f64>>(&mut self, bounds: B) -> Variable {
        self.add_column(bounds, VariableKind::Integer)
    }

    /// Add the constraint `expr ∈ bounds`, returning the index of the new row.
    ///
    /// The constant part of the expression is moved into the bounds.
    pub fn add_constraint<B: RangeBounds<f64>>(&mut self, expr: LinearExpr, bounds: B) -> usize {
        let (lower, upper) = to_bounds(&bounds);
        let constant = expr.constant_value();
        self.rows.push(Row {
            lower: lower - constant,
            upper: upper - constant,
            terms: expr.terms().collect(),
        });
        self.rows.len() - 1
    }

    /// Add the constraint `lhs == rhs`
    pub fn add_equality(&mut self, lhs: LinearExpr, rhs: LinearExpr) -> usize {
        self.add_constraint(lhs - rhs, 0.0..=0.0)
    }

    /// Add the constraint `lhs ≤ rhs`
    pub fn add_less_equal(&mut self, lhs: LinearExpr, rhs: LinearExpr) -> usize {
        self.add_constraint(lhs - rhs, ..=0.0)
    }

    /// Add the constraint `lhs ≥ rhs`
    pub fn add_greater_equal(&mut self, lhs: LinearExpr, rhs: LinearExpr) -> usize {
        self.add_constraint(lhs - rhs, 0.0..)
    }

    /// Add `factor × expr` to the objective
    pub fn add_to_objective(&mut self, expr: &LinearExpr, factor: f64) {
        for (var, coeff) in expr.terms() {
            self.columns[var.index()].cost += coeff * factor;
        }
        self.objective_offset += expr.constant_value() * factor;
    }

    /// The columns of the program
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The rows of the program
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The number of constraint rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// The number of variables
    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// Whether any variable is binary or integer
    pub fn is_mip(&self) -> bool {
        self.columns
            .iter()
            .any(|col| col.kind != VariableKind::Continuous)
    }
}

/// Keys for a contiguous block of constraint rows, so that their duals can be retrieved
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintKeys<K> {
    offset: usize,
    keys: Vec<K>,
}

impl<K> ConstraintKeys<K> {
    /// Start a new block of rows at the end of the program
    pub fn new(program: &Program) -> Self {
        Self {
            offset: program.num_rows(),
            keys: Vec::new(),
        }
    }

    /// Add a constraint to the program and record its key.
    ///
    /// No other rows may be added to the program between rows of the same block.
    pub fn add<B: RangeBounds<f64>>(
        &mut self,
        program: &mut Program,
        key: K,
        expr: LinearExpr,
        bounds: B,
    ) {
        let row = program.add_constraint(expr, bounds);
        assert_eq!(
            row,
            self.offset + self.keys.len(),
            "Constraint rows of a block must be contiguous"
        );
        self.keys.push(key);
    }

    /// Iterate over the keys
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.keys.iter()
    }

    /// Number of rows in the block
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the block has no rows
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Zip the keys with the corresponding dual values in the solution, accounting for the offset
    pub fn zip_duals<'a>(&'a self, duals: &'a [f64]) -> impl Iterator<Item = (&'a K, f64)> {
        assert!(
            self.offset + self.keys.len() <= duals.len(),
            "Bad constraint keys: dual rows out of range"
        );

        self.keys
            .iter()
            .zip(duals[self.offset..].iter().copied())
    }
}

/// The solution of a [`Program`]
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    columns: Vec<f64>,
    duals: Vec<f64>,
    /// The objective value, including any constant terms
    pub objective_value: f64,
}

impl Solution {
    /// The value of a variable
    pub fn value(&self, var: Variable) -> f64 {
        self.columns[var.index()]
    }

    /// The value of an expression
    pub fn evaluate(&self, expr: &LinearExpr) -> f64 {
        expr.evaluate(&self.columns)
    }

    /// The dual values of the constraint rows.
    ///
    /// These are not meaningful for mixed-integer programs.
    pub fn dual_rows(&self) -> &[f64] {
        &self.duals
    }
}

/// Defines the possible errors that can occur when running the solver
#[derive(Debug, Clone)]
pub enum ModelError {
    /// The model definition is incoherent.
    ///
    /// Users should not be able to trigger this error.
    Incoherent(HighsStatus),
    /// An optimal solution could not be found
    NonOptimal(HighsModelStatus),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Incoherent(status) => write!(f, "Incoherent model: {status:?}"),
            ModelError::NonOptimal(status) => {
                write!(f, "Could not find optimal result: {status:?}")
            }
        }
    }
}

impl Error for ModelError {}

/// Try to solve the model, returning an error if the model is incoherent or result is non-optimal
fn solve_optimal(model: highs::Model) -> Result<highs::SolvedModel, ModelError> {
    let solved = model.try_solve().map_err(ModelError::Incoherent)?;

    match solved.status() {
        HighsModelStatus::Optimal => Ok(solved),
        status => Err(ModelError::NonOptimal(status)),
    }
}

/// Solve the program with HiGHS.
///
/// # Arguments
///
/// * `program` - The program to minimise
/// * `mip_rel_gap` - Relative optimality gap for mixed-integer programs, if not the solver default
pub fn solve(program: &Program, mip_rel_gap: Option<f64>) -> Result<Solution, ModelError> {
    let mut problem = Problem::default();
    let cols: Vec<highs::Col> = program
        .columns
        .iter()
        .map(|col| match col.kind {
            VariableKind::Continuous => problem.add_column(col.cost, col.lower..=col.upper),
            VariableKind::Binary | VariableKind::Integer => {
                problem.add_integer_column(col.cost, col.lower..=col.upper)
            }
        })
        .collect();
    for row in &program.rows {
        problem.add_row(
            row.lower..=row.upper,
            row.terms.iter().map(|(var, coeff)| (cols[var.index()], *coeff)),
        );
    }

    debug!(
        "Solving program with {} variables and {} constraints",
        program.num_cols(),
        program.num_rows()
    );
    let mut model = problem.optimise(Sense::Minimise);

    // HiGHS writes directly to stdout rather than through the logger
    model.set_option("output_flag", log::log_enabled!(log::Level::Debug));
    if let Some(gap) = mip_rel_gap {
        model.set_option("mip_rel_gap", gap);
    }

    let solved = solve_optimal(model)?;
    let solution = solved.get_solution();
    let columns = solution.columns().to_vec();
    let mut duals = solution.dual_rows().to_vec();
    duals.resize(program.num_rows(), 0.0);
    let objective_value = program
        .columns
        .iter()
        .zip(&columns)
        .map(|(col, value)| col.cost * value)
        .sum::<f64>()
        + program.objective_offset;

    Ok(Solution {
        columns,
        duals,
        objective_value,
    })
}
