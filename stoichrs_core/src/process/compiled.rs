//! This module provides [`CompiledProcesses`], an immutable, matrix backed snapshot of a set
//! of processes
//!
//! Compilation is memoized: compiling the same processes (compared by value) in the same order
//! returns the same [`Arc`] until [`clear_compilation_cache`] is called.
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::components::{CompiledComponents, ComponentError};
use crate::expression::{EvaluationError, Expr, Symbol};
use crate::process::collection::Processes;
use crate::process::definition::Process;
use crate::process::stoichiometry::Stoichiometry;
use crate::process::CollectionError;

type CompilationCache = HashMap<Vec<Arc<Process>>, Arc<CompiledProcesses>>;

static COMPILATION_CACHE: LazyLock<Mutex<CompilationCache>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn lock_cache() -> MutexGuard<'static, CompilationCache> {
    COMPILATION_CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Drop every memoized compilation
///
/// Compiled collections already handed out stay valid, later compilations build new ones.
pub fn clear_compilation_cache() {
    lock_cache().clear();
    debug!("Cleared compilation cache");
}

// region StoichiometryMatrix
/// Stoichiometry matrix, rows are processes and columns are components
#[derive(Clone, Debug, PartialEq)]
pub enum StoichiometryMatrix {
    Numeric(DMatrix<f64>),
    /// At least one coefficient depends on parameters
    Symbolic(DMatrix<Expr>),
}

impl StoichiometryMatrix {
    pub fn nrows(&self) -> usize {
        match self {
            StoichiometryMatrix::Numeric(m) => m.nrows(),
            StoichiometryMatrix::Symbolic(m) => m.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            StoichiometryMatrix::Numeric(m) => m.ncols(),
            StoichiometryMatrix::Symbolic(m) => m.ncols(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, StoichiometryMatrix::Numeric(_))
    }

    /// The numeric matrix, `None` if any coefficient is symbolic
    pub fn as_numeric(&self) -> Option<&DMatrix<f64>> {
        match self {
            StoichiometryMatrix::Numeric(m) => Some(m),
            StoichiometryMatrix::Symbolic(_) => None,
        }
    }

    /// Coefficient of process `row` for component `col`
    ///
    /// # Panics
    /// If either index is out of bounds
    pub fn get(&self, row: usize, col: usize) -> Expr {
        match self {
            StoichiometryMatrix::Numeric(m) => Expr::number(m[(row, col)]),
            StoichiometryMatrix::Symbolic(m) => m[(row, col)].clone(),
        }
    }

    /// Every coefficient as an expression
    pub fn to_symbolic(&self) -> DMatrix<Expr> {
        match self {
            StoichiometryMatrix::Numeric(m) => m.map(Expr::number),
            StoichiometryMatrix::Symbolic(m) => m.clone(),
        }
    }
}
// endregion StoichiometryMatrix

// region LabeledTable
/// A copy of tabular data with labelled rows and columns
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabeledTable<T> {
    pub index: Vec<String>,
    pub columns: Vec<String>,
    /// Row major data
    pub data: Vec<Vec<T>>,
}

impl<T> LabeledTable<T> {
    /// Value at the named row and column
    pub fn get(&self, row: &str, column: &str) -> Option<&T> {
        let i = self.index.iter().position(|r| r == row)?;
        let j = self.columns.iter().position(|c| c == column)?;
        self.data.get(i)?.get(j)
    }
}

impl<T: Display> Display for LabeledTable<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let cells: Vec<Vec<String>> = self
            .data
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();
        let index_width = self.index.iter().map(|r| r.len()).max().unwrap_or(0);
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, c)| {
                cells
                    .iter()
                    .map(|row| row[j].len())
                    .chain(std::iter::once(c.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        write!(f, "{:index_width$}", "")?;
        for (c, width) in self.columns.iter().zip(widths.iter().copied()) {
            write!(f, "  {:>width$}", c)?;
        }
        for (r, row) in self.index.iter().zip(&cells) {
            write!(f, "\n{:index_width$}", r)?;
            for (v, width) in row.iter().zip(widths.iter().copied()) {
                write!(f, "  {:>width$}", v)?;
            }
        }
        Ok(())
    }
}
// endregion LabeledTable

/// An immutable, compiled set of processes
///
/// Holds the stoichiometry matrix (processes by components), the rate equation of each
/// process and the resulting production rate of each component. Build one with
/// [`CompiledProcesses::new`] or [`Processes::compile`].
#[derive(Debug)]
pub struct CompiledProcesses {
    processes: Vec<Arc<Process>>,
    ids: Vec<String>,
    index: IndexMap<String, usize>,
    components: Arc<CompiledComponents>,
    parameters: IndexMap<String, Symbol>,
    stoichiometry: StoichiometryMatrix,
    rate_equations: Vec<Expr>,
    production_rates: Vec<Expr>,
}

impl CompiledProcesses {
    /// Compile processes, or return the memoized compilation of an equal process sequence
    ///
    /// # Parameters
    /// - processes: The processes, their order fixes the row order of every matrix
    ///
    /// # Returns
    /// The shared compiled collection, or [`CollectionError::DuplicateId`] if two processes
    /// share an id. Failed compilations are not cached.
    ///
    /// # Examples
    /// ```rust
    /// use std::sync::Arc;
    /// use stoichrs_core::components::{ComponentBuilder, Components};
    /// use stoichrs_core::process::{CompiledProcesses, Process, ProcessSpecBuilder};
    /// let components = Components::from_components([
    ///     ComponentBuilder::default().id("A").build().unwrap(),
    ///     ComponentBuilder::default().id("B").build().unwrap(),
    /// ])
    /// .unwrap()
    /// .compile();
    /// let conversion = Arc::new(
    ///     Process::new(
    ///         ProcessSpecBuilder::default()
    ///             .id("conversion")
    ///             .reaction("A -> B")
    ///             .reference_component("A")
    ///             .rate_equation("k*A".to_string())
    ///             .components(components)
    ///             .parameter("k")
    ///             .build()
    ///             .unwrap(),
    ///     )
    ///     .unwrap(),
    /// );
    /// let first = CompiledProcesses::new([conversion.clone()]).unwrap();
    /// let second = CompiledProcesses::new([conversion]).unwrap();
    /// assert!(Arc::ptr_eq(&first, &second));
    /// assert_eq!(first.production_rates()[1].to_string(), "A*k");
    /// ```
    pub fn new<I: IntoIterator<Item = Arc<Process>>>(
        processes: I,
    ) -> Result<Arc<CompiledProcesses>, CollectionError> {
        let processes: Vec<Arc<Process>> = processes.into_iter().collect();
        // Lock stays held across lookup and insert
        let mut cache = lock_cache();
        if let Some(compiled) = cache.get(&processes) {
            debug!("Reusing compiled processes {}", compiled);
            return Ok(compiled.clone());
        }
        let compiled = Arc::new(CompiledProcesses::compile(processes.clone())?);
        debug!("Compiled {}", compiled);
        cache.insert(processes, compiled.clone());
        Ok(compiled)
    }

    fn compile(processes: Vec<Arc<Process>>) -> Result<CompiledProcesses, CollectionError> {
        let ids: Vec<String> = processes.iter().map(|p| p.id().to_string()).collect();
        let mut index: IndexMap<String, usize> = IndexMap::new();
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(CollectionError::DuplicateId(id.clone()));
            }
        }

        let components = CompiledComponents::union(processes.iter().map(|p| p.components().as_ref()));

        let mut parameters: IndexMap<String, Symbol> = IndexMap::new();
        for p in &processes {
            for (name, symbol) in p.parameter_symbols() {
                if !parameters.contains_key(name) {
                    parameters.insert(name.clone(), symbol.clone());
                }
            }
        }

        let (n_processes, n_components) = (processes.len(), components.size());
        let stoichiometry = if processes.iter().all(|p| p.stoichiometry_vector().is_numeric()) {
            let mut matrix = DMatrix::zeros(n_processes, n_components);
            for (row, p) in processes.iter().enumerate() {
                if let Stoichiometry::Numeric(v) = p.stoichiometry_vector() {
                    for (local, id) in p.components().ids().iter().enumerate() {
                        if v[local] != 0. {
                            matrix[(row, components.index(id)?)] = v[local];
                        }
                    }
                }
            }
            StoichiometryMatrix::Numeric(matrix)
        } else {
            let mut matrix = DMatrix::from_element(n_processes, n_components, Expr::zero());
            for (row, p) in processes.iter().enumerate() {
                for (id, coefficient) in p.stoichiometry() {
                    matrix[(row, components.index(&id)?)] = coefficient;
                }
            }
            StoichiometryMatrix::Symbolic(matrix)
        };

        let rate_equations: Vec<Expr> = processes
            .iter()
            .map(|p| p.rate_equation().cloned().unwrap_or_else(Expr::zero))
            .collect();
        let production_rates: Vec<Expr> = (0..n_components)
            .map(|col| {
                Expr::sum((0..n_processes).map(|row| {
                    stoichiometry.get(row, col) * rate_equations[row].clone()
                }))
            })
            .collect();

        Ok(CompiledProcesses {
            processes,
            ids,
            index,
            components,
            parameters,
            stoichiometry,
            rate_equations,
            production_rates,
        })
    }

    // region Processes
    /// Number of processes
    pub fn size(&self) -> usize {
        self.processes.len()
    }

    /// Process ids in row order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn processes(&self) -> &[Arc<Process>] {
        &self.processes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Process>> {
        self.processes.iter()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Whether an equal process (not only one with the same id) is compiled in
    pub fn contains_process(&self, process: &Process) -> bool {
        self.processes.iter().any(|p| p.as_ref() == process)
    }

    /// Row index of a process
    pub fn index(&self, id: &str) -> Result<usize, CollectionError> {
        match self.index.get(id) {
            Some(i) => Ok(*i),
            None => Err(CollectionError::UndefinedProcess(id.to_string())),
        }
    }

    /// Row indices of several processes
    pub fn indices<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<usize>, CollectionError> {
        ids.iter().map(|id| self.index(id.as_ref())).collect()
    }

    pub fn get(&self, id: &str) -> Result<&Arc<Process>, CollectionError> {
        Ok(&self.processes[self.index(id)?])
    }

    /// Look up several processes, in the order given
    pub fn get_many<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<&Arc<Process>>, CollectionError> {
        ids.iter().map(|id| self.get(id.as_ref())).collect()
    }

    /// Compile the named processes on their own
    pub fn subgroup<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<Arc<CompiledProcesses>, CollectionError> {
        Processes::from_processes(self.get_many(ids)?.into_iter().cloned())?.compile()
    }
    // endregion Processes

    // region Components
    /// Ordered union of the components of every process, the matrix columns
    pub fn components(&self) -> &Arc<CompiledComponents> {
        &self.components
    }

    /// Column index of a component
    pub fn component_index(&self, id: &str) -> Result<usize, ComponentError> {
        self.components.index(id)
    }

    /// Column indices of several components
    pub fn component_indices<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<usize>, ComponentError> {
        self.components.indices(ids)
    }
    // endregion Components

    /// Parameter names of every process, sorted
    pub fn parameters(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.parameters.keys().map(|n| n.as_str()).collect();
        names.sort();
        names
    }

    /// Parameters of every process, in order of first declaration
    pub fn parameter_symbols(&self) -> &IndexMap<String, Symbol> {
        &self.parameters
    }

    pub fn stoichiometry(&self) -> &StoichiometryMatrix {
        &self.stoichiometry
    }

    /// Rate equation of each process, 0 for processes without one
    pub fn rate_equations(&self) -> &[Expr] {
        &self.rate_equations
    }

    /// Production rate of each component, the stoichiometry matrix transposed times the
    /// rate equations
    pub fn production_rates(&self) -> &[Expr] {
        &self.production_rates
    }

    // region Tables
    /// Stoichiometry matrix labelled with process and component ids
    pub fn stoichiometry_table(&self) -> LabeledTable<Expr> {
        let matrix = self.stoichiometry.to_symbolic();
        LabeledTable {
            index: self.ids.clone(),
            columns: self.components.ids().to_vec(),
            data: matrix
                .row_iter()
                .map(|row| row.iter().cloned().collect())
                .collect(),
        }
    }

    /// Rate equations labelled with process ids
    pub fn rate_equation_table(&self) -> LabeledTable<Expr> {
        LabeledTable {
            index: self.ids.clone(),
            columns: vec!["rate_equation".to_string()],
            data: self.rate_equations.iter().map(|r| vec![r.clone()]).collect(),
        }
    }

    /// Production rates labelled with component ids
    pub fn production_rate_table(&self) -> LabeledTable<Expr> {
        LabeledTable {
            index: self.components.ids().to_vec(),
            columns: vec!["rate_of_production".to_string()],
            data: self
                .production_rates
                .iter()
                .map(|r| vec![r.clone()])
                .collect(),
        }
    }
    // endregion Tables

    // region Evaluation
    /// Evaluate the rate equations
    ///
    /// # Parameters
    /// - values: Value of every component concentration and parameter the rate equations use
    ///
    /// # Returns
    /// One rate per process, or [`EvaluationError::UnboundSymbol`] for a missing value
    pub fn evaluate_rates(&self, values: &HashMap<String, f64>) -> Result<DVector<f64>, EvaluationError> {
        let rates = self
            .rate_equations
            .iter()
            .map(|r| r.eval(values))
            .collect::<Result<Vec<f64>, EvaluationError>>()?;
        Ok(DVector::from_vec(rates))
    }

    /// Evaluate the production rate of every component
    ///
    /// For a numeric stoichiometry this is the matrix product of the transposed stoichiometry
    /// and the evaluated rates, otherwise each production rate expression is evaluated.
    pub fn evaluate_production_rates(
        &self,
        values: &HashMap<String, f64>,
    ) -> Result<DVector<f64>, EvaluationError> {
        match &self.stoichiometry {
            StoichiometryMatrix::Numeric(matrix) => {
                Ok(matrix.tr_mul(&self.evaluate_rates(values)?))
            }
            StoichiometryMatrix::Symbolic(_) => {
                let rates = self
                    .production_rates
                    .iter()
                    .map(|r| r.eval(values))
                    .collect::<Result<Vec<f64>, EvaluationError>>()?;
                Ok(DVector::from_vec(rates))
            }
        }
    }
    // endregion Evaluation
}

impl Display for CompiledProcesses {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompiledProcesses([{}])", self.ids.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ComponentBuilder, Components};
    use crate::process::definition::ProcessSpecBuilder;
    use crate::process::stoichiometry::{Coefficient, ReactionSpec};
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    /// Serializes tests which rely on the cache not being cleared in between
    static CACHE_GUARD: Mutex<()> = Mutex::new(());

    fn guard() -> MutexGuard<'static, ()> {
        CACHE_GUARD.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ab_components() -> Arc<CompiledComponents> {
        Components::from_components([
            ComponentBuilder::default().id("A").build().unwrap(),
            ComponentBuilder::default().id("B").build().unwrap(),
        ])
        .unwrap()
        .compile()
    }

    fn process(
        id: &str,
        equation: &str,
        reference: &str,
        rate: &str,
        components: Arc<CompiledComponents>,
    ) -> Arc<Process> {
        Arc::new(
            Process::new(
                ProcessSpecBuilder::default()
                    .id(id)
                    .reaction(equation)
                    .reference_component(reference)
                    .rate_equation(rate.to_string())
                    .components(components)
                    .conserved_for(Vec::new())
                    .parameter("k")
                    .parameter("k2")
                    .build()
                    .unwrap(),
            )
            .unwrap(),
        )
    }

    fn growth_decay() -> (Arc<Process>, Arc<Process>) {
        let components = ab_components();
        (
            process("growth", "A -> 2 B", "A", "k*A", components.clone()),
            process("decay", "B -> A", "B", "k2*B", components),
        )
    }

    #[test]
    fn growth_decay_scenario() {
        let (growth, decay) = growth_decay();
        let compiled = Processes::from_processes([growth, decay])
            .unwrap()
            .compile()
            .unwrap();
        assert_eq!(compiled.ids(), &["growth", "decay"]);
        assert_eq!(compiled.components().ids(), &["A", "B"]);
        assert_eq!(
            compiled.stoichiometry(),
            &StoichiometryMatrix::Numeric(DMatrix::from_row_slice(2, 2, &[-1., 2., 1., -1.]))
        );
        let rates: Vec<String> = compiled
            .production_rates()
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(rates, vec!["-A*k + B*k2", "2*A*k - B*k2"]);
        assert_eq!(compiled.parameters(), vec!["k", "k2"]);
        assert_eq!(compiled.index("decay").unwrap(), 1);
        assert_eq!(compiled.indices(&["decay", "growth"]).unwrap(), vec![1, 0]);
        assert_eq!(compiled.component_index("B").unwrap(), 1);
        assert_eq!(
            compiled.index("nope"),
            Err(CollectionError::UndefinedProcess("nope".to_string()))
        );
        assert_eq!(compiled.to_string(), "CompiledProcesses([growth, decay])");
    }

    #[test]
    fn memoized_by_value_and_order() {
        let _guard = guard();
        let (growth, decay) = growth_decay();
        let first = CompiledProcesses::new([growth.clone(), decay.clone()]).unwrap();
        let second = CompiledProcesses::new([growth.clone(), decay.clone()]).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // Equal processes built separately hit the same entry
        let (growth_copy, decay_copy) = growth_decay();
        let third = CompiledProcesses::new([growth_copy, decay_copy]).unwrap();
        assert!(Arc::ptr_eq(&first, &third));

        let reordered = CompiledProcesses::new([decay, growth]).unwrap();
        assert!(!Arc::ptr_eq(&first, &reordered));
        assert_eq!(reordered.ids(), &["decay", "growth"]);
    }

    #[test]
    fn clearing_the_cache() {
        let _guard = guard();
        let (growth, decay) = growth_decay();
        let first = CompiledProcesses::new([growth.clone(), decay.clone()]).unwrap();
        clear_compilation_cache();
        let second = CompiledProcesses::new([growth, decay]).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.stoichiometry(), second.stoichiometry());
    }

    #[test]
    fn duplicate_ids_are_not_compiled() {
        let (growth, _) = growth_decay();
        assert_eq!(
            CompiledProcesses::new([growth.clone(), growth]).unwrap_err(),
            CollectionError::DuplicateId("growth".to_string())
        );
    }

    #[test]
    fn production_rates_match_matrix() {
        let (growth, decay) = growth_decay();
        let compiled = CompiledProcesses::new([growth, decay]).unwrap();
        let values: HashMap<String, f64> = [("A", 2.), ("B", 3.), ("k", 0.5), ("k2", 0.25)]
            .iter()
            .map(|(n, v)| (n.to_string(), *v))
            .collect();
        let rates = compiled.evaluate_rates(&values).unwrap();
        assert_relative_eq!(rates[0], 1.);
        assert_relative_eq!(rates[1], 0.75);
        let from_matrix = compiled.evaluate_production_rates(&values).unwrap();
        for (i, expr) in compiled.production_rates().iter().enumerate() {
            assert_relative_eq!(from_matrix[i], expr.eval(&values).unwrap(), epsilon = 1e-12);
        }
        assert_relative_eq!(from_matrix[0], -0.25);
        assert_relative_eq!(from_matrix[1], 1.25);

        let missing: HashMap<String, f64> = HashMap::new();
        assert_eq!(
            compiled.evaluate_rates(&missing),
            Err(EvaluationError::UnboundSymbol("A".to_string()))
        );
    }

    #[test]
    fn union_of_component_sets() {
        let ab = ab_components();
        let bc = Components::from_components([
            ComponentBuilder::default().id("B").build().unwrap(),
            ComponentBuilder::default().id("C").build().unwrap(),
        ])
        .unwrap()
        .compile();
        let growth = process("growth", "A -> 2 B", "A", "k*A", ab);
        let transfer = process("transfer", "B -> C", "B", "k2*B", bc);
        let compiled = CompiledProcesses::new([growth, transfer]).unwrap();
        assert_eq!(compiled.components().ids(), &["A", "B", "C"]);
        let matrix = compiled.stoichiometry().as_numeric().unwrap();
        assert_eq!(matrix.row(1).iter().copied().collect::<Vec<_>>(), vec![0., -1., 1.]);
        assert_eq!(compiled.production_rates()[2].to_string(), "B*k2");
    }

    #[test]
    fn symbolic_stoichiometry_and_tables() {
        let components = Components::read_json(
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("test_data")
                .join("growth_decay_components.json"),
        )
        .unwrap()
        .compile();
        let processes = Processes::load_from_csv(
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("test_data")
                .join("growth_decay.csv"),
            components,
            &["COD"],
            &["Y", "mu", "K", "b"],
        )
        .unwrap();
        let compiled = processes.compile().unwrap();
        assert!(!compiled.stoichiometry().is_numeric());
        assert_eq!(compiled.parameters(), vec!["K", "Y", "b", "mu"]);

        let table = compiled.stoichiometry_table();
        assert_eq!(table.index, vec!["growth", "decay"]);
        assert_eq!(table.columns, vec!["S", "X", "S_O"]);
        assert_eq!(table.get("decay", "S_O"), Some(&Expr::number(-1.)));
        assert_eq!(table.get("decay", "S"), Some(&Expr::zero()));
        assert_eq!(table.get("nope", "S"), None);

        let rates = compiled.rate_equation_table();
        assert_eq!(rates.get("decay", "rate_equation").unwrap().to_string(), "X*b");

        let values: HashMap<String, f64> = [
            ("S", 10.),
            ("X", 100.),
            ("S_O", 2.),
            ("Y", 0.5),
            ("mu", 4.),
            ("K", 10.),
            ("b", 0.5),
        ]
        .iter()
        .map(|(n, v)| (n.to_string(), *v))
        .collect();
        let production = compiled.evaluate_production_rates(&values).unwrap();
        // growth rate 200, decay rate 50
        assert_relative_eq!(production[0], -400., epsilon = 1e-9);
        assert_relative_eq!(production[1], 150., epsilon = 1e-9);
        assert_relative_eq!(production[2], -250., epsilon = 1e-9);

        let json = serde_json::to_value(compiled.production_rate_table()).unwrap();
        assert_eq!(json["index"], serde_json::json!(["S", "X", "S_O"]));
        assert_eq!(json["columns"], serde_json::json!(["rate_of_production"]));
    }

    #[test]
    fn subgroup_compiles_selection() {
        let (growth, decay) = growth_decay();
        let compiled = CompiledProcesses::new([growth, decay]).unwrap();
        let sub = compiled.subgroup(&["decay"]).unwrap();
        assert_eq!(sub.ids(), &["decay"]);
        assert_eq!(
            sub.stoichiometry(),
            &StoichiometryMatrix::Numeric(DMatrix::from_row_slice(1, 2, &[1., -1.]))
        );
        assert!(compiled.subgroup(&["nope"]).is_err());
        assert!(sub.contains_process(compiled.get("decay").unwrap()));
    }

    #[test]
    fn processes_without_rates() {
        let components = ab_components();
        let silent = Arc::new(
            Process::new(
                ProcessSpecBuilder::default()
                    .id("silent")
                    .reaction(ReactionSpec::mapping([("A", Coefficient::from(-1.))]))
                    .reference_component("A")
                    .components(components)
                    .conserved_for(Vec::new())
                    .build()
                    .unwrap(),
            )
            .unwrap(),
        );
        let compiled = CompiledProcesses::new([silent]).unwrap();
        assert_eq!(compiled.rate_equations(), &[Expr::zero()]);
        assert!(compiled.production_rates().iter().all(|r| r.is_zero()));
        let table = compiled.stoichiometry_table();
        assert_eq!(table.to_string(), "         A  B\nsilent  -1  0");
    }
}
