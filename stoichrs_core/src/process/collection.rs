//! This module provides [`Processes`], an ordered, mutable collection of uniquely named
//! processes
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::components::CompiledComponents;
use crate::io::table::{Cell, ProcessTable};
use crate::process::compiled::CompiledProcesses;
use crate::process::definition::{Process, ProcessSpecBuilder};
use crate::process::stoichiometry::{Coefficient, ReactionSpec};
use crate::process::{CollectionError, ProcessError};

/// An ordered collection of processes keyed by id
///
/// Processes are shared through [`Arc`], so a process can be held by several collections
/// (and compiled collections) without copying. [`Processes::get_mut`] copies a shared
/// process before modifying it.
#[derive(Clone, Debug, Default)]
pub struct Processes {
    processes: IndexMap<String, Arc<Process>>,
}

impl Processes {
    pub fn new_empty() -> Self {
        Processes {
            processes: IndexMap::new(),
        }
    }

    /// Create a collection from processes, failing on a repeated id
    pub fn from_processes<I, P>(processes: I) -> Result<Self, CollectionError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Arc<Process>>,
    {
        let mut new = Processes::new_empty();
        new.extend(processes)?;
        Ok(new)
    }

    /// Add a process to the collection
    ///
    /// # Parameters
    /// - process: [`Process`] (or shared `Arc<Process>`) to add
    ///
    /// # Returns
    /// [`CollectionError::DuplicateId`] if a process with the same id is already present
    pub fn append<P: Into<Arc<Process>>>(&mut self, process: P) -> Result<(), CollectionError> {
        let process = process.into();
        if self.processes.contains_key(process.id()) {
            return Err(CollectionError::DuplicateId(process.id().to_string()));
        }
        self.processes.insert(process.id().to_string(), process);
        Ok(())
    }

    /// Add several processes, nothing is added if any id is already taken
    pub fn extend<I, P>(&mut self, processes: I) -> Result<(), CollectionError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Arc<Process>>,
    {
        let processes: Vec<Arc<Process>> = processes.into_iter().map(Into::into).collect();
        let mut seen: Vec<&str> = Vec::new();
        for p in &processes {
            if self.processes.contains_key(p.id()) || seen.contains(&p.id()) {
                return Err(CollectionError::DuplicateId(p.id().to_string()));
            }
            seen.push(p.id());
        }
        for p in processes {
            self.processes.insert(p.id().to_string(), p);
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&Arc<Process>, CollectionError> {
        self.processes
            .get(id)
            .ok_or_else(|| CollectionError::UndefinedProcess(id.to_string()))
    }

    /// Look up several processes, in the order given
    pub fn get_many<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<&Arc<Process>>, CollectionError> {
        ids.iter().map(|id| self.get(id.as_ref())).collect()
    }

    /// Mutable access to a process, copied first if it is shared
    ///
    /// The id of the returned process can not be changed, so the collection stays keyed
    /// correctly.
    pub fn get_mut(&mut self, id: &str) -> Result<&mut Process, CollectionError> {
        match self.processes.get_mut(id) {
            Some(process) => Ok(Arc::make_mut(process)),
            None => Err(CollectionError::UndefinedProcess(id.to_string())),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.processes.contains_key(id)
    }

    /// Whether an equal process (not only one with the same id) is in the collection
    pub fn contains_process(&self, process: &Process) -> bool {
        self.processes
            .get(process.id())
            .is_some_and(|p| p.as_ref() == process)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Process ids in insertion order
    pub fn ids(&self) -> Vec<&str> {
        self.processes.keys().map(|id| id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Process>> {
        self.processes.values()
    }

    /// New collection holding only the named processes, in the given order
    pub fn subgroup<S: AsRef<str>>(&self, ids: &[S]) -> Result<Processes, CollectionError> {
        Processes::from_processes(self.get_many(ids)?.into_iter().cloned())
    }

    /// Compile the collection into matrix form
    ///
    /// Compiling the same processes in the same order returns the same shared
    /// [`CompiledProcesses`], see [`CompiledProcesses::new`].
    pub fn compile(self) -> Result<Arc<CompiledProcesses>, CollectionError> {
        CompiledProcesses::new(self.processes.into_values())
    }

    /// Build processes from a [`ProcessTable`]
    ///
    /// Each row becomes a process. The reference component of a row is the first column
    /// holding a coefficient of exactly 1 or -1, or the first non-blank column if there is
    /// none. Rows without any coefficient are skipped.
    ///
    /// # Parameters
    /// - table: The parsed table
    /// - components: Components every process acts on, must include the table columns
    /// - conserved_for: Quantities every process conserves
    /// - parameters: Parameters the coefficients and rate equations may reference
    pub fn load_from_table<S: AsRef<str>>(
        table: &ProcessTable,
        components: Arc<CompiledComponents>,
        conserved_for: &[S],
        parameters: &[S],
    ) -> Result<Processes, CollectionError> {
        components.indices(table.components())?;
        let mut processes = Processes::new_empty();
        for row in table.rows() {
            let filled: Vec<(&String, &Cell)> = table
                .components()
                .iter()
                .zip(row.cells.iter())
                .filter(|(_, cell)| !cell.is_blank())
                .collect();
            if filled.is_empty() {
                warn!(
                    "Skipping process {}, it has no stoichiometric coefficients",
                    row.id
                );
                continue;
            }
            let reference = filled
                .iter()
                .find(|(_, cell)| matches!(cell, Cell::Value(v) if v.abs() == 1.))
                .unwrap_or(&filled[0])
                .0;
            let mapping: IndexMap<String, Coefficient> = filled
                .iter()
                .filter_map(|(id, cell)| cell.coefficient().map(|c| ((*id).clone(), c)))
                .collect();

            let mut spec = ProcessSpecBuilder::default();
            spec.id(row.id.as_str())
                .reaction(ReactionSpec::Mapping(mapping))
                .reference_component(reference.as_str())
                .rate_equation(row.rate_equation.clone())
                .components(components.clone())
                .conserved_for(conserved_for.iter().map(|q| q.as_ref().to_string()).collect())
                .parameters(parameters.iter().map(|p| p.as_ref().to_string()).collect());
            let spec = spec
                .build()
                .map_err(|err| ProcessError::Builder(err.to_string()))?;
            processes.append(Process::new(spec)?)?;
        }
        debug!("Loaded {} process(es) from table", processes.len());
        Ok(processes)
    }

    /// Read a process table from a `.csv` file and build its processes
    ///
    /// See [`Processes::load_from_table`] for the parameters.
    pub fn load_from_csv<P: AsRef<Path>, S: AsRef<str>>(
        path: P,
        components: Arc<CompiledComponents>,
        conserved_for: &[S],
        parameters: &[S],
    ) -> Result<Processes, CollectionError> {
        let table = ProcessTable::read_csv(path)?;
        Processes::load_from_table(&table, components, conserved_for, parameters)
    }
}

impl Display for Processes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Processes([{}])", self.ids().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ComponentBuilder, Components};
    use crate::expression::Expr;
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    fn components() -> Arc<CompiledComponents> {
        Components::from_components([
            ComponentBuilder::default()
                .id("A")
                .conversion_factor("COD", 1.)
                .build()
                .unwrap(),
            ComponentBuilder::default()
                .id("B")
                .conversion_factor("COD", 0.5)
                .build()
                .unwrap(),
        ])
        .unwrap()
        .compile()
    }

    fn process(id: &str, equation: &str, reference: &str, rate: &str) -> Process {
        Process::new(
            ProcessSpecBuilder::default()
                .id(id)
                .reaction(equation)
                .reference_component(reference)
                .rate_equation(rate.to_string())
                .components(components())
                .conserve("COD")
                .parameter("k")
                .parameter("k2")
                .build()
                .unwrap(),
        )
        .unwrap()
    }

    fn growth_decay() -> Processes {
        Processes::from_processes([
            process("growth", "A -> 2 B", "A", "k*A"),
            process("decay", "B -> 0.5 A", "B", "k2*B"),
        ])
        .unwrap()
    }

    #[test]
    fn append_and_lookup() {
        let processes = growth_decay();
        assert_eq!(processes.len(), 2);
        assert_eq!(processes.ids(), vec!["growth", "decay"]);
        assert_eq!(processes.get("decay").unwrap().id(), "decay");
        assert_eq!(
            processes.get("nope").unwrap_err(),
            CollectionError::UndefinedProcess("nope".to_string())
        );
        assert!(processes.contains("growth"));
        assert!(processes.contains_process(&process("growth", "A -> 2 B", "A", "k*A")));
        assert!(!processes.contains_process(&process("growth", "A -> 2 B", "A", "k2*A")));
        assert_eq!(processes.to_string(), "Processes([growth, decay])");
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut processes = growth_decay();
        assert_eq!(
            processes.append(process("growth", "A -> 2 B", "A", "k*A")),
            Err(CollectionError::DuplicateId("growth".to_string()))
        );
        // Extending is all or nothing
        assert_eq!(
            processes.extend([
                process("uptake", "A -> 2 B", "A", "k*A"),
                process("decay", "B -> 0.5 A", "B", "k2*B"),
            ]),
            Err(CollectionError::DuplicateId("decay".to_string()))
        );
        assert_eq!(processes.len(), 2);
        assert!(!processes.contains("uptake"));
    }

    #[test]
    fn subgroup_shares_processes() {
        let processes = growth_decay();
        let sub = processes.subgroup(&["decay"]).unwrap();
        assert_eq!(sub.ids(), vec!["decay"]);
        assert!(Arc::ptr_eq(
            sub.get("decay").unwrap(),
            processes.get("decay").unwrap()
        ));
        assert!(processes.subgroup(&["decay", "nope"]).is_err());
    }

    #[test]
    fn get_mut_copies_shared_process() {
        let mut processes = growth_decay();
        let shared = processes.clone();
        processes.get_mut("growth").unwrap().reverse();
        assert_eq!(
            processes.get("growth").unwrap().rate_equation().unwrap(),
            &-(Expr::symbol("k") * Expr::symbol("A"))
        );
        // The clone still holds the original process
        assert_eq!(
            shared.get("growth").unwrap().rate_equation().unwrap(),
            &(Expr::symbol("k") * Expr::symbol("A"))
        );
    }

    #[test]
    fn load_growth_decay_table() {
        let components = crate::components::Components::read_json(
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
        // The row without coefficients is skipped
        assert_eq!(processes.ids(), vec!["growth", "decay"]);

        let growth = processes.get("growth").unwrap();
        assert_eq!(growth.reference_component(), "X");
        let y = Expr::symbol("Y");
        assert_eq!(growth.stoichiometry()["S"], -y.recip());
        assert_eq!(growth.stoichiometry()["S_O"], Expr::one() - y.recip());

        let decay = processes.get("decay").unwrap();
        assert_eq!(decay.reference_component(), "X");
        assert!(decay.check_conservation(None).is_ok());
    }

    #[test]
    fn load_falls_back_to_first_filled_column() {
        let table =
            ProcessTable::from_csv_str(",A,B,rate\np,2,-4,k*A\nq,?,2,k*B\n").unwrap();
        let processes =
            Processes::load_from_table(&table, components(), &["COD"], &["k"]).unwrap();

        let p = processes.get("p").unwrap();
        assert_eq!(p.reference_component(), "A");
        let v = p.stoichiometry_vector().as_numeric().unwrap().clone();
        assert_eq!(v.as_slice(), &[1., -2.]);

        // The unknown in the first column is still the reference
        let q = processes.get("q").unwrap();
        assert_eq!(q.reference_component(), "A");
        let v = q.stoichiometry_vector().as_numeric().unwrap().clone();
        assert_relative_eq!(v[0], -1., epsilon = 1e-12);
        assert_relative_eq!(v[1], 2., epsilon = 1e-12);
    }

    #[test]
    fn load_reports_bad_rows() {
        let table = ProcessTable::from_csv_str(",A,B,rate\ngrowth,-1,2,q*A\n").unwrap();
        let err = Processes::load_from_table(&table, components(), &["COD"], &["k"])
            .unwrap_err();
        assert_eq!(
            err,
            CollectionError::Process(ProcessError::UndefinedParameter {
                process: "growth".to_string(),
                name: "q".to_string()
            })
        );
        let table = ProcessTable::from_csv_str(",A,C,rate\ngrowth,-1,2,k*A\n").unwrap();
        assert!(matches!(
            Processes::load_from_table(&table, components(), &["COD"], &["k"]),
            Err(CollectionError::Component(_))
        ));
    }
}
