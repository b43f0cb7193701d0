//! This module provides the mutable [`Components`] registry and its immutable, indexed
//! counterpart [`CompiledComponents`]
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use indexmap::IndexMap;
use nalgebra::{DMatrix, DVector};

use crate::components::component::{Component, ParticleSize};
use crate::components::ComponentError;

/// An ordered, append-only registry of uniquely named components
#[derive(Clone, Debug, Default)]
pub struct Components {
    components: IndexMap<String, Component>,
}

impl Components {
    pub fn new_empty() -> Self {
        Components {
            components: IndexMap::new(),
        }
    }

    /// Create a registry from components, failing on a repeated id
    pub fn from_components<I: IntoIterator<Item = Component>>(
        components: I,
    ) -> Result<Self, ComponentError> {
        let mut new = Components::new_empty();
        new.extend(components)?;
        Ok(new)
    }

    /// Add a component to the registry
    ///
    /// # Parameters
    /// - component: Component to add
    ///
    /// # Examples
    /// ```rust
    /// use stoichrs_core::components::{ComponentBuilder, Components};
    /// let mut components = Components::new_empty();
    /// let water = ComponentBuilder::default().id("H2O").build().unwrap();
    /// components.append(water.clone()).unwrap();
    /// assert!(components.append(water).is_err());
    /// ```
    pub fn append(&mut self, component: Component) -> Result<(), ComponentError> {
        if self.components.contains_key(&component.id) {
            return Err(ComponentError::DuplicateId(component.id));
        }
        self.components.insert(component.id.clone(), component);
        Ok(())
    }

    /// Add several components, nothing is added if any id is already taken
    pub fn extend<I: IntoIterator<Item = Component>>(
        &mut self,
        components: I,
    ) -> Result<(), ComponentError> {
        let components: Vec<Component> = components.into_iter().collect();
        let mut seen: Vec<&str> = Vec::new();
        for c in &components {
            if self.components.contains_key(&c.id) || seen.contains(&c.id.as_str()) {
                return Err(ComponentError::DuplicateId(c.id.clone()));
            }
            seen.push(&c.id);
        }
        for c in components {
            self.components.insert(c.id.clone(), c);
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Freeze the registry into an indexed [`CompiledComponents`]
    pub fn compile(self) -> Arc<CompiledComponents> {
        Arc::new(CompiledComponents::new(
            self.components.into_values().collect(),
        ))
    }
}

/// An immutable, indexed set of components
///
/// The position of a component in this set is the column it occupies in every
/// stoichiometry vector and matrix built against it.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledComponents {
    components: Vec<Component>,
    ids: Vec<String>,
    index: IndexMap<String, usize>,
}

impl CompiledComponents {
    fn new(components: Vec<Component>) -> Self {
        let ids: Vec<String> = components.iter().map(|c| c.id.clone()).collect();
        let index = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        CompiledComponents {
            components,
            ids,
            index,
        }
    }

    /// Ordered union of several component sets, the first component seen for an id wins
    pub fn union<'a, I: IntoIterator<Item = &'a CompiledComponents>>(
        sets: I,
    ) -> Arc<CompiledComponents> {
        let mut merged: IndexMap<String, Component> = IndexMap::new();
        for set in sets {
            for c in &set.components {
                if !merged.contains_key(&c.id) {
                    merged.insert(c.id.clone(), c.clone());
                }
            }
        }
        Arc::new(CompiledComponents::new(merged.into_values().collect()))
    }

    /// Number of components
    pub fn size(&self) -> usize {
        self.components.len()
    }

    /// Component ids in index order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Components in index order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Result<&Component, ComponentError> {
        Ok(&self.components[self.index(id)?])
    }

    /// Index of a component
    pub fn index(&self, id: &str) -> Result<usize, ComponentError> {
        match self.index.get(id) {
            Some(i) => Ok(*i),
            None => Err(ComponentError::UndefinedComponent(id.to_string())),
        }
    }

    /// Indices of several components
    pub fn indices<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<usize>, ComponentError> {
        ids.iter().map(|id| self.index(id.as_ref())).collect()
    }

    /// New compiled set holding only the named components, in the given order
    pub fn subgroup<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<Arc<CompiledComponents>, ComponentError> {
        let mut subset = Components::new_empty();
        for i in self.indices(ids)? {
            subset.append(self.components[i].clone())?;
        }
        Ok(subset.compile())
    }

    /// Conversion factors of every component for one conserved quantity
    pub fn conversion_factors(&self, quantity: &str) -> DVector<f64> {
        DVector::from_iterator(
            self.size(),
            self.components.iter().map(|c| c.conversion_factor(quantity)),
        )
    }

    /// Conversion factors stacked into a matrix, one row per quantity
    pub fn conversion_matrix<S: AsRef<str>>(&self, quantities: &[S]) -> DMatrix<f64> {
        DMatrix::from_fn(quantities.len(), self.size(), |row, col| {
            self.components[col].conversion_factor(quantities[row].as_ref())
        })
    }

    fn mask<F: Fn(&Component) -> bool>(&self, predicate: F) -> DVector<f64> {
        DVector::from_iterator(
            self.size(),
            self.components
                .iter()
                .map(|c| if predicate(c) { 1. } else { 0. }),
        )
    }

    /// 1 for soluble components, 0 otherwise
    pub fn soluble(&self) -> DVector<f64> {
        self.mask(|c| c.particle_size == ParticleSize::Soluble)
    }

    /// 1 for colloidal components, 0 otherwise
    pub fn colloidal(&self) -> DVector<f64> {
        self.mask(|c| c.particle_size == ParticleSize::Colloidal)
    }

    /// 1 for particulate components, 0 otherwise
    pub fn particulate(&self) -> DVector<f64> {
        self.mask(|c| c.particle_size == ParticleSize::Particulate)
    }

    /// 1 for degradable components, 0 otherwise
    pub fn degradable(&self) -> DVector<f64> {
        self.mask(|c| c.degradable)
    }

    /// 1 for organic components, 0 otherwise
    pub fn organic(&self) -> DVector<f64> {
        self.mask(|c| c.organic)
    }
}

impl Display for CompiledComponents {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompiledComponents([{}])", self.ids.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::component::ComponentBuilder;

    fn setup_components() -> Arc<CompiledComponents> {
        let s_s = ComponentBuilder::default()
            .id("S_S")
            .conversion_factor("COD", 1.)
            .degradable(true)
            .organic(true)
            .build()
            .unwrap();
        let s_nh = ComponentBuilder::default()
            .id("S_NH")
            .conversion_factor("N", 1.)
            .build()
            .unwrap();
        let x_bh = ComponentBuilder::default()
            .id("X_BH")
            .conversion_factor("COD", 1.)
            .conversion_factor("N", 0.086)
            .particle_size(ParticleSize::Particulate)
            .organic(true)
            .build()
            .unwrap();
        Components::from_components([s_s, s_nh, x_bh])
            .unwrap()
            .compile()
    }

    #[test]
    fn index_lookup() {
        let cmps = setup_components();
        assert_eq!(cmps.size(), 3);
        assert_eq!(cmps.index("S_NH").unwrap(), 1);
        assert_eq!(cmps.indices(&["X_BH", "S_S"]).unwrap(), vec![2, 0]);
        assert_eq!(
            cmps.index("S_O"),
            Err(ComponentError::UndefinedComponent("S_O".to_string()))
        );
        assert!(cmps.contains("S_S"));
        assert_eq!(cmps.to_string(), "CompiledComponents([S_S, S_NH, X_BH])");
    }

    #[test]
    fn conversion_factor_rows() {
        let cmps = setup_components();
        assert_eq!(
            cmps.conversion_factors("N"),
            DVector::from_vec(vec![0., 1., 0.086])
        );
        let matrix = cmps.conversion_matrix(&["COD", "N"]);
        assert_eq!(matrix.nrows(), 2);
        assert_eq!(matrix[(0, 2)], 1.);
        assert_eq!(matrix[(1, 2)], 0.086);
    }

    #[test]
    fn masks() {
        let cmps = setup_components();
        assert_eq!(cmps.soluble(), DVector::from_vec(vec![1., 1., 0.]));
        assert_eq!(cmps.particulate(), DVector::from_vec(vec![0., 0., 1.]));
        assert_eq!(cmps.colloidal(), DVector::from_vec(vec![0., 0., 0.]));
        assert_eq!(cmps.degradable(), DVector::from_vec(vec![1., 0., 0.]));
        assert_eq!(cmps.organic(), DVector::from_vec(vec![1., 0., 1.]));
    }

    #[test]
    fn duplicate_extend_is_atomic() {
        let mut components = Components::new_empty();
        let a = ComponentBuilder::default().id("A").build().unwrap();
        let b = ComponentBuilder::default().id("B").build().unwrap();
        components.append(a.clone()).unwrap();
        assert_eq!(
            components.extend([b, a]),
            Err(ComponentError::DuplicateId("A".to_string()))
        );
        assert_eq!(components.len(), 1);
    }

    #[test]
    fn union_and_subgroup() {
        let cmps = setup_components();
        let other = Components::from_components([
            ComponentBuilder::default().id("S_O").build().unwrap(),
            ComponentBuilder::default().id("S_S").build().unwrap(),
        ])
        .unwrap()
        .compile();
        let union = CompiledComponents::union([cmps.as_ref(), other.as_ref()]);
        assert_eq!(union.ids(), &["S_S", "S_NH", "X_BH", "S_O"]);
        // First definition of S_S is kept
        assert_eq!(union.get("S_S").unwrap().conversion_factor("COD"), 1.);

        let sub = cmps.subgroup(&["X_BH", "S_S"]).unwrap();
        assert_eq!(sub.ids(), &["X_BH", "S_S"]);
        assert!(cmps.subgroup(&["nope"]).is_err());
    }
}
