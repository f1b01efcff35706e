// Copyright 2026 The libcellml-rs Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::component::Component;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Unit {
    pub reference: String,
    pub prefix: Option<String>,
    pub exponent: Option<String>,
    pub multiplier: Option<String>,
    pub id: Option<String>,
}

/// A named units definition. Values are kept as written; no unit
/// arithmetic happens here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Units {
    pub name: String,
    pub id: Option<String>,
    pub units: Vec<Unit>,
}

impl Units {
    pub fn new(name: impl Into<String>) -> Self {
        Units {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A CellML model. Top-level components are held as the children of a
/// hidden root component, so nesting a top-level component under another
/// one takes it off the top level.
#[derive(Debug)]
pub struct Model {
    name: String,
    id: String,
    root: Component,
    units: Vec<Units>,
}

impl Default for Model {
    fn default() -> Self {
        Model {
            name: String::new(),
            id: String::new(),
            root: Component::model_root(),
            units: vec![],
        }
    }
}

impl Model {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Model {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Adds a top-level component. A component that was the child of
    /// another component is detached from it first.
    pub fn add_component(&mut self, component: &Component) {
        if self.root.components().contains(component) {
            return;
        }
        self.root.add_component(component);
    }

    pub fn remove_component(&mut self, component: &Component) -> bool {
        self.root.remove_component(component)
    }

    pub fn remove_component_by_name(&mut self, name: &str) -> bool {
        self.take_component(name).is_some()
    }

    /// Detaches the first top-level component called `name` and hands
    /// it back to the caller.
    pub fn take_component(&mut self, name: &str) -> Option<Component> {
        let component = self
            .root
            .components()
            .into_iter()
            .find(|c| c.name() == name)?;
        self.root.remove_component(&component);
        Some(component)
    }

    pub fn remove_all_components(&mut self) {
        for component in self.root.components() {
            self.root.remove_component(&component);
        }
    }

    pub fn component(&self, index: usize) -> Option<Component> {
        self.root.component(index)
    }

    /// Finds a component anywhere in the model by name, depth first.
    pub fn component_by_name(&self, name: &str) -> Option<Component> {
        self.root.component_by_name(name)
    }

    pub fn components(&self) -> Vec<Component> {
        self.root.components()
    }

    pub fn component_count(&self) -> usize {
        self.root.component_count()
    }

    /// Every component in the model: top-level components in order, each
    /// followed by its descendants depth first.
    pub fn all_components(&self) -> Vec<Component> {
        let mut all = vec![];
        for component in self.root.components() {
            component.flatten_into(&mut all);
        }
        all
    }

    pub fn add_units(&mut self, units: Units) {
        self.units.push(units);
    }

    pub fn units(&self, index: usize) -> Option<&Units> {
        self.units.get(index)
    }

    pub fn all_units(&self) -> &[Units] {
        &self.units
    }

    pub fn units_count(&self) -> usize {
        self.units.len()
    }
}

#[test]
fn test_component_lookup() {
    let mut model = Model::with_name("m");
    let c1 = Component::with_name("c1");
    let c2 = Component::with_name("c2");
    let nested = Component::with_name("nested");
    c2.add_component(&nested);
    model.add_component(&c1);
    model.add_component(&c2);
    model.add_component(&c1);

    assert_eq!(2, model.component_count());
    assert_eq!(Some(nested.clone()), model.component_by_name("nested"));
    assert_eq!(vec![c1.clone(), c2.clone(), nested.clone()], model.all_components());
    assert!(model.component_by_name("missing").is_none());
}

#[test]
fn test_remove_component() {
    let mut model = Model::new();
    let c1 = Component::with_name("c1");
    let c2 = Component::with_name("c2");
    model.add_component(&c1);
    model.add_component(&c2);

    assert!(model.remove_component_by_name("c1"));
    assert!(!model.remove_component_by_name("c1"));
    assert!(model.remove_component(&c2));
    assert_eq!(0, model.component_count());
}

#[test]
fn test_add_nested_component_to_model() {
    let mut model = Model::new();
    let parent = Component::with_name("parent");
    let child = Component::with_name("child");
    parent.add_component(&child);

    model.add_component(&child);
    assert_eq!(None, child.parent());
    assert_eq!(0, parent.component_count());
    assert_eq!(1, model.component_count());
}

#[test]
fn test_nesting_a_top_level_component() {
    let mut model = Model::new();
    let parent = Component::with_name("parent");
    let child = Component::with_name("child");
    model.add_component(&parent);
    model.add_component(&child);

    assert!(parent.add_component(&child));
    assert_eq!(1, model.component_count());
    assert_eq!(Some(parent.clone()), child.parent());
    assert_eq!(vec![parent.clone(), child.clone()], model.all_components());

    // detaching from the parent doesn't put it back on the top level
    assert!(parent.remove_component(&child));
    assert_eq!(vec![parent.clone()], model.all_components());
    assert_eq!(None, child.parent());
}

#[test]
fn test_top_level_components_have_no_parent() {
    let mut model = Model::new();
    let c = Component::with_name("c");
    model.add_component(&c);
    assert_eq!(None, c.parent());

    model.remove_all_components();
    assert_eq!(0, model.component_count());
    assert!(model.component_by_name("c").is_none());
}
