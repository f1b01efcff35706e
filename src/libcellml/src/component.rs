// Copyright 2026 The libcellml-rs Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::variable::Variable;

/// Where an imported component comes from. Components sharing one
/// `ImportSource` are written out under a single `import` element.
#[derive(Clone, Debug)]
pub struct ImportSource(Rc<String>);

impl ImportSource {
    pub fn new(url: impl Into<String>) -> Self {
        ImportSource(Rc::new(url.into()))
    }

    pub fn url(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for ImportSource {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ImportSource {}

#[derive(Debug, Default)]
pub(crate) struct ComponentData {
    name: String,
    id: String,
    math: String,
    variables: Vec<Variable>,
    components: Vec<Component>,
    parent: Weak<RefCell<ComponentData>>,
    import: Option<(ImportSource, String)>,
    // set only on the hidden component holding a model's top level
    model_root: bool,
}

/// A handle to a CellML component. Like [`Variable`], handles compare by
/// identity. A component owns its variables and child components; it
/// refers to its own parent weakly.
#[derive(Clone, Default)]
pub struct Component(pub(crate) Rc<RefCell<ComponentData>>);

impl Component {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        let component = Component::new();
        component.set_name(name);
        component
    }

    pub(crate) fn model_root() -> Self {
        let root = Component::new();
        root.0.borrow_mut().model_root = true;
        root
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.0.borrow_mut().name = name.into();
    }

    pub fn id(&self) -> String {
        self.0.borrow().id.clone()
    }

    pub fn set_id(&self, id: impl Into<String>) {
        self.0.borrow_mut().id = id.into();
    }

    pub fn math(&self) -> String {
        self.0.borrow().math.clone()
    }

    pub fn set_math(&self, math: impl Into<String>) {
        self.0.borrow_mut().math = math.into();
    }

    pub fn append_math(&self, math: &str) {
        self.0.borrow_mut().math.push_str(math);
    }

    pub fn set_source_component(&self, source: &ImportSource, reference: impl Into<String>) {
        self.0.borrow_mut().import = Some((source.clone(), reference.into()));
    }

    pub fn is_import(&self) -> bool {
        self.0.borrow().import.is_some()
    }

    pub fn import_source(&self) -> Option<ImportSource> {
        self.0.borrow().import.as_ref().map(|(source, _)| source.clone())
    }

    /// Name of the component inside the imported model.
    pub fn import_reference(&self) -> String {
        self.0
            .borrow()
            .import
            .as_ref()
            .map(|(_, reference)| reference.clone())
            .unwrap_or_default()
    }

    /// The component this one is nested in. Top-level components of a
    /// model have no parent.
    pub fn parent(&self) -> Option<Component> {
        self.owner().filter(|owner| !owner.0.borrow().model_root)
    }

    fn owner(&self) -> Option<Component> {
        self.0.borrow().parent.upgrade().map(Component)
    }

    fn has_ancestor(&self, ancestor: &Component) -> bool {
        let mut current = self.parent();
        while let Some(component) = current {
            if component == *ancestor {
                return true;
            }
            current = component.parent();
        }
        false
    }

    /// Takes ownership of `variable`, detaching it from any component that
    /// owned it before. Equivalences are unaffected.
    pub fn add_variable(&self, variable: &Variable) {
        if let Some(previous) = variable.parent() {
            if previous == *self {
                return;
            }
            previous.remove_variable(variable);
        }
        self.0.borrow_mut().variables.push(variable.clone());
        variable.set_parent(self);
    }

    pub fn remove_variable(&self, variable: &Variable) -> bool {
        let index = self.0.borrow().variables.iter().position(|v| v == variable);
        self.remove_variable_at(index)
    }

    /// Removes the first variable called `name`.
    pub fn remove_variable_by_name(&self, name: &str) -> bool {
        let index = self
            .0
            .borrow()
            .variables
            .iter()
            .position(|v| v.name() == name);
        self.remove_variable_at(index)
    }

    fn remove_variable_at(&self, index: Option<usize>) -> bool {
        let Some(index) = index else {
            return false;
        };
        let variable = self.0.borrow_mut().variables.remove(index);
        variable.clear_parent();
        true
    }

    pub fn remove_all_variables(&self) {
        let variables = std::mem::take(&mut self.0.borrow_mut().variables);
        for variable in variables {
            variable.clear_parent();
        }
    }

    pub fn variable(&self, index: usize) -> Option<Variable> {
        self.0.borrow().variables.get(index).cloned()
    }

    pub fn variable_by_name(&self, name: &str) -> Option<Variable> {
        self.0
            .borrow()
            .variables
            .iter()
            .find(|v| v.name() == name)
            .cloned()
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.0.borrow().variables.clone()
    }

    pub fn variable_count(&self) -> usize {
        self.0.borrow().variables.len()
    }

    pub fn has_variable(&self, variable: &Variable) -> bool {
        self.0.borrow().variables.iter().any(|v| v == variable)
    }

    /// Adds `child` as the last child of this component, detaching it from
    /// its previous parent component or from the top level of its model.
    /// Returns false (and changes nothing) if that would make a component
    /// its own ancestor.
    pub fn add_component(&self, child: &Component) -> bool {
        if child == self || self.has_ancestor(child) {
            debug!(
                parent = %self.name(),
                child = %child.name(),
                "refusing to create a component cycle"
            );
            return false;
        }
        if let Some(previous) = child.owner() {
            previous.remove_component(child);
        }
        self.0.borrow_mut().components.push(child.clone());
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        true
    }

    pub fn remove_component(&self, child: &Component) -> bool {
        let index = self.0.borrow().components.iter().position(|c| c == child);
        self.remove_component_at(index)
    }

    pub fn remove_component_by_name(&self, name: &str) -> bool {
        let index = self
            .0
            .borrow()
            .components
            .iter()
            .position(|c| c.name() == name);
        self.remove_component_at(index)
    }

    fn remove_component_at(&self, index: Option<usize>) -> bool {
        let Some(index) = index else {
            return false;
        };
        let child = self.0.borrow_mut().components.remove(index);
        child.0.borrow_mut().parent = Weak::new();
        true
    }

    pub fn component(&self, index: usize) -> Option<Component> {
        self.0.borrow().components.get(index).cloned()
    }

    /// Finds a descendant by name, searching depth first.
    pub fn component_by_name(&self, name: &str) -> Option<Component> {
        for child in self.components() {
            if child.name() == name {
                return Some(child);
            }
            if let Some(found) = child.component_by_name(name) {
                return Some(found);
            }
        }
        None
    }

    pub fn components(&self) -> Vec<Component> {
        self.0.borrow().components.clone()
    }

    pub fn component_count(&self) -> usize {
        self.0.borrow().components.len()
    }

    /// Appends this component and all of its descendants, depth first.
    pub(crate) fn flatten_into(&self, out: &mut Vec<Component>) {
        out.push(self.clone());
        for child in self.components() {
            child.flatten_into(out);
        }
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("Component")
            .field("name", &data.name)
            .field("variables", &data.variables)
            .field("components", &data.components)
            .finish()
    }
}

#[test]
fn test_variable_ownership() {
    let c1 = Component::with_name("c1");
    let c2 = Component::with_name("c2");
    let v = Variable::with_name("v");

    c1.add_variable(&v);
    assert_eq!(Some(c1.clone()), v.parent());
    assert_eq!(1, c1.variable_count());

    // adding to a second component moves the variable
    c2.add_variable(&v);
    assert_eq!(Some(c2.clone()), v.parent());
    assert_eq!(0, c1.variable_count());
    assert!(c2.has_variable(&v));

    assert!(c2.remove_variable_by_name("v"));
    assert!(!c2.remove_variable_by_name("v"));
    assert_eq!(None, v.parent());
}

#[test]
fn test_variable_lookup() {
    let c = Component::with_name("c");
    for name in ["variable1", "variable2", "variable3"] {
        c.add_variable(&Variable::with_name(name));
    }
    assert_eq!("variable2", c.variable(1).unwrap().name());
    assert_eq!("variable3", c.variable_by_name("variable3").unwrap().name());
    assert!(c.variable(3).is_none());
    assert!(c.variable_by_name("missing").is_none());

    c.remove_all_variables();
    assert_eq!(0, c.variable_count());
}

#[test]
fn test_duplicate_names_are_distinct_variables() {
    let c = Component::with_name("c");
    let first = Variable::with_name("x");
    let second = Variable::with_name("x");
    c.add_variable(&first);
    c.add_variable(&second);

    assert_ne!(first, second);
    assert_eq!(Some(first.clone()), c.variable_by_name("x"));
    assert!(c.remove_variable(&second));
    assert!(c.has_variable(&first));
}

#[test]
fn test_parent_dropped() {
    let v = Variable::with_name("v");
    {
        let c = Component::with_name("c");
        c.add_variable(&v);
        assert!(v.parent().is_some());
    }
    assert!(v.parent().is_none());
}

#[test]
fn test_component_hierarchy() {
    let parent = Component::with_name("parent");
    let child = Component::with_name("child");
    let grandchild = Component::with_name("grandchild");

    assert!(parent.add_component(&child));
    assert!(child.add_component(&grandchild));
    assert!(!grandchild.add_component(&parent));
    assert!(!parent.add_component(&parent));

    assert_eq!(Some(parent.clone()), child.parent());
    assert_eq!(Some(grandchild.clone()), parent.component_by_name("grandchild"));

    let mut flat = vec![];
    parent.flatten_into(&mut flat);
    assert_eq!(vec![parent.clone(), child.clone(), grandchild.clone()], flat);

    assert!(parent.remove_component_by_name("child"));
    assert_eq!(None, child.parent());
    assert_eq!(0, parent.component_count());
}

#[test]
fn test_import_source() {
    let source = ImportSource::new("other.cellml");
    let c = Component::with_name("local");
    assert!(!c.is_import());

    c.set_source_component(&source, "remote");
    assert!(c.is_import());
    assert_eq!("remote", c.import_reference());
    assert_eq!(Some(source.clone()), c.import_source());
    assert_ne!(source, ImportSource::new("other.cellml"));
}
