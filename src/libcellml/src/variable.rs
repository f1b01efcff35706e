// Copyright 2026 The libcellml-rs Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::component::{Component, ComponentData};

/// Declares whether a variable's value is visible to the parent and/or
/// the children of its component.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    None,
    Public,
    Private,
    PublicAndPrivate,
    /// An interface value we don't recognize, kept verbatim.
    Other(String),
}

impl InterfaceType {
    pub fn as_str(&self) -> &str {
        match self {
            InterfaceType::None => "none",
            InterfaceType::Public => "public",
            InterfaceType::Private => "private",
            InterfaceType::PublicAndPrivate => "public_and_private",
            InterfaceType::Other(other) => other.as_str(),
        }
    }
}

impl From<&str> for InterfaceType {
    fn from(interface: &str) -> Self {
        match interface {
            "none" => InterfaceType::None,
            "public" => InterfaceType::Public,
            "private" => InterfaceType::Private,
            "public_and_private" => InterfaceType::PublicAndPrivate,
            other => InterfaceType::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug)]
pub enum InitialValue {
    Literal(String),
    /// Initialized from another variable. The reference doesn't keep
    /// that variable alive and is only ever rendered as its name.
    Variable(WeakVariable),
}

/// One directed half of a bidirectional equivalence.
#[derive(Debug)]
struct Equivalence {
    variable: Weak<RefCell<VariableData>>,
    mapping_id: String,
    connection_id: String,
}

impl Equivalence {
    fn new(variable: &Variable, mapping_id: &str, connection_id: &str) -> Self {
        Equivalence {
            variable: Rc::downgrade(&variable.0),
            mapping_id: mapping_id.to_owned(),
            connection_id: connection_id.to_owned(),
        }
    }

    // a live `other` can only share an address with this entry if it is
    // the same allocation: the Weak keeps that allocation reserved.
    fn refers_to(&self, other: &Variable) -> bool {
        std::ptr::eq(self.variable.as_ptr(), Rc::as_ptr(&other.0))
    }
}

#[derive(Debug, Default)]
pub(crate) struct VariableData {
    name: String,
    units: String,
    initial_value: Option<InitialValue>,
    interface_type: Option<InterfaceType>,
    id: String,
    parent: Weak<RefCell<ComponentData>>,
    equivalences: Vec<Equivalence>,
}

/// A handle to a CellML variable.
///
/// Handles are cheap to clone and compare by identity: two handles are
/// equal only if they refer to the same variable, regardless of name.
/// Variables live for as long as a handle (or the owning component)
/// does; equivalences never keep a partner alive.
#[derive(Clone, Default)]
pub struct Variable(Rc<RefCell<VariableData>>);

/// A non-owning reference to a [`Variable`].
#[derive(Clone, Debug, Default)]
pub struct WeakVariable(Weak<RefCell<VariableData>>);

impl WeakVariable {
    pub fn upgrade(&self) -> Option<Variable> {
        self.0.upgrade().map(Variable)
    }
}

impl Variable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        let variable = Variable::new();
        variable.set_name(name);
        variable
    }

    pub fn downgrade(&self) -> WeakVariable {
        WeakVariable(Rc::downgrade(&self.0))
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.0.borrow_mut().name = name.into();
    }

    pub fn units(&self) -> String {
        self.0.borrow().units.clone()
    }

    pub fn set_units(&self, units: impl Into<String>) {
        self.0.borrow_mut().units = units.into();
    }

    pub fn id(&self) -> String {
        self.0.borrow().id.clone()
    }

    pub fn set_id(&self, id: impl Into<String>) {
        self.0.borrow_mut().id = id.into();
    }

    /// The initial value as it is written out: either the literal, or
    /// the name of the referenced variable while that variable exists.
    pub fn initial_value(&self) -> Option<String> {
        match self.0.borrow().initial_value {
            Some(InitialValue::Literal(ref value)) => Some(value.clone()),
            Some(InitialValue::Variable(ref variable)) => variable.upgrade().map(|v| v.name()),
            None => None,
        }
    }

    pub fn set_initial_value(&self, value: impl Into<String>) {
        self.0.borrow_mut().initial_value = Some(InitialValue::Literal(value.into()));
    }

    pub fn set_initial_value_variable(&self, variable: &Variable) {
        self.0.borrow_mut().initial_value = Some(InitialValue::Variable(variable.downgrade()));
    }

    pub fn clear_initial_value(&self) {
        self.0.borrow_mut().initial_value = None;
    }

    pub fn interface_type(&self) -> Option<InterfaceType> {
        self.0.borrow().interface_type.clone()
    }

    pub fn set_interface_type(&self, interface_type: InterfaceType) {
        self.0.borrow_mut().interface_type = Some(interface_type);
    }

    pub fn clear_interface_type(&self) {
        self.0.borrow_mut().interface_type = None;
    }

    /// The component that currently owns this variable, if it still exists.
    pub fn parent(&self) -> Option<Component> {
        self.0.borrow().parent.upgrade().map(Component)
    }

    pub(crate) fn set_parent(&self, parent: &Component) {
        self.0.borrow_mut().parent = Rc::downgrade(&parent.0);
    }

    pub(crate) fn clear_parent(&self) {
        self.0.borrow_mut().parent = Weak::new();
    }

    fn equivalence_index(&self, other: &Variable) -> Option<usize> {
        self.0
            .borrow()
            .equivalences
            .iter()
            .position(|equivalence| equivalence.refers_to(other))
    }

    /// Makes `a` and `b` equivalent. Returns false if they already were
    /// (existing ids are left alone) or if `a` and `b` are the same variable.
    pub fn add_equivalence(a: &Variable, b: &Variable) -> bool {
        Variable::add_equivalence_with_ids(a, b, "", "")
    }

    pub fn add_equivalence_with_ids(
        a: &Variable,
        b: &Variable,
        mapping_id: &str,
        connection_id: &str,
    ) -> bool {
        if a == b {
            debug!(variable = %a.name(), "refusing to make a variable equivalent to itself");
            return false;
        }

        let a_has_b = a.equivalence_index(b).is_some();
        let b_has_a = b.equivalence_index(a).is_some();
        if a_has_b && b_has_a {
            debug!(a = %a.name(), b = %b.name(), "variables are already equivalent");
            return false;
        }

        if !a_has_b {
            a.0.borrow_mut()
                .equivalences
                .push(Equivalence::new(b, mapping_id, connection_id));
        }
        if !b_has_a {
            b.0.borrow_mut()
                .equivalences
                .push(Equivalence::new(a, mapping_id, connection_id));
        }

        true
    }

    /// Removes the equivalence between `a` and `b` from both sides.
    /// Returns whether there was anything to remove.
    pub fn remove_equivalence(a: &Variable, b: &Variable) -> bool {
        let removed_from_a = a.remove_equivalence_entry(b);
        let removed_from_b = b.remove_equivalence_entry(a);
        removed_from_a || removed_from_b
    }

    fn remove_equivalence_entry(&self, other: &Variable) -> bool {
        match self.equivalence_index(other) {
            Some(i) => {
                self.0.borrow_mut().equivalences.remove(i);
                true
            }
            None => false,
        }
    }

    /// Drops every equivalence of this variable, including the reciprocal
    /// entries held by partners that still exist.
    pub fn remove_all_equivalences(&self) {
        let equivalences = std::mem::take(&mut self.0.borrow_mut().equivalences);
        for equivalence in equivalences {
            if let Some(partner) = equivalence.variable.upgrade() {
                partner
                    .borrow_mut()
                    .equivalences
                    .retain(|entry| !entry.refers_to(self));
            }
        }
    }

    pub fn set_equivalence_mapping_id(a: &Variable, b: &Variable, mapping_id: &str) -> bool {
        Variable::update_equivalence(a, b, |equivalence| {
            equivalence.mapping_id = mapping_id.to_owned()
        })
    }

    pub fn set_equivalence_connection_id(a: &Variable, b: &Variable, connection_id: &str) -> bool {
        Variable::update_equivalence(a, b, |equivalence| {
            equivalence.connection_id = connection_id.to_owned()
        })
    }

    fn update_equivalence(a: &Variable, b: &Variable, update: impl Fn(&mut Equivalence)) -> bool {
        if a == b {
            return false;
        }

        let mut found = false;
        for (this, other) in [(a, b), (b, a)] {
            if let Some(i) = this.equivalence_index(other) {
                update(&mut this.0.borrow_mut().equivalences[i]);
                found = true;
            }
        }

        found
    }

    pub fn equivalence_mapping_id(a: &Variable, b: &Variable) -> Option<String> {
        let i = a.equivalence_index(b)?;
        let id = a.0.borrow().equivalences[i].mapping_id.clone();
        if id.is_empty() { None } else { Some(id) }
    }

    pub fn equivalence_connection_id(a: &Variable, b: &Variable) -> Option<String> {
        let i = a.equivalence_index(b)?;
        let id = a.0.borrow().equivalences[i].connection_id.clone();
        if id.is_empty() { None } else { Some(id) }
    }

    /// The partner at `index`, in the order equivalences were added.
    /// `None` if the index is out of range or the partner no longer exists.
    pub fn equivalent_variable(&self, index: usize) -> Option<Variable> {
        self.0
            .borrow()
            .equivalences
            .get(index)
            .and_then(|equivalence| equivalence.variable.upgrade())
            .map(Variable)
    }

    /// Number of equivalence entries held, including entries whose partner
    /// has since been destroyed.
    pub fn equivalent_variable_count(&self) -> usize {
        self.0.borrow().equivalences.len()
    }

    pub fn has_equivalent_variable(&self, other: &Variable) -> bool {
        self.equivalence_index(other).is_some()
    }

    /// Live partners together with the mapping and connection ids of each
    /// edge, in insertion order. Dangling entries are skipped.
    pub(crate) fn equivalences(&self) -> Vec<(Variable, String, String)> {
        let data = self.0.borrow();
        data.equivalences
            .iter()
            .filter_map(|equivalence| match equivalence.variable.upgrade() {
                Some(partner) => Some((
                    Variable(partner),
                    equivalence.mapping_id.clone(),
                    equivalence.connection_id.clone(),
                )),
                None => {
                    trace!(variable = %data.name, "skipping equivalence to a destroyed variable");
                    None
                }
            })
            .collect()
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("Variable")
            .field("name", &data.name)
            .field("units", &data.units)
            .field("equivalences", &data.equivalences.len())
            .finish()
    }
}

#[test]
fn test_add_equivalence_is_symmetric() {
    let v1 = Variable::new();
    let v2 = Variable::new();
    assert!(Variable::add_equivalence(&v1, &v2));

    assert_eq!(Some(v2.clone()), v1.equivalent_variable(0));
    assert_eq!(Some(v1.clone()), v2.equivalent_variable(0));
    assert!(v1.has_equivalent_variable(&v2));
    assert!(v2.has_equivalent_variable(&v1));
}

#[test]
fn test_duplicate_equivalences_are_ignored() {
    let v1 = Variable::new();
    let v2 = Variable::new();
    assert!(Variable::add_equivalence_with_ids(&v1, &v2, "map", "conn"));
    assert!(!Variable::add_equivalence(&v1, &v2));
    assert!(!Variable::add_equivalence_with_ids(&v2, &v1, "other", "other"));

    assert_eq!(1, v1.equivalent_variable_count());
    assert_eq!(1, v2.equivalent_variable_count());
    assert_eq!(Some("map".to_owned()), Variable::equivalence_mapping_id(&v2, &v1));
    assert_eq!(Some("conn".to_owned()), Variable::equivalence_connection_id(&v1, &v2));
}

#[test]
fn test_self_equivalence_is_rejected() {
    let v = Variable::with_name("v");
    assert!(!Variable::add_equivalence(&v, &v));
    assert_eq!(0, v.equivalent_variable_count());
    assert!(!Variable::set_equivalence_mapping_id(&v, &v, "id"));
    assert!(!Variable::remove_equivalence(&v, &v));
}

#[test]
fn test_equivalent_variable_out_of_range() {
    let v1 = Variable::new();
    let v2 = Variable::new();
    assert_eq!(None, v1.equivalent_variable(0));
    Variable::add_equivalence(&v1, &v2);
    assert_eq!(None, v1.equivalent_variable(1));
}

#[test]
fn test_remove_equivalence() {
    let v1 = Variable::new();
    let v2 = Variable::new();
    let v3 = Variable::new();
    Variable::add_equivalence(&v1, &v2);
    Variable::add_equivalence(&v1, &v3);

    assert!(Variable::remove_equivalence(&v2, &v1));
    assert!(!Variable::remove_equivalence(&v1, &v2));
    assert_eq!(1, v1.equivalent_variable_count());
    assert_eq!(0, v2.equivalent_variable_count());
    assert_eq!(Some(v3.clone()), v1.equivalent_variable(0));
}

#[test]
fn test_ids_are_set_on_both_sides() {
    let v1 = Variable::new();
    let v2 = Variable::new();
    let v3 = Variable::new();
    Variable::add_equivalence(&v1, &v2);

    assert!(Variable::set_equivalence_mapping_id(&v1, &v2, "map1"));
    assert!(Variable::set_equivalence_connection_id(&v2, &v1, "con1"));
    assert_eq!(Some("map1".to_owned()), Variable::equivalence_mapping_id(&v2, &v1));
    assert_eq!(Some("con1".to_owned()), Variable::equivalence_connection_id(&v1, &v2));

    assert!(!Variable::set_equivalence_mapping_id(&v1, &v3, "nope"));
    assert_eq!(None, Variable::equivalence_mapping_id(&v1, &v3));
}

#[test]
fn test_destroyed_partner_is_tolerated() {
    let v1 = Variable::new();
    let v2 = Variable::new();
    let v3 = Variable::new();
    Variable::add_equivalence(&v1, &v2);
    Variable::add_equivalence(&v1, &v3);

    let weak = v2.downgrade();
    drop(v2);
    assert!(weak.upgrade().is_none());

    // the dangling entry stays until it is removed explicitly
    assert_eq!(2, v1.equivalent_variable_count());
    assert_eq!(None, v1.equivalent_variable(0));
    assert_eq!(Some(v3.clone()), v1.equivalent_variable(1));
    assert_eq!(1, v1.equivalences().len());

    v1.remove_all_equivalences();
    assert_eq!(0, v1.equivalent_variable_count());
    assert_eq!(0, v3.equivalent_variable_count());
}

#[test]
fn test_initial_value() {
    let v1 = Variable::with_name("v1");
    assert_eq!(None, v1.initial_value());
    v1.set_initial_value("3.5");
    assert_eq!(Some("3.5".to_owned()), v1.initial_value());

    {
        let v2 = Variable::with_name("v2");
        v1.set_initial_value_variable(&v2);
        assert_eq!(Some("v2".to_owned()), v1.initial_value());
    }
    assert_eq!(None, v1.initial_value());

    v1.set_initial_value_variable(&v1);
    assert_eq!(Some("v1".to_owned()), v1.initial_value());
}

#[test]
fn test_interface_type_names() {
    for name in ["none", "public", "private", "public_and_private", "bogus"] {
        assert_eq!(name, InterfaceType::from(name).as_str());
    }
    assert_eq!(InterfaceType::Other("bogus".to_owned()), "bogus".into());
}
