// Copyright 2026 The libcellml-rs Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Folds the equivalence graph into `connection` elements.
//!
//! Each unordered pair of equivalent variables becomes exactly one
//! `map_variables` element, grouped under the connection for the pair of
//! components owning the two variables. Groups keep the order in which
//! they were first seen while walking the components in the order the
//! document lists them, then their variables, then each variable's
//! equivalences. The variables of an imported component are not written,
//! so a reparse recreates them in connection order; they are walked by
//! name instead.

use std::collections::HashSet;

use super::{Connection, MapVariables, non_empty};
use crate::component::Component;
use crate::variable::Variable;

struct Group {
    component_1: Option<Component>,
    component_2: Option<Component>,
    connection_id: String,
    maps: Vec<(Variable, Variable, String)>,
}

impl Group {
    fn into_connection(self) -> Connection {
        Connection {
            component_1: self.component_1.map(|c| c.name()),
            component_2: self.component_2.map(|c| c.name()),
            id: non_empty(self.connection_id),
            map_variables: self
                .maps
                .into_iter()
                .map(|(variable_1, variable_2, id)| MapVariables {
                    variable_1: Some(variable_1.name()),
                    variable_2: Some(variable_2.name()),
                    id: non_empty(id),
                })
                .collect(),
        }
    }
}

/// `components` is every component of the model, already flattened.
/// A partner whose owner is not among them is written without that
/// component attribute.
pub(super) fn connections(components: &[Component]) -> Vec<Connection> {
    let mut seen: HashSet<(Variable, Variable)> = HashSet::new();
    let mut groups: Vec<Group> = vec![];

    for component in components.iter() {
        let mut variables = component.variables();
        if component.is_import() {
            variables.sort_by_key(|v| v.name());
        }
        for variable in variables {
            for (partner, mapping_id, connection_id) in variable.equivalences() {
                let pair = (variable.clone(), partner.clone());
                let reversed = (partner.clone(), variable.clone());
                if seen.contains(&pair) || seen.contains(&reversed) {
                    continue;
                }
                seen.insert(pair);

                let owner = Some(component.clone());
                let partner_owner = partner.parent().filter(|c| components.contains(c));

                let found = groups.iter().enumerate().find_map(|(i, group)| {
                    if group.component_1 == owner && group.component_2 == partner_owner {
                        Some((i, false))
                    } else if group.component_1 == partner_owner && group.component_2 == owner {
                        Some((i, true))
                    } else {
                        None
                    }
                });

                let (index, swapped) = match found {
                    Some(found) => found,
                    None => {
                        groups.push(Group {
                            component_1: owner,
                            component_2: partner_owner,
                            connection_id: String::new(),
                            maps: vec![],
                        });
                        (groups.len() - 1, false)
                    }
                };

                let group = &mut groups[index];
                if group.connection_id.is_empty() {
                    group.connection_id = connection_id;
                }
                if swapped {
                    group.maps.push((partner, variable.clone(), mapping_id));
                } else {
                    group.maps.push((variable.clone(), partner, mapping_id));
                }
            }
        }
    }

    groups.into_iter().map(Group::into_connection).collect()
}

#[cfg(test)]
fn names(connection: &Connection) -> Vec<(String, String)> {
    connection
        .map_variables
        .iter()
        .map(|map| {
            (
                map.variable_1.clone().unwrap_or_default(),
                map.variable_2.clone().unwrap_or_default(),
            )
        })
        .collect()
}

#[test]
fn test_pairs_are_grouped_by_component_pair() {
    let c1 = Component::with_name("component1");
    let c2 = Component::with_name("component2");
    let v11 = Variable::with_name("variable11");
    let v12 = Variable::with_name("variable12");
    let v21 = Variable::with_name("variable21");
    let v22 = Variable::with_name("variable22");
    c1.add_variable(&v11);
    c1.add_variable(&v12);
    c2.add_variable(&v21);
    c2.add_variable(&v22);

    Variable::add_equivalence(&v11, &v21);
    // reversed orientation still lands in the same connection
    Variable::add_equivalence(&v22, &v12);

    let connections = connections(&[c1, c2]);
    assert_eq!(1, connections.len());
    assert_eq!(Some("component1".to_owned()), connections[0].component_1);
    assert_eq!(Some("component2".to_owned()), connections[0].component_2);
    assert_eq!(
        vec![
            ("variable11".to_owned(), "variable21".to_owned()),
            ("variable12".to_owned(), "variable22".to_owned()),
        ],
        names(&connections[0])
    );
}

#[test]
fn test_group_id_comes_from_first_edge_with_one() {
    let c1 = Component::with_name("c1");
    let c2 = Component::with_name("c2");
    let a = Variable::with_name("a");
    let b = Variable::with_name("b");
    let x = Variable::with_name("x");
    let y = Variable::with_name("y");
    c1.add_variable(&a);
    c1.add_variable(&b);
    c2.add_variable(&x);
    c2.add_variable(&y);

    Variable::add_equivalence(&a, &x);
    Variable::add_equivalence_with_ids(&b, &y, "map_by", "conn");

    let connections = connections(&[c1, c2]);
    assert_eq!(Some("conn".to_owned()), connections[0].id);
    assert_eq!(None, connections[0].map_variables[0].id);
    assert_eq!(Some("map_by".to_owned()), connections[0].map_variables[1].id);
}

#[test]
fn test_unowned_partner() {
    let c1 = Component::with_name("c1");
    let a = Variable::with_name("a");
    let loose = Variable::with_name("loose");
    c1.add_variable(&a);
    Variable::add_equivalence(&a, &loose);

    let connections = connections(&[c1]);
    assert_eq!(1, connections.len());
    assert_eq!(Some("c1".to_owned()), connections[0].component_1);
    assert_eq!(None, connections[0].component_2);
}

#[test]
fn test_destroyed_partner_is_skipped() {
    let c1 = Component::with_name("c1");
    let c2 = Component::with_name("c2");
    let a = Variable::with_name("a");
    c1.add_variable(&a);
    {
        let b = Variable::with_name("b");
        c2.add_variable(&b);
        Variable::add_equivalence(&a, &b);
        c2.remove_all_variables();
    }

    assert!(connections(&[c1, c2]).is_empty());
}

#[test]
fn test_partner_owner_outside_the_walk_is_omitted() {
    let c1 = Component::with_name("c1");
    let gone = Component::with_name("gone");
    let a = Variable::with_name("a");
    let b = Variable::with_name("b");
    c1.add_variable(&a);
    gone.add_variable(&b);
    Variable::add_equivalence(&b, &a);

    let connections = connections(&[c1]);
    assert_eq!(1, connections.len());
    assert_eq!(Some("c1".to_owned()), connections[0].component_1);
    assert_eq!(None, connections[0].component_2);
    assert_eq!(vec![("a".to_owned(), "b".to_owned())], names(&connections[0]));
}

#[test]
fn test_imported_variables_are_walked_by_name() {
    let imported = Component::with_name("imported");
    imported.set_source_component(&crate::component::ImportSource::new("other.cellml"), "remote");
    let local = Component::with_name("local");
    let z = Variable::with_name("z");
    let y = Variable::with_name("y");
    imported.add_variable(&z);
    imported.add_variable(&y);
    let w = Variable::with_name("w");
    let v = Variable::with_name("v");
    local.add_variable(&w);
    local.add_variable(&v);
    Variable::add_equivalence(&w, &z);
    Variable::add_equivalence(&v, &y);

    let connections = connections(&[imported, local]);
    assert_eq!(1, connections.len());
    assert_eq!(Some("imported".to_owned()), connections[0].component_1);
    assert_eq!(
        vec![
            ("y".to_owned(), "v".to_owned()),
            ("z".to_owned(), "w".to_owned()),
        ],
        names(&connections[0])
    );
}
