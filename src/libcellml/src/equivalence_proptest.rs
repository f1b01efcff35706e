// Copyright 2026 The libcellml-rs Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Property-based tests for the equivalence graph.
//!
//! Random sequences of graph mutations are applied both to real variables
//! and to a plain set of unordered index pairs, and the two are checked
//! against each other after every step. Generated models are also
//! written, parsed back and written again, and both documents must match.

use std::collections::BTreeSet;

use proptest::prelude::*;
use proptest::sample::Index;

use crate::component::{Component, ImportSource};
use crate::model::Model;
use crate::parser::Parser;
use crate::variable::Variable;
use crate::xml::model_to_cellml;

const VARIABLE_COUNT: usize = 5;

#[derive(Clone, Debug)]
enum Op {
    Add(usize, usize),
    Remove(usize, usize),
    RemoveAll(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let index = 0..VARIABLE_COUNT;
    prop_oneof![
        4 => (index.clone(), index.clone()).prop_map(|(a, b)| Op::Add(a, b)),
        2 => (index.clone(), index.clone()).prop_map(|(a, b)| Op::Remove(a, b)),
        1 => index.prop_map(Op::RemoveAll),
    ]
}

fn key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

fn check_graph(variables: &[Variable], expected: &BTreeSet<(usize, usize)>) {
    for (i, a) in variables.iter().enumerate() {
        let partners = expected.iter().filter(|(x, y)| *x == i || *y == i).count();
        assert_eq!(partners, a.equivalent_variable_count());
        for (j, b) in variables.iter().enumerate() {
            let related = i != j && expected.contains(&key(i, j));
            assert_eq!(related, a.has_equivalent_variable(b));
            assert_eq!(related, b.has_equivalent_variable(a));
        }
    }
}

const IMPORT_SOURCES: [&str; 2] = ["first.cellml", "second.cellml"];

#[derive(Clone, Debug)]
struct LocalShape {
    variables: usize,
    // nested under one of the locals created before it
    parent: Option<Index>,
}

#[derive(Clone, Debug)]
struct ImportShape {
    source: usize,
    variables: usize,
    position: Index,
}

#[derive(Clone, Debug)]
struct EdgeShape {
    a: Index,
    b: Index,
    mapping_id: Option<String>,
    connection_id: Option<String>,
}

#[derive(Clone, Debug)]
struct ModelShape {
    locals: Vec<LocalShape>,
    imports: Vec<ImportShape>,
    edges: Vec<EdgeShape>,
}

fn model_shape_strategy() -> impl Strategy<Value = ModelShape> {
    let local = (0..4usize, prop::option::of(any::<Index>()))
        .prop_map(|(variables, parent)| LocalShape { variables, parent });
    let import = (0..IMPORT_SOURCES.len(), 0..3usize, any::<Index>()).prop_map(
        |(source, variables, position)| ImportShape {
            source,
            variables,
            position,
        },
    );
    let edge = (
        any::<Index>(),
        any::<Index>(),
        prop::option::of("[a-z]{1,4}"),
        prop::option::of("[a-z]{1,4}"),
    )
        .prop_map(|(a, b, mapping_id, connection_id)| EdgeShape {
            a,
            b,
            mapping_id,
            connection_id,
        });
    (
        prop::collection::vec(local, 1..5),
        prop::collection::vec(import, 0..4),
        prop::collection::vec(edge, 0..12),
    )
        .prop_map(|(locals, imports, edges)| ModelShape {
            locals,
            imports,
            edges,
        })
}

fn build_model(shape: &ModelShape) -> Model {
    let mut variables: Vec<Variable> = vec![];
    let mut add_variables = |component: &Component, count: usize| {
        for i in 0..count {
            let variable = Variable::with_name(format!("{}_v{i}", component.name()));
            component.add_variable(&variable);
            variables.push(variable);
        }
    };

    let mut locals: Vec<Component> = vec![];
    let mut top_level: Vec<Component> = vec![];
    for (i, local) in shape.locals.iter().enumerate() {
        let component = Component::with_name(format!("local{i}"));
        add_variables(&component, local.variables);
        match local.parent {
            Some(ref parent) if i > 0 => {
                locals[parent.index(i)].add_component(&component);
            }
            _ => top_level.push(component.clone()),
        }
        locals.push(component);
    }

    for (i, import) in shape.imports.iter().enumerate() {
        let component = Component::with_name(format!("imported{i}"));
        component.set_source_component(
            &ImportSource::new(IMPORT_SOURCES[import.source]),
            format!("remote{i}"),
        );
        add_variables(&component, import.variables);
        let position = import.position.index(top_level.len() + 1);
        top_level.insert(position, component);
    }

    if !variables.is_empty() {
        for edge in shape.edges.iter() {
            Variable::add_equivalence_with_ids(
                &variables[edge.a.index(variables.len())],
                &variables[edge.b.index(variables.len())],
                edge.mapping_id.as_deref().unwrap_or(""),
                edge.connection_id.as_deref().unwrap_or(""),
            );
        }
    }

    let mut model = Model::with_name("generated");
    for component in top_level.iter() {
        model.add_component(component);
    }
    model
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn equivalences_match_reference_set(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let variables: Vec<Variable> = (0..VARIABLE_COUNT)
            .map(|i| Variable::with_name(format!("v{i}")))
            .collect();
        let mut expected = BTreeSet::new();

        for op in ops {
            match op {
                Op::Add(a, b) => {
                    let added = Variable::add_equivalence(&variables[a], &variables[b]);
                    prop_assert_eq!(a != b && !expected.contains(&key(a, b)), added);
                    if a != b {
                        expected.insert(key(a, b));
                    }
                }
                Op::Remove(a, b) => {
                    let removed = Variable::remove_equivalence(&variables[a], &variables[b]);
                    prop_assert_eq!(a != b && expected.remove(&key(a, b)), removed);
                }
                Op::RemoveAll(a) => {
                    variables[a].remove_all_equivalences();
                    expected.retain(|(x, y)| *x != a && *y != a);
                }
            }
            check_graph(&variables, &expected);
        }
    }

    #[test]
    fn each_pair_is_written_once(
        pairs in prop::collection::vec((0..VARIABLE_COUNT, 0..VARIABLE_COUNT), 0..20)
    ) {
        let mut model = Model::new();
        let c1 = Component::with_name("c1");
        let c2 = Component::with_name("c2");
        model.add_component(&c1);
        model.add_component(&c2);

        let variables: Vec<Variable> = (0..VARIABLE_COUNT)
            .map(|i| Variable::with_name(format!("v{i}")))
            .collect();
        for (i, variable) in variables.iter().enumerate() {
            if i % 2 == 0 { c1.add_variable(variable) } else { c2.add_variable(variable) }
        }

        let mut expected = BTreeSet::new();
        for (a, b) in pairs {
            Variable::add_equivalence(&variables[a], &variables[b]);
            if a != b {
                expected.insert(key(a, b));
            }
        }

        let output = model_to_cellml(&model).unwrap();
        prop_assert_eq!(expected.len(), output.matches("<map_variables ").count());
    }

    #[test]
    fn written_models_survive_a_reparse(shape in model_shape_strategy()) {
        let model = build_model(&shape);
        let written = model_to_cellml(&model).unwrap();

        let mut parser = Parser::new();
        let reparsed = parser.parse_model(&written);
        prop_assert_eq!(0, parser.error_count(), "{:?}", parser.errors());
        prop_assert_eq!(written, model_to_cellml(&reparsed).unwrap());
    }
}
