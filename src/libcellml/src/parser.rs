// Copyright 2026 The libcellml-rs Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use tracing::warn;

use crate::common::Error;
use crate::component::{Component, ImportSource};
use crate::model::Model;
use crate::parse_err;
use crate::variable::Variable;
use crate::xml;

/// Builds a [`Model`] from a CellML 2.0 document.
///
/// Problems in the document never abort a parse. Each one is recorded
/// on the parser and the offending element is skipped, so a model is
/// always returned; it is empty if the document isn't well-formed XML.
#[derive(Debug, Default)]
pub struct Parser {
    errors: Vec<Error>,
}

impl Parser {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn parse_model(&mut self, input: &str) -> Model {
        match xml::file_from_str(input) {
            Ok(file) => self.build_model(file),
            Err(err) => {
                self.add_error(err);
                Model::new()
            }
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn error(&self, index: usize) -> Option<&Error> {
        self.errors.get(index)
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    fn add_error(&mut self, err: Error) {
        warn!(code = %err.code, "{}", err.description());
        self.errors.push(err);
    }

    fn build_model(&mut self, file: xml::File) -> Model {
        let mut model = Model::new();
        if let Some(name) = file.name {
            model.set_name(name);
        }
        if let Some(id) = file.id {
            model.set_id(id);
        }

        for units in file.units {
            model.add_units(units.into());
        }

        for import in file.imports {
            let source = ImportSource::new(import.href.unwrap_or_default());
            for imported in import.components {
                let component = Component::new();
                if let Some(name) = imported.name {
                    component.set_name(name);
                }
                if let Some(id) = imported.id {
                    component.set_id(id);
                }
                component.set_source_component(&source, imported.component_ref.unwrap_or_default());
                model.add_component(&component);
            }
        }

        for xml_component in file.components {
            let component = Component::new();
            if let Some(name) = xml_component.name {
                component.set_name(name);
            }
            if let Some(id) = xml_component.id {
                component.set_id(id);
            }
            for var in xml_component.variables {
                component.add_variable(&Variable::from(var));
            }
            model.add_component(&component);
        }

        if let Some(encapsulation) = file.encapsulation {
            for component_ref in encapsulation.component_refs.iter() {
                if let Some(parent) = self.encapsulated_component(&model, component_ref) {
                    self.build_encapsulation(&model, &parent, component_ref);
                }
            }
        }

        for connection in file.connections.iter() {
            self.build_connection(&model, connection);
        }

        model
    }

    fn encapsulated_component(
        &mut self,
        model: &Model,
        component_ref: &xml::ComponentRef,
    ) -> Option<Component> {
        let Some(ref name) = component_ref.component else {
            self.add_error(parse_err!(
                Encapsulation,
                MissingAttribute,
                "Encapsulation in model '{}' does not have a valid component attribute in a component_ref element.",
                model.name()
            ));
            return None;
        };

        let component = model.component_by_name(name);
        if component.is_none() {
            self.add_error(parse_err!(
                Encapsulation,
                DoesNotExist,
                "Encapsulation in model '{}' specifies '{}' as a component in a component_ref but it does not exist in the model.",
                model.name(),
                name
            ));
        }
        component
    }

    /// Moves the components named by the children of `component_ref`
    /// underneath `parent`, recursively.
    fn build_encapsulation(
        &mut self,
        model: &Model,
        parent: &Component,
        component_ref: &xml::ComponentRef,
    ) {
        for child_ref in component_ref.component_refs.iter() {
            let Some(child) = self.encapsulated_component(model, child_ref) else {
                continue;
            };
            parent.add_component(&child);
            self.build_encapsulation(model, &child, child_ref);
        }
    }

    fn connection_component(
        &mut self,
        model: &Model,
        name: &Option<String>,
        n: usize,
    ) -> Option<Component> {
        let Some(name) = name else {
            self.add_error(parse_err!(
                Connection,
                MissingAttribute,
                "Connection in model '{}' does not have a valid component_{} in a connection element.",
                model.name(),
                n
            ));
            return None;
        };

        let component = model.component_by_name(name);
        if component.is_none() {
            self.add_error(parse_err!(
                Connection,
                DoesNotExist,
                "Connection in model '{}' specifies '{}' as component_{} but it does not exist in the model.",
                model.name(),
                name,
                n
            ));
        }
        component
    }

    fn build_connection(&mut self, model: &Model, connection: &xml::Connection) {
        let component_1 = self.connection_component(model, &connection.component_1, 1);
        let component_2 = self.connection_component(model, &connection.component_2, 2);

        if connection.map_variables.is_empty() {
            self.add_error(parse_err!(
                Connection,
                MissingMapVariables,
                "Connection in model '{}' does not contain any map_variables elements and will be disregarded.",
                model.name()
            ));
            return;
        }

        let (Some(component_1), Some(component_2)) = (component_1, component_2) else {
            return;
        };

        let connection_id = connection.id.as_deref().unwrap_or("");
        for map in connection.map_variables.iter() {
            // resolve both sides so each missing variable is reported
            let variable_1 = self.map_variable(model, &component_1, &map.variable_1, 1);
            let variable_2 = self.map_variable(model, &component_2, &map.variable_2, 2);
            if let (Some(variable_1), Some(variable_2)) = (variable_1, variable_2) {
                let mapping_id = map.id.as_deref().unwrap_or("");
                Variable::add_equivalence_with_ids(
                    &variable_1,
                    &variable_2,
                    mapping_id,
                    connection_id,
                );
            }
        }
    }

    fn map_variable(
        &mut self,
        model: &Model,
        component: &Component,
        name: &Option<String>,
        n: usize,
    ) -> Option<Variable> {
        let Some(name) = name else {
            self.add_error(parse_err!(
                Connection,
                MissingAttribute,
                "Connection in model '{}' does not have a valid variable_{} in a map_variables element.",
                model.name(),
                n
            ));
            return None;
        };

        if let Some(variable) = component.variable_by_name(name) {
            return Some(variable);
        }

        // the definition lives in the imported model, which we don't load
        if component.is_import() {
            let variable = Variable::with_name(name.as_str());
            component.add_variable(&variable);
            return Some(variable);
        }

        self.add_error(parse_err!(
            Variable,
            DoesNotExist,
            "Variable '{}' is specified as variable_{} in a connection but it does not exist in component_{} component '{}' of model '{}'.",
            name,
            n,
            n,
            component.name(),
            model.name()
        ));
        None
    }
}

#[test]
fn test_connection_before_components() {
    let input = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<model xmlns=\"http://www.cellml.org/cellml/2.0#\" name=\"m\">
  <connection component_1=\"c1\" component_2=\"c2\" id=\"con\">
    <map_variables variable_1=\"a\" variable_2=\"b\" id=\"map\"/>
  </connection>
  <component name=\"c1\">
    <variable name=\"a\" units=\"dimensionless\"/>
  </component>
  <component name=\"c2\">
    <variable name=\"b\" units=\"dimensionless\"/>
  </component>
</model>
";

    let mut parser = Parser::new();
    let model = parser.parse_model(input);
    assert_eq!(0, parser.error_count());

    let a = model.component_by_name("c1").unwrap().variable(0).unwrap();
    let b = model.component_by_name("c2").unwrap().variable(0).unwrap();
    assert!(a.has_equivalent_variable(&b));
    assert_eq!(Some("map".to_owned()), Variable::equivalence_mapping_id(&a, &b));
    assert_eq!(Some("con".to_owned()), Variable::equivalence_connection_id(&b, &a));
}

#[test]
fn test_connection_errors() {
    let input = "<model xmlns=\"http://www.cellml.org/cellml/2.0#\" name=\"m\">
  <component name=\"c1\"><variable name=\"a\"/></component>
  <connection component_1=\"c1\">
    <map_variables variable_1=\"a\" variable_2=\"b\"/>
  </connection>
  <connection component_1=\"c1\" component_2=\"nope\">
    <map_variables variable_1=\"a\" variable_2=\"b\"/>
  </connection>
  <connection component_1=\"c1\" component_2=\"c1\"/>
  <connection component_1=\"c1\" component_2=\"c1\">
    <map_variables variable_2=\"a\"/>
  </connection>
</model>";

    let mut parser = Parser::new();
    parser.parse_model(input);

    let expected = [
        "Connection in model 'm' does not have a valid component_2 in a connection element.",
        "Connection in model 'm' specifies 'nope' as component_2 but it does not exist in the model.",
        "Connection in model 'm' does not contain any map_variables elements and will be disregarded.",
        "Connection in model 'm' does not have a valid variable_1 in a map_variables element.",
    ];
    assert_eq!(expected.len(), parser.error_count());
    for (i, description) in expected.iter().enumerate() {
        assert_eq!(*description, parser.error(i).unwrap().description());
    }

    parser.clear_errors();
    assert_eq!(0, parser.error_count());
    assert!(parser.error(0).is_none());
}

#[test]
fn test_encapsulation() {
    let input = "<model xmlns=\"http://www.cellml.org/cellml/2.0#\">
  <component name=\"parent\"/>
  <component name=\"child\"/>
  <component name=\"grandchild\"/>
  <encapsulation>
    <component_ref component=\"parent\">
      <component_ref component=\"child\">
        <component_ref component=\"grandchild\"/>
      </component_ref>
      <component_ref component=\"ghost\"/>
    </component_ref>
  </encapsulation>
</model>";

    let mut parser = Parser::new();
    let model = parser.parse_model(input);

    assert_eq!(1, parser.error_count());
    assert_eq!(
        "Encapsulation in model '' specifies 'ghost' as a component in a component_ref but it does not exist in the model.",
        parser.error(0).unwrap().description()
    );
    assert_eq!(1, model.component_count());
    let parent = model.component(0).unwrap();
    let child = parent.component(0).unwrap();
    assert_eq!("child", child.name());
    assert_eq!("grandchild", child.component(0).unwrap().name());
}

#[test]
fn test_malformed_xml() {
    let mut parser = Parser::new();
    let model = parser.parse_model("<model><component name=\"c\"></model>");

    assert_eq!(1, parser.error_count());
    assert!(
        parser
            .error(0)
            .unwrap()
            .description()
            .starts_with("Could not parse the model: ")
    );
    assert_eq!(0, model.component_count());
}
