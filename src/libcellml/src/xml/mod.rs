// Copyright 2026 The libcellml-rs Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! CellML 2.0 XML documents.
//!
//! Reading deserializes a document into the element structs below with
//! `quick-xml`'s serde support; the parser then builds the object model
//! from them. Writing goes the other way: the object model is converted
//! into element structs, which write themselves through [`ToXml`].

use std::io::{Cursor, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use serde::Deserialize;

use crate::common::{Error, ErrorCode, ErrorKind, Result};
use crate::{component, model, variable};

mod connections;

pub(crate) trait ToXml<W: Clone + Write> {
    fn write_xml(&self, writer: &mut Writer<W>) -> Result<()>;
}

pub(crate) type XmlWriter = Cursor<Vec<u8>>;

const CELLML_NS: &str = "http://www.cellml.org/cellml/2.0#";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const INDENT: usize = 2;

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(rename = "model")]
pub struct File {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "import", default)]
    pub imports: Vec<Import>,
    #[serde(rename = "units", default)]
    pub units: Vec<Units>,
    #[serde(rename = "component", default)]
    pub components: Vec<Component>,
    #[serde(rename = "connection", default)]
    pub connections: Vec<Connection>,
    pub encapsulation: Option<Encapsulation>,
}

impl File {
    fn is_empty(&self) -> bool {
        self.imports.is_empty()
            && self.units.is_empty()
            && self.components.is_empty()
            && self.connections.is_empty()
            && self.encapsulation.is_none()
    }
}

impl ToXml<XmlWriter> for File {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![("xmlns", CELLML_NS)];
        push_attr(&mut attrs, "name", &self.name);
        push_attr(&mut attrs, "id", &self.id);

        if self.is_empty() {
            return write_empty_tag_with_attrs(writer, "model", &attrs);
        }

        write_tag_start_with_attrs(writer, "model", &attrs)?;

        for import in self.imports.iter() {
            import.write_xml(writer)?;
        }
        for units in self.units.iter() {
            units.write_xml(writer)?;
        }
        for component in self.components.iter() {
            component.write_xml(writer)?;
        }
        for connection in self.connections.iter() {
            connection.write_xml(writer)?;
        }
        if let Some(ref encapsulation) = self.encapsulation {
            encapsulation.write_xml(writer)?;
        }

        write_tag_end(writer, "model")
    }
}

impl From<&model::Model> for File {
    fn from(model: &model::Model) -> Self {
        // A parsed document rebuilds its imported components ahead of the
        // local ones, with the top-level imports ahead of nested ones.
        // Writing in that same order keeps a reparsed model's output
        // identical to the document it came from.
        let (mut imported, locals): (Vec<_>, Vec<_>) = model
            .all_components()
            .into_iter()
            .partition(|c| c.is_import());
        imported.sort_by_key(|c| c.parent().is_some());

        let mut imports: Vec<(component::ImportSource, Import, Vec<component::Component>)> =
            vec![];
        for component in imported {
            let Some(source) = component.import_source() else {
                continue;
            };
            let element = ImportComponent {
                component_ref: Some(component.import_reference()),
                name: non_empty(component.name()),
                id: non_empty(component.id()),
            };
            match imports.iter_mut().find(|(s, _, _)| *s == source) {
                Some((_, import, members)) => {
                    import.components.push(element);
                    members.push(component);
                }
                None => {
                    let import = Import {
                        href: Some(source.url().to_owned()),
                        components: vec![element],
                    };
                    imports.push((source, import, vec![component]));
                }
            }
        }

        let mut walk: Vec<component::Component> = imports
            .iter()
            .flat_map(|(_, _, members)| members.iter().cloned())
            .collect();
        walk.extend(locals.iter().cloned());

        let mut top_level = model.components();
        top_level.sort_by_key(|c| !c.is_import());
        let component_refs: Vec<ComponentRef> = top_level
            .iter()
            .filter(|c| c.component_count() > 0)
            .map(ComponentRef::from)
            .collect();

        File {
            name: non_empty(model.name().to_owned()),
            id: non_empty(model.id().to_owned()),
            imports: imports.into_iter().map(|(_, import, _)| import).collect(),
            units: model.all_units().iter().map(Units::from).collect(),
            components: locals.iter().map(Component::from).collect(),
            connections: connections::connections(&walk),
            encapsulation: if component_refs.is_empty() {
                None
            } else {
                Some(Encapsulation { component_refs })
            },
        }
    }
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Deserialize)]
pub struct Import {
    // xlink:href
    #[serde(rename = "@href", default)]
    pub href: Option<String>,
    #[serde(rename = "component", default)]
    pub components: Vec<ImportComponent>,
}

impl ToXml<XmlWriter> for Import {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![];
        push_attr(&mut attrs, "xlink:href", &self.href);
        attrs.push(("xmlns:xlink", XLINK_NS));
        write_tag_start_with_attrs(writer, "import", &attrs)?;

        for component in self.components.iter() {
            let mut attrs = vec![];
            push_attr(&mut attrs, "component_ref", &component.component_ref);
            push_attr(&mut attrs, "name", &component.name);
            push_attr(&mut attrs, "id", &component.id);
            write_empty_tag_with_attrs(writer, "component", &attrs)?;
        }

        write_tag_end(writer, "import")
    }
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Deserialize)]
pub struct ImportComponent {
    #[serde(rename = "@component_ref", default)]
    pub component_ref: Option<String>,
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Deserialize)]
pub struct Units {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "unit", default)]
    pub units: Vec<Unit>,
}

impl ToXml<XmlWriter> for Units {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![];
        push_attr(&mut attrs, "name", &self.name);
        push_attr(&mut attrs, "id", &self.id);

        if self.units.is_empty() {
            return write_empty_tag_with_attrs(writer, "units", &attrs);
        }

        write_tag_start_with_attrs(writer, "units", &attrs)?;
        for unit in self.units.iter() {
            let mut attrs = vec![];
            push_attr(&mut attrs, "units", &unit.reference);
            push_attr(&mut attrs, "prefix", &unit.prefix);
            push_attr(&mut attrs, "exponent", &unit.exponent);
            push_attr(&mut attrs, "multiplier", &unit.multiplier);
            push_attr(&mut attrs, "id", &unit.id);
            write_empty_tag_with_attrs(writer, "unit", &attrs)?;
        }
        write_tag_end(writer, "units")
    }
}

impl From<&model::Units> for Units {
    fn from(units: &model::Units) -> Self {
        Units {
            name: non_empty(units.name.clone()),
            id: units.id.clone(),
            units: units
                .units
                .iter()
                .map(|unit| Unit {
                    reference: non_empty(unit.reference.clone()),
                    prefix: unit.prefix.clone(),
                    exponent: unit.exponent.clone(),
                    multiplier: unit.multiplier.clone(),
                    id: unit.id.clone(),
                })
                .collect(),
        }
    }
}

impl From<Units> for model::Units {
    fn from(units: Units) -> Self {
        model::Units {
            name: units.name.unwrap_or_default(),
            id: units.id,
            units: units
                .units
                .into_iter()
                .map(|unit| model::Unit {
                    reference: unit.reference.unwrap_or_default(),
                    prefix: unit.prefix,
                    exponent: unit.exponent,
                    multiplier: unit.multiplier,
                    id: unit.id,
                })
                .collect(),
        }
    }
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Deserialize)]
pub struct Unit {
    #[serde(rename = "@units", default)]
    pub reference: Option<String>,
    #[serde(rename = "@prefix", default)]
    pub prefix: Option<String>,
    #[serde(rename = "@exponent", default)]
    pub exponent: Option<String>,
    #[serde(rename = "@multiplier", default)]
    pub multiplier: Option<String>,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Deserialize)]
pub struct Component {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "variable", default)]
    pub variables: Vec<Var>,
    // MathML is carried as raw markup and only ever written out
    #[serde(skip)]
    pub math: Option<String>,
}

impl ToXml<XmlWriter> for Component {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![];
        push_attr(&mut attrs, "name", &self.name);
        push_attr(&mut attrs, "id", &self.id);

        if self.variables.is_empty() && self.math.is_none() {
            return write_empty_tag_with_attrs(writer, "component", &attrs);
        }

        write_tag_start_with_attrs(writer, "component", &attrs)?;
        for var in self.variables.iter() {
            var.write_xml(writer)?;
        }
        if let Some(ref math) = self.math {
            write_raw_markup(writer, math)?;
        }
        write_tag_end(writer, "component")
    }
}

impl From<&component::Component> for Component {
    fn from(component: &component::Component) -> Self {
        Component {
            name: non_empty(component.name()),
            id: non_empty(component.id()),
            variables: component.variables().iter().map(Var::from).collect(),
            math: non_empty(component.math()),
        }
    }
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Deserialize)]
pub struct Var {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@units", default)]
    pub units: Option<String>,
    #[serde(rename = "@initial_value", default)]
    pub initial_value: Option<String>,
    #[serde(rename = "@interface", default)]
    pub interface: Option<String>,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
}

impl ToXml<XmlWriter> for Var {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![];
        push_attr(&mut attrs, "name", &self.name);
        push_attr(&mut attrs, "units", &self.units);
        push_attr(&mut attrs, "initial_value", &self.initial_value);
        push_attr(&mut attrs, "interface", &self.interface);
        push_attr(&mut attrs, "id", &self.id);
        write_empty_tag_with_attrs(writer, "variable", &attrs)
    }
}

impl From<&variable::Variable> for Var {
    fn from(variable: &variable::Variable) -> Self {
        Var {
            name: non_empty(variable.name()),
            units: non_empty(variable.units()),
            initial_value: variable.initial_value(),
            interface: variable
                .interface_type()
                .map(|interface| interface.as_str().to_owned()),
            id: non_empty(variable.id()),
        }
    }
}

impl From<Var> for variable::Variable {
    fn from(var: Var) -> Self {
        let variable = variable::Variable::new();
        if let Some(name) = var.name {
            variable.set_name(name);
        }
        if let Some(units) = var.units {
            variable.set_units(units);
        }
        if let Some(initial_value) = var.initial_value {
            variable.set_initial_value(initial_value);
        }
        if let Some(interface) = var.interface {
            variable.set_interface_type(variable::InterfaceType::from(interface.as_str()));
        }
        if let Some(id) = var.id {
            variable.set_id(id);
        }
        variable
    }
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Deserialize)]
pub struct Connection {
    #[serde(rename = "@component_1", default)]
    pub component_1: Option<String>,
    #[serde(rename = "@component_2", default)]
    pub component_2: Option<String>,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "map_variables", default)]
    pub map_variables: Vec<MapVariables>,
}

impl ToXml<XmlWriter> for Connection {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![];
        push_attr(&mut attrs, "component_1", &self.component_1);
        push_attr(&mut attrs, "component_2", &self.component_2);
        push_attr(&mut attrs, "id", &self.id);
        write_tag_start_with_attrs(writer, "connection", &attrs)?;

        for map in self.map_variables.iter() {
            let mut attrs = vec![];
            push_attr(&mut attrs, "variable_1", &map.variable_1);
            push_attr(&mut attrs, "variable_2", &map.variable_2);
            push_attr(&mut attrs, "id", &map.id);
            write_empty_tag_with_attrs(writer, "map_variables", &attrs)?;
        }

        write_tag_end(writer, "connection")
    }
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Deserialize)]
pub struct MapVariables {
    #[serde(rename = "@variable_1", default)]
    pub variable_1: Option<String>,
    #[serde(rename = "@variable_2", default)]
    pub variable_2: Option<String>,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Deserialize)]
pub struct Encapsulation {
    #[serde(rename = "component_ref", default)]
    pub component_refs: Vec<ComponentRef>,
}

impl ToXml<XmlWriter> for Encapsulation {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        write_tag_start(writer, "encapsulation")?;
        for component_ref in self.component_refs.iter() {
            component_ref.write_xml(writer)?;
        }
        write_tag_end(writer, "encapsulation")
    }
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Deserialize)]
pub struct ComponentRef {
    #[serde(rename = "@component", default)]
    pub component: Option<String>,
    #[serde(rename = "component_ref", default)]
    pub component_refs: Vec<ComponentRef>,
}

impl ToXml<XmlWriter> for ComponentRef {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![];
        push_attr(&mut attrs, "component", &self.component);

        if self.component_refs.is_empty() {
            return write_empty_tag_with_attrs(writer, "component_ref", &attrs);
        }

        write_tag_start_with_attrs(writer, "component_ref", &attrs)?;
        for child in self.component_refs.iter() {
            child.write_xml(writer)?;
        }
        write_tag_end(writer, "component_ref")
    }
}

impl From<&component::Component> for ComponentRef {
    fn from(component: &component::Component) -> Self {
        ComponentRef {
            component: Some(component.name()),
            component_refs: component
                .components()
                .iter()
                .map(ComponentRef::from)
                .collect(),
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn push_attr<'a>(attrs: &mut Vec<(&'a str, &'a str)>, key: &'a str, value: &'a Option<String>) {
    if let Some(value) = value {
        attrs.push((key, value.as_str()));
    }
}

pub(crate) fn xml_error(err: std::io::Error) -> Error {
    Error::new(
        ErrorKind::Xml,
        ErrorCode::XmlSerialization,
        Some(err.to_string()),
    )
}

pub(crate) fn write_tag_start(writer: &mut Writer<XmlWriter>, tag_name: &str) -> Result<()> {
    write_tag_start_with_attrs(writer, tag_name, &[])
}

pub(crate) fn write_tag_start_with_attrs(
    writer: &mut Writer<XmlWriter>,
    tag_name: &str,
    attrs: &[(&str, &str)],
) -> Result<()> {
    let mut elem = BytesStart::new(tag_name);
    for attr in attrs.iter() {
        elem.push_attribute(*attr);
    }
    writer.write_event(Event::Start(elem)).map_err(xml_error)
}

pub(crate) fn write_empty_tag_with_attrs(
    writer: &mut Writer<XmlWriter>,
    tag_name: &str,
    attrs: &[(&str, &str)],
) -> Result<()> {
    let mut elem = BytesStart::new(tag_name);
    for attr in attrs.iter() {
        elem.push_attribute(*attr);
    }
    writer.write_event(Event::Empty(elem)).map_err(xml_error)
}

pub(crate) fn write_tag_end(writer: &mut Writer<XmlWriter>, tag_name: &str) -> Result<()> {
    writer
        .write_event(Event::End(BytesEnd::new(tag_name)))
        .map_err(xml_error)
}

/// Writes already-serialized markup on its own line without escaping it.
pub(crate) fn write_raw_markup(writer: &mut Writer<XmlWriter>, markup: &str) -> Result<()> {
    writer.write_indent().map_err(xml_error)?;
    writer
        .get_mut()
        .write_all(markup.as_bytes())
        .map_err(xml_error)
}

pub fn model_to_cellml(model: &model::Model) -> Result<String> {
    let file = File::from(model);

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', INDENT);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    file.write_xml(&mut writer)?;

    let mut result = writer.into_inner().into_inner();
    result.push(b'\n');

    String::from_utf8(result).map_err(|_err| {
        Error::new(
            ErrorKind::Xml,
            ErrorCode::XmlSerialization,
            Some("problem converting to UTF-8".to_owned()),
        )
    })
}

pub(crate) fn file_from_str(input: &str) -> Result<File> {
    quick_xml::de::from_str(input).map_err(|err| {
        Error::new(
            ErrorKind::Xml,
            ErrorCode::XmlDeserialization,
            Some(format!("Could not parse the model: {err}")),
        )
    })
}

#[test]
fn test_variable_parsing() {
    let input = "<variable name=\"v\" units=\"second\" initial_value=\"2\" interface=\"public\" id=\"v_id\"/>";

    let expected = Var {
        name: Some("v".to_owned()),
        units: Some("second".to_owned()),
        initial_value: Some("2".to_owned()),
        interface: Some("public".to_owned()),
        id: Some("v_id".to_owned()),
    };

    let actual: Var = quick_xml::de::from_str(input).unwrap();
    assert_eq!(expected, actual);

    let roundtripped = Var::from(&variable::Variable::from(actual.clone()));
    assert_eq!(roundtripped, actual);
}

#[test]
fn test_interleaved_components_and_connections() {
    let input = "<model xmlns=\"http://www.cellml.org/cellml/2.0#\" name=\"m\">
        <connection component_1=\"c1\" component_2=\"c2\">
            <map_variables variable_1=\"a\" variable_2=\"b\" id=\"map\"/>
        </connection>
        <component name=\"c1\"><variable name=\"a\"/></component>
        <connection component_1=\"c2\" component_2=\"c1\">
            <map_variables variable_1=\"b\" variable_2=\"a\"/>
        </connection>
        <component name=\"c2\"><variable name=\"b\"/></component>
    </model>";

    let file = file_from_str(input).unwrap();
    assert_eq!(Some("m".to_owned()), file.name);
    assert_eq!(2, file.components.len());
    assert_eq!(2, file.connections.len());
    assert_eq!(
        Some("map".to_owned()),
        file.connections[0].map_variables[0].id
    );
}

#[test]
fn test_import_parsing() {
    let input = "<import xlink:href=\"other.cellml\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">
        <component component_ref=\"remote\" name=\"local\"/>
    </import>";

    let actual: Import = quick_xml::de::from_str(input).unwrap();
    assert_eq!(Some("other.cellml".to_owned()), actual.href);
    assert_eq!(1, actual.components.len());
    assert_eq!(Some("remote".to_owned()), actual.components[0].component_ref);
}

#[test]
fn test_units_roundtrip() {
    let cases: &[_] = &[
        model::Units::new("dimensionless_thing"),
        model::Units {
            name: "per_second".to_owned(),
            id: Some("ps".to_owned()),
            units: vec![model::Unit {
                reference: "second".to_owned(),
                exponent: Some("-1".to_owned()),
                ..Default::default()
            }],
        },
    ];
    for expected in cases {
        let actual = model::Units::from(Units::from(expected));
        assert_eq!(*expected, actual);
    }
}

#[test]
fn test_empty_model() {
    let model = model::Model::new();
    let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                    <model xmlns=\"http://www.cellml.org/cellml/2.0#\"/>\n";
    assert_eq!(expected, model_to_cellml(&model).unwrap());
}

#[test]
fn test_bad_xml() {
    let err = file_from_str("<model><component></model>").unwrap_err();
    assert_eq!(ErrorCode::XmlDeserialization, err.code);
    assert_eq!(ErrorKind::Xml, err.kind);
}
