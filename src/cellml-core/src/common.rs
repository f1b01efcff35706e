// Copyright 2026 The libcellml-rs Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError,      // will never be produced
    DoesNotExist, // the named entity doesn't exist
    XmlDeserialization,
    XmlSerialization,
    MissingAttribute,
    MissingMapVariables,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            DoesNotExist => "does_not_exist",
            XmlDeserialization => "xml_deserialization",
            XmlSerialization => "xml_serialization",
            MissingAttribute => "missing_attribute",
            MissingMapVariables => "missing_map_variables",
        };

        write!(f, "{name}")
    }
}

/// The part of a model an error refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Xml,
    Model,
    Component,
    Connection,
    Encapsulation,
    Variable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }

    /// Human readable description of the problem, or the empty string
    /// when the error carries no details.
    pub fn description(&self) -> &str {
        self.details.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Xml => "XmlError",
            ErrorKind::Model => "ModelError",
            ErrorKind::Component => "ComponentError",
            ErrorKind::Connection => "ConnectionError",
            ErrorKind::Encapsulation => "EncapsulationError",
            ErrorKind::Variable => "VariableError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Connection,
        ErrorCode::DoesNotExist,
        Some("no such component".to_owned()),
    );
    assert_eq!(
        "ConnectionError{does_not_exist: no such component}",
        format!("{err}")
    );
    assert_eq!("no such component", err.description());

    let err = Error::new(ErrorKind::Xml, ErrorCode::XmlDeserialization, None);
    assert_eq!("XmlError{xml_deserialization}", format!("{err}"));
    assert_eq!("", err.description());
    assert_eq!(None, err.get_details());
}

#[test]
fn test_error_code_names() {
    use ErrorCode::*;
    let cases = [
        (NoError, "no_error"),
        (DoesNotExist, "does_not_exist"),
        (XmlDeserialization, "xml_deserialization"),
        (XmlSerialization, "xml_serialization"),
        (MissingAttribute, "missing_attribute"),
        (MissingMapVariables, "missing_map_variables"),
    ];
    for (code, name) in cases {
        assert_eq!(name, code.to_string());
    }
}
