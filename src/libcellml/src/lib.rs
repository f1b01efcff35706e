// Copyright 2026 The libcellml-rs Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod common;
mod component;
#[cfg(test)]
mod equivalence_proptest;
mod model;
mod parser;
mod variable;
pub mod xml;

pub use self::common::{Error, ErrorCode, ErrorKind, Result};
pub use self::component::{Component, ImportSource};
pub use self::model::{Model, Unit, Units};
pub use self::parser::Parser;
pub use self::variable::{InitialValue, InterfaceType, Variable, WeakVariable};
pub use self::xml::model_to_cellml;
