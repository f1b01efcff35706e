// Copyright 2026 The libcellml-rs Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

// Re-export all common types from cellml-core
pub use cellml_core::common::*;

/// Builds a collected (non-fatal) parse error with formatted details.
#[macro_export]
macro_rules! parse_err(
    ($kind:tt, $code:tt, $($arg:tt)*) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Error::new(
            ErrorKind::$kind,
            ErrorCode::$code,
            Some(format!($($arg)*)),
        )
    }}
);

#[test]
fn test_parse_err() {
    let model = "m";
    let err = parse_err!(Connection, MissingMapVariables, "model '{}'", model);
    assert_eq!(ErrorKind::Connection, err.kind);
    assert_eq!(ErrorCode::MissingMapVariables, err.code);
    assert_eq!("model 'm'", err.description());
}
