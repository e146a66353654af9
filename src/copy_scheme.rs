// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use crate::error::RedsetError;

/// The redundancy scheme family applied to a checkpoint.
///
/// `Xor` carries its parity group size; `Single` and `Partner` carry no
/// parameters, matching the source's use of a side-channel `set_size` only
/// for the XOR case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyScheme {
    Single,
    Partner,
    Xor { set_size: u32 },
}

impl CopyScheme {
    /// Parses a copy scheme from a case-insensitive token, defaulting the XOR
    /// set size to `default_set_size` since the token alone carries no
    /// parameter.
    pub fn parse(token: &str, default_set_size: u32) -> Result<Self, RedsetError> {
        match token.to_ascii_uppercase().as_str() {
            "SINGLE" => Ok(CopyScheme::Single),
            "PARTNER" => Ok(CopyScheme::Partner),
            "XOR" => Ok(CopyScheme::Xor {
                set_size: default_set_size,
            }),
            other => Err(RedsetError::UnknownCopyType(other.to_string())),
        }
    }

    /// The canonical uppercase token used by both the config and the
    /// serialized descriptor.
    pub fn as_token(&self) -> &'static str {
        match self {
            CopyScheme::Single => "SINGLE",
            CopyScheme::Partner => "PARTNER",
            CopyScheme::Xor { .. } => "XOR",
        }
    }
}

impl FromStr for CopyScheme {
    type Err = RedsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CopyScheme::parse(s, 2)
    }
}

impl fmt::Display for CopyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_token())
    }
}
