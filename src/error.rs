// Copyright (c) 2023 The TQUIC Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error type for congestion control host operations.
//!
//! The congestion control algorithms never fail: every numeric hazard is
//! guarded and degrades to the single-path behaviour. Errors only arise at
//! the host boundary, e.g. an event addressed to a subflow that does not
//! exist or an unparsable configuration value.

use strum_macros::EnumIter;

/// Host and configuration error.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter)]
pub enum Error {
    /// There is no more work to do.
    Done,

    /// The configuration is invalid.
    InvalidConfig(String),

    /// The event referred to a subflow identifier that is not (or no longer)
    /// part of the connection.
    UnknownSubflow(usize),

    /// The connection already holds the maximum number of subflows.
    SubflowLimitReached,
}

impl Error {
    /// Return the error number used by embedding C callers.
    pub fn to_errno(&self) -> i64 {
        match self {
            Error::Done => -100,
            Error::InvalidConfig(_) => -106,
            Error::UnknownSubflow(_) => -120,
            Error::SubflowLimitReached => -121,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
