// SPDX-License-Identifier: MIT

//! Agent development kit: model providers, the completion service and errors

pub mod error;
pub mod model;
