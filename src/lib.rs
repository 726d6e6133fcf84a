// SPDX-License-Identifier: MIT

//! querygpt-rs: natural-language questions to SQL answers through a fixed
//! graph of LLM-backed stages.

pub mod adk;
pub mod querygpt;
