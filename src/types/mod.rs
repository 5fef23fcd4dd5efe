// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Types shared across the controller.

pub mod key;

pub use key::{split_key, ObjectKey};
