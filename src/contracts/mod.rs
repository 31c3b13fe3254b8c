// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Contract bindings for the escrow contract every chain deploys and for
//! each supported AMB's bridge-specific contracts.
//!
//! ABI interfaces are declared inline with Alloy's `sol!` macro rather than
//! loaded from external ABI JSON files: this deployment's contracts are
//! defined by this crate, not imported from a third-party package, so there
//! is no ABI JSON artifact to point at.

pub mod escrow;
pub mod layerzero;
pub mod mock;
pub mod polymer;
pub mod wormhole;
