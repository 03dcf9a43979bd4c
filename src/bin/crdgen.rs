// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates the `Backend` CRD YAML from the Rust types defined in src/crd.rs.
//! This keeps deploy/crds/ in sync with the Rust code.
//!
//! Usage:
//!   cargo run --bin crdgen
//!
//! The generated file is written to deploy/crds/ with a header.

use haproxy_operator::crd::write_crd_manifest;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    println!("Generating CRD YAML files from src/crd.rs...");

    let path = write_crd_manifest(Path::new("deploy/crds"))?;
    println!("  ✓ Generated {}", path.display());

    println!("\nCRD YAML files generated successfully in deploy/crds/");
    Ok(())
}
