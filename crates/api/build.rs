//! Compiles the pickup point gRPC definitions with tonic-prost-build.
//!
//! `protoc` comes from `protoc-bin-vendored` so the build does not depend on a
//! system installation.

use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let protoc = protoc_bin_vendored::protoc_bin_path()?;
    let well_known = protoc_bin_vendored::include_path()?;

    // SAFETY: build scripts are single-threaded; nothing else reads the
    // environment concurrently.
    unsafe {
        std::env::set_var("PROTOC", protoc);
    }

    println!("cargo::rerun-if-changed=../../proto/pvz/v1/pvz.proto");

    let protos = [PathBuf::from("../../proto/pvz/v1/pvz.proto")];
    let includes = [PathBuf::from("../../proto"), well_known];
    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .emit_rerun_if_changed(true)
        .compile_protos(&protos, &includes)?;

    Ok(())
}
