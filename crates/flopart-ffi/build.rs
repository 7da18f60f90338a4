//! Build script for flopart-ffi.
//!
//! Writes `include/flopart.h` with cbindgen.

use std::env;
use std::path::PathBuf;

fn main() {
    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let include_dir = crate_dir.join("include");
    std::fs::create_dir_all(&include_dir).ok();

    let config = cbindgen::Config::from_file(crate_dir.join("cbindgen.toml"))
        .expect("Failed to read cbindgen.toml");

    cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
        .expect("Unable to generate bindings")
        .write_to_file(include_dir.join("flopart.h"));

    for watched in ["src/lib.rs", "src/types.rs", "cbindgen.toml"] {
        println!("cargo:rerun-if-changed={watched}");
    }
}
