use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/rust/ffi.rs");

    let crate_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => return,
    };
    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => return,
    };

    // Header generation is best effort; a failure here must not break the Rust build.
    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("TXCAT_H")
        .with_parse_deps(false)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(out_dir.join("txcat.h"));
        }
        Err(e) => {
            println!("cargo:warning=Failed to generate C header: {}", e);
        }
    }
}
