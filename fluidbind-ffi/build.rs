// Regenerates include/fluidbind.h with `cbindgen` when it is installed;
// otherwise the checked-in header is copied to $OUT_DIR.
//
// Consumers can include the header from:
//   - <repo>/fluidbind-ffi/include/fluidbind.h   (checked-in)
//   - $OUT_DIR/fluidbind.h

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/fluidbind.h");

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let header_repo = crate_dir.join("include").join("fluidbind.h");
    let header_out = out_dir.join("fluidbind.h");

    let cbindgen_ok = Command::new("cbindgen")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    if cbindgen_ok {
        let status = Command::new("cbindgen")
            .args(["--crate", "fluidbind-ffi", "--lang", "C", "--output"])
            .arg(&header_out)
            .current_dir(&crate_dir)
            .status();

        if matches!(status, Ok(s) if s.success()) {
            let _ = fs::copy(&header_out, &header_repo);
            return;
        }
        println!("cargo:warning=fluidbind-ffi: cbindgen failed; using checked-in header");
    }

    if header_repo.exists() {
        fs::copy(&header_repo, &header_out).expect("failed to copy include/fluidbind.h to OUT_DIR");
    }
}
