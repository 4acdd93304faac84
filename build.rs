fn main() {
    println!("cargo:rerun-if-env-changed=CONDA_PREFIX");
    // only the rdkit feature links against the Python in a conda environment
    if std::env::var_os("CARGO_FEATURE_RDKIT").is_none() {
        return;
    }
    if let Ok(prefix) = std::env::var("CONDA_PREFIX") {
        println!("cargo:rustc-env=LD_LIBRARY_PATH={prefix}/lib");
    }
}
