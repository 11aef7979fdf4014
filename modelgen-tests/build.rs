fn main() {
    // Generate code for the tests: generate_test reads the files back and
    // dao_test compiles them (via include!) against rdbi
    let out_dir = std::env::var("OUT_DIR").unwrap();
    modelgen::CodegenBuilder::statement_mode("fixtures/schema.sql")
        .all_tables()
        .output_path(std::path::Path::new(&out_dir).join("generated"))
        .module_root("crate")
        .generate()
        .expect("codegen failed");

    println!("cargo:rerun-if-changed=fixtures/schema.sql");
}
