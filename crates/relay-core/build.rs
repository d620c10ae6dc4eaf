fn main() {
    uniffi::generate_scaffolding("src/relay_core.udl").expect("failed to generate uniffi scaffolding");
}
