//! Generates Kotlin and Swift bindings for the `securestore` library.

fn main() {
    uniffi::uniffi_bindgen_main();
}
