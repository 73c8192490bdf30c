//! Generates the Swift and Kotlin bindings for `attestkit`.

fn main() {
    uniffi::uniffi_bindgen_main();
}
