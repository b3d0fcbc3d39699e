fn main() {
    // ESP-IDF link arguments and environment; host builds have nothing to emit.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
