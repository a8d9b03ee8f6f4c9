fn main() {
    // ESP-IDF link arguments are only needed for the firmware images; host
    // builds (tests, fuzzing) compile the library without them.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
