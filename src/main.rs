//! moot CLI binary
//!
//! All logic lives in the library; main.rs only invokes `cli::run()`.

fn main() {
    // cli::run() prints its own errors; only the exit status is left to us
    if let Err(code) = moot::cli::run() {
        std::process::exit(code.as_i32());
    }
}
