//! maps-rx command-line interface.
//!
//! Replays scripted host events through the bridge against a headless map,
//! and inspects the configuration.

fn main() {
    if let Err(err) = maps_rx::cli::run() {
        eprintln!("maps-rx: {err}");
        std::process::exit(1);
    }
}
