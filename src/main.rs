fn main() {
    if let Err(err) = floorgrid::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
