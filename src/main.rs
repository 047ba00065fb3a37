fn main() {
    if let Err(err) = sheetstage::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
