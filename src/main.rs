fn main() {
    if let Err(err) = netlayout::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
