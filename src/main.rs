fn main() {
    if let Err(err) = stacked_area_renderer::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
