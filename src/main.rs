fn main() {
    if let Err(err) = worktimer_lib::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
