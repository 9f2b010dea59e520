fn main() {
    agentflow_edge::cli::init_logging();
    if let Err(err) = agentflow_edge::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
