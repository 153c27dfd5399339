fn main() -> std::process::ExitCode {
    medicore_triage::run()
}
