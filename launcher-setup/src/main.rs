fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Deterministic walk through every step against the simulated backend.
    // Writes `setup_smoke_transcript.log` under the log folder and exits 0/1.
    if args.iter().any(|a| a == "--setup-smoke") {
        launcher_setup::run_setup_smoke();
        return;
    }

    // Control-state derivation for a snapshot file, or a built-in sample.
    // Usage: --controls-smoke or --controls-smoke=<snapshot.json>
    if let Some(arg) = args
        .iter()
        .find(|a| a.as_str() == "--controls-smoke" || a.starts_with("--controls-smoke="))
    {
        let path = arg
            .split_once('=')
            .map(|(_, v)| v.to_string())
            .filter(|v| !v.trim().is_empty());
        launcher_setup::run_controls_smoke(path);
        return;
    }

    if args.iter().any(|a| a == "--print-config") {
        launcher_setup::run_print_config();
        return;
    }

    eprintln!("Usage: launcher-setup --setup-smoke | --controls-smoke[=<snapshot.json>] | --print-config");
    std::process::exit(2);
}
