//! Ctrl-C handling (spec §5, §9): the first SIGINT asks the process to wind
//! down once its children exit on their own; a second SIGINT, or any
//! SIGTERM, kills every tracked agent subprocess and exits immediately.

/// Spawn the signal-watching task. Fire-and-forget: it outlives every
/// command handler and is reaped when the process exits.
pub fn install() {
    tokio::spawn(async {
        let mut interrupts = 0u32;
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            interrupts += 1;
            if interrupts == 1 && !tracker_agent::live_children().is_empty() {
                eprintln!(
                    "\nInterrupt received; letting running agent turns finish. \
                     Press Ctrl-C again to stop them immediately."
                );
                continue;
            }
            eprintln!("\nStopping all agent subprocesses.");
            tracker_agent::terminate_all();
            std::process::exit(130);
        }
    });
}
