//! Ctrl-C handling
//!
//! The first Ctrl-C during a walk cancels it: the scan stops after the
//! current file and the partial tree is still counted and rendered. A
//! Ctrl-C while no walk is running, or a second one, exits with status 130.

use std::process;
use std::thread;
use tracing::{debug, warn};

use crate::backends::walker::Scanner;

/// Exit status for a process stopped by SIGINT
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// What a Ctrl-C did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The running scan was asked to stop
    Cancelled,
    /// Nothing left to cancel; the process should exit
    Exit,
}

/// Route one Ctrl-C to `scanner`
pub fn handle_interrupt(scanner: &Scanner) -> Interrupt {
    if scanner.cancel() {
        Interrupt::Cancelled
    } else {
        Interrupt::Exit
    }
}

/// Listen for Ctrl-C on a background thread for the rest of the process
pub fn cancel_on_interrupt(scanner: Scanner) {
    let spawned = thread::Builder::new()
        .name("tokentree-signal".to_string())
        .spawn(move || listen(scanner));
    if let Err(e) = spawned {
        debug!("cannot start Ctrl-C listener: {}", e);
    }
}

fn listen(scanner: Scanner) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            debug!("cannot build signal runtime: {}", e);
            return;
        }
    };

    runtime.block_on(async {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                debug!("cannot listen for Ctrl-C: {}", e);
                return;
            }
            match handle_interrupt(&scanner) {
                Interrupt::Cancelled => {
                    warn!("interrupted, stopping scan (press Ctrl-C again to quit)")
                }
                Interrupt::Exit => process::exit(INTERRUPTED_EXIT_CODE),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::walker::{ScanOptions, ScanProgress};
    use std::fs;
    use std::sync::mpsc;
    use tempfile::tempdir;

    #[test]
    fn test_interrupt_without_scan_exits() {
        let scanner = Scanner::new(ScanOptions::default());
        assert_eq!(handle_interrupt(&scanner), Interrupt::Exit);
    }

    #[test]
    fn test_interrupt_cancels_then_exits() {
        let temp = tempdir().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(temp.path().join(name), "text").unwrap();
        }

        let scanner = Scanner::new(ScanOptions::default());
        let (reached_tx, reached_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let handle = scanner
            .spawn(vec![temp.path().to_path_buf()], move |p: &ScanProgress| {
                if p.done == 1 {
                    let _ = reached_tx.send(());
                    let _ = release_rx.recv();
                }
            })
            .expect("scanner idle");

        reached_rx.recv().unwrap();
        assert_eq!(handle_interrupt(&scanner), Interrupt::Cancelled);
        assert_eq!(handle_interrupt(&scanner), Interrupt::Exit);
        release_tx.send(()).unwrap();

        let result = handle.join().unwrap();
        assert!(result.cancelled);
        assert_eq!(result.processed_file_count, 1);
    }
}
