//! Hello Service
//!
//! Standalone service with no lifecycle at all: the five boundary symbols
//! are no-ops and `hello` prints a greeting.

use std::io::{self, Write};

bridge_runtime::export_standalone_noop!();

pub const GREETING: &str = "Hello from hello_service!";

pub fn write_greeting(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{GREETING}")?;
    out.flush()
}

/// Print the greeting to stdout.
#[unsafe(no_mangle)]
pub extern "C" fn hello() {
    if let Err(e) = write_greeting(&mut io::stdout().lock()) {
        tracing::warn!(error = %e, "Failed to write greeting");
    }
}
