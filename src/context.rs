use std::io::{Read, Write};

/// The I/O context handed to an executing command.
///
/// Carries the dispatch's stdin/stdout/stderr: the real process streams by
/// default, or whatever the [`Environment`](crate::Environment) was
/// configured with (in-memory buffers, for tests).
///
/// `Context` itself implements [`Read`] (from stdin) and [`Write`] (to
/// stdout), so it can be passed directly to code expecting either.
pub struct Context<'c> {
    stdin: &'c mut dyn Read,
    stdout: &'c mut dyn Write,
    stderr: &'c mut dyn Write,
}

impl<'c> Context<'c> {
    pub(crate) fn new(
        stdin: &'c mut dyn Read,
        stdout: &'c mut dyn Write,
        stderr: &'c mut dyn Write,
    ) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }

    /// The command's input stream.
    pub fn stdin(&mut self) -> &mut dyn Read {
        &mut *self.stdin
    }

    /// The command's output stream.
    pub fn stdout(&mut self) -> &mut dyn Write {
        &mut *self.stdout
    }

    /// The command's error stream.
    pub fn stderr(&mut self) -> &mut dyn Write {
        &mut *self.stderr
    }
}

impl Read for Context<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stdin.read(buf)
    }
}

impl Write for Context<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stdout.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stdout.flush()
    }
}
