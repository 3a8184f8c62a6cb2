use std::io::{self, Write};

use super::{KeyOutcome, Observer};

/// One line per finished database, e.g. `db 0: 1200 keys (3 skipped)`.
pub struct Plain {
    out: Box<dyn Write + 'static>,
    skipped: usize,
}

impl Plain {
    pub fn new(out: Box<dyn Write + 'static>) -> Plain {
        Plain { out, skipped: 0 }
    }

    pub fn stderr() -> Plain {
        Plain::new(Box::new(io::stderr()))
    }
}

impl Observer for Plain {
    fn key_processed(&mut self, _db: u32, _key: &str, outcome: KeyOutcome) {
        if outcome == KeyOutcome::Skipped {
            self.skipped += 1;
        }
    }

    fn database_done(&mut self, db: u32, keys: usize) {
        let _ = match self.skipped {
            0 => writeln!(self.out, "db {}: {} keys", db, keys),
            skipped => writeln!(self.out, "db {}: {} keys ({} skipped)", db, keys, skipped),
        };
        let _ = self.out.flush();
        self.skipped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueType;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_one_line_per_database() {
        let buffer = Shared::default();
        let mut plain = Plain::new(Box::new(buffer.clone()));

        plain.key_processed(0, "a", KeyOutcome::Processed(ValueType::String));
        plain.key_processed(0, "b", KeyOutcome::Skipped);
        plain.database_done(0, 1);
        plain.database_done(1, 4);

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output, "db 0: 1 keys (1 skipped)\ndb 1: 4 keys\n");
    }
}
