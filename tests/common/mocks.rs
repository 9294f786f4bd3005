//! Mock write target standing in for the `std::fs::File` a CSV file is saved to.
use mockall::mock;

use std::io::{self, ErrorKind, Write};

mock! {
    pub File {}
    impl Write for File {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
        fn flush(&mut self) -> io::Result<()>;
    }
}

impl MockFile {
    /// A file whose every write fails, as on a full disk.
    pub fn failing() -> Self {
        let mut file = MockFile::new();
        file.expect_write()
            .returning(|_| Err(io::Error::new(ErrorKind::StorageFull, "no space left on device")));
        file.expect_flush().returning(|| Ok(()));
        file
    }

    /// A file accepting every write.
    pub fn accepting() -> Self {
        let mut file = MockFile::new();
        file.expect_write().returning(|buf| Ok(buf.len()));
        file.expect_flush().returning(|| Ok(()));
        file
    }
}
