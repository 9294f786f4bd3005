mod mocks;

pub use mocks::MockFile;

/// Installs a test logger once per test binary.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
