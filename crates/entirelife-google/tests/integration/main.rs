//! Integration tests for entirelife-google
//!
//! Uses wiremock to simulate the Drive and Sheets APIs and verifies
//! end-to-end behavior of the GoogleSheetsBackend: discovery, creation,
//! uploads, row writes and reads, and error classification.

mod common;

mod test_discovery;
mod test_errors;
mod test_values;
