//! Integration tests for blazesync-sync
//!
//! Uses wiremock to serve object content and verifies downloads, temp-file
//! handling, and whole sync passes against a real temporary sync root.

mod common;

mod test_pass;
mod test_transfer;
