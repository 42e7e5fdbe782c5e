//! Integration tests for blazesync-api
//!
//! Uses wiremock to stand in for the BlazedCloud backend and verifies the
//! client, the inventory provider and the refreshing auth provider end to end.

mod common;

mod test_auth;
mod test_download_url;
mod test_inventory;
