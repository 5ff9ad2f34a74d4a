//! Integration tests for upsync-synology
//!
//! Uses wiremock to simulate the DSM Web API and verifies root checks, scoped sessions,
//! recursive listing and multipart uploads.


mod test_connect;
mod test_listing;
mod test_session;
