//! Workspace root for the lobby client and relay server.
//!
//! The crates live in `shared/`, `client/` and `server/`; this package only
//! hosts the cross-crate tests under `tests/`.
