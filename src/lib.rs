//! Workspace root crate. Carries no functionality of its own; it exists so
//! `tests/` at the workspace root is a real, compiled integration-test
//! target for multi-crate scenarios, matching `backend/tests/integration/`
//! in the teacher repo.
