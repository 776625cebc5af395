//! End-to-end tests for the LDAP authentication driver live under `tests/`.
