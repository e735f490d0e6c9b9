// End-to-end integration tests for the MegaPDF billing API
//
// These tests use a shared testcontainers PostgreSQL instance with a database
// pool for test isolation. Each test receives its own isolated database from
// the pool, allowing tests to run in parallel without conflicts.
//
// Architecture:
// - One shared PostgreSQL container for the entire test suite
// - Database pool creates/manages isolated databases (test_db_<uuid>)
// - Each test gets a unique database via test-context lifecycle hooks
// - PayPal is replaced by a scriptable in-process gateway
//
// The suite needs a Docker daemon, so every test is ignored by default:
//   cargo test --test e2e_tests -- --ignored

mod test_admin;
mod test_cron;
mod test_operations;
mod test_subscription;
mod test_webhook;
