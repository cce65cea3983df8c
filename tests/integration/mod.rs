//! Shared fixtures for tests that talk HTTP to a mock backend

pub mod mock_server;
