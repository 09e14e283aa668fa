//! Integration suites driving the public API against a mocked identity provider.

mod account_flow;
mod support;
