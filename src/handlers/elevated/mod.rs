// handlers/elevated/mod.rs - Elevated handlers (admin role required)
//
// Platform-wide operations: dead letter queue, usage counters, licenses,
// audit trail and background jobs. Every handler here calls
// `user.require_admin()` before touching anything.
//
// Route Prefix: /api/admin/*
// Middleware: JWT validation + usage tracking + request id

pub mod admin;
