// handlers/mod.rs - Three handler tiers
//
// Public (no auth) → Protected (JWT auth, /api/*) → Elevated (admin role, /api/admin/*)

pub mod elevated;
pub mod protected;
pub mod public;
