// Handlers in two tiers:
// Public (no auth) → Protected (JWT auth, scoped by role)
pub mod protected;
pub mod public;
