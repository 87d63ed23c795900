//! Adaptive quadtree descent over cluster tiles.
//!
//! The descent engine walks the quadkey tree concurrently. Each branch
//! fetches its tile and stops when the tile holds no unresolved cluster, or
//! when the maximum depth is reached; otherwise it fans out into the four
//! child keys and aggregates their contributions.
//!
//! ```text
//! collect([roots])
//!     ├── branch("030") ─ fetch ─ terminal ───────────► records
//!     ├── branch("031") ─ fetch ─ 404 ────────────────► (empty)
//!     └── branch("032") ─ fetch ─ cluster remains
//!                             ├── branch("0320") ─ ...
//!                             ├── branch("0321") ─ ...
//!                             ├── branch("0322") ─ ...
//!                             └── branch("0323") ─ ...
//!                                     └── joined, concatenated
//! ```
//!
//! Branches share no mutable state; each produces an independent record
//! list combined at its parent's join point. In-flight fetches are gated by
//! a semaphore so a pathological always-clustered region cannot emit
//! unbounded simultaneous requests. A branch that receives HTTP 404
//! contributes nothing. Any other failure is fatal: a shared cancellation
//! token unwinds every in-flight branch and the traversal returns the first
//! real error - there is no partial result.

mod engine;

pub use engine::{DescentEngine, DescentError, DEFAULT_MAX_IN_FLIGHT};
