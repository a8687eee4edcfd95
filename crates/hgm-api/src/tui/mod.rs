//! Interactive household search
//!
//! Architecture:
//! - Main thread: renders and handles input events
//! - `SearchCoordinator` worker: debounces keystrokes and issues one
//!   `/search` request at a time; stale outcomes are dropped
//!
//! Layout:
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Search: [____________________]                               │
//! ├─────────────────────────────┬────────────────────────────────┤
//! │ Households [12]             │ Details                        │
//! │ > Aarav  (Sunita)  Rampur ✓ │ Child:   Aarav                 │
//! │   Diya   (Meena)   Khairi   │ Mobile:  9876543210            │
//! ├─────────────────────────────┴────────────────────────────────┤
//! │ 12 households │ Query: 84.0ms │ Enter: copy mobile │ Esc: quit│
//! │   [Copied: 9876543210]                                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod app;
mod ui;

pub use app::{run, App, TextInput};
