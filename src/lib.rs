//! # Wiki Mirror
//!
//! Incrementally mirrors a paginated, hierarchical wiki space into a flat
//! directory of Markdown files.
//!
//! Each run lists the whole space, rewrites a hierarchy index, works out
//! which pages have no local copy yet and fetches only those, slowly and in
//! random order. Anything written before an interruption stays valid; the
//! next run picks up where the last one stopped.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌─────────────┐
//! │ Remote API   │──▶│ paginate   │──▶│ hierarchy   │──┐
//! │ (Confluence) │   └─────┬──────┘   └─────────────┘  │
//! └──────▲───────┘         ▼                           ▼
//!        │           ┌────────────┐   ┌─────────────┐ ┌──────────┐
//!        │           │ delta plan │◀──│ local_state │ │ archive  │
//!        │           └─────┬──────┘   └─────────────┘ └────▲─────┘
//!        │                 ▼                               │
//!        └──────────── pipeline (fetch → markup → write) ──┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export MIRROR_SESSION=<session cookie value>
//! mirror sync ARR                 # fetch pages not yet archived
//! mirror sync ARR --full          # refetch everything
//! mirror hierarchy ARR            # only rewrite ARR_hierarchy.md
//! mirror status                   # what is archived locally
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Remote content shapes and per-item outcomes |
//! | [`traits`] | `RemoteContentApi` and `Transform` seams |
//! | [`connector_confluence`] | HTTP implementation of the remote API |
//! | [`paginate`] | Offset/limit pagination driver |
//! | [`hierarchy`] | Ordered hierarchy index |
//! | [`local_state`] | Archive scan for already-synced identifiers |
//! | [`delta`] | Work planning |
//! | [`politeness`] | Randomized request pacing |
//! | [`markup`] | HTML to Markdown |
//! | [`pipeline`] | Per-item fetch, transform, persist |
//! | [`archive`] | File naming and atomic writes |
//! | [`sync`] | Operational modes |
//! | [`progress`] | Progress reporting |
//! | [`status`] | Local archive summary |

pub mod archive;
pub mod config;
pub mod connector_confluence;
pub mod delta;
pub mod hierarchy;
pub mod local_state;
pub mod markup;
pub mod models;
pub mod paginate;
pub mod pipeline;
pub mod politeness;
pub mod progress;
pub mod status;
pub mod sync;
pub mod traits;
