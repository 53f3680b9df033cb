//! Output modules: the JSON dataset and the image tree.
//!
//! # Submodules
//!
//! - [`json`]: Loads, appends to and rewrites the persisted JSON array
//! - [`images`]: Streams a record's photos into its per-person directory
//!
//! # Output Structure
//!
//! ```text
//! save_dir/
//! ├── missing_people.json
//! └── images/
//!     ├── محمد/
//!     │   ├── 0007_0.jpg
//!     │   └── 0007_1.jpg
//!     └── ...
//! ```

pub mod images;
pub mod json;
