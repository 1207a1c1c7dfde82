//! Text artifacts written into the working directory.
//!
//! # Submodules
//!
//! - [`json`]: the scraped [`crate::models::ProductRecord`] as `product.json`
//! - [`script`]: the narration script as `script.txt`
//!
//! # Working directory layout
//!
//! ```text
//! workdir/
//! ├── product.json   # scraped record
//! ├── script.txt     # narration script
//! ├── voice.mp3      # narration audio
//! └── promo.mp4      # final video
//! ```

pub mod json;
pub mod script;
