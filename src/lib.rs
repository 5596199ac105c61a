pub mod compose;
pub mod dates;
pub mod error;
pub mod extract;
pub mod google;
pub mod google_api;
pub mod markup;
pub mod parser;
pub mod platform;
pub mod state;
pub mod types;
pub mod util;
pub mod workflow;
