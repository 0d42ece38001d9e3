//! # Events Module
//!
//! Progress reporting for sort runs.
//!
//! ## Design
//! The run driver emits events through a channel, allowing any UI
//! to subscribe and display progress.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::File(FileEvent::Processed(p)) = event {
//!             println!("{}/{} {}", p.completed, p.total, p.path.display());
//!         }
//!     }
//! });
//!
//! sorter.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
